//! Decoders for CDF products: PSP FIELDS/RFS auto-spectra and Solar Orbiter
//! RPW HFR survey data.
//!
//! There is no CDF container parser in here; the caller supplies a backend
//! that turns a file into a [`CdfArchive`], and the decoders work on that
//! parsed representation.

use std::{collections::HashMap, path::Path};

use hifitime::{Duration, Epoch};
use itertools::Itertools;
use log::debug;
use ndarray::{Array2, ArrayD};

use crate::{
    error::Error,
    meta::{Extra, Metadata},
    time::{j2000_tt, TimeAxis},
    units::{FreqRange, Quantity, Unit},
};

/// A CDF variable: its values flattened to floats, plus its variable
/// attributes.
pub struct CdfVariable {
    pub values: ArrayD<f64>,
    pub attrs: HashMap<String, String>,
}

/// The parsed representation of a CDF file that the decoders consume.
pub struct CdfArchive {
    pub attrs: HashMap<String, String>,
    pub vars: HashMap<String, CdfVariable>,
}

/// Turns a CDF file into its parsed representation. The crate does not ship
/// one; the application wires in whatever CDF library it has.
pub type CdfReader = Box<dyn Fn(&Path) -> Result<CdfArchive, Error> + Send + Sync>;

impl CdfArchive {
    fn attr(&self, name: &str) -> &str {
        self.attrs.get(name).map(String::as_str).unwrap_or("")
    }

    fn var(&self, path: &Path, name: &str) -> Result<&CdfVariable, Error> {
        self.vars.get(name).ok_or_else(|| Error::Decode {
            path: path.to_path_buf(),
            details: format!("no {name:?} variable"),
        })
    }
}

/// Decode a parsed CDF into one or more spectrograms (the RPW survey data
/// yields one per active AGC channel).
pub(crate) fn decode(path: &Path, cdf: &CdfArchive) -> Result<Vec<(Array2<f64>, Metadata)>, Error> {
    if cdf.attr("Project") == "PSP"
        && cdf.attr("Source_name") == "PSP_FLD>Parker Solar Probe FIELDS"
        && cdf.attr("Descriptor").contains("Radio Frequency Spectrometer")
    {
        debug!("{} is a PSP FIELDS/RFS product", path.display());
        Ok(vec![decode_rfs(path, cdf)?])
    } else if cdf.attr("Project").contains("SOLO") {
        if !cdf.attr("Descriptor").contains("RPW-HFR-SURV") {
            return Err(Error::UnsupportedProduct {
                path: path.to_path_buf(),
                details: format!(
                    "only Level 2 HFR survey data is supported, this file is {:?}",
                    cdf.attr("Descriptor")
                ),
            });
        }
        debug!("{} is an RPW-HFR-SURV product", path.display());
        decode_rpw(path, cdf)
    } else {
        Err(Error::UnsupportedProduct {
            path: path.to_path_buf(),
            details: format!(
                "unrecognised CDF product (project {:?})",
                cdf.attr("Project")
            ),
        })
    }
}

fn decode_error(path: &Path, details: impl Into<String>) -> Error {
    Error::Decode {
        path: path.to_path_buf(),
        details: details.into(),
    }
}

/// The scale factor from a variable's UNITS attribute to seconds.
fn epoch_scale(var: &CdfVariable) -> f64 {
    var.attrs
        .get("UNITS")
        .and_then(|u| Unit::from_symbol(u))
        .map(Unit::factor)
        // CDF epochs are nanoseconds unless stated otherwise.
        .unwrap_or(1e-9)
}

/// Epochs measured from J2000.0 (TT).
fn epochs_from_offsets(values: impl IntoIterator<Item = f64>, scale: f64) -> Vec<Epoch> {
    let anchor = j2000_tt();
    values
        .into_iter()
        .map(|v| anchor + Duration::from_seconds(v * scale))
        .collect()
}

fn decode_rfs(path: &Path, cdf: &CdfArchive) -> Result<(Array2<f64>, Metadata), Error> {
    let descriptor = cdf.attr("Descriptor");
    let short = descriptor
        .split('>')
        .next()
        .unwrap_or_default();
    if short.len() <= 4 {
        return Err(decode_error(
            path,
            format!("cannot derive the receiver from descriptor {descriptor:?}"),
        ));
    }
    let detector = short[4..].to_lowercase();

    let epoch_var = cdf.var(path, &format!("epoch_{detector}_auto_averages_ch0_V1V2"))?;
    let data_var = cdf.var(
        path,
        &format!("psp_fld_l2_rfs_{detector}_auto_averages_ch0_V1V2"),
    )?;
    let freq_var = cdf.var(path, &format!("frequency_{detector}_auto_averages_ch0_V1V2"))?;

    let times = epochs_from_offsets(epoch_var.values.iter().copied(), epoch_scale(epoch_var));
    if times.is_empty() {
        return Err(decode_error(path, "empty epoch variable"));
    }

    // Frequencies are repeated per record; every row is the same axis.
    let freq_values: Vec<f64> = match freq_var.values.ndim() {
        1 => freq_var.values.iter().copied().collect(),
        2 => freq_var
            .values
            .index_axis(ndarray::Axis(0), 0)
            .iter()
            .copied()
            .collect(),
        n => {
            return Err(decode_error(
                path,
                format!("frequency variable has {n} dimensions"),
            ))
        }
    };
    let freqs = Quantity::new(freq_values, Unit::Hz);
    let wavelength = FreqRange::new(
        freqs.min().ok_or_else(|| decode_error(path, "empty frequency variable"))?,
        freqs.max().expect("min existed"),
        Unit::Hz,
    );

    // Stored time-major; transpose to frequency-major.
    let data = data_var
        .values
        .view()
        .into_dimensionality::<ndarray::Ix2>()
        .map_err(|_| decode_error(path, "spectral variable is not 2D"))?
        .t()
        .to_owned();

    let meta = Metadata {
        observatory: "PSP".to_string(),
        instrument: "FIELDS/RFS".to_string(),
        detector,
        start_time: times[0],
        end_time: times[times.len() - 1],
        wavelength,
        times: TimeAxis::Absolute(times),
        freqs,
        extra: Extra::Rfs {
            attrs: cdf.attrs.clone(),
        },
    };
    Ok((data, meta))
}

/// RPW HFR sensor codes as flown.
fn sensor_label(code: u8) -> Option<&'static str> {
    Some(match code {
        1 => "V1",
        2 => "V2",
        3 => "V3",
        4 => "V1-V2",
        5 => "V2-V3",
        6 => "V3-V1",
        7 => "B_MF",
        9 => "HF_V1-V2",
        10 => "HF_V2-V3",
        11 => "HF_V3-V1",
        _ => return None,
    })
}

const RPW_N_FREQS: usize = 321;
const RPW_FIRST_KHZ: f64 = 375.0;
const RPW_STEP_KHZ: f64 = 50.0;

fn decode_rpw(path: &Path, cdf: &CdfArchive) -> Result<Vec<(Array2<f64>, Metadata)>, Error> {
    let epoch_var = cdf.var(path, "EPOCH")?;
    let all_times = epochs_from_offsets(epoch_var.values.iter().copied(), epoch_scale(epoch_var));
    let all_freqs: Vec<f64> = cdf.var(path, "FREQUENCY")?.values.iter().copied().collect();
    let sweep_num: Vec<f64> = cdf.var(path, "SWEEP_NUM")?.values.iter().copied().collect();
    let agc = [
        cdf.var(path, "AGC1")?.values.iter().copied().collect::<Vec<f64>>(),
        cdf.var(path, "AGC2")?.values.iter().copied().collect::<Vec<f64>>(),
    ];
    let sensor_config = cdf
        .var(path, "SENSOR_CONFIG")?
        .values
        .view()
        .into_dimensionality::<ndarray::Ix2>()
        .map_err(|_| decode_error(path, "SENSOR_CONFIG is not 2D"))?
        .to_owned();

    let n_rec = all_times.len();
    if n_rec == 0 {
        return Err(decode_error(path, "empty EPOCH variable"));
    }
    for (name, len) in [
        ("FREQUENCY", all_freqs.len()),
        ("SWEEP_NUM", sweep_num.len()),
        ("AGC1", agc[0].len()),
        ("AGC2", agc[1].len()),
        ("SENSOR_CONFIG", sensor_config.nrows()),
    ] {
        if len != n_rec {
            return Err(decode_error(
                path,
                format!("{name} has {len} records, EPOCH has {n_rec}"),
            ));
        }
    }

    // A sweep starts at record 0 and wherever SWEEP_NUM changes.
    let mut sweep_starts = vec![0usize];
    sweep_starts.extend(
        sweep_num
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0] != w[1])
            .map(|(i, _)| i + 1),
    );
    let n_sweeps = sweep_starts.len();
    sweep_starts.push(n_rec);

    let mut specs = [
        Array2::from_elem((n_sweeps, RPW_N_FREQS), f64::NAN),
        Array2::from_elem((n_sweeps, RPW_N_FREQS), f64::NAN),
    ];
    let mut sensors = [
        Vec::with_capacity(n_sweeps),
        Vec::with_capacity(n_sweeps),
    ];
    let mut mid_times = Vec::with_capacity(n_sweeps);

    for (i, (&i0, &i1)) in sweep_starts.iter().tuple_windows().enumerate() {
        let ts = all_times[i0];
        let te = all_times[i1 - 1];
        mid_times.push(ts + Duration::from_seconds((te - ts).to_seconds() * 0.5));

        for k in i0..i1 {
            let f = all_freqs[k];
            let index = (f - RPW_FIRST_KHZ) / RPW_STEP_KHZ;
            if index < 0.0 || index as usize >= RPW_N_FREQS {
                return Err(decode_error(
                    path,
                    format!("frequency {f} kHz is outside the HFR band"),
                ));
            }
            let index = index as usize;
            specs[0][(i, index)] = agc[0][k];
            specs[1][(i, index)] = agc[1][k];
        }

        for channel in 0..2 {
            let code = sensor_config[(i0, channel)] as u8;
            let label = sensor_label(code).ok_or_else(|| {
                decode_error(path, format!("unknown sensor code {code}"))
            })?;
            sensors[channel].push(label.to_string());
        }
    }

    let freqs = Quantity::new(
        (0..RPW_N_FREQS)
            .map(|k| RPW_FIRST_KHZ + RPW_STEP_KHZ * k as f64)
            .collect(),
        Unit::KiloHz,
    );
    let wavelength = FreqRange::new(
        RPW_FIRST_KHZ,
        RPW_FIRST_KHZ + RPW_STEP_KHZ * (RPW_N_FREQS - 1) as f64,
        Unit::KiloHz,
    );

    // One spectrogram per AGC channel that measured anything.
    let mut out = vec![];
    for (channel, (spec, channel_sensors)) in
        specs.iter().zip(sensors.into_iter()).enumerate()
    {
        if !agc[channel].iter().any(|v| *v != 0.0) {
            continue;
        }
        let meta = Metadata {
            observatory: "SOLO".to_string(),
            instrument: "RPW".to_string(),
            detector: format!("RPW-AGC{}", channel + 1),
            start_time: mid_times[0],
            end_time: mid_times[mid_times.len() - 1],
            wavelength,
            times: TimeAxis::Absolute(mid_times.clone()),
            freqs: freqs.clone(),
            extra: Extra::Rpw {
                attrs: cdf.attrs.clone(),
                channel: channel as u8 + 1,
                sensor: channel_sensors.join(","),
            },
        };
        out.push((spec.t().to_owned(), meta));
    }
    if out.is_empty() {
        return Err(decode_error(path, "both AGC channels are empty"));
    }
    Ok(out)
}

/// Fail with a "no backend" error; installed as the default CDF reader.
pub(crate) fn no_backend(path: &Path) -> Result<CdfArchive, Error> {
    Err(Error::NoCdfBackend {
        path: path.to_path_buf(),
    })
}
