//! Decoders for the FITS-based products: e-CALLISTO, EOVSA synoptic spectra,
//! and the semi-standard layout (spectrum in the primary HDU, time and
//! frequency vectors in the first extension).

use std::path::Path;

use hifitime::{Duration, Epoch};
use log::debug;
use ndarray::Array2;

use super::fits::*;
use crate::{
    error::Error,
    meta::{Extra, Metadata},
    time::{parse_timestamp, TimeAxis},
    units::{FreqRange, Quantity, Unit},
};

/// Read a tagged FITS spectrogram, picking the product branch from the
/// primary header.
pub(crate) fn read(path: &Path) -> Result<(Array2<f64>, Metadata), Error> {
    let mut fptr = fits_open(path)?;
    let primary = fits_open_hdu(&mut fptr, path, 0)?;
    let header = fits_read_header_cards(&mut fptr, path)?;

    let content: Option<String> = fits_get_optional_key(&mut fptr, &primary, path, "CONTENT")?;
    let telescope: Option<String> = fits_get_optional_key(&mut fptr, &primary, path, "TELESCOP")?;

    if content.as_deref().is_some_and(|c| c.contains("e-CALLISTO")) {
        debug!("{} is an e-CALLISTO product", path.display());
        read_callisto(&mut fptr, path, primary, header)
    } else if telescope.as_deref() == Some("EOVSA") {
        debug!("{} is an EOVSA product", path.display());
        read_eovsa(&mut fptr, path, primary, header)
    } else {
        debug!("{} has no recognised product tag; trying the semi-standard layout", path.display());
        read_semi_standard(&mut fptr, path, primary, header, content)
    }
}

fn read_image(
    fptr: &mut fitsio::FitsFile,
    path: &Path,
    hdu: &fitsio::hdu::FitsHdu,
) -> Result<Array2<f64>, Error> {
    let shape = fits_get_image_size(hdu, path)?;
    if shape.len() != 2 {
        return Err(Error::Decode {
            path: path.to_path_buf(),
            details: format!("expected a 2D spectrum image, found {} axes", shape.len()),
        });
    }
    let (n_freqs, n_times) = (shape[0], shape[1]);
    let values: Vec<f64> = fits_get_image(fptr, hdu, path)?;
    Ok(Array2::from_shape_vec((n_freqs, n_times), values)?)
}

/// The first-extension TIME (seconds) and FREQUENCY (MHz) vectors of the
/// e-CALLISTO and semi-standard layouts.
fn read_axis_table(
    fptr: &mut fitsio::FitsFile,
    path: &Path,
) -> Result<(Vec<f64>, Vec<f64>), Error> {
    let ext = fits_open_hdu(fptr, path, 1)?;
    let times: Vec<f64> = fits_get_col(fptr, &ext, path, "TIME")?;
    let freqs: Vec<f64> = fits_get_col(fptr, &ext, path, "FREQUENCY")?;
    Ok((times, freqs))
}

/// Parse a DATE-END/TIME-END pair, recovering from out-of-range TIME-END
/// values like `24:00:00` by zeroing the hour and moving to the next day.
fn parse_end(date_end: &str, time_end: &str) -> Result<Epoch, Error> {
    match parse_timestamp(&format!("{date_end} {time_end}")) {
        Ok(end) => Ok(end),
        Err(_) => {
            let mut comps: Vec<&str> = time_end.split(':').collect();
            if comps.is_empty() {
                return Err(Error::Timestamp(time_end.to_string()));
            }
            comps[0] = "00";
            let fixed = comps.join(":");
            let date_offset = parse_timestamp(&format!("{date_end} {fixed}"))?;
            Ok(date_offset + Duration::from_days(1.0))
        }
    }
}

fn read_callisto(
    fptr: &mut fitsio::FitsFile,
    path: &Path,
    primary: fitsio::hdu::FitsHdu,
    header: Vec<(String, Option<String>)>,
) -> Result<(Array2<f64>, Metadata), Error> {
    let data = read_image(fptr, path, &primary)?;
    let observatory: String = fits_get_required_key(fptr, &primary, path, "INSTRUME")?;
    let date_obs: String = fits_get_required_key(fptr, &primary, path, "DATE-OBS")?;
    let time_obs: String = fits_get_required_key(fptr, &primary, path, "TIME-OBS")?;
    let date_end: String = fits_get_required_key(fptr, &primary, path, "DATE-END")?;
    let time_end: String = fits_get_required_key(fptr, &primary, path, "TIME-END")?;

    let start_time = parse_timestamp(&format!("{date_obs} {time_obs}"))?;
    let end_time = parse_end(&date_end, &time_end)?;

    let (time_offsets, freq_values) = read_axis_table(fptr, path)?;
    let freqs = Quantity::new(freq_values, Unit::MegaHz);
    let wavelength = FreqRange::from_quantity(&freqs).ok_or_else(|| Error::Decode {
        path: path.to_path_buf(),
        details: "empty FREQUENCY column".to_string(),
    })?;

    let meta = Metadata {
        observatory,
        instrument: "e-CALLISTO".to_string(),
        detector: "e-CALLISTO".to_string(),
        start_time,
        end_time,
        wavelength,
        times: TimeAxis::Relative {
            anchor: start_time,
            offsets: time_offsets.iter().map(|s| Duration::from_seconds(*s)).collect(),
        },
        freqs,
        extra: Extra::Fits { header },
    };
    Ok((data, meta))
}

fn read_eovsa(
    fptr: &mut fitsio::FitsFile,
    path: &Path,
    primary: fitsio::hdu::FitsHdu,
    header: Vec<(String, Option<String>)>,
) -> Result<(Array2<f64>, Metadata), Error> {
    let data = read_image(fptr, path, &primary)?;
    let date_obs: String = fits_get_required_key(fptr, &primary, path, "DATE_OBS")?;
    let date_end: String = fits_get_required_key(fptr, &primary, path, "DATE_END")?;
    let polarisation: Option<String> = fits_get_optional_key(fptr, &primary, path, "POLARIZA")?;

    let freq_ext = fits_open_hdu(fptr, path, 1)?;
    let sfreq: Vec<f64> = fits_get_col(fptr, &freq_ext, path, "sfreq")?;
    let time_ext = fits_open_hdu(fptr, path, 2)?;
    let mjd: Vec<f64> = fits_get_col(fptr, &time_ext, path, "mjd")?;
    let time_ms: Vec<f64> = fits_get_col(fptr, &time_ext, path, "time")?;
    if mjd.len() != time_ms.len() {
        return Err(Error::Decode {
            path: path.to_path_buf(),
            details: format!(
                "mjd and time columns disagree in length ({} vs {})",
                mjd.len(),
                time_ms.len()
            ),
        });
    }

    let times: Vec<Epoch> = mjd
        .iter()
        .zip(&time_ms)
        .map(|(d, ms)| Epoch::from_mjd_utc(d + ms / 1000.0 / 86400.0))
        .collect();
    let freqs = Quantity::new(sfreq, Unit::GigaHz);
    let wavelength = FreqRange::from_quantity(&freqs).ok_or_else(|| Error::Decode {
        path: path.to_path_buf(),
        details: "empty sfreq column".to_string(),
    })?;

    let meta = Metadata {
        observatory: "Owens Valley".to_string(),
        instrument: "EOVSA".to_string(),
        detector: "EOVSA".to_string(),
        start_time: parse_timestamp(&date_obs)?,
        end_time: parse_timestamp(&date_end)?,
        wavelength,
        times: TimeAxis::Absolute(times),
        freqs,
        extra: Extra::Eovsa {
            header,
            polarisation,
        },
    };
    Ok((data, meta))
}

fn read_semi_standard(
    fptr: &mut fitsio::FitsFile,
    path: &Path,
    primary: fitsio::hdu::FitsHdu,
    header: Vec<(String, Option<String>)>,
    content: Option<String>,
) -> Result<(Array2<f64>, Metadata), Error> {
    let data = read_image(fptr, path, &primary)?;
    let instrument: String =
        fits_get_optional_key(fptr, &primary, path, "INSTRUME")?.unwrap_or_default();
    let detector: String =
        fits_get_optional_key(fptr, &primary, path, "DETECTOR")?.unwrap_or_default();
    let date_obs: String = fits_get_required_key(fptr, &primary, path, "DATE-OBS")?;
    let time_obs: String = fits_get_required_key(fptr, &primary, path, "TIME-OBS")?;
    let date_end: String = fits_get_required_key(fptr, &primary, path, "DATE-END")?;
    let time_end: String = fits_get_required_key(fptr, &primary, path, "TIME-END")?;

    let start_time = parse_timestamp(&format!("{date_obs} {time_obs}"))?;
    let end_time = parse_timestamp(&format!("{date_end} {time_end}"))?;

    let (time_offsets, freq_values) = read_axis_table(fptr, path)?;
    let freqs = Quantity::new(freq_values, Unit::MegaHz);
    let wavelength = FreqRange::from_quantity(&freqs).ok_or_else(|| Error::Decode {
        path: path.to_path_buf(),
        details: "empty FREQUENCY column".to_string(),
    })?;

    // Some instruments only mark themselves in CONTENT.
    let (observatory, instrument, detector) =
        if content.as_deref().is_some_and(|c| c.contains("e-CALLISTO")) {
            (instrument, "e-CALLISTO".to_string(), "e-CALLISTO".to_string())
        } else {
            (instrument.clone(), instrument, detector)
        };

    let meta = Metadata {
        observatory,
        instrument,
        detector,
        start_time,
        end_time,
        wavelength,
        times: TimeAxis::Relative {
            anchor: start_time,
            offsets: time_offsets.iter().map(|s| Duration::from_seconds(*s)).collect(),
        },
        freqs,
        extra: Extra::Fits { header },
    };
    Ok((data, meta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_time_recovery_rolls_over_midnight() {
        let end = parse_end("2020/06/27", "24:00:00").unwrap();
        assert_eq!(end, Epoch::from_gregorian_utc_at_midnight(2020, 6, 28));

        let fine = parse_end("2020/06/27", "23:59:59").unwrap();
        assert_eq!(fine, Epoch::from_gregorian_utc(2020, 6, 27, 23, 59, 59, 0));
    }
}
