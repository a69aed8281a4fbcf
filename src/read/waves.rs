//! Decoder for WIND/WAVES one-minute IDL-sav products (RAD1/RAD2).
//!
//! Each file holds one day as an `arrayb` variable of 256 frequency bins by
//! 1441 columns; the final column is the background spectrum that has
//! already been subtracted from the rest.

use std::path::Path;

use hifitime::Duration;
use ndarray::Array2;

use super::sav::read_sav;
use crate::{
    error::Error,
    meta::{Extra, Metadata},
    time::{parse_compact_date, TimeAxis},
    units::{FreqRange, Quantity, Unit},
};

const N_FREQS: usize = 256;
const N_MINUTES: usize = 1440;

/// The fixed 256-point linear frequency axis of a receiver.
fn receiver_for(path: &Path) -> Option<(&'static str, Quantity)> {
    let linspace = |lo: f64, hi: f64| {
        (0..N_FREQS)
            .map(|i| lo + (hi - lo) * i as f64 / (N_FREQS - 1) as f64)
            .collect()
    };
    match path.extension().and_then(|e| e.to_str()) {
        Some("R1" | "r1") => Some(("RAD1", Quantity::new(linspace(20.0, 1040.0), Unit::KiloHz))),
        Some("R2" | "r2") => Some(("RAD2", Quantity::new(linspace(1.075, 13.825), Unit::MegaHz))),
        _ => None,
    }
}

pub(crate) fn read(path: &Path) -> Result<(Array2<f64>, Metadata), Error> {
    let Some((receiver, freqs)) = receiver_for(path) else {
        return Err(Error::UnsupportedProduct {
            path: path.to_path_buf(),
            details: "expected a WIND/WAVES .R1 or .R2 file".to_string(),
        });
    };

    let sav = read_sav(path)?;
    let array = sav.variables.get("arrayb").ok_or_else(|| Error::Decode {
        path: path.to_path_buf(),
        details: "no \"arrayb\" variable".to_string(),
    })?;
    if array.dims != [N_FREQS, N_MINUTES + 1] {
        return Err(Error::Decode {
            path: path.to_path_buf(),
            details: format!(
                "expected \"arrayb\" to be {N_FREQS} x {}, found {:?}",
                N_MINUTES + 1,
                array.dims
            ),
        });
    }
    let full = Array2::from_shape_vec((N_FREQS, N_MINUTES + 1), array.values.clone())?;
    let background = full.column(N_MINUTES).to_vec();
    let data = full.slice(ndarray::s![.., ..N_MINUTES]).to_owned();

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let start_time = parse_compact_date(stem)?;
    // One sample per minute, stamped mid-minute, covering the whole day.
    let offsets: Vec<Duration> = (0..N_MINUTES)
        .map(|i| Duration::from_seconds((i * 60 + 30) as f64))
        .collect();
    let end_time = start_time + Duration::from_seconds(86399.0);

    let wavelength = FreqRange::new(
        freqs.first().expect("axis is non-empty"),
        freqs.last().expect("axis is non-empty"),
        freqs.unit(),
    );
    let meta = Metadata {
        observatory: "WIND".to_string(),
        instrument: "WAVES".to_string(),
        detector: receiver.to_string(),
        start_time,
        end_time,
        wavelength,
        times: TimeAxis::Relative {
            anchor: start_time,
            offsets,
        },
        freqs,
        extra: Extra::Waves {
            receiver: receiver.to_string(),
            background,
        },
    };
    Ok((data, meta))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn receivers_have_the_documented_frequency_spans() {
        let (name, freqs) = receiver_for(Path::new("19981101.R1")).unwrap();
        assert_eq!(name, "RAD1");
        assert_eq!(freqs.unit(), Unit::KiloHz);
        assert_abs_diff_eq!(freqs.first().unwrap(), 20.0);
        assert_abs_diff_eq!(freqs.last().unwrap(), 1040.0);
        assert_abs_diff_eq!(freqs.values()[1] - freqs.values()[0], 4.0);

        let (name, freqs) = receiver_for(Path::new("19981101.R2")).unwrap();
        assert_eq!(name, "RAD2");
        assert_eq!(freqs.unit(), Unit::MegaHz);
        assert_abs_diff_eq!(freqs.first().unwrap(), 1.075);
        assert_abs_diff_eq!(freqs.last().unwrap(), 13.825);

        assert!(receiver_for(Path::new("19981101.R3")).is_none());
    }
}
