//! Decoder for STEREO S/WAVES daily text products.
//!
//! The layout is three blocks of whitespace-separated numbers: one row of
//! frequencies (kHz), one row of the already-subtracted background spectrum,
//! then one row per time sample whose first column is the minute offset from
//! midnight.

use std::path::Path;

use hifitime::Duration;
use itertools::Itertools;
use ndarray::Array2;

use crate::{
    error::Error,
    meta::{Extra, Metadata},
    time::{parse_compact_date, TimeAxis},
    units::{FreqRange, Quantity, Unit},
};

fn decode_error(path: &Path, details: impl Into<String>) -> Error {
    Error::Decode {
        path: path.to_path_buf(),
        details: details.into(),
    }
}

fn parse_row(path: &Path, line_no: usize, line: &str) -> Result<Vec<f64>, Error> {
    line.split_whitespace()
        .map(|tok| {
            tok.parse().map_err(|_| {
                decode_error(path, format!("line {line_no}: {tok:?} is not a number"))
            })
        })
        .collect()
}

pub(crate) fn read(path: &Path) -> Result<(Array2<f64>, Metadata), Error> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if !file_name.contains("swaves") {
        return Err(Error::UnsupportedProduct {
            path: path.to_path_buf(),
            details: "only S/WAVES .dat products are supported".to_string(),
        });
    }
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let Some((name, product, date, spacecraft, receiver)) =
        stem.split('_').collect_tuple()
    else {
        return Err(Error::UnsupportedProduct {
            path: path.to_path_buf(),
            details: format!(
                "expected a name_product_date_spacecraft_receiver file stem, got {stem:?}"
            ),
        });
    };
    let start_time = parse_compact_date(date)?;

    let contents = std::fs::read_to_string(path)?;
    let mut lines = contents.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

    let (n, freq_line) = lines
        .next()
        .ok_or_else(|| decode_error(path, "missing frequency row"))?;
    let freq_values = parse_row(path, n + 1, freq_line)?;
    let n_freqs = freq_values.len();
    if n_freqs == 0 {
        return Err(decode_error(path, "empty frequency row"));
    }

    let (n, bg_line) = lines
        .next()
        .ok_or_else(|| decode_error(path, "missing background row"))?;
    let background = parse_row(path, n + 1, bg_line)?;
    if background.len() != n_freqs {
        return Err(decode_error(
            path,
            format!(
                "background row has {} values but there are {n_freqs} frequencies",
                background.len()
            ),
        ));
    }

    let mut offsets = vec![];
    let mut rows = vec![];
    for (n, line) in lines {
        let row = parse_row(path, n + 1, line)?;
        if row.len() != n_freqs + 1 {
            return Err(decode_error(
                path,
                format!(
                    "line {}: expected a minute offset and {n_freqs} samples, got {} values",
                    n + 1,
                    row.len()
                ),
            ));
        }
        offsets.push(Duration::from_seconds(row[0] * 60.0));
        rows.extend_from_slice(&row[1..]);
    }
    if offsets.is_empty() {
        return Err(decode_error(path, "no time samples"));
    }

    // Rows are time-major on disk; transpose to frequency-major.
    let data = Array2::from_shape_vec((offsets.len(), n_freqs), rows)?
        .t()
        .to_owned();

    let freqs = Quantity::new(freq_values, Unit::KiloHz);
    let wavelength = FreqRange::new(
        freqs.first().expect("frequency row is non-empty"),
        freqs.last().expect("frequency row is non-empty"),
        Unit::KiloHz,
    );
    let last_offset = offsets[offsets.len() - 1];
    let meta = Metadata {
        observatory: format!("STEREO {}", spacecraft.to_uppercase()),
        instrument: name.to_string(),
        detector: receiver.to_string(),
        start_time,
        end_time: start_time + last_offset,
        wavelength,
        times: TimeAxis::Relative {
            anchor: start_time,
            offsets,
        },
        freqs,
        extra: Extra::Swaves {
            spacecraft: spacecraft.to_string(),
            product: product.to_string(),
            receiver: receiver.to_string(),
            background,
        },
    };
    Ok((data, meta))
}
