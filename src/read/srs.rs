//! Decoder for RSTN spectrograph SRS files: a stream of fixed 826-byte
//! records, each one sweep over the two analyser bands.

use std::{io::Read, path::Path};

use flate2::read::GzDecoder;
use hifitime::Epoch;
use lazy_static::lazy_static;
use log::debug;
use ndarray::Array2;

use crate::{
    error::Error,
    meta::{Extra, Metadata},
    time::TimeAxis,
    units::{FreqRange, Quantity, Unit},
};

/// One 826-byte record: a six-field timestamp, the site and band count, two
/// five-field band headers, then 401 intensity bytes per band.
pub(crate) const RECORD_LEN: usize = 826;
const BAND_LEN: usize = 401;

lazy_static! {
    static ref SITES: Vec<(u8, &'static str)> = vec![
        (1, "Palehua"),
        (2, "Holloman"),
        (3, "Learmonth"),
        (4, "San Vito"),
    ];
}

struct Record {
    time: Epoch,
    site: u8,
    /// Both bands' samples, A-band first.
    spectrum: [f64; 2 * BAND_LEN],
}

fn decode_record(path: &Path, bytes: &[u8]) -> Result<Record, Error> {
    let &[yy, month, day, hour, minute, second, site, _num_bands] = &bytes[..8] else {
        unreachable!("record is {RECORD_LEN} bytes");
    };
    // Two-digit years; the earliest files are from 2000.
    let time = Epoch::maybe_from_gregorian_utc(
        2000 + i32::from(yy),
        month,
        day,
        hour,
        minute,
        second,
        0,
    )
    .map_err(|_| Error::Decode {
        path: path.to_path_buf(),
        details: format!(
            "record timestamp {yy:02}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02} is invalid"
        ),
    })?;

    // The band headers (start/end frequency, byte count, analyser reference
    // and attenuation) are not needed; the frequency axes are fixed.
    let mut spectrum = [0.0; 2 * BAND_LEN];
    for (out, raw) in spectrum.iter_mut().zip(&bytes[24..24 + 2 * BAND_LEN]) {
        *out = f64::from(*raw);
    }
    Ok(Record {
        time,
        site,
        spectrum,
    })
}

/// The fixed frequency axis: 401 points over 25-75 MHz (A band) stacked with
/// 401 points over 75-180 MHz (B band).
fn frequency_axis() -> Quantity {
    let band_a = (1..=BAND_LEN).map(|n| 25.0 + 50.0 * (n - 1) as f64 / 400.0);
    let band_b = (1..=BAND_LEN).map(|n| 75.0 + 105.0 * (n - 1) as f64 / 400.0);
    Quantity::new(band_a.chain(band_b).collect(), Unit::MegaHz)
}

pub(crate) fn read(path: &Path) -> Result<(Array2<f64>, Metadata), Error> {
    let mut bytes = vec![];
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        GzDecoder::new(std::fs::File::open(path)?).read_to_end(&mut bytes)?;
    } else {
        std::fs::File::open(path)?.read_to_end(&mut bytes)?;
    }

    if bytes.is_empty() || bytes.len() % RECORD_LEN != 0 {
        return Err(Error::Decode {
            path: path.to_path_buf(),
            details: format!(
                "file length {} is not a positive multiple of the {RECORD_LEN}-byte record size",
                bytes.len()
            ),
        });
    }

    let records = bytes
        .chunks_exact(RECORD_LEN)
        .map(|chunk| decode_record(path, chunk))
        .collect::<Result<Vec<Record>, Error>>()?;
    debug!("{}: {} SRS records", path.display(), records.len());

    let site = records[0].site;
    let observatory = SITES
        .iter()
        .find(|(code, _)| *code == site)
        .map(|(_, name)| name.to_string())
        .ok_or_else(|| Error::Decode {
            path: path.to_path_buf(),
            details: format!("unknown site code {site}"),
        })?;

    // Frequency-major: one column per record.
    let mut data = Array2::zeros((2 * BAND_LEN, records.len()));
    for (i, record) in records.iter().enumerate() {
        data.column_mut(i)
            .iter_mut()
            .zip(&record.spectrum)
            .for_each(|(out, v)| *out = *v);
    }

    let times: Vec<Epoch> = records.iter().map(|r| r.time).collect();
    let freqs = frequency_axis();
    let meta = Metadata {
        observatory,
        instrument: "RSTN".to_string(),
        detector: "RSTN".to_string(),
        start_time: times[0],
        end_time: times[times.len() - 1],
        wavelength: FreqRange::new(25.0, 180.0, Unit::MegaHz),
        times: TimeAxis::Absolute(times),
        freqs,
        extra: Extra::Srs { site_code: site },
    };
    Ok((data, meta))
}
