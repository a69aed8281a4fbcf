//! Spectrogram metadata: the fields every instrument provides, plus a typed
//! per-family extension for the fields only some instruments provide.

use std::collections::HashMap;

use hifitime::Epoch;
use ndarray::Array2;

use crate::{
    error::Error,
    time::TimeAxis,
    units::{FreqRange, Quantity},
};

/// Instrument-family specific metadata. Each decoder produces exactly one
/// variant; in-memory spectrograms that have nothing extra use `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum Extra {
    None,

    /// Raw FITS header cards, in file order. Used by the e-CALLISTO and
    /// semi-standard decoders.
    Fits { header: Vec<(String, Option<String>)> },

    /// EOVSA synoptic FITS: header cards plus the polarisation keyword.
    Eovsa {
        header: Vec<(String, Option<String>)>,
        polarisation: Option<String>,
    },

    /// RSTN packed records: the numeric site code from the record header.
    Srs { site_code: u8 },

    /// STEREO/WAVES text products: the filename tokens and the per-frequency
    /// background row.
    Swaves {
        spacecraft: String,
        product: String,
        receiver: String,
        background: Vec<f64>,
    },

    /// WIND/WAVES IDL-sav products: the receiver and the per-frequency
    /// background column.
    Waves { receiver: String, background: Vec<f64> },

    /// PSP FIELDS/RFS CDF: the archive's global attributes.
    Rfs { attrs: HashMap<String, String> },

    /// Solar Orbiter RPW-HFR-SURV CDF: global attributes plus the AGC channel
    /// this spectrogram was extracted from and its sensor configuration.
    Rpw {
        attrs: HashMap<String, String>,
        channel: u8,
        sensor: String,
    },
}

impl Extra {
    /// Look up a global-attribute value for the CDF families.
    fn attr(&self, key: &str) -> Option<&str> {
        match self {
            Extra::Rfs { attrs } | Extra::Rpw { attrs, .. } => attrs.get(key).map(String::as_str),
            _ => None,
        }
    }
}

/// The uniform metadata attached to every spectrogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub observatory: String,
    pub instrument: String,
    pub detector: String,
    pub start_time: Epoch,
    pub end_time: Epoch,
    pub wavelength: FreqRange,
    pub times: TimeAxis,
    pub freqs: Quantity,
    pub extra: Extra,
}

impl Metadata {
    /// EOVSA polarisation keyword, if present.
    pub fn polarisation(&self) -> Option<&str> {
        match &self.extra {
            Extra::Eovsa { polarisation, .. } => polarisation.as_deref(),
            _ => None,
        }
    }

    /// Receiver name for the WAVES families.
    pub fn receiver(&self) -> Option<&str> {
        match &self.extra {
            Extra::Swaves { receiver, .. } | Extra::Waves { receiver, .. } => Some(receiver),
            _ => None,
        }
    }

    /// Per-frequency background spectrum for the WAVES families.
    pub fn background(&self) -> Option<&[f64]> {
        match &self.extra {
            Extra::Swaves { background, .. } | Extra::Waves { background, .. } => Some(background),
            _ => None,
        }
    }

    /// Processing level of a CDF product.
    pub fn level(&self) -> Option<&str> {
        self.extra.attr("LEVEL").or_else(|| self.extra.attr("Level"))
    }

    /// Data version of a CDF product.
    pub fn version(&self) -> Option<&str> {
        self.extra.attr("Data_version")
    }
}

/// Check that the metadata axes are usable and consistent with the data
/// shape. Every problem found is reported, not just the first.
pub fn validate(data: &Array2<f64>, meta: &Metadata) -> Result<(), Error> {
    let mut problems = vec![];
    if meta.freqs.is_empty() {
        problems.push("the frequency axis is empty".to_string());
    } else if meta.freqs.len() != data.nrows() {
        problems.push(format!(
            "the frequency axis has {} values but the data has {} rows",
            meta.freqs.len(),
            data.nrows()
        ));
    }
    if meta.times.is_empty() {
        problems.push("the time axis is empty".to_string());
    } else if meta.times.len() != data.ncols() {
        problems.push(format!(
            "the time axis has {} values but the data has {} columns",
            meta.times.len(),
            data.ncols()
        ));
    }
    if meta.end_time < meta.start_time {
        problems.push(format!(
            "the end time {} precedes the start time {}",
            meta.end_time, meta.start_time
        ));
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidMetadata { problems })
    }
}

#[cfg(test)]
mod tests {
    use hifitime::Duration;
    use ndarray::Array2;

    use super::*;
    use crate::units::Unit;

    fn simple_metadata(n_freqs: usize, n_times: usize) -> Metadata {
        let start = Epoch::from_gregorian_utc_at_midnight(2020, 1, 1);
        let freqs = Quantity::new((0..n_freqs).map(|i| 25.0 + i as f64).collect(), Unit::MegaHz);
        Metadata {
            observatory: "Test".to_string(),
            instrument: "TEST".to_string(),
            detector: "TEST".to_string(),
            start_time: start,
            end_time: start + Duration::from_seconds(n_times as f64),
            wavelength: FreqRange::from_quantity(&freqs).unwrap(),
            times: TimeAxis::Absolute(
                (0..n_times)
                    .map(|i| start + Duration::from_seconds(i as f64))
                    .collect(),
            ),
            freqs,
            extra: Extra::None,
        }
    }

    #[test]
    fn consistent_metadata_passes() {
        let data = Array2::zeros((4, 10));
        validate(&data, &simple_metadata(4, 10)).unwrap();
    }

    #[test]
    fn every_problem_is_reported() {
        let data = Array2::zeros((4, 10));
        let mut meta = simple_metadata(3, 7);
        std::mem::swap(&mut meta.start_time, &mut meta.end_time);
        let err = validate(&data, &meta).unwrap_err();
        match err {
            Error::InvalidMetadata { problems } => assert_eq!(problems.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_axes_rejected() {
        let data = Array2::zeros((0, 0));
        let mut meta = simple_metadata(1, 1);
        meta.freqs = Quantity::new(vec![], Unit::MegaHz);
        meta.times = TimeAxis::Absolute(vec![]);
        assert!(matches!(
            validate(&data, &meta),
            Err(Error::InvalidMetadata { .. })
        ));
    }

    #[test]
    fn family_projections() {
        let mut meta = simple_metadata(2, 2);
        assert_eq!(meta.receiver(), None);
        meta.extra = Extra::Waves {
            receiver: "RAD1".to_string(),
            background: vec![1.0, 2.0],
        };
        assert_eq!(meta.receiver(), Some("RAD1"));
        assert_eq!(meta.background(), Some(&[1.0, 2.0][..]));

        meta.extra = Extra::Rpw {
            attrs: HashMap::from([
                ("LEVEL".to_string(), "L2".to_string()),
                ("Data_version".to_string(), "02".to_string()),
            ]),
            channel: 1,
            sensor: "V1-V2".to_string(),
        };
        assert_eq!(meta.level(), Some("L2"));
        assert_eq!(meta.version(), Some("02"));
    }
}
