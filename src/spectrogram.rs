//! The spectrogram value object.

use std::fmt::{self, Display};

use hifitime::Epoch;
use ndarray::Array2;

use crate::{
    error::Error,
    meta::{validate, Metadata},
    time::TimeAxis,
    units::{Dimension, FreqRange, Quantity},
};

/// A replacement time axis for [`Spectrogram::replace_times`]: either
/// absolute timestamps, or a quantity of durations re-using the current
/// anchor.
#[derive(Debug, Clone)]
pub enum NewTimes {
    Epochs(Vec<Epoch>),
    Offsets(Quantity),
}

/// A 2D intensity array (frequency-major, time-minor) with uniform metadata
/// and the registry kind it resolved to. Immutable apart from
/// [`replace_times`](Spectrogram::replace_times), which produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    kind: String,
    data: Array2<f64>,
    meta: Metadata,
}

impl Spectrogram {
    /// Build a spectrogram, validating the metadata against the data shape.
    pub fn new(kind: impl Into<String>, data: Array2<f64>, meta: Metadata) -> Result<Spectrogram, Error> {
        validate(&data, &meta)?;
        Ok(Spectrogram {
            kind: kind.into(),
            data,
            meta,
        })
    }

    /// The registry kind this spectrogram resolved to.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    pub fn observatory(&self) -> String {
        self.meta.observatory.to_uppercase()
    }

    pub fn instrument(&self) -> String {
        self.meta.instrument.to_uppercase()
    }

    pub fn detector(&self) -> String {
        self.meta.detector.to_uppercase()
    }

    pub fn start_time(&self) -> Epoch {
        self.meta.start_time
    }

    pub fn end_time(&self) -> Epoch {
        self.meta.end_time
    }

    pub fn times(&self) -> &TimeAxis {
        &self.meta.times
    }

    pub fn frequencies(&self) -> &Quantity {
        &self.meta.freqs
    }

    pub fn wavelength(&self) -> FreqRange {
        self.meta.wavelength
    }

    /// Replace the time axis with one of equal length, adjusting the start
    /// and end bounds to match.
    ///
    /// An absolute axis replaced by durations is re-anchored at its current
    /// first timestamp; a relative axis replaced by durations keeps its
    /// anchor and shifts the bounds by the change in the first and last
    /// offsets.
    pub fn replace_times(&self, new: NewTimes) -> Result<Spectrogram, Error> {
        let expected = self.meta.times.len();
        let mut out = self.clone();
        match new {
            NewTimes::Epochs(epochs) => {
                if epochs.len() != expected {
                    return Err(Error::TimeAxisLength {
                        expected,
                        got: epochs.len(),
                    });
                }
                // Infallible: the validated axis is non-empty and the
                // replacement has the same length.
                out.meta.start_time = *epochs.first().expect("axis is non-empty");
                out.meta.end_time = *epochs.last().expect("axis is non-empty");
                out.meta.times = TimeAxis::Absolute(epochs);
            }
            NewTimes::Offsets(q) => {
                if q.unit().dimension() != Dimension::Time {
                    return Err(Error::TimeAxisUnit { unit: q.unit() });
                }
                if q.len() != expected {
                    return Err(Error::TimeAxisLength {
                        expected,
                        got: q.len(),
                    });
                }
                let seconds = q.base_values();
                let offsets: Vec<hifitime::Duration> = seconds
                    .iter()
                    .map(|s| hifitime::Duration::from_seconds(*s))
                    .collect();
                match &self.meta.times {
                    TimeAxis::Absolute(current) => {
                        // Re-anchor at the current first timestamp.
                        let anchor = current[0];
                        let first = seconds[0];
                        let epochs: Vec<Epoch> = seconds
                            .iter()
                            .map(|s| anchor + hifitime::Duration::from_seconds(s - first))
                            .collect();
                        out.meta.start_time = epochs[0];
                        out.meta.end_time = epochs[epochs.len() - 1];
                        out.meta.times = TimeAxis::Absolute(epochs);
                    }
                    TimeAxis::Relative {
                        anchor,
                        offsets: current,
                    } => {
                        out.meta.start_time =
                            self.meta.start_time + (offsets[0] - current[0]);
                        out.meta.end_time = self.meta.end_time
                            + (offsets[offsets.len() - 1] - current[current.len() - 1]);
                        out.meta.times = TimeAxis::Relative {
                            anchor: *anchor,
                            offsets,
                        };
                    }
                }
            }
        }
        Ok(out)
    }
}

impl Display for Spectrogram {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<{} spectrogram: {} / {} / {}, {} to {}, {}, {} freqs x {} times>",
            self.kind,
            self.observatory(),
            self.instrument(),
            self.detector(),
            self.start_time(),
            self.end_time(),
            self.wavelength(),
            self.data.nrows(),
            self.data.ncols(),
        )
    }
}

#[cfg(test)]
mod tests {
    use hifitime::Duration;

    use super::*;
    use crate::{
        meta::Extra,
        units::Unit,
    };

    fn absolute_gram() -> Spectrogram {
        let start = Epoch::from_gregorian_utc_at_midnight(2020, 1, 1);
        let freqs = Quantity::new(vec![25.0, 50.0, 75.0], Unit::MegaHz);
        let meta = Metadata {
            observatory: "San Vito".to_string(),
            instrument: "RSTN".to_string(),
            detector: "RSTN".to_string(),
            start_time: start,
            end_time: start + Duration::from_seconds(3.0),
            wavelength: FreqRange::from_quantity(&freqs).unwrap(),
            times: TimeAxis::Absolute(
                (0..4)
                    .map(|i| start + Duration::from_seconds(i as f64))
                    .collect(),
            ),
            freqs,
            extra: Extra::None,
        };
        Spectrogram::new("rstn", Array2::zeros((3, 4)), meta).unwrap()
    }

    fn relative_gram() -> Spectrogram {
        let anchor = Epoch::from_gregorian_utc_at_midnight(2020, 1, 1);
        let freqs = Quantity::new(vec![25.0, 50.0], Unit::MegaHz);
        let offsets: Vec<Duration> =
            (0..4).map(|i| Duration::from_seconds(i as f64 * 60.0)).collect();
        let meta = Metadata {
            observatory: "Test".to_string(),
            instrument: "TEST".to_string(),
            detector: "TEST".to_string(),
            start_time: anchor,
            end_time: anchor + Duration::from_seconds(180.0),
            wavelength: FreqRange::from_quantity(&freqs).unwrap(),
            times: TimeAxis::Relative { anchor, offsets },
            freqs,
            extra: Extra::None,
        };
        Spectrogram::new("generic", Array2::zeros((2, 4)), meta).unwrap()
    }

    #[test]
    fn accessors_upper_case_identity_fields() {
        let g = absolute_gram();
        assert_eq!(g.observatory(), "SAN VITO");
        assert_eq!(g.instrument(), "RSTN");
    }

    #[test]
    fn mismatched_shape_rejected() {
        let g = absolute_gram();
        let meta = g.meta().clone();
        assert!(Spectrogram::new("rstn", Array2::zeros((3, 5)), meta).is_err());
    }

    #[test]
    fn replace_with_epochs_moves_bounds() {
        let g = absolute_gram();
        let new_start = Epoch::from_gregorian_utc_at_midnight(2021, 6, 1);
        let epochs: Vec<Epoch> = (0..4)
            .map(|i| new_start + Duration::from_seconds(i as f64 * 2.0))
            .collect();
        let replaced = g.replace_times(NewTimes::Epochs(epochs.clone())).unwrap();
        assert_eq!(replaced.start_time(), epochs[0]);
        assert_eq!(replaced.end_time(), epochs[3]);
        assert_eq!(replaced.times(), &TimeAxis::Absolute(epochs));
        // The original is untouched.
        assert_eq!(g.start_time(), Epoch::from_gregorian_utc_at_midnight(2020, 1, 1));
    }

    #[test]
    fn replace_absolute_with_offsets_reanchors() {
        let g = absolute_gram();
        let q = Quantity::new(vec![10.0, 20.0, 30.0, 40.0], Unit::Second);
        let replaced = g.replace_times(NewTimes::Offsets(q)).unwrap();
        // The first replacement value maps onto the current first timestamp.
        assert_eq!(replaced.start_time(), g.start_time());
        assert_eq!(replaced.end_time(), g.start_time() + Duration::from_seconds(30.0));
    }

    #[test]
    fn replace_relative_with_offsets_shifts_bounds() {
        let g = relative_gram();
        let q = Quantity::new(vec![1.0, 2.0, 3.0, 4.0], Unit::Minute);
        let replaced = g.replace_times(NewTimes::Offsets(q)).unwrap();
        assert_eq!(replaced.start_time(), g.start_time() + Duration::from_seconds(60.0));
        assert_eq!(replaced.end_time(), g.end_time() + Duration::from_seconds(60.0));
        match replaced.times() {
            TimeAxis::Relative { anchor, offsets } => {
                assert_eq!(*anchor, g.start_time());
                assert_eq!(offsets[0], Duration::from_seconds(60.0));
            }
            other => panic!("unexpected axis: {other:?}"),
        }
    }

    #[test]
    fn wrong_length_and_unit_rejected() {
        let g = absolute_gram();
        let err = g
            .replace_times(NewTimes::Offsets(Quantity::new(vec![1.0], Unit::Second)))
            .unwrap_err();
        assert!(matches!(err, Error::TimeAxisLength { expected: 4, got: 1 }));

        let err = g
            .replace_times(NewTimes::Offsets(Quantity::new(
                vec![1.0, 2.0, 3.0, 4.0],
                Unit::MegaHz,
            )))
            .unwrap_err();
        assert!(matches!(err, Error::TimeAxisUnit { unit: Unit::MegaHz }));
    }
}
