//! Joining time-adjacent spectrograms of the same instrument into one.

use hifitime::{Duration, Epoch};
use ndarray::{concatenate, s, Axis};

use crate::{error::Error, spectrogram::Spectrogram, time::TimeAxis};

#[derive(Debug, Clone, Copy)]
pub struct JoinOptions {
    /// Refuse to join across a gap larger than this. `None` joins across any
    /// gap.
    pub max_gap: Option<Duration>,
    /// Pad gaps with copies of the last column before the gap. When false,
    /// segments are simply concatenated and the gap stays visible only in the
    /// time axis.
    pub fill_gaps: bool,
}

impl Default for JoinOptions {
    fn default() -> JoinOptions {
        JoinOptions {
            max_gap: None,
            fill_gaps: true,
        }
    }
}

/// The sample cadence of a time axis: the median of the successive
/// differences.
fn infer_cadence(times: &[Epoch]) -> Result<Duration, Error> {
    if times.len() < 2 {
        return Err(Error::UnknownCadence);
    }
    let mut diffs: Vec<f64> = times.windows(2).map(|w| (w[1] - w[0]).to_seconds()).collect();
    diffs.sort_by(|a, b| a.total_cmp(b));
    let mid = diffs.len() / 2;
    let median = if diffs.len() % 2 == 0 {
        (diffs[mid - 1] + diffs[mid]) / 2.0
    } else {
        diffs[mid]
    };
    Ok(Duration::from_seconds(median))
}

/// Join spectrograms into a single one covering their combined time span.
///
/// The inputs are sorted by start time and must share an identical frequency
/// axis. Overlapping samples are dropped from the later segment; gaps are
/// either padded (see [`JoinOptions::fill_gaps`]) or rejected when they
/// exceed [`JoinOptions::max_gap`]. The result carries the first segment's
/// kind and metadata.
pub fn join_many(specs: Vec<Spectrogram>, options: &JoinOptions) -> Result<Spectrogram, Error> {
    let mut specs = specs;
    if specs.is_empty() {
        return Err(Error::NothingToJoin);
    }
    if specs.len() == 1 {
        return Ok(specs.remove(0));
    }
    specs.sort_by(|a, b| {
        a.start_time()
            .to_tai_seconds()
            .total_cmp(&b.start_time().to_tai_seconds())
    });

    let first = &specs[0];
    if specs[1..].iter().any(|s| s.frequencies() != first.frequencies()) {
        return Err(Error::FrequencyMismatch);
    }

    let mut data = first.data().clone();
    let mut times = first.times().epochs();

    for next in &specs[1..] {
        let cadence = infer_cadence(&times)?;
        // `times` holds at least two samples here, or infer_cadence failed.
        let acc_end = times[times.len() - 1];
        let next_times = next.times().epochs();
        let gap = next.start_time() - (acc_end + cadence);

        if gap.to_seconds() <= 0.0 {
            // Overlap (or exact adjacency): keep only the part of the next
            // segment strictly after what we already have.
            match next_times.iter().position(|t| *t > acc_end) {
                None => continue,
                Some(i) => {
                    data = concatenate(
                        Axis(1),
                        &[data.view(), next.data().slice(s![.., i..])],
                    )?;
                    times.extend_from_slice(&next_times[i..]);
                }
            }
        } else {
            if let Some(max_gap) = options.max_gap {
                if gap > max_gap {
                    return Err(Error::GapTooLarge { gap, max_gap });
                }
            }
            if options.fill_gaps {
                let n_fill = (gap.to_seconds() / cadence.to_seconds()).round() as usize;
                if n_fill > 0 {
                    let last_col = data.column(data.ncols() - 1).to_owned();
                    let fill = ndarray::Array2::from_shape_fn(
                        (data.nrows(), n_fill),
                        |(r, _)| last_col[r],
                    );
                    data = concatenate(Axis(1), &[data.view(), fill.view()])?;
                    for i in 1..=n_fill {
                        times.push(acc_end + Duration::from_seconds(cadence.to_seconds() * i as f64));
                    }
                }
            }
            data = concatenate(Axis(1), &[data.view(), next.data().view()])?;
            times.extend_from_slice(&next_times);
        }
    }

    let mut meta = first.meta().clone();
    meta.start_time = times[0];
    meta.end_time = times[times.len() - 1];
    meta.times = TimeAxis::Absolute(times);
    Spectrogram::new(first.kind().to_string(), data, meta)
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;
    use crate::{
        meta::{Extra, Metadata},
        units::{FreqRange, Quantity, Unit},
    };

    /// A 2-frequency segment with one-second cadence starting `offset`
    /// seconds into 2020-01-01, every sample set to `value`.
    fn segment(offset: f64, n_times: usize, value: f64) -> Spectrogram {
        segment_with_freqs(offset, n_times, value, vec![25.0, 50.0])
    }

    fn segment_with_freqs(offset: f64, n_times: usize, value: f64, freqs: Vec<f64>) -> Spectrogram {
        let start = Epoch::from_gregorian_utc_at_midnight(2020, 1, 1)
            + Duration::from_seconds(offset);
        let freqs = Quantity::new(freqs, Unit::MegaHz);
        let times: Vec<Epoch> = (0..n_times)
            .map(|i| start + Duration::from_seconds(i as f64))
            .collect();
        let meta = Metadata {
            observatory: "Test".to_string(),
            instrument: "TEST".to_string(),
            detector: "TEST".to_string(),
            start_time: times[0],
            end_time: times[n_times - 1],
            wavelength: FreqRange::from_quantity(&freqs).unwrap(),
            times: TimeAxis::Absolute(times),
            freqs: freqs.clone(),
            extra: Extra::None,
        };
        Spectrogram::new(
            "generic",
            Array2::from_elem((freqs.len(), n_times), value),
            meta,
        )
        .unwrap()
    }

    #[test]
    fn nothing_to_join() {
        assert!(matches!(
            join_many(vec![], &JoinOptions::default()),
            Err(Error::NothingToJoin)
        ));
    }

    #[test]
    fn single_segment_passes_through() {
        let s = segment(0.0, 4, 1.0);
        let joined = join_many(vec![s.clone()], &JoinOptions::default()).unwrap();
        assert_eq!(joined, s);
    }

    #[test]
    fn adjacent_segments_concatenate() {
        // Second segment starts exactly one cadence after the first ends.
        let a = segment(0.0, 4, 1.0);
        let b = segment(4.0, 4, 2.0);
        let joined = join_many(vec![a, b], &JoinOptions::default()).unwrap();
        assert_eq!(joined.data().ncols(), 8);
        assert_eq!(joined.times().len(), 8);
        assert_eq!(
            joined.end_time(),
            Epoch::from_gregorian_utc_at_midnight(2020, 1, 1) + Duration::from_seconds(7.0)
        );
        assert_eq!(joined.data()[(0, 3)], 1.0);
        assert_eq!(joined.data()[(0, 4)], 2.0);
    }

    #[test]
    fn inputs_are_sorted_by_start_time() {
        let a = segment(0.0, 4, 1.0);
        let b = segment(4.0, 4, 2.0);
        let joined = join_many(vec![b, a], &JoinOptions::default()).unwrap();
        assert_eq!(joined.data()[(0, 0)], 1.0);
        assert_eq!(joined.data()[(0, 7)], 2.0);
    }

    #[test]
    fn overlap_is_trimmed_from_the_later_segment() {
        // b starts two samples before a ends; those two columns are dropped.
        let a = segment(0.0, 4, 1.0);
        let b = segment(2.0, 4, 2.0);
        let joined = join_many(vec![a, b], &JoinOptions::default()).unwrap();
        assert_eq!(joined.data().ncols(), 6);
        assert_eq!(joined.data()[(0, 3)], 1.0);
        assert_eq!(joined.data()[(0, 4)], 2.0);
        let epochs = joined.times().epochs();
        assert!(epochs.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn fully_contained_segment_contributes_nothing() {
        let a = segment(0.0, 6, 1.0);
        let b = segment(1.0, 2, 2.0);
        let joined = join_many(vec![a, b], &JoinOptions::default()).unwrap();
        assert_eq!(joined.data().ncols(), 6);
        assert!(joined.data().iter().all(|v| *v == 1.0));
    }

    #[test]
    fn gap_is_filled_by_repeating_the_last_column() {
        // Three missing samples between the segments.
        let mut a = segment(0.0, 4, 1.0);
        a = {
            let mut data = a.data().clone();
            data[(0, 3)] = 7.0;
            Spectrogram::new(a.kind().to_string(), data, a.meta().clone()).unwrap()
        };
        let b = segment(7.0, 4, 2.0);
        let joined = join_many(vec![a, b], &JoinOptions::default()).unwrap();
        assert_eq!(joined.data().ncols(), 11);
        // The fill columns repeat the last real column.
        assert_eq!(joined.data()[(0, 4)], 7.0);
        assert_eq!(joined.data()[(0, 5)], 7.0);
        assert_eq!(joined.data()[(0, 6)], 7.0);
        assert_eq!(joined.data()[(0, 7)], 2.0);
        // The time axis is gapless at the one-second cadence.
        let epochs = joined.times().epochs();
        assert!(epochs
            .windows(2)
            .all(|w| ((w[1] - w[0]).to_seconds() - 1.0).abs() < 1e-9));
    }

    #[test]
    fn unfilled_gap_keeps_the_time_axis_sparse() {
        let a = segment(0.0, 4, 1.0);
        let b = segment(7.0, 4, 2.0);
        let options = JoinOptions {
            fill_gaps: false,
            ..JoinOptions::default()
        };
        let joined = join_many(vec![a, b], &options).unwrap();
        assert_eq!(joined.data().ncols(), 8);
        let epochs = joined.times().epochs();
        assert_eq!((epochs[4] - epochs[3]).to_seconds(), 4.0);
    }

    #[test]
    fn too_large_gap_is_rejected() {
        let a = segment(0.0, 4, 1.0);
        let b = segment(100.0, 4, 2.0);
        let options = JoinOptions {
            max_gap: Some(Duration::from_seconds(10.0)),
            ..JoinOptions::default()
        };
        let err = join_many(vec![a, b], &options).unwrap_err();
        assert!(err.to_string().starts_with("Too large gap"));
        assert!(matches!(err, Error::GapTooLarge { .. }));
    }

    #[test]
    fn zero_max_gap_still_allows_contiguous_segments() {
        // Exact adjacency has no gap, so even max_gap = 0 accepts it.
        let a = segment(0.0, 4, 1.0);
        let b = segment(4.0, 4, 2.0);
        let options = JoinOptions {
            max_gap: Some(Duration::from_seconds(0.0)),
            ..JoinOptions::default()
        };
        let joined = join_many(vec![a, b], &options).unwrap();
        assert_eq!(joined.data().ncols(), 8);
        assert_eq!(joined.data()[(0, 4)], 2.0);
    }

    #[test]
    fn gap_at_the_limit_is_allowed() {
        // Three missing samples: a gap of exactly three seconds.
        let a = segment(0.0, 4, 1.0);
        let b = segment(7.0, 4, 2.0);
        let at_limit = JoinOptions {
            max_gap: Some(Duration::from_seconds(3.0)),
            ..JoinOptions::default()
        };
        let joined = join_many(vec![a.clone(), b.clone()], &at_limit).unwrap();
        assert_eq!(joined.data().ncols(), 11);

        let below_limit = JoinOptions {
            max_gap: Some(Duration::from_seconds(2.9)),
            ..JoinOptions::default()
        };
        assert!(matches!(
            join_many(vec![a, b], &below_limit),
            Err(Error::GapTooLarge { .. })
        ));
    }

    #[test]
    fn differing_frequency_axes_are_rejected() {
        let a = segment(0.0, 4, 1.0);
        let b = segment_with_freqs(4.0, 4, 2.0, vec![25.0, 75.0]);
        let err = join_many(vec![a, b], &JoinOptions::default()).unwrap_err();
        assert!(err.to_string().contains("frequency axes"));
    }

    #[test]
    fn cadence_needs_two_samples() {
        let a = segment(0.0, 1, 1.0);
        let b = segment(5.0, 4, 2.0);
        assert!(matches!(
            join_many(vec![a, b], &JoinOptions::default()),
            Err(Error::UnknownCadence)
        ));
    }
}
