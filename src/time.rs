//! Time axes and the small set of calendar formats that appear in instrument
//! file headers.

use hifitime::{Duration, Epoch};

use crate::error::Error;

/// The time axis of a spectrogram: either absolute timestamps, or offsets
/// anchored to an absolute start.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeAxis {
    Absolute(Vec<Epoch>),
    Relative { anchor: Epoch, offsets: Vec<Duration> },
}

impl TimeAxis {
    pub fn len(&self) -> usize {
        match self {
            TimeAxis::Absolute(t) => t.len(),
            TimeAxis::Relative { offsets, .. } => offsets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> Option<Epoch> {
        match self {
            TimeAxis::Absolute(t) => t.first().copied(),
            TimeAxis::Relative { anchor, offsets } => offsets.first().map(|o| *anchor + *o),
        }
    }

    pub fn last(&self) -> Option<Epoch> {
        match self {
            TimeAxis::Absolute(t) => t.last().copied(),
            TimeAxis::Relative { anchor, offsets } => offsets.last().map(|o| *anchor + *o),
        }
    }

    /// Materialise the axis as absolute timestamps.
    pub fn epochs(&self) -> Vec<Epoch> {
        match self {
            TimeAxis::Absolute(t) => t.clone(),
            TimeAxis::Relative { anchor, offsets } => {
                offsets.iter().map(|o| *anchor + *o).collect()
            }
        }
    }
}

/// J2000.0 in the TT time scale, i.e. 2000-01-01T12:00:00 TT. TT was 64.184 s
/// ahead of UTC at that date (32.184 s TAI offset plus 32 leap seconds).
pub fn j2000_tt() -> Epoch {
    Epoch::from_gregorian_utc(2000, 1, 1, 11, 58, 55, 816_000_000)
}

/// Parse a compact `YYYYMMDD` date (as used in file names) into midnight UTC.
pub fn parse_compact_date(s: &str) -> Result<Epoch, Error> {
    let bad = || Error::Timestamp(s.to_string());
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let year: i32 = s[0..4].parse().map_err(|_| bad())?;
    let month: u8 = s[4..6].parse().map_err(|_| bad())?;
    let day: u8 = s[6..8].parse().map_err(|_| bad())?;
    Epoch::maybe_from_gregorian_utc(year, month, day, 0, 0, 0, 0).map_err(|_| bad())
}

/// Parse the timestamp formats found in instrument headers:
/// `YYYY-MM-DDTHH:MM:SS[.sss]`, `YYYY/MM/DD HH:MM:SS[.sss]` and mixtures
/// thereof, plus bare dates.
pub fn parse_timestamp(s: &str) -> Result<Epoch, Error> {
    let bad = || Error::Timestamp(s.to_string());
    let s = s.trim();
    let (date, time) = match s.split_once(['T', ' ']) {
        Some((d, t)) => (d, Some(t.trim())),
        None => (s, None),
    };

    let mut date_parts = date.split(['-', '/']);
    let year: i32 = date_parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let month: u8 = date_parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let day: u8 = date_parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    if date_parts.next().is_some() {
        return Err(bad());
    }

    let (hour, minute, second, nanos) = match time {
        None | Some("") => (0, 0, 0, 0),
        Some(t) => {
            let mut time_parts = t.split(':');
            let hour: u8 = time_parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
            let minute: u8 = time_parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
            let sec_str = time_parts.next().unwrap_or("0");
            if time_parts.next().is_some() {
                return Err(bad());
            }
            let sec: f64 = sec_str.parse().map_err(|_| bad())?;
            if !(0.0..60.0).contains(&sec) {
                return Err(bad());
            }
            let whole = sec.floor();
            let nanos = ((sec - whole) * 1e9).round() as u32;
            (hour, minute, whole as u8, nanos)
        }
    };

    Epoch::maybe_from_gregorian_utc(year, month, day, hour, minute, second, nanos)
        .map_err(|_| bad())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_and_slashed_formats() {
        let a = parse_timestamp("2020-01-01T06:17:38").unwrap();
        let b = parse_timestamp("2020/01/01 06:17:38").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, Epoch::from_gregorian_utc(2020, 1, 1, 6, 17, 38, 0));
    }

    #[test]
    fn fractional_seconds() {
        let t = parse_timestamp("2021-02-13 15:41:20.999").unwrap();
        assert_eq!(
            t,
            Epoch::from_gregorian_utc(2021, 2, 13, 15, 41, 20, 999_000_000)
        );
    }

    #[test]
    fn bare_date_is_midnight() {
        assert_eq!(
            parse_timestamp("2019/10/05").unwrap(),
            Epoch::from_gregorian_utc_at_midnight(2019, 10, 5)
        );
    }

    #[test]
    fn compact_date() {
        assert_eq!(
            parse_compact_date("20201128").unwrap(),
            Epoch::from_gregorian_utc_at_midnight(2020, 11, 28)
        );
        assert!(parse_compact_date("2020112").is_err());
        assert!(parse_compact_date("2020-1-1").is_err());
    }

    #[test]
    fn out_of_range_rejected() {
        assert!(parse_timestamp("2020-01-01 24:00:00").is_err());
        assert!(parse_timestamp("2020-13-01").is_err());
    }

    #[test]
    fn relative_axis_materialisation() {
        let anchor = Epoch::from_gregorian_utc_at_midnight(2020, 1, 1);
        let axis = TimeAxis::Relative {
            anchor,
            offsets: (0..3).map(|i| Duration::from_seconds(i as f64 * 60.0)).collect(),
        };
        assert_eq!(axis.len(), 3);
        assert_eq!(axis.first().unwrap(), anchor);
        assert_eq!(axis.last().unwrap(), anchor + Duration::from_seconds(120.0));
        assert_eq!(axis.epochs()[1], anchor + Duration::from_seconds(60.0));
    }
}
