//! Just enough quantity support for spectrogram axes: frequency and time
//! values tagged with a unit, convertible within their own dimension and
//! compared after conversion to a common base.

use std::fmt::{self, Display};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Frequency,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Hz,
    KiloHz,
    MegaHz,
    GigaHz,
    Nanosecond,
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
}

impl Unit {
    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Hz | Unit::KiloHz | Unit::MegaHz | Unit::GigaHz => Dimension::Frequency,
            Unit::Nanosecond
            | Unit::Millisecond
            | Unit::Second
            | Unit::Minute
            | Unit::Hour
            | Unit::Day => Dimension::Time,
        }
    }

    /// The factor into the dimension's base unit (Hz for frequencies, seconds
    /// for times).
    pub fn factor(self) -> f64 {
        match self {
            Unit::Hz => 1.0,
            Unit::KiloHz => 1e3,
            Unit::MegaHz => 1e6,
            Unit::GigaHz => 1e9,
            Unit::Nanosecond => 1e-9,
            Unit::Millisecond => 1e-3,
            Unit::Second => 1.0,
            Unit::Minute => 60.0,
            Unit::Hour => 3600.0,
            Unit::Day => 86400.0,
        }
    }

    /// Parse a unit symbol as it appears in file metadata (e.g. a CDF `UNITS`
    /// variable attribute).
    pub fn from_symbol(symbol: &str) -> Option<Unit> {
        match symbol.trim() {
            "Hz" => Some(Unit::Hz),
            "kHz" | "khz" => Some(Unit::KiloHz),
            "MHz" => Some(Unit::MegaHz),
            "GHz" => Some(Unit::GigaHz),
            "ns" => Some(Unit::Nanosecond),
            "ms" => Some(Unit::Millisecond),
            "s" => Some(Unit::Second),
            "min" => Some(Unit::Minute),
            "h" => Some(Unit::Hour),
            "d" => Some(Unit::Day),
            _ => None,
        }
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Unit::Hz => "Hz",
            Unit::KiloHz => "kHz",
            Unit::MegaHz => "MHz",
            Unit::GigaHz => "GHz",
            Unit::Nanosecond => "ns",
            Unit::Millisecond => "ms",
            Unit::Second => "s",
            Unit::Minute => "min",
            Unit::Hour => "h",
            Unit::Day => "d",
        };
        write!(f, "{s}")
    }
}

/// A sequence of values carrying a physical unit.
#[derive(Debug, Clone)]
pub struct Quantity {
    values: Vec<f64>,
    unit: Unit,
}

impl Quantity {
    pub fn new(values: Vec<f64>, unit: Unit) -> Quantity {
        Quantity { values, unit }
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    /// The values expressed in the dimension's base unit.
    pub fn base_values(&self) -> Vec<f64> {
        let f = self.unit.factor();
        self.values.iter().map(|v| v * f).collect()
    }

    pub fn to_unit(&self, unit: Unit) -> Result<Quantity, Error> {
        if unit.dimension() != self.unit.dimension() {
            return Err(Error::IncompatibleUnits {
                from: self.unit,
                to: unit,
            });
        }
        let f = self.unit.factor() / unit.factor();
        Ok(Quantity {
            values: self.values.iter().map(|v| v * f).collect(),
            unit,
        })
    }
}

/// Quantities compare equal if they are the same dimension and element-wise
/// equal after conversion to the base unit.
impl PartialEq for Quantity {
    fn eq(&self, other: &Quantity) -> bool {
        self.unit.dimension() == other.unit.dimension()
            && self.len() == other.len()
            && self
                .base_values()
                .iter()
                .zip(other.base_values())
                .all(|(a, b)| *a == b)
    }
}

/// A min/max frequency pair with a physical unit (the `wavelength` range of a
/// spectrogram).
#[derive(Debug, Clone, Copy)]
pub struct FreqRange {
    pub min: f64,
    pub max: f64,
    pub unit: Unit,
}

impl FreqRange {
    pub fn new(min: f64, max: f64, unit: Unit) -> FreqRange {
        FreqRange { min, max, unit }
    }

    /// The min/max of a frequency axis.
    pub fn from_quantity(q: &Quantity) -> Option<FreqRange> {
        Some(FreqRange {
            min: q.min()?,
            max: q.max()?,
            unit: q.unit(),
        })
    }

    pub fn to_unit(&self, unit: Unit) -> Result<FreqRange, Error> {
        if unit.dimension() != self.unit.dimension() {
            return Err(Error::IncompatibleUnits {
                from: self.unit,
                to: unit,
            });
        }
        let f = self.unit.factor() / unit.factor();
        Ok(FreqRange {
            min: self.min * f,
            max: self.max * f,
            unit,
        })
    }
}

impl PartialEq for FreqRange {
    fn eq(&self, other: &FreqRange) -> bool {
        self.unit.dimension() == other.unit.dimension()
            && self.min * self.unit.factor() == other.min * other.unit.factor()
            && self.max * self.unit.factor() == other.max * other.unit.factor()
    }
}

impl Display for FreqRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} - {} {}", self.min, self.unit, self.max, self.unit)
    }
}
