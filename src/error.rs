//! Everything that can go wrong while reading, resolving or joining
//! spectrograms.

use std::path::PathBuf;

use hifitime::Duration;
use thiserror::Error;

use crate::units::Unit;

#[derive(Debug, Error)]
pub enum Error {
    /// The file extension is not in the dispatch table at all.
    #[error("Extension {extension:?} of {} not supported", path.display())]
    UnsupportedExtension { path: PathBuf, extension: String },

    /// The extension was recognised, but no sub-format branch inside the
    /// decoder matched the file contents.
    #[error("{} is not a supported spectrogram product: {details}", path.display())]
    UnsupportedProduct { path: PathBuf, details: String },

    /// A format-specific structural assumption was violated.
    #[error("Could not decode {}: {details}", path.display())]
    Decode { path: PathBuf, details: String },

    #[error("Missing or unparsable FITS keyword {keyword:?} in {}", path.display())]
    FitsKeyword { path: PathBuf, keyword: String },

    #[error("Could not parse timestamp {0:?}")]
    Timestamp(String),

    #[error("Spectrogram metadata is invalid: {}", problems.join("; "))]
    InvalidMetadata { problems: Vec<String> },

    #[error("No registered spectrogram kind matches the metadata and no default kind is set")]
    NoMatch,

    #[error(
        "Multiple registered spectrogram kinds match the metadata: {}; \
         predicates must be disjoint",
        kinds.join(", ")
    )]
    AmbiguousMatch { kinds: Vec<String> },

    #[error("A spectrogram kind {0:?} is already registered")]
    DuplicateKind(String),

    #[error("Cannot join an empty list of spectrograms")]
    NothingToJoin,

    #[error("Cannot join spectrograms whose frequency axes differ")]
    FrequencyMismatch,

    #[error("At least two time samples are needed to infer the sample cadence")]
    UnknownCadence,

    #[error("Too large gap between spectrograms: {gap} exceeds the maximum of {max_gap}")]
    GapTooLarge { gap: Duration, max_gap: Duration },

    #[error("Replacement time axis has {got} values but the current axis has {expected}")]
    TimeAxisLength { expected: usize, got: usize },

    #[error("Replacement time axis must hold timestamps or time quantities, not {unit}")]
    TimeAxisUnit { unit: Unit },

    #[error("Cannot convert {from} to {to}: incompatible dimensions")]
    IncompatibleUnits { from: Unit, to: Unit },

    #[error("Did not find any files at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("No usable spectrograms were produced from the supplied inputs")]
    NoRecords,

    #[error("No remote cache is configured to fetch {0}")]
    NoRemoteCache(String),

    #[error("No CDF backend is configured to read {}", path.display())]
    NoCdfBackend { path: PathBuf },

    #[error(transparent)]
    Fits(#[from] fitsio::errors::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
