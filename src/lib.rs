//! Read heterogeneous solar radio instrument files into a uniform
//! spectrogram type.
//!
//! The [`read::Loader`] dispatches on file extension to a per-instrument
//! decoder (RSTN SRS records, WIND/WAVES IDL-sav, STEREO S/WAVES text,
//! e-CALLISTO/EOVSA FITS, PSP and Solar Orbiter CDF), resolves the decoded
//! data against a [`registry::Registry`] of instrument kinds, and hands back
//! [`spectrogram::Spectrogram`] values. Time-adjacent spectrograms can be
//! stitched together with [`join::join_many`].

pub mod error;
pub mod join;
pub mod meta;
pub mod read;
pub mod registry;
pub mod sources;
pub mod spectrogram;
pub mod time;
pub mod units;

pub use error::Error;
pub use join::{join_many, JoinOptions};
pub use meta::{Extra, Metadata};
pub use read::{CdfArchive, CdfReader, CdfVariable, Input, Loader, RemoteCache};
pub use registry::{Predicate, Registry};
pub use spectrogram::{NewTimes, Spectrogram};
pub use time::TimeAxis;
pub use units::{Dimension, FreqRange, Quantity, Unit};
