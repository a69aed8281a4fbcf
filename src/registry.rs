//! Open registry mapping metadata to spectrogram kinds.
//!
//! Decoders produce a data/metadata pair without deciding what kind of
//! spectrogram it is; the registry's predicates make that decision, so new
//! kinds can be added without touching the ingestion code.

use log::debug;
use ndarray::Array2;

use crate::{error::Error, meta::Metadata, sources, spectrogram::Spectrogram};

/// Decides whether a data/metadata pair belongs to a kind. Predicates of
/// registered kinds must be mutually disjoint.
pub type Predicate = fn(&Array2<f64>, &Metadata) -> bool;

pub struct Registry {
    entries: Vec<(String, Predicate)>,
    default_kind: Option<String>,
}

impl Registry {
    /// An empty registry with no default kind.
    pub fn empty() -> Registry {
        Registry {
            entries: vec![],
            default_kind: None,
        }
    }

    /// The registry used by the loader: every built-in instrument kind, with
    /// the generic kind as the fallback for unrecognised metadata.
    pub fn builtin() -> Registry {
        let mut registry = Registry::empty();
        sources::register_builtin(&mut registry)
            .expect("built-in kind ids are distinct");
        registry.set_default_kind(sources::GENERIC);
        registry
    }

    /// Register a kind. Fails if the id is already taken.
    pub fn register(&mut self, kind: impl Into<String>, predicate: Predicate) -> Result<(), Error> {
        let kind = kind.into();
        if self.entries.iter().any(|(k, _)| *k == kind) {
            return Err(Error::DuplicateKind(kind));
        }
        self.entries.push((kind, predicate));
        Ok(())
    }

    /// The kind to fall back on when no predicate matches.
    pub fn set_default_kind(&mut self, kind: impl Into<String>) {
        self.default_kind = Some(kind.into());
    }

    /// Find the single kind whose predicate accepts this pair.
    pub fn resolve(&self, data: &Array2<f64>, meta: &Metadata) -> Result<&str, Error> {
        let matches: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, predicate)| predicate(data, meta))
            .map(|(kind, _)| kind.as_str())
            .collect();
        match matches.as_slice() {
            [] => match &self.default_kind {
                Some(default) => {
                    debug!(
                        "no kind matched instrument {:?}; using the default kind {default:?}",
                        meta.instrument
                    );
                    Ok(default)
                }
                None => Err(Error::NoMatch),
            },
            [kind] => Ok(*kind),
            many => Err(Error::AmbiguousMatch {
                kinds: many.iter().map(|k| k.to_string()).collect(),
            }),
        }
    }

    /// Resolve the kind and build the spectrogram in one step.
    pub fn construct(&self, data: Array2<f64>, meta: Metadata) -> Result<Spectrogram, Error> {
        let kind = self.resolve(&data, &meta)?.to_string();
        Spectrogram::new(kind, data, meta)
    }
}

#[cfg(test)]
mod tests {
    use hifitime::{Duration, Epoch};

    use super::*;
    use crate::{
        meta::Extra,
        time::TimeAxis,
        units::{FreqRange, Quantity, Unit},
    };

    fn metadata_for(instrument: &str) -> Metadata {
        let start = Epoch::from_gregorian_utc_at_midnight(2020, 1, 1);
        let freqs = Quantity::new(vec![25.0, 50.0], Unit::MegaHz);
        Metadata {
            observatory: "Test".to_string(),
            instrument: instrument.to_string(),
            detector: instrument.to_string(),
            start_time: start,
            end_time: start + Duration::from_seconds(1.0),
            wavelength: FreqRange::from_quantity(&freqs).unwrap(),
            times: TimeAxis::Absolute(vec![start, start + Duration::from_seconds(1.0)]),
            freqs,
            extra: Extra::None,
        }
    }

    fn is_alpha(_: &Array2<f64>, meta: &Metadata) -> bool {
        meta.instrument == "ALPHA"
    }

    fn is_alpha_too(_: &Array2<f64>, meta: &Metadata) -> bool {
        meta.instrument == "ALPHA"
    }

    #[test]
    fn single_match_resolves() {
        let mut registry = Registry::empty();
        registry.register("alpha", is_alpha).unwrap();
        let data = Array2::zeros((2, 2));
        assert_eq!(registry.resolve(&data, &metadata_for("ALPHA")).unwrap(), "alpha");
    }

    #[test]
    fn no_match_without_default_is_an_error() {
        let mut registry = Registry::empty();
        registry.register("alpha", is_alpha).unwrap();
        let data = Array2::zeros((2, 2));
        assert!(matches!(
            registry.resolve(&data, &metadata_for("BETA")),
            Err(Error::NoMatch)
        ));
    }

    #[test]
    fn no_match_with_default_falls_back() {
        let mut registry = Registry::empty();
        registry.register("alpha", is_alpha).unwrap();
        registry.set_default_kind("generic");
        let data = Array2::zeros((2, 2));
        assert_eq!(registry.resolve(&data, &metadata_for("BETA")).unwrap(), "generic");
    }

    #[test]
    fn overlapping_predicates_are_ambiguous() {
        let mut registry = Registry::empty();
        registry.register("alpha", is_alpha).unwrap();
        registry.register("alpha2", is_alpha_too).unwrap();
        let data = Array2::zeros((2, 2));
        match registry.resolve(&data, &metadata_for("ALPHA")) {
            Err(Error::AmbiguousMatch { kinds }) => {
                assert_eq!(kinds, vec!["alpha".to_string(), "alpha2".to_string()]);
            }
            other => panic!("unexpected resolution: {other:?}"),
        }
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut registry = Registry::empty();
        registry.register("alpha", is_alpha).unwrap();
        assert!(matches!(
            registry.register("alpha", is_alpha_too),
            Err(Error::DuplicateKind(_))
        ));
    }

    #[test]
    fn builtin_registry_defaults_to_generic() {
        let registry = Registry::builtin();
        let data = Array2::zeros((2, 2));
        assert_eq!(
            registry.resolve(&data, &metadata_for("SOMETHING ELSE")).unwrap(),
            "generic"
        );
    }
}
