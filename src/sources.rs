//! Built-in spectrogram kinds and the metadata predicates that claim them.
//!
//! The string checks are deliberately exact and case-sensitive; they mirror
//! the identity fields the decoders write.

use ndarray::Array2;

use crate::{error::Error, meta::Metadata, registry::Registry};

pub const GENERIC: &str = "generic";
pub const CALLISTO: &str = "callisto";
pub const EOVSA: &str = "eovsa";
pub const RSTN: &str = "rstn";
pub const SWAVES: &str = "swaves";
pub const WAVES: &str = "waves";
pub const RFS: &str = "rfs";
pub const RPW: &str = "rpw";
pub const ILOFAR: &str = "ilofar";

fn is_callisto(_: &Array2<f64>, meta: &Metadata) -> bool {
    meta.instrument == "e-CALLISTO" || meta.detector == "e-CALLISTO"
}

fn is_eovsa(_: &Array2<f64>, meta: &Metadata) -> bool {
    meta.instrument == "EOVSA" || meta.detector == "EOVSA"
}

fn is_rstn(_: &Array2<f64>, meta: &Metadata) -> bool {
    meta.instrument == "RSTN"
}

fn is_swaves(_: &Array2<f64>, meta: &Metadata) -> bool {
    meta.instrument == "swaves"
}

fn is_waves(_: &Array2<f64>, meta: &Metadata) -> bool {
    meta.instrument == "WAVES"
}

fn is_rfs(_: &Array2<f64>, meta: &Metadata) -> bool {
    meta.observatory == "PSP"
        && meta.instrument == "FIELDS/RFS"
        && (meta.detector == "lfr" || meta.detector == "hfr")
}

fn is_rpw(_: &Array2<f64>, meta: &Metadata) -> bool {
    meta.instrument == "RPW"
}

// Mode 357 observations; there is no file decoder for these, the kind exists
// for in-memory data handed to the registry directly.
fn is_ilofar(_: &Array2<f64>, meta: &Metadata) -> bool {
    meta.instrument == "ILOFAR"
}

pub fn register_builtin(registry: &mut Registry) -> Result<(), Error> {
    registry.register(CALLISTO, is_callisto)?;
    registry.register(EOVSA, is_eovsa)?;
    registry.register(RSTN, is_rstn)?;
    registry.register(SWAVES, is_swaves)?;
    registry.register(WAVES, is_waves)?;
    registry.register(RFS, is_rfs)?;
    registry.register(RPW, is_rpw)?;
    registry.register(ILOFAR, is_ilofar)?;
    Ok(())
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

    fn metadata(observatory: &str, instrument: &str, detector: &str) -> Metadata {
        let start = Epoch::from_gregorian_utc_at_midnight(2020, 1, 1);
        let freqs = Quantity::new(vec![25.0, 50.0], Unit::MegaHz);
        Metadata {
            observatory: observatory.to_string(),
            instrument: instrument.to_string(),
            detector: detector.to_string(),
            start_time: start,
            end_time: start + Duration::from_seconds(1.0),
            wavelength: FreqRange::from_quantity(&freqs).unwrap(),
            times: TimeAxis::Absolute(vec![start, start + Duration::from_seconds(1.0)]),
            freqs,
            extra: Extra::None,
        }
    }

    #[test]
    fn each_family_claims_only_its_own_metadata() {
        let registry = Registry::builtin();
        let data = Array2::zeros((2, 2));
        let cases = [
            (metadata("Humain", "e-CALLISTO", "e-CALLISTO"), CALLISTO),
            (metadata("Owens Valley", "EOVSA", "EOVSA"), EOVSA),
            (metadata("San Vito", "RSTN", "RSTN"), RSTN),
            (metadata("STEREO A", "swaves", "lfr"), SWAVES),
            (metadata("WIND", "WAVES", "RAD1"), WAVES),
            (metadata("PSP", "FIELDS/RFS", "lfr"), RFS),
            (metadata("SOLO", "RPW", "HFR"), RPW),
            (metadata("Birr", "ILOFAR", "ILOFAR"), ILOFAR),
        ];
        for (meta, expected) in cases {
            assert_eq!(registry.resolve(&data, &meta).unwrap(), expected);
        }
    }

    #[test]
    fn rfs_needs_all_three_identity_fields() {
        let data = Array2::zeros((2, 2));
        assert!(!is_rfs(&data, &metadata("PSP", "FIELDS/RFS", "tds")));
        assert!(!is_rfs(&data, &metadata("WIND", "FIELDS/RFS", "hfr")));
        assert!(is_rfs(&data, &metadata("PSP", "FIELDS/RFS", "hfr")));
    }

    #[test]
    fn checks_are_case_sensitive() {
        let data = Array2::zeros((2, 2));
        assert!(!is_swaves(&data, &metadata("STEREO A", "SWAVES", "x")));
        assert!(!is_waves(&data, &metadata("WIND", "waves", "x")));
    }
}
