//! Energy level input and normalization
//!
//! Callers may report energy as a 1-10 number or as one of a small closed
//! set of labels. Both forms normalize to the same 1-10 ordinal scale at the
//! validation boundary; the raw union never reaches storage or aggregation.

use serde::{Deserialize, Serialize};

use crate::constants::ENERGY_FALLBACK_ORDINAL;

/// Energy reading as supplied on the wire: either numeric or a label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EnergyInput {
    Level(f64),
    Label(String),
}

impl EnergyInput {
    /// Normalize to the canonical 1-10 ordinal.
    ///
    /// Total and deterministic: numeric input clamps to `[1, 10]`,
    /// recognized labels map to fixed buckets, unrecognized labels fall back
    /// to the medium bucket.
    pub fn normalize(&self) -> u8 {
        match self {
            Self::Level(value) => {
                let rounded = value.round();
                if rounded.is_nan() {
                    ENERGY_FALLBACK_ORDINAL
                } else {
                    rounded.clamp(1.0, 10.0) as u8
                }
            }
            Self::Label(label) => match label.trim().to_ascii_lowercase().as_str() {
                "low" => 3,
                "medium" => 6,
                "high" => 9,
                "completed" => 10,
                _ => ENERGY_FALLBACK_ORDINAL,
            },
        }
    }
}

impl From<u8> for EnergyInput {
    fn from(level: u8) -> Self {
        Self::Level(f64::from(level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_map_to_fixed_buckets() {
        assert_eq!(EnergyInput::Label("low".into()).normalize(), 3);
        assert_eq!(EnergyInput::Label("medium".into()).normalize(), 6);
        assert_eq!(EnergyInput::Label("high".into()).normalize(), 9);
        assert_eq!(EnergyInput::Label("completed".into()).normalize(), 10);
    }

    #[test]
    fn labels_are_case_and_whitespace_insensitive() {
        assert_eq!(EnergyInput::Label(" High ".into()).normalize(), 9);
        assert_eq!(EnergyInput::Label("COMPLETED".into()).normalize(), 10);
    }

    #[test]
    fn unrecognized_labels_default_to_medium() {
        assert_eq!(EnergyInput::Label("wired".into()).normalize(), 6);
        assert_eq!(EnergyInput::Label("".into()).normalize(), 6);
    }

    #[test]
    fn numbers_clamp_to_ordinal_range() {
        assert_eq!(EnergyInput::Level(0.0).normalize(), 1);
        assert_eq!(EnergyInput::Level(-3.0).normalize(), 1);
        assert_eq!(EnergyInput::Level(7.4).normalize(), 7);
        assert_eq!(EnergyInput::Level(42.0).normalize(), 10);
        assert_eq!(EnergyInput::Level(f64::NAN).normalize(), 6);
    }

    #[test]
    fn normalization_is_idempotent_on_ordinals() {
        for level in 1..=10u8 {
            let normalized = EnergyInput::from(level).normalize();
            assert_eq!(normalized, level);
            assert_eq!(EnergyInput::from(normalized).normalize(), normalized);
        }
    }

    #[test]
    fn untagged_deserialization_accepts_both_forms() {
        let number: EnergyInput = serde_json::from_str("8").unwrap();
        assert_eq!(number.normalize(), 8);
        let label: EnergyInput = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(label.normalize(), 9);
    }
}
