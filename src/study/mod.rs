//! Built-in study definitions
//!
//! The cohorts and measures of the deprivation and migration status study:
//! cardiovascular and mental-health outcomes, diabetes, and respiratory
//! disease, each reported by IMD quintile and by migration status, plus a
//! measure-free table of baseline characteristics.

pub mod cardiovascular;
pub mod common;
pub mod diabetes;
pub mod respiratory;
pub mod static_characteristics;

pub use cardiovascular::cardiovascular_mental_health;
pub use diabetes::diabetes;
pub use respiratory::respiratory;
pub use static_characteristics::static_characteristics;

use crate::algorithm::population::StudyDefinition;

/// Names accepted by [`builtin`]
pub const BUILTIN_STUDIES: [&str; 4] = [
    "cardiovascular_mental_health",
    "diabetes",
    "respiratory",
    "static_characteristics",
];

/// Look up a built-in study by name or short alias
#[must_use]
pub fn builtin(name: &str) -> Option<StudyDefinition> {
    match name {
        "cardiovascular_mental_health" | "cvd" => Some(cardiovascular_mental_health()),
        "diabetes" | "dm" => Some(diabetes()),
        "respiratory" | "resp" => Some(respiratory()),
        "static_characteristics" | "static" => Some(static_characteristics()),
        _ => None,
    }
}
