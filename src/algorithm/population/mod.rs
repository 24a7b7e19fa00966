//! Cohort selection for research studies
//!
//! This module provides study definitions, derived variables and the
//! population stage that precedes measure aggregation.

pub mod definition;
pub mod statistics;
pub mod variables;

// Re-export commonly used items
pub use definition::{Cohort, StudyDefinition, StudyRun};
pub use statistics::{CohortStatistics, CohortStats};
pub use variables::{Variable, VariableKind};
