//! Algorithm implementations for research study workflows
//!
//! This module contains the measure aggregator, categorised variables and
//! the cohort selection stage that feeds them.

pub mod aggregate;
pub mod categorise;
pub mod population;

pub use aggregate::{check_attributes, compute, compute_with_config};
pub use categorise::{Categoriser, CategoryRule};
