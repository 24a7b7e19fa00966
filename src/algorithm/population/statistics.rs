//! Cohort statistics and run summaries
//!
//! This module provides functions for describing a selected cohort and the
//! measures computed over it.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::models::{PatientRecord, Value};

use super::definition::StudyRun;

/// Functions for cohort statistics and summaries
pub struct CohortStatistics;

impl CohortStatistics {
    /// Count cohort members per value of each stratifying attribute
    #[must_use]
    pub fn calculate(records: &[PatientRecord], stratifiers: &[&str]) -> CohortStats {
        let mut strata: BTreeMap<String, BTreeMap<Value, usize>> = BTreeMap::new();
        for stratifier in stratifiers {
            let counts = strata.entry((*stratifier).to_string()).or_default();
            for record in records {
                let value = record.get(stratifier).cloned().unwrap_or_default();
                *counts.entry(value).or_insert(0) += 1;
            }
        }
        CohortStats {
            member_count: records.len(),
            strata,
        }
    }

    /// Generate a human readable summary of a study run
    #[must_use]
    pub fn generate_summary(run: &StudyRun) -> String {
        let stats = &run.stats;
        let mut summary = String::new();
        let _ = writeln!(summary, "Study Summary: {}", run.study);
        let _ = writeln!(summary, "  Index Date: {}", run.index_date);
        let _ = writeln!(summary, "  Cohort Members: {}", run.cohort_size);
        let _ = writeln!(summary, "  Excluded Records: {}", run.excluded);

        for (stratifier, counts) in &stats.strata {
            let _ = writeln!(summary, "\nDistribution by {stratifier}:");
            for (value, count) in counts {
                let percentage = if stats.member_count > 0 {
                    (*count as f64 / stats.member_count as f64) * 100.0
                } else {
                    0.0
                };
                let label = if value.is_null() {
                    "<missing>".to_string()
                } else {
                    value.to_string()
                };
                let _ = writeln!(summary, "  {label}: {count} ({percentage:.1}%)");
            }
        }

        let undefined = run.results.iter().filter(|r| r.rate.is_none()).count();
        let _ = writeln!(summary, "\nMeasure Rows: {}", run.results.len());
        if undefined > 0 {
            let _ = writeln!(summary, "  Rows With Undefined Rate: {undefined}");
        }

        summary
    }
}

/// Structure containing basic cohort statistics
#[derive(Debug, Clone, Default)]
pub struct CohortStats {
    /// Number of records in the cohort
    pub member_count: usize,
    /// Member counts per stratifier and value; missing values under `Value::Null`
    pub strata: BTreeMap<String, BTreeMap<Value, usize>>,
}
