//! Study definitions and the two-stage study run
//!
//! Stage one derives the declared variables on every record, evaluates the
//! population criteria and keeps cohort members only. Stage two hands the
//! cohort to the aggregator, where each measure's denominator decides
//! eligibility within the cohort.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::algorithm::aggregate::compute_with_config;
use crate::config::AggregatorConfig;
use crate::error::{Result, StudyError};
use crate::filter::expr::Expr;
use crate::models::{MeasureDefinition, MeasureResult, PatientRecord, validate_definitions};

use super::statistics::{CohortStatistics, CohortStats};
use super::variables::Variable;

/// A complete study: cohort criteria, derived variables and measures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyDefinition {
    /// Study name, used in logs and output
    pub name: String,
    /// Reference date for all time-relative criteria
    pub index_date: NaiveDate,
    /// Cohort membership criteria
    pub population: Expr,
    /// Derived variables, evaluated in declaration order
    #[serde(default)]
    pub variables: Vec<Variable>,
    /// Measures computed over the cohort
    #[serde(default)]
    pub measures: Vec<MeasureDefinition>,
    /// Attributes tabulated over the cohort in addition to the group-by attributes
    #[serde(default)]
    pub covariates: Vec<String>,
}

/// Records that met the population criteria
#[derive(Debug, Clone)]
pub struct Cohort {
    /// Cohort members with derived variables and the population flag set
    pub members: Vec<PatientRecord>,
    /// Number of records that failed the population criteria
    pub excluded: usize,
}

/// Outcome of a study run
#[derive(Debug, Clone)]
pub struct StudyRun {
    pub study: String,
    pub index_date: NaiveDate,
    pub cohort_size: usize,
    pub excluded: usize,
    /// Cohort distribution over every stratifier
    pub stats: CohortStats,
    pub results: Vec<MeasureResult>,
}

impl StudyDefinition {
    /// Structural checks on criteria, variables and measures
    pub fn validate(&self, population_attribute: &str) -> Result<()> {
        self.population.validate()?;
        let mut names = HashSet::new();
        let mut covariates = HashSet::new();
        for covariate in &self.covariates {
            if covariate.trim().is_empty() || !covariates.insert(covariate.as_str()) {
                return Err(StudyError::InvalidExpression(format!(
                    "study '{}' has a blank or repeated covariate '{covariate}'",
                    self.name
                )));
            }
        }
        for variable in &self.variables {
            variable.validate()?;
            if variable.name == population_attribute {
                return Err(StudyError::InvalidExpression(format!(
                    "variable '{}' clashes with the population attribute",
                    variable.name
                )));
            }
            if !names.insert(variable.name.as_str()) {
                return Err(StudyError::InvalidExpression(format!(
                    "variable '{}' is declared more than once",
                    variable.name
                )));
            }
        }
        validate_definitions(&self.measures)
    }

    /// Distinct group-by attributes across all measures plus the covariates, sorted
    #[must_use]
    pub fn stratifiers(&self) -> Vec<&str> {
        self.measures
            .iter()
            .flat_map(|m| m.group_by.iter().map(String::as_str))
            .chain(self.covariates.iter().map(String::as_str))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Fail on the first member lacking a covariate
    fn check_covariates(&self, members: &[PatientRecord]) -> Result<()> {
        for covariate in &self.covariates {
            if let Some(record) = members.iter().find(|r| !r.has(covariate)) {
                return Err(StudyError::missing_attribute(
                    &self.name,
                    record.patient_id,
                    covariate,
                ));
            }
        }
        Ok(())
    }

    /// Set every declared variable on `record`
    pub fn derive(&self, record: &mut PatientRecord) -> Result<()> {
        for variable in &self.variables {
            let value = variable.evaluate(record)?;
            record.set(variable.name.clone(), value);
        }
        Ok(())
    }

    /// Whether a record with derived variables meets the population criteria
    pub fn is_member(&self, record: &PatientRecord, population_attribute: &str) -> Result<bool> {
        if let Some(attribute) = self
            .population
            .required_attributes()
            .into_iter()
            .filter(|attribute| !record.has(attribute))
            .min()
        {
            return Err(StudyError::missing_attribute(
                population_attribute,
                record.patient_id,
                attribute,
            ));
        }
        self.population.evaluate(record, population_attribute)
    }

    /// Stage one: derive variables, flag and keep cohort members
    pub fn select_cohort(
        &self,
        records: Vec<PatientRecord>,
        population_attribute: &str,
    ) -> Result<Cohort> {
        let total = records.len();
        let mut members = Vec::with_capacity(total);
        for mut record in records {
            self.derive(&mut record)?;
            if self.is_member(&record, population_attribute)? {
                record.set(population_attribute, true);
                members.push(record);
            }
        }
        let excluded = total - members.len();
        info!(
            "Study {}: {} of {total} records meet the population criteria",
            self.name,
            members.len()
        );
        debug!("Population criteria: {}", self.population);
        Ok(Cohort { members, excluded })
    }

    /// Validate, select the cohort and compute every measure
    pub fn run(&self, records: Vec<PatientRecord>, config: &AggregatorConfig) -> Result<StudyRun> {
        self.validate(&config.population_attribute)?;
        let cohort = self.select_cohort(records, &config.population_attribute)?;
        let results = compute_with_config(&cohort.members, &self.measures, config)?;
        self.check_covariates(&cohort.members)?;
        let stats = CohortStatistics::calculate(&cohort.members, &self.stratifiers());
        Ok(StudyRun {
            study: self.name.clone(),
            index_date: self.index_date,
            cohort_size: cohort.members.len(),
            excluded: cohort.excluded,
            stats,
            results,
        })
    }
}

impl fmt::Display for StudyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Study Definition: {}", self.name)?;
        writeln!(f, "  Index Date: {}", self.index_date)?;
        writeln!(f, "  Population: {}", self.population)?;
        writeln!(f, "  Variables: {}", self.variables.len())?;
        writeln!(f, "  Measures: {}", self.measures.len())?;
        writeln!(f, "  Covariates: {}", self.covariates.join(", "))
    }
}
