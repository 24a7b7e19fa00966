//! Measure definitions and results

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{Result, StudyError};
use crate::models::Value;

/// Values of the group-by attributes for one group, in group-by order
pub type GroupKey = SmallVec<[Value; 2]>;

/// A declared measure: numerator over denominator, stratified by one or more attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureDefinition {
    /// Unique measure identifier
    pub id: String,
    /// Attribute counted in the numerator
    pub numerator: String,
    /// Attribute establishing eligibility for the denominator
    pub denominator: String,
    /// Stratifying attributes
    pub group_by: Vec<String>,
}

impl MeasureDefinition {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        numerator: impl Into<String>,
        denominator: impl Into<String>,
        group_by: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            numerator: numerator.into(),
            denominator: denominator.into(),
            group_by: group_by.iter().map(ToString::to_string).collect(),
        }
    }

    /// Every attribute this definition reads from a record
    pub fn required_attributes(&self) -> impl Iterator<Item = &str> {
        [self.numerator.as_str(), self.denominator.as_str()]
            .into_iter()
            .chain(self.group_by.iter().map(String::as_str))
    }

    /// Structural checks that do not depend on any record
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(StudyError::invalid_definition(
                &self.id,
                "measure id must not be empty",
            ));
        }
        if self.group_by.is_empty() {
            return Err(StudyError::invalid_definition(
                &self.id,
                "group_by must name at least one attribute",
            ));
        }
        if let Some(name) = self.required_attributes().find(|a| a.trim().is_empty()) {
            return Err(StudyError::invalid_definition(
                &self.id,
                format!("attribute names must not be blank (got '{name}')"),
            ));
        }
        let mut seen = HashSet::new();
        for attribute in &self.group_by {
            if !seen.insert(attribute.as_str()) {
                return Err(StudyError::invalid_definition(
                    &self.id,
                    format!("group_by lists '{attribute}' more than once"),
                ));
            }
        }
        Ok(())
    }
}

/// Validate a whole measure list, including uniqueness of ids
pub fn validate_definitions(definitions: &[MeasureDefinition]) -> Result<()> {
    let mut ids = HashSet::new();
    for definition in definitions {
        definition.validate()?;
        if !ids.insert(definition.id.as_str()) {
            return Err(StudyError::invalid_definition(
                &definition.id,
                "measure id is declared more than once",
            ));
        }
    }
    Ok(())
}

/// Counts and rate for one measure and one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureResult {
    /// Identifier of the measure this row belongs to
    pub measure_id: String,
    /// Names of the group-by attributes, aligned with `group_key`
    pub group_by: Vec<String>,
    /// Group-by values; `Value::Null` marks the missing-value group
    pub group_key: GroupKey,
    /// Records that satisfy both numerator and denominator
    pub numerator: u64,
    /// Records that satisfy the denominator
    pub denominator: u64,
    /// numerator / denominator, `None` when the denominator is zero
    pub rate: Option<f64>,
}

impl MeasureResult {
    #[must_use]
    pub fn new(definition: &MeasureDefinition, group_key: GroupKey, counts: Counts) -> Self {
        Self {
            measure_id: definition.id.clone(),
            group_by: definition.group_by.clone(),
            group_key,
            numerator: counts.numerator,
            denominator: counts.denominator,
            rate: counts.rate(),
        }
    }

    /// Value of one group-by attribute for this row
    #[must_use]
    pub fn group_value(&self, attribute: &str) -> Option<&Value> {
        self.group_by
            .iter()
            .position(|a| a == attribute)
            .and_then(|i| self.group_key.get(i))
    }
}

impl fmt::Display for MeasureResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.measure_id)?;
        for (name, value) in self.group_by.iter().zip(&self.group_key) {
            if value.is_null() {
                write!(f, " {name}=<missing>")?;
            } else {
                write!(f, " {name}={value}")?;
            }
        }
        write!(f, ": {}/{}", self.numerator, self.denominator)?;
        match self.rate {
            Some(rate) => write!(f, " ({rate:.4})"),
            None => write!(f, " (undefined)"),
        }
    }
}

/// Per-group tallies; merged across workers by addition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub numerator: u64,
    pub denominator: u64,
    /// Numerator set on records outside the denominator (not counted)
    pub unmatched_numerator: u64,
}

impl Counts {
    pub fn merge(&mut self, other: Self) {
        self.numerator += other.numerator;
        self.denominator += other.denominator;
        self.unmatched_numerator += other.unmatched_numerator;
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rate(&self) -> Option<f64> {
        (self.denominator > 0).then(|| self.numerator as f64 / self.denominator as f64)
    }
}
