//! Derived study variables
//!
//! Variables are computed on each record from attributes delivered by the
//! extraction framework or from variables declared before them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::algorithm::categorise::Categoriser;
use crate::error::{Result, StudyError};
use crate::filter::expr::Expr;
use crate::models::{PatientRecord, Value};

/// How a variable is derived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// Boolean flag: the condition holds
    Satisfying(Expr),
    /// First matching category, or the default
    CategorisedAs(Categoriser),
}

/// A named derived variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(flatten)]
    pub kind: VariableKind,
}

impl Variable {
    #[must_use]
    pub fn satisfying(name: &str, condition: Expr) -> Self {
        Self {
            name: name.to_string(),
            kind: VariableKind::Satisfying(condition),
        }
    }

    #[must_use]
    pub fn categorised_as(name: &str, categoriser: Categoriser) -> Self {
        Self {
            name: name.to_string(),
            kind: VariableKind::CategorisedAs(categoriser),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(StudyError::InvalidExpression(
                "variable with blank name".to_string(),
            ));
        }
        match &self.kind {
            VariableKind::Satisfying(condition) => condition.validate(),
            VariableKind::CategorisedAs(categoriser) => categoriser.validate(&self.name),
        }
    }

    #[must_use]
    pub fn required_attributes(&self) -> HashSet<&str> {
        match &self.kind {
            VariableKind::Satisfying(condition) => condition.required_attributes(),
            VariableKind::CategorisedAs(categoriser) => categoriser.required_attributes(),
        }
    }

    /// Value of this variable for `record`
    ///
    /// Every referenced attribute must be present, even those a
    /// short-circuiting condition would not read.
    pub fn evaluate(&self, record: &PatientRecord) -> Result<Value> {
        if let Some(attribute) = self
            .required_attributes()
            .into_iter()
            .filter(|attribute| !record.has(attribute))
            .min()
        {
            return Err(StudyError::missing_attribute(
                &self.name,
                record.patient_id,
                attribute,
            ));
        }
        match &self.kind {
            VariableKind::Satisfying(condition) => {
                condition.evaluate(record, &self.name).map(Value::Bool)
            }
            VariableKind::CategorisedAs(categoriser) => categoriser.categorise(record, &self.name),
        }
    }
}
