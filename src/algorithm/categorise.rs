//! Categorised variables
//!
//! A categoriser assigns each record the first category whose condition
//! holds, falling back to a default category. Deprivation quintiles are the
//! typical case: ranges over the IMD rank map to codes 1-5, with 0 for
//! records whose address could not be ranked.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyError};
use crate::filter::expr::Expr;
use crate::models::{PatientRecord, Value};

/// One category and the condition selecting it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: Value,
    pub condition: Expr,
}

/// Ordered category rules with a default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Categoriser {
    /// Category assigned when no rule matches
    pub default: Value,
    /// Rules tried in declaration order
    pub rules: Vec<CategoryRule>,
}

impl Categoriser {
    #[must_use]
    pub fn new(default: impl Into<Value>) -> Self {
        Self {
            default: default.into(),
            rules: Vec::new(),
        }
    }

    /// Add a rule after the existing ones
    #[must_use]
    pub fn category(mut self, category: impl Into<Value>, condition: Expr) -> Self {
        self.rules.push(CategoryRule {
            category: category.into(),
            condition,
        });
        self
    }

    /// Every category this categoriser can produce, default first
    pub fn categories(&self) -> impl Iterator<Item = &Value> {
        std::iter::once(&self.default).chain(self.rules.iter().map(|rule| &rule.category))
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if self.rules.is_empty() {
            return Err(StudyError::InvalidExpression(format!(
                "categorised variable '{name}' has no categories besides the default"
            )));
        }
        for (i, rule) in self.rules.iter().enumerate() {
            let repeated = rule.category == self.default
                || self.categories().skip(i + 2).any(|c| *c == rule.category);
            if repeated {
                return Err(StudyError::InvalidExpression(format!(
                    "categorised variable '{name}' declares category '{}' twice",
                    rule.category
                )));
            }
            rule.condition.validate()?;
        }
        Ok(())
    }

    /// Category of `record`; `owner` names the variable for error reporting
    pub fn categorise(&self, record: &PatientRecord, owner: &str) -> Result<Value> {
        for rule in &self.rules {
            if rule.condition.evaluate(record, owner)? {
                return Ok(rule.category.clone());
            }
        }
        Ok(self.default.clone())
    }

    /// Attributes read by any rule
    #[must_use]
    pub fn required_attributes(&self) -> std::collections::HashSet<&str> {
        self.rules
            .iter()
            .flat_map(|rule| rule.condition.required_attributes())
            .collect()
    }
}
