//! Patient record entity
//!
//! One row per patient-period as produced by the extraction framework. The
//! attribute map holds every extracted or derived variable by name.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyError};
use crate::models::Value;

/// Patient identifier as emitted by the extraction framework
pub type PatientId = i64;

/// A single patient record with named attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Unique patient identifier
    pub patient_id: PatientId,
    /// Attribute values by variable name
    pub attributes: FxHashMap<String, Value>,
}

impl PatientRecord {
    /// Create a record without attributes
    #[must_use]
    pub fn new(patient_id: PatientId) -> Self {
        Self {
            patient_id,
            attributes: FxHashMap::default(),
        }
    }

    /// Builder-style attribute setter
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set or replace an attribute
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Look up an attribute; `None` means the record has no such field,
    /// `Some(Value::Null)` means the field is present but missing
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Look up an attribute required by `owner` (a measure or variable id)
    pub fn require(&self, name: &str, owner: &str) -> Result<&Value> {
        self.attributes
            .get(name)
            .ok_or_else(|| StudyError::missing_attribute(owner, self.patient_id, name))
    }

    /// Truthiness of an attribute that has already been validated as present
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).is_some_and(Value::is_truthy)
    }
}
