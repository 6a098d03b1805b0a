//! Unit systems (SI, US customary, Imperial, ...)
//!
//! Purely a grouping label; systems never take part in conversion math.

use std::fmt;
use serde::{Serialize, Deserialize};

/// Opaque unit system identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemId(pub u64);

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit system record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSystem {
    pub id: SystemId,
    /// Unique name (e.g., "International System of Units")
    pub name: String,
    /// Unique abbreviation, used as the system code (e.g., "SI")
    pub abbreviation: String,
    #[serde(default)]
    pub description: String,
}

impl UnitSystem {
    pub fn from_fields(id: SystemId, fields: SystemFields) -> Self {
        UnitSystem {
            id,
            name: fields.name,
            abbreviation: fields.abbreviation,
            description: fields.description,
        }
    }

    pub fn code(&self) -> &str {
        &self.abbreviation
    }
}

impl PartialEq for UnitSystem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for UnitSystem {}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Administratively editable system fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemFields {
    pub name: String,
    pub abbreviation: String,
    #[serde(default)]
    pub description: String,
}

impl SystemFields {
    pub fn new(name: &str, abbreviation: &str, description: &str) -> Self {
        SystemFields {
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            description: description.to_string(),
        }
    }
}
