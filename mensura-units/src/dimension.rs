//! Dimensions: the partitions that keep units from converting into each other
//!
//! A dimension (length, volume, mass, ...) owns an optional *normal unit*,
//! the reference every other unit of the dimension is normalized against.

use std::fmt;
use serde::{Serialize, Deserialize};
use crate::UnitId;

/// Opaque dimension identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionId(pub u64);

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dimension record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    pub id: DimensionId,
    /// Unique name (e.g., "Length")
    pub name: String,
    /// Unique plural name (e.g., "Lengths")
    pub name_plural: String,
    /// Unique abbreviation, used as the dimension code (e.g., "L")
    pub abbreviation: String,
    /// Reference unit for normalization; may be assigned after the dimension exists
    #[serde(default)]
    pub normal_unit: Option<UnitId>,
}

impl Dimension {
    /// Build a record from its editable fields
    pub fn from_fields(id: DimensionId, fields: DimensionFields) -> Self {
        Dimension {
            id,
            name: fields.name,
            name_plural: fields.name_plural,
            abbreviation: fields.abbreviation,
            normal_unit: None,
        }
    }

    /// The dimension code used in unit codes and the export document
    pub fn code(&self) -> &str {
        &self.abbreviation
    }
}

impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Dimension {}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Administratively editable dimension fields
///
/// The normal unit is assigned separately, once units of the dimension exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionFields {
    pub name: String,
    pub name_plural: String,
    pub abbreviation: String,
}

impl DimensionFields {
    pub fn new(name: &str, name_plural: &str, abbreviation: &str) -> Self {
        DimensionFields {
            name: name.to_string(),
            name_plural: name_plural.to_string(),
            abbreviation: abbreviation.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn length(id: u64) -> Dimension {
        Dimension::from_fields(DimensionId(id), DimensionFields::new("Length", "Lengths", "L"))
    }

    #[test]
    fn test_from_fields_has_no_normal_unit() {
        let d = length(1);
        assert_eq!(d.normal_unit, None);
        assert_eq!(d.code(), "L");
    }

    #[test]
    fn test_equality_is_by_id() {
        let mut renamed = length(1);
        renamed.name = "Distance".to_string();
        assert_eq!(length(1), renamed);
        assert_ne!(length(1), length(2));
    }

    #[test]
    fn test_serde_defaults_normal_unit() {
        let d: Dimension = serde_json::from_str(
            r#"{"id": 3, "name": "Mass", "name_plural": "Masses", "abbreviation": "M"}"#,
        ).unwrap();
        assert_eq!(d.id, DimensionId(3));
        assert_eq!(d.normal_unit, None);
    }
}
