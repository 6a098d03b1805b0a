//! Unit catalog entries
//!
//! A unit is defined by a quantity of some other unit (1 inch = 2.54 cm)
//! and carries a cached *normalized quantity*: the same unit expressed in
//! its dimension's normal unit. The cache is engine-derived and is never
//! part of the editable fields.

use std::fmt;
use std::hash::{Hash, Hasher};
use serde::{Serialize, Deserialize};
use crate::{DimensionId, Quantity, SystemId};

/// Opaque unit identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    /// Singular name (e.g., "Inch")
    pub name: String,
    /// Plural name (e.g., "Inches")
    pub name_plural: String,
    /// Singular abbreviation (e.g., "in")
    pub abbreviation: String,
    /// Plural abbreviation (e.g., "in")
    pub abbreviation_plural: String,
    /// The system this unit belongs to
    pub system: SystemId,
    /// Units convert only within their dimension
    pub dimension: DimensionId,
    /// The quantity by which this unit is defined; absent for normal units
    #[serde(default)]
    pub defining_quantity: Option<Quantity>,
    /// Cached value of this unit in its dimension's normal unit
    #[serde(default)]
    pub normalized_quantity: Option<Quantity>,
    /// Where the definition came from
    #[serde(default)]
    pub information_source: String,
}

impl Unit {
    /// Build a record from its editable fields; the cache starts empty
    pub fn from_fields(id: UnitId, fields: UnitFields) -> Self {
        Unit {
            id,
            name: fields.name,
            name_plural: fields.name_plural,
            abbreviation: fields.abbreviation,
            abbreviation_plural: fields.abbreviation_plural,
            system: fields.system,
            dimension: fields.dimension,
            defining_quantity: fields.defining_quantity,
            normalized_quantity: None,
            information_source: fields.information_source,
        }
    }

    /// Replace the definition, keeping the identity and dropping the cache
    pub fn redefine(&mut self, fields: UnitFields) {
        *self = Unit::from_fields(self.id, fields);
    }

    /// The editable part of this record
    pub fn fields(&self) -> UnitFields {
        UnitFields {
            name: self.name.clone(),
            name_plural: self.name_plural.clone(),
            abbreviation: self.abbreviation.clone(),
            abbreviation_plural: self.abbreviation_plural.clone(),
            system: self.system,
            dimension: self.dimension,
            defining_quantity: self.defining_quantity.clone(),
            information_source: self.information_source.clone(),
        }
    }

    /// Human readable name, e.g. "Inch (in)"
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.abbreviation)
    }
}

/// Two units are the same iff they are the same catalog entry
impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Unit {}

impl Hash for Unit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Administratively editable unit fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFields {
    pub name: String,
    pub name_plural: String,
    pub abbreviation: String,
    pub abbreviation_plural: String,
    pub system: SystemId,
    pub dimension: DimensionId,
    #[serde(default)]
    pub defining_quantity: Option<Quantity>,
    #[serde(default)]
    pub information_source: String,
}

impl UnitFields {
    /// Fields with plural forms equal to the singular ones
    pub fn new(name: &str, abbreviation: &str, system: SystemId, dimension: DimensionId) -> Self {
        UnitFields {
            name: name.to_string(),
            name_plural: name.to_string(),
            abbreviation: abbreviation.to_string(),
            abbreviation_plural: abbreviation.to_string(),
            system,
            dimension,
            defining_quantity: None,
            information_source: String::new(),
        }
    }

    /// Builder: plural name and abbreviation
    pub fn plural(mut self, name_plural: &str, abbreviation_plural: &str) -> Self {
        self.name_plural = name_plural.to_string();
        self.abbreviation_plural = abbreviation_plural.to_string();
        self
    }

    /// Builder: defining quantity
    pub fn defined_as(mut self, quantity: Quantity) -> Self {
        self.defining_quantity = Some(quantity);
        self
    }

    /// Builder: information source
    pub fn source(mut self, source: &str) -> Self {
        self.information_source = source.to_string();
        self
    }
}
