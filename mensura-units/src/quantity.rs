//! Quantity type - a scalar with an associated unit

use serde::{Serialize, Deserialize};
use mensura_core::{Scalar, ScalarError};
use crate::{Catalog, CatalogError, CatalogStore, UnitId};

/// A fixed-point scalar expressed in a catalog unit
///
/// Quantities are values: conversions produce new ones and never mutate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quantity {
    pub scalar: Scalar,
    pub unit: UnitId,
}

impl Quantity {
    pub fn new(scalar: Scalar, unit: UnitId) -> Self {
        Quantity { scalar, unit }
    }

    /// Create from decimal text, e.g. `Quantity::parse("2.54", centimeter)`
    pub fn parse(scalar: &str, unit: UnitId) -> Result<Self, ScalarError> {
        Ok(Quantity::new(Scalar::from_str(scalar)?, unit))
    }

    /// Convert to an equivalent quantity expressed in `target`
    ///
    /// Returns an equal quantity when already expressed in `target`.
    pub fn convert_to<S: CatalogStore>(
        &self,
        target: UnitId,
        catalog: &mut Catalog<S>,
    ) -> Result<Quantity, CatalogError> {
        catalog.convert(self, target)
    }
}
