//! The catalog: a store plus the engine operations over it
//!
//! Every operation that can write normalization caches takes `&mut self`,
//! so a catalog has a single writer by construction.

use crate::{
    CatalogError, CatalogStore, Dimension, DimensionId, MemoryStore, Quantity, SystemId, Unit,
    UnitFilter, UnitId, UnitSystem,
};

/// A unit catalog backed by a `CatalogStore`
#[derive(Debug, Clone, Default)]
pub struct Catalog<S: CatalogStore = MemoryStore> {
    pub(crate) store: S,
}

impl<S: CatalogStore> Catalog<S> {
    pub fn new(store: S) -> Self {
        Catalog { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // ========== Lookups ==========

    pub fn unit(&self, id: UnitId) -> Result<Unit, CatalogError> {
        self.store.unit(id)?
            .ok_or_else(|| CatalogError::UnknownUnit(format!("#{}", id)))
    }

    pub fn dimension(&self, id: DimensionId) -> Result<Dimension, CatalogError> {
        self.store.dimension(id)?
            .ok_or_else(|| CatalogError::UnknownDimension(format!("#{}", id)))
    }

    pub fn system(&self, id: SystemId) -> Result<UnitSystem, CatalogError> {
        self.store.system(id)?
            .ok_or_else(|| CatalogError::UnknownSystem(format!("#{}", id)))
    }

    pub fn units(&self) -> Result<Vec<Unit>, CatalogError> {
        Ok(self.store.units()?)
    }

    pub fn dimensions(&self) -> Result<Vec<Dimension>, CatalogError> {
        Ok(self.store.dimensions()?)
    }

    pub fn systems(&self) -> Result<Vec<UnitSystem>, CatalogError> {
        Ok(self.store.systems()?)
    }

    pub fn units_where(&self, filter: &UnitFilter) -> Result<Vec<Unit>, CatalogError> {
        Ok(self.store.units_where(filter)?)
    }

    /// Find a unit by numeric id, unit code ("US L in") or exact name ("Inch")
    pub fn find_unit(&self, key: &str) -> Result<Unit, CatalogError> {
        let key = key.trim();
        if let Ok(id) = key.parse::<u64>() {
            return self.unit(UnitId(id));
        }
        for unit in self.store.units()? {
            if unit.name == key || self.unit_code(&unit)? == key {
                return Ok(unit);
            }
        }
        Err(CatalogError::UnknownUnit(key.to_string()))
    }

    /// Find a dimension by numeric id, abbreviation or name
    pub fn find_dimension(&self, key: &str) -> Result<Dimension, CatalogError> {
        let key = key.trim();
        if let Ok(id) = key.parse::<u64>() {
            return self.dimension(DimensionId(id));
        }
        self.store.dimensions()?
            .into_iter()
            .find(|d| d.abbreviation == key || d.name == key)
            .ok_or_else(|| CatalogError::UnknownDimension(key.to_string()))
    }

    /// Find a system by numeric id, abbreviation or name
    pub fn find_system(&self, key: &str) -> Result<UnitSystem, CatalogError> {
        let key = key.trim();
        if let Ok(id) = key.parse::<u64>() {
            return self.system(SystemId(id));
        }
        self.store.systems()?
            .into_iter()
            .find(|s| s.abbreviation == key || s.name == key)
            .ok_or_else(|| CatalogError::UnknownSystem(key.to_string()))
    }

    // ========== Presentation ==========

    /// Unit code: "<system code> <dimension code> <abbreviation>"
    pub fn unit_code(&self, unit: &Unit) -> Result<String, CatalogError> {
        let system = self.system(unit.system)?;
        let dimension = self.dimension(unit.dimension)?;
        Ok(format!("{} {} {}", system.code(), dimension.code(), unit.abbreviation))
    }

    /// Unit label: "<abbreviation> [<dimension code>] <system code>"
    pub fn unit_label(&self, unit: &Unit) -> Result<String, CatalogError> {
        let system = self.system(unit.system)?;
        let dimension = self.dimension(unit.dimension)?;
        Ok(format!("{} [{}] {}", unit.abbreviation, dimension.code(), system.code()))
    }

    /// Quantity label: "<scalar> <abbreviation>"
    pub fn quantity_label(&self, quantity: &Quantity) -> Result<String, CatalogError> {
        let unit = self.unit(quantity.unit)?;
        Ok(format!("{} {}", quantity.scalar, unit.abbreviation))
    }

    // ========== Dimension registry ==========

    /// The dimension's normal unit, if one has been designated
    pub fn normal_unit(&self, dimension: DimensionId) -> Result<Option<Unit>, CatalogError> {
        match self.dimension(dimension)?.normal_unit {
            Some(id) => Ok(Some(self.unit(id)?)),
            None => Ok(None),
        }
    }

    /// Units of a dimension, optionally restricted to `candidates`
    pub fn units_in_dimension(
        &self,
        dimension: DimensionId,
        candidates: Option<&[Unit]>,
    ) -> Result<Vec<Unit>, CatalogError> {
        match candidates {
            Some(units) => Ok(units.iter().filter(|u| u.dimension == dimension).cloned().collect()),
            None => self.units_where(&UnitFilter::dimension(dimension)),
        }
    }

    /// Units belonging to a system
    pub fn units_in_system(&self, system: SystemId) -> Result<Vec<Unit>, CatalogError> {
        self.units_where(&UnitFilter::system(system))
    }

    /// Dimensions that have at least one unit in the system
    pub fn dimensions_in_system(&self, system: SystemId) -> Result<Vec<Dimension>, CatalogError> {
        let units = self.units_in_system(system)?;
        let mut dimensions: Vec<Dimension> = Vec::new();
        for unit in &units {
            if !dimensions.iter().any(|d| d.id == unit.dimension) {
                dimensions.push(self.dimension(unit.dimension)?);
            }
        }
        dimensions.sort_by_key(|d| d.id);
        Ok(dimensions)
    }
}
