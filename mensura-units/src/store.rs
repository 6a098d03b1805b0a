//! Record storage behind the catalog
//!
//! The engine only needs lookup-all, lookup-by-id, filtered unit queries
//! and create/update/delete by identifier. `MemoryStore` is the in-tree
//! implementation; it round-trips through a JSON `CatalogSnapshot`.

use std::collections::BTreeMap;
use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::{
    Dimension, DimensionFields, DimensionId, Quantity, SystemFields, SystemId, Unit, UnitFields,
    UnitId, UnitSystem,
};

/// Errors from the storage collaborator
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed catalog document: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Backend(String),
}

/// Filter for unit queries; `None` fields match everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitFilter {
    pub dimension: Option<DimensionId>,
    pub system: Option<SystemId>,
}

impl UnitFilter {
    pub fn dimension(dimension: DimensionId) -> Self {
        UnitFilter { dimension: Some(dimension), system: None }
    }

    pub fn system(system: SystemId) -> Self {
        UnitFilter { dimension: None, system: Some(system) }
    }

    pub fn matches(&self, unit: &Unit) -> bool {
        self.dimension.map_or(true, |d| unit.dimension == d)
            && self.system.map_or(true, |s| unit.system == s)
    }
}

/// The persistence contract the catalog depends on
pub trait CatalogStore {
    fn dimensions(&self) -> Result<Vec<Dimension>, StoreError>;
    fn dimension(&self, id: DimensionId) -> Result<Option<Dimension>, StoreError>;
    fn create_dimension(&mut self, fields: DimensionFields) -> Result<Dimension, StoreError>;
    fn update_dimension(&mut self, dimension: &Dimension) -> Result<(), StoreError>;
    fn delete_dimension(&mut self, id: DimensionId) -> Result<(), StoreError>;

    fn systems(&self) -> Result<Vec<UnitSystem>, StoreError>;
    fn system(&self, id: SystemId) -> Result<Option<UnitSystem>, StoreError>;
    fn create_system(&mut self, fields: SystemFields) -> Result<UnitSystem, StoreError>;
    fn update_system(&mut self, system: &UnitSystem) -> Result<(), StoreError>;
    fn delete_system(&mut self, id: SystemId) -> Result<(), StoreError>;

    fn units(&self) -> Result<Vec<Unit>, StoreError>;
    fn unit(&self, id: UnitId) -> Result<Option<Unit>, StoreError>;
    fn create_unit(&mut self, fields: UnitFields) -> Result<Unit, StoreError>;
    fn update_unit(&mut self, unit: &Unit) -> Result<(), StoreError>;
    fn delete_unit(&mut self, id: UnitId) -> Result<(), StoreError>;

    /// Units matching `filter`
    fn units_where(&self, filter: &UnitFilter) -> Result<Vec<Unit>, StoreError> {
        Ok(self.units()?.into_iter().filter(|u| filter.matches(u)).collect())
    }

    /// Publish normalized quantities; `None` clears a cache entry
    ///
    /// Implementations apply the whole batch or none of it.
    fn save_normalized(&mut self, entries: &[(UnitId, Option<Quantity>)]) -> Result<(), StoreError>;
}

/// Serializable form of a whole catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub systems: Vec<UnitSystem>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub units: Vec<Unit>,
}

impl CatalogSnapshot {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

/// In-memory store with sequential identifiers
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    dimensions: BTreeMap<DimensionId, Dimension>,
    systems: BTreeMap<SystemId, UnitSystem>,
    units: BTreeMap<UnitId, Unit>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot; new ids continue after the largest one seen
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let max_id = snapshot.dimensions.iter().map(|d| d.id.0)
            .chain(snapshot.systems.iter().map(|s| s.id.0))
            .chain(snapshot.units.iter().map(|u| u.id.0))
            .max()
            .unwrap_or(0);

        MemoryStore {
            dimensions: snapshot.dimensions.into_iter().map(|d| (d.id, d)).collect(),
            systems: snapshot.systems.into_iter().map(|s| (s.id, s)).collect(),
            units: snapshot.units.into_iter().map(|u| (u.id, u)).collect(),
            next_id: max_id,
        }
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            systems: self.systems.values().cloned().collect(),
            dimensions: self.dimensions.values().cloned().collect(),
            units: self.units.values().cloned().collect(),
        }
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

fn replace<K: Ord + std::fmt::Display + Copy, V: Clone>(
    map: &mut BTreeMap<K, V>,
    id: K,
    record: &V,
    kind: &str,
) -> Result<(), StoreError> {
    match map.get_mut(&id) {
        Some(slot) => {
            *slot = record.clone();
            Ok(())
        }
        None => Err(StoreError::NotFound(format!("{} {}", kind, id))),
    }
}

fn remove<K: Ord + std::fmt::Display + Copy, V>(
    map: &mut BTreeMap<K, V>,
    id: K,
    kind: &str,
) -> Result<(), StoreError> {
    map.remove(&id)
        .map(|_| ())
        .ok_or_else(|| StoreError::NotFound(format!("{} {}", kind, id)))
}

impl CatalogStore for MemoryStore {
    fn dimensions(&self) -> Result<Vec<Dimension>, StoreError> {
        Ok(self.dimensions.values().cloned().collect())
    }

    fn dimension(&self, id: DimensionId) -> Result<Option<Dimension>, StoreError> {
        Ok(self.dimensions.get(&id).cloned())
    }

    fn create_dimension(&mut self, fields: DimensionFields) -> Result<Dimension, StoreError> {
        let dimension = Dimension::from_fields(DimensionId(self.allocate()), fields);
        self.dimensions.insert(dimension.id, dimension.clone());
        Ok(dimension)
    }

    fn update_dimension(&mut self, dimension: &Dimension) -> Result<(), StoreError> {
        replace(&mut self.dimensions, dimension.id, dimension, "dimension")
    }

    fn delete_dimension(&mut self, id: DimensionId) -> Result<(), StoreError> {
        remove(&mut self.dimensions, id, "dimension")
    }

    fn systems(&self) -> Result<Vec<UnitSystem>, StoreError> {
        Ok(self.systems.values().cloned().collect())
    }

    fn system(&self, id: SystemId) -> Result<Option<UnitSystem>, StoreError> {
        Ok(self.systems.get(&id).cloned())
    }

    fn create_system(&mut self, fields: SystemFields) -> Result<UnitSystem, StoreError> {
        let system = UnitSystem::from_fields(SystemId(self.allocate()), fields);
        self.systems.insert(system.id, system.clone());
        Ok(system)
    }

    fn update_system(&mut self, system: &UnitSystem) -> Result<(), StoreError> {
        replace(&mut self.systems, system.id, system, "system")
    }

    fn delete_system(&mut self, id: SystemId) -> Result<(), StoreError> {
        remove(&mut self.systems, id, "system")
    }

    fn units(&self) -> Result<Vec<Unit>, StoreError> {
        Ok(self.units.values().cloned().collect())
    }

    fn unit(&self, id: UnitId) -> Result<Option<Unit>, StoreError> {
        Ok(self.units.get(&id).cloned())
    }

    fn create_unit(&mut self, fields: UnitFields) -> Result<Unit, StoreError> {
        let unit = Unit::from_fields(UnitId(self.allocate()), fields);
        self.units.insert(unit.id, unit.clone());
        Ok(unit)
    }

    fn update_unit(&mut self, unit: &Unit) -> Result<(), StoreError> {
        replace(&mut self.units, unit.id, unit, "unit")
    }

    fn delete_unit(&mut self, id: UnitId) -> Result<(), StoreError> {
        remove(&mut self.units, id, "unit")
    }

    fn save_normalized(&mut self, entries: &[(UnitId, Option<Quantity>)]) -> Result<(), StoreError> {
        // Validate the whole batch before touching anything
        if let Some((missing, _)) = entries.iter().find(|(id, _)| !self.units.contains_key(id)) {
            return Err(StoreError::NotFound(format!("unit {}", missing)));
        }
        for (id, normalized) in entries {
            if let Some(unit) = self.units.get_mut(id) {
                unit.normalized_quantity = normalized.clone();
            }
        }
        Ok(())
    }
}
