//! Administrative operations: create, update and delete catalog records
//!
//! Every mutation is validated against the catalog before it reaches the
//! store. Edits that can change how units of a dimension resolve clear the
//! normalization caches of that dimension.

use tracing::info;
use crate::{
    Catalog, CatalogError, CatalogStore, Dimension, DimensionFields, DimensionId, SystemFields,
    SystemId, Unit, UnitFields, UnitId, UnitSystem,
};

fn require(field: &'static str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::Invalid { field, reason: "must not be empty".to_string() });
    }
    Ok(())
}

fn duplicate(kind: &'static str, value: &str) -> CatalogError {
    CatalogError::Duplicate { kind, value: value.to_string() }
}

impl<S: CatalogStore> Catalog<S> {
    // ========== Dimensions ==========

    pub fn create_dimension(&mut self, fields: DimensionFields) -> Result<Dimension, CatalogError> {
        self.validate_dimension(&fields, None)?;
        let dimension = self.store.create_dimension(fields)?;
        info!(dimension = %dimension.name, id = %dimension.id, "created dimension");
        Ok(dimension)
    }

    /// Rename a dimension; its normal unit is left as is
    pub fn update_dimension(&mut self, id: DimensionId, fields: DimensionFields) -> Result<Dimension, CatalogError> {
        let mut dimension = self.dimension(id)?;
        self.validate_dimension(&fields, Some(id))?;
        dimension.name = fields.name;
        dimension.name_plural = fields.name_plural;
        dimension.abbreviation = fields.abbreviation;
        self.store.update_dimension(&dimension)?;
        Ok(dimension)
    }

    pub fn delete_dimension(&mut self, id: DimensionId) -> Result<(), CatalogError> {
        let dimension = self.dimension(id)?;
        let units = self.units_in_dimension(id, None)?;
        if let Some(unit) = units.first() {
            return Err(CatalogError::InUse {
                record: format!("dimension {}", dimension.name),
                by: format!("unit {}", unit.display_name()),
            });
        }
        self.store.delete_dimension(id)?;
        info!(dimension = %dimension.name, "deleted dimension");
        Ok(())
    }

    /// Assign or clear the normal unit of a dimension
    ///
    /// The unit must belong to the dimension. A change clears every
    /// normalization cached in the dimension.
    pub fn set_normal_unit(&mut self, id: DimensionId, unit: Option<UnitId>) -> Result<Dimension, CatalogError> {
        let mut dimension = self.dimension(id)?;
        if let Some(unit_id) = unit {
            let unit = self.unit(unit_id)?;
            if unit.dimension != id {
                return Err(CatalogError::NormalUnitOutsideDimension {
                    dimension: dimension.name.clone(),
                    unit: unit.display_name(),
                });
            }
        }
        if dimension.normal_unit == unit {
            return Ok(dimension);
        }
        dimension.normal_unit = unit;
        self.store.update_dimension(&dimension)?;
        self.invalidate_dimension(id)?;
        info!(dimension = %dimension.name, normal_unit = ?unit, "assigned normal unit");
        Ok(dimension)
    }

    fn validate_dimension(&self, fields: &DimensionFields, current: Option<DimensionId>) -> Result<(), CatalogError> {
        require("name", &fields.name)?;
        require("name_plural", &fields.name_plural)?;
        require("abbreviation", &fields.abbreviation)?;
        for other in self.store.dimensions()? {
            if Some(other.id) == current {
                continue;
            }
            if other.name == fields.name {
                return Err(duplicate("dimension name", &fields.name));
            }
            if other.name_plural == fields.name_plural {
                return Err(duplicate("dimension plural name", &fields.name_plural));
            }
            if other.abbreviation == fields.abbreviation {
                return Err(duplicate("dimension abbreviation", &fields.abbreviation));
            }
        }
        Ok(())
    }

    // ========== Systems ==========

    pub fn create_system(&mut self, fields: SystemFields) -> Result<UnitSystem, CatalogError> {
        self.validate_system(&fields, None)?;
        let system = self.store.create_system(fields)?;
        info!(system = %system.name, id = %system.id, "created unit system");
        Ok(system)
    }

    pub fn update_system(&mut self, id: SystemId, fields: SystemFields) -> Result<UnitSystem, CatalogError> {
        self.system(id)?;
        self.validate_system(&fields, Some(id))?;
        let system = UnitSystem::from_fields(id, fields);
        self.store.update_system(&system)?;
        Ok(system)
    }

    pub fn delete_system(&mut self, id: SystemId) -> Result<(), CatalogError> {
        let system = self.system(id)?;
        if let Some(unit) = self.units_in_system(id)?.first() {
            return Err(CatalogError::InUse {
                record: format!("system {}", system.name),
                by: format!("unit {}", unit.display_name()),
            });
        }
        self.store.delete_system(id)?;
        info!(system = %system.name, "deleted unit system");
        Ok(())
    }

    fn validate_system(&self, fields: &SystemFields, current: Option<SystemId>) -> Result<(), CatalogError> {
        require("name", &fields.name)?;
        require("abbreviation", &fields.abbreviation)?;
        for other in self.store.systems()? {
            if Some(other.id) == current {
                continue;
            }
            if other.name == fields.name {
                return Err(duplicate("system name", &fields.name));
            }
            if other.abbreviation == fields.abbreviation {
                return Err(duplicate("system abbreviation", &fields.abbreviation));
            }
        }
        Ok(())
    }

    // ========== Units ==========

    pub fn create_unit(&mut self, fields: UnitFields) -> Result<Unit, CatalogError> {
        self.validate_unit(&fields, None)?;
        let unit = self.store.create_unit(fields)?;
        info!(unit = %unit.display_name(), id = %unit.id, "created unit");
        Ok(unit)
    }

    /// Replace a unit's editable fields
    ///
    /// Changing the definition or the dimension clears the caches of the
    /// dimensions involved; other edits keep the unit's cache.
    pub fn update_unit(&mut self, id: UnitId, fields: UnitFields) -> Result<Unit, CatalogError> {
        let existing = self.unit(id)?;
        self.validate_unit(&fields, Some(id))?;

        let moved = fields.dimension != existing.dimension;
        if moved {
            if let Some(by) = self.referenced_by(&existing)? {
                return Err(CatalogError::InUse {
                    record: format!("unit {}", existing.display_name()),
                    by,
                });
            }
        }
        let redefined = moved || fields.defining_quantity != existing.defining_quantity;

        let mut unit = existing.clone();
        unit.redefine(fields);
        if !redefined {
            unit.normalized_quantity = existing.normalized_quantity.clone();
        }
        self.store.update_unit(&unit)?;

        if redefined {
            self.invalidate_dimension(existing.dimension)?;
            if moved {
                self.invalidate_dimension(unit.dimension)?;
            }
        }
        Ok(unit)
    }

    /// Delete a unit no dimension or other unit refers to
    pub fn delete_unit(&mut self, id: UnitId) -> Result<(), CatalogError> {
        let unit = self.unit(id)?;
        if let Some(by) = self.referenced_by(&unit)? {
            return Err(CatalogError::InUse {
                record: format!("unit {}", unit.display_name()),
                by,
            });
        }
        self.store.delete_unit(id)?;
        self.invalidate_dimension(unit.dimension)?;
        info!(unit = %unit.display_name(), "deleted unit");
        Ok(())
    }

    /// First record that refers to `unit`, described for error messages
    fn referenced_by(&self, unit: &Unit) -> Result<Option<String>, CatalogError> {
        let dimension = self.dimension(unit.dimension)?;
        if dimension.normal_unit == Some(unit.id) {
            return Ok(Some(format!("dimension {} as its normal unit", dimension.name)));
        }
        let dependent = self.store.units()?.into_iter().find(|other| {
            other.id != unit.id
                && other.defining_quantity.as_ref().map(|q| q.unit) == Some(unit.id)
        });
        Ok(dependent.map(|other| format!("unit {}", other.display_name())))
    }

    fn validate_unit(&self, fields: &UnitFields, current: Option<UnitId>) -> Result<(), CatalogError> {
        require("name", &fields.name)?;
        require("abbreviation", &fields.abbreviation)?;
        let system = self.system(fields.system)?;
        let dimension = self.dimension(fields.dimension)?;

        if let Some(definition) = &fields.defining_quantity {
            let defining = self.unit(definition.unit)?;
            if defining.dimension != fields.dimension {
                return Err(CatalogError::DimensionMismatch {
                    from: format!("{} ({})", fields.name, fields.abbreviation),
                    to: defining.display_name(),
                    from_dimension: dimension.name.clone(),
                    to_dimension: self.dimension(defining.dimension)?.name,
                });
            }
        }

        // Unit codes ("<system> <dimension> <abbreviation>") are unique
        let clash = self.store.units()?.into_iter().find(|other| {
            Some(other.id) != current
                && other.system == fields.system
                && other.dimension == fields.dimension
                && other.abbreviation == fields.abbreviation
        });
        if clash.is_some() {
            let code = format!("{} {} {}", system.code(), dimension.code(), fields.abbreviation);
            return Err(duplicate("unit code", &code));
        }
        Ok(())
    }
}
