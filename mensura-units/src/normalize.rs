//! Normalization engine
//!
//! A unit's normalized quantity is its value expressed in the normal unit
//! of its dimension. It is found by walking `defining_quantity` links down
//! to the normal unit, converting at each step, and is cached on the unit.
//!
//! Resolution happens inside a `Resolver` pass: results are collected in
//! the pass and published to the store in one batch only when the whole
//! operation succeeded, so a failure never leaves half-written caches.

use std::collections::BTreeMap;
use tracing::{debug, info};
use mensura_core::Scalar;
use crate::{
    Catalog, CatalogError, CatalogStore, Dimension, DimensionId, Quantity, Unit, UnitId,
};

/// One resolution pass over the catalog
pub(crate) struct Resolver<'s, S: CatalogStore> {
    store: &'s S,
    /// Whether cached normalizations from the store may be reused
    trust_cache: bool,
    /// Normalizations computed during this pass
    fresh: BTreeMap<UnitId, Quantity>,
    /// Units whose resolution is in progress, outermost first
    path: Vec<UnitId>,
}

impl<'s, S: CatalogStore> Resolver<'s, S> {
    pub(crate) fn new(store: &'s S, trust_cache: bool) -> Self {
        Resolver {
            store,
            trust_cache,
            fresh: BTreeMap::new(),
            path: Vec::new(),
        }
    }

    pub(crate) fn unit(&self, id: UnitId) -> Result<Unit, CatalogError> {
        self.store.unit(id)?
            .ok_or_else(|| CatalogError::UnknownUnit(format!("#{}", id)))
    }

    pub(crate) fn dimension(&self, id: DimensionId) -> Result<Dimension, CatalogError> {
        self.store.dimension(id)?
            .ok_or_else(|| CatalogError::UnknownDimension(format!("#{}", id)))
    }

    /// The normalized quantity of `id`, computed only when nothing current is known
    ///
    /// A cached value is current when it is expressed in the dimension's
    /// present normal unit; anything else was computed against an older
    /// normal unit and is recomputed.
    pub(crate) fn resolve(&mut self, id: UnitId) -> Result<Quantity, CatalogError> {
        if let Some(known) = self.fresh.get(&id) {
            return Ok(known.clone());
        }

        let unit = self.unit(id)?;
        if self.trust_cache {
            if let Some(cached) = &unit.normalized_quantity {
                let dimension = self.dimension(unit.dimension)?;
                if dimension.normal_unit == Some(cached.unit) {
                    return Ok(cached.clone());
                }
            }
        }

        self.compute(&unit)
    }

    /// Unconditionally compute the normalized quantity of `unit`
    pub(crate) fn compute(&mut self, unit: &Unit) -> Result<Quantity, CatalogError> {
        if self.path.contains(&unit.id) {
            let mut cycle = Vec::with_capacity(self.path.len() + 1);
            for id in self.path.iter().skip_while(|id| **id != unit.id) {
                cycle.push(self.unit(*id)?.display_name());
            }
            cycle.push(unit.display_name());
            return Err(CatalogError::CyclicDefinition { path: cycle });
        }

        let dimension = self.dimension(unit.dimension)?;
        let normal_id = dimension.normal_unit.ok_or_else(|| CatalogError::MissingNormalUnit {
            dimension: dimension.name.clone(),
        })?;

        let normalized = if normal_id == unit.id {
            // Base case: the normal unit is one of itself
            Quantity::new(Scalar::one(), unit.id)
        } else {
            let normal = self.unit(normal_id)?;
            if normal.dimension != unit.dimension {
                return Err(CatalogError::NormalUnitOutsideDimension {
                    dimension: dimension.name.clone(),
                    unit: normal.display_name(),
                });
            }
            let definition = unit.defining_quantity.clone().ok_or_else(|| {
                CatalogError::MissingDefinition { unit: unit.display_name() }
            })?;

            self.path.push(unit.id);
            let converted = self.convert(&definition, &normal);
            self.path.pop();
            converted?
        };

        debug!(unit = %unit.display_name(), normalized = %normalized.scalar, "normalized unit");
        self.fresh.insert(unit.id, normalized.clone());
        Ok(normalized)
    }

    /// Cache entries to publish
    pub(crate) fn into_entries(self) -> Vec<(UnitId, Option<Quantity>)> {
        self.fresh.into_iter().map(|(id, q)| (id, Some(q))).collect()
    }
}

impl<S: CatalogStore> Catalog<S> {
    /// Compute, cache and return the normalized quantity of a unit
    ///
    /// The unit itself is always recomputed; units it is defined through
    /// reuse their caches when those are current.
    pub fn normalize(&mut self, id: UnitId) -> Result<Quantity, CatalogError> {
        let mut resolver = Resolver::new(&self.store, true);
        let unit = resolver.unit(id)?;
        let normalized = resolver.compute(&unit)?;
        let entries = resolver.into_entries();
        self.store.save_normalized(&entries)?;
        Ok(normalized)
    }

    /// Recompute every unit in the catalog, ignoring all caches
    ///
    /// All-or-nothing: on error no cache is touched. Returns the number of
    /// units normalized.
    pub fn normalize_all(&mut self) -> Result<usize, CatalogError> {
        Ok(self.refresh_all()?.len())
    }

    /// Forced pass over every unit, published as one batch
    ///
    /// Returns the fresh normalizations keyed by unit.
    pub(crate) fn refresh_all(&mut self) -> Result<BTreeMap<UnitId, Quantity>, CatalogError> {
        let mut resolver = Resolver::new(&self.store, false);
        let mut normalized = BTreeMap::new();
        for unit in self.store.units()? {
            let q = resolver.resolve(unit.id)?;
            normalized.insert(unit.id, q);
        }
        let entries: Vec<(UnitId, Option<Quantity>)> =
            normalized.iter().map(|(id, q)| (*id, Some(q.clone()))).collect();
        self.store.save_normalized(&entries)?;
        info!(units = entries.len(), "normalized catalog");
        Ok(normalized)
    }

    /// Clear the caches of every unit in a dimension
    pub(crate) fn invalidate_dimension(&mut self, dimension: DimensionId) -> Result<(), CatalogError> {
        let entries: Vec<(UnitId, Option<Quantity>)> = self
            .units_in_dimension(dimension, None)?
            .into_iter()
            .filter(|u| u.normalized_quantity.is_some())
            .map(|u| (u.id, None))
            .collect();
        if !entries.is_empty() {
            debug!(dimension = %dimension, units = entries.len(), "invalidated normalizations");
            self.store.save_normalized(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standard::standard_catalog;
    use crate::{CatalogStore, DimensionFields, SystemFields, UnitFields};

    fn scalar(text: &str) -> Scalar {
        Scalar::from_str(text).unwrap()
    }

    #[test]
    fn test_normal_unit_normalizes_to_one_of_itself() {
        let mut catalog = standard_catalog().unwrap();
        let meter = catalog.find_unit("Meter").unwrap();
        let q = catalog.normalize(meter.id).unwrap();
        assert_eq!(q, Quantity::new(Scalar::one(), meter.id));
    }

    #[test]
    fn test_normalize_recurses_and_caches_dependencies() {
        let mut catalog = standard_catalog().unwrap();
        let mile = catalog.find_unit("Mile").unwrap();
        let meter = catalog.find_unit("Meter").unwrap();
        let yard = catalog.find_unit("Yard").unwrap();

        let q = catalog.normalize(mile.id).unwrap();
        assert_eq!(q.unit, meter.id);
        assert_eq!(q.scalar, scalar("1609.344"));

        // The chain below the mile was cached on the way
        let yard = catalog.unit(yard.id).unwrap();
        assert_eq!(yard.normalized_quantity.unwrap().scalar, scalar("0.9144"));
    }

    #[test]
    fn test_missing_normal_unit_leaves_catalog_untouched() {
        let mut catalog = standard_catalog().unwrap();
        let si = catalog.find_system("SI").unwrap();
        let time = catalog.create_dimension(DimensionFields::new("Time", "Times", "T")).unwrap();
        let second = catalog.create_unit(UnitFields::new("Second", "s", si.id, time.id)).unwrap();

        let err = catalog.normalize(second.id).unwrap_err();
        assert!(matches!(err, CatalogError::MissingNormalUnit { ref dimension } if dimension == "Time"));
        assert!(catalog.unit(second.id).unwrap().normalized_quantity.is_none());
    }

    #[test]
    fn test_missing_definition() {
        let mut catalog = standard_catalog().unwrap();
        let si = catalog.find_system("SI").unwrap();
        let length = catalog.find_dimension("Length").unwrap();
        let orphan = catalog.create_unit(UnitFields::new("Orphan", "o", si.id, length.id)).unwrap();
        assert!(matches!(
            catalog.normalize(orphan.id),
            Err(CatalogError::MissingDefinition { .. })
        ));
    }

    #[test]
    fn test_cycle_is_reported_not_recursed() {
        let mut catalog = standard_catalog().unwrap();
        let si = catalog.find_system("SI").unwrap();
        let length = catalog.find_dimension("Length").unwrap();
        let meter = catalog.find_unit("Meter").unwrap();

        let a = catalog.create_unit(
            UnitFields::new("Alpha", "a", si.id, length.id)
                .defined_as(Quantity::new(scalar("2"), meter.id)),
        ).unwrap();
        let b = catalog.create_unit(
            UnitFields::new("Beta", "b", si.id, length.id)
                .defined_as(Quantity::new(scalar("3"), a.id)),
        ).unwrap();
        // Close the loop: alpha := 2 beta
        catalog.update_unit(a.id, a.fields().defined_as(Quantity::new(scalar("2"), b.id))).unwrap();

        match catalog.normalize(a.id) {
            Err(CatalogError::CyclicDefinition { path }) => {
                assert_eq!(path, vec!["Alpha (a)", "Beta (b)", "Alpha (a)"]);
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_definition_is_a_cycle() {
        let mut catalog = standard_catalog().unwrap();
        let si = catalog.find_system("SI").unwrap();
        let length = catalog.find_dimension("Length").unwrap();
        let meter = catalog.find_unit("Meter").unwrap();
        let u = catalog.create_unit(
            UnitFields::new("Ouroboros", "ou", si.id, length.id)
                .defined_as(Quantity::new(scalar("1"), meter.id)),
        ).unwrap();
        catalog.update_unit(u.id, u.fields().defined_as(Quantity::new(scalar("2"), u.id))).unwrap();
        assert!(matches!(
            catalog.normalize(u.id),
            Err(CatalogError::CyclicDefinition { ref path }) if path.len() == 2
        ));
    }

    #[test]
    fn test_stale_cache_is_not_trusted_after_normal_unit_change() {
        let mut catalog = standard_catalog().unwrap();
        let inch = catalog.find_unit("Inch").unwrap();
        let centimeter = catalog.find_unit("Centimeter").unwrap();
        catalog.normalize_all().unwrap();

        // Reassign the normal unit behind the catalog's back: no invalidation
        let mut length = catalog.find_dimension("Length").unwrap();
        length.normal_unit = Some(centimeter.id);
        catalog.store.update_dimension(&length).unwrap();

        // Caches computed against the meter are ignored
        let ratio = catalog.ratio_to_target(inch.id, centimeter.id).unwrap();
        assert_eq!(ratio.to_scalar().unwrap(), scalar("2.54"));
        let inch = catalog.unit(inch.id).unwrap();
        assert_eq!(
            inch.normalized_quantity,
            Some(Quantity::new(scalar("2.54"), centimeter.id))
        );
    }

    #[test]
    fn test_normal_unit_from_another_dimension_is_rejected() {
        let mut catalog = standard_catalog().unwrap();
        let inch = catalog.find_unit("Inch").unwrap();
        let liter = catalog.find_unit("Liter").unwrap();

        // set_normal_unit refuses this, so write it straight to the store
        let mut length = catalog.find_dimension("Length").unwrap();
        length.normal_unit = Some(liter.id);
        catalog.store.update_dimension(&length).unwrap();

        match catalog.normalize(inch.id) {
            Err(CatalogError::NormalUnitOutsideDimension { dimension, unit }) => {
                assert_eq!(dimension, "Length");
                assert_eq!(unit, "Liter (L)");
            }
            other => panic!("expected a foreign normal unit, got {:?}", other),
        }
        assert!(catalog.unit(inch.id).unwrap().normalized_quantity.is_none());
    }

    #[test]
    fn test_normalize_all_recomputes_everything() {
        let mut catalog = standard_catalog().unwrap();
        let foot = catalog.find_unit("Foot").unwrap();
        let meter = catalog.find_unit("Meter").unwrap();
        catalog.store.save_normalized(&[(foot.id, Some(Quantity::new(scalar("5"), meter.id)))]).unwrap();

        let count = catalog.normalize_all().unwrap();
        assert_eq!(count, catalog.units().unwrap().len());
        assert!(catalog.units().unwrap().iter().all(|u| u.normalized_quantity.is_some()));
        assert_eq!(catalog.unit(foot.id).unwrap().normalized_quantity.unwrap().scalar, scalar("0.3048"));
    }

    #[test]
    fn test_normalize_all_is_atomic() {
        let mut catalog = standard_catalog().unwrap();
        let inch = catalog.find_unit("Inch").unwrap();
        let meter = catalog.find_unit("Meter").unwrap();
        let bogus = Quantity::new(scalar("7"), meter.id);
        catalog.store.save_normalized(&[(inch.id, Some(bogus.clone()))]).unwrap();

        // A unit added last, in a dimension without a normal unit
        let lab = catalog.create_system(SystemFields::new("Laboratory", "LAB", "")).unwrap();
        let time = catalog.create_dimension(DimensionFields::new("Time", "Times", "T")).unwrap();
        catalog.create_unit(UnitFields::new("Second", "s", lab.id, time.id)).unwrap();

        assert!(catalog.normalize_all().is_err());
        assert_eq!(catalog.unit(inch.id).unwrap().normalized_quantity, Some(bogus));
    }
}
