//! Export document for client-side conversion
//!
//! The document lists every unit with its ratio to the normal unit of its
//! dimension, grouped three ways: flat by unit code, by dimension, and by
//! system then dimension. A client converts between two units of one
//! dimension with `value * ratio(source) / ratio(target)`.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use tracing::info;
use mensura_core::Scalar;
use crate::{Catalog, CatalogError, CatalogStore, Dimension, Unit, UnitId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub systems: BTreeMap<String, SystemExport>,
    pub dimensions: BTreeMap<String, DimensionExport>,
    pub units: BTreeMap<String, UnitExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemExport {
    pub system: SystemInfo,
    pub dimensions: BTreeMap<String, DimensionExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub name: String,
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionExport {
    pub dimension: DimensionInfo,
    pub units: BTreeMap<String, UnitExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionInfo {
    pub name: String,
    pub code: String,
    /// Abbreviation of the normal unit, `null` when none is assigned
    pub normal_unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitExport {
    pub name: String,
    pub name_plural: String,
    pub code: String,
    /// Scalar of the normalized quantity, as a decimal string
    pub ratio: Scalar,
    pub system_code: String,
    pub dimension_code: String,
}

impl ExportDocument {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl<S: CatalogStore> Catalog<S> {
    /// Normalize the whole catalog, then build the export document
    pub fn export(&mut self) -> Result<ExportDocument, CatalogError> {
        let normalized = self.refresh_all()?;

        let units = self.store.units()?;
        let dimensions = self.store.dimensions()?;

        let mut unit_exports: BTreeMap<UnitId, (String, UnitExport)> = BTreeMap::new();
        for unit in &units {
            let ratio = normalized
                .get(&unit.id)
                .map(|q| q.scalar.clone())
                .ok_or_else(|| CatalogError::UnknownUnit(format!("#{}", unit.id)))?;
            let code = self.unit_code(unit)?;
            let export = UnitExport {
                name: unit.display_name(),
                name_plural: unit.name_plural.clone(),
                code: code.clone(),
                ratio,
                system_code: self.system(unit.system)?.code().to_string(),
                dimension_code: self.dimension(unit.dimension)?.code().to_string(),
            };
            unit_exports.insert(unit.id, (code, export));
        }

        let grouped = |scope: &[&Unit]| -> Result<BTreeMap<String, DimensionExport>, CatalogError> {
            let mut out = BTreeMap::new();
            for dimension in &dimensions {
                let members: Vec<&&Unit> = scope.iter().filter(|u| u.dimension == dimension.id).collect();
                if members.is_empty() {
                    continue;
                }
                let units = members
                    .iter()
                    .filter_map(|u| unit_exports.get(&u.id).cloned())
                    .collect();
                out.insert(dimension.code().to_string(), DimensionExport {
                    dimension: self.dimension_info(dimension)?,
                    units,
                });
            }
            Ok(out)
        };

        let everything: Vec<&Unit> = units.iter().collect();
        let mut systems = BTreeMap::new();
        for system in self.store.systems()? {
            let scope: Vec<&Unit> = units.iter().filter(|u| u.system == system.id).collect();
            systems.insert(system.code().to_string(), SystemExport {
                system: SystemInfo {
                    name: system.name.clone(),
                    code: system.code().to_string(),
                    description: system.description.clone(),
                },
                dimensions: grouped(&scope)?,
            });
        }

        let document = ExportDocument {
            systems,
            dimensions: grouped(&everything)?,
            units: unit_exports.into_values().collect(),
        };
        info!(
            systems = document.systems.len(),
            dimensions = document.dimensions.len(),
            units = document.units.len(),
            "built export document"
        );
        Ok(document)
    }

    fn dimension_info(&self, dimension: &Dimension) -> Result<DimensionInfo, CatalogError> {
        let normal_unit = match dimension.normal_unit {
            Some(id) => Some(self.unit(id)?.abbreviation),
            None => None,
        };
        Ok(DimensionInfo {
            name: dimension.name.clone(),
            code: dimension.code().to_string(),
            normal_unit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standard::standard_catalog;
    use crate::{DimensionFields, SystemFields, UnitFields};

    #[test]
    fn test_export_shape() {
        let mut catalog = standard_catalog().unwrap();
        let doc = catalog.export().unwrap();

        let inch = &doc.units["US L in"];
        assert_eq!(inch.name, "Inch (in)");
        assert_eq!(inch.ratio.to_string(), "0.0254");
        assert_eq!(inch.system_code, "US");
        assert_eq!(inch.dimension_code, "L");

        let length = &doc.dimensions["L"];
        assert_eq!(length.dimension.normal_unit.as_deref(), Some("m"));
        assert!(length.units.contains_key("SI L m"));
        assert!(!length.units.contains_key("SI M kg"));

        let imperial = &doc.systems["IMP"];
        let codes: Vec<&String> = imperial.dimensions.keys().collect();
        assert_eq!(codes, vec!["M", "V"]);
        assert!(imperial.dimensions["M"].units.contains_key("IMP M st"));
        assert!(!imperial.dimensions["M"].units.contains_key("US M lb"));
    }

    #[test]
    fn test_export_caches_every_unit() {
        let mut catalog = standard_catalog().unwrap();
        catalog.export().unwrap();
        assert!(catalog.units().unwrap().iter().all(|u| u.normalized_quantity.is_some()));
    }

    #[test]
    fn test_export_json_uses_string_ratios() {
        let mut catalog = standard_catalog().unwrap();
        let json = catalog.export().unwrap().to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["units"]["US V gal"]["ratio"], "3.785411784");
        assert_eq!(value["dimensions"]["V"]["dimension"]["normal_unit"], "L");
    }

    #[test]
    fn test_system_without_units_is_listed_empty() {
        let mut catalog = standard_catalog().unwrap();
        catalog.create_system(SystemFields::new("Laboratory", "LAB", "Bench units")).unwrap();
        catalog.create_dimension(DimensionFields::new("Time", "Times", "T")).unwrap();
        let doc = catalog.export().unwrap();
        assert!(doc.systems["LAB"].dimensions.is_empty());
        assert!(!doc.dimensions.contains_key("T"));
    }

    #[test]
    fn test_export_ratios_match_normalize_all() {
        let mut normalized = standard_catalog().unwrap();
        assert_eq!(normalized.normalize_all().unwrap(), 24);
        let mut exported = standard_catalog().unwrap();
        let doc = exported.export().unwrap();

        for unit in normalized.units().unwrap() {
            let code = normalized.unit_code(&unit).unwrap();
            let cached = unit.normalized_quantity.unwrap();
            assert_eq!(doc.units[&code].ratio, cached.scalar, "{}", code);
            assert_eq!(exported.unit(unit.id).unwrap().normalized_quantity, Some(cached));
        }
    }

    #[test]
    fn test_export_fails_without_normal_unit() {
        let mut catalog = standard_catalog().unwrap();
        let inch = catalog.find_unit("Inch").unwrap();
        catalog.normalize(inch.id).unwrap();
        let cached = |catalog: &Catalog<_>| -> Vec<UnitId> {
            catalog.units().unwrap().into_iter().filter(|u| u.normalized_quantity.is_some()).map(|u| u.id).collect()
        };
        let before = cached(&catalog);

        let si = catalog.find_system("SI").unwrap();
        let time = catalog.create_dimension(DimensionFields::new("Time", "Times", "T")).unwrap();
        catalog.create_unit(UnitFields::new("Second", "s", si.id, time.id)).unwrap();
        assert!(matches!(catalog.export(), Err(CatalogError::MissingNormalUnit { .. })));

        // Nothing from the failed pass was published
        assert!(before.contains(&inch.id));
        assert_eq!(cached(&catalog), before);
    }
}
