//! The standard catalog: common length, volume and mass units
//!
//! Systems: SI, US customary (US) and Imperial (IMP). Each non-normal unit
//! is defined by the exact legal value of its definition, in terms of the
//! unit it is conventionally derived from.

use mensura_core::Scalar;
use crate::{
    Catalog, CatalogError, DimensionFields, DimensionId, MemoryStore, Quantity, SystemFields,
    SystemId, UnitFields, UnitId,
};

/// Build the standard catalog in a fresh `MemoryStore`
pub fn standard_catalog() -> Result<Catalog<MemoryStore>, CatalogError> {
    let mut catalog = Catalog::new(MemoryStore::new());
    Seeder::new(&mut catalog)?.register_all_units()?;
    Ok(catalog)
}

struct Seeder<'c> {
    catalog: &'c mut Catalog<MemoryStore>,
    si: SystemId,
    us: SystemId,
    imperial: SystemId,
}

impl<'c> Seeder<'c> {
    fn new(catalog: &'c mut Catalog<MemoryStore>) -> Result<Self, CatalogError> {
        let si = catalog.create_system(SystemFields::new(
            "International System of Units", "SI", "The modern metric system",
        ))?.id;
        let us = catalog.create_system(SystemFields::new(
            "United States customary units", "US", "Units in customary use in the United States",
        ))?.id;
        let imperial = catalog.create_system(SystemFields::new(
            "Imperial units", "IMP", "British imperial units",
        ))?.id;
        Ok(Seeder { catalog, si, us, imperial })
    }

    fn register_all_units(&mut self) -> Result<(), CatalogError> {
        self.register_length_units()?;
        self.register_volume_units()?;
        self.register_mass_units()?;
        Ok(())
    }

    fn dimension(&mut self, name: &str, plural: &str, abbreviation: &str) -> Result<DimensionId, CatalogError> {
        Ok(self.catalog.create_dimension(DimensionFields::new(name, plural, abbreviation))?.id)
    }

    /// A normal unit, which needs no definition
    fn base(
        &mut self,
        dimension: DimensionId,
        system: SystemId,
        (name, plural, abbreviation): (&str, &str, &str),
    ) -> Result<UnitId, CatalogError> {
        let fields = UnitFields::new(name, abbreviation, system, dimension)
            .plural(plural, abbreviation);
        let unit = self.catalog.create_unit(fields)?;
        self.catalog.set_normal_unit(dimension, Some(unit.id))?;
        Ok(unit.id)
    }

    /// A unit defined as `scalar` of another unit
    fn define(
        &mut self,
        dimension: DimensionId,
        system: SystemId,
        (name, plural, abbreviation): (&str, &str, &str),
        scalar: &str,
        of: UnitId,
    ) -> Result<UnitId, CatalogError> {
        let fields = UnitFields::new(name, abbreviation, system, dimension)
            .plural(plural, abbreviation)
            .defined_as(Quantity::new(Scalar::from_str(scalar)?, of));
        Ok(self.catalog.create_unit(fields)?.id)
    }

    fn register_length_units(&mut self) -> Result<(), CatalogError> {
        let (si, us) = (self.si, self.us);
        let length = self.dimension("Length", "Lengths", "L")?;

        let m = self.base(length, si, ("Meter", "Meters", "m"))?;
        let cm = self.define(length, si, ("Centimeter", "Centimeters", "cm"), "0.01", m)?;
        self.define(length, si, ("Millimeter", "Millimeters", "mm"), "0.001", m)?;
        self.define(length, si, ("Kilometer", "Kilometers", "km"), "1000", m)?;

        let inch = self.define(length, us, ("Inch", "Inches", "in"), "2.54", cm)?;
        let ft = self.define(length, us, ("Foot", "Feet", "ft"), "12", inch)?;
        let yd = self.define(length, us, ("Yard", "Yards", "yd"), "3", ft)?;
        self.define(length, us, ("Mile", "Miles", "mi"), "1760", yd)?;
        Ok(())
    }

    fn register_volume_units(&mut self) -> Result<(), CatalogError> {
        let (si, us, imp) = (self.si, self.us, self.imperial);
        let volume = self.dimension("Volume", "Volumes", "V")?;

        let l = self.base(volume, si, ("Liter", "Liters", "L"))?;
        let ml = self.define(volume, si, ("Milliliter", "Milliliters", "mL"), "0.001", l)?;

        let gal = self.define(volume, us, ("Gallon", "Gallons", "gal"), "3.785411784", l)?;
        let qt = self.define(volume, us, ("Quart", "Quarts", "qt"), "0.25", gal)?;
        let pt = self.define(volume, us, ("Pint", "Pints", "pt"), "0.5", qt)?;
        let cup = self.define(volume, us, ("Cup", "Cups", "cup"), "0.5", pt)?;
        let floz = self.define(volume, us, ("Fluid Ounce", "Fluid Ounces", "fl oz"), "0.125", cup)?;
        self.define(volume, us, ("Tablespoon", "Tablespoons", "tbsp"), "0.5", floz)?;
        self.define(volume, us, ("Teaspoon", "Teaspoons", "tsp"), "4.928921594", ml)?;

        let imp_gal = self.define(volume, imp, ("Imperial Gallon", "Imperial Gallons", "gal"), "4.54609", l)?;
        self.define(volume, imp, ("Imperial Pint", "Imperial Pints", "pt"), "0.125", imp_gal)?;
        Ok(())
    }

    fn register_mass_units(&mut self) -> Result<(), CatalogError> {
        let (si, us, imp) = (self.si, self.us, self.imperial);
        let mass = self.dimension("Mass", "Masses", "M")?;

        let kg = self.base(mass, si, ("Kilogram", "Kilograms", "kg"))?;
        self.define(mass, si, ("Gram", "Grams", "g"), "0.001", kg)?;

        let lb = self.define(mass, us, ("Pound", "Pounds", "lb"), "0.45359237", kg)?;
        self.define(mass, us, ("Ounce", "Ounces", "oz"), "0.0625", lb)?;
        self.define(mass, imp, ("Stone", "Stone", "st"), "14", lb)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_contents() {
        let catalog = standard_catalog().unwrap();
        assert_eq!(catalog.systems().unwrap().len(), 3);
        assert_eq!(catalog.dimensions().unwrap().len(), 3);
        assert_eq!(catalog.units().unwrap().len(), 24);
    }

    #[test]
    fn test_every_dimension_has_a_normal_unit() {
        let catalog = standard_catalog().unwrap();
        for dimension in catalog.dimensions().unwrap() {
            assert!(catalog.normal_unit(dimension.id).unwrap().is_some(), "{}", dimension);
        }
    }

    #[test]
    fn test_whole_catalog_normalizes() {
        let mut catalog = standard_catalog().unwrap();
        assert_eq!(catalog.normalize_all().unwrap(), 24);
        let stone = catalog.find_unit("Stone").unwrap();
        assert_eq!(stone.normalized_quantity.unwrap().scalar.to_string(), "6.35029318");
    }

    #[test]
    fn test_same_abbreviation_in_different_systems() {
        let catalog = standard_catalog().unwrap();
        let us = catalog.find_unit("US V gal").unwrap();
        let imp = catalog.find_unit("IMP V gal").unwrap();
        assert_ne!(us, imp);
        assert_eq!(imp.name, "Imperial Gallon");
    }
}
