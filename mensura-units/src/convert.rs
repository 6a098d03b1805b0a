//! Unit conversion: ratios between units of one dimension

use std::fmt;
use dashu_ratio::RBig;
use mensura_core::{Scalar, ScalarError};
use crate::normalize::Resolver;
use crate::{Catalog, CatalogError, CatalogStore, Quantity, Unit, UnitId};

/// Exact conversion ratio between two units
///
/// Kept as a rational and rounded only when applied, so a ratio and its
/// reciprocal multiply back to exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ratio(RBig);

impl Ratio {
    /// The ratio `source / target` of two normalized scalars
    pub fn between(source: &Scalar, target: &Scalar) -> Result<Self, ScalarError> {
        if target.is_zero() {
            return Err(ScalarError::DivisionByZero);
        }
        Ok(Ratio(&source.to_ratio() / &target.to_ratio()))
    }

    pub fn reciprocal(&self) -> Result<Self, ScalarError> {
        if self.0 == RBig::ZERO {
            return Err(ScalarError::DivisionByZero);
        }
        Ok(Ratio(&RBig::ONE / &self.0))
    }

    /// Exact product of two ratios
    pub fn mul(&self, other: &Ratio) -> Ratio {
        Ratio(&self.0 * &other.0)
    }

    /// Scale a scalar by this ratio, rounding once
    pub fn apply(&self, scalar: &Scalar) -> Result<Scalar, ScalarError> {
        Scalar::from_ratio(&(&scalar.to_ratio() * &self.0))
    }

    /// The ratio rounded onto the fixed-point grid
    pub fn to_scalar(&self) -> Result<Scalar, ScalarError> {
        Scalar::from_ratio(&self.0)
    }

    pub fn is_one(&self) -> bool {
        self.0 == RBig::ONE
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_scalar() {
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "{}", self.0),
        }
    }
}

impl<S: CatalogStore> Resolver<'_, S> {
    pub(crate) fn check_consistent_dimensions(&self, source: &Unit, target: &Unit) -> Result<(), CatalogError> {
        if source.dimension == target.dimension {
            return Ok(());
        }
        Err(CatalogError::DimensionMismatch {
            from: source.display_name(),
            to: target.display_name(),
            from_dimension: self.dimension(source.dimension)?.name,
            to_dimension: self.dimension(target.dimension)?.name,
        })
    }

    /// Factor taking a scalar in `source` to the equivalent scalar in `target`
    pub(crate) fn ratio(&mut self, source: &Unit, target: &Unit) -> Result<Ratio, CatalogError> {
        self.check_consistent_dimensions(source, target)?;
        let from = self.resolve(source.id)?;
        let to = self.resolve(target.id)?;
        Ok(Ratio::between(&from.scalar, &to.scalar)?)
    }

    pub(crate) fn convert(&mut self, quantity: &Quantity, target: &Unit) -> Result<Quantity, CatalogError> {
        if quantity.unit == target.id {
            return Ok(quantity.clone());
        }
        let source = self.unit(quantity.unit)?;
        let ratio = self.ratio(&source, target)?;
        Ok(Quantity::new(ratio.apply(&quantity.scalar)?, target.id))
    }
}

impl<S: CatalogStore> Catalog<S> {
    /// Fail with `DimensionMismatch` unless both units share a dimension
    pub fn check_consistent_dimensions(&self, source: UnitId, target: UnitId) -> Result<(), CatalogError> {
        let source = self.unit(source)?;
        let target = self.unit(target)?;
        Resolver::new(&self.store, true).check_consistent_dimensions(&source, &target)
    }

    /// Factor converting a scalar in `source` into `target`
    ///
    /// Normalizations computed along the way are cached.
    pub fn ratio_to_target(&mut self, source: UnitId, target: UnitId) -> Result<Ratio, CatalogError> {
        let source = self.unit(source)?;
        let target = self.unit(target)?;
        let mut resolver = Resolver::new(&self.store, true);
        let ratio = resolver.ratio(&source, &target)?;
        let entries = resolver.into_entries();
        if !entries.is_empty() {
            self.store.save_normalized(&entries)?;
        }
        Ok(ratio)
    }

    /// Factor converting a scalar in `target` back into `source`
    pub fn ratio_to_source(&mut self, source: UnitId, target: UnitId) -> Result<Ratio, CatalogError> {
        Ok(self.ratio_to_target(source, target)?.reciprocal()?)
    }

    /// The quantity equivalent to `quantity`, expressed in `target`
    ///
    /// The result is rounded half-even to 9 fractional digits, so a round
    /// trip `A -> B -> A` may land one grid step away from the start. After
    /// that first trip the value is a fixed point: further round trips
    /// return it unchanged.
    pub fn convert(&mut self, quantity: &Quantity, target: UnitId) -> Result<Quantity, CatalogError> {
        if quantity.unit == target {
            return Ok(quantity.clone());
        }
        let ratio = self.ratio_to_target(quantity.unit, target)?;
        Ok(Quantity::new(ratio.apply(&quantity.scalar)?, target))
    }
}
