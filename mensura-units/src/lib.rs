//! Mensura Units - unit catalog, normalization and conversion
//!
//! A catalog holds unit systems, dimensions and units. Every unit except a
//! dimension's normal unit is defined as a quantity of another unit of the
//! same dimension; following those definitions down to the normal unit
//! *normalizes* a unit, and normalized quantities give exact conversion
//! ratios between any two units of one dimension.
//!
//! ```ignore
//! let mut catalog = standard_catalog()?;
//! let inch = catalog.find_unit("US L in")?;
//! let meter = catalog.find_unit("SI L m")?;
//! let q = Quantity::parse("12", inch.id)?.convert_to(meter.id, &mut catalog)?;
//! assert_eq!(q.scalar.to_string(), "0.3048");
//! ```

mod admin;
mod catalog;
mod convert;
mod dimension;
mod error;
mod export;
mod normalize;
mod quantity;
mod store;
mod system;
mod unit;
pub mod standard;

pub use catalog::Catalog;
pub use convert::Ratio;
pub use dimension::{Dimension, DimensionFields, DimensionId};
pub use error::CatalogError;
pub use export::{DimensionExport, DimensionInfo, ExportDocument, SystemExport, SystemInfo, UnitExport};
pub use quantity::Quantity;
pub use standard::standard_catalog;
pub use store::{CatalogSnapshot, CatalogStore, MemoryStore, StoreError, UnitFilter};
pub use system::{SystemFields, SystemId, UnitSystem};
pub use unit::{Unit, UnitFields, UnitId};
