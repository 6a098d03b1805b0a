//! Server configuration from the environment

use std::env;
use std::path::PathBuf;
use mensura_units::{standard_catalog, Catalog, CatalogError, CatalogSnapshot, MemoryStore};
use tracing::{info, warn};

/// Default destination of `refresh_export`
const DEFAULT_EXPORT_PATH: &str = "unit.data.json";

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Catalog snapshot, loaded at start and rewritten after mutations
    pub catalog_path: Option<PathBuf>,
    /// Where `refresh_export` writes the export document
    pub export_path: PathBuf,
}

impl Config {
    /// Read `MENSURA_CATALOG_PATH` and `MENSURA_EXPORT_PATH`
    pub fn from_env() -> Self {
        Config {
            catalog_path: env::var("MENSURA_CATALOG_PATH").ok().map(PathBuf::from),
            export_path: env::var("MENSURA_EXPORT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_EXPORT_PATH)),
        }
    }

    /// The configured snapshot if it exists, otherwise the standard catalog
    pub fn load_catalog(&self) -> Result<Catalog<MemoryStore>, CatalogError> {
        match &self.catalog_path {
            Some(path) if path.exists() => {
                let snapshot = CatalogSnapshot::load(path)?;
                info!(path = %path.display(), units = snapshot.units.len(), "loaded catalog snapshot");
                Ok(Catalog::new(MemoryStore::from_snapshot(snapshot)))
            }
            Some(path) => {
                warn!(path = %path.display(), "catalog snapshot not found, starting from the standard catalog");
                standard_catalog()
            }
            None => standard_catalog(),
        }
    }

    /// Write the catalog back to the snapshot path, if one is configured
    pub fn persist(&self, catalog: &Catalog<MemoryStore>) -> Result<(), CatalogError> {
        if let Some(path) = &self.catalog_path {
            catalog.store().snapshot().save(path)?;
        }
        Ok(())
    }
}
