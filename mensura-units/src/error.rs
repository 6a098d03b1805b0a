//! Catalog and conversion errors

use thiserror::Error;
use mensura_core::{codes, MensuraError, ScalarError};
use crate::StoreError;

/// Errors raised by the catalog, the normalization engine and conversions
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Source and target units belong to different dimensions
    #[error("cannot convert {from} ({from_dimension}) to {to} ({to_dimension}): incompatible dimensions")]
    DimensionMismatch {
        from: String,
        to: String,
        from_dimension: String,
        to_dimension: String,
    },

    #[error("no normal unit is defined for dimension {dimension}")]
    MissingNormalUnit { dimension: String },

    #[error("unit {unit} is not the normal unit of its dimension and has no defining quantity")]
    MissingDefinition { unit: String },

    #[error("cyclic unit definition: {}", .path.join(" -> "))]
    CyclicDefinition { path: Vec<String> },

    #[error("normal unit {unit} of dimension {dimension} belongs to another dimension")]
    NormalUnitOutsideDimension { dimension: String, unit: String },

    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    #[error("unknown dimension: {0}")]
    UnknownDimension(String),

    #[error("unknown unit system: {0}")]
    UnknownSystem(String),

    #[error("{kind} '{value}' already exists")]
    Duplicate { kind: &'static str, value: String },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("{record} is still referenced by {by}")]
    InUse { record: String, by: String },

    #[error(transparent)]
    Scalar(#[from] ScalarError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl CatalogError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::DimensionMismatch { .. } => codes::DIMENSION_MISMATCH,
            CatalogError::MissingNormalUnit { .. } => codes::MISSING_NORMAL_UNIT,
            CatalogError::MissingDefinition { .. } => codes::MISSING_DEFINITION,
            CatalogError::CyclicDefinition { .. } => codes::CYCLIC_DEFINITION,
            CatalogError::NormalUnitOutsideDimension { .. } => codes::INVALID_NORMAL_UNIT,
            CatalogError::UnknownUnit(_) => codes::UNKNOWN_UNIT,
            CatalogError::UnknownDimension(_) => codes::UNKNOWN_DIMENSION,
            CatalogError::UnknownSystem(_) => codes::UNKNOWN_SYSTEM,
            CatalogError::Duplicate { .. } => codes::DUPLICATE,
            CatalogError::InUse { .. } => codes::IN_USE,
            CatalogError::Invalid { .. } => codes::INVALID_ARGUMENT,
            CatalogError::Scalar(ScalarError::ParseError(_)) => codes::PARSE_ERROR,
            CatalogError::Scalar(ScalarError::DivisionByZero) => codes::DIV_ZERO,
            CatalogError::Scalar(ScalarError::Overflow) => codes::OVERFLOW,
            CatalogError::Store(_) => codes::STORAGE,
        }
    }
}

impl From<CatalogError> for MensuraError {
    fn from(err: CatalogError) -> Self {
        let suggestion = match &err {
            CatalogError::DimensionMismatch { .. } => {
                Some("Pick a target unit from the same dimension")
            }
            CatalogError::MissingNormalUnit { .. } => {
                Some("Assign a normal unit to the dimension first")
            }
            CatalogError::MissingDefinition { .. } => {
                Some("Give the unit a defining quantity")
            }
            CatalogError::CyclicDefinition { .. } => {
                Some("Define one unit of the loop in terms of the normal unit")
            }
            CatalogError::InUse { .. } => Some("Remove the references first"),
            _ => None,
        };
        let mut out = MensuraError::new(err.code(), err.to_string());
        if let Some(s) = suggestion {
            out = out.with_suggestion(s);
        }
        out
    }
}
