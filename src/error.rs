use thiserror::Error;

use crate::relations::RelationKey;

/// Errors raised while loading tables or deriving cohorts.
///
/// Only integrity problems live here. Sparse data (non-finite values,
/// unmatched features, empty cohorts) is handled where it occurs.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no relation row for {key} = {id:?}")]
    RelationNotFound { key: RelationKey, id: String },

    #[error("unknown regime {0:?}")]
    UnknownRegime(String),

    #[error("{table}: missing column {column:?}")]
    MissingColumn { table: String, column: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DataError>;
