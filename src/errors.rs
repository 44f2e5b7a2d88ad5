use thiserror::Error;

use crate::types::{FieldName, PaperId};

/// Error type for reconciliation, aggregation, and configuration failures.
///
/// Every variant aborts the current (venue, year) unit only; recoverable
/// conditions (missing optional fields, single-record list mismatches) are
/// logged and skipped instead of surfacing here.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("record '{id}' has mismatched parallel score lists: {details}")]
    ParallelArrayMismatch { id: PaperId, details: String },
    #[error("native id '{id}' occurs more than once within one source list")]
    DuplicateId { id: PaperId },
    #[error("record is missing required field '{0}'")]
    MissingField(FieldName),
    #[error("snapshot pairing failed: {0}")]
    SnapshotMismatch(String),
    #[error("consistency check failed for '{field}': {details}")]
    ConsistencyCheck { field: FieldName, details: String },
    #[error("malformed compressed array: {0}")]
    Codec(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}
