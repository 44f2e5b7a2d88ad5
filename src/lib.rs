#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Run-length codec for histogram and matrix wire strings.
pub mod codec;
/// Centralized constants: field names, bucket shapes, reserved tiers.
pub mod constants;
/// Cross-source record reconciliation (the merger).
pub mod merger;
/// Per-unit orchestration: merge, summarize, reconcile external totals.
pub mod orchestrator;
/// Venue policies and the external metadata table.
pub mod policy;
/// Record type and field accessors.
pub mod record;
/// Statistical aggregation (the summarizer).
pub mod summarizer;
/// Tier registry, tables, and acceptance totals.
pub mod tiers;
/// Shared type aliases.
pub mod types;
/// Text normalization helpers.
pub mod utils;

mod errors;
mod hash;

pub use errors::MergeError;
pub use hash::synthetic_id;
pub use merger::{title_similarity, MergeDiagnostics, MergeOutcome, Merger};
pub use orchestrator::{MergeUnit, Orchestrator, ProcessedUnit, SourceSummary, VenueSummary};
pub use policy::{venue_key, JoinStrategy, LeftoverPolicy, MetadataTable, VenueMetadata, VenuePolicy};
pub use record::{Record, RecordSource};
pub use summarizer::{
    frequency_wire, CompressedSeries, EntityCount, ExtractionMode, RecordFilter, Summarizer,
    UnitStats,
};
pub use tiers::{Acceptance, TierEntry, TierRegistry, TierTable};
pub use types::{
    EntityName, FieldName, FieldValue, PaperId, TierId, TierName, TitleKey, TrackName, VenueKey,
};
