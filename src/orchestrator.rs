//! Per-unit orchestration: merge, summarize, reconcile with external totals.
//!
//! The processing unit is one (venue, year, track). Units are independent
//! and own their record lists exclusively; callers may run them on a worker
//! pool. The only shared input is the read-only metadata table.

use serde::Serialize;
use tracing::debug;

use crate::constants::{fields, tiers};
use crate::errors::MergeError;
use crate::merger::{MergeDiagnostics, Merger};
use crate::policy::{venue_key, MetadataTable, VenueMetadata, VenuePolicy};
use crate::record::Record;
use crate::summarizer::{
    frequency_wire, CompressedSeries, ExtractionMode, RecordFilter, Summarizer,
};
use crate::tiers::{Acceptance, TierEntry, TierRegistry, TierTable};
use crate::types::{FieldName, TierName, TrackName};

/// Multi-valued fields reported as frequency tables, with the extraction
/// mode each one uses. Affiliations count once per paper; the rest count
/// every occurrence.
const FREQUENCY_FIELDS: [(&str, ExtractionMode); 4] = [
    (fields::AUTHOR, ExtractionMode::All),
    (fields::AFFILIATION, ExtractionMode::UniquePerRecord),
    (fields::POSITION, ExtractionMode::All),
    (fields::KEYWORDS, ExtractionMode::All),
];

/// Input bundle for one (venue, year, track) unit.
#[derive(Clone, Debug)]
pub struct MergeUnit {
    /// Venue identifier. Example: `iclr`.
    pub venue: String,
    /// Edition year.
    pub year: u16,
    /// Track name; `main` for the default track.
    pub track: TrackName,
    /// Review-platform list (authoritative side).
    pub primary: Vec<Record>,
    /// Site or open-access list, when one was scraped.
    pub secondary: Option<Vec<Record>>,
    /// Initial snapshot for transfer matrices.
    pub initial: Option<Vec<Record>>,
}

/// Tier counts observed in one raw source list, before merging.
#[derive(Clone, Debug, Serialize)]
pub struct SourceSummary {
    /// Source label. Example: `review_platform`.
    pub source: String,
    /// Per-tier counts with unit-scoped ids.
    pub tiers: TierTable,
}

/// Aggregate output for one unit, handed to the persistence layer.
#[derive(Clone, Debug, Serialize)]
pub struct VenueSummary {
    /// Venue identifier.
    pub venue: String,
    /// Edition year.
    pub year: u16,
    /// Track name.
    pub track: TrackName,
    /// Per-tier counts in reporting order, ending with the reserved `Total`
    /// (and `Total0` when an initial snapshot was supplied) entries.
    pub tiers: Vec<TierEntry>,
    /// Accepted-paper totals after external reconciliation.
    pub acceptance: Acceptance,
    /// score field -> tier -> compressed histogram.
    pub histograms: indexmap::IndexMap<FieldName, indexmap::IndexMap<TierName, CompressedSeries>>,
    /// score field -> tier -> compressed transfer matrix.
    pub transfers: indexmap::IndexMap<FieldName, indexmap::IndexMap<TierName, CompressedSeries>>,
    /// entity field -> `name:count;...` frequency wire string.
    pub frequencies: indexmap::IndexMap<FieldName, String>,
    /// Abbreviated tier ordering for renderers, when the venue defines one.
    pub t_order_brief: Vec<TierName>,
    /// Match and leftover counters from the merge.
    pub diagnostics: MergeDiagnostics,
}

/// Everything a unit produces: the merged list plus its summaries.
#[derive(Clone, Debug)]
pub struct ProcessedUnit {
    /// Merged, enriched, title-sorted record list.
    pub records: Vec<Record>,
    /// Aggregate statistics.
    pub summary: VenueSummary,
    /// Tier counts per raw input source.
    pub source_summaries: Vec<SourceSummary>,
}

/// Drives the merger and summarizer for one unit at a time.
pub struct Orchestrator<'a> {
    policy: &'a VenuePolicy,
    metadata: &'a MetadataTable,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator over one venue policy and the shared metadata
    /// table.
    pub fn new(policy: &'a VenuePolicy, metadata: &'a MetadataTable) -> Self {
        Self { policy, metadata }
    }

    /// Process one unit: merge the source pair, compute statistics, and
    /// reconcile counts with authoritative metadata. Failures abort this
    /// unit only.
    pub fn process(&self, unit: MergeUnit) -> Result<ProcessedUnit, MergeError> {
        let key = venue_key(&unit.venue, unit.year, Some(&unit.track));
        let fallback = VenueMetadata::default();
        let metadata = self.metadata.get(&key).unwrap_or(&fallback);
        debug!(%key, papers = unit.primary.len(), "processing unit");

        let mut registry = TierRegistry::new();
        let mut source_summaries = vec![SourceSummary {
            source: crate::record::RecordSource::ReviewPlatform.label().to_string(),
            tiers: TierTable::from_records(&unit.primary, self.policy, &[], &mut registry),
        }];
        if let Some(secondary) = &unit.secondary {
            source_summaries.push(SourceSummary {
                source: crate::record::RecordSource::Site.label().to_string(),
                tiers: TierTable::from_records(secondary, self.policy, &[], &mut registry),
            });
        }

        let merger = Merger::new(self.policy);
        let outcome = merger.merge(unit.primary, unit.secondary.unwrap_or_default())?;
        let records = outcome.records;

        let summarizer = Summarizer::new(self.policy);
        let mut stats = summarizer.summarize(
            &records,
            unit.initial.as_deref(),
            &metadata.t_order,
            &mut registry,
        )?;
        let acceptance = stats
            .tier_table
            .reconcile_with_external_totals(metadata, &mut registry);

        let mut tier_entries = stats.tier_table.entries.clone();
        tier_entries.push(TierEntry {
            id: registry.ensure_id(tiers::TOTAL),
            raw_name: tiers::TOTAL.to_string(),
            name: tiers::TOTAL.to_string(),
            count: stats.tier_table.total,
        });
        if let Some(initial) = &unit.initial {
            let total0 = metadata.total0.unwrap_or(initial.len());
            tier_entries.push(TierEntry {
                id: registry.ensure_id(tiers::TOTAL0),
                raw_name: tiers::TOTAL0.to_string(),
                name: tiers::TOTAL0.to_string(),
                count: total0,
            });
        }

        let mut frequencies = indexmap::IndexMap::new();
        for (field, mode) in FREQUENCY_FIELDS {
            if !records.iter().any(|record| record.has_content(field)) {
                continue;
            }
            let ranked =
                summarizer.entity_frequency(&records, field, mode, &RecordFilter::default(), None);
            frequencies.insert(field.to_string(), frequency_wire(&ranked));
        }

        let t_order_brief = if metadata.t_order_brief.is_empty() {
            self.policy.t_order_brief.clone()
        } else {
            metadata.t_order_brief.clone()
        };

        let summary = VenueSummary {
            venue: unit.venue,
            year: unit.year,
            track: unit.track,
            tiers: tier_entries,
            acceptance,
            histograms: std::mem::take(&mut stats.histograms),
            transfers: std::mem::take(&mut stats.transfers),
            frequencies,
            t_order_brief,
            diagnostics: outcome.diagnostics,
        };

        Ok(ProcessedUnit {
            records,
            summary,
            source_summaries,
        })
    }
}
