//! Statistical aggregation over merged record lists.
//!
//! All operations are pure functions over in-memory lists: per-tier score
//! histograms, transfer matrices between an initial and a final snapshot,
//! and frequency tables over multi-valued fields. Computation order inside
//! [`Summarizer::summarize`] matters: Active and Withdraw histograms precede
//! the Post Decision Withdraw derivation, and initial-snapshot histograms
//! precede every transfer matrix.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::codec::{compress, compress_matrix};
use crate::constants::codec::DEFAULT_ZERO_RUN_THRESHOLD;
use crate::constants::histogram::{
    ACTIVE_STALE_FRACTION, BUCKETS, DELTA_ORIGIN, RESOLUTION, SCORE_MAX,
};
use crate::constants::{fields, tiers};
use crate::errors::MergeError;
use crate::policy::VenuePolicy;
use crate::record::Record;
use crate::tiers::{post_decision_withdraw, TierRegistry, TierTable};
use crate::types::{EntityName, FieldName, TierName, TrackName};

/// How entities are drawn from a multi-valued field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Every occurrence counts.
    All,
    /// Each entity counts at most once per record.
    UniquePerRecord,
    /// Only the first entry of each record counts.
    FirstOnly,
    /// Only the last entry of each record counts.
    LastOnly,
}

impl FromStr for ExtractionMode {
    type Err = MergeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(Self::All),
            "unique" => Ok(Self::UniquePerRecord),
            "first" => Ok(Self::FirstOnly),
            "last" => Ok(Self::LastOnly),
            other => Err(MergeError::Configuration(format!(
                "unknown extraction mode '{other}'"
            ))),
        }
    }
}

/// Optional exact-match predicates applied before aggregation.
#[derive(Clone, Debug, Default)]
pub struct RecordFilter {
    /// Display tier name the record's status must map to.
    pub status: Option<TierName>,
    /// Required track value.
    pub track: Option<TrackName>,
    /// Required primary-area value.
    pub area: Option<String>,
}

impl RecordFilter {
    /// Filter on a display tier only.
    pub fn by_status(name: impl Into<TierName>) -> Self {
        Self {
            status: Some(name.into()),
            ..Self::default()
        }
    }

    fn matches(&self, record: &Record, policy: &VenuePolicy) -> bool {
        if let Some(status) = &self.status {
            if policy.display_name(record.status()) != status {
                return false;
            }
        }
        if let Some(track) = &self.track {
            if record.track() != track {
                return false;
            }
        }
        if let Some(area) = &self.area {
            if record.field(fields::PRIMARY_AREA) != Some(area.as_str()) {
                return false;
            }
        }
        true
    }
}

/// A compressed histogram or matrix plus the record count binned into it.
#[derive(Clone, Debug, Serialize)]
pub struct CompressedSeries {
    /// Records binned; always equals the decompressed bucket sum.
    pub sum: usize,
    /// Run-length compressed wire string.
    pub data: String,
}

/// One entity's frequency row.
#[derive(Clone, Debug, Serialize)]
pub struct EntityCount {
    /// Entity text as first encountered.
    pub entity: EntityName,
    /// Occurrences under the extraction mode.
    pub total: usize,
    /// Occurrences per display tier, in first-seen tier order.
    pub per_status: IndexMap<TierName, usize>,
}

/// Render frequency rows as the `name:count;name:count` wire string the
/// persistence layer stores.
pub fn frequency_wire(entries: &[EntityCount]) -> String {
    let mut out = String::new();
    for (idx, entry) in entries.iter().enumerate() {
        if idx > 0 {
            out.push(';');
        }
        out.push_str(&entry.entity);
        out.push(':');
        out.push_str(&entry.total.to_string());
    }
    out
}

/// Full per-unit statistics produced by [`Summarizer::summarize`].
#[derive(Clone, Debug, Serialize)]
pub struct UnitStats {
    /// Per-tier counts in reporting order.
    pub tier_table: TierTable,
    /// score field -> tier display name -> histogram. Reserved keys `Total`
    /// (final snapshot) and `Total0` (initial snapshot) sit alongside tiers.
    pub histograms: IndexMap<FieldName, IndexMap<TierName, CompressedSeries>>,
    /// score field -> tier display name -> transfer matrix; empty without an
    /// initial snapshot.
    pub transfers: IndexMap<FieldName, IndexMap<TierName, CompressedSeries>>,
    /// Derived `Post Decision Withdraw` count.
    pub post_decision_withdraw: usize,
    /// Whether the Active tier's series were rebuilt from terminal tiers.
    pub active_backfilled: bool,
}

/// Computes histograms, transfer matrices, and entity frequencies for one
/// (venue, year) unit.
pub struct Summarizer<'a> {
    policy: &'a VenuePolicy,
    zero_run_threshold: usize,
}

impl<'a> Summarizer<'a> {
    /// Create a summarizer bound to one venue's policy.
    pub fn new(policy: &'a VenuePolicy) -> Self {
        Self {
            policy,
            zero_run_threshold: DEFAULT_ZERO_RUN_THRESHOLD,
        }
    }

    /// Histogram of `score_field` averages over records passing `filter`.
    pub fn histogram(
        &self,
        records: &[Record],
        score_field: &str,
        filter: &RecordFilter,
    ) -> CompressedSeries {
        let (sum, buckets) = self.buckets_for(records, score_field, filter, false);
        CompressedSeries {
            sum,
            data: compress(&buckets, self.zero_run_threshold),
        }
    }

    /// Histogram with the built-in consistency guard: the same histogram is
    /// recomputed from the raw per-reviewer score strings and must agree
    /// bucket-for-bucket with the precomputed-average version. Disagreement
    /// means a stale precomputed average upstream and aborts the unit.
    pub fn histogram_checked(
        &self,
        records: &[Record],
        score_field: &str,
        filter: &RecordFilter,
    ) -> Result<CompressedSeries, MergeError> {
        let (sum, buckets) = self.buckets_for(records, score_field, filter, false);
        let (raw_sum, raw_buckets) = self.buckets_for(records, score_field, filter, true);
        if buckets != raw_buckets {
            return Err(MergeError::ConsistencyCheck {
                field: score_field.to_string(),
                details: format!(
                    "precomputed averages bin {sum} records differently than raw scores ({raw_sum})"
                ),
            });
        }
        Ok(CompressedSeries {
            sum,
            data: compress(&buckets, self.zero_run_threshold),
        })
    }

    /// Transfer matrix of `score_field` movement from `initial` to `finals`.
    ///
    /// Final-list records absent from the initial snapshot (by id) are
    /// dropped before pairing; after that both sequences must align.
    pub fn transfer_matrix(
        &self,
        finals: &[Record],
        initial: &[Record],
        score_field: &str,
        filter: &RecordFilter,
    ) -> Result<CompressedSeries, MergeError> {
        let pairs = pair_snapshots(finals, initial)?;
        let (sum, matrix) = self.matrix_for(&pairs, score_field, filter);
        Ok(CompressedSeries {
            sum,
            data: compress_matrix(&matrix, self.zero_run_threshold),
        })
    }

    /// Ranked entity frequencies over a multi-valued field.
    ///
    /// Ordering is by descending total, ties broken by first-encountered
    /// order; `top_n` truncates after ranking.
    pub fn entity_frequency(
        &self,
        records: &[Record],
        entity_field: &str,
        mode: ExtractionMode,
        filter: &RecordFilter,
        top_n: Option<usize>,
    ) -> Vec<EntityCount> {
        let mut counts: IndexMap<EntityName, EntityCount> = IndexMap::new();
        for record in records {
            if !filter.matches(record, self.policy) {
                continue;
            }
            let Some(raw) = record.field(entity_field) else {
                continue;
            };
            let mut entries = crate::utils::split_list(raw);
            if entries.is_empty() {
                continue;
            }
            // Author names pair positionally with author ids; a length
            // mismatch poisons the pairing for this record only.
            if entity_field == fields::AUTHOR && record.has_content(fields::AUTHORIDS) {
                let ids = crate::utils::split_list(record.field(fields::AUTHORIDS).unwrap_or(""));
                if ids.len() != entries.len() {
                    warn!(
                        id = record.id().unwrap_or(""),
                        names = entries.len(),
                        ids = ids.len(),
                        "author/authorids length mismatch, record skipped"
                    );
                    continue;
                }
            }
            match mode {
                ExtractionMode::All => {}
                ExtractionMode::UniquePerRecord => {
                    let mut seen: Vec<String> = Vec::new();
                    entries.retain(|entry| {
                        if seen.contains(entry) {
                            false
                        } else {
                            seen.push(entry.clone());
                            true
                        }
                    });
                }
                ExtractionMode::FirstOnly => entries.truncate(1),
                ExtractionMode::LastOnly => {
                    entries = entries.split_off(entries.len() - 1);
                }
            }
            let status = self.policy.display_name(record.status()).to_string();
            for entry in entries {
                let slot = counts.entry(entry.clone()).or_insert_with(|| EntityCount {
                    entity: entry,
                    total: 0,
                    per_status: IndexMap::new(),
                });
                slot.total += 1;
                *slot.per_status.entry(status.clone()).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<EntityCount> = counts.into_values().collect();
        ranked.sort_by(|a, b| b.total.cmp(&a.total));
        if let Some(top_n) = top_n {
            ranked.truncate(top_n);
        }
        ranked
    }

    /// Compute the complete per-unit statistics: the tier table, per-tier
    /// histograms for every present review dimension, the stale-Active
    /// backfill, the Post Decision Withdraw derivation, and (with an initial
    /// snapshot) Total0 histograms plus transfer matrices.
    pub fn summarize(
        &self,
        records: &[Record],
        initial: Option<&[Record]>,
        order_override: &[TierName],
        registry: &mut TierRegistry,
    ) -> Result<UnitStats, MergeError> {
        let mut table = TierTable::from_records(records, self.policy, order_override, registry);
        let score_fields: Vec<&str> = fields::SCORE_FIELDS
            .into_iter()
            .filter(|field| records.iter().any(|record| record.has_content(field)))
            .collect();

        let active_count = table.count_of(tiers::ACTIVE);
        let mut active_backfilled = false;
        let mut histograms: IndexMap<FieldName, IndexMap<TierName, CompressedSeries>> =
            IndexMap::new();
        // Uncompressed per-tier buckets, kept per field for the backfill.
        let mut raw_histograms: Vec<(String, IndexMap<TierName, (usize, Vec<u64>)>)> = Vec::new();

        for &field in &score_fields {
            // Consistency guard runs once per dimension, on the unfiltered
            // histogram.
            self.histogram_checked(records, field, &RecordFilter::default())?;
            let mut per_tier: IndexMap<TierName, (usize, Vec<u64>)> = IndexMap::new();
            per_tier.insert(
                tiers::TOTAL.to_string(),
                self.buckets_for(records, field, &RecordFilter::default(), false),
            );
            for entry in &table.entries {
                let filter = RecordFilter::by_status(entry.name.clone());
                per_tier.insert(
                    entry.name.clone(),
                    self.buckets_for(records, field, &filter, false),
                );
            }

            let active_sum = per_tier
                .get(tiers::ACTIVE)
                .map_or(0, |(sum, _)| *sum);
            let stale = active_sum == 0
                || (active_sum as f64) < active_count as f64 * ACTIVE_STALE_FRACTION;
            if stale {
                let mut buckets = vec![0u64; BUCKETS];
                let mut sum = 0usize;
                for entry in table.terminal_entries() {
                    if let Some((tier_sum, tier_buckets)) = per_tier.get(&entry.name) {
                        sum += tier_sum;
                        for (slot, value) in buckets.iter_mut().zip(tier_buckets) {
                            *slot += value;
                        }
                    }
                }
                if sum > 0 {
                    per_tier.insert(tiers::ACTIVE.to_string(), (sum, buckets));
                    active_backfilled = true;
                }
            }
            raw_histograms.push((field.to_string(), per_tier));
        }

        // The displayed Active count tracks the backfilled sum of the
        // primary dimension.
        if active_backfilled {
            if let Some((_, per_tier)) = raw_histograms.first() {
                if let Some((sum, _)) = per_tier.get(tiers::ACTIVE) {
                    table.set_count(tiers::ACTIVE, *sum, registry);
                }
            }
        }

        // Post Decision Withdraw needs the Active and Withdraw numbers above.
        let withdraw_count = table.count_of(tiers::WITHDRAW);
        let withdrawn_with_scores = score_fields.first().map_or(0, |&field| {
            records
                .iter()
                .filter(|record| {
                    self.policy.display_name(record.status()) == tiers::WITHDRAW
                        && record.score_values(field).is_some()
                })
                .count()
        });
        let pdw = post_decision_withdraw(withdraw_count, withdrawn_with_scores);
        if withdraw_count > 0 {
            table.set_count(tiers::POST_DECISION_WITHDRAW, pdw, registry);
        }

        // Initial-snapshot histograms precede every transfer matrix.
        let mut transfers: IndexMap<FieldName, IndexMap<TierName, CompressedSeries>> =
            IndexMap::new();
        if let Some(initial) = initial {
            for (field, per_tier) in &mut raw_histograms {
                per_tier.insert(
                    tiers::TOTAL0.to_string(),
                    self.buckets_for(initial, field, &RecordFilter::default(), false),
                );
            }

            let pairs = pair_snapshots(records, initial)?;
            for &field in &score_fields {
                let mut per_tier: IndexMap<TierName, (usize, Vec<Vec<u64>>)> = IndexMap::new();
                per_tier.insert(
                    tiers::TOTAL.to_string(),
                    self.matrix_for(&pairs, field, &RecordFilter::default()),
                );
                for entry in &table.entries {
                    if entry.name == tiers::POST_DECISION_WITHDRAW {
                        continue;
                    }
                    let filter = RecordFilter::by_status(entry.name.clone());
                    per_tier.insert(entry.name.clone(), self.matrix_for(&pairs, field, &filter));
                }
                if active_backfilled {
                    let mut matrix = vec![vec![0u64; BUCKETS]; BUCKETS];
                    let mut sum = 0usize;
                    for entry in table.terminal_entries() {
                        if let Some((tier_sum, tier_matrix)) = per_tier.get(&entry.name) {
                            sum += tier_sum;
                            for (row, tier_row) in matrix.iter_mut().zip(tier_matrix) {
                                for (slot, value) in row.iter_mut().zip(tier_row) {
                                    *slot += value;
                                }
                            }
                        }
                    }
                    per_tier.insert(tiers::ACTIVE.to_string(), (sum, matrix));
                }
                let compressed: IndexMap<TierName, CompressedSeries> = per_tier
                    .into_iter()
                    .map(|(name, (sum, matrix))| {
                        (
                            name,
                            CompressedSeries {
                                sum,
                                data: compress_matrix(&matrix, self.zero_run_threshold),
                            },
                        )
                    })
                    .collect();
                transfers.insert(field.to_string(), compressed);
            }
        }

        for (field, per_tier) in raw_histograms {
            let compressed: IndexMap<TierName, CompressedSeries> = per_tier
                .into_iter()
                .map(|(name, (sum, buckets))| {
                    (
                        name,
                        CompressedSeries {
                            sum,
                            data: compress(&buckets, self.zero_run_threshold),
                        },
                    )
                })
                .collect();
            histograms.insert(field, compressed);
        }

        debug!(
            venue = %self.policy.venue,
            dimensions = histograms.len(),
            active_backfilled,
            post_decision_withdraw = pdw,
            "unit statistics computed"
        );

        Ok(UnitStats {
            tier_table: table,
            histograms,
            transfers,
            post_decision_withdraw: pdw,
            active_backfilled,
        })
    }

    fn buckets_for(
        &self,
        records: &[Record],
        score_field: &str,
        filter: &RecordFilter,
        from_raw: bool,
    ) -> (usize, Vec<u64>) {
        let mut buckets = vec![0u64; BUCKETS];
        let mut sum = 0usize;
        for record in records {
            if !filter.matches(record, self.policy) {
                continue;
            }
            let avg = if from_raw {
                // Records carrying only a precomputed average cannot be
                // recomputed; they fall back so both paths agree on them.
                record
                    .score_avg_from_raw(score_field)
                    .or_else(|| record.score_avg(score_field))
            } else {
                record.score_avg(score_field)
            };
            let Some(avg) = avg else {
                continue;
            };
            buckets[bucket_of(avg)] += 1;
            sum += 1;
        }
        (sum, buckets)
    }

    fn matrix_for(
        &self,
        pairs: &[(Record, Record)],
        score_field: &str,
        filter: &RecordFilter,
    ) -> (usize, Vec<Vec<u64>>) {
        let mut matrix = vec![vec![0u64; BUCKETS]; BUCKETS];
        let mut sum = 0usize;
        for (final_record, initial_record) in pairs {
            if !filter.matches(final_record, self.policy) {
                continue;
            }
            let (Some(final_avg), Some(initial_avg)) = (
                final_record.score_avg(score_field),
                initial_record.score_avg(score_field),
            ) else {
                continue;
            };
            let initial_avg = clip_score(initial_avg);
            let final_avg = clip_score(final_avg);
            let row = bucket_of(initial_avg);
            let delta = (((final_avg - initial_avg) * BUCKET_SCALE).floor()) as i64;
            let col = (DELTA_ORIGIN as i64 + delta).clamp(0, BUCKETS as i64 - 1) as usize;
            matrix[row][col] += 1;
            sum += 1;
        }
        (sum, matrix)
    }
}

/// Pair a final list with an initial snapshot by identifier.
///
/// Final records absent from the initial snapshot (by id) are dropped with a
/// note; afterwards the two sequences must have equal length, and any
/// position where both ids are present but disagree is a fatal ordering
/// violation. Positions where either id is missing are skipped.
fn pair_snapshots(
    finals: &[Record],
    initial: &[Record],
) -> Result<Vec<(Record, Record)>, MergeError> {
    let initial_ids: IndexMap<&str, &Record> = initial
        .iter()
        .filter_map(|record| record.id().map(|id| (id, record)))
        .collect();

    let aligned: Vec<&Record> = finals
        .iter()
        .filter(|record| record.id().is_some_and(|id| initial_ids.contains_key(id)))
        .collect();
    let dropped = finals.len() - aligned.len();
    if dropped > 0 {
        debug!(dropped, "final-only records dropped before snapshot pairing");
    }

    if aligned.len() != initial.len() {
        return Err(MergeError::SnapshotMismatch(format!(
            "{} final records vs {} initial records after reconciliation",
            aligned.len(),
            initial.len()
        )));
    }

    let mut pairs = Vec::with_capacity(aligned.len());
    for (final_record, initial_record) in aligned.iter().zip(initial) {
        let (Some(final_id), Some(initial_id)) = (final_record.id(), initial_record.id()) else {
            warn!("snapshot pair with missing id skipped");
            continue;
        };
        if final_id != initial_id {
            return Err(MergeError::SnapshotMismatch(format!(
                "id sequences diverge: '{final_id}' vs '{initial_id}'"
            )));
        }
        pairs.push(((*final_record).clone(), initial_record.clone()));
    }
    Ok(pairs)
}

/// Buckets per score unit. Kept as a derived constant so binning multiplies
/// by an exactly representable 10.0 instead of dividing by 0.1.
const BUCKET_SCALE: f64 = BUCKETS as f64 / SCORE_MAX;

fn clip_score(score: f64) -> f64 {
    score.clamp(0.0, SCORE_MAX - RESOLUTION)
}

fn bucket_of(score: f64) -> usize {
    ((score * BUCKET_SCALE).floor() as i64).clamp(0, BUCKETS as i64 - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordSource;

    fn record(id: &str, status: &str, rating: &str) -> Record {
        Record::new(RecordSource::ReviewPlatform)
            .with_field("id", id)
            .with_field("title", format!("paper {id}"))
            .with_field("status", status)
            .with_field("track", "main")
            .with_field("rating", rating)
    }

    fn policy() -> VenuePolicy {
        VenuePolicy {
            t_order: vec![
                "Oral".into(),
                "Poster".into(),
                "Reject".into(),
                "Active".into(),
                "Withdraw".into(),
            ],
            ..VenuePolicy::default()
        }
    }

    #[test]
    fn histogram_sum_matches_filtered_record_count() {
        let records = vec![
            record("1", "Poster", "6;8"),
            record("2", "Poster", "4;4"),
            record("3", "Reject", "2;3"),
        ];
        let policy = policy();
        let summarizer = Summarizer::new(&policy);

        let total = summarizer.histogram(&records, "rating", &RecordFilter::default());
        assert_eq!(total.sum, 3);
        let decoded = crate::codec::decompress(&total.data, BUCKETS).unwrap();
        assert_eq!(decoded.iter().sum::<u64>(), 3);
        assert_eq!(decoded[70], 1); // avg 7.0
        assert_eq!(decoded[40], 1); // avg 4.0
        assert_eq!(decoded[25], 1); // avg 2.5

        let posters =
            summarizer.histogram(&records, "rating", &RecordFilter::by_status("Poster"));
        assert_eq!(posters.sum, 2);
    }

    #[test]
    fn stale_precomputed_averages_fail_the_consistency_guard() {
        let mut bad = record("1", "Poster", "6;8");
        bad.set_field("rating_avg", "3.0");
        let policy = policy();
        let summarizer = Summarizer::new(&policy);
        let result =
            summarizer.histogram_checked(&[bad], "rating", &RecordFilter::default());
        assert!(matches!(result, Err(MergeError::ConsistencyCheck { .. })));
    }

    #[test]
    fn scores_outside_range_are_clipped_into_the_edge_buckets() {
        let records = vec![record("1", "Poster", "-2"), record("2", "Poster", "15")];
        let policy = policy();
        let summarizer = Summarizer::new(&policy);
        let series = summarizer.histogram(&records, "rating", &RecordFilter::default());
        let decoded = crate::codec::decompress(&series.data, BUCKETS).unwrap();
        assert_eq!(decoded[0], 1);
        assert_eq!(decoded[BUCKETS - 1], 1);
    }

    #[test]
    fn transfer_matrix_drops_final_only_records_and_bins_deltas() {
        let initial = vec![record("1", "Active", "5"), record("2", "Active", "6")];
        let finals = vec![
            record("1", "Poster", "6"),
            record("2", "Poster", "5"),
            record("9", "Poster", "7"), // inserted late, absent from initial
        ];
        let policy = policy();
        let summarizer = Summarizer::new(&policy);
        let series = summarizer
            .transfer_matrix(&finals, &initial, "rating", &RecordFilter::default())
            .unwrap();
        assert_eq!(series.sum, 2);
        let matrix = crate::codec::decompress_matrix(&series.data, BUCKETS, BUCKETS).unwrap();
        assert_eq!(matrix[50][60], 1); // 5.0 -> 6.0
        assert_eq!(matrix[60][40], 1); // 6.0 -> 5.0
    }

    #[test]
    fn snapshot_length_mismatch_is_fatal() {
        let initial = vec![record("1", "Active", "5"), record("2", "Active", "6")];
        let finals = vec![record("1", "Poster", "6")];
        let policy = policy();
        let summarizer = Summarizer::new(&policy);
        let result =
            summarizer.transfer_matrix(&finals, &initial, "rating", &RecordFilter::default());
        assert!(matches!(result, Err(MergeError::SnapshotMismatch(_))));
    }

    #[test]
    fn entity_frequency_ranks_by_count_with_first_seen_tie_breaks() {
        let records = vec![
            record("1", "Poster", "5").with_field("aff", "MIT;CMU"),
            record("2", "Oral", "8").with_field("aff", "CMU;ETH"),
            record("3", "Poster", "6").with_field("aff", "MIT"),
        ];
        let policy = policy();
        let summarizer = Summarizer::new(&policy);
        let ranked = summarizer.entity_frequency(
            &records,
            "aff",
            ExtractionMode::All,
            &RecordFilter::default(),
            None,
        );
        let names: Vec<&str> = ranked.iter().map(|e| e.entity.as_str()).collect();
        assert_eq!(names, vec!["MIT", "CMU", "ETH"]);
        assert_eq!(ranked[0].total, 2);
        assert_eq!(ranked[0].per_status.get("Poster"), Some(&2));
        assert_eq!(frequency_wire(&ranked), "MIT:2;CMU:2;ETH:1");

        let top1 = summarizer.entity_frequency(
            &records,
            "aff",
            ExtractionMode::All,
            &RecordFilter::default(),
            Some(1),
        );
        assert_eq!(top1.len(), 1);
    }

    #[test]
    fn extraction_modes_pick_the_expected_entries() {
        let records = vec![record("1", "Poster", "5").with_field("aff", "MIT;CMU;MIT")];
        let policy = policy();
        let summarizer = Summarizer::new(&policy);
        let by_mode = |mode| {
            summarizer
                .entity_frequency(&records, "aff", mode, &RecordFilter::default(), None)
                .iter()
                .map(|e| (e.entity.clone(), e.total))
                .collect::<Vec<_>>()
        };
        assert_eq!(
            by_mode(ExtractionMode::All),
            vec![("MIT".to_string(), 2), ("CMU".to_string(), 1)]
        );
        assert_eq!(
            by_mode(ExtractionMode::UniquePerRecord),
            vec![("MIT".to_string(), 1), ("CMU".to_string(), 1)]
        );
        assert_eq!(by_mode(ExtractionMode::FirstOnly), vec![("MIT".to_string(), 1)]);
        assert_eq!(by_mode(ExtractionMode::LastOnly), vec![("MIT".to_string(), 1)]);
    }

    #[test]
    fn author_id_length_mismatch_skips_only_that_record() {
        let records = vec![
            record("1", "Poster", "5")
                .with_field("author", "A One;B Two")
                .with_field("authorids", "~a1"),
            record("2", "Poster", "5").with_field("author", "C Three"),
        ];
        let policy = policy();
        let summarizer = Summarizer::new(&policy);
        let ranked = summarizer.entity_frequency(
            &records,
            "author",
            ExtractionMode::All,
            &RecordFilter::default(),
            None,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].entity, "C Three");
    }

    #[test]
    fn unknown_extraction_mode_strings_are_configuration_errors() {
        assert!("unique".parse::<ExtractionMode>().is_ok());
        assert!(matches!(
            "everything".parse::<ExtractionMode>(),
            Err(MergeError::Configuration(_))
        ));
    }

    #[test]
    fn summarize_backfills_a_stale_active_tier() {
        // Decisions are out; the one still-Active record has no scores.
        let mut active = record("9", "Active", "");
        active.fields.shift_remove("rating");
        let records = vec![
            record("1", "Oral", "8"),
            record("2", "Poster", "6"),
            record("3", "Poster", "5"),
            active,
        ];
        let policy = policy();
        let summarizer = Summarizer::new(&policy);
        let mut registry = TierRegistry::new();
        let stats = summarizer
            .summarize(&records, None, &[], &mut registry)
            .unwrap();

        assert!(stats.active_backfilled);
        let active_series = &stats.histograms["rating"][tiers::ACTIVE];
        assert_eq!(active_series.sum, 3);
        assert_eq!(stats.tier_table.count_of(tiers::ACTIVE), 3);
        let total_series = &stats.histograms["rating"][tiers::TOTAL];
        assert_eq!(total_series.sum, 3);
    }

    #[test]
    fn summarize_derives_post_decision_withdraw() {
        let mut unscored = record("3", "Withdraw", "");
        unscored.fields.shift_remove("rating");
        let records = vec![
            record("1", "Poster", "6"),
            record("2", "Withdraw", "4;5"),
            unscored,
        ];
        let policy = policy();
        let summarizer = Summarizer::new(&policy);
        let mut registry = TierRegistry::new();
        let stats = summarizer
            .summarize(&records, None, &[], &mut registry)
            .unwrap();
        // Two withdrawals, one with a recorded score.
        assert_eq!(stats.post_decision_withdraw, 1);
        assert_eq!(
            stats.tier_table.count_of(tiers::POST_DECISION_WITHDRAW),
            1
        );
    }

    #[test]
    fn summarize_with_initial_snapshot_produces_total0_and_transfers() {
        let initial = vec![record("1", "Active", "5"), record("2", "Active", "3")];
        let finals = vec![record("1", "Poster", "6"), record("2", "Reject", "3")];
        let policy = policy();
        let summarizer = Summarizer::new(&policy);
        let mut registry = TierRegistry::new();
        let stats = summarizer
            .summarize(&finals, Some(&initial), &[], &mut registry)
            .unwrap();

        let total0 = &stats.histograms["rating"][tiers::TOTAL0];
        assert_eq!(total0.sum, 2);
        let transfer = &stats.transfers["rating"][tiers::TOTAL];
        assert_eq!(transfer.sum, 2);
        let matrix =
            crate::codec::decompress_matrix(&transfer.data, BUCKETS, BUCKETS).unwrap();
        assert_eq!(matrix[50][60], 1); // 5.0 -> 6.0
        assert_eq!(matrix[30][50], 1); // 3.0 unchanged
    }
}
