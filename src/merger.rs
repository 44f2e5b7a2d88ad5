//! Cross-source record reconciliation.
//!
//! Two passes: an exact pass over a shared external identifier when the
//! venue's join strategy provides one, then a coarse-to-fine fuzzy-title
//! sweep from similarity 1.00 down to 0.70 in steps of 0.01. Higher cutoffs
//! are tried first and consumed greedily, so a higher-confidence match is
//! always taken over a lower-confidence one whenever both exist.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use similar::TextDiff;
use tracing::{debug, warn};

use crate::constants::{fields, matching};
use crate::errors::MergeError;
use crate::policy::{JoinStrategy, LeftoverPolicy, VenuePolicy};
use crate::record::Record;
use crate::types::TitleKey;

/// Sequence-similarity ratio between two normalized titles: twice the number
/// of matching contiguous characters over the combined length, in `[0, 1]`.
/// This is subsequence matching, not edit distance.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Counters reported after one merge, for the orchestration layer's logs.
#[derive(Clone, Debug, Default, Serialize)]
pub struct MergeDiagnostics {
    /// Pairs consumed by the exact-key pass.
    pub exact_matches: usize,
    /// Fuzzy matches per cutoff, keyed by the cutoff in hundredths at which
    /// they were taken, highest cutoff first.
    pub matches_per_cutoff: Vec<(u32, usize)>,
    /// Minimum cutoff at which any fuzzy match occurred. Below 0.85 this is
    /// a title-drift signal, flagged but never rejected.
    pub min_cutoff: Option<f64>,
    /// Primary-side records with no accepted match.
    pub leftover_primary: usize,
    /// Secondary-side records with no accepted match.
    pub leftover_secondary: usize,
    /// Secondary leftovers dropped by the venue's leftover policy.
    pub discarded_secondary: usize,
    /// Primary records excluded from matching because the secondary source
    /// never lists their status.
    pub excluded_unlisted: usize,
}

/// Result of reconciling two source lists.
#[derive(Clone, Debug)]
pub struct MergeOutcome {
    /// Merged records, ids assigned, sorted by title (case-sensitive ordinal).
    pub records: Vec<Record>,
    /// Primary records that matched nothing; also present in `records`.
    pub unmatched_primary: Vec<Record>,
    /// Secondary records that matched nothing; present in `records` only
    /// when the leftover policy keeps them.
    pub unmatched_secondary: Vec<Record>,
    /// Match and leftover counters.
    pub diagnostics: MergeDiagnostics,
}

/// Reconciles a primary (review platform) list with a secondary (site or
/// open-access) list describing the same venue/year.
pub struct Merger<'a> {
    policy: &'a VenuePolicy,
}

impl<'a> Merger<'a> {
    /// Create a merger bound to one venue's policy.
    pub fn new(policy: &'a VenuePolicy) -> Self {
        Self { policy }
    }

    /// Merge two source lists into one de-duplicated, enriched list.
    ///
    /// The primary list is authoritative for conflicting scalar fields
    /// except those the policy assigns to the secondary source (author and
    /// status display by default); link-style fields merge additively.
    pub fn merge(
        &self,
        primary: Vec<Record>,
        secondary: Vec<Record>,
    ) -> Result<MergeOutcome, MergeError> {
        validate_list(&primary)?;
        validate_list(&secondary)?;

        let mut diagnostics = MergeDiagnostics::default();
        let mut merged: Vec<Record> = Vec::new();

        // The secondary source lists only public decisions, so withdrawn,
        // rejected, and desk-rejected primary records skip matching and are
        // appended unchanged at the end.
        let mut matchable: Vec<Record> = Vec::new();
        let mut excluded: Vec<Record> = Vec::new();
        for record in primary {
            if self.policy.is_unlisted(record.status()) {
                excluded.push(record);
            } else {
                matchable.push(record);
            }
        }
        diagnostics.excluded_unlisted = excluded.len();

        let mut secondary_used = vec![false; secondary.len()];

        // Pass 1: exact shared keys.
        let mut primary_remaining: Vec<Record> = Vec::new();
        if self.policy.join == JoinStrategy::TitleOnly {
            primary_remaining = matchable;
        } else {
            let mut secondary_keys: IndexMap<String, usize> = IndexMap::new();
            for (idx, record) in secondary.iter().enumerate() {
                let Some(key) = self.secondary_join_key(record) else {
                    continue;
                };
                if secondary_keys.contains_key(&key) {
                    warn!(%key, "duplicate join key on secondary side, keeping first");
                    continue;
                }
                secondary_keys.insert(key, idx);
            }
            for record in matchable {
                let key = record.id().map(str::to_string);
                let hit = key.and_then(|key| secondary_keys.get(&key).copied());
                match hit {
                    Some(idx) if !secondary_used[idx] => {
                        secondary_used[idx] = true;
                        merged.push(self.merge_pair(&record, &secondary[idx]));
                        diagnostics.exact_matches += 1;
                    }
                    _ => primary_remaining.push(record),
                }
            }
        }

        // Pass 2: fuzzy titles, coarse to fine.
        let mut a_titles: IndexMap<TitleKey, usize> = IndexMap::new();
        for (idx, record) in primary_remaining.iter().enumerate() {
            let key = record.title_key();
            if a_titles.contains_key(&key) {
                warn!(title = %key, "duplicate normalized title on primary side");
                continue;
            }
            a_titles.insert(key, idx);
        }
        let mut b_titles: IndexMap<TitleKey, usize> = IndexMap::new();
        for (idx, record) in secondary.iter().enumerate() {
            if secondary_used[idx] {
                continue;
            }
            let key = record.title_key();
            if b_titles.contains_key(&key) {
                warn!(title = %key, "duplicate normalized title on secondary side");
                continue;
            }
            b_titles.insert(key, idx);
        }

        let mut matched_a: HashSet<usize> = HashSet::new();
        for cutoff_pct in (matching::CUTOFF_MIN_PCT..=matching::CUTOFF_MAX_PCT).rev() {
            let cutoff = f64::from(cutoff_pct) / 100.0;
            let mut round: Vec<(TitleKey, TitleKey)> = Vec::new();
            for a_title in a_titles.keys() {
                let mut best: Option<(&TitleKey, f64)> = None;
                for b_title in b_titles.keys() {
                    if round.iter().any(|(_, taken)| taken == b_title) {
                        continue;
                    }
                    let ratio = title_similarity(a_title, b_title);
                    if ratio >= cutoff && best.is_none_or(|(_, current)| ratio > current) {
                        best = Some((b_title, ratio));
                    }
                }
                if let Some((b_title, _)) = best {
                    round.push((a_title.clone(), b_title.clone()));
                }
            }
            if round.is_empty() {
                continue;
            }
            diagnostics
                .matches_per_cutoff
                .push((cutoff_pct, round.len()));
            diagnostics.min_cutoff = Some(cutoff);
            for (a_title, b_title) in round {
                let a_idx = a_titles.shift_remove(&a_title).expect("a title indexed");
                let b_idx = b_titles.shift_remove(&b_title).expect("b title indexed");
                secondary_used[b_idx] = true;
                matched_a.insert(a_idx);
                merged.push(self.merge_pair(&primary_remaining[a_idx], &secondary[b_idx]));
            }
        }

        if let Some(min_cutoff) = diagnostics.min_cutoff {
            if min_cutoff < matching::CUTOFF_WARN {
                warn!(
                    venue = %self.policy.venue,
                    min_cutoff, "fuzzy matches below the title-drift threshold"
                );
            }
        }

        // Leftovers.
        let mut unmatched_primary: Vec<Record> = Vec::new();
        for (idx, record) in primary_remaining.into_iter().enumerate() {
            if matched_a.contains(&idx) {
                continue;
            }
            let mut record = record;
            record.ensure_id();
            unmatched_primary.push(record.clone());
            merged.push(record);
        }
        let mut unmatched_secondary: Vec<Record> = Vec::new();
        for (idx, record) in secondary.into_iter().enumerate() {
            if secondary_used[idx] {
                continue;
            }
            let mut record = record;
            record.ensure_id();
            unmatched_secondary.push(record.clone());
            match self.policy.leftovers {
                LeftoverPolicy::KeepBoth => merged.push(record),
                LeftoverPolicy::DiscardSecondary => diagnostics.discarded_secondary += 1,
            }
        }
        diagnostics.leftover_primary = unmatched_primary.len();
        diagnostics.leftover_secondary = unmatched_secondary.len();

        merged.extend(excluded);
        for record in &mut merged {
            record.ensure_id();
        }
        merged.sort_by(|a, b| a.title().cmp(b.title()));

        debug!(
            venue = %self.policy.venue,
            exact = diagnostics.exact_matches,
            fuzzy = diagnostics
                .matches_per_cutoff
                .iter()
                .map(|(_, count)| count)
                .sum::<usize>(),
            leftover_primary = diagnostics.leftover_primary,
            leftover_secondary = diagnostics.leftover_secondary,
            discarded = diagnostics.discarded_secondary,
            "merge complete"
        );

        Ok(MergeOutcome {
            records: merged,
            unmatched_primary,
            unmatched_secondary,
            diagnostics,
        })
    }

    /// Field-level union of a matched pair. The primary side's title is
    /// retained; secondary values land only where the policy says they win
    /// or where the primary slot is missing or empty.
    fn merge_pair(&self, primary: &Record, secondary: &Record) -> Record {
        let mut merged = primary.clone();
        for (name, value) in &secondary.fields {
            if name == fields::TITLE {
                continue;
            }
            let non_empty = !value.trim().is_empty();
            if !non_empty {
                continue;
            }
            let secondary_wins = self.policy.secondary_wins.iter().any(|field| field == name);
            if secondary_wins || !merged.has_content(name) {
                merged.set_field(name.clone(), value.clone());
            }
        }
        merged
    }

    /// Exact-pass key exposed by a secondary record under the venue's join
    /// strategy.
    fn secondary_join_key(&self, record: &Record) -> Option<String> {
        match &self.policy.join {
            JoinStrategy::NativeId => record.id().map(str::to_string),
            JoinStrategy::UrlFragment { link_field } => {
                let url = record.field(link_field)?;
                let fragment = url
                    .rsplit_once('#')
                    .map(|(_, fragment)| fragment)
                    .or_else(|| url.rsplit_once('/').map(|(_, tail)| tail))?;
                if fragment.is_empty() {
                    None
                } else {
                    Some(fragment.to_string())
                }
            }
            JoinStrategy::TitleOnly => None,
        }
    }
}

/// Per-list structural checks: parallel score lists agree per record, native
/// ids are unique. Either failure indicates an upstream extraction bug and
/// aborts the unit.
fn validate_list(records: &[Record]) -> Result<(), MergeError> {
    let mut seen_ids: HashSet<&str> = HashSet::new();
    for record in records {
        record.check_parallel_scores()?;
        if let Some(id) = record.id() {
            if !seen_ids.insert(id) {
                return Err(MergeError::DuplicateId { id: id.to_string() });
            }
        }
    }
    Ok(())
}
