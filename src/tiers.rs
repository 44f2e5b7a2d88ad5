use indexmap::IndexMap;
use serde::Serialize;

use crate::constants::tiers;
use crate::policy::{VenueMetadata, VenuePolicy};
use crate::record::Record;
use crate::types::{TierId, TierName};

/// Assigns integer ids to tier names on first occurrence.
///
/// Ids are stable within one (venue, year) processing unit and are not
/// guaranteed stable across runs. One registry is created per unit and
/// threaded explicitly through merge and aggregation; it is never global.
#[derive(Clone, Debug, Default)]
pub struct TierRegistry {
    ids: IndexMap<TierName, TierId>,
}

impl TierRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, assigning the next free id on first sight.
    pub fn ensure_id(&mut self, name: &str) -> TierId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.ids.len();
        self.ids.insert(name.to_string(), id);
        id
    }

    /// Id previously assigned to `name`, if any.
    pub fn id_of(&self, name: &str) -> Option<TierId> {
        self.ids.get(name).copied()
    }

    /// Name for an assigned id.
    pub fn name_of(&self, id: TierId) -> Option<&str> {
        self.ids
            .iter()
            .find(|(_, &assigned)| assigned == id)
            .map(|(name, _)| name.as_str())
    }

    /// Registered names in first-seen order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ids.keys().map(String::as_str)
    }
}

/// One tier's aggregate view within a unit.
#[derive(Clone, Debug, Serialize)]
pub struct TierEntry {
    /// Registry id.
    pub id: TierId,
    /// First raw status name observed for this display tier.
    pub raw_name: TierName,
    /// Display name after venue mapping.
    pub name: TierName,
    /// Paper count.
    pub count: usize,
}

/// Accepted-paper totals derived from a tier table.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct Acceptance {
    /// Papers in accepted tiers.
    pub accepted: usize,
    /// Final submission total.
    pub total: usize,
    /// `accepted / total`, 0 when the total is 0.
    pub rate: f64,
}

/// Per-tier counts for one record list, ordered for reporting.
///
/// Built fresh per call and returned by value; callers never mutate a shared
/// running table.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TierTable {
    /// Tiers in reporting order: `t_order` tiers first, then unknown display
    /// names appended in first-seen order.
    pub entries: Vec<TierEntry>,
    /// Records counted into the table.
    pub total: usize,
}

impl TierTable {
    /// Count display statuses over `records`, assign registry ids, and order
    /// entries per the venue's `t_order` (overridable by metadata).
    pub fn from_records(
        records: &[Record],
        policy: &VenuePolicy,
        order_override: &[TierName],
        registry: &mut TierRegistry,
    ) -> Self {
        let mut counts: IndexMap<TierName, (TierName, usize)> = IndexMap::new();
        for record in records {
            let raw = record.status();
            let display = policy.display_name(raw).to_string();
            let slot = counts.entry(display).or_insert_with(|| (raw.to_string(), 0));
            slot.1 += 1;
        }

        let order = if order_override.is_empty() {
            &policy.t_order
        } else {
            order_override
        };

        let mut entries = Vec::with_capacity(counts.len());
        for name in order {
            if let Some((raw, count)) = counts.shift_remove(name) {
                entries.push(TierEntry {
                    id: registry.ensure_id(name),
                    raw_name: raw,
                    name: name.clone(),
                    count,
                });
            }
        }
        // Unrecognized tiers follow the known ones in first-seen order.
        for (name, (raw, count)) in counts {
            entries.push(TierEntry {
                id: registry.ensure_id(&name),
                raw_name: raw,
                name,
                count,
            });
        }

        let total = records.len();
        Self { entries, total }
    }

    /// Count for a display tier, 0 when absent.
    pub fn count_of(&self, name: &str) -> usize {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map_or(0, |entry| entry.count)
    }

    /// Set or insert a display tier's count.
    pub fn set_count(&mut self, name: &str, count: usize, registry: &mut TierRegistry) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.name == name) {
            entry.count = count;
            return;
        }
        self.entries.push(TierEntry {
            id: registry.ensure_id(name),
            raw_name: name.to_string(),
            name: name.to_string(),
            count,
        });
    }

    /// Tiers that represent a final decision (everything except `Active` and
    /// the reserved totals).
    pub fn terminal_entries(&self) -> impl Iterator<Item = &TierEntry> {
        self.entries.iter().filter(|entry| {
            entry.name != tiers::ACTIVE && entry.name != tiers::TOTAL && entry.name != tiers::TOTAL0
        })
    }

    /// Override computed counts with authoritative external values and derive
    /// acceptance totals.
    ///
    /// A metadata tier count is applied whenever one is supplied; the
    /// accepted count comes from the explicit accepted-tier list when given,
    /// otherwise from the sum of all non-Reject terminal tiers.
    pub fn reconcile_with_external_totals(
        &mut self,
        metadata: &VenueMetadata,
        registry: &mut TierRegistry,
    ) -> Acceptance {
        for (name, &count) in &metadata.tier_counts {
            self.set_count(name, count, registry);
        }
        if let Some(withdraw) = metadata.withdraw {
            self.set_count(tiers::WITHDRAW, withdraw, registry);
        }
        if let Some(desk_reject) = metadata.desk_reject {
            self.set_count(tiers::DESK_REJECT, desk_reject, registry);
        }
        if let Some(total) = metadata.total {
            self.total = total;
        }

        let accepted = if metadata.accepted_tiers.is_empty() {
            self.terminal_entries()
                .filter(|entry| {
                    !entry.name.contains(tiers::REJECT)
                        && entry.name != tiers::WITHDRAW
                        && entry.name != tiers::POST_DECISION_WITHDRAW
                })
                .map(|entry| entry.count)
                .sum()
        } else {
            metadata
                .accepted_tiers
                .iter()
                .map(|name| self.count_of(name))
                .sum()
        };

        let total = self.total;
        let rate = if total == 0 {
            0.0
        } else {
            accepted as f64 / total as f64
        };
        Acceptance {
            accepted,
            total,
            rate,
        }
    }
}

/// `Post Decision Withdraw` count: withdrawals minus those that already had a
/// recorded score, floored at zero.
pub fn post_decision_withdraw(withdraw_count: usize, withdrawn_with_scores: usize) -> usize {
    withdraw_count.saturating_sub(withdrawn_with_scores)
}
