use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::{fields, tiers};
use crate::types::{FieldName, TierName, TrackName, VenueKey};

/// How two source lists are joined during the exact-key pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinStrategy {
    /// Both lists carry the same native id scheme.
    NativeId,
    /// The secondary list references the primary list's ids inside the URL
    /// fragment of the named link field.
    UrlFragment {
        /// Link field whose fragment carries the shared key.
        link_field: FieldName,
    },
    /// No shared identifier; matching is fuzzy-title only.
    TitleOnly,
}

/// What happens to records left unmatched after both passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeftoverPolicy {
    /// Keep leftovers from both lists as standalone entries.
    KeepBoth,
    /// Keep primary-side leftovers; silently drop the secondary side's
    /// (template and navigation rows scraped by accident).
    DiscardSecondary,
}

/// Per-venue reconciliation and reporting behavior.
///
/// One venue supplies one configuration value; there are no venue-conditional
/// code branches anywhere in the merge path. New venues are new values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VenuePolicy {
    /// Venue identifier. Example: `iclr`.
    pub venue: String,
    /// Raw status name -> display tier name. Unmapped names pass through.
    pub tier_display: IndexMap<TierName, TierName>,
    /// Reporting order for known display tiers.
    pub t_order: Vec<TierName>,
    /// Optional abbreviated reporting order.
    pub t_order_brief: Vec<TierName>,
    /// Join strategy for the exact-key pass.
    pub join: JoinStrategy,
    /// Fields where the secondary source overrides a non-empty primary value.
    pub secondary_wins: Vec<FieldName>,
    /// Leftover handling after both matching passes.
    pub leftovers: LeftoverPolicy,
    /// Display statuses the secondary source never lists; records carrying
    /// them are excluded from matching and appended unchanged.
    pub unlisted_statuses: Vec<TierName>,
}

impl Default for VenuePolicy {
    fn default() -> Self {
        Self {
            venue: String::new(),
            tier_display: IndexMap::new(),
            t_order: Vec::new(),
            t_order_brief: Vec::new(),
            join: JoinStrategy::NativeId,
            secondary_wins: vec![fields::AUTHOR.to_string(), fields::STATUS.to_string()],
            leftovers: LeftoverPolicy::KeepBoth,
            unlisted_statuses: vec![
                tiers::WITHDRAW.to_string(),
                tiers::REJECT.to_string(),
                tiers::DESK_REJECT.to_string(),
            ],
        }
    }
}

impl VenuePolicy {
    /// Display name for a raw status; raw names without a mapping pass
    /// through unchanged.
    pub fn display_name<'a>(&'a self, raw: &'a str) -> &'a str {
        self.tier_display.get(raw).map_or(raw, String::as_str)
    }

    /// Whether records with this raw status never appear on the secondary
    /// source and must skip matching.
    pub fn is_unlisted(&self, raw_status: &str) -> bool {
        let display = self.display_name(raw_status);
        self.unlisted_statuses.iter().any(|name| name == display)
    }
}

/// Authoritative external metadata for one `<venue><year>[_<track>]` unit.
///
/// Absent or empty fields defer to computed values.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VenueMetadata {
    /// Verified final submission total.
    #[serde(default)]
    pub total: Option<usize>,
    /// Verified initial-snapshot total.
    #[serde(default)]
    pub total0: Option<usize>,
    /// Verified withdrawal count.
    #[serde(default)]
    pub withdraw: Option<usize>,
    /// Verified desk-reject count.
    #[serde(default)]
    pub desk_reject: Option<usize>,
    /// Verified per-tier counts keyed by display name.
    #[serde(default)]
    pub tier_counts: IndexMap<TierName, usize>,
    /// Display names of tiers counted as accepted; empty derives the
    /// accepted count from all non-Reject terminal tiers.
    #[serde(default)]
    pub accepted_tiers: Vec<TierName>,
    /// Tier ordering override.
    #[serde(default)]
    pub t_order: Vec<TierName>,
    /// Area-chair recommendation tier ordering, passed through to renderers.
    #[serde(default)]
    pub t_order_ac: Vec<TierName>,
    /// Abbreviated tier ordering override.
    #[serde(default)]
    pub t_order_brief: Vec<TierName>,
}

/// Read-only metadata table shared across processing units.
pub type MetadataTable = IndexMap<VenueKey, VenueMetadata>;

/// Build the metadata lookup key for a (venue, year, track) unit. The track
/// suffix is omitted for the main track.
pub fn venue_key(venue: &str, year: u16, track: Option<&TrackName>) -> VenueKey {
    match track {
        Some(track) if !track.is_empty() && track != "main" => {
            format!("{venue}{year}_{track}")
        }
        _ => format!("{venue}{year}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_passes_unmapped_raw_statuses_through() {
        let mut policy = VenuePolicy::default();
        policy
            .tier_display
            .insert("Accept (Spotlight)".into(), "Spotlight".into());
        assert_eq!(policy.display_name("Accept (Spotlight)"), "Spotlight");
        assert_eq!(policy.display_name("Expo Talk"), "Expo Talk");
    }

    #[test]
    fn unlisted_statuses_respect_display_mapping() {
        let mut policy = VenuePolicy::default();
        policy
            .tier_display
            .insert("Withdrawn by Authors".into(), "Withdraw".into());
        assert!(policy.is_unlisted("Withdrawn by Authors"));
        assert!(policy.is_unlisted("Reject"));
        assert!(!policy.is_unlisted("Poster"));
    }

    #[test]
    fn venue_keys_append_non_main_tracks_only() {
        assert_eq!(venue_key("iclr", 2024, None), "iclr2024");
        assert_eq!(venue_key("iclr", 2024, Some(&"main".to_string())), "iclr2024");
        assert_eq!(
            venue_key("nips", 2023, Some(&"Datasets and Benchmarks".to_string())),
            "nips2023_Datasets and Benchmarks"
        );
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let json = r#"{
            "total": 2500,
            "tier_counts": {"Oral": 90, "Poster": 1200},
            "t_order": ["Oral", "Poster", "Reject"]
        }"#;
        let metadata: VenueMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.total, Some(2500));
        assert_eq!(metadata.tier_counts.get("Oral"), Some(&90));
        assert!(metadata.total0.is_none());
        assert!(metadata.accepted_tiers.is_empty());
    }
}
