/// Canonical record field names shared across sources.
pub mod fields {
    /// Primary natural key; required on every record.
    pub const TITLE: &str = "title";
    /// Raw tier name; required on every record.
    pub const STATUS: &str = "status";
    /// Conference track; required on every record.
    pub const TRACK: &str = "track";
    /// Source-native identifier, preferred join key when present.
    pub const ID: &str = "id";
    /// Delimited author name list.
    pub const AUTHOR: &str = "author";
    /// Delimited author identifier list, parallel to `author`.
    pub const AUTHORIDS: &str = "authorids";
    /// Delimited affiliation list.
    pub const AFFILIATION: &str = "aff";
    /// Delimited author position list.
    pub const POSITION: &str = "pos";
    /// Delimited keyword list.
    pub const KEYWORDS: &str = "keywords";
    /// Delimited primary-area list.
    pub const PRIMARY_AREA: &str = "primary_area";

    /// Suffix marking a precomputed per-record average for a score field.
    pub const AVG_SUFFIX: &str = "_avg";

    /// Review dimensions carrying per-reviewer score lists.
    pub const SCORE_FIELDS: [&str; 5] = [
        "rating",
        "confidence",
        "correctness",
        "novelty",
        "presentation",
    ];

    /// Link-style fields merged additively between sources.
    pub const LINK_FIELDS: [&str; 7] = [
        "pdf",
        "project",
        "github",
        "arxiv",
        "openreview",
        "site",
        "oa",
    ];
}

/// Constants used by score histograms and transfer matrices.
pub mod histogram {
    /// Bucket count covering scores in `[0, 10)` at 0.1 resolution.
    pub const BUCKETS: usize = 100;
    /// Bucket width in score units.
    pub const RESOLUTION: f64 = 0.1;
    /// Exclusive upper clip bound for scores.
    pub const SCORE_MAX: f64 = 10.0;
    /// Transfer-matrix column marking a zero score delta.
    pub const DELTA_ORIGIN: usize = 50;
    /// Fraction of the Active tier count below which its own histogram is
    /// considered stale and rebuilt from terminal tiers.
    pub const ACTIVE_STALE_FRACTION: f64 = 0.01;
}

/// Constants used by the run-length array codec.
pub mod codec {
    /// Token separator in the compressed wire format.
    pub const TOKEN_DELIMITER: char = ';';
    /// Prefix of a collapsed zero-run token, e.g. `0*17`.
    pub const ZERO_RUN_PREFIX: &str = "0*";
    /// Zero runs longer than this are collapsed by default.
    pub const DEFAULT_ZERO_RUN_THRESHOLD: usize = 3;
}

/// Constants used by the matching passes and synthetic id derivation.
pub mod matching {
    /// Highest similarity cutoff attempted by the fuzzy sweep, in hundredths.
    pub const CUTOFF_MAX_PCT: u32 = 100;
    /// Lowest similarity cutoff attempted by the fuzzy sweep, in hundredths.
    pub const CUTOFF_MIN_PCT: u32 = 70;
    /// Minimum matched cutoff below which a title-drift warning is logged.
    pub const CUTOFF_WARN: f64 = 0.85;
    /// Prefix of synthetic ids derived from normalized titles.
    pub const SYNTHETIC_ID_PREFIX: &str = "site_";
    /// Hex characters of the content hash kept in a synthetic id.
    pub const SYNTHETIC_ID_HEX_LEN: usize = 10;
}

/// Reserved tier names with special semantics.
pub mod tiers {
    /// Pending decision.
    pub const ACTIVE: &str = "Active";
    /// Withdrawn by the authors.
    pub const WITHDRAW: &str = "Withdraw";
    /// Rejected without review.
    pub const DESK_REJECT: &str = "Desk Reject";
    /// Withdrawn after a decision was recorded; derived, never counted directly.
    pub const POST_DECISION_WITHDRAW: &str = "Post Decision Withdraw";
    /// Rejected after review.
    pub const REJECT: &str = "Reject";
    /// Final snapshot total.
    pub const TOTAL: &str = "Total";
    /// Initial snapshot total.
    pub const TOTAL0: &str = "Total0";
}
