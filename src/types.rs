/// Record field name.
/// Examples: `title`, `status`, `rating`, `aff`
pub type FieldName = String;
/// Record field value; list-valued fields are delimiter-joined strings.
/// Examples: `6;8;5`, `Alice Liu;Bob Ma`, `Poster`
pub type FieldValue = String;
/// Native or synthetic record identifier.
/// Examples: `aB3xQz91kL`, `site_4f1a09c2de`
pub type PaperId = String;
/// Raw or display tier name.
/// Examples: `Spotlight`, `Oral`, `Desk Reject`
pub type TierName = String;
/// Integer tier identifier assigned on first occurrence within one unit.
pub type TierId = usize;
/// Conference track name.
/// Examples: `main`, `Datasets and Benchmarks`
pub type TrackName = String;
/// Lookup key for the external venue metadata table.
/// Examples: `iclr2024`, `nips2023_Datasets and Benchmarks`
pub type VenueKey = String;
/// Normalized title used as a fuzzy-matching join key.
pub type TitleKey = String;
/// Entity extracted from a multi-valued field.
/// Examples: `Alice Liu`, `MIT`, `reinforcement learning`
pub type EntityName = String;
