use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::fields;
use crate::errors::MergeError;
use crate::hash::synthetic_id;
use crate::types::{FieldName, FieldValue, PaperId, TitleKey};
use crate::utils::{mean, normalize_title, parse_scores};

/// Origin tag for a harvested record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordSource {
    /// Review platform: score lists, raw statuses, native ids.
    ReviewPlatform,
    /// The venue's own program site.
    Site,
    /// Open-access repository.
    OpenAccess,
    /// Crowd-sourced submission form.
    CrowdForm,
}

impl RecordSource {
    /// Short label used in logs and per-source summaries.
    pub fn label(&self) -> &'static str {
        match self {
            RecordSource::ReviewPlatform => "review_platform",
            RecordSource::Site => "site",
            RecordSource::OpenAccess => "openaccess",
            RecordSource::CrowdForm => "crowd_form",
        }
    }
}

/// One paper's harvested metadata, tagged with the source it came from.
///
/// Fields are an ordered name/value map; list-valued fields (scores, authors,
/// affiliations, keywords) are stored as delimiter-joined strings exactly as
/// the adapters produced them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Record {
    /// Source that produced this record.
    pub source: RecordSource,
    /// Named fields in adapter emission order.
    pub fields: IndexMap<FieldName, FieldValue>,
}

impl Record {
    /// Create an empty record for `source`.
    pub fn new(source: RecordSource) -> Self {
        Self {
            source,
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field setter used by adapters and tests.
    pub fn with_field(mut self, name: impl Into<FieldName>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Raw field value, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Whether `name` is present with non-empty content.
    pub fn has_content(&self, name: &str) -> bool {
        self.field(name).is_some_and(|value| !value.trim().is_empty())
    }

    /// Insert or replace a field.
    pub fn set_field(&mut self, name: impl Into<FieldName>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Paper title; empty string when the adapter omitted it.
    pub fn title(&self) -> &str {
        self.field(fields::TITLE).unwrap_or_default()
    }

    /// Raw status name; empty string when absent.
    pub fn status(&self) -> &str {
        self.field(fields::STATUS).unwrap_or_default()
    }

    /// Track name; empty string when absent.
    pub fn track(&self) -> &str {
        self.field(fields::TRACK).unwrap_or_default()
    }

    /// Native or previously assigned identifier.
    pub fn id(&self) -> Option<&str> {
        self.field(fields::ID).filter(|id| !id.is_empty())
    }

    /// Title in join-key form.
    pub fn title_key(&self) -> TitleKey {
        normalize_title(self.title())
    }

    /// Per-reviewer scores for `score_field`, `None` when absent or empty.
    pub fn score_values(&self, score_field: &str) -> Option<Vec<f64>> {
        let raw = self.field(score_field)?;
        let values = parse_scores(raw);
        if values.is_empty() {
            return None;
        }
        Some(values)
    }

    /// Average score for `score_field`: the precomputed `<field>_avg` when
    /// present and parseable, otherwise the mean of the raw score list.
    pub fn score_avg(&self, score_field: &str) -> Option<f64> {
        let avg_field = format!("{score_field}{}", fields::AVG_SUFFIX);
        if let Some(raw) = self.field(&avg_field) {
            if let Ok(value) = raw.trim().parse::<f64>() {
                return Some(value);
            }
        }
        self.score_values(score_field).and_then(|values| mean(&values))
    }

    /// Average score recomputed from the raw score list, ignoring any
    /// precomputed `<field>_avg`. Used by the histogram sanity check.
    pub fn score_avg_from_raw(&self, score_field: &str) -> Option<f64> {
        self.score_values(score_field).and_then(|values| mean(&values))
    }

    /// Assign a synthetic id when no id is present; returns the id in effect.
    pub fn ensure_id(&mut self) -> PaperId {
        if let Some(id) = self.id() {
            return id.to_string();
        }
        let id = synthetic_id(&self.title_key());
        self.set_field(fields::ID, id.clone());
        id
    }

    /// Verify that every present score-list field on this record has the
    /// same number of entries. A mismatch indicates an upstream extraction
    /// bug and aborts the unit.
    pub fn check_parallel_scores(&self) -> Result<(), MergeError> {
        let mut expected: Option<(usize, &str)> = None;
        for score_field in fields::SCORE_FIELDS {
            let Some(values) = self.score_values(score_field) else {
                continue;
            };
            match expected {
                None => expected = Some((values.len(), score_field)),
                Some((len, first_field)) if len != values.len() => {
                    return Err(MergeError::ParallelArrayMismatch {
                        id: self
                            .id()
                            .map(str::to_string)
                            .unwrap_or_else(|| self.title_key()),
                        details: format!(
                            "{first_field} has {len} entries, {score_field} has {}",
                            values.len()
                        ),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
