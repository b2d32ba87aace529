//! Summary, history and save-outcome types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the history store
pub type HistoryId = i64;

/// Recipe metadata stored alongside a summary in the similarity index.
///
/// Recognized keys are typed; anything else the caller passes survives
/// untouched in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SummaryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub cuisine: Vec<String>,
    #[serde(
        default,
        rename = "readyInMinutes",
        skip_serializing_if = "Option::is_none"
    )]
    pub ready_in_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SummaryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_ingredients<I, S>(mut self, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ingredients = ingredients.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cuisine<I, S>(mut self, cuisine: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cuisine = cuisine.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ready_in_minutes(mut self, minutes: i64) -> Self {
        self.ready_in_minutes = Some(minutes);
        self
    }

    /// Attach an arbitrary extra key
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Unit held in the similarity index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSummary {
    /// Index-local identifier
    pub id: String,
    /// Localized summary; the embedded content
    pub text: String,
    pub metadata: SummaryMetadata,
}

impl StoredSummary {
    pub fn new(text: impl Into<String>, metadata: SummaryMetadata) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            metadata,
        }
    }
}

/// One row of the history log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRecord {
    pub id: HistoryId,
    pub user_id: String,
    pub title: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    /// Comma-joined cuisine labels
    pub cuisine: String,
    /// Comma-joined ingredient names
    pub ingredients: String,
    pub ready_in_minutes: i64,
}

/// Fields for a history row before the store assigns an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryRecord {
    pub user_id: String,
    pub title: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub cuisine: String,
    pub ingredients: String,
    pub ready_in_minutes: i64,
}

impl NewHistoryRecord {
    /// Map a stored summary onto a history row, defaulting absent fields.
    pub fn from_summary(user_id: impl Into<String>, summary: &StoredSummary) -> Self {
        let meta = &summary.metadata;
        Self {
            user_id: user_id.into(),
            title: meta.title.clone().unwrap_or_default(),
            summary: summary.text.clone(),
            created_at: meta.saved_at.unwrap_or_else(Utc::now),
            cuisine: meta.cuisine.join(", "),
            ingredients: meta.ingredients.join(", "),
            ready_in_minutes: meta.ready_in_minutes.unwrap_or(0),
        }
    }
}

/// Result of a save attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written to both the index and the history log
    Saved { history_id: HistoryId },
    /// Summary text was empty or whitespace
    SkippedEmpty,
    /// Nearest stored summary has exactly the same text
    SkippedDuplicate,
    /// One target was written and the other was not. Nothing is rolled back.
    PartialFailure {
        index_ok: bool,
        history_ok: bool,
        reason: String,
    },
    /// Nothing was written
    Failed(String),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, SaveOutcome::SkippedEmpty | SaveOutcome::SkippedDuplicate)
    }

    /// Partial or total failure; the caller decides whether to retry.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SaveOutcome::PartialFailure { .. } | SaveOutcome::Failed(_)
        )
    }
}

impl fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveOutcome::Saved { history_id } => write!(f, "saved (history #{history_id})"),
            SaveOutcome::SkippedEmpty => write!(f, "skipped: empty summary"),
            SaveOutcome::SkippedDuplicate => write!(f, "skipped: duplicate"),
            SaveOutcome::PartialFailure {
                index_ok,
                history_ok,
                reason,
            } => write!(
                f,
                "partial failure (index: {}, history: {}): {reason}",
                if *index_ok { "ok" } else { "failed" },
                if *history_ok { "ok" } else { "failed" },
            ),
            SaveOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_keeps_unknown_keys_and_camel_case_time() {
        let json = serde_json::json!({
            "title": "Bibimbap",
            "ingredients": ["rice", "egg"],
            "readyInMinutes": 25,
            "image": "bibimbap.jpg"
        });
        let meta: SummaryMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(meta.ready_in_minutes, Some(25));
        assert_eq!(meta.ingredients, vec!["rice", "egg"]);
        assert!(meta.cuisine.is_empty());
        assert_eq!(meta.extra["image"], "bibimbap.jpg");

        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["readyInMinutes"], 25);
        assert_eq!(back["image"], "bibimbap.jpg");
    }

    #[test]
    fn history_row_joins_sequences_and_defaults_missing_fields() {
        let summary = StoredSummary::new(
            "Savory rice bowl",
            SummaryMetadata::new()
                .with_ingredients(["rice", "egg", "spinach"])
                .with_cuisine(["Korean", "Asian"]),
        );
        let row = NewHistoryRecord::from_summary("demo", &summary);
        assert_eq!(row.ingredients, "rice, egg, spinach");
        assert_eq!(row.cuisine, "Korean, Asian");
        assert_eq!(row.title, "");
        assert_eq!(row.ready_in_minutes, 0);
        assert_eq!(row.summary, "Savory rice bowl");
    }

    #[test]
    fn outcome_classification() {
        assert!(SaveOutcome::Saved { history_id: 1 }.is_saved());
        assert!(SaveOutcome::SkippedDuplicate.is_skipped());
        assert!(SaveOutcome::Failed("disk full".into()).is_failure());
        let partial = SaveOutcome::PartialFailure {
            index_ok: true,
            history_ok: false,
            reason: "db locked".into(),
        };
        assert!(partial.is_failure());
        assert_eq!(
            partial.to_string(),
            "partial failure (index: ok, history: failed): db locked"
        );
    }
}
