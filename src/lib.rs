//! # Recipe Memory - retrieval memory and preference engine for recipe recommendations
//!
//! Two independent persistence targets are updated together on every save:
//! a [`SimilarityIndex`] over localized recipe summaries and an append-only
//! [`HistoryStore`] in SQLite. The history feeds [`Preferences`], which in turn
//! bias the next search through [`build_personalized_params`].

pub mod config;
pub mod embedding;
pub mod error;
pub mod params;
pub mod preferences;
pub mod store;
pub mod types;
pub mod vector_search;

pub use config::{MemoryConfig, MemoryConfigBuilder};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{MemoryError, Result};
pub use params::{
    build_fallback_params, build_personalized_params, build_recipe_params, ParamSet,
    SearchProfile,
};
pub use preferences::{preference_summary, Preferences, RankedItem};
pub use store::HistoryStore;
pub use types::{
    HistoryId, HistoryRecord, NewHistoryRecord, SaveOutcome, StoredSummary, SummaryMetadata,
};
pub use vector_search::{SimilarityHit, SimilarityIndex};

use chrono::Utc;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Memory service: the single entry point for saving and recalling recipes
///
/// Saves are serialized through one lock around the similarity index, so
/// concurrent callers in the same process cannot lose each other's writes.
#[derive(Clone)]
pub struct RecipeMemory {
    config: MemoryConfig,
    history: HistoryStore,
    index: Arc<Mutex<SimilarityIndex>>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for RecipeMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipeMemory")
            .field("data_dir", &self.config.data_dir)
            .field("embedder", &self.embedder.model_version())
            .finish()
    }
}

impl RecipeMemory {
    /// Open both stores under `config.data_dir` with the built-in hash embedder
    pub async fn open(config: MemoryConfig) -> Result<Self> {
        let embedder = Arc::new(HashEmbeddingProvider::new(config.embedding_dimension));
        Self::open_with_embedder(config, embedder).await
    }

    /// Open both stores with a caller-supplied embedding backend
    pub async fn open_with_embedder(
        config: MemoryConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let history = Self::prepare(&config).await?;
        let index =
            SimilarityIndex::open_or_create(config.index_path(), Arc::clone(&embedder)).await?;

        Ok(Self {
            config,
            history,
            index: Arc::new(Mutex::new(index)),
            embedder,
        })
    }

    /// Open the history store and rebuild the similarity index from it.
    ///
    /// Whatever is on disk at the index path is discarded without being read,
    /// which is how an index moves to a new embedding model.
    pub async fn open_and_rebuild_index(
        config: MemoryConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<(Self, usize)> {
        let history = Self::prepare(&config).await?;
        let index =
            SimilarityIndex::create_empty(config.index_path(), Arc::clone(&embedder)).await?;

        let memory = Self {
            config,
            history,
            index: Arc::new(Mutex::new(index)),
            embedder,
        };
        let count = memory.rebuild_index_from_history().await?;
        Ok((memory, count))
    }

    async fn prepare(config: &MemoryConfig) -> Result<HistoryStore> {
        config.validate()?;
        tokio::fs::create_dir_all(&config.data_dir).await?;
        HistoryStore::open(config.history_path()).await
    }

    /// Save a summary for the configured default user
    pub async fn save(&self, summary_text: &str, metadata: SummaryMetadata) -> SaveOutcome {
        let user = self.config.default_user.clone();
        self.save_for_user(&user, summary_text, metadata).await
    }

    /// Dedup, embed, and write a summary to the index and then the history log.
    ///
    /// Only an exact text match (ignoring surrounding whitespace) against the
    /// single nearest neighbor counts as a duplicate. A history failure after
    /// the index write is reported as a partial failure and the index entry stays.
    pub async fn save_for_user(
        &self,
        user_id: &str,
        summary_text: &str,
        metadata: SummaryMetadata,
    ) -> SaveOutcome {
        if summary_text.trim().is_empty() {
            tracing::warn!("Empty summary, skipping save");
            return SaveOutcome::SkippedEmpty;
        }

        let mut index = self.index.lock().await;

        let nearest = match index.search(summary_text, 1).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::error!("Duplicate check failed: {}", e);
                return SaveOutcome::Failed(e.to_string());
            }
        };
        if nearest
            .first()
            .is_some_and(|n| n.text.trim() == summary_text.trim())
        {
            tracing::debug!("Identical summary already stored, skipping save");
            return SaveOutcome::SkippedDuplicate;
        }

        let mut metadata = metadata;
        metadata.saved_at = Some(Utc::now());
        let summary = StoredSummary::new(summary_text, metadata);
        let row = NewHistoryRecord::from_summary(user_id, &summary);

        if let Err(e) = index.insert(summary).await {
            tracing::error!("Similarity index write failed: {}", e);
            return SaveOutcome::Failed(e.to_string());
        }

        match self.history.append(&row).await {
            Ok(history_id) => {
                tracing::info!("Saved recipe summary '{}' (history #{})", row.title, history_id);
                SaveOutcome::Saved { history_id }
            }
            Err(e) => {
                tracing::warn!("History write failed after index write: {}", e);
                SaveOutcome::PartialFailure {
                    index_ok: true,
                    history_ok: false,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Texts of up to `top_k` stored summaries closest to `query_text`
    pub async fn find_similar(&self, query_text: &str, top_k: usize) -> Result<Vec<String>> {
        if query_text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let index = self.index.lock().await;
        let hits = index.search(query_text, top_k).await?;
        Ok(hits.into_iter().map(|s| s.text).collect())
    }

    /// [`find_similar`](Self::find_similar) with the configured default `top_k`
    pub async fn find_similar_default(&self, query_text: &str) -> Result<Vec<String>> {
        self.find_similar(query_text, self.config.default_top_k).await
    }

    /// Ranked ingredient/cuisine frequencies and average time for `user_id`
    pub async fn analyze(&self, user_id: &str) -> Result<Preferences> {
        let records = self.history.list_by_user(user_id).await?;
        Ok(Preferences::from_records(&records))
    }

    /// Search parameters biased by `user_id`'s history
    pub async fn build_personalized_params(&self, user_id: &str) -> Result<ParamSet> {
        let prefs = self.analyze(user_id).await?;
        Ok(build_personalized_params(&prefs))
    }

    /// One-line taste description for `user_id`
    pub async fn preference_summary(&self, user_id: &str) -> Result<String> {
        let prefs = self.analyze(user_id).await?;
        Ok(preference_summary(&prefs))
    }

    /// All history rows for `user_id`, oldest first
    pub async fn history(&self, user_id: &str) -> Result<Vec<HistoryRecord>> {
        self.history.list_by_user(user_id).await
    }

    /// Re-embed every distinct summary in the history log into a fresh index.
    pub async fn rebuild_index_from_history(&self) -> Result<usize> {
        let records = self.history.list_all().await?;

        let mut seen = HashSet::new();
        let summaries: Vec<StoredSummary> = records
            .iter()
            .filter(|r| !r.summary.trim().is_empty())
            .filter(|r| seen.insert(r.summary.trim().to_string()))
            .map(summary_from_record)
            .collect();

        let mut index = self.index.lock().await;
        index.rebuild(summaries).await?;
        Ok(index.len())
    }

    /// Save each non-blank line of a text file as a summary with no metadata.
    pub async fn seed_from_file(&self, path: impl AsRef<Path>) -> Result<Vec<SaveOutcome>> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;

        let mut outcomes = Vec::new();
        for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
            outcomes.push(self.save(line, SummaryMetadata::new()).await);
        }

        tracing::info!(
            "Seeded {} of {} lines from {}",
            outcomes.iter().filter(|o| o.is_saved()).count(),
            outcomes.len(),
            path.as_ref().display()
        );
        Ok(outcomes)
    }

    /// Number of summaries in the similarity index
    pub async fn index_len(&self) -> usize {
        self.index.lock().await.len()
    }

    /// Flush the index and close the history database
    pub async fn close(&self) -> Result<()> {
        self.index.lock().await.flush().await?;
        self.history.close().await;
        Ok(())
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Get the underlying history store
    pub fn history_store(&self) -> &HistoryStore {
        &self.history
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }
}

fn summary_from_record(record: &HistoryRecord) -> StoredSummary {
    let mut metadata = SummaryMetadata::new()
        .with_ingredients(preferences::split_joined(&record.ingredients))
        .with_cuisine(preferences::split_joined(&record.cuisine));
    if !record.title.is_empty() {
        metadata = metadata.with_title(record.title.as_str());
    }
    if record.ready_in_minutes != 0 {
        metadata = metadata.with_ready_in_minutes(record.ready_in_minutes);
    }
    metadata.saved_at = Some(record.created_at);

    StoredSummary::new(record.summary.as_str(), metadata)
}
