//! On-disk similarity index over recipe summaries
//!
//! Directory layout:
//! - `manifest.json`: format version, embedding model, dimension, entry count
//! - `vectors.bin`:   bincode `Vec<Vec<f32>>`, one vector per entry
//! - `docstore.json`: `StoredSummary` entries in insertion order
//!
//! Every write replaces all three files (temp file, fsync, rename), manifest
//! last. The manifest is the commit point: data files holding more entries
//! than it records come from an interrupted write and are cut back on load.
//! Data files holding fewer entries are corruption.

use crate::embedding::EmbeddingProvider;
use crate::error::{MemoryError, Result};
use crate::types::StoredSummary;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

const FORMAT_VERSION: u32 = 1;
const MANIFEST_FILE: &str = "manifest.json";
const VECTORS_FILE: &str = "vectors.bin";
const DOCSTORE_FILE: &str = "docstore.json";

#[derive(Debug, Serialize, Deserialize)]
struct IndexManifest {
    format_version: u32,
    model: String,
    dimension: usize,
    count: usize,
}

/// A summary returned by the index with its distance to the query
#[derive(Debug, Clone)]
pub struct SimilarityHit {
    pub summary: StoredSummary,
    /// Cosine distance, lower is closer
    pub distance: f32,
}

/// Nearest-neighbor index over embedded summaries, persisted to a directory
pub struct SimilarityIndex {
    path: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    model: String,
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    entries: Vec<StoredSummary>,
}

impl std::fmt::Debug for SimilarityIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityIndex")
            .field("path", &self.path)
            .field("model", &self.model)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl SimilarityIndex {
    /// Load the index persisted at `path`, or start an empty one there.
    pub async fn open_or_create(
        path: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let mut index = Self::create_empty(path, embedder).await?;

        if !index.path.join(MANIFEST_FILE).exists() {
            tracing::info!("Created empty similarity index at {}", index.path.display());
            return Ok(index);
        }

        index.load().await?;
        tracing::debug!(
            "Loaded similarity index at {} ({} entries)",
            index.path.display(),
            index.entries.len()
        );
        Ok(index)
    }

    /// An empty index at `path` that ignores anything already stored there.
    ///
    /// Existing files are overwritten on the next write.
    pub async fn create_empty(
        path: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if path.exists() && !path.is_dir() {
            return Err(MemoryError::Storage(format!(
                "Index path {} exists but is not a directory",
                path.display()
            )));
        }

        tokio::fs::create_dir_all(&path).await.map_err(|e| {
            MemoryError::Storage(format!("Failed to create index dir {}: {e}", path.display()))
        })?;

        Ok(Self {
            model: embedder.model_version(),
            dimension: embedder.dimension(),
            path,
            embedder,
            vectors: Vec::new(),
            entries: Vec::new(),
        })
    }

    async fn load(&mut self) -> Result<()> {
        let manifest_bytes = read_file(&self.path.join(MANIFEST_FILE)).await?;
        let manifest: IndexManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| MemoryError::Storage(format!("Corrupt index manifest: {e}")))?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(MemoryError::Storage(format!(
                "Unsupported index format version {} (expected {FORMAT_VERSION})",
                manifest.format_version
            )));
        }
        if manifest.model != self.model || manifest.dimension != self.dimension {
            return Err(MemoryError::Storage(format!(
                "Index was built with {} ({} dims) but the active embedder is {} ({} dims); rebuild required",
                manifest.model, manifest.dimension, self.model, self.dimension
            )));
        }

        let vector_bytes = read_file(&self.path.join(VECTORS_FILE)).await?;
        let mut vectors: Vec<Vec<f32>> = bincode::deserialize(&vector_bytes)
            .map_err(|e| MemoryError::Storage(format!("Corrupt index vectors: {e}")))?;

        let doc_bytes = read_file(&self.path.join(DOCSTORE_FILE)).await?;
        let mut entries: Vec<StoredSummary> = serde_json::from_slice(&doc_bytes)
            .map_err(|e| MemoryError::Storage(format!("Corrupt index docstore: {e}")))?;

        if vectors.len() < manifest.count || entries.len() < manifest.count {
            return Err(MemoryError::Storage(format!(
                "Index count mismatch: manifest {}, vectors {}, docstore {}",
                manifest.count,
                vectors.len(),
                entries.len()
            )));
        }
        if vectors.len() > manifest.count || entries.len() > manifest.count {
            tracing::warn!(
                "Discarding uncommitted index entries at {} (manifest {}, vectors {}, docstore {})",
                self.path.display(),
                manifest.count,
                vectors.len(),
                entries.len()
            );
            vectors.truncate(manifest.count);
            entries.truncate(manifest.count);
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(MemoryError::Storage(format!(
                "Index vector has {} dims, expected {}",
                bad.len(),
                self.dimension
            )));
        }

        self.vectors = vectors;
        self.entries = entries;
        Ok(())
    }

    /// Up to `k` stored summaries, closest first.
    pub async fn search(&self, query_text: &str, k: usize) -> Result<Vec<StoredSummary>> {
        Ok(self
            .search_scored(query_text, k)
            .await?
            .into_iter()
            .map(|hit| hit.summary)
            .collect())
    }

    /// Like [`search`](Self::search) but keeps the distances.
    pub async fn search_scored(&self, query_text: &str, k: usize) -> Result<Vec<SimilarityHit>> {
        if k == 0 {
            return Err(MemoryError::Validation("k must be at least 1".into()));
        }
        if query_text.trim().is_empty() || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embed_one(query_text).await?;
        let wanted = query_text.trim();

        let mut scored: Vec<(usize, f32, bool)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let exact = self.entries[i].text.trim() == wanted;
                (i, 1.0 - cosine_similarity(&query, v), exact)
            })
            .collect();

        // Equal distances: the exact text match first, then insertion order.
        // The embedder folds case and word order, so ties are common.
        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.2.cmp(&a.2))
        });
        scored.truncate(k);

        tracing::debug!("Index search returned {} of {} entries", scored.len(), self.len());

        Ok(scored
            .into_iter()
            .map(|(i, distance, _)| SimilarityHit {
                summary: self.entries[i].clone(),
                distance,
            })
            .collect())
    }

    /// Embed and append `summary`, then persist the whole index.
    ///
    /// The in-memory entry is dropped again if persisting fails, so memory
    /// and disk stay in agreement.
    pub async fn insert(&mut self, summary: StoredSummary) -> Result<()> {
        if summary.text.trim().is_empty() {
            return Err(MemoryError::Validation("summary text is empty".into()));
        }

        let vector = self.embed_one(&summary.text).await?;
        self.vectors.push(vector);
        self.entries.push(summary);

        if let Err(e) = self.persist().await {
            self.vectors.pop();
            self.entries.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Replace every entry with `summaries`, re-embedded with the active embedder.
    ///
    /// This is the only way to move an index to a new embedding model.
    pub async fn rebuild(&mut self, summaries: Vec<StoredSummary>) -> Result<()> {
        let summaries: Vec<StoredSummary> = summaries
            .into_iter()
            .filter(|s| !s.text.trim().is_empty())
            .collect();
        let texts: Vec<String> = summaries.iter().map(|s| s.text.clone()).collect();

        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed(&texts).await?
        };
        if vectors.len() != summaries.len() {
            return Err(MemoryError::EmbeddingFailed(format!(
                "Embedder returned {} vectors for {} texts",
                vectors.len(),
                summaries.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(MemoryError::EmbeddingFailed(format!(
                "Embedder returned {} dims, expected {}",
                bad.len(),
                self.dimension
            )));
        }

        self.vectors = vectors;
        self.entries = summaries;
        self.persist().await?;
        tracing::info!("Rebuilt similarity index with {} entries", self.entries.len());
        Ok(())
    }

    /// Write the current state to disk.
    pub async fn flush(&self) -> Result<()> {
        self.persist().await
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Stored summaries in insertion order
    pub fn entries(&self) -> &[StoredSummary] {
        &self.entries
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let vector = self
            .embedder
            .embed(&texts)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MemoryError::EmbeddingFailed("Embedder returned no vector".into()))?;

        if vector.len() != self.dimension {
            return Err(MemoryError::EmbeddingFailed(format!(
                "Embedder returned {} dims, expected {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(vector)
    }

    async fn persist(&self) -> Result<()> {
        let docstore = serde_json::to_vec(&self.entries)
            .map_err(|e| MemoryError::Serialization(e.to_string()))?;
        let vectors = bincode::serialize(&self.vectors)
            .map_err(|e| MemoryError::Serialization(e.to_string()))?;
        let manifest = serde_json::to_vec_pretty(&IndexManifest {
            format_version: FORMAT_VERSION,
            model: self.model.clone(),
            dimension: self.dimension,
            count: self.entries.len(),
        })
        .map_err(|e| MemoryError::Serialization(e.to_string()))?;

        write_atomic(&self.path.join(DOCSTORE_FILE), &docstore).await?;
        write_atomic(&self.path.join(VECTORS_FILE), &vectors).await?;
        write_atomic(&self.path.join(MANIFEST_FILE), &manifest).await?;
        Ok(())
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| MemoryError::Storage(format!("Failed to read {}: {e}", path.display())))
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let storage_err =
        |e: std::io::Error| MemoryError::Storage(format!("Failed to write {}: {e}", path.display()));

    let written = async {
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        tokio::fs::rename(&temp_path, path).await
    }
    .await;

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(storage_err(e));
    }
    Ok(())
}

/// Compute cosine similarity between two vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
