use crate::error::Result;
use async_trait::async_trait;

/// Text-to-vector capability backing the similarity index.
///
/// Implementations must be deterministic for a given `model_version()`: the
/// index records that string and refuses to load under a different one.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn dimension(&self) -> usize;

    /// Identifier persisted next to the vectors.
    fn model_version(&self) -> String {
        format!("{}-{}", self.name(), self.dimension())
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Zero-config embedding provider.
///
/// Deterministic token hashing (FNV-1a) into a fixed number of buckets,
/// L2-normalized. No network, no model downloads. Works on any script whose
/// characters are alphanumeric, so localized summaries embed fine.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimension: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        let mut token_count = 0u32;

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            token_count += 1;
            let lowered = token.to_lowercase();
            let mut hash = 1469598103934665603u64;
            for b in lowered.as_bytes() {
                hash ^= *b as u64;
                hash = hash.wrapping_mul(1099511628211u64);
            }

            let idx = (hash as usize) % self.dimension;
            vec[idx] += 1.0;
        }

        if token_count == 0 {
            return vec;
        }

        let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vec {
                *v /= norm;
            }
        }

        vec
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embeddings_are_deterministic_and_normalized() {
        let provider = HashEmbeddingProvider::new(64);
        let texts = vec!["Spicy kimchi fried rice".to_string()];

        let a = provider.embed(&texts).await.unwrap();
        let b = provider.embed(&texts).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 64);

        let norm = a[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn punctuation_only_text_embeds_to_zero_vector() {
        let provider = HashEmbeddingProvider::new(16);
        let v = provider.embed(&["...!".to_string()]).await.unwrap();
        assert!(v[0].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn model_version_includes_dimension() {
        assert_eq!(HashEmbeddingProvider::new(384).model_version(), "hash-384");
    }
}
