//! Engine configuration

use crate::error::{MemoryError, Result};
use std::path::PathBuf;

/// Where things live and the knobs shared by every operation
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Root directory for both persistence targets
    pub data_dir: PathBuf,
    /// Similarity index directory, relative to `data_dir`
    pub index_dir_name: String,
    /// History database file, relative to `data_dir`
    pub history_db_name: String,
    /// User recorded on saves that don't name one
    pub default_user: String,
    /// `find_similar` result count when the caller has no preference
    pub default_top_k: usize,
    /// Dimension for the built-in hash embedder
    pub embedding_dimension: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./recipe_memory_data"),
            index_dir_name: "vector_store/recipes".to_string(),
            history_db_name: "cook_history.db".to_string(),
            default_user: "demo".to_string(),
            default_top_k: 3,
            embedding_dimension: 384, // all-MiniLM-L6-v2 width
        }
    }
}

impl MemoryConfig {
    /// Default configuration rooted at `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn builder() -> MemoryConfigBuilder {
        MemoryConfigBuilder::default()
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(&self.index_dir_name)
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(&self.history_db_name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_top_k == 0 {
            return Err(MemoryError::Configuration(
                "default_top_k must be at least 1".into(),
            ));
        }
        if self.embedding_dimension == 0 {
            return Err(MemoryError::Configuration(
                "embedding_dimension must be at least 1".into(),
            ));
        }
        if self.default_user.trim().is_empty() {
            return Err(MemoryError::Configuration(
                "default_user must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`MemoryConfig`]
#[derive(Debug, Default)]
pub struct MemoryConfigBuilder {
    config: MemoryConfig,
}

impl MemoryConfigBuilder {
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn index_dir_name(mut self, name: impl Into<String>) -> Self {
        self.config.index_dir_name = name.into();
        self
    }

    pub fn history_db_name(mut self, name: impl Into<String>) -> Self {
        self.config.history_db_name = name.into();
        self
    }

    pub fn default_user(mut self, user: impl Into<String>) -> Self {
        self.config.default_user = user.into();
        self
    }

    pub fn default_top_k(mut self, k: usize) -> Self {
        self.config.default_top_k = k;
        self
    }

    pub fn embedding_dimension(mut self, dimension: usize) -> Self {
        self.config.embedding_dimension = dimension;
        self
    }

    pub fn build(self) -> MemoryConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted_at_data_dir() {
        let config = MemoryConfig::new("/tmp/cook");
        assert_eq!(
            config.index_path(),
            PathBuf::from("/tmp/cook/vector_store/recipes")
        );
        assert_eq!(config.history_path(), PathBuf::from("/tmp/cook/cook_history.db"));
    }

    #[test]
    fn validate_rejects_zero_top_k() {
        let config = MemoryConfig::builder().default_top_k(0).build();
        assert!(matches!(
            config.validate(),
            Err(MemoryError::Configuration(_))
        ));
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = MemoryConfig::builder()
            .default_user("alice")
            .embedding_dimension(64)
            .build();
        assert_eq!(config.default_user, "alice");
        assert_eq!(config.embedding_dimension, 64);
        assert_eq!(config.default_top_k, 3);
        assert!(config.validate().is_ok());
    }
}
