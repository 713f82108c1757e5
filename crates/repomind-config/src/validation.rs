//! Semantic validation for loaded configuration

use crate::{ApplicationConfig, ConfigError, ConfigResult};

/// Implemented by configuration types that carry semantic invariants
pub trait Validate {
    /// Check invariants that type-level parsing cannot express
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` with the first violated rule.
    fn validate(&self) -> ConfigResult<()>;
}

impl Validate for ApplicationConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.database.url.is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Validation("retrieval.top_k must be at least 1".into()));
        }
        if self.retrieval.candidate_multiplier == 0 {
            return Err(ConfigError::Validation(
                "retrieval.candidate_multiplier must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retrieval.min_score) {
            return Err(ConfigError::Validation(
                "retrieval.min_score must lie in [0, 1]".into(),
            ));
        }
        if self.chunking.overlap_lines >= self.chunking.window_lines {
            return Err(ConfigError::Validation(
                "chunking.overlap_lines must be smaller than chunking.window_lines".into(),
            ));
        }
        if self.chunking.min_window_lines == 0 || self.chunking.max_chunk_chars == 0 {
            return Err(ConfigError::Validation(
                "chunking window and chunk sizes must be positive".into(),
            ));
        }
        if self.embedding.batch_size == 0 || self.embedding.batch_size > 100 {
            return Err(ConfigError::Validation(
                "embedding.batch_size must lie in [1, 100]".into(),
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::Validation("embedding.dimension must be positive".into()));
        }
        if self.indexing.worker_concurrency == 0 {
            return Err(ConfigError::Validation(
                "indexing.worker_concurrency must be at least 1".into(),
            ));
        }
        if self.github.fetch_concurrency == 0 {
            return Err(ConfigError::Validation(
                "github.fetch_concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ApplicationConfig::for_tests().validate().is_ok());
    }

    #[test]
    fn rejects_zero_top_k() {
        let mut config = ApplicationConfig::for_tests();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_overlap_wider_than_window() {
        let mut config = ApplicationConfig::for_tests();
        config.chunking.overlap_lines = config.chunking.window_lines;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_oversized_embedding_batch() {
        let mut config = ApplicationConfig::for_tests();
        config.embedding.batch_size = 101;
        assert!(config.validate().is_err());
    }
}
