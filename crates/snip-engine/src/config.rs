use crate::error::{EngineError, Result};
use snip_core::CollisionStrategy;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// When a redirect's click increment is written to the external store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickPersistence {
    /// Persist before the in-memory increment; a store failure fails the redirect.
    Synchronous,
    /// Persist from a spawned task; failures are logged and otherwise ignored.
    #[default]
    Background,
    /// Never persist click increments.
    Disabled,
}

/// Construction-time settings of a [`ShortenerEngine`](crate::ShortenerEngine).
#[derive(Debug, Clone, TypedBuilder)]
pub struct EngineConfig {
    /// Initial bucket count of the hash index.
    #[builder(default = 1000)]
    pub hash_capacity: usize,
    #[builder(default = 100)]
    pub lru_capacity: usize,
    /// Number of codes tracked for the popularity ranking.
    #[builder(default = 10)]
    pub top_k: usize,
    /// Upper bound on index lookups while resolving one collision.
    #[builder(default = 10)]
    pub max_attempts: u32,
    #[builder(default)]
    pub default_strategy: CollisionStrategy,
    #[builder(default)]
    pub click_persistence: ClickPersistence,
    /// Deadline applied to every external store call.
    #[builder(default = Duration::from_secs(5))]
    pub store_timeout: Duration,
    /// Public prefix that short codes are appended to.
    #[builder(default = "http://localhost:8080".to_string(), setter(into))]
    pub base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lru_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "lru capacity must be greater than 0".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(EngineError::InvalidConfig(
                "max attempts must be greater than 0".to_string(),
            ));
        }
        if self.base_url.is_empty() {
            return Err(EngineError::InvalidConfig(
                "base url cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.hash_capacity, 1000);
        assert_eq!(config.lru_capacity, 100);
        assert_eq!(config.top_k, 10);
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.default_strategy, CollisionStrategy::Linear);
        assert_eq!(config.click_persistence, ClickPersistence::Background);
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.base_url, "http://localhost:8080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_lru_capacity() {
        let config = EngineConfig::builder().lru_capacity(0).build();
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_zero_max_attempts() {
        let config = EngineConfig::builder().max_attempts(0).build();
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }
}
