use crate::error::CoreError;
use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Strategy used to find a free short code after a collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionStrategy {
    /// Increment the last base62 digit, carrying on overflow.
    #[default]
    Linear,
    /// Derive a fresh code from a time-based and random seed.
    Regenerate,
    /// Append a numeric counter to the original code.
    Append,
}

impl CollisionStrategy {
    pub const ALL: [CollisionStrategy; 3] = [Self::Linear, Self::Regenerate, Self::Append];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollisionStrategy::Linear => "linear",
            CollisionStrategy::Regenerate => "regenerate",
            CollisionStrategy::Append => "append",
        }
    }
}

impl Display for CollisionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollisionStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "regenerate" => Ok(Self::Regenerate),
            "append" => Ok(Self::Append),
            other => Err(CoreError::UnknownStrategy(other.to_string())),
        }
    }
}

/// A shortened URL as held by the engine and the external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Identifier allocated by the external store.
    pub id: u64,
    /// The original URL that was shortened.
    pub original_url: String,
    /// The unique short code pointing at `original_url`.
    pub short_code: ShortCode,
    /// Number of redirects served for this record.
    pub click_count: u64,
    /// When the record was created.
    pub created_at: Timestamp,
    /// Whether the encoded identifier collided with an existing code.
    pub collision_detected: bool,
    /// The strategy that resolved the collision, if one occurred.
    pub resolution_strategy: Option<CollisionStrategy>,
}

impl UrlRecord {
    /// Creates a record with no clicks and no collision metadata.
    pub fn new(id: u64, original_url: impl Into<String>, short_code: ShortCode) -> Self {
        Self {
            id,
            original_url: original_url.into(),
            short_code,
            click_count: 0,
            created_at: Timestamp::now(),
            collision_detected: false,
            resolution_strategy: None,
        }
    }

    /// Attaches the outcome of collision resolution.
    pub fn with_resolution(mut self, strategy: Option<CollisionStrategy>) -> Self {
        self.collision_detected = strategy.is_some();
        self.resolution_strategy = strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_its_own_names() {
        for strategy in CollisionStrategy::ALL {
            assert_eq!(strategy.as_str().parse::<CollisionStrategy>().unwrap(), strategy);
        }
        assert!("quadratic".parse::<CollisionStrategy>().is_err());
    }

    #[test]
    fn default_strategy_is_linear() {
        assert_eq!(CollisionStrategy::default(), CollisionStrategy::Linear);
    }

    #[test]
    fn with_resolution_sets_collision_flag() {
        let code = ShortCode::new("abc").unwrap();
        let record = UrlRecord::new(1, "https://example.com", code.clone());
        assert!(!record.collision_detected);

        let resolved = record.with_resolution(Some(CollisionStrategy::Append));
        assert!(resolved.collision_detected);
        assert_eq!(resolved.resolution_strategy, Some(CollisionStrategy::Append));
        assert_eq!(resolved.short_code, code);
        assert_eq!(resolved.click_count, 0);
    }
}
