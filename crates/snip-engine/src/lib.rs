//! The snip indexing engine.
//!
//! [`ShortenerEngine`] ties the in-memory structures of `snip-index` to an
//! [`ExternalStore`](snip_core::ExternalStore): it shortens URLs, resolves
//! short codes, tracks popularity and answers prefix searches.

pub mod collision;
pub mod config;
pub mod engine;
pub mod error;
pub mod stats;

pub use collision::{CollisionResolver, CollisionStats, Resolution};
pub use config::{ClickPersistence, EngineConfig};
pub use engine::{ShortenOutcome, ShortenerEngine};
pub use error::{EngineError, Result};
pub use stats::{EngineStats, TopKStats};
