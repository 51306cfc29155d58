//! Core types and traits for the snip URL shortener.
//!
//! This crate provides the base62 codec, the validated [`ShortCode`] type,
//! the canonical [`UrlRecord`], and the [`ExternalStore`] contract that the
//! engine uses to allocate identifiers and persist records.

pub mod base62;
pub mod error;
pub mod record;
pub mod shortcode;
pub mod store;

pub use error::{CoreError, StoreError};
pub use record::{CollisionStrategy, UrlRecord};
pub use shortcode::ShortCode;
pub use store::ExternalStore;
