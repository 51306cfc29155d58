use crate::error::StoreError;
use crate::record::UrlRecord;
use crate::shortcode::ShortCode;
use async_trait::async_trait;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// The durable store behind the engine.
///
/// The store allocates record identifiers and persists records and click
/// counts. The engine treats every call as an opaque suspension point and
/// only commits in-memory state after the relevant call succeeded.
#[async_trait]
pub trait ExternalStore: Send + Sync + 'static {
    /// Reserves a new, monotonically increasing identifier for `original_url`.
    async fn allocate_identifier(&self, original_url: &str) -> Result<u64>;

    /// Persists a fully resolved record under its identifier.
    ///
    /// Returns `Err(Conflict)` if another record already owns the short code.
    async fn persist_record(&self, record: &UrlRecord) -> Result<()>;

    /// Increments the stored click count and returns the new value.
    async fn persist_click_increment(&self, code: &ShortCode) -> Result<u64>;

    /// Retrieves the record for a given short code.
    /// Returns `None` if the code does not exist.
    async fn fetch_record(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Retrieves the record that already shortens `original_url`, if any.
    async fn find_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>>;

    /// Lists every persisted record that has a short code.
    async fn list_records(&self) -> Result<Vec<UrlRecord>>;
}
