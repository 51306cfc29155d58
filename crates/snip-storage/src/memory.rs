use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use snip_core::store::{ExternalStore, Result};
use snip_core::{ShortCode, StoreError, UrlRecord};
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory implementation of [`ExternalStore`] using DashMap.
///
/// Identifiers come from an atomic sequence starting at 1. Records are keyed
/// by short code with a second map from original URL to short code.
#[derive(Debug)]
pub struct InMemoryStore {
    records: DashMap<String, UrlRecord>,
    by_url: DashMap<String, String>,
    next_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: DashMap::with_capacity(capacity),
            by_url: DashMap::with_capacity(capacity),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of persisted records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExternalStore for InMemoryStore {
    async fn allocate_identifier(&self, _original_url: &str) -> Result<u64> {
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn persist_record(&self, record: &UrlRecord) -> Result<()> {
        let key = record.short_code.as_str().to_owned();

        match self.records.entry(key) {
            Entry::Occupied(existing) if existing.get().id != record.id => {
                return Err(StoreError::Conflict(record.short_code.to_string()));
            }
            Entry::Occupied(mut existing) => {
                existing.insert(record.clone());
            }
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
            }
        }

        self.by_url.insert(
            record.original_url.clone(),
            record.short_code.as_str().to_owned(),
        );
        Ok(())
    }

    async fn persist_click_increment(&self, code: &ShortCode) -> Result<u64> {
        let Some(mut record) = self.records.get_mut(code.as_str()) else {
            return Err(StoreError::Operation(format!(
                "no record for short code {code}"
            )));
        };
        record.click_count += 1;
        Ok(record.click_count)
    }

    async fn fetch_record(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        Ok(self.records.get(code.as_str()).map(|entry| entry.clone()))
    }

    async fn find_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        let Some(code) = self.by_url.get(original_url).map(|entry| entry.clone()) else {
            return Ok(None);
        };
        Ok(self.records.get(&code).map(|entry| entry.clone()))
    }

    async fn list_records(&self) -> Result<Vec<UrlRecord>> {
        let mut records: Vec<UrlRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }
}
