//! Separate-chaining hash index from short code to [`UrlRecord`].
//!
//! Chains live in an arena of slots linked by integer handles, so there are
//! no owning pointers between entries. The table doubles before an insert
//! would push the load factor above [`MAX_LOAD_FACTOR`].

use crate::error::{IndexError, Result};
use serde::Serialize;
use snip_core::{ShortCode, UrlRecord};
use std::collections::HashMap;

/// Highest load factor the table tolerates after an insert.
pub const MAX_LOAD_FACTOR: f64 = 0.75;

const HASH_PRIME: u64 = 31;

type Handle = usize;

#[derive(Debug)]
struct Slot {
    code: ShortCode,
    record: UrlRecord,
    next: Option<Handle>,
}

/// Snapshot of the index shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HashIndexStats {
    pub size: usize,
    pub capacity: usize,
    pub load_factor: f64,
    pub collision_count: u64,
    pub avg_chain_length: f64,
    pub max_chain_length: usize,
    pub non_empty_buckets: usize,
}

/// The canonical owner of every in-memory [`UrlRecord`].
#[derive(Debug)]
pub struct HashIndex {
    buckets: Vec<Option<Handle>>,
    slots: Vec<Option<Slot>>,
    free: Vec<Handle>,
    // Secondary lookup so "is this URL already shortened" stays O(1).
    by_url: HashMap<String, Handle>,
    len: usize,
    collisions: u64,
}

impl HashIndex {
    /// Creates an index with `capacity` buckets (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buckets: vec![None; capacity.max(1)],
            slots: Vec::new(),
            free: Vec::new(),
            by_url: HashMap::new(),
            len: 0,
            collisions: 0,
        }
    }

    /// Polynomial rolling hash of `key`, reduced modulo `capacity`.
    pub fn bucket_of(key: &str, capacity: usize) -> usize {
        let capacity = capacity.max(1) as u64;
        key.chars()
            .fold(0_u64, |hash, c| (hash * HASH_PRIME + c as u64) % capacity) as usize
    }

    /// Inserts or overwrites the record stored under `code`.
    ///
    /// Returns the previous record when the key was already present.
    pub fn put(&mut self, code: ShortCode, record: UrlRecord) -> Option<UrlRecord> {
        if let Some(handle) = self.find(code.as_str()) {
            let url = record.original_url.clone();
            let previous = std::mem::replace(&mut self.slot_mut(handle).record, record);
            self.unlink_url(&previous.original_url, handle);
            self.by_url.insert(url, handle);
            return Some(previous);
        }

        self.grow_for(self.len + 1);

        let bucket = Self::bucket_of(code.as_str(), self.buckets.len());
        let url = record.original_url.clone();
        let handle = self.alloc(Slot {
            code,
            record,
            next: None,
        });

        match self.tail_of(bucket) {
            Some(tail) => {
                self.slot_mut(tail).next = Some(handle);
                self.collisions += 1;
            }
            None => self.buckets[bucket] = Some(handle),
        }

        self.by_url.insert(url, handle);
        self.len += 1;
        None
    }

    /// Inserts a record, failing if `code` is already indexed.
    pub fn insert(&mut self, code: ShortCode, record: UrlRecord) -> Result<()> {
        if self.contains(code.as_str()) {
            return Err(IndexError::DuplicateKey(code.to_string()));
        }
        self.put(code, record);
        Ok(())
    }

    /// Returns the record stored under `code`.
    pub fn get(&self, code: &str) -> Option<&UrlRecord> {
        self.find(code).map(|handle| &self.slot(handle).record)
    }

    /// Returns the record that shortens `url`, if one is indexed.
    pub fn find_by_url(&self, url: &str) -> Option<&UrlRecord> {
        self.by_url.get(url).map(|&handle| &self.slot(handle).record)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.find(code).is_some()
    }

    /// Adds one click to the record under `code` and returns the new count.
    pub fn increment_clicks(&mut self, code: &str) -> Option<u64> {
        let handle = self.find(code)?;
        let record = &mut self.slot_mut(handle).record;
        record.click_count += 1;
        Some(record.click_count)
    }

    /// Removes `code` from its chain and returns its record.
    pub fn remove(&mut self, code: &str) -> Option<UrlRecord> {
        let bucket = Self::bucket_of(code, self.buckets.len());
        let mut prev: Option<Handle> = None;
        let mut cursor = self.buckets[bucket];

        while let Some(handle) = cursor {
            let slot = self.slot(handle);
            if slot.code.as_str() == code {
                let next = slot.next;
                match prev {
                    Some(p) => self.slot_mut(p).next = next,
                    None => self.buckets[bucket] = next,
                }
                let slot = self.slots[handle].take()?;
                self.free.push(handle);
                self.unlink_url(&slot.record.original_url, handle);
                self.len -= 1;
                return Some(slot.record);
            }
            prev = Some(handle);
            cursor = slot.next;
        }

        None
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.buckets.len() as f64
    }

    /// Iterates over every indexed entry in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (&ShortCode, &UrlRecord)> + '_ {
        self.buckets.iter().flat_map(move |head| {
            let mut cursor = *head;
            std::iter::from_fn(move || {
                let slot = self.slot(cursor?);
                cursor = slot.next;
                Some((&slot.code, &slot.record))
            })
        })
    }

    pub fn stats(&self) -> HashIndexStats {
        let chains: Vec<usize> = (0..self.buckets.len())
            .map(|bucket| self.chain_len(bucket))
            .filter(|&len| len > 0)
            .collect();

        let non_empty = chains.len();
        let avg_chain_length = if non_empty == 0 {
            0.0
        } else {
            chains.iter().sum::<usize>() as f64 / non_empty as f64
        };

        HashIndexStats {
            size: self.len,
            capacity: self.buckets.len(),
            load_factor: self.load_factor(),
            collision_count: self.collisions,
            avg_chain_length,
            max_chain_length: chains.iter().copied().max().unwrap_or(0),
            non_empty_buckets: non_empty,
        }
    }

    fn grow_for(&mut self, len: usize) {
        let mut capacity = self.buckets.len();
        while len as f64 / capacity as f64 > MAX_LOAD_FACTOR {
            capacity *= 2;
        }
        if capacity != self.buckets.len() {
            self.rehash(capacity);
        }
    }

    /// Relinks every live slot into a table of `capacity` buckets.
    fn rehash(&mut self, capacity: usize) {
        let order: Vec<Handle> = (0..self.buckets.len())
            .flat_map(|bucket| self.chain(bucket))
            .collect();

        self.buckets = vec![None; capacity];
        let mut tails: Vec<Option<Handle>> = vec![None; capacity];

        for handle in order {
            let bucket = Self::bucket_of(self.slot(handle).code.as_str(), capacity);
            self.slot_mut(handle).next = None;
            match tails[bucket] {
                Some(tail) => self.slot_mut(tail).next = Some(handle),
                None => self.buckets[bucket] = Some(handle),
            }
            tails[bucket] = Some(handle);
        }
    }

    fn find(&self, code: &str) -> Option<Handle> {
        let bucket = Self::bucket_of(code, self.buckets.len());
        self.chain(bucket)
            .find(|&handle| self.slot(handle).code.as_str() == code)
    }

    fn chain(&self, bucket: usize) -> impl Iterator<Item = Handle> + '_ {
        let mut cursor = self.buckets[bucket];
        std::iter::from_fn(move || {
            let handle = cursor?;
            cursor = self.slot(handle).next;
            Some(handle)
        })
    }

    fn chain_len(&self, bucket: usize) -> usize {
        self.chain(bucket).count()
    }

    fn tail_of(&self, bucket: usize) -> Option<Handle> {
        self.chain(bucket).last()
    }

    fn unlink_url(&mut self, url: &str, handle: Handle) {
        if self.by_url.get(url) == Some(&handle) {
            self.by_url.remove(url);
        }
    }

    fn alloc(&mut self, slot: Slot) -> Handle {
        match self.free.pop() {
            Some(handle) => {
                self.slots[handle] = Some(slot);
                handle
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }

    fn slot(&self, handle: Handle) -> &Slot {
        self.slots[handle]
            .as_ref()
            .unwrap_or_else(|| unreachable!("dangling hash index handle {handle}"))
    }

    fn slot_mut(&mut self, handle: Handle) -> &mut Slot {
        self.slots[handle]
            .as_mut()
            .unwrap_or_else(|| unreachable!("dangling hash index handle {handle}"))
    }
}

impl Default for HashIndex {
    fn default() -> Self {
        Self::with_capacity(16)
    }
}
