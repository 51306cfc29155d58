//! Bounded least-recently-used cache.
//!
//! Nodes live in an arena and are linked by handles into a recency list with
//! the most recently used entry at `head` and the eviction candidate at
//! `tail`. Every operation is O(1).

use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

type Handle = usize;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<Handle>,
    next: Option<Handle>,
}

/// Snapshot of cache usage counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LruStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    /// Percentage of lookups that hit, 0 when there were no lookups.
    pub hit_rate: f64,
    pub evictions: u64,
    /// Percentage of the capacity in use.
    pub utilization: f64,
}

#[derive(Debug)]
pub struct LruCache<K, V> {
    map: HashMap<K, Handle>,
    nodes: Vec<Option<Node<K, V>>>,
    free: Vec<Handle>,
    head: Option<Handle>,
    tail: Option<Handle>,
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "LRU capacity must be greater than 0");

        Self {
            map: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            capacity,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Looks up `key`, marking it most recently used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        match self.map.get(key).copied() {
            Some(handle) => {
                self.hits += 1;
                self.move_to_front(handle);
                Some(&self.node(handle).value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Looks up `key` without touching recency or counters.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.get(key).map(|&handle| &self.node(handle).value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Inserts or refreshes `key` as most recently used.
    ///
    /// Returns the evicted entry when the insert overflowed the capacity.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&handle) = self.map.get(&key) {
            self.node_mut(handle).value = value;
            self.move_to_front(handle);
            return None;
        }

        let handle = self.alloc(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.push_front(handle);
        self.map.insert(key, handle);

        if self.map.len() > self.capacity {
            return self.evict();
        }
        None
    }

    /// Removes `key` and returns its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let handle = self.map.remove(key)?;
        self.unlink(handle);
        self.release(handle).map(|node| node.value)
    }

    /// Keys ordered from most to least recently used.
    pub fn keys(&self) -> Vec<&K> {
        let mut keys = Vec::with_capacity(self.map.len());
        let mut cursor = self.head;
        while let Some(handle) = cursor {
            let node = self.node(handle);
            keys.push(&node.key);
            cursor = node.next;
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    pub fn stats(&self) -> LruStats {
        let lookups = self.hits + self.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64 * 100.0
        };

        LruStats {
            size: self.map.len(),
            capacity: self.capacity,
            hits: self.hits,
            misses: self.misses,
            hit_rate,
            evictions: self.evictions,
            utilization: self.map.len() as f64 / self.capacity as f64 * 100.0,
        }
    }

    fn evict(&mut self) -> Option<(K, V)> {
        let tail = self.tail?;
        self.unlink(tail);
        let node = self.release(tail)?;
        self.map.remove(&node.key);
        self.evictions += 1;
        Some((node.key, node.value))
    }

    fn move_to_front(&mut self, handle: Handle) {
        if self.head == Some(handle) {
            return;
        }
        self.unlink(handle);
        self.push_front(handle);
    }

    fn push_front(&mut self, handle: Handle) {
        let old_head = self.head;
        {
            let node = self.node_mut(handle);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(head) => self.node_mut(head).prev = Some(handle),
            None => self.tail = Some(handle),
        }
        self.head = Some(handle);
    }

    fn unlink(&mut self, handle: Handle) {
        let (prev, next) = {
            let node = self.node(handle);
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }

        let node = self.node_mut(handle);
        node.prev = None;
        node.next = None;
    }

    fn alloc(&mut self, node: Node<K, V>) -> Handle {
        match self.free.pop() {
            Some(handle) => {
                self.nodes[handle] = Some(node);
                handle
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, handle: Handle) -> Option<Node<K, V>> {
        let node = self.nodes[handle].take();
        self.free.push(handle);
        node
    }

    fn node(&self, handle: Handle) -> &Node<K, V> {
        self.nodes[handle]
            .as_ref()
            .unwrap_or_else(|| unreachable!("dangling LRU handle {handle}"))
    }

    fn node_mut(&mut self, handle: Handle) -> &mut Node<K, V> {
        self.nodes[handle]
            .as_mut()
            .unwrap_or_else(|| unreachable!("dangling LRU handle {handle}"))
    }
}
