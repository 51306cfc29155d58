use crate::collision::CollisionStats;
use serde::Serialize;
use snip_index::{HashIndexStats, LruStats, TrieStats};

/// Point-in-time statistics of every engine structure.
///
/// Each part is read under its own lock, so the parts are individually
/// consistent but not a single atomic snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStats {
    pub hash_index: HashIndexStats,
    pub lru_cache: LruStats,
    pub trie: TrieStats,
    pub collision_detector: CollisionStats,
    pub top_k: TopKStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopKStats {
    pub tracked: usize,
    pub capacity: usize,
    pub min_clicks: Option<u64>,
}
