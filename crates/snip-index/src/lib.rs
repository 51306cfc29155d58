//! In-memory index structures behind the snip engine.
//!
//! Every structure here is single-threaded; the engine wraps each one in its
//! own lock.

pub mod error;
pub mod hash_index;
pub mod lru;
pub mod top_k;
pub mod trie;

pub use error::{IndexError, Result};
pub use hash_index::{HashIndex, HashIndexStats};
pub use lru::{LruCache, LruStats};
pub use top_k::{RankedCode, TopKHeap};
pub use trie::{PrefixMatch, Trie, TrieStats};
