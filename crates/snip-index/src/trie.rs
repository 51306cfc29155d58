//! Character trie over original URLs, used for prefix autocomplete.

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct Node {
    children: BTreeMap<char, Node>,
    terminal: bool,
    frequency: u64,
}

impl Node {
    fn descend(&self, key: &str) -> Option<&Node> {
        key.chars()
            .try_fold(self, |node, ch| node.children.get(&ch))
    }

    fn collect(&self, prefix: &mut String, out: &mut Vec<PrefixMatch>) {
        if self.terminal {
            out.push(PrefixMatch {
                url: prefix.clone(),
                frequency: self.frequency,
            });
        }
        for (&ch, child) in &self.children {
            prefix.push(ch);
            child.collect(prefix, out);
            prefix.pop();
        }
    }

    fn count_nodes(&self) -> usize {
        1 + self.children.values().map(Node::count_nodes).sum::<usize>()
    }

    /// Removes `rest` below this node. Returns true when this node became
    /// useless and can be pruned by its parent.
    fn remove(&mut self, mut rest: std::str::Chars<'_>, removed: &mut bool) -> bool {
        match rest.next() {
            None => {
                if self.terminal {
                    self.terminal = false;
                    self.frequency = 0;
                    *removed = true;
                }
            }
            Some(ch) => {
                if let Some(child) = self.children.get_mut(&ch) {
                    if child.remove(rest, removed) {
                        self.children.remove(&ch);
                    }
                }
            }
        }
        !self.terminal && self.children.is_empty()
    }
}

/// A URL matched by a prefix search together with its frequency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefixMatch {
    pub url: String,
    pub frequency: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrieStats {
    pub total_urls: usize,
    /// Includes the root node.
    pub total_nodes: usize,
    pub avg_nodes_per_url: f64,
}

/// Case-sensitive trie keyed by the characters of each URL.
#[derive(Debug, Default)]
pub struct Trie {
    root: Node,
    len: usize,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more observation of `url` and returns its new frequency.
    ///
    /// The path is created on first sight, so a brand new URL ends up with a
    /// frequency of 1.
    pub fn insert(&mut self, url: &str) -> u64 {
        let node = self.terminal_mut(url);
        node.frequency += 1;
        node.frequency
    }

    /// Registers `url` with an explicit frequency, replacing any previous one.
    pub fn insert_with_frequency(&mut self, url: &str, frequency: u64) {
        self.terminal_mut(url).frequency = frequency;
    }

    /// Registers `url` with a frequency of at least `frequency`.
    ///
    /// Observations already recorded are kept; returns the resulting frequency.
    pub fn ensure_frequency(&mut self, url: &str, frequency: u64) -> u64 {
        let node = self.terminal_mut(url);
        node.frequency = node.frequency.max(frequency);
        node.frequency
    }

    /// Returns up to `max_results` URLs starting with `prefix`, most frequent
    /// first and alphabetical among equal frequencies.
    ///
    /// An empty prefix matches nothing.
    pub fn search_prefix(&self, prefix: &str, max_results: usize) -> Vec<PrefixMatch> {
        if prefix.is_empty() || max_results == 0 {
            return Vec::new();
        }
        let Some(start) = self.root.descend(prefix) else {
            return Vec::new();
        };

        let mut matches = Vec::new();
        let mut buf = prefix.to_string();
        start.collect(&mut buf, &mut matches);

        matches.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.url.cmp(&b.url)));
        matches.truncate(max_results);
        matches
    }

    pub fn contains(&self, url: &str) -> bool {
        self.root.descend(url).is_some_and(|node| node.terminal)
    }

    pub fn frequency(&self, url: &str) -> Option<u64> {
        self.root
            .descend(url)
            .filter(|node| node.terminal)
            .map(|node| node.frequency)
    }

    /// Removes `url`, pruning branches that no longer lead anywhere.
    pub fn remove(&mut self, url: &str) -> bool {
        let mut removed = false;
        // The root is never pruned, whatever the recursion reports.
        self.root.remove(url.chars(), &mut removed);
        if removed {
            self.len -= 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn stats(&self) -> TrieStats {
        let total_nodes = self.root.count_nodes();
        let avg_nodes_per_url = if self.len == 0 {
            0.0
        } else {
            total_nodes as f64 / self.len as f64
        };
        TrieStats {
            total_urls: self.len,
            total_nodes,
            avg_nodes_per_url,
        }
    }

    fn terminal_mut(&mut self, url: &str) -> &mut Node {
        let mut node = &mut self.root;
        for ch in url.chars() {
            node = node.children.entry(ch).or_default();
        }
        if !node.terminal {
            node.terminal = true;
            node.frequency = 0;
            self.len += 1;
        }
        node
    }
}
