//! Bounded top-K tracker for the most clicked short codes.
//!
//! The structure is a binary min-heap of at most `k` entries. The root is the
//! weakest tracked code, so admitting a new code is a single comparison
//! against it. A side index maps each code to its heap slot so a click on an
//! already tracked code updates it in place.

use serde::Serialize;
use snip_core::ShortCode;
use std::cmp::Ordering;
use std::collections::HashMap;

/// A tracked code and the click count it was last observed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCode {
    pub short_code: ShortCode,
    pub clicks: u64,
}

#[derive(Debug, Clone)]
struct Entry {
    code: ShortCode,
    clicks: u64,
    arrival: u64,
}

impl Entry {
    /// Fewer clicks is weaker; among equal clicks the later arrival is weaker.
    fn weakness(&self, other: &Entry) -> Ordering {
        self.clicks
            .cmp(&other.clicks)
            .then_with(|| other.arrival.cmp(&self.arrival))
    }
}

#[derive(Debug)]
pub struct TopKHeap {
    k: usize,
    heap: Vec<Entry>,
    slots: HashMap<ShortCode, usize>,
    next_arrival: u64,
}

impl TopKHeap {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: Vec::with_capacity(k),
            slots: HashMap::with_capacity(k),
            next_arrival: 0,
        }
    }

    /// Reports that `code` now has `clicks` clicks.
    ///
    /// A tracked code is raised in place; a lower count than the one already
    /// tracked is ignored. An untracked code is admitted while there is room,
    /// or when it strictly beats the weakest tracked code, which is evicted.
    pub fn observe(&mut self, code: &ShortCode, clicks: u64) {
        if self.k == 0 {
            return;
        }

        if let Some(&slot) = self.slots.get(code) {
            if clicks > self.heap[slot].clicks {
                self.heap[slot].clicks = clicks;
                self.sift_down(slot);
            }
            return;
        }

        let entry = Entry {
            code: code.clone(),
            clicks,
            arrival: self.next_arrival,
        };

        if self.heap.len() < self.k {
            self.next_arrival += 1;
            self.heap.push(entry);
            let slot = self.heap.len() - 1;
            self.slots.insert(code.clone(), slot);
            self.sift_up(slot);
        } else if clicks > self.heap[0].clicks {
            self.next_arrival += 1;
            let evicted = std::mem::replace(&mut self.heap[0], entry);
            self.slots.remove(&evicted.code);
            self.slots.insert(code.clone(), 0);
            self.sift_down(0);
        }
    }

    /// Tracked codes, most clicked first. Equal counts keep admission order.
    pub fn top_k(&self) -> Vec<RankedCode> {
        let mut entries: Vec<&Entry> = self.heap.iter().collect();
        entries.sort_by(|a, b| b.weakness(a));
        entries
            .into_iter()
            .map(|entry| RankedCode {
                short_code: entry.code.clone(),
                clicks: entry.clicks,
            })
            .collect()
    }

    pub fn contains(&self, code: &ShortCode) -> bool {
        self.slots.contains_key(code)
    }

    /// Click count of the weakest tracked code.
    pub fn min_clicks(&self) -> Option<u64> {
        self.heap.first().map(|entry| entry.clicks)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.k
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.heap[slot].weakness(&self.heap[parent]) != Ordering::Less {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut weakest = slot;

            if left < len && self.heap[left].weakness(&self.heap[weakest]) == Ordering::Less {
                weakest = left;
            }
            if right < len && self.heap[right].weakness(&self.heap[weakest]) == Ordering::Less {
                weakest = right;
            }
            if weakest == slot {
                break;
            }
            self.swap(slot, weakest);
            slot = weakest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.slots.insert(self.heap[a].code.clone(), a);
        self.slots.insert(self.heap[b].code.clone(), b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn code(s: &str) -> ShortCode {
        ShortCode::new(s).unwrap()
    }

    fn ranked(heap: &TopKHeap) -> Vec<(String, u64)> {
        heap.top_k()
            .into_iter()
            .map(|r| (r.short_code.to_string(), r.clicks))
            .collect()
    }

    #[test]
    fn keeps_the_k_most_clicked() {
        let mut heap = TopKHeap::new(2);
        heap.observe(&code("a"), 5);
        heap.observe(&code("b"), 3);
        heap.observe(&code("c"), 9);

        assert_eq!(ranked(&heap), vec![("c".into(), 9), ("a".into(), 5)]);
        assert!(!heap.contains(&code("b")));
        assert_eq!(heap.min_clicks(), Some(5));
    }

    #[test]
    fn tracked_code_is_updated_in_place() {
        let mut heap = TopKHeap::new(3);
        heap.observe(&code("a"), 1);
        heap.observe(&code("b"), 2);
        heap.observe(&code("a"), 7);

        assert_eq!(heap.len(), 2);
        assert_eq!(ranked(&heap), vec![("a".into(), 7), ("b".into(), 2)]);
    }

    #[test]
    fn stale_lower_count_is_ignored() {
        let mut heap = TopKHeap::new(2);
        heap.observe(&code("a"), 7);
        heap.observe(&code("a"), 3);

        assert_eq!(ranked(&heap), vec![("a".into(), 7)]);
    }

    #[test]
    fn equal_count_does_not_displace_root() {
        let mut heap = TopKHeap::new(2);
        heap.observe(&code("a"), 4);
        heap.observe(&code("b"), 4);
        heap.observe(&code("c"), 4);

        assert_eq!(ranked(&heap), vec![("a".into(), 4), ("b".into(), 4)]);
        assert!(!heap.contains(&code("c")));
    }

    #[test]
    fn among_ties_the_newest_is_evicted_first() {
        let mut heap = TopKHeap::new(2);
        heap.observe(&code("a"), 4);
        heap.observe(&code("b"), 4);
        heap.observe(&code("c"), 5);

        assert_eq!(ranked(&heap), vec![("c".into(), 5), ("a".into(), 4)]);
    }

    #[test]
    fn zero_k_tracks_nothing() {
        let mut heap = TopKHeap::new(0);
        heap.observe(&code("a"), 100);
        assert!(heap.is_empty());
        assert!(heap.top_k().is_empty());
        assert_eq!(heap.min_clicks(), None);
    }

    proptest! {
        #[test]
        fn top_k_holds_the_largest_counts(
            k in 1..6_usize,
            clicks in proptest::collection::vec((0..12_u8, 1..4_u64), 0..150),
        ) {
            let mut heap = TopKHeap::new(k);
            let mut counts = HashMap::<u8, u64>::new();

            // Counts only grow, as they do for real click streams.
            for (id, delta) in clicks {
                let count = counts.entry(id).or_default();
                *count += delta;
                heap.observe(&ShortCode::from_id(id as u64).unwrap(), *count);
            }

            let top = heap.top_k();
            prop_assert_eq!(top.len(), k.min(counts.len()));
            prop_assert!(top.windows(2).all(|w| w[0].clicks >= w[1].clicks));
            for entry in &top {
                prop_assert_eq!(entry.clicks, counts[&id_of(&entry.short_code)]);
            }
            let floor = heap.min_clicks().unwrap_or(0);
            for (id, count) in &counts {
                if !heap.contains(&ShortCode::from_id(*id as u64).unwrap()) {
                    prop_assert!(*count <= floor);
                }
            }
            for (slot, entry) in heap.heap.iter().enumerate() {
                prop_assert_eq!(heap.slots[&entry.code], slot);
            }
        }
    }

    fn id_of(code: &ShortCode) -> u8 {
        snip_core::base62::decode(code.as_str()).unwrap() as u8
    }
}
