//! Short-code collision resolution.
//!
//! The resolver only asks whether a code is taken. Callers keep that answer
//! stable, by holding the index write lock, until the returned code is
//! reserved.

use crate::error::{EngineError, Result};
use jiff::Timestamp;
use rand::Rng;
use serde::Serialize;
use snip_core::base62::{self, ALPHABET, BASE};
use snip_core::{CollisionStrategy, ShortCode};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// A free short code and how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub code: ShortCode,
    /// Index lookups spent, including the check of the original candidate.
    pub attempts: u32,
    /// Strategy that produced `code`, or `None` if the candidate was free.
    pub strategy: Option<CollisionStrategy>,
}

impl Resolution {
    pub fn collided(&self) -> bool {
        self.strategy.is_some()
    }
}

/// Resolver counters. `total_collisions` counts resolved collisions only;
/// collisions that ran out of attempts are counted in `exhausted`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollisionStats {
    pub total_collisions: u64,
    pub linear_resolutions: u64,
    pub regenerate_resolutions: u64,
    pub append_resolutions: u64,
    /// Share of resolved collisions per strategy, in percent.
    pub linear_percentage: f64,
    pub regenerate_percentage: f64,
    pub append_percentage: f64,
    pub exhausted: u64,
    pub max_attempts_seen: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Default)]
struct Counters {
    linear: AtomicU64,
    regenerate: AtomicU64,
    append: AtomicU64,
    exhausted: AtomicU64,
    max_attempts_seen: AtomicU64,
}

#[derive(Debug)]
pub struct CollisionResolver {
    max_attempts: u32,
    counters: Counters,
}

impl CollisionResolver {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            counters: Counters::default(),
        }
    }

    /// Finds a code for which `is_taken` is false, starting from `candidate`.
    ///
    /// A free candidate is returned as is. Otherwise `strategy` derives new
    /// candidates until one is free or `max_attempts` lookups were spent.
    /// Derived candidates that equal the original or are not valid short codes
    /// count as failed attempts.
    pub fn resolve(
        &self,
        candidate: &ShortCode,
        strategy: CollisionStrategy,
        is_taken: impl Fn(&str) -> bool,
    ) -> Result<Resolution> {
        let mut attempts = 1;
        if !is_taken(candidate.as_str()) {
            return Ok(Resolution {
                code: candidate.clone(),
                attempts,
                strategy: None,
            });
        }

        debug!(code = %candidate, %strategy, "short code collision detected");

        let original = candidate.as_str();
        let mut previous = original.to_string();
        while attempts < self.max_attempts {
            attempts += 1;
            let next = match strategy {
                CollisionStrategy::Linear => increment(&previous),
                CollisionStrategy::Regenerate => regenerate(),
                CollisionStrategy::Append => format!("{original}{}", attempts - 1),
            };
            previous.clone_from(&next);

            if next == original {
                continue;
            }
            let Ok(code) = ShortCode::new(next) else {
                continue;
            };
            if is_taken(code.as_str()) {
                continue;
            }

            self.record_success(strategy, attempts);
            debug!(original = %candidate, code = %code, attempts, "collision resolved");
            return Ok(Resolution {
                code,
                attempts,
                strategy: Some(strategy),
            });
        }

        self.counters.exhausted.fetch_add(1, Ordering::Relaxed);
        self.counters
            .max_attempts_seen
            .fetch_max(attempts as u64, Ordering::Relaxed);
        warn!(code = %candidate, %strategy, attempts, "collision resolution exhausted");
        Err(EngineError::CollisionExhausted {
            code: candidate.to_string(),
            strategy,
            attempts,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn stats(&self) -> CollisionStats {
        let c = &self.counters;
        let linear = c.linear.load(Ordering::Relaxed);
        let regenerate = c.regenerate.load(Ordering::Relaxed);
        let append = c.append.load(Ordering::Relaxed);
        let total = linear + regenerate + append;
        let share = |count: u64| {
            if total == 0 {
                0.0
            } else {
                (count as f64 / total as f64 * 10_000.0).round() / 100.0
            }
        };

        CollisionStats {
            total_collisions: total,
            linear_resolutions: linear,
            regenerate_resolutions: regenerate,
            append_resolutions: append,
            linear_percentage: share(linear),
            regenerate_percentage: share(regenerate),
            append_percentage: share(append),
            exhausted: c.exhausted.load(Ordering::Relaxed),
            max_attempts_seen: c.max_attempts_seen.load(Ordering::Relaxed),
            max_attempts: self.max_attempts,
        }
    }

    fn record_success(&self, strategy: CollisionStrategy, attempts: u32) {
        let counter = match strategy {
            CollisionStrategy::Linear => &self.counters.linear,
            CollisionStrategy::Regenerate => &self.counters.regenerate,
            CollisionStrategy::Append => &self.counters.append,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.counters
            .max_attempts_seen
            .fetch_max(attempts as u64, Ordering::Relaxed);
    }
}

/// Adds one to the base62 number spelled by `code`, carrying leftwards and
/// growing by one digit when every digit overflows.
fn increment(code: &str) -> String {
    let mut digits: Vec<u8> = code.chars().filter_map(base62::digit).collect();
    let top = (BASE - 1) as u8;

    let mut carry = true;
    for digit in digits.iter_mut().rev() {
        if *digit == top {
            *digit = 0;
        } else {
            *digit += 1;
            carry = false;
            break;
        }
    }
    if carry {
        digits.insert(0, 1);
    }

    digits.into_iter().filter_map(base62::symbol).collect()
}

/// A fresh candidate from the tail of the current microsecond timestamp plus
/// one random symbol.
fn regenerate() -> String {
    let mut rng = rand::thread_rng();
    let micros = Timestamp::now().as_microsecond().unsigned_abs();
    let encoded = base62::encode(micros);

    let keep = rng.gen_range(4..=6).min(encoded.len());
    let mut code = encoded[encoded.len() - keep..].to_string();
    code.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use snip_core::UrlRecord;
    use snip_index::HashIndex;

    fn code(s: &str) -> ShortCode {
        ShortCode::new(s).unwrap()
    }

    fn index_with(codes: &[&str]) -> HashIndex {
        let mut index = HashIndex::with_capacity(16);
        for (id, c) in codes.iter().enumerate() {
            let record = UrlRecord::new(id as u64, format!("https://example.com/{id}"), code(c));
            index.insert(code(c), record).unwrap();
        }
        index
    }

    #[test]
    fn free_candidate_is_returned_unchanged() {
        let resolver = CollisionResolver::new(10);
        let index = index_with(&["xyz"]);

        let resolution = resolver
            .resolve(&code("abc"), CollisionStrategy::Linear, |c| index.contains(c))
            .unwrap();
        assert_eq!(resolution.code, code("abc"));
        assert_eq!(resolution.attempts, 1);
        assert!(!resolution.collided());
        assert_eq!(resolver.stats().total_collisions, 0);
    }

    #[test]
    fn linear_probing_takes_the_next_code() {
        let resolver = CollisionResolver::new(10);
        let index = index_with(&["abc"]);

        let resolution = resolver
            .resolve(&code("abc"), CollisionStrategy::Linear, |c| index.contains(c))
            .unwrap();
        assert_eq!(resolution.code, code("abd"));
        assert_eq!(resolution.attempts, 2);
        assert_eq!(resolution.strategy, Some(CollisionStrategy::Linear));

        let stats = resolver.stats();
        assert_eq!(stats.total_collisions, 1);
        assert_eq!(stats.linear_resolutions, 1);
        assert_eq!(stats.max_attempts_seen, 2);
    }

    #[test]
    fn linear_probing_skips_taken_codes() {
        let resolver = CollisionResolver::new(10);
        let index = index_with(&["abc", "abd", "abe"]);

        let resolution = resolver
            .resolve(&code("abc"), CollisionStrategy::Linear, |c| index.contains(c))
            .unwrap();
        assert_eq!(resolution.code, code("abf"));
        assert_eq!(resolution.attempts, 4);
    }

    #[test]
    fn increment_carries() {
        assert_eq!(increment("abc"), "abd");
        assert_eq!(increment("ab9"), "aba");
        assert_eq!(increment("abZ"), "ac0");
        assert_eq!(increment("ZZ"), "100");
        assert_eq!(increment("0"), "1");
    }

    #[test]
    fn append_adds_attempt_counter() {
        let resolver = CollisionResolver::new(10);
        let index = index_with(&["abc", "abc1"]);

        let resolution = resolver
            .resolve(&code("abc"), CollisionStrategy::Append, |c| index.contains(c))
            .unwrap();
        assert_eq!(resolution.code, code("abc2"));
        assert_eq!(resolution.attempts, 3);
        assert_eq!(resolver.stats().append_resolutions, 1);
    }

    #[test]
    fn append_beyond_max_length_exhausts() {
        let resolver = CollisionResolver::new(5);
        let index = index_with(&["abcdefghij"]);

        let err = resolver
            .resolve(&code("abcdefghij"), CollisionStrategy::Append, |c| index.contains(c))
            .unwrap_err();
        match err {
            EngineError::CollisionExhausted {
                code,
                strategy,
                attempts,
            } => {
                assert_eq!(code, "abcdefghij");
                assert_eq!(strategy, CollisionStrategy::Append);
                assert_eq!(attempts, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let stats = resolver.stats();
        assert_eq!(stats.exhausted, 1);
        assert_eq!(stats.total_collisions, 0);
        assert_eq!(stats.append_percentage, 0.0);
    }

    #[test]
    fn stats_report_strategy_shares() {
        let resolver = CollisionResolver::new(10);
        let index = index_with(&["abc", "abd", "abe"]);
        for _ in 0..2 {
            resolver
                .resolve(&code("abc"), CollisionStrategy::Linear, |c| index.contains(c))
                .unwrap();
        }
        resolver
            .resolve(&code("abc"), CollisionStrategy::Append, |c| index.contains(c))
            .unwrap();

        let stats = resolver.stats();
        assert_eq!(stats.total_collisions, 3);
        assert_eq!(stats.linear_percentage, 66.67);
        assert_eq!(stats.append_percentage, 33.33);
        assert_eq!(stats.regenerate_percentage, 0.0);
    }

    #[test]
    fn regenerate_yields_a_fresh_valid_code() {
        let resolver = CollisionResolver::new(10);
        let index = index_with(&["abc"]);

        let resolution = resolver
            .resolve(&code("abc"), CollisionStrategy::Regenerate, |c| index.contains(c))
            .unwrap();
        assert_ne!(resolution.code, code("abc"));
        assert!((5..=7).contains(&resolution.code.as_str().len()));
        assert_eq!(resolver.stats().regenerate_resolutions, 1);
    }

    #[test]
    fn single_attempt_budget_fails_on_any_collision() {
        let resolver = CollisionResolver::new(1);
        let index = index_with(&["abc"]);

        let result =
            resolver.resolve(&code("abc"), CollisionStrategy::Linear, |c| index.contains(c));
        assert!(matches!(
            result,
            Err(EngineError::CollisionExhausted { attempts: 1, .. })
        ));
    }

    proptest! {
        #[test]
        fn resolution_is_free_and_bounded(
            taken in proptest::collection::hash_set(0..200_u64, 1..60),
            start in 0..200_u64,
            max_attempts in 1..12_u32,
            strategy in prop_oneof![
                Just(CollisionStrategy::Linear),
                Just(CollisionStrategy::Append),
                Just(CollisionStrategy::Regenerate),
            ],
        ) {
            let mut index = HashIndex::with_capacity(8);
            for id in &taken {
                let c = ShortCode::from_id(*id).unwrap();
                index.insert(c.clone(), UrlRecord::new(*id, format!("https://e.com/{id}"), c)).unwrap();
            }
            let resolver = CollisionResolver::new(max_attempts);
            let candidate = ShortCode::from_id(start).unwrap();

            match resolver.resolve(&candidate, strategy, |c| index.contains(c)) {
                Ok(resolution) => {
                    prop_assert!(!index.contains(resolution.code.as_str()));
                    prop_assert!(resolution.attempts <= max_attempts);
                    if resolution.collided() {
                        prop_assert_ne!(&resolution.code, &candidate);
                    }
                }
                Err(EngineError::CollisionExhausted { attempts, .. }) => {
                    prop_assert_eq!(attempts, max_attempts);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}
