//! Weak-First Session Selection
//!
//! Builds a practice session from a weighted pool:
//! - Pool sorted by weight (descending, stable) -> top N is the weak set
//! - The first `mandatory` weak items always get a slot
//! - Remaining slots: weighted sampling with replacement from the rest of the pool
//!   (uniform over the weak set when nothing else exists)
//! - The final order is shuffled
//!
//! Weighting is probabilistic outside the mandatory slots, so sessions stay varied
//! while the numerically weakest items are seen at least once.

use std::cmp::Reverse;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::types::{SelectorOptions, Selection};

/// Anything carrying a positive sampling weight
pub trait Weighted {
    fn weight(&self) -> u32;
}

impl Weighted for u32 {
    fn weight(&self) -> u32 {
        *self
    }
}

/// Session RNG; a fixed seed makes selection reproducible
pub fn session_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Pool indices ordered by weight, heaviest first; ties keep pool order
pub fn weight_order<T: Weighted>(pool: &[T]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..pool.len()).collect();
    order.sort_by_key(|&i| Reverse(pool[i].weight()));
    order
}

/// Weak-first selection of `count` items
pub fn select_session<T, R>(
    pool: &[T],
    count: usize,
    options: &SelectorOptions,
    rng: &mut R,
) -> Selection
where
    T: Weighted,
    R: Rng + ?Sized,
{
    if pool.is_empty() || count == 0 {
        return Selection::default();
    }

    let order = weight_order(pool);
    let weak_len = options.weak_set_size.min(order.len());
    let (weak, rest) = order.split_at(weak_len);

    let mandatory_len = options.mandatory.min(weak.len()).min(count);
    let mandatory: Vec<usize> = weak[..mandatory_len].to_vec();
    let needed = count - mandatory_len;

    let mut picks = mandatory.clone();
    if needed > 0 {
        if rest.is_empty() {
            picks.extend(sample_uniform(weak, needed, rng));
        } else {
            let weights: Vec<u64> = rest.iter().map(|&i| u64::from(pool[i].weight().max(1))).collect();
            picks.extend(sample_weighted(rest, &weights, needed, rng));
        }
    }

    picks.shuffle(rng);
    Selection { picks, mandatory }
}

/// Flat variant: `min(count, |pool|)` draws weighted by `weight * flat_multiplier`
pub fn select_flat<T, R>(
    pool: &[T],
    count: usize,
    options: &SelectorOptions,
    rng: &mut R,
) -> Selection
where
    T: Weighted,
    R: Rng + ?Sized,
{
    if pool.is_empty() || count == 0 {
        return Selection::default();
    }

    let indices: Vec<usize> = (0..pool.len()).collect();
    let multiplier = u64::from(options.flat_multiplier.max(1));
    let weights: Vec<u64> = pool
        .iter()
        .map(|item| u64::from(item.weight().max(1)) * multiplier)
        .collect();
    let picks = sample_weighted(&indices, &weights, count.min(pool.len()), rng);

    Selection {
        picks,
        mandatory: Vec::new(),
    }
}

fn sample_weighted<R: Rng + ?Sized>(
    candidates: &[usize],
    weights: &[u64],
    k: usize,
    rng: &mut R,
) -> Vec<usize> {
    match WeightedIndex::new(weights) {
        Ok(dist) => (0..k).map(|_| candidates[dist.sample(rng)]).collect(),
        // every weight is clamped to >= 1, so this only guards an empty slice
        Err(_) => sample_uniform(candidates, k, rng),
    }
}

fn sample_uniform<R: Rng + ?Sized>(candidates: &[usize], k: usize, rng: &mut R) -> Vec<usize> {
    (0..k)
        .filter_map(|_| candidates.choose(rng).copied())
        .collect()
}
