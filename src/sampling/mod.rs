//! Quality-stratified candidate sampling.
//!
//! A species selection mixes two strata: a handful of well-rated assets drawn at random
//! from a window somewhat wider than the number wanted, and a remainder drawn from the
//! window's leftovers, everything below it and the unrated assets. Filtering,
//! deduplication and the per-observer cap happen before either stratum is formed.

pub mod months;

pub use months::{month_from_date, parse_months_field};

use crate::models::candidate::{Candidate, SamplingConstraints};
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// The top window spans at least `top_cut * TOP_POOL_FACTOR` rated candidates...
pub const TOP_POOL_FACTOR: usize = 3;
/// ...and at least `top_cut + TOP_POOL_MARGIN`.
pub const TOP_POOL_MARGIN: usize = 5;

/// Picks up to `constraints.limit` candidates. Every shuffle draws from `rng`, so equal
/// input, equal constraints and an equally seeded `rng` give equal output.
pub fn sample<R: Rng + ?Sized>(
    candidates: &[Candidate],
    constraints: &SamplingConstraints,
    rng: &mut R,
) -> Vec<Candidate> {
    if constraints.limit == 0 {
        return Vec::new();
    }
    let capped = cap_per_observer(
        dedupe(candidates.iter().filter(|c| constraints.admits(c))),
        constraints.max_per_observer,
    );
    if capped.is_empty() {
        return Vec::new();
    }

    let (mut with_rating, no_rating): (Vec<&Candidate>, Vec<&Candidate>) =
        capped.into_iter().partition(|c| c.rating.is_some());
    with_rating.sort_by(|a, b| by_rating_then_rank(a, b));

    let top_cut = constraints.top_cut();
    let window = top_cut
        .saturating_mul(TOP_POOL_FACTOR)
        .max(top_cut.saturating_add(TOP_POOL_MARGIN))
        .min(with_rating.len());
    let below_window = with_rating.split_off(window);
    let mut top_pool = with_rating;

    top_pool.shuffle(rng);
    // Window entries not drawn join the realistic stratum.
    let mut realistic_pool = top_pool.split_off(top_cut.min(top_pool.len()));
    realistic_pool.extend(below_window);
    realistic_pool.extend(no_rating);
    realistic_pool.shuffle(rng);
    realistic_pool.truncate(constraints.limit.saturating_sub(top_pool.len()));

    let mut picks: Vec<&Candidate> = top_pool;
    picks.extend(realistic_pool);
    picks.shuffle(rng);
    picks.truncate(constraints.limit);
    picks.into_iter().cloned().collect()
}

fn dedupe<'a>(candidates: impl Iterator<Item = &'a Candidate>) -> Vec<&'a Candidate> {
    let mut seen = HashSet::new();
    candidates
        .filter(|&c| seen.insert(c.ml_id.as_str()))
        .collect()
}

fn cap_per_observer(candidates: Vec<&Candidate>, cap: usize) -> Vec<&Candidate> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    candidates
        .into_iter()
        .filter(|&c| {
            let count = counts.entry(c.observer_key()).or_insert(0);
            if *count < cap {
                *count += 1;
                true
            } else {
                false
            }
        })
        .collect()
}

/// Higher rating first; equal ratings by ascending rank, unranked last.
fn by_rating_then_rank(a: &Candidate, b: &Candidate) -> Ordering {
    let ra = a.rating.unwrap_or(f64::NEG_INFINITY);
    let rb = b.rating.unwrap_or(f64::NEG_INFINITY);
    rb.total_cmp(&ra).then_with(|| {
        let ka = a.quality_rank.unwrap_or(i64::MAX);
        let kb = b.quality_rank.unwrap_or(i64::MAX);
        ka.cmp(&kb)
    })
}
