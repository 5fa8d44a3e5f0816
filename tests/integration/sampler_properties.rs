use super::support::rated;
use mldeck::{sample, Candidate, SamplingConstraints};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashMap, HashSet};

fn constraints(limit: usize, min_rating: f64, cap: usize, frac: f64) -> SamplingConstraints {
    SamplingConstraints {
        limit,
        min_rating,
        max_per_observer: cap,
        months: None,
        region: None,
        low_quality_frac: frac,
    }
}

/// Size of the pool left after filters, dedupe and the per-observer cap.
fn capped_pool_size(candidates: &[Candidate], c: &SamplingConstraints) -> usize {
    let mut seen = HashSet::new();
    let mut per_observer: HashMap<&str, usize> = HashMap::new();
    candidates
        .iter()
        .filter(|cand| c.admits(cand))
        .filter(|&cand| seen.insert(cand.ml_id.as_str()))
        .filter(|&cand| {
            let n = per_observer.entry(cand.observer_key()).or_default();
            *n += 1;
            *n <= c.max_per_observer
        })
        .count()
}

/// Random catalog with repeated ids, shared observers and gaps in every optional field.
fn random_catalog(rng: &mut StdRng, size: usize) -> Vec<Candidate> {
    (0..size)
        .map(|_| {
            let id = rng.gen_range(0..size.max(1) * 2 / 3 + 1).to_string();
            let rating = rng.gen_bool(0.8).then(|| rng.gen_range(1..=10) as f64 / 2.0);
            let observer = rng
                .gen_bool(0.7)
                .then(|| format!("obs{}", rng.gen_range(0..6)));
            let month = rng.gen_bool(0.6).then(|| rng.gen_range(1..=12));
            let region = rng.gen_bool(0.5).then(|| {
                if rng.gen_bool(0.5) {
                    "US-NY-061"
                } else {
                    "CA-ON"
                }
            });
            rated(&id, rating, observer.as_deref())
                .with_month(month)
                .with_region(region)
                .with_quality_rank(rng.gen_bool(0.5).then(|| rng.gen_range(0..50)))
        })
        .collect()
}

#[test]
fn invariants_hold_across_random_inputs() {
    let mut gen = StdRng::seed_from_u64(2024);
    for round in 0..300 {
        let size = gen.gen_range(0..60);
        let catalog = random_catalog(&mut gen, size);
        let mut c = constraints(
            gen.gen_range(0..15),
            gen.gen_range(0..=8) as f64 / 2.0,
            gen.gen_range(1..4),
            gen.gen_range(0..10) as f64 / 10.0,
        );
        if gen.gen_bool(0.3) {
            c.months = Some(BTreeSet::from([3, 4, 5, 6]));
        }
        if gen.gen_bool(0.3) {
            c.region = Some("us-ny".into());
        }

        let picks = sample(&catalog, &c, &mut StdRng::seed_from_u64(round));
        let expected = c.limit.min(capped_pool_size(&catalog, &c));
        assert_eq!(picks.len(), expected, "round {round}: wrong pick count");

        let ids: HashSet<&str> = picks.iter().map(|p| p.ml_id.as_str()).collect();
        assert_eq!(ids.len(), picks.len(), "round {round}: duplicate ids");

        let mut per_observer: HashMap<&str, usize> = HashMap::new();
        for pick in &picks {
            assert!(c.admits(pick), "round {round}: pick violates filters");
            if let Some(r) = pick.rating {
                assert!(r >= c.min_rating);
            }
            if let (Some(months), Some(m)) = (&c.months, pick.month) {
                assert!(months.contains(&m));
            }
            *per_observer.entry(pick.observer_key()).or_default() += 1;
        }
        assert!(per_observer.values().all(|n| *n <= c.max_per_observer));
    }
}

#[test]
fn output_size_is_min_of_limit_and_capped_pool() {
    // Ten distinct observers, distinct ids, nothing filtered: the capped pool is all ten.
    let catalog: Vec<Candidate> = (0..10)
        .map(|i| rated(&i.to_string(), Some(4.0), Some(&format!("o{i}"))))
        .collect();
    for limit in [1, 4, 10, 25] {
        let picks = sample(
            &catalog,
            &constraints(limit, 0.0, 1, 0.3),
            &mut StdRng::seed_from_u64(5),
        );
        assert_eq!(picks.len(), limit.min(10));
    }
}

#[test]
fn short_realistic_pool_is_topped_up_from_the_window() {
    let catalog: Vec<Candidate> = (0..10)
        .map(|i| rated(&i.to_string(), Some(4.0), Some(&format!("o{i}"))))
        .collect();
    let c = constraints(10, 0.0, 1, 0.3);
    assert_eq!(c.top_cut(), 7);
    for seed in 0..10 {
        assert_eq!(sample(&catalog, &c, &mut StdRng::seed_from_u64(seed)).len(), 10);
    }
}

#[test]
fn same_seed_same_picks() {
    let mut gen = StdRng::seed_from_u64(11);
    let catalog = random_catalog(&mut gen, 80);
    let c = constraints(12, 2.0, 3, 0.3);
    let first = sample(&catalog, &c, &mut StdRng::seed_from_u64(42));
    let second = sample(&catalog, &c, &mut StdRng::seed_from_u64(42));
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn empty_input_and_zero_limit_give_nothing() {
    let c = constraints(5, 3.5, 2, 0.3);
    assert!(sample(&[], &c, &mut StdRng::seed_from_u64(1)).is_empty());

    let catalog = vec![rated("1", Some(5.0), Some("a")), rated("2", None, None)];
    let zero = constraints(0, 0.0, 5, 0.3);
    assert!(sample(&catalog, &zero, &mut StdRng::seed_from_u64(1)).is_empty());
}

#[test]
fn mixed_ratings_scenario_fills_both_strata() {
    let ratings = [
        Some(5.0),
        Some(5.0),
        Some(5.0),
        Some(4.0),
        Some(4.0),
        Some(3.0),
        Some(3.0),
        Some(2.0),
        Some(2.0),
        None,
    ];
    let catalog: Vec<Candidate> = ratings
        .iter()
        .enumerate()
        .map(|(i, r)| rated(&format!("c{i}"), *r, Some(&format!("o{i}"))))
        .collect();
    let c = constraints(4, 3.5, 2, 0.3);
    assert_eq!(c.top_cut(), 3);

    for seed in 0..20 {
        let picks = sample(&catalog, &c, &mut StdRng::seed_from_u64(seed));
        assert_eq!(picks.len(), 4);
        let ids: HashSet<&str> = picks.iter().map(|p| p.ml_id.as_str()).collect();
        assert_eq!(ids.len(), 4);
        // Three come from the rated window; the fourth is a window leftover or the
        // unrated candidate.
        let rated_picks = picks.iter().filter(|p| p.rating.is_some()).count();
        assert!((3..=4).contains(&rated_picks));
        assert!(ids.iter().all(|id| ["c0", "c1", "c2", "c3", "c4", "c9"].contains(id)));
        assert!(picks
            .iter()
            .filter_map(|p| p.rating)
            .all(|r| r >= 3.5));
    }
}

#[test]
fn single_contributor_capped_at_one() {
    let catalog: Vec<Candidate> = (0..20)
        .map(|i| rated(&i.to_string(), Some(4.5), Some("same person")))
        .collect();
    let picks = sample(
        &catalog,
        &constraints(10, 3.5, 1, 0.3),
        &mut StdRng::seed_from_u64(3),
    );
    assert_eq!(picks.len(), 1);
}

#[test]
fn unknown_month_and_region_pass_their_filters() {
    let catalog = vec![
        rated("jan", Some(4.0), Some("a")).with_month(Some(1)),
        rated("may", Some(4.0), Some("b")).with_month(Some(5)),
        rated("undated", Some(4.0), Some("c")),
        rated("mx", Some(4.0), Some("d")).with_region(Some("MX-ROO")),
        rated("ny", Some(4.0), Some("e")).with_region(Some("US-NY")),
    ];
    let mut c = constraints(10, 0.0, 5, 0.3);
    c.months = Some(BTreeSet::from([4, 5, 6]));
    c.region = Some("us".into());
    let picks = sample(&catalog, &c, &mut StdRng::seed_from_u64(8));
    let ids: BTreeSet<&str> = picks.iter().map(|p| p.ml_id.as_str()).collect();
    assert_eq!(ids, BTreeSet::from(["may", "ny", "undated"]));
}

#[test]
fn duplicates_keep_first_occurrence() {
    let catalog = vec![
        rated("1", Some(5.0), Some("first")),
        rated("1", Some(1.0), Some("second")),
    ];
    let picks = sample(
        &catalog,
        &constraints(3, 0.0, 2, 0.0),
        &mut StdRng::seed_from_u64(0),
    );
    assert_eq!(picks.len(), 1);
    assert_eq!(picks[0].observer.as_deref(), Some("first"));
}
