use coaster_duel::{expected_score, EngineConfig, Item, PairingStrategy, RankingSession, Side};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;
use std::time::Instant;

fn latent_strengths(n_items: usize, seed: u64) -> (Vec<Item>, HashMap<String, f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let items: Vec<Item> = (0..n_items).map(|i| Item::named(format!("coaster_{}", i))).collect();

    let spread = Normal::new(1500.0, 300.0).unwrap();
    let mut strengths = HashMap::new();
    for item in &items {
        strengths.insert(item.name.clone(), spread.sample(&mut rng));
    }
    (items, strengths)
}

fn kendall_tau(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());

    let n = a.len();
    if n <= 1 {
        return 1.0;
    }

    let mut concordant = 0;
    let mut discordant = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            let (Some(a_order), Some(b_order)) = (a[i].partial_cmp(&a[j]), b[i].partial_cmp(&b[j])) else {
                continue;
            };
            if a_order == b_order {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }
    }

    let total_pairs = concordant + discordant;
    if total_pairs == 0 {
        return 0.0;
    }
    (concordant as f64 - discordant as f64) / (total_pairs as f64)
}

/// Plays `budget` battles judged by a noisy oracle over the latent strengths
/// and returns Kendall's tau between truth and displayed ratings.
fn run_experiment(n_items: usize, budget: usize, strategy: PairingStrategy, seed: u64) -> (usize, f64) {
    let (items, strengths) = latent_strengths(n_items, seed);
    let config = EngineConfig {
        pairing_strategy: strategy,
        ..EngineConfig::default()
    };
    let mut session = RankingSession::with_seed(items.clone(), config, seed).unwrap();
    let mut judge = ChaCha8Rng::seed_from_u64(seed + 1);

    let mut played = 0;
    while played < budget {
        let Some(duel) = session.next_pair().into_duel() else {
            break;
        };
        let p_left = expected_score(strengths[&duel.left.name], strengths[&duel.right.name]);
        let side = if judge.gen::<f64>() < p_left { Side::Left } else { Side::Right };
        session.record_outcome(&duel, side).unwrap();
        played += 1;
    }

    let truth: Vec<f64> = items.iter().map(|item| strengths[&item.name]).collect();
    let inferred: Vec<f64> = items
        .iter()
        .map(|item| session.ratings().displayed(&item.name))
        .collect();
    (played, kendall_tau(&truth, &inferred))
}

#[test]
fn test_full_round_robin_recovers_order() {
    for n_items in [10, 30] {
        let start = Instant::now();
        let (played, tau) = run_experiment(n_items, usize::MAX, PairingStrategy::Hybrid, 42);
        println!(
            "{:3} items | {:5} battles | tau {:.4} | {:.3}s",
            n_items,
            played,
            tau,
            start.elapsed().as_secs_f64()
        );

        assert_eq!(played, n_items * (n_items - 1) / 2);
        assert!(tau > 0.4, "Kendall's tau for {} items should be > 0.4, got {}", n_items, tau);
    }
}

#[test]
fn test_partial_budget_per_strategy() {
    let n_items = 40;
    println!("Strategy    | Kendall's Tau");
    println!("---------------------------");
    for strategy in [PairingStrategy::Uniform, PairingStrategy::Exploration, PairingStrategy::Hybrid] {
        let (played, tau) = run_experiment(n_items, n_items * 6, strategy, 7);
        println!("{:11?} | {:12.4}", strategy, tau);

        assert_eq!(played, n_items * 6);
        assert!(tau > 0.3, "{:?} should be > 0.3 after {} battles, got {}", strategy, played, tau);
    }
}

#[test]
fn test_recalculation_does_not_degrade_order() {
    let (items, strengths) = latent_strengths(20, 11);
    let mut session = RankingSession::with_seed(items.clone(), EngineConfig::default(), 11).unwrap();
    let mut judge = ChaCha8Rng::seed_from_u64(12);

    while let Some(duel) = session.next_pair().into_duel() {
        let p_left = expected_score(strengths[&duel.left.name], strengths[&duel.right.name]);
        let side = if judge.gen::<f64>() < p_left { Side::Left } else { Side::Right };
        session.record_outcome(&duel, side).unwrap();
    }

    let truth: Vec<f64> = items.iter().map(|item| strengths[&item.name]).collect();
    let displayed = |s: &RankingSession| -> Vec<f64> {
        items.iter().map(|item| s.ratings().displayed(&item.name)).collect()
    };
    let tau_before = kendall_tau(&truth, &displayed(&session));

    let report = session.recalculate_from_history();
    let tau_after = kendall_tau(&truth, &displayed(&session));
    println!("tau {:.4} -> {:.4} in {} passes", tau_before, tau_after, report.passes);

    assert_eq!(report.replayed, 190);
    assert!(tau_after > 0.3, "tau after recalculation was {}", tau_after);
}
