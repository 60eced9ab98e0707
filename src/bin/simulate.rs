use coaster_duel::{EngineConfig, Item, RankingError, RankingSession, Side, StreakTracker};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), RankingError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&PathBuf::from(path))?,
        None => EngineConfig::default(),
    };

    println!("Coaster Duel: pairwise ranking");
    println!("==============================\n");

    guided_session(config.clone())?;

    recovery_experiment(config)?;
    Ok(())
}

fn collection() -> Vec<Item> {
    vec![
        Item::new("Baron 1898", "Efteling", "B&M"),
        Item::new("Python", "Efteling", "Vekoma"),
        Item::new("Joris en de Draak - Water", "Efteling", "GCI"),
        Item::new("Joris en de Draak - Vuur", "Efteling", "GCI"),
        Item::new("Taron", "Phantasialand", "Intamin"),
        Item::new("Raik", "Phantasialand", "Vekoma"),
        Item::new("Black Mamba", "Phantasialand", "B&M"),
        Item::new("Lost Gravity", "Walibi Holland", "Mack Rides"),
        Item::new("Goliath", "Walibi Holland", "Intamin"),
        Item::new("Untamed", "Walibi Holland", "RMC"),
    ]
}

fn guided_session(config: EngineConfig) -> Result<(), RankingError> {
    println!("Guided session:");
    println!("--------------");

    let mut session = RankingSession::with_seed(collection(), config, 42)?;
    let mut streaks = StreakTracker::new();
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    for round in 0..20 {
        let Some(duel) = session.next_pair().into_duel() else {
            break;
        };
        let side = if rng.gen_bool(0.5) { Side::Left } else { Side::Right };
        if round % 4 == 0 {
            streaks.note_keyboard_vote();
        }

        let outcome = session.record_outcome(&duel, side)?;
        streaks.record(&outcome.event);
        println!(
            "  {} beats {} ({:.1} -> {:.1}, K={:.1}){}",
            outcome.winner.name,
            outcome.loser.name,
            outcome.entry.snapshot_of(&outcome.winner.name).map_or(0.0, |s| s.rating_before),
            outcome.winner.rating,
            outcome.k,
            if outcome.event.is_close_fight { " close fight!" } else { "" }
        );

        let stats = session.game_stats(streaks.state());
        for achievement in streaks.check_achievements(&stats, outcome.entry.timestamp) {
            println!("    unlocked: {} ({})", achievement.name, achievement.description);
        }
    }

    if let Some(removed) = session.delete_history_entry(0) {
        println!("\n  deleted {} vs {}", removed.left, removed.right);
    }
    if let Some(index) = session.undo_last_delete() {
        println!("  restored at position {}", index);
    }
    if let Some(switch) = session.switch_history_winner(1) {
        println!("  switched: {} now beats {}", switch.new_winner.name, switch.new_loser.name);
    }

    let report = session.recalculate_from_history();
    println!(
        "\n  recalculated in {} passes ({} rank changes, converged: {})",
        report.passes, report.rank_changes, report.converged
    );

    println!("\nRanking:");
    for entry in session.ranking() {
        println!(
            "  {:>2}. {:<28} {:>7.1} ({}-{})",
            entry.rank, entry.item.name, entry.displayed_rating, entry.record.wins, entry.record.losses
        );
    }
    println!(
        "\n{} of {} pairs left, {}/{} achievements\n",
        session.remaining_pairs(),
        session.total_pairs(),
        streaks.unlocked_count(),
        streaks.total_count()
    );
    Ok(())
}

fn recovery_experiment(config: EngineConfig) -> Result<(), RankingError> {
    println!("Strength Recovery Experiment:");
    println!("----------------------------");

    let n_items = 30;
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let items: Vec<Item> = (0..n_items).map(|i| Item::named(format!("coaster_{}", i))).collect();

    let spread = Normal::new(1500.0, 250.0).map_err(|e| RankingError::ConfigError(e.to_string()))?;
    let mut true_strength = HashMap::new();
    for item in &items {
        true_strength.insert(item.name.clone(), spread.sample(&mut rng));
    }

    let mut session = RankingSession::with_seed(items, config, 42)?;
    let mut played = 0;
    while let Some(duel) = session.next_pair().into_duel() {
        let p_left = coaster_duel::expected_score(true_strength[&duel.left.name], true_strength[&duel.right.name]);
        let side = if rng.gen::<f64>() < p_left { Side::Left } else { Side::Right };
        session.record_outcome(&duel, side)?;
        played += 1;
    }

    let mut truth: Vec<_> = true_strength.iter().collect();
    truth.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));

    println!("Battles played: {}", played);
    println!("True top 5 vs inferred top 5:");
    let inferred = session.ranking();
    for i in 0..5 {
        println!("  {}. {:<12} {:<12}", i + 1, truth[i].0, inferred[i].item.name);
    }
    Ok(())
}
