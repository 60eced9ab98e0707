use chrono::{Duration, TimeZone, Utc};
use coaster_duel::rating::BASE_RATING;
use coaster_duel::{
    pair_key, EngineConfig, Item, PairPick, PairingStrategy, RankingSession, Side, StreakTracker,
};
use std::collections::HashSet;

fn park_collection() -> Vec<Item> {
    vec![
        Item::new("Baron 1898", "Efteling", "B&M"),
        Item::new("Python", "Efteling", "Vekoma"),
        Item::new("Joris en de Draak - Water", "Efteling", "GCI"),
        Item::new("Joris en de Draak - Vuur", "Efteling", "GCI"),
        Item::new("Taron", "Phantasialand", "Intamin"),
        Item::new("Raik", "Phantasialand", "Vekoma"),
        Item::new("Black Mamba", "Phantasialand", "B&M"),
        Item::new("Goliath", "Walibi Holland", "Intamin"),
    ]
}

fn numbered(n: usize) -> Vec<Item> {
    (0..n).map(|i| Item::named(format!("item_{}", i))).collect()
}

#[test]
fn test_invariants_hold_through_a_long_session() {
    let mut session = RankingSession::with_seed(numbered(12), EngineConfig::default(), 42).unwrap();
    let total = session.total_pairs();

    for _ in 0..40 {
        session.simulate_battles(1);
        for record in session.ratings().records() {
            assert_eq!(record.wins + record.losses, record.battles);
            let displayed = record.displayed_rating();
            assert!((displayed - BASE_RATING).abs() <= (record.rating - BASE_RATING).abs() + 1e-9);
        }
        assert!(session.completed_pairs().len() <= total);
    }
    assert_eq!(session.total_battles(), 40);
}

#[test]
fn test_hybrid_never_resamples_a_completed_pair() {
    let config = EngineConfig {
        pairing_strategy: PairingStrategy::Hybrid,
        elo_proximity_power: 3.0,
        ..EngineConfig::default()
    };
    let mut session = RankingSession::with_seed(numbered(15), config, 9).unwrap();
    let mut seen = HashSet::new();

    loop {
        match session.next_pair() {
            PairPick::Pair(duel) => {
                assert!(seen.insert(duel.key()), "{} sampled twice", duel.key());
                session.record_outcome(&duel, Side::Right).unwrap();
            }
            PairPick::Exhausted => break,
            PairPick::PoolTooSmall => panic!("pool has 15 items"),
        }
    }
    assert_eq!(seen.len(), 105);
    assert!(session.is_complete());
}

#[test]
fn test_single_item_pool() {
    let mut session = RankingSession::with_seed(numbered(1), EngineConfig::default(), 1).unwrap();
    assert_eq!(session.next_pair(), PairPick::PoolTooSmall);
    assert_eq!(session.simulate_battles(5), 0);
    assert!(!session.is_complete());
}

#[test]
fn test_deletes_undo_in_reverse_order() {
    let mut session = RankingSession::with_seed(numbered(6), EngineConfig::default(), 5).unwrap();
    session.simulate_battles(8);
    let before = session.state();

    let first = session.delete_history_entry(7).unwrap();
    let second = session.delete_history_entry(0).unwrap();
    assert_eq!(session.history().len(), 6);
    assert!(!session.completed_pairs().contains_key(&first.pair_key));
    assert!(!session.completed_pairs().contains_key(&second.pair_key));

    assert_eq!(session.undo_last_delete(), Some(0));
    assert_eq!(session.undo_last_delete(), Some(7));
    assert_eq!(session.state(), before);
}

#[test]
fn test_deleted_pair_can_be_sampled_again() {
    let mut session = RankingSession::with_seed(numbered(3), EngineConfig::default(), 8).unwrap();
    assert_eq!(session.simulate_battles(10), 3);
    assert!(session.is_complete());

    let removed = session.delete_history_entry(1).unwrap();
    assert_eq!(session.remaining_pairs(), 1);
    let duel = session.next_pair().into_duel().unwrap();
    assert_eq!(duel.key(), removed.pair_key);
}

#[test]
fn test_repeated_pair_stays_completed_until_its_last_entry_is_deleted() {
    let mut session = RankingSession::with_seed(numbered(8), EngineConfig::default(), 13).unwrap();
    let first = session.pool().get(0).unwrap().clone();
    let second = session.pool().get(1).unwrap().clone();
    let repeated = coaster_duel::Duel::new(first, second);
    for side in [Side::Left, Side::Right, Side::Left] {
        session.record_outcome(&repeated, side).unwrap();
    }
    assert_eq!(session.completed_pairs().len(), 1);
    assert_eq!(session.total_battles(), 3);

    let mut sampled = 0;
    while let Some(duel) = session.next_pair().into_duel() {
        assert_ne!(duel.key(), repeated.key());
        session.record_outcome(&duel, Side::Left).unwrap();
        sampled += 1;
    }
    assert_eq!(sampled, 27);
    assert!(session.is_complete());

    session.delete_history_entry(2).unwrap();
    session.delete_history_entry(1).unwrap();
    assert!(session.completed_pairs().contains_key(&repeated.key()));
    assert!(session.is_complete());

    session.delete_history_entry(0).unwrap();
    assert!(!session.completed_pairs().contains_key(&repeated.key()));
    assert_eq!(session.remaining_pairs(), 1);
    assert_eq!(session.next_pair().into_duel().unwrap().key(), repeated.key());
}

#[test]
fn test_forced_close_matchup_repeats_a_completed_pair() {
    let mut session = RankingSession::with_seed(numbered(6), EngineConfig::default(), 31).unwrap();
    assert!(session.force_close_matchup().is_none());
    assert_eq!(session.simulate_battles(15), 15);

    let duel = session.force_close_matchup().unwrap();
    assert!(session.completed_pairs().contains_key(&duel.key()));
    let left_rank = session.rank_of(&duel.left.name).unwrap();
    let right_rank = session.rank_of(&duel.right.name).unwrap();
    assert!(left_rank.abs_diff(right_rank) < 3);

    let outcome = session.record_outcome(&duel, Side::Right).unwrap();
    assert!(outcome.entry.close_fight);
    assert!(outcome.event.is_close_fight);
    assert_eq!(session.completed_pairs().len(), 15);
    assert_eq!(session.history().len(), 16);
    assert_eq!(session.next_pair(), PairPick::Exhausted);

    let last = session.history().len() - 1;
    session.delete_history_entry(last).unwrap();
    assert!(session.completed_pairs().contains_key(&duel.key()));
    assert!(session.is_complete());
}

#[test]
fn test_switch_is_refused_when_counters_would_underflow() {
    let mut session = RankingSession::with_seed(numbered(3), EngineConfig::default(), 2).unwrap();
    let duel = session.next_pair().into_duel().unwrap();
    session.record_outcome(&duel, Side::Left).unwrap();

    let mut state = session.state();
    for record in &mut state.ratings {
        record.wins = 0;
        record.losses = 0;
        record.battles = 0;
    }
    let mut restored = RankingSession::from_state(numbered(3), EngineConfig::default(), state).unwrap();
    let before = restored.state();
    assert!(restored.switch_history_winner(0).is_none());
    assert_eq!(restored.state(), before);
}

#[test]
fn test_switch_twice_restores_counters() {
    let mut session = RankingSession::with_seed(numbered(4), EngineConfig::default(), 3).unwrap();
    session.simulate_battles(4);
    let counters = |s: &RankingSession| -> Vec<(String, u32, u32)> {
        s.state().ratings.into_iter().map(|r| (r.name, r.wins, r.losses)).collect()
    };
    let before = counters(&session);
    let winner = session.history().get(2).unwrap().winner.clone();

    session.switch_history_winner(2).unwrap();
    assert_ne!(session.history().get(2).unwrap().winner, winner);
    session.switch_history_winner(2).unwrap();
    assert_eq!(session.history().get(2).unwrap().winner, winner);
    assert_eq!(counters(&session), before);
}

#[test]
fn test_history_cap_evicts_oldest() {
    let config = EngineConfig {
        history_cap: 5,
        ..EngineConfig::default()
    };
    let mut session = RankingSession::with_seed(numbered(8), config, 4).unwrap();
    session.simulate_battles(9);

    assert_eq!(session.history().len(), 5);
    assert_eq!(session.total_battles(), 9);
    assert_eq!(session.completed_pairs().len(), 9);
}

#[test]
fn test_streaks_follow_session_outcomes() {
    let mut session = RankingSession::with_seed(park_collection(), EngineConfig::default(), 21).unwrap();
    let mut streaks = StreakTracker::new();
    let start = Utc.with_ymd_and_hms(2026, 6, 1, 20, 0, 0).unwrap();

    for (day, index) in [0, 1, 0, 1, 0].into_iter().enumerate() {
        let duel = session.next_pair().into_duel().unwrap();
        let side = Side::from_index(index).unwrap();
        let outcome = session
            .record_outcome_at(&duel, side, start + Duration::days(day as i64))
            .unwrap();
        streaks.record(&outcome.event);
    }

    let state = streaks.state();
    assert_eq!(state.alternating_streak, 4);
    assert_eq!(state.left_streak, 1);
    assert_eq!(state.right_streak, 0);
    assert_eq!(state.consecutive_days, 5);

    let stats = session.game_stats(state);
    let unlocked: Vec<_> = streaks
        .check_achievements(&stats, start + Duration::days(5))
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert!(unlocked.contains(&"firstBlood"));
    assert!(unlocked.contains(&"consistentVoter"));
    assert!(!unlocked.contains(&"weekStreak"));
}

#[test]
fn test_sibling_rivalry_and_perfect_match() {
    let mut session = RankingSession::with_seed(park_collection(), EngineConfig::default(), 1).unwrap();
    let mut streaks = StreakTracker::new();
    let water = session.pool().by_name("Joris en de Draak - Water").unwrap().clone();
    let fire = session.pool().by_name("Joris en de Draak - Vuur").unwrap().clone();

    let outcome = session
        .record_outcome(&coaster_duel::Duel::new(fire, water), Side::Left)
        .unwrap();
    assert!(outcome.event.is_perfect_match);
    streaks.record(&outcome.event);

    let stats = session.game_stats(streaks.state());
    let unlocked: Vec<_> = streaks
        .check_achievements(&stats, Utc::now())
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert!(unlocked.contains(&"jorisShowdown"));
    assert!(unlocked.contains(&"perfectMatch"));
}

#[test]
fn test_restored_session_continues_without_repeats() {
    let mut session = RankingSession::with_seed(numbered(6), EngineConfig::default(), 17).unwrap();
    session.simulate_battles(10);
    let state = session.state();

    let mut restored = RankingSession::from_state(numbered(6), EngineConfig::default(), state.clone()).unwrap();
    restored.reseed(99);
    assert_eq!(restored.remaining_pairs(), 5);
    while let Some(duel) = restored.next_pair().into_duel() {
        assert!(!state.completed_pairs.contains(&pair_key(&duel.left.name, &duel.right.name)));
        restored.record_outcome(&duel, Side::Left).unwrap();
    }
    assert_eq!(restored.total_battles(), 15);
}

#[test]
#[cfg(feature = "serde")]
fn test_session_and_streaks_persist_to_disk() {
    use coaster_duel::{SessionState, StreakSnapshot};

    let dir = std::env::temp_dir();
    let session_path = dir.join(format!("coaster-duel-session-{}.json", std::process::id()));
    let streak_path = dir.join(format!("coaster-duel-streaks-{}.json", std::process::id()));

    let mut session = RankingSession::with_seed(park_collection(), EngineConfig::default(), 6).unwrap();
    let mut streaks = StreakTracker::new();
    for _ in 0..6 {
        let duel = session.next_pair().into_duel().unwrap();
        let outcome = session.record_outcome(&duel, Side::Right).unwrap();
        streaks.record(&outcome.event);
    }
    streaks.check_achievements(&session.game_stats(streaks.state()), Utc::now());

    session.state().save_to_file(session_path.to_str().unwrap()).unwrap();
    streaks.snapshot().save_to_file(streak_path.to_str().unwrap()).unwrap();

    let state = SessionState::load_from_file(session_path.to_str().unwrap()).unwrap();
    let snapshot = StreakSnapshot::load_from_file(streak_path.to_str().unwrap()).unwrap();
    std::fs::remove_file(&session_path).ok();
    std::fs::remove_file(&streak_path).ok();

    let restored = RankingSession::from_state(park_collection(), EngineConfig::default(), state).unwrap();
    assert_eq!(restored.state(), session.state());
    let ranking: Vec<_> = restored.ranking().into_iter().map(|r| r.item.name).collect();
    let original: Vec<_> = session.ranking().into_iter().map(|r| r.item.name).collect();
    assert_eq!(ranking, original);

    let restored_streaks = StreakTracker::from_snapshot(snapshot, coaster_duel::achievements::default_rivalries());
    assert_eq!(restored_streaks.state().right_streak, 6);
    assert_eq!(restored_streaks.state().session_battles, 0);
    assert!(restored_streaks.is_unlocked("firstBlood"));
    assert!(restored_streaks.is_unlocked("rightHanded"));
}

#[test]
#[cfg(feature = "serde")]
fn test_config_from_toml_drives_sampling() {
    let config = EngineConfig::from_toml_str(
        r#"
        pairing_strategy = "uniform"
        max_attempts = 1
        exploration_power = -3.0
        "#,
    )
    .unwrap();
    assert_eq!(config.pairing_strategy, PairingStrategy::Uniform);
    assert_eq!(config.exploration_power, EngineConfig::default().exploration_power);

    let mut session = RankingSession::with_seed(numbered(5), config, 12).unwrap();
    assert_eq!(session.simulate_battles(20), 10);
}
