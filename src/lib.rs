//! Pairwise ranking of a personal coaster collection.
//!
//! A [`RankingSession`] picks the next two items to compare, folds each
//! judgment into an adaptive Elo rating and keeps a bounded, correctable battle
//! history. A [`StreakTracker`] watches the same outcomes for behavioral
//! streaks and unlocks achievements.
//!
//! ```
//! use coaster_duel::{EngineConfig, Item, RankingSession, Side, StreakTracker};
//!
//! let items = vec![
//!     Item::new("Baron 1898", "Efteling", "B&M"),
//!     Item::new("Taron", "Phantasialand", "Intamin"),
//!     Item::new("Python", "Efteling", "Vekoma"),
//! ];
//! let mut session = RankingSession::with_seed(items, EngineConfig::default(), 7).unwrap();
//! let mut streaks = StreakTracker::new();
//!
//! let duel = session.next_pair().into_duel().unwrap();
//! let outcome = session.record_outcome(&duel, Side::Left).unwrap();
//! streaks.record(&outcome.event);
//!
//! let stats = session.game_stats(streaks.state());
//! let unlocked = streaks.check_achievements(&stats, outcome.entry.timestamp);
//! assert_eq!(unlocked[0].id, "firstBlood");
//! assert_eq!(session.remaining_pairs(), 2);
//! ```

pub mod achievements;
pub mod config;
pub mod error;
pub mod history;
pub mod pool;
pub mod rating;
pub mod sampler;
pub mod session;
pub mod streak;

pub use achievements::{Achievement, Category, Condition, GameStats, Rarity, SiblingRivalry, ACHIEVEMENTS};
pub use config::EngineConfig;
pub use error::RankingError;
pub use history::{BattleSnapshot, HistoryEntry};
pub use pool::{pair_key, CompletedPairs, Item, ItemPool};
pub use rating::{adaptive_k, apply_outcome, displayed_rating, expected_score, EloUpdate, RatingRecord, RatingStore};
pub use sampler::{select_pair, Duel, PairPick, PairingStrategy, SamplerParams, Side};
pub use session::{
    OutcomeResult, RankChange, RankedItem, RankingSession, RecalculationReport, SessionState, SwitchOutcome,
};
pub use streak::{AchievementStatus, OutcomeEvent, StreakSnapshot, StreakState, StreakTracker};
