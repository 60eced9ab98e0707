//! Streak counters and achievement unlocks.
//!
//! The tracker only observes outcomes; corrections to the battle history
//! (delete, undo, winner switch) never roll its counters back.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};

use crate::achievements::{default_rivalries, Achievement, GameStats, SiblingRivalry, ACHIEVEMENTS};
use crate::sampler::Side;

/// What the tracker learns from one judged duel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutcomeEvent {
    pub card_position: Side,
    pub is_perfect_match: bool,
    pub is_close_fight: bool,
    pub is_underdog_win: bool,
    /// Left and right names in presentation order.
    pub names: (String, String),
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StreakState {
    /// Not persisted; every load starts a new session.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub session_battles: u32,
    pub left_streak: u32,
    pub right_streak: u32,
    pub alternating_streak: u32,
    pub last_card_position: Option<Side>,
    pub close_fights: u32,
    pub underdog_wins: u32,
    pub underdog_win_streak: u32,
    pub perfect_matches: u32,
    pub last_battle_date: Option<NaiveDate>,
    pub consecutive_days: u32,
    pub daily_battle_dates: BTreeSet<NaiveDate>,
    pub sibling_battles: BTreeMap<String, u32>,
    pub used_keyboard: u32,
    pub used_number_keys: u32,
}

impl StreakState {
    /// Copies the streak counters into `stats`, leaving the session-derived
    /// fields alone.
    pub fn fill_stats(&self, stats: &mut GameStats) {
        stats.session_battles = self.session_battles;
        stats.close_fights = self.close_fights;
        stats.underdog_wins = self.underdog_wins;
        stats.left_streak = self.left_streak;
        stats.right_streak = self.right_streak;
        stats.alternating_streak = self.alternating_streak;
        stats.perfect_matches = self.perfect_matches;
        stats.consecutive_days = self.consecutive_days;
        stats.sibling_battles = self.sibling_battles.clone();
        stats.used_keyboard = self.used_keyboard;
        stats.used_number_keys = self.used_number_keys;
    }
}

/// Persisted form of a tracker: counters plus unlock times.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StreakSnapshot {
    pub state: StreakState,
    pub unlocked: BTreeMap<String, DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AchievementStatus {
    pub achievement: &'static Achievement,
    pub unlocked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct StreakTracker {
    state: StreakState,
    unlocked: BTreeMap<String, DateTime<Utc>>,
    rivalries: Vec<SiblingRivalry>,
}

impl Default for StreakTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StreakTracker {
    pub fn new() -> Self {
        Self::with_rivalries(default_rivalries())
    }

    pub fn with_rivalries(rivalries: Vec<SiblingRivalry>) -> Self {
        StreakTracker {
            state: StreakState::default(),
            unlocked: BTreeMap::new(),
            rivalries,
        }
    }

    /// Unknown achievement ids in the snapshot are dropped.
    pub fn from_snapshot(snapshot: StreakSnapshot, rivalries: Vec<SiblingRivalry>) -> Self {
        let unlocked = snapshot
            .unlocked
            .into_iter()
            .filter(|(id, _)| {
                let known = crate::achievements::find(id).is_some();
                if !known {
                    tracing::warn!(achievement = %id, "dropping unknown achievement from snapshot");
                }
                known
            })
            .collect();
        StreakTracker {
            state: StreakState {
                session_battles: 0,
                ..snapshot.state
            },
            unlocked,
            rivalries,
        }
    }

    pub fn snapshot(&self) -> StreakSnapshot {
        StreakSnapshot {
            state: self.state.clone(),
            unlocked: self.unlocked.clone(),
        }
    }

    pub fn state(&self) -> &StreakState {
        &self.state
    }

    pub fn record(&mut self, event: &OutcomeEvent) {
        let state = &mut self.state;
        state.session_battles += 1;

        match state.last_card_position {
            Some(previous) if previous != event.card_position => state.alternating_streak += 1,
            Some(_) => state.alternating_streak = 0,
            None => {}
        }
        state.last_card_position = Some(event.card_position);

        match event.card_position {
            Side::Left => {
                state.left_streak += 1;
                state.right_streak = 0;
            }
            Side::Right => {
                state.right_streak += 1;
                state.left_streak = 0;
            }
        }

        if event.is_perfect_match {
            state.perfect_matches += 1;
        }

        if event.is_close_fight {
            state.close_fights += 1;
        }
        if event.is_close_fight && event.is_underdog_win {
            state.underdog_wins += 1;
            state.underdog_win_streak += 1;
        } else {
            state.underdog_win_streak = 0;
        }

        let (a, b) = (&event.names.0, &event.names.1);
        if let Some(rivalry) = self.rivalries.iter().find(|r| r.matches(a, b)) {
            *state.sibling_battles.entry(rivalry.key.clone()).or_insert(0) += 1;
        }

        self.record_day(event.timestamp.date_naive());
    }

    fn record_day(&mut self, day: NaiveDate) {
        let state = &mut self.state;
        state.daily_battle_dates.insert(day);

        match state.last_battle_date {
            None => state.consecutive_days = 1,
            Some(last) => {
                let elapsed = (day - last).num_days();
                if elapsed < 0 {
                    tracing::debug!(%day, %last, "battle dated before the last one, day streak untouched");
                    return;
                }
                if elapsed == 1 {
                    state.consecutive_days += 1;
                } else if elapsed > 1 {
                    state.consecutive_days = 1;
                }
            }
        }
        state.last_battle_date = Some(day);
    }

    pub fn note_keyboard_vote(&mut self) {
        self.state.used_keyboard += 1;
    }

    pub fn note_number_key_navigation(&mut self) {
        self.state.used_number_keys += 1;
    }

    /// Unlocks every registry entry newly satisfied by `stats` and returns
    /// them in registry order. Earlier unlocks are never revoked.
    pub fn check_achievements(
        &mut self,
        stats: &GameStats,
        now: DateTime<Utc>,
    ) -> Vec<&'static Achievement> {
        let mut newly_unlocked = Vec::new();
        for achievement in ACHIEVEMENTS {
            if self.unlocked.contains_key(achievement.id) {
                continue;
            }
            if achievement.is_met(stats) {
                tracing::debug!(achievement = achievement.id, "achievement unlocked");
                self.unlocked.insert(achievement.id.to_string(), now);
                newly_unlocked.push(achievement);
            }
        }
        newly_unlocked
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.contains_key(id)
    }

    pub fn achievements(&self) -> Vec<AchievementStatus> {
        ACHIEVEMENTS
            .iter()
            .map(|achievement| AchievementStatus {
                achievement,
                unlocked_at: self.unlocked.get(achievement.id).copied(),
            })
            .collect()
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked.len()
    }

    pub fn total_count(&self) -> usize {
        ACHIEVEMENTS.len()
    }

    /// Most recent unlocks first.
    pub fn recent(&self, count: usize) -> Vec<AchievementStatus> {
        let mut unlocked: Vec<_> = self
            .achievements()
            .into_iter()
            .filter(|status| status.unlocked_at.is_some())
            .collect();
        unlocked.sort_by(|a, b| b.unlocked_at.cmp(&a.unlocked_at));
        unlocked.truncate(count);
        unlocked
    }

    /// Clears counters and unlocks, as part of a full reset.
    pub fn reset(&mut self) {
        self.state = StreakState::default();
        self.unlocked.clear();
    }
}

#[cfg(feature = "serde")]
impl StreakSnapshot {
    pub fn to_json(&self) -> Result<String, crate::RankingError> {
        serde_json::to_string(self)
            .map_err(|e| crate::RankingError::SerializationError(format!("Failed to serialize: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self, crate::RankingError> {
        serde_json::from_str(json)
            .map_err(|e| crate::RankingError::SerializationError(format!("Failed to deserialize: {}", e)))
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), crate::RankingError> {
        let json = self.to_json()?;
        std::fs::write(path, json)
            .map_err(|e| crate::RankingError::SerializationError(format!("Failed to write file: {}", e)))
    }

    pub fn load_from_file(path: &str) -> Result<Self, crate::RankingError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| crate::RankingError::SerializationError(format!("Failed to read file: {}", e)))?;
        Self::from_json(&json)
    }
}
