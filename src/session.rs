use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::achievements::GameStats;
use crate::config::{valid_power, EngineConfig};
use crate::error::RankingError;
use crate::history::{BattleHistory, BattleSnapshot, DeletedEntry, HistoryEntry, UndoStack};
use crate::pool::{pair_key, CompletedPairs, Item, ItemPool};
use crate::rating::{apply_outcome, expected_score, ranking_order, RatingRecord, RatingStore, BASE_RATING};
use crate::sampler::{
    find_close_matchup, select_pair, Duel, PairPick, PairingStrategy, Side, CLOSE_FIGHT_MIN_BATTLES,
    CLOSE_FIGHT_RANK_WINDOW,
};
use crate::streak::{OutcomeEvent, StreakState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankChange {
    pub before: usize,
    pub after: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeResult {
    pub winner: RatingRecord,
    pub loser: RatingRecord,
    pub winner_rank: RankChange,
    pub loser_rank: RankChange,
    pub k: f64,
    pub entry: HistoryEntry,
    /// Feed for [`crate::StreakTracker::record`].
    pub event: OutcomeEvent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchOutcome {
    pub new_winner: RatingRecord,
    pub new_loser: RatingRecord,
    pub k: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecalculationReport {
    pub passes: usize,
    /// Rank moves summed over all passes.
    pub rank_changes: usize,
    /// Entries replayed in one pass. Every pass walks the same history, so
    /// this is the count from the last pass, not a total.
    pub replayed: usize,
    /// Entries skipped in one pass: missing snapshots or unknown items.
    pub skipped: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedItem {
    pub rank: usize,
    pub item: Item,
    pub record: RatingRecord,
    pub displayed_rating: f64,
}

/// Persisted session data. Ratings and pair keys are sorted so the JSON is
/// stable between saves.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionState {
    pub ratings: Vec<RatingRecord>,
    pub total_battles: u64,
    pub history: Vec<HistoryEntry>,
    pub completed_pairs: Vec<String>,
}

/// One user's ranking session over a fixed item pool.
#[derive(Debug, Clone)]
pub struct RankingSession {
    pool: ItemPool,
    ratings: RatingStore,
    completed: CompletedPairs,
    history: BattleHistory,
    undo_stack: UndoStack,
    total_battles: u64,
    config: EngineConfig,
    rng: ChaCha8Rng,
}

impl RankingSession {
    pub fn new(items: Vec<Item>, config: EngineConfig) -> Result<Self, RankingError> {
        Self::build(items, config, ChaCha8Rng::from_entropy())
    }

    /// Same as [`RankingSession::new`] with a reproducible random stream.
    pub fn with_seed(items: Vec<Item>, config: EngineConfig, seed: u64) -> Result<Self, RankingError> {
        Self::build(items, config, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Restores a session. Records are sanitized and pair keys found in the
    /// history are merged into the completed set. History keys are re-derived
    /// from the entry names, and entries whose winner is not one of the two
    /// sides are dropped.
    pub fn from_state(
        items: Vec<Item>,
        config: EngineConfig,
        state: SessionState,
    ) -> Result<Self, RankingError> {
        let mut session = Self::new(items, config)?;
        session.ratings = RatingStore::from_records(state.ratings);
        for item in session.pool.items() {
            session.ratings.ensure(&item.name);
        }

        let mut completed: CompletedPairs = state.completed_pairs.into_iter().collect();
        for mut entry in state.history {
            if session.pool.index_of(&entry.left).is_none() || session.pool.index_of(&entry.right).is_none() {
                tracing::debug!(pair = %entry.pair_key, "history entry names an item outside the pool");
            }
            let key = pair_key(&entry.left, &entry.right);
            if entry.pair_key != key {
                tracing::warn!(stored = %entry.pair_key, derived = %key, "history pair key rewritten");
                entry.pair_key = key;
            }
            if entry.left == entry.right || !entry.involves(&entry.winner) {
                tracing::warn!(pair = %entry.pair_key, winner = %entry.winner, "history entry with an invalid winner dropped");
                continue;
            }
            let loser = if entry.winner == entry.left { entry.right.clone() } else { entry.left.clone() };
            if entry.loser != loser {
                tracing::warn!(pair = %entry.pair_key, loser = %entry.loser, "history loser rewritten");
                entry.loser = loser;
            }
            completed.insert_key(entry.pair_key.clone());
            session.history.push_back(entry);
        }
        session.completed = completed;
        session.total_battles = state.total_battles;

        tracing::debug!(
            items = session.pool.len(),
            history = session.history.len(),
            completed = session.completed.len(),
            "session restored"
        );
        Ok(session)
    }

    fn build(items: Vec<Item>, config: EngineConfig, rng: ChaCha8Rng) -> Result<Self, RankingError> {
        let config = config.sanitized();
        let pool = ItemPool::new(items)?;
        let mut ratings = RatingStore::new();
        for item in pool.items() {
            ratings.ensure(&item.name);
        }
        Ok(RankingSession {
            pool,
            ratings,
            completed: CompletedPairs::new(),
            history: BattleHistory::with_capacity(config.history_cap),
            undo_stack: UndoStack::with_capacity(config.undo_cap),
            total_battles: 0,
            config,
            rng,
        })
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    pub fn state(&self) -> SessionState {
        let mut ratings: Vec<_> = self.ratings.records().cloned().collect();
        ratings.sort_by(|a, b| a.name.cmp(&b.name));
        let mut completed_pairs: Vec<_> = self.completed.keys().cloned().collect();
        completed_pairs.sort();
        SessionState {
            ratings,
            total_battles: self.total_battles,
            history: self.history.iter().cloned().collect(),
            completed_pairs,
        }
    }

    pub fn pool(&self) -> &ItemPool {
        &self.pool
    }

    pub fn ratings(&self) -> &RatingStore {
        &self.ratings
    }

    pub fn completed_pairs(&self) -> &CompletedPairs {
        &self.completed
    }

    pub fn history(&self) -> &BattleHistory {
        &self.history
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn total_battles(&self) -> u64 {
        self.total_battles
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn next_pair(&mut self) -> PairPick {
        let params = self.config.sampler_params();
        select_pair(&self.pool, &self.ratings, &self.completed, &params, &mut self.rng)
    }

    /// A pair of seasoned items within a couple of ranks of each other. The
    /// pair may already be completed.
    pub fn force_close_matchup(&mut self) -> Option<Duel> {
        find_close_matchup(&self.pool, &self.ratings, &mut self.rng)
    }

    pub fn record_outcome(&mut self, duel: &Duel, winner: Side) -> Result<OutcomeResult, RankingError> {
        self.record_outcome_at(duel, winner, Utc::now())
    }

    pub fn record_outcome_at(
        &mut self,
        duel: &Duel,
        winner: Side,
        timestamp: DateTime<Utc>,
    ) -> Result<OutcomeResult, RankingError> {
        if self.pool.is_empty() {
            return Err(RankingError::NoActivePool);
        }
        if duel.left.name == duel.right.name {
            return Err(RankingError::InvalidComparison);
        }
        for name in [&duel.left.name, &duel.right.name] {
            if self.pool.index_of(name).is_none() {
                return Err(RankingError::ItemNotFound(name.clone()));
            }
        }

        let left = self.current_record(&duel.left.name);
        let right = self.current_record(&duel.right.name);
        let left_rank_before = rank_in(&self.ratings, &left, &[&left, &right]);
        let right_rank_before = rank_in(&self.ratings, &right, &[&left, &right]);

        let (winner_before, loser_before) = match winner {
            Side::Left => (&left, &right),
            Side::Right => (&right, &left),
        };
        let update = apply_outcome(winner_before, loser_before);

        let winner_after = RatingRecord {
            rating: update.new_winner_rating,
            battles: winner_before.battles + 1,
            wins: winner_before.wins + 1,
            ..winner_before.clone()
        };
        let loser_after = RatingRecord {
            rating: update.new_loser_rating,
            battles: loser_before.battles + 1,
            losses: loser_before.losses + 1,
            ..loser_before.clone()
        };
        let (left_after, right_after) = match winner {
            Side::Left => (&winner_after, &loser_after),
            Side::Right => (&loser_after, &winner_after),
        };
        let left_rank_after = rank_in(&self.ratings, left_after, &[left_after, right_after]);
        let right_rank_after = rank_in(&self.ratings, right_after, &[left_after, right_after]);

        let close_fight = left_rank_before.abs_diff(right_rank_before) < CLOSE_FIGHT_RANK_WINDOW
            && left.battles > CLOSE_FIGHT_MIN_BATTLES
            && right.battles > CLOSE_FIGHT_MIN_BATTLES;
        let (winner_rank, loser_rank) = match winner {
            Side::Left => (
                RankChange { before: left_rank_before, after: left_rank_after },
                RankChange { before: right_rank_before, after: right_rank_after },
            ),
            Side::Right => (
                RankChange { before: right_rank_before, after: right_rank_after },
                RankChange { before: left_rank_before, after: left_rank_after },
            ),
        };
        let underdog_win = close_fight && winner_rank.before > loser_rank.before;

        let entry = HistoryEntry {
            pair_key: duel.key(),
            left: left.name.clone(),
            right: right.name.clone(),
            winner: winner_before.name.clone(),
            loser: loser_before.name.clone(),
            timestamp,
            close_fight,
            left_stats: Some(side_snapshot(&left, &right, left_after.rating, update.k, left_rank_before, left_rank_after)),
            right_stats: Some(side_snapshot(&right, &left, right_after.rating, update.k, right_rank_before, right_rank_after)),
        };
        let event = OutcomeEvent {
            card_position: winner,
            is_perfect_match: duel.left.is_perfect_match(&duel.right),
            is_close_fight: close_fight,
            is_underdog_win: underdog_win,
            names: (left.name.clone(), right.name.clone()),
            timestamp,
        };

        *self.ratings.ensure(&winner_after.name) = winner_after.clone();
        *self.ratings.ensure(&loser_after.name) = loser_after.clone();
        if let Some(evicted) = self.history.push_back(entry.clone()) {
            tracing::trace!(pair = %evicted.pair_key, "history cap reached, oldest entry evicted");
        }
        self.completed.insert_key(entry.pair_key.clone());
        self.total_battles += 1;

        tracing::debug!(
            winner = %winner_after.name,
            loser = %loser_after.name,
            k = update.k,
            close_fight,
            underdog_win,
            "outcome recorded"
        );

        Ok(OutcomeResult {
            winner: winner_after,
            loser: loser_after,
            winner_rank,
            loser_rank,
            k: update.k,
            entry,
            event,
        })
    }

    fn current_record(&self, name: &str) -> RatingRecord {
        self.ratings
            .get(name)
            .cloned()
            .unwrap_or_else(|| RatingRecord::new(name))
    }

    /// Removes a history entry and reopens its pair. Ratings are left as they
    /// are; [`RankingSession::recalculate_from_history`] rebuilds them.
    pub fn delete_history_entry(&mut self, index: usize) -> Option<HistoryEntry> {
        let entry = self.history.remove(index)?;
        if !self.history.iter().any(|other| other.pair_key == entry.pair_key) {
            self.completed.remove_key(&entry.pair_key);
        }
        if let Some(dropped) = self.undo_stack.push_back(DeletedEntry {
            entry: entry.clone(),
            original_index: index,
        }) {
            tracing::trace!(pair = %dropped.entry.pair_key, "undo stack full, oldest deletion dropped");
        }
        tracing::debug!(index, pair = %entry.pair_key, "history entry deleted");
        Some(entry)
    }

    /// Restores the most recent deletion and returns the index it landed at.
    pub fn undo_last_delete(&mut self) -> Option<usize> {
        let DeletedEntry { entry, original_index } = self.undo_stack.pop_back()?;
        self.completed.insert_key(entry.pair_key.clone());
        let (position, evicted) = self.history.insert_or_append(original_index, entry);
        if let Some(evicted) = evicted {
            tracing::trace!(pair = %evicted.pair_key, "history cap reached, oldest entry evicted");
        }
        tracing::debug!(original_index, position, "history deletion undone");
        Some(position)
    }

    /// Flips the winner of a past battle: one win and one loss move between
    /// the two records, then a single update is applied on current ratings as
    /// if the new winner had just beaten the old one.
    pub fn switch_history_winner(&mut self, index: usize) -> Option<SwitchOutcome> {
        let entry = self.history.get(index)?;
        let old_winner = self.ratings.get(&entry.winner)?.clone();
        let old_loser = self.ratings.get(&entry.loser)?.clone();
        if old_winner.wins == 0 || old_loser.losses == 0 {
            tracing::warn!(index, winner = %old_winner.name, "winner switch would underflow counters");
            return None;
        }

        let mut new_winner = RatingRecord {
            wins: old_loser.wins + 1,
            losses: old_loser.losses - 1,
            ..old_loser
        };
        let mut new_loser = RatingRecord {
            wins: old_winner.wins - 1,
            losses: old_winner.losses + 1,
            ..old_winner
        };
        let update = apply_outcome(&new_winner, &new_loser);
        new_winner.rating = update.new_winner_rating;
        new_loser.rating = update.new_loser_rating;

        *self.ratings.ensure(&new_winner.name) = new_winner.clone();
        *self.ratings.ensure(&new_loser.name) = new_loser.clone();

        let winner_rank = self.ratings.rank_of(&new_winner.name).unwrap_or(0);
        let loser_rank = self.ratings.rank_of(&new_loser.name).unwrap_or(0);
        if let Some(entry) = self.history.get_mut(index) {
            std::mem::swap(&mut entry.winner, &mut entry.loser);
            for (name, rating, rank) in [
                (&new_winner.name, new_winner.rating, winner_rank),
                (&new_loser.name, new_loser.rating, loser_rank),
            ] {
                if let Some(snapshot) = entry.snapshot_of_mut(name) {
                    snapshot.rating_after = rating;
                    snapshot.rank_after = rank;
                }
            }
        }

        tracing::debug!(index, winner = %new_winner.name, loser = %new_loser.name, "history winner switched");
        Some(SwitchOutcome {
            new_winner,
            new_loser,
            k: update.k,
        })
    }

    /// Replays the history in order, undoing each entry's stored rating change
    /// and reapplying it with the K the items had at the time. Repeats until a
    /// pass moves no item's rank or the configured pass limit is hit.
    pub fn recalculate_from_history(&mut self) -> RecalculationReport {
        let mut report = RecalculationReport::default();
        if self.history.is_empty() {
            report.converged = true;
            return report;
        }

        while report.passes < self.config.recalculation_max_passes {
            report.passes += 1;
            let ranks_before = self.ratings.ranks();
            let (replayed, skipped) = self.replay_pass();
            report.replayed = replayed;
            report.skipped = skipped;

            let ranks_after = self.ratings.ranks();
            let changed = ranks_after
                .iter()
                .filter(|(name, rank)| ranks_before.get(*name) != Some(rank))
                .count();
            report.rank_changes += changed;
            tracing::debug!(pass = report.passes, changed, replayed, skipped, "recalculation pass");

            if changed == 0 {
                report.converged = true;
                break;
            }
        }
        if !report.converged {
            tracing::warn!(passes = report.passes, "recalculation stopped before ranks settled");
        }
        report
    }

    fn replay_pass(&mut self) -> (usize, usize) {
        let mut replayed = 0;
        let mut skipped = 0;

        for entry in self.history.iter_mut() {
            let (Some(winner_snap), Some(loser_snap)) =
                (entry.snapshot_of(&entry.winner), entry.snapshot_of(&entry.loser))
            else {
                skipped += 1;
                continue;
            };
            let (Some(winner_now), Some(loser_now)) =
                (self.ratings.get(&entry.winner), self.ratings.get(&entry.loser))
            else {
                skipped += 1;
                continue;
            };

            let winner_before = RatingRecord {
                rating: winner_now.rating - winner_snap.potential_gain,
                battles: winner_snap.battles_before,
                ..RatingRecord::new(entry.winner.as_str())
            };
            let loser_before = RatingRecord {
                rating: loser_now.rating - loser_snap.potential_loss,
                battles: loser_snap.battles_before,
                ..RatingRecord::new(entry.loser.as_str())
            };
            let update = apply_outcome(&winner_before, &loser_before);

            if let Some(record) = self.ratings.get_mut(&entry.winner) {
                record.rating = update.new_winner_rating;
            }
            if let Some(record) = self.ratings.get_mut(&entry.loser) {
                record.rating = update.new_loser_rating;
            }

            let winner_rank = self.ratings.rank_of(&entry.winner).unwrap_or(0);
            let loser_rank = self.ratings.rank_of(&entry.loser).unwrap_or(0);
            let winner_name = entry.winner.clone();
            let loser_name = entry.loser.clone();
            if let Some(snapshot) = entry.snapshot_of_mut(&winner_name) {
                *snapshot = side_snapshot(&winner_before, &loser_before, update.new_winner_rating, update.k, snapshot.rank_before, winner_rank);
            }
            if let Some(snapshot) = entry.snapshot_of_mut(&loser_name) {
                *snapshot = side_snapshot(&loser_before, &winner_before, update.new_loser_rating, update.k, snapshot.rank_before, loser_rank);
            }
            replayed += 1;
        }
        (replayed, skipped)
    }

    /// Plays up to `count` battles with winners drawn from the Elo win
    /// probability on raw ratings. Stops early when the pool is exhausted.
    pub fn simulate_battles(&mut self, count: usize) -> usize {
        let mut played = 0;
        for _ in 0..count {
            let Some(duel) = self.next_pair().into_duel() else {
                break;
            };
            let p_left = expected_score(
                self.ratings.get(&duel.left.name).map_or(BASE_RATING, |r| r.rating),
                self.ratings.get(&duel.right.name).map_or(BASE_RATING, |r| r.rating),
            );
            let winner = if self.rng.gen::<f64>() < p_left {
                Side::Left
            } else {
                Side::Right
            };
            match self.record_outcome(&duel, winner) {
                Ok(_) => played += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "simulated battle rejected");
                    break;
                }
            }
        }
        played
    }

    /// Every rated item, best first.
    pub fn ranking(&self) -> Vec<RankedItem> {
        self.ratings
            .sorted()
            .into_iter()
            .enumerate()
            .map(|(idx, record)| RankedItem {
                rank: idx + 1,
                item: self
                    .pool
                    .by_name(&record.name)
                    .cloned()
                    .unwrap_or_else(|| Item::named(record.name.as_str())),
                record: record.clone(),
                displayed_rating: record.displayed_rating(),
            })
            .collect()
    }

    pub fn rank_of(&self, name: &str) -> Option<usize> {
        self.ratings.rank_of(name)
    }

    pub fn total_pairs(&self) -> usize {
        self.pool.total_pairs()
    }

    pub fn remaining_pairs(&self) -> usize {
        self.total_pairs()
            .saturating_sub(self.completed.count_within(&self.pool))
    }

    pub fn is_complete(&self) -> bool {
        self.pool.len() >= 2 && self.remaining_pairs() == 0
    }

    /// Back to a fresh session over the same pool.
    pub fn reset(&mut self) {
        self.ratings.clear();
        for item in self.pool.items() {
            self.ratings.ensure(&item.name);
        }
        self.completed.clear();
        self.history.clear();
        self.undo_stack.clear();
        self.total_battles = 0;
        tracing::debug!(items = self.pool.len(), "session reset");
    }

    pub fn game_stats(&self, streaks: &StreakState) -> GameStats {
        let min_item_battles = self
            .pool
            .items()
            .iter()
            .map(|item| self.ratings.battles(&item.name))
            .min()
            .unwrap_or(0);

        let battled: Vec<&Item> = self
            .pool
            .items()
            .iter()
            .filter(|item| self.ratings.battles(&item.name) > 0)
            .collect();
        let unique_parks = battled
            .iter()
            .filter(|item| !item.park.is_empty())
            .map(|item| item.park.as_str())
            .collect::<HashSet<_>>()
            .len();
        let unique_manufacturers = battled
            .iter()
            .filter(|item| !item.manufacturer.is_empty())
            .map(|item| item.manufacturer.as_str())
            .collect::<HashSet<_>>()
            .len();

        let mut stats = GameStats {
            total_battles: self.total_battles,
            min_item_battles,
            all_pairs_completed: self.is_complete(),
            unique_parks,
            unique_manufacturers,
            ..GameStats::default()
        };
        streaks.fill_stats(&mut stats);
        stats
    }

    pub fn set_pairing_strategy(&mut self, strategy: PairingStrategy) {
        self.config.pairing_strategy = strategy;
    }

    pub fn set_elo_proximity_power(&mut self, power: f64) {
        if valid_power(power) {
            self.config.elo_proximity_power = power;
        } else {
            tracing::warn!(power, "ignoring invalid elo proximity power");
        }
    }

    pub fn set_exploration_power(&mut self, power: f64) {
        if valid_power(power) {
            self.config.exploration_power = power;
        } else {
            tracing::warn!(power, "ignoring invalid exploration power");
        }
    }
}

/// 1-based rank of `target` with `overrides` standing in for the store's
/// copies of the same names.
fn rank_in(store: &RatingStore, target: &RatingRecord, overrides: &[&RatingRecord]) -> usize {
    let ahead_in_store = store
        .records()
        .filter(|r| !overrides.iter().any(|o| o.name == r.name))
        .filter(|r| ranking_order(r, target) == Ordering::Less)
        .count();
    let ahead_in_overrides = overrides
        .iter()
        .filter(|o| o.name != target.name && ranking_order(o, target) == Ordering::Less)
        .count();
    ahead_in_store + ahead_in_overrides + 1
}

fn side_snapshot(
    this: &RatingRecord,
    other: &RatingRecord,
    rating_after: f64,
    k: f64,
    rank_before: usize,
    rank_after: usize,
) -> BattleSnapshot {
    BattleSnapshot {
        rating_before: this.rating,
        rating_after,
        k_factor: k,
        potential_gain: apply_outcome(this, other).new_winner_rating - this.rating,
        potential_loss: apply_outcome(other, this).new_loser_rating - this.rating,
        rank_before,
        rank_after,
        expected_win_probability: expected_score(this.rating, other.rating),
        battles_before: this.battles,
    }
}

#[cfg(feature = "serde")]
impl SessionState {
    pub fn to_json(&self) -> Result<String, RankingError> {
        serde_json::to_string(self)
            .map_err(|e| RankingError::SerializationError(format!("Failed to serialize: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self, RankingError> {
        serde_json::from_str(json)
            .map_err(|e| RankingError::SerializationError(format!("Failed to deserialize: {}", e)))
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), RankingError> {
        let json = self.to_json()?;
        std::fs::write(path, json)
            .map_err(|e| RankingError::SerializationError(format!("Failed to write file: {}", e)))
    }

    pub fn load_from_file(path: &str) -> Result<Self, RankingError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| RankingError::SerializationError(format!("Failed to read file: {}", e)))?;
        Self::from_json(&json)
    }
}
