//! Adaptive Elo: expected score, battle-count decayed K and a displayed rating
//! shrunk toward the population mean.

use std::cmp::Ordering;
use std::collections::HashMap;

pub const BASE_RATING: f64 = 1500.0;
/// K for an item with no battles.
pub const K0: f64 = 64.0;
/// Battle count at which K has halved.
pub const K_DECAY_C: f64 = 10.0;
pub const K_MIN: f64 = 8.0;
/// Pseudo-battles pulling the displayed rating toward `BASE_RATING`.
pub const PRIOR_WEIGHT: f64 = 6.0;
const LOGISTIC_SCALE: f64 = 400.0;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RatingRecord {
    pub name: String,
    pub rating: f64,
    pub battles: u32,
    pub wins: u32,
    pub losses: u32,
}

impl RatingRecord {
    pub fn new(name: impl Into<String>) -> Self {
        RatingRecord {
            name: name.into(),
            rating: BASE_RATING,
            battles: 0,
            wins: 0,
            losses: 0,
        }
    }

    /// Coerces a record read from persisted state into one the rating math can
    /// consume: non-finite ratings fall back to `BASE_RATING` and the battle
    /// count is re-derived from wins and losses.
    pub fn sanitized(mut self) -> Self {
        if !self.rating.is_finite() {
            tracing::warn!(item = %self.name, rating = self.rating, "non-finite rating reset to base");
            self.rating = BASE_RATING;
        }
        let derived = self.wins.saturating_add(self.losses);
        if derived != self.battles {
            tracing::warn!(
                item = %self.name,
                battles = self.battles,
                wins = self.wins,
                losses = self.losses,
                "battle count disagrees with wins + losses"
            );
            self.battles = derived;
        }
        self
    }

    pub fn displayed_rating(&self) -> f64 {
        displayed_rating(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EloUpdate {
    pub new_winner_rating: f64,
    pub new_loser_rating: f64,
    pub k: f64,
}

pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((rating_b - rating_a) / LOGISTIC_SCALE))
}

pub fn adaptive_k(battles: u32) -> f64 {
    (K0 / (1.0 + battles as f64 / K_DECAY_C)).max(K_MIN)
}

/// Both sides move by the larger of the two adaptive K values, so a newcomer
/// beating a veteran still moves the veteran noticeably. The update is
/// zero-sum: the loser drops exactly what the winner gains.
pub fn apply_outcome(winner: &RatingRecord, loser: &RatingRecord) -> EloUpdate {
    let k = adaptive_k(winner.battles).max(adaptive_k(loser.battles));
    let expected_winner = expected_score(winner.rating, loser.rating);
    let expected_loser = 1.0 - expected_winner;

    EloUpdate {
        new_winner_rating: winner.rating + k * (1.0 - expected_winner),
        new_loser_rating: loser.rating - k * expected_loser,
        k,
    }
}

pub fn displayed_rating(record: &RatingRecord) -> f64 {
    if record.battles == 0 {
        return BASE_RATING;
    }
    let n = record.battles as f64;
    (record.rating * n + BASE_RATING * PRIOR_WEIGHT) / (n + PRIOR_WEIGHT)
}

/// Descending by displayed rating, ties broken by name so ranks are stable.
pub(crate) fn ranking_order(a: &RatingRecord, b: &RatingRecord) -> Ordering {
    displayed_rating(b)
        .partial_cmp(&displayed_rating(a))
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.name.cmp(&b.name))
}

#[derive(Debug, Clone, Default)]
pub struct RatingStore {
    records: HashMap<String, RatingRecord>,
}

impl RatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = RatingRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.name.clone(), r.sanitized()))
            .collect();
        RatingStore { records }
    }

    pub fn get(&self, name: &str) -> Option<&RatingRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Returns the record for `name`, creating it at `BASE_RATING` if absent.
    pub fn ensure(&mut self, name: &str) -> &mut RatingRecord {
        self.records
            .entry(name.to_string())
            .or_insert_with(|| RatingRecord::new(name))
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut RatingRecord> {
        self.records.get_mut(name)
    }

    pub fn battles(&self, name: &str) -> u32 {
        self.records.get(name).map_or(0, |r| r.battles)
    }

    pub fn displayed(&self, name: &str) -> f64 {
        self.records.get(name).map_or(BASE_RATING, displayed_rating)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &RatingRecord> {
        self.records.values()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn sorted(&self) -> Vec<&RatingRecord> {
        let mut sorted: Vec<_> = self.records.values().collect();
        sorted.sort_by(|a, b| ranking_order(a, b));
        sorted
    }

    /// 1-based rank of every record by displayed rating.
    pub fn ranks(&self) -> HashMap<String, usize> {
        self.sorted()
            .into_iter()
            .enumerate()
            .map(|(idx, r)| (r.name.clone(), idx + 1))
            .collect()
    }

    pub fn rank_of(&self, name: &str) -> Option<usize> {
        let target = self.records.get(name)?;
        let ahead = self
            .records
            .values()
            .filter(|r| ranking_order(r, target) == Ordering::Less)
            .count();
        Some(ahead + 1)
    }
}
