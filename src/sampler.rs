//! Matchup selection.
//!
//! Every strategy avoids pairs already in the completed set and falls back to
//! an exhaustive scan, so a pick is only refused when the pool is truly
//! exhausted. Sampling never mutates ratings or the completed set.
use rand::Rng;

use crate::pool::{CompletedPairs, Item, ItemPool};
use crate::rating::RatingStore;

/// Scale (rating points) used to normalize displayed-rating differences.
pub const ELO_DIFF_SCALE: f64 = 400.0;
pub const DEFAULT_EXPLORATION_POWER: f64 = 1.0;
pub const DEFAULT_ELO_PROXIMITY_POWER: f64 = 0.1;
pub const DEFAULT_MAX_ATTEMPTS: usize = 200;
/// Close fights need both items above this many battles.
pub const CLOSE_FIGHT_MIN_BATTLES: u32 = 3;
/// Close fights need ranks strictly closer than this.
pub const CLOSE_FIGHT_RANK_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PairingStrategy {
    Uniform,
    Exploration,
    #[default]
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerParams {
    pub strategy: PairingStrategy,
    pub exploration_power: f64,
    pub elo_proximity_power: f64,
    pub max_attempts: usize,
}

impl Default for SamplerParams {
    fn default() -> Self {
        SamplerParams {
            strategy: PairingStrategy::Hybrid,
            exploration_power: DEFAULT_EXPLORATION_POWER,
            elo_proximity_power: DEFAULT_ELO_PROXIMITY_POWER,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Two items in presentation order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Duel {
    pub left: Item,
    pub right: Item,
}

impl Duel {
    pub fn new(left: Item, right: Item) -> Self {
        Duel { left, right }
    }

    pub fn key(&self) -> String {
        crate::pool::pair_key(&self.left.name, &self.right.name)
    }

    pub fn side(&self, side: Side) -> &Item {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

/// Card position in a presented duel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// 0 for left, 1 for right.
    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Side> {
        match index {
            0 => Some(Side::Left),
            1 => Some(Side::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairPick {
    Pair(Duel),
    /// Every unordered pair of the pool has been judged.
    Exhausted,
    /// Fewer than two items to compare.
    PoolTooSmall,
}

impl PairPick {
    pub fn duel(&self) -> Option<&Duel> {
        match self {
            PairPick::Pair(duel) => Some(duel),
            _ => None,
        }
    }

    pub fn into_duel(self) -> Option<Duel> {
        match self {
            PairPick::Pair(duel) => Some(duel),
            _ => None,
        }
    }
}

pub fn exploration_weights(pool: &ItemPool, ratings: &RatingStore, power: f64) -> Vec<f64> {
    pool.items()
        .iter()
        .map(|item| 1.0 / (1.0 + ratings.battles(&item.name) as f64).powf(power))
        .collect()
}

pub fn proximity_factor(displayed_a: f64, displayed_b: f64, power: f64) -> f64 {
    let diff = (displayed_a - displayed_b).abs() / ELO_DIFF_SCALE;
    1.0 / (1.0 + diff).powf(power)
}

/// Roulette-wheel selection over the positive finite weights. Falls back to a
/// uniform index when there is no usable weight mass.
pub fn weighted_index(weights: &[f64], rng: &mut impl Rng) -> usize {
    let usable = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
    let total: f64 = weights.iter().map(|&w| usable(w)).sum();
    if !total.is_finite() || total <= 0.0 {
        return rng.gen_range(0..weights.len());
    }

    let mut r = rng.gen::<f64>() * total;
    let mut last_positive = 0;
    for (idx, &w) in weights.iter().enumerate() {
        let w = usable(w);
        if w == 0.0 {
            continue;
        }
        last_positive = idx;
        r -= w;
        if r <= 0.0 {
            return idx;
        }
    }
    last_positive
}

pub fn select_pair(
    pool: &ItemPool,
    ratings: &RatingStore,
    completed: &CompletedPairs,
    params: &SamplerParams,
    rng: &mut impl Rng,
) -> PairPick {
    let n = pool.len();
    if n < 2 {
        return PairPick::PoolTooSmall;
    }
    if completed.count_within(pool) >= pool.total_pairs() {
        return PairPick::Exhausted;
    }

    let items = pool.items();
    let weights = exploration_weights(pool, ratings, params.exploration_power);

    for _ in 0..params.max_attempts {
        let (i, j) = match params.strategy {
            PairingStrategy::Uniform => {
                let i = rng.gen_range(0..n);
                let mut j = rng.gen_range(0..n);
                if j == i {
                    j = (i + 1 + rng.gen_range(0..n - 1)) % n;
                }
                (i, j)
            }
            PairingStrategy::Exploration => {
                let i = weighted_index(&weights, rng);
                let mut without_i = weights.clone();
                without_i[i] = 0.0;
                (i, distinct_index(i, n, weighted_index(&without_i, rng)))
            }
            PairingStrategy::Hybrid => {
                let i = weighted_index(&weights, rng);
                let anchor = ratings.displayed(&items[i].name);
                let conditional: Vec<f64> = items
                    .iter()
                    .enumerate()
                    .map(|(k, item)| {
                        if k == i {
                            return 0.0;
                        }
                        let base = if weights[k].is_finite() && weights[k] > 0.0 {
                            weights[k]
                        } else {
                            1.0
                        };
                        let other = ratings.displayed(&item.name);
                        base * proximity_factor(anchor, other, params.elo_proximity_power)
                    })
                    .collect();
                (i, distinct_index(i, n, weighted_index(&conditional, rng)))
            }
        };

        if !completed.contains(&items[i].name, &items[j].name) {
            return PairPick::Pair(Duel::new(items[i].clone(), items[j].clone()));
        }
    }

    tracing::trace!(
        attempts = params.max_attempts,
        strategy = ?params.strategy,
        "random draws exhausted, scanning for an open pair"
    );
    for i in 0..n {
        for j in (i + 1)..n {
            if !completed.contains(&items[i].name, &items[j].name) {
                let (a, b) = if rng.gen::<f64>() < 0.5 { (i, j) } else { (j, i) };
                return PairPick::Pair(Duel::new(items[a].clone(), items[b].clone()));
            }
        }
    }

    PairPick::Exhausted
}

fn distinct_index(i: usize, n: usize, j: usize) -> usize {
    if j == i {
        (i + 1) % n
    } else {
        j
    }
}

/// A random pair of seasoned items sitting within a couple of ranks of each
/// other, or `None` when no such pair exists.
pub fn find_close_matchup(
    pool: &ItemPool,
    ratings: &RatingStore,
    rng: &mut impl Rng,
) -> Option<Duel> {
    let ranks = ratings.ranks();
    let seasoned: Vec<(&Item, usize)> = pool
        .items()
        .iter()
        .filter(|item| ratings.battles(&item.name) > CLOSE_FIGHT_MIN_BATTLES)
        .filter_map(|item| ranks.get(&item.name).map(|&rank| (item, rank)))
        .collect();

    let mut eligible = Vec::new();
    for (a_idx, &(a, rank_a)) in seasoned.iter().enumerate() {
        for &(b, rank_b) in &seasoned[a_idx + 1..] {
            if rank_a.abs_diff(rank_b) < CLOSE_FIGHT_RANK_WINDOW {
                eligible.push((a, b));
            }
        }
    }

    if eligible.is_empty() {
        return None;
    }
    let (a, b) = eligible[rng.gen_range(0..eligible.len())];
    Some(Duel::new(a.clone(), b.clone()))
}
