use std::collections::VecDeque;

use chrono::{DateTime, Utc};

pub const MAX_HISTORY_KEEP: usize = 10_000;
pub const MAX_UNDO_STACK: usize = 50;

/// Fixed-capacity deque: pushing past capacity evicts from the front.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedDeque<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedDeque<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        BoundedDeque {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Returns the evicted element, if any.
    pub fn push_back(&mut self, value: T) -> Option<T> {
        self.entries.push_back(value);
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn pop_back(&mut self) -> Option<T> {
        self.entries.pop_back()
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        self.entries.remove(index)
    }

    /// Inserts at `index` when it is within `0..=len`, else appends. Returns the
    /// position used, and the element evicted if capacity was exceeded. The
    /// evicted element is always one that was already stored.
    pub fn insert_or_append(&mut self, index: usize, value: T) -> (usize, Option<T>) {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        let index = if evicted.is_some() { index.saturating_sub(1) } else { index };
        let position = if index <= self.entries.len() {
            self.entries.insert(index, value);
            index
        } else {
            self.entries.push_back(value);
            self.entries.len() - 1
        };
        (position, evicted)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.entries.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut T> + ExactSizeIterator {
        self.entries.iter_mut()
    }
}

/// One presented side of a judged matchup, captured at judgment time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BattleSnapshot {
    pub rating_before: f64,
    pub rating_after: f64,
    pub k_factor: f64,
    /// Rating change had this side won.
    pub potential_gain: f64,
    /// Rating change had this side lost (negative).
    pub potential_loss: f64,
    pub rank_before: usize,
    pub rank_after: usize,
    pub expected_win_probability: f64,
    pub battles_before: u32,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryEntry {
    pub pair_key: String,
    pub left: String,
    pub right: String,
    pub winner: String,
    pub loser: String,
    pub timestamp: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub close_fight: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub left_stats: Option<BattleSnapshot>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub right_stats: Option<BattleSnapshot>,
}

impl HistoryEntry {
    pub fn involves(&self, name: &str) -> bool {
        self.left == name || self.right == name
    }

    pub fn snapshot_of(&self, name: &str) -> Option<&BattleSnapshot> {
        if self.left == name {
            self.left_stats.as_ref()
        } else if self.right == name {
            self.right_stats.as_ref()
        } else {
            None
        }
    }

    pub(crate) fn snapshot_of_mut(&mut self, name: &str) -> Option<&mut BattleSnapshot> {
        if self.left == name {
            self.left_stats.as_mut()
        } else if self.right == name {
            self.right_stats.as_mut()
        } else {
            None
        }
    }

    pub fn has_snapshots(&self) -> bool {
        self.left_stats.is_some() && self.right_stats.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletedEntry {
    pub entry: HistoryEntry,
    pub original_index: usize,
}

pub type BattleHistory = BoundedDeque<HistoryEntry>;
pub type UndoStack = BoundedDeque<DeletedEntry>;
