use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::RankingError;

const PAIR_KEY_SEPARATOR: &str = "|||";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub park: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub manufacturer: String,
}

impl Item {
    pub fn new(
        name: impl Into<String>,
        park: impl Into<String>,
        manufacturer: impl Into<String>,
    ) -> Self {
        Item {
            name: name.into(),
            park: park.into(),
            manufacturer: manufacturer.into(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, "", "")
    }

    /// Same park and same manufacturer, both known.
    pub fn is_perfect_match(&self, other: &Item) -> bool {
        !self.park.is_empty()
            && !self.manufacturer.is_empty()
            && self.park == other.park
            && self.manufacturer == other.manufacturer
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Canonical key of an unordered pair: the two names sorted and joined.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}{PAIR_KEY_SEPARATOR}{b}")
    } else {
        format!("{b}{PAIR_KEY_SEPARATOR}{a}")
    }
}

pub fn total_pairs(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Ordered list of items with a name index.
#[derive(Debug, Clone, Default)]
pub struct ItemPool {
    item_indices: HashMap<String, usize>,
    items: Vec<Item>,
}

impl ItemPool {
    pub fn new(items: Vec<Item>) -> Result<Self, RankingError> {
        let mut pool = ItemPool {
            item_indices: HashMap::with_capacity(items.len()),
            items: Vec::with_capacity(items.len()),
        };
        for item in items {
            pool.add_item(item)?;
        }
        Ok(pool)
    }

    pub fn add_item(&mut self, item: Item) -> Result<(), RankingError> {
        if self.item_indices.contains_key(&item.name) {
            return Err(RankingError::ItemAlreadyExists(item.name));
        }
        self.item_indices.insert(item.name.clone(), self.items.len());
        self.items.push(item);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&Item> {
        self.item_indices.get(name).map(|&idx| &self.items[idx])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.item_indices.get(name).copied()
    }

    pub fn total_pairs(&self) -> usize {
        total_pairs(self.items.len())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletedPairs {
    keys: HashSet<String>,
}

impl CompletedPairs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, a: &str, b: &str) -> bool {
        self.keys.insert(pair_key(a, b))
    }

    pub fn insert_key(&mut self, key: String) -> bool {
        self.keys.insert(key)
    }

    pub fn remove_key(&mut self, key: &str) -> bool {
        self.keys.remove(key)
    }

    pub fn contains(&self, a: &str, b: &str) -> bool {
        self.keys.contains(&pair_key(a, b))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.keys.iter()
    }

    /// Number of completed keys whose both members are in `pool`.
    pub fn count_within(&self, pool: &ItemPool) -> usize {
        self.keys
            .iter()
            .filter(|key| {
                key.split_once(PAIR_KEY_SEPARATOR)
                    .map_or(false, |(a, b)| {
                        pool.index_of(a).is_some() && pool.index_of(b).is_some()
                    })
            })
            .count()
    }
}

impl FromIterator<String> for CompletedPairs {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        CompletedPairs {
            keys: iter.into_iter().collect(),
        }
    }
}
