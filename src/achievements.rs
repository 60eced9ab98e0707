//! Fixed achievement registry evaluated against accumulated [`GameStats`].

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Category {
    Battles,
    CloseFights,
    Ranking,
    Patterns,
    Collection,
    Siblings,
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Rarity {
    Rare,
    Epic,
    Legendary,
}

/// Counters an achievement condition can look at. Built by the session from
/// its own state plus the streak tracker's.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameStats {
    pub total_battles: u64,
    pub session_battles: u32,
    pub close_fights: u32,
    pub underdog_wins: u32,
    /// Smallest battle count over the pool.
    pub min_item_battles: u32,
    pub all_pairs_completed: bool,
    pub left_streak: u32,
    pub right_streak: u32,
    pub alternating_streak: u32,
    pub perfect_matches: u32,
    pub unique_parks: usize,
    pub unique_manufacturers: usize,
    pub consecutive_days: u32,
    pub sibling_battles: BTreeMap<String, u32>,
    pub used_keyboard: u32,
    pub used_number_keys: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    TotalBattles(u64),
    SessionBattles(u32),
    CloseFightCount(u32),
    UnderdogWins(u32),
    MinItemBattles(u32),
    LeftStreak(u32),
    RightStreak(u32),
    AlternatingStreak(u32),
    UniqueParks(usize),
    UniqueManufacturers(usize),
    PerfectMatches(u32),
    /// At least one battle between the members of the named rivalry.
    SiblingBattle(&'static str),
    UsedKeyboard,
    UsedNumberKeys,
    ConsecutiveDays(u32),
}

impl Condition {
    pub fn is_met(&self, stats: &GameStats) -> bool {
        match *self {
            Condition::TotalBattles(n) => stats.total_battles >= n,
            Condition::SessionBattles(n) => stats.session_battles >= n,
            Condition::CloseFightCount(n) => stats.close_fights >= n,
            Condition::UnderdogWins(n) => stats.underdog_wins >= n,
            Condition::MinItemBattles(n) => stats.min_item_battles >= n,
            Condition::LeftStreak(n) => stats.left_streak >= n,
            Condition::RightStreak(n) => stats.right_streak >= n,
            Condition::AlternatingStreak(n) => stats.alternating_streak >= n,
            Condition::UniqueParks(n) => stats.unique_parks >= n,
            Condition::UniqueManufacturers(n) => stats.unique_manufacturers >= n,
            Condition::PerfectMatches(n) => stats.perfect_matches >= n,
            Condition::SiblingBattle(key) => stats.sibling_battles.get(key).copied().unwrap_or(0) >= 1,
            Condition::UsedKeyboard => stats.used_keyboard >= 1,
            Condition::UsedNumberKeys => stats.used_number_keys >= 1,
            Condition::ConsecutiveDays(n) => stats.consecutive_days >= n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
    pub rarity: Option<Rarity>,
    pub condition: Condition,
}

impl Achievement {
    pub fn is_met(&self, stats: &GameStats) -> bool {
        self.condition.is_met(stats)
    }
}

/// Two items whose head-to-head is worth its own achievement.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SiblingRivalry {
    pub key: String,
    pub names: (String, String),
}

impl SiblingRivalry {
    pub fn new(key: &str, a: &str, b: &str) -> Self {
        SiblingRivalry {
            key: key.to_string(),
            names: (a.to_string(), b.to_string()),
        }
    }

    pub fn matches(&self, a: &str, b: &str) -> bool {
        let (x, y) = (&self.names.0, &self.names.1);
        (a == x && b == y) || (a == y && b == x)
    }
}

pub fn default_rivalries() -> Vec<SiblingRivalry> {
    vec![
        SiblingRivalry::new("joris", "Joris en de Draak - Water", "Joris en de Draak - Vuur"),
        SiblingRivalry::new("winjas", "Winja's Fear", "Winja's Force"),
        SiblingRivalry::new("maxMoritz", "Max", "Moritz"),
        SiblingRivalry::new("halsVolldampf", "Hals-über-Kopf", "Volldampf"),
        SiblingRivalry::new("redForce", "Red Force", "Junior Red Force"),
        SiblingRivalry::new("taronRaik", "Taron", "Raik"),
        SiblingRivalry::new("yoy", "Yoy Thrill", "Yoy Chill"),
    ]
}

const fn achievement(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    category: Category,
    rarity: Option<Rarity>,
    condition: Condition,
) -> Achievement {
    Achievement {
        id,
        name,
        description,
        category,
        rarity,
        condition,
    }
}

use Category::*;
use Condition::*;

pub static ACHIEVEMENTS: &[Achievement] = &[
    achievement("firstBlood", "First Blood", "Complete your first battle", Battles, None, TotalBattles(1)),
    achievement("warmingUp", "Warming Up", "Complete 25 battles", Battles, None, TotalBattles(25)),
    achievement("committed", "Committed", "Complete 100 battles", Battles, None, TotalBattles(100)),
    achievement("centuryClub", "Century Club", "Complete 250 battles", Battles, None, TotalBattles(250)),
    achievement("legendary", "Legendary Voter", "Complete 500 battles", Battles, None, TotalBattles(500)),
    achievement("thousandClub", "Thousand Club", "Complete 1000 battles", Battles, None, TotalBattles(1000)),
    achievement(
        "tenThousandClub",
        "Ten Thousand Club",
        "Complete 10000 battles",
        Battles,
        Some(Rarity::Legendary),
        TotalBattles(10_000),
    ),
    achievement("speedDemon", "Speed Demon", "Complete 50 battles in one session", Battles, None, SessionBattles(50)),
    achievement(
        "marathonRunner",
        "Marathon Runner",
        "Complete 100 battles in one session",
        Battles,
        None,
        SessionBattles(100),
    ),
    achievement("clashOfTitans", "Clash of Titans", "Experience your first close fight", CloseFights, None, CloseFightCount(1)),
    achievement("dramaQueen", "Drama Queen", "Experience 10 close fights", CloseFights, None, CloseFightCount(10)),
    achievement("arenaChampion", "Arena Champion", "Experience 25 close fights", CloseFights, None, CloseFightCount(25)),
    achievement(
        "giantSlayer",
        "Giant Slayer",
        "Win your first close fight as the underdog",
        CloseFights,
        None,
        UnderdogWins(1),
    ),
    achievement("upsetSpecialist", "Upset Specialist", "Win 5 close fights as the underdog", CloseFights, None, UnderdogWins(5)),
    achievement("davidVsGoliath", "David vs Goliath", "Win 10 close fights as the underdog", CloseFights, None, UnderdogWins(10)),
    achievement("balancedJudge", "Balanced Judge", "Have all coasters with at least 5 battles", Ranking, None, MinItemBattles(5)),
    achievement(
        "fairArbitrator",
        "Fair Arbitrator",
        "Have all coasters with at least 10 battles",
        Ranking,
        Some(Rarity::Rare),
        MinItemBattles(10),
    ),
    achievement(
        "supremeJudicator",
        "Supreme Judicator",
        "Have all coasters with at least 25 battles",
        Ranking,
        Some(Rarity::Epic),
        MinItemBattles(25),
    ),
    achievement("leftHanded", "Left Handed", "Pick the left card 7 times in a row", Patterns, None, LeftStreak(7)),
    achievement("rightHanded", "Right Handed", "Choose the right card 5 times in a row", Patterns, None, RightStreak(5)),
    achievement(
        "alternatingPattern",
        "Indecisive",
        "Alternate between left and right for 10 battles in a row",
        Patterns,
        None,
        AlternatingStreak(10),
    ),
    achievement("worldTraveler", "World Traveler", "Have coasters from 10+ parks in battles", Collection, None, UniqueParks(10)),
    achievement(
        "globeTrotter",
        "Globe Trotter",
        "Have coasters from 25+ parks in battles",
        Collection,
        Some(Rarity::Rare),
        UniqueParks(25),
    ),
    achievement(
        "worldExplorer",
        "World Explorer",
        "Have coasters from 50+ parks in battles",
        Collection,
        Some(Rarity::Epic),
        UniqueParks(50),
    ),
    achievement(
        "manufacturerExpert",
        "Manufacturer Expert",
        "Have coasters from 10+ manufacturers in battles",
        Collection,
        None,
        UniqueManufacturers(10),
    ),
    achievement(
        "manufacturerConnoisseur",
        "Manufacturer Connoisseur",
        "Have coasters from 20+ manufacturers in battles",
        Collection,
        Some(Rarity::Rare),
        UniqueManufacturers(20),
    ),
    achievement(
        "manufacturerMaster",
        "Manufacturer Master",
        "Have coasters from 30+ manufacturers in battles",
        Collection,
        Some(Rarity::Epic),
        UniqueManufacturers(30),
    ),
    achievement(
        "perfectMatch",
        "Perfect Match",
        "Complete a battle where both coasters share the same park and manufacturer",
        Collection,
        None,
        PerfectMatches(1),
    ),
    achievement(
        "jorisShowdown",
        "Dragon Duel",
        "Battle Joris en de Draak - Water vs Joris en de Draak - Vuur",
        Siblings,
        None,
        SiblingBattle("joris"),
    ),
    achievement("winjasWar", "Winja's War", "Battle Winja's Fear vs Winja's Force", Siblings, None, SiblingBattle("winjas")),
    achievement("maxMoritzMadness", "Max & Moritz Madness", "Battle Max vs Moritz", Siblings, None, SiblingBattle("maxMoritz")),
    achievement(
        "halsVolldampf",
        "Hals über Kopf Clash",
        "Battle Hals-über-Kopf vs Volldampf",
        Siblings,
        None,
        SiblingBattle("halsVolldampf"),
    ),
    achievement(
        "redForceFamily",
        "Red Force Family",
        "Battle Red Force vs Junior Red Force",
        Siblings,
        None,
        SiblingBattle("redForce"),
    ),
    achievement("taronRaik", "Taron vs Raik", "Battle Taron vs Raik", Siblings, None, SiblingBattle("taronRaik")),
    achievement("yoyBattle", "Yoy Showdown", "Battle Yoy Thrill vs Yoy Chill", Siblings, None, SiblingBattle("yoy")),
    achievement("keyboardWarrior", "Keyboard Warrior", "Use arrow keys to vote in a battle", Special, None, UsedKeyboard),
    achievement("tabMaster", "Tab Master", "Use number keys (1-4) to navigate tabs", Special, None, UsedNumberKeys),
    achievement("consistentVoter", "Consistent Voter", "Vote daily for 3 days in a row", Special, None, ConsecutiveDays(3)),
    achievement(
        "weekStreak",
        "Week Warrior",
        "Vote daily for 7 days in a row",
        Special,
        Some(Rarity::Rare),
        ConsecutiveDays(7),
    ),
    achievement(
        "monthStreak",
        "Monthly Dedication",
        "Vote daily for 30 days in a row",
        Special,
        Some(Rarity::Epic),
        ConsecutiveDays(30),
    ),
];

pub fn find(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}
