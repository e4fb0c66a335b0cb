//! Combatants: the unified player/NPC model
//!
//! A combatant carries permanent *base* ability scores plus an *effective*
//! set derived from equipment. The effective set, armor class, resistances
//! and max HP live in [`DerivedStats`] and are rebuilt by
//! [`crate::equipment::refresh_derived`]; they are never persisted.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::combat::{DamageType, Resistances};
use crate::equipment::{self, ArmorClass, Equipment, Proficiencies, WeaponProfile};

/// Identifier shared by players and NPCs
pub type EntityId = String;

/// The six ability scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub const ALL: [Ability; 6] = [
        Ability::Strength,
        Ability::Dexterity,
        Ability::Constitution,
        Ability::Intelligence,
        Ability::Wisdom,
        Ability::Charisma,
    ];

    /// Three-letter abbreviation
    pub fn short_name(&self) -> &'static str {
        match self {
            Ability::Strength => "str",
            Ability::Dexterity => "dex",
            Ability::Constitution => "con",
            Ability::Intelligence => "int",
            Ability::Wisdom => "wis",
            Ability::Charisma => "cha",
        }
    }
}

impl FromStr for Ability {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "str" | "strength" => Ok(Ability::Strength),
            "dex" | "dexterity" => Ok(Ability::Dexterity),
            "con" | "constitution" => Ok(Ability::Constitution),
            "int" | "intelligence" => Ok(Ability::Intelligence),
            "wis" | "wisdom" => Ok(Ability::Wisdom),
            "cha" | "charisma" => Ok(Ability::Charisma),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Ability::Strength => "strength",
            Ability::Dexterity => "dexterity",
            Ability::Constitution => "constitution",
            Ability::Intelligence => "intelligence",
            Ability::Wisdom => "wisdom",
            Ability::Charisma => "charisma",
        };
        write!(f, "{}", s)
    }
}

/// D&D-style modifier: floor((score - 10) / 2)
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// One value per ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSet {
    #[serde(default = "default_score")]
    pub strength: i32,
    #[serde(default = "default_score")]
    pub dexterity: i32,
    #[serde(default = "default_score")]
    pub constitution: i32,
    #[serde(default = "default_score")]
    pub intelligence: i32,
    #[serde(default = "default_score")]
    pub wisdom: i32,
    #[serde(default = "default_score")]
    pub charisma: i32,
}

fn default_score() -> i32 {
    10
}

impl Default for ScoreSet {
    fn default() -> Self {
        Self::uniform(10)
    }
}

impl ScoreSet {
    pub fn uniform(score: i32) -> Self {
        Self {
            strength: score,
            dexterity: score,
            constitution: score,
            intelligence: score,
            wisdom: score,
            charisma: score,
        }
    }

    /// Scores in str/dex/con/int/wis/cha order
    pub fn new(str: i32, dex: i32, con: i32, int: i32, wis: i32, cha: i32) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    pub fn get(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    fn get_mut(&mut self, ability: Ability) -> &mut i32 {
        match ability {
            Ability::Strength => &mut self.strength,
            Ability::Dexterity => &mut self.dexterity,
            Ability::Constitution => &mut self.constitution,
            Ability::Intelligence => &mut self.intelligence,
            Ability::Wisdom => &mut self.wisdom,
            Ability::Charisma => &mut self.charisma,
        }
    }
}

/// Base and effective ability scores.
///
/// Serialized as the base set only; the effective set starts equal to base
/// and changes only through [`AbilityScores::apply_bonuses`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ScoreSet", into = "ScoreSet")]
pub struct AbilityScores {
    base: ScoreSet,
    effective: ScoreSet,
}

impl From<ScoreSet> for AbilityScores {
    fn from(base: ScoreSet) -> Self {
        Self {
            base,
            effective: base,
        }
    }
}

impl From<AbilityScores> for ScoreSet {
    fn from(scores: AbilityScores) -> Self {
        scores.base
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        ScoreSet::default().into()
    }
}

impl AbilityScores {
    pub fn base(&self) -> &ScoreSet {
        &self.base
    }

    pub fn effective(&self) -> &ScoreSet {
        &self.effective
    }

    /// Effective score (base plus equipment)
    pub fn score(&self, ability: Ability) -> i32 {
        self.effective.get(ability)
    }

    pub fn base_score(&self, ability: Ability) -> i32 {
        self.base.get(ability)
    }

    /// Modifier of the effective score
    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.score(ability))
    }

    /// Modifier of the base score
    pub fn base_modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.base_score(ability))
    }

    /// Permanently raise a base score; returns the new base value.
    /// Callers must refresh derived stats afterwards.
    pub fn increase_base(&mut self, ability: Ability, amount: i32) -> i32 {
        let score = self.base.get_mut(ability);
        *score += amount;
        *score
    }

    /// Rebuild the effective set as base plus the given bonuses
    pub fn apply_bonuses(&mut self, bonuses: &BTreeMap<Ability, i32>) {
        let mut effective = self.base;
        for (ability, bonus) in bonuses {
            *effective.get_mut(*ability) += bonus;
        }
        self.effective = effective;
    }
}

/// Player or NPC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    #[default]
    Npc,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Player => write!(f, "player"),
            EntityKind::Npc => write!(f, "npc"),
        }
    }
}

/// Experience and guild state (meaningful for players)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progression {
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub guild: Option<String>,
    #[serde(default)]
    pub pending_stat_choices: u32,
    #[serde(default)]
    pub unlocked_abilities: Vec<String>,
    /// Flat max HP granted by guild bonuses
    #[serde(default)]
    pub bonus_max_hp: i32,
    /// Flat AC granted by guild bonuses
    #[serde(default)]
    pub bonus_armor_class: i32,
}

/// Values recomputed from base stats and equipment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedStats {
    pub armor_class: ArmorClass,
    pub resistances: Resistances,
    pub max_hp: i32,
}

/// A player or NPC that can take part in combat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub kind: EntityKind,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub abilities: AbilityScores,
    hp: i32,
    /// Max HP before equipment and guild adjustments
    pub base_max_hp: i32,
    #[serde(default = "default_proficiency")]
    pub proficiency_bonus: i32,
    /// Innate resistances; equipment stacks on top
    #[serde(default)]
    pub resistances: Resistances,
    #[serde(default)]
    pub equipment: Equipment,
    #[serde(default)]
    pub proficiencies: Proficiencies,
    /// Claws, bites and the like, used when the main hand is empty
    #[serde(default)]
    pub natural_weapon: Option<WeaponProfile>,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub progression: Progression,
    #[serde(skip)]
    derived: DerivedStats,
}

fn default_level() -> u32 {
    1
}

fn default_proficiency() -> i32 {
    2
}

impl Combatant {
    /// Create a combatant at full health with derived stats computed
    pub fn new(
        id: &str,
        name: &str,
        kind: EntityKind,
        level: u32,
        scores: ScoreSet,
        base_max_hp: i32,
    ) -> Self {
        let level = level.max(1);
        let mut combatant = Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            level,
            abilities: scores.into(),
            hp: base_max_hp,
            base_max_hp,
            proficiency_bonus: crate::progression::proficiency_for_level(level),
            resistances: Resistances::default(),
            equipment: Equipment::default(),
            proficiencies: Proficiencies::default(),
            natural_weapon: None,
            room_id: None,
            progression: Progression::default(),
            derived: DerivedStats::default(),
        };
        combatant.refresh();
        combatant.hp = combatant.max_hp();
        combatant
    }

    pub fn player(id: &str, name: &str, level: u32, scores: ScoreSet, base_max_hp: i32) -> Self {
        Self::new(id, name, EntityKind::Player, level, scores, base_max_hp)
    }

    pub fn npc(id: &str, name: &str, level: u32, scores: ScoreSet, base_max_hp: i32) -> Self {
        Self::new(id, name, EntityKind::Npc, level, scores, base_max_hp)
    }

    /// Replace the equipment set
    pub fn with_equipment(mut self, equipment: Equipment) -> Self {
        self.equipment = equipment;
        self.refresh();
        self
    }

    pub fn with_proficiencies(mut self, proficiencies: Proficiencies) -> Self {
        self.proficiencies = proficiencies;
        self
    }

    /// Stack an innate resistance multiplier
    pub fn with_resistance(mut self, damage_type: DamageType, multiplier: f64) -> Self {
        self.resistances.stack(damage_type, multiplier);
        self.refresh();
        self
    }

    pub fn with_natural_weapon(mut self, weapon: WeaponProfile) -> Self {
        self.natural_weapon = Some(weapon);
        self
    }

    pub fn in_room(mut self, room_id: &str) -> Self {
        self.room_id = Some(room_id.to_string());
        self
    }

    pub fn with_guild(mut self, guild: &str) -> Self {
        self.progression.guild = Some(guild.to_string());
        self
    }

    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.derived.max_hp
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// At or below half of max HP
    pub fn is_bloodied(&self) -> bool {
        self.hp * 2 <= self.max_hp()
    }

    pub fn armor_class(&self) -> i32 {
        self.derived.armor_class.total
    }

    pub fn derived(&self) -> &DerivedStats {
        &self.derived
    }

    /// Lose HP, never dropping below 0. Returns HP actually lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let actual = amount.clamp(0, self.hp);
        self.hp -= actual;
        actual
    }

    /// Heal (cannot exceed max HP). Returns HP actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let actual = amount.clamp(0, (self.max_hp() - self.hp).max(0));
        self.hp += actual;
        actual
    }

    pub fn restore_full(&mut self) {
        self.hp = self.max_hp();
    }

    /// Set HP directly, clamped to [0, max HP]
    pub fn set_hp(&mut self, hp: i32) {
        self.hp = hp.clamp(0, self.max_hp());
    }

    /// Recompute effective abilities, AC, resistances and max HP
    pub fn refresh(&mut self) {
        equipment::refresh_derived(self);
    }

    pub(crate) fn set_derived(&mut self, derived: DerivedStats) {
        self.derived = derived;
        self.hp = self.hp.clamp(0, self.derived.max_hp.max(0));
    }
}

/// Every combatant known to the engine, keyed by id
#[derive(Debug, Default)]
pub struct Roster {
    entities: HashMap<EntityId, Combatant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a combatant, refreshing its derived stats
    pub fn insert(&mut self, mut combatant: Combatant) -> Option<Combatant> {
        combatant.refresh();
        self.entities.insert(combatant.id.clone(), combatant)
    }

    pub fn get(&self, id: &str) -> Option<&Combatant> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Combatant> {
        self.entities.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Combatant> {
        self.entities.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn is_alive(&self, id: &str) -> bool {
        self.entities.get(id).is_some_and(|c| c.is_alive())
    }

    pub fn name_of(&self, id: &str) -> String {
        self.entities
            .get(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.entities.values()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ability_modifier() {
        assert_eq!(ability_modifier(10), 0);
        assert_eq!(ability_modifier(11), 0);
        assert_eq!(ability_modifier(18), 4);
        assert_eq!(ability_modifier(16), 3);
        assert_eq!(ability_modifier(9), -1);
        assert_eq!(ability_modifier(8), -1);
        assert_eq!(ability_modifier(1), -5);
    }

    #[test]
    fn test_ability_parsing() {
        assert_eq!("str".parse::<Ability>(), Ok(Ability::Strength));
        assert_eq!("Dexterity".parse::<Ability>(), Ok(Ability::Dexterity));
        assert_eq!(" CON ".parse::<Ability>(), Ok(Ability::Constitution));
        assert!("luck".parse::<Ability>().is_err());
        assert_eq!(Ability::Wisdom.short_name(), "wis");
    }

    #[test]
    fn test_effective_scores_derive_from_base() {
        let mut scores = AbilityScores::from(ScoreSet::new(14, 12, 10, 10, 10, 10));
        let mut bonuses = BTreeMap::new();
        bonuses.insert(Ability::Strength, 2);
        scores.apply_bonuses(&bonuses);
        assert_eq!(scores.score(Ability::Strength), 16);
        assert_eq!(scores.base_score(Ability::Strength), 14);

        scores.increase_base(Ability::Strength, 1);
        assert_eq!(scores.base_score(Ability::Strength), 15);
        // effective is stale until the next rebuild
        assert_eq!(scores.score(Ability::Strength), 16);
        scores.apply_bonuses(&bonuses);
        assert_eq!(scores.score(Ability::Strength), 17);
    }

    #[test]
    fn test_scores_serialize_as_base_only() {
        let mut scores = AbilityScores::from(ScoreSet::new(14, 12, 10, 10, 10, 10));
        let mut bonuses = BTreeMap::new();
        bonuses.insert(Ability::Strength, 4);
        scores.apply_bonuses(&bonuses);

        let json = serde_json::to_value(&scores).unwrap();
        assert_eq!(json["strength"], 14);

        let back: AbilityScores = serde_json::from_value(json).unwrap();
        assert_eq!(back.score(Ability::Strength), 14);
    }

    #[test]
    fn test_hp_clamping() {
        let mut orc = Combatant::npc("orc", "Orc", 2, ScoreSet::default(), 15);
        assert_eq!(orc.hp(), 15);
        assert_eq!(orc.max_hp(), 15);

        assert_eq!(orc.take_damage(20), 15);
        assert_eq!(orc.hp(), 0);
        assert!(!orc.is_alive());
        assert_eq!(orc.take_damage(5), 0);

        assert_eq!(orc.heal(100), 15);
        assert_eq!(orc.hp(), 15);
        assert_eq!(orc.heal(5), 0);

        orc.set_hp(-3);
        assert_eq!(orc.hp(), 0);
        orc.set_hp(99);
        assert_eq!(orc.hp(), 15);
    }

    #[test]
    fn test_bloodied() {
        let mut wolf = Combatant::npc("wolf", "Wolf", 1, ScoreSet::default(), 10);
        assert!(!wolf.is_bloodied());
        wolf.take_damage(5);
        assert!(wolf.is_bloodied());
    }

    #[test]
    fn test_combatant_json_roundtrip_refreshes() {
        let hero = Combatant::player("p1", "Aria", 3, ScoreSet::new(10, 14, 12, 10, 10, 10), 24);
        let json = serde_json::to_string(&hero).unwrap();
        let mut back: Combatant = serde_json::from_str(&json).unwrap();
        back.refresh();
        assert_eq!(back.max_hp(), 24);
        assert_eq!(back.hp(), 24);
        assert_eq!(back.armor_class(), 12);
    }

    #[test]
    fn test_roster() {
        let mut roster = Roster::new();
        roster.insert(Combatant::npc("rat", "Rat", 1, ScoreSet::default(), 4));
        assert!(roster.contains("rat"));
        assert!(roster.is_alive("rat"));
        assert_eq!(roster.name_of("rat"), "Rat");
        assert_eq!(roster.name_of("ghost"), "ghost");
        assert_eq!(roster.ids(), vec!["rat".to_string()]);
        roster.get_mut("rat").unwrap().take_damage(4);
        assert!(!roster.is_alive("rat"));
    }
}
