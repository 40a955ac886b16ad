//! The character aggregate.
//!
//! Holds attributes, level, hit points, items, the ability roster, the live
//! active effects, the combat log and the turn counter. Rules operations never
//! mutate a character in place from the outside; they clone a snapshot and
//! return the new one (see [`crate::lifecycle`]).

use crate::abilities::{Ability, AbilityKind, ActiveEffect};
use crate::combat_log::CombatLog;
use crate::ids::{AbilityId, CharacterId, ItemId};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Attributes
// ============================================================================

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 30;
pub const MAX_LEVEL: u8 = 20;

/// The six attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Attribute {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Attribute::Strength => "STR",
            Attribute::Dexterity => "DEX",
            Attribute::Constitution => "CON",
            Attribute::Intelligence => "INT",
            Attribute::Wisdom => "WIS",
            Attribute::Charisma => "CHA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Strength => "Strength",
            Attribute::Dexterity => "Dexterity",
            Attribute::Constitution => "Constitution",
            Attribute::Intelligence => "Intelligence",
            Attribute::Wisdom => "Wisdom",
            Attribute::Charisma => "Charisma",
        }
    }

    /// Placeholder used in item formulas, e.g. `@STR`.
    pub fn placeholder(&self) -> String {
        format!("@{}", self.abbreviation())
    }

    pub fn all() -> [Attribute; 6] {
        [
            Attribute::Strength,
            Attribute::Dexterity,
            Attribute::Constitution,
            Attribute::Intelligence,
            Attribute::Wisdom,
            Attribute::Charisma,
        ]
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// `floor((score - 10) / 2)`.
pub fn attribute_modifier(score: u8) -> i8 {
    // score 8-9 = -1, 10-11 = 0, 12-13 = +1
    (i16::from(score) - 10).div_euclid(2) as i8
}

/// Proficiency bonus by level. Levels outside 1..=20 get the lowest bonus.
pub fn proficiency_for_level(level: u8) -> i8 {
    match level {
        1..=4 => 2,
        5..=8 => 3,
        9..=12 => 4,
        13..=16 => 5,
        17..=20 => 6,
        _ => 2,
    }
}

/// Attribute scores. Modifiers are always derived from the score on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    strength: u8,
    dexterity: u8,
    constitution: u8,
    intelligence: u8,
    wisdom: u8,
    charisma: u8,
}

impl Attributes {
    /// Scores are clamped into `1..=30`.
    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        let mut attributes = Self::default();
        for (attribute, score) in Attribute::all().into_iter().zip([str, dex, con, int, wis, cha]) {
            attributes.set(attribute, score);
        }
        attributes
    }

    pub fn get(&self, attribute: Attribute) -> u8 {
        match attribute {
            Attribute::Strength => self.strength,
            Attribute::Dexterity => self.dexterity,
            Attribute::Constitution => self.constitution,
            Attribute::Intelligence => self.intelligence,
            Attribute::Wisdom => self.wisdom,
            Attribute::Charisma => self.charisma,
        }
    }

    /// Set a score, clamped into `1..=30`.
    pub fn set(&mut self, attribute: Attribute, score: u8) {
        let score = score.clamp(MIN_SCORE, MAX_SCORE);
        match attribute {
            Attribute::Strength => self.strength = score,
            Attribute::Dexterity => self.dexterity = score,
            Attribute::Constitution => self.constitution = score,
            Attribute::Intelligence => self.intelligence = score,
            Attribute::Wisdom => self.wisdom = score,
            Attribute::Charisma => self.charisma = score,
        }
    }

    pub fn modifier(&self, attribute: Attribute) -> i8 {
        attribute_modifier(self.get(attribute))
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

// ============================================================================
// Hit Points
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    pub current: i32,
    pub maximum: i32,
    pub temporary: i32,
}

impl HitPoints {
    pub fn new(maximum: i32) -> Self {
        Self {
            current: maximum,
            maximum,
            temporary: 0,
        }
    }

    /// Temporary HP absorbs damage first; current HP stops at 0.
    pub fn take_damage(&mut self, amount: i32) -> DamageResult {
        let mut remaining = amount.max(0);

        if self.temporary > 0 {
            let absorbed = remaining.min(self.temporary);
            self.temporary -= absorbed;
            remaining -= absorbed;
        }

        self.current = (self.current - remaining).max(0);
        DamageResult {
            damage_taken: amount.max(0),
            dropped_to_zero: self.current == 0,
        }
    }

    /// Returns the amount actually healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let old = self.current;
        self.current = (self.current + amount.max(0)).min(self.maximum);
        self.current - old
    }

    /// Temporary HP does not stack; the larger value wins.
    pub fn add_temp_hp(&mut self, amount: i32) {
        self.temporary = self.temporary.max(amount);
    }

    pub fn set_current(&mut self, value: i32) {
        self.current = value.clamp(0, self.maximum);
    }

    pub fn restore(&mut self) {
        self.current = self.maximum;
        self.temporary = 0;
    }

    pub fn is_down(&self) -> bool {
        self.current <= 0
    }
}

impl Default for HitPoints {
    fn default() -> Self {
        Self::new(10)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageResult {
    pub damage_taken: i32,
    pub dropped_to_zero: bool,
}

// ============================================================================
// Classes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterClass {
    Barbarian,
    Bard,
    Cleric,
    Druid,
    Fighter,
    Monk,
    Paladin,
    Ranger,
    Rogue,
    Sorcerer,
    Warlock,
    Wizard,
}

impl CharacterClass {
    pub fn name(&self) -> &'static str {
        match self {
            CharacterClass::Barbarian => "Barbarian",
            CharacterClass::Bard => "Bard",
            CharacterClass::Cleric => "Cleric",
            CharacterClass::Druid => "Druid",
            CharacterClass::Fighter => "Fighter",
            CharacterClass::Monk => "Monk",
            CharacterClass::Paladin => "Paladin",
            CharacterClass::Ranger => "Ranger",
            CharacterClass::Rogue => "Rogue",
            CharacterClass::Sorcerer => "Sorcerer",
            CharacterClass::Warlock => "Warlock",
            CharacterClass::Wizard => "Wizard",
        }
    }

    /// Sheet layout suggested for the class.
    pub fn suggested_template(&self) -> SheetTemplate {
        match self {
            CharacterClass::Barbarian
            | CharacterClass::Fighter
            | CharacterClass::Rogue
            | CharacterClass::Monk => SheetTemplate::Martial,
            CharacterClass::Wizard
            | CharacterClass::Sorcerer
            | CharacterClass::Cleric
            | CharacterClass::Druid
            | CharacterClass::Warlock => SheetTemplate::Caster,
            CharacterClass::Bard | CharacterClass::Paladin | CharacterClass::Ranger => {
                SheetTemplate::Hybrid
            }
        }
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetTemplate {
    Martial,
    Caster,
    Hybrid,
    Custom,
}

// ============================================================================
// Items
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Weapon,
    Armor,
    Consumable,
    Tool,
    Misc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Attack,
    Spell,
    Utility,
}

/// What an item does when used. Formulas may contain `@STR`-style
/// placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAction {
    pub kind: ActionKind,
    #[serde(default)]
    pub attack_roll: Option<String>,
    #[serde(default)]
    pub damage_roll: Option<String>,
    #[serde(default)]
    pub damage_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub action: Option<ItemAction>,
    #[serde(default)]
    pub equipped: bool,
}

impl Item {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            kind,
            tags: Vec::new(),
            action: None,
            equipped: false,
        }
    }

    /// A weapon with an attack action.
    pub fn weapon(
        name: impl Into<String>,
        attack_roll: impl Into<String>,
        damage_roll: impl Into<String>,
        damage_type: impl Into<String>,
    ) -> Self {
        let mut item = Self::new(name, ItemKind::Weapon);
        item.action = Some(ItemAction {
            kind: ActionKind::Attack,
            attack_roll: Some(attack_roll.into()),
            damage_roll: Some(damage_roll.into()),
            damage_type: Some(damage_type.into()),
        });
        item.tags.push("weapon".to_string());
        item
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn equipped(mut self) -> Self {
        self.equipped = true;
        self
    }

    pub fn attack_roll(&self) -> Option<&str> {
        self.action.as_ref().and_then(|a| a.attack_roll.as_deref())
    }

    pub fn damage_roll(&self) -> Option<&str> {
        self.action.as_ref().and_then(|a| a.damage_roll.as_deref())
    }

    pub fn damage_type(&self) -> Option<&str> {
        self.action.as_ref().and_then(|a| a.damage_type.as_deref())
    }

    /// Tags an attack with this item emits: the item's tags plus the action
    /// kind.
    pub fn action_tags(&self) -> Vec<String> {
        let mut tags = self.tags.clone();
        if let Some(action) = &self.action {
            let kind = match action.kind {
                ActionKind::Attack => "attack",
                ActionKind::Spell => "spell",
                ActionKind::Utility => "utility",
            };
            if !tags.iter().any(|t| t == kind) {
                tags.push(kind.to_string());
            }
        }
        tags
    }
}

// ============================================================================
// Preferences
// ============================================================================

/// Whether dice are rolled by the engine or entered from physical dice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiceEntry {
    #[default]
    Virtual,
    Manual,
}

/// What happens to the combat log on a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogRetention {
    #[default]
    Keep,
    ClearOnRest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub dice_entry: DiceEntry,
    #[serde(default = "default_true")]
    pub auto_advance_to_damage: bool,
    #[serde(default = "default_true")]
    pub confirm_hit: bool,
    #[serde(default)]
    pub log_retention: LogRetention,
}

fn default_true() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            dice_entry: DiceEntry::Virtual,
            auto_advance_to_damage: true,
            confirm_hit: true,
            log_retention: LogRetention::Keep,
        }
    }
}

// ============================================================================
// Character
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub class: CharacterClass,
    pub template: SheetTemplate,
    /// Use [`Character::set_level`] to keep it within 1..=20.
    pub level: u8,
    pub attributes: Attributes,
    pub hit_points: HitPoints,
    pub items: Vec<Item>,
    pub abilities: Vec<Ability>,
    pub active_effects: Vec<ActiveEffect>,
    pub combat_log: CombatLog,
    /// Turns elapsed since the last rest.
    pub turn: u32,
    pub preferences: Preferences,
}

impl Character {
    pub fn new(name: impl Into<String>, class: CharacterClass) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            class,
            template: class.suggested_template(),
            level: 1,
            attributes: Attributes::default(),
            hit_points: HitPoints::default(),
            items: Vec::new(),
            abilities: Vec::new(),
            active_effects: Vec::new(),
            combat_log: CombatLog::new(),
            turn: 0,
            preferences: Preferences::default(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.set_level(level);
        self
    }

    pub fn with_hit_points(mut self, maximum: i32) -> Self {
        self.hit_points = HitPoints::new(maximum);
        self
    }

    /// Level is clamped into 1..=20.
    pub fn set_level(&mut self, level: u8) {
        self.level = level.clamp(1, MAX_LEVEL);
    }

    pub fn proficiency_bonus(&self) -> i8 {
        proficiency_for_level(self.level)
    }

    pub fn modifier(&self, attribute: Attribute) -> i8 {
        self.attributes.modifier(attribute)
    }

    pub fn set_attribute(&mut self, attribute: Attribute, score: u8) {
        self.attributes.set(attribute, score);
    }

    pub fn ability(&self, id: AbilityId) -> Option<&Ability> {
        self.abilities.iter().find(|a| a.id == id)
    }

    pub fn ability_by_name(&self, name: &str) -> Option<&Ability> {
        self.abilities
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn ability_mut(&mut self, id: AbilityId) -> Option<&mut Ability> {
        self.abilities.iter_mut().find(|a| a.id == id)
    }

    pub fn active_effect_for(&self, source: AbilityId) -> Option<&ActiveEffect> {
        self.active_effects.iter().find(|e| e.source_id == source)
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn add_item(&mut self, item: Item) -> ItemId {
        let id = item.id;
        self.items.push(item);
        id
    }

    pub fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        let index = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(index))
    }

    /// Check that ability and active-effect state agree.
    ///
    /// Every active duration ability has exactly one effect with the same
    /// countdown, and no effect exists without an active source.
    pub fn effects_consistent(&self) -> bool {
        let abilities_ok = self
            .abilities
            .iter()
            .filter(|a| a.kind == AbilityKind::Duration && a.active)
            .all(|a| {
                let mut matching = self.active_effects.iter().filter(|e| e.source_id == a.id);
                match (matching.next(), matching.next()) {
                    (Some(effect), None) => effect.duration.current == a.turns_remaining(),
                    _ => false,
                }
            });

        let effects_ok = self.active_effects.iter().all(|e| {
            self.ability(e.source_id)
                .map(|a| a.active)
                .unwrap_or(false)
        });

        abilities_ok && effects_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_modifier() {
        assert_eq!(attribute_modifier(1), -5);
        assert_eq!(attribute_modifier(8), -1);
        assert_eq!(attribute_modifier(9), -1);
        assert_eq!(attribute_modifier(10), 0);
        assert_eq!(attribute_modifier(11), 0);
        assert_eq!(attribute_modifier(16), 3);
        assert_eq!(attribute_modifier(30), 10);
    }

    #[test]
    fn test_scores_clamped() {
        let mut attributes = Attributes::default();
        attributes.set(Attribute::Strength, 0);
        assert_eq!(attributes.get(Attribute::Strength), 1);
        attributes.set(Attribute::Strength, 45);
        assert_eq!(attributes.get(Attribute::Strength), 30);
        assert_eq!(attributes.modifier(Attribute::Strength), 10);
    }

    #[test]
    fn test_modifier_follows_score() {
        let mut character = Character::new("Roland", CharacterClass::Fighter);
        assert_eq!(character.modifier(Attribute::Strength), 0);
        character.set_attribute(Attribute::Strength, 17);
        assert_eq!(character.modifier(Attribute::Strength), 3);
    }

    #[test]
    fn test_proficiency_table() {
        assert_eq!(proficiency_for_level(1), 2);
        assert_eq!(proficiency_for_level(4), 2);
        assert_eq!(proficiency_for_level(5), 3);
        assert_eq!(proficiency_for_level(9), 4);
        assert_eq!(proficiency_for_level(13), 5);
        assert_eq!(proficiency_for_level(20), 6);
        assert_eq!(proficiency_for_level(0), 2);
        assert_eq!(proficiency_for_level(25), 2);
    }

    #[test]
    fn test_set_level_updates_proficiency() {
        let mut character = Character::new("Roland", CharacterClass::Fighter);
        assert_eq!(character.proficiency_bonus(), 2);
        character.set_level(9);
        assert_eq!(character.proficiency_bonus(), 4);
        character.set_level(40);
        assert_eq!(character.level, 20);
        assert_eq!(character.proficiency_bonus(), 6);
    }

    #[test]
    fn test_temp_hp_absorbs_first() {
        let mut hp = HitPoints::new(20);
        hp.add_temp_hp(5);
        hp.add_temp_hp(3);
        assert_eq!(hp.temporary, 5);

        let result = hp.take_damage(8);
        assert_eq!(hp.temporary, 0);
        assert_eq!(hp.current, 17);
        assert!(!result.dropped_to_zero);

        let result = hp.take_damage(50);
        assert_eq!(hp.current, 0);
        assert!(result.dropped_to_zero);
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut hp = HitPoints::new(20);
        hp.set_current(15);
        assert_eq!(hp.heal(10), 5);
        assert_eq!(hp.current, 20);
    }

    #[test]
    fn test_new_character_defaults() {
        let character = Character::new("Roland", CharacterClass::Fighter);
        assert_eq!(character.hit_points, HitPoints::new(10));
        assert_eq!(character.template, SheetTemplate::Martial);
        assert!(character.abilities.is_empty());
        assert!(character.combat_log.is_empty());
        assert_eq!(character.turn, 0);
        assert!(character.effects_consistent());
    }

    #[test]
    fn test_item_action_tags() {
        let sword = Item::weapon("Longsword", "1d20+@STR", "1d8+@STR", "slashing")
            .with_tags(["sword", "melee"]);
        assert_eq!(sword.action_tags(), vec!["weapon", "sword", "melee", "attack"]);
        assert_eq!(sword.damage_roll(), Some("1d8+@STR"));
    }

    #[test]
    fn test_items_add_remove() {
        let mut character = Character::new("Roland", CharacterClass::Fighter);
        let id = character.add_item(Item::new("Rope", ItemKind::Misc));
        assert!(character.item(id).is_some());
        assert_eq!(character.remove_item(id).map(|i| i.name), Some("Rope".to_string()));
        assert!(character.remove_item(id).is_none());
    }
}
