//! Testing utilities for the rules engine.
//!
//! This module provides tools for deterministic tests:
//! - `ScriptedDice` to replay exact die results
//! - Sample characters and weapons
//! - Assertion helpers for ability and effect state

use crate::abilities::{Ability, AbilityEffect, DamageBonus, Recharge};
use crate::character::{Attributes, Character, CharacterClass, Item};
use crate::class_templates::new_character;
use crate::dice::DieSource;
use crate::lifecycle::add_ability;
use std::collections::VecDeque;

/// A die source that returns scripted results in order.
///
/// When the script runs out the last value repeats (1 if the script was
/// empty). Values are clamped into `1..=sides` for the die being rolled.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    script: VecDeque<u32>,
    last: Option<u32>,
    rolled: usize,
}

impl ScriptedDice {
    pub fn new(results: impl IntoIterator<Item = u32>) -> Self {
        Self {
            script: results.into_iter().collect(),
            last: None,
            rolled: 0,
        }
    }

    /// Queue another result.
    pub fn push(&mut self, value: u32) -> &mut Self {
        self.script.push_back(value);
        self
    }

    /// Results still queued.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Dice rolled so far.
    pub fn rolled(&self) -> usize {
        self.rolled
    }
}

impl DieSource for ScriptedDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        let value = match self.script.pop_front() {
            Some(value) => {
                self.last = Some(value);
                value
            }
            None => self.last.unwrap_or(1),
        };
        self.rolled += 1;
        value.clamp(1, sides.max(1))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Longsword using STR for attack and damage, tagged as a one-handed melee
/// sword.
pub fn longsword() -> Item {
    Item::weapon("Longsword", "1d20+@STR", "1d8+@STR", "slashing")
        .with_tags(["sword", "melee", "weapon.melee.one-handed"])
        .equipped()
}

/// Passive that adds 1d4 to sword damage.
pub fn sword_mastery() -> Ability {
    Ability::passive("Sword Mastery")
        .with_trigger(["sword"])
        .with_recharge(Recharge::Manual)
        .with_effect(AbilityEffect::new().with_damage_bonus(DamageBonus::dice("1d4")))
}

/// Level 1 fighter: STR 16, DEX 14, CON 14, 12 HP, a longsword and the
/// fighter roster plus Sword Mastery.
pub fn sample_fighter(name: &str) -> Character {
    let mut character = new_character(name, CharacterClass::Fighter)
        .with_attributes(Attributes::new(16, 14, 14, 10, 12, 8))
        .with_hit_points(12);
    character.add_item(longsword());
    add_ability(&character, sword_mastery()).0
}

/// Level 1 barbarian: STR 17, CON 16, 15 HP, a longsword and Rage.
pub fn sample_barbarian(name: &str) -> Character {
    let mut character = new_character(name, CharacterClass::Barbarian)
        .with_attributes(Attributes::new(17, 13, 16, 8, 12, 10))
        .with_hit_points(15);
    character.add_item(longsword());
    character
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert that abilities and active effects agree.
#[track_caller]
pub fn assert_effects_consistent(character: &Character) {
    assert!(
        character.effects_consistent(),
        "Abilities and active effects disagree: abilities={:?} effects={:?}",
        character.abilities,
        character.active_effects
    );
}

/// Assert the remaining uses of an ability, looked up by name.
#[track_caller]
pub fn assert_uses(character: &Character, ability: &str, expected: u32) {
    let actual = character
        .ability_by_name(ability)
        .and_then(|a| a.uses_remaining());
    assert_eq!(
        actual,
        Some(expected),
        "Expected {ability} to have {expected} uses left, got {actual:?}"
    );
}

/// Assert whether an ability, looked up by name, is active.
#[track_caller]
pub fn assert_active(character: &Character, ability: &str, expected: bool) {
    let actual = character.ability_by_name(ability).map(|a| a.active);
    assert_eq!(
        actual,
        Some(expected),
        "Expected {ability} active={expected}, got {actual:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::roll_with_rng;

    #[test]
    fn test_scripted_dice_in_order() {
        let mut dice = ScriptedDice::new([3, 5]);
        let result = roll_with_rng("2d6", &mut dice);
        assert_eq!(result.total, 8);
        assert_eq!(dice.remaining(), 0);
        assert_eq!(dice.rolled(), 2);
    }

    #[test]
    fn test_scripted_dice_repeats_last() {
        let mut dice = ScriptedDice::new([4]);
        assert_eq!(dice.roll_die(6), 4);
        assert_eq!(dice.roll_die(6), 4);

        let mut empty = ScriptedDice::default();
        assert_eq!(empty.roll_die(20), 1);
    }

    #[test]
    fn test_scripted_dice_clamps() {
        let mut dice = ScriptedDice::new([20, 0]);
        assert_eq!(dice.roll_die(8), 8);
        assert_eq!(dice.roll_die(8), 1);
    }

    #[test]
    fn test_sample_fighter() {
        let fighter = sample_fighter("Roland");
        assert_eq!(fighter.modifier(crate::character::Attribute::Strength), 3);
        assert_eq!(fighter.items.len(), 1);
        assert_uses(&fighter, "Second Wind", 1);
        assert!(fighter.ability_by_name("Sword Mastery").is_some());
        assert_effects_consistent(&fighter);
    }

    #[test]
    fn test_sample_barbarian() {
        let barbarian = sample_barbarian("Grog");
        assert_uses(&barbarian, "Rage", 2);
        assert_active(&barbarian, "Rage", false);
        assert_eq!(barbarian.hit_points.maximum, 15);
    }
}
