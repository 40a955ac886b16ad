//! Starting ability rosters for each class.
//!
//! Level 1 features (plus a couple of signature features a table usually wants
//! on the sheet from the start), expressed as abilities the tag matcher and
//! the lifecycle understand.

use crate::abilities::{Ability, AbilityEffect, DamageBonus, Recharge};
use crate::character::{Character, CharacterClass};
use crate::lifecycle::add_ability;

fn rage() -> Ability {
    Ability::duration("Rage", 2, 10)
        .with_tags(["barbarian", "bonus-action"])
        .with_trigger(["attack.melee", "melee"])
        .with_recharge(Recharge::LongRest)
        .with_effect(
            AbilityEffect::new()
                .with_description("Bonus rage damage and resistance to physical damage.")
                .with_damage_bonus(DamageBonus::flat(2))
                .with_resistance("bludgeoning")
                .with_resistance("piercing")
                .with_resistance("slashing"),
        )
}

fn second_wind() -> Ability {
    Ability::instant("Second Wind", 1)
        .with_tags(["fighter", "bonus-action", "healing"])
        .with_recharge(Recharge::ShortRest)
        .with_effect(
            AbilityEffect::new().with_description("Regain 1d10 + fighter level hit points."),
        )
}

fn action_surge() -> Ability {
    Ability::instant("Action Surge", 1)
        .with_tags(["fighter"])
        .with_recharge(Recharge::ShortRest)
        .with_effect(AbilityEffect::new().with_description("Take one additional action."))
}

impl CharacterClass {
    /// Abilities a new character of this class starts with.
    pub fn starting_abilities(&self) -> Vec<Ability> {
        match self {
            CharacterClass::Barbarian => vec![
                rage(),
                Ability::passive("Unarmored Defense")
                    .with_tags(["barbarian", "defense"])
                    .with_effect(
                        AbilityEffect::new().with_description(
                            "AC equals 10 + DEX modifier + CON modifier without armor.",
                        ),
                    ),
            ],
            CharacterClass::Bard => vec![Ability::instant("Bardic Inspiration", 3)
                .with_tags(["bard", "bonus-action"])
                .with_effect(
                    AbilityEffect::new().with_description("Give a creature a d6 inspiration die."),
                )],
            CharacterClass::Cleric => vec![Ability::instant("Channel Divinity", 1)
                .with_tags(["cleric"])
                .with_recharge(Recharge::ShortRest)
                .with_effect(
                    AbilityEffect::new().with_description("Turn Undead or a domain option."),
                )],
            CharacterClass::Druid => vec![Ability::duration("Wild Shape", 2, 10)
                .with_tags(["druid", "transformation"])
                .with_recharge(Recharge::ShortRest)],
            CharacterClass::Fighter => vec![
                second_wind(),
                action_surge(),
                Ability::passive("Fighting Style: Dueling")
                    .with_tags(["fighter", "fighting-style"])
                    .with_trigger(["weapon.melee.one-handed"])
                    .with_effect(AbilityEffect::new().with_damage_bonus(DamageBonus::flat(2))),
            ],
            CharacterClass::Monk => vec![
                Ability::instant("Ki", 2)
                    .with_tags(["monk", "resource"])
                    .with_recharge(Recharge::ShortRest),
                Ability::passive("Martial Arts")
                    .with_tags(["monk"])
                    .with_trigger(["unarmed", "monk-weapon"])
                    .with_effect(AbilityEffect::new().with_damage_bonus(DamageBonus::dice("1d4"))),
            ],
            CharacterClass::Paladin => vec![
                Ability::instant("Divine Smite", 2)
                    .with_tags(["paladin", "spell-slot"])
                    .with_trigger(["attack.melee", "melee"])
                    .with_effect(
                        AbilityEffect::new()
                            .with_damage_bonus(DamageBonus::dice("2d8"))
                            .with_damage_type("radiant"),
                    ),
                Ability::instant("Lay on Hands", 5)
                    .with_tags(["paladin", "healing"])
                    .with_effect(
                        AbilityEffect::new()
                            .with_description("Restore hit points from a pool of 5."),
                    ),
            ],
            CharacterClass::Ranger => vec![Ability::duration("Hunter's Mark", 2, 10)
                .with_tags(["ranger", "spell", "concentration"])
                .with_trigger(["attack", "weapon"])
                .with_effect(
                    AbilityEffect::new()
                        .with_damage_bonus(DamageBonus::dice("1d6"))
                        .with_damage_type("force"),
                )],
            CharacterClass::Rogue => vec![Ability::passive("Sneak Attack")
                .with_tags(["rogue"])
                .with_trigger(["finesse", "ranged"])
                .with_effect(AbilityEffect::new().with_damage_bonus(DamageBonus::dice("1d6")))],
            CharacterClass::Sorcerer => vec![Ability::instant("Font of Magic", 2)
                .with_tags(["sorcerer", "resource"])],
            CharacterClass::Warlock => vec![Ability::passive("Agonizing Blast")
                .with_tags(["warlock", "invocation"])
                .with_trigger(["eldritch-blast"])
                .with_effect(AbilityEffect::new().with_damage_bonus(DamageBonus::flat(3)))],
            CharacterClass::Wizard => vec![Ability::instant("Arcane Recovery", 1)
                .with_tags(["wizard", "spell-slot"])
                .with_effect(
                    AbilityEffect::new()
                        .with_description("Recover expended spell slots on a short rest."),
                )],
        }
    }
}

/// A new character with the class's starting roster already granted.
pub fn new_character(name: impl Into<String>, class: CharacterClass) -> Character {
    class
        .starting_abilities()
        .into_iter()
        .fold(Character::new(name, class), |character, ability| {
            add_ability(&character, ability).0
        })
}
