//! Attack and damage modifier resolution.
//!
//! Fuses a character's attributes and proficiency with the effects of the
//! abilities that apply to an action, producing the formulas the dice engine
//! rolls. Nothing here rolls dice or changes state.

use crate::abilities::{Ability, DamageBonus};
use crate::character::{Attribute, Character, Item};
use serde::{Deserialize, Serialize};

/// Damage type used when an item does not name one.
pub const DEFAULT_DAMAGE_TYPE: &str = "slashing";

/// Bucket for damage entries without a type.
pub const UNTYPED_DAMAGE: &str = "physical";

/// One contribution to an attack bonus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusSource {
    pub source: String,
    pub value: i32,
}

/// Everything added to the d20 of an attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackModifiers {
    pub attribute: Attribute,
    pub attribute_mod: i32,
    pub proficiency: i32,
    pub effects_bonus: i32,
    pub effects_breakdown: Vec<BonusSource>,
    pub total: i32,
}

impl AttackModifiers {
    /// The attack roll as a formula, e.g. `1d20+7`.
    pub fn formula(&self) -> String {
        if self.total == 0 {
            "1d20".to_string()
        } else {
            format!("1d20{:+}", self.total)
        }
    }
}

/// One source of damage: the item itself or an effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageSource {
    pub source: String,
    pub formula: String,
    /// `None` means the effect did not name a type.
    pub damage_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageResolution {
    /// Base formula with placeholders substituted, plus the effect aggregate.
    pub formula: String,
    pub base_type: String,
    /// Base item first, then each contributing effect.
    pub breakdown: Vec<DamageSource>,
    pub attribute: Attribute,
    pub attribute_mod: i32,
}

/// Combined damage bonus of a set of effects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageBonusAggregate {
    pub dice: Vec<String>,
    pub flat: i32,
    pub breakdown: Vec<DamageSource>,
}

impl DamageBonusAggregate {
    pub fn is_empty(&self) -> bool {
        self.dice.is_empty() && self.flat == 0
    }

    /// Dice joined with ` + `, then the flat total, e.g. `1d4 + 2d6 + 2`.
    /// Empty when there is no bonus.
    pub fn formula(&self) -> String {
        let mut formula = self.dice.join(" + ");
        match (formula.is_empty(), self.flat) {
            (_, 0) => {}
            (true, flat) => formula = flat.to_string(),
            (false, flat) if flat > 0 => formula.push_str(&format!(" + {flat}")),
            (false, flat) => formula.push_str(&format!(" - {}", flat.unsigned_abs())),
        }
        formula
    }
}

/// Damage bonus of the given effects. Abilities without a damage bonus are
/// skipped.
pub fn damage_bonus(effects: &[&Ability]) -> DamageBonusAggregate {
    let mut aggregate = DamageBonusAggregate::default();

    for ability in effects {
        let Some(effect) = &ability.effect else {
            continue;
        };
        let Some(bonus) = &effect.damage_bonus else {
            continue;
        };

        let formula = match bonus {
            DamageBonus::Dice { notation } => {
                aggregate.dice.push(notation.clone());
                notation.clone()
            }
            DamageBonus::Flat { value } => {
                aggregate.flat += value;
                value.to_string()
            }
        };
        aggregate.breakdown.push(DamageSource {
            source: ability.name.clone(),
            formula,
            damage_type: effect.damage_type.clone(),
        });
    }

    aggregate
}

/// Sum of the attack bonuses of the given effects.
pub fn attack_bonus(effects: &[&Ability]) -> (i32, Vec<BonusSource>) {
    let breakdown: Vec<BonusSource> = effects
        .iter()
        .filter_map(|ability| {
            let value = ability.effect.as_ref()?.attack_bonus?;
            Some(BonusSource {
                source: ability.name.clone(),
                value,
            })
        })
        .collect();
    let total = breakdown.iter().map(|b| b.value).sum();
    (total, breakdown)
}

fn governing_attribute(formula: Option<&str>) -> Attribute {
    match formula {
        Some(f) if f.contains("@DEX") => Attribute::Dexterity,
        _ => Attribute::Strength,
    }
}

fn attribute_for_placeholder(name: &str) -> Option<Attribute> {
    Attribute::all()
        .into_iter()
        .find(|a| a.abbreviation() == name)
}

/// Replace every `@STR`-style placeholder with the character's modifier.
///
/// A sign directly before the placeholder is folded into the value, so
/// `1d8+@STR` with a -1 modifier becomes `1d8-1`. Unknown placeholders are
/// left as they are.
pub fn substitute_attributes(formula: &str, character: &Character) -> String {
    let mut out = String::with_capacity(formula.len());
    let mut rest = formula;

    while let Some(at) = rest.find('@') {
        out.push_str(&rest[..at]);
        let after = &rest[at + 1..];
        let name_len = after
            .find(|c: char| !c.is_ascii_uppercase())
            .unwrap_or(after.len());

        match attribute_for_placeholder(&after[..name_len]) {
            Some(attribute) => {
                let value = i32::from(character.modifier(attribute));
                let trimmed = out.trim_end().len();
                let sign = out[..trimmed].chars().last().filter(|c| *c == '+' || *c == '-');

                match sign {
                    Some(sign) => {
                        out.truncate(trimmed - 1);
                        let negative = (sign == '-') != (value < 0);
                        out.push(if negative { '-' } else { '+' });
                        out.push_str(&value.unsigned_abs().to_string());
                    }
                    None => out.push_str(&value.to_string()),
                }
                rest = &after[name_len..];
            }
            None => {
                out.push('@');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Attack bonus for an item: governing attribute (DEX if the attack formula
/// uses `@DEX`, STR otherwise), proficiency and effect bonuses.
pub fn resolve_attack_modifiers(
    item: &Item,
    character: &Character,
    selected: &[&Ability],
) -> AttackModifiers {
    let attribute = governing_attribute(item.attack_roll());
    let attribute_mod = i32::from(character.modifier(attribute));
    let proficiency = i32::from(character.proficiency_bonus());
    let (effects_bonus, effects_breakdown) = attack_bonus(selected);

    let modifiers = AttackModifiers {
        attribute,
        attribute_mod,
        proficiency,
        effects_bonus,
        effects_breakdown,
        total: attribute_mod + proficiency + effects_bonus,
    };
    tracing::debug!(
        item = %item.name,
        attribute = %attribute,
        total = modifiers.total,
        "resolved attack modifiers"
    );
    modifiers
}

/// Damage formula for an item with the selected effects folded in.
pub fn resolve_damage_modifiers(
    item: &Item,
    character: &Character,
    selected: &[&Ability],
) -> DamageResolution {
    let base = item.damage_roll().unwrap_or("0");
    let base_type = item
        .damage_type()
        .unwrap_or(DEFAULT_DAMAGE_TYPE)
        .to_string();
    let attribute = governing_attribute(Some(base));
    let attribute_mod = i32::from(character.modifier(attribute));

    let base_formula = substitute_attributes(base, character);
    let bonus = damage_bonus(selected);

    let mut formula = base_formula.clone();
    let suffix = bonus.formula();
    if let Some(negative) = suffix.strip_prefix('-') {
        formula.push_str(&format!(" - {negative}"));
    } else if !suffix.is_empty() {
        formula.push_str(&format!(" + {suffix}"));
    }

    let mut breakdown = Vec::with_capacity(bonus.breakdown.len() + 1);
    breakdown.push(DamageSource {
        source: item.name.clone(),
        formula: base_formula,
        damage_type: Some(base_type.clone()),
    });
    breakdown.extend(bonus.breakdown);

    tracing::debug!(item = %item.name, formula = %formula, "resolved damage formula");
    DamageResolution {
        formula,
        base_type,
        breakdown,
        attribute,
        attribute_mod,
    }
}

/// Damage sources that share a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageGroup<'a> {
    pub damage_type: String,
    pub sources: Vec<&'a DamageSource>,
}

/// Bucket a breakdown by damage type in first-seen order. Untyped sources go
/// to `physical`.
pub fn group_damage_by_type(breakdown: &[DamageSource]) -> Vec<DamageGroup<'_>> {
    let mut groups: Vec<DamageGroup<'_>> = Vec::new();
    for source in breakdown {
        let damage_type = source.damage_type.as_deref().unwrap_or(UNTYPED_DAMAGE);
        match groups.iter_mut().find(|g| g.damage_type == damage_type) {
            Some(group) => group.sources.push(source),
            None => groups.push(DamageGroup {
                damage_type: damage_type.to_string(),
                sources: vec![source],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::AbilityEffect;
    use crate::character::{Attributes, CharacterClass};

    fn fighter() -> Character {
        // STR 16 (+3), DEX 14 (+2)
        Character::new("Roland", CharacterClass::Fighter)
            .with_attributes(Attributes::new(16, 14, 14, 10, 12, 8))
    }

    fn longsword() -> Item {
        Item::weapon("Longsword", "1d20+@STR", "1d8+@STR", "slashing").with_tags(["sword"])
    }

    fn mastery() -> Ability {
        Ability::passive("Sword Mastery").with_trigger(["sword"]).with_effect(
            AbilityEffect::new()
                .with_damage_bonus(DamageBonus::dice("1d4"))
                .with_attack_bonus(1),
        )
    }

    fn rage() -> Ability {
        Ability::duration("Rage", 2, 10)
            .with_effect(AbilityEffect::new().with_damage_bonus(DamageBonus::flat(2)))
    }

    #[test]
    fn test_damage_with_dice_effect() {
        let character = fighter();
        let mastery = mastery();
        let resolution = resolve_damage_modifiers(&longsword(), &character, &[&mastery]);
        assert_eq!(resolution.formula, "1d8+3 + 1d4");
        assert_eq!(resolution.attribute, Attribute::Strength);
        assert_eq!(resolution.attribute_mod, 3);
        assert_eq!(resolution.base_type, "slashing");
        assert_eq!(resolution.breakdown.len(), 2);
        assert_eq!(resolution.breakdown[0].source, "Longsword");
        assert_eq!(resolution.breakdown[0].formula, "1d8+3");
        assert_eq!(resolution.breakdown[1].damage_type, None);
    }

    #[test]
    fn test_damage_mixed_bonuses() {
        let character = fighter();
        let (mastery, rage) = (mastery(), rage());
        let resolution = resolve_damage_modifiers(&longsword(), &character, &[&mastery, &rage]);
        assert_eq!(resolution.formula, "1d8+3 + 1d4 + 2");
    }

    #[test]
    fn test_damage_defaults() {
        let character = fighter();
        let club = Item::new("Club", crate::character::ItemKind::Weapon);
        let resolution = resolve_damage_modifiers(&club, &character, &[]);
        assert_eq!(resolution.formula, "0");
        assert_eq!(resolution.base_type, DEFAULT_DAMAGE_TYPE);
    }

    #[test]
    fn test_substitute_every_placeholder() {
        let character = fighter();
        assert_eq!(substitute_attributes("1d6+@DEX+@DEX", &character), "1d6+2+2");
        assert_eq!(substitute_attributes("@STR", &character), "3");
        assert_eq!(substitute_attributes("1d4+@FOO", &character), "1d4+@FOO");
    }

    #[test]
    fn test_substitute_folds_negative_modifier() {
        let character = fighter();
        assert_eq!(substitute_attributes("1d8+@CHA", &character), "1d8-1");
        assert_eq!(substitute_attributes("1d8 - @CHA", &character), "1d8 +1");
    }

    #[test]
    fn test_attack_modifiers() {
        let character = fighter();
        let mastery = mastery();
        let modifiers = resolve_attack_modifiers(&longsword(), &character, &[&mastery]);
        assert_eq!(modifiers.attribute, Attribute::Strength);
        assert_eq!(modifiers.attribute_mod, 3);
        assert_eq!(modifiers.proficiency, 2);
        assert_eq!(modifiers.effects_bonus, 1);
        assert_eq!(modifiers.total, 6);
        assert_eq!(modifiers.formula(), "1d20+6");
    }

    #[test]
    fn test_attack_uses_dex_for_finesse() {
        let character = fighter();
        let rapier = Item::weapon("Rapier", "1d20+@DEX", "1d8+@DEX", "piercing");
        let modifiers = resolve_attack_modifiers(&rapier, &character, &[]);
        assert_eq!(modifiers.attribute, Attribute::Dexterity);
        assert_eq!(modifiers.total, 4);
    }

    #[test]
    fn test_bonus_aggregate_formula() {
        let rage = rage();
        let weak = Ability::passive("Weakened")
            .with_effect(AbilityEffect::new().with_damage_bonus(DamageBonus::flat(-3)));

        assert_eq!(damage_bonus(&[&rage]).formula(), "2");
        assert_eq!(damage_bonus(&[&rage, &weak]).formula(), "-1");
        assert!(damage_bonus(&[]).is_empty());

        let mastery = mastery();
        assert_eq!(damage_bonus(&[&mastery, &weak]).formula(), "1d4 - 3");
    }

    #[test]
    fn test_group_damage_by_type() {
        let breakdown = vec![
            DamageSource {
                source: "Longsword".into(),
                formula: "1d8+3".into(),
                damage_type: Some("slashing".into()),
            },
            DamageSource {
                source: "Rage".into(),
                formula: "2".into(),
                damage_type: None,
            },
            DamageSource {
                source: "Flame Tongue".into(),
                formula: "2d6".into(),
                damage_type: Some("fire".into()),
            },
            DamageSource {
                source: "Sword Mastery".into(),
                formula: "1d4".into(),
                damage_type: Some("slashing".into()),
            },
        ];
        let groups = group_damage_by_type(&breakdown);
        let types: Vec<&str> = groups.iter().map(|g| g.damage_type.as_str()).collect();
        assert_eq!(types, vec!["slashing", "physical", "fire"]);
        assert_eq!(groups[0].sources.len(), 2);
    }
}
