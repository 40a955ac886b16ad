//! Ability records and their effect payloads.
//!
//! An ability is one of three kinds:
//! - `Passive`: always on, no resources.
//! - `Instant`: spends one use per activation (Action Surge, Second Wind).
//! - `Duration`: spends one use to become active for a number of turns (Rage).
//!
//! State transitions live in [`crate::lifecycle`]; this module only holds the
//! data and the precondition check.

use crate::ids::{AbilityId, EffectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The three ability kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbilityKind {
    Passive,
    Instant,
    Duration,
}

impl AbilityKind {
    pub fn name(&self) -> &'static str {
        match self {
            AbilityKind::Passive => "passive",
            AbilityKind::Instant => "instant",
            AbilityKind::Duration => "duration",
        }
    }
}

impl fmt::Display for AbilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The rest category that restores an ability's uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recharge {
    ShortRest,
    #[default]
    LongRest,
    Dawn,
    Manual,
}

/// A bounded counter: `current` always stays within `0..=max`.
///
/// Deserializing clamps an overfull `current` down to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredPool")]
pub struct Pool {
    pub current: u32,
    pub max: u32,
}

#[derive(Deserialize)]
struct StoredPool {
    current: u32,
    max: u32,
}

impl From<StoredPool> for Pool {
    fn from(stored: StoredPool) -> Self {
        Self {
            current: stored.current.min(stored.max),
            max: stored.max,
        }
    }
}

impl Pool {
    pub fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn empty(max: u32) -> Self {
        Self { current: 0, max }
    }

    pub fn is_empty(&self) -> bool {
        self.current == 0
    }

    /// Set `current`, clamped into `0..=max`.
    pub fn set(&mut self, value: u32) {
        self.current = value.min(self.max);
    }

    /// Take one from the pool. Returns false when it was already empty.
    pub fn spend(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    pub fn refill(&mut self) {
        self.current = self.max;
    }

    pub fn drain(&mut self) {
        self.current = 0;
    }
}

/// Extra damage granted by an effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DamageBonus {
    /// Dice notation such as `1d4`.
    Dice { notation: String },
    Flat { value: i32 },
}

impl DamageBonus {
    pub fn dice(notation: impl Into<String>) -> Self {
        DamageBonus::Dice {
            notation: notation.into(),
        }
    }

    pub fn flat(value: i32) -> Self {
        DamageBonus::Flat { value }
    }
}

impl fmt::Display for DamageBonus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DamageBonus::Dice { notation } => write!(f, "{notation}"),
            DamageBonus::Flat { value } => write!(f, "{value:+}"),
        }
    }
}

/// What an ability does once it applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityEffect {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub damage_bonus: Option<DamageBonus>,
    #[serde(default)]
    pub damage_type: Option<String>,
    #[serde(default)]
    pub attack_bonus: Option<i32>,
    #[serde(default)]
    pub resistances: Vec<String>,
}

impl AbilityEffect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_damage_bonus(mut self, bonus: DamageBonus) -> Self {
        self.damage_bonus = Some(bonus);
        self
    }

    pub fn with_damage_type(mut self, damage_type: impl Into<String>) -> Self {
        self.damage_type = Some(damage_type.into());
        self
    }

    pub fn with_attack_bonus(mut self, bonus: i32) -> Self {
        self.attack_bonus = Some(bonus);
        self
    }

    pub fn with_resistance(mut self, damage_type: impl Into<String>) -> Self {
        self.resistances.push(damage_type.into());
        self
    }
}

/// A class ability on a character's roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub id: AbilityId,
    pub name: String,
    pub kind: AbilityKind,
    /// Descriptive tags the ability itself carries.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Action tags that make this ability applicable.
    #[serde(default)]
    pub trigger: Vec<String>,
    #[serde(default)]
    pub recharge: Recharge,
    #[serde(default)]
    pub uses: Option<Pool>,
    /// Turns remaining / total. Only meaningful for duration abilities.
    #[serde(default)]
    pub duration: Option<Pool>,
    /// Only meaningful for duration abilities.
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub effect: Option<AbilityEffect>,
}

impl Ability {
    fn new(name: impl Into<String>, kind: AbilityKind) -> Self {
        Self {
            id: AbilityId::new(),
            name: name.into(),
            kind,
            tags: Vec::new(),
            trigger: Vec::new(),
            recharge: Recharge::default(),
            uses: None,
            duration: None,
            active: false,
            effect: None,
        }
    }

    pub fn passive(name: impl Into<String>) -> Self {
        Self::new(name, AbilityKind::Passive)
    }

    pub fn instant(name: impl Into<String>, uses: u32) -> Self {
        let mut ability = Self::new(name, AbilityKind::Instant);
        ability.uses = Some(Pool::full(uses));
        ability
    }

    pub fn duration(name: impl Into<String>, uses: u32, turns: u32) -> Self {
        let mut ability = Self::new(name, AbilityKind::Duration);
        ability.uses = Some(Pool::full(uses));
        ability.duration = Some(Pool::empty(turns));
        ability
    }

    pub fn with_trigger<I, S>(mut self, trigger: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trigger = trigger.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_recharge(mut self, recharge: Recharge) -> Self {
        self.recharge = recharge;
        self
    }

    pub fn with_effect(mut self, effect: AbilityEffect) -> Self {
        self.effect = Some(effect);
        self
    }

    /// Remove the use limit.
    pub fn unlimited(mut self) -> Self {
        self.uses = None;
        self
    }

    /// Uses left, or `None` for unlimited abilities.
    pub fn uses_remaining(&self) -> Option<u32> {
        self.uses.map(|u| u.current)
    }

    pub fn turns_remaining(&self) -> u32 {
        self.duration.map(|d| d.current).unwrap_or(0)
    }

    fn out_of_uses(&self) -> bool {
        self.uses.map(|u| u.is_empty()).unwrap_or(false)
    }

    /// Return the ability to its freshly granted state.
    pub(crate) fn reset_fresh(&mut self) {
        self.active = false;
        if let Some(uses) = self.uses.as_mut() {
            uses.refill();
        }
        if let Some(duration) = self.duration.as_mut() {
            duration.drain();
        }
    }
}

/// A live, time-boxed copy of a duration ability's effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub id: EffectId,
    pub source_id: AbilityId,
    pub name: String,
    pub duration: Pool,
    pub effect: Option<AbilityEffect>,
}

impl ActiveEffect {
    /// Materialise the effect of a freshly activated ability.
    pub fn from_ability(ability: &Ability) -> Self {
        let max = ability.duration.map(|d| d.max).unwrap_or(0);
        Self {
            id: EffectId::new(),
            source_id: ability.id,
            name: ability.name.clone(),
            duration: Pool::full(max),
            effect: ability.effect.clone(),
        }
    }
}

/// Why an ability could not be used or toggled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("No ability with id {0}")]
    AbilityNotFound(AbilityId),

    #[error("{name} is a {actual} ability, expected {expected}")]
    WrongKind {
        name: String,
        expected: AbilityKind,
        actual: AbilityKind,
    },

    #[error("{name} has no uses left")]
    NoUsesLeft { name: String },

    #[error("{name} is already active")]
    AlreadyActive { name: String },

    #[error("{name} is not active")]
    NotActive { name: String },
}

/// Check whether an ability can be used right now.
///
/// Instant abilities need a use left; duration abilities additionally must
/// not be active already. Passives are always usable.
pub fn validate_ability_usage(ability: &Ability) -> Result<(), UsageError> {
    match ability.kind {
        AbilityKind::Passive => Ok(()),
        AbilityKind::Instant => {
            if ability.out_of_uses() {
                Err(UsageError::NoUsesLeft {
                    name: ability.name.clone(),
                })
            } else {
                Ok(())
            }
        }
        AbilityKind::Duration => {
            if ability.active {
                Err(UsageError::AlreadyActive {
                    name: ability.name.clone(),
                })
            } else if ability.out_of_uses() {
                Err(UsageError::NoUsesLeft {
                    name: ability.name.clone(),
                })
            } else {
                Ok(())
            }
        }
    }
}
