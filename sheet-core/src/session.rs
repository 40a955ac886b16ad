//! CharacterSession - the primary public API for playing a character sheet.
//!
//! Wraps the current character snapshot and a `SessionConfig`. Every rules
//! transition is computed on the current snapshot and the result swapped in,
//! so a rejected action leaves the session exactly as it was.

use crate::abilities::{Ability, UsageError};
use crate::character::{ActionKind, Character, DamageResult, LogRetention};
use crate::combat_log::{AttackRecord, CombatLogEntry, DamageByType, DamageRecord, LogEvent};
use crate::dice::{
    roll_d20_with_rng, D20Roll, DiceError, DieSource, ParsedFormula, RollMode, RollResult,
};
use crate::ids::{AbilityId, ItemId};
use crate::lifecycle::{self, Transition};
use crate::persist::{character_save_path, PersistError, SavedCharacter};
use crate::resolver::{
    group_damage_by_type, resolve_attack_modifiers, resolve_damage_modifiers, AttackModifiers,
    DamageResolution,
};
use crate::tags::{applicable_effects, ApplicableEffects};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from CharacterSession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No item with id {0}")]
    ItemNotFound(ItemId),

    #[error("{0} has no attack action")]
    NoAttack(String),

    #[error("{ability} does not apply to an attack with {item}")]
    NotApplicable { ability: String, item: String },

    #[error("Dice error: {0}")]
    Dice(#[from] DiceError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),
}

/// Configuration for a character session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Armor class attacks are rolled against unless a request names one.
    pub target_ac: i32,

    /// Roll mode used unless a request names one.
    pub roll_mode: RollMode,

    /// Overrides the character's own log retention preference when set.
    pub log_retention: Option<LogRetention>,

    /// Directory character saves are written to.
    pub save_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_ac: 10,
            roll_mode: RollMode::Normal,
            log_retention: None,
            save_dir: PathBuf::from("saves"),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML. Missing keys keep their defaults.
    ///
    /// ```
    /// use sheet_core::SessionConfig;
    ///
    /// let toml = "target_ac = 15\nroll_mode = \"advantage\"";
    /// let config = SessionConfig::from_toml_str(toml).unwrap();
    /// assert_eq!(config.target_ac, 15);
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, SessionError> {
        Ok(toml::from_str(source)?)
    }

    /// Set the default target armor class.
    pub fn with_target_ac(mut self, ac: i32) -> Self {
        self.target_ac = ac;
        self
    }

    /// Set the default roll mode.
    pub fn with_roll_mode(mut self, mode: RollMode) -> Self {
        self.roll_mode = mode;
        self
    }

    /// Force a log retention policy on the session's character.
    pub fn with_log_retention(mut self, retention: LogRetention) -> Self {
        self.log_retention = Some(retention);
        self
    }

    /// Set the save directory.
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }
}

/// An attack to make with one of the character's items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackRequest {
    pub item: ItemId,
    /// Instant abilities the player chose to spend on this attack.
    pub chosen: Vec<AbilityId>,
    pub mode: Option<RollMode>,
    pub target_ac: Option<i32>,
}

impl AttackRequest {
    pub fn new(item: ItemId) -> Self {
        Self {
            item,
            chosen: Vec::new(),
            mode: None,
            target_ac: None,
        }
    }

    /// Spend an available instant ability on the attack.
    pub fn with_ability(mut self, id: AbilityId) -> Self {
        if !self.chosen.contains(&id) {
            self.chosen.push(id);
        }
        self
    }

    pub fn with_mode(mut self, mode: RollMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn against(mut self, ac: i32) -> Self {
        self.target_ac = Some(ac);
        self
    }
}

/// Rolled damage of a hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageOutcome {
    pub resolution: DamageResolution,
    /// The formula actually rolled (dice doubled on a critical).
    pub formula: String,
    /// One roll per entry of `resolution.breakdown`, in the same order.
    pub rolls: Vec<RollResult>,
    pub total: i32,
    pub by_type: Vec<DamageByType>,
}

/// Everything that happened during an attack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackOutcome {
    pub roll: D20Roll,
    pub modifiers: AttackModifiers,
    pub target_ac: i32,
    pub hit: bool,
    pub critical: bool,
    pub effects_applied: Vec<String>,
    pub damage: Option<DamageOutcome>,
    pub entry: CombatLogEntry,
}

/// A character being played.
///
/// This is the main entry point for sheet gameplay. It manages:
/// - The current character snapshot
/// - Ability use and turn/rest bookkeeping
/// - The attack flow from tags to damage
/// - Saving and loading
#[derive(Debug, Clone)]
pub struct CharacterSession {
    character: Character,
    config: SessionConfig,
}

impl CharacterSession {
    pub fn new(mut character: Character, config: SessionConfig) -> Self {
        if let Some(retention) = config.log_retention {
            character.preferences.log_retention = retention;
        }
        Self { character, config }
    }

    /// Get the current character snapshot.
    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn into_character(self) -> Character {
        self.character
    }

    fn apply(&mut self, transition: Transition) -> CombatLogEntry {
        self.character = transition.character;
        transition.entry
    }

    // ========================================================================
    // Abilities
    // ========================================================================

    pub fn add_ability(&mut self, ability: Ability) -> AbilityId {
        let (next, id) = lifecycle::add_ability(&self.character, ability);
        self.character = next;
        id
    }

    pub fn remove_ability(&mut self, id: AbilityId) -> Result<(), SessionError> {
        self.character = lifecycle::remove_ability(&self.character, id)?;
        Ok(())
    }

    pub fn use_ability(&mut self, id: AbilityId) -> Result<CombatLogEntry, SessionError> {
        let transition = lifecycle::use_ability(&self.character, id)?;
        Ok(self.apply(transition))
    }

    pub fn activate_ability(&mut self, id: AbilityId) -> Result<CombatLogEntry, SessionError> {
        let transition = lifecycle::activate_ability(&self.character, id)?;
        Ok(self.apply(transition))
    }

    pub fn deactivate_ability(&mut self, id: AbilityId) -> Result<CombatLogEntry, SessionError> {
        let transition = lifecycle::deactivate_ability(&self.character, id)?;
        Ok(self.apply(transition))
    }

    pub fn end_turn(&mut self) -> CombatLogEntry {
        let transition = lifecycle::end_turn(&self.character);
        self.apply(transition)
    }

    pub fn short_rest(&mut self) -> CombatLogEntry {
        let transition = lifecycle::short_rest(&self.character);
        self.apply(transition)
    }

    pub fn long_rest(&mut self) -> CombatLogEntry {
        let transition = lifecycle::long_rest(&self.character);
        self.apply(transition)
    }

    pub fn clear_combat_log(&mut self) {
        self.character = lifecycle::clear_combat_log(&self.character);
    }

    // ========================================================================
    // Hit points
    // ========================================================================

    pub fn take_damage(&mut self, amount: i32) -> DamageResult {
        self.character.hit_points.take_damage(amount)
    }

    /// Returns the amount actually healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        self.character.hit_points.heal(amount)
    }

    pub fn add_temp_hp(&mut self, amount: i32) {
        self.character.hit_points.add_temp_hp(amount);
    }

    // ========================================================================
    // Attacks
    // ========================================================================

    /// Abilities that apply to an attack with the given item.
    pub fn applicable_effects(&self, item: ItemId) -> Result<ApplicableEffects<'_>, SessionError> {
        let item = self
            .character
            .item(item)
            .ok_or(SessionError::ItemNotFound(item))?;
        Ok(applicable_effects(&item.action_tags(), &self.character.abilities))
    }

    /// Make an attack using thread-local randomness.
    pub fn attack(&mut self, request: &AttackRequest) -> Result<AttackOutcome, SessionError> {
        self.attack_with_rng(request, &mut rand::thread_rng())
    }

    /// Make an attack with a specific die source.
    ///
    /// Chosen instant abilities are spent whether or not the attack hits. A
    /// natural 20 always hits and doubles damage dice; a natural 1 always
    /// misses.
    pub fn attack_with_rng<D: DieSource + ?Sized>(
        &mut self,
        request: &AttackRequest,
        rng: &mut D,
    ) -> Result<AttackOutcome, SessionError> {
        let character = &self.character;
        let item = character
            .item(request.item)
            .ok_or(SessionError::ItemNotFound(request.item))?;
        if !matches!(item.action.as_ref().map(|a| a.kind), Some(ActionKind::Attack)) {
            return Err(SessionError::NoAttack(item.name.clone()));
        }

        let tags = item.action_tags();
        let applicable = applicable_effects(&tags, &character.abilities);
        let mut selected: Vec<&Ability> = applicable.automatic().collect();
        for id in &request.chosen {
            match applicable.available.iter().copied().find(|a| a.id == *id) {
                Some(ability) => selected.push(ability),
                None => {
                    let ability = character
                        .ability(*id)
                        .ok_or(UsageError::AbilityNotFound(*id))?;
                    return Err(SessionError::NotApplicable {
                        ability: ability.name.clone(),
                        item: item.name.clone(),
                    });
                }
            }
        }

        // Spend chosen abilities first so a rejection leaves nothing rolled.
        let mut next = character.clone();
        for id in &request.chosen {
            next = lifecycle::use_ability(&next, *id)?.character;
        }

        let mode = request.mode.unwrap_or(self.config.roll_mode);
        let target_ac = request.target_ac.unwrap_or(self.config.target_ac);
        let modifiers = resolve_attack_modifiers(item, character, &selected);
        let roll = roll_d20_with_rng(&modifiers.formula(), mode, rng)?;

        let critical = roll.is_critical();
        let hit = !roll.is_fumble() && (critical || roll.total >= target_ac);
        let damage = if hit {
            let resolution = resolve_damage_modifiers(item, character, &selected);
            Some(roll_damage(resolution, critical, rng))
        } else {
            None
        };

        let effects_applied: Vec<String> = selected.iter().map(|a| a.name.clone()).collect();
        let record = AttackRecord {
            weapon: item.name.clone(),
            mode,
            d20: roll.chosen,
            modifier: roll.modifier,
            total: roll.total,
            target_ac,
            hit,
            critical,
            effects_applied: effects_applied.clone(),
            damage: damage.as_ref().map(|d| DamageRecord {
                formula: d.formula.clone(),
                result: d.total,
                breakdown: damage_breakdown(d),
                critical,
                types: d.by_type.clone(),
            }),
        };

        tracing::debug!(
            weapon = %record.weapon,
            total = record.total,
            target_ac,
            hit,
            critical,
            "attack resolved"
        );

        let entry = next
            .combat_log
            .append(next.turn, LogEvent::Attack(record))
            .clone();
        self.character = next;

        Ok(AttackOutcome {
            roll,
            modifiers,
            target_ac,
            hit,
            critical,
            effects_applied,
            damage,
            entry,
        })
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Path the character is saved to inside the configured save directory.
    pub fn save_path(&self) -> PathBuf {
        character_save_path(&self.config.save_dir, &self.character.name)
    }

    /// Save the character to the configured save directory.
    pub async fn save(&self) -> Result<PathBuf, SessionError> {
        let path = self.save_path();
        SavedCharacter::new(self.character.clone())
            .save_json(&path)
            .await?;
        Ok(path)
    }

    /// Load a saved character into a new session.
    pub async fn load(path: impl AsRef<Path>, config: SessionConfig) -> Result<Self, SessionError> {
        let saved = SavedCharacter::load_json(path).await?;
        Ok(Self::new(saved.character, config))
    }
}

/// Roll each damage source on its own so damage can be split by type.
fn roll_damage<D: DieSource + ?Sized>(
    resolution: DamageResolution,
    critical: bool,
    rng: &mut D,
) -> DamageOutcome {
    let rolls: Vec<RollResult> = resolution
        .breakdown
        .iter()
        .map(|source| {
            let parsed = ParsedFormula::parse(&source.formula);
            let parsed = if critical { parsed.doubled_dice() } else { parsed };
            parsed.roll_with_rng(rng)
        })
        .collect();

    let by_type = group_damage_by_type(&resolution.breakdown)
        .into_iter()
        .map(|group| {
            let amount = group
                .sources
                .iter()
                .filter_map(|source| {
                    resolution
                        .breakdown
                        .iter()
                        .position(|b| std::ptr::eq(b, *source))
                })
                .map(|index| rolls[index].total)
                .fold(0, i32::saturating_add);
            DamageByType {
                damage_type: group.damage_type,
                amount,
            }
        })
        .collect();

    let formula = if critical {
        ParsedFormula::parse(&resolution.formula)
            .doubled_dice()
            .to_string()
    } else {
        resolution.formula.clone()
    };
    let total = rolls
        .iter()
        .map(|r| r.total)
        .fold(0, i32::saturating_add)
        .max(0);

    DamageOutcome {
        resolution,
        formula,
        rolls,
        total,
        by_type,
    }
}

fn damage_breakdown(damage: &DamageOutcome) -> String {
    damage
        .resolution
        .breakdown
        .iter()
        .zip(&damage.rolls)
        .map(|(source, roll)| format!("{}: {}", source.source, roll.summary()))
        .collect::<Vec<_>>()
        .join("; ")
}
