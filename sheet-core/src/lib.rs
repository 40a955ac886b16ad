//! Character sheet rules engine for tabletop play.
//!
//! This crate provides:
//! - A dice formula engine with advantage, disadvantage and critical rolls
//! - Hierarchical tag matching to decide which abilities apply to an action
//! - Ability resources: passives, limited-use instants and timed durations
//! - Attack and damage resolution from attributes, proficiency and effects
//! - Character persistence
//!
//! # Quick Start
//!
//! ```no_run
//! use sheet_core::{
//!     new_character, AttackRequest, CharacterClass, CharacterSession, Item, SessionConfig,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut character = new_character("Grog", CharacterClass::Barbarian);
//! let axe = character.add_item(Item::weapon("Greataxe", "1d20+@STR", "1d12+@STR", "slashing"));
//!
//! let mut session = CharacterSession::new(character, SessionConfig::new().with_target_ac(14));
//! let rage = session.character().ability_by_name("Rage").map(|a| a.id).unwrap();
//! session.activate_ability(rage)?;
//!
//! let outcome = session.attack(&AttackRequest::new(axe))?;
//! println!("{}", outcome.entry.event);
//!
//! session.end_turn();
//! session.save().await?;
//! # Ok(())
//! # }
//! ```

pub mod abilities;
pub mod character;
pub mod class_templates;
pub mod combat_log;
pub mod dice;
pub mod ids;
pub mod lifecycle;
pub mod persist;
pub mod resolver;
pub mod session;
pub mod tags;
pub mod testing;

// Primary public API
pub use abilities::{
    Ability, AbilityEffect, AbilityKind, ActiveEffect, DamageBonus, Pool, Recharge, UsageError,
};
pub use character::{Attribute, Attributes, Character, CharacterClass, HitPoints, Item, Preferences};
pub use class_templates::new_character;
pub use combat_log::{CombatLog, CombatLogEntry, LogEvent};
pub use dice::{DiceError, DieSource, RollMode, RollResult};
pub use ids::{AbilityId, CharacterId, EffectId, ItemId, LogEntryId};
pub use lifecycle::Transition;
pub use persist::{PersistError, SavedCharacter};
pub use session::{AttackOutcome, AttackRequest, CharacterSession, SessionConfig, SessionError};
pub use testing::ScriptedDice;
