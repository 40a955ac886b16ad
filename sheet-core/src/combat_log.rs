//! Append-only combat log.
//!
//! Entries are never edited after they are appended. Grouping by turn is done
//! when reading, not stored.

use crate::dice::RollMode;
use crate::ids::{AbilityId, LogEntryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rest tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestKind {
    Short,
    Long,
}

impl RestKind {
    pub fn name(&self) -> &'static str {
        match self {
            RestKind::Short => "Short Rest",
            RestKind::Long => "Long Rest",
        }
    }
}

/// Remaining duration of one effect after a turn ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectUpdate {
    pub name: String,
    pub remaining: u32,
}

/// Damage dealt by one damage type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageByType {
    pub damage_type: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRecord {
    pub formula: String,
    pub result: i32,
    pub breakdown: String,
    pub critical: bool,
    pub types: Vec<DamageByType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRecord {
    pub weapon: String,
    pub mode: RollMode,
    /// The kept d20 result.
    pub d20: u32,
    pub modifier: i32,
    pub total: i32,
    pub target_ac: i32,
    pub hit: bool,
    pub critical: bool,
    pub effects_applied: Vec<String>,
    pub damage: Option<DamageRecord>,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LogEvent {
    Attack(AttackRecord),
    AbilityUsed {
        ability: String,
        resources_used: Vec<AbilityId>,
    },
    AbilityActivated {
        ability: String,
        duration: u32,
        resources_used: Vec<AbilityId>,
    },
    AbilityDeactivated {
        ability: String,
    },
    EndTurn {
        effects_updated: Vec<EffectUpdate>,
    },
    Rest {
        rest: RestKind,
    },
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEvent::Attack(attack) => {
                write!(f, "Attacked with {} ({})", attack.weapon, attack.total)?;
                if attack.critical {
                    write!(f, ", critical hit")?;
                } else if attack.hit {
                    write!(f, ", hit")?;
                } else {
                    write!(f, ", miss")?;
                }
                if let Some(damage) = &attack.damage {
                    write!(f, " for {} damage", damage.result)?;
                }
                Ok(())
            }
            LogEvent::AbilityUsed { ability, .. } => write!(f, "Used {ability}"),
            LogEvent::AbilityActivated {
                ability, duration, ..
            } => write!(f, "Activated {ability} for {duration} turns"),
            LogEvent::AbilityDeactivated { ability } => write!(f, "Deactivated {ability}"),
            LogEvent::EndTurn { effects_updated } => {
                write!(f, "Ended turn")?;
                for update in effects_updated {
                    write!(f, "; {}: {} turns left", update.name, update.remaining)?;
                }
                Ok(())
            }
            LogEvent::Rest { rest } => write!(f, "{}", rest.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatLogEntry {
    pub id: LogEntryId,
    pub turn: u32,
    pub timestamp: DateTime<Utc>,
    pub event: LogEvent,
}

/// Entries that share a turn number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnGroup<'a> {
    pub turn: u32,
    pub entries: Vec<&'a CombatLogEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombatLog {
    entries: Vec<CombatLogEntry>,
}

impl CombatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event stamped with `turn` and the current time.
    pub fn append(&mut self, turn: u32, event: LogEvent) -> &CombatLogEntry {
        let index = self.entries.len();
        self.entries.push(CombatLogEntry {
            id: LogEntryId::new(),
            turn,
            timestamp: Utc::now(),
            event,
        });
        &self.entries[index]
    }

    pub fn entries(&self) -> &[CombatLogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&CombatLogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries grouped by turn, groups in order of first appearance.
    pub fn by_turn(&self) -> Vec<TurnGroup<'_>> {
        let mut groups: Vec<TurnGroup<'_>> = Vec::new();
        for entry in &self.entries {
            match groups.iter_mut().find(|g| g.turn == entry.turn) {
                Some(group) => group.entries.push(entry),
                None => groups.push(TurnGroup {
                    turn: entry.turn,
                    entries: vec![entry],
                }),
            }
        }
        groups
    }
}
