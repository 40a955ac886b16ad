//! Ability resource state machine.
//!
//! Every transition takes the current character snapshot by reference and
//! returns a new one; the input is never touched. A rejected transition
//! returns `Err(UsageError)` and the caller keeps the snapshot it already has.
//!
//! ```text
//! instant:   Ready --use--> (uses - 1) ... --> Depleted --rest--> Ready
//! duration:  Inactive --activate--> Active --end_turn (0 left)--> Inactive
//!                                   Active --deactivate---------> Inactive
//! ```
//!
//! An active duration ability always has exactly one [`ActiveEffect`] with the
//! same countdown. Both rest tiers clear every active effect.

use crate::abilities::{
    validate_ability_usage, Ability, AbilityKind, ActiveEffect, Pool, Recharge, UsageError,
};
use crate::character::{Character, LogRetention};
use crate::combat_log::{CombatLogEntry, EffectUpdate, LogEvent, RestKind};
use crate::ids::AbilityId;

/// A new character snapshot plus the log entry describing the change.
///
/// The entry has already been appended to `character.combat_log`.
#[derive(Debug, Clone)]
pub struct Transition {
    pub character: Character,
    pub entry: CombatLogEntry,
}

fn commit(mut next: Character, event: LogEvent) -> Transition {
    let entry = next.combat_log.append(next.turn, event).clone();
    Transition {
        character: next,
        entry,
    }
}

fn find(character: &Character, id: AbilityId) -> Result<&Ability, UsageError> {
    character.ability(id).ok_or(UsageError::AbilityNotFound(id))
}

fn expect_kind(ability: &Ability, expected: AbilityKind) -> Result<(), UsageError> {
    if ability.kind == expected {
        Ok(())
    } else {
        Err(UsageError::WrongKind {
            name: ability.name.clone(),
            expected,
            actual: ability.kind,
        })
    }
}

/// Grant an ability, normalised to its fresh state with a new id.
pub fn add_ability(character: &Character, mut ability: Ability) -> (Character, AbilityId) {
    ability.id = AbilityId::new();
    ability.reset_fresh();

    let id = ability.id;
    let mut next = character.clone();
    tracing::debug!(ability = %ability.name, kind = %ability.kind, "ability granted");
    next.abilities.push(ability);
    (next, id)
}

/// Remove an ability and any effect it produced.
pub fn remove_ability(character: &Character, id: AbilityId) -> Result<Character, UsageError> {
    find(character, id)?;

    let mut next = character.clone();
    next.abilities.retain(|a| a.id != id);
    next.active_effects.retain(|e| e.source_id != id);
    Ok(next)
}

/// Spend one use of an instant ability.
pub fn use_ability(character: &Character, id: AbilityId) -> Result<Transition, UsageError> {
    let ability = find(character, id)?;
    expect_kind(ability, AbilityKind::Instant)?;
    validate_ability_usage(ability)?;

    let mut next = character.clone();
    let name = match next.ability_mut(id) {
        Some(ability) => {
            if let Some(uses) = ability.uses.as_mut() {
                uses.spend();
            }
            ability.name.clone()
        }
        None => return Err(UsageError::AbilityNotFound(id)),
    };

    tracing::debug!(ability = %name, "instant ability used");
    Ok(commit(
        next,
        LogEvent::AbilityUsed {
            ability: name,
            resources_used: vec![id],
        },
    ))
}

/// Activate a duration ability: spend a use, start its countdown and create
/// the matching active effect.
pub fn activate_ability(character: &Character, id: AbilityId) -> Result<Transition, UsageError> {
    let ability = find(character, id)?;
    expect_kind(ability, AbilityKind::Duration)?;
    validate_ability_usage(ability)?;

    let mut next = character.clone();
    let effect = match next.ability_mut(id) {
        Some(ability) => {
            if let Some(uses) = ability.uses.as_mut() {
                uses.spend();
            }
            let duration = ability.duration.get_or_insert(Pool::empty(0));
            duration.refill();
            ability.active = true;
            ActiveEffect::from_ability(ability)
        }
        None => return Err(UsageError::AbilityNotFound(id)),
    };

    let name = effect.name.clone();
    let turns = effect.duration.max;
    next.active_effects.retain(|e| e.source_id != id);
    next.active_effects.push(effect);

    tracing::debug!(ability = %name, turns, "duration ability activated");
    Ok(commit(
        next,
        LogEvent::AbilityActivated {
            ability: name,
            duration: turns,
            resources_used: vec![id],
        },
    ))
}

/// End a duration ability early.
pub fn deactivate_ability(character: &Character, id: AbilityId) -> Result<Transition, UsageError> {
    let ability = find(character, id)?;
    expect_kind(ability, AbilityKind::Duration)?;
    if !ability.active {
        return Err(UsageError::NotActive {
            name: ability.name.clone(),
        });
    }

    let mut next = character.clone();
    let name = match next.ability_mut(id) {
        Some(ability) => {
            ability.active = false;
            if let Some(duration) = ability.duration.as_mut() {
                duration.drain();
            }
            ability.name.clone()
        }
        None => return Err(UsageError::AbilityNotFound(id)),
    };
    next.active_effects.retain(|e| e.source_id != id);

    tracing::debug!(ability = %name, "duration ability deactivated");
    Ok(commit(next, LogEvent::AbilityDeactivated { ability: name }))
}

/// Tick every active duration by one turn and advance the turn counter.
///
/// Abilities that reach 0 turns are deactivated and lose their effect; the
/// others keep their effect's countdown in step.
pub fn end_turn(character: &Character) -> Transition {
    let mut next = character.clone();
    let mut updates = Vec::new();
    let mut expired = Vec::new();

    for ability in next
        .abilities
        .iter_mut()
        .filter(|a| a.kind == AbilityKind::Duration && a.active)
    {
        let duration = ability.duration.get_or_insert(Pool::empty(0));
        let remaining = duration.current.saturating_sub(1);
        duration.set(remaining);

        updates.push(EffectUpdate {
            name: ability.name.clone(),
            remaining,
        });

        if remaining == 0 {
            ability.active = false;
            expired.push(ability.id);
        }
    }

    let abilities = &next.abilities;
    next.active_effects.retain_mut(|effect| {
        match abilities.iter().find(|a| a.id == effect.source_id) {
            Some(source) if source.active => {
                effect.duration.set(source.turns_remaining());
                true
            }
            _ => false,
        }
    });

    next.turn += 1;
    tracing::debug!(
        turn = next.turn,
        ticked = updates.len(),
        expired = expired.len(),
        "turn ended"
    );
    commit(
        next,
        LogEvent::EndTurn {
            effects_updated: updates,
        },
    )
}

fn recharges_on(recharge: Recharge, rest: RestKind) -> bool {
    match rest {
        RestKind::Short => recharge == Recharge::ShortRest,
        RestKind::Long => true,
    }
}

fn rest(character: &Character, kind: RestKind) -> Transition {
    let mut next = character.clone();
    let mut restored = 0usize;

    for ability in next.abilities.iter_mut() {
        if recharges_on(ability.recharge, kind) {
            ability.reset_fresh();
            restored += 1;
        } else if ability.active {
            // Combat is over; nothing stays active past a rest.
            ability.active = false;
            if let Some(duration) = ability.duration.as_mut() {
                duration.drain();
            }
        }
    }

    next.active_effects.clear();
    next.turn = 0;

    if kind == RestKind::Long {
        next.hit_points.restore();
    }

    if next.preferences.log_retention == LogRetention::ClearOnRest {
        next.combat_log.clear();
    }

    tracing::info!(rest = kind.name(), restored, "rest completed");
    commit(next, LogEvent::Rest { rest: kind })
}

/// Refill short-rest abilities and end every active effect.
pub fn short_rest(character: &Character) -> Transition {
    rest(character, RestKind::Short)
}

/// Refill every ability, end every active effect and restore hit points.
pub fn long_rest(character: &Character) -> Transition {
    rest(character, RestKind::Long)
}

/// Empty the combat log and reset the turn counter.
pub fn clear_combat_log(character: &Character) -> Character {
    let mut next = character.clone();
    next.combat_log.clear();
    next.turn = 0;
    next
}
