//! Tag matching for effect automation.
//!
//! Tags are plain strings. A dot-separated tag such as `weapon.sword.longsword`
//! expresses a hierarchy, and matching looks at the segments in both
//! directions: the tag `weapon.sword.longsword` matches the trigger `sword`,
//! and the tag `sword` matches the trigger `weapon.sword`.

use crate::abilities::{Ability, AbilityKind};

const SEPARATOR: char = '.';

fn has_segment(dotted: &str, needle: &str) -> bool {
    dotted.contains(SEPARATOR) && dotted.split(SEPARATOR).any(|segment| segment == needle)
}

/// True if any of `tags` matches `trigger`.
///
/// A single tag is passed as a one-element slice.
pub fn matches_tag<S: AsRef<str>>(tags: &[S], trigger: &str) -> bool {
    tags.iter().map(AsRef::as_ref).any(|tag| {
        tag == trigger || has_segment(tag, trigger) || has_segment(trigger, tag)
    })
}

/// True if any trigger matches the tags. An empty trigger list never matches.
pub fn matches_any_trigger<S: AsRef<str>, T: AsRef<str>>(tags: &[S], triggers: &[T]) -> bool {
    triggers
        .iter()
        .any(|trigger| matches_tag(tags, trigger.as_ref()))
}

/// Abilities that apply to an action, by how they apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicableEffects<'a> {
    /// Matched passives; they always apply.
    pub passives: Vec<&'a Ability>,
    /// Matched duration abilities that are currently active.
    pub actives: Vec<&'a Ability>,
    /// Matched instant abilities with uses left; the player decides.
    pub available: Vec<&'a Ability>,
}

impl<'a> ApplicableEffects<'a> {
    pub fn is_empty(&self) -> bool {
        self.passives.is_empty() && self.actives.is_empty() && self.available.is_empty()
    }

    /// Passives and actives, the effects that apply without a player choice.
    pub fn automatic(&self) -> impl Iterator<Item = &'a Ability> + '_ {
        self.passives.iter().chain(self.actives.iter()).copied()
    }
}

/// Classify a character's abilities against the tags of an action.
///
/// Abilities without a trigger or without an effect are ignored. This never
/// changes ability state.
pub fn applicable_effects<'a, S: AsRef<str>>(
    action_tags: &[S],
    abilities: &'a [Ability],
) -> ApplicableEffects<'a> {
    let mut result = ApplicableEffects::default();

    for ability in abilities {
        if ability.trigger.is_empty() || ability.effect.is_none() {
            continue;
        }
        if !matches_any_trigger(action_tags, &ability.trigger) {
            continue;
        }

        match ability.kind {
            AbilityKind::Passive => result.passives.push(ability),
            AbilityKind::Duration => {
                if ability.active {
                    result.actives.push(ability);
                }
            }
            AbilityKind::Instant => {
                if ability.uses.map(|u| u.current > 0).unwrap_or(false) {
                    result.available.push(ability);
                }
            }
        }
    }

    tracing::debug!(
        passives = result.passives.len(),
        actives = result.actives.len(),
        available = result.available.len(),
        "classified applicable effects"
    );

    result
}
