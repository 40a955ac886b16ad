//! Property tests for dice ranges, averages and ability resource invariants.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sheet_core::dice::{self, roll_critical_with_rng, roll_d20_with_rng, roll_with_rng};
use sheet_core::lifecycle::{activate_ability, add_ability, end_turn, long_rest, short_rest};
use sheet_core::tags::matches_tag;
use sheet_core::{Ability, Character, CharacterClass, Recharge, RollMode};

proptest! {
    /// Every roll of NdS lands in [N, N*S].
    #[test]
    fn prop_roll_within_bounds(count in 1u32..20, sides in 1u32..100, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let result = roll_with_rng(&format!("{count}d{sides}"), &mut rng);
        let total = result.total as i64;
        prop_assert!(total >= count as i64);
        prop_assert!(total <= (count * sides) as i64);
    }

    /// Any accepted dice term stays in range, however large the input.
    #[test]
    fn prop_accepted_terms_within_bounds(
        count in prop_oneof![0u32..1500, any::<u32>()],
        sides in prop_oneof![0u32..1500, any::<u32>()],
        seed in any::<u64>(),
    ) {
        let formula = format!("{count}d{sides}");
        let mut rng = StdRng::seed_from_u64(seed);
        let result = roll_with_rng(&formula, &mut rng);
        if dice::parse(&formula).is_empty() {
            prop_assert_eq!(result.total, 0);
        } else {
            let total = result.total as i64;
            prop_assert!(total >= count as i64);
            prop_assert!(total <= count as i64 * sides as i64);
        }
    }

    /// Flat modifiers shift the range without changing its width.
    #[test]
    fn prop_flat_modifier_shifts_range(
        sides in 2u32..20,
        bonus in -20i32..20,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let formula = if bonus < 0 {
            format!("1d{sides}-{}", bonus.unsigned_abs())
        } else {
            format!("1d{sides}+{bonus}")
        };
        let total = roll_with_rng(&formula, &mut rng).total;
        prop_assert!(total >= 1 + bonus);
        prop_assert!(total <= sides as i32 + bonus);
    }

    /// The average depends only on the formula.
    #[test]
    fn prop_average_deterministic(count in 1u32..10, sides in 1u32..20, flat in 0i32..10) {
        let formula = format!("{count}d{sides}+{flat}");
        prop_assert_eq!(dice::average(&formula), dice::average(&formula));
        let expected = count as f64 * (sides as f64 + 1.0) / 2.0 + flat as f64;
        prop_assert!((dice::average(&formula) - expected).abs() <= 0.05);
    }

    /// Critical rolls double the dice but not the modifier.
    #[test]
    fn prop_critical_range(
        count in 1u32..5,
        sides in 2u32..12,
        flat in 0i32..6,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let crit = roll_critical_with_rng(&format!("{count}d{sides}+{flat}"), &mut rng);
        let min = (2 * count) as i32 + flat;
        let max = (2 * count * sides) as i32 + flat;
        prop_assert!(crit.roll.total >= min && crit.roll.total <= max);
    }

    /// Advantage never picks the lower die, disadvantage never the higher.
    #[test]
    fn prop_advantage_ordering(seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let adv = roll_d20_with_rng("1d20+2", RollMode::Advantage, &mut rng).unwrap();
        prop_assert_eq!(adv.chosen, *adv.rolls.iter().max().unwrap());
        let dis = roll_d20_with_rng("1d20+2", RollMode::Disadvantage, &mut rng).unwrap();
        prop_assert_eq!(dis.chosen, *dis.rolls.iter().min().unwrap());
        prop_assert_eq!(dis.total, dis.chosen as i32 + 2);
    }

    /// A tag always matches itself and each of its own segments.
    #[test]
    fn prop_tag_matches_own_segments(segments in prop::collection::vec("[a-z]{1,8}", 1..4)) {
        let tag = segments.join(".");
        prop_assert!(matches_tag(&[tag.as_str()], &tag));
        for segment in &segments {
            prop_assert!(matches_tag(&[tag.as_str()], segment));
        }
    }

    /// Any sequence of turns and rests keeps abilities and effects in sync and
    /// pools inside their bounds.
    #[test]
    fn prop_lifecycle_keeps_effects_consistent(ops in prop::collection::vec(0u8..5, 0..40)) {
        let character = Character::new("Grog", CharacterClass::Barbarian);
        let (character, rage) = add_ability(
            &character,
            Ability::duration("Rage", 2, 3).with_recharge(Recharge::LongRest),
        );
        let (mut character, shape) = add_ability(
            &character,
            Ability::duration("Wild Shape", 1, 2).with_recharge(Recharge::ShortRest),
        );

        for op in ops {
            character = match op {
                0 => activate_ability(&character, rage).map(|t| t.character).unwrap_or(character),
                1 => activate_ability(&character, shape).map(|t| t.character).unwrap_or(character),
                2 => end_turn(&character).character,
                3 => short_rest(&character).character,
                _ => long_rest(&character).character,
            };

            prop_assert!(character.effects_consistent());
            for ability in &character.abilities {
                if let Some(uses) = ability.uses {
                    prop_assert!(uses.current <= uses.max);
                }
                if let Some(duration) = ability.duration {
                    prop_assert!(duration.current <= duration.max);
                }
            }
        }
    }
}
