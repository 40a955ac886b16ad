//! Dice formula engine.
//!
//! Parses formulas such as `1d20+5` or `2d6+1d4-1` into an ordered term list,
//! rolls them, and provides the advantage, disadvantage and critical variants
//! used by attack resolution.
//!
//! Parsing is lenient: fragments that are neither dice (`XdY`) nor plain
//! integers are dropped rather than failing the whole formula. Callers check
//! [`ParsedFormula::is_empty`] (or use [`validate`]) before trusting a result.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Die sizes found on a standard tabletop set. Anything else still parses.
const COMMON_SIDES: [u32; 7] = [4, 6, 8, 10, 12, 20, 100];

/// Largest dice count accepted in one term.
pub const MAX_DICE_COUNT: u32 = 1_000;

/// Largest die size accepted.
pub const MAX_DIE_SIDES: u32 = 1_000;

/// Largest magnitude accepted for a flat modifier.
pub const MAX_FLAT_MODIFIER: i32 = 1_000_000;

/// Error type for formula validation and d20 variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Empty or invalid formula: {0:?}")]
    EmptyFormula(String),
    #[error("Formula has no d20 to roll twice: {0}")]
    MissingD20(String),
    #[error("Formula must contain exactly one 1d20 term: {0}")]
    AmbiguousD20(String),
}

/// A source of uniform die results.
///
/// Every [`rand::Rng`] is a `DieSource`; tests can supply
/// [`crate::testing::ScriptedDice`] to replay exact results.
pub trait DieSource {
    /// Return a value in `1..=sides`.
    fn roll_die(&mut self, sides: u32) -> u32;
}

impl<R: Rng> DieSource for R {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.gen_range(1..=sides)
    }
}

// ============================================================================
// Terms
// ============================================================================

/// Sign applied to a dice group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sign {
    #[default]
    Plus,
    Minus,
}

impl Sign {
    pub fn apply(self, value: i32) -> i32 {
        match self {
            Sign::Plus => value,
            Sign::Minus => -value,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Sign::Plus => '+',
            Sign::Minus => '-',
        }
    }
}

/// One dice group, e.g. the `2d6` in `2d6+3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceTerm {
    pub count: u32,
    pub sides: u32,
    pub sign: Sign,
}

impl DiceTerm {
    pub fn new(count: u32, sides: u32) -> Self {
        Self {
            count,
            sides,
            sign: Sign::Plus,
        }
    }

    pub fn negated(mut self) -> Self {
        self.sign = Sign::Minus;
        self
    }

    /// Unsigned notation, e.g. `2d6`.
    pub fn notation(&self) -> String {
        format!("{}d{}", self.count, self.sides)
    }

    pub fn average(&self) -> f64 {
        let avg = self.count as f64 * (self.sides as f64 + 1.0) / 2.0;
        match self.sign {
            Sign::Plus => avg,
            Sign::Minus => -avg,
        }
    }

    pub fn is_single_d20(&self) -> bool {
        self.count == 1 && self.sides == 20
    }
}

/// A constant modifier with its sign folded into `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatTerm {
    pub value: i32,
}

/// A single term of a parsed formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Term {
    Dice(DiceTerm),
    Flat(FlatTerm),
}

// ============================================================================
// Parsed formula
// ============================================================================

/// Ordered term list in textual order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFormula {
    pub terms: Vec<Term>,
}

impl ParsedFormula {
    /// Parse a formula, silently dropping fragments that are not dice or
    /// integers.
    pub fn parse(formula: &str) -> Self {
        let mut terms = Vec::new();
        let mut current = String::new();
        let mut sign = Sign::Plus;

        for ch in formula.chars() {
            match ch {
                '+' | '-' => {
                    if !current.is_empty() {
                        if let Some(term) = parse_token(&current, sign) {
                            terms.push(term);
                        }
                        current.clear();
                    }
                    sign = if ch == '+' { Sign::Plus } else { Sign::Minus };
                }
                c if c.is_whitespace() => continue,
                c => current.push(c),
            }
        }

        if !current.is_empty() {
            if let Some(term) = parse_token(&current, sign) {
                terms.push(term);
            }
        }

        Self { terms }
    }

    pub fn from_terms(terms: impl IntoIterator<Item = Term>) -> Self {
        Self {
            terms: terms.into_iter().collect(),
        }
    }

    /// True when parsing produced no usable terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn dice(&self) -> impl Iterator<Item = &DiceTerm> {
        self.terms.iter().filter_map(|t| match t {
            Term::Dice(d) => Some(d),
            Term::Flat(_) => None,
        })
    }

    /// Sum of all flat terms.
    pub fn flat_total(&self) -> i32 {
        self.terms
            .iter()
            .map(|t| match t {
                Term::Flat(f) => f.value,
                Term::Dice(_) => 0,
            })
            .sum()
    }

    /// Expected value, rounded to one decimal place.
    pub fn average(&self) -> f64 {
        let raw: f64 = self
            .terms
            .iter()
            .map(|t| match t {
                Term::Dice(d) => d.average(),
                Term::Flat(f) => f.value as f64,
            })
            .sum();
        (raw * 10.0).round() / 10.0
    }

    /// Copy of this formula with every dice count doubled. Flat terms are kept
    /// as they are.
    pub fn doubled_dice(&self) -> Self {
        Self::from_terms(self.terms.iter().map(|t| match t {
            Term::Dice(d) => Term::Dice(DiceTerm {
                count: d.count.saturating_mul(2),
                ..*d
            }),
            flat => *flat,
        }))
    }

    /// Remove the d20 term for an advantage/disadvantage roll.
    ///
    /// The formula must contain exactly one d20 term and it must be a single
    /// `1d20` added to the total.
    pub fn split_d20(&self) -> Result<(DiceTerm, ParsedFormula), DiceError> {
        if self.is_empty() {
            return Err(DiceError::EmptyFormula(self.to_string()));
        }

        let d20_positions: Vec<usize> = self
            .terms
            .iter()
            .enumerate()
            .filter(|(_, t)| matches!(t, Term::Dice(d) if d.sides == 20))
            .map(|(i, _)| i)
            .collect();

        let index = match d20_positions.as_slice() {
            [] => return Err(DiceError::MissingD20(self.to_string())),
            [only] => *only,
            _ => return Err(DiceError::AmbiguousD20(self.to_string())),
        };

        let d20 = match self.terms[index] {
            Term::Dice(d) if d.is_single_d20() && d.sign == Sign::Plus => d,
            _ => return Err(DiceError::AmbiguousD20(self.to_string())),
        };

        let mut remainder = self.terms.clone();
        remainder.remove(index);
        Ok((d20, Self { terms: remainder }))
    }

    /// Roll every term once.
    pub fn roll(&self) -> RollResult {
        self.roll_with_rng(&mut rand::thread_rng())
    }

    /// Roll with a specific die source (useful for testing).
    pub fn roll_with_rng<D: DieSource + ?Sized>(&self, rng: &mut D) -> RollResult {
        let mut components = Vec::with_capacity(self.terms.len());
        let mut total = 0;

        for term in &self.terms {
            let component = match term {
                Term::Dice(d) => {
                    let rolls = roll_dice_with_rng(d.count, d.sides, rng);
                    let subtotal = rolls
                        .iter()
                        .map(|&r| i32::try_from(r).unwrap_or(i32::MAX))
                        .fold(0i32, i32::saturating_add);
                    RollComponent::Dice {
                        notation: d.notation(),
                        sign: d.sign,
                        rolls,
                        subtotal,
                        total: d.sign.apply(subtotal),
                    }
                }
                Term::Flat(f) => RollComponent::Modifier { value: f.value },
            };
            total = component.total().saturating_add(total);
            components.push(component);
        }

        RollResult {
            formula: self.to_string(),
            total,
            components,
        }
    }
}

impl fmt::Display for ParsedFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            match term {
                Term::Dice(d) => {
                    if d.sign == Sign::Minus {
                        write!(f, "-")?;
                    } else if i > 0 {
                        write!(f, "+")?;
                    }
                    write!(f, "{}", d.notation())?;
                }
                Term::Flat(flat) => {
                    if flat.value < 0 {
                        write!(f, "-{}", flat.value.unsigned_abs())?;
                    } else if i > 0 {
                        write!(f, "+{}", flat.value)?;
                    } else {
                        write!(f, "{}", flat.value)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn parse_token(token: &str, sign: Sign) -> Option<Term> {
    if let Some(d_pos) = token.find(['d', 'D']) {
        let count_str = &token[..d_pos];
        let sides_str = &token[d_pos + 1..];

        if !is_all_digits(sides_str) || !(count_str.is_empty() || is_all_digits(count_str)) {
            return None;
        }

        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str.parse().ok()?
        };
        let sides: u32 = sides_str.parse().ok()?;

        if count == 0 || sides == 0 {
            tracing::debug!(token, "dropping dice term with zero count or sides");
            return None;
        }

        if count > MAX_DICE_COUNT || sides > MAX_DIE_SIDES {
            tracing::debug!(token, "dropping dice term outside the supported range");
            return None;
        }

        if !COMMON_SIDES.contains(&sides) {
            tracing::warn!(sides, token, "unusual die size, rolling anyway");
        }

        Some(Term::Dice(DiceTerm { count, sides, sign }))
    } else if is_all_digits(token) {
        let value: i32 = match token.parse() {
            Ok(value) if value <= MAX_FLAT_MODIFIER => value,
            _ => {
                tracing::debug!(token, "dropping flat modifier outside the supported range");
                return None;
            }
        };
        Some(Term::Flat(FlatTerm {
            value: sign.apply(value),
        }))
    } else {
        tracing::debug!(token, "ignoring unrecognised formula fragment");
        None
    }
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

// ============================================================================
// Roll results
// ============================================================================

/// Outcome of one term of a roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RollComponent {
    Dice {
        notation: String,
        sign: Sign,
        rolls: Vec<u32>,
        subtotal: i32,
        total: i32,
    },
    Modifier {
        value: i32,
    },
}

impl RollComponent {
    /// Signed contribution to the roll total.
    pub fn total(&self) -> i32 {
        match self {
            RollComponent::Dice { total, .. } => *total,
            RollComponent::Modifier { value } => *value,
        }
    }
}

/// Complete result of rolling a formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub formula: String,
    pub total: i32,
    pub components: Vec<RollComponent>,
}

impl RollResult {
    /// Every die shown, e.g. `1d20[14] = 14 +5 = 19`.
    pub fn breakdown(&self) -> String {
        let parts: Vec<String> = self
            .components
            .iter()
            .map(|c| match c {
                RollComponent::Dice {
                    notation,
                    sign,
                    rolls,
                    total,
                    ..
                } => {
                    let prefix = if *sign == Sign::Minus { "-" } else { "" };
                    let rolls = rolls
                        .iter()
                        .map(|r| r.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{prefix}{notation}[{rolls}] = {}", total.abs())
                }
                RollComponent::Modifier { value } => format!("{value:+}"),
            })
            .collect();
        format!("{} = {}", parts.join(" "), self.total)
    }

    /// Dice subtotals only, e.g. `1d20[14] +5 = 19`.
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.components.len());
        for c in &self.components {
            match c {
                RollComponent::Dice {
                    notation,
                    sign,
                    subtotal,
                    ..
                } => {
                    let prefix = if *sign == Sign::Minus { "-" } else { "" };
                    parts.push(format!("{prefix}{notation}[{subtotal}]"));
                }
                RollComponent::Modifier { value } if parts.is_empty() => {
                    parts.push(value.to_string())
                }
                RollComponent::Modifier { value } => parts.push(format!("{value:+}")),
            }
        }
        format!("{} = {}", parts.join(" "), self.total)
    }

    /// The natural result of a lone `1d20` component, if the roll had one.
    pub fn natural_d20(&self) -> Option<u32> {
        self.components.iter().find_map(|c| match c {
            RollComponent::Dice {
                notation, rolls, ..
            } if notation == "1d20" => rolls.first().copied(),
            _ => None,
        })
    }
}

impl fmt::Display for RollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

// ============================================================================
// Advantage / disadvantage
// ============================================================================

/// How a d20 is rolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RollMode {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl RollMode {
    /// Combine two modes (advantage + disadvantage = normal).
    pub fn combine(self, other: RollMode) -> RollMode {
        match (self, other) {
            (RollMode::Normal, x) | (x, RollMode::Normal) => x,
            (RollMode::Advantage, RollMode::Disadvantage)
            | (RollMode::Disadvantage, RollMode::Advantage) => RollMode::Normal,
            (x, _) => x,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RollMode::Normal => "normal",
            RollMode::Advantage => "advantage",
            RollMode::Disadvantage => "disadvantage",
        }
    }
}

/// A d20 roll that may have been rolled twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct D20Roll {
    pub mode: RollMode,
    pub formula: String,
    /// One roll for normal mode, two otherwise.
    pub rolls: Vec<u32>,
    pub chosen: u32,
    /// Everything in the formula except the d20.
    pub remainder: RollResult,
    pub modifier: i32,
    pub total: i32,
}

impl D20Roll {
    pub fn is_critical(&self) -> bool {
        self.chosen == 20
    }

    pub fn is_fumble(&self) -> bool {
        self.chosen == 1
    }
}

impl fmt::Display for D20Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rolls = self
            .rolls
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        match self.mode {
            RollMode::Normal => write!(f, "1d20[{rolls}]")?,
            mode => write!(f, "1d20[{rolls}] ({}: {})", mode.name(), self.chosen)?,
        }
        write!(f, " {:+} = {}", self.modifier, self.total)
    }
}

/// Roll the formula's d20 according to `mode`, adding the rest of the formula.
pub fn roll_d20_with_rng<D: DieSource + ?Sized>(
    formula: &str,
    mode: RollMode,
    rng: &mut D,
) -> Result<D20Roll, DiceError> {
    let parsed = ParsedFormula::parse(formula);
    let (_, remainder) = parsed.split_d20()?;

    let rolls = match mode {
        RollMode::Normal => vec![rng.roll_die(20)],
        RollMode::Advantage | RollMode::Disadvantage => {
            vec![rng.roll_die(20), rng.roll_die(20)]
        }
    };
    let chosen = match mode {
        RollMode::Disadvantage => rolls.iter().copied().min(),
        _ => rolls.iter().copied().max(),
    }
    .unwrap_or(1);

    let remainder = remainder.roll_with_rng(rng);
    let modifier = remainder.total;

    Ok(D20Roll {
        mode,
        formula: formula.to_string(),
        rolls,
        chosen,
        total: modifier.saturating_add(chosen as i32),
        modifier,
        remainder,
    })
}

pub fn roll_advantage(formula: &str) -> Result<D20Roll, DiceError> {
    roll_d20_with_rng(formula, RollMode::Advantage, &mut rand::thread_rng())
}

pub fn roll_disadvantage(formula: &str) -> Result<D20Roll, DiceError> {
    roll_d20_with_rng(formula, RollMode::Disadvantage, &mut rand::thread_rng())
}

// ============================================================================
// Critical damage
// ============================================================================

/// Damage rolled with every dice count doubled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalRoll {
    pub original_formula: String,
    /// `roll.formula` holds the doubled formula.
    pub roll: RollResult,
}

pub fn roll_critical_with_rng<D: DieSource + ?Sized>(formula: &str, rng: &mut D) -> CriticalRoll {
    let doubled = ParsedFormula::parse(formula).doubled_dice();
    CriticalRoll {
        original_formula: formula.to_string(),
        roll: doubled.roll_with_rng(rng),
    }
}

pub fn roll_critical(formula: &str) -> CriticalRoll {
    roll_critical_with_rng(formula, &mut rand::thread_rng())
}

// ============================================================================
// Convenience functions
// ============================================================================

pub fn parse(formula: &str) -> ParsedFormula {
    ParsedFormula::parse(formula)
}

/// Roll a formula string. An unusable formula rolls to 0 with no components.
pub fn roll(formula: &str) -> RollResult {
    ParsedFormula::parse(formula).roll()
}

pub fn roll_with_rng<D: DieSource + ?Sized>(formula: &str, rng: &mut D) -> RollResult {
    ParsedFormula::parse(formula).roll_with_rng(rng)
}

/// Roll `count` dice of `sides` sides, returning each result.
pub fn roll_dice_with_rng<D: DieSource + ?Sized>(count: u32, sides: u32, rng: &mut D) -> Vec<u32> {
    (0..count).map(|_| rng.roll_die(sides)).collect()
}

/// Expected value of a formula. Deterministic.
pub fn average(formula: &str) -> f64 {
    ParsedFormula::parse(formula).average()
}

/// A formula is valid iff it yields at least one term.
pub fn validate(formula: &str) -> Result<(), DiceError> {
    if ParsedFormula::parse(formula).is_empty() {
        Err(DiceError::EmptyFormula(formula.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDice;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_simple() {
        let f = parse("1d20");
        assert_eq!(f.terms, vec![Term::Dice(DiceTerm::new(1, 20))]);
    }

    #[test]
    fn test_parse_count_defaults_to_one() {
        let f = parse("d8");
        assert_eq!(f.terms, vec![Term::Dice(DiceTerm::new(1, 8))]);
    }

    #[test]
    fn test_parse_mixed_terms_keep_order() {
        let f = parse(" 2d6 + 1d4 - 1d6 + 3 - 2 ");
        assert_eq!(
            f.terms,
            vec![
                Term::Dice(DiceTerm::new(2, 6)),
                Term::Dice(DiceTerm::new(1, 4)),
                Term::Dice(DiceTerm::new(1, 6).negated()),
                Term::Flat(FlatTerm { value: 3 }),
                Term::Flat(FlatTerm { value: -2 }),
            ]
        );
        assert_eq!(f.flat_total(), 1);
        assert_eq!(f.to_string(), "2d6+1d4-1d6+3-2");
    }

    #[test]
    fn test_parse_drops_garbage_fragments() {
        let f = parse("1d8+@STR+2x+3");
        assert_eq!(
            f.terms,
            vec![
                Term::Dice(DiceTerm::new(1, 8)),
                Term::Flat(FlatTerm { value: 3 })
            ]
        );
    }

    #[test]
    fn test_parse_garbage_is_empty() {
        assert!(parse("").is_empty());
        assert!(parse("fireball").is_empty());
        assert!(parse("0d6").is_empty());
        assert!(parse("2d").is_empty());
    }

    #[test]
    fn test_parse_unusual_sides_accepted() {
        let f = parse("3d7");
        assert_eq!(f.terms, vec![Term::Dice(DiceTerm::new(3, 7))]);
    }

    #[test]
    fn test_sign_run_folds() {
        let f = parse("1d8+-1");
        assert_eq!(f.flat_total(), -1);
    }

    #[test]
    fn test_roll_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let result = roll_with_rng("1d20+5", &mut rng);
            assert!((6..=25).contains(&result.total));
        }
    }

    #[test]
    fn test_roll_scripted() {
        let mut dice = ScriptedDice::new([3, 5, 2]);
        let result = roll_with_rng("2d6-1d4+1", &mut dice);
        assert_eq!(result.total, 3 + 5 - 2 + 1);
        assert_eq!(result.components.len(), 3);
        assert_eq!(
            result.components[0],
            RollComponent::Dice {
                notation: "2d6".to_string(),
                sign: Sign::Plus,
                rolls: vec![3, 5],
                subtotal: 8,
                total: 8,
            }
        );
        assert_eq!(result.components[1].total(), -2);
    }

    #[test]
    fn test_roll_empty_formula_totals_zero() {
        let result = roll("nothing here");
        assert_eq!(result.total, 0);
        assert!(result.components.is_empty());
    }

    #[test]
    fn test_advantage_keeps_higher() {
        let mut dice = ScriptedDice::new([4, 17]);
        let r = roll_d20_with_rng("1d20+5", RollMode::Advantage, &mut dice).unwrap();
        assert_eq!(r.rolls, vec![4, 17]);
        assert_eq!(r.chosen, 17);
        assert_eq!(r.modifier, 5);
        assert_eq!(r.total, 22);
    }

    #[test]
    fn test_disadvantage_keeps_lower() {
        let mut dice = ScriptedDice::new([4, 17, 2]);
        let r = roll_d20_with_rng("d20+1d4+1", RollMode::Disadvantage, &mut dice).unwrap();
        assert_eq!(r.chosen, 4);
        assert_eq!(r.modifier, 3);
        assert_eq!(r.total, 7);
    }

    #[test]
    fn test_advantage_d20_not_first() {
        let mut dice = ScriptedDice::new([10, 12]);
        let r = roll_d20_with_rng("3+1d20", RollMode::Advantage, &mut dice).unwrap();
        assert_eq!(r.total, 15);
    }

    #[test]
    fn test_advantage_rejects_multiple_d20() {
        let mut dice = ScriptedDice::new([10]);
        assert!(matches!(
            roll_d20_with_rng("1d20+1d20", RollMode::Advantage, &mut dice),
            Err(DiceError::AmbiguousD20(_))
        ));
        assert!(matches!(
            roll_d20_with_rng("2d20+3", RollMode::Advantage, &mut dice),
            Err(DiceError::AmbiguousD20(_))
        ));
        assert!(matches!(
            roll_d20_with_rng("2d6", RollMode::Advantage, &mut dice),
            Err(DiceError::MissingD20(_))
        ));
        assert!(matches!(
            roll_d20_with_rng("", RollMode::Advantage, &mut dice),
            Err(DiceError::EmptyFormula(_))
        ));
    }

    #[test]
    fn test_critical_doubles_only_dice() {
        let mut dice = ScriptedDice::new([8, 8, 4, 4]);
        let crit = roll_critical_with_rng("1d8+1d4+4", &mut dice);
        assert_eq!(crit.original_formula, "1d8+1d4+4");
        assert_eq!(crit.roll.formula, "2d8+2d4+4");
        assert_eq!(crit.roll.total, 28);
    }

    #[test]
    fn test_critical_range() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..200 {
            let crit = roll_critical_with_rng("1d8+4", &mut rng);
            assert_eq!(crit.roll.formula, "2d8+4");
            assert!((6..=20).contains(&crit.roll.total));
        }
    }

    #[test]
    fn test_average() {
        assert_eq!(average("1d8+4"), 8.5);
        assert_eq!(average("2d6+1d4+3"), 12.5);
        assert_eq!(average("1d20-1d4"), 8.0);
        assert_eq!(average(""), 0.0);
    }

    #[test]
    fn test_validate() {
        assert!(validate("1d20+5").is_ok());
        assert!(validate("7").is_ok());
        assert_eq!(
            validate("abc"),
            Err(DiceError::EmptyFormula("abc".to_string()))
        );
    }

    #[test]
    fn test_display_helpers() {
        let mut dice = ScriptedDice::new([14]);
        let result = roll_with_rng("1d20+5", &mut dice);
        assert_eq!(result.summary(), "1d20[14] +5 = 19");
        assert_eq!(result.breakdown(), "1d20[14] = 14 +5 = 19");
        assert_eq!(result.natural_d20(), Some(14));
    }

    #[test]
    fn test_roll_mode_combine() {
        assert_eq!(
            RollMode::Normal.combine(RollMode::Advantage),
            RollMode::Advantage
        );
        assert_eq!(
            RollMode::Advantage.combine(RollMode::Disadvantage),
            RollMode::Normal
        );
        assert_eq!(
            RollMode::Disadvantage.combine(RollMode::Disadvantage),
            RollMode::Disadvantage
        );
    }

    #[test]
    fn test_out_of_range_terms_dropped() {
        assert!(parse("4000000000d6").is_empty());
        assert!(parse("1d4000000000").is_empty());
        assert_eq!(
            parse("2d2000000000+3").terms,
            vec![Term::Flat(FlatTerm { value: 3 })]
        );
        assert_eq!(roll("2147483647+1").total, 1);
        assert!(validate("1001d6").is_err());
    }

    #[test]
    fn test_largest_terms_roll_exactly() {
        let mut dice = ScriptedDice::new([1000]);
        let result = roll_with_rng("1000d1000+1000000", &mut dice);
        assert_eq!(result.total, 2_000_000);

        let crit = roll_critical_with_rng("1000d1000", &mut dice);
        assert_eq!(crit.roll.total, 2_000_000);
    }

    #[test]
    fn test_total_saturates_instead_of_wrapping() {
        let formula = vec!["1000000"; 3000].join("+");
        assert_eq!(roll(&formula).total, i32::MAX);

        let negative = vec!["1000000"; 3000].join("-");
        assert_eq!(roll(&format!("-{negative}")).total, i32::MIN);
    }
}
