//! Dice rolling system
//!
//! Parses and rolls dice notation like "2d6+3", "1d20", "4d6-2".
//! Randomness comes from an injected [`DiceSource`] so that rounds can be
//! replayed from a seed or scripted in tests.

use std::collections::VecDeque;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::warn;

/// Largest number of dice accepted in a single expression
pub const MAX_DICE_COUNT: u32 = 100;

/// Largest die accepted in a single expression
pub const MAX_DIE_SIDES: u32 = 1000;

/// Errors produced while parsing dice notation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("empty dice notation")]
    Empty,

    #[error("missing 'd' in dice notation: {0}")]
    MissingSeparator(String),

    #[error("invalid dice count: {0}")]
    InvalidCount(String),

    #[error("invalid die sides: {0}")]
    InvalidSides(String),

    #[error("invalid modifier: {0}")]
    InvalidModifier(String),

    #[error("dice out of range: {count}d{sides} (max 100d1000)")]
    OutOfRange { count: u32, sides: u32 },
}

/// Source of individual die faces
pub trait DiceSource {
    /// Roll one die with the given number of sides, returning 1..=sides
    fn roll_die(&mut self, sides: u32) -> u32;
}

/// Dice backed by a seedable RNG
#[derive(Debug, Clone)]
pub struct RngDice {
    rng: StdRng,
}

impl RngDice {
    /// Dice seeded from operating system entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible dice for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DiceSource for RngDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides <= 1 {
            return 1;
        }
        self.rng.random_range(1..=sides)
    }
}

/// Dice that replay a fixed sequence of faces.
///
/// Each queued face is clamped into `1..=sides` of the die being rolled.
/// Once the queue is exhausted the fallback face is used.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    faces: VecDeque<u32>,
    fallback: u32,
}

impl ScriptedDice {
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
            fallback: 1,
        }
    }

    /// Face returned after the script runs out
    pub fn with_fallback(mut self, face: u32) -> Self {
        self.fallback = face;
        self
    }

    /// Queue more faces at the end of the script
    pub fn push(&mut self, faces: impl IntoIterator<Item = u32>) {
        self.faces.extend(faces);
    }

    /// Number of faces not yet consumed
    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl DiceSource for ScriptedDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        let face = self.faces.pop_front().unwrap_or(self.fallback);
        face.clamp(1, sides.max(1))
    }
}

/// A parsed dice roll specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceRoll {
    /// Number of dice to roll
    pub count: u32,
    /// Number of sides per die
    pub sides: u32,
    /// Modifier to add/subtract
    pub modifier: i32,
}

/// Faces rolled for one dice expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceOutcome {
    pub faces: Vec<u32>,
    pub modifier: i32,
    pub total: i32,
}

impl DiceOutcome {
    /// Sum of the faces without the flat modifier
    pub fn dice_total(&self) -> i32 {
        self.faces.iter().sum::<u32>() as i32
    }
}

impl DiceRoll {
    /// Create a new dice roll
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// Same dice with a different flat modifier
    pub fn with_modifier(self, modifier: i32) -> Self {
        Self { modifier, ..self }
    }

    /// Roll the dice. A critical roll doubles the dice pool but adds the
    /// modifier only once.
    pub fn roll(&self, dice: &mut dyn DiceSource, critical: bool) -> DiceOutcome {
        let count = if critical { self.count * 2 } else { self.count };
        let faces: Vec<u32> = (0..count).map(|_| dice.roll_die(self.sides)).collect();
        let total = faces.iter().sum::<u32>() as i32 + self.modifier;
        DiceOutcome {
            faces,
            modifier: self.modifier,
            total,
        }
    }

    /// Get the minimum possible result
    pub fn min(&self) -> i32 {
        self.count as i32 + self.modifier
    }

    /// Get the maximum possible result
    pub fn max(&self) -> i32 {
        (self.count * self.sides) as i32 + self.modifier
    }

    /// Get the expected average (rounded down)
    pub fn average(&self) -> i32 {
        let avg_per_die = (1.0 + self.sides as f64) / 2.0;
        (self.count as f64 * avg_per_die + self.modifier as f64) as i32
    }
}

impl FromStr for DiceRoll {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dice(s)
    }
}

impl std::fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifier > 0 {
            write!(f, "{}d{}+{}", self.count, self.sides, self.modifier)
        } else if self.modifier < 0 {
            write!(f, "{}d{}{}", self.count, self.sides, self.modifier)
        } else {
            write!(f, "{}d{}", self.count, self.sides)
        }
    }
}

impl serde::Serialize for DiceRoll {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for DiceRoll {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let notation = String::deserialize(deserializer)?;
        parse_dice(&notation).map_err(serde::de::Error::custom)
    }
}

/// Parse a dice notation string like "2d6+3"
pub fn parse_dice(notation: &str) -> Result<DiceRoll, DiceError> {
    let notation = notation.trim().to_lowercase();
    if notation.is_empty() {
        return Err(DiceError::Empty);
    }

    let d_pos = notation
        .find('d')
        .ok_or_else(|| DiceError::MissingSeparator(notation.clone()))?;

    // "d6" means "1d6"
    let count_str = &notation[..d_pos];
    let count: u32 = if count_str.is_empty() {
        1
    } else {
        count_str
            .parse()
            .map_err(|_| DiceError::InvalidCount(count_str.to_string()))?
    };

    if count == 0 {
        return Err(DiceError::InvalidCount(count_str.to_string()));
    }

    let rest = &notation[d_pos + 1..];
    let (sides_str, modifier) = if let Some(plus_pos) = rest.find('+') {
        let mod_str = &rest[plus_pos + 1..];
        let modifier: i32 = mod_str
            .parse()
            .map_err(|_| DiceError::InvalidModifier(mod_str.to_string()))?;
        (&rest[..plus_pos], modifier)
    } else if let Some(minus_pos) = rest.rfind('-') {
        // includes the minus sign
        let mod_str = &rest[minus_pos..];
        let modifier: i32 = mod_str
            .parse()
            .map_err(|_| DiceError::InvalidModifier(mod_str.to_string()))?;
        (&rest[..minus_pos], modifier)
    } else {
        (rest, 0)
    };

    let sides: u32 = sides_str
        .parse()
        .map_err(|_| DiceError::InvalidSides(sides_str.to_string()))?;

    if sides == 0 {
        return Err(DiceError::InvalidSides(sides_str.to_string()));
    }

    if count > MAX_DICE_COUNT || sides > MAX_DIE_SIDES {
        return Err(DiceError::OutOfRange { count, sides });
    }

    Ok(DiceRoll {
        count,
        sides,
        modifier,
    })
}

/// Roll a notation string, falling back to 0 on malformed input
pub fn roll_notation(notation: &str, dice: &mut dyn DiceSource) -> i32 {
    match parse_dice(notation) {
        Ok(roll) => roll.roll(dice, false).total,
        Err(e) => {
            warn!("Ignoring malformed dice notation {:?}: {}", notation, e);
            0
        }
    }
}

/// Roll a single d20
pub fn roll_d20(dice: &mut dyn DiceSource) -> u32 {
    dice.roll_die(20)
}

/// Check if a d20 roll is a natural 20 (critical hit)
pub fn is_critical(roll: u32) -> bool {
    roll == 20
}

/// Check if a d20 roll is a natural 1 (critical fail)
pub fn is_fumble(roll: u32) -> bool {
    roll == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let roll = parse_dice("2d6").unwrap();
        assert_eq!(roll.count, 2);
        assert_eq!(roll.sides, 6);
        assert_eq!(roll.modifier, 0);
    }

    #[test]
    fn test_parse_with_plus() {
        let roll = parse_dice("1d20+5").unwrap();
        assert_eq!(roll, DiceRoll::new(1, 20, 5));
    }

    #[test]
    fn test_parse_with_minus() {
        let roll = parse_dice("3d8-2").unwrap();
        assert_eq!(roll, DiceRoll::new(3, 8, -2));
    }

    #[test]
    fn test_parse_implicit_one_and_case() {
        assert_eq!(parse_dice("d6").unwrap(), DiceRoll::new(1, 6, 0));
        assert_eq!(parse_dice("  2D10+3  ").unwrap(), DiceRoll::new(2, 10, 3));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(parse_dice(""), Err(DiceError::Empty));
        assert!(matches!(parse_dice("abc"), Err(DiceError::MissingSeparator(_))));
        assert!(parse_dice("2d").is_err());
        assert!(parse_dice("d").is_err());
        assert!(parse_dice("0d6").is_err());
        assert!(parse_dice("2d0").is_err());
        assert!(parse_dice("2d6+x").is_err());
    }

    #[test]
    fn test_parse_out_of_range() {
        assert_eq!(
            parse_dice("101d6"),
            Err(DiceError::OutOfRange {
                count: 101,
                sides: 6
            })
        );
        assert!(parse_dice("1d1001").is_err());
        assert!(parse_dice("100d1000").is_ok());
    }

    #[test]
    fn test_roll_bounds() {
        let roll = DiceRoll::new(2, 6, 0);
        let mut dice = RngDice::seeded(7);

        for _ in 0..100 {
            let result = roll.roll(&mut dice, false).total;
            assert!((2..=12).contains(&result), "Roll {} out of range", result);
        }
    }

    #[test]
    fn test_seeded_dice_repeat() {
        let mut a = RngDice::seeded(42);
        let mut b = RngDice::seeded(42);
        for _ in 0..50 {
            assert_eq!(a.roll_die(20), b.roll_die(20));
        }
    }

    #[test]
    fn test_critical_doubles_dice_not_modifier() {
        let roll = DiceRoll::new(2, 6, 3);
        let mut dice = ScriptedDice::new([1, 2, 3, 4]);
        let outcome = roll.roll(&mut dice, true);

        assert_eq!(outcome.faces, vec![1, 2, 3, 4]);
        assert_eq!(outcome.modifier, 3);
        assert_eq!(outcome.total, 13);
        assert_eq!(outcome.dice_total(), 10);
    }

    #[test]
    fn test_scripted_dice_clamps_and_falls_back() {
        let mut dice = ScriptedDice::new([9, 0]).with_fallback(4);
        assert_eq!(dice.roll_die(6), 6);
        assert_eq!(dice.roll_die(6), 1);
        assert_eq!(dice.remaining(), 0);
        assert_eq!(dice.roll_die(6), 4);
    }

    #[test]
    fn test_roll_notation_fallback() {
        let mut dice = ScriptedDice::new([5]);
        assert_eq!(roll_notation("not dice", &mut dice), 0);
        assert_eq!(dice.remaining(), 1);
        assert_eq!(roll_notation("1d6+1", &mut dice), 6);
    }

    #[test]
    fn test_min_max_average() {
        let roll = DiceRoll::new(2, 6, 3);
        assert_eq!(roll.min(), 5);
        assert_eq!(roll.max(), 15);
        assert_eq!(roll.average(), 10);
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(DiceRoll::new(2, 6, 0).to_string(), "2d6");
        assert_eq!(DiceRoll::new(1, 20, 5).to_string(), "1d20+5");
        assert_eq!(DiceRoll::new(3, 8, -2).to_string(), "3d8-2");

        let json = serde_json::to_string(&DiceRoll::new(1, 8, 1)).unwrap();
        assert_eq!(json, "\"1d8+1\"");
        let back: DiceRoll = serde_json::from_str("\"2d4\"").unwrap();
        assert_eq!(back, DiceRoll::new(2, 4, 0));
        assert!(serde_json::from_str::<DiceRoll>("\"banana\"").is_err());
    }

    #[test]
    fn test_critical_fumble() {
        assert!(is_critical(20));
        assert!(!is_critical(19));
        assert!(is_fumble(1));
        assert!(!is_fumble(2));
    }
}
