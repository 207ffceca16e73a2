//! Dice notation used by rule-visible rolls.
//!
//! Every roll the engine asks for is described by a [`DiceExpression`]
//! such as `1d10+2` or `1d100`. The expression travels inside a roll
//! request to whoever answers it; [`DiceExpression::roll_with_rng`] is
//! what the dice-backed oracle uses to answer with real randomness.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("No dice specified")]
    NoDice,
}

/// Die sizes used by the dungeon rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieType {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    D100,
}

impl DieType {
    pub fn sides(&self) -> u32 {
        match self {
            DieType::D4 => 4,
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
            DieType::D20 => 20,
            DieType::D100 => 100,
        }
    }

    pub fn from_sides(sides: u32) -> Option<DieType> {
        match sides {
            4 => Some(DieType::D4),
            6 => Some(DieType::D6),
            8 => Some(DieType::D8),
            10 => Some(DieType::D10),
            12 => Some(DieType::D12),
            20 => Some(DieType::D20),
            100 => Some(DieType::D100),
            _ => None,
        }
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// A group of identical dice, e.g. the `2d6` in `2d6+1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceComponent {
    pub count: u32,
    pub die_type: DieType,
}

/// A complete dice expression (e.g., `1d10+2`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    pub components: Vec<DiceComponent>,
    pub modifier: i32,
}

impl DiceExpression {
    /// `count` dice of one type with no modifier.
    pub fn new(count: u32, die_type: DieType) -> Self {
        Self {
            components: vec![DiceComponent { count, die_type }],
            modifier: 0,
        }
    }

    pub fn d6() -> Self {
        Self::new(1, DieType::D6)
    }

    pub fn d10() -> Self {
        Self::new(1, DieType::D10)
    }

    pub fn d20() -> Self {
        Self::new(1, DieType::D20)
    }

    pub fn d100() -> Self {
        Self::new(1, DieType::D100)
    }

    /// Add a flat modifier to the expression.
    pub fn plus(mut self, modifier: i32) -> Self {
        self.modifier += modifier;
        self
    }

    /// Parse a dice notation string.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation = notation.trim().to_lowercase();
        if notation.is_empty() {
            return Err(DiceError::NoDice);
        }

        let mut components = Vec::new();
        let mut modifier: i32 = 0;
        let mut current = String::new();
        let mut sign: i32 = 1;

        for ch in notation.chars() {
            match ch {
                '+' | '-' => {
                    if !current.is_empty() {
                        Self::parse_term(&current, sign, &mut components, &mut modifier)?;
                        current.clear();
                    }
                    sign = if ch == '+' { 1 } else { -1 };
                }
                ' ' => continue,
                _ => current.push(ch),
            }
        }

        if !current.is_empty() {
            Self::parse_term(&current, sign, &mut components, &mut modifier)?;
        }

        if components.is_empty() {
            return Err(DiceError::NoDice);
        }

        Ok(DiceExpression {
            components,
            modifier,
        })
    }

    fn parse_term(
        s: &str,
        sign: i32,
        components: &mut Vec<DiceComponent>,
        modifier: &mut i32,
    ) -> Result<(), DiceError> {
        let Some(d_pos) = s.find('d') else {
            let value: i32 = s
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
            *modifier += sign * value;
            return Ok(());
        };

        if sign < 0 {
            return Err(DiceError::InvalidNotation(s.to_string()));
        }

        let count_str = &s[..d_pos];
        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?
        };
        let sides: u32 = s[d_pos + 1..]
            .parse()
            .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
        let die_type = DieType::from_sides(sides).ok_or(DiceError::InvalidDieSize(sides))?;

        components.push(DiceComponent { count, die_type });
        Ok(())
    }

    /// Smallest and largest totals this expression can produce.
    pub fn bounds(&self) -> (i32, i32) {
        let dice: u32 = self.components.iter().map(|c| c.count).sum();
        let max: u32 = self
            .components
            .iter()
            .map(|c| c.count * c.die_type.sides())
            .sum();
        (dice as i32 + self.modifier, max as i32 + self.modifier)
    }

    /// Roll with a specific RNG.
    pub fn roll_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> RollResult {
        let mut rolls = Vec::new();
        for component in &self.components {
            for _ in 0..component.count {
                rolls.push(rng.gen_range(1..=component.die_type.sides()));
            }
        }

        let dice_total: i32 = rolls.iter().map(|r| *r as i32).sum();
        RollResult {
            expression: self.clone(),
            rolls,
            total: dice_total + self.modifier,
        }
    }
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dice: Vec<String> = self
            .components
            .iter()
            .map(|c| format!("{}{}", c.count, c.die_type))
            .collect();
        write!(f, "{}", dice.join("+"))?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}

/// Result of rolling a dice expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollResult {
    pub expression: DiceExpression,
    pub rolls: Vec<u32>,
    pub total: i32,
}

impl fmt::Display for RollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rolls: Vec<String> = self.rolls.iter().map(|r| r.to_string()).collect();
        write!(f, "{} [{}] = {}", self.expression, rolls.join(", "), self.total)
    }
}
