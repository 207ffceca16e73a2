//! Roll and choice requests.
//!
//! The engine never rolls rule-visible dice itself. Each roll is sent out
//! as a [`RollRequest`] value to an [`Oracle`] supplied by the driver,
//! which may show it to a player, roll real dice, or replay a script.
//! Requests are always issued before the state they influence is
//! touched, so an unanswered request leaves the dungeon unchanged.

use crate::dice::DiceExpression;
use crate::error::{DungeonError, Result};
use crate::state::HeroId;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Skill context attached to rolls made on behalf of a hero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillContext {
    pub hero_id: HeroId,
    pub skill: String,
}

/// A rule-visible roll the engine needs answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollRequest {
    pub prompt: String,
    pub dice: DiceExpression,
    pub skill: Option<SkillContext>,
}

impl RollRequest {
    pub fn new(prompt: impl Into<String>, dice: DiceExpression) -> Self {
        Self {
            prompt: prompt.into(),
            dice,
            skill: None,
        }
    }

    pub fn with_skill(mut self, hero_id: HeroId, skill: impl Into<String>) -> Self {
        self.skill = Some(SkillContext {
            hero_id,
            skill: skill.into(),
        });
        self
    }
}

/// Answer to a roll request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollOutcome {
    Rolled(i32),
    Cancelled,
}

/// Answer to a yes/no request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice {
    Yes,
    No,
    Cancelled,
}

/// Whoever answers the engine's suspension points.
pub trait Oracle {
    fn roll(&mut self, request: &RollRequest) -> RollOutcome;

    fn ask_yes_no(&mut self, prompt: &str) -> Choice;
}

/// Issue a roll request and unwrap the numeric result.
///
/// A cancelled roll becomes [`DungeonError::Cancelled`] so callers can
/// bail out with `?` before mutating anything.
pub fn request_roll(
    oracle: &mut dyn Oracle,
    prompt: impl Into<String>,
    dice: DiceExpression,
) -> Result<i32> {
    request(oracle, RollRequest::new(prompt, dice))
}

/// Issue a fully built request, e.g. one carrying a skill context.
pub fn request(oracle: &mut dyn Oracle, request: RollRequest) -> Result<i32> {
    match oracle.roll(&request) {
        RollOutcome::Rolled(value) => {
            tracing::debug!(prompt = %request.prompt, dice = %request.dice, value, "roll answered");
            Ok(value)
        }
        RollOutcome::Cancelled => Err(DungeonError::Cancelled(request.prompt)),
    }
}

/// Issue a yes/no request.
pub fn request_choice(oracle: &mut dyn Oracle, prompt: &str) -> Result<bool> {
    match oracle.ask_yes_no(prompt) {
        Choice::Yes => Ok(true),
        Choice::No => Ok(false),
        Choice::Cancelled => Err(DungeonError::Cancelled(prompt.to_string())),
    }
}

/// Oracle that answers every roll with real dice.
///
/// Yes/no questions get a fixed answer, which makes it suitable for
/// unattended runs.
pub struct DiceOracle<R: Rng> {
    rng: R,
    default_answer: bool,
}

impl<R: Rng> DiceOracle<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            default_answer: true,
        }
    }

    pub fn with_default_answer(mut self, answer: bool) -> Self {
        self.default_answer = answer;
        self
    }
}

impl<R: Rng> Oracle for DiceOracle<R> {
    fn roll(&mut self, request: &RollRequest) -> RollOutcome {
        let result = request.dice.roll_with_rng(&mut self.rng);
        RollOutcome::Rolled(result.total)
    }

    fn ask_yes_no(&mut self, _prompt: &str) -> Choice {
        if self.default_answer {
            Choice::Yes
        } else {
            Choice::No
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Refusing;

    impl Oracle for Refusing {
        fn roll(&mut self, _request: &RollRequest) -> RollOutcome {
            RollOutcome::Cancelled
        }

        fn ask_yes_no(&mut self, _prompt: &str) -> Choice {
            Choice::Cancelled
        }
    }

    #[test]
    fn test_cancelled_roll_becomes_error() {
        let err = request_roll(&mut Refusing, "Trap check", DiceExpression::d6()).unwrap_err();
        assert_eq!(err, DungeonError::Cancelled("Trap check".to_string()));
        assert!(request_choice(&mut Refusing, "Reroll?").is_err());
    }

    #[test]
    fn test_dice_oracle_stays_in_bounds() {
        let mut oracle = DiceOracle::new(StdRng::seed_from_u64(3));
        let dice = DiceExpression::d10().plus(2);
        for _ in 0..100 {
            let value = request_roll(&mut oracle, "Scenario roll", dice.clone()).unwrap();
            assert!((3..=12).contains(&value));
        }
    }

    #[test]
    fn test_dice_oracle_default_answer() {
        let mut oracle = DiceOracle::new(StdRng::seed_from_u64(3)).with_default_answer(false);
        assert!(!request_choice(&mut oracle, "Reroll?").unwrap());
    }
}
