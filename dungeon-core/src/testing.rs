//! Testing utilities for the dungeon engine.
//!
//! This module provides tools for integration testing:
//! - `ScriptedOracle` for deterministic rolls without dice
//! - `TestHarness` for scripted dungeon scenarios
//! - Assertion helpers for verifying dungeon state

use crate::collaborators::Collaborators;
use crate::config::DungeonConfig;
use crate::error::Result;
use crate::events::Resolution;
use crate::oracle::{Choice, Oracle, RollOutcome, RollRequest};
use crate::orchestrator::{DoorActor, DoorInteraction, DungeonOrchestrator, Resolved};
use crate::room::{DoorId, DoorState};
use crate::state::{DungeonState, Hero, HeroId, Party, Quest};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;

/// An oracle that answers from scripted queues.
///
/// Rolls are returned in order regardless of the dice asked for. Once a
/// queue runs dry every further request is cancelled, which makes it
/// easy to test that a step leaves state untouched.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    rolls: VecDeque<i32>,
    answers: VecDeque<bool>,
    /// Every roll prompt seen, in order.
    prompts: Vec<String>,
}

impl ScriptedOracle {
    pub fn new(rolls: Vec<i32>) -> Self {
        Self {
            rolls: rolls.into(),
            answers: VecDeque::new(),
            prompts: Vec::new(),
        }
    }

    pub fn with_answers(mut self, answers: Vec<bool>) -> Self {
        self.answers = answers.into();
        self
    }

    /// Add rolls to the end of the queue.
    pub fn queue_rolls(&mut self, rolls: &[i32]) {
        self.rolls.extend(rolls.iter().copied());
    }

    pub fn queue_answer(&mut self, answer: bool) {
        self.answers.push_back(answer);
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn remaining_rolls(&self) -> usize {
        self.rolls.len()
    }
}

impl Oracle for ScriptedOracle {
    fn roll(&mut self, request: &RollRequest) -> RollOutcome {
        self.prompts.push(request.prompt.clone());
        match self.rolls.pop_front() {
            Some(value) => RollOutcome::Rolled(value),
            None => RollOutcome::Cancelled,
        }
    }

    fn ask_yes_no(&mut self, _prompt: &str) -> Choice {
        match self.answers.pop_front() {
            Some(true) => Choice::Yes,
            Some(false) => Choice::No,
            None => Choice::Cancelled,
        }
    }
}

/// Test harness for running dungeon scenarios.
pub struct TestHarness {
    pub state: DungeonState,
    pub orchestrator: DungeonOrchestrator,
    pub oracle: ScriptedOracle,
}

impl TestHarness {
    /// A two-hero party standing in the entrance of a seeded dungeon.
    pub fn new() -> Self {
        Self::with_config(DungeonConfig::default().with_seed(42))
    }

    pub fn with_config(config: DungeonConfig) -> Self {
        let seed = config.seed.unwrap_or(42);
        let quest = Quest::new("Test Delve", &config);
        let party = Party::new(vec![Hero::new("Aria", 12), Hero::new("Bram", 14)]);
        let mut rng = StdRng::seed_from_u64(seed);
        let state = match DungeonState::begin(party, quest, &config, &mut rng) {
            Ok(state) => state,
            Err(e) => panic!("test dungeon failed to start: {e}"),
        };
        Self::with_state(state, seed)
    }

    /// Wrap a hand-built state.
    pub fn with_state(state: DungeonState, seed: u64) -> Self {
        Self {
            state,
            orchestrator: DungeonOrchestrator::new(Collaborators::standard(seed), seed),
            oracle: ScriptedOracle::default(),
        }
    }

    /// Queue rolls for the next operations.
    pub fn expect_rolls(&mut self, rolls: &[i32]) -> &mut Self {
        self.oracle.queue_rolls(rolls);
        self
    }

    pub fn first_hero(&self) -> HeroId {
        self.state.party.heroes[0].id
    }

    /// The door every dungeon starts with.
    pub fn entrance_door(&self) -> DoorId {
        DoorId(0)
    }

    /// Have the first hero work a door.
    pub fn open(&mut self, door: DoorId) -> Result<Resolved<DoorInteraction>> {
        let hero = self.first_hero();
        self.orchestrator
            .interact_with_door(&mut self.state, &mut self.oracle, door, DoorActor::Hero(hero))
    }

    pub fn end_turn(&mut self) -> Result<Resolution> {
        self.orchestrator.end_turn(&mut self.state, &mut self.oracle)
    }

    pub fn threat(&self) -> i32 {
        self.state.threat.current_threat
    }

    pub fn door_state(&self, door: DoorId) -> Option<DoorState> {
        self.state.door(door).ok().map(|d| d.state)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the current threat level.
#[track_caller]
pub fn assert_threat(harness: &TestHarness, expected: i32) {
    assert_eq!(
        harness.threat(),
        expected,
        "Expected threat {expected}, got {}",
        harness.threat()
    );
}

/// Assert threat is inside the configured range.
#[track_caller]
pub fn assert_threat_in_bounds(harness: &TestHarness) {
    let t = &harness.state.threat;
    assert!(
        (t.min_threat..=t.max_threat).contains(&t.current_threat),
        "Threat {} outside [{}, {}]",
        t.current_threat,
        t.min_threat,
        t.max_threat
    );
}

#[track_caller]
pub fn assert_door_state(harness: &TestHarness, door: DoorId, expected: DoorState) {
    assert_eq!(harness.door_state(door), Some(expected), "Unexpected state for {door}");
}

/// Assert the party is fighting somewhere.
#[track_caller]
pub fn assert_in_battle(harness: &TestHarness) {
    assert!(harness.state.in_battle(), "Expected to be in battle");
}

/// Assert the party is NOT fighting.
#[track_caller]
pub fn assert_not_in_battle(harness: &TestHarness) {
    assert!(!harness.state.in_battle(), "Expected to NOT be in battle");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::DiceExpression;
    use crate::oracle::request_roll;

    #[test]
    fn test_scripted_rolls_in_order() {
        let mut oracle = ScriptedOracle::new(vec![3, 17]);
        assert_eq!(request_roll(&mut oracle, "first", DiceExpression::d6()).unwrap(), 3);
        assert_eq!(request_roll(&mut oracle, "second", DiceExpression::d20()).unwrap(), 17);
        assert!(request_roll(&mut oracle, "third", DiceExpression::d20()).is_err());
        assert_eq!(oracle.prompts(), ["first", "second", "third"]);
    }

    #[test]
    fn test_scripted_answers() {
        let mut oracle = ScriptedOracle::default().with_answers(vec![false]);
        assert_eq!(oracle.ask_yes_no("again?"), Choice::No);
        assert_eq!(oracle.ask_yes_no("again?"), Choice::Cancelled);
    }

    #[test]
    fn test_harness_starts_in_entrance() {
        let harness = TestHarness::new();
        assert_eq!(harness.state.rooms.len(), 1);
        assert_door_state(&harness, harness.entrance_door(), DoorState::Closed);
        assert_threat(&harness, 0);
        assert_not_in_battle(&harness);
    }

    #[test]
    fn test_harness_opens_entrance() {
        let mut harness = TestHarness::new();
        // no trap, no lock, no encounter
        harness.expect_rolls(&[1, 1, 100]);
        let result = harness.open(harness.entrance_door()).unwrap();
        assert!(matches!(result.outcome, DoorInteraction::Opened { room: Some(_) }));
        assert_threat(&harness, 1);
        assert_threat_in_bounds(&harness);
        assert_eq!(harness.oracle.remaining_rolls(), 0);
    }
}
