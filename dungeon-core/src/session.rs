//! DungeonSession - the primary public API for running a delve.
//!
//! A session owns the dungeon state, the orchestrator and the oracle
//! that answers its rolls, so callers only deal with heroes, doors and
//! turns.

use crate::collaborators::{Attempt, Collaborators, UnlockMethod};
use crate::config::DungeonConfig;
use crate::error::Result;
use crate::events::Resolution;
use crate::oracle::Oracle;
use crate::orchestrator::{DoorActor, DoorInteraction, DungeonOrchestrator, Resolved, SearchOutcome};
use crate::room::{DoorId, RoomId};
use crate::state::{DungeonState, HeroId, LeverId, Party, Quest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// What happened when a turn ended.
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// The turn that just finished, starting at 1.
    pub turn: u32,

    /// Events and narration from the threat clock and monster moves.
    pub resolution: Resolution,

    /// Threat once the turn is done.
    pub threat: i32,

    /// Whether any room is fighting.
    pub in_battle: bool,
}

/// A delve through one procedurally revealed dungeon.
pub struct DungeonSession<O: Oracle> {
    config: DungeonConfig,
    state: DungeonState,
    orchestrator: DungeonOrchestrator,
    oracle: O,
    turn: u32,
}

impl<O: Oracle> DungeonSession<O> {
    /// Build the deck, lay out the entrance and place the party.
    ///
    /// One seed drives both the layout and the collaborators; it comes
    /// from the config when set.
    pub fn new(party: Party, quest: Quest, config: DungeonConfig, oracle: O) -> Result<Self> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = DungeonState::begin(party, quest, &config, &mut rng)?;
        let seed: u64 = rng.gen();
        Ok(Self {
            config,
            state,
            orchestrator: DungeonOrchestrator::new(Collaborators::standard(seed), seed),
            oracle,
            turn: 0,
        })
    }

    /// Swap in custom collaborators.
    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        *self.orchestrator.collaborators_mut() = collaborators;
        self
    }

    /// A hero works a door.
    pub fn open_door(&mut self, door: DoorId, hero: HeroId) -> Result<Resolved<DoorInteraction>> {
        self.orchestrator
            .interact_with_door(&mut self.state, &mut self.oracle, door, DoorActor::Hero(hero))
    }

    pub fn attempt_unlock(
        &mut self,
        door: DoorId,
        hero: HeroId,
        method: UnlockMethod,
    ) -> Result<Resolved<Attempt>> {
        self.orchestrator
            .attempt_unlock(&mut self.state, &mut self.oracle, door, hero, method)
    }

    pub fn disarm_trap(&mut self, door: DoorId, hero: HeroId) -> Result<Resolved<Attempt>> {
        self.orchestrator
            .disarm_trap(&mut self.state, &mut self.oracle, door, hero)
    }

    pub fn seal_door(&mut self, door: DoorId) -> Result<Resolved<bool>> {
        self.orchestrator.seal_door(&mut self.state, door)
    }

    pub fn search_room(&mut self, room: RoomId, hero: HeroId) -> Result<Resolved<SearchOutcome>> {
        self.orchestrator
            .search_room(&mut self.state, &mut self.oracle, room, hero)
    }

    pub fn pull_lever(&mut self, lever: LeverId, hero: HeroId) -> Result<Resolved<Attempt>> {
        self.orchestrator
            .pull_lever(&mut self.state, &mut self.oracle, lever, hero)
    }

    pub fn end_encounter(&mut self, room: RoomId) -> Result<Resolution> {
        self.orchestrator.end_encounter(&mut self.state, room)
    }

    /// Run end-of-turn processing.
    ///
    /// The turn counter only advances when processing finishes; a
    /// cancelled roll leaves it where it was.
    pub fn end_turn(&mut self) -> Result<TurnReport> {
        let resolution = self.orchestrator.end_turn(&mut self.state, &mut self.oracle)?;
        self.turn += 1;
        tracing::debug!(turn = self.turn, threat = self.threat(), "turn ended");
        Ok(TurnReport {
            turn: self.turn,
            resolution,
            threat: self.threat(),
            in_battle: self.state.in_battle(),
        })
    }

    /// Get a reference to the dungeon state.
    pub fn state(&self) -> &DungeonState {
        &self.state
    }

    /// Get a mutable reference to the dungeon state.
    ///
    /// Use with caution - direct modifications bypass the orchestrator.
    pub fn state_mut(&mut self) -> &mut DungeonState {
        &mut self.state
    }

    pub fn config(&self) -> &DungeonConfig {
        &self.config
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    /// Turns completed so far.
    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn threat(&self) -> i32 {
        self.state.threat.current_threat
    }

    pub fn in_battle(&self) -> bool {
        self.state.in_battle()
    }

    /// Doors that are still shut.
    pub fn closed_doors(&self) -> Vec<DoorId> {
        self.state.closed_doors()
    }

    /// Cards left across every undealt deck.
    pub fn cards_remaining(&self) -> usize {
        self.state.doors.iter().map(|d| d.deck_len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DungeonError;
    use crate::state::Hero;
    use crate::testing::ScriptedOracle;

    fn session(rolls: Vec<i32>) -> DungeonSession<ScriptedOracle> {
        let config = DungeonConfig::default().with_seed(11);
        let quest = Quest::new("Session", &config);
        let party = Party::new(vec![Hero::new("Aria", 12)]);
        DungeonSession::new(party, quest, config, ScriptedOracle::new(rolls)).unwrap()
    }

    #[test]
    fn test_new_session_holds_full_deck() {
        let session = session(vec![]);
        let config = DungeonConfig::default();
        assert_eq!(session.turn(), 0);
        assert_eq!(session.threat(), 0);
        assert_eq!(session.cards_remaining(), config.room_count + config.corridor_count);
        assert_eq!(session.closed_doors(), vec![DoorId(0)]);
    }

    #[test]
    fn test_empty_party_is_rejected() {
        let config = DungeonConfig::default();
        let quest = Quest::new("Nobody", &config);
        let result = DungeonSession::new(Party::new(vec![]), quest, config, ScriptedOracle::default());
        assert!(matches!(result, Err(DungeonError::NoHeroes)));
    }

    #[test]
    fn test_open_entrance_reveals_a_room() {
        let mut session = session(vec![1, 1, 100]);
        let hero = session.state().party.heroes[0].id;
        let result = session.open_door(DoorId(0), hero).unwrap();
        assert!(matches!(result.outcome, DoorInteraction::Opened { room: Some(_) }));
        assert_eq!(session.state().rooms.len(), 2);
        assert_eq!(session.threat(), 1);
    }

    #[test]
    fn test_quiet_turn_advances_counter() {
        // scenario roll below the trigger, no foresight
        let mut session = session(vec![3]);
        let report = session.end_turn().unwrap();
        assert_eq!(report.turn, 1);
        assert_eq!(report.threat, 0);
        assert!(!report.in_battle);
    }

    #[test]
    fn test_cancelled_turn_does_not_advance() {
        let mut session = session(vec![]);
        assert!(matches!(session.end_turn(), Err(DungeonError::Cancelled(_))));
        assert_eq!(session.turn(), 0);
        assert_eq!(session.threat(), 0);
    }
}
