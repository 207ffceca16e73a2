//! What happened: the event log every engine operation returns.
//!
//! Operations mutate [`crate::state::DungeonState`] directly and describe
//! each change as a [`DungeonEvent`], so drivers can animate or narrate
//! the result without diffing state.

use crate::grid::GridPos;
use crate::room::{DoorId, EncounterType, RoomId};
use crate::state::{HeroId, LeverId, MonsterId, TokenId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DungeonEvent {
    /// A trap was found rigged to a door.
    TrapArmed { door: DoorId, trap: String },

    /// A hero set a trap off.
    TrapSprung {
        door: Option<DoorId>,
        hero: HeroId,
        trap: String,
        narrative: String,
    },

    TrapDisarmed { door: DoorId, hero: HeroId },

    DoorLocked {
        door: DoorId,
        modifier: i32,
        durability: i32,
    },

    LockDamaged { door: DoorId, durability: i32 },

    DoorOpened { door: DoorId },

    DoorSealed { door: DoorId },

    RoomRevealed {
        room: RoomId,
        name: String,
        through: DoorId,
    },

    PassagewayOpened { door: DoorId, cells: Vec<GridPos> },

    /// Remaining cards handed to a new door.
    CardsDealt { door: DoorId, cards: usize },

    DeadEnd { room: RoomId },

    ExplorationCardsAdded { door: DoorId, cards: usize },

    ThreatChanged { from: i32, to: i32, reason: String },

    /// An entry of one of the threat tables fired.
    ThreatEventFired { description: String },

    EncounterChanceChanged { modifier: i32 },

    ScenarioModifierChanged { modifier: i32 },

    EncounterChecked {
        room: RoomId,
        chance: i32,
        roll: i32,
        triggered: bool,
    },

    EncounterSpawned {
        room: RoomId,
        encounter: EncounterType,
        monsters: Vec<MonsterId>,
    },

    WanderingMonsterSpawned { token: TokenId, position: GridPos },

    TokenMoved {
        token: TokenId,
        from: GridPos,
        to: GridPos,
    },

    TokenWaited { token: TokenId },

    TokenOpenedDoor { token: TokenId, door: DoorId },

    TokenRevealed { token: TokenId, room: RoomId },

    RoomSearched {
        room: RoomId,
        hero: HeroId,
        success: bool,
    },

    LeverPulled {
        lever: LeverId,
        hero: HeroId,
        success: bool,
    },

    EncounterEnded { room: RoomId },

    StatusEffectsTicked,
}

/// Events plus narration produced by one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub events: Vec<DungeonEvent>,
    pub narrative: String,
}

impl Resolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: DungeonEvent) {
        self.events.push(event);
    }

    /// Append a line of narration.
    pub fn narrate(&mut self, line: impl AsRef<str>) {
        if !self.narrative.is_empty() {
            self.narrative.push('\n');
        }
        self.narrative.push_str(line.as_ref());
    }

    /// Fold another operation's output into this one.
    pub fn absorb(&mut self, other: Resolution) {
        self.events.extend(other.events);
        if !other.narrative.is_empty() {
            self.narrate(other.narrative);
        }
    }

    pub fn contains(&self, predicate: impl Fn(&DungeonEvent) -> bool) -> bool {
        self.events.iter().any(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narration_joins_lines() {
        let mut res = Resolution::new();
        res.narrate("The door creaks.");
        let mut other = Resolution::new();
        other.narrate("Something stirs.");
        other.push(DungeonEvent::DeadEnd { room: RoomId(3) });
        res.absorb(other);
        assert_eq!(res.narrative, "The door creaks.\nSomething stirs.");
        assert!(res.contains(|e| matches!(e, DungeonEvent::DeadEnd { .. })));
    }

    #[test]
    fn test_events_serialize() {
        let event = DungeonEvent::CardsDealt {
            door: DoorId(2),
            cards: 3,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: DungeonEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
