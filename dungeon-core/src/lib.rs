//! Procedural dungeon exploration engine.
//!
//! This crate provides:
//! - A shuffled room deck with the quest objective kept deep
//! - Doors that hide traps, locks and the next room of the deck
//! - A threat clock that turns into random events and wandering monsters
//! - Wandering monster tokens that hunt the party across the grid
//!
//! Every random decision goes through an [`Oracle`], so a caller can
//! roll real dice, script the results or cancel a request midway.
//!
//! # Quick Start
//!
//! ```ignore
//! use dungeon_core::{DiceOracle, DungeonConfig, DungeonSession, Hero, Party, Quest};
//! use rand::SeedableRng;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DungeonConfig::default().with_seed(7);
//!     let quest = Quest::new("The Sunken Vault", &config);
//!     let party = Party::new(vec![Hero::new("Thorin", 14)]);
//!     let oracle = DiceOracle::new(rand::rngs::StdRng::seed_from_u64(7));
//!
//!     let mut session = DungeonSession::new(party, quest, config, oracle)?;
//!     let hero = session.state().party.heroes[0].id;
//!     let entrance = session.closed_doors()[0];
//!
//!     let result = session.open_door(entrance, hero)?;
//!     println!("{}", result.resolution.narrative);
//!     session.end_turn()?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod collaborators;
pub mod config;
pub mod deck;
pub mod dice;
pub mod encounter;
pub mod error;
pub mod events;
pub mod grid;
pub mod oracle;
pub mod orchestrator;
pub mod room;
pub mod session;
pub mod state;
pub mod testing;
pub mod threat;
pub mod wandering;

// Primary public API
pub use collaborators::{Attempt, Collaborators, UnlockMethod};
pub use config::{ConfigError, DungeonConfig};
pub use error::{DungeonError, Result};
pub use events::{DungeonEvent, Resolution};
pub use grid::{GridMap, GridPos};
pub use oracle::{Choice, DiceOracle, Oracle, RollOutcome, RollRequest};
pub use orchestrator::{DoorActor, DoorInteraction, DungeonOrchestrator, Resolved, SearchOutcome};
pub use room::{DoorId, DoorState, EncounterType, RoomDescriptor, RoomId};
pub use session::{DungeonSession, TurnReport};
pub use state::{DungeonState, Hero, HeroId, Party, PartyPerk, Quest};
pub use testing::{ScriptedOracle, TestHarness};
