//! Errors raised by the dungeon engine.
//!
//! Game-rule outcomes such as a locked door or a failed search are not
//! errors; they come back as ordinary result values. Only precondition
//! failures and cancelled requests end up here.

use crate::dice::DiceError;
use crate::room::{DoorId, RoomId};
use crate::state::{HeroId, LeverId, TokenId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DungeonError {
    #[error("A quest cannot start without heroes")]
    NoHeroes,

    /// A roll or choice request was abandoned before it was answered.
    #[error("Request cancelled: {0}")]
    Cancelled(String),

    #[error("Unknown room: {0}")]
    UnknownRoom(RoomId),

    #[error("Unknown door: {0}")]
    UnknownDoor(DoorId),

    #[error("Unknown hero: {0}")]
    UnknownHero(HeroId),

    #[error("Unknown wandering monster token: {0}")]
    UnknownToken(TokenId),

    #[error("Lever {0} is not available")]
    UnknownLever(LeverId),

    #[error("Dice error: {0}")]
    Dice(#[from] DiceError),
}

pub type Result<T> = std::result::Result<T, DungeonError>;
