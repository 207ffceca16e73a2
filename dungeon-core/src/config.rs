//! Tunable knobs for a dungeon run.

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration for a dungeon run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonConfig {
    /// Room cards in a standard deck.
    pub room_count: usize,

    /// Corridor cards in a standard deck.
    pub corridor_count: usize,

    pub min_threat: i32,

    pub max_threat: i32,

    pub starting_threat: i32,

    /// Squares a wandering monster token moves per turn.
    pub token_movement: u32,

    /// How close, with line of sight, a token must get to be revealed.
    pub reveal_distance: u32,

    /// Most wandering tokens on the board at once.
    pub wandering_monster_threshold: usize,

    /// Seed for shuffles and placement. `None` draws one from entropy.
    pub seed: Option<u64>,
}

impl Default for DungeonConfig {
    fn default() -> Self {
        Self {
            room_count: 8,
            corridor_count: 6,
            min_threat: 0,
            max_threat: 20,
            starting_threat: 0,
            token_movement: 6,
            reveal_distance: 10,
            wandering_monster_threshold: 3,
            seed: None,
        }
    }
}

impl DungeonConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deck_size(mut self, rooms: usize, corridors: usize) -> Self {
        self.room_count = rooms;
        self.corridor_count = corridors;
        self
    }

    pub fn with_threat_range(mut self, min: i32, max: i32) -> Self {
        self.min_threat = min;
        self.max_threat = max;
        self
    }

    pub fn with_starting_threat(mut self, threat: i32) -> Self {
        self.starting_threat = threat;
        self
    }

    pub fn with_token_movement(mut self, squares: u32) -> Self {
        self.token_movement = squares;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by `DUNGEON_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(seed) = env_number("DUNGEON_SEED")? {
            config.seed = Some(seed);
        }
        if let Some(rooms) = env_number("DUNGEON_ROOM_COUNT")? {
            config.room_count = rooms;
        }
        if let Some(corridors) = env_number("DUNGEON_CORRIDOR_COUNT")? {
            config.corridor_count = corridors;
        }
        if let Some(min) = env_number("DUNGEON_MIN_THREAT")? {
            config.min_threat = min;
        }
        if let Some(max) = env_number("DUNGEON_MAX_THREAT")? {
            config.max_threat = max;
        }
        if let Some(movement) = env_number("DUNGEON_TOKEN_MOVEMENT")? {
            config.token_movement = movement;
        }
        Ok(config)
    }
}

fn env_number<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = DungeonConfig::from_json_str(r#"{ "max_threat": 12, "seed": 99 }"#).unwrap();
        assert_eq!(config.max_threat, 12);
        assert_eq!(config.seed, Some(99));
        assert_eq!(config.room_count, DungeonConfig::default().room_count);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(
            DungeonConfig::from_json_str("{ nope"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_builder() {
        let config = DungeonConfig::new()
            .with_deck_size(3, 2)
            .with_threat_range(1, 9)
            .with_seed(4);
        assert_eq!((config.room_count, config.corridor_count), (3, 2));
        assert_eq!((config.min_threat, config.max_threat), (1, 9));
        assert_eq!(config.seed, Some(4));
    }

    #[test]
    fn test_env_number_rejects_garbage() {
        env::set_var("DUNGEON_TEST_ONLY_NUMBER", "twelve");
        let result: Result<Option<u32>, _> = env_number("DUNGEON_TEST_ONLY_NUMBER");
        assert!(matches!(result, Err(ConfigError::InvalidNumber { .. })));
        env::remove_var("DUNGEON_TEST_ONLY_NUMBER");
        let missing: Option<u32> = env_number("DUNGEON_TEST_ONLY_NUMBER").unwrap();
        assert_eq!(missing, None);
    }
}
