//! Seams to the systems the dungeon engine uses but does not own.
//!
//! Lock picking, trap disarming, lever and search rules, encounter
//! tables, token/door placement and status effects all sit behind
//! traits. The engine only calls them and branches on the outcome.
//! [`HouseRules`], [`StaticEncounters`] and [`GridPlacement`] are simple
//! stand-ins good enough for unattended play and tests.

use crate::catalog::{encounter_group, DOOR_TRAPS};
use crate::dice::DiceExpression;
use crate::error::Result;
use crate::grid::GridPos;
use crate::oracle::{request, request_roll, Oracle, RollRequest};
use crate::room::{Door, EncounterType, Lock, Orientation, Room, RoomCategory, RoomId, Trap};
use crate::state::{DungeonState, Hero, Lever, Monster, Party};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Outcome of an attempt delegated to a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub success: bool,
    pub narrative: String,
}

impl Attempt {
    pub fn success(narrative: impl Into<String>) -> Self {
        Self {
            success: true,
            narrative: narrative.into(),
        }
    }

    pub fn failure(narrative: impl Into<String>) -> Self {
        Self {
            success: false,
            narrative: narrative.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnlockMethod {
    Pick,
    Bash,
    Spell,
}

/// Outcome of working on a lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockAttempt {
    pub attempt: Attempt,
    /// Durability knocked off the lock even when the attempt failed.
    pub damage: i32,
}

pub trait LockResolver {
    fn attempt(
        &mut self,
        oracle: &mut dyn Oracle,
        hero: &Hero,
        lock: &Lock,
        method: UnlockMethod,
    ) -> Result<LockAttempt>;
}

pub trait TrapResolver {
    /// Rig a fresh trap for a door.
    fn generate(&mut self) -> Trap;

    /// Spring a trap on a hero. The resolver applies any harm itself.
    fn trigger(&mut self, oracle: &mut dyn Oracle, hero: &mut Hero, trap: &Trap) -> Result<Attempt>;

    fn disarm(&mut self, oracle: &mut dyn Oracle, hero: &Hero, trap: &Trap) -> Result<Attempt>;
}

pub trait LeverResolver {
    fn pull(&mut self, oracle: &mut dyn Oracle, hero: &Hero, lever: &Lever) -> Result<Attempt>;
}

pub trait SearchResolver {
    fn search(&mut self, oracle: &mut dyn Oracle, hero: &Hero, room: &Room) -> Result<Attempt>;
}

pub trait EncounterTable {
    fn monsters_for(&mut self, encounter: &EncounterType) -> Vec<Monster>;
}

/// Where an entity may be put inside a room.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementRule {
    /// A random free edge square not adjacent to any of these squares.
    RandomEdge { keep_clear_of: Vec<GridPos> },
    /// The free square farthest from a point.
    FarthestFrom { x: f64, y: f64 },
}

pub trait Placement {
    fn place_entity(&mut self, state: &DungeonState, room: RoomId, rule: &PlacementRule) -> Option<GridPos>;

    /// Pick an unused perimeter spot for a new exit, never on `entry_side`.
    fn place_exit_door(
        &mut self,
        state: &DungeonState,
        room: RoomId,
        entry_side: Option<Orientation>,
    ) -> Option<(Orientation, Vec<GridPos>)>;
}

pub trait StatusEffects {
    /// Advance out-of-combat status effects by one turn.
    fn tick(&mut self, party: &mut Party) -> Option<String>;
}

// ============================================================================
// Stand-in implementations
// ============================================================================

/// Simple percentile rules for locks, traps, levers and searching.
pub struct HouseRules {
    rng: StdRng,
}

impl HouseRules {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl LockResolver for HouseRules {
    fn attempt(
        &mut self,
        oracle: &mut dyn Oracle,
        hero: &Hero,
        lock: &Lock,
        method: UnlockMethod,
    ) -> Result<LockAttempt> {
        match method {
            UnlockMethod::Pick => {
                let roll = request(
                    oracle,
                    RollRequest::new(format!("{} picks the lock", hero.name), DiceExpression::d100())
                        .with_skill(hero.id, "Lock Picking"),
                )?;
                if roll <= 50 + lock.modifier {
                    Ok(LockAttempt {
                        attempt: Attempt::success(format!("{} picks the lock.", hero.name)),
                        damage: lock.durability,
                    })
                } else {
                    Ok(LockAttempt {
                        attempt: Attempt::failure("The lock resists."),
                        damage: 0,
                    })
                }
            }
            UnlockMethod::Bash => {
                let damage = request_roll(
                    oracle,
                    format!("{} bashes the door", hero.name),
                    DiceExpression::parse("2d6")?,
                )?;
                let broken = damage >= lock.durability;
                Ok(LockAttempt {
                    attempt: Attempt {
                        success: broken,
                        narrative: if broken {
                            "The lock splinters.".to_string()
                        } else {
                            "The door shudders but holds.".to_string()
                        },
                    },
                    damage,
                })
            }
            UnlockMethod::Spell => Ok(LockAttempt {
                attempt: Attempt::success("The lock clicks open at a word."),
                damage: lock.durability,
            }),
        }
    }
}

impl TrapResolver for HouseRules {
    fn generate(&mut self) -> Trap {
        let (name, description) = DOOR_TRAPS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(("Dart Trap", "Darts hiss out of the frame."));
        Trap::new(name, description)
    }

    fn trigger(&mut self, oracle: &mut dyn Oracle, hero: &mut Hero, trap: &Trap) -> Result<Attempt> {
        let dodge = request_roll(
            oracle,
            format!("{} reacts to the {}", hero.name, trap.name),
            DiceExpression::d20(),
        )?;
        if dodge > 10 {
            return Ok(Attempt::success(format!(
                "{} avoids the {}.",
                hero.name, trap.name
            )));
        }
        let damage = request_roll(
            oracle,
            format!("{} damage", trap.name),
            DiceExpression::d6(),
        )?;
        hero.current_hp -= damage;
        Ok(Attempt::failure(format!(
            "{} {} takes {} damage.",
            trap.description, hero.name, damage
        )))
    }

    fn disarm(&mut self, oracle: &mut dyn Oracle, hero: &Hero, trap: &Trap) -> Result<Attempt> {
        let roll = request(
            oracle,
            RollRequest::new(format!("{} disarms the {}", hero.name, trap.name), DiceExpression::d100())
                .with_skill(hero.id, "Disarm Traps"),
        )?;
        Ok(if roll <= 50 {
            Attempt::success(format!("{} disarms the {}.", hero.name, trap.name))
        } else {
            Attempt::failure(format!("{} cannot work out the mechanism.", hero.name))
        })
    }
}

impl LeverResolver for HouseRules {
    fn pull(&mut self, oracle: &mut dyn Oracle, hero: &Hero, lever: &Lever) -> Result<Attempt> {
        let roll = request_roll(
            oracle,
            format!("{} pulls the {}", hero.name, lever.name),
            DiceExpression::d6(),
        )?;
        Ok(if roll >= 3 {
            Attempt::success(format!("The {} grinds into place.", lever.name))
        } else {
            Attempt::failure(format!("The {} is stuck fast.", lever.name))
        })
    }
}

impl SearchResolver for HouseRules {
    fn search(&mut self, oracle: &mut dyn Oracle, hero: &Hero, room: &Room) -> Result<Attempt> {
        let roll = request(
            oracle,
            RollRequest::new(format!("{} searches the {}", hero.name, room.name), DiceExpression::d100())
                .with_skill(hero.id, "Perception"),
        )?;
        let chance = match room.category {
            RoomCategory::Room => 40,
            RoomCategory::Corridor => 20,
        };
        Ok(if roll <= chance {
            Attempt::success(format!("{} finds something in the {}.", hero.name, room.name))
        } else {
            Attempt::failure(format!("The {} holds nothing of value.", room.name))
        })
    }
}

/// Encounter groups from the built-in catalog.
#[derive(Debug, Default)]
pub struct StaticEncounters;

impl EncounterTable for StaticEncounters {
    fn monsters_for(&mut self, encounter: &EncounterType) -> Vec<Monster> {
        encounter_group(encounter)
            .iter()
            .map(|t| Monster::new(t.name, t.behavior))
            .collect()
    }
}

/// Status effects are handled elsewhere; nothing to tick.
#[derive(Debug, Default)]
pub struct NoStatusEffects;

impl StatusEffects for NoStatusEffects {
    fn tick(&mut self, _party: &mut Party) -> Option<String> {
        None
    }
}

/// Random placement on the grid.
pub struct GridPlacement {
    rng: StdRng,
}

impl GridPlacement {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

fn free_cells(state: &DungeonState, room: &Room, edge_only: bool) -> Vec<GridPos> {
    let cells = if edge_only {
        room.border_cells()
    } else {
        state.grid.cells_of(room.id)
    };
    cells
        .into_iter()
        .filter(|p| state.grid.square_at(*p).is_some_and(|s| s.room == room.id && s.is_free()))
        .collect()
}

impl Placement for GridPlacement {
    fn place_entity(&mut self, state: &DungeonState, room: RoomId, rule: &PlacementRule) -> Option<GridPos> {
        let room = state.room(room).ok()?;
        match rule {
            PlacementRule::RandomEdge { keep_clear_of } => {
                let candidates: Vec<GridPos> = free_cells(state, room, true)
                    .into_iter()
                    .filter(|p| keep_clear_of.iter().all(|h| p.chebyshev(*h) > 1))
                    .collect();
                candidates.choose(&mut self.rng).copied()
            }
            PlacementRule::FarthestFrom { x, y } => {
                let cells = free_cells(state, room, false);
                let score = |p: &GridPos| {
                    let dx = p.x as f64 - x;
                    let dy = p.y as f64 - y;
                    dx * dx + dy * dy
                };
                let best = cells.iter().map(score).fold(f64::MIN, f64::max);
                let farthest: Vec<GridPos> = cells
                    .iter()
                    .filter(|p| (score(p) - best).abs() < 1e-9)
                    .copied()
                    .collect();
                farthest.choose(&mut self.rng).copied()
            }
        }
    }

    fn place_exit_door(
        &mut self,
        state: &DungeonState,
        room: RoomId,
        entry_side: Option<Orientation>,
    ) -> Option<(Orientation, Vec<GridPos>)> {
        let room = state.room(room).ok()?;
        let used: Vec<GridPos> = room
            .doors
            .iter()
            .filter_map(|d| state.door(*d).ok())
            .flat_map(|d: &Door| d.positions.iter().chain(d.passageway.iter()).copied())
            .collect();

        let usable = |side: Orientation, p: GridPos| {
            let (dx, dy) = side.step();
            state.grid.is_floor(p)
                && !used.contains(&p)
                && state.grid.square_at(p.offset(dx, dy)).is_none()
        };

        let mut candidates: Vec<(Orientation, usize)> = Vec::new();
        for side in Orientation::all() {
            if Some(side) == entry_side {
                continue;
            }
            for (i, p) in room.edge(side).into_iter().enumerate() {
                if usable(side, p) {
                    candidates.push((side, i));
                }
            }
        }

        let (side, index) = candidates.choose(&mut self.rng).copied()?;
        let edge = room.edge(side);
        let mut positions = vec![edge[index]];
        if room.category == RoomCategory::Room {
            if let Some(next) = edge.get(index + 1).copied() {
                if usable(side, next) {
                    positions.push(next);
                }
            }
        }
        Some((side, positions))
    }
}

/// Everything the orchestrator delegates to.
pub struct Collaborators {
    pub locks: Box<dyn LockResolver>,
    pub traps: Box<dyn TrapResolver>,
    pub levers: Box<dyn LeverResolver>,
    pub search: Box<dyn SearchResolver>,
    pub encounters: Box<dyn EncounterTable>,
    pub placement: Box<dyn Placement>,
    pub status: Box<dyn StatusEffects>,
}

impl Collaborators {
    /// Stand-in collaborators seeded for reproducible runs.
    pub fn standard(seed: u64) -> Self {
        Self {
            locks: Box::new(HouseRules::new(seed)),
            traps: Box::new(HouseRules::new(seed.wrapping_add(1))),
            levers: Box::new(HouseRules::new(seed.wrapping_add(2))),
            search: Box::new(HouseRules::new(seed.wrapping_add(3))),
            encounters: Box::new(StaticEncounters),
            placement: Box::new(GridPlacement::new(seed.wrapping_add(4))),
            status: Box::new(NoStatusEffects),
        }
    }

    pub fn with_traps(mut self, traps: impl TrapResolver + 'static) -> Self {
        self.traps = Box::new(traps);
        self
    }

    pub fn with_locks(mut self, locks: impl LockResolver + 'static) -> Self {
        self.locks = Box::new(locks);
        self
    }

    pub fn with_encounters(mut self, encounters: impl EncounterTable + 'static) -> Self {
        self.encounters = Box::new(encounters);
        self
    }

    pub fn with_placement(mut self, placement: impl Placement + 'static) -> Self {
        self.placement = Box::new(placement);
        self
    }

    pub fn with_status_effects(mut self, status: impl StatusEffects + 'static) -> Self {
        self.status = Box::new(status);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DungeonConfig;
    use crate::state::{Hero, Party, Quest};
    use crate::testing::ScriptedOracle;

    fn entrance_state() -> DungeonState {
        let config = DungeonConfig::default();
        let quest = Quest::new("Test", &config);
        let party = Party::new(vec![Hero::new("Aria", 10)]);
        DungeonState::begin(party, quest, &config, &mut StdRng::seed_from_u64(1)).unwrap()
    }

    #[test]
    fn test_pick_respects_modifier() {
        let mut rules = HouseRules::new(0);
        let hero = Hero::new("Aria", 10);
        let lock = Lock {
            modifier: -15,
            durability: 20,
        };
        let mut oracle = ScriptedOracle::new(vec![40, 30]);
        let first = rules.attempt(&mut oracle, &hero, &lock, UnlockMethod::Pick).unwrap();
        assert!(!first.attempt.success);
        let second = rules.attempt(&mut oracle, &hero, &lock, UnlockMethod::Pick).unwrap();
        assert!(second.attempt.success);
        assert_eq!(second.damage, 20);
    }

    #[test]
    fn test_trap_trigger_harms_on_failed_dodge() {
        let mut rules = HouseRules::new(0);
        let mut hero = Hero::new("Bram", 10);
        let trap = rules.generate();
        let mut oracle = ScriptedOracle::new(vec![4, 3]);
        let outcome = rules.trigger(&mut oracle, &mut hero, &trap).unwrap();
        assert!(!outcome.success);
        assert_eq!(hero.current_hp, 7);
    }

    #[test]
    fn test_random_edge_keeps_clear_of_heroes() {
        let state = entrance_state();
        let heroes = state.hero_positions();
        let mut placement = GridPlacement::new(5);
        for _ in 0..20 {
            let rule = PlacementRule::RandomEdge {
                keep_clear_of: heroes.clone(),
            };
            if let Some(pos) = placement.place_entity(&state, RoomId(0), &rule) {
                assert!(heroes.iter().all(|h| pos.chebyshev(*h) > 1));
            }
        }
    }

    #[test]
    fn test_farthest_from_point() {
        let state = entrance_state();
        let mut placement = GridPlacement::new(5);
        let pos = placement
            .place_entity(&state, RoomId(0), &PlacementRule::FarthestFrom { x: 0.0, y: 3.0 })
            .unwrap();
        assert_eq!(pos.y, 0);
    }

    #[test]
    fn test_exit_door_avoids_entry_side() {
        let state = entrance_state();
        let mut placement = GridPlacement::new(8);
        for _ in 0..20 {
            let (side, cells) = placement
                .place_exit_door(&state, RoomId(0), Some(Orientation::South))
                .unwrap();
            assert_ne!(side, Orientation::South);
            assert!(!cells.is_empty() && cells.len() <= 2);
            assert!(!state.doors[0].positions.contains(&cells[0]));
        }
    }
}
