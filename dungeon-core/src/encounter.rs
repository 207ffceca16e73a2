//! Encounter checks and monster placement.

use crate::collaborators::{Collaborators, PlacementRule};
use crate::dice::DiceExpression;
use crate::error::Result;
use crate::events::{DungeonEvent, Resolution};
use crate::grid::GridPos;
use crate::oracle::{request_roll, Oracle};
use crate::room::{EncounterType, RoomId};
use crate::state::{DungeonState, MonsterId};
use serde::{Deserialize, Serialize};

/// Rooms in a row without an encounter before the chance goes up.
pub const QUIET_STREAK: u32 = 4;

/// Extra chance, in percent, once the quiet streak is reached.
pub const QUIET_STREAK_BONUS: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterCheck {
    pub room: RoomId,
    pub chance: i32,
    pub roll: i32,
    pub triggered: bool,
}

/// Percent chance that revealing `room` starts an encounter.
pub fn encounter_chance(state: &DungeonState, room: RoomId) -> Result<i32> {
    let base = state.room(room)?.category.base_encounter_chance();
    let streak = if state.threat.rooms_without_encounter >= QUIET_STREAK {
        QUIET_STREAK_BONUS
    } else {
        0
    };
    Ok(base + state.threat.encounter_chance_modifier + streak)
}

/// Roll the check without touching any state.
pub fn roll_check(state: &DungeonState, room: RoomId, oracle: &mut dyn Oracle) -> Result<EncounterCheck> {
    let name = &state.room(room)?.name;
    let roll = request_roll(oracle, format!("Encounter check for {name}"), DiceExpression::d100())?;
    evaluate(state, room, roll)
}

/// Judge an encounter roll made ahead of time.
pub fn evaluate(state: &DungeonState, room: RoomId, roll: i32) -> Result<EncounterCheck> {
    let chance = encounter_chance(state, room)?;
    Ok(EncounterCheck {
        room,
        chance,
        roll,
        triggered: roll <= chance,
    })
}

/// Record a rolled check and spawn the encounter when it triggered.
pub fn resolve_check(
    state: &mut DungeonState,
    check: EncounterCheck,
    collaborators: &mut Collaborators,
    res: &mut Resolution,
) -> Result<Vec<MonsterId>> {
    res.push(DungeonEvent::EncounterChecked {
        room: check.room,
        chance: check.chance,
        roll: check.roll,
        triggered: check.triggered,
    });
    tracing::debug!(room = %check.room, chance = check.chance, roll = check.roll, triggered = check.triggered, "encounter check");

    if !check.triggered {
        state.threat.rooms_without_encounter += 1;
        return Ok(Vec::new());
    }
    state.threat.rooms_without_encounter = 0;
    let encounter = encounter_for(state, check.room, None)?;
    spawn_encounter(state, check.room, &encounter, collaborators, res)
}

/// Roll and resolve the check in one go.
pub fn check(
    state: &mut DungeonState,
    room: RoomId,
    oracle: &mut dyn Oracle,
    collaborators: &mut Collaborators,
    res: &mut Resolution,
) -> Result<Vec<MonsterId>> {
    let rolled = roll_check(state, room, oracle)?;
    resolve_check(state, rolled, collaborators, res)
}

/// The room's own encounter, else the supplied one, else the quest default.
pub fn encounter_for(
    state: &DungeonState,
    room: RoomId,
    supplied: Option<&EncounterType>,
) -> Result<EncounterType> {
    Ok(state
        .room(room)?
        .encounter
        .clone()
        .or_else(|| supplied.cloned())
        .unwrap_or_else(|| state.quest.default_encounter.clone()))
}

/// Put an encounter's monsters into a room.
///
/// Ranged and magic-using monsters take the squares farthest from the
/// party; the rest stand on the room's edge out of reach of any hero.
/// With no heroes in the room everything goes on a random edge square.
pub fn spawn_encounter(
    state: &mut DungeonState,
    room: RoomId,
    encounter: &EncounterType,
    collaborators: &mut Collaborators,
    res: &mut Resolution,
) -> Result<Vec<MonsterId>> {
    let monsters = collaborators.encounters.monsters_for(encounter);
    if monsters.is_empty() {
        tracing::warn!(%encounter, "encounter table has no monsters");
        return Ok(Vec::new());
    }

    let heroes: Vec<GridPos> = state
        .heroes_in_room(room)
        .iter()
        .filter_map(|h| h.position)
        .collect();
    let centroid = centroid(&heroes);

    let mut spawned = Vec::with_capacity(monsters.len());
    for monster in monsters {
        let rule = match centroid {
            Some((x, y)) if monster.behavior.keeps_distance() => PlacementRule::FarthestFrom { x, y },
            _ => PlacementRule::RandomEdge {
                keep_clear_of: heroes.clone(),
            },
        };
        let position = collaborators
            .placement
            .place_entity(state, room, &rule)
            .or_else(|| {
                let (x, y) = centroid.unwrap_or((0.0, 0.0));
                collaborators
                    .placement
                    .place_entity(state, room, &PlacementRule::FarthestFrom { x, y })
            });

        let id = state.add_monster(monster);
        match position {
            Some(pos) => state.place_monster(id, room, pos),
            None => {
                tracing::warn!(%room, "no free square left for a monster");
                if let Ok(target) = state.room_mut(room) {
                    target.monsters.push(id);
                }
            }
        }
        spawned.push(id);
    }

    let target = state.room_mut(room)?;
    target.in_encounter = true;
    tracing::info!(room = %target.name, %encounter, monsters = spawned.len(), "encounter spawned");
    res.narrate(format!("{encounter} attack in the {}!", target.name));
    res.push(DungeonEvent::EncounterSpawned {
        room,
        encounter: encounter.clone(),
        monsters: spawned.clone(),
    });
    Ok(spawned)
}

/// Mean position of a set of squares.
pub fn centroid(cells: &[GridPos]) -> Option<(f64, f64)> {
    if cells.is_empty() {
        return None;
    }
    let n = cells.len() as f64;
    let x = cells.iter().map(|p| p.x as f64).sum::<f64>() / n;
    let y = cells.iter().map(|p| p.y as f64).sum::<f64>() / n;
    Some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DungeonConfig;
    use crate::grid::Occupant;
    use crate::room::RoomDescriptor;
    use crate::state::{Hero, MonsterBehavior, Party, Quest};
    use crate::testing::ScriptedOracle;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn dungeon() -> DungeonState {
        let config = DungeonConfig::default();
        let quest = Quest::new("Encounters", &config);
        let party = Party::new(vec![Hero::new("Aria", 10), Hero::new("Bram", 10)]);
        DungeonState::begin(party, quest, &config, &mut StdRng::seed_from_u64(3)).unwrap()
    }

    #[test]
    fn test_chance_includes_modifiers() {
        let mut state = dungeon();
        assert_eq!(encounter_chance(&state, RoomId(0)).unwrap(), 30);
        state.threat.encounter_chance_modifier = 10;
        state.threat.rooms_without_encounter = 4;
        assert_eq!(encounter_chance(&state, RoomId(0)).unwrap(), 50);
    }

    #[test]
    fn test_miss_increments_streak_once() {
        let mut state = dungeon();
        let mut collaborators = Collaborators::standard(1);
        let mut oracle = ScriptedOracle::new(vec![31]);
        let mut res = Resolution::new();
        let spawned = check(&mut state, RoomId(0), &mut oracle, &mut collaborators, &mut res).unwrap();
        assert!(spawned.is_empty());
        assert_eq!(state.threat.rooms_without_encounter, 1);
    }

    #[test]
    fn test_hit_spawns_and_resets_streak() {
        let mut state = dungeon();
        state.threat.rooms_without_encounter = 3;
        let mut collaborators = Collaborators::standard(1);
        let mut oracle = ScriptedOracle::new(vec![30]);
        let mut res = Resolution::new();
        let spawned = check(&mut state, RoomId(0), &mut oracle, &mut collaborators, &mut res).unwrap();
        assert!(!spawned.is_empty());
        assert_eq!(state.threat.rooms_without_encounter, 0);
        assert!(state.rooms[0].in_encounter);
        assert!(res.contains(|e| matches!(e, DungeonEvent::EncounterSpawned { .. })));
    }

    #[test]
    fn test_room_encounter_takes_priority() {
        let mut state = dungeon();
        let room = state.add_room(
            RoomDescriptor::room("Lair", 4, 4, 0).with_encounter(EncounterType::new("Giant Spiders")),
            GridPos::new(10, 10),
        );
        let supplied = EncounterType::new("Bandits");
        assert_eq!(
            encounter_for(&state, room, Some(&supplied)).unwrap(),
            EncounterType::new("Giant Spiders")
        );
        assert_eq!(encounter_for(&state, RoomId(0), Some(&supplied)).unwrap(), supplied);
        assert_eq!(
            encounter_for(&state, RoomId(0), None).unwrap(),
            state.quest.default_encounter
        );
    }

    #[test]
    fn test_melee_never_adjacent_to_heroes() {
        let mut state = dungeon();
        let room = state.add_room(RoomDescriptor::room("Hall", 6, 6, 0), GridPos::new(20, 0));
        let hero = state.party.heroes[0].id;
        state.move_hero(hero, GridPos::new(22, 2)).unwrap();
        let mut collaborators = Collaborators::standard(7);
        let mut res = Resolution::new();
        let spawned = spawn_encounter(
            &mut state,
            room,
            &EncounterType::new("Orc Warband"),
            &mut collaborators,
            &mut res,
        )
        .unwrap();
        assert!(!spawned.is_empty());
        for id in spawned {
            let monster = state.monster(id).unwrap();
            let pos = monster.position.unwrap();
            assert_eq!(state.grid.occupant_at(pos), Some(Occupant::Monster(id)));
            if monster.behavior == MonsterBehavior::Melee {
                assert!(pos.chebyshev(GridPos::new(22, 2)) > 1);
            }
        }
    }

    #[test]
    fn test_unknown_encounter_spawns_nothing() {
        let mut state = dungeon();
        let mut collaborators = Collaborators::standard(1);
        let mut res = Resolution::new();
        let spawned = spawn_encounter(
            &mut state,
            RoomId(0),
            &EncounterType::new("Nobody"),
            &mut collaborators,
            &mut res,
        )
        .unwrap();
        assert!(spawned.is_empty());
        assert!(!state.rooms[0].in_encounter);
    }

    #[test]
    fn test_centroid() {
        assert_eq!(centroid(&[]), None);
        assert_eq!(
            centroid(&[GridPos::new(0, 0), GridPos::new(2, 4)]),
            Some((1.0, 2.0))
        );
    }
}
