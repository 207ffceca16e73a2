//! Wandering monster tokens.
//!
//! Tokens are unrevealed monster groups that hunt the party. Each turn a
//! token spends its movement budget walking toward the nearest hero,
//! fumbling at doors, or backing off. Once it gets within sight of a
//! hero it turns into a real encounter.

use crate::collaborators::Collaborators;
use crate::dice::DiceExpression;
use crate::encounter::{centroid, encounter_for, spawn_encounter};
use crate::error::Result;
use crate::events::{DungeonEvent, Resolution};
use crate::grid::GridPos;
use crate::oracle::{request_roll, Oracle};
use crate::orchestrator::force_open;
use crate::room::{DoorId, DoorState, EncounterType, RoomId};
use crate::state::{DungeonState, TokenId};

/// Move every unrevealed token. Returns whether any was revealed.
pub fn move_tokens(
    state: &mut DungeonState,
    oracle: &mut dyn Oracle,
    collaborators: &mut Collaborators,
    res: &mut Resolution,
) -> Result<bool> {
    let mut revealed = false;
    for id in state.active_token_ids() {
        revealed |= move_token(state, id, oracle, collaborators, res)?;
    }
    Ok(revealed)
}

/// Give one token its turn.
pub fn move_token(
    state: &mut DungeonState,
    id: TokenId,
    oracle: &mut dyn Oracle,
    collaborators: &mut Collaborators,
    res: &mut Resolution,
) -> Result<bool> {
    if state.token(id)?.is_revealed() {
        return Ok(false);
    }
    state.token_mut(id)?.reset_movement();

    loop {
        let (position, remaining) = {
            let token = state.token(id)?;
            (token.position, token.remaining_movement)
        };
        let Some(room) = state.grid.room_at(position) else {
            break;
        };

        if let Some(door) = adjacent_closed_door(state, position) {
            let sealed = state.door(door)?.state == DoorState::MagicallySealed;
            let roll = request_roll(oracle, format!("{id} tries a door"), DiceExpression::d6())?;
            if roll >= 5 || (roll >= 2 && !sealed) {
                let encounter_roll = if state.door(door)?.deck_len() > 0 {
                    Some(request_roll(oracle, "Encounter check", DiceExpression::d100())?)
                } else {
                    None
                };
                tracing::info!(token = %id, door = %door, "wandering monster opens a door");
                res.push(DungeonEvent::TokenOpenedDoor { token: id, door });
                force_open(state, door, encounter_roll, collaborators, res)?;
            } else {
                res.push(DungeonEvent::TokenWaited { token: id });
            }
            break;
        }

        if remaining == 0 {
            break;
        }

        let roll = request_roll(oracle, format!("{id} moves"), DiceExpression::d6())?;
        if roll < 2 {
            retreat(state, id, res)?;
            break;
        }

        let Some(path) = path_to_quarry(state, position, room) else {
            res.push(DungeonEvent::TokenWaited { token: id });
            break;
        };

        let mut entered_new_room = false;
        if path.is_empty() && reveal_if_seen(state, id, collaborators, res)? {
            return Ok(true);
        }
        for step in path {
            if !state.token_mut(id)?.spend_step() {
                break;
            }
            let from = state.token(id)?.position;
            state.move_token(id, step)?;
            res.push(DungeonEvent::TokenMoved {
                token: id,
                from,
                to: step,
            });
            if reveal_if_seen(state, id, collaborators, res)? {
                return Ok(true);
            }
            if state.grid.room_at(step) != Some(room) {
                entered_new_room = true;
                break;
            }
        }
        if !entered_new_room {
            break;
        }
    }
    Ok(false)
}

/// Spawn a token as far from the party as the explored dungeon allows.
///
/// Prefers rooms with no heroes and no fight in progress. Returns `None`
/// when the board already holds as many tokens as allowed or no square
/// is free.
pub fn spawn_token(state: &mut DungeonState, encounter: EncounterType, res: &mut Resolution) -> Option<TokenId> {
    if state.active_token_ids().len() >= state.threat.wandering_monster_threshold {
        tracing::debug!("wandering monster cap reached");
        return None;
    }

    let heroes = state.hero_positions();
    let (cx, cy) = centroid(&heroes).unwrap_or((0.0, 0.0));
    let far = |p: &GridPos| {
        let dx = p.x as f64 - cx;
        let dy = p.y as f64 - cy;
        dx * dx + dy * dy
    };

    let free = |quiet_only: bool| -> Vec<GridPos> {
        state
            .rooms
            .iter()
            .filter(|r| !quiet_only || (!r.in_encounter && state.heroes_in_room(r.id).is_empty()))
            .flat_map(|r| state.grid.cells_of(r.id))
            .filter(|p| state.grid.square_at(*p).is_some_and(|s| s.is_free()))
            .collect()
    };
    let mut candidates = free(true);
    if candidates.is_empty() {
        candidates = free(false);
    }
    let position = candidates
        .into_iter()
        .max_by(|a, b| far(a).total_cmp(&far(b)).then_with(|| b.cmp(a)))?;

    let id = state.add_token(position, encounter);
    tracing::info!(token = %id, %position, "wandering monster spawned");
    res.push(DungeonEvent::WanderingMonsterSpawned { token: id, position });
    res.narrate("Something is wandering the halls.");
    Some(id)
}

fn adjacent_closed_door(state: &DungeonState, pos: GridPos) -> Option<DoorId> {
    state
        .doors
        .iter()
        .filter(|d| !d.is_open())
        .find(|d| d.positions.iter().any(|p| p.chebyshev(pos) <= 1))
        .map(|d| d.id)
}

/// Route toward the nearest hero: first in the token's room, then
/// anywhere connected, then to the room's nearest closed door.
fn path_to_quarry(state: &DungeonState, from: GridPos, room: RoomId) -> Option<Vec<GridPos>> {
    let mut occupied = state.occupied_cells();
    occupied.remove(&from);

    let shortest = |targets: Vec<GridPos>| {
        targets
            .into_iter()
            .filter_map(|t| state.grid.shortest_path(from, t, &occupied))
            .min_by_key(|p| p.len())
    };

    let in_room: Vec<GridPos> = state
        .heroes_in_room(room)
        .iter()
        .filter_map(|h| h.position)
        .collect();
    if let Some(path) = shortest(in_room) {
        return Some(path);
    }
    if let Some(path) = shortest(state.hero_positions()) {
        return Some(path);
    }
    let doors: Vec<GridPos> = state
        .doors
        .iter()
        .filter(|d| !d.is_open() && d.rooms.0 == room)
        .flat_map(|d| d.positions.iter().copied())
        .collect();
    shortest(doors)
}

/// Back off to the reachable square farthest from the closest hero.
fn retreat(state: &mut DungeonState, id: TokenId, res: &mut Resolution) -> Result<()> {
    let token = state.token(id)?;
    let from = token.position;
    let budget = token.remaining_movement;
    let heroes = state.hero_positions();

    let mut occupied = state.occupied_cells();
    occupied.remove(&from);
    let nearest = |p: &GridPos| heroes.iter().map(|h| p.chebyshev(*h)).min().unwrap_or(0);
    let here = nearest(&from);
    let best = state
        .grid
        .reachable_set(from, budget, &occupied)
        .into_iter()
        .filter(|p| nearest(p) > here)
        .max_by_key(|p| nearest(p));

    match best {
        Some(to) => {
            let steps = state
                .grid
                .shortest_path(from, to, &occupied)
                .map_or(from.chebyshev(to), |path| path.len() as u32 + 1);
            let spent = steps.min(budget);
            let token = state.token_mut(id)?;
            token.remaining_movement -= spent;
            state.move_token(id, to)?;
            res.push(DungeonEvent::TokenMoved { token: id, from, to });
        }
        None => res.push(DungeonEvent::TokenWaited { token: id }),
    }
    Ok(())
}

/// Turn the token into monsters if any hero can see it close enough.
fn reveal_if_seen(
    state: &mut DungeonState,
    id: TokenId,
    collaborators: &mut Collaborators,
    res: &mut Resolution,
) -> Result<bool> {
    let (position, encounter) = {
        let token = state.token(id)?;
        (token.position, token.encounter.clone())
    };
    let seen = state.hero_positions().into_iter().any(|hero| {
        let sight = state.grid.line_of_sight(position, hero);
        sight.can_see && sight.distance <= state.reveal_distance
    });
    if !seen {
        return Ok(false);
    }
    let Some(room) = state.grid.room_at(position) else {
        return Ok(false);
    };

    let encounter = encounter_for(state, room, Some(&encounter))?;
    state.grid.set_occupant(position, None);
    let monsters = spawn_encounter(state, room, &encounter, collaborators, res)?;
    state.token_mut(id)?.revealed = Some(monsters);
    tracing::info!(token = %id, %room, "wandering monster revealed");
    res.push(DungeonEvent::TokenRevealed { token: id, room });
    Ok(true)
}
