//! The dungeon orchestrator.
//!
//! Turns player intents (open this door, search that room, end the turn)
//! into state changes. Each operation asks the oracle for every roll it
//! needs before it mutates anything, so a cancelled roll leaves the
//! dungeon exactly as it was.

use crate::catalog::ROOM_CATALOG;
use crate::collaborators::{Attempt, Collaborators, UnlockMethod};
use crate::config::DungeonConfig;
use crate::dice::DiceExpression;
use crate::encounter::{self, encounter_for, spawn_encounter};
use crate::error::{DungeonError, Result};
use crate::events::{DungeonEvent, Resolution};
use crate::grid::GridPos;
use crate::oracle::{request_roll, Oracle};
use crate::room::{
    DoorId, DoorState, ExplorationDeck, Lock, Orientation, RoomDescriptor, RoomId, Trap,
};
use crate::state::{DungeonState, Hero, HeroId, LeverId};
use crate::threat::{self, ThreatAction, ThreatEventResult, ThreatOutcome};
use crate::wandering;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Most passage squares opened between two rooms.
const MAX_PASSAGEWAY: usize = 2;

/// Who is working a door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorActor {
    Hero(HeroId),
    /// Anything that is not a hero; traps stay armed for it.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorInteraction {
    /// The door is open; `room` is the room revealed behind it, if any.
    Opened { room: Option<RoomId> },
    Locked { modifier: i32, durability: i32 },
    AlreadyOpen,
    Sealed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchOutcome {
    Found(String),
    NothingFound(String),
    AlreadySearched,
    /// The hero is elsewhere or the room is mid-fight.
    Unavailable,
}

/// An operation's result together with everything that happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolved<T> {
    pub outcome: T,
    pub resolution: Resolution,
}

impl<T> Resolved<T> {
    fn new(outcome: T, resolution: Resolution) -> Self {
        Self {
            outcome,
            resolution,
        }
    }
}

/// Drives the dungeon rules against an explicit [`DungeonState`].
pub struct DungeonOrchestrator {
    collaborators: Collaborators,
    rng: StdRng,
}

impl DungeonOrchestrator {
    pub fn new(collaborators: Collaborators, seed: u64) -> Self {
        Self {
            collaborators,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Standard collaborators, seeded from the config or from entropy.
    pub fn from_config(config: &DungeonConfig) -> Self {
        let mut seeder = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let seed: u64 = seeder.gen();
        Self::new(Collaborators::standard(seed), seed)
    }

    pub fn collaborators_mut(&mut self) -> &mut Collaborators {
        &mut self.collaborators
    }

    // ------------------------------------------------------------------
    // Doors
    // ------------------------------------------------------------------

    /// Work a door: roll for traps and locks the first time, then open it
    /// and reveal what lies behind once nothing bars the way.
    pub fn interact_with_door(
        &mut self,
        state: &mut DungeonState,
        oracle: &mut dyn Oracle,
        door_id: DoorId,
        actor: DoorActor,
    ) -> Result<Resolved<DoorInteraction>> {
        let mut res = Resolution::new();
        let door = state.door(door_id)?;
        match door.state {
            DoorState::Open => return Ok(Resolved::new(DoorInteraction::AlreadyOpen, res)),
            DoorState::MagicallySealed => return Ok(Resolved::new(DoorInteraction::Sealed, res)),
            _ => {}
        }

        // Rolls first, in table order.
        let (trap_roll, lock) = if door.rolled {
            (None, door.lock)
        } else {
            let trap_roll = request_roll(oracle, "Trap check", DiceExpression::d6())?;
            let lock_roll = request_roll(oracle, "Lock check", DiceExpression::d10())?;
            (Some(trap_roll), Lock::for_roll(lock_roll))
        };
        let new_trap = (trap_roll == Some(6)).then(|| self.collaborators.traps.generate());
        let trap = new_trap.clone().or_else(|| door.trap.clone());
        let bars = lock.filter(|l| !l.is_broken());
        let will_open = bars.is_none();
        let has_card = door.deck_len() > 0;

        // A hero springs an armed trap on touching the door.
        let sprung = match (&trap, actor) {
            (Some(trap), DoorActor::Hero(hero_id)) if trap.is_armed() => {
                let mut hero = state.hero(hero_id)?.clone();
                let attempt = self.collaborators.traps.trigger(oracle, &mut hero, trap)?;
                Some((hero, attempt))
            }
            _ => None,
        };

        let encounter_roll = if will_open && has_card {
            Some(request_roll(oracle, "Encounter check", DiceExpression::d100())?)
        } else {
            None
        };

        // Everything is rolled; apply.
        let door = state.door_mut(door_id)?;
        door.rolled = true;
        if let Some(trap) = new_trap {
            tracing::info!(door = %door_id, trap = %trap.name, "door is trapped");
            res.push(DungeonEvent::TrapArmed {
                door: door_id,
                trap: trap.name.clone(),
            });
            door.trap = Some(trap);
            door.state = DoorState::Trapped;
        }
        if let Some((hero, attempt)) = sprung {
            if let Some(trap) = door.trap.as_mut() {
                trap.triggered = true;
                res.push(DungeonEvent::TrapSprung {
                    door: Some(door_id),
                    hero: hero.id,
                    trap: trap.name.clone(),
                    narrative: attempt.narrative.clone(),
                });
            }
            res.narrate(&attempt.narrative);
            let hero_id = hero.id;
            *state.hero_mut(hero_id)? = hero;
        }

        let door = state.door_mut(door_id)?;
        if let Some(lock) = bars {
            let first_time = door.lock.is_none();
            door.lock = Some(lock);
            door.state = DoorState::Locked;
            if first_time {
                tracing::info!(door = %door_id, modifier = lock.modifier, durability = lock.durability, "door is locked");
                res.push(DungeonEvent::DoorLocked {
                    door: door_id,
                    modifier: lock.modifier,
                    durability: lock.durability,
                });
                res.narrate("The door is locked.");
            }
            return Ok(Resolved::new(
                DoorInteraction::Locked {
                    modifier: lock.modifier,
                    durability: lock.durability,
                },
                res,
            ));
        }

        let room = self.open_door(state, door_id, encounter_roll, &mut res)?;
        Ok(Resolved::new(DoorInteraction::Opened { room }, res))
    }

    fn open_door(
        &mut self,
        state: &mut DungeonState,
        door_id: DoorId,
        encounter_roll: Option<i32>,
        res: &mut Resolution,
    ) -> Result<Option<RoomId>> {
        state.door_mut(door_id)?.state = DoorState::Open;
        res.push(DungeonEvent::DoorOpened { door: door_id });
        tracing::info!(door = %door_id, "door opened");

        threat::apply_action(state, ThreatAction::OpenDoor, res);
        self.enforce_threat_cap(state, res);

        reveal_room(state, door_id, encounter_roll, &mut self.collaborators, res)
    }

    /// Work on a lock through the lock collaborator.
    pub fn attempt_unlock(
        &mut self,
        state: &mut DungeonState,
        oracle: &mut dyn Oracle,
        door_id: DoorId,
        hero_id: HeroId,
        method: UnlockMethod,
    ) -> Result<Resolved<Attempt>> {
        let mut res = Resolution::new();
        let door = state.door(door_id)?;
        let Some(lock) = door.lock.filter(|l| !l.is_broken()) else {
            return Ok(Resolved::new(Attempt::success("The door is not locked."), res));
        };
        let hero = state.hero(hero_id)?;
        let outcome = self.collaborators.locks.attempt(oracle, hero, &lock, method)?;

        let door = state.door_mut(door_id)?;
        let durability = if outcome.attempt.success {
            0
        } else {
            (lock.durability - outcome.damage).max(0)
        };
        if let Some(lock) = door.lock.as_mut() {
            lock.durability = durability;
        }
        if durability == 0 {
            door.state = DoorState::Closed;
        }
        res.push(DungeonEvent::LockDamaged {
            door: door_id,
            durability,
        });
        res.narrate(&outcome.attempt.narrative);
        Ok(Resolved::new(
            Attempt {
                success: durability == 0,
                narrative: outcome.attempt.narrative,
            },
            res,
        ))
    }

    /// Try to disarm a trap still armed on a door.
    pub fn disarm_trap(
        &mut self,
        state: &mut DungeonState,
        oracle: &mut dyn Oracle,
        door_id: DoorId,
        hero_id: HeroId,
    ) -> Result<Resolved<Attempt>> {
        let mut res = Resolution::new();
        let door = state.door(door_id)?;
        let Some(trap) = door.trap.as_ref().filter(|t| t.is_armed()) else {
            return Ok(Resolved::new(Attempt::failure("There is no armed trap here."), res));
        };
        let hero = state.hero(hero_id)?;
        let attempt = self.collaborators.traps.disarm(oracle, hero, trap)?;

        if attempt.success {
            let door = state.door_mut(door_id)?;
            if let Some(trap) = door.trap.as_mut() {
                trap.disarmed = true;
            }
            if door.state == DoorState::Trapped {
                door.state = if door.lock.is_some_and(|l| !l.is_broken()) {
                    DoorState::Locked
                } else {
                    DoorState::Closed
                };
            }
            res.push(DungeonEvent::TrapDisarmed {
                door: door_id,
                hero: hero_id,
            });
        }
        res.narrate(&attempt.narrative);
        Ok(Resolved::new(attempt, res))
    }

    /// Seal a closed door by magic. Open doors cannot be sealed.
    pub fn seal_door(&mut self, state: &mut DungeonState, door_id: DoorId) -> Result<Resolved<bool>> {
        let mut res = Resolution::new();
        let door = state.door_mut(door_id)?;
        if door.is_open() {
            return Ok(Resolved::new(false, res));
        }
        door.state = DoorState::MagicallySealed;
        res.push(DungeonEvent::DoorSealed { door: door_id });
        Ok(Resolved::new(true, res))
    }

    // ------------------------------------------------------------------
    // Rooms, levers, encounters
    // ------------------------------------------------------------------

    pub fn search_room(
        &mut self,
        state: &mut DungeonState,
        oracle: &mut dyn Oracle,
        room_id: RoomId,
        hero_id: HeroId,
    ) -> Result<Resolved<SearchOutcome>> {
        let mut res = Resolution::new();
        let room = state.room(room_id)?;
        let hero = state.hero(hero_id)?;
        if room.searched {
            return Ok(Resolved::new(SearchOutcome::AlreadySearched, res));
        }
        let here = hero.position.and_then(|p| state.grid.room_at(p)) == Some(room_id);
        if !here || room.in_encounter || !hero.is_alive() {
            return Ok(Resolved::new(SearchOutcome::Unavailable, res));
        }

        let attempt = self.collaborators.search.search(oracle, hero, room)?;
        state.room_mut(room_id)?.searched = true;
        res.push(DungeonEvent::RoomSearched {
            room: room_id,
            hero: hero_id,
            success: attempt.success,
        });
        res.narrate(&attempt.narrative);
        let outcome = if attempt.success {
            SearchOutcome::Found(attempt.narrative)
        } else {
            SearchOutcome::NothingFound(attempt.narrative)
        };
        Ok(Resolved::new(outcome, res))
    }

    /// Pull a lever from the pool; a successful pull uses it up.
    pub fn pull_lever(
        &mut self,
        state: &mut DungeonState,
        oracle: &mut dyn Oracle,
        lever_id: LeverId,
        hero_id: HeroId,
    ) -> Result<Resolved<Attempt>> {
        let mut res = Resolution::new();
        let lever = state
            .levers
            .iter()
            .find(|l| l.id == lever_id)
            .ok_or(DungeonError::UnknownLever(lever_id))?;
        let hero = state.hero(hero_id)?;
        let attempt = self.collaborators.levers.pull(oracle, hero, lever)?;
        if attempt.success {
            state.levers.retain(|l| l.id != lever_id);
        }
        res.push(DungeonEvent::LeverPulled {
            lever: lever_id,
            hero: hero_id,
            success: attempt.success,
        });
        res.narrate(&attempt.narrative);
        Ok(Resolved::new(attempt, res))
    }

    /// Clear a finished fight: monsters leave the board and become corpses.
    pub fn end_encounter(&mut self, state: &mut DungeonState, room_id: RoomId) -> Result<Resolution> {
        let mut res = Resolution::new();
        let room = state.room_mut(room_id)?;
        if !room.in_encounter {
            return Ok(res);
        }
        room.in_encounter = false;
        let fallen: HashSet<_> = room.monsters.drain(..).collect();

        let mut corpses = Vec::new();
        for monster in state.monsters.iter().filter(|m| fallen.contains(&m.id)) {
            if let Some(pos) = monster.position {
                state.grid.set_occupant(pos, None);
            }
            corpses.push(monster.name.clone());
        }
        state.monsters.retain(|m| !fallen.contains(&m.id));
        state.room_mut(room_id)?.corpses.extend(corpses);

        tracing::info!(room = %room_id, "encounter ended");
        res.push(DungeonEvent::EncounterEnded { room: room_id });
        Ok(res)
    }

    // ------------------------------------------------------------------
    // Turn processing
    // ------------------------------------------------------------------

    /// Threat clock, wandering monsters, then out-of-combat upkeep.
    pub fn end_turn(&mut self, state: &mut DungeonState, oracle: &mut dyn Oracle) -> Result<Resolution> {
        let mut res = Resolution::new();

        // A fired trap event rolls its dodge before threat is spent.
        let tick = threat::roll(state, oracle)?;
        let sprung = match &tick.outcome {
            ThreatOutcome::Event(event) if event.spawn_trap => self.roll_random_trap(state, oracle)?,
            _ => None,
        };
        threat::apply(state, &tick, &mut res);
        if let ThreatOutcome::Event(event) = &tick.outcome {
            self.apply_event_effects(state, event, sprung, &mut res)?;
        }
        self.enforce_threat_cap(state, &mut res);

        if wandering::move_tokens(state, oracle, &mut self.collaborators, &mut res)? {
            let pruned = state.prune_revealed_tokens();
            tracing::debug!(pruned, "revealed tokens removed");
        }

        if !state.in_battle() {
            if let Some(line) = self.collaborators.status.tick(&mut state.party) {
                res.push(DungeonEvent::StatusEffectsTicked);
                res.narrate(line);
            }
        }
        Ok(res)
    }

    /// Carry out the side effects a threat event asks for.
    pub fn apply_threat_event(
        &mut self,
        state: &mut DungeonState,
        oracle: &mut dyn Oracle,
        event: &ThreatEventResult,
        res: &mut Resolution,
    ) -> Result<()> {
        let sprung = if event.spawn_trap {
            self.roll_random_trap(state, oracle)?
        } else {
            None
        };
        self.apply_event_effects(state, event, sprung, res)
    }

    fn apply_event_effects(
        &mut self,
        state: &mut DungeonState,
        event: &ThreatEventResult,
        sprung: Option<SprungTrap>,
        res: &mut Resolution,
    ) -> Result<()> {
        if event.spawn_wandering_monster {
            let encounter = state.quest.wandering_encounter.clone();
            wandering::spawn_token(state, encounter, res);
        }
        if let Some(count) = event.add_exploration_cards {
            self.add_exploration_cards(state, count, res);
        }
        if let Some(sprung) = sprung {
            commit_trap(state, sprung, res)?;
        }
        if let Some(encounter) = &event.spawn_encounter {
            let room = state.battle_room().or_else(|| {
                state
                    .living_heroes()
                    .find_map(|h| h.position)
                    .and_then(|p| state.grid.room_at(p))
            });
            if let Some(room) = room {
                let encounter = encounter_for(state, room, Some(encounter))?;
                spawn_encounter(state, room, &encounter, &mut self.collaborators, res)?;
            }
        }
        Ok(())
    }

    /// At maximum threat something always comes looking for the party.
    fn enforce_threat_cap(&mut self, state: &mut DungeonState, res: &mut Resolution) {
        if !state.threat.at_maximum() {
            return;
        }
        tracing::info!(threat = state.threat.current_threat, "threat at maximum");
        let encounter = state.quest.wandering_encounter.clone();
        wandering::spawn_token(state, encounter, res);
        threat::apply_action(state, ThreatAction::WanderingMonsterSpawned, res);
    }

    /// Slip unused catalog cards under a closed door's pile.
    fn add_exploration_cards(&mut self, state: &mut DungeonState, count: usize, res: &mut Resolution) {
        let in_play: HashSet<&str> = state
            .rooms
            .iter()
            .map(|r| r.name.as_str())
            .chain(
                state
                    .doors
                    .iter()
                    .filter_map(|d| d.deck.as_ref())
                    .flat_map(|deck| deck.iter().map(|c| c.name.as_str())),
            )
            .chain(state.quest.excluded_rooms.iter().map(|n| n.as_str()))
            .collect();
        let mut fresh: Vec<RoomDescriptor> = ROOM_CATALOG
            .iter()
            .filter(|c| !in_play.contains(c.name.as_str()))
            .cloned()
            .collect();
        fresh.shuffle(&mut self.rng);
        fresh.truncate(count);

        let mut targets = state.doors_with_decks();
        if targets.is_empty() {
            targets = state
                .doors
                .iter()
                .filter(|d| d.state != DoorState::Open && d.state != DoorState::MagicallySealed)
                .filter(|d| d.rooms.1.is_none())
                .map(|d| d.id)
                .collect();
        }
        let Some(target) = targets.choose(&mut self.rng).copied() else {
            tracing::debug!("no door to take extra exploration cards");
            return;
        };
        if fresh.is_empty() {
            return;
        }
        let cards = fresh.len();
        if let Ok(door) = state.door_mut(target) {
            door.deck.get_or_insert_with(VecDeque::new).extend(fresh);
            res.push(DungeonEvent::ExplorationCardsAdded {
                door: target,
                cards,
            });
        }
    }

    /// Spring a fresh trap on a random living hero, working on a copy of
    /// the hero so nothing changes until [`commit_trap`].
    fn roll_random_trap(&mut self, state: &DungeonState, oracle: &mut dyn Oracle) -> Result<Option<SprungTrap>> {
        let living: Vec<HeroId> = state.living_heroes().map(|h| h.id).collect();
        let Some(hero_id) = living.choose(&mut self.rng).copied() else {
            return Ok(None);
        };
        let trap = self.collaborators.traps.generate();
        let mut hero = state.hero(hero_id)?.clone();
        let attempt = self.collaborators.traps.trigger(oracle, &mut hero, &trap)?;
        Ok(Some(SprungTrap { hero, trap, attempt }))
    }
}

/// A trap already rolled against a hero, waiting to be written back.
struct SprungTrap {
    hero: Hero,
    trap: Trap,
    attempt: Attempt,
}

fn commit_trap(state: &mut DungeonState, sprung: SprungTrap, res: &mut Resolution) -> Result<()> {
    let SprungTrap { hero, trap, attempt } = sprung;
    let hero_id = hero.id;
    *state.hero_mut(hero_id)? = hero;
    res.push(DungeonEvent::TrapSprung {
        door: None,
        hero: hero_id,
        trap: trap.name,
        narrative: attempt.narrative.clone(),
    });
    res.narrate(attempt.narrative);
    Ok(())
}

// ============================================================================
// Reveal and dealing
// ============================================================================

/// Open a door without trap or lock rolls and reveal the room beyond.
/// Used by wandering monsters, which ignore locks and leave traps be.
/// `encounter_roll` drives the new room's encounter check.
pub(crate) fn force_open(
    state: &mut DungeonState,
    door_id: DoorId,
    encounter_roll: Option<i32>,
    collaborators: &mut Collaborators,
    res: &mut Resolution,
) -> Result<Option<RoomId>> {
    let door = state.door_mut(door_id)?;
    if door.is_open() {
        return Ok(None);
    }
    door.state = DoorState::Open;
    door.rolled = true;
    res.push(DungeonEvent::DoorOpened { door: door_id });
    reveal_room(state, door_id, encounter_roll, collaborators, res)
}

/// Where a room of the given size lands beyond a door.
pub fn room_offset(orientation: Orientation, reference: GridPos, width: u32, height: u32) -> GridPos {
    let (w, h) = (width as i32, height as i32);
    match orientation {
        Orientation::North => reference.offset(0, -h),
        Orientation::South => reference.offset(0, 1),
        Orientation::East => reference.offset(1, 0),
        Orientation::West => reference.offset(-w, 0),
    }
}

/// Draw the next card from an opened door and build the room.
///
/// A door without a deck reveals nothing. `encounter_roll`, rolled ahead
/// by the caller, drives the encounter check; without it none is made.
pub(crate) fn reveal_room(
    state: &mut DungeonState,
    door_id: DoorId,
    encounter_roll: Option<i32>,
    collaborators: &mut Collaborators,
    res: &mut Resolution,
) -> Result<Option<RoomId>> {
    let door = state.door_mut(door_id)?;
    let Some(reference) = door.reference_square() else {
        return Ok(None);
    };
    let Some(mut deck) = door.deck.take() else {
        return Ok(None);
    };
    let Some(card) = deck.pop_front() else {
        return Ok(None);
    };
    let orientation = door.orientation;
    let from = door.rooms.0;

    let exits = card.exits;
    let name = card.name.clone();
    let offset = room_offset(orientation, reference, card.width, card.height);
    let room_id = state.add_room(card, offset);

    state.door_mut(door_id)?.rooms.1 = Some(room_id);
    state.room_mut(from)?.connect(room_id);
    let new_room = state.room_mut(room_id)?;
    new_room.connect(from);
    new_room.doors.push(door_id);

    tracing::info!(room = %name, id = %room_id, door = %door_id, %offset, "room revealed");
    res.push(DungeonEvent::RoomRevealed {
        room: room_id,
        name: name.clone(),
        through: door_id,
    });
    res.narrate(format!("The door opens onto the {name}."));

    let cells = open_passageway(state, from, room_id)?;
    if cells.is_empty() {
        tracing::warn!(room = %name, "no passage between rooms");
    }
    state.door_mut(door_id)?.passageway = cells.clone();
    res.push(DungeonEvent::PassagewayOpened {
        door: door_id,
        cells,
    });

    deal(state, room_id, deck, exits, orientation.opposite(), collaborators, res)?;

    if let Some(roll) = encounter_roll {
        let check = encounter::evaluate(state, room_id, roll)?;
        encounter::resolve_check(state, check, collaborators, res)?;
    }
    Ok(Some(room_id))
}

/// Link the old room to the new one through up to two squares of its
/// border, scanned row-major.
fn open_passageway(state: &mut DungeonState, from: RoomId, to: RoomId) -> Result<Vec<GridPos>> {
    let border = state.room(from)?.border_cells();
    let mut pairs = Vec::new();
    'scan: for cell in border {
        if !state.grid.is_floor(cell) || state.grid.room_at(cell) != Some(from) {
            continue;
        }
        for side in Orientation::all() {
            let (dx, dy) = side.step();
            let next = cell.offset(dx, dy);
            if state.grid.room_at(next) == Some(to) && state.grid.is_floor(next) {
                pairs.push((cell, next));
                if pairs.len() == MAX_PASSAGEWAY {
                    break 'scan;
                }
                continue 'scan;
            }
        }
    }
    for (a, b) in &pairs {
        state.grid.open_passage(*a, *b);
    }
    Ok(pairs.into_iter().map(|(a, _)| a).collect())
}

/// Hand the rest of a consumed deck to the new room's exits.
///
/// One exit takes the pile as is. Several exits are dealt bottom card
/// first, round robin from the first door, each pile keeping the cards'
/// original relative order.
fn deal(
    state: &mut DungeonState,
    room_id: RoomId,
    deck: ExplorationDeck,
    exits: u8,
    entry_side: Orientation,
    collaborators: &mut Collaborators,
    res: &mut Resolution,
) -> Result<()> {
    if deck.is_empty() || exits == 0 {
        return mark_dead_end(state, room_id, deck.len(), res);
    }

    let mut doors = Vec::with_capacity(exits as usize);
    for _ in 0..exits {
        match collaborators.placement.place_exit_door(state, room_id, Some(entry_side)) {
            Some((side, cells)) => doors.push(state.add_door(room_id, side, cells)),
            None => {
                tracing::warn!(room = %room_id, "no room left on the walls for another exit");
                break;
            }
        }
    }

    match doors.len() {
        0 => mark_dead_end(state, room_id, deck.len(), res),
        1 => {
            let cards = deck.len();
            state.door_mut(doors[0])?.deck = Some(deck);
            res.push(DungeonEvent::CardsDealt {
                door: doors[0],
                cards,
            });
            Ok(())
        }
        n => {
            let mut piles: Vec<ExplorationDeck> = vec![VecDeque::new(); n];
            for (i, card) in deck.into_iter().rev().enumerate() {
                piles[i % n].push_front(card);
            }
            for (door, pile) in doors.into_iter().zip(piles) {
                let cards = pile.len();
                tracing::debug!(door = %door, cards, "cards dealt");
                if cards > 0 {
                    state.door_mut(door)?.deck = Some(pile);
                }
                res.push(DungeonEvent::CardsDealt { door, cards });
            }
            Ok(())
        }
    }
}

fn mark_dead_end(state: &mut DungeonState, room_id: RoomId, discarded: usize, res: &mut Resolution) -> Result<()> {
    state.room_mut(room_id)?.dead_end = true;
    tracing::debug!(room = %room_id, discarded, "dead end");
    res.push(DungeonEvent::DeadEnd { room: room_id });
    res.narrate("This way leads nowhere.");
    Ok(())
}
