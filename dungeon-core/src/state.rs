//! The mutable dungeon aggregate.
//!
//! [`DungeonState`] owns everything belonging to one dungeon run: the
//! party, the quest, the grid, the room and door arenas, monsters,
//! wandering tokens, levers and the threat counters. Every component
//! receives it explicitly; nothing in the crate holds it globally.

use crate::config::DungeonConfig;
use crate::deck::{build_deck, DeckRequest};
use crate::error::{DungeonError, Result};
use crate::grid::{Footprint, GridMap, GridPos, Occupant};
use crate::room::{
    Door, DoorId, EncounterType, Orientation, Room, RoomDescriptor, RoomId,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for heroes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeroId(pub Uuid);

impl HeroId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HeroId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HeroId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for monsters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonsterId(pub Uuid);

impl MonsterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MonsterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MonsterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub usize);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeverId(pub usize);

impl fmt::Display for LeverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lever#{}", self.0)
    }
}

// ============================================================================
// Party and Quest
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    pub id: HeroId,
    pub name: String,
    pub position: Option<GridPos>,
    pub current_hp: i32,
    pub max_hp: i32,
}

impl Hero {
    pub fn new(name: impl Into<String>, max_hp: i32) -> Self {
        Self {
            id: HeroId::new(),
            name: name.into(),
            position: None,
            current_hp: max_hp,
            max_hp,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current_hp > 0
    }
}

/// Party-wide perks the dungeon rules care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartyPerk {
    /// Once per turn, the party may reroll a scenario die that would
    /// trigger a threat roll.
    Foresight,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub heroes: Vec<Hero>,
    pub perks: Vec<PartyPerk>,
}

impl Party {
    pub fn new(heroes: Vec<Hero>) -> Self {
        Self {
            heroes,
            perks: Vec::new(),
        }
    }

    pub fn with_perk(mut self, perk: PartyPerk) -> Self {
        self.perks.push(perk);
        self
    }

    pub fn has_perk(&self, perk: PartyPerk) -> bool {
        self.perks.contains(&perk)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideQuest {
    HiddenTreasure,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub name: String,
    pub room_count: usize,
    pub corridor_count: usize,
    pub excluded_rooms: Vec<String>,
    pub side_quests: Vec<SideQuest>,
    pub objective_room: Option<RoomDescriptor>,
    /// Encounter used when a room has none of its own.
    pub default_encounter: EncounterType,
    /// Encounter carried by wandering monster tokens.
    pub wandering_encounter: EncounterType,
}

impl Quest {
    pub fn new(name: impl Into<String>, config: &DungeonConfig) -> Self {
        Self {
            name: name.into(),
            room_count: config.room_count,
            corridor_count: config.corridor_count,
            excluded_rooms: Vec::new(),
            side_quests: Vec::new(),
            objective_room: None,
            default_encounter: EncounterType::new("Goblin Raiders"),
            wandering_encounter: EncounterType::new("Wandering Patrol"),
        }
    }

    pub fn with_objective(mut self, objective: RoomDescriptor) -> Self {
        self.objective_room = Some(objective);
        self
    }

    pub fn with_side_quest(mut self, side_quest: SideQuest) -> Self {
        self.side_quests.push(side_quest);
        self
    }

    pub fn excluding(mut self, room_name: impl Into<String>) -> Self {
        self.excluded_rooms.push(room_name.into());
        self
    }

    pub fn with_default_encounter(mut self, encounter: EncounterType) -> Self {
        self.default_encounter = encounter;
        self
    }
}

// ============================================================================
// Monsters and Tokens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonsterBehavior {
    Melee,
    Ranged,
    MagicUser,
}

impl MonsterBehavior {
    /// Ranged and magic-using monsters keep their distance from the party.
    pub fn keeps_distance(&self) -> bool {
        matches!(self, MonsterBehavior::Ranged | MonsterBehavior::MagicUser)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monster {
    pub id: MonsterId,
    pub name: String,
    pub behavior: MonsterBehavior,
    pub position: Option<GridPos>,
    pub room: Option<RoomId>,
}

impl Monster {
    pub fn new(name: impl Into<String>, behavior: MonsterBehavior) -> Self {
        Self {
            id: MonsterId::new(),
            name: name.into(),
            behavior,
            position: None,
            room: None,
        }
    }
}

/// An unrevealed monster group roaming the dungeon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WanderingMonsterToken {
    pub id: TokenId,
    pub position: GridPos,
    /// Squares the token may move each turn.
    pub movement: u32,
    pub remaining_movement: u32,
    pub encounter: EncounterType,
    /// Monsters the token turned into; set once and never cleared.
    pub revealed: Option<Vec<MonsterId>>,
}

impl WanderingMonsterToken {
    pub fn is_revealed(&self) -> bool {
        self.revealed.is_some()
    }

    pub fn reset_movement(&mut self) {
        self.remaining_movement = self.movement;
    }

    /// Spend one square of movement; false when the budget is gone.
    pub fn spend_step(&mut self) -> bool {
        if self.remaining_movement == 0 {
            return false;
        }
        self.remaining_movement -= 1;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lever {
    pub id: LeverId,
    pub name: String,
}

// ============================================================================
// Threat counters
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatCounters {
    pub min_threat: i32,
    pub max_threat: i32,
    pub current_threat: i32,
    pub rooms_without_encounter: u32,
    /// Added to every encounter check, in percent.
    pub encounter_chance_modifier: i32,
    /// Added to every scenario roll.
    pub scenario_roll_modifier: i32,
    /// Most wandering tokens allowed on the board at once.
    pub wandering_monster_threshold: usize,
}

impl ThreatCounters {
    pub fn from_config(config: &DungeonConfig) -> Self {
        let min_threat = config.min_threat.min(config.max_threat);
        Self {
            min_threat,
            max_threat: config.max_threat,
            current_threat: config.starting_threat.clamp(min_threat, config.max_threat),
            rooms_without_encounter: 0,
            encounter_chance_modifier: 0,
            scenario_roll_modifier: 0,
            wandering_monster_threshold: config.wandering_monster_threshold,
        }
    }

    pub fn increase(&mut self, amount: i32) {
        self.current_threat = (self.current_threat + amount).min(self.max_threat);
    }

    pub fn decrease(&mut self, amount: i32) {
        self.current_threat = (self.current_threat - amount).max(self.min_threat);
    }

    pub fn at_maximum(&self) -> bool {
        self.current_threat >= self.max_threat
    }
}

// ============================================================================
// Dungeon state
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonState {
    pub party: Party,
    pub quest: Quest,
    pub grid: GridMap,
    pub rooms: Vec<Room>,
    pub doors: Vec<Door>,
    pub monsters: Vec<Monster>,
    pub tokens: Vec<WanderingMonsterToken>,
    pub levers: Vec<Lever>,
    pub threat: ThreatCounters,
    pub token_movement: u32,
    pub reveal_distance: u32,
    next_token: usize,
    next_lever: usize,
}

impl DungeonState {
    /// Empty dungeon with no rooms yet. Rejects a party without heroes.
    pub fn new(party: Party, quest: Quest, config: &DungeonConfig) -> Result<Self> {
        if party.heroes.is_empty() {
            return Err(DungeonError::NoHeroes);
        }
        Ok(Self {
            party,
            quest,
            grid: GridMap::new(),
            rooms: Vec::new(),
            doors: Vec::new(),
            monsters: Vec::new(),
            tokens: Vec::new(),
            levers: Vec::new(),
            threat: ThreatCounters::from_config(config),
            token_movement: config.token_movement,
            reveal_distance: config.reveal_distance,
            next_token: 0,
            next_lever: 0,
        })
    }

    /// Start a quest: build the deck, lay the entrance at the origin with
    /// one exit holding the whole deck, and line the heroes up inside.
    pub fn begin<R: Rng + ?Sized>(
        party: Party,
        quest: Quest,
        config: &DungeonConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let mut state = Self::new(party, quest, config)?;

        let deck = build_deck(
            rng,
            &DeckRequest {
                room_count: state.quest.room_count,
                corridor_count: state.quest.corridor_count,
                excluded: &state.quest.excluded_rooms,
                side_quests: &state.quest.side_quests,
                objective: state.quest.objective_room.as_ref(),
            },
        );

        let entrance = state.add_room(crate::catalog::ENTRANCE_ROOM.clone(), GridPos::new(0, 0));
        let exit_cells = state.room(entrance)?.edge(Orientation::North);
        let exit = state.add_door(entrance, Orientation::North, exit_cells);
        state.door_mut(exit)?.deck = Some(deck.into());

        let mut free: Vec<GridPos> = state
            .grid
            .cells_of(entrance)
            .into_iter()
            .filter(|p| state.grid.is_floor(*p))
            .collect();
        free.reverse();
        let ids: Vec<HeroId> = state.party.heroes.iter().map(|h| h.id).collect();
        for (id, pos) in ids.into_iter().zip(free) {
            state.move_hero(id, pos)?;
        }

        tracing::info!(
            quest = %state.quest.name,
            heroes = state.party.heroes.len(),
            cards = state.door(exit)?.deck_len(),
            "quest started"
        );
        Ok(state)
    }

    // ------------------------------------------------------------------
    // Arena access
    // ------------------------------------------------------------------

    pub fn room(&self, id: RoomId) -> Result<&Room> {
        self.rooms.get(id.0).ok_or(DungeonError::UnknownRoom(id))
    }

    pub fn room_mut(&mut self, id: RoomId) -> Result<&mut Room> {
        self.rooms.get_mut(id.0).ok_or(DungeonError::UnknownRoom(id))
    }

    pub fn door(&self, id: DoorId) -> Result<&Door> {
        self.doors.get(id.0).ok_or(DungeonError::UnknownDoor(id))
    }

    pub fn door_mut(&mut self, id: DoorId) -> Result<&mut Door> {
        self.doors.get_mut(id.0).ok_or(DungeonError::UnknownDoor(id))
    }

    pub fn hero(&self, id: HeroId) -> Result<&Hero> {
        self.party
            .heroes
            .iter()
            .find(|h| h.id == id)
            .ok_or(DungeonError::UnknownHero(id))
    }

    pub fn hero_mut(&mut self, id: HeroId) -> Result<&mut Hero> {
        self.party
            .heroes
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or(DungeonError::UnknownHero(id))
    }

    pub fn token(&self, id: TokenId) -> Result<&WanderingMonsterToken> {
        self.tokens
            .iter()
            .find(|t| t.id == id)
            .ok_or(DungeonError::UnknownToken(id))
    }

    pub fn token_mut(&mut self, id: TokenId) -> Result<&mut WanderingMonsterToken> {
        self.tokens
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(DungeonError::UnknownToken(id))
    }

    pub fn monster(&self, id: MonsterId) -> Option<&Monster> {
        self.monsters.iter().find(|m| m.id == id)
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Instantiate a descriptor and write it onto the grid.
    pub fn add_room(&mut self, descriptor: RoomDescriptor, offset: GridPos) -> RoomId {
        let id = RoomId(self.rooms.len());
        let room = Room::from_descriptor(id, descriptor, offset);
        let overlapped = self.grid.place(
            id,
            &Footprint {
                offset,
                width: room.width,
                height: room.height,
                walls: &room.walls,
            },
        );
        if overlapped > 0 {
            tracing::warn!(room = %room.name, overlapped, "room overlaps squares already placed");
        }
        for (piece, pos) in room.furniture.iter().zip(room.interior_cells()) {
            if let Some(square) = self.grid.square_at_mut(pos).filter(|s| s.room == id) {
                square.furniture = Some(piece.clone());
            }
        }
        self.rooms.push(room);
        id
    }

    pub fn add_door(
        &mut self,
        room: RoomId,
        orientation: Orientation,
        positions: Vec<GridPos>,
    ) -> DoorId {
        let id = DoorId(self.doors.len());
        self.doors.push(Door::new(id, room, orientation, positions));
        if let Some(owner) = self.rooms.get_mut(room.0) {
            owner.doors.push(id);
        }
        id
    }

    pub fn add_lever(&mut self, name: impl Into<String>) -> LeverId {
        let id = LeverId(self.next_lever);
        self.next_lever += 1;
        self.levers.push(Lever {
            id,
            name: name.into(),
        });
        id
    }

    // ------------------------------------------------------------------
    // Heroes
    // ------------------------------------------------------------------

    pub fn living_heroes(&self) -> impl Iterator<Item = &Hero> {
        self.party.heroes.iter().filter(|h| h.is_alive())
    }

    pub fn hero_positions(&self) -> Vec<GridPos> {
        self.living_heroes().filter_map(|h| h.position).collect()
    }

    /// Living heroes currently standing in a room.
    pub fn heroes_in_room(&self, room: RoomId) -> Vec<&Hero> {
        self.living_heroes()
            .filter(|h| h.position.and_then(|p| self.grid.room_at(p)) == Some(room))
            .collect()
    }

    pub fn move_hero(&mut self, id: HeroId, to: GridPos) -> Result<()> {
        let from = self.hero(id)?.position;
        if let Some(from) = from {
            self.grid.set_occupant(from, None);
        }
        self.grid.set_occupant(to, Some(Occupant::Hero(id)));
        self.hero_mut(id)?.position = Some(to);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Monsters and tokens
    // ------------------------------------------------------------------

    pub fn add_monster(&mut self, monster: Monster) -> MonsterId {
        let id = monster.id;
        self.monsters.push(monster);
        id
    }

    pub fn place_monster(&mut self, id: MonsterId, room: RoomId, pos: GridPos) {
        self.grid.set_occupant(pos, Some(Occupant::Monster(id)));
        if let Some(monster) = self.monsters.iter_mut().find(|m| m.id == id) {
            if let Some(old) = monster.position.replace(pos) {
                if old != pos {
                    self.grid.set_occupant(old, None);
                }
            }
            monster.room = Some(room);
        }
        if let Some(owner) = self.rooms.get_mut(room.0) {
            if !owner.monsters.contains(&id) {
                owner.monsters.push(id);
            }
        }
    }

    pub fn add_token(&mut self, position: GridPos, encounter: EncounterType) -> TokenId {
        let id = TokenId(self.next_token);
        self.next_token += 1;
        self.grid.set_occupant(position, Some(Occupant::Token(id)));
        self.tokens.push(WanderingMonsterToken {
            id,
            position,
            movement: self.token_movement,
            remaining_movement: self.token_movement,
            encounter,
            revealed: None,
        });
        id
    }

    pub fn move_token(&mut self, id: TokenId, to: GridPos) -> Result<()> {
        let from = self.token(id)?.position;
        self.grid.set_occupant(from, None);
        self.grid.set_occupant(to, Some(Occupant::Token(id)));
        self.token_mut(id)?.position = to;
        Ok(())
    }

    pub fn active_token_ids(&self) -> Vec<TokenId> {
        self.tokens
            .iter()
            .filter(|t| !t.is_revealed())
            .map(|t| t.id)
            .collect()
    }

    /// Drop revealed tokens from the wandering pool.
    pub fn prune_revealed_tokens(&mut self) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|t| !t.is_revealed());
        before - self.tokens.len()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Squares nobody can walk into.
    pub fn occupied_cells(&self) -> HashSet<GridPos> {
        self.grid.occupied_cells()
    }

    /// Whether the party is fighting anywhere.
    pub fn in_battle(&self) -> bool {
        self.rooms.iter().any(|r| r.in_encounter)
    }

    pub fn battle_room(&self) -> Option<RoomId> {
        self.rooms.iter().find(|r| r.in_encounter).map(|r| r.id)
    }

    /// Closed doors that still hold cards, in arena order.
    pub fn doors_with_decks(&self) -> Vec<DoorId> {
        self.doors
            .iter()
            .filter(|d| !d.is_open() && d.deck.is_some())
            .map(|d| d.id)
            .collect()
    }

    pub fn closed_doors(&self) -> Vec<DoorId> {
        self.doors
            .iter()
            .filter(|d| !d.is_open())
            .map(|d| d.id)
            .collect()
    }
}
