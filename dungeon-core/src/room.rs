//! Rooms, doors and the descriptors they are dealt from.
//!
//! Rooms and doors live in arenas owned by [`crate::state::DungeonState`]
//! and refer to each other by [`RoomId`] / [`DoorId`]. A room owns its
//! doors; a door only names the rooms it connects.

use crate::grid::GridPos;
use crate::state::MonsterId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ============================================================================
// ID Types
// ============================================================================

/// Index of a room in the dungeon's room arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub usize);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room#{}", self.0)
    }
}

/// Index of a door in the dungeon's door arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DoorId(pub usize);

impl fmt::Display for DoorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "door#{}", self.0)
    }
}

// ============================================================================
// Descriptors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomCategory {
    Room,
    Corridor,
}

impl RoomCategory {
    /// Base chance, in percent, that revealing this kind of room starts
    /// an encounter.
    pub fn base_encounter_chance(&self) -> i32 {
        match self {
            RoomCategory::Room => 50,
            RoomCategory::Corridor => 30,
        }
    }
}

/// Named group of monsters, resolved by the encounter table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncounterType(pub String);

impl EncounterType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for EncounterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A card in the dungeon deck: everything needed to build a room once
/// it is revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDescriptor {
    pub name: String,
    pub category: RoomCategory,
    pub width: u32,
    pub height: u32,
    /// Number of exits besides the door the party enters through.
    pub exits: u8,
    /// Wall squares in room-local coordinates.
    #[serde(default)]
    pub walls: Vec<(u32, u32)>,
    /// Encounter spawned here when the encounter check triggers.
    #[serde(default)]
    pub encounter: Option<EncounterType>,
    #[serde(default)]
    pub furniture: Vec<String>,
}

impl RoomDescriptor {
    pub fn room(name: impl Into<String>, width: u32, height: u32, exits: u8) -> Self {
        Self {
            name: name.into(),
            category: RoomCategory::Room,
            width,
            height,
            exits,
            walls: Vec::new(),
            encounter: None,
            furniture: Vec::new(),
        }
    }

    pub fn corridor(name: impl Into<String>, width: u32, height: u32, exits: u8) -> Self {
        Self {
            category: RoomCategory::Corridor,
            ..Self::room(name, width, height, exits)
        }
    }

    pub fn with_walls(mut self, walls: Vec<(u32, u32)>) -> Self {
        self.walls = walls;
        self
    }

    pub fn with_encounter(mut self, encounter: EncounterType) -> Self {
        self.encounter = Some(encounter);
        self
    }

    pub fn with_furniture(mut self, furniture: Vec<String>) -> Self {
        self.furniture = furniture;
        self
    }
}

/// Ordered pile of undealt room descriptors attached to a door.
pub type ExplorationDeck = VecDeque<RoomDescriptor>;

// ============================================================================
// Doors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    North,
    South,
    East,
    West,
}

impl Orientation {
    pub fn all() -> [Orientation; 4] {
        [
            Orientation::North,
            Orientation::East,
            Orientation::South,
            Orientation::West,
        ]
    }

    /// Unit step pointing out of the room through this side.
    pub fn step(&self) -> (i32, i32) {
        match self {
            Orientation::North => (0, -1),
            Orientation::South => (0, 1),
            Orientation::East => (1, 0),
            Orientation::West => (-1, 0),
        }
    }

    pub fn opposite(&self) -> Orientation {
        match self {
            Orientation::North => Orientation::South,
            Orientation::South => Orientation::North,
            Orientation::East => Orientation::West,
            Orientation::West => Orientation::East,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorState {
    Closed,
    Locked,
    Trapped,
    Open,
    MagicallySealed,
}

/// A lock barring a door until its durability is worn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    /// Modifier applied to pick attempts.
    pub modifier: i32,
    pub durability: i32,
}

impl Lock {
    /// Lock tier for a 1d10 lock roll; 6 or less leaves the door unlocked.
    pub fn for_roll(roll: i32) -> Option<Lock> {
        let (modifier, durability) = match roll {
            7 => (0, 10),
            8 => (-10, 15),
            9 => (-15, 20),
            r if r >= 10 => (-20, 25),
            _ => return None,
        };
        Some(Lock {
            modifier,
            durability,
        })
    }

    pub fn is_broken(&self) -> bool {
        self.durability <= 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trap {
    pub name: String,
    pub description: String,
    pub triggered: bool,
    pub disarmed: bool,
}

impl Trap {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            triggered: false,
            disarmed: false,
        }
    }

    pub fn is_armed(&self) -> bool {
        !self.triggered && !self.disarmed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Door {
    pub id: DoorId,
    pub state: DoorState,
    pub orientation: Orientation,
    /// Squares of the owning room the door occupies; the first is the
    /// reference square used to place whatever lies beyond.
    pub positions: Vec<GridPos>,
    /// Squares forming the opening once the room beyond is revealed.
    pub passageway: Vec<GridPos>,
    /// The room the door was placed in, and the room behind it once known.
    pub rooms: (RoomId, Option<RoomId>),
    pub lock: Option<Lock>,
    pub trap: Option<Trap>,
    pub deck: Option<ExplorationDeck>,
    /// Trap and lock rolls happen once per door.
    pub rolled: bool,
}

impl Door {
    pub fn new(id: DoorId, room: RoomId, orientation: Orientation, positions: Vec<GridPos>) -> Self {
        Self {
            id,
            state: DoorState::Closed,
            orientation,
            positions,
            passageway: Vec::new(),
            rooms: (room, None),
            lock: None,
            trap: None,
            deck: None,
            rolled: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == DoorState::Open
    }

    pub fn reference_square(&self) -> Option<GridPos> {
        self.positions.first().copied()
    }

    pub fn deck_len(&self) -> usize {
        self.deck.as_ref().map_or(0, |d| d.len())
    }

    /// The room on the other side from `room`.
    pub fn other_side(&self, room: RoomId) -> Option<RoomId> {
        match self.rooms {
            (a, b) if a == room => b,
            (a, Some(b)) if b == room => Some(a),
            _ => None,
        }
    }
}

// ============================================================================
// Rooms
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub category: RoomCategory,
    pub width: u32,
    pub height: u32,
    /// North-west corner on the shared grid.
    pub offset: GridPos,
    pub walls: Vec<(u32, u32)>,
    pub doors: Vec<DoorId>,
    pub connections: Vec<RoomId>,
    pub encounter: Option<EncounterType>,
    pub monsters: Vec<MonsterId>,
    pub furniture: Vec<String>,
    pub corpses: Vec<String>,
    pub searched: bool,
    pub dead_end: bool,
    pub in_encounter: bool,
}

impl Room {
    pub fn from_descriptor(id: RoomId, descriptor: RoomDescriptor, offset: GridPos) -> Self {
        Self {
            id,
            name: descriptor.name,
            category: descriptor.category,
            width: descriptor.width,
            height: descriptor.height,
            offset,
            walls: descriptor.walls,
            doors: Vec::new(),
            connections: Vec::new(),
            encounter: descriptor.encounter,
            monsters: Vec::new(),
            furniture: descriptor.furniture,
            corpses: Vec::new(),
            searched: false,
            dead_end: false,
            in_encounter: false,
        }
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        pos.z == self.offset.z
            && pos.x >= self.offset.x
            && pos.y >= self.offset.y
            && pos.x < self.offset.x + self.width as i32
            && pos.y < self.offset.y + self.height as i32
    }

    pub fn is_wall(&self, pos: GridPos) -> bool {
        if !self.contains(pos) {
            return false;
        }
        let local = (
            (pos.x - self.offset.x) as u32,
            (pos.y - self.offset.y) as u32,
        );
        self.walls.contains(&local)
    }

    /// Squares on the room's outer ring, row-major.
    pub fn border_cells(&self) -> Vec<GridPos> {
        let mut cells = Vec::new();
        for dy in 0..self.height {
            for dx in 0..self.width {
                if dx == 0 || dy == 0 || dx + 1 == self.width || dy + 1 == self.height {
                    cells.push(self.offset.offset(dx as i32, dy as i32));
                }
            }
        }
        cells
    }

    /// Non-wall squares off the border, nearest the centre first.
    pub fn interior_cells(&self) -> Vec<GridPos> {
        let (w, h) = (self.width as i32, self.height as i32);
        let mut cells: Vec<GridPos> = (1..self.height.saturating_sub(1))
            .flat_map(|dy| (1..self.width.saturating_sub(1)).map(move |dx| (dx, dy)))
            .filter(|local| !self.walls.contains(local))
            .map(|(dx, dy)| self.offset.offset(dx as i32, dy as i32))
            .collect();
        // Doubled coordinates keep even-sized rooms centred.
        cells.sort_by_key(|p| {
            let dx = 2 * (p.x - self.offset.x) - (w - 1);
            let dy = 2 * (p.y - self.offset.y) - (h - 1);
            (dx.abs().max(dy.abs()), p.y, p.x)
        });
        cells
    }

    /// Squares along one side, ordered west-to-east or north-to-south.
    pub fn edge(&self, side: Orientation) -> Vec<GridPos> {
        let (w, h) = (self.width as i32, self.height as i32);
        match side {
            Orientation::North => (0..w).map(|dx| self.offset.offset(dx, 0)).collect(),
            Orientation::South => (0..w).map(|dx| self.offset.offset(dx, h - 1)).collect(),
            Orientation::West => (0..h).map(|dy| self.offset.offset(0, dy)).collect(),
            Orientation::East => (0..h).map(|dy| self.offset.offset(w - 1, dy)).collect(),
        }
    }

    pub fn connect(&mut self, other: RoomId) {
        if !self.connections.contains(&other) {
            self.connections.push(other);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_tiers() {
        assert_eq!(Lock::for_roll(6), None);
        assert_eq!(
            Lock::for_roll(7),
            Some(Lock {
                modifier: 0,
                durability: 10
            })
        );
        assert_eq!(
            Lock::for_roll(8),
            Some(Lock {
                modifier: -10,
                durability: 15
            })
        );
        assert_eq!(
            Lock::for_roll(9),
            Some(Lock {
                modifier: -15,
                durability: 20
            })
        );
        assert_eq!(
            Lock::for_roll(10),
            Some(Lock {
                modifier: -20,
                durability: 25
            })
        );
    }

    #[test]
    fn test_border_cells_row_major() {
        let room = Room::from_descriptor(
            RoomId(0),
            RoomDescriptor::room("Hall", 3, 3, 1),
            GridPos::new(10, 10),
        );
        let border = room.border_cells();
        assert_eq!(border.len(), 8);
        assert_eq!(border[0], GridPos::new(10, 10));
        assert_eq!(border[3], GridPos::new(10, 11));
        assert!(!border.contains(&GridPos::new(11, 11)));
    }

    #[test]
    fn test_edge_and_walls() {
        let room = Room::from_descriptor(
            RoomId(0),
            RoomDescriptor::corridor("Passage", 1, 4, 1).with_walls(vec![(0, 3)]),
            GridPos::new(0, 0),
        );
        assert_eq!(room.edge(Orientation::South), vec![GridPos::new(0, 3)]);
        assert_eq!(room.edge(Orientation::East).len(), 4);
        assert!(room.is_wall(GridPos::new(0, 3)));
        assert!(!room.is_wall(GridPos::new(0, 2)));
    }

    #[test]
    fn test_other_side() {
        let mut door = Door::new(DoorId(0), RoomId(1), Orientation::North, vec![]);
        assert_eq!(door.other_side(RoomId(1)), None);
        door.rooms.1 = Some(RoomId(2));
        assert_eq!(door.other_side(RoomId(1)), Some(RoomId(2)));
        assert_eq!(door.other_side(RoomId(2)), Some(RoomId(1)));
    }
}
