//! The shared square grid every revealed room is placed onto.
//!
//! The grid is sparse: only squares belonging to a placed room exist.
//! Coordinates carry three axes; `z` is the dungeon level and movement
//! never changes it. `y` grows towards the south.
//!
//! Movement is eight-directional and distances are Chebyshev. A step
//! between two squares of different rooms is only legal through an
//! opened passage (see [`GridMap::open_passage`]).

use crate::room::RoomId;
use crate::state::{HeroId, MonsterId, TokenId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

/// A grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y, z: 0 }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z,
        }
    }

    /// Chebyshev distance on the same level; levels are never adjacent.
    pub fn chebyshev(self, other: GridPos) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        let dz = self.z.abs_diff(other.z);
        dx.max(dy) + dz * 1000
    }

    pub fn is_orthogonal_to(self, other: GridPos) -> bool {
        self.z == other.z && self.x.abs_diff(other.x) + self.y.abs_diff(other.y) == 1
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

const STEPS: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SquareKind {
    Floor,
    Wall,
}

/// Whatever stands on a square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occupant {
    Hero(HeroId),
    Monster(MonsterId),
    Token(TokenId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Square {
    pub kind: SquareKind,
    pub room: RoomId,
    pub occupant: Option<Occupant>,
    /// Furniture blocks movement but not sight.
    pub furniture: Option<String>,
}

impl Square {
    pub fn is_floor(&self) -> bool {
        self.kind == SquareKind::Floor
    }

    pub fn is_free(&self) -> bool {
        self.is_floor() && self.occupant.is_none() && self.furniture.is_none()
    }
}

/// Outcome of a line-of-sight query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineOfSight {
    pub can_see: bool,
    pub distance: u32,
}

/// Where a room lands on the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footprint<'a> {
    pub offset: GridPos,
    pub width: u32,
    pub height: u32,
    /// Wall squares in room-local coordinates.
    pub walls: &'a [(u32, u32)],
}

/// Sparse map from coordinates to squares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "GridSnapshot", into = "GridSnapshot")]
pub struct GridMap {
    squares: HashMap<GridPos, Square>,
    passages: HashSet<(GridPos, GridPos)>,
}

#[derive(Serialize, Deserialize)]
struct GridSnapshot {
    squares: Vec<(GridPos, Square)>,
    passages: Vec<(GridPos, GridPos)>,
}

impl From<GridMap> for GridSnapshot {
    fn from(map: GridMap) -> Self {
        let mut squares: Vec<_> = map.squares.into_iter().collect();
        squares.sort_by_key(|(pos, _)| *pos);
        let mut passages: Vec<_> = map.passages.into_iter().collect();
        passages.sort();
        Self { squares, passages }
    }
}

impl From<GridSnapshot> for GridMap {
    fn from(snapshot: GridSnapshot) -> Self {
        Self {
            squares: snapshot.squares.into_iter().collect(),
            passages: snapshot.passages.into_iter().collect(),
        }
    }
}

fn passage_key(a: GridPos, b: GridPos) -> (GridPos, GridPos) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl GridMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a room's squares onto the grid.
    ///
    /// Squares already claimed by another room are left untouched; the
    /// number of such overlapping squares is returned.
    pub fn place(&mut self, room: RoomId, footprint: &Footprint<'_>) -> usize {
        let mut overlapped = 0;
        for dy in 0..footprint.height {
            for dx in 0..footprint.width {
                let pos = footprint.offset.offset(dx as i32, dy as i32);
                if self.squares.contains_key(&pos) {
                    overlapped += 1;
                    continue;
                }
                let kind = if footprint.walls.contains(&(dx, dy)) {
                    SquareKind::Wall
                } else {
                    SquareKind::Floor
                };
                self.squares.insert(
                    pos,
                    Square {
                        kind,
                        room,
                        occupant: None,
                        furniture: None,
                    },
                );
            }
        }
        overlapped
    }

    pub fn square_at(&self, pos: GridPos) -> Option<&Square> {
        self.squares.get(&pos)
    }

    pub fn square_at_mut(&mut self, pos: GridPos) -> Option<&mut Square> {
        self.squares.get_mut(&pos)
    }

    pub fn room_at(&self, pos: GridPos) -> Option<RoomId> {
        self.squares.get(&pos).map(|s| s.room)
    }

    pub fn is_floor(&self, pos: GridPos) -> bool {
        self.squares.get(&pos).is_some_and(Square::is_floor)
    }

    pub fn len(&self) -> usize {
        self.squares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.squares.is_empty()
    }

    /// Connect two orthogonally adjacent squares of different rooms.
    pub fn open_passage(&mut self, a: GridPos, b: GridPos) {
        self.passages.insert(passage_key(a, b));
    }

    pub fn has_passage(&self, a: GridPos, b: GridPos) -> bool {
        self.passages.contains(&passage_key(a, b))
    }

    /// Whether a single step from `a` to `b` is geometrically legal.
    pub fn can_step(&self, a: GridPos, b: GridPos) -> bool {
        if a == b || a.chebyshev(b) != 1 {
            return false;
        }
        match (self.squares.get(&a), self.squares.get(&b)) {
            (Some(from), Some(to)) if from.is_floor() && to.is_floor() => {
                from.room == to.room || self.has_passage(a, b)
            }
            _ => false,
        }
    }

    /// Floor squares one legal step away, ignoring occupants.
    pub fn neighbors(&self, pos: GridPos) -> Vec<GridPos> {
        STEPS
            .iter()
            .map(|(dx, dy)| pos.offset(*dx, *dy))
            .filter(|next| self.can_step(pos, *next))
            .collect()
    }

    pub fn distance(&self, a: GridPos, b: GridPos) -> u32 {
        a.chebyshev(b)
    }

    /// Trace a line between two squares; walls, missing squares and room
    /// boundaries without a passage block sight.
    pub fn line_of_sight(&self, a: GridPos, b: GridPos) -> LineOfSight {
        let distance = a.chebyshev(b);
        if a.z != b.z || !self.squares.contains_key(&a) || !self.squares.contains_key(&b) {
            return LineOfSight {
                can_see: false,
                distance,
            };
        }

        let (mut x, mut y) = (a.x, a.y);
        let dx = (b.x - a.x).abs();
        let dy = -(b.y - a.y).abs();
        let sx = if a.x < b.x { 1 } else { -1 };
        let sy = if a.y < b.y { 1 } else { -1 };
        let mut err = dx + dy;
        let mut previous = a;

        while (x, y) != (b.x, b.y) {
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
            let current = GridPos { x, y, z: a.z };
            if !self.can_step(previous, current) {
                return LineOfSight {
                    can_see: false,
                    distance,
                };
            }
            previous = current;
        }

        LineOfSight {
            can_see: true,
            distance,
        }
    }

    fn walkable(&self, pos: GridPos, occupied: &HashSet<GridPos>) -> bool {
        !occupied.contains(&pos)
            && self
                .squares
                .get(&pos)
                .is_some_and(|s| s.is_floor() && s.furniture.is_none())
    }

    /// Breadth-first path from `from` until standing next to `target`.
    ///
    /// The returned cells exclude `from` and `target`. `occupied` squares
    /// cannot be entered. An empty path means the mover is already
    /// adjacent.
    pub fn shortest_path(
        &self,
        from: GridPos,
        target: GridPos,
        occupied: &HashSet<GridPos>,
    ) -> Option<Vec<GridPos>> {
        if !self.squares.contains_key(&from) || !self.squares.contains_key(&target) {
            return None;
        }

        let mut came_from: HashMap<GridPos, GridPos> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        came_from.insert(from, from);

        while let Some(current) = queue.pop_front() {
            if current == target || self.can_step(current, target) {
                let mut path = Vec::new();
                let mut cursor = current;
                while cursor != from {
                    path.push(cursor);
                    cursor = came_from[&cursor];
                }
                path.reverse();
                path.retain(|p| *p != target);
                return Some(path);
            }
            for next in self.neighbors(current) {
                if came_from.contains_key(&next) || !self.walkable(next, occupied) {
                    continue;
                }
                came_from.insert(next, current);
                queue.push_back(next);
            }
        }
        None
    }

    /// Every square reachable from `from` in `1..=max_steps` steps.
    pub fn reachable_set(
        &self,
        from: GridPos,
        max_steps: u32,
        occupied: &HashSet<GridPos>,
    ) -> BTreeSet<GridPos> {
        let mut seen = HashSet::from([from]);
        let mut reached = BTreeSet::new();
        let mut frontier = vec![from];

        for _ in 0..max_steps {
            let mut next_frontier = Vec::new();
            for pos in frontier {
                for next in self.neighbors(pos) {
                    if seen.contains(&next) || !self.walkable(next, occupied) {
                        continue;
                    }
                    seen.insert(next);
                    reached.insert(next);
                    next_frontier.push(next);
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }
        reached
    }

    /// All squares of a room, sorted row-major.
    pub fn cells_of(&self, room: RoomId) -> Vec<GridPos> {
        let mut cells: Vec<GridPos> = self
            .squares
            .iter()
            .filter(|(_, s)| s.room == room)
            .map(|(p, _)| *p)
            .collect();
        cells.sort_by_key(|p| (p.z, p.y, p.x));
        cells
    }

    pub fn set_occupant(&mut self, pos: GridPos, occupant: Option<Occupant>) {
        if let Some(square) = self.squares.get_mut(&pos) {
            square.occupant = occupant;
        }
    }

    pub fn occupant_at(&self, pos: GridPos) -> Option<Occupant> {
        self.squares.get(&pos).and_then(|s| s.occupant)
    }

    /// Squares that currently hold anybody.
    pub fn occupied_cells(&self) -> HashSet<GridPos> {
        self.squares
            .iter()
            .filter(|(_, s)| s.occupant.is_some())
            .map(|(p, _)| *p)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_rooms() -> GridMap {
        let mut grid = GridMap::new();
        grid.place(
            RoomId(0),
            &Footprint {
                offset: GridPos::new(0, 0),
                width: 3,
                height: 3,
                walls: &[],
            },
        );
        grid.place(
            RoomId(1),
            &Footprint {
                offset: GridPos::new(3, 0),
                width: 3,
                height: 3,
                walls: &[(0, 0)],
            },
        );
        grid
    }

    #[test]
    fn test_place_reports_overlap() {
        let mut grid = two_rooms();
        let overlapped = grid.place(
            RoomId(2),
            &Footprint {
                offset: GridPos::new(2, 2),
                width: 2,
                height: 2,
                walls: &[],
            },
        );
        assert_eq!(overlapped, 2);
        assert_eq!(grid.room_at(GridPos::new(2, 2)), Some(RoomId(0)));
        assert_eq!(grid.room_at(GridPos::new(2, 3)), Some(RoomId(2)));
    }

    #[test]
    fn test_rooms_are_sealed_until_passage_opens() {
        let mut grid = two_rooms();
        assert!(!grid.can_step(GridPos::new(2, 1), GridPos::new(3, 1)));
        grid.open_passage(GridPos::new(3, 1), GridPos::new(2, 1));
        assert!(grid.can_step(GridPos::new(2, 1), GridPos::new(3, 1)));
        assert!(!grid.can_step(GridPos::new(2, 0), GridPos::new(3, 0)));
    }

    #[test]
    fn test_shortest_path_crosses_passage() {
        let mut grid = two_rooms();
        grid.open_passage(GridPos::new(2, 1), GridPos::new(3, 1));
        let path = grid
            .shortest_path(GridPos::new(0, 1), GridPos::new(5, 1), &HashSet::new())
            .unwrap();
        assert_eq!(path.last(), Some(&GridPos::new(4, 1)));
        assert!(path.contains(&GridPos::new(3, 1)));
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_shortest_path_blocked() {
        let grid = two_rooms();
        assert!(grid
            .shortest_path(GridPos::new(0, 1), GridPos::new(5, 1), &HashSet::new())
            .is_none());
    }

    #[test]
    fn test_adjacent_path_is_empty() {
        let grid = two_rooms();
        let path = grid
            .shortest_path(GridPos::new(0, 0), GridPos::new(1, 1), &HashSet::new())
            .unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_reachable_set_respects_budget_and_occupants() {
        let grid = two_rooms();
        let occupied = HashSet::from([GridPos::new(1, 0)]);
        let reach = grid.reachable_set(GridPos::new(0, 0), 1, &occupied);
        assert_eq!(reach.len(), 2);
        assert!(reach.contains(&GridPos::new(0, 1)));
        assert!(reach.contains(&GridPos::new(1, 1)));

        let all = grid.reachable_set(GridPos::new(0, 0), 5, &HashSet::new());
        assert_eq!(all.len(), 8);
    }

    #[test]
    fn test_line_of_sight() {
        let mut grid = two_rooms();
        let los = grid.line_of_sight(GridPos::new(0, 1), GridPos::new(5, 1));
        assert!(!los.can_see);
        assert_eq!(los.distance, 5);

        grid.open_passage(GridPos::new(2, 1), GridPos::new(3, 1));
        assert!(grid.line_of_sight(GridPos::new(0, 1), GridPos::new(5, 1)).can_see);
        assert!(grid.line_of_sight(GridPos::new(0, 0), GridPos::new(2, 2)).can_see);
    }

    #[test]
    fn test_snapshot_roundtrip_keeps_passages() {
        let mut grid = two_rooms();
        grid.open_passage(GridPos::new(2, 1), GridPos::new(3, 1));
        let json = serde_json::to_string(&grid).unwrap();
        let restored: GridMap = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.len(), grid.len());
        assert!(restored.has_passage(GridPos::new(3, 1), GridPos::new(2, 1)));
    }
}
