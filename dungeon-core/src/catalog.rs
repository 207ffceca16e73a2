//! Built-in content tables: room cards, encounter groups and door traps.
//!
//! These are deliberately small. Drivers with richer content plug in
//! their own tables through the collaborator traits.

use crate::room::{EncounterType, RoomDescriptor};
use crate::state::MonsterBehavior;

/// A monster as listed in an encounter group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonsterTemplate {
    pub name: &'static str,
    pub behavior: MonsterBehavior,
}

const fn melee(name: &'static str) -> MonsterTemplate {
    MonsterTemplate {
        name,
        behavior: MonsterBehavior::Melee,
    }
}

const fn ranged(name: &'static str) -> MonsterTemplate {
    MonsterTemplate {
        name,
        behavior: MonsterBehavior::Ranged,
    }
}

const fn caster(name: &'static str) -> MonsterTemplate {
    MonsterTemplate {
        name,
        behavior: MonsterBehavior::MagicUser,
    }
}

pub const HIDDEN_TREASURE: &str = "Hidden Treasure Vault";
pub const ENTRANCE: &str = "Entrance Stairway";

lazy_static::lazy_static! {
    /// Every room and corridor card a standard dungeon is dealt from.
    pub static ref ROOM_CATALOG: Vec<RoomDescriptor> = vec![
        // Rooms
        RoomDescriptor::room("Guard Room", 5, 5, 2).with_furniture(vec!["Table".to_string()]),
        RoomDescriptor::room("Barracks", 6, 4, 1).with_furniture(vec!["Bunks".to_string()]),
        RoomDescriptor::room("Armoury", 4, 4, 1).with_furniture(vec!["Weapon Rack".to_string()]),
        RoomDescriptor::room("Throne Room", 7, 6, 2).with_furniture(vec!["Throne".to_string()]),
        RoomDescriptor::room("Library", 5, 6, 2).with_furniture(vec!["Bookcase".to_string()]),
        RoomDescriptor::room("Crypt", 6, 5, 1).with_walls(vec![(1, 1), (4, 1), (1, 3), (4, 3)]),
        RoomDescriptor::room("Torture Chamber", 5, 5, 2).with_furniture(vec!["Rack".to_string()]),
        RoomDescriptor::room("Shrine", 4, 5, 1).with_furniture(vec!["Altar".to_string()]),
        RoomDescriptor::room("Kitchen", 5, 4, 2).with_furniture(vec!["Fireplace".to_string()]),
        RoomDescriptor::room("Storeroom", 3, 4, 1),
        RoomDescriptor::room("Well Room", 4, 4, 3).with_walls(vec![(1, 1), (2, 1), (1, 2), (2, 2)]),
        RoomDescriptor::room("Great Hall", 8, 6, 3),
        RoomDescriptor::room("Alchemist's Laboratory", 4, 5, 1).with_furniture(vec!["Workbench".to_string()]),
        RoomDescriptor::room("Prison Cells", 6, 4, 2),
        RoomDescriptor::room("Sleeping Quarters", 5, 4, 1).with_furniture(vec!["Bed".to_string()]),
        // Corridors
        RoomDescriptor::corridor("Straight Corridor", 2, 8, 1),
        RoomDescriptor::corridor("Long Corridor", 2, 10, 1),
        RoomDescriptor::corridor("T-Junction", 6, 2, 2),
        RoomDescriptor::corridor("Crossroads", 6, 6, 3)
            .with_walls(vec![(0, 0), (1, 0), (4, 0), (5, 0), (0, 5), (1, 5), (4, 5), (5, 5)]),
        RoomDescriptor::corridor("Bend", 2, 5, 1),
        RoomDescriptor::corridor("Blind Passage", 2, 4, 0),
        RoomDescriptor::corridor("Narrow Passage", 1, 6, 1),
        RoomDescriptor::corridor("Stairwell", 3, 3, 1),
        RoomDescriptor::corridor("Collapsed Tunnel", 2, 6, 0).with_walls(vec![(1, 4), (1, 5)]),
        RoomDescriptor::corridor("Wide Corridor", 3, 8, 2),
    ];

    /// Inserted by the Hidden Treasure side quest.
    pub static ref HIDDEN_TREASURE_ROOM: RoomDescriptor =
        RoomDescriptor::room(HIDDEN_TREASURE, 4, 4, 0)
            .with_encounter(EncounterType::new("Treasure Guardians"))
            .with_furniture(vec!["Treasure Chest".to_string()]);

    /// Where every party starts.
    pub static ref ENTRANCE_ROOM: RoomDescriptor = RoomDescriptor::corridor(ENTRANCE, 2, 4, 1);

    static ref ENCOUNTERS: Vec<(&'static str, Vec<MonsterTemplate>)> = vec![
        ("Goblin Raiders", vec![melee("Goblin"), melee("Goblin"), melee("Goblin"), ranged("Goblin Archer")]),
        ("Orc Warband", vec![melee("Orc"), melee("Orc"), caster("Orc Shaman")]),
        ("Restless Dead", vec![melee("Skeleton"), melee("Skeleton"), melee("Skeleton")]),
        ("Giant Spiders", vec![melee("Giant Spider"), melee("Giant Spider")]),
        ("Bandits", vec![melee("Bandit"), melee("Bandit"), ranged("Crossbowman")]),
        ("Treasure Guardians", vec![melee("Animated Armour"), melee("Animated Armour")]),
        ("Wandering Patrol", vec![melee("Orc"), melee("Goblin"), ranged("Goblin Archer")]),
        ("Necromancer's Circle", vec![caster("Necromancer"), melee("Zombie"), melee("Zombie")]),
    ];

    /// Traps a door can be rigged with.
    pub static ref DOOR_TRAPS: Vec<(&'static str, &'static str)> = vec![
        ("Poison Needle", "A needle in the handle jabs whoever turns it."),
        ("Dart Trap", "Darts hiss out of the frame."),
        ("Falling Block", "A stone block drops from above the lintel."),
        ("Gas Cloud", "A cloud of choking gas billows out."),
        ("Pit Trap", "The floor in front of the door gives way."),
    ];
}

/// Monsters making up a named encounter; unknown names yield nothing.
pub fn encounter_group(encounter: &EncounterType) -> &'static [MonsterTemplate] {
    ENCOUNTERS
        .iter()
        .find(|(name, _)| *name == encounter.0)
        .map(|(_, monsters)| monsters.as_slice())
        .unwrap_or(&[])
}

pub fn encounter_names() -> Vec<&'static str> {
    ENCOUNTERS.iter().map(|(name, _)| *name).collect()
}
