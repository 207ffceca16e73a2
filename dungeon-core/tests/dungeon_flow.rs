//! Integration tests for door handling, dealing and the turn loop.
//!
//! All of these run offline: rolls come from a `ScriptedOracle` unless a
//! test deliberately plays with real dice.

use dungeon_core::deck::{build_deck, DeckRequest};
use dungeon_core::grid::GridPos;
use dungeon_core::room::{ExplorationDeck, Orientation, RoomDescriptor};
use dungeon_core::state::SideQuest;
use dungeon_core::testing::{
    assert_door_state, assert_threat, assert_threat_in_bounds, ScriptedOracle, TestHarness,
};
use dungeon_core::{
    DiceOracle, DoorActor, DoorId, DoorInteraction, DoorState, DungeonConfig, DungeonError,
    DungeonEvent, DungeonSession, DungeonState, Hero, Party, Quest, RoomId, UnlockMethod,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn names(deck: Option<&ExplorationDeck>) -> Vec<String> {
    deck.map(|d| d.iter().map(|c| c.name.clone()).collect())
        .unwrap_or_default()
}

/// A single 6x6 hub with one north door holding `deck`.
fn hub_with_deck(deck: Vec<RoomDescriptor>) -> TestHarness {
    let config = DungeonConfig::default();
    let quest = Quest::new("Hub", &config);
    let party = Party::new(vec![Hero::new("Aria", 12)]);
    let mut state = DungeonState::new(party, quest, &config).unwrap();
    let hub = state.add_room(RoomDescriptor::room("Hub", 6, 6, 1), GridPos::new(0, 0));
    let door = state.add_door(
        hub,
        Orientation::North,
        vec![GridPos::new(2, 0), GridPos::new(3, 0)],
    );
    state.door_mut(door).unwrap().deck = Some(deck.into());
    let hero = state.party.heroes[0].id;
    state.move_hero(hero, GridPos::new(2, 3)).unwrap();
    TestHarness::with_state(state, 9)
}

// =============================================================================
// DOORS
// =============================================================================

#[test]
fn test_trapped_and_locked_door() {
    let mut harness = TestHarness::new();
    // trap on 6, lock tier 9, hero dodges on 15
    harness.expect_rolls(&[6, 9, 15]);
    let door = harness.entrance_door();
    let result = harness.open(door).unwrap();

    assert_eq!(
        result.outcome,
        DoorInteraction::Locked {
            modifier: -15,
            durability: 20
        }
    );
    assert_door_state(&harness, door, DoorState::Locked);
    assert_threat(&harness, 0);
    assert_eq!(harness.oracle.remaining_rolls(), 0);

    let position = |pred: fn(&DungeonEvent) -> bool| {
        result.resolution.events.iter().position(pred).unwrap()
    };
    let armed = position(|e| matches!(e, DungeonEvent::TrapArmed { .. }));
    let sprung = position(|e| matches!(e, DungeonEvent::TrapSprung { .. }));
    let locked = position(|e| matches!(e, DungeonEvent::DoorLocked { .. }));
    assert!(armed < sprung && sprung < locked);
    assert!(!result.resolution.contains(|e| matches!(e, DungeonEvent::EncounterChecked { .. })));

    // Second try: nothing new is rolled and the lock is not announced again.
    let again = harness.open(door).unwrap();
    assert!(matches!(again.outcome, DoorInteraction::Locked { .. }));
    assert!(!again.resolution.contains(|e| matches!(e, DungeonEvent::DoorLocked { .. })));
    assert!(!again.resolution.contains(|e| matches!(e, DungeonEvent::TrapSprung { .. })));
}

#[test]
fn test_trap_damage_lands_on_hero() {
    let mut harness = TestHarness::new();
    // trap, no lock, failed dodge, 4 damage, no encounter
    harness.expect_rolls(&[6, 1, 3, 4, 100]);
    let hero = harness.first_hero();
    let before = harness.state.hero(hero).unwrap().current_hp;
    let result = harness.open(harness.entrance_door()).unwrap();

    assert!(matches!(result.outcome, DoorInteraction::Opened { room: Some(_) }));
    assert_eq!(harness.state.hero(hero).unwrap().current_hp, before - 4);
}

#[test]
fn test_locked_door_opens_after_unlock() {
    let mut harness = TestHarness::new();
    let door = harness.entrance_door();
    let hero = harness.first_hero();
    harness.expect_rolls(&[1, 9]);
    harness.open(door).unwrap();
    assert_door_state(&harness, door, DoorState::Locked);

    let unlock = harness
        .orchestrator
        .attempt_unlock(&mut harness.state, &mut harness.oracle, door, hero, UnlockMethod::Spell)
        .unwrap();
    assert!(unlock.outcome.success);
    assert_door_state(&harness, door, DoorState::Closed);

    // Only the encounter check is left to roll.
    harness.expect_rolls(&[100]);
    let result = harness.open(door).unwrap();
    assert!(matches!(result.outcome, DoorInteraction::Opened { room: Some(_) }));
    assert_door_state(&harness, door, DoorState::Open);
    assert_threat(&harness, 1);
}

#[test]
fn test_bashing_wears_the_lock_down() {
    let mut harness = TestHarness::new();
    let door = harness.entrance_door();
    let hero = harness.first_hero();
    harness.expect_rolls(&[1, 7]);
    harness.open(door).unwrap();

    // 2d6 damage against durability 10
    harness.expect_rolls(&[6]);
    let first = harness
        .orchestrator
        .attempt_unlock(&mut harness.state, &mut harness.oracle, door, hero, UnlockMethod::Bash)
        .unwrap();
    assert!(!first.outcome.success);
    assert_eq!(harness.state.door(door).unwrap().lock.unwrap().durability, 4);

    harness.expect_rolls(&[9]);
    let second = harness
        .orchestrator
        .attempt_unlock(&mut harness.state, &mut harness.oracle, door, hero, UnlockMethod::Bash)
        .unwrap();
    assert!(second.outcome.success);
    assert_door_state(&harness, door, DoorState::Closed);
}

#[test]
fn test_open_door_is_idempotent() {
    let mut harness = TestHarness::new();
    let door = harness.entrance_door();
    harness.expect_rolls(&[1, 1, 100]);
    harness.open(door).unwrap();

    let before = harness.state.clone();
    let prompts = harness.oracle.prompts().len();
    let again = harness.open(door).unwrap();

    assert_eq!(again.outcome, DoorInteraction::AlreadyOpen);
    assert!(again.resolution.events.is_empty());
    assert_eq!(harness.state, before);
    assert_eq!(harness.oracle.prompts().len(), prompts);
}

#[test]
fn test_cancelled_roll_leaves_state_untouched() {
    for rolls in [vec![], vec![6], vec![6, 1], vec![1, 1]] {
        let mut harness = TestHarness::new();
        harness.expect_rolls(&rolls);
        let before = harness.state.clone();

        let result = harness.open(harness.entrance_door());
        assert!(
            matches!(result, Err(DungeonError::Cancelled(_))),
            "rolls {rolls:?} should cancel"
        );
        assert_eq!(harness.state, before, "rolls {rolls:?} changed the dungeon");
    }
}

#[test]
fn test_monster_side_leaves_trap_armed() {
    let mut harness = TestHarness::new();
    let door = harness.entrance_door();
    harness.expect_rolls(&[6, 1, 100]);
    let result = harness
        .orchestrator
        .interact_with_door(&mut harness.state, &mut harness.oracle, door, DoorActor::Other)
        .unwrap();

    assert!(matches!(result.outcome, DoorInteraction::Opened { .. }));
    assert!(!result.resolution.contains(|e| matches!(e, DungeonEvent::TrapSprung { .. })));
    let trap = harness.state.door(door).unwrap().trap.clone().unwrap();
    assert!(trap.is_armed());
}

// =============================================================================
// REVEAL AND DEALING
// =============================================================================

#[test]
fn test_reveal_deals_five_cards_to_two_doors() {
    let mut deck = vec![RoomDescriptor::room("Junction", 4, 4, 2)];
    deck.extend((1..=5).map(|i| RoomDescriptor::room(format!("c{i}"), 3, 3, 1)));
    let mut harness = hub_with_deck(deck);

    harness.expect_rolls(&[1, 1, 100]);
    let result = harness.open(DoorId(0)).unwrap();
    let DoorInteraction::Opened { room: Some(room) } = result.outcome else {
        panic!("expected a revealed room, got {:?}", result.outcome);
    };

    let junction = harness.state.room(room).unwrap();
    assert_eq!(junction.name, "Junction");
    assert_eq!(junction.offset, GridPos::new(2, -4));
    assert_eq!(junction.doors.len(), 3);
    assert!(junction.connections.contains(&RoomId(0)));

    let first = harness.state.door(junction.doors[1]).unwrap();
    let second = harness.state.door(junction.doors[2]).unwrap();
    assert_eq!(names(first.deck.as_ref()), vec!["c1", "c3", "c5"]);
    assert_eq!(names(second.deck.as_ref()), vec!["c2", "c4"]);
    assert!(harness.state.door(DoorId(0)).unwrap().deck.is_none());
    assert!(!harness.state.door(DoorId(0)).unwrap().passageway.is_empty());
}

#[test]
fn test_last_card_is_a_dead_end() {
    let mut harness = hub_with_deck(vec![RoomDescriptor::room("Vault", 4, 4, 2)]);
    harness.expect_rolls(&[1, 1, 100]);
    let result = harness.open(DoorId(0)).unwrap();

    assert!(result.resolution.contains(|e| matches!(e, DungeonEvent::DeadEnd { .. })));
    assert!(harness.state.rooms[1].dead_end);
    assert!(harness.state.closed_doors().is_empty());
}

#[test]
fn test_encounter_on_reveal() {
    let mut harness =
        hub_with_deck(vec![RoomDescriptor::room("Den", 5, 5, 0), RoomDescriptor::room("c1", 3, 3, 1)]);
    harness.expect_rolls(&[1, 1, 1]);
    harness.open(DoorId(0)).unwrap();

    assert!(harness.state.rooms[1].in_encounter);
    assert!(!harness.state.rooms[1].monsters.is_empty());
    assert_eq!(harness.state.threat.rooms_without_encounter, 0);
}

// =============================================================================
// THREAT
// =============================================================================

#[test]
fn test_reaching_max_threat_releases_a_wanderer() {
    let mut harness = TestHarness::new();
    harness.state.threat.current_threat = 19;
    harness.expect_rolls(&[1, 1, 100]);
    let result = harness.open(harness.entrance_door()).unwrap();

    assert!(result.resolution.contains(|e| matches!(e, DungeonEvent::WanderingMonsterSpawned { .. })));
    assert_eq!(harness.state.tokens.len(), 1);
    assert_threat(&harness, 15);
}

#[test]
fn test_threat_stays_in_bounds_with_real_dice() {
    let config = DungeonConfig::default().with_seed(5);
    let quest = Quest::new("Long Delve", &config);
    let party = Party::new(vec![Hero::new("Aria", 40), Hero::new("Bram", 40)]);
    let oracle = DiceOracle::new(StdRng::seed_from_u64(99)).with_default_answer(false);
    let mut session = DungeonSession::new(party, quest, config, oracle).unwrap();
    let hero = session.state().party.heroes[0].id;

    for _ in 0..150 {
        if let Some(room) = session.state().battle_room() {
            session.end_encounter(room).unwrap();
        } else if let Some(door) = session.closed_doors().first().copied() {
            if session.state().door(door).unwrap().state == DoorState::Locked {
                session.attempt_unlock(door, hero, UnlockMethod::Spell).unwrap();
            } else {
                session.open_door(door, hero).unwrap();
            }
        }

        let report = session.end_turn().unwrap();
        let threat = &session.state().threat;
        assert!(
            (threat.min_threat..=threat.max_threat).contains(&report.threat),
            "threat {} escaped its bounds",
            report.threat
        );
        assert!(session.state().tokens.len() <= threat.wandering_monster_threshold);
        assert!(session
            .state()
            .tokens
            .iter()
            .all(|t| t.remaining_movement <= t.movement));
    }
    assert_eq!(session.turn(), 150);
}

#[test]
fn test_harness_turns_keep_threat_bounded() {
    let mut harness = TestHarness::new();
    // Each turn: scenario roll 10 triggers, threat roll 20 sheds five.
    for _ in 0..5 {
        harness.expect_rolls(&[10, 20]);
        harness.end_turn().unwrap();
        assert_threat_in_bounds(&harness);
    }
    assert_threat(&harness, 0);
}

// =============================================================================
// SEARCHING AND LEVERS
// =============================================================================

#[test]
fn test_search_once_per_room() {
    let mut harness = TestHarness::new();
    let hero = harness.first_hero();
    harness.expect_rolls(&[10]);
    let found = harness
        .orchestrator
        .search_room(&mut harness.state, &mut harness.oracle, RoomId(0), hero)
        .unwrap();
    assert!(matches!(found.outcome, dungeon_core::SearchOutcome::Found(_)));

    let again = harness
        .orchestrator
        .search_room(&mut harness.state, &mut harness.oracle, RoomId(0), hero)
        .unwrap();
    assert_eq!(again.outcome, dungeon_core::SearchOutcome::AlreadySearched);
}

#[test]
fn test_lever_is_used_up() {
    let mut harness = TestHarness::new();
    let hero = harness.first_hero();
    let lever = harness.state.add_lever("Rusty Lever");
    harness.expect_rolls(&[5]);
    let pulled = harness
        .orchestrator
        .pull_lever(&mut harness.state, &mut harness.oracle, lever, hero)
        .unwrap();
    assert!(pulled.outcome.success);
    assert!(harness.state.levers.is_empty());

    let gone = harness
        .orchestrator
        .pull_lever(&mut harness.state, &mut harness.oracle, lever, hero);
    assert!(matches!(gone, Err(DungeonError::UnknownLever(_))));
}

#[test]
fn test_lever_ids_stay_unique_after_a_pull() {
    let mut harness = TestHarness::new();
    let hero = harness.first_hero();
    let winch = harness.state.add_lever("Winch");
    let chain = harness.state.add_lever("Chain");
    harness.expect_rolls(&[6]);
    harness
        .orchestrator
        .pull_lever(&mut harness.state, &mut harness.oracle, winch, hero)
        .unwrap();

    let crank = harness.state.add_lever("Crank");
    assert_ne!(crank, chain);
    harness.expect_rolls(&[6]);
    harness
        .orchestrator
        .pull_lever(&mut harness.state, &mut harness.oracle, crank, hero)
        .unwrap();
    let left: Vec<_> = harness.state.levers.iter().map(|l| l.id).collect();
    assert_eq!(left, vec![chain]);
}

// =============================================================================
// DECK
// =============================================================================

#[test]
fn test_objective_always_in_bottom_half() {
    let objective = RoomDescriptor::room("Dragon's Hoard", 6, 6, 0);
    for seed in 0..64 {
        let mut rng = StdRng::seed_from_u64(seed);
        for side_quests in [vec![], vec![SideQuest::HiddenTreasure]] {
            let deck = build_deck(
                &mut rng,
                &DeckRequest {
                    room_count: 8,
                    corridor_count: 6,
                    excluded: &[],
                    side_quests: &side_quests,
                    objective: Some(&objective),
                },
            );
            let top_half = 7 + side_quests.len();
            let at = deck.iter().position(|c| c.name == objective.name).unwrap();
            assert!(at >= top_half, "seed {seed}: objective at {at} of {}", deck.len());
            assert_eq!(deck.len(), 15 + side_quests.len());
        }
    }
}

#[test]
fn test_scripted_oracle_is_exhausted_cleanly() {
    let mut oracle = ScriptedOracle::new(vec![4]);
    assert_eq!(oracle.remaining_rolls(), 1);
    oracle.queue_rolls(&[2, 3]);
    assert_eq!(oracle.remaining_rolls(), 3);
}
