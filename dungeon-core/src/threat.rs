//! The threat clock.
//!
//! Every turn the party rolls a scenario die. High rolls put the threat
//! level to the test: a threat roll at or below the current level fires
//! an entry from one of two event tables and bleeds threat off, anything
//! above it lets threat creep up by one.

use crate::dice::DiceExpression;
use crate::error::Result;
use crate::events::{DungeonEvent, Resolution};
use crate::oracle::{request_choice, request_roll, Oracle};
use crate::room::EncounterType;
use crate::state::{DungeonState, PartyPerk, Quest};
use serde::{Deserialize, Serialize};

/// Scenario rolls at or above this put threat to the test.
pub const THREAT_TRIGGER: i32 = 9;

/// Threat shed by a natural 20 on the threat die.
pub const MOMENT_OF_CALM: i32 = 5;

/// Exploration cards added by the out-of-battle table.
pub const EXTRA_EXPLORATION_CARDS: usize = 2;

/// Game actions that move the threat level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatAction {
    OpenDoor,
    WanderingMonsterSpawned,
}

impl ThreatAction {
    pub fn delta(&self) -> i32 {
        match self {
            ThreatAction::OpenDoor => 1,
            ThreatAction::WanderingMonsterSpawned => -5,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            ThreatAction::OpenDoor => "a door was opened",
            ThreatAction::WanderingMonsterSpawned => "a wandering monster appeared",
        }
    }
}

/// Apply a threat action, clamped to the configured range.
pub fn apply_action(state: &mut DungeonState, action: ThreatAction, res: &mut Resolution) {
    shift(state, action.delta(), action.reason(), res);
}

fn shift(state: &mut DungeonState, delta: i32, reason: &str, res: &mut Resolution) {
    let from = state.threat.current_threat;
    if delta >= 0 {
        state.threat.increase(delta);
    } else {
        state.threat.decrease(-delta);
    }
    let to = state.threat.current_threat;
    if from != to {
        tracing::debug!(from, to, reason, "threat changed");
        res.push(DungeonEvent::ThreatChanged {
            from,
            to,
            reason: reason.to_string(),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatEventKind {
    // Out of battle
    WanderingMonster,
    ExplorationCards,
    EncounterChance,
    Trap,
    NamedEncounter,
    ScenarioModifier,
    // In battle
    SpellLock,
    PoisonedWeapons,
    CombatSkillBuff,
    EnemyHeal,
    Frenzy,
    Disarm,
    Fear,
    Reinforcements,
    Ward,
    FinalBuff,
}

/// What a threat table entry asks the dungeon to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatEventResult {
    pub kind: ThreatEventKind,
    pub description: String,
    pub threat_decrease: i32,
    pub spawn_wandering_monster: bool,
    pub spawn_trap: bool,
    pub add_exploration_cards: Option<usize>,
    pub spawn_encounter: Option<EncounterType>,
}

impl ThreatEventResult {
    fn new(kind: ThreatEventKind, description: &str, threat_decrease: i32) -> Self {
        Self {
            kind,
            description: description.to_string(),
            threat_decrease,
            spawn_wandering_monster: false,
            spawn_trap: false,
            add_exploration_cards: None,
            spawn_encounter: None,
        }
    }
}

/// Out-of-battle table, read with 1d20.
pub fn out_of_battle_event(roll: i32, quest: &Quest) -> ThreatEventResult {
    use ThreatEventKind::*;
    match roll {
        i32::MIN..=5 => ThreatEventResult {
            spawn_wandering_monster: true,
            ..ThreatEventResult::new(
                WanderingMonster,
                "Footsteps echo somewhere in the dark. Something is on the move.",
                5,
            )
        },
        6..=9 => ThreatEventResult {
            add_exploration_cards: Some(EXTRA_EXPLORATION_CARDS),
            ..ThreatEventResult::new(
                ExplorationCards,
                "The dungeon shifts. Passages that were not there before open up.",
                6,
            )
        },
        10..=12 => ThreatEventResult::new(
            EncounterChance,
            "The air grows thick. The denizens of the dungeon are stirring.",
            7,
        ),
        13..=15 => ThreatEventResult {
            spawn_trap: true,
            ..ThreatEventResult::new(Trap, "A hidden mechanism clicks underfoot.", 8)
        },
        16..=18 => ThreatEventResult {
            spawn_encounter: Some(quest.default_encounter.clone()),
            ..ThreatEventResult::new(NamedEncounter, "An ambush! Enemies pour in.", 9)
        },
        _ => ThreatEventResult::new(
            ScenarioModifier,
            "A sense of dread settles over the party. The dungeon is waking up.",
            10,
        ),
    }
}

/// In-battle table, read with 1d10.
pub fn in_battle_event(roll: i32, quest: &Quest) -> ThreatEventResult {
    use ThreatEventKind::*;
    match roll {
        i32::MIN..=1 => ThreatEventResult::new(
            SpellLock,
            "A dampening aura falls over the battle. Spells falter.",
            2,
        ),
        2 => ThreatEventResult::new(PoisonedWeapons, "The enemies' blades glisten with poison.", 3),
        3 => ThreatEventResult::new(CombatSkillBuff, "The enemies fight with renewed skill.", 3),
        4 => ThreatEventResult::new(EnemyHeal, "Dark energy knits the enemies' wounds.", 4),
        5 => ThreatEventResult::new(Frenzy, "The enemies fly into a frenzy.", 4),
        6 => ThreatEventResult::new(Disarm, "An enemy strike sends a weapon flying.", 4),
        7 => ThreatEventResult::new(Fear, "An unnatural terror grips the party.", 5),
        8 => ThreatEventResult {
            spawn_encounter: Some(quest.default_encounter.clone()),
            ..ThreatEventResult::new(Reinforcements, "Reinforcements arrive!", 5)
        },
        9 => ThreatEventResult::new(Ward, "A shimmering ward surrounds the enemies.", 5),
        _ => ThreatEventResult::new(
            FinalBuff,
            "The enemies draw on the dungeon's malice for a final push.",
            6,
        ),
    }
}

/// How a turn's threat check turned out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatOutcome {
    /// The scenario roll stayed under the trigger.
    Quiet,
    /// Natural 20 on the threat die.
    Calm,
    /// Threat roll at or under the current threat.
    Event(ThreatEventResult),
    /// Threat roll above the current threat.
    Rising,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatTick {
    pub scenario_roll: i32,
    pub threat_roll: Option<i32>,
    pub outcome: ThreatOutcome,
}

/// Run one turn of the threat clock: [`roll`] then [`apply`].
pub fn tick(state: &mut DungeonState, oracle: &mut dyn Oracle, res: &mut Resolution) -> Result<ThreatTick> {
    let tick = roll(state, oracle)?;
    apply(state, &tick, res);
    Ok(tick)
}

/// Roll this turn's threat dice and decide the outcome without touching
/// the state.
pub fn roll(state: &DungeonState, oracle: &mut dyn Oracle) -> Result<ThreatTick> {
    let scenario_die = DiceExpression::d10().plus(state.threat.scenario_roll_modifier);
    let mut scenario_roll = request_roll(oracle, "Scenario roll", scenario_die.clone())?;

    if scenario_roll >= THREAT_TRIGGER
        && state.party.has_perk(PartyPerk::Foresight)
        && request_choice(oracle, "The scenario roll will test the threat level. Reroll it?")?
    {
        scenario_roll = request_roll(oracle, "Scenario reroll", scenario_die)?;
    }

    if scenario_roll < THREAT_TRIGGER {
        return Ok(ThreatTick {
            scenario_roll,
            threat_roll: None,
            outcome: ThreatOutcome::Quiet,
        });
    }

    let threat_roll = request_roll(oracle, "Threat roll", DiceExpression::d20())?;
    let outcome = if threat_roll == 20 {
        ThreatOutcome::Calm
    } else if threat_roll <= state.threat.current_threat {
        let event = if state.in_battle() {
            in_battle_event(request_roll(oracle, "Threat event", DiceExpression::d10())?, &state.quest)
        } else {
            out_of_battle_event(request_roll(oracle, "Threat event", DiceExpression::d20())?, &state.quest)
        };
        ThreatOutcome::Event(event)
    } else {
        ThreatOutcome::Rising
    };

    Ok(ThreatTick {
        scenario_roll,
        threat_roll: Some(threat_roll),
        outcome,
    })
}

/// Move the threat counters for a rolled tick.
///
/// Side effects of a fired event (spawns, traps, extra cards) are left to
/// the caller.
pub fn apply(state: &mut DungeonState, tick: &ThreatTick, res: &mut Resolution) {
    match &tick.outcome {
        ThreatOutcome::Quiet => {}
        ThreatOutcome::Calm => {
            shift(state, -MOMENT_OF_CALM, "a moment of calm", res);
            res.narrate("A moment of calm settles over the dungeon.");
        }
        ThreatOutcome::Event(event) => {
            tracing::info!(kind = ?event.kind, threat = state.threat.current_threat, "threat event fired");
            res.push(DungeonEvent::ThreatEventFired {
                description: event.description.clone(),
            });
            res.narrate(&event.description);
            shift(state, -event.threat_decrease, "threat event", res);
            apply_counters(state, event, res);
        }
        ThreatOutcome::Rising => shift(state, 1, "threat is rising", res),
    }
}

/// Events that only touch counters are settled here.
fn apply_counters(state: &mut DungeonState, event: &ThreatEventResult, res: &mut Resolution) {
    match event.kind {
        ThreatEventKind::EncounterChance => {
            state.threat.encounter_chance_modifier += 10;
            res.push(DungeonEvent::EncounterChanceChanged {
                modifier: state.threat.encounter_chance_modifier,
            });
        }
        ThreatEventKind::ScenarioModifier => {
            state.threat.scenario_roll_modifier += 1;
            res.push(DungeonEvent::ScenarioModifierChanged {
                modifier: state.threat.scenario_roll_modifier,
            });
        }
        _ => {}
    }
}
