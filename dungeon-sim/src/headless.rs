//! Headless runners for the dungeon simulator.
//!
//! `run_auto` plays a fixed number of turns on its own. `run_interactive`
//! reads one command per line:
//! - `open <door>`, `unlock <door> [pick|bash|spell]`, `disarm <door>`, `seal <door>`
//! - `search`, `lever <id>`, `win`, `end`
//! - `#status`, `#help`, `#quit`

use anyhow::Context;
use dungeon_core::{
    DiceOracle, DoorId, DoorInteraction, DoorState, DungeonSession, HeroId, Resolution, RoomId,
    UnlockMethod,
};
use rand::rngs::StdRng;
use std::io::{self, BufRead, Write};

type Session = DungeonSession<DiceOracle<StdRng>>;

/// Play up to `turns` turns, opening the first door that is still shut.
pub fn run_auto(mut session: Session, turns: u32, json: bool) -> anyhow::Result<()> {
    println!("=== {} ===", session.state().quest.name);
    print_status(&session);

    for _ in 0..turns {
        if let Some(room) = session.state().battle_room() {
            // The fight itself is out of scope; the party always wins.
            let res = session.end_encounter(room)?;
            println!("[BATTLE] The party clears {room}.");
            report(&res, json)?;
        } else if let Some(door) = next_door(&session) {
            act_on_door(&mut session, door, json)?;
        } else {
            println!("[DONE] No doors left to open.");
            break;
        }

        let turn = session.end_turn()?;
        println!("[TURN {}] threat {}", turn.turn, turn.threat);
        report(&turn.resolution, json)?;
    }

    print_status(&session);
    Ok(())
}

/// Read commands from stdin until `#quit` or end of input.
pub fn run_interactive(mut session: Session, json: bool) -> anyhow::Result<()> {
    println!("=== {} ===", session.state().quest.name);
    print_help();
    print_status(&session);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read input")?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = parts.first() else {
            continue;
        };

        let result = match command {
            "#quit" | "#exit" => break,
            "#status" => {
                print_status(&session);
                Ok(())
            }
            "#help" => {
                print_help();
                Ok(())
            }
            _ => run_command(&mut session, &parts, json),
        };
        if let Err(e) = result {
            println!("[ERROR] {e}");
        }
        print!("> ");
        stdout.flush()?;
    }
    Ok(())
}

fn run_command(session: &mut Session, parts: &[&str], json: bool) -> anyhow::Result<()> {
    let hero = lead_hero(session).context("the whole party has fallen")?;
    let door_arg = || -> anyhow::Result<DoorId> {
        let raw = parts.get(1).context("which door?")?;
        Ok(DoorId(raw.parse().context("door must be a number")?))
    };

    match parts[0] {
        "open" => {
            let result = session.open_door(door_arg()?, hero)?;
            println!("[DOOR] {:?}", result.outcome);
            report(&result.resolution, json)?;
        }
        "unlock" => {
            let method = match parts.get(2).copied() {
                Some("bash") => UnlockMethod::Bash,
                Some("spell") => UnlockMethod::Spell,
                _ => UnlockMethod::Pick,
            };
            let result = session.attempt_unlock(door_arg()?, hero, method)?;
            report(&result.resolution, json)?;
        }
        "disarm" => {
            let result = session.disarm_trap(door_arg()?, hero)?;
            report(&result.resolution, json)?;
        }
        "seal" => {
            let result = session.seal_door(door_arg()?)?;
            println!("[SEAL] {}", if result.outcome { "sealed" } else { "the door is open" });
        }
        "search" => {
            let room = hero_room(session, hero).context("the hero is not in a room")?;
            let result = session.search_room(room, hero)?;
            println!("[SEARCH] {:?}", result.outcome);
        }
        "lever" => {
            let raw = parts.get(1).context("which lever?")?;
            let lever = dungeon_core::state::LeverId(raw.parse().context("lever must be a number")?);
            let result = session.pull_lever(lever, hero)?;
            report(&result.resolution, json)?;
        }
        "win" => {
            let room = session.state().battle_room().context("nobody is fighting")?;
            report(&session.end_encounter(room)?, json)?;
        }
        "end" => {
            let turn = session.end_turn()?;
            println!("[TURN {}] threat {}", turn.turn, turn.threat);
            report(&turn.resolution, json)?;
        }
        other => anyhow::bail!("unknown command: {other} (try #help)"),
    }
    Ok(())
}

/// Work a door one step: open it, or deal with what bars it.
fn act_on_door(session: &mut Session, door: DoorId, json: bool) -> anyhow::Result<()> {
    let hero = lead_hero(session).context("the whole party has fallen")?;
    let state = session.state().door(door)?.state;

    if state == DoorState::Locked {
        let result = session.attempt_unlock(door, hero, UnlockMethod::Bash)?;
        report(&result.resolution, json)?;
        return Ok(());
    }

    let result = session.open_door(door, hero)?;
    report(&result.resolution, json)?;
    if let DoorInteraction::Opened { room: Some(room) } = result.outcome {
        let moved = advance_party(session, room)?;
        tracing::debug!(%room, moved, "party advanced");
        if !session.in_battle() {
            let search = session.search_room(room, hero)?;
            report(&search.resolution, json)?;
        }
    }
    Ok(())
}

/// Shut doors the party can still do something about.
fn next_door(session: &Session) -> Option<DoorId> {
    session.closed_doors().into_iter().find(|id| {
        session
            .state()
            .door(*id)
            .is_ok_and(|d| d.state != DoorState::MagicallySealed)
    })
}

fn lead_hero(session: &Session) -> Option<HeroId> {
    session.state().living_heroes().next().map(|h| h.id)
}

fn hero_room(session: &Session, hero: HeroId) -> Option<RoomId> {
    let pos = session.state().hero(hero).ok()?.position?;
    session.state().grid.room_at(pos)
}

/// Walk the living heroes into the free squares of a newly revealed room.
fn advance_party(session: &mut Session, room: RoomId) -> anyhow::Result<usize> {
    let state = session.state_mut();
    let free: Vec<_> = state
        .grid
        .cells_of(room)
        .into_iter()
        .filter(|p| state.grid.square_at(*p).is_some_and(|s| s.is_free()))
        .collect();
    let heroes: Vec<HeroId> = state.living_heroes().map(|h| h.id).collect();

    let mut moved = 0;
    for (hero, pos) in heroes.into_iter().zip(free) {
        state.move_hero(hero, pos)?;
        moved += 1;
    }
    Ok(moved)
}

fn report(res: &Resolution, json: bool) -> anyhow::Result<()> {
    if json {
        for event in &res.events {
            println!("{}", serde_json::to_string(event)?);
        }
    } else if !res.narrative.is_empty() {
        println!("{}", res.narrative);
    }
    Ok(())
}

fn print_status(session: &Session) {
    let state = session.state();
    println!("[STATUS]");
    println!("  Turn: {}", session.turn());
    println!(
        "  Threat: {}/{}",
        state.threat.current_threat, state.threat.max_threat
    );
    println!("  Rooms revealed: {}", state.rooms.len());
    println!("  Cards left: {}", session.cards_remaining());
    println!("  Wandering tokens: {}", state.tokens.len());
    println!("  In battle: {}", session.in_battle());
    for hero in &state.party.heroes {
        println!("  {}: {}/{} HP", hero.name, hero.current_hp.max(0), hero.max_hp);
    }
}

fn print_help() {
    println!("Commands:");
    println!("  open <door>                    - Work a door");
    println!("  unlock <door> [pick|bash|spell] - Attack a lock");
    println!("  disarm <door>                  - Disarm a door trap");
    println!("  seal <door>                    - Magically seal a door");
    println!("  search                         - Search the lead hero's room");
    println!("  lever <id>                     - Pull a lever");
    println!("  win                            - End the current fight");
    println!("  end                            - End the turn");
    println!("  #status, #help, #quit");
}
