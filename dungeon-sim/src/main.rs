//! Dungeon simulator.
//!
//! Plays a dungeon run with real dice, either automatically or from a
//! line-oriented command stream on stdin.
//!
//! ```bash
//! cargo run -p dungeon-sim -- --turns 30 --seed 7
//! cargo run -p dungeon-sim -- --interactive
//! ```
//!
//! Settings are read from `DUNGEON_*` environment variables (a `.env`
//! file is honoured) and logging is controlled with `RUST_LOG`.

mod headless;

use anyhow::Context;
use dungeon_core::{DiceOracle, DungeonConfig, DungeonSession, Hero, Party, PartyPerk, Quest};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

/// Command line options.
#[derive(Debug)]
struct Args {
    turns: u32,
    seed: Option<u64>,
    interactive: bool,
    json: bool,
}

impl Args {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut parsed = Args {
            turns: 40,
            seed: None,
            interactive: false,
            json: false,
        };
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--turns" => {
                    let value = iter.next().context("--turns needs a value")?;
                    parsed.turns = value.parse().context("--turns must be a number")?;
                }
                "--seed" => {
                    let value = iter.next().context("--seed needs a value")?;
                    parsed.seed = Some(value.parse().context("--seed must be a number")?);
                }
                "--interactive" | "-i" => parsed.interactive = true,
                "--json" => parsed.json = true,
                other => anyhow::bail!("unknown argument: {other}"),
            }
        }
        Ok(parsed)
    }
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dungeon_core=info,dungeon_sim=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }
    let args = Args::parse(&args)?;

    let mut config = DungeonConfig::from_env().context("invalid DUNGEON_* settings")?;
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    let dice_seed = config.seed.map(|s| s.wrapping_add(1));

    let quest = Quest::new("The Sunken Vault", &config);
    let party = Party::new(vec![
        Hero::new("Thorin", 14),
        Hero::new("Ilsa", 10),
        Hero::new("Brother Aldous", 12),
    ])
    .with_perk(PartyPerk::Foresight);

    let rng = match dice_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    // Foresight rerolls are declined; a rerun only ever delays the event.
    let oracle = DiceOracle::new(rng).with_default_answer(false);
    let session = DungeonSession::new(party, quest, config, oracle)?;

    if args.interactive {
        headless::run_interactive(session, args.json)
    } else {
        headless::run_auto(session, args.turns, args.json)
    }
}

fn print_help() {
    println!("dungeon-sim - play a procedural dungeon with real dice");
    println!();
    println!("USAGE:");
    println!("    dungeon-sim [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --turns <N>        Turns to play automatically (default 40)");
    println!("    --seed <N>         Seed for layout and dice");
    println!("    --interactive, -i  Read commands from stdin");
    println!("    --json             Print events as JSON lines");
    println!("    -h, --help         Print help");
    println!();
    println!("ENVIRONMENT:");
    println!("    DUNGEON_ROOM_COUNT, DUNGEON_CORRIDOR_COUNT, DUNGEON_MAX_THREAT,");
    println!("    DUNGEON_SEED and friends override the defaults.");
}
