#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs headless capture-the-flag matches.

mod session;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ctf_core::TICKS_PER_SECOND;
use ctf_world::{load_config, ArenaMap, Difficulty, GameConfig};
use tracing_subscriber::EnvFilter;

use crate::session::{MatchLimits, MatchSummary, Session};

const TIME_LIMIT_SECONDS: u64 = 5 * 60;
const ROUND_LIMIT: u32 = 10;
const DEFAULT_TICKS: u64 = TIME_LIMIT_SECONDS * TICKS_PER_SECOND as u64;

/// Runs autonomous tanks against each other until the time or round limit.
#[derive(Debug, Parser)]
#[command(name = "ctf-arena")]
#[command(about = "Headless capture-the-flag match between autonomous tanks")]
struct CliArgs {
    /// JSON map file; the built-in arena is used when omitted.
    #[arg(long, value_name = "PATH")]
    map: Option<PathBuf>,

    /// TOML file with `[controller]` and `[world]` tables.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Handicap for every tank except the first (easy, normal, hard).
    #[arg(long)]
    difficulty: Option<Difficulty>,

    /// Maximum number of ticks to simulate.
    #[arg(long, default_value_t = DEFAULT_TICKS)]
    ticks: u64,

    /// Print the final standings as JSON.
    #[arg(long)]
    json: bool,
}

/// Entry point for the capture-the-flag command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ctf=info")),
        )
        .init();

    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => GameConfig::default(),
    };
    if let Some(difficulty) = args.difficulty {
        config.world.difficulty = difficulty;
    }

    let map = match &args.map {
        Some(path) => ArenaMap::load(path)
            .with_context(|| format!("failed to load map from {}", path.display()))?,
        None => ArenaMap::builtin(),
    };

    tracing::info!(
        width = map.width(),
        height = map.height(),
        difficulty = %config.world.difficulty,
        "arena loaded"
    );

    let mut session = Session::new(map, &config);
    let summary = session.run(&MatchLimits {
        max_ticks: args.ticks,
        max_rounds: ROUND_LIMIT,
    });

    if args.json {
        let json =
            serde_json::to_string_pretty(&summary).context("failed to serialize match summary")?;
        println!("{json}");
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn print_summary(summary: &MatchSummary) {
    let seconds = summary.ticks / u64::from(TICKS_PER_SECOND);
    println!(
        "match over after {} ticks ({}m{:02}s), {} round(s) played",
        summary.ticks,
        seconds / 60,
        seconds % 60,
        summary.rounds
    );
    for score in &summary.scores {
        println!("  tank {}: {} capture(s)", score.tank, score.captures);
    }
    match summary.leader {
        Some(tank) => println!("winner: tank {tank}"),
        None => println!("no winner"),
    }
}
