//! repcache - a command-line front end for the fitness tracking API.
//!
//! Each command drives the same `SyncSession` the mobile screens use, so
//! repeated reads within one invocation are served from cache and writes
//! invalidate exactly the entities they affect.

use std::io;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repcache_core::api::ApiClient;
use repcache_core::config::Config;
use repcache_core::models::{Routine, StatisticsBundle, StatsRange, WorkoutLog};
use repcache_core::{ResolveOptions, SyncSession};

/// Environment variable holding the API bearer token
const TOKEN_ENV: &str = "REPCACHE_TOKEN";

/// Environment variable overriding the configured API endpoint
const API_URL_ENV: &str = "REPCACHE_API_URL";

const USAGE: &str = "\
Usage: repcache [--refresh] <command>

Commands:
  home                                  Active routine and statistics
  stats [week|month|year|all]           Statistics for a range
  routine <id>                          One routine with its days
  complete <routine> <day> <minutes> [notes]
                                        Mark a workout day complete
  activate <routine>                    Make a routine the active one";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=repcache_core=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let force = match args.iter().position(|a| a == "--refresh") {
        Some(index) => {
            args.remove(index);
            true
        }
        None => false,
    };
    let options = if force {
        ResolveOptions::forced()
    } else {
        ResolveOptions::cache_first()
    };

    let Some(command) = args.first().cloned() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };

    let session = connect(&config)?;
    info!(command = %command, base_url = session.api().base_url(), "repcache starting");

    match command.as_str() {
        "home" => show_home(&session, config.stats_range(), options).await,
        "stats" => {
            let range = match args.get(1) {
                Some(raw) => {
                    let range: StatsRange = raw.parse().map_err(anyhow::Error::msg)?;
                    config.default_stats_range = Some(range);
                    if let Err(e) = config.save() {
                        warn!(error = %e, "Failed to save config");
                    }
                    range
                }
                None => config.stats_range(),
            };
            let stats = session.statistics(range, options).await?;
            print_statistics(&stats, session.statistics_age(range));
            Ok(())
        }
        "routine" => {
            let routine_id = parse_id(args.get(1), "routine")?;
            let routine = session.routine(routine_id, options).await?;
            print_routine(&routine);
            Ok(())
        }
        "complete" => {
            let routine_id = parse_id(args.get(1), "routine")?;
            let day_id = parse_id(args.get(2), "day")?;
            let duration_minutes = args
                .get(3)
                .context("missing <minutes>")?
                .parse()
                .context("<minutes> must be a whole number")?;
            let log = WorkoutLog {
                duration_minutes,
                notes: args.get(4).cloned(),
            };

            // Warm the caches so the refresh below shows the invalidation at work
            show_home(&session, config.stats_range(), options).await?;
            session.complete_workout_day(routine_id, day_id, &log).await?;
            println!("\nDay {} complete.\n", day_id);
            show_home(&session, config.stats_range(), ResolveOptions::cache_first()).await
        }
        "activate" => {
            let routine_id = parse_id(args.get(1), "routine")?;
            session.activate_routine(routine_id).await?;
            println!("Routine {} is now active.\n", routine_id);
            show_home(&session, config.stats_range(), ResolveOptions::cache_first()).await
        }
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            bail!("unknown command")
        }
    }
}

fn connect(config: &Config) -> Result<SyncSession> {
    let base_url = std::env::var(API_URL_ENV)
        .ok()
        .unwrap_or_else(|| config.api_base_url().to_string());
    let token = std::env::var(TOKEN_ENV)
        .with_context(|| format!("{} is not set; add it to your environment or .env", TOKEN_ENV))?;

    let api = ApiClient::new(base_url)?.with_token(token);
    Ok(SyncSession::new(api))
}

fn parse_id(raw: Option<&String>, what: &str) -> Result<i64> {
    let raw = raw.with_context(|| format!("missing <{}>", what))?;
    raw.parse()
        .with_context(|| format!("<{}> must be a numeric id, got {:?}", what, raw))
}

/// Home screen: active routine and statistics, fetched concurrently.
async fn show_home(session: &SyncSession, range: StatsRange, options: ResolveOptions) -> Result<()> {
    let (routine, stats) = tokio::join!(
        session.active_routine(options),
        session.statistics(range, options),
    );

    match routine? {
        Some(routine) => print_routine(&routine),
        None => println!("No active routine."),
    }
    println!();
    print_statistics(&stats?, session.statistics_age(range));
    Ok(())
}

fn print_routine(routine: &Routine) {
    let marker = if routine.is_active { " (active)" } else { "" };
    println!("{}{} - {}", routine.name, marker, routine.progress_display());
    for day in &routine.days {
        let check = if day.completed { "x" } else { " " };
        println!("  [{}] {}", check, day.name);
        for exercise in &day.exercises {
            println!("        {} {}", exercise.name, exercise.prescription());
        }
    }
    if let Some(next) = routine.next_day() {
        println!("Next up: {}", next.name);
    }
}

fn print_statistics(stats: &StatisticsBundle, age: Option<String>) {
    println!(
        "{} (updated {})",
        stats.range.title(),
        age.unwrap_or_else(|| "never".to_string())
    );
    println!("  Workouts: {}", stats.total_workouts);
    println!("  Volume:   {}", stats.volume_display());
    println!("  Time:     {}", stats.duration_display());
    println!("  Streak:   {} days", stats.current_streak_days);
    for record in &stats.personal_records {
        println!(
            "  PR: {} {}kg x{} ({})",
            record.exercise_name, record.weight_kg, record.reps, record.achieved_on
        );
    }
}
