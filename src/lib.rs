pub mod commands;
pub mod db;
pub mod models;
pub mod planner;
pub mod settings;
pub mod stats;
pub mod timer;
mod utils;
pub mod workout;

use std::{env, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use commands::{Console, ConsoleCommand, Flow, HELP};
use db::Database;
use planner::{activate, MockPlanGenerator};
use settings::SettingsStore;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use workout::{WorkoutEvent, WorkoutHandle, WorkoutRuntime};

const DATA_DIR_ENV: &str = "FORGEFIT_DATA_DIR";
const DEBUG_ENV: &str = "FORGEFIT_DEBUG";
const DEFAULT_DATA_DIR: &str = ".forgefit";

fn init_logging() {
    let level = if env::var(DEBUG_ENV).is_ok_and(|value| value == "1") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    // RUST_LOG still wins for anything it names.
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn data_dir() -> PathBuf {
    env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Stores the sample plan as the active plan when nothing has been stored yet.
pub async fn seed_sample_plan(db: &Database) -> Result<bool> {
    if !db.list_plans().await?.is_empty() {
        return Ok(false);
    }
    let id = db
        .insert_plan(&activate(MockPlanGenerator::sample_plan()))
        .await?;
    log::info!("Seeded sample plan {id}");
    Ok(true)
}

pub fn run() -> Result<()> {
    init_logging();
    log::info!("ForgeFit starting up...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(serve())
}

async fn serve() -> Result<()> {
    let data_dir = data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let settings = SettingsStore::new(data_dir.join("settings.json"))?.session();
    let database = Database::new(data_dir.join("forgefit.sqlite3"))?;
    if settings.seed_sample_plan {
        seed_sample_plan(&database).await?;
    }

    let handle = WorkoutRuntime::spawn(Arc::new(database.clone()), settings.tick_interval());
    let notifier = tokio::spawn(announce_rest_expiry(handle.clone()));
    let mut console = Console::new(handle.clone(), database);

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match line.parse::<ConsoleCommand>() {
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match console.execute(command).await {
            Ok(Flow::Continue(output)) => println!("{output}"),
            Ok(Flow::Quit) => break,
            Err(err) => {
                log::error!("Command failed: {err:#}");
                println!("error: {err:#}");
            }
        }
    }

    handle.shutdown().await;
    notifier.abort();
    log::info!("ForgeFit shut down");
    Ok(())
}

/// Prints a line whenever a rest countdown runs out on its own.
async fn announce_rest_expiry(handle: WorkoutHandle) {
    let mut events = handle.events();
    loop {
        match events.recv().await {
            Ok(WorkoutEvent::RestExpired { set_number, .. }) => {
                println!("rest over, set {set_number} next");
            }
            Err(RecvError::Lagged(missed)) => log::debug!("Missed {missed} workout events"),
            Err(RecvError::Closed) => break,
        }
    }
}
