//! KrishiMitra sync service - keeps the offline store in step with the backend.
//!
//! Run with: `cargo run -p krishimitra-service`

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use krishimitra_service::status::{render_advisories, render_summary};
use krishimitra_service::{App, Config};
use krishimitra_store::Store;
use krishimitra_types::{ActionKind, PendingAction, now_millis};

/// KrishiMitra sync service - offline store and background sync.
#[derive(Parser, Debug)]
#[command(name = "krishimitra-service")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database path (overrides config).
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Remote base URL (overrides config).
    #[arg(short, long, global = true)]
    remote: Option<String>,

    /// Generate remote data locally instead of calling the backend.
    #[arg(long, global = true)]
    simulate: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the sync loop in the foreground (default behavior).
    Run,

    /// Run a single sync cycle and exit.
    Sync,

    /// Show what the local store holds.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Inspect or update stored advisories.
    Advisories {
        #[command(subcommand)]
        action: AdvisoryAction,
    },

    /// Queue an action for replay on the next sync.
    Enqueue {
        /// Action kind: WEATHER_UPDATE, SOIL_UPDATE or ADVISORY_READ.
        kind: String,
        /// Action payload as JSON.
        #[arg(default_value = "{}")]
        payload: String,
    },
}

#[derive(Subcommand, Debug)]
enum AdvisoryAction {
    /// List advisories, newest first.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Mark an advisory as read.
    Read {
        /// Advisory id.
        id: String,
    },

    /// Delete every stored advisory.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("krishimitra_service=info".parse()?)
                .add_directive("krishimitra_sync=info".parse()?),
        )
        .init();

    let config = load_config(&args)?;

    match args.command {
        Some(Command::Run) | None => run_service(config).await,
        Some(Command::Sync) => sync_once(config).await,
        Some(Command::Status { json }) => show_status(&config, json),
        Some(Command::Advisories { action }) => handle_advisories(&config, action),
        Some(Command::Enqueue { kind, payload }) => enqueue(&config, &kind, &payload),
    }
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_default(),
    };

    if let Some(db_path) = &args.database {
        config.storage.path = db_path.clone();
    }
    if let Some(remote) = &args.remote {
        config.remote.base_url = remote.clone();
    }
    if args.simulate {
        config.remote.simulate = true;
    }

    config.validate()?;
    Ok(config)
}

fn open_store(config: &Config) -> anyhow::Result<Store> {
    Store::open(&config.storage.path)
        .with_context(|| format!("Failed to open store at {:?}", config.storage.path))
}

async fn run_service(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let running = app.start(CancellationToken::new());

    info!("Sync service running; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down");
    running.shutdown().await;
    Ok(())
}

async fn sync_once(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;
    app.connectivity.set_online(true);

    let report = app.manager.run_cycle().await;
    match &report.drain {
        Ok(replayed) => println!("Replayed {} pending action(s)", replayed),
        Err(e) => println!("Sync failed, changes kept for retry: {}", e),
    }
    match &report.fetch {
        Ok(fetch) => println!(
            "Fetched weather; {} new advisory(ies), {} held back",
            fetch.added.len(),
            fetch.suppressed.len()
        ),
        Err(e) => println!("Failed to fetch latest data: {}", e),
    }

    if !report.is_success() {
        bail!("sync cycle did not complete");
    }
    Ok(())
}

fn show_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let summary = store.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render_summary(&summary, now_millis()));
        if let Some(weather) = store.latest_weather() {
            println!(
                "Latest weather:   {} {}, humidity {} ({})",
                weather.temperature, weather.condition, weather.humidity, weather.location
            );
        }
    }
    Ok(())
}

fn handle_advisories(config: &Config, action: AdvisoryAction) -> anyhow::Result<()> {
    let store = open_store(config)?;

    match action {
        AdvisoryAction::List { json } => {
            let advisories = store.advisories();
            if json {
                println!("{}", serde_json::to_string_pretty(&advisories)?);
            } else {
                print!("{}", render_advisories(&advisories, now_millis()));
            }
        }
        AdvisoryAction::Read { id } => {
            if store.mark_advisory_read(&id)? {
                store.enqueue_pending_action(PendingAction::new(
                    ActionKind::AdvisoryRead,
                    serde_json::json!({ "id": id }),
                ))?;
                println!("Marked {} as read", id);
            } else {
                println!("No unread advisory with id {}", id);
            }
        }
        AdvisoryAction::Clear => {
            store.clear_advisories()?;
            println!("Cleared all advisories");
        }
    }
    Ok(())
}

fn enqueue(config: &Config, kind: &str, payload: &str) -> anyhow::Result<()> {
    let kind: ActionKind = kind.parse()?;
    let payload: serde_json::Value =
        serde_json::from_str(payload).context("Payload must be valid JSON")?;

    let store = open_store(config)?;
    let action = PendingAction::new(kind, payload);
    let key = action.idempotency_key();
    store.enqueue_pending_action(action)?;

    println!(
        "Queued {} ({}); {} action(s) pending",
        kind,
        key,
        store.pending_queue().len()
    );
    Ok(())
}
