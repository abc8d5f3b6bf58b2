//! Mirror Router (wkmp-mr) - command-line entry point
//!
//! Resolves searches, stream URLs and cover art against the configured mirror
//! pool, recording reliability in the shared WKMP database.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wkmp_common::config::{database_path, LoggingConfig, RootFolderResolver};
use wkmp_common::settings::{init_database_pool, SqliteSettingsStore};
use wkmp_mr::config::{RouterConfig, MODULE_NAME};
use wkmp_mr::search::{SearchOutcome, SearchStatus};
use wkmp_mr::{MirrorRouter, ResolvedResource};

/// Command-line arguments for wkmp-mr
#[derive(Parser, Debug)]
#[command(name = "wkmp-mr")]
#[command(about = "Mirror reliability router for WKMP")]
#[command(version)]
struct Args {
    /// TOML config file (default: ~/.config/wkmp/wkmp-mr.toml)
    #[arg(short, long, env = "WKMP_MR_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the shared database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Mirror base URL; repeat to replace the configured list
    #[arg(short, long = "mirror")]
    mirrors: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search tracks, albums and artists
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Resolve a playable stream URL for a track
    Stream { track_id: String },
    /// Resolve a cover-art URL
    Art {
        id: String,
        /// Probe mirrors before answering
        #[arg(long)]
        verify: bool,
    },
    /// Show mirror ranking and counters
    Status,
    /// Forget all mirror reliability history
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) =
        RouterConfig::load_with_source(args.config.as_deref()).context("Failed to load configuration")?;
    let config = config
        .override_mirrors(args.mirrors.clone())
        .context("Invalid mirror configuration")?;

    // Log level comes from the config, so loading itself stays silent
    init_tracing(&config.logging)?;
    source.log();

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml_root(config.root_folder.clone())
        .resolve();
    let db_path = database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let pool = init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;
    let settings = Arc::new(SqliteSettingsStore::new(pool));

    let router = MirrorRouter::open(&config, settings)
        .await
        .context("Failed to initialize mirror router")?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    match args.command {
        Command::Search { query } => {
            let outcome = router.search().search(&query.join(" "), &cancel).await;
            print_search(&outcome);
        }
        Command::Stream { track_id } => {
            let resolved = router.streams().resolve(&track_id, &cancel).await;
            print_resource("stream", &resolved);
        }
        Command::Art { id, verify } => {
            let resolved = if verify {
                router.art().resolve_verified(&id, &cancel).await
            } else {
                router.art().resolve(&id).await
            };
            print_resource("art", &resolved);
        }
        Command::Status => {
            for status in router.store().snapshot().await {
                let last = status
                    .record
                    .last_success_at
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{:>6}  {}  ok={} fail={} last={}",
                    status.score,
                    status.mirror,
                    status.record.success_count,
                    status.record.failure_count,
                    last
                );
            }
        }
        Command::Reset => {
            router
                .store()
                .reset()
                .await
                .context("Failed to reset mirror reliability")?;
            println!("Mirror reliability history cleared");
        }
    }

    Ok(())
}

/// RUST_LOG wins; otherwise the configured level applies to this crate
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("wkmp_mr={0},wkmp_common={0}", logging.level).into());

    let file_layer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, cancelling");
            cancel.cancel();
        }
        Err(e) => warn!("Failed to install Ctrl+C handler: {}", e),
    }
}

fn print_search(outcome: &SearchOutcome) {
    match outcome.status {
        SearchStatus::OkWithResults => {}
        SearchStatus::OkEmpty => {
            println!("No results");
            return;
        }
        SearchStatus::AllMirrorsFailed => {
            println!("Search failed: no mirror could be reached");
            return;
        }
        SearchStatus::Cancelled => {
            println!("Search cancelled");
            return;
        }
    }

    if let Some(mirror) = &outcome.mirror {
        println!("Results from {}", mirror);
    }

    let results = &outcome.aggregate;
    if !results.tracks().is_empty() {
        println!("\nTracks");
        for track in results.tracks() {
            let quality: Vec<&str> = track.quality.iter().map(|q| q.as_str()).collect();
            println!(
                "  {:>10}  {} - {}{}",
                track.id,
                track.artist,
                track.title,
                if quality.is_empty() {
                    String::new()
                } else {
                    format!("  [{}]", quality.join(", "))
                }
            );
        }
    }
    if !results.albums().is_empty() {
        println!("\nAlbums");
        for album in results.albums() {
            println!("  {:>10}  {} - {}", album.id, album.artist, album.title);
        }
    }
    if !results.artists().is_empty() {
        println!("\nArtists");
        for artist in results.artists() {
            println!("  {:>10}  {}", artist.id, artist.name);
        }
    }
}

fn print_resource(kind: &str, resolved: &ResolvedResource) {
    match resolved {
        ResolvedResource::Resolved { url, mirror } => match mirror {
            Some(mirror) => println!("{} (via {})", url, mirror),
            None => println!("{}", url),
        },
        ResolvedResource::Unresolved => println!("No {} URL could be resolved", kind),
        ResolvedResource::Cancelled => println!("Cancelled"),
    }
}
