//! kclip - clipboard history
//!
//! Captures copied text into a short, de-duplicated, most-recent-first
//! history and shows it in a terminal popup with copy-back and delete.

mod app;
mod config;
mod error;
mod models;
mod screens;
mod services;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Read, Write};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use error::StoreError;
use models::AddOutcome;
use services::{
    CaptureController, ClipboardHistoryStore, ClipboardProvider, KeyValueStore, MemoryStore,
    SqliteStore, SystemClipboard,
};

/// kclip - clipboard history
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Config file path (default: ~/.config/kclip/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// History database path (overrides the config file)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Keep history in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add text to the history
    Add { text: String },
    /// Print the history, most recent first
    List,
    /// Copy entry N (1 = most recent) to the clipboard and move it to the top
    Copy { index: usize },
    /// Delete entry N from the history
    Remove { index: usize },
    /// Delete every entry
    Clear {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Copy stdin to the clipboard and record it
    Yank,
    /// Watch the clipboard in the background until interrupted
    Watch,
}

fn init_logging(args: &Args) -> Result<()> {
    let filter = if args.debug {
        "kclip=debug,info"
    } else {
        "kclip=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());

    if args.command.is_none() {
        // The popup owns the terminal, so logs go to a file
        let dir = Config::data_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("kclip.log"))
            .context("Failed to open log file")?;

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn open_store(config: &Config, ephemeral: bool) -> Result<Arc<ClipboardHistoryStore>> {
    let backend: Arc<dyn KeyValueStore> = if ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        let path = config.db_path();
        Arc::new(
            SqliteStore::open(&path)
                .with_context(|| format!("Failed to open history database: {}", path.display()))?,
        )
    };
    Ok(Arc::new(ClipboardHistoryStore::new(
        backend,
        config.history.max_size,
    )))
}

/// Look up a 1-based history index.
fn entry_at(entries: &[String], index: usize) -> Result<&String> {
    if index == 0 || index > entries.len() {
        bail!(
            "No entry {} (history has {} entries)",
            index,
            entries.len()
        );
    }
    Ok(&entries[index - 1])
}

async fn handle_add(capture: &CaptureController, text: &str) -> Result<()> {
    match capture.add_selection(text).await? {
        AddOutcome::Inserted { .. } => println!("✓ Added to history"),
        AddOutcome::Duplicate => println!("Already in history"),
        AddOutcome::Ignored => println!("Nothing to add"),
    }
    Ok(())
}

async fn handle_list(store: &ClipboardHistoryStore) -> Result<()> {
    let entries = store.read_all().await?;
    if entries.is_empty() {
        println!("Clipboard history is empty");
        return Ok(());
    }

    for (i, entry) in entries.iter().enumerate() {
        let one_line = entry.replace('\n', "⏎");
        println!("{:>3}. {}", i + 1, one_line);
    }
    Ok(())
}

async fn handle_copy(
    store: &ClipboardHistoryStore,
    clipboard: &dyn ClipboardProvider,
    index: usize,
) -> Result<()> {
    let entries = store.read_all().await?;
    let text = entry_at(&entries, index)?;

    clipboard
        .write_text(text)
        .await
        .context("Failed to copy entry to clipboard")?;
    store.promote(text).await?;

    println!("✓ Copied entry {} to clipboard", index);
    Ok(())
}

async fn handle_remove(store: &ClipboardHistoryStore, index: usize) -> Result<()> {
    let entries = store.read_all().await?;
    let text = entry_at(&entries, index)?;
    store.remove(text).await?;
    println!("✓ Removed entry {}", index);
    Ok(())
}

async fn handle_clear(store: &ClipboardHistoryStore, yes: bool) -> Result<()> {
    // An unreadable history can still be cleared, its size is just unknown
    let count = match store.read_all().await {
        Ok(entries) => Some(entries.len()),
        Err(e @ StoreError::Malformed { .. }) => {
            warn!(error = %e, "stored history is unreadable");
            None
        }
        Err(e) => return Err(e.into()),
    };
    if count == Some(0) {
        println!("Clipboard history is already empty");
        return Ok(());
    }

    if !yes {
        match count {
            Some(count) => print!("Delete all {} entries? [y/N] ", count),
            None => print!("Stored history is unreadable. Delete it? [y/N] "),
        }
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("Cancelled");
            return Ok(());
        }
    }

    store.clear().await?;
    match count {
        Some(count) => println!("✓ Cleared {} entries", count),
        None => println!("✓ Cleared history"),
    }
    Ok(())
}

async fn handle_yank(capture: &CaptureController, clipboard: &dyn ClipboardProvider) -> Result<()> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read stdin")?;

    clipboard
        .write_text(&text)
        .await
        .context("Failed to copy to clipboard")?;

    let copy = capture.on_copy(&text).await;
    // Let the follow-up clipboard read finish before exiting
    copy.fallback.await?;

    if copy.captured {
        println!("✓ Copied and added to history");
    } else {
        println!("✓ Copied");
    }
    Ok(())
}

async fn handle_watch(mut capture: CaptureController) -> Result<()> {
    // No window to look at, so watch as if hidden
    capture.on_visibility_change(true);
    info!("watching clipboard, press Ctrl-C to stop");

    wait_for_signals(&mut capture).await?;

    capture.stop_polling();
    Ok(())
}

/// SIGUSR1 pauses polling (window shown), SIGUSR2 resumes it (window hidden).
#[cfg(unix)]
async fn wait_for_signals(capture: &mut CaptureController) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut shown =
        signal(SignalKind::user_defined1()).context("Failed to listen for SIGUSR1")?;
    let mut hidden =
        signal(SignalKind::user_defined2()).context("Failed to listen for SIGUSR2")?;

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("Failed to listen for Ctrl-C")?;
                return Ok(());
            }
            Some(()) = shown.recv() => {
                info!("paused by SIGUSR1");
                capture.on_visibility_change(false);
            }
            Some(()) = hidden.recv() => {
                info!("resumed by SIGUSR2");
                capture.on_visibility_change(true);
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signals(_capture: &mut CaptureController) -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    init_logging(&args)?;

    // Load configuration
    let mut config = if let Some(path) = &args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Override the database path if specified
    if let Some(db) = &args.db {
        config.history.db_path = db.clone();
    }

    let config = Arc::new(config);
    let store = open_store(&config, args.ephemeral)?;
    let clipboard: Arc<dyn ClipboardProvider> = Arc::new(SystemClipboard::new());
    let capture = CaptureController::new(store.clone(), clipboard.clone(), &config.capture);

    match args.command {
        Some(Command::Add { text }) => handle_add(&capture, &text).await?,
        Some(Command::List) => handle_list(&store).await?,
        Some(Command::Copy { index }) => handle_copy(&store, clipboard.as_ref(), index).await?,
        Some(Command::Remove { index }) => handle_remove(&store, index).await?,
        Some(Command::Clear { yes }) => handle_clear(&store, yes).await?,
        Some(Command::Yank) => handle_yank(&capture, clipboard.as_ref()).await?,
        Some(Command::Watch) => handle_watch(capture).await?,
        None => {
            // The popup runs its own capture controller
            drop(capture);
            let mut app = app::App::new(config, store, clipboard);
            app.run().await?;
        }
    }

    Ok(())
}
