//! src/main.rs
//! Loads configuration, installs logging, builds the navigator for the working
//! directory (or the path given on the command line) and prints the current
//! listing once it has loaded.

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clipr::{FileStore, PendingStore};
use tracing::info;

use fnav_core::{
    config::Config,
    logging::LoggerBuilder,
    model::{Listing, Navigator},
    tasks::{FsTransfer, Transfer},
};

const DEFAULT_HEIGHT: usize = 40;
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> Result<()> {
    let config = Config::load().await.context("Failed to load configuration")?;

    let _guard = LoggerBuilder::new()
        .with_config(config.logging.clone())
        .build()
        .await
        .context("Failed to initialize logging")?;

    let store: Arc<dyn PendingStore> = match &config.clipboard_file {
        Some(path) => Arc::new(FileStore::new(path.clone())),
        None => Arc::new(FileStore::default_location().context("Failed to locate data directory")?),
    };
    let transfer: Arc<dyn Transfer> = Arc::new(FsTransfer);

    let height = env::var("LINES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_HEIGHT);

    let mut nav = Navigator::new(config.nav.clone(), height, store, transfer)
        .context("Failed to build directory stack")?;

    if let Some(arg) = env::args_os().nth(1).map(PathBuf::from) {
        if arg.is_dir() {
            nav.cd(&arg).with_context(|| format!("Cannot enter {}", arg.display()))?;
        } else {
            nav.select_path(&arg)
                .with_context(|| format!("Cannot select {}", arg.display()))?;
        }
    }

    nav.reconcile().await.context("Failed to read pending operation")?;

    tokio::time::timeout(LOAD_TIMEOUT, async {
        while nav.is_loading() {
            if nav.next_event().await.is_none() {
                break;
            }
        }
    })
    .await
    .context("Timed out waiting for the directory listing")?;

    let Some(listing) = nav.current_listing() else {
        return Ok(());
    };

    print_listing(&nav, listing);
    info!("Printed {} entries of {}", listing.len(), listing.path.display());

    Ok(())
}

fn print_listing(nav: &Navigator, listing: &Listing) {
    println!("{}", listing.path.display());

    if let Some(err) = &listing.error {
        println!("  error: {err}");
        return;
    }

    for (i, entry) in listing.visible().enumerate() {
        let cursor = if i == listing.ind { '>' } else { ' ' };
        let mark = if nav.marks().contains(&entry.path) { '*' } else { ' ' };
        let queued = nav
            .saved(&entry.path)
            .map_or("    ", |op| op.operation_tag());
        let suffix = if entry.is_dir() { "/" } else { "" };

        println!(
            "{cursor}{mark} {queued:<4} {:>10}  {}  {}{suffix}",
            entry.size_human(),
            entry.format_date("%Y-%m-%d %H:%M"),
            entry.name(),
        );
    }
}
