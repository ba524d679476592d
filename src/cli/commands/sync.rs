//! Sync command - download every resource not cached yet

use crate::cli::commands::AppCache;
use crate::config::Config;
use crate::dispatch::{ControlMessage, EventOutcome};
use crate::error::CacheResult;
use console::style;
use std::path::Path;

/// Execute the sync command
pub async fn execute(config: &Config, from_dir: Option<&Path>) -> CacheResult<()> {
    let app = AppCache::open(config, from_dir).await?;
    let dispatcher = app.dispatcher(config).await?;

    if let EventOutcome::Synced(fetched) = dispatcher.control(ControlMessage::SyncAll).await? {
        if fetched.is_empty() {
            println!("{}", style("Everything is already cached").green());
        } else {
            println!(
                "{} {} resources",
                style("Downloaded").green().bold(),
                fetched.len()
            );
        }
    }
    Ok(())
}
