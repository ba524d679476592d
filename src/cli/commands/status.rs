//! Status command - show lifecycle and cache state

use crate::cli::commands::AppCache;
use crate::config::{Config, ConfigManager};
use crate::error::CacheResult;
use crate::lifecycle::ManifestRecord;
use crate::sync::missing_paths;
use console::{style, Emoji};
use std::path::Path;
use tracing::warn;

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static WARN: Emoji<'_, '_> = Emoji("⚠ ", "[WARN] ");

/// Execute the status command
pub async fn execute(config: &Config, from_dir: Option<&Path>) -> CacheResult<()> {
    let app = AppCache::open(config, from_dir).await?;
    let controller = app.controller().await?;

    println!("{}", style("stagecache status").bold().cyan());
    println!();
    println!("  State:     {}", style(controller.state()).bold());
    println!(
        "  Stores:    {}",
        ConfigManager::stores_dir(config).display()
    );
    println!(
        "  Resources: {} ({} shell)",
        app.table.len(),
        app.table.shell().len()
    );
    println!(
        "  Staged:    {}/{}",
        controller.staged_count().await?,
        app.table.shell().len()
    );

    println!();
    println!("{}", style("Manifest:").bold());
    match ManifestRecord::load(app.ctx.manifest()).await {
        Ok(Some(record)) if record.matches(&app.table) => {
            println!("  {} Configured bundle is active ({} paths)", CHECK, record.len());
        }
        Ok(Some(record)) => {
            println!(
                "  {} An older version is active ({} paths); run `stagecache update`",
                WARN,
                record.len()
            );
        }
        Ok(None) => println!("  {} No version activated yet", WARN),
        Err(e) => {
            warn!("Manifest record unreadable: {}", e);
            println!("  {} {}", WARN, style("Manifest record unreadable").yellow());
        }
    }

    let serving = app.serving_table().await;
    let missing = missing_paths(&app.ctx, &serving).await?;
    println!();
    println!("{}", style("Content cache:").bold());
    println!("  Cached:  {}", serving.len() - missing.len());
    println!("  Missing: {}", missing.len());
    if !missing.is_empty() {
        println!(
            "  {}",
            style("Run `stagecache sync` to download the rest for offline use").dim()
        );
    }

    Ok(())
}
