//! Install command - stage the shell files of the configured bundle

use crate::cli::commands::AppCache;
use crate::config::Config;
use crate::error::CacheResult;
use console::style;
use std::path::Path;

/// Execute the install command
pub async fn execute(config: &Config, from_dir: Option<&Path>) -> CacheResult<()> {
    let app = AppCache::open(config, from_dir).await?;
    let mut controller = app.controller().await?;

    let staged = controller.install().await?;

    println!(
        "{} {} shell files staged",
        style("Installed").green().bold(),
        staged
    );
    println!(
        "  {}",
        style("Run `stagecache activate` to make this version current").dim()
    );
    Ok(())
}
