//! Scan command - fingerprint a build directory into a resource table

use crate::bundle::{scan_build_dir, ScanOptions};
use crate::cli::args::ScanArgs;
use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use console::style;

/// Execute the scan command
pub async fn execute(args: ScanArgs, config: &Config) -> CacheResult<()> {
    let options = ScanOptions {
        shell: args.shell,
        exclude: args.exclude,
    };
    let build_dir = args.build_dir;
    let table = tokio::task::spawn_blocking(move || scan_build_dir(&build_dir, &options))
        .await
        .map_err(|e| CacheError::Internal(e.to_string()))??;

    let out = args.out.unwrap_or_else(|| config.bundle.resources.clone());
    table.save(&out).await?;

    println!(
        "{} {} resources ({} shell) written to {}",
        style("Scanned").green().bold(),
        table.len(),
        table.shell().len(),
        out.display()
    );
    Ok(())
}
