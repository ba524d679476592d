//! Activate command - make the staged bundle current

use crate::cli::commands::AppCache;
use crate::config::Config;
use crate::error::CacheResult;
use crate::lifecycle::ActivationReport;
use console::style;
use std::path::Path;

/// Execute the activate command
pub async fn execute(config: &Config, from_dir: Option<&Path>) -> CacheResult<()> {
    let app = AppCache::open(config, from_dir).await?;
    let mut controller = app.controller().await?;

    let report = controller.activate().await?;
    print_report(&report);
    Ok(())
}

pub(crate) fn print_report(report: &ActivationReport) {
    println!("{}", style("Activated").green().bold());
    if report.first_run {
        println!("  First activation, content cache started empty");
    }
    println!("  Merged:   {}", report.merged);
    println!("  Retained: {}", report.retained);
    println!("  Evicted:  {}", report.evicted.len());
    for key in &report.evicted {
        println!("    {}", style(key).dim());
    }
}
