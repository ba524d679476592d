//! Update command - install and take over immediately

use crate::cli::commands::activate::print_report;
use crate::cli::commands::AppCache;
use crate::config::Config;
use crate::dispatch::{ControlMessage, EventOutcome, HostEvent};
use crate::error::{CacheError, CacheResult};
use console::style;
use std::path::Path;

/// Execute the update command
pub async fn execute(config: &Config, from_dir: Option<&Path>) -> CacheResult<()> {
    let app = AppCache::open(config, from_dir).await?;
    let dispatcher = app.dispatcher(config).await?;

    if let EventOutcome::Installed { staged, .. } = dispatcher.dispatch(HostEvent::Install).await? {
        println!(
            "{} {} shell files staged",
            style("Installed").green().bold(),
            staged
        );
    }

    match dispatcher.control(ControlMessage::ActivateNow).await? {
        EventOutcome::Activated(report) => {
            print_report(&report);
            Ok(())
        }
        EventOutcome::Faulted { reason } => Err(CacheError::ActivationFailed(Box::new(
            CacheError::Internal(reason),
        ))),
        other => Err(CacheError::Internal(format!(
            "unexpected outcome {:?}",
            other
        ))),
    }
}
