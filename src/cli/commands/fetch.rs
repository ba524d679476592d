//! Fetch command - route one GET request through the cache

use crate::cli::args::FetchArgs;
use crate::cli::commands::AppCache;
use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use crate::router::{Request, Routed};
use console::style;
use std::path::Path;
use tokio::fs;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config, from_dir: Option<&Path>) -> CacheResult<()> {
    let app = AppCache::open(config, from_dir).await?;
    let router = app.router(&config.origin.url).await;

    match router.route(&Request::get(&args.url)).await? {
        Routed::Passthrough => {
            println!("{} {}", style("not intercepted").yellow(), args.url);
        }
        Routed::Respond {
            key,
            source,
            response,
        } => {
            println!(
                "{} {} {} ({} bytes)",
                style(&key).bold(),
                source,
                response.status,
                response.body.len()
            );
            if let Some(out) = args.out {
                fs::write(&out, &response.body)
                    .await
                    .map_err(|e| CacheError::io(format!("writing {}", out.display()), e))?;
            }
        }
    }

    Ok(())
}
