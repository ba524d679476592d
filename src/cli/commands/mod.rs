//! CLI command implementations

pub mod activate;
pub mod config;
pub mod fetch;
pub mod install;
pub mod scan;
pub mod status;
pub mod sync;
pub mod update;

pub use activate::execute as activate;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use install::execute as install;
pub use scan::execute as scan;
pub use status::execute as status;
pub use sync::execute as sync;
pub use update::execute as update;

use crate::bundle::ResourceTable;
use crate::config::{Config, ConfigManager};
use crate::context::CacheContext;
use crate::dispatch::Dispatcher;
use crate::error::CacheResult;
use crate::journal::Journal;
use crate::lifecycle::{LifecycleController, ManifestRecord};
use crate::net::{DirFetcher, Fetcher, HttpFetcher};
use crate::router::FetchRouter;
use crate::store::DiskStore;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything a command needs to drive the cache from the CLI
pub(crate) struct AppCache {
    pub ctx: Arc<CacheContext>,
    pub table: Arc<ResourceTable>,
    pub fetcher: Arc<dyn Fetcher>,
    pub journal: Journal,
}

impl AppCache {
    /// Open the on-disk stores and load the configured resource table
    ///
    /// `from_dir` overrides both the origin and `bundle.build_dir`.
    pub async fn open(config: &Config, from_dir: Option<&Path>) -> CacheResult<Self> {
        let stores_dir = ConfigManager::stores_dir(config);
        debug!("Opening stores under {}", stores_dir.display());
        let backend = Arc::new(DiskStore::new(stores_dir));
        let ctx = Arc::new(CacheContext::open(backend, config.stores.clone()).await?);

        let table = Arc::new(ResourceTable::from_file(&config.bundle.resources).await?);

        let fetcher: Arc<dyn Fetcher> = match from_dir.or(config.bundle.build_dir.as_deref()) {
            Some(dir) => {
                debug!("Reading assets from {}", dir.display());
                Arc::new(DirFetcher::new(dir))
            }
            None => Arc::new(HttpFetcher::new(
                &config.origin.url,
                config.origin.max_body_bytes(),
            )),
        };

        let journal = Journal::new(ConfigManager::journal_path(config), config.general.journal);

        Ok(Self {
            ctx,
            table,
            fetcher,
            journal,
        })
    }

    /// Controller for the configured bundle, resumed from what the stores hold
    pub async fn controller(&self) -> CacheResult<LifecycleController> {
        let controller = LifecycleController::restore(
            Arc::clone(&self.ctx),
            Arc::clone(&self.table),
            Arc::clone(&self.fetcher),
        )
        .await?;
        Ok(controller.with_journal(self.journal.clone()))
    }

    /// Table of the version currently serving
    ///
    /// That is the last activated version when one exists, even if a newer
    /// bundle is configured and waiting.
    pub async fn serving_table(&self) -> Arc<ResourceTable> {
        match ManifestRecord::load(self.ctx.manifest()).await {
            Ok(Some(record)) => Arc::new(record.into_table()),
            Ok(None) => Arc::clone(&self.table),
            Err(e) => {
                warn!("Serving the configured bundle: {}", e);
                Arc::clone(&self.table)
            }
        }
    }

    /// Router over the serving version
    pub async fn router(&self, origin: &str) -> FetchRouter {
        FetchRouter::new(
            origin,
            Arc::clone(&self.ctx),
            self.serving_table().await,
            Arc::clone(&self.fetcher),
        )
    }

    /// Dispatcher wiring the controller and router together
    pub async fn dispatcher(&self, config: &Config) -> CacheResult<Dispatcher> {
        let controller = self.controller().await?;
        let router = self.router(&config.origin.url).await;
        Ok(Dispatcher::new(
            controller,
            router,
            Arc::clone(&self.fetcher),
            self.journal.clone(),
        ))
    }
}
