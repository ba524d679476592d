//! Lifecycle controller

use crate::bundle::ResourceTable;
use crate::context::CacheContext;
use crate::error::{CacheError, CacheResult};
use crate::journal::Journal;
use crate::lifecycle::manifest::{stale_keys, ManifestRecord};
use crate::lifecycle::state::LifecycleState;
use crate::net::{fetch_all, FetchMode, Fetcher};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of a successful activation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    /// No manifest record existed, the content cache started empty
    pub first_run: bool,
    /// Keys removed because their fingerprint changed or they left the bundle
    pub evicted: Vec<String>,
    /// Cached entries kept from the previous version
    pub retained: usize,
    /// Staged shell files copied into the content cache
    pub merged: usize,
}

/// Drives one bundle version through install and activation
pub struct LifecycleController {
    ctx: Arc<CacheContext>,
    table: Arc<ResourceTable>,
    fetcher: Arc<dyn Fetcher>,
    journal: Journal,
    state: LifecycleState,
    skip_waiting: bool,
}

impl LifecycleController {
    /// Controller for a version that has not been installed yet
    pub fn new(
        ctx: Arc<CacheContext>,
        table: Arc<ResourceTable>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            ctx,
            table,
            fetcher,
            journal: Journal::disabled(),
            state: LifecycleState::Installing,
            skip_waiting: false,
        }
    }

    /// Controller whose state is derived from what the stores already hold
    ///
    /// A fully staged shell set means the version is installed and waiting;
    /// a manifest record equal to the table means it is already active.
    pub async fn restore(
        ctx: Arc<CacheContext>,
        table: Arc<ResourceTable>,
        fetcher: Arc<dyn Fetcher>,
    ) -> CacheResult<Self> {
        let mut controller = Self::new(ctx, table, fetcher);

        let staged = controller.staged_count().await?;
        let temp_empty = controller.ctx.temp().keys().await?.is_empty();
        let active = match ManifestRecord::load(controller.ctx.manifest()).await {
            Ok(record) => record.is_some_and(|r| r.matches(&controller.table)),
            Err(e) => {
                warn!("Ignoring unreadable manifest record: {}", e);
                false
            }
        };

        let shell_len = controller.table.shell().len();
        controller.state = if !temp_empty && staged == shell_len {
            LifecycleState::Installed
        } else if active {
            LifecycleState::Active
        } else if shell_len == 0 {
            LifecycleState::Installed
        } else {
            LifecycleState::Installing
        };

        debug!("Restored lifecycle state: {}", controller.state);
        Ok(controller)
    }

    /// Record lifecycle events to a journal
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    /// Current state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether this version asked to take over as soon as possible
    pub fn wants_takeover(&self) -> bool {
        self.skip_waiting && self.state == LifecycleState::Installed
    }

    /// Ask for this version to take over on the next opportunity
    pub fn skip_waiting(&mut self) {
        self.skip_waiting = true;
    }

    /// Resource table of this version
    pub fn table(&self) -> &Arc<ResourceTable> {
        &self.table
    }

    /// Stores this controller works against
    pub fn context(&self) -> &Arc<CacheContext> {
        &self.ctx
    }

    /// Number of shell paths currently present in the temp store
    pub async fn staged_count(&self) -> CacheResult<usize> {
        let staged: HashSet<String> = self.ctx.temp().keys().await?.into_iter().collect();
        Ok(self
            .table
            .shell()
            .iter()
            .filter(|p| staged.contains(*p))
            .count())
    }

    /// Stage the shell set into the temp store
    ///
    /// All-or-nothing: if any shell file cannot be fetched the stage is
    /// dropped, the version becomes redundant and the active version keeps
    /// serving untouched.
    pub async fn install(&mut self) -> CacheResult<usize> {
        if !self.state.can_install() {
            return Err(CacheError::InvalidTransition {
                operation: "install",
                state: self.state.to_string(),
            });
        }

        self.state = LifecycleState::Installing;
        info!("Installing {} shell files", self.table.shell().len());
        self.journal
            .record(
                "install.started",
                serde_json::json!({ "shell": self.table.shell() }),
            )
            .await;

        match self.stage_shell().await {
            Ok(staged) => {
                self.state = LifecycleState::Installed;
                self.skip_waiting();
                info!("Staged {} shell files", staged);
                self.journal
                    .record("install.completed", serde_json::json!({ "staged": staged }))
                    .await;
                Ok(staged)
            }
            Err(e) => {
                self.state = LifecycleState::Redundant;
                warn!("Install failed: {}", e);
                if let Err(clear_err) = self.ctx.clear_temp().await {
                    warn!("Failed to drop partial stage: {}", clear_err);
                }
                self.journal
                    .record(
                        "install.failed",
                        serde_json::json!({ "error": e.to_string() }),
                    )
                    .await;
                Err(CacheError::InstallFailed(Box::new(e)))
            }
        }
    }

    async fn stage_shell(&self) -> CacheResult<usize> {
        self.ctx.clear_temp().await?;

        let fetched = fetch_all(self.fetcher.as_ref(), self.table.shell(), FetchMode::Reload).await?;
        let staged = fetched.len();
        for (path, snapshot) in fetched {
            self.ctx.temp().put(&path, snapshot).await?;
        }

        Ok(staged)
    }

    /// Promote the staged version to active
    ///
    /// Refuses to start unless the whole shell set is staged; nothing is
    /// touched in that case. Once started, any error moves the controller to
    /// `Faulted` and purges the content, temp and manifest stores.
    pub async fn activate(&mut self) -> CacheResult<ActivationReport> {
        if !self.state.can_activate() {
            return Err(CacheError::InvalidTransition {
                operation: "activate",
                state: self.state.to_string(),
            });
        }

        if self.state != LifecycleState::Active {
            let staged = self.staged_count().await?;
            let total = self.table.shell().len();
            if staged < total {
                return Err(CacheError::InvalidTransition {
                    operation: "activate",
                    state: format!("{} with {}/{} shell files staged", self.state, staged, total),
                });
            }
        }

        self.state = LifecycleState::Activating;
        debug!("Activating version with {} resources", self.table.len());

        match self.run_activation().await {
            Ok(report) => {
                self.state = LifecycleState::Active;
                self.skip_waiting = false;
                info!(
                    "Activated: {} evicted, {} retained, {} merged{}",
                    report.evicted.len(),
                    report.retained,
                    report.merged,
                    if report.first_run { " (first run)" } else { "" }
                );
                self.journal
                    .record(
                        "activate.completed",
                        serde_json::to_value(&report).unwrap_or_default(),
                    )
                    .await;
                Ok(report)
            }
            Err(e) => {
                self.state = LifecycleState::Faulted;
                error!("Activation failed, purging caches: {}", e);
                if let Err(purge_err) = self.ctx.purge().await {
                    error!("Purge after failed activation incomplete: {}", purge_err);
                }
                self.journal
                    .record("purge", serde_json::json!({ "error": e.to_string() }))
                    .await;
                Err(CacheError::ActivationFailed(Box::new(e)))
            }
        }
    }

    async fn run_activation(&self) -> CacheResult<ActivationReport> {
        let mut report = ActivationReport::default();

        match ManifestRecord::load(self.ctx.manifest()).await? {
            None => {
                debug!("No manifest record, starting from an empty content cache");
                report.first_run = true;
                self.ctx.clear_content().await?;
            }
            Some(old) => {
                let cached = self.ctx.content().keys().await?;
                let stale = stale_keys(&old, &self.table, &cached);

                for key in &stale {
                    self.ctx.content().delete(key).await?;
                    debug!("Evicted {}", key);
                }

                report.retained = cached.len() - stale.len();
                report.evicted = stale.into_iter().map(str::to_string).collect();
            }
        }

        // Staged files overwrite anything retained under the same key
        for key in self.ctx.temp().keys().await? {
            let snapshot = self.ctx.temp().get(&key).await?.ok_or_else(|| {
                CacheError::store(self.ctx.temp().name(), format!("staged entry {} vanished", key))
            })?;
            self.ctx.content().put(&key, snapshot).await?;
            report.merged += 1;
        }

        self.ctx.clear_temp().await?;
        ManifestRecord::from_table(&self.table)
            .save(self.ctx.manifest())
            .await?;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StoreNames;
    use crate::lifecycle::manifest::MANIFEST_KEY;
    use crate::store::{BlobStore, MemoryStore, Snapshot};
    use crate::testing::{table, FailingStore, ScriptedFetcher};

    async fn context(backend: Arc<dyn BlobStore>) -> Arc<CacheContext> {
        Arc::new(
            CacheContext::open(backend, StoreNames::default())
                .await
                .unwrap(),
        )
    }

    fn controller(
        ctx: &Arc<CacheContext>,
        table: ResourceTable,
        fetcher: &Arc<ScriptedFetcher>,
    ) -> LifecycleController {
        let fetcher: Arc<dyn Fetcher> = fetcher.clone();
        LifecycleController::new(Arc::clone(ctx), Arc::new(table), fetcher)
    }

    #[tokio::test]
    async fn first_run_populates_shell_only() {
        let ctx = context(Arc::new(MemoryStore::new())).await;
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.serve("index.html", "<html>").serve("main.js", "js");
        let current = table(
            &[("index.html", "h1"), ("main.js", "h2"), ("logo.png", "h3")],
            &["index.html", "main.js"],
        );
        let mut lc = controller(&ctx, current.clone(), &fetcher);

        assert_eq!(lc.install().await.unwrap(), 2);
        assert_eq!(lc.state(), LifecycleState::Installed);
        assert!(lc.wants_takeover());

        let report = lc.activate().await.unwrap();

        assert!(report.first_run);
        assert_eq!(report.merged, 2);
        assert_eq!(lc.state(), LifecycleState::Active);
        assert!(!lc.wants_takeover());
        assert_eq!(ctx.content().keys().await.unwrap(), vec!["index.html", "main.js"]);
        assert!(ctx.temp().keys().await.unwrap().is_empty());

        let record = ManifestRecord::load(ctx.manifest()).await.unwrap().unwrap();
        assert!(record.matches(&current));
    }

    #[tokio::test]
    async fn first_run_drops_leftover_content() {
        let ctx = context(Arc::new(MemoryStore::new())).await;
        ctx.content().put("logo.png", Snapshot::ok("stale")).await.unwrap();
        ctx.content().put("gone.js", Snapshot::ok("stale")).await.unwrap();
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.serve("index.html", "<html>").serve("main.js", "js");
        let current = table(
            &[("index.html", "h1"), ("main.js", "h2"), ("logo.png", "h3")],
            &["index.html", "main.js"],
        );
        let mut lc = controller(&ctx, current, &fetcher);

        lc.install().await.unwrap();
        let report = lc.activate().await.unwrap();

        assert!(report.first_run);
        assert!(report.evicted.is_empty());
        assert_eq!(report.retained, 0);
        assert_eq!(ctx.content().keys().await.unwrap(), vec!["index.html", "main.js"]);
    }

    #[tokio::test]
    async fn install_bypasses_http_cache() {
        let ctx = context(Arc::new(MemoryStore::new())).await;
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.serve("index.html", "<html>");
        let mut lc = controller(&ctx, table(&[("index.html", "h1")], &["index.html"]), &fetcher);

        lc.install().await.unwrap();

        assert_eq!(
            fetcher.calls(),
            vec![("index.html".to_string(), FetchMode::Reload)]
        );
    }

    #[tokio::test]
    async fn fingerprint_change_evicts_entry() {
        let ctx = context(Arc::new(MemoryStore::new())).await;
        ManifestRecord::from_table(&table(&[("a", "h1"), ("b", "hOLD")], &[]))
            .save(ctx.manifest())
            .await
            .unwrap();
        ctx.content().put("a", Snapshot::ok("a")).await.unwrap();
        ctx.content().put("b", Snapshot::ok("old b")).await.unwrap();

        let fetcher = Arc::new(ScriptedFetcher::new());
        let mut lc = controller(&ctx, table(&[("a", "h1"), ("b", "h2")], &[]), &fetcher);
        lc.install().await.unwrap();
        let report = lc.activate().await.unwrap();

        assert!(!report.first_run);
        assert_eq!(report.evicted, vec!["b"]);
        assert_eq!(report.retained, 1);
        assert_eq!(ctx.content().keys().await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn changed_shell_file_is_refetched_by_merge() {
        let ctx = context(Arc::new(MemoryStore::new())).await;
        ManifestRecord::from_table(&table(&[("index.html", "h1")], &[]))
            .save(ctx.manifest())
            .await
            .unwrap();
        ctx.content()
            .put("index.html", Snapshot::ok("old"))
            .await
            .unwrap();

        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.serve("index.html", "new");
        let mut lc = controller(
            &ctx,
            table(&[("index.html", "h2")], &["index.html"]),
            &fetcher,
        );
        lc.install().await.unwrap();
        let report = lc.activate().await.unwrap();

        assert_eq!(report.evicted, vec!["index.html"]);
        assert_eq!(report.merged, 1);
        let entry = ctx.content().get("index.html").await.unwrap().unwrap();
        assert_eq!(entry.body, b"new");
    }

    #[tokio::test]
    async fn activation_twice_is_idempotent() {
        let ctx = context(Arc::new(MemoryStore::new())).await;
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.serve("index.html", "<html>");
        let mut lc = controller(
            &ctx,
            table(&[("index.html", "h1"), ("a.png", "h2")], &["index.html"]),
            &fetcher,
        );
        lc.install().await.unwrap();
        lc.activate().await.unwrap();
        ctx.content().put("a.png", Snapshot::ok("png")).await.unwrap();
        let before = ctx.content().keys().await.unwrap();

        let report = lc.activate().await.unwrap();

        assert!(report.evicted.is_empty());
        assert_eq!(report.retained, 2);
        assert_eq!(report.merged, 0);
        assert_eq!(ctx.content().keys().await.unwrap(), before);
    }

    #[tokio::test]
    async fn failed_install_leaves_active_version_alone() {
        let ctx = context(Arc::new(MemoryStore::new())).await;
        let old = table(&[("index.html", "h1")], &[]);
        ManifestRecord::from_table(&old)
            .save(ctx.manifest())
            .await
            .unwrap();
        ctx.content()
            .put("index.html", Snapshot::ok("old"))
            .await
            .unwrap();

        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.serve("index.html", "new").fail("main.js");
        let mut lc = controller(
            &ctx,
            table(&[("index.html", "h2"), ("main.js", "h3")], &["index.html", "main.js"]),
            &fetcher,
        );

        let err = lc.install().await.unwrap_err();

        assert!(matches!(err, CacheError::InstallFailed(_)));
        assert_eq!(lc.state(), LifecycleState::Redundant);
        assert!(ctx.temp().keys().await.unwrap().is_empty());
        assert_eq!(
            ctx.content().get("index.html").await.unwrap().unwrap().body,
            b"old"
        );
        let record = ManifestRecord::load(ctx.manifest()).await.unwrap().unwrap();
        assert!(record.matches(&old));

        assert!(matches!(
            lc.activate().await,
            Err(CacheError::InvalidTransition { operation: "activate", .. })
        ));
    }

    #[tokio::test]
    async fn non_success_status_fails_install() {
        let ctx = context(Arc::new(MemoryStore::new())).await;
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.respond("index.html", Snapshot::new(404, "missing"));
        let mut lc = controller(&ctx, table(&[("index.html", "h1")], &["index.html"]), &fetcher);

        let err = lc.install().await.unwrap_err();

        assert!(matches!(
            err,
            CacheError::InstallFailed(ref inner)
                if matches!(**inner, CacheError::BadStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn partial_stage_blocks_activation_without_purge() {
        let ctx = context(Arc::new(MemoryStore::new())).await;
        ctx.content().put("a", Snapshot::ok("a")).await.unwrap();
        ctx.temp().put("index.html", Snapshot::ok("x")).await.unwrap();

        let fetcher = Arc::new(ScriptedFetcher::new());
        let mut lc = controller(
            &ctx,
            table(&[("a", "h0"), ("index.html", "h1"), ("main.js", "h2")], &["index.html", "main.js"]),
            &fetcher,
        );
        lc.state = LifecycleState::Installed;

        let err = lc.activate().await.unwrap_err();

        assert!(matches!(err, CacheError::InvalidTransition { .. }));
        assert_eq!(lc.state(), LifecycleState::Installed);
        assert_eq!(ctx.content().keys().await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn store_failure_faults_and_purges() {
        let memory = MemoryStore::new();
        let backend = FailingStore::new(memory.clone(), "app-cache", Some("main.js"));
        let ctx = context(Arc::new(backend)).await;

        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.serve("index.html", "<html>").serve("main.js", "js");
        let mut lc = controller(
            &ctx,
            table(&[("index.html", "h1"), ("main.js", "h2")], &["index.html", "main.js"]),
            &fetcher,
        );
        lc.install().await.unwrap();

        let err = lc.activate().await.unwrap_err();

        assert!(matches!(err, CacheError::ActivationFailed(_)));
        assert_eq!(lc.state(), LifecycleState::Faulted);
        for name in ["app-cache", "app-temp", "app-manifest"] {
            assert!(!memory.contains_store(name), "{} survived purge", name);
        }
        assert!(ctx.manifest().get(MANIFEST_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_manifest_faults_then_recovers_as_first_run() {
        let ctx = context(Arc::new(MemoryStore::new())).await;
        ctx.manifest()
            .put(MANIFEST_KEY, Snapshot::ok("{truncated"))
            .await
            .unwrap();
        ctx.content().put("index.html", Snapshot::ok("old")).await.unwrap();

        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.serve("index.html", "<html>");
        let mut lc = controller(&ctx, table(&[("index.html", "h1")], &["index.html"]), &fetcher);
        lc.install().await.unwrap();

        let err = lc.activate().await.unwrap_err();
        assert!(matches!(
            err,
            CacheError::ActivationFailed(ref inner) if matches!(**inner, CacheError::CorruptManifest(_))
        ));
        assert!(ctx.content().keys().await.unwrap().is_empty());

        lc.install().await.unwrap();
        let report = lc.activate().await.unwrap();

        assert!(report.first_run);
        assert_eq!(ctx.content().keys().await.unwrap(), vec!["index.html"]);
    }

    #[tokio::test]
    async fn activate_before_install_is_rejected() {
        let ctx = context(Arc::new(MemoryStore::new())).await;
        let fetcher = Arc::new(ScriptedFetcher::new());
        let mut lc = controller(&ctx, table(&[("a", "h1")], &[]), &fetcher);

        assert!(matches!(
            lc.activate().await,
            Err(CacheError::InvalidTransition { operation: "activate", .. })
        ));
        assert_eq!(lc.state(), LifecycleState::Installing);
    }

    #[tokio::test]
    async fn restore_detects_states() {
        let ctx = context(Arc::new(MemoryStore::new())).await;
        let current = Arc::new(table(&[("index.html", "h1")], &["index.html"]));
        let fetcher: Arc<dyn Fetcher> = Arc::new(ScriptedFetcher::new());

        let lc = LifecycleController::restore(Arc::clone(&ctx), Arc::clone(&current), Arc::clone(&fetcher))
            .await
            .unwrap();
        assert_eq!(lc.state(), LifecycleState::Installing);

        ctx.temp().put("index.html", Snapshot::ok("x")).await.unwrap();
        let lc = LifecycleController::restore(Arc::clone(&ctx), Arc::clone(&current), Arc::clone(&fetcher))
            .await
            .unwrap();
        assert_eq!(lc.state(), LifecycleState::Installed);

        ctx.clear_temp().await.unwrap();
        ManifestRecord::from_table(&current)
            .save(ctx.manifest())
            .await
            .unwrap();
        let lc = LifecycleController::restore(ctx, current, fetcher).await.unwrap();
        assert_eq!(lc.state(), LifecycleState::Active);
    }
}
