//! Host event adapter
//!
//! The only place that knows the host's event and message names. Each
//! event maps to one controller or router call.
//!
//! Lifecycle events take the controller lock one at a time; requests never
//! touch it, so they keep being served by the active version while an
//! install or activation is running.

use crate::error::{CacheError, CacheResult};
use crate::journal::Journal;
use crate::lifecycle::{ActivationReport, LifecycleController, LifecycleState};
use crate::net::Fetcher;
use crate::router::{FetchRouter, Request, Routed};
use crate::sync::sync_all;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Control messages posted by the application page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Make the waiting version current immediately
    ActivateNow,
    /// Download every resource not cached yet
    SyncAll,
}

impl FromStr for ControlMessage {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skipWaiting" | "activate-now" => Ok(Self::ActivateNow),
            "downloadOffline" | "sync-all" => Ok(Self::SyncAll),
            other => Err(CacheError::User(format!("Unknown control message: {}", other))),
        }
    }
}

/// Events delivered by the host runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Install,
    Activate,
    Fetch(Request),
    Message(String),
}

/// What handling an event produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Shell staged; `takeover` when the version asked to become current
    Installed { staged: usize, takeover: bool },
    /// Version is now current
    Activated(ActivationReport),
    /// Activation failed and the caches were purged
    Faulted { reason: String },
    /// Result of routing a request
    Fetched(Routed),
    /// Keys downloaded by a full sync
    Synced(Vec<String>),
    /// Nothing to do
    Ignored,
}

/// Dispatches host events to the lifecycle controller and fetch router
///
/// The controller drives the incoming version while the router keeps
/// serving with the table of the version that is currently active. A
/// successful activation hands the controller's table to the router.
pub struct Dispatcher {
    controller: Mutex<LifecycleController>,
    router: FetchRouter,
    fetcher: Arc<dyn Fetcher>,
    journal: Journal,
}

impl Dispatcher {
    /// Create a dispatcher
    pub fn new(
        controller: LifecycleController,
        router: FetchRouter,
        fetcher: Arc<dyn Fetcher>,
        journal: Journal,
    ) -> Self {
        Self {
            controller: Mutex::new(controller),
            router,
            fetcher,
            journal,
        }
    }

    /// Lifecycle state of the incoming version
    pub async fn state(&self) -> LifecycleState {
        self.controller.lock().await.state()
    }

    /// Fetch router
    pub fn router(&self) -> &FetchRouter {
        &self.router
    }

    /// Handle one host event
    ///
    /// Install failures and request failures without a cached fallback are
    /// returned to the caller. Activation failures are logged and reported
    /// as `Faulted`; they never reach request handling.
    pub async fn dispatch(&self, event: HostEvent) -> CacheResult<EventOutcome> {
        match event {
            HostEvent::Install => {
                let mut controller = self.controller.lock().await;
                let staged = controller.install().await?;
                Ok(EventOutcome::Installed {
                    staged,
                    takeover: controller.wants_takeover(),
                })
            }
            HostEvent::Activate => {
                let mut controller = self.controller.lock().await;
                Ok(self.activate(&mut controller).await)
            }
            HostEvent::Fetch(request) => Ok(EventOutcome::Fetched(self.fetch(&request).await?)),
            HostEvent::Message(data) => match data.parse::<ControlMessage>() {
                Ok(message) => self.control(message).await,
                Err(_) => {
                    debug!("Ignoring unknown message {:?}", data);
                    Ok(EventOutcome::Ignored)
                }
            },
        }
    }

    /// Route one request with the version that is serving right now
    pub async fn fetch(&self, request: &Request) -> CacheResult<Routed> {
        self.router.route(request).await
    }

    /// Handle a control message
    pub async fn control(&self, message: ControlMessage) -> CacheResult<EventOutcome> {
        match message {
            ControlMessage::ActivateNow => {
                let mut controller = self.controller.lock().await;
                controller.skip_waiting();
                if controller.wants_takeover() {
                    info!("Taking over immediately");
                    Ok(self.activate(&mut controller).await)
                } else {
                    debug!("No waiting version in state {}", controller.state());
                    Ok(EventOutcome::Ignored)
                }
            }
            ControlMessage::SyncAll => {
                let table = self.router.table();
                let fetched = sync_all(
                    self.router.context(),
                    &table,
                    self.fetcher.as_ref(),
                    &self.journal,
                )
                .await?;
                Ok(EventOutcome::Synced(fetched))
            }
        }
    }

    async fn activate(&self, controller: &mut LifecycleController) -> EventOutcome {
        match controller.activate().await {
            Ok(report) => {
                self.router.serve(Arc::clone(controller.table()));
                EventOutcome::Activated(report)
            }
            Err(e) => {
                error!("Failed to activate new version: {}", e);
                EventOutcome::Faulted {
                    reason: e.to_string(),
                }
            }
        }
    }
}
