use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::settings::SettingsStore;

use super::bridge::EventBridge;
use super::delivery::DeliveryClient;
use super::error::AgentError;
use super::fix::PositionUpdate;
use super::gate::DistanceGate;
use super::source::{LocationSource, SubscriptionRequest};
use super::worker::{run_sample_loop, WorkerContext};

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub enum SessionMode {
    Stopped,
    Starting,
    Active {
        session_id: String,
        job_number: String,
        started: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct AgentStatus {
    pub session: SessionMode,
    pub last_update: Option<PositionUpdate>,
}

/// What `start()` did. All three are normal outcomes; only environmental
/// subscription failures surface as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    AlreadyActive,
    NotConfigured,
}

pub(super) struct Shared {
    pub status: AgentStatus,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            status: AgentStatus {
                session: SessionMode::Stopped,
                last_update: None,
            },
        }
    }
}

struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Per-session knobs resolved from configuration at construction time.
pub struct TrackingParams {
    pub gate: DistanceGate,
    pub request: SubscriptionRequest,
    pub delivery: DeliveryClient,
    pub queue_capacity: usize,
}

/// Owns the tracking lifecycle: resolves operator settings, subscribes to
/// the positioning source, and supervises the per-session sample worker.
pub struct TrackingSupervisor {
    source: Arc<dyn LocationSource>,
    store: SettingsStore,
    bridge: EventBridge,
    params: TrackingParams,
    shared: Arc<StdMutex<Shared>>,
    worker: Option<WorkerHandle>,
}

impl TrackingSupervisor {
    pub fn new(
        source: Arc<dyn LocationSource>,
        store: SettingsStore,
        bridge: EventBridge,
        params: TrackingParams,
    ) -> Self {
        Self {
            source,
            store,
            bridge,
            params,
            shared: Arc::new(StdMutex::new(Shared::default())),
            worker: None,
        }
    }

    pub fn status(&self) -> AgentStatus {
        self.shared.lock().unwrap().status.clone()
    }

    /// Begin a tracking session. A no-op while one is active or while the
    /// operator settings are incomplete ("not yet configured" is the normal
    /// state right after installation).
    pub async fn start(&mut self) -> Result<StartOutcome, AgentError> {
        if self.worker.as_ref().is_some_and(|w| !w.join.is_finished()) {
            return Ok(StartOutcome::AlreadyActive);
        }

        let credentials = match self.store.load()? {
            Some(credentials) => credentials,
            None => {
                log::info!("operator settings incomplete, tracking not started");
                return Ok(StartOutcome::NotConfigured);
            }
        };

        self.set_session(SessionMode::Starting);

        let fixes = match self.source.subscribe(&self.params.request) {
            Ok(rx) => rx,
            Err(err) => {
                self.set_session(SessionMode::Stopped);
                return Err(AgentError::Subscription(err));
            }
        };

        let session_id = uuid::Uuid::new_v4().to_string();
        let job_number = credentials.job_number.clone();
        log::info!(
            "tracking session {} started for operator {}",
            session_id,
            job_number
        );

        let ctx = WorkerContext {
            shared: self.shared.clone(),
            gate: self.params.gate,
            delivery: self.params.delivery.clone(),
            bridge: self.bridge.clone(),
            credentials,
            queue_capacity: self.params.queue_capacity,
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_sample_loop(ctx, fixes, stop_rx));
        self.worker = Some(WorkerHandle { stop_tx, join });

        self.set_session(SessionMode::Active {
            session_id,
            job_number,
            started: Utc::now(),
        });

        Ok(StartOutcome::Started)
    }

    /// End the session: release the subscription and clear the last-known
    /// fix. Safe to call when already stopped.
    pub async fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.await;
            log::info!("tracking session stopped");
        }

        let mut locked = self.shared.lock().unwrap();
        locked.status.session = SessionMode::Stopped;
        locked.status.last_update = None;
    }

    /// Re-entry after an external restart (process kill, device reboot):
    /// resume tracking only when the operator settings are already in place.
    pub async fn resume(&mut self) -> Result<StartOutcome, AgentError> {
        let outcome = self.start().await?;
        match outcome {
            StartOutcome::Started => log::info!("tracking resumed after restart"),
            StartOutcome::NotConfigured => {
                log::info!("not configured yet, waiting for start command")
            }
            StartOutcome::AlreadyActive => {}
        }
        Ok(outcome)
    }

    fn set_session(&self, session: SessionMode) {
        self.shared.lock().unwrap().status.session = session;
    }
}
