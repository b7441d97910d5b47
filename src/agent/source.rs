use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use super::fix::PositionFix;

/// Capacity of the channel between the positioning source and the sample
/// worker.
const FIX_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("positioning request cannot be satisfied: {0}")]
    Unsatisfiable(String),
    #[error("a positioning subscription is already active")]
    AlreadySubscribed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyTier {
    #[default]
    High,
    Balanced,
    LowPower,
}

/// Parameters handed to the positioning subsystem when a session starts.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionRequest {
    pub accuracy: AccuracyTier,
    /// Base update cadence requested from the platform.
    pub interval: Duration,
    /// Fastest cadence the worker is prepared to see.
    pub min_interval: Duration,
    /// Upper bound on platform-side batching of updates.
    pub max_delay: Duration,
}

impl Default for SubscriptionRequest {
    fn default() -> Self {
        Self {
            accuracy: AccuracyTier::High,
            interval: Duration::from_secs(10),
            min_interval: Duration::from_secs(5),
            max_delay: Duration::from_secs(15),
        }
    }
}

/// Boundary to the platform positioning subsystem.
///
/// A successful `subscribe` is the platform's confirmation of the request;
/// fixes then arrive on the returned channel until the receiver is dropped.
/// Errors here mean the platform denied or could not satisfy the request,
/// not that the agent is misconfigured.
pub trait LocationSource: Send + Sync {
    fn subscribe(
        &self,
        request: &SubscriptionRequest,
    ) -> Result<mpsc::Receiver<PositionFix>, SourceError>;
}

/// Source fed by an external process pushing fixes in.
///
/// The deployed binary wires this to the ingest endpoint: the platform shell
/// POSTs raw fixes, which land on the active session's channel.
#[derive(Default)]
pub struct PushSource {
    tx: Mutex<Option<mpsc::Sender<PositionFix>>>,
}

impl PushSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand a fix to the active subscription. Returns false when no session
    /// is subscribed (or the worker has gone away).
    pub fn push(&self, fix: PositionFix) -> bool {
        let mut guard = self.tx.lock().unwrap();
        let Some(tx) = guard.as_ref() else {
            return false;
        };

        match tx.try_send(fix) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("fix channel full, dropping sample");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                *guard = None;
                false
            }
        }
    }
}

impl LocationSource for PushSource {
    fn subscribe(
        &self,
        request: &SubscriptionRequest,
    ) -> Result<mpsc::Receiver<PositionFix>, SourceError> {
        let mut guard = self.tx.lock().unwrap();
        if guard.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(SourceError::AlreadySubscribed);
        }

        log::debug!(
            "push source subscribed ({:?}, interval {:?})",
            request.accuracy,
            request.interval
        );

        let (tx, rx) = mpsc::channel(FIX_CHANNEL_CAPACITY);
        *guard = Some(tx);
        Ok(rx)
    }
}
