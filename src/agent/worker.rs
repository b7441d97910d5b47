use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{mpsc, oneshot};

use crate::settings::OperatorCredentials;

use super::bridge::EventBridge;
use super::delivery::{DeliveryClient, DeliveryRecord};
use super::fix::{PositionFix, PositionUpdate};
use super::gate::DistanceGate;
use super::supervisor::Shared;

pub(super) struct WorkerContext {
    pub shared: Arc<StdMutex<Shared>>,
    pub gate: DistanceGate,
    pub delivery: DeliveryClient,
    pub bridge: EventBridge,
    pub credentials: OperatorCredentials,
    pub queue_capacity: usize,
}

/// Per-session sample loop: drains the fix channel until stopped or the
/// subscription ends.
///
/// The last accepted fix lives here as a local, so it has exactly one writer
/// and dies with the session. Sends go through a bounded queue drained by a
/// single task, keeping at most one HTTP attempt in flight and preserving
/// arrival order without blocking fix processing.
pub(super) async fn run_sample_loop(
    ctx: WorkerContext,
    mut fixes: mpsc::Receiver<PositionFix>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let (queue_tx, queue_rx) = mpsc::channel(ctx.queue_capacity);
    tokio::spawn(run_delivery_queue(ctx.delivery.clone(), queue_rx));

    let mut last_sent: Option<PositionFix> = None;

    loop {
        let fix = tokio::select! {
            _ = &mut stop_rx => break,
            received = fixes.recv() => match received {
                Some(fix) => fix,
                // subscription ended underneath us
                None => break,
            },
        };

        process_fix(&ctx, &queue_tx, &mut last_sent, fix);
    }

    // dropping the queue lets any already dispatched send finish on its own
}

fn process_fix(
    ctx: &WorkerContext,
    queue_tx: &mpsc::Sender<DeliveryRecord>,
    last_sent: &mut Option<PositionFix>,
    fix: PositionFix,
) {
    let update = PositionUpdate::from(&fix);

    // the status projection tracks every fix, significant or not
    {
        let mut locked = ctx.shared.lock().unwrap();
        locked.status.last_update = Some(update.clone());
    }

    if !ctx.gate.should_accept(&fix, last_sent.as_ref()) {
        log::debug!("fix within threshold of last sent, not reporting");
        return;
    }

    let record = DeliveryRecord::new(&ctx.credentials, &fix);
    match queue_tx.try_send(record) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            log::warn!("delivery queue full, dropping report");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            log::error!("delivery queue closed, dropping report");
        }
    }

    ctx.bridge.publish(update);

    // accepted locally even if delivery later fails, so a stale fix is never
    // re-sent in a storm
    *last_sent = Some(fix);
}

async fn run_delivery_queue(client: DeliveryClient, mut queue: mpsc::Receiver<DeliveryRecord>) {
    while let Some(record) = queue.recv().await {
        if let Err(err) = client.send(&record).await {
            log::warn!("location report dropped: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::extract::Json;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::post;
    use axum::Router;
    use chrono::Utc;

    use super::*;

    const METER_LAT: f64 = 1.0 / 111_195.0;

    fn fix_at(latitude: f64, longitude: f64) -> PositionFix {
        PositionFix {
            latitude,
            longitude,
            accuracy: 5.0,
            speed: 0.0,
            heading: None,
            timestamp: Utc::now(),
        }
    }

    /// Local collection endpoint recording every JSON body it receives.
    async fn spawn_collector(
        status: AxumStatus,
    ) -> (String, Arc<StdMutex<Vec<serde_json::Value>>>) {
        let bodies: Arc<StdMutex<Vec<serde_json::Value>>> = Arc::new(StdMutex::new(Vec::new()));
        let recorded = bodies.clone();

        let app = Router::new().route(
            "/locations",
            post(move |Json(body): Json<serde_json::Value>| {
                let recorded = recorded.clone();
                async move {
                    recorded.lock().unwrap().push(body);
                    status
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/locations", addr), bodies)
    }

    struct Harness {
        fix_tx: mpsc::Sender<PositionFix>,
        stop_tx: oneshot::Sender<()>,
        join: tokio::task::JoinHandle<()>,
        shared: Arc<StdMutex<Shared>>,
        bridge: EventBridge,
    }

    fn spawn_worker(endpoint: String) -> Harness {
        let shared = Arc::new(StdMutex::new(Shared::default()));
        let bridge = EventBridge::new();
        let ctx = WorkerContext {
            shared: shared.clone(),
            gate: DistanceGate::new(10.0),
            delivery: DeliveryClient::new(vec![endpoint], Duration::from_secs(5)),
            bridge: bridge.clone(),
            credentials: OperatorCredentials {
                job_number: "E100".to_string(),
                api_key: "k1".to_string(),
            },
            queue_capacity: 8,
        };

        let (fix_tx, fix_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_sample_loop(ctx, fix_rx, stop_rx));

        Harness {
            fix_tx,
            stop_tx,
            join,
            shared,
            bridge,
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met within 2s");
    }

    #[tokio::test]
    async fn first_fix_is_sent_with_credentials() {
        let (endpoint, bodies) = spawn_collector(AxumStatus::OK).await;
        let harness = spawn_worker(endpoint);

        harness.fix_tx.send(fix_at(24.0, 46.0)).await.unwrap();

        wait_until(|| bodies.lock().unwrap().len() == 1).await;
        let body = bodies.lock().unwrap()[0].clone();
        assert_eq!(body["job_number"], "E100");
        assert_eq!(body["api_key"], "k1");
        assert_eq!(body["latitude"], 24.0);
        assert_eq!(body["longitude"], 46.0);
        assert_eq!(body["accuracy"], 5.0);

        let status = harness.shared.lock().unwrap().status.clone();
        assert!(status.last_update.is_some());
    }

    #[tokio::test]
    async fn sub_threshold_fix_updates_status_but_is_not_sent() {
        let (endpoint, bodies) = spawn_collector(AxumStatus::OK).await;
        let harness = spawn_worker(endpoint);

        harness.fix_tx.send(fix_at(24.0, 46.0)).await.unwrap();
        wait_until(|| bodies.lock().unwrap().len() == 1).await;

        // 3 meters north of the first fix
        let nearby = fix_at(24.0 + 3.0 * METER_LAT, 46.0);
        let nearby_lat = nearby.latitude;
        harness.fix_tx.send(nearby).await.unwrap();

        wait_until(|| {
            let locked = harness.shared.lock().unwrap();
            locked
                .status
                .last_update
                .as_ref()
                .is_some_and(|u| u.latitude == nearby_lat)
        })
        .await;

        // the status projection moved, the server saw only the first fix
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(bodies.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fix_beyond_threshold_is_sent_and_becomes_the_new_reference() {
        let (endpoint, bodies) = spawn_collector(AxumStatus::OK).await;
        let harness = spawn_worker(endpoint);

        harness.fix_tx.send(fix_at(24.0, 46.0)).await.unwrap();
        wait_until(|| bodies.lock().unwrap().len() == 1).await;

        let moved = fix_at(24.0 + 15.0 * METER_LAT, 46.0);
        let moved_lat = moved.latitude;
        harness.fix_tx.send(moved).await.unwrap();
        wait_until(|| bodies.lock().unwrap().len() == 2).await;
        assert_eq!(bodies.lock().unwrap()[1]["latitude"], moved_lat);

        // 3 meters past the second fix: inside the threshold of the new
        // reference, so nothing more is sent
        harness
            .fix_tx
            .send(fix_at(moved_lat + 3.0 * METER_LAT, 46.0))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(bodies.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delivery_failures_do_not_stall_the_loop() {
        let (endpoint, bodies) = spawn_collector(AxumStatus::INTERNAL_SERVER_ERROR).await;
        let harness = spawn_worker(endpoint);

        harness.fix_tx.send(fix_at(24.0, 46.0)).await.unwrap();
        harness
            .fix_tx
            .send(fix_at(24.0 + 20.0 * METER_LAT, 46.0))
            .await
            .unwrap();

        // both accepted fixes were attempted even though every send failed
        wait_until(|| bodies.lock().unwrap().len() == 2).await;

        let status = harness.shared.lock().unwrap().status.clone();
        assert!(status.last_update.is_some());
        assert!(!harness.join.is_finished());
    }

    #[tokio::test]
    async fn accepted_fixes_are_published_to_the_bridge() {
        let (endpoint, _bodies) = spawn_collector(AxumStatus::OK).await;
        let harness = spawn_worker(endpoint);
        let mut events = harness.bridge.subscribe();

        harness.fix_tx.send(fix_at(24.0, 46.0)).await.unwrap();
        wait_until(|| harness.shared.lock().unwrap().status.last_update.is_some()).await;

        let event = events.try_recv().unwrap();
        assert_eq!(event.latitude, 24.0);

        // rejected fix: status moves, no event
        let nearby = fix_at(24.0 + 3.0 * METER_LAT, 46.0);
        let nearby_lat = nearby.latitude;
        harness.fix_tx.send(nearby).await.unwrap();
        wait_until(|| {
            let locked = harness.shared.lock().unwrap();
            locked
                .status
                .last_update
                .as_ref()
                .is_some_and(|u| u.latitude == nearby_lat)
        })
        .await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn stop_signal_ends_the_loop() {
        let (endpoint, _bodies) = spawn_collector(AxumStatus::OK).await;
        let harness = spawn_worker(endpoint);

        harness.stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), harness.join)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn closed_source_channel_ends_the_loop() {
        let (endpoint, _bodies) = spawn_collector(AxumStatus::OK).await;
        let harness = spawn_worker(endpoint);

        drop(harness.fix_tx);
        tokio::time::timeout(Duration::from_secs(1), harness.join)
            .await
            .unwrap()
            .unwrap();
    }
}
