use std::sync::Arc;

use axum::{routing::get, routing::post, Router};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::agent::{
    DeliveryClient, DistanceGate, EventBridge, LocationSource, PushSource, TrackingParams,
    TrackingSupervisor,
};
use crate::settings::SettingsStore;

use super::api::agent as agent_handlers;
use super::api_doc::ApiDoc;
use super::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Mutex<TrackingSupervisor>>,
    pub source: Arc<PushSource>,
    /// Held for in-process embedders; the HTTP surface itself only polls.
    #[allow(dead_code)]
    pub bridge: EventBridge,
}

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();

    let store = SettingsStore::new(config.settings.file.clone());
    let source = Arc::new(PushSource::new());
    let bridge = EventBridge::new();

    let params = TrackingParams {
        gate: DistanceGate::new(config.agent.distance_threshold_m),
        request: config.agent.subscription_request(),
        delivery: DeliveryClient::new(config.delivery.endpoints(), config.delivery.timeout),
        queue_capacity: config.agent.delivery_queue_capacity,
    };

    let mut supervisor = TrackingSupervisor::new(
        source.clone() as Arc<dyn LocationSource>,
        store,
        bridge.clone(),
        params,
    );

    // boot-time re-entry: tracking resumes only if the operator settings
    // survived the restart
    if let Err(e) = supervisor.resume().await {
        log::warn!("resume after startup failed: {}", e);
    }

    let state = AppState {
        supervisor: Arc::new(Mutex::new(supervisor)),
        source,
        bridge,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // Lifecycle commands from the UI layer
        .route("/api/agent/start", post(agent_handlers::start))
        .route("/api/agent/stop", post(agent_handlers::stop))
        // Status projection
        .route("/api/agent/status", get(agent_handlers::status))
        .route("/api/agent/status/last", get(agent_handlers::status_last))
        // Positioning-subsystem ingest boundary
        .route("/api/agent/fix", post(agent_handlers::ingest))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await
}
