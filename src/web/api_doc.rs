use utoipa::OpenApi;

use crate::agent::{AgentStatus, PositionFix, PositionUpdate, SessionMode, StartOutcome};

use super::api::agent::StartResponse;
use super::api::error::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::agent::start,
        super::api::agent::stop,
        super::api::agent::status,
        super::api::agent::status_last,
        super::api::agent::ingest,
    ),
    components(
        schemas(
            StartResponse,
            StartOutcome,
            SessionMode,
            AgentStatus,
            PositionFix,
            PositionUpdate,
            ErrorResponse,
        )
    ),
    info(
        title = "Trackd Agent API",
        description = "Control and status API for the background location-reporting agent",
        version = "0.1.0"
    ),
    tags(
        (name = "agent", description = "Tracking lifecycle, status, and fix ingest")
    )
)]
pub struct ApiDoc;
