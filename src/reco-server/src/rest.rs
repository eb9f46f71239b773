//! REST handlers for recommendation requests, event ingestion, and the
//! operational probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use reco_core::types::{EventKind, InteractionEvent, Recommendation, UserId};
use reco_recommender::{EventFastPath, Orchestrator, RecommendationMode, RecommendationRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub event_fast_path: Arc<EventFastPath>,
    pub start_time: Instant,
}

#[derive(Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RecommendModeRequest {
    Homepage {
        #[serde(default)]
        references: Vec<String>,
    },
    ProductDetail {
        anchor: String,
    },
}

#[derive(Deserialize)]
pub struct RecommendRequest {
    pub user_id: Option<UserId>,
    #[serde(flatten)]
    pub mode: RecommendModeRequest,
    #[serde(default)]
    pub recent_exclusions: Vec<String>,
}

#[derive(Serialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<Recommendation>,
}

/// POST /v1/recommend — run the recall/rank/rerank pipeline for one request.
pub async fn handle_recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, (StatusCode, Json<ErrorResponse>)> {
    let mode = match request.mode {
        RecommendModeRequest::Homepage { references } => {
            RecommendationMode::Homepage { references }
        }
        RecommendModeRequest::ProductDetail { anchor } => RecommendationMode::ProductDetail { anchor },
    };
    let reco_request = RecommendationRequest {
        user_id: request.user_id,
        mode,
        recent_exclusions: request.recent_exclusions,
    };

    match state.orchestrator.recommend(&reco_request).await {
        Ok(recommendations) => Ok(Json(RecommendResponse { recommendations })),
        Err(e) => {
            error!(error = %e, "recommendation request failed");
            metrics::counter!("api.errors").increment(1);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "recommend_failed".to_string(),
                    message: e.to_string(),
                }),
            ))
        }
    }
}

#[derive(Deserialize)]
pub struct EventRequest {
    pub user_id: UserId,
    pub item_id: String,
    pub event_kind: EventKind,
    #[serde(default = "serde_json::Value::default")]
    pub metadata: serde_json::Value,
}

/// POST /v1/events — the event fast-path: commit to context, schedule
/// the durable write, and return without waiting on durability.
pub async fn handle_event(
    State(state): State<AppState>,
    Json(request): Json<EventRequest>,
) -> StatusCode {
    let event = InteractionEvent {
        user_id: request.user_id,
        item_id: request.item_id,
        event_kind: request.event_kind,
        ts: chrono::Utc::now(),
        metadata: request.metadata,
    };
    state.event_fast_path.record(event).await;
    StatusCode::ACCEPTED
}

/// GET /health — liveness with uptime.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — readiness probe for Kubernetes.
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /live — liveness probe for Kubernetes.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}
