pub mod error;
pub mod itinerary;
pub mod routing;
pub mod session;

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use shared::{Ack, NodeId, OptimizeResponse, Preferences, RouteStatus, SegmentRequest, SegmentResponse};
use tower_http::cors::{Any, CorsLayer};

use crate::error::BackendError;
use crate::routing::{approximate_distance_km, generate_segment};
use crate::session::{MarkerClose, RouteSession};

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RouteSession>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/reset", get(reset_handler))
        .route("/optimize", post(optimize_handler))
        .route("/status", get(status_handler))
        .route("/marker-close", post(marker_close_handler))
        .route("/api/route", post(segment_handler))
        .layer(cors)
        .with_state(state)
}

/// Lenient body so missing endpoints map to our own 400 instead of a
/// deserialization rejection.
#[derive(Debug, Deserialize)]
struct OptimizeBody {
    source: Option<String>,
    destination: Option<String>,
    #[serde(default)]
    preferences: Preferences,
}

#[derive(Debug, Deserialize)]
struct MarkerCloseBody {
    node: Option<NodeId>,
}

async fn reset_handler(State(state): State<AppState>) -> Json<Ack> {
    state.session.reset().await;
    Json(Ack {
        status: "reset".to_string(),
    })
}

async fn optimize_handler(
    State(state): State<AppState>,
    Json(body): Json<OptimizeBody>,
) -> Result<Json<OptimizeResponse>, BackendError> {
    let source = non_blank(body.source).ok_or(BackendError::MissingEndpoints)?;
    let destination = non_blank(body.destination).ok_or(BackendError::MissingEndpoints)?;
    tracing::debug!(preferences = ?body.preferences, "optimize {source} -> {destination}");

    let response = state.session.optimize(&source, &destination).await;
    Ok(Json(response))
}

async fn status_handler(State(state): State<AppState>) -> Json<RouteStatus> {
    Json(state.session.status().await)
}

async fn marker_close_handler(
    State(state): State<AppState>,
    Json(body): Json<MarkerCloseBody>,
) -> Result<Json<Ack>, BackendError> {
    let node = body.node.ok_or(BackendError::MissingNode)?;
    let status = match state.session.marker_close(&node).await {
        MarkerClose::Accepted => "ok",
        MarkerClose::Ignored => "ignored",
    };
    Ok(Json(Ack {
        status: status.to_string(),
    }))
}

async fn segment_handler(Json(req): Json<SegmentRequest>) -> Json<SegmentResponse> {
    let path = generate_segment(&req);
    let distance_km = approximate_distance_km(&path);
    Json(SegmentResponse { path, distance_km })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
