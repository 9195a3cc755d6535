//! HTTP endpoint handlers

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use firewatch_core::{AlertPayload, IncidentError, IncidentId, IncidentStatus};

use crate::AppState;

// ============================================================================
// Incident Endpoints
// ============================================================================

/// Request to trigger an incident. Missing fields fall back to configured wording.
#[derive(Debug, Default, Deserialize)]
pub struct TriggerRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Local path of a scene snapshot
    pub image: Option<PathBuf>,
}

/// Response for incident listing
#[derive(Debug, Serialize, Deserialize)]
pub struct IncidentListResponse {
    pub incidents: Vec<IncidentStatus>,
}

/// Trigger a new incident
pub async fn trigger_incident(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TriggerRequest>,
) -> Result<(StatusCode, Json<IncidentStatus>), (StatusCode, String)> {
    let mut payload = AlertPayload::new(
        request.title.unwrap_or_else(|| state.alert.title.clone()),
        request
            .description
            .unwrap_or_else(|| state.alert.description.clone()),
    );
    if let Some(image) = request.image {
        payload = payload.with_image(image);
    }

    let handle = state.dispatcher.trigger(payload).map_err(|e| match e {
        IncidentError::CoolingDown { .. } => (StatusCode::TOO_MANY_REQUESTS, e.to_string()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    })?;

    // The incident runs on its own task; dropping the handle detaches it.
    Ok((StatusCode::ACCEPTED, Json(handle.status())))
}

/// List running incidents, oldest first
pub async fn list_incidents(State(state): State<Arc<AppState>>) -> Json<IncidentListResponse> {
    Json(IncidentListResponse {
        incidents: state.dispatcher.list(),
    })
}

/// Get one incident's status
pub async fn get_incident(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<IncidentStatus>, (StatusCode, String)> {
    let incident_id = parse_id(&id)?;
    state
        .dispatcher
        .status(&incident_id)
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Incident not found: {}", id)))
}

/// Acknowledge an incident from outside the chat
pub async fn stand_down_incident(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let incident_id = parse_id(&id)?;
    let current = state
        .dispatcher
        .status(&incident_id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Incident not found: {}", id)))?;

    if !state.dispatcher.stand_down(&incident_id) {
        return Err((
            StatusCode::CONFLICT,
            format!("Incident {} can no longer be stood down ({})", id, current.state),
        ));
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "incident_id": id,
        "state": current.state.to_string()
    })))
}

fn parse_id(id: &str) -> Result<IncidentId, (StatusCode, String)> {
    IncidentId::parse(id)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid incident id: {}", e)))
}

// ============================================================================
// System Endpoints
// ============================================================================

/// Get system status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let running = state.dispatcher.list().len();
    let finished = state.dispatcher.recent().len();

    Json(serde_json::json!({
        "incidents": {
            "total": running + finished,
            "active": state.dispatcher.active_count(),
            "finished": finished
        },
        "recipients": state.dispatcher.directory().len(),
        "started_at": state.started_at.to_rfc3339()
    }))
}
