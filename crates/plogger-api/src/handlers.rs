//! Route handler functions for all API endpoints.
//!
//! Flow handlers resolve the request's session, hold its lock for the whole
//! flow, and return the flow outcome as a 200 JSON body.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use plogger_chat::{
    ImageChatOutcome, LocationOutcome, RecommendOutcome, RecommendRequest, TrashOutcome,
    TrashbagOutcome,
};
use plogger_core::types::{Message, Place};

use crate::error::ApiError;
use crate::state::{AppState, SessionHandle};

/// Longest accepted client-chosen session id.
const MAX_SESSION_ID_LEN: usize = 128;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ExtractLocationRequest {
    pub user_message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendPlaceRequest {
    pub user_message: String,
    pub area_name: String,
    pub sigungu_name: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageChatRequest {
    pub user_message: String,
    pub image_url: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrashbagRequest {
    pub prompt: String,
    /// `data:image/...` URI or image URL.
    pub image_base64: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrashRagRequest {
    pub area_name: String,
    pub sigungu_name: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub conversation_length: usize,
    pub active_sessions: usize,
    pub uptime_secs: u64,
    pub endpoints: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub messages: Vec<Message>,
    pub candidates: Vec<Place>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryCleared {
    pub session_id: String,
    pub removed: usize,
}

// =============================================================================
// Helpers
// =============================================================================

/// Resolve the body's `session_id`, rejecting blank or oversized ids.
fn session_for(state: &AppState, session_id: Option<&str>) -> Result<SessionHandle, ApiError> {
    if let Some(id) = session_id {
        if id.trim().is_empty() {
            return Err(ApiError::BadRequest("session_id must not be blank".to_string()));
        }
        if id.len() > MAX_SESSION_ID_LEN {
            return Err(ApiError::BadRequest(format!(
                "session_id must be at most {} bytes",
                MAX_SESSION_ID_LEN
            )));
        }
    }
    Ok(state.sessions.resolve(session_id))
}

fn existing_session(state: &AppState, id: &str) -> Result<SessionHandle, ApiError> {
    state
        .sessions
        .get(id)
        .ok_or_else(|| ApiError::NotFound(format!("session '{}' not found", id)))
}

// =============================================================================
// Status
// =============================================================================

/// GET / - liveness and endpoint listing.
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let conversation_length = state.sessions.default_session().lock().await.len();
    let endpoints = [
        ("location_extract", "/location/extract"),
        ("place_recommend", "/recommend/place"),
        ("image_chat", "/chat/image"),
        ("trashbag_evaluate", "/evaluate/trashbag"),
        ("trash_locations", "/location/trashRAG"),
        ("sessions", "/sessions"),
    ]
    .into_iter()
    .map(|(name, path)| (name.to_string(), path.to_string()))
    .collect();

    Json(RootResponse {
        message: "🚀 플로깅 추천 API 서버가 정상 작동중입니다!".to_string(),
        conversation_length,
        active_sessions: state.sessions.len(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        endpoints,
    })
}

// =============================================================================
// Flows
// =============================================================================

/// POST /location/extract
pub async fn extract_location(
    State(state): State<AppState>,
    Json(req): Json<ExtractLocationRequest>,
) -> Result<Json<LocationOutcome>, ApiError> {
    let session = session_for(&state, req.session_id.as_deref())?;
    let mut conversation = session.lock().await;
    let outcome = state
        .orchestrator
        .extract_location(&mut conversation, &req.user_message)
        .await;
    Ok(Json(outcome))
}

/// POST /recommend/place
pub async fn recommend_place(
    State(state): State<AppState>,
    Json(req): Json<RecommendPlaceRequest>,
) -> Result<Json<RecommendOutcome>, ApiError> {
    let session = session_for(&state, req.session_id.as_deref())?;
    let request = RecommendRequest {
        user_message: req.user_message,
        area_name: req.area_name,
        sigungu_name: req.sigungu_name,
    };
    let mut conversation = session.lock().await;
    let outcome = state
        .orchestrator
        .recommend_place(&mut conversation, &request)
        .await;
    Ok(Json(outcome))
}

/// POST /chat/image
pub async fn image_chat(
    State(state): State<AppState>,
    Json(req): Json<ImageChatRequest>,
) -> Result<Json<ImageChatOutcome>, ApiError> {
    let session = session_for(&state, req.session_id.as_deref())?;
    let mut conversation = session.lock().await;
    let outcome = state
        .orchestrator
        .image_chat(&mut conversation, &req.user_message, &req.image_url)
        .await;
    Ok(Json(outcome))
}

/// POST /evaluate/trashbag
pub async fn evaluate_trashbag(
    State(state): State<AppState>,
    Json(req): Json<TrashbagRequest>,
) -> Result<Json<TrashbagOutcome>, ApiError> {
    let session = session_for(&state, req.session_id.as_deref())?;
    let mut conversation = session.lock().await;
    let outcome = state
        .orchestrator
        .evaluate_trashbag(&mut conversation, &req.prompt, &req.image_base64)
        .await;
    Ok(Json(outcome))
}

/// POST /location/trashRAG
pub async fn trash_locations(
    State(state): State<AppState>,
    Json(req): Json<TrashRagRequest>,
) -> Result<Json<TrashOutcome>, ApiError> {
    let session = session_for(&state, req.session_id.as_deref())?;
    let mut conversation = session.lock().await;
    let outcome = state
        .orchestrator
        .trash_locations(&mut conversation, &req.area_name, &req.sigungu_name)
        .await;
    Ok(Json(outcome))
}

// =============================================================================
// Sessions
// =============================================================================

/// POST /sessions
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionCreated>) {
    let session_id = state.sessions.create();
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

/// GET /sessions/{id}/history
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session = existing_session(&state, &id)?;
    let conversation = session.lock().await;
    Ok(Json(HistoryResponse {
        session_id: id,
        messages: conversation.history(),
        candidates: conversation.candidates(),
    }))
}

/// DELETE /sessions/{id}/history
pub async fn clear_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryCleared>, ApiError> {
    let session = existing_session(&state, &id)?;
    let mut conversation = session.lock().await;
    let removed = conversation.len();
    conversation.clear();
    info!(session_id = %id, removed, "History cleared via API");
    Ok(Json(HistoryCleared {
        session_id: id,
        removed,
    }))
}
