//! Axum route handlers for the interview: the HTML page with its form posts,
//! and a JSON API over the same engine.

use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse, Redirect},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::session::Step;
use crate::interview::{EngineError, Phase};
use crate::presenter::page::render_page;
use crate::presenter::{build_view, PageView};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub phase: Phase,
    pub view: PageView,
}

async fn session_response(state: &AppState) -> SessionResponse {
    let snapshot = state.engine.snapshot().await;
    SessionResponse {
        session_id: snapshot.state.session_id,
        phase: snapshot.phase,
        view: build_view(&snapshot),
    }
}

/// Form posts always land back on the page; the page itself shows any error.
fn log_form_outcome<T>(action: &str, result: Result<T, EngineError>) {
    match result {
        Ok(_) => {}
        Err(EngineError::InputTooShort { .. }) => info!("{action}: input below minimum length"),
        Err(e) => warn!("{action}: {e}"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HTML handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /
pub async fn handle_page(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.engine.snapshot().await;
    Html(render_page(&build_view(&snapshot)))
}

/// POST /submit
pub async fn handle_form_submit(
    State(state): State<AppState>,
    Form(form): Form<SubmitRequest>,
) -> Redirect {
    log_form_outcome("submit", state.engine.submit(&form.text).await);
    Redirect::to("/")
}

/// POST /retry
pub async fn handle_form_retry(State(state): State<AppState>) -> Redirect {
    log_form_outcome("retry", state.engine.retry().await);
    Redirect::to("/")
}

/// POST /restart
pub async fn handle_restart(State(state): State<AppState>) -> Redirect {
    state.engine.restart().await;
    Redirect::to("/")
}

/// GET /export
///
/// Downloads the session export document as a JSON attachment.
pub async fn handle_export(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let (session_id, document) = state.engine.export().await;
    let body = serde_json::to_string_pretty(&document)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize export: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"career-session-{session_id}.json\""),
            ),
        ],
        body,
    ))
}

// ────────────────────────────────────────────────────────────────────────────
// JSON handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/session
pub async fn handle_get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(session_response(&state).await)
}

/// POST /api/submit
pub async fn handle_api_submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    state.engine.submit(&request.text).await?;
    Ok(Json(session_response(&state).await))
}

/// POST /api/retry
pub async fn handle_api_retry(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, AppError> {
    state.engine.retry().await?;
    Ok(Json(session_response(&state).await))
}

/// GET /api/deliverable
///
/// The deliverable's markdown source, exactly as the copy action writes it.
pub async fn handle_deliverable(State(state): State<AppState>) -> Result<String, AppError> {
    let snapshot = state.engine.snapshot().await;
    if !snapshot.state.complete {
        return Err(AppError::NotFound(
            "The deliverable is available once the interview is complete".to_string(),
        ));
    }
    snapshot
        .state
        .reaction(Step::Five)
        .map(String::from)
        .ok_or_else(|| AppError::NotFound("No deliverable recorded".to_string()))
}
