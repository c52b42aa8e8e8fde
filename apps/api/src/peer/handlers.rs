use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::peer::{generate_peer_questions, PeerDiscussionRequest, PeerDiscussionResponse};
use crate::state::AppState;

/// POST /api/peer-discussion
pub async fn handle_peer_discussion(
    State(state): State<AppState>,
    Json(request): Json<PeerDiscussionRequest>,
) -> Result<Json<PeerDiscussionResponse>, AppError> {
    let response = generate_peer_questions(state.llm.as_ref(), &request).await?;
    Ok(Json(response))
}
