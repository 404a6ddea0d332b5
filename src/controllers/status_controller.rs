use axum::{extract::State, response::IntoResponse, Json};

use crate::{error::ApiError, services::status_service, AppState};

// GET /api/gamestatus
pub async fn game_status(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(status_service::game_status(&state).await?))
}
