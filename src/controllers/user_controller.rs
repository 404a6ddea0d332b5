use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{error::ApiError, models::CurrentUser};

pub async fn me(user: Option<Extension<CurrentUser>>) -> Response {
    match user {
        Some(Extension(u)) => (StatusCode::OK, Json(u)).into_response(),
        None => ApiError::Unauthorized.into_response(),
    }
}

pub async fn check(user: Option<Extension<CurrentUser>>) -> impl IntoResponse {
    Json(json!({ "isAuthenticated": user.is_some() }))
}
