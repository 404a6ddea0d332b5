use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    error::ApiError,
    models::{
        dto::{CreatePriceAlertDto, UpdatePriceAlertDto},
        CurrentUser,
    },
    services::alerts_service,
    AppState,
};

pub(crate) fn require_user(user: Option<Extension<CurrentUser>>) -> Result<CurrentUser, ApiError> {
    match user {
        Some(Extension(u)) => Ok(u),
        None => Err(ApiError::Unauthorized),
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(v)) => Ok(v),
        Err(e) => Err(ApiError::Validation(e.body_text())),
    }
}

// GET /api/alerts
pub async fn list_alerts(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Response, ApiError> {
    let u = require_user(user)?;
    let alerts = alerts_service::list_alerts(&state, &u.id).await?;
    Ok(Json(alerts).into_response())
}

// GET /api/alerts/:id
pub async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Response, ApiError> {
    let u = require_user(user)?;
    let alert = alerts_service::get_alert(&state, &u.id, &id).await?;
    Ok(Json(alert).into_response())
}

// POST /api/alerts
pub async fn create_alert(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    payload: Result<Json<CreatePriceAlertDto>, JsonRejection>,
) -> Result<Response, ApiError> {
    let u = require_user(user)?;
    let dto = json_body(payload)?;

    let alert = alerts_service::create_alert(&state, &u.id, &dto).await?;
    Ok((StatusCode::CREATED, Json(alert)).into_response())
}

// PUT /api/alerts/:id
pub async fn update_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
    payload: Result<Json<UpdatePriceAlertDto>, JsonRejection>,
) -> Result<Response, ApiError> {
    let u = require_user(user)?;
    let dto = json_body(payload)?;

    let alert = alerts_service::update_alert(&state, &u.id, &id, &dto).await?;
    Ok(Json(alert).into_response())
}

// DELETE /api/alerts/:id
pub async fn delete_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Response, ApiError> {
    let u = require_user(user)?;
    alerts_service::delete_alert(&state, &u.id, &id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// POST /api/alerts/:id/acknowledge
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Response, ApiError> {
    let u = require_user(user)?;
    let alert = alerts_service::acknowledge_alert(&state, &u.id, &id).await?;
    Ok(Json(alert).into_response())
}

// GET /api/alerts/notifications/unread
pub async fn unread_notifications(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Response, ApiError> {
    let u = require_user(user)?;
    let items = alerts_service::unread_notifications(&state, &u.id).await?;
    Ok(Json(items).into_response())
}

// POST /api/alerts/notifications/:id/read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Response, ApiError> {
    let u = require_user(user)?;
    let n = alerts_service::mark_notification_read(&state, &u.id, &id).await?;
    Ok(Json(n).into_response())
}
