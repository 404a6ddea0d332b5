use axum::{
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{config::Settings, error::ApiError, models::CurrentUser, AppState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    // opaque user id from the identity provider
    pub sub: String,
    // expiry (unix timestamp seconds)
    pub exp: usize,
}

/// Signs a session token for `user_id`, valid for `days`.
pub fn issue_token(settings: &Settings, user_id: &str, days: i64) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = chrono::Utc::now() + chrono::Duration::days(days);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: exp.timestamp().max(0) as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
}

pub fn decode_token(settings: &Settings, token: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &validation,
    )
    .ok()
    .map(|data| data.claims)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ").or_else(|| raw.strip_prefix("bearer "))?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn request_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    jar.get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| bearer_token(headers))
}

pub async fn inject_current_user(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let cookie_name = state.settings.jwt_cookie_name.as_str();

    if let Some(token) = request_token(req.headers(), cookie_name) {
        match decode_token(&state.settings, &token) {
            Some(claims) if !claims.sub.trim().is_empty() => {
                req.extensions_mut().insert(CurrentUser { id: claims.sub });
            }
            _ => tracing::debug!("ignoring invalid session token"),
        }
    }

    next.run(req).await
}

fn is_protected_path(path: &str) -> bool {
    path == "/api/alerts"
        || path.starts_with("/api/alerts/")
        || path == "/api/events"
        || path == "/api/user/me"
}

pub async fn require_auth(
    State(_state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if !is_protected_path(req.uri().path()) {
        return next.run(req).await;
    }

    // inject_current_user runs first; an extension means the token checked out
    if req.extensions().get::<CurrentUser>().is_some() {
        return next.run(req).await;
    }

    ApiError::Unauthorized.into_response()
}
