use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::{error::ApiError, services::search_service, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub mod_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuery {
    pub item_id: Option<String>,
    pub item_name: Option<String>,
}

// GET /api/search?modName=...
pub async fn search(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let body = search_service::search_item(&state, &q.mod_name).await?;
    Ok(Json(body).into_response())
}

// GET /api/search/items
pub async fn items(State(state): State<AppState>) -> Result<Response, ApiError> {
    let items = search_service::list_items(&state).await?;
    Ok(Json(items).into_response())
}

// GET /api/search/price?itemId=...&itemName=...
pub async fn price(
    State(state): State<AppState>,
    Query(q): Query<PriceQuery>,
) -> Result<Response, ApiError> {
    let body =
        search_service::preview_price(&state, q.item_name.as_deref(), q.item_id.as_deref()).await?;
    Ok(Json(body).into_response())
}
