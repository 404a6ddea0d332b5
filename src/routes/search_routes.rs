use axum::{Router, routing::get};
use crate::{AppState, controllers::search_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/search", get(search_controller::search))
        .route("/api/search/items", get(search_controller::items))
        .route("/api/search/price", get(search_controller::price))
}
