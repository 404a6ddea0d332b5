use axum::{Router, routing::get};
use crate::{AppState, controllers::status_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/api/gamestatus", get(status_controller::game_status))
}
