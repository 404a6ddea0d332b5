use axum::{Router, routing::{get, post}};
use crate::{AppState, controllers::alerts_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/alerts",
            get(alerts_controller::list_alerts).post(alerts_controller::create_alert),
        )
        .route(
            "/api/alerts/notifications/unread",
            get(alerts_controller::unread_notifications),
        )
        .route(
            "/api/alerts/notifications/:id/read",
            post(alerts_controller::mark_notification_read),
        )
        .route(
            "/api/alerts/:id",
            get(alerts_controller::get_alert)
                .put(alerts_controller::update_alert)
                .delete(alerts_controller::delete_alert),
        )
        .route("/api/alerts/:id/acknowledge", post(alerts_controller::acknowledge_alert))
}
