use axum::Router;
use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{AppState, config::Settings, controllers::home_controller};

pub mod home_routes;
pub mod user_routes;
pub mod search_routes;
pub mod status_routes;
pub mod alerts_routes;
pub mod realtime_routes;

fn cors(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new();

    let router = home_routes::add_routes(router);
    let router = user_routes::add_routes(router);
    let router = search_routes::add_routes(router);
    let router = status_routes::add_routes(router);
    let router = alerts_routes::add_routes(router);
    let router = realtime_routes::add_routes(router);

    router
        .fallback(home_controller::not_found)
        .layer(from_fn_with_state(state.clone(), crate::auth::require_auth))
        .layer(from_fn_with_state(state.clone(), crate::auth::inject_current_user))
        .layer(cors(&state.settings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
