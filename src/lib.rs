//! Library entrypoint for the Warframe utilities backend.
//!
//! Integration tests under `tests/` build an [`AppState`] over the in-memory
//! store and drive the routers, services and alert monitor directly.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod store;

#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

pub mod controllers;
pub mod routes;

use services::{market_client::MarketClient, price_resolver::PriceResolver, status_client::StatusClient};
use store::AlertStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AlertStore>,
    pub settings: config::Settings,
    pub market: MarketClient,
    pub prices: Arc<PriceResolver>,
    pub status: StatusClient,
    pub events_tx: tokio::sync::broadcast::Sender<String>,
}

impl AppState {
    /// Wires the upstream clients from `settings` around an already opened store.
    pub fn build(settings: config::Settings, store: Arc<dyn AlertStore>) -> Result<Self, reqwest::Error> {
        let http = services::market_client::build_http_client(settings.http_timeout())?;

        let market = MarketClient::new(http.clone(), settings.market_api_url.clone());
        let status = StatusClient::new(http, settings.status_api_url.clone(), settings.status_platform.clone());
        let prices = Arc::new(PriceResolver::for_market(market.clone()));

        Ok(Self {
            store,
            settings,
            market,
            prices,
            status,
            events_tx: events::channel(),
        })
    }
}
