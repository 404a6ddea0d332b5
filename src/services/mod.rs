pub mod market_client;
pub mod status_client;
pub mod db_init;
pub mod price_resolver;
pub mod alert_monitor;

pub mod alerts_service;
pub mod search_service;
pub mod status_service;
