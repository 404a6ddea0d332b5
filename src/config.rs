use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    pub store_backend: StoreBackend,
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub mongodb_transactions: bool,

    pub jwt_secret: String,
    pub jwt_cookie_name: String,

    pub market_api_url: String,
    pub status_api_url: String,
    pub status_platform: String,
    pub http_timeout_secs: u64,

    pub alert_check_interval_secs: u64,
    pub alert_check_concurrency: usize,

    pub cors_origins: Vec<String>,
}

impl Settings {
    pub fn alert_check_interval(&self) -> Duration {
        Duration::from_secs(self.alert_check_interval_secs.max(1))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_bool(key: &str, default: bool) -> bool {
    match env::var(key).map(|v| v.trim().to_ascii_lowercase()) {
        Ok(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Ok(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let store_backend = match var_or("STORE_BACKEND", "mongo").to_ascii_lowercase().as_str() {
        "memory" => StoreBackend::Memory,
        _ => StoreBackend::Mongo,
    };

    let cors_origins = var_or("CORS_ORIGINS", "http://localhost:3000,http://localhost:3001")
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    Settings {
        host: var_or("HOST", "127.0.0.1"),
        port: parse_or("PORT", 5000),

        store_backend,
        mongodb_uri: var_or("MONGODB_URI", "mongodb://localhost:27017"),
        mongodb_db: var_or("MONGODB_DB", "warframe_utils"),
        mongodb_transactions: parse_bool("MONGODB_TRANSACTIONS", true),

        jwt_secret: var_or("JWT_SECRET", "change-me-dev-secret"),
        jwt_cookie_name: var_or("JWT_COOKIE_NAME", "auth"),

        market_api_url: var_or("MARKET_API_URL", "https://api.warframe.market/v2")
            .trim_end_matches('/')
            .to_string(),
        status_api_url: var_or("STATUS_API_URL", "https://api.warframestat.us")
            .trim_end_matches('/')
            .to_string(),
        status_platform: var_or("STATUS_PLATFORM", "pc"),
        http_timeout_secs: parse_or("HTTP_TIMEOUT_SECS", 10),

        alert_check_interval_secs: parse_or("ALERT_CHECK_INTERVAL_SECS", 30),
        alert_check_concurrency: parse_or("ALERT_CHECK_CONCURRENCY", 4usize).max(1),

        cors_origins,
    }
}
