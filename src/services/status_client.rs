use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;

/// Client for the community game-status API (warframestat.us).
#[derive(Clone)]
pub struct StatusClient {
    http: Client,
    base_url: String,
    platform: String,
}

impl StatusClient {
    pub fn new(http: Client, base_url: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            platform: platform.into(),
        }
    }

    pub async fn fetch_status(&self) -> Result<WarframeStatus, UpstreamError> {
        let url = format!("{}/{}", self.base_url, self.platform);
        let res = self.http.get(&url).send().await?;

        if !res.status().is_success() {
            return Err(UpstreamError::Status(res.status()));
        }

        let body = res.text().await?;
        let status = serde_json::from_str::<WarframeStatus>(&body)
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        tracing::debug!(platform = %self.platform, "fetched game status");
        Ok(status)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarframeStatus {
    #[serde(default)]
    pub void_trader: Option<VoidTrader>,
    #[serde(default)]
    pub arbitration: Option<Arbitration>,
    #[serde(default)]
    pub cetus_cycle: Option<CetusCycle>,
    #[serde(default)]
    pub vallis_cycle: Option<VallisCycle>,
    #[serde(default)]
    pub cambion_cycle: Option<CambionCycle>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoidTrader {
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Arbitration {
    #[serde(default)]
    pub node: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CetusCycle {
    #[serde(default)]
    pub is_day: bool,
    #[serde(default)]
    pub expiry: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VallisCycle {
    // "warm" | "cold"
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub expiry: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CambionCycle {
    // "fass" | "vome"
    #[serde(default)]
    pub state: String,
}
