use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::status_client::WarframeStatus;
use crate::{error::ApiError, AppState};

/// Human countdown to an RFC 3339 expiry. `None` if missing or unparsable.
pub fn time_left(expiry: Option<&str>, now: DateTime<Utc>) -> Option<String> {
    let expiry = DateTime::parse_from_rfc3339(expiry?.trim()).ok()?;
    let left = expiry.with_timezone(&Utc) - now;

    if left.num_seconds() < 0 {
        return Some("Just changed".to_string());
    }

    let minutes = left.num_minutes();
    if minutes < 60 {
        return Some(format!("{}m {}s", minutes, left.num_seconds() % 60));
    }

    Some(format!("{}h {}m", left.num_hours(), minutes % 60))
}

/// Shape consumed by the dashboard's status bar.
pub fn game_status_view(status: &WarframeStatus, now: DateTime<Utc>) -> Value {
    let cetus = status.cetus_cycle.as_ref().map(|c| {
        let fallback = if c.is_day { "Daytime" } else { "Nighttime" };
        json!({
            "state": if c.is_day { "Day" } else { "Night" },
            "timeLeft": time_left(c.expiry.as_deref(), now).unwrap_or_else(|| fallback.to_string()),
        })
    });

    let trader = status.void_trader.as_ref().map(|t| {
        json!({
            "active": t.active,
            "character": "Baro Ki'Teer",
            "location": if t.active { "Active" } else { "Away" },
        })
    });

    let vallis = status.vallis_cycle.as_ref().map(|v| {
        let warm = v.state.eq_ignore_ascii_case("warm");
        let fallback = if warm { "Warm Period" } else { "Cold Period" };
        json!({
            "state": if warm { "Warm" } else { "Cold" },
            "timeLeft": time_left(v.expiry.as_deref(), now).unwrap_or_else(|| fallback.to_string()),
        })
    });

    let cambion = status.cambion_cycle.as_ref().map(|c| {
        json!({
            "state": if c.state.eq_ignore_ascii_case("fass") { "Fass" } else { "Vome" },
        })
    });

    json!({
        "cetusCycle": cetus,
        "voidTrader": trader,
        "vallisCycle": vallis,
        "cambionCycle": cambion,
    })
}

pub async fn game_status(state: &AppState) -> Result<Value, ApiError> {
    match state.status.fetch_status().await {
        Ok(status) => Ok(game_status_view(&status, Utc::now())),
        Err(e) => {
            tracing::error!(error = %e, "failed to fetch game status");
            Err(ApiError::Upstream("Failed to fetch game status".to_string()))
        }
    }
}
