use chrono::{DateTime, Utc};
use mongodb::bson;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Alert, Notification};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePriceAlertDto {
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub item_id: Option<String>,
    pub alert_price: Decimal,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePriceAlertDto {
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub alert_price: Option<Decimal>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlertDto {
    pub id: String,
    pub item_name: String,
    pub item_id: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub alert_price: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub current_price: Option<Decimal>,
    pub is_active: bool,
    pub is_triggered: bool,
    pub triggered_at: Option<DateTime<Utc>>,
    pub is_acknowledged: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl From<&Alert> for PriceAlertDto {
    fn from(a: &Alert) -> Self {
        Self {
            id: a.id.to_hex(),
            item_name: a.item_name.clone(),
            item_id: a.item_id.clone(),
            alert_price: a.alert_price,
            current_price: a.current_price,
            is_active: a.is_active,
            is_triggered: a.is_triggered,
            triggered_at: a.triggered_at.map(bson::DateTime::to_chrono),
            is_acknowledged: a.is_acknowledged,
            created_at: a.created_at.to_chrono(),
            updated_at: a.updated_at.to_chrono(),
            last_checked_at: a.last_checked_at.map(bson::DateTime::to_chrono),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertNotificationDto {
    pub id: String,
    pub price_alert_id: String,
    pub item_name: String,
    pub message: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub triggered_price: Decimal,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl AlertNotificationDto {
    pub fn from_parts(n: &Notification, alert: Option<&Alert>) -> Self {
        Self {
            id: n.id.to_hex(),
            price_alert_id: n.alert_id.to_hex(),
            item_name: alert
                .map(|a| a.item_name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            message: n.message.clone(),
            triggered_price: n.triggered_price,
            is_read: n.is_read,
            created_at: n.created_at.to_chrono(),
            read_at: n.read_at.map(bson::DateTime::to_chrono),
        }
    }
}
