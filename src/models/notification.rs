use mongodb::bson::{oid::ObjectId, DateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Alert;

/// Record that an alert's threshold was met at a specific price.
///
/// At most one unread notification exists per `(alert_id, triggered_price)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: String,
    pub alert_id: ObjectId,

    pub message: String,
    pub triggered_price: Decimal,

    pub is_read: bool,
    #[serde(default)]
    pub read_at: Option<DateTime>,

    pub created_at: DateTime,
}

impl Notification {
    pub fn price_dropped(alert: &Alert, price: Decimal, now: DateTime) -> Self {
        let price = price.normalize();
        Self {
            id: ObjectId::new(),
            user_id: alert.user_id.clone(),
            alert_id: alert.id,
            message: format!(
                "The price of {} has dropped to {} platinum (alert threshold: {})",
                alert.item_name, price, alert.alert_price
            ),
            triggered_price: price,
            is_read: false,
            read_at: None,
            created_at: now,
        }
    }
}
