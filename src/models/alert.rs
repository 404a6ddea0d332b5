use mongodb::bson::{oid::ObjectId, DateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A user's price watch on a tradeable item.
///
/// Prices are stored as exact decimal strings; never binary floats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: String,

    pub item_name: String,
    // warframe.market slug, preferred over the name when present
    #[serde(default)]
    pub item_id: Option<String>,

    pub alert_price: Decimal,

    #[serde(default)]
    pub current_price: Option<Decimal>,
    #[serde(default)]
    pub last_checked_at: Option<DateTime>,

    pub is_active: bool,
    pub is_triggered: bool,
    #[serde(default)]
    pub triggered_at: Option<DateTime>,
    pub is_acknowledged: bool,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Alert {
    pub fn new(user_id: String, item_name: String, item_id: Option<String>, alert_price: Decimal) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            user_id,
            item_name,
            item_id,
            alert_price: alert_price.normalize(),
            current_price: None,
            last_checked_at: None,
            is_active: true,
            is_triggered: false,
            triggered_at: None,
            is_acknowledged: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial edit coming from the API. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct AlertPatch {
    pub item_name: Option<String>,
    pub alert_price: Option<Decimal>,
    pub is_active: Option<bool>,
}

impl AlertPatch {
    pub fn apply(&self, alert: &mut Alert, now: DateTime) {
        if let Some(name) = &self.item_name {
            alert.item_name = name.clone();
        }
        if let Some(price) = self.alert_price {
            alert.alert_price = price.normalize();
        }
        if let Some(active) = self.is_active {
            alert.is_active = active;
        }
        alert.updated_at = now;
    }
}
