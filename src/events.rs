//! Names pushed over the realtime channel; clients refetch on receipt.

use tokio::sync::broadcast;

pub const ALERTS_UPDATED: &str = "alertsUpdated";
pub const NOTIFICATIONS_UPDATED: &str = "notificationsUpdated";

pub fn channel() -> broadcast::Sender<String> {
    let (tx, _rx) = broadcast::channel::<String>(64);
    tx
}
