//! Persistence for alerts and notifications.
//!
//! Both the monitor and the HTTP layer go through [`AlertStore`]; neither
//! keeps private copies of alert state across ticks.

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};
use rust_decimal::Decimal;

use crate::{
    error::StoreError,
    models::{Alert, AlertPatch, Notification},
};

pub mod memory;
pub mod mongo;

pub use memory::MemoryAlertStore;
pub use mongo::MongoAlertStore;

/// Monitor-owned fields of one alert, written back at the end of a tick.
///
/// Carries no user-editable field; a tick must not overwrite an edit made
/// while it was running.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertUpdate {
    pub alert_id: ObjectId,
    pub current_price: Option<Decimal>,
    pub last_checked_at: DateTime,
    pub is_triggered: bool,
    pub triggered_at: Option<DateTime>,
}

impl AlertUpdate {
    pub fn from_alert(alert: &Alert, checked_at: DateTime) -> Self {
        Self {
            alert_id: alert.id,
            current_price: alert.current_price,
            last_checked_at: checked_at,
            is_triggered: alert.is_triggered,
            triggered_at: alert.triggered_at,
        }
    }

    pub fn apply(&self, alert: &mut Alert) {
        alert.current_price = self.current_price;
        alert.last_checked_at = Some(self.last_checked_at);
        alert.is_triggered = self.is_triggered;
        alert.triggered_at = self.triggered_at;
        alert.updated_at = self.last_checked_at;
    }
}

/// Unit of work for a single monitor tick. Built fresh each tick and
/// committed in one call.
#[derive(Debug, Default)]
pub struct TickBatch {
    pub alerts: Vec<AlertUpdate>,
    pub notifications: Vec<Notification>,
}

impl TickBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_alert(&mut self, update: AlertUpdate) {
        self.alerts.push(update);
    }

    pub fn insert_notification(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty() && self.notifications.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommitSummary {
    pub alerts_saved: usize,
    pub notifications_inserted: usize,
    // duplicates of an unread (alert, price) pair, or orphans of a deleted alert
    pub notifications_skipped: usize,
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Every alert with `is_active == true`, triggered or not.
    async fn list_active_alerts(&self) -> Result<Vec<Alert>, StoreError>;

    async fn has_unread_notification(
        &self,
        alert_id: ObjectId,
        price: Decimal,
    ) -> Result<bool, StoreError>;

    async fn has_any_unread_notification(&self, alert_id: ObjectId) -> Result<bool, StoreError>;

    /// Persist a tick's accumulated writes. All-or-nothing where the backend
    /// supports it.
    async fn commit_tick(&self, batch: TickBatch) -> Result<CommitSummary, StoreError>;

    /// The user's alerts, newest first.
    async fn list_user_alerts(&self, user_id: &str) -> Result<Vec<Alert>, StoreError>;

    async fn find_user_alert(
        &self,
        user_id: &str,
        alert_id: ObjectId,
    ) -> Result<Option<Alert>, StoreError>;

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError>;

    async fn update_user_alert(
        &self,
        user_id: &str,
        alert_id: ObjectId,
        patch: &AlertPatch,
    ) -> Result<Option<Alert>, StoreError>;

    /// Removes the alert and its notifications. `false` if nothing matched.
    async fn delete_user_alert(&self, user_id: &str, alert_id: ObjectId) -> Result<bool, StoreError>;

    async fn acknowledge_user_alert(
        &self,
        user_id: &str,
        alert_id: ObjectId,
    ) -> Result<Option<Alert>, StoreError>;

    /// Unread notifications, newest first, each paired with its alert.
    async fn list_unread_notifications(
        &self,
        user_id: &str,
    ) -> Result<Vec<(Notification, Option<Alert>)>, StoreError>;

    async fn mark_notification_read(
        &self,
        user_id: &str,
        notification_id: ObjectId,
    ) -> Result<Option<(Notification, Option<Alert>)>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
