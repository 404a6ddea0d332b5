use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::{AlertStore, CommitSummary, TickBatch};
use crate::{
    error::StoreError,
    models::{Alert, AlertPatch, Notification},
};

#[derive(Default)]
struct Inner {
    alerts: HashMap<ObjectId, Alert>,
    notifications: Vec<Notification>,
}

impl Inner {
    fn unread_exists(&self, alert_id: ObjectId, price: Option<Decimal>) -> bool {
        self.notifications.iter().any(|n| {
            n.alert_id == alert_id
                && !n.is_read
                && price.map_or(true, |p| n.triggered_price == p)
        })
    }

    fn with_alert(&self, n: &Notification) -> (Notification, Option<Alert>) {
        (n.clone(), self.alerts.get(&n.alert_id).cloned())
    }
}

/// In-process store. Every operation runs under one lock, so a tick commit
/// is atomic with respect to API reads and writes.
#[derive(Default)]
pub struct MemoryAlertStore {
    inner: RwLock<Inner>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every notification ever stored for an alert, oldest first.
    pub async fn notifications_for(&self, alert_id: ObjectId) -> Vec<Notification> {
        let inner = self.inner.read().await;
        let mut items: Vec<Notification> = inner
            .notifications
            .iter()
            .filter(|n| n.alert_id == alert_id)
            .cloned()
            .collect();
        items.sort_by_key(|n| (n.created_at, n.id));
        items
    }

    pub async fn alert(&self, alert_id: ObjectId) -> Option<Alert> {
        self.inner.read().await.alerts.get(&alert_id).cloned()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn list_active_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        let inner = self.inner.read().await;
        let mut items: Vec<Alert> = inner.alerts.values().filter(|a| a.is_active).cloned().collect();
        items.sort_by_key(|a| (a.created_at, a.id));
        Ok(items)
    }

    async fn has_unread_notification(
        &self,
        alert_id: ObjectId,
        price: Decimal,
    ) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.unread_exists(alert_id, Some(price.normalize())))
    }

    async fn has_any_unread_notification(&self, alert_id: ObjectId) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.unread_exists(alert_id, None))
    }

    async fn commit_tick(&self, batch: TickBatch) -> Result<CommitSummary, StoreError> {
        let mut inner = self.inner.write().await;
        let mut summary = CommitSummary::default();

        for update in &batch.alerts {
            if let Some(alert) = inner.alerts.get_mut(&update.alert_id) {
                update.apply(alert);
                summary.alerts_saved += 1;
            }
        }

        for n in batch.notifications {
            let orphan = !inner.alerts.contains_key(&n.alert_id);
            if orphan || inner.unread_exists(n.alert_id, Some(n.triggered_price)) {
                summary.notifications_skipped += 1;
                continue;
            }
            inner.notifications.push(n);
            summary.notifications_inserted += 1;
        }

        Ok(summary)
    }

    async fn list_user_alerts(&self, user_id: &str) -> Result<Vec<Alert>, StoreError> {
        let inner = self.inner.read().await;
        let mut items: Vec<Alert> = inner
            .alerts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    async fn find_user_alert(
        &self,
        user_id: &str,
        alert_id: ObjectId,
    ) -> Result<Option<Alert>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.alerts.get(&alert_id).filter(|a| a.user_id == user_id).cloned())
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.alerts.contains_key(&alert.id) {
            return Err(StoreError::Conflict(format!("alert {} already exists", alert.id)));
        }
        inner.alerts.insert(alert.id, alert.clone());
        Ok(())
    }

    async fn update_user_alert(
        &self,
        user_id: &str,
        alert_id: ObjectId,
        patch: &AlertPatch,
    ) -> Result<Option<Alert>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(alert) = inner.alerts.get_mut(&alert_id).filter(|a| a.user_id == user_id) else {
            return Ok(None);
        };
        patch.apply(alert, DateTime::now());
        Ok(Some(alert.clone()))
    }

    async fn delete_user_alert(&self, user_id: &str, alert_id: ObjectId) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let owned = inner.alerts.get(&alert_id).is_some_and(|a| a.user_id == user_id);
        if !owned {
            return Ok(false);
        }
        inner.alerts.remove(&alert_id);
        inner.notifications.retain(|n| n.alert_id != alert_id);
        Ok(true)
    }

    async fn acknowledge_user_alert(
        &self,
        user_id: &str,
        alert_id: ObjectId,
    ) -> Result<Option<Alert>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(alert) = inner.alerts.get_mut(&alert_id).filter(|a| a.user_id == user_id) else {
            return Ok(None);
        };
        alert.is_acknowledged = true;
        alert.updated_at = DateTime::now();
        Ok(Some(alert.clone()))
    }

    async fn list_unread_notifications(
        &self,
        user_id: &str,
    ) -> Result<Vec<(Notification, Option<Alert>)>, StoreError> {
        let inner = self.inner.read().await;
        let mut items: Vec<(Notification, Option<Alert>)> = inner
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .map(|n| inner.with_alert(n))
            .collect();
        items.sort_by(|(a, _), (b, _)| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    async fn mark_notification_read(
        &self,
        user_id: &str,
        notification_id: ObjectId,
    ) -> Result<Option<(Notification, Option<Alert>)>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(n) = inner
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id)
        else {
            return Ok(None);
        };
        n.is_read = true;
        n.read_at = Some(DateTime::now());
        let n = n.clone();
        Ok(Some(inner.with_alert(&n)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
