use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime, Document},
    error::{ErrorKind, WriteFailure},
    options::{CountOptions, FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, ClientSession, Collection, Database,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use super::{AlertStore, AlertUpdate, CommitSummary, TickBatch};
use crate::{
    error::StoreError,
    models::{Alert, AlertPatch, Notification},
};

pub const ALERTS: &str = "alerts";
pub const NOTIFICATIONS: &str = "alert_notifications";

const DUPLICATE_KEY: i32 = 11000;
const ILLEGAL_OPERATION: i32 = 20;

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY
    )
}

// Standalone servers refuse transactions: the driver rejects the session up
// front, or the server answers the first write with IllegalOperation.
fn transactions_unsupported(e: &mongodb::error::Error) -> bool {
    match e.kind.as_ref() {
        ErrorKind::Command(ce) => ce.code == ILLEGAL_OPERATION,
        ErrorKind::Transaction { message, .. } => message.contains("not supported by this deployment"),
        ErrorKind::SessionsNotSupported => true,
        _ => false,
    }
}

// Decimal's serde form is its Display string; queries must match it exactly.
fn price_key(price: Decimal) -> String {
    price.normalize().to_string()
}

fn update_doc(u: &AlertUpdate) -> Document {
    doc! {
        "$set": {
            "current_price": u.current_price.map(price_key),
            "last_checked_at": u.last_checked_at,
            "is_triggered": u.is_triggered,
            "triggered_at": u.triggered_at,
            "updated_at": u.last_checked_at,
        }
    }
}

async fn collect<T>(mut cursor: mongodb::Cursor<T>) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let mut items = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res?);
    }
    Ok(items)
}

#[derive(Clone)]
pub struct MongoAlertStore {
    client: Client,
    db: Database,
    // cleared for good once the deployment turns out not to support transactions
    transactions: Arc<AtomicBool>,
}

impl MongoAlertStore {
    pub fn new(client: Client, db_name: &str, transactions: bool) -> Self {
        let db = client.database(db_name);
        Self {
            client,
            db,
            transactions: Arc::new(AtomicBool::new(transactions)),
        }
    }

    pub fn uses_transactions(&self) -> bool {
        self.transactions.load(Ordering::Relaxed)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn alerts(&self) -> Collection<Alert> {
        self.db.collection::<Alert>(ALERTS)
    }

    fn notifications(&self) -> Collection<Notification> {
        self.db.collection::<Notification>(NOTIFICATIONS)
    }

    async fn count_unread(&self, filter: Document) -> Result<bool, StoreError> {
        let opts = CountOptions::builder().limit(1).build();
        let n = self.notifications().count_documents(filter, opts).await?;
        Ok(n > 0)
    }

    async fn alerts_by_id(&self, ids: Vec<ObjectId>) -> Result<HashMap<ObjectId, Alert>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let cursor = self.alerts().find(doc! { "_id": { "$in": ids } }, None).await?;
        Ok(collect(cursor)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect())
    }

    async fn commit_in_session(
        &self,
        batch: &TickBatch,
        session: &mut ClientSession,
    ) -> Result<CommitSummary, StoreError> {
        let mut summary = CommitSummary::default();
        let mut live: HashSet<ObjectId> = HashSet::new();

        for u in &batch.alerts {
            let res = self
                .alerts()
                .update_one_with_session(doc! { "_id": u.alert_id }, update_doc(u), None, session)
                .await?;
            if res.matched_count > 0 {
                live.insert(u.alert_id);
                summary.alerts_saved += 1;
            }
        }

        for n in &batch.notifications {
            if !live.contains(&n.alert_id) {
                summary.notifications_skipped += 1;
                continue;
            }
            // a duplicate aborts the transaction; the next tick sees the existing row
            self.notifications()
                .insert_one_with_session(n, None, session)
                .await?;
            summary.notifications_inserted += 1;
        }

        Ok(summary)
    }

    async fn commit_transactional(&self, batch: &TickBatch) -> Result<CommitSummary, StoreError> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        match self.commit_in_session(batch, &mut session).await {
            Ok(summary) => {
                session.commit_transaction().await?;
                Ok(summary)
            }
            Err(e) => {
                if let Err(abort) = session.abort_transaction().await {
                    tracing::warn!(error = %abort, "failed to abort tick transaction");
                }
                Err(e)
            }
        }
    }

    async fn commit_sequential(&self, batch: &TickBatch) -> Result<CommitSummary, StoreError> {
        let mut summary = CommitSummary::default();
        let mut live: HashSet<ObjectId> = HashSet::new();

        for u in &batch.alerts {
            let res = self
                .alerts()
                .update_one(doc! { "_id": u.alert_id }, update_doc(u), None)
                .await?;
            if res.matched_count > 0 {
                live.insert(u.alert_id);
                summary.alerts_saved += 1;
            }
        }

        for n in &batch.notifications {
            if !live.contains(&n.alert_id) {
                summary.notifications_skipped += 1;
                continue;
            }
            match self.notifications().insert_one(n, None).await {
                Ok(_) => summary.notifications_inserted += 1,
                Err(e) if is_duplicate_key(&e) => summary.notifications_skipped += 1,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(summary)
    }

    async fn notification_with_alert(
        &self,
        n: Notification,
    ) -> Result<(Notification, Option<Alert>), StoreError> {
        let alert = self.alerts().find_one(doc! { "_id": n.alert_id }, None).await?;
        Ok((n, alert))
    }
}

#[async_trait]
impl AlertStore for MongoAlertStore {
    async fn list_active_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        let opts = FindOptions::builder().sort(doc! { "created_at": 1, "_id": 1 }).build();
        let cursor = self.alerts().find(doc! { "is_active": true }, opts).await?;
        collect(cursor).await
    }

    async fn has_unread_notification(
        &self,
        alert_id: ObjectId,
        price: Decimal,
    ) -> Result<bool, StoreError> {
        self.count_unread(doc! {
            "alert_id": alert_id,
            "is_read": false,
            "triggered_price": price_key(price),
        })
        .await
    }

    async fn has_any_unread_notification(&self, alert_id: ObjectId) -> Result<bool, StoreError> {
        self.count_unread(doc! { "alert_id": alert_id, "is_read": false }).await
    }

    async fn commit_tick(&self, batch: TickBatch) -> Result<CommitSummary, StoreError> {
        if batch.is_empty() {
            return Ok(CommitSummary::default());
        }
        if self.uses_transactions() {
            match self.commit_transactional(&batch).await {
                Err(StoreError::Database(e)) if transactions_unsupported(&e) => {
                    tracing::warn!(
                        error = %e,
                        "deployment does not support transactions, committing ticks sequentially"
                    );
                    self.transactions.store(false, Ordering::Relaxed);
                }
                other => return other,
            }
        }
        self.commit_sequential(&batch).await
    }

    async fn list_user_alerts(&self, user_id: &str) -> Result<Vec<Alert>, StoreError> {
        let opts = FindOptions::builder().sort(doc! { "created_at": -1, "_id": -1 }).build();
        let cursor = self.alerts().find(doc! { "user_id": user_id }, opts).await?;
        collect(cursor).await
    }

    async fn find_user_alert(
        &self,
        user_id: &str,
        alert_id: ObjectId,
    ) -> Result<Option<Alert>, StoreError> {
        Ok(self
            .alerts()
            .find_one(doc! { "_id": alert_id, "user_id": user_id }, None)
            .await?)
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.alerts().insert_one(alert, None).await?;
        Ok(())
    }

    async fn update_user_alert(
        &self,
        user_id: &str,
        alert_id: ObjectId,
        patch: &AlertPatch,
    ) -> Result<Option<Alert>, StoreError> {
        let mut set = doc! { "updated_at": DateTime::now() };
        if let Some(name) = &patch.item_name {
            set.insert("item_name", name.as_str());
        }
        if let Some(price) = patch.alert_price {
            set.insert("alert_price", price_key(price));
        }
        if let Some(active) = patch.is_active {
            set.insert("is_active", active);
        }

        let opts = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .alerts()
            .find_one_and_update(
                doc! { "_id": alert_id, "user_id": user_id },
                doc! { "$set": set },
                opts,
            )
            .await?)
    }

    async fn delete_user_alert(&self, user_id: &str, alert_id: ObjectId) -> Result<bool, StoreError> {
        let res = self
            .alerts()
            .delete_one(doc! { "_id": alert_id, "user_id": user_id }, None)
            .await?;

        if res.deleted_count == 0 {
            return Ok(false);
        }

        self.notifications()
            .delete_many(doc! { "alert_id": alert_id }, None)
            .await?;

        Ok(true)
    }

    async fn acknowledge_user_alert(
        &self,
        user_id: &str,
        alert_id: ObjectId,
    ) -> Result<Option<Alert>, StoreError> {
        let opts = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .alerts()
            .find_one_and_update(
                doc! { "_id": alert_id, "user_id": user_id },
                doc! { "$set": { "is_acknowledged": true, "updated_at": DateTime::now() } },
                opts,
            )
            .await?)
    }

    async fn list_unread_notifications(
        &self,
        user_id: &str,
    ) -> Result<Vec<(Notification, Option<Alert>)>, StoreError> {
        let opts = FindOptions::builder().sort(doc! { "created_at": -1, "_id": -1 }).build();
        let cursor = self
            .notifications()
            .find(doc! { "user_id": user_id, "is_read": false }, opts)
            .await?;
        let items = collect(cursor).await?;

        let ids: Vec<ObjectId> = items
            .iter()
            .map(|n| n.alert_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let alerts = self.alerts_by_id(ids).await?;

        Ok(items
            .into_iter()
            .map(|n| {
                let alert = alerts.get(&n.alert_id).cloned();
                (n, alert)
            })
            .collect())
    }

    async fn mark_notification_read(
        &self,
        user_id: &str,
        notification_id: ObjectId,
    ) -> Result<Option<(Notification, Option<Alert>)>, StoreError> {
        let opts = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .notifications()
            .find_one_and_update(
                doc! { "_id": notification_id, "user_id": user_id },
                doc! { "$set": { "is_read": true, "read_at": DateTime::now() } },
                opts,
            )
            .await?;

        match updated {
            Some(n) => Ok(Some(self.notification_with_alert(n).await?)),
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}
