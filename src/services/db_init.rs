use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Database, IndexModel,
};

use crate::{
    error::StoreError,
    store::mongo::{ALERTS, NOTIFICATIONS},
};

pub const UNREAD_ALERT_PRICE_INDEX: &str = "unread_alert_price_unique";

/// Every index the store relies on, paired with its collection.
pub fn index_models() -> Vec<(&'static str, IndexModel)> {
    vec![
        // alerts: per-user listing, newest first
        (
            ALERTS,
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "created_at": -1 })
                .build(),
        ),
        // alerts: monitor scan
        (
            ALERTS,
            IndexModel::builder()
                .keys(doc! { "is_active": 1, "is_triggered": 1 })
                .build(),
        ),
        // notifications: unread feed per user
        (
            NOTIFICATIONS,
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "is_read": 1 })
                .build(),
        ),
        // notifications: cascade delete + reset check
        (
            NOTIFICATIONS,
            IndexModel::builder().keys(doc! { "alert_id": 1 }).build(),
        ),
        // notifications: at most one unread row per (alert, price)
        (
            NOTIFICATIONS,
            IndexModel::builder()
                .keys(doc! { "alert_id": 1, "triggered_price": 1 })
                .options(
                    IndexOptions::builder()
                        .name(UNREAD_ALERT_PRICE_INDEX.to_string())
                        .unique(true)
                        .partial_filter_expression(doc! { "is_read": false })
                        .build(),
                )
                .build(),
        ),
    ]
}

pub async fn ensure_indexes(db: &Database) -> Result<(), StoreError> {
    for (collection, model) in index_models() {
        db.collection::<Document>(collection)
            .create_index(model, None)
            .await?;
    }
    Ok(())
}
