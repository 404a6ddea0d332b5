//! Background price-alert monitor.
//!
//! One tick = one pass over the active alerts fetched fresh from the store:
//! resolve a price for each, apply trigger/reset policy, queue writes into a
//! [`TickBatch`], and commit the batch once every alert has been evaluated.
//!
//! Per-alert policy:
//! - no price resolved: trigger state untouched, only `last_checked_at` moves
//! - price `<=` threshold: trigger if idle; notify unless an unread
//!   notification already exists at this exact price
//! - price `>` threshold while triggered: reset only once the alert has no
//!   unread notifications left

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures_util::{stream, FutureExt, StreamExt};
use mongodb::bson::DateTime;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use super::price_resolver::{PriceResolver, PriceTarget};
use crate::{
    error::StoreError,
    events,
    models::{Alert, Notification},
    store::{AlertStore, AlertUpdate, CommitSummary, TickBatch},
    AppState,
};

/// Result of evaluating one alert. Nothing is persisted until the tick commits.
#[derive(Debug)]
pub struct AlertOutcome {
    pub update: AlertUpdate,
    pub notification: Option<Notification>,
    pub resolved: bool,
    pub triggered: bool,
    pub reset: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub checked: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub triggered: usize,
    pub reset: usize,
    pub commit: CommitSummary,
}

#[derive(Clone)]
pub struct AlertMonitor {
    store: Arc<dyn AlertStore>,
    resolver: Arc<PriceResolver>,
    events_tx: broadcast::Sender<String>,
    interval: Duration,
    concurrency: usize,
}

impl AlertMonitor {
    pub fn new(
        store: Arc<dyn AlertStore>,
        resolver: Arc<PriceResolver>,
        events_tx: broadcast::Sender<String>,
        interval: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            resolver,
            events_tx,
            interval,
            concurrency: concurrency.max(1),
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.store.clone(),
            state.prices.clone(),
            state.events_tx.clone(),
            state.settings.alert_check_interval(),
            state.settings.alert_check_concurrency,
        )
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Ticks until `shutdown` flips. A tick in flight always runs to its
    /// commit; ticks never overlap.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            concurrency = self.concurrency,
            "price alert monitor started"
        );

        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => break,
            }
            if *shutdown.borrow() {
                break;
            }

            match self.run_tick().await {
                Ok(report) if report.checked > 0 => tracing::info!(
                    checked = report.checked,
                    unresolved = report.unresolved,
                    failed = report.failed,
                    triggered = report.triggered,
                    reset = report.reset,
                    notifications = report.commit.notifications_inserted,
                    "alert tick complete"
                ),
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "alert tick failed; retrying next interval")
                }
            }
        }

        tracing::info!("price alert monitor stopped");
    }

    pub async fn run_tick(&self) -> Result<TickReport, StoreError> {
        let alerts = self.store.list_active_alerts().await?;
        if alerts.is_empty() {
            tracing::debug!("no active alerts to check");
            return Ok(TickReport::default());
        }

        tracing::debug!(count = alerts.len(), "checking active price alerts");

        let mut report = TickReport {
            checked: alerts.len(),
            ..TickReport::default()
        };

        let results: Vec<_> = stream::iter(alerts)
            .map(|alert| {
                let monitor = self.clone();
                async move {
                    let id = alert.id;
                    let item = alert.item_name.clone();
                    let res = AssertUnwindSafe(monitor.check_alert(alert)).catch_unwind().await;
                    (id, item, res)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut batch = TickBatch::new();
        for (alert_id, item, result) in results {
            match result {
                Ok(Ok(outcome)) => {
                    report.unresolved += usize::from(!outcome.resolved);
                    report.triggered += usize::from(outcome.triggered);
                    report.reset += usize::from(outcome.reset);
                    batch.save_alert(outcome.update);
                    if let Some(n) = outcome.notification {
                        batch.insert_notification(n);
                    }
                }
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::error!(alert_id = %alert_id, item = %item, error = %e, "error checking price alert");
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::error!(alert_id = %alert_id, item = %item, "panic while checking price alert");
                }
            }
        }

        report.commit = self.store.commit_tick(batch).await?;

        if report.commit.notifications_inserted > 0 {
            let _ = self.events_tx.send(events::NOTIFICATIONS_UPDATED.to_string());
        }
        if report.triggered + report.reset > 0 {
            let _ = self.events_tx.send(events::ALERTS_UPDATED.to_string());
        }

        Ok(report)
    }

    /// Evaluate one alert against the live market.
    pub async fn check_alert(&self, mut alert: Alert) -> Result<AlertOutcome, StoreError> {
        let resolved = self.resolver.resolve(PriceTarget::from(&alert)).await;
        let now = DateTime::now();

        let mut outcome = AlertOutcome {
            update: AlertUpdate::from_alert(&alert, now),
            notification: None,
            resolved: resolved.is_some(),
            triggered: false,
            reset: false,
        };

        let Some(resolved) = resolved else {
            tracing::debug!(alert_id = %alert.id, item = %alert.item_name, "no price resolved");
            return Ok(outcome);
        };
        let price = resolved.price;

        if price <= alert.alert_price {
            if !alert.is_triggered {
                alert.is_triggered = true;
                alert.triggered_at = Some(now);
                outcome.triggered = true;
            }

            if self.store.has_unread_notification(alert.id, price).await? {
                tracing::debug!(
                    alert_id = %alert.id,
                    price = %price,
                    "unread notification already exists at this price"
                );
            } else {
                tracing::warn!(
                    alert_id = %alert.id,
                    item = %alert.item_name,
                    price = %price,
                    threshold = %alert.alert_price,
                    source = resolved.source,
                    "price condition met; notifying"
                );
                outcome.notification = Some(Notification::price_dropped(&alert, price, now));
            }
        } else if alert.is_triggered {
            if self.store.has_any_unread_notification(alert.id).await? {
                tracing::debug!(alert_id = %alert.id, "price above threshold but notifications unread; staying triggered");
            } else {
                alert.is_triggered = false;
                alert.triggered_at = None;
                outcome.reset = true;
                tracing::info!(alert_id = %alert.id, item = %alert.item_name, "alert reset; price above threshold and all notifications read");
            }
        }

        alert.current_price = Some(price);
        outcome.update = AlertUpdate::from_alert(&alert, now);
        Ok(outcome)
    }
}
