use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;

use crate::{
    error::ApiError,
    events,
    models::{
        dto::{AlertNotificationDto, CreatePriceAlertDto, PriceAlertDto, UpdatePriceAlertDto},
        Alert, AlertPatch,
    },
    AppState,
};

pub const MAX_ITEM_FIELD_LEN: usize = 500;
pub const MAX_ALERT_PRICE: Decimal = Decimal::from_parts(999_999, 0, 0, false, 0);

/// Ids that do not parse are reported exactly like ids owned by someone else.
pub fn parse_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| ApiError::NotFound)
}

fn validate_item_name(raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Item name is required".to_string()));
    }
    if name.chars().count() > MAX_ITEM_FIELD_LEN {
        return Err(ApiError::Validation(format!(
            "Item name must be at most {MAX_ITEM_FIELD_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_item_id(raw: Option<&str>) -> Result<Option<String>, ApiError> {
    let Some(id) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if id.chars().count() > MAX_ITEM_FIELD_LEN {
        return Err(ApiError::Validation(format!(
            "Item id must be at most {MAX_ITEM_FIELD_LEN} characters"
        )));
    }
    Ok(Some(id.to_string()))
}

fn validate_price(price: Decimal) -> Result<Decimal, ApiError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ApiError::Validation("Alert price must be non-negative".to_string()));
    }
    if price > MAX_ALERT_PRICE {
        return Err(ApiError::Validation(
            "Alert price must be between 0 and 999,999".to_string(),
        ));
    }
    Ok(price.abs().normalize())
}

pub fn validate_create(user_id: &str, dto: &CreatePriceAlertDto) -> Result<Alert, ApiError> {
    let item_name = validate_item_name(&dto.item_name)?;
    let item_id = validate_item_id(dto.item_id.as_deref())?;
    let alert_price = validate_price(dto.alert_price)?;
    Ok(Alert::new(user_id.to_string(), item_name, item_id, alert_price))
}

pub fn validate_update(dto: &UpdatePriceAlertDto) -> Result<AlertPatch, ApiError> {
    let item_name = match dto.item_name.as_deref() {
        Some(raw) if !raw.trim().is_empty() => Some(validate_item_name(raw)?),
        _ => None,
    };
    let alert_price = dto.alert_price.map(validate_price).transpose()?;

    Ok(AlertPatch {
        item_name,
        alert_price,
        is_active: dto.is_active,
    })
}

fn publish(state: &AppState, event: &str) {
    let _ = state.events_tx.send(event.to_string());
}

pub async fn list_alerts(state: &AppState, user_id: &str) -> Result<Vec<PriceAlertDto>, ApiError> {
    let alerts = state.store.list_user_alerts(user_id).await?;
    Ok(alerts.iter().map(PriceAlertDto::from).collect())
}

pub async fn get_alert(state: &AppState, user_id: &str, raw_id: &str) -> Result<PriceAlertDto, ApiError> {
    let id = parse_id(raw_id)?;
    let alert = state
        .store
        .find_user_alert(user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(PriceAlertDto::from(&alert))
}

pub async fn create_alert(
    state: &AppState,
    user_id: &str,
    dto: &CreatePriceAlertDto,
) -> Result<PriceAlertDto, ApiError> {
    let alert = validate_create(user_id, dto)?;
    state.store.insert_alert(&alert).await?;

    tracing::info!(
        user_id = %user_id,
        alert_id = %alert.id,
        item = %alert.item_name,
        price = %alert.alert_price,
        "price alert created"
    );
    publish(state, events::ALERTS_UPDATED);

    Ok(PriceAlertDto::from(&alert))
}

pub async fn update_alert(
    state: &AppState,
    user_id: &str,
    raw_id: &str,
    dto: &UpdatePriceAlertDto,
) -> Result<PriceAlertDto, ApiError> {
    let id = parse_id(raw_id)?;
    let patch = validate_update(dto)?;

    let alert = state
        .store
        .update_user_alert(user_id, id, &patch)
        .await?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(user_id = %user_id, alert_id = %id, "price alert updated");
    publish(state, events::ALERTS_UPDATED);

    Ok(PriceAlertDto::from(&alert))
}

pub async fn delete_alert(state: &AppState, user_id: &str, raw_id: &str) -> Result<(), ApiError> {
    let id = parse_id(raw_id)?;
    if !state.store.delete_user_alert(user_id, id).await? {
        return Err(ApiError::NotFound);
    }

    tracing::info!(user_id = %user_id, alert_id = %id, "price alert deleted");
    publish(state, events::ALERTS_UPDATED);
    publish(state, events::NOTIFICATIONS_UPDATED);

    Ok(())
}

pub async fn acknowledge_alert(
    state: &AppState,
    user_id: &str,
    raw_id: &str,
) -> Result<PriceAlertDto, ApiError> {
    let id = parse_id(raw_id)?;
    let alert = state
        .store
        .acknowledge_user_alert(user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    publish(state, events::ALERTS_UPDATED);
    Ok(PriceAlertDto::from(&alert))
}

pub async fn unread_notifications(
    state: &AppState,
    user_id: &str,
) -> Result<Vec<AlertNotificationDto>, ApiError> {
    let items = state.store.list_unread_notifications(user_id).await?;
    Ok(items
        .iter()
        .map(|(n, a)| AlertNotificationDto::from_parts(n, a.as_ref()))
        .collect())
}

pub async fn mark_notification_read(
    state: &AppState,
    user_id: &str,
    raw_id: &str,
) -> Result<AlertNotificationDto, ApiError> {
    let id = parse_id(raw_id)?;
    let (n, alert) = state
        .store
        .mark_notification_read(user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    publish(state, events::NOTIFICATIONS_UPDATED);
    Ok(AlertNotificationDto::from_parts(&n, alert.as_ref()))
}
