use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde_json::{json, Value};

use super::{
    market_client::{find_by_exact_name, Order},
    price_resolver::PriceTarget,
};
use crate::{error::ApiError, AppState};

fn order_sort_key(o: &Order) -> Decimal {
    if o.is_sell() {
        o.platinum
    } else {
        -o.platinum
    }
}

/// Orders with a known seller, buy orders first (highest bid first), then
/// sell orders cheapest first.
pub fn order_book_view(mut orders: Vec<Order>) -> Vec<Value> {
    orders.sort_by_key(order_sort_key);

    orders
        .into_iter()
        .filter_map(|o| {
            let user = o.user?;
            Some(json!({
                "order_type": o.order_type,
                "platinum": o.platinum.to_f64(),
                "quantity": o.quantity,
                "user": {
                    "ingame_name": user.ingame_name,
                    "status": user.status,
                }
            }))
        })
        .collect()
}

/// Details and order book for an item matched by exact (case-insensitive) name.
pub async fn search_item(state: &AppState, mod_name: &str) -> Result<Value, ApiError> {
    let name = mod_name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("modName parameter is required".to_string()));
    }

    let catalog = state.market.list_items().await.map_err(|e| {
        tracing::error!(error = %e, "failed to fetch items list");
        ApiError::Upstream("Failed to fetch items list".to_string())
    })?;

    let Some(item) = find_by_exact_name(&catalog, name) else {
        return Err(ApiError::NotFound);
    };

    let details = match state.market.item_details(&item.slug).await {
        Ok(d) => {
            let en = &d.i18n.en;
            json!({
                "item_name": if en.name.is_empty() { item.name().to_string() } else { en.name.clone() },
                "description": en.description.clone().unwrap_or_default(),
                "thumb": en.thumb.clone().or_else(|| item.i18n.en.thumb.clone()),
                "icon": en.icon,
                "rarity": d.rarity,
                "trading_tax": d.trading_tax,
                "wiki_link": en.wiki_link,
                "url_name": d.slug,
            })
        }
        Err(e) => {
            tracing::warn!(item = %item.slug, error = %e, "item details unavailable");
            Value::Null
        }
    };

    let orders = match state.market.item_orders(&item.slug).await {
        Ok(orders) => Value::Array(order_book_view(orders)),
        Err(e) => {
            tracing::warn!(item = %item.slug, error = %e, "item orders unavailable");
            Value::Null
        }
    };

    Ok(json!({ "modDetails": details, "orders": orders }))
}

/// Autocomplete list: `[{url_name, item_name}]`.
pub async fn list_items(state: &AppState) -> Result<Vec<Value>, ApiError> {
    let catalog = state.market.list_items().await.map_err(|e| {
        tracing::error!(error = %e, "failed to fetch items");
        ApiError::Upstream("Failed to fetch items".to_string())
    })?;

    Ok(catalog
        .iter()
        .map(|i| json!({ "url_name": i.slug, "item_name": i.name() }))
        .collect())
}

/// Price an item through the same chain the alert monitor uses.
pub async fn preview_price(
    state: &AppState,
    item_name: Option<&str>,
    item_id: Option<&str>,
) -> Result<Value, ApiError> {
    let item_name = item_name.unwrap_or("").trim();
    let item_id = item_id.map(str::trim).filter(|s| !s.is_empty());

    if item_name.is_empty() && item_id.is_none() {
        return Err(ApiError::Validation("itemName or itemId is required".to_string()));
    }

    let resolved = state.prices.resolve(PriceTarget { item_name, item_id }).await;

    Ok(json!({
        "price": resolved.and_then(|r| r.price.to_f64()),
        "source": resolved.map(|r| r.source),
    }))
}
