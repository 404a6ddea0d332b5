use reqwest::{header, Client};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::UpstreamError;

/// How many of the cheapest sell orders are averaged into a price.
pub const PRICE_SAMPLE_SIZE: usize = 5;

const USER_AGENT: &str = concat!("WarframeUtils/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for outbound calls. warframe.market rejects requests
/// without a user agent.
pub fn build_http_client(timeout: std::time::Duration) -> Result<Client, reqwest::Error> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .build()
}

#[derive(Clone)]
pub struct MarketClient {
    http: Client,
    base_url: String,
}

impl MarketClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, UpstreamError> {
        let url = format!("{}/{}", self.base_url, path);
        let res = self.http.get(&url).send().await?;

        if !res.status().is_success() {
            return Err(UpstreamError::Status(res.status()));
        }

        let body = res.text().await?;
        serde_json::from_str::<Envelope<T>>(&body)
            .map(|e| e.data)
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }

    /// Full item catalog, in the order the market returns it.
    pub async fn list_items(&self) -> Result<Vec<CatalogItem>, UpstreamError> {
        let items: Vec<CatalogItem> = self.get_data("items").await?;
        if items.is_empty() {
            return Err(UpstreamError::EmptyCatalog);
        }
        tracing::debug!(count = items.len(), "loaded market catalog");
        Ok(items)
    }

    pub async fn item_orders(&self, item_id: &str) -> Result<Vec<Order>, UpstreamError> {
        let item_id = item_id.trim();
        if item_id.is_empty() {
            return Err(UpstreamError::EmptyItemId);
        }
        let orders: Option<Vec<Order>> = self.get_data(&format!("orders/item/{item_id}")).await?;
        let orders = orders.unwrap_or_default();
        tracing::debug!(item = item_id, count = orders.len(), "loaded market orders");
        Ok(orders)
    }

    pub async fn item_details(&self, item_id: &str) -> Result<ItemDetail, UpstreamError> {
        let item_id = item_id.trim();
        if item_id.is_empty() {
            return Err(UpstreamError::EmptyItemId);
        }
        self.get_data(&format!("item/{item_id}")).await
    }

    /// Representative price from the item's order book, or `None` on any
    /// failure or when nobody is selling.
    pub async fn price_by_item_id(&self, item_id: &str) -> Option<Decimal> {
        match self.item_orders(item_id).await {
            Ok(orders) => derive_price(&orders),
            Err(e) => {
                tracing::warn!(item = item_id, error = %e, "price lookup by item id failed");
                None
            }
        }
    }

    /// First catalog entry whose name contains `name` (case-insensitive),
    /// then priced by its id.
    pub async fn price_by_name(&self, name: &str) -> Option<Decimal> {
        let catalog = match self.list_items().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(item = name, error = %e, "price lookup by name failed");
                return None;
            }
        };

        let item = find_by_name_fragment(&catalog, name)?;
        self.price_by_item_id(&item.slug).await
    }
}

/// Mean of the five cheapest sell orders. Buy orders are ignored.
pub fn derive_price(orders: &[Order]) -> Option<Decimal> {
    let mut sells: Vec<Decimal> = orders
        .iter()
        .filter(|o| o.is_sell())
        .map(|o| o.platinum)
        .collect();

    if sells.is_empty() {
        return None;
    }

    sells.sort();
    let sample = &sells[..sells.len().min(PRICE_SAMPLE_SIZE)];
    let total: Decimal = sample.iter().copied().sum();
    Some((total / Decimal::from(sample.len())).normalize())
}

/// First catalog entry whose name contains `name`, ignoring case and
/// surrounding whitespace. A first match without a slug has no price, so it
/// yields `None` rather than falling through to a later entry.
pub fn find_by_name_fragment<'a>(catalog: &'a [CatalogItem], name: &str) -> Option<&'a CatalogItem> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    catalog
        .iter()
        .find(|i| i.name().to_lowercase().contains(&needle))
        .filter(|i| !i.slug.trim().is_empty())
}

pub fn find_by_exact_name<'a>(catalog: &'a [CatalogItem], name: &str) -> Option<&'a CatalogItem> {
    let name = name.trim().to_lowercase();
    catalog.iter().find(|i| i.name().to_lowercase() == name)
}

// ---------------- Wire types (warframe.market v2) ----------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemText {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub wiki_link: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub thumb: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct I18n {
    #[serde(default)]
    pub en: ItemText,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub i18n: I18n,
}

impl CatalogItem {
    pub fn name(&self) -> &str {
        &self.i18n.en.name
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub trading_tax: Option<i64>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub i18n: I18n,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUser {
    #[serde(default)]
    pub ingame_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    // "sell" | "buy"
    #[serde(rename = "type")]
    pub order_type: String,
    pub platinum: Decimal,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub user: Option<OrderUser>,
}

impl Order {
    pub fn is_sell(&self) -> bool {
        self.order_type.eq_ignore_ascii_case("sell")
    }
}
