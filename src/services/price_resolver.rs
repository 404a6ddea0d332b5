//! Ordered price-resolution chain.
//!
//! Each strategy either produces a price or declines; the first price wins.
//! The default chain prices by item id first and falls back to a catalog
//! name search.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::market_client::MarketClient;
use crate::models::Alert;

#[derive(Debug, Clone, Copy)]
pub struct PriceTarget<'a> {
    pub item_name: &'a str,
    pub item_id: Option<&'a str>,
}

impl<'a> From<&'a Alert> for PriceTarget<'a> {
    fn from(a: &'a Alert) -> Self {
        Self {
            item_name: &a.item_name,
            item_id: a.item_id.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub price: Decimal,
    pub source: &'static str,
}

#[async_trait]
pub trait PriceStrategy: Send + Sync {
    fn source(&self) -> &'static str;

    /// `None` means "no price from this strategy"; never an error.
    async fn resolve(&self, target: PriceTarget<'_>) -> Option<Decimal>;
}

pub struct ByItemId {
    market: MarketClient,
}

impl ByItemId {
    pub fn new(market: MarketClient) -> Self {
        Self { market }
    }
}

#[async_trait]
impl PriceStrategy for ByItemId {
    fn source(&self) -> &'static str {
        "item_id"
    }

    async fn resolve(&self, target: PriceTarget<'_>) -> Option<Decimal> {
        let id = target.item_id.map(str::trim).filter(|s| !s.is_empty())?;
        self.market.price_by_item_id(id).await
    }
}

pub struct ByItemName {
    market: MarketClient,
}

impl ByItemName {
    pub fn new(market: MarketClient) -> Self {
        Self { market }
    }
}

#[async_trait]
impl PriceStrategy for ByItemName {
    fn source(&self) -> &'static str {
        "item_name"
    }

    async fn resolve(&self, target: PriceTarget<'_>) -> Option<Decimal> {
        if target.item_name.trim().is_empty() {
            return None;
        }
        self.market.price_by_name(target.item_name).await
    }
}

pub struct PriceResolver {
    strategies: Vec<Arc<dyn PriceStrategy>>,
}

impl PriceResolver {
    pub fn new(strategies: Vec<Arc<dyn PriceStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn for_market(market: MarketClient) -> Self {
        Self::new(vec![
            Arc::new(ByItemId::new(market.clone())),
            Arc::new(ByItemName::new(market)),
        ])
    }

    pub async fn resolve(&self, target: PriceTarget<'_>) -> Option<ResolvedPrice> {
        for strategy in &self.strategies {
            if let Some(price) = strategy.resolve(target).await {
                return Some(ResolvedPrice {
                    price: price.normalize(),
                    source: strategy.source(),
                });
            }
        }
        None
    }
}
