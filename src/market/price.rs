//! ETH price from CoinGecko with an in-memory cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};

use crate::config::PriceConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
    pub price: f64,
    pub image: String,
}

impl PriceData {
    fn unavailable() -> Self {
        Self {
            price: 0.0,
            image: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MarketEntry {
    current_price: f64,
    #[serde(default)]
    image: String,
}

struct CachedPrice {
    data: PriceData,
    fetched_at: Instant,
}

#[derive(Clone)]
pub struct PriceService {
    client: reqwest::Client,
    api_url: String,
    ttl: Duration,
    cache: Arc<ArcSwapOption<CachedPrice>>,
}

impl PriceService {
    pub fn new(config: &PriceConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            ttl: Duration::from_secs(config.cache_secs),
            cache: Arc::new(ArcSwapOption::empty()),
        })
    }

    pub async fn eth_price(&self) -> PriceData {
        if let Some(cached) = self.cache.load_full() {
            if cached.fetched_at.elapsed() < self.ttl {
                return cached.data.clone();
            }
        }

        match self.fetch().await {
            Ok(Some(data)) => {
                self.cache.store(Some(Arc::new(CachedPrice {
                    data: data.clone(),
                    fetched_at: Instant::now(),
                })));
                tracing::debug!(price = data.price, "ETH price refreshed");
                data
            }
            Ok(None) => {
                tracing::warn!("CoinGecko returned no market data for ethereum");
                PriceData::unavailable()
            }
            Err(e) => {
                tracing::error!(error = %e, "Error fetching ETH price");
                PriceData::unavailable()
            }
        }
    }

    async fn fetch(&self) -> Result<Option<PriceData>, reqwest::Error> {
        let entries: Vec<MarketEntry> = self
            .client
            .get(format!("{}/coins/markets", self.api_url))
            .query(&[("vs_currency", "usd"), ("ids", "ethereum")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(entries.into_iter().next().map(|entry| PriceData {
            price: entry.current_price,
            image: entry.image,
        }))
    }
}
