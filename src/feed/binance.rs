//! Binance spot ticker

use super::PriceSource;
use crate::error::{BotError, Result};
use crate::types::Quote;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.binance.com";

#[derive(Debug, Deserialize)]
struct TickerPrice {
    #[allow(dead_code)]
    symbol: String,
    price: String,
}

pub struct BinanceSource {
    http: reqwest::Client,
    base_url: String,
}

impl BinanceSource {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PriceSource for BinanceSource {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn fetch(&self, symbol: &str) -> Result<Quote> {
        let url = format!("{}/api/v3/ticker/price?symbol={}", self.base_url, symbol);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let ticker: TickerPrice = response.json().await?;
        let price: Decimal = ticker
            .price
            .parse()
            .map_err(|_| BotError::Parse(format!("bad binance price: {}", ticker.price)))?;

        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            source: self.name().to_string(),
            timestamp: Utc::now(),
        })
    }
}
