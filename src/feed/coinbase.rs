//! Coinbase spot price

use super::PriceSource;
use crate::error::{BotError, Result};
use crate::types::{base_asset, Quote};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.coinbase.com";

#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: SpotData,
}

#[derive(Debug, Deserialize)]
struct SpotData {
    amount: String,
}

pub struct CoinbaseSource {
    http: reqwest::Client,
    base_url: String,
}

impl CoinbaseSource {
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
impl PriceSource for CoinbaseSource {
    fn name(&self) -> &'static str {
        "coinbase"
    }

    async fn fetch(&self, symbol: &str) -> Result<Quote> {
        // Coinbase quotes spot pairs against USD, not USDT
        let pair = format!("{}-USD", base_asset(symbol));
        let url = format!("{}/v2/prices/{}/spot", self.base_url, pair);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let spot: SpotResponse = response.json().await?;
        let price: Decimal = spot
            .data
            .amount
            .parse()
            .map_err(|_| BotError::Parse(format!("bad coinbase amount: {}", spot.data.amount)))?;

        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            source: self.name().to_string(),
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_fetch_maps_usdt_pair_to_usd() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/v2/prices/BTC-USD/spot")
            .with_status(200)
            .with_body(r#"{"data": {"base": "BTC", "currency": "USD", "amount": "90123.45"}}"#)
            .create_async()
            .await;

        let source = CoinbaseSource::with_base_url(reqwest::Client::new(), server.url());
        let quote = source.fetch("BTCUSDT").await.unwrap();

        assert_eq!(quote.price, dec!(90123.45));
        assert_eq!(quote.symbol, "BTCUSDT");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/v2/prices/ADA-USD/spot")
            .with_status(404)
            .with_body(r#"{"errors": [{"id": "not_found"}]}"#)
            .create_async()
            .await;

        let source = CoinbaseSource::with_base_url(reqwest::Client::new(), server.url());
        let err = source.fetch("ADAUSDT").await.unwrap_err();
        assert!(matches!(err, BotError::Api { status: 404, .. }));
    }
}
