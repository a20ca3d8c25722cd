//! OKX market ticker

use super::PriceSource;
use crate::error::{BotError, Result};
use crate::types::{base_asset, Quote};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://www.okx.com";

#[derive(Debug, Deserialize)]
struct TickerResponse {
    code: String,
    data: Vec<TickerData>,
}

#[derive(Debug, Deserialize)]
struct TickerData {
    last: String,
}

pub struct OkxSource {
    http: reqwest::Client,
    base_url: String,
}

impl OkxSource {
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
impl PriceSource for OkxSource {
    fn name(&self) -> &'static str {
        "okx"
    }

    async fn fetch(&self, symbol: &str) -> Result<Quote> {
        let inst_id = format!("{}-USDT", base_asset(symbol));
        let url = format!("{}/api/v5/market/ticker?instId={}", self.base_url, inst_id);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let ticker: TickerResponse = response.json().await?;
        // OKX reports failures as 200 with a non-zero code
        if ticker.code != "0" {
            return Err(BotError::Api {
                status: status.as_u16(),
                body: format!("okx code {}", ticker.code),
            });
        }

        let last = ticker
            .data
            .first()
            .ok_or_else(|| BotError::Parse("okx ticker data empty".to_string()))?;

        let price: Decimal = last
            .last
            .parse()
            .map_err(|_| BotError::Parse(format!("bad okx price: {}", last.last)))?;

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
    async fn test_fetch_parses_first_ticker() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/v5/market/ticker")
            .match_query(mockito::Matcher::UrlEncoded("instId".into(), "SOL-USDT".into()))
            .with_status(200)
            .with_body(r#"{"code": "0", "msg": "", "data": [{"instId": "SOL-USDT", "last": "142.33"}]}"#)
            .create_async()
            .await;

        let source = OkxSource::with_base_url(reqwest::Client::new(), server.url());
        let quote = source.fetch("SOLUSDT").await.unwrap();
        assert_eq!(quote.price, dec!(142.33));
        assert_eq!(quote.source, "okx");
    }

    #[tokio::test]
    async fn test_non_zero_code_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/v5/market/ticker")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"code": "51001", "msg": "Instrument ID does not exist", "data": []}"#)
            .create_async()
            .await;

        let source = OkxSource::with_base_url(reqwest::Client::new(), server.url());
        let err = source.fetch("NOPEUSDT").await.unwrap_err();
        assert!(matches!(err, BotError::Api { .. }));
    }

    #[tokio::test]
    async fn test_empty_data_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/v5/market/ticker")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"code": "0", "msg": "", "data": []}"#)
            .create_async()
            .await;

        let source = OkxSource::with_base_url(reqwest::Client::new(), server.url());
        let err = source.fetch("BTCUSDT").await.unwrap_err();
        assert!(matches!(err, BotError::Parse(_)));
    }
}
