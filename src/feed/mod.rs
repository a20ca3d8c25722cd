//! Public ticker polling with multi-venue fallback
//!
//! One `PriceSource` per venue, tried in order until one answers. A
//! symbol only fails a tick when every venue fails; there is no
//! made-up fallback price.

pub mod binance;
pub mod coinbase;
pub mod okx;

pub use binance::BinanceSource;
pub use coinbase::CoinbaseSource;
pub use okx::OkxSource;

use crate::config::FeedConfig;
use crate::error::{BotError, Result};
use crate::types::Quote;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, symbol: &str) -> Result<Quote>;
}

/// Normalize a pair to exchange-neutral form: `cmt_btcusdt` -> `BTCUSDT`
pub fn normalize_symbol(symbol: &str) -> String {
    symbol
        .trim_start_matches("cmt_")
        .trim_end_matches("_UMCBL")
        .replace('_', "")
        .to_uppercase()
}

/// Tries each venue in order, returns the first answer
pub struct FallbackFeed {
    sources: Vec<Box<dyn PriceSource>>,
}

impl FallbackFeed {
    pub fn new(sources: Vec<Box<dyn PriceSource>>) -> Self {
        Self { sources }
    }

    /// Binance -> Coinbase -> OKX, with the configured request timeout
    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self::new(vec![
            Box::new(BinanceSource::new(http.clone())),
            Box::new(CoinbaseSource::new(http.clone())),
            Box::new(OkxSource::new(http)),
        ]))
    }

    pub async fn latest(&self, symbol: &str) -> Result<Quote> {
        let symbol = normalize_symbol(symbol);

        for source in &self.sources {
            match source.fetch(&symbol).await {
                Ok(quote) => return Ok(quote),
                Err(e) => {
                    debug!("{} failed for {}: {}", source.name(), symbol, e);
                }
            }
        }

        Err(BotError::FeedExhausted {
            symbol,
            attempts: self.sources.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    struct FailingSource;

    #[async_trait]
    impl PriceSource for FailingSource {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn fetch(&self, _symbol: &str) -> Result<Quote> {
            Err(BotError::Parse("boom".to_string()))
        }
    }

    struct FixedSource;

    #[async_trait]
    impl PriceSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch(&self, symbol: &str) -> Result<Quote> {
            Ok(Quote {
                symbol: symbol.to_string(),
                price: dec!(90000),
                source: "fixed".to_string(),
                timestamp: Utc::now(),
            })
        }
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("cmt_btcusdt"), "BTCUSDT");
        assert_eq!(normalize_symbol("BTCUSDT_UMCBL"), "BTCUSDT");
        assert_eq!(normalize_symbol("ethusdt"), "ETHUSDT");
    }

    #[tokio::test]
    async fn test_fallback_skips_failing_source() {
        let feed = FallbackFeed::new(vec![Box::new(FailingSource), Box::new(FixedSource)]);
        let quote = feed.latest("btcusdt").await.unwrap();
        assert_eq!(quote.source, "fixed");
        assert_eq!(quote.price, dec!(90000));
        assert_eq!(quote.symbol, "BTCUSDT");
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_feed_exhausted() {
        let feed = FallbackFeed::new(vec![Box::new(FailingSource), Box::new(FailingSource)]);
        let err = feed.latest("BTCUSDT").await.unwrap_err();
        match err {
            BotError::FeedExhausted { symbol, attempts } => {
                assert_eq!(symbol, "BTCUSDT");
                assert_eq!(attempts, 2);
            }
            other => panic!("expected FeedExhausted, got {other:?}"),
        }
    }
}
