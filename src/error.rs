//! Error types for the bot
//!
//! Every failure mode is a distinct variant so callers can tell a dead
//! network from a malformed payload from a rejected trade.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("All price sources failed for {symbol} ({attempts} attempts)")]
    FeedExhausted { symbol: String, attempts: usize },

    #[error("Risk check rejected trade: {0}")]
    Risk(String),

    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds {
        needed: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("No open position for {0}")]
    PositionNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for BotError {
    fn from(e: serde_json::Error) -> Self {
        BotError::Parse(e.to_string())
    }
}
