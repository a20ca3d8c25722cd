//! Core types shared across modules

use crate::ailog::LogEntry;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl Side {
    /// Side encoding used by the WEEX contract order endpoint
    pub fn weex_code(&self) -> &'static str {
        match self {
            Side::Buy => "1",
            Side::Sell => "-1",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// A single price observation from one venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    /// Which venue answered (binance, coinbase, okx)
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

/// Account balance snapshot, in the shape the dashboard frontend expects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub total: Decimal,
    pub available: Decimal,
    #[serde(rename = "in_pos")]
    pub in_position: Decimal,
    pub unrealized_pnl: Decimal,
}

impl AccountSnapshot {
    /// Parse an exchange assets payload tolerantly.
    ///
    /// WEEX wraps the account either in a bare list or under `data`, and
    /// field names differ between API versions (`equity` vs
    /// `accountEquity`, `frozen` vs `frozenMargin`, ...).
    pub fn from_value(value: &Value) -> Self {
        let obj = match value {
            Value::Array(items) => items.first().unwrap_or(value),
            Value::Object(map) if map.contains_key("data") => {
                let data = &map["data"];
                match data {
                    Value::Array(items) => items.first().unwrap_or(data),
                    _ => data,
                }
            }
            _ => value,
        };

        Self {
            total: pick_decimal(obj, &["equity", "accountEquity", "total"]),
            available: pick_decimal(obj, &["available", "availableMargin"]),
            in_position: pick_decimal(obj, &["frozen", "frozenMargin", "in_pos"]),
            unrealized_pnl: pick_decimal(obj, &["unrealizePnl", "unrealizedPl", "unrealized_pnl"]),
        }
    }
}

/// First matching key, parsed as a decimal from either a number or string
fn pick_decimal(value: &Value, keys: &[&str]) -> Decimal {
    for key in keys {
        match value.get(key) {
            Some(Value::String(s)) => {
                if let Ok(d) = s.parse() {
                    return d;
                }
            }
            Some(Value::Number(n)) => {
                if let Some(d) = n.as_f64().and_then(Decimal::from_f64_retain) {
                    return d;
                }
            }
            _ => {}
        }
    }
    Decimal::ZERO
}

/// Strip the quote currency from a trading pair: BTCUSDT -> BTC
pub fn base_asset(symbol: &str) -> &str {
    let upper_len = symbol.len();
    if symbol.ends_with("USDT") {
        &symbol[..upper_len - 4]
    } else if symbol.ends_with("USD") {
        &symbol[..upper_len - 3]
    } else {
        symbol
    }
}

/// Direction suggested by the momentum heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Buy,
    Sell,
}

/// A momentum signal for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub kind: SignalKind,
    /// short_avg / long_avg
    pub momentum: Decimal,
    pub short_avg: Decimal,
    pub long_avg: Decimal,
    pub price: Decimal,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// An executed (simulated) trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub notional: Decimal,
    pub fee: Decimal,
    /// Realized P&L, set on closing trades only
    pub pnl: Option<Decimal>,
    pub reason: String,
}

/// An open position in the simulated wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_entry_price: Decimal,
    pub current_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pnl_pct: Decimal,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Re-mark the position against a fresh price
    pub fn mark(&mut self, price: Decimal) {
        self.current_price = price;
        self.unrealized_pnl = (price - self.avg_entry_price) * self.quantity;
        self.unrealized_pnl_pct = if self.avg_entry_price > Decimal::ZERO {
            (price - self.avg_entry_price) / self.avg_entry_price * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
    }
}

/// Frames pushed over `/ws/stream`.
///
/// Tagged the way the frontend expects: `log`, `trade`, `price`,
/// `opportunity`, `risk_update`, `position_update`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Price {
        timestamp: DateTime<Utc>,
        symbol: String,
        price: Decimal,
        source: String,
        wallet: AccountSnapshot,
        message: String,
    },
    Trade {
        timestamp: DateTime<Utc>,
        trade: TradeRecord,
    },
    Opportunity {
        timestamp: DateTime<Utc>,
        signal: Signal,
    },
    RiskUpdate {
        timestamp: DateTime<Utc>,
        symbol: String,
        verdict: String,
        detail: String,
    },
    PositionUpdate {
        timestamp: DateTime<Utc>,
        positions: Vec<Position>,
    },
    Log {
        timestamp: DateTime<Utc>,
        entry: LogEntry,
    },
}
