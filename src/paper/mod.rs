//! Paper trading
//!
//! Simulated wallet driven by real market data. No order ever leaves
//! the process; balances and positions are notional.

mod trader;

pub use trader::PaperTrader;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Paper trading portfolio summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Starting balance
    pub initial_balance: Decimal,
    /// Current cash balance
    pub cash_balance: Decimal,
    /// Total value of open positions at current prices
    pub positions_value: Decimal,
    /// Total portfolio value (cash + positions)
    pub total_value: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub total_pnl: Decimal,
    /// ROI percentage
    pub roi_percent: Decimal,
    pub trade_count: u32,
    /// Fraction of closing trades that realized a profit
    pub win_rate: Decimal,
    pub open_positions: u32,
    pub updated_at: DateTime<Utc>,
}
