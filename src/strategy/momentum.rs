//! Momentum heuristic
//!
//! The ratio of the short-window average price to the long-window
//! average. A ratio above 1 + threshold means recent prices run ahead
//! of the trend: buy. Below 1 - threshold with an open position: sell.

use crate::config::StrategyConfig;
use crate::types::{Position, Signal, SignalKind};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Fixed-capacity buffer of recent prices for one symbol
#[derive(Debug, Clone)]
pub struct PriceHistory {
    prices: VecDeque<Decimal>,
    capacity: usize,
}

impl PriceHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            prices: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, price: Decimal) {
        if self.prices.len() >= self.capacity {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn latest(&self) -> Option<Decimal> {
        self.prices.back().copied()
    }

    /// Average of the most recent `window` prices; None until the
    /// buffer holds that many samples.
    pub fn average(&self, window: usize) -> Option<Decimal> {
        if window == 0 || self.prices.len() < window {
            return None;
        }
        let sum: Decimal = self.prices.iter().rev().take(window).sum();
        Some(sum / Decimal::from(window))
    }
}

/// Why an open position was force-closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::TakeProfit => write!(f, "TAKE_PROFIT"),
            ExitReason::StopLoss => write!(f, "STOP_LOSS"),
        }
    }
}

pub struct MomentumStrategy {
    config: StrategyConfig,
}

impl MomentumStrategy {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Evaluate one symbol. No signal until the long window is full;
    /// buys only when flat, sells only when positioned.
    pub fn evaluate(
        &self,
        symbol: &str,
        history: &PriceHistory,
        has_position: bool,
    ) -> Option<Signal> {
        let long_avg = history.average(self.config.long_window)?;
        let short_avg = history.average(self.config.short_window)?;
        let price = history.latest()?;

        if long_avg <= Decimal::ZERO {
            return None;
        }

        let momentum = short_avg / long_avg;
        let pct = Decimal::ONE_HUNDRED;
        let buy_trigger = Decimal::ONE + self.config.buy_threshold_pct / pct;
        let sell_trigger = Decimal::ONE - self.config.sell_threshold_pct / pct;

        let (kind, reason) = if !has_position && momentum >= buy_trigger {
            (
                SignalKind::Buy,
                format!("short/long ratio {momentum:.4} >= {buy_trigger:.4}"),
            )
        } else if has_position && momentum <= sell_trigger {
            (
                SignalKind::Sell,
                format!("short/long ratio {momentum:.4} <= {sell_trigger:.4}"),
            )
        } else {
            return None;
        };

        Some(Signal {
            symbol: symbol.to_string(),
            kind,
            momentum,
            short_avg,
            long_avg,
            price,
            reason,
            timestamp: Utc::now(),
        })
    }

    /// Take-profit / stop-loss check against an open position's
    /// unrealized P&L percentage.
    pub fn exit_signal(&self, position: &Position) -> Option<ExitReason> {
        if position.unrealized_pnl_pct >= self.config.take_profit_pct {
            Some(ExitReason::TakeProfit)
        } else if position.unrealized_pnl_pct <= -self.config.stop_loss_pct {
            Some(ExitReason::StopLoss)
        } else {
            None
        }
    }
}
