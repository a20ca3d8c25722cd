//! Simulated wallet and position tracking

use super::PortfolioSummary;
use crate::config::PaperConfig;
use crate::error::{BotError, Result};
use crate::types::{AccountSnapshot, Position, Side, TradeRecord};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

const MAX_TRADE_HISTORY: usize = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WalletState {
    cash: Decimal,
    realized_pnl: Decimal,
    positions: HashMap<String, Position>,
    history: Vec<TradeRecord>,
    wins: u32,
    losses: u32,
}

/// In-memory wallet with buy/sell simulation, slippage and fees.
/// Cloned snapshots go to the dashboard; state optionally persists to a
/// JSON file so a restart resumes the session.
pub struct PaperTrader {
    config: PaperConfig,
    state: RwLock<WalletState>,
}

impl PaperTrader {
    pub fn new(config: PaperConfig) -> Self {
        let state = WalletState {
            cash: config.initial_balance,
            ..Default::default()
        };
        Self {
            config,
            state: RwLock::new(state),
        }
    }

    /// Open (or add to) a position with `notional` USD at `price`.
    pub async fn buy(
        &self,
        symbol: &str,
        price: Decimal,
        notional: Decimal,
        reason: String,
    ) -> Result<TradeRecord> {
        if price <= Decimal::ZERO || notional <= Decimal::ZERO {
            return Err(BotError::Internal(format!(
                "invalid buy: price {price}, notional {notional}"
            )));
        }

        let pct = Decimal::ONE_HUNDRED;
        let fill_price = price * (Decimal::ONE + self.config.slippage_pct / pct);
        let fee = notional * self.config.fee_pct / pct;
        let cost = notional + fee;
        let quantity = notional / fill_price;

        let mut state = self.state.write().await;
        if state.cash < cost {
            return Err(BotError::InsufficientFunds {
                needed: cost,
                available: state.cash,
            });
        }
        state.cash -= cost;

        let now = Utc::now();
        match state.positions.get_mut(symbol) {
            Some(pos) => {
                // Average in
                let total_cost = pos.avg_entry_price * pos.quantity + fill_price * quantity;
                pos.quantity += quantity;
                pos.avg_entry_price = total_cost / pos.quantity;
                pos.mark(fill_price);
            }
            None => {
                let mut pos = Position {
                    symbol: symbol.to_string(),
                    quantity,
                    avg_entry_price: fill_price,
                    current_price: fill_price,
                    unrealized_pnl: Decimal::ZERO,
                    unrealized_pnl_pct: Decimal::ZERO,
                    opened_at: now,
                };
                pos.mark(fill_price);
                state.positions.insert(symbol.to_string(), pos);
            }
        }

        let trade = TradeRecord {
            id: Uuid::new_v4(),
            timestamp: now,
            symbol: symbol.to_string(),
            side: Side::Buy,
            quantity,
            price: fill_price,
            notional,
            fee,
            pnl: None,
            reason,
        };
        push_history(&mut state.history, trade.clone());

        info!(
            "BUY {} {:.6} @ {} (fee {})",
            symbol, quantity, fill_price, fee
        );
        drop(state);
        self.auto_save().await;

        Ok(trade)
    }

    /// Close the whole position at `price`, realizing P&L.
    pub async fn sell(&self, symbol: &str, price: Decimal, reason: String) -> Result<TradeRecord> {
        let pct = Decimal::ONE_HUNDRED;
        let fill_price = price * (Decimal::ONE - self.config.slippage_pct / pct);

        let mut state = self.state.write().await;
        let position = state
            .positions
            .remove(symbol)
            .ok_or_else(|| BotError::PositionNotFound(symbol.to_string()))?;

        let proceeds = position.quantity * fill_price;
        let fee = proceeds * self.config.fee_pct / pct;
        let cost_basis = position.quantity * position.avg_entry_price;
        let pnl = proceeds - fee - cost_basis;

        state.cash += proceeds - fee;
        state.realized_pnl += pnl;
        if pnl > Decimal::ZERO {
            state.wins += 1;
        } else {
            state.losses += 1;
        }

        let trade = TradeRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            symbol: symbol.to_string(),
            side: Side::Sell,
            quantity: position.quantity,
            price: fill_price,
            notional: proceeds,
            fee,
            pnl: Some(pnl),
            reason,
        };
        push_history(&mut state.history, trade.clone());

        info!("SELL {} {:.6} @ {} pnl {}", symbol, trade.quantity, fill_price, pnl);
        drop(state);
        self.auto_save().await;

        Ok(trade)
    }

    /// Re-mark an open position against a fresh quote. No-op when flat.
    pub async fn mark(&self, symbol: &str, price: Decimal) {
        let mut state = self.state.write().await;
        if let Some(pos) = state.positions.get_mut(symbol) {
            pos.mark(price);
        }
    }

    pub async fn position(&self, symbol: &str) -> Option<Position> {
        self.state.read().await.positions.get(symbol).cloned()
    }

    pub async fn positions(&self) -> Vec<Position> {
        let state = self.state.read().await;
        let mut positions: Vec<Position> = state.positions.values().cloned().collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        positions
    }

    pub async fn history(&self) -> Vec<TradeRecord> {
        self.state.read().await.history.clone()
    }

    pub async fn cash(&self) -> Decimal {
        self.state.read().await.cash
    }

    pub async fn summary(&self) -> PortfolioSummary {
        let state = self.state.read().await;

        let positions_value: Decimal = state
            .positions
            .values()
            .map(|p| p.quantity * p.current_price)
            .sum();
        let unrealized_pnl: Decimal = state.positions.values().map(|p| p.unrealized_pnl).sum();
        let total_value = state.cash + positions_value;
        let total_pnl = state.realized_pnl + unrealized_pnl;

        let roi_percent = if self.config.initial_balance > Decimal::ZERO {
            total_pnl / self.config.initial_balance * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        let closed = state.wins + state.losses;
        let win_rate = if closed > 0 {
            Decimal::from(state.wins) / Decimal::from(closed)
        } else {
            Decimal::ZERO
        };

        PortfolioSummary {
            initial_balance: self.config.initial_balance,
            cash_balance: state.cash,
            positions_value,
            total_value,
            realized_pnl: state.realized_pnl,
            unrealized_pnl,
            total_pnl,
            roi_percent,
            trade_count: state.history.len() as u32,
            win_rate,
            open_positions: state.positions.len() as u32,
            updated_at: Utc::now(),
        }
    }

    /// The wallet in the frame shape the dashboard frontend expects
    pub async fn wallet_snapshot(&self) -> AccountSnapshot {
        let summary = self.summary().await;
        AccountSnapshot {
            total: summary.total_value,
            available: summary.cash_balance,
            in_position: summary.positions_value,
            unrealized_pnl: summary.unrealized_pnl,
        }
    }

    pub async fn save_state(&self, path: &str) -> Result<()> {
        let state = self.state.read().await;
        let json = serde_json::to_string_pretty(&*state)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| BotError::Internal(format!("failed to write {path}: {e}")))?;
        debug!("wallet state saved to {path}");
        Ok(())
    }

    pub async fn load_state(&self, path: &str) -> Result<()> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BotError::Internal(format!("failed to read {path}: {e}")))?;
        let loaded: WalletState = serde_json::from_str(&json)?;
        *self.state.write().await = loaded;
        info!("wallet state restored from {path}");
        Ok(())
    }

    /// Restore from the configured state file if one exists
    pub async fn try_restore(&self) -> Result<bool> {
        if let Some(path) = &self.config.state_file {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                self.load_state(path).await?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn auto_save(&self) {
        if let Some(path) = &self.config.state_file {
            if let Err(e) = self.save_state(path).await {
                tracing::warn!("wallet auto-save failed: {e}");
            }
        }
    }
}

fn push_history(history: &mut Vec<TradeRecord>, trade: TradeRecord) {
    history.push(trade);
    if history.len() > MAX_TRADE_HISTORY {
        history.remove(0);
    }
}
