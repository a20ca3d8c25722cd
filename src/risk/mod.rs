//! Risk management
//!
//! Hard pre-trade checks. A veto rejects the entry outright; nothing is
//! clamped or resized behind the strategy's back.

use crate::config::RiskConfig;
use crate::paper::PortfolioSummary;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Why an entry was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum RiskVeto {
    MaxPositionExceeded {
        requested: Decimal,
        limit: Decimal,
    },
    MaxExposureExceeded {
        exposure: Decimal,
        limit: Decimal,
    },
    DrawdownLimit {
        drawdown: Decimal,
        limit: Decimal,
    },
    CooldownActive {
        symbol: String,
        remaining_secs: i64,
    },
    InsufficientBalance {
        needed: Decimal,
        available: Decimal,
    },
}

impl std::fmt::Display for RiskVeto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskVeto::MaxPositionExceeded { requested, limit } => {
                write!(f, "position size {requested} exceeds limit {limit}")
            }
            RiskVeto::MaxExposureExceeded { exposure, limit } => {
                write!(f, "total exposure {exposure} would exceed limit {limit}")
            }
            RiskVeto::DrawdownLimit { drawdown, limit } => {
                write!(f, "drawdown {drawdown:.4} at or past limit {limit}")
            }
            RiskVeto::CooldownActive { symbol, remaining_secs } => {
                write!(f, "cooldown on {symbol}, {remaining_secs}s remaining")
            }
            RiskVeto::InsufficientBalance { needed, available } => {
                write!(f, "need {needed}, only {available} available")
            }
        }
    }
}

pub struct RiskManager {
    config: RiskConfig,
    high_water: Decimal,
    last_entry: HashMap<String, DateTime<Utc>>,
}

impl RiskManager {
    pub fn new(config: RiskConfig, initial_value: Decimal) -> Self {
        Self {
            config,
            high_water: initial_value,
            last_entry: HashMap::new(),
        }
    }

    /// Competition rule, applied to live order parameters
    pub fn max_leverage(&self) -> u32 {
        self.config.max_leverage
    }

    /// Track the portfolio high-water mark for drawdown
    pub fn observe_portfolio(&mut self, total_value: Decimal) {
        if total_value > self.high_water {
            self.high_water = total_value;
        }
    }

    /// Drawdown from the high-water mark as a fraction (0.10 = 10%)
    pub fn current_drawdown(&self, total_value: Decimal) -> Decimal {
        if self.high_water <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        ((self.high_water - total_value) / self.high_water).max(Decimal::ZERO)
    }

    /// All entry gates, first violation wins
    pub fn check_entry(
        &self,
        symbol: &str,
        notional: Decimal,
        summary: &PortfolioSummary,
    ) -> Result<(), RiskVeto> {
        let position_limit = summary.total_value * self.config.max_position_pct;
        if notional > position_limit {
            return Err(RiskVeto::MaxPositionExceeded {
                requested: notional,
                limit: position_limit,
            });
        }

        let exposure_limit = summary.total_value * self.config.max_exposure_pct;
        let projected = summary.positions_value + notional;
        if projected > exposure_limit {
            return Err(RiskVeto::MaxExposureExceeded {
                exposure: projected,
                limit: exposure_limit,
            });
        }

        let drawdown = self.current_drawdown(summary.total_value);
        if drawdown >= self.config.max_drawdown_pct {
            return Err(RiskVeto::DrawdownLimit {
                drawdown,
                limit: self.config.max_drawdown_pct,
            });
        }

        if let Some(last) = self.last_entry.get(symbol) {
            let elapsed = Utc::now().signed_duration_since(*last).num_seconds();
            let cooldown = self.config.cooldown_secs as i64;
            if elapsed < cooldown {
                return Err(RiskVeto::CooldownActive {
                    symbol: symbol.to_string(),
                    remaining_secs: cooldown - elapsed,
                });
            }
        }

        if notional > summary.cash_balance {
            return Err(RiskVeto::InsufficientBalance {
                needed: notional,
                available: summary.cash_balance,
            });
        }

        Ok(())
    }

    pub fn record_entry(&mut self, symbol: &str) {
        self.last_entry.insert(symbol.to_string(), Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn summary(total: Decimal, cash: Decimal, positions: Decimal) -> PortfolioSummary {
        PortfolioSummary {
            initial_balance: dec!(1000),
            cash_balance: cash,
            positions_value: positions,
            total_value: total,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            total_pnl: Decimal::ZERO,
            roi_percent: Decimal::ZERO,
            trade_count: 0,
            win_rate: Decimal::ZERO,
            open_positions: 0,
            updated_at: Utc::now(),
        }
    }

    fn manager() -> RiskManager {
        RiskManager::new(RiskConfig::default(), dec!(1000))
    }

    #[test]
    fn test_entry_within_limits_passes() {
        let m = manager();
        let s = summary(dec!(1000), dec!(1000), dec!(0));
        assert!(m.check_entry("BTCUSDT", dec!(50), &s).is_ok());
    }

    #[test]
    fn test_oversized_position_vetoed() {
        let m = manager();
        let s = summary(dec!(1000), dec!(1000), dec!(0));
        // Default max_position_pct is 5% -> 50 is the limit
        let veto = m.check_entry("BTCUSDT", dec!(51), &s).unwrap_err();
        assert!(matches!(veto, RiskVeto::MaxPositionExceeded { .. }));
    }

    #[test]
    fn test_exposure_limit_vetoed() {
        let mut config = RiskConfig::default();
        config.max_position_pct = dec!(0.20);
        config.max_exposure_pct = dec!(0.50);
        let m = RiskManager::new(config, dec!(1000));

        // 450 already deployed, 100 more would cross 50% of 1000
        let s = summary(dec!(1000), dec!(550), dec!(450));
        let veto = m.check_entry("BTCUSDT", dec!(100), &s).unwrap_err();
        assert!(matches!(veto, RiskVeto::MaxExposureExceeded { .. }));
    }

    #[test]
    fn test_drawdown_blocks_entries() {
        let mut m = manager();
        m.observe_portfolio(dec!(1200));

        // 1200 -> 1050 is a 12.5% drawdown, past the 10% default
        let s = summary(dec!(1050), dec!(1050), dec!(0));
        let veto = m.check_entry("BTCUSDT", dec!(10), &s).unwrap_err();
        assert!(matches!(veto, RiskVeto::DrawdownLimit { .. }));
    }

    #[test]
    fn test_high_water_mark_only_rises() {
        let mut m = manager();
        m.observe_portfolio(dec!(1200));
        m.observe_portfolio(dec!(900));
        assert_eq!(m.current_drawdown(dec!(900)), dec!(0.25));
    }

    #[test]
    fn test_cooldown_vetoes_reentry() {
        let mut m = manager();
        m.record_entry("BTCUSDT");

        let s = summary(dec!(1000), dec!(1000), dec!(0));
        let veto = m.check_entry("BTCUSDT", dec!(10), &s).unwrap_err();
        assert!(matches!(veto, RiskVeto::CooldownActive { .. }));

        // Other symbols unaffected
        assert!(m.check_entry("ETHUSDT", dec!(10), &s).is_ok());
    }

    #[test]
    fn test_zero_cooldown_allows_reentry() {
        let mut config = RiskConfig::default();
        config.cooldown_secs = 0;
        let mut m = RiskManager::new(config, dec!(1000));
        m.record_entry("BTCUSDT");

        let s = summary(dec!(1000), dec!(1000), dec!(0));
        assert!(m.check_entry("BTCUSDT", dec!(10), &s).is_ok());
    }

    #[test]
    fn test_insufficient_cash_vetoed() {
        let mut config = RiskConfig::default();
        config.max_position_pct = dec!(1);
        config.max_exposure_pct = dec!(2);
        let m = RiskManager::new(config, dec!(1000));

        let s = summary(dec!(1000), dec!(20), dec!(980));
        let veto = m.check_entry("BTCUSDT", dec!(30), &s).unwrap_err();
        assert!(matches!(veto, RiskVeto::InsufficientBalance { .. }));
    }
}
