//! Trading engine
//!
//! One async loop: poll prices with venue fallback, update per-symbol
//! history, evaluate the momentum heuristic, gate through risk, mutate
//! the simulated wallet (optionally mirroring to WEEX), and broadcast
//! every step to the dashboard stream.

use crate::ailog::AiLogger;
use crate::client::WeexClient;
use crate::config::Config;
use crate::error::Result;
use crate::feed::FallbackFeed;
use crate::monitor::DashboardState;
use crate::paper::PaperTrader;
use crate::risk::RiskManager;
use crate::storage::Database;
use crate::strategy::{MomentumStrategy, PriceHistory};
use crate::types::{AccountSnapshot, Quote, Signal, SignalKind, StreamEvent, TradeRecord};
use chrono::Utc;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

const MAX_POLL_ATTEMPTS: u32 = 3;
const POLL_BACKOFF_BASE_MS: u64 = 200;

pub struct TradingEngine {
    config: Config,
    feed: FallbackFeed,
    strategy: MomentumStrategy,
    risk: RiskManager,
    histories: HashMap<String, PriceHistory>,
    trader: Arc<PaperTrader>,
    /// Set when running with `--live`; orders are mirrored to WEEX
    live: Option<Arc<WeexClient>>,
    logger: Arc<AiLogger>,
    dashboard: Arc<DashboardState>,
    db: Database,
    tx: broadcast::Sender<StreamEvent>,
}

impl TradingEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        feed: FallbackFeed,
        trader: Arc<PaperTrader>,
        live: Option<Arc<WeexClient>>,
        logger: Arc<AiLogger>,
        dashboard: Arc<DashboardState>,
        db: Database,
    ) -> Self {
        let strategy = MomentumStrategy::new(config.strategy.clone());
        let risk = RiskManager::new(config.risk.clone(), config.paper.initial_balance);
        let tx = dashboard.sender();

        Self {
            config,
            feed,
            strategy,
            risk,
            histories: HashMap::new(),
            trader,
            live,
            logger,
            dashboard,
            db,
            tx,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        self.logger
            .system(format!(
                "engine started: {} every {}s ({})",
                self.config.feed.symbols.join(", "),
                self.config.feed.poll_interval_secs,
                if self.live.is_some() { "live" } else { "paper" },
            ))
            .await;

        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.feed.poll_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick_once().await;
        }
    }

    /// One full poll round over all configured symbols
    pub async fn tick_once(&mut self) {
        let symbols = self.config.feed.symbols.clone();
        for symbol in &symbols {
            if let Err(e) = self.process_symbol(symbol).await {
                warn!("{symbol}: {e}");
                self.logger.system(format!("{symbol}: {e}")).await;
            }
        }
        self.refresh_portfolio().await;
    }

    async fn process_symbol(&mut self, symbol: &str) -> Result<()> {
        let quote = self.poll_quote(symbol).await?;
        let max_history = self.config.feed.max_history;

        let history = self
            .histories
            .entry(symbol.to_string())
            .or_insert_with(|| PriceHistory::new(max_history));
        history.push(quote.price);

        self.trader.mark(symbol, quote.price).await;
        self.dashboard.record_price(symbol, quote.price).await;

        // Forced exits take priority over new signals
        if let Some(position) = self.trader.position(symbol).await {
            if let Some(reason) = self.strategy.exit_signal(&position) {
                let detail = format!(
                    "{reason}: {:.2}% unrealized at {}",
                    position.unrealized_pnl_pct, quote.price
                );
                match self.trader.sell(symbol, quote.price, detail).await {
                    Ok(trade) => self.after_trade(trade).await,
                    Err(e) => error!("{symbol}: forced exit failed: {e}"),
                }
            }
        }

        let has_position = self.trader.position(symbol).await.is_some();
        let signal = {
            let history = &self.histories[symbol];
            self.strategy.evaluate(symbol, history, has_position)
        };

        if let Some(signal) = signal {
            self.handle_signal(&signal).await;
        }

        self.broadcast_tick(&quote).await;
        Ok(())
    }

    async fn handle_signal(&mut self, signal: &Signal) {
        let _ = self.tx.send(StreamEvent::Opportunity {
            timestamp: signal.timestamp,
            signal: signal.clone(),
        });

        let action = match signal.kind {
            SignalKind::Buy => "BUY",
            SignalKind::Sell => "SELL",
        };
        let risk_score = ((signal.momentum - Decimal::ONE).abs() * Decimal::ONE_HUNDRED)
            .to_f64()
            .unwrap_or(0.0)
            .min(1.0);
        self.logger
            .decision(&signal.symbol, action, &signal.reason, risk_score)
            .await;

        match signal.kind {
            SignalKind::Buy => self.try_enter(signal).await,
            SignalKind::Sell => self.try_exit(signal).await,
        }
    }

    async fn try_enter(&mut self, signal: &Signal) {
        let notional = self.config.strategy.trade_size_usd;
        let summary = self.trader.summary().await;

        if let Err(veto) = self.risk.check_entry(&signal.symbol, notional, &summary) {
            self.logger
                .risk(format!("{} entry vetoed: {veto}", signal.symbol))
                .await;
            let _ = self.tx.send(StreamEvent::RiskUpdate {
                timestamp: Utc::now(),
                symbol: signal.symbol.clone(),
                verdict: "vetoed".to_string(),
                detail: veto.to_string(),
            });
            return;
        }

        match self
            .trader
            .buy(&signal.symbol, signal.price, notional, signal.reason.clone())
            .await
        {
            Ok(trade) => {
                self.risk.record_entry(&signal.symbol);
                self.after_trade(trade).await;
            }
            Err(e) => {
                error!("{}: buy failed: {e}", signal.symbol);
                self.logger
                    .execution(format!("{} BUY failed: {e}", signal.symbol), None)
                    .await;
            }
        }
    }

    async fn try_exit(&mut self, signal: &Signal) {
        match self
            .trader
            .sell(&signal.symbol, signal.price, signal.reason.clone())
            .await
        {
            Ok(trade) => self.after_trade(trade).await,
            Err(e) => error!("{}: sell failed: {e}", signal.symbol),
        }
    }

    async fn after_trade(&mut self, trade: TradeRecord) {
        if let Err(e) = self.db.save_trade(&trade).await {
            error!("failed to persist trade {}: {e}", trade.id);
        }

        self.logger
            .execution(
                format!(
                    "{} {} {:.6} @ {}",
                    trade.side, trade.symbol, trade.quantity, trade.price
                ),
                trade.pnl.map(|p| serde_json::json!({ "pnl": p })),
            )
            .await;

        self.dashboard.record_trade(trade.clone()).await;
        let _ = self.tx.send(StreamEvent::Trade {
            timestamp: trade.timestamp,
            trade: trade.clone(),
        });

        self.mirror_live(&trade).await;
    }

    /// Mirror a simulated fill to the WEEX contract API when live.
    /// Size is one contract; a live failure never unwinds the paper
    /// trade, it is reported and the session continues.
    async fn mirror_live(&self, trade: &TradeRecord) {
        let Some(weex) = &self.live else {
            return;
        };

        let contract = format!("cmt_{}", trade.symbol.to_lowercase());
        match weex.place_order(&contract, trade.side, "1").await {
            Ok(ack) => {
                info!(
                    "live order mirrored: {} {} (order_id {:?})",
                    trade.side, contract, ack.order_id
                );
                self.logger
                    .api(format!("live {} {} accepted", trade.side, contract))
                    .await;
            }
            Err(e) => {
                error!("live order failed for {contract}: {e}");
                self.logger
                    .execution(format!("live {} {contract} failed: {e}", trade.side), None)
                    .await;
            }
        }
    }

    async fn broadcast_tick(&self, quote: &Quote) {
        let wallet = self.wallet_snapshot().await;
        let _ = self.tx.send(StreamEvent::Price {
            timestamp: quote.timestamp,
            symbol: quote.symbol.clone(),
            price: quote.price,
            source: quote.source.clone(),
            wallet,
            message: "System Active".to_string(),
        });
    }

    /// Live mode shows the exchange account when reachable, otherwise
    /// the paper wallet.
    async fn wallet_snapshot(&self) -> AccountSnapshot {
        if let Some(weex) = &self.live {
            match weex.get_assets().await {
                Ok(snapshot) => return snapshot,
                Err(e) => debug!("wallet fetch failed, using paper wallet: {e}"),
            }
        }
        self.trader.wallet_snapshot().await
    }

    async fn refresh_portfolio(&mut self) {
        let summary = self.trader.summary().await;
        self.risk.observe_portfolio(summary.total_value);
        self.dashboard.apply_summary(&summary).await;

        let positions = self.trader.positions().await;
        self.dashboard.set_positions(positions.clone()).await;
        let _ = self.tx.send(StreamEvent::PositionUpdate {
            timestamp: Utc::now(),
            positions,
        });
    }

    async fn poll_quote(&self, symbol: &str) -> Result<Quote> {
        let mut attempt = 0;
        loop {
            match self.feed.latest(symbol).await {
                Ok(quote) => return Ok(quote),
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_POLL_ATTEMPTS {
                        return Err(e);
                    }
                    let jitter = rand::rng().random_range(0..100u64);
                    let backoff = POLL_BACKOFF_BASE_MS * 2u64.pow(attempt - 1) + jitter;
                    debug!("{symbol}: poll attempt {attempt} failed ({e}), retrying in {backoff}ms");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
            }
        }
    }
}
