//! Dashboard HTTP + WebSocket API
//!
//! JSON endpoints for the frontend plus `/ws/stream`, which pushes every
//! engine event (price ticks, trades, signals, risk verdicts, logs) as
//! it happens.

use crate::ailog::{AiLogger, LogEntry};
use crate::error::{BotError, Result};
use crate::paper::PortfolioSummary;
use crate::types::{Position, StreamEvent, TradeRecord};
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

const MAX_RECENT_TRADES: usize = 100;
const BROADCAST_CAPACITY: usize = 256;

/// Core metrics displayed on the dashboard
#[derive(Debug, Clone, Serialize, Default)]
pub struct DashboardMetrics {
    pub portfolio_value: Decimal,
    pub initial_capital: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub total_pnl: Decimal,
    /// Return percentage
    pub return_pct: Decimal,
    /// Win rate, 0-1
    pub win_rate: Decimal,
    pub total_trades: u32,
    pub active_positions: u32,
    pub max_drawdown_pct: Decimal,
    pub current_drawdown_pct: Decimal,
    /// Latest quote per symbol
    pub last_prices: HashMap<String, Decimal>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip)]
    peak_value: Decimal,
}

/// State shared between the engine and the HTTP handlers
pub struct DashboardState {
    pub metrics: RwLock<DashboardMetrics>,
    pub trades: RwLock<VecDeque<TradeRecord>>,
    pub positions: RwLock<Vec<Position>>,
    pub started_at: DateTime<Utc>,
    tx: broadcast::Sender<StreamEvent>,
}

impl DashboardState {
    pub fn new(initial_capital: Decimal) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);

        let metrics = DashboardMetrics {
            portfolio_value: initial_capital,
            initial_capital,
            peak_value: initial_capital,
            last_updated: Utc::now(),
            ..Default::default()
        };

        Self {
            metrics: RwLock::new(metrics),
            trades: RwLock::new(VecDeque::with_capacity(MAX_RECENT_TRADES)),
            positions: RwLock::new(Vec::new()),
            started_at: Utc::now(),
            tx,
        }
    }

    /// Sender used by the engine to push stream events
    pub fn sender(&self) -> broadcast::Sender<StreamEvent> {
        self.tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.tx.subscribe()
    }

    /// Refresh headline metrics from a wallet summary
    pub async fn apply_summary(&self, summary: &PortfolioSummary) {
        let mut metrics = self.metrics.write().await;

        metrics.portfolio_value = summary.total_value;
        metrics.realized_pnl = summary.realized_pnl;
        metrics.unrealized_pnl = summary.unrealized_pnl;
        metrics.total_pnl = summary.total_pnl;
        metrics.return_pct = summary.roi_percent;
        metrics.win_rate = summary.win_rate;
        metrics.total_trades = summary.trade_count;
        metrics.active_positions = summary.open_positions;

        if summary.total_value > metrics.peak_value {
            metrics.peak_value = summary.total_value;
        }
        if metrics.peak_value > Decimal::ZERO {
            let drawdown = (metrics.peak_value - summary.total_value) / metrics.peak_value
                * Decimal::ONE_HUNDRED;
            metrics.current_drawdown_pct = drawdown.max(Decimal::ZERO);
            if metrics.current_drawdown_pct > metrics.max_drawdown_pct {
                metrics.max_drawdown_pct = metrics.current_drawdown_pct;
            }
        }

        metrics.last_updated = Utc::now();
    }

    pub async fn record_price(&self, symbol: &str, price: Decimal) {
        let mut metrics = self.metrics.write().await;
        metrics.last_prices.insert(symbol.to_string(), price);
        metrics.last_updated = Utc::now();
    }

    pub async fn record_trade(&self, trade: TradeRecord) {
        let mut trades = self.trades.write().await;
        if trades.len() >= MAX_RECENT_TRADES {
            trades.pop_front();
        }
        trades.push_back(trade);
    }

    pub async fn set_positions(&self, positions: Vec<Position>) {
        *self.positions.write().await = positions;
    }

    pub fn uptime_secs(&self) -> i64 {
        Utc::now().signed_duration_since(self.started_at).num_seconds()
    }
}

/// Everything the axum handlers need
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<DashboardState>,
    pub logger: Arc<AiLogger>,
}

#[derive(Serialize)]
struct DashboardSummary {
    metrics: DashboardMetrics,
    positions: Vec<Position>,
    recent_trades: Vec<TradeRecord>,
    recent_logs: Vec<LogEntry>,
    uptime_secs: i64,
}

async fn health_check() -> &'static str {
    "OK"
}

async fn get_summary(State(state): State<AppState>) -> Json<DashboardSummary> {
    let metrics = state.dashboard.metrics.read().await.clone();
    let positions = state.dashboard.positions.read().await.clone();
    let trades = state.dashboard.trades.read().await;

    let recent_trades: Vec<TradeRecord> = trades.iter().rev().take(10).cloned().collect();
    let mut recent_logs = state.logger.recent().await;
    recent_logs.reverse();
    recent_logs.truncate(20);

    Json(DashboardSummary {
        metrics,
        positions,
        recent_trades,
        recent_logs,
        uptime_secs: state.dashboard.uptime_secs(),
    })
}

async fn get_trades(State(state): State<AppState>) -> Json<Vec<TradeRecord>> {
    let trades = state.dashboard.trades.read().await;
    Json(trades.iter().cloned().collect())
}

async fn get_positions(State(state): State<AppState>) -> Json<Vec<Position>> {
    Json(state.dashboard.positions.read().await.clone())
}

async fn get_logs(State(state): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(state.logger.recent().await)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("dashboard client connected");
    let mut rx = state.dashboard.subscribe();
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        let frame = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!("failed to serialize stream event: {e}");
                                continue;
                            }
                        };
                        if sender.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // Slow consumer: drop missed frames, keep streaming
                        debug!("dashboard client lagged, skipped {missed} frames");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    // Pings are answered by axum; ignore anything else
                    _ => {}
                }
            }
        }
    }

    info!("dashboard client disconnected");
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/summary", get(get_summary))
        .route("/api/trades", get(get_trades))
        .route("/api/positions", get(get_positions))
        .route("/api/logs", get(get_logs))
        .route("/ws/stream", get(ws_handler))
        .with_state(state)
}

/// Serve the dashboard until the process exits
pub async fn start_dashboard(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = create_router(state);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BotError::Internal(format!("failed to bind {addr}: {e}")))?;
    info!("dashboard listening on http://{addr} (ws at /ws/stream)");

    axum::serve(listener, app)
        .await
        .map_err(|e| BotError::Internal(format!("dashboard server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn summary(total: Decimal) -> PortfolioSummary {
        PortfolioSummary {
            initial_balance: dec!(1000),
            cash_balance: total,
            positions_value: Decimal::ZERO,
            total_value: total,
            realized_pnl: total - dec!(1000),
            unrealized_pnl: Decimal::ZERO,
            total_pnl: total - dec!(1000),
            roi_percent: Decimal::ZERO,
            trade_count: 0,
            win_rate: Decimal::ZERO,
            open_positions: 0,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_new_state_starts_at_initial_capital() {
        let state = DashboardState::new(dec!(1000));
        let metrics = state.metrics.read().await;
        assert_eq!(metrics.portfolio_value, dec!(1000));
        assert_eq!(metrics.initial_capital, dec!(1000));
        assert_eq!(metrics.total_trades, 0);
    }

    #[tokio::test]
    async fn test_drawdown_tracks_peak() {
        let state = DashboardState::new(dec!(1000));

        state.apply_summary(&summary(dec!(1200))).await;
        state.apply_summary(&summary(dec!(1000))).await;

        let metrics = state.metrics.read().await;
        // (1200 - 1000) / 1200 = 16.67%
        assert!(metrics.max_drawdown_pct > dec!(16));
        assert!(metrics.max_drawdown_pct < dec!(17));
        assert_eq!(metrics.current_drawdown_pct, metrics.max_drawdown_pct);
    }

    #[tokio::test]
    async fn test_recovery_resets_current_drawdown_only() {
        let state = DashboardState::new(dec!(1000));
        state.apply_summary(&summary(dec!(1200))).await;
        state.apply_summary(&summary(dec!(1000))).await;
        state.apply_summary(&summary(dec!(1200))).await;

        let metrics = state.metrics.read().await;
        assert_eq!(metrics.current_drawdown_pct, Decimal::ZERO);
        assert!(metrics.max_drawdown_pct > dec!(16));
    }

    #[tokio::test]
    async fn test_trades_ring_is_bounded() {
        let state = DashboardState::new(dec!(1000));
        for i in 0..(MAX_RECENT_TRADES + 5) {
            state
                .record_trade(TradeRecord {
                    id: Uuid::new_v4(),
                    timestamp: Utc::now(),
                    symbol: format!("SYM{i}"),
                    side: Side::Buy,
                    quantity: dec!(1),
                    price: dec!(1),
                    notional: dec!(1),
                    fee: Decimal::ZERO,
                    pnl: None,
                    reason: "test".to_string(),
                })
                .await;
        }
        assert_eq!(state.trades.read().await.len(), MAX_RECENT_TRADES);
    }

    #[tokio::test]
    async fn test_stream_event_frame_shape() {
        // The WS frame must carry the frontend's `type` tag
        let event = StreamEvent::Price {
            timestamp: Utc::now(),
            symbol: "BTCUSDT".to_string(),
            price: dec!(90000),
            source: "binance".to_string(),
            wallet: Default::default(),
            message: "System Active".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "price");
        assert_eq!(json["symbol"], "BTCUSDT");
        assert_eq!(json["wallet"]["in_pos"], serde_json::json!("0"));
    }

    #[tokio::test]
    async fn test_record_price_updates_metrics() {
        let state = DashboardState::new(dec!(1000));
        state.record_price("BTCUSDT", dec!(91000)).await;
        let metrics = state.metrics.read().await;
        assert_eq!(metrics.last_prices["BTCUSDT"], dec!(91000));
    }
}
