//! WEEX Momentum Dashboard Bot
//!
//! Polls public crypto tickers with multi-venue fallback, runs a
//! momentum heuristic against a simulated wallet, and streams every
//! tick, trade, and decision to a frontend over WebSocket.
//!
//! ## Architecture
//!
//! ```text
//! Feed (Binance/Coinbase/OKX) → Strategy (momentum) → Risk → Paper Trader
//!                                      ↓                        ↓
//!                               AI Log (WEEX upload)     Storage (SQLite)
//!                                      ↓                        ↓
//!                          Dashboard (axum HTTP + /ws/stream broadcast)
//! ```

pub mod ailog;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod monitor;
pub mod paper;
pub mod risk;
pub mod storage;
pub mod strategy;
pub mod types;

#[cfg(test)]
mod types_tests;
