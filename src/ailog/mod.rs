//! AI decision log
//!
//! Structured log entries for the dashboard log stream, with best-effort
//! mirroring of trading decisions to the WEEX compliance endpoint.
//!
//! Entry kinds:
//! - API: exchange/feed interactions
//! - AI: strategy evaluations
//! - RISK: risk manager verdicts
//! - EXEC: trade executions
//! - SYSTEM: lifecycle and status

use crate::client::WeexClient;
use crate::types::StreamEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

const LOG_RING_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogKind {
    #[serde(rename = "API")]
    Api,
    #[serde(rename = "AI")]
    Ai,
    #[serde(rename = "RISK")]
    Risk,
    #[serde(rename = "EXEC")]
    Exec,
    #[serde(rename = "SYSTEM")]
    System,
}

/// One dashboard log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>, metadata: Option<Value>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            message: message.into(),
            metadata,
        }
    }
}

/// Emits log entries to the dashboard stream and keeps a bounded ring
/// of recent entries for `GET /api/logs`.
pub struct AiLogger {
    tx: broadcast::Sender<StreamEvent>,
    ring: RwLock<VecDeque<LogEntry>>,
    weex: Option<Arc<WeexClient>>,
}

impl AiLogger {
    pub fn new(tx: broadcast::Sender<StreamEvent>, weex: Option<Arc<WeexClient>>) -> Self {
        Self {
            tx,
            ring: RwLock::new(VecDeque::with_capacity(LOG_RING_CAPACITY)),
            weex,
        }
    }

    pub async fn emit(&self, entry: LogEntry) {
        {
            let mut ring = self.ring.write().await;
            if ring.len() >= LOG_RING_CAPACITY {
                ring.pop_front();
            }
            ring.push_back(entry.clone());
        }

        // Nobody listening is fine; the ring still has it
        let _ = self.tx.send(StreamEvent::Log {
            timestamp: entry.timestamp,
            entry,
        });
    }

    pub async fn recent(&self) -> Vec<LogEntry> {
        self.ring.read().await.iter().cloned().collect()
    }

    pub async fn api(&self, message: impl Into<String>) {
        self.emit(LogEntry::new(LogKind::Api, message, None)).await;
    }

    pub async fn ai(&self, message: impl Into<String>, metadata: Option<Value>) {
        self.emit(LogEntry::new(LogKind::Ai, message, metadata)).await;
    }

    pub async fn risk(&self, message: impl Into<String>) {
        self.emit(LogEntry::new(LogKind::Risk, message, None)).await;
    }

    pub async fn execution(&self, message: impl Into<String>, metadata: Option<Value>) {
        self.emit(LogEntry::new(LogKind::Exec, message, metadata)).await;
    }

    pub async fn system(&self, message: impl Into<String>) {
        self.emit(LogEntry::new(LogKind::System, message, None)).await;
    }

    /// Log a trading decision and mirror it to the WEEX compliance
    /// endpoint when credentials are configured. Upload failures are
    /// logged and swallowed; compliance mirroring must never stop the
    /// engine.
    pub async fn decision(
        &self,
        symbol: &str,
        action: &str,
        explanation: &str,
        risk_score: f64,
    ) {
        self.ai(
            format!("{symbol}: {action} ({explanation})"),
            Some(serde_json::json!({ "risk_score": risk_score })),
        )
        .await;

        if let Some(weex) = &self.weex {
            match weex.upload_ai_log(symbol, action, explanation, risk_score).await {
                Ok(()) => debug!("AI log uploaded for {symbol}"),
                Err(e) => warn!("AI log upload failed for {symbol}: {e}"),
            }
        }
    }
}
