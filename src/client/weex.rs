//! Signed client for the WEEX contract REST API
//!
//! Covers the three endpoints the bot needs: account assets, market
//! order placement, and the hackathon AI-decision-log upload.

use super::auth::WeexSigner;
use crate::config::WeexConfig;
use crate::error::{BotError, Result};
use crate::types::{AccountSnapshot, Side};
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const ASSETS_PATH: &str = "/capi/v2/account/assets";
const PLACE_ORDER_PATH: &str = "/capi/v2/order/placeOrder";
const AI_LOG_PATH: &str = "/capi/v2/order/uploadAiLog";

const USER_AGENT: &str = "weex-bot/0.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Exchange acknowledgement for a placed order
#[derive(Debug, Clone)]
pub struct OrderAck {
    pub order_id: Option<String>,
    pub raw: Value,
}

pub struct WeexClient {
    http: Client,
    base_url: String,
    signer: WeexSigner,
}

impl WeexClient {
    pub fn new(base_url: impl Into<String>, signer: WeexSigner) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            signer,
        })
    }

    pub fn from_config(config: &WeexConfig) -> Result<Self> {
        if !config.has_credentials() {
            return Err(BotError::Auth(
                "WEEX credentials missing; set WEEX_API_KEY, WEEX_API_SECRET, WEEX_API_PASSPHRASE"
                    .to_string(),
            ));
        }

        let signer = WeexSigner::new(
            config.api_key.clone(),
            config.api_secret.clone(),
            config.api_passphrase.clone(),
        );
        Self::new(config.base_url.clone(), signer)
    }

    /// Current account balances
    pub async fn get_assets(&self) -> Result<AccountSnapshot> {
        let value = self.signed_get(ASSETS_PATH).await?;
        Ok(AccountSnapshot::from_value(&value))
    }

    /// Place a market order. `size` is in contracts, as the API expects
    /// a string.
    pub async fn place_order(&self, symbol: &str, side: Side, size: &str) -> Result<OrderAck> {
        let client_oid = format!("bot{}", Utc::now().timestamp_millis());
        let payload = serde_json::json!({
            "symbol": symbol.to_lowercase(),
            "client_oid": client_oid,
            "size": size,
            "type": "1",
            "order_type": "0",
            "match_price": "1",
            "price": "0",
            "side": side.weex_code(),
        });

        let raw = self.signed_post(PLACE_ORDER_PATH, &payload).await?;

        let order_id = raw
            .get("order_id")
            .or_else(|| raw.get("orderId"))
            .or_else(|| raw.get("data").and_then(|d| d.get("order_id")))
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        Ok(OrderAck { order_id, raw })
    }

    /// Stream one trading decision to the WEEX compliance endpoint.
    pub async fn upload_ai_log(
        &self,
        symbol: &str,
        action: &str,
        explanation: &str,
        risk_score: f64,
    ) -> Result<()> {
        let payload = serde_json::json!({
            "orderId": Value::Null,
            "stage": "Decision Making",
            "model": "momentum-heuristic-v1",
            "input": {
                "symbol": symbol,
                "strategy": "Momentum Scalp",
                "parameters": "short/long window average ratio",
            },
            "output": {
                "action": action,
                "risk_score": risk_score,
            },
            "explanation": explanation,
        });

        self.signed_post(AI_LOG_PATH, &payload).await?;
        Ok(())
    }

    async fn signed_get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.get(&url).header("locale", "en-US");
        for (name, value) in self.signer.auth_headers("GET", path, "")? {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        Self::read_json(path, response).await
    }

    async fn signed_post(&self, path: &str, payload: &Value) -> Result<Value> {
        let body = serde_json::to_string(payload)?;
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("locale", "en-US");
        for (name, value) in self.signer.auth_headers("POST", path, &body)? {
            request = request.header(name, value);
        }

        let response = request.body(body).send().await?;
        Self::read_json(path, response).await
    }

    async fn read_json(path: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(BotError::Api {
                status: status.as_u16(),
                body: truncate(&text, 200),
            });
        }

        // WEEX sometimes answers 200 with an empty body when fronted by
        // an error page; that is not a success
        if text.trim().is_empty() {
            return Err(BotError::Parse(format!("empty response body from {path}")));
        }

        debug!("{} -> {}", path, truncate(&text, 120));
        serde_json::from_str(&text)
            .map_err(|e| BotError::Parse(format!("invalid JSON from {path}: {e}")))
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
