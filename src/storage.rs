//! Trade history persistence (SQLite)

use crate::error::Result;
use crate::types::{Side, TradeRecord};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct DailyStats {
    pub trades: i64,
    pub wins: i64,
    pub losses: i64,
    pub net_pnl: Decimal,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                quantity TEXT NOT NULL,
                price TEXT NOT NULL,
                notional TEXT NOT NULL,
                fee TEXT NOT NULL,
                pnl TEXT,
                reason TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    pub async fn save_trade(&self, trade: &TradeRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trades (id, timestamp, symbol, side, quantity, price, notional, fee, pnl, reason)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(trade.id.to_string())
        .bind(trade.timestamp.to_rfc3339())
        .bind(&trade.symbol)
        .bind(trade.side.to_string())
        .bind(trade.quantity.to_string())
        .bind(trade.price.to_string())
        .bind(trade.notional.to_string())
        .bind(trade.fee.to_string())
        .bind(trade.pnl.map(|p| p.to_string()))
        .bind(&trade.reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn recent_trades(&self, limit: i64) -> Result<Vec<TradeRecord>> {
        let rows = sqlx::query("SELECT * FROM trades ORDER BY timestamp DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_trade).collect()
    }

    /// Trades executed since midnight UTC
    pub async fn daily_stats(&self) -> Result<DailyStats> {
        let day_start = format!("{}T00:00:00+00:00", Utc::now().format("%Y-%m-%d"));

        let rows = sqlx::query("SELECT pnl FROM trades WHERE timestamp >= ?")
            .bind(&day_start)
            .fetch_all(&self.pool)
            .await?;

        let mut stats = DailyStats {
            trades: rows.len() as i64,
            ..Default::default()
        };

        for row in &rows {
            let pnl: Option<String> = row.try_get("pnl")?;
            if let Some(pnl) = pnl.and_then(|s| s.parse::<Decimal>().ok()) {
                stats.net_pnl += pnl;
                if pnl > Decimal::ZERO {
                    stats.wins += 1;
                } else if pnl < Decimal::ZERO {
                    stats.losses += 1;
                }
            }
        }

        Ok(stats)
    }
}

fn row_to_trade(row: &SqliteRow) -> Result<TradeRecord> {
    let parse_decimal = |field: &str, value: String| {
        value
            .parse::<Decimal>()
            .map_err(|_| crate::error::BotError::Parse(format!("bad {field} in trades row: {value}")))
    };

    let id: String = row.try_get("id")?;
    let timestamp: String = row.try_get("timestamp")?;
    let side: String = row.try_get("side")?;
    let pnl: Option<String> = row.try_get("pnl")?;

    Ok(TradeRecord {
        id: Uuid::parse_str(&id)
            .map_err(|e| crate::error::BotError::Parse(format!("bad trade id: {e}")))?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| crate::error::BotError::Parse(format!("bad trade timestamp: {e}")))?
            .with_timezone(&Utc),
        symbol: row.try_get("symbol")?,
        side: if side == "BUY" { Side::Buy } else { Side::Sell },
        quantity: parse_decimal("quantity", row.try_get("quantity")?)?,
        price: parse_decimal("price", row.try_get("price")?)?,
        notional: parse_decimal("notional", row.try_get("notional")?)?,
        fee: parse_decimal("fee", row.try_get("fee")?)?,
        pnl: match pnl {
            Some(value) => Some(parse_decimal("pnl", value)?),
            None => None,
        },
        reason: row.try_get("reason")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trade(symbol: &str, pnl: Option<Decimal>) -> TradeRecord {
        TradeRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            symbol: symbol.to_string(),
            side: if pnl.is_some() { Side::Sell } else { Side::Buy },
            quantity: dec!(0.002),
            price: dec!(50000),
            notional: dec!(100),
            fee: dec!(0.1),
            pnl,
            reason: "test".to_string(),
        }
    }

    async fn temp_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.db");
        let db = Database::connect(path.to_str().unwrap()).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let (_dir, db) = temp_db().await;

        let original = trade("BTCUSDT", Some(dec!(12.5)));
        db.save_trade(&original).await.unwrap();

        let loaded = db.recent_trades(10).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, original.id);
        assert_eq!(loaded[0].symbol, "BTCUSDT");
        assert_eq!(loaded[0].side, Side::Sell);
        assert_eq!(loaded[0].pnl, Some(dec!(12.5)));
        assert_eq!(loaded[0].quantity, dec!(0.002));
    }

    #[tokio::test]
    async fn test_recent_trades_limit() {
        let (_dir, db) = temp_db().await;
        for i in 0..5 {
            db.save_trade(&trade(&format!("SYM{i}"), None)).await.unwrap();
        }
        let loaded = db.recent_trades(3).await.unwrap();
        assert_eq!(loaded.len(), 3);
    }

    #[tokio::test]
    async fn test_daily_stats() {
        let (_dir, db) = temp_db().await;
        db.save_trade(&trade("BTCUSDT", Some(dec!(10)))).await.unwrap();
        db.save_trade(&trade("ETHUSDT", Some(dec!(-4)))).await.unwrap();
        db.save_trade(&trade("SOLUSDT", None)).await.unwrap();

        let stats = db.daily_stats().await.unwrap();
        assert_eq!(stats.trades, 3);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.net_pnl, dec!(6));
    }

    #[tokio::test]
    async fn test_connect_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/trades.db");
        let db = Database::connect(path.to_str().unwrap()).await.unwrap();
        assert_eq!(db.recent_trades(1).await.unwrap().len(), 0);
    }
}
