//! Tests for core types

#[cfg(test)]
mod tests {
    use super::super::types::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_side_serialization() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"BUY\"");
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"SELL\"");
    }

    #[test]
    fn test_side_weex_codes() {
        assert_eq!(Side::Buy.weex_code(), "1");
        assert_eq!(Side::Sell.weex_code(), "-1");
    }

    #[test]
    fn test_base_asset() {
        assert_eq!(base_asset("BTCUSDT"), "BTC");
        assert_eq!(base_asset("ADAUSD"), "ADA");
        assert_eq!(base_asset("SOL"), "SOL");
    }

    #[test]
    fn test_account_snapshot_flat_object() {
        let value = json!({
            "equity": "1500.5",
            "available": "1200",
            "frozen": "300.5",
            "unrealizePnl": "-12.25"
        });
        let snapshot = AccountSnapshot::from_value(&value);
        assert_eq!(snapshot.total, dec!(1500.5));
        assert_eq!(snapshot.available, dec!(1200));
        assert_eq!(snapshot.in_position, dec!(300.5));
        assert_eq!(snapshot.unrealized_pnl, dec!(-12.25));
    }

    #[test]
    fn test_account_snapshot_data_wrapped_list() {
        let value = json!({
            "data": [{
                "accountEquity": 2000,
                "availableMargin": 1800,
                "frozenMargin": 200,
                "unrealizedPl": 15
            }]
        });
        let snapshot = AccountSnapshot::from_value(&value);
        assert_eq!(snapshot.total, dec!(2000));
        assert_eq!(snapshot.available, dec!(1800));
        assert_eq!(snapshot.in_position, dec!(200));
        assert_eq!(snapshot.unrealized_pnl, dec!(15));
    }

    #[test]
    fn test_account_snapshot_bare_list() {
        let value = json!([{ "equity": "42" }]);
        let snapshot = AccountSnapshot::from_value(&value);
        assert_eq!(snapshot.total, dec!(42));
        assert_eq!(snapshot.available, dec!(0));
    }

    #[test]
    fn test_account_snapshot_garbage_is_zeroed() {
        let value = json!({ "unexpected": true });
        let snapshot = AccountSnapshot::from_value(&value);
        assert_eq!(snapshot, AccountSnapshot::default());
    }

    #[test]
    fn test_account_snapshot_wire_shape() {
        let snapshot = AccountSnapshot {
            total: dec!(100),
            available: dec!(80),
            in_position: dec!(20),
            unrealized_pnl: dec!(1.5),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        // The frontend reads `in_pos`, not `in_position`
        assert!(json.get("in_pos").is_some());
        assert!(json.get("in_position").is_none());
    }

    #[test]
    fn test_position_mark() {
        let mut position = Position {
            symbol: "BTCUSDT".to_string(),
            quantity: dec!(0.5),
            avg_entry_price: dec!(100),
            current_price: dec!(100),
            unrealized_pnl: dec!(0),
            unrealized_pnl_pct: dec!(0),
            opened_at: Utc::now(),
        };

        position.mark(dec!(110));
        assert_eq!(position.unrealized_pnl, dec!(5.0));
        assert_eq!(position.unrealized_pnl_pct, dec!(10));

        position.mark(dec!(90));
        assert_eq!(position.unrealized_pnl, dec!(-5.0));
        assert_eq!(position.unrealized_pnl_pct, dec!(-10));
    }

    #[test]
    fn test_stream_event_tags() {
        let trade = TradeRecord {
            id: uuid::Uuid::new_v4(),
            timestamp: Utc::now(),
            symbol: "ETHUSDT".to_string(),
            side: Side::Buy,
            quantity: dec!(1),
            price: dec!(3000),
            notional: dec!(3000),
            fee: dec!(3),
            pnl: None,
            reason: "test".to_string(),
        };

        let event = StreamEvent::Trade {
            timestamp: trade.timestamp,
            trade,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "trade");
        assert_eq!(json["trade"]["side"], "BUY");

        let event = StreamEvent::RiskUpdate {
            timestamp: Utc::now(),
            symbol: "BTCUSDT".to_string(),
            verdict: "vetoed".to_string(),
            detail: "cooldown".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "risk_update");

        let event = StreamEvent::PositionUpdate {
            timestamp: Utc::now(),
            positions: vec![],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "position_update");
    }

    #[test]
    fn test_signal_round_trip() {
        let signal = Signal {
            symbol: "BTCUSDT".to_string(),
            kind: SignalKind::Buy,
            momentum: dec!(1.0042),
            short_avg: dec!(100.42),
            long_avg: dec!(100),
            price: dec!(101),
            reason: "ratio above trigger".to_string(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&signal).unwrap();
        let back: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, SignalKind::Buy);
        assert_eq!(back.momentum, dec!(1.0042));
    }
}
