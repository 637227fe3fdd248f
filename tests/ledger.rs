//! Ledger integration tests: valuation, win rate, projections.

use paper_arena::execution::{buy, sell};
use paper_arena::feed::PriceSnapshot;
use paper_arena::ledger::AgentLedger;

const FEE_RATE: f64 = 0.001;

fn prices(pairs: &[(&str, f64)]) -> PriceSnapshot {
    pairs.iter().map(|(s, p)| (s.to_string(), *p)).collect()
}

#[test]
fn new_ledger_starts_with_capital_in_cash() {
    let ledger = AgentLedger::new("o1-mini", "o1-mini", 10_000.0);
    assert_eq!(ledger.cash_balance(), 10_000.0);
    assert_eq!(ledger.account_value(), 10_000.0);
    assert_eq!(ledger.total_pnl(), 0.0);
    assert_eq!(ledger.return_percent(), 0.0);
    assert_eq!(ledger.win_rate(), 0.0);
    assert_eq!(ledger.position_count(), 0);
}

#[test]
fn valuation_is_idempotent() {
    let mut ledger = AgentLedger::new("a", "A", 10_000.0);
    buy(&mut ledger, "BTC", 1_234.56, 43_210.0, FEE_RATE).unwrap();
    buy(&mut ledger, "ETH", 987.65, 2_345.6, FEE_RATE).unwrap();
    let snapshot = prices(&[("BTC", 44_444.4), ("ETH", 2_222.2)]);

    ledger.valuate(&snapshot);
    let first = (ledger.account_value(), ledger.total_pnl());
    for _ in 0..100 {
        ledger.valuate(&snapshot);
    }

    assert_eq!((ledger.account_value(), ledger.total_pnl()), first);
}

#[test]
fn valuation_recomputes_rather_than_accumulates() {
    let mut ledger = AgentLedger::new("a", "A", 10_000.0);
    buy(&mut ledger, "BTC", 500.0, 50_000.0, FEE_RATE).unwrap();

    ledger.valuate(&prices(&[("BTC", 60_000.0)]));
    ledger.valuate(&prices(&[("BTC", 40_000.0)]));
    ledger.valuate(&prices(&[("BTC", 50_000.0)]));

    assert!((ledger.account_value() - 9_999.5).abs() < 1e-9);
    assert!((ledger.total_pnl() + 0.5).abs() < 1e-9);
}

#[test]
fn missing_price_marks_position_at_entry() {
    let mut ledger = AgentLedger::new("a", "A", 10_000.0);
    buy(&mut ledger, "XRP", 500.0, 0.5, FEE_RATE).unwrap();

    ledger.valuate(&prices(&[("BTC", 50_000.0)]));

    let pos = ledger.position("XRP").unwrap();
    assert!((pos.current_value - 500.0).abs() < 1e-9);
    assert_eq!(pos.unrealized_pnl, 0.0);
}

#[test]
fn win_rate_counts_profitable_closes() {
    let mut ledger = AgentLedger::new("a", "A", 10_000.0);
    // win
    buy(&mut ledger, "BTC", 500.0, 50_000.0, FEE_RATE).unwrap();
    sell(&mut ledger, "BTC", 10_000.0, 55_000.0, FEE_RATE).unwrap();
    // loss
    buy(&mut ledger, "ETH", 500.0, 2_000.0, FEE_RATE).unwrap();
    sell(&mut ledger, "ETH", 10_000.0, 1_800.0, FEE_RATE).unwrap();
    // flat price still loses the fees
    buy(&mut ledger, "SOL", 500.0, 100.0, FEE_RATE).unwrap();
    sell(&mut ledger, "SOL", 10_000.0, 100.0, FEE_RATE).unwrap();
    // still open, not counted
    buy(&mut ledger, "BNB", 500.0, 300.0, FEE_RATE).unwrap();

    assert_eq!(ledger.closed_count(), 3);
    assert_eq!(ledger.winning_count(), 1);
    let rate = ledger.win_rate();
    assert!((rate - 100.0 / 3.0).abs() < 1e-9);
    assert!((0.0..=100.0).contains(&rate));
}

#[test]
fn win_rate_is_zero_not_nan_without_closed_trades() {
    let mut ledger = AgentLedger::new("a", "A", 10_000.0);
    buy(&mut ledger, "BTC", 500.0, 50_000.0, FEE_RATE).unwrap();

    let rate = ledger.win_rate();
    assert!(!rate.is_nan());
    assert_eq!(rate, 0.0);
}

#[test]
fn win_rate_tallies_many_round_trips() {
    let mut ledger = AgentLedger::new("a", "A", 10_000.0);
    for i in 0..200 {
        buy(&mut ledger, "ETH", 100.0, 2_000.0, FEE_RATE).unwrap();
        // every fourth round trip exits higher
        let exit = if i % 4 == 0 { 2_100.0 } else { 1_990.0 };
        sell(&mut ledger, "ETH", 10_000.0, exit, FEE_RATE).unwrap();
    }

    assert_eq!(ledger.closed_count(), 200);
    assert_eq!(ledger.winning_count(), 50);
    assert!((ledger.win_rate() - 25.0).abs() < 1e-9);
    assert!(ledger.open_trades().is_empty());
}

#[test]
fn view_projects_model_state_fields() {
    let mut ledger = AgentLedger::new("gemini-pro", "Gemini Pro 1.5", 10_000.0);
    buy(&mut ledger, "BTC", 1_000.0, 50_000.0, FEE_RATE).unwrap();
    ledger.valuate(&prices(&[("BTC", 60_000.0)]));

    let view = ledger.view();
    assert_eq!(view.agent_id, "gemini-pro");
    assert_eq!(view.name, "Gemini Pro 1.5");
    assert_eq!(view.positions.len(), 1);
    assert_eq!(view.trades_count, 1);
    assert!((view.account_value - (8_999.0 + 1_200.0)).abs() < 1e-6);
    assert!((view.return_percent - 1.99).abs() < 1e-6);

    let json = serde_json::to_value(&view).unwrap();
    for key in ["agentId", "accountValue", "cashBalance", "positions", "totalPnL", "returnPercent", "winRate", "tradesCount"] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert!(json["positions"][0].get("averageEntryPrice").is_some());
    assert!(json["positions"][0].get("unrealizedPnL").is_some());
}

#[test]
fn performance_snapshot_mirrors_ledger() {
    let mut ledger = AgentLedger::new("a", "A", 10_000.0);
    buy(&mut ledger, "BTC", 500.0, 50_000.0, FEE_RATE).unwrap();
    ledger.valuate(&prices(&[("BTC", 50_000.0)]));

    let snapshot = ledger.performance_snapshot();
    assert_eq!(snapshot.agent_id, "a");
    assert_eq!(snapshot.account_value, ledger.account_value());
    assert_eq!(snapshot.total_pnl, ledger.total_pnl());
    assert_eq!(snapshot.trades_count, 1);
    assert_eq!(snapshot.win_rate, 0.0);
}
