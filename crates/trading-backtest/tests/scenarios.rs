//! End-to-end runs with hand-checked numbers.

mod support;

use support::{daily_series, Scripted, DAY_MS};
use trading_backtest::{BacktestEngine, BacktestError, RunConfig};
use std::sync::Arc;
use trading_core::events::{Event, MemorySink, NullSink};
use trading_core::types::{Bar, BarSeries, ExitReason, PositionType, RiskParams, Timeframe};
use trading_strategies::{MACrossoverConfig, MACrossoverStrategy, StrategyRegistry};

fn close_to(actual: f64, expected: f64, tolerance: f64) -> bool {
    (actual - expected).abs() < tolerance
}

#[test]
fn long_round_trip_with_costs() {
    let engine = BacktestEngine::silent(RunConfig::default()).unwrap();
    let mut strategy = Scripted::new().long(&[0], &[1]);

    let report = engine.run(&mut strategy, &daily_series(&[100.0, 110.0])).unwrap();

    assert_eq!(report.trades.len(), 1);
    let trade = &report.trades[0];
    assert_eq!(trade.position_type, PositionType::Long);
    assert_eq!(trade.exit_reason, ExitReason::Signal);
    assert!(close_to(trade.entry_price, 100.05, 1e-9));
    assert!(close_to(trade.size, 49.975, 1e-3));
    assert!(close_to(trade.entry_commission, 5.0, 1e-9));
    assert!(close_to(trade.exit_price, 109.945, 1e-9));
    assert!(close_to(trade.exit_commission, 5.49, 0.01));
    assert!(close_to(trade.pnl, 494.5, 0.01));
    assert!(close_to(trade.pnl_pct, 9.89, 0.01));

    // capital after the entry bar, before unrealized PnL
    let entry_equity = report.equity_curve[0].equity;
    let unrealized = (100.0 - 100.05) * trade.size;
    assert!(close_to(entry_equity - unrealized, 4_995.0, 1e-9));

    assert!(close_to(report.metrics.final_capital, 10_484.01, 0.01));
    assert_eq!(report.equity_curve[1].position, PositionType::Flat);
    assert!(close_to(report.equity_curve[1].equity, report.metrics.final_capital, 1e-9));
}

#[test]
fn short_round_trip_profits_from_decline() {
    let engine = BacktestEngine::silent(RunConfig::default()).unwrap();
    let mut strategy = Scripted::new().short(&[0], &[1]);

    let report = engine.run(&mut strategy, &daily_series(&[100.0, 90.0])).unwrap();

    let trade = &report.trades[0];
    assert_eq!(trade.position_type, PositionType::Short);
    assert!(close_to(trade.entry_price, 99.95, 1e-9));
    assert!(close_to(trade.exit_price, 90.045, 1e-9));
    assert!(close_to(trade.pnl, (99.95 - 90.045) * trade.size, 1e-9));
    assert!(trade.pnl > 0.0);

    let expected = 10_000.0 + trade.pnl - trade.total_commission();
    assert!(close_to(report.metrics.final_capital, expected, 1e-6));
}

#[test]
fn flat_market_leaves_capital_untouched() {
    let engine = BacktestEngine::silent(RunConfig::default()).unwrap();
    let mut strategy = MACrossoverStrategy::new(MACrossoverConfig {
        ma_short: 5,
        ma_long: 20,
        ..Default::default()
    });

    let report = engine.run(&mut strategy, &daily_series(&[100.0; 60])).unwrap();

    assert_eq!(report.metrics.total_trades, 0);
    assert_eq!(report.metrics.final_capital, 10_000.0);
    assert_eq!(report.metrics.total_return, 0.0);
    assert_eq!(report.metrics.max_drawdown, 0.0);
    assert_eq!(report.metrics.sharpe_ratio, 0.0);
    assert!(report.equity_curve.iter().all(|s| s.equity == 10_000.0));
}

#[test]
fn open_position_is_liquidated_on_last_bar() {
    let sink = MemorySink::new();
    let engine = BacktestEngine::new(RunConfig::default())
        .unwrap()
        .with_sink(sink.clone());
    let mut strategy = Scripted::new().long(&[1], &[]);

    let report = engine
        .run(&mut strategy, &daily_series(&[100.0, 101.0, 102.0, 103.0]))
        .unwrap();

    assert_eq!(report.trades.len(), 1);
    let trade = &report.trades[0];
    assert_eq!(trade.exit_reason, ExitReason::Final);
    assert_eq!(trade.entry_index, 1);
    assert_eq!(trade.exit_index, 3);
    assert_eq!(trade.exit_time, 3 * DAY_MS);
    assert!(close_to(trade.exit_price, 103.0 * 0.9995, 1e-9));

    let closed = sink.count(|e| {
        matches!(
            e,
            Event::PositionClosed {
                reason: ExitReason::Final,
                ..
            }
        )
    });
    assert_eq!(closed, 1);
}

#[test]
fn stop_loss_closes_then_reenters_same_bar() {
    let sink = MemorySink::new();
    let engine = BacktestEngine::new(RunConfig::default())
        .unwrap()
        .with_sink(sink.clone());
    let mut strategy = Scripted::with_risk(RiskParams {
        stop_loss: 0.02,
        take_profit: 0.5,
        max_position_size: 0.5,
    })
    .long(&[0, 1], &[]);

    let report = engine
        .run(&mut strategy, &daily_series(&[100.0, 97.0, 97.5]))
        .unwrap();

    assert_eq!(report.trades.len(), 2);
    assert_eq!(report.trades[0].exit_reason, ExitReason::StopLoss);
    assert_eq!(report.trades[0].exit_index, 1);
    assert_eq!(report.trades[1].entry_index, 1);
    assert_eq!(report.trades[1].exit_reason, ExitReason::Final);
    assert_eq!(sink.count(|e| matches!(e, Event::ProtectiveExit { .. })), 1);
}

#[test]
fn take_profit_preempts_signal_exit() {
    let engine = BacktestEngine::silent(RunConfig::default()).unwrap();
    let mut strategy = Scripted::with_risk(RiskParams {
        stop_loss: 0.5,
        take_profit: 0.04,
        max_position_size: 0.5,
    })
    .long(&[0], &[1]);

    let report = engine.run(&mut strategy, &daily_series(&[100.0, 105.0])).unwrap();

    assert_eq!(report.trades.len(), 1);
    assert_eq!(report.trades[0].exit_reason, ExitReason::TakeProfit);
}

#[test]
fn entries_are_skipped_when_capital_is_short() {
    let sink = MemorySink::new();
    let config = RunConfig {
        max_position_size: 1.0,
        ..Default::default()
    };
    let engine = BacktestEngine::new(config).unwrap().with_sink(sink.clone());
    let mut strategy = Scripted::new().long(&[0], &[]);

    let report = engine.run(&mut strategy, &daily_series(&[100.0, 100.0])).unwrap();

    assert!(report.trades.is_empty());
    assert_eq!(report.metrics.final_capital, 10_000.0);
    assert_eq!(sink.count(|e| matches!(e, Event::EntrySkipped { .. })), 1);
    assert_eq!(sink.count(|e| matches!(e, Event::PositionOpened { .. })), 0);
}

#[test]
fn short_entries_open_with_full_allocation() {
    let sink = MemorySink::new();
    let config = RunConfig {
        max_position_size: 1.0,
        ..Default::default()
    };
    let engine = BacktestEngine::new(config).unwrap().with_sink(sink.clone());
    let mut strategy = Scripted::new().short(&[0], &[1]);

    let report = engine.run(&mut strategy, &daily_series(&[100.0, 95.0])).unwrap();

    assert_eq!(sink.count(|e| matches!(e, Event::EntrySkipped { .. })), 0);
    assert_eq!(report.trades.len(), 1);
    let trade = &report.trades[0];
    assert_eq!(trade.position_type, PositionType::Short);
    assert_eq!(trade.exit_reason, ExitReason::Signal);
    assert!(close_to(trade.entry_price, 99.95, 1e-9));
    assert!(close_to(trade.size, 10_000.0 / 99.95, 1e-9));
    assert!(trade.pnl > 0.0);
    assert!(close_to(
        report.metrics.final_capital,
        10_000.0 + trade.pnl - trade.total_commission(),
        1e-6
    ));
}

#[test]
fn malformed_series_fails_before_any_bar() {
    let sink = MemorySink::new();
    let engine = BacktestEngine::new(RunConfig::default())
        .unwrap()
        .with_sink(sink.clone());
    let mut strategy = Scripted::new().long(&[0], &[]);

    let series = BarSeries::from_bars(
        "TEST",
        Timeframe::Daily,
        vec![
            Bar::new(DAY_MS, 100.0, 101.0, 99.0, 100.0, 10.0),
            Bar::new(0, 100.0, 101.0, 99.0, 100.0, 10.0),
        ],
    );

    assert!(matches!(
        engine.run(&mut strategy, &series),
        Err(BacktestError::Data(_))
    ));
    assert!(sink.events().is_empty());
}

#[test]
fn repeated_runs_are_identical() {
    let registry = StrategyRegistry::new();
    let mut strategy = registry
        .create_default("macd", Arc::new(NullSink))
        .unwrap();
    let closes: Vec<f64> = (0..200)
        .map(|i| 100.0 + (i as f64 * 0.15).sin() * 8.0 + i as f64 * 0.05)
        .collect();
    let series = daily_series(&closes);
    let engine = BacktestEngine::silent(RunConfig::default()).unwrap();

    let first = engine.run(strategy.as_mut(), &series).unwrap();
    let second = engine.run(strategy.as_mut(), &series).unwrap();

    assert_eq!(first.trades, second.trades);
    assert_eq!(first.equity_curve, second.equity_curve);
    assert_eq!(first.metrics, second.metrics);
}
