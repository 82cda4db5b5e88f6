//! Paper trading command: replays a CSV file through the live driver.

use anyhow::{Context, Result};
use tracing::{info, warn};
use trading_broker::{LiveExecutor, PaperClient};
use trading_config::AppConfig;
use trading_data::{load_csv, ReplayFeed};

use super::{create_strategy, resolve_config};
use crate::cli::PaperArgs;

pub async fn run(args: PaperArgs, config: &AppConfig) -> Result<()> {
    let config = resolve_config(config, &args.market)?;

    let data_path = config
        .backtest
        .data_file
        .clone()
        .context("No data file given; pass --data or set backtest.data_file")?;
    let series = load_csv(&data_path, &config.trading.symbol, config.timeframe()?)
        .with_context(|| format!("Failed to load {}", data_path.display()))?;

    let warmup = args.warmup.unwrap_or(config.live.window);
    let symbol = config.trading.symbol.clone();
    let feed = ReplayFeed::new(series, warmup);
    let client = PaperClient::new(config.paper_config());
    let strategy = create_strategy(&config)?;
    let mut executor = LiveExecutor::new(feed, client, strategy, config.live_config()?);

    info!(
        strategy = executor.strategy().name(),
        symbol = %symbol,
        warmup = executor.provider().position(),
        remaining = executor.provider().remaining(),
        "Starting paper session"
    );

    let mut steps = 0usize;
    loop {
        if let Some(bar) = executor.provider().current() {
            executor.client().set_mark(&symbol, bar.close);
        }
        match executor.step().await {
            Ok(_) => steps += 1,
            Err(e) => warn!(error = %e, "Step failed"),
        }
        if executor.provider().advance().is_none() {
            break;
        }
    }

    let client = executor.client();
    let orders = client.orders();
    let initial = client.config().initial_balance;
    let equity = client.equity();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                     PAPER SESSION RESULTS                    ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║ Strategy:          {:>40} ║", executor.strategy().name());
    println!("║ Symbol:            {:>40} ║", symbol);
    println!("║ Steps:             {:>40} ║", steps);
    println!("║ Orders:            {:>40} ║", orders.len());
    println!("║ Position:          {:>40} ║", executor.strategy().book().position().to_string());
    println!("║ Cash Balance:      {:>40.2} ║", client.balance());
    println!("║ Equity:            {:>40.2} ║", equity);
    println!("║ Return:            {:>39.2}% ║", (equity / initial - 1.0) * 100.0);
    println!("╚══════════════════════════════════════════════════════════════╝");

    if !orders.is_empty() {
        println!();
        println!("{:<20} {:<5} {:>14} {:>14} {:>10}", "Time", "Side", "Quantity", "Price", "Fee");
        for order in &orders {
            println!(
                "{:<20} {:<5} {:>14.6} {:>14.4} {:>10.4}",
                order.created_at.format("%Y-%m-%d %H:%M:%S"),
                order.side.to_string(),
                order.quantity,
                order.fill_price.unwrap_or_default(),
                order.commission,
            );
        }
    }

    Ok(())
}
