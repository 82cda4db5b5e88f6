//! List strategies command.

use anyhow::Result;
use trading_strategies::StrategyRegistry;

pub fn run() -> Result<()> {
    let registry = StrategyRegistry::new();

    println!("Available Strategies");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for info in registry.list() {
        println!("  {} ({})", info.name, info.id);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", info.description);
        println!("  Defaults: {}", info.default_params);
        println!();
    }

    println!("Use --strategy <id> to select a strategy and --params '<json>' to override defaults.");

    Ok(())
}
