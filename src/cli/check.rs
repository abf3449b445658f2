//! Configuration validation command.

use std::path::Path;

use crate::app::Config;

/// Validate a configuration file without starting the engine.
pub fn execute<P: AsRef<Path>>(config_path: P) {
    let path = config_path.as_ref();
    println!("Checking configuration: {}", path.display());
    println!();

    if !path.exists() {
        eprintln!("Error: Configuration file not found: {}", path.display());
        std::process::exit(1);
    }

    match Config::load(path) {
        Ok(config) => {
            println!("Configuration is valid");
            println!();
            println!("  Session:    {:02}:00-{:02}:00 UTC", config.session.start_hour, config.session.end_hour);
            println!("  Symbols:    {}", config.strategy.symbols.join(", "));
            println!("  Timeframe:  {}", config.strategy.timeframe);
            println!(
                "  ATR:        lookback {}, bounds ({}, {})",
                config.strategy.atr_lookback, config.strategy.min_atr, config.strategy.max_atr
            );
            println!("  Threshold:  {} x ATR", config.strategy.threshold_multiplier);
            println!("  Ledger:     {}", config.persistence.positions_file.display());
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
