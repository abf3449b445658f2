//! Handler for the `status` command.

use crate::app::Config;
use crate::error::Result;
use crate::store::SnapshotFile;

/// Print the open positions recorded in the ledger file.
pub fn execute(config: &Config, json: bool) -> Result<()> {
    let file = SnapshotFile::new(&config.persistence.positions_file);
    let entries = file.read()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!();
    println!("Ledger: {}", file.path().display());
    if entries.is_empty() {
        println!("No open positions.");
        println!();
        return Ok(());
    }

    println!(
        "{:<10} {:<6} {:>14} {:>14} {:>14} {:>14}  {}",
        "SYMBOL", "SIDE", "ENTRY", "SIZE", "STOP", "TARGET", "OPENED"
    );
    for entry in &entries {
        match entry.as_position() {
            Some(p) => println!(
                "{:<10} {:<6} {:>14} {:>14} {:>14} {:>14}  {}",
                p.symbol(),
                p.direction(),
                p.entry_price(),
                p.size(),
                p.stop_loss(),
                p.take_profit(),
                p.opened_at().to_rfc3339()
            ),
            None => match entry.blocked_symbol() {
                Some(symbol) => println!("{symbol:<10} (unreadable record kept as-is, blocks new entries)"),
                None => println!(
                    "{:<10} (unreadable record kept as-is)",
                    entry.symbol().unwrap_or("?")
                ),
            },
        }
    }
    println!();
    Ok(())
}
