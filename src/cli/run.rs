//! Handler for the `run` command.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing::info;

use crate::app::{
    Config, EngineState, LifecycleParams, PositionLifecycleManager, SchedulerSettings,
    TradingCycleScheduler,
};
use crate::cli::RunArgs;
use crate::domain::{ProfileTable, RiskSizer, TradeReport};
use crate::error::Result;
use crate::exchange::{KrakenFeed, MarketData};
use crate::service::{LogNotifier, NotifierRegistry};
use crate::store::PositionStore;

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;

    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    config.init_logging();

    info!(
        symbols = ?config.strategy.symbols,
        timeframe = %config.strategy.timeframe,
        "killzone starting"
    );

    let store = Arc::new(PositionStore::new(
        &config.persistence.positions_file,
        config.persistence.debounce(),
    ));
    store.restore()?;

    let state = Arc::new(EngineState::new(Arc::clone(&store)));
    let lifecycle = PositionLifecycleManager::new(
        Arc::clone(&store),
        RiskSizer::new(ProfileTable::from(&config.risk)),
        LifecycleParams::from(&config.strategy),
    );
    let feed: Arc<dyn MarketData> = Arc::new(KrakenFeed::new(
        config.feed.api_url.clone(),
        config.scheduler.fetch_timeout(),
    )?);

    let mut notifiers = NotifierRegistry::new();
    notifiers.register(Box::new(LogNotifier));

    let scheduler = TradingCycleScheduler::new(
        state,
        lifecycle,
        feed,
        Arc::new(notifiers),
        SchedulerSettings::from(&config),
    );
    if args.paused {
        scheduler.pause();
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    scheduler.run(shutdown_rx).await?;

    let report = TradeReport::from_closed(&store.closed_trades(), config.report.initial_capital);
    info!(
        trades = report.trades,
        wins = report.wins,
        losses = report.losses,
        win_rate = %report.win_rate,
        profit_factor = ?report.profit_factor,
        pnl = %report.total_pnl,
        balance = %report.balance,
        drawdown_pct = %report.drawdown_pct,
        open = store.open_positions().len(),
        "Session report"
    );
    Ok(())
}
