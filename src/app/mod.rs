//! Application layer: configuration, shared state, the position lifecycle
//! and the scheduler that drives it.

mod config;
mod lifecycle;
mod scheduler;
mod state;

pub use config::{
    Config, FeedConfig, LoggingConfig, PersistenceConfig, ReportConfig, RiskConfig,
    SchedulerConfig, SessionConfig, StrategyConfig,
};
pub use lifecycle::{
    exit_for, CloseDecision, LifecycleParams, OpenDecision, PositionLifecycleManager, SIZE_DP,
};
pub use scheduler::{SchedulerSettings, TradingCycleScheduler};
pub use state::{EngineState, EngineStatus};
