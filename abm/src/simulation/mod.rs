//! Configuration, the tick orchestrator, and the recorded time series.

mod config;
mod runner;
mod series;

pub use config::{ConfigError, EmissionConfig, PoolConfig, SimulationConfig};
pub use runner::{run_config, SimError, SimulationRunner};
pub use series::{
    ActorId, AgentSnapshot, SimEvent, StrategySnapshot, TickSnapshot, TimeSeriesRecord,
};
