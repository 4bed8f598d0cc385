//! Agent-based model of a subnet token economy.
//!
//! A fixed per-period emission feeds a constant-product pool, a population
//! of heterogeneous trading bots reacts to the price, and a controlled
//! three-phase strategy trades against the same pool. One top-level seed
//! makes the whole closed loop bit-for-bit reproducible.

pub mod agents;
pub mod simulation;
pub mod strategy;

// Re-export key types at crate root
pub use agents::{Archetype, ArchetypeParams, BotPopulation, BotState, PopulationSpec};
pub use simulation::{
    run_config, SimError, SimulationConfig, SimulationRunner, TickSnapshot, TimeSeriesRecord,
};
pub use strategy::{Phase, SqueezeMode, StrategyConfig, StrategyEngine};
