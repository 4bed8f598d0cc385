//! Domain kernel for the subnet token-economics simulator.
//!
//! Two leaf components live here: the constant-product liquidity pool that
//! pairs the base (numeraire) asset with the subnet token, and the emission
//! schedule/distributor that mints new tokens at a fixed per-period rate.
//! Everything money-valued is a `rust_decimal::Decimal`.

pub mod emission;
pub mod pool;

pub use emission::{EmissionDistributor, EmissionSchedule, EmissionTick, WeightingRule};
pub use pool::{LiquidityPool, PoolError, Trade, TradeSide};
