//! Heterogeneous trading bots and the population that runs them.

mod archetype;
mod bot;
mod population;

pub use archetype::{Archetype, ArchetypeParams, ParamOverrides};
pub use bot::{BotEvent, BotState, ExitReason, TradingBot};
pub use population::{BotPopulation, CohortSpec, PopulationSpec, PopulationStats};
