//! Append-only time series of per-tick snapshots.
//!
//! A snapshot is taken after every fully processed tick and never mutated
//! afterwards, so two runs compare equal exactly when their serialized
//! series compare equal.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::agents::{Archetype, BotState, ExitReason, PopulationStats};
use crate::strategy::Phase;

/// Who performed an action, for event attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorId {
    Strategy,
    Bot(usize),
}

/// Something noteworthy that happened during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimEvent {
    BotEntered {
        bot: usize,
        price: Decimal,
        spent: Decimal,
    },
    BotExited {
        bot: usize,
        reason: ExitReason,
        proceeds: Decimal,
    },
    /// The pool rejected a trade; the actor skipped or will retry.
    TradeRejected { actor: ActorId },
    /// The strategy wanted a buy its phase ledger could not cover.
    MissedOpportunity {
        wanted: Decimal,
        available: Decimal,
    },
    PhaseTransition { from: Phase, to: Phase },
}

/// One bot's position at the end of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgentSnapshot {
    pub id: usize,
    pub archetype: Archetype,
    pub state: BotState,
    pub capital_base: Decimal,
    pub token_balance: Decimal,
}

/// The strategy's position at the end of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategySnapshot {
    pub phase: Phase,
    pub base_balance: Decimal,
    pub token_balance: Decimal,
    pub maintenance_spent: Decimal,
    pub accumulation_spent: Decimal,
}

/// Full state of the system after one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickSnapshot {
    pub tick: u64,
    pub reserve_base: Decimal,
    pub reserve_token: Decimal,
    pub spot_price: Decimal,
    /// Tokens emitted this tick.
    pub emission: Decimal,
    /// Tokens emitted since the start of the run.
    pub cumulative_emission: Decimal,
    /// Tokens emitted this tick that had no holder to receive them.
    pub unallocated: Decimal,
    /// Unallocated tokens since the start of the run; subtracting this
    /// from `cumulative_emission` reconciles held supply exactly.
    pub cumulative_unallocated: Decimal,
    pub population: PopulationStats,
    pub agents: Vec<AgentSnapshot>,
    pub strategy: Option<StrategySnapshot>,
    pub events: Vec<SimEvent>,
}

/// The whole run, one snapshot per completed tick.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct TimeSeriesRecord {
    snapshots: Vec<TickSnapshot>,
}

impl TimeSeriesRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, snapshot: TickSnapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn last(&self) -> Option<&TickSnapshot> {
        self.snapshots.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TickSnapshot> {
        self.snapshots.iter()
    }

    pub fn snapshots(&self) -> &[TickSnapshot] {
        &self.snapshots
    }

    /// Serialize the whole series, the canonical form for comparing runs.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshots)
    }
}
