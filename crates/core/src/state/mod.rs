//! # Protocol State Management
//!
//! Entry point and facade for the Grove engine state. `ProtocolState`
//! owns every arena and ledger; the transition logic is split across
//! internal modules, each an `impl ProtocolState` block:
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `internal_model` | Data structures: Garden, Contributor, Strategy, rewards records |
//! | `internal_garden` | Garden ledger: create, deposit, withdraw, share locks |
//! | `internal_signed` | Keeper-relayed signed deposit/withdraw with nonce replay protection |
//! | `internal_strategy` | Strategy lifecycle: propose, resolve, execute, unwind, finalize |
//! | `internal_power` | Time-weighted contributor power over checkpoint history |
//! | `internal_rewards` | Settlement: profit splits, stake penalty, GRV mining, claims |
//!
//! Every public entry point validates all preconditions before the first
//! mutation and takes `now: u64` (unix seconds) from the caller; on error
//! the state is untouched.

mod internal_garden;
mod internal_model;
mod internal_power;
mod internal_rewards;
mod internal_signed;
mod internal_strategy;

pub use internal_model::{
    BalanceCheckpoint, Contributor, Garden, GardenParams, RewardsState, Strategy,
    StrategyParams, StrategyRewards, StrategyRewardsOverride, StrategyStatus,
    SupplyCheckpoint, VoteRecord,
};

use crate::events::Event;
use crate::registry::ProtocolRegistry;
use crate::types::{Address, GardenId, StrategyId};
use crate::{CoreError, Result};
use grove_common::ProtocolConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Storage schema version. Bump on any layout change and extend
/// [`ProtocolState::migrate_from`] with the corresponding migration.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolState {
    pub schema_version: u32,
    pub config: ProtocolConfig,
    pub registry: ProtocolRegistry,

    /// Arena of gardens keyed by stable id.
    pub gardens: HashMap<GardenId, Garden>,

    /// Arena of strategies keyed by stable id.
    pub strategies: HashMap<StrategyId, Strategy>,

    pub rewards: RewardsState,

    /// Reserve-asset ledger: asset → holder → amount. Gardens are not
    /// holders here; their reserve lives on `Garden::reserve_balance`.
    pub token_balances: HashMap<Address, HashMap<Address, u128>>,

    /// Append-only audit log of committed transitions.
    pub events: Vec<Event>,

    pub(crate) next_garden_id: u64,
    pub(crate) next_strategy_id: u64,
}

impl ProtocolState {
    pub fn new(config: ProtocolConfig, registry: ProtocolRegistry) -> Self {
        let rewards = RewardsState::from_config(&config);
        ProtocolState {
            schema_version: SCHEMA_VERSION,
            config,
            registry,
            gardens: HashMap::new(),
            strategies: HashMap::new(),
            rewards,
            token_balances: HashMap::new(),
            events: Vec::new(),
            next_garden_id: 1,
            next_strategy_id: 1,
        }
    }

    // ── arena accessors ─────────────────────────────────────

    pub fn garden(&self, id: GardenId) -> Result<&Garden> {
        self.gardens.get(&id).ok_or(CoreError::UnknownGarden(id))
    }

    pub(crate) fn garden_mut(&mut self, id: GardenId) -> Result<&mut Garden> {
        self.gardens
            .get_mut(&id)
            .ok_or(CoreError::UnknownGarden(id))
    }

    pub fn strategy(&self, id: StrategyId) -> Result<&Strategy> {
        self.strategies
            .get(&id)
            .ok_or(CoreError::UnknownStrategy(id))
    }

    pub(crate) fn strategy_mut(&mut self, id: StrategyId) -> Result<&mut Strategy> {
        self.strategies
            .get_mut(&id)
            .ok_or(CoreError::UnknownStrategy(id))
    }

    // ── reserve-asset ledger ────────────────────────────────

    /// Credit reserve asset to a holder. External inflow boundary; also
    /// the faucet used by tests and simulation.
    pub fn mint_reserve(&mut self, asset: Address, holder: Address, amount: u128) -> Result<()> {
        let bal = self
            .token_balances
            .entry(asset)
            .or_default()
            .entry(holder)
            .or_insert(0);
        *bal = bal.checked_add(amount).ok_or(grove_common::MathError::Overflow)?;
        Ok(())
    }

    pub fn reserve_balance_of(&self, asset: &Address, holder: &Address) -> u128 {
        self.token_balances
            .get(asset)
            .and_then(|m| m.get(holder))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn debit_holder(
        &mut self,
        asset: Address,
        holder: Address,
        amount: u128,
    ) -> Result<()> {
        let have = self.reserve_balance_of(&asset, &holder);
        if have < amount {
            return Err(CoreError::InsufficientFunds { have, need: amount });
        }
        if let Some(bal) = self
            .token_balances
            .get_mut(&asset)
            .and_then(|m| m.get_mut(&holder))
        {
            *bal -= amount;
        }
        Ok(())
    }

    pub(crate) fn credit_holder(&mut self, asset: Address, holder: Address, amount: u128) {
        let bal = self
            .token_balances
            .entry(asset)
            .or_default()
            .entry(holder)
            .or_insert(0);
        *bal = bal.saturating_add(amount);
    }

    pub(crate) fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    // ── snapshot & migration ────────────────────────────────

    /// Serialize the full state for persistence.
    pub fn snapshot(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::InvalidParameter(e.to_string()))
    }

    /// Rebuild a state from a snapshot taken at `from_version`.
    ///
    /// The versioned boundary for schema evolution: each supported older
    /// version gets an explicit migration arm here; unknown versions are
    /// rejected rather than guessed at.
    pub fn migrate_from(snapshot: &str, from_version: u32) -> Result<Self> {
        if from_version != SCHEMA_VERSION {
            return Err(CoreError::UnsupportedSchema(from_version));
        }
        let state: ProtocolState = serde_json::from_str(snapshot)
            .map_err(|e| CoreError::InvalidParameter(e.to_string()))?;
        if state.schema_version != SCHEMA_VERSION {
            return Err(CoreError::UnsupportedSchema(state.schema_version));
        }
        Ok(state)
    }
}
