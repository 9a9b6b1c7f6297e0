//! Data structures for the protocol state: gardens, contributors,
//! strategies, vote records, checkpoints, and reward bookkeeping.
//! Model only; transition logic lives in the sibling internal modules.

use crate::operation::OperationSpec;
use crate::tokenomics::{MiningBenchmark, ProfitSharing};
use crate::types::{Address, GardenId, StrategyId};
use grove_common::fixed_point::wad_div;
use grove_common::{MathError, ProtocolConfig, WAD};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ════════════════════════════════════════════════════════════════════════════
// CHECKPOINTS
// ════════════════════════════════════════════════════════════════════════════

/// Per-contributor share balance recorded after every balance change.
/// Contributor power integrates these against the supply checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCheckpoint {
    pub at: u64,
    pub balance: u128,
}

/// Garden share supply recorded after every mint/burn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyCheckpoint {
    pub at: u64,
    pub supply: u128,
}

// ════════════════════════════════════════════════════════════════════════════
// GARDEN
// ════════════════════════════════════════════════════════════════════════════

/// Contributor ledger entry. Created on first deposit, never deleted;
/// a full exit zeroes the balances and keeps the history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contributor {
    pub balance: u128,
    pub locked_balance: u128,
    pub last_deposit_at: u64,
    pub initial_deposit_at: u64,
    pub total_deposits: u128,
    pub withdrawn_since: u128,
    /// Meta-transaction replay protection; strictly increasing.
    pub nonce: u64,
    pub checkpoints: Vec<BalanceCheckpoint>,
}

impl Contributor {
    pub fn unlocked(&self) -> u128 {
        self.balance.saturating_sub(self.locked_balance)
    }
}

/// Creation-time garden parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GardenParams {
    pub name: String,
    pub reserve_asset: Address,
    pub max_deposit_limit: u128,
    pub min_contribution: u128,
    /// When false, only the creator and allow-listed addresses may deposit.
    pub public_deposits: bool,
    pub depositor_allowlist: Vec<Address>,
    /// Custom profit split; `None` uses protocol defaults.
    pub profit_sharing: Option<ProfitSharing>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Garden {
    pub id: GardenId,
    pub name: String,
    pub creator: Address,
    pub reserve_asset: Address,

    /// Outstanding shares. Always equals the sum of contributor balances.
    pub total_supply: u128,

    /// Total reserve-asset value held or committed by the garden:
    /// uncommitted reserve plus capital deployed at cost, excluding the
    /// rewards set-aside.
    pub principal: u128,

    /// Uncommitted reserve currently held by the garden (includes the
    /// set-aside cash until claimed).
    pub reserve_balance: u128,

    /// Realized profit reserved for strategist/steward claims.
    pub rewards_set_aside: u128,

    pub max_deposit_limit: u128,
    pub min_contribution: u128,
    pub public_deposits: bool,
    pub depositor_allowlist: HashSet<Address>,
    pub profit_sharing: ProfitSharing,

    pub contributors: HashMap<Address, Contributor>,
    pub supply_checkpoints: Vec<SupplyCheckpoint>,

    /// Reference share price for the deposit tolerance check.
    pub last_price_per_share_wad: u128,
    pub last_price_update_at: u64,

    pub initialized_at: u64,
    pub strategies: Vec<StrategyId>,
}

impl Garden {
    /// Current NAV per share (WAD). 1.0 while the garden is empty.
    pub fn price_per_share_wad(&self) -> Result<u128, MathError> {
        if self.total_supply == 0 {
            return Ok(WAD);
        }
        wad_div(self.principal, self.total_supply)
    }

    pub fn contributor(&self, addr: &Address) -> Option<&Contributor> {
        self.contributors.get(addr)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// STRATEGY
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyStatus {
    /// Proposed; operations set, voting not yet resolved.
    Dataset,
    /// Voting resolved positively; awaiting first capital tranche.
    Active,
    /// One or more tranches deployed.
    Executed,
    /// Settled. Terminal: no further mutation.
    Finalized,
    /// Cancelled before any capital was committed. Terminal.
    Expired,
}

/// One steward's resolved vote. Positive weight favors the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub voter: Address,
    pub weight: i128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyParams {
    pub max_capital_requested: u128,
    /// Cap on allocated capital as bps of garden principal.
    pub max_allocation_bps: u128,
    /// Keeper fee ceiling as bps of the tranche capital.
    pub max_gas_fee_bps: u128,
    pub max_trade_slippage_bps: u128,
    pub duration_secs: u64,
    /// Strategist's declared expected return (WAD ratio), informational.
    pub expected_return_wad: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub id: StrategyId,
    pub garden: GardenId,
    pub strategist: Address,
    /// Strategist shares locked behind the proposal.
    pub stake: u128,
    pub params: StrategyParams,
    pub operations: Vec<OperationSpec>,

    pub status: StrategyStatus,
    pub capital_allocated: u128,
    pub capital_returned: u128,
    pub capital_unwound: u128,
    pub total_positive_votes: u128,
    pub total_negative_votes: u128,
    pub voters: Vec<VoteRecord>,

    pub created_at: u64,
    pub resolved_at: Option<u64>,
    pub entered_cooldown_at: Option<u64>,
    pub executed_at: Option<u64>,
    pub last_executed_at: Option<u64>,
    pub updated_at: u64,
    pub exited_at: Option<u64>,
}

impl Strategy {
    pub fn is_live(&self) -> bool {
        matches!(self.status, StrategyStatus::Active | StrategyStatus::Executed)
    }

    /// Chain-time at which the strategy's duration elapses.
    pub fn expiry(&self) -> Option<u64> {
        self.executed_at
            .map(|t| t.saturating_add(self.params.duration_secs))
    }

    pub fn vote_of(&self, addr: &Address) -> Option<&VoteRecord> {
        self.voters.iter().find(|v| v.voter == *addr)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// REWARDS
// ════════════════════════════════════════════════════════════════════════════

/// Per-strategy reward checkpoint persisted at settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRewards {
    pub strategy: StrategyId,
    pub garden: GardenId,
    pub capital_allocated: u128,
    pub capital_returned: u128,
    pub profit: u128,
    pub loss: u128,
    pub has_dissent: bool,

    /// Reserve-asset profit shares (set aside in the garden).
    pub strategist_profit: u128,
    pub stewards_profit: u128,
    /// LP profit stays in the garden and accrues through the share price;
    /// recorded here for accounting only.
    pub lp_profit: u128,

    /// GRV mining reward parts.
    pub grv_strategist: u128,
    pub grv_stewards: u128,
    pub grv_lp: u128,

    /// Capital-deployment window used for LP power attribution.
    pub window_from: u64,
    pub window_to: u64,

    pub strategist_claimed: bool,
    pub steward_claims: HashSet<Address>,
    pub lp_claims: HashSet<Address>,
}

impl StrategyRewards {
    pub fn grv_total(&self) -> u128 {
        self.grv_strategist + self.grv_stewards + self.grv_lp
    }
}

/// Governance remediation override for a settled strategy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StrategyRewardsOverride {
    pub strategist_profit: Option<u128>,
    pub stewards_profit: Option<u128>,
    pub grv_strategist: Option<u128>,
    pub grv_stewards: Option<u128>,
    pub grv_lp: Option<u128>,
}

/// Protocol-wide mining and claim bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsState {
    pub benchmark: MiningBenchmark,
    pub emission_rate_wad: u128,
    pub max_grv_cap: u128,
    /// Cumulative GRV ever minted. Never exceeds `max_grv_cap`.
    pub grv_minted_total: u128,
    pub grv_claimed_total: u128,
    pub strategy_rewards: HashMap<StrategyId, StrategyRewards>,
    /// Claimed GRV credited per address.
    pub grv_balances: HashMap<Address, u128>,
}

impl RewardsState {
    pub fn from_config(config: &ProtocolConfig) -> Self {
        RewardsState {
            benchmark: MiningBenchmark::from_config(config),
            emission_rate_wad: config.grv_emission_rate_wad,
            max_grv_cap: config.max_grv_cap,
            grv_minted_total: 0,
            grv_claimed_total: 0,
            strategy_rewards: HashMap::new(),
            grv_balances: HashMap::new(),
        }
    }

    pub fn grv_balance_of(&self, addr: &Address) -> u128 {
        self.grv_balances.get(addr).copied().unwrap_or(0)
    }
}
