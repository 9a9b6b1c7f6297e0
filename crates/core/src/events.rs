//! Typed audit events.
//!
//! Every committed transition appends one or more events to the state's
//! in-memory log. The log is serializable and append-only; it never feeds
//! back into transition logic.

use crate::types::{Address, GardenId, StrategyId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    GardenCreated {
        garden: GardenId,
        creator: Address,
        reserve_asset: Address,
        at: u64,
    },
    Deposited {
        garden: GardenId,
        contributor: Address,
        amount: u128,
        shares: u128,
        at: u64,
    },
    Withdrew {
        garden: GardenId,
        contributor: Address,
        shares: u128,
        amount_out: u128,
        penalty: u128,
        at: u64,
    },
    StrategyProposed {
        strategy: StrategyId,
        garden: GardenId,
        strategist: Address,
        stake: u128,
        at: u64,
    },
    VotingResolved {
        strategy: StrategyId,
        positive: u128,
        negative: u128,
        voters: usize,
        at: u64,
    },
    StrategyExecuted {
        strategy: StrategyId,
        capital: u128,
        total_allocated: u128,
        at: u64,
    },
    StrategyUnwound {
        strategy: StrategyId,
        amount: u128,
        reserve_in: u128,
        at: u64,
    },
    StrategyFinalized {
        strategy: StrategyId,
        capital_returned: u128,
        profit: u128,
        loss: u128,
        at: u64,
    },
    StrategyCancelled {
        strategy: StrategyId,
        at: u64,
    },
    StakeBurned {
        strategy: StrategyId,
        strategist: Address,
        burned: u128,
        at: u64,
    },
    RewardsSettled {
        strategy: StrategyId,
        strategist_profit: u128,
        stewards_profit: u128,
        lp_profit: u128,
        grv_minted: u128,
        at: u64,
    },
    RewardsClaimed {
        garden: GardenId,
        contributor: Address,
        profit: u128,
        grv: u128,
        at: u64,
    },
    RewardsOverridden {
        strategy: StrategyId,
        by: Address,
        at: u64,
    },
    KeeperPaid {
        keeper: Address,
        fee: u128,
        at: u64,
    },
}
