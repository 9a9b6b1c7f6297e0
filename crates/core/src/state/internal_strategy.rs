//! Strategy lifecycle state machine.
//!
//! `Dataset → Active → Executed → Finalized`, with `Expired` for
//! candidates cancelled before any capital commitment. Every transition
//! validates caller privilege, chain-time windows, and economic caps
//! before touching state; keeper fees are paid only after all bookkeeping
//! for the transition is complete.

use super::internal_model::{Strategy, StrategyParams, StrategyStatus, VoteRecord};
use crate::events::Event;
use crate::operation::{OperationRegistry, OperationSpec};
use crate::oracle::PriceOracle;
use crate::state::ProtocolState;
use crate::tokenomics;
use crate::types::{Address, GardenId, StrategyId};
use crate::{CoreError, Result};
use grove_common::fixed_point::{bps_mul, wad_div, wad_mul};
use grove_common::WAD;
use tracing::{debug, info};

impl ProtocolState {
    // ════════════════════════════════════════════════════════════════════
    // PROPOSE
    // ════════════════════════════════════════════════════════════════════

    /// Create a `Dataset` strategy backed by the strategist's locked
    /// stake. The stake counts as a standing positive vote.
    pub fn add_strategy(
        &mut self,
        garden_id: GardenId,
        strategist: Address,
        params: StrategyParams,
        operations: Vec<OperationSpec>,
        stake: u128,
        now: u64,
    ) -> Result<StrategyId> {
        // ── validation ──────────────────────────────────────
        if self.registry.is_garden_paused(garden_id) {
            return Err(CoreError::GardenPaused);
        }
        if stake == 0 {
            return Err(CoreError::ZeroAmount);
        }
        let min_stake = self.config.min_strategist_stake;
        if stake < min_stake {
            return Err(CoreError::StakeTooLow {
                stake,
                min: min_stake,
            });
        }
        if operations.is_empty() {
            return Err(CoreError::EmptyOperations);
        }
        if params.duration_secs < self.config.min_strategy_duration_secs
            || params.duration_secs > self.config.max_strategy_duration_secs
        {
            return Err(CoreError::DurationOutOfBounds(params.duration_secs));
        }
        if params.max_capital_requested == 0 {
            return Err(CoreError::InvalidParameter(
                "max capital requested must be positive".into(),
            ));
        }
        if params.max_allocation_bps == 0 || params.max_allocation_bps > 10_000 {
            return Err(CoreError::InvalidParameter(
                "allocation percentage must be within (0, 100%]".into(),
            ));
        }
        if params.max_gas_fee_bps > 10_000 {
            return Err(CoreError::InvalidParameter(
                "gas fee percentage above 100%".into(),
            ));
        }
        let stake_weight = i128::try_from(stake)
            .map_err(|_| CoreError::InvalidParameter("stake exceeds vote weight range".into()))?;

        let garden = self.garden(garden_id)?;
        let contributor = garden
            .contributor(&strategist)
            .ok_or(CoreError::InsufficientUnlockedBalance {
                unlocked: 0,
                required: stake,
            })?;
        let unlocked = contributor.unlocked();
        if stake > unlocked {
            return Err(CoreError::InsufficientUnlockedBalance {
                unlocked,
                required: stake,
            });
        }

        // ── mutation ────────────────────────────────────────
        self.lock_balance(garden_id, strategist, stake)?;
        let id = StrategyId(self.next_strategy_id);
        self.next_strategy_id += 1;

        let strategy = Strategy {
            id,
            garden: garden_id,
            strategist,
            stake,
            params,
            operations,
            status: StrategyStatus::Dataset,
            capital_allocated: 0,
            capital_returned: 0,
            capital_unwound: 0,
            total_positive_votes: stake,
            total_negative_votes: 0,
            voters: vec![VoteRecord {
                voter: strategist,
                weight: stake_weight,
            }],
            created_at: now,
            resolved_at: None,
            entered_cooldown_at: None,
            executed_at: None,
            last_executed_at: None,
            updated_at: now,
            exited_at: None,
        };
        self.strategies.insert(id, strategy);
        self.garden_mut(garden_id)?.strategies.push(id);
        self.push_event(Event::StrategyProposed {
            strategy: id,
            garden: garden_id,
            strategist,
            stake,
            at: now,
        });
        info!(strategy = %id, garden = %garden_id, strategist = %strategist, stake, "strategy proposed");
        Ok(id)
    }

    // ════════════════════════════════════════════════════════════════════
    // RESOLVE VOTING
    // ════════════════════════════════════════════════════════════════════

    /// Keeper-submitted, one-time vote aggregation inside the voting
    /// window. Steward shares are locked for the strategy's lifetime.
    pub fn resolve_voting(
        &mut self,
        strategy_id: StrategyId,
        keeper: Address,
        voters: &[Address],
        weights: &[i128],
        fee: u128,
        now: u64,
    ) -> Result<()> {
        // ── validation ──────────────────────────────────────
        if !self.registry.is_valid_keeper(&keeper) {
            return Err(CoreError::NotKeeper);
        }
        if self.registry.is_strategy_paused(strategy_id) {
            return Err(CoreError::StrategyPaused);
        }
        let strategy = self.strategy(strategy_id)?;
        match strategy.status {
            StrategyStatus::Dataset => {}
            StrategyStatus::Active | StrategyStatus::Executed => {
                return Err(CoreError::AlreadyResolved)
            }
            StrategyStatus::Finalized => return Err(CoreError::AlreadyFinalized),
            StrategyStatus::Expired => {
                return Err(CoreError::StrategyExpired(strategy.updated_at))
            }
        }
        let garden_id = strategy.garden;
        if self.registry.is_garden_paused(garden_id) {
            return Err(CoreError::GardenPaused);
        }
        let deadline = strategy
            .created_at
            .saturating_add(self.config.voting_window_secs);
        if now > deadline {
            return Err(CoreError::VotingWindowClosed(deadline));
        }
        if voters.len() != weights.len() {
            return Err(CoreError::VoteMismatch);
        }

        let strategist = strategy.strategist;
        let stake = strategy.stake;
        let fee_bound = self.keeper_fee_bound(
            strategy.params.max_capital_requested,
            strategy.params.max_gas_fee_bps,
        )?;
        if fee > fee_bound {
            return Err(CoreError::FeeTooHigh {
                fee,
                max: fee_bound,
            });
        }

        let garden = self.garden(garden_id)?;
        let mut positive: u128 = stake;
        let mut negative: u128 = 0;
        let mut locks: Vec<(Address, u128)> = Vec::with_capacity(voters.len());
        for (i, voter) in voters.iter().enumerate() {
            let weight = weights[i];
            if weight == 0 {
                return Err(CoreError::ZeroAmount);
            }
            if *voter == strategist || voters[..i].contains(voter) {
                return Err(CoreError::DuplicateVote(*voter));
            }
            let magnitude = weight.unsigned_abs();
            let contributor =
                garden
                    .contributor(voter)
                    .ok_or(CoreError::InsufficientUnlockedBalance {
                        unlocked: 0,
                        required: magnitude,
                    })?;
            let unlocked = contributor.unlocked();
            if magnitude > unlocked {
                return Err(CoreError::InsufficientUnlockedBalance {
                    unlocked,
                    required: magnitude,
                });
            }
            if weight > 0 {
                positive = positive.saturating_add(magnitude);
            } else {
                negative = negative.saturating_add(magnitude);
            }
            locks.push((*voter, magnitude));
        }

        let quorum = bps_mul(garden.total_supply, self.config.min_quorum_bps)?;
        let turnout = positive.saturating_add(negative);
        if turnout < quorum {
            return Err(CoreError::QuorumNotReached {
                votes: turnout,
                quorum,
            });
        }
        let voter_count = 1 + voters.len();
        if voter_count < self.config.min_voters {
            return Err(CoreError::NotEnoughVoters {
                actual: voter_count,
                min: self.config.min_voters,
            });
        }
        if positive <= negative {
            return Err(CoreError::InsufficientSupport);
        }
        if fee > garden.reserve_balance {
            return Err(CoreError::InsufficientLiquidity {
                have: garden.reserve_balance,
                need: fee,
            });
        }

        // ── mutation ────────────────────────────────────────
        for (voter, magnitude) in &locks {
            self.lock_balance(garden_id, *voter, *magnitude)?;
        }
        let strategy = self.strategy_mut(strategy_id)?;
        for (i, voter) in voters.iter().enumerate() {
            strategy.voters.push(VoteRecord {
                voter: *voter,
                weight: weights[i],
            });
        }
        strategy.total_positive_votes = positive;
        strategy.total_negative_votes = negative;
        strategy.status = StrategyStatus::Active;
        strategy.resolved_at = Some(now);
        strategy.entered_cooldown_at = Some(now);
        strategy.updated_at = now;

        self.push_event(Event::VotingResolved {
            strategy: strategy_id,
            positive,
            negative,
            voters: voter_count,
            at: now,
        });
        self.pay_keeper(garden_id, keeper, fee, now);
        info!(strategy = %strategy_id, positive, negative, "voting resolved");
        Ok(())
    }

    // ════════════════════════════════════════════════════════════════════
    // EXECUTE
    // ════════════════════════════════════════════════════════════════════

    /// Deploy a capital tranche through the strategy's operation pipeline.
    /// Callable repeatedly, each tranche gated by the cooldown and by the
    /// capital/allocation caps.
    pub fn execute_strategy(
        &mut self,
        strategy_id: StrategyId,
        keeper: Address,
        capital: u128,
        fee: u128,
        ops: &mut OperationRegistry,
        now: u64,
    ) -> Result<()> {
        // ── validation ──────────────────────────────────────
        if !self.registry.is_valid_keeper(&keeper) {
            return Err(CoreError::NotKeeper);
        }
        if self.registry.is_strategy_paused(strategy_id) {
            return Err(CoreError::StrategyPaused);
        }
        if capital == 0 {
            return Err(CoreError::ZeroAmount);
        }
        let strategy = self.strategy(strategy_id)?;
        match strategy.status {
            StrategyStatus::Dataset => return Err(CoreError::VotingNotResolved),
            StrategyStatus::Active | StrategyStatus::Executed => {}
            StrategyStatus::Finalized => return Err(CoreError::AlreadyFinalized),
            StrategyStatus::Expired => {
                return Err(CoreError::StrategyExpired(strategy.updated_at))
            }
        }
        let garden_id = strategy.garden;
        if self.registry.is_garden_paused(garden_id) {
            return Err(CoreError::GardenPaused);
        }
        if let Some(expiry) = strategy.expiry() {
            if now >= expiry {
                return Err(CoreError::StrategyExpired(expiry));
            }
        }
        let cooldown = self.config.strategy_cooldown_secs;
        let cooldown_base = strategy
            .last_executed_at
            .or(strategy.entered_cooldown_at)
            .unwrap_or(strategy.created_at);
        let ready_at = cooldown_base.saturating_add(cooldown);
        if now < ready_at {
            return Err(CoreError::CooldownActive(ready_at));
        }

        let new_allocated = strategy
            .capital_allocated
            .checked_add(capital)
            .ok_or(grove_common::MathError::Overflow)?;
        if new_allocated > strategy.params.max_capital_requested {
            return Err(CoreError::CapitalCapExceeded(
                strategy.params.max_capital_requested,
            ));
        }
        let fee_bound = self.keeper_fee_bound(capital, strategy.params.max_gas_fee_bps)?;
        if fee > fee_bound {
            return Err(CoreError::FeeTooHigh {
                fee,
                max: fee_bound,
            });
        }
        let garden = self.garden(garden_id)?;
        let allocation_cap = bps_mul(garden.principal, strategy.params.max_allocation_bps)?;
        if new_allocated > allocation_cap {
            return Err(CoreError::AllocationCapExceeded(allocation_cap));
        }
        let needed = capital.saturating_add(fee);
        if garden.reserve_balance < needed {
            return Err(CoreError::InsufficientLiquidity {
                have: garden.reserve_balance,
                need: needed,
            });
        }
        let op_specs = strategy.operations.clone();
        for spec in &op_specs {
            if !ops.contains(&spec.integration) {
                return Err(CoreError::UnknownIntegration(spec.integration));
            }
        }

        // ── adapter boundary ────────────────────────────────
        // Enter the pipeline before any ledger mutation: a failing enter
        // aborts the transition with the engine state untouched.
        let mut forwarded = capital;
        for spec in &op_specs {
            let op = ops.get_mut(&spec.integration)?;
            forwarded = op.enter(strategy_id, forwarded, &spec.params)?;
        }

        // ── mutation ────────────────────────────────────────
        let garden = self.garden_mut(garden_id)?;
        garden.reserve_balance -= capital;
        let strategy = self.strategy_mut(strategy_id)?;
        strategy.capital_allocated = new_allocated;
        if strategy.executed_at.is_none() {
            strategy.executed_at = Some(now);
        }
        strategy.last_executed_at = Some(now);
        strategy.status = StrategyStatus::Executed;
        strategy.updated_at = now;

        self.push_event(Event::StrategyExecuted {
            strategy: strategy_id,
            capital,
            total_allocated: new_allocated,
            at: now,
        });
        self.pay_keeper(garden_id, keeper, fee, now);
        info!(strategy = %strategy_id, capital, total_allocated = new_allocated, "tranche executed");
        Ok(())
    }

    // ════════════════════════════════════════════════════════════════════
    // UNWIND
    // ════════════════════════════════════════════════════════════════════

    /// Governance-only partial de-risking of a live strategy. Forbidden
    /// once the strategy's duration has elapsed; finalize it instead.
    pub fn unwind_strategy(
        &mut self,
        strategy_id: StrategyId,
        caller: Address,
        amount: u128,
        ops: &mut OperationRegistry,
        now: u64,
    ) -> Result<()> {
        // ── validation ──────────────────────────────────────
        if !self.registry.is_governance(&caller) {
            return Err(CoreError::NotGovernance);
        }
        if amount == 0 {
            return Err(CoreError::ZeroAmount);
        }
        let strategy = self.strategy(strategy_id)?;
        if !strategy.is_live() || strategy.capital_allocated == 0 {
            return Err(CoreError::NotExecuted);
        }
        if let Some(expiry) = strategy.expiry() {
            if now >= expiry {
                return Err(CoreError::StrategyExpired(expiry));
            }
        }
        if amount > strategy.capital_allocated {
            return Err(CoreError::InvalidParameter(
                "unwind exceeds allocated capital".into(),
            ));
        }
        let garden_id = strategy.garden;
        let pct = wad_div(amount, strategy.capital_allocated)?;
        let op_specs = strategy.operations.clone();
        for spec in &op_specs {
            if !ops.contains(&spec.integration) {
                return Err(CoreError::UnknownIntegration(spec.integration));
            }
        }

        // ── mutation ────────────────────────────────────────
        let mut reserve_in: u128 = 0;
        for spec in op_specs.iter().rev() {
            let op = ops.get_mut(&spec.integration)?;
            reserve_in = reserve_in.saturating_add(op.exit(strategy_id, pct)?);
        }
        let strategy = self.strategy_mut(strategy_id)?;
        strategy.capital_allocated -= amount;
        strategy.capital_unwound = strategy.capital_unwound.saturating_add(amount);
        strategy.updated_at = now;
        let garden = self.garden_mut(garden_id)?;
        garden.reserve_balance = garden.reserve_balance.saturating_add(reserve_in);
        garden.principal = garden
            .principal
            .saturating_sub(amount)
            .saturating_add(reserve_in);

        self.push_event(Event::StrategyUnwound {
            strategy: strategy_id,
            amount,
            reserve_in,
            at: now,
        });
        info!(strategy = %strategy_id, amount, reserve_in, "strategy unwound");
        Ok(())
    }

    // ════════════════════════════════════════════════════════════════════
    // FINALIZE
    // ════════════════════════════════════════════════════════════════════

    /// Exit every operation back to the reserve asset, settle profit or
    /// loss, release locks, apply the loss penalty, and distribute
    /// rewards. Terminal: a second call fails.
    #[allow(clippy::too_many_arguments)]
    pub fn finalize_strategy(
        &mut self,
        strategy_id: StrategyId,
        keeper: Address,
        fee: u128,
        min_reserve_out: u128,
        ops: &mut OperationRegistry,
        oracle: &dyn PriceOracle,
        now: u64,
    ) -> Result<()> {
        // ── validation ──────────────────────────────────────
        if !self.registry.is_valid_keeper(&keeper) {
            return Err(CoreError::NotKeeper);
        }
        let strategy = self.strategy(strategy_id)?;
        match strategy.status {
            StrategyStatus::Dataset => return Err(CoreError::VotingNotResolved),
            StrategyStatus::Active => return Err(CoreError::NotExecuted),
            StrategyStatus::Executed => {}
            StrategyStatus::Finalized => return Err(CoreError::AlreadyFinalized),
            StrategyStatus::Expired => {
                return Err(CoreError::StrategyExpired(strategy.updated_at))
            }
        }
        let executed_at = strategy.executed_at.ok_or(CoreError::NotExecuted)?;
        let mature_at = executed_at.saturating_add(strategy.params.duration_secs);
        if now < mature_at {
            return Err(CoreError::StrategyNotMatured(mature_at));
        }
        let garden_id = strategy.garden;
        let capital_allocated = strategy.capital_allocated;
        let strategist = strategy.strategist;
        let stake = strategy.stake;
        let fee_bound = self.keeper_fee_bound(capital_allocated, strategy.params.max_gas_fee_bps)?;
        if fee > fee_bound {
            return Err(CoreError::FeeTooHigh {
                fee,
                max: fee_bound,
            });
        }
        let op_specs = strategy.operations.clone();
        for spec in &op_specs {
            if !ops.contains(&spec.integration) {
                return Err(CoreError::UnknownIntegration(spec.integration));
            }
        }
        // slippage bound against the adapter-reported NAV before exiting
        let nav = self.strategy_nav(strategy_id, ops, oracle)?;
        if nav < min_reserve_out {
            return Err(CoreError::SlippageExceeded {
                actual: nav,
                min: min_reserve_out,
            });
        }
        let garden = self.garden(garden_id)?;
        if garden.reserve_balance.saturating_add(nav) < fee {
            return Err(CoreError::InsufficientLiquidity {
                have: garden.reserve_balance.saturating_add(nav),
                need: fee,
            });
        }

        // ── adapter boundary ────────────────────────────────
        let mut reserve_out: u128 = 0;
        for spec in op_specs.iter().rev() {
            let op = ops.get_mut(&spec.integration)?;
            reserve_out = reserve_out.saturating_add(op.exit(strategy_id, WAD)?);
        }

        // ── mutation ────────────────────────────────────────
        let voter_locks: Vec<(Address, u128)> = self
            .strategy(strategy_id)?
            .voters
            .iter()
            .map(|v| (v.voter, v.weight.unsigned_abs()))
            .collect();

        let garden = self.garden_mut(garden_id)?;
        garden.reserve_balance = garden.reserve_balance.saturating_add(reserve_out);
        garden.principal = garden
            .principal
            .saturating_sub(capital_allocated)
            .saturating_add(reserve_out);

        let strategy = self.strategy_mut(strategy_id)?;
        strategy.capital_returned = reserve_out;
        strategy.status = StrategyStatus::Finalized;
        strategy.exited_at = Some(now);
        strategy.updated_at = now;

        for (voter, magnitude) in &voter_locks {
            self.unlock_balance(garden_id, *voter, *magnitude);
        }

        let profit = reserve_out.saturating_sub(capital_allocated);
        let loss = capital_allocated.saturating_sub(reserve_out);
        if loss > 0 {
            let burn = tokenomics::stake_penalty(
                stake,
                capital_allocated,
                reserve_out,
                self.config.stake_penalty_factor,
                self.config.penalty_factor_denominator,
            )?;
            if burn > 0 {
                let burned = self.burn_shares(garden_id, strategist, burn, now)?;
                self.push_event(Event::StakeBurned {
                    strategy: strategy_id,
                    strategist,
                    burned,
                    at: now,
                });
                debug!(strategy = %strategy_id, strategist = %strategist, burned, "stake penalty applied");
            }
        }

        self.settle_strategy_rewards(strategy_id, now)?;

        // refresh the deposit tolerance reference after settlement
        let garden = self.garden_mut(garden_id)?;
        let new_price = garden.price_per_share_wad()?;
        garden.last_price_per_share_wad = new_price;
        garden.last_price_update_at = now;

        self.push_event(Event::StrategyFinalized {
            strategy: strategy_id,
            capital_returned: reserve_out,
            profit,
            loss,
            at: now,
        });
        self.pay_keeper(garden_id, keeper, fee, now);
        info!(strategy = %strategy_id, capital_returned = reserve_out, profit, loss, "strategy finalized");
        Ok(())
    }

    // ════════════════════════════════════════════════════════════════════
    // CANCEL
    // ════════════════════════════════════════════════════════════════════

    /// Cancel a `Dataset` candidate that never reached voting resolution,
    /// releasing the strategist's stake. Open to the strategist and to
    /// governance/keeper paths.
    pub fn delete_candidate_strategy(
        &mut self,
        strategy_id: StrategyId,
        caller: Address,
        now: u64,
    ) -> Result<()> {
        let strategy = self.strategy(strategy_id)?;
        let allowed = caller == strategy.strategist
            || self.registry.is_governance(&caller)
            || self.registry.is_valid_keeper(&caller);
        if !allowed {
            return Err(CoreError::NotAuthorized);
        }
        match strategy.status {
            StrategyStatus::Dataset => {}
            StrategyStatus::Active | StrategyStatus::Executed => {
                return Err(CoreError::AlreadyResolved)
            }
            StrategyStatus::Finalized => return Err(CoreError::AlreadyFinalized),
            StrategyStatus::Expired => {
                return Err(CoreError::StrategyExpired(strategy.updated_at))
            }
        }
        let garden_id = strategy.garden;
        let strategist = strategy.strategist;
        let stake = strategy.stake;

        self.unlock_balance(garden_id, strategist, stake);
        let strategy = self.strategy_mut(strategy_id)?;
        strategy.status = StrategyStatus::Expired;
        strategy.exited_at = Some(now);
        strategy.updated_at = now;
        self.push_event(Event::StrategyCancelled {
            strategy: strategy_id,
            at: now,
        });
        info!(strategy = %strategy_id, "candidate strategy cancelled");
        Ok(())
    }

    // ════════════════════════════════════════════════════════════════════
    // VALUATION & FEES
    // ════════════════════════════════════════════════════════════════════

    /// Net asset value of a strategy's deployed capital in reserve-asset
    /// terms: each operation reports its holding and denomination, the
    /// oracle converts into the garden reserve.
    pub fn strategy_nav(
        &self,
        strategy_id: StrategyId,
        ops: &OperationRegistry,
        oracle: &dyn PriceOracle,
    ) -> Result<u128> {
        let strategy = self.strategy(strategy_id)?;
        let reserve_asset = self.garden(strategy.garden)?.reserve_asset;
        let mut nav: u128 = 0;
        for spec in &strategy.operations {
            let op = ops.get(&spec.integration)?;
            let (token, value) = op.get_nav(strategy_id)?;
            let rate = oracle.get_price(token, reserve_asset)?;
            nav = nav.saturating_add(wad_mul(value, rate)?);
        }
        Ok(nav)
    }

    /// Keeper fee ceiling: the configured fraction of the strategy's max
    /// gas fee percentage, applied to the transition's reference amount.
    pub(crate) fn keeper_fee_bound(&self, reference: u128, max_gas_fee_bps: u128) -> Result<u128> {
        let ceiling = bps_mul(reference, max_gas_fee_bps)?;
        Ok(bps_mul(ceiling, self.config.keeper_fee_fraction_bps)?)
    }

    /// Pay a keeper fee out of the garden reserve. Called only after all
    /// state mutation for the transition is complete.
    pub(crate) fn pay_keeper(&mut self, garden_id: GardenId, keeper: Address, fee: u128, now: u64) {
        if fee == 0 {
            return;
        }
        let asset = match self.garden_mut(garden_id) {
            Ok(garden) => {
                garden.reserve_balance = garden.reserve_balance.saturating_sub(fee);
                garden.principal = garden.principal.saturating_sub(fee);
                garden.reserve_asset
            }
            Err(_) => return,
        };
        self.credit_holder(asset, keeper, fee);
        self.push_event(Event::KeeperPaid {
            keeper,
            fee,
            at: now,
        });
    }
}
