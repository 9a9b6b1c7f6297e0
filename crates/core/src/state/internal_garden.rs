//! Garden ledger: creation, deposits, withdrawals, and share-lock
//! bookkeeping.
//!
//! Deposits mint shares at the current NAV-per-share under a
//! time-decaying price tolerance; withdrawals burn shares and pay out
//! last. A withdrawal larger than the garden's free liquidity can pull
//! from a named live strategy at a fixed haircut when the caller opts in.

use super::internal_power::{push_balance_checkpoint, push_supply_checkpoint};
use super::internal_model::{Garden, GardenParams};
use crate::events::Event;
use crate::operation::OperationRegistry;
use crate::oracle::PriceOracle;
use crate::state::ProtocolState;
use crate::tokenomics::ProfitSharing;
use crate::types::{Address, GardenId, StrategyId};
use crate::{CoreError, Result};
use grove_common::fixed_point::{bps_mul, proportion, wad_div, wad_mul};
use grove_common::WAD;
use std::collections::HashSet;
use tracing::{debug, info};

impl ProtocolState {
    // ════════════════════════════════════════════════════════════════════
    // GARDEN CREATION
    // ════════════════════════════════════════════════════════════════════

    pub fn create_garden(
        &mut self,
        creator: Address,
        params: GardenParams,
        now: u64,
    ) -> Result<GardenId> {
        if !self.registry.is_whitelisted_asset(&params.reserve_asset) {
            return Err(CoreError::AssetNotWhitelisted);
        }
        if params.max_deposit_limit == 0 {
            return Err(CoreError::InvalidParameter(
                "max deposit limit must be positive".into(),
            ));
        }
        let profit_sharing = match params.profit_sharing {
            Some(custom) => {
                custom.validate(self.config.profit_sharing_tolerance_bps)?;
                custom
            }
            None => ProfitSharing::defaults_from(&self.config),
        };

        let id = GardenId(self.next_garden_id);
        self.next_garden_id += 1;

        let garden = Garden {
            id,
            name: params.name,
            creator,
            reserve_asset: params.reserve_asset,
            total_supply: 0,
            principal: 0,
            reserve_balance: 0,
            rewards_set_aside: 0,
            max_deposit_limit: params.max_deposit_limit,
            min_contribution: params.min_contribution,
            public_deposits: params.public_deposits,
            depositor_allowlist: params.depositor_allowlist.into_iter().collect::<HashSet<_>>(),
            profit_sharing,
            contributors: Default::default(),
            supply_checkpoints: vec![super::SupplyCheckpoint { at: now, supply: 0 }],
            last_price_per_share_wad: WAD,
            last_price_update_at: now,
            initialized_at: now,
            strategies: Vec::new(),
        };
        let reserve_asset = garden.reserve_asset;
        self.gardens.insert(id, garden);
        self.push_event(Event::GardenCreated {
            garden: id,
            creator,
            reserve_asset,
            at: now,
        });
        info!(garden = %id, creator = %creator, "garden created");
        Ok(id)
    }

    // ════════════════════════════════════════════════════════════════════
    // DEPOSIT
    // ════════════════════════════════════════════════════════════════════

    /// Mint shares for `recipient` at the current NAV-per-share.
    ///
    /// Returns the number of shares minted.
    pub fn deposit(
        &mut self,
        garden_id: GardenId,
        caller: Address,
        amount: u128,
        min_shares: u128,
        recipient: Address,
        now: u64,
    ) -> Result<u128> {
        // ── validation, no mutation ─────────────────────────
        if self.registry.is_garden_paused(garden_id) {
            return Err(CoreError::GardenPaused);
        }
        let tolerance_bps = self.config.price_tolerance_bps;
        let decay_bps_per_day = self.config.price_tolerance_decay_bps_per_day;

        let garden = self.garden(garden_id)?;
        let asset = garden.reserve_asset;
        if amount == 0 {
            return Err(CoreError::ZeroAmount);
        }
        if amount < garden.min_contribution {
            return Err(CoreError::InvalidParameter(
                "deposit below garden minimum contribution".into(),
            ));
        }
        if amount > garden.max_deposit_limit {
            return Err(CoreError::DepositLimitExceeded(garden.max_deposit_limit));
        }
        let authorized = caller == garden.creator
            || garden.public_deposits
            || garden.depositor_allowlist.contains(&caller);
        if !authorized {
            return Err(CoreError::NotAuthorized);
        }

        let price = garden.price_per_share_wad()?;
        check_price_tolerance(
            price,
            garden.last_price_per_share_wad,
            garden.last_price_update_at,
            now,
            tolerance_bps,
            decay_bps_per_day,
        )?;

        let shares = wad_div(amount, price)?;
        if shares == 0 {
            return Err(CoreError::ZeroAmount);
        }
        if shares < min_shares {
            return Err(CoreError::InsufficientShares {
                actual: shares,
                min: min_shares,
            });
        }
        let new_principal = garden
            .principal
            .checked_add(amount)
            .ok_or(grove_common::MathError::Overflow)?;
        let new_supply = garden
            .total_supply
            .checked_add(shares)
            .ok_or(grove_common::MathError::Overflow)?;

        let have = self.reserve_balance_of(&asset, &caller);
        if have < amount {
            return Err(CoreError::InsufficientFunds { have, need: amount });
        }

        // ── mutation ────────────────────────────────────────
        self.debit_holder(asset, caller, amount)?;
        let garden = self.garden_mut(garden_id)?;
        garden.reserve_balance = garden.reserve_balance.saturating_add(amount);
        garden.principal = new_principal;
        garden.total_supply = new_supply;
        push_supply_checkpoint(&mut garden.supply_checkpoints, now, new_supply);

        let contributor = garden.contributors.entry(recipient).or_default();
        if contributor.initial_deposit_at == 0 {
            contributor.initial_deposit_at = now;
        }
        contributor.last_deposit_at = now;
        contributor.total_deposits = contributor.total_deposits.saturating_add(amount);
        contributor.balance = contributor.balance.saturating_add(shares);
        let balance = contributor.balance;
        push_balance_checkpoint(&mut contributor.checkpoints, now, balance);

        garden.last_price_per_share_wad = price;
        garden.last_price_update_at = now;

        self.push_event(Event::Deposited {
            garden: garden_id,
            contributor: recipient,
            amount,
            shares,
            at: now,
        });
        debug!(garden = %garden_id, contributor = %recipient, amount, shares, "deposit");
        Ok(shares)
    }

    // ════════════════════════════════════════════════════════════════════
    // WITHDRAW
    // ════════════════════════════════════════════════════════════════════

    /// Burn `shares` and pay the reserve asset to `recipient`.
    ///
    /// When free liquidity is short, a penalized partial exit against the
    /// named live strategy is allowed only with `allow_penalty`: the
    /// shortfall is pulled pro-rata from the strategy's positions and a
    /// fixed haircut stays in the garden.
    #[allow(clippy::too_many_arguments)]
    pub fn withdraw(
        &mut self,
        garden_id: GardenId,
        caller: Address,
        shares: u128,
        min_amount_out: u128,
        recipient: Address,
        allow_penalty: bool,
        strategy_ref: Option<StrategyId>,
        ops: &mut OperationRegistry,
        oracle: &dyn PriceOracle,
        now: u64,
    ) -> Result<u128> {
        // ── validation, no mutation ─────────────────────────
        let hardlock_secs = self.config.deposit_hardlock_secs;
        let penalty_bps = self.config.withdrawal_penalty_bps;

        let garden = self.garden(garden_id)?;
        let asset = garden.reserve_asset;
        if shares == 0 {
            return Err(CoreError::ZeroAmount);
        }
        let contributor = garden
            .contributor(&caller)
            .ok_or(CoreError::InsufficientUnlockedBalance {
                unlocked: 0,
                required: shares,
            })?;
        let unlock_at = contributor.last_deposit_at.saturating_add(hardlock_secs);
        if now < unlock_at {
            return Err(CoreError::HardlockNotExpired(unlock_at));
        }
        let unlocked = contributor.unlocked();
        if shares > unlocked {
            return Err(CoreError::InsufficientUnlockedBalance {
                unlocked,
                required: shares,
            });
        }
        let price = garden.price_per_share_wad()?;
        let amount_gross = wad_mul(shares, price)?;
        let free_reserve = garden.reserve_balance;
        let shortfall = amount_gross.saturating_sub(free_reserve);

        let mut penalty = 0u128;
        let mut exit_pct_wad = 0u128;
        let mut penalized_strategy = None;
        if shortfall > 0 {
            if !allow_penalty {
                return Err(CoreError::InsufficientLiquidity {
                    have: free_reserve,
                    need: amount_gross,
                });
            }
            let sid = strategy_ref.ok_or_else(|| {
                CoreError::InvalidParameter("penalized exit requires a strategy reference".into())
            })?;
            let strategy = self.strategy(sid)?;
            if strategy.garden != garden_id {
                return Err(CoreError::InvalidParameter(
                    "strategy does not belong to this garden".into(),
                ));
            }
            if !strategy.is_live() || strategy.capital_allocated == 0 {
                return Err(CoreError::NotExecuted);
            }
            let nav = self.strategy_nav(sid, ops, oracle)?;
            if nav < shortfall {
                return Err(CoreError::InsufficientLiquidity {
                    have: free_reserve.saturating_add(nav),
                    need: amount_gross,
                });
            }
            exit_pct_wad = wad_div(shortfall, nav)?;
            penalty = bps_mul(shortfall, penalty_bps)?;
            penalized_strategy = Some(sid);
        }
        let amount_out = amount_gross - penalty;
        if amount_out < min_amount_out {
            return Err(CoreError::SlippageExceeded {
                actual: amount_out,
                min: min_amount_out,
            });
        }

        // ── mutation ────────────────────────────────────────
        let mut reserve_in = 0u128;
        if let Some(sid) = penalized_strategy {
            let op_specs = self.strategy(sid)?.operations.clone();
            for spec in op_specs.iter().rev() {
                let op = ops.get_mut(&spec.integration)?;
                reserve_in = reserve_in.saturating_add(op.exit(sid, exit_pct_wad)?);
            }
            let strategy = self.strategy_mut(sid)?;
            strategy.capital_allocated = strategy.capital_allocated.saturating_sub(shortfall);
            strategy.capital_unwound = strategy.capital_unwound.saturating_add(shortfall);
            strategy.updated_at = now;
        }

        let garden = self.garden_mut(garden_id)?;
        if reserve_in > 0 {
            garden.reserve_balance = garden.reserve_balance.saturating_add(reserve_in);
            garden.principal = garden
                .principal
                .saturating_sub(shortfall)
                .saturating_add(reserve_in);
        }
        let contributor = garden.contributors.entry(caller).or_default();
        contributor.balance = contributor.balance.saturating_sub(shares);
        contributor.withdrawn_since = contributor.withdrawn_since.saturating_add(amount_out);
        let balance = contributor.balance;
        push_balance_checkpoint(&mut contributor.checkpoints, now, balance);
        garden.total_supply = garden.total_supply.saturating_sub(shares);
        let supply = garden.total_supply;
        push_supply_checkpoint(&mut garden.supply_checkpoints, now, supply);
        garden.principal = garden.principal.saturating_sub(amount_out);
        garden.reserve_balance = garden.reserve_balance.saturating_sub(amount_out);
        // refresh the tolerance reference after the burn
        let new_price = garden.price_per_share_wad()?;
        garden.last_price_per_share_wad = new_price;
        garden.last_price_update_at = now;

        // value leaves the garden only after all bookkeeping
        self.credit_holder(asset, recipient, amount_out);
        self.push_event(Event::Withdrew {
            garden: garden_id,
            contributor: caller,
            shares,
            amount_out,
            penalty,
            at: now,
        });
        debug!(garden = %garden_id, contributor = %caller, shares, amount_out, penalty, "withdraw");
        Ok(amount_out)
    }

    // ════════════════════════════════════════════════════════════════════
    // SHARE LOCKS
    // ════════════════════════════════════════════════════════════════════

    /// Lock `amount` of a contributor's shares behind a stake or vote.
    pub(crate) fn lock_balance(
        &mut self,
        garden_id: GardenId,
        addr: Address,
        amount: u128,
    ) -> Result<()> {
        let garden = self.garden_mut(garden_id)?;
        let contributor =
            garden
                .contributors
                .get_mut(&addr)
                .ok_or(CoreError::InsufficientUnlockedBalance {
                    unlocked: 0,
                    required: amount,
                })?;
        let unlocked = contributor.unlocked();
        if amount > unlocked {
            return Err(CoreError::InsufficientUnlockedBalance {
                unlocked,
                required: amount,
            });
        }
        contributor.locked_balance = contributor.locked_balance.saturating_add(amount);
        Ok(())
    }

    pub(crate) fn unlock_balance(&mut self, garden_id: GardenId, addr: Address, amount: u128) {
        if let Ok(garden) = self.garden_mut(garden_id) {
            if let Some(contributor) = garden.contributors.get_mut(&addr) {
                contributor.locked_balance = contributor.locked_balance.saturating_sub(amount);
            }
        }
    }

    /// Burn up to `shares` from a contributor (loss penalty). Returns the
    /// amount actually burned.
    pub(crate) fn burn_shares(
        &mut self,
        garden_id: GardenId,
        addr: Address,
        shares: u128,
        now: u64,
    ) -> Result<u128> {
        let garden = self.garden_mut(garden_id)?;
        let contributor = garden.contributors.entry(addr).or_default();
        let burned = shares.min(contributor.balance);
        contributor.balance -= burned;
        let balance = contributor.balance;
        push_balance_checkpoint(&mut contributor.checkpoints, now, balance);
        garden.total_supply = garden.total_supply.saturating_sub(burned);
        let supply = garden.total_supply;
        push_supply_checkpoint(&mut garden.supply_checkpoints, now, supply);
        Ok(burned)
    }
}

/// Deposit share-price bound: the deviation from the last recorded price
/// must stay inside a tolerance that widens with the reference's age, so
/// a stale reference cannot block honest deposits while a sudden swing
/// still trips the check.
fn check_price_tolerance(
    price_wad: u128,
    reference_wad: u128,
    reference_at: u64,
    now: u64,
    tolerance_bps: u128,
    decay_bps_per_day: u128,
) -> Result<()> {
    if reference_wad == 0 {
        return Ok(());
    }
    let deviation = price_wad.abs_diff(reference_wad);
    if deviation == 0 {
        return Ok(());
    }
    let deviation_bps = proportion(deviation, grove_common::BPS_DENOMINATOR, reference_wad)?;
    let elapsed_days = now.saturating_sub(reference_at) as u128 / 86_400;
    let allowed_bps = tolerance_bps.saturating_add(decay_bps_per_day.saturating_mul(elapsed_days));
    if deviation_bps > allowed_bps {
        return Err(CoreError::PriceOutOfBounds {
            price_wad,
            reference_wad,
        });
    }
    Ok(())
}
