//! Reward settlement and claims.
//!
//! Finalization settles each strategy exactly once: realized profit is
//! split by the garden's sharing percentages (strategist + steward parts
//! set aside for claims, LP part left to accrue through the share price),
//! and the GRV mining reward is computed from the benchmark segment the
//! strategy's annualized profit ratio lands in, bounded by the protocol
//! mint cap. Claims pay out last and are rejected on replay.

use super::internal_model::{StrategyRewards, StrategyRewardsOverride, VoteRecord};
use crate::events::Event;
use crate::state::ProtocolState;
use crate::tokenomics::{self, ProfitSharing};
use crate::types::{Address, GardenId, StrategyId};
use crate::{CoreError, Result};
use grove_common::constants::YEAR_SECS;
use grove_common::fixed_point::{bps_mul, proportion, wad_div, wad_mul};
use tracing::{debug, info};

impl ProtocolState {
    // ════════════════════════════════════════════════════════════════════
    // SETTLEMENT (from finalize)
    // ════════════════════════════════════════════════════════════════════

    /// Settle a finalized strategy: profit split, set-aside accrual, and
    /// the capped GRV mining reward. Persists the per-strategy checkpoint
    /// all later claims are computed from.
    pub(crate) fn settle_strategy_rewards(
        &mut self,
        strategy_id: StrategyId,
        now: u64,
    ) -> Result<()> {
        let strategy = self.strategy(strategy_id)?;
        let garden_id = strategy.garden;
        let allocated = strategy.capital_allocated;
        let returned = strategy.capital_returned;
        let has_dissent = strategy.total_negative_votes > 0;
        let window_from = strategy.executed_at.unwrap_or(strategy.created_at);
        let window_to = strategy.exited_at.unwrap_or(now);
        let held_secs = window_to.saturating_sub(window_from).max(1);
        let sharing = self.garden(garden_id)?.profit_sharing;

        let profit = returned.saturating_sub(allocated);
        let loss = allocated.saturating_sub(returned);
        let is_loss = loss > 0;

        // reserve-asset profit split
        let (strategist_profit, stewards_profit, lp_profit) = if profit > 0 {
            let split = tokenomics::split_profit(profit, &sharing)?;
            (split.strategist, split.steward, split.lp)
        } else {
            (0, 0, 0)
        };

        // GRV mining reward
        let (grv_strategist, grv_stewards, grv_lp) =
            self.mine_grv(allocated, returned, held_secs, is_loss, has_dissent, &sharing)?;
        let minted = grv_strategist + grv_stewards + grv_lp;
        self.rewards.grv_minted_total = self.rewards.grv_minted_total.saturating_add(minted);

        // strategist + steward profit is reserved out of LP value
        let set_aside = strategist_profit + stewards_profit;
        if set_aside > 0 {
            let garden = self.garden_mut(garden_id)?;
            garden.rewards_set_aside = garden.rewards_set_aside.saturating_add(set_aside);
            garden.principal = garden.principal.saturating_sub(set_aside);
        }

        self.rewards.strategy_rewards.insert(
            strategy_id,
            StrategyRewards {
                strategy: strategy_id,
                garden: garden_id,
                capital_allocated: allocated,
                capital_returned: returned,
                profit,
                loss,
                has_dissent,
                strategist_profit,
                stewards_profit,
                lp_profit,
                grv_strategist,
                grv_stewards,
                grv_lp,
                window_from,
                window_to,
                strategist_claimed: false,
                steward_claims: Default::default(),
                lp_claims: Default::default(),
            },
        );
        self.push_event(Event::RewardsSettled {
            strategy: strategy_id,
            strategist_profit,
            stewards_profit,
            lp_profit,
            grv_minted: minted,
            at: now,
        });
        info!(strategy = %strategy_id, profit, loss, grv_minted = minted, "rewards settled");
        Ok(())
    }

    /// Benchmark-segmented GRV mint for one strategy, split by the
    /// garden's sharing percentages, adjusted for losses, and clamped so
    /// cumulative minting never exceeds the protocol cap.
    fn mine_grv(
        &self,
        allocated: u128,
        returned: u128,
        held_secs: u64,
        is_loss: bool,
        has_dissent: bool,
        sharing: &ProfitSharing,
    ) -> Result<(u128, u128, u128)> {
        if allocated == 0 {
            return Ok((0, 0, 0));
        }
        let pool = tokenomics::emission_pool(
            allocated,
            self.rewards.emission_rate_wad,
            held_secs,
            YEAR_SECS,
        )?;
        let ratio = tokenomics::profit_ratio(returned, allocated)?;
        let annualized = tokenomics::annualized_profit_ratio(ratio, held_secs, YEAR_SECS)?;
        let segment = self.rewards.benchmark.segment_ratio(annualized);
        let base = wad_mul(pool, segment)?;

        let mut grv_strategist = bps_mul(base, sharing.strategist_bps)?;
        let mut grv_stewards = bps_mul(base, sharing.steward_bps)?;
        let grv_lp = base.saturating_sub(grv_strategist).saturating_sub(grv_stewards);
        if is_loss {
            // no mining reward for a losing strategist; stewards at the
            // dissent-dependent factor
            grv_strategist = 0;
            let factor = tokenomics::steward_pool_factor_bps(is_loss, has_dissent, &self.config);
            grv_stewards = bps_mul(grv_stewards, factor)?;
        }

        let total = grv_strategist + grv_stewards + grv_lp;
        let available = self
            .rewards
            .max_grv_cap
            .saturating_sub(self.rewards.grv_minted_total);
        if total <= available {
            return Ok((grv_strategist, grv_stewards, grv_lp));
        }
        if available == 0 {
            return Ok((0, 0, 0));
        }
        // pro-rata clamp into the remaining cap
        let factor = wad_div(available, total)?;
        Ok((
            wad_mul(grv_strategist, factor)?,
            wad_mul(grv_stewards, factor)?,
            wad_mul(grv_lp, factor)?,
        ))
    }

    // ════════════════════════════════════════════════════════════════════
    // CLAIMS
    // ════════════════════════════════════════════════════════════════════

    /// Claim a contributor's settled rewards over a set of finalized
    /// strategies: strategist share, steward share pro-rata by vote
    /// weight, and LP GRV pro-rata by contributor power over the
    /// deployment window. Replaying a claimed strategy fails.
    ///
    /// Returns `(reserve_profit_paid, grv_credited)`.
    pub fn claim_rewards(
        &mut self,
        garden_id: GardenId,
        claimer: Address,
        strategy_ids: &[StrategyId],
        now: u64,
    ) -> Result<(u128, u128)> {
        self.garden(garden_id)?;
        let mut total_profit: u128 = 0;
        let mut total_grv: u128 = 0;

        for &sid in strategy_ids {
            // ── entitlement, no mutation ────────────────────
            let rec = self
                .rewards
                .strategy_rewards
                .get(&sid)
                .ok_or(CoreError::NotFinalized)?;
            if rec.garden != garden_id {
                return Err(CoreError::InvalidParameter(
                    "strategy was not run by this garden".into(),
                ));
            }
            let strategy = self.strategy(sid)?;
            let claimed_before = (claimer == strategy.strategist && rec.strategist_claimed)
                || rec.steward_claims.contains(&claimer)
                || rec.lp_claims.contains(&claimer);
            if claimed_before {
                return Err(CoreError::AlreadyClaimed);
            }

            let voters: Vec<VoteRecord> = strategy.voters.clone();
            let strategist = strategy.strategist;
            let is_loss = rec.loss > 0;
            let has_dissent = rec.has_dissent;
            let (window_from, window_to) = (rec.window_from, rec.window_to);
            let (rec_strategist_profit, rec_stewards_profit) =
                (rec.strategist_profit, rec.stewards_profit);
            let (rec_grv_strategist, rec_grv_stewards, rec_grv_lp) =
                (rec.grv_strategist, rec.grv_stewards, rec.grv_lp);

            let mut profit_part: u128 = 0;
            let mut grv_part: u128 = 0;
            let mut mark_strategist = false;
            let mut mark_steward = false;
            let mut mark_lp = false;

            if claimer == strategist {
                profit_part = profit_part.saturating_add(rec_strategist_profit);
                grv_part = grv_part.saturating_add(rec_grv_strategist);
                mark_strategist = true;
            }

            // steward component: on a loss with recorded dissent only the
            // dissenting voters share the pool
            if let Some(vote) = voters.iter().find(|v| v.voter == claimer) {
                let eligible: Vec<&VoteRecord> = if is_loss && has_dissent {
                    voters.iter().filter(|v| v.weight < 0).collect()
                } else {
                    voters.iter().collect()
                };
                if eligible.iter().any(|v| v.voter == claimer) {
                    let eligible_weight: u128 =
                        eligible.iter().map(|v| v.weight.unsigned_abs()).sum();
                    if eligible_weight > 0 {
                        let weight = vote.weight.unsigned_abs();
                        profit_part = profit_part.saturating_add(proportion(
                            rec_stewards_profit,
                            weight,
                            eligible_weight,
                        )?);
                        grv_part = grv_part.saturating_add(proportion(
                            rec_grv_stewards,
                            weight,
                            eligible_weight,
                        )?);
                        mark_steward = true;
                    }
                }
            }

            // LP component: GRV pro-rata by time-weighted power
            let power = self.contributor_power(garden_id, claimer, window_from, window_to)?;
            if power > 0 && rec_grv_lp > 0 {
                grv_part = grv_part.saturating_add(wad_mul(rec_grv_lp, power)?);
                mark_lp = true;
            }

            if profit_part == 0 && grv_part == 0 {
                continue;
            }

            // ── mark claimed ────────────────────────────────
            if let Some(rec) = self.rewards.strategy_rewards.get_mut(&sid) {
                if mark_strategist {
                    rec.strategist_claimed = true;
                }
                if mark_steward {
                    rec.steward_claims.insert(claimer);
                }
                if mark_lp {
                    rec.lp_claims.insert(claimer);
                }
            }
            total_profit = total_profit.saturating_add(profit_part);
            total_grv = total_grv.saturating_add(grv_part);
        }

        // ── payout, after all bookkeeping ───────────────────
        if total_profit > 0 {
            let garden = self.garden_mut(garden_id)?;
            garden.rewards_set_aside = garden.rewards_set_aside.saturating_sub(total_profit);
            garden.reserve_balance = garden.reserve_balance.saturating_sub(total_profit);
            let asset = garden.reserve_asset;
            self.credit_holder(asset, claimer, total_profit);
        }
        if total_grv > 0 {
            self.rewards.grv_claimed_total =
                self.rewards.grv_claimed_total.saturating_add(total_grv);
            let bal = self.rewards.grv_balances.entry(claimer).or_insert(0);
            *bal = bal.saturating_add(total_grv);
        }
        self.push_event(Event::RewardsClaimed {
            garden: garden_id,
            contributor: claimer,
            profit: total_profit,
            grv: total_grv,
            at: now,
        });
        debug!(garden = %garden_id, contributor = %claimer, total_profit, total_grv, "rewards claimed");
        Ok((total_profit, total_grv))
    }

    // ════════════════════════════════════════════════════════════════════
    // GOVERNANCE OVERRIDES
    // ════════════════════════════════════════════════════════════════════

    /// Governance-only: replace a garden's profit split going forward.
    pub fn set_profit_rewards(
        &mut self,
        caller: Address,
        garden_id: GardenId,
        sharing: ProfitSharing,
    ) -> Result<()> {
        if !self.registry.is_governance(&caller) {
            return Err(CoreError::NotGovernance);
        }
        sharing.validate(self.config.profit_sharing_tolerance_bps)?;
        self.garden_mut(garden_id)?.profit_sharing = sharing;
        info!(garden = %garden_id, "profit sharing updated by governance");
        Ok(())
    }

    /// Governance-only remediation: override a settled strategy's reward
    /// checkpoint, keeping the set-aside and mint-cap accounting
    /// consistent with the correction.
    pub fn update_strategy_rewards(
        &mut self,
        caller: Address,
        strategy_id: StrategyId,
        correction: StrategyRewardsOverride,
        now: u64,
    ) -> Result<()> {
        if !self.registry.is_governance(&caller) {
            return Err(CoreError::NotGovernance);
        }
        let rec = self
            .rewards
            .strategy_rewards
            .get(&strategy_id)
            .ok_or(CoreError::NotFinalized)?;
        let garden_id = rec.garden;

        let old_profit_reserved = rec.strategist_profit + rec.stewards_profit;
        let old_grv = rec.grv_total();

        let new_strategist_profit = correction.strategist_profit.unwrap_or(rec.strategist_profit);
        let new_stewards_profit = correction.stewards_profit.unwrap_or(rec.stewards_profit);
        let new_grv_strategist = correction.grv_strategist.unwrap_or(rec.grv_strategist);
        let new_grv_stewards = correction.grv_stewards.unwrap_or(rec.grv_stewards);
        let new_grv_lp = correction.grv_lp.unwrap_or(rec.grv_lp);

        let new_profit_reserved = new_strategist_profit + new_stewards_profit;
        let new_grv = new_grv_strategist + new_grv_stewards + new_grv_lp;

        if new_grv > old_grv {
            let extra = new_grv - old_grv;
            let available = self
                .rewards
                .max_grv_cap
                .saturating_sub(self.rewards.grv_minted_total);
            if extra > available {
                return Err(CoreError::InvalidParameter(
                    "correction exceeds the mining cap".into(),
                ));
            }
        }

        // ── mutation ────────────────────────────────────────
        if new_grv >= old_grv {
            self.rewards.grv_minted_total = self
                .rewards
                .grv_minted_total
                .saturating_add(new_grv - old_grv);
        } else {
            self.rewards.grv_minted_total = self
                .rewards
                .grv_minted_total
                .saturating_sub(old_grv - new_grv);
        }
        {
            let garden = self.garden_mut(garden_id)?;
            if new_profit_reserved >= old_profit_reserved {
                let extra = new_profit_reserved - old_profit_reserved;
                garden.rewards_set_aside = garden.rewards_set_aside.saturating_add(extra);
                garden.principal = garden.principal.saturating_sub(extra);
            } else {
                let released = old_profit_reserved - new_profit_reserved;
                garden.rewards_set_aside = garden.rewards_set_aside.saturating_sub(released);
                garden.principal = garden.principal.saturating_add(released);
            }
        }
        if let Some(rec) = self.rewards.strategy_rewards.get_mut(&strategy_id) {
            rec.strategist_profit = new_strategist_profit;
            rec.stewards_profit = new_stewards_profit;
            rec.grv_strategist = new_grv_strategist;
            rec.grv_stewards = new_grv_stewards;
            rec.grv_lp = new_grv_lp;
        }
        self.push_event(Event::RewardsOverridden {
            strategy: strategy_id,
            by: caller,
            at: now,
        });
        info!(strategy = %strategy_id, "strategy rewards overridden by governance");
        Ok(())
    }
}
