//! Grove economics: profit splits, stake penalties, and the mining
//! benchmark.
//!
//! Every function in this module is PURE - no mutations, no side effects.
//! State modules call in here and commit the results themselves.

use crate::{CoreError, Result};
use grove_common::fixed_point::{bps_mul, proportion, wad_div};
use grove_common::{MathError, ProtocolConfig, BPS_DENOMINATOR, WAD};
use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════
// PROFIT SHARING
// ════════════════════════════════════════════════════════════════════════════

/// Per-garden profit split in basis points. The three shares are expected
/// to sum to ~100%; the allowed distance is the configured tolerance band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitSharing {
    pub strategist_bps: u128,
    pub steward_bps: u128,
    pub lp_bps: u128,
}

impl ProfitSharing {
    /// Protocol defaults from configuration (LP takes the remainder).
    pub fn defaults_from(config: &ProtocolConfig) -> Self {
        let strategist_bps = config.default_strategist_share_bps;
        let steward_bps = config.default_steward_share_bps;
        ProfitSharing {
            strategist_bps,
            steward_bps,
            lp_bps: BPS_DENOMINATOR.saturating_sub(strategist_bps + steward_bps),
        }
    }

    pub fn total_bps(&self) -> u128 {
        self.strategist_bps + self.steward_bps + self.lp_bps
    }

    /// A custom split is acceptable when its sum lands within
    /// `tolerance_bps` of 100%.
    pub fn validate(&self, tolerance_bps: u128) -> Result<()> {
        let total = self.total_bps();
        let distance = total.abs_diff(BPS_DENOMINATOR);
        if distance > tolerance_bps {
            return Err(CoreError::ProfitSharingOutOfTolerance(total));
        }
        Ok(())
    }
}

/// Realized-profit split result. LP takes the remainder so the three
/// parts always reassemble the input exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfitSplit {
    pub strategist: u128,
    pub steward: u128,
    pub lp: u128,
}

impl ProfitSplit {
    pub fn total(&self) -> u128 {
        self.strategist + self.steward + self.lp
    }
}

/// Split realized profit by a garden's shares. Rounding dust lands in the
/// LP remainder.
pub fn split_profit(profit: u128, shares: &ProfitSharing) -> std::result::Result<ProfitSplit, MathError> {
    let strategist = bps_mul(profit, shares.strategist_bps)?;
    let steward = bps_mul(profit, shares.steward_bps)?;
    let lp = profit.saturating_sub(strategist).saturating_sub(steward);
    Ok(ProfitSplit {
        strategist,
        steward,
        lp,
    })
}

// ════════════════════════════════════════════════════════════════════════════
// STAKE PENALTY
// ════════════════════════════════════════════════════════════════════════════

/// Strategist stake burn on a losing strategy:
/// `min(stake, stake * (allocated - returned) / allocated * factor / denominator)`.
///
/// With the default 175/100 factor a 40% loss burns 70% of the stake and a
/// 60% loss burns the whole stake.
pub fn stake_penalty(
    stake: u128,
    capital_allocated: u128,
    capital_returned: u128,
    factor: u128,
    denominator: u128,
) -> std::result::Result<u128, MathError> {
    if capital_allocated == 0 || capital_returned >= capital_allocated {
        return Ok(0);
    }
    let loss = capital_allocated - capital_returned;
    let base = proportion(stake, loss, capital_allocated)?;
    let scaled = proportion(base, factor, denominator)?;
    Ok(scaled.min(stake))
}

/// Steward reward-pool factor in bps.
///
/// Profit pays the pool in full. On a loss, recorded dissent pays the
/// dissenting stewards at the loss factor; a loss with zero dissent pays
/// every steward at the reduced no-dissent factor.
pub fn steward_pool_factor_bps(is_loss: bool, has_dissent: bool, config: &ProtocolConfig) -> u128 {
    if !is_loss {
        BPS_DENOMINATOR
    } else if has_dissent {
        config.steward_loss_factor_bps
    } else {
        config.steward_no_dissent_factor_bps
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MINING BENCHMARK
// ════════════════════════════════════════════════════════════════════════════

/// 5-point protocol benchmark: two annualized profit-ratio thresholds and
/// three segment reward ratios (bad / neutral / good), all WAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningBenchmark {
    pub threshold_low_wad: u128,
    pub threshold_high_wad: u128,
    pub segment_bad_wad: u128,
    pub segment_neutral_wad: u128,
    pub segment_good_wad: u128,
}

impl MiningBenchmark {
    pub fn from_config(config: &ProtocolConfig) -> Self {
        MiningBenchmark {
            threshold_low_wad: config.benchmark_threshold_low_wad,
            threshold_high_wad: config.benchmark_threshold_high_wad,
            segment_bad_wad: config.benchmark_segment_bad_wad,
            segment_neutral_wad: config.benchmark_segment_neutral_wad,
            segment_good_wad: config.benchmark_segment_good_wad,
        }
    }

    /// Select the reward ratio for an annualized profit ratio.
    pub fn segment_ratio(&self, annualized_ratio_wad: u128) -> u128 {
        if annualized_ratio_wad < self.threshold_low_wad {
            self.segment_bad_wad
        } else if annualized_ratio_wad < self.threshold_high_wad {
            self.segment_neutral_wad
        } else {
            self.segment_good_wad
        }
    }
}

/// Raw profit ratio of a finalized strategy: `returned / allocated` (WAD).
pub fn profit_ratio(
    capital_returned: u128,
    capital_allocated: u128,
) -> std::result::Result<u128, MathError> {
    wad_div(capital_returned, capital_allocated)
}

/// Annualize a profit ratio over the held window: the distance from 1.0
/// is scaled by `year / held`, clamped at zero on the downside. Sub-second
/// windows clamp to one second.
pub fn annualized_profit_ratio(
    ratio_wad: u128,
    held_secs: u64,
    year_secs: u64,
) -> std::result::Result<u128, MathError> {
    let held = held_secs.max(1) as u128;
    let year = year_secs as u128;
    if ratio_wad >= WAD {
        let excess = ratio_wad - WAD;
        let scaled = proportion(excess, year, held)?;
        Ok(WAD.saturating_add(scaled))
    } else {
        let deficit = WAD - ratio_wad;
        let scaled = proportion(deficit, year, held)?;
        Ok(WAD.saturating_sub(scaled))
    }
}

/// GRV emission pool for a strategy: principal-time emission
/// `capital * rate * held / year`.
pub fn emission_pool(
    capital_allocated: u128,
    emission_rate_wad: u128,
    held_secs: u64,
    year_secs: u64,
) -> std::result::Result<u128, MathError> {
    let per_year = proportion(capital_allocated, emission_rate_wad, WAD)?;
    proportion(per_year, held_secs.max(1) as u128, year_secs as u128)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_common::constants;

    fn config() -> ProtocolConfig {
        ProtocolConfig::default()
    }

    #[test]
    fn default_split_reassembles_profit() {
        let shares = ProfitSharing::defaults_from(&config());
        // 10% / 5% / 85% of 1_000
        let split = split_profit(1_000, &shares).unwrap();
        assert_eq!(split.strategist, 100);
        assert_eq!(split.steward, 50);
        assert_eq!(split.lp, 850);
        assert_eq!(split.total(), 1_000);
    }

    #[test]
    fn split_rounding_dust_goes_to_lp() {
        let shares = ProfitSharing::defaults_from(&config());
        // 10% of 999 = 99, 5% = 49, remainder = 851
        let split = split_profit(999, &shares).unwrap();
        assert_eq!(split.strategist, 99);
        assert_eq!(split.steward, 49);
        assert_eq!(split.lp, 851);
        assert_eq!(split.total(), 999);
    }

    #[test]
    fn sharing_tolerance_band() {
        let ok = ProfitSharing {
            strategist_bps: 1_200,
            steward_bps: 500,
            lp_bps: 8_000,
        };
        // sum 9_700, distance 300 <= 500
        assert!(ok.validate(500).is_ok());

        let bad = ProfitSharing {
            strategist_bps: 3_000,
            steward_bps: 3_000,
            lp_bps: 8_000,
        };
        // sum 14_000, distance 4_000 > 500
        assert!(matches!(
            bad.validate(500),
            Err(CoreError::ProfitSharingOutOfTolerance(14_000))
        ));
    }

    #[test]
    fn penalty_matches_quadratic_formula() {
        // loss ratio 0.2, factor 1.75 → burn = stake * 0.35
        let burn = stake_penalty(1_000, 10_000, 8_000, 175, 100).unwrap();
        assert_eq!(burn, 350);
    }

    #[test]
    fn penalty_caps_at_stake() {
        // loss ratio 0.8 → 0.8 * 1.75 = 1.4 > 1.0, capped
        let burn = stake_penalty(1_000, 10_000, 2_000, 175, 100).unwrap();
        assert_eq!(burn, 1_000);
    }

    #[test]
    fn penalty_zero_on_profit() {
        assert_eq!(stake_penalty(1_000, 10_000, 12_000, 175, 100).unwrap(), 0);
        assert_eq!(stake_penalty(1_000, 0, 0, 175, 100).unwrap(), 0);
    }

    #[test]
    fn steward_factor_cases() {
        let cfg = config();
        assert_eq!(steward_pool_factor_bps(false, true, &cfg), 10_000);
        assert_eq!(steward_pool_factor_bps(false, false, &cfg), 10_000);
        assert_eq!(steward_pool_factor_bps(true, true, &cfg), 9_000);
        assert_eq!(steward_pool_factor_bps(true, false, &cfg), 8_000);
    }

    #[test]
    fn benchmark_segment_selection() {
        let b = MiningBenchmark::from_config(&config());
        assert_eq!(b.segment_ratio(WAD - 1), b.segment_bad_wad);
        assert_eq!(b.segment_ratio(WAD), b.segment_neutral_wad);
        assert_eq!(b.segment_ratio(b.threshold_high_wad), b.segment_good_wad);
    }

    #[test]
    fn annualization_scales_the_excess() {
        let year = constants::YEAR_SECS;
        // 5% over half a year annualizes to 10%
        let r = annualized_profit_ratio(WAD + WAD / 20, year / 2, year).unwrap();
        assert_eq!(r, WAD + WAD / 10);
        // 5% loss over half a year annualizes to a 10% loss
        let r = annualized_profit_ratio(WAD - WAD / 20, year / 2, year).unwrap();
        assert_eq!(r, WAD - WAD / 10);
        // full-year ratio is unchanged
        let r = annualized_profit_ratio(WAD + WAD / 20, year, year).unwrap();
        assert_eq!(r, WAD + WAD / 20);
    }

    #[test]
    fn emission_pool_scales_with_time() {
        let year = constants::YEAR_SECS;
        // 5% of 1_000_000 over a full year
        let full = emission_pool(1_000_000, constants::GRV_EMISSION_RATE_WAD, year, year).unwrap();
        assert_eq!(full, 50_000);
        let half = emission_pool(1_000_000, constants::GRV_EMISSION_RATE_WAD, year / 2, year).unwrap();
        assert_eq!(half, 25_000);
    }
}
