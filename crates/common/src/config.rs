//! Protocol configuration loader using TOML and serde.
//!
//! Every policy value the engine consults lives here so deployments can
//! tune them without code changes. Defaults come from `constants`, the
//! single source of truth for protocol-policy numbers.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constants;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProtocolConfig {
    // ── Garden ──────────────────────────────────────────────
    /// Post-deposit hardlock window in seconds.
    pub deposit_hardlock_secs: u64,

    /// Base deposit price-per-share tolerance in bps.
    pub price_tolerance_bps: u128,

    /// Extra tolerance in bps accrued per day since the last price record.
    pub price_tolerance_decay_bps_per_day: u128,

    /// Haircut on the strategy-backed portion of a penalized exit, bps.
    pub withdrawal_penalty_bps: u128,

    // ── Voting ──────────────────────────────────────────────
    /// Window after proposal creation inside which voting must resolve.
    pub voting_window_secs: u64,

    /// Minimum aggregate vote weight as bps of garden supply.
    pub min_quorum_bps: u128,

    /// Minimum number of voters (strategist self-vote included).
    pub min_voters: usize,

    // ── Strategy ────────────────────────────────────────────
    /// Minimum strategist stake in garden shares.
    pub min_strategist_stake: u128,

    /// Cooldown between capital tranches in seconds.
    pub strategy_cooldown_secs: u64,

    /// Allowed strategy duration bounds in seconds.
    pub min_strategy_duration_secs: u64,
    pub max_strategy_duration_secs: u64,

    /// Fraction (bps) of a strategy's max gas fee percentage a keeper
    /// fee may reach.
    pub keeper_fee_fraction_bps: u128,

    // ── Profit sharing & penalties ──────────────────────────
    /// Default profit split in bps. LP receives the remainder of 100%.
    pub default_strategist_share_bps: u128,
    pub default_steward_share_bps: u128,

    /// Allowed distance of a custom split's sum from 100%, in bps.
    pub profit_sharing_tolerance_bps: u128,

    /// Loss penalty multiplier over `penalty_factor_denominator`.
    pub stake_penalty_factor: u128,
    pub penalty_factor_denominator: u128,

    /// Steward pool factors (bps) on loss / on zero recorded dissent.
    pub steward_loss_factor_bps: u128,
    pub steward_no_dissent_factor_bps: u128,

    // ── Mining ──────────────────────────────────────────────
    /// GRV emission per unit of deployed capital per year (WAD).
    pub grv_emission_rate_wad: u128,

    /// Cumulative GRV mint cap across all gardens.
    pub max_grv_cap: u128,

    /// Benchmark table: two annualized profit-ratio thresholds plus
    /// three segment reward ratios (all WAD).
    pub benchmark_threshold_low_wad: u128,
    pub benchmark_threshold_high_wad: u128,
    pub benchmark_segment_bad_wad: u128,
    pub benchmark_segment_neutral_wad: u128,
    pub benchmark_segment_good_wad: u128,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            deposit_hardlock_secs: constants::DEPOSIT_HARDLOCK_SECS,
            price_tolerance_bps: constants::PRICE_TOLERANCE_BPS,
            price_tolerance_decay_bps_per_day: constants::PRICE_TOLERANCE_DECAY_BPS_PER_DAY,
            withdrawal_penalty_bps: constants::WITHDRAWAL_PENALTY_BPS,
            voting_window_secs: constants::VOTING_WINDOW_SECS,
            min_quorum_bps: constants::MIN_QUORUM_BPS,
            min_voters: 1,
            min_strategist_stake: 100,
            strategy_cooldown_secs: constants::STRATEGY_COOLDOWN_SECS,
            min_strategy_duration_secs: constants::MIN_STRATEGY_DURATION_SECS,
            max_strategy_duration_secs: constants::MAX_STRATEGY_DURATION_SECS,
            keeper_fee_fraction_bps: constants::KEEPER_FEE_FRACTION_BPS,
            default_strategist_share_bps: constants::PROFIT_STRATEGIST_SHARE_BPS,
            default_steward_share_bps: constants::PROFIT_STEWARD_SHARE_BPS,
            profit_sharing_tolerance_bps: constants::PROFIT_SHARING_TOLERANCE_BPS,
            stake_penalty_factor: constants::STAKE_PENALTY_FACTOR,
            penalty_factor_denominator: constants::PENALTY_FACTOR_DENOMINATOR,
            steward_loss_factor_bps: constants::STEWARD_LOSS_FACTOR_BPS,
            steward_no_dissent_factor_bps: constants::STEWARD_NO_DISSENT_FACTOR_BPS,
            grv_emission_rate_wad: constants::GRV_EMISSION_RATE_WAD,
            max_grv_cap: constants::MAX_GRV_CAP,
            benchmark_threshold_low_wad: constants::BENCHMARK_THRESHOLD_LOW_WAD,
            benchmark_threshold_high_wad: constants::BENCHMARK_THRESHOLD_HIGH_WAD,
            benchmark_segment_bad_wad: constants::BENCHMARK_SEGMENT_BAD_WAD,
            benchmark_segment_neutral_wad: constants::BENCHMARK_SEGMENT_NEUTRAL_WAD,
            benchmark_segment_good_wad: constants::BENCHMARK_SEGMENT_GOOD_WAD,
        }
    }
}

/// Load config from a TOML file path.
/// If the file is missing or fails to parse, an error is returned.
pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<ProtocolConfig> {
    let p = path.as_ref();
    let s = fs::read_to_string(p)?;
    let cfg: ProtocolConfig = toml::from_str(&s)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_values() {
        let cfg = ProtocolConfig::default();
        assert_eq!(cfg.stake_penalty_factor, 175);
        assert_eq!(cfg.penalty_factor_denominator, 100);
        assert_eq!(cfg.steward_loss_factor_bps, 9_000);
        assert_eq!(cfg.steward_no_dissent_factor_bps, 8_000);
        assert_eq!(
            cfg.default_strategist_share_bps + cfg.default_steward_share_bps,
            1_500
        );
    }

    #[test]
    fn parse_partial_toml_falls_back_to_defaults() {
        let cfg: ProtocolConfig =
            toml::from_str("min_voters = 3\ndeposit_hardlock_secs = 3600\n").unwrap();
        assert_eq!(cfg.min_voters, 3);
        assert_eq!(cfg.deposit_hardlock_secs, 3_600);
        assert_eq!(cfg.stake_penalty_factor, 175);
    }
}
