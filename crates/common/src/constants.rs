//! # Economic Constants
//!
//! Single source of truth for protocol-policy values. All crates must
//! reference these constants instead of redefining them; `ProtocolConfig`
//! seeds its defaults from here so deployments can override without code
//! changes.

use crate::fixed_point::WAD;

// ════════════════════════════════════════════════════════════════════════════
// PROFIT SHARING
// ════════════════════════════════════════════════════════════════════════════

/// Strategist receives 10% of realized strategy profit.
pub const PROFIT_STRATEGIST_SHARE_BPS: u128 = 1_000;

/// Stewards (voters) share 5% of realized strategy profit.
pub const PROFIT_STEWARD_SHARE_BPS: u128 = 500;

/// Liquidity providers keep 85% of realized strategy profit.
/// The LP share is never set aside; it stays in the garden and accrues
/// through the share price.
pub const PROFIT_LP_SHARE_BPS: u128 = 8_500;

/// Custom per-garden splits must land within this distance of 100%.
pub const PROFIT_SHARING_TOLERANCE_BPS: u128 = 500;

// ════════════════════════════════════════════════════════════════════════════
// STAKE PENALTY
// ════════════════════════════════════════════════════════════════════════════

/// Loss penalty multiplier applied to the strategist's staked shares,
/// expressed over `PENALTY_FACTOR_DENOMINATOR` (175 / 100 = 1.75x).
/// Protocol-policy value; do not alter without domain confirmation.
pub const STAKE_PENALTY_FACTOR: u128 = 175;

/// Denominator for `STAKE_PENALTY_FACTOR`.
pub const PENALTY_FACTOR_DENOMINATOR: u128 = 100;

/// Steward reward pool factor on losing strategies (90%).
pub const STEWARD_LOSS_FACTOR_BPS: u128 = 9_000;

/// Steward reward pool factor when a strategy finalizes with zero
/// dissenting votes recorded (80%).
pub const STEWARD_NO_DISSENT_FACTOR_BPS: u128 = 8_000;

// ════════════════════════════════════════════════════════════════════════════
// MINING REWARDS
// ════════════════════════════════════════════════════════════════════════════

/// Hard cap on cumulative GRV ever minted across all gardens.
pub const MAX_GRV_CAP: u128 = 500_000 * WAD;

/// GRV emission per unit of deployed capital per year (5% in WAD).
pub const GRV_EMISSION_RATE_WAD: u128 = 50_000_000_000_000_000;

/// Benchmark profit-ratio threshold below which a strategy is "bad"
/// (break-even, annualized).
pub const BENCHMARK_THRESHOLD_LOW_WAD: u128 = WAD;

/// Benchmark profit-ratio threshold above which a strategy is "good"
/// (1.20 annualized).
pub const BENCHMARK_THRESHOLD_HIGH_WAD: u128 = 1_200_000_000_000_000_000;

/// Reward ratio for the bad segment (0.5x).
pub const BENCHMARK_SEGMENT_BAD_WAD: u128 = 500_000_000_000_000_000;

/// Reward ratio for the neutral segment (1.0x).
pub const BENCHMARK_SEGMENT_NEUTRAL_WAD: u128 = WAD;

/// Reward ratio for the good segment (2.0x).
pub const BENCHMARK_SEGMENT_GOOD_WAD: u128 = 2_000_000_000_000_000_000;

// ════════════════════════════════════════════════════════════════════════════
// TIME WINDOWS
// ════════════════════════════════════════════════════════════════════════════

/// Seconds in a (non-leap) year, used for APY annualization and emission.
pub const YEAR_SECS: u64 = 31_536_000;

/// Post-deposit hardlock before shares can be withdrawn (1 day).
pub const DEPOSIT_HARDLOCK_SECS: u64 = 86_400;

/// Window after proposal creation inside which voting must resolve (7 days).
pub const VOTING_WINDOW_SECS: u64 = 604_800;

/// Cooldown between strategy capital tranches (6 hours).
pub const STRATEGY_COOLDOWN_SECS: u64 = 21_600;

/// Strategy duration bounds.
pub const MIN_STRATEGY_DURATION_SECS: u64 = 86_400;
pub const MAX_STRATEGY_DURATION_SECS: u64 = 43_200_000;

// ════════════════════════════════════════════════════════════════════════════
// GARDEN LIMITS
// ════════════════════════════════════════════════════════════════════════════

/// Haircut applied to the strategy-backed portion of a penalized exit (2.5%).
pub const WITHDRAWAL_PENALTY_BPS: u128 = 250;

/// Deposit price-per-share base tolerance (1%).
pub const PRICE_TOLERANCE_BPS: u128 = 100;

/// Additional tolerance per day since the last recorded share price (0.25%).
pub const PRICE_TOLERANCE_DECAY_BPS_PER_DAY: u128 = 25;

/// Minimum voting quorum as a fraction of garden supply (10%).
pub const MIN_QUORUM_BPS: u128 = 1_000;

/// Fraction of a strategy's max gas fee percentage a keeper may charge.
pub const KEEPER_FEE_FRACTION_BPS: u128 = 10_000;
