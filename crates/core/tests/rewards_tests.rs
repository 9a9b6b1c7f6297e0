//! Rewards engine integration tests: quadratic stake penalty, profit
//! splits and set-aside, benchmark-segmented GRV mining with the mint
//! cap, contributor power, claims, and governance overrides.

use grove_common::{ProtocolConfig, WAD};
use grove_core::operation::{MockOperation, OperationKind, OperationRegistry, OperationSpec};
use grove_core::oracle::ConstantPriceOracle;
use grove_core::registry::ProtocolRegistry;
use grove_core::state::{GardenParams, ProtocolState, StrategyParams, StrategyRewardsOverride};
use grove_core::types::{Address, GardenId, StrategyId};
use grove_core::CoreError;

// ════════════════════════════════════════════════════════════════════════════
// HELPERS
// ════════════════════════════════════════════════════════════════════════════

const T0: u64 = 1_700_000_000;
const DAY: u64 = 86_400;
const COOLDOWN: u64 = 21_600;
const DURATION: u64 = 30 * DAY;

fn addr(b: u8) -> Address {
    Address::from_bytes([b; 20])
}

fn governance() -> Address {
    addr(0x01)
}

fn keeper() -> Address {
    addr(0x02)
}

fn asset() -> Address {
    addr(0xAA)
}

fn alice() -> Address {
    addr(0x10)
}

fn bob() -> Address {
    addr(0x11)
}

fn carol() -> Address {
    addr(0x12)
}

fn integration() -> Address {
    addr(0xB1)
}

struct Env {
    state: ProtocolState,
    ops: OperationRegistry,
    oracle: ConstantPriceOracle,
    garden: GardenId,
}

fn new_env(config: ProtocolConfig) -> Env {
    let mut registry = ProtocolRegistry::new(governance());
    registry.add_keeper(keeper());
    registry.whitelist_asset(asset());
    let mut state = ProtocolState::new(config, registry);
    let garden = state
        .create_garden(
            governance(),
            GardenParams {
                name: "rewards garden".into(),
                reserve_asset: asset(),
                max_deposit_limit: 1_000_000_000,
                min_contribution: 1,
                public_deposits: true,
                depositor_allowlist: vec![],
                profit_sharing: None,
            },
            T0,
        )
        .unwrap();
    for who in [alice(), bob(), carol()] {
        state.mint_reserve(asset(), who, 10_000_000).unwrap();
    }
    Env {
        state,
        ops: OperationRegistry::new(),
        oracle: ConstantPriceOracle::new(),
        garden,
    }
}

fn register_mock(env: &mut Env, multiplier_wad: u128) {
    env.ops = OperationRegistry::new();
    env.ops.register(
        integration(),
        Box::new(
            MockOperation::new(OperationKind::Lend, asset()).with_return_multiplier(multiplier_wad),
        ),
    );
}

fn strategy_params(max_capital: u128, max_allocation_bps: u128) -> StrategyParams {
    StrategyParams {
        max_capital_requested: max_capital,
        max_allocation_bps,
        max_gas_fee_bps: 100,
        max_trade_slippage_bps: 100,
        duration_secs: DURATION,
        expected_return_wad: WAD,
    }
}

/// Propose (stake), resolve (given votes), execute `capital`, and
/// finalize after the full duration. Returns the strategy id.
#[allow(clippy::too_many_arguments)]
fn run_strategy(
    env: &mut Env,
    stake: u128,
    voters: &[Address],
    weights: &[i128],
    capital: u128,
    max_allocation_bps: u128,
) -> StrategyId {
    let sid = env
        .state
        .add_strategy(
            env.garden,
            alice(),
            strategy_params(capital, max_allocation_bps),
            vec![OperationSpec {
                kind: OperationKind::Lend,
                integration: integration(),
                params: vec![],
            }],
            stake,
            T0,
        )
        .unwrap();
    env.state
        .resolve_voting(sid, keeper(), voters, weights, 0, T0 + 100)
        .unwrap();
    let exec_t = T0 + 100 + COOLDOWN;
    env.state
        .execute_strategy(sid, keeper(), capital, 0, &mut env.ops, exec_t)
        .unwrap();
    env.state
        .finalize_strategy(sid, keeper(), 0, 0, &mut env.ops, &env.oracle, exec_t + DURATION)
        .unwrap();
    sid
}

// ════════════════════════════════════════════════════════════════════════════
// 1. QUADRATIC STAKE PENALTY
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn loss_burns_stake_by_the_quadratic_formula() {
    let mut env = new_env(ProtocolConfig::default());
    register_mock(&mut env, WAD * 8 / 10);
    env.state.deposit(env.garden, alice(), 1_000_000, 0, alice(), T0).unwrap();
    env.state.deposit(env.garden, bob(), 500_000, 0, bob(), T0).unwrap();

    run_strategy(&mut env, 10_000, &[bob()], &[200_000], 500_000, 9_000);

    // loss ratio 0.2 on a 10_000 stake: 10_000 * 0.2 * 1.75 = 3_500
    let g = env.state.garden(env.garden).unwrap();
    assert_eq!(g.contributor(&alice()).unwrap().balance, 996_500);
    assert_eq!(g.total_supply, 1_496_500);
    // stake lock released before the burn
    assert_eq!(g.contributor(&alice()).unwrap().locked_balance, 0);
}

#[test]
fn catastrophic_loss_caps_the_burn_at_the_stake() {
    let mut env = new_env(ProtocolConfig::default());
    register_mock(&mut env, WAD / 5); // returns 20%, loss ratio 0.8
    env.state.deposit(env.garden, alice(), 1_000_000, 0, alice(), T0).unwrap();
    env.state.deposit(env.garden, bob(), 500_000, 0, bob(), T0).unwrap();

    run_strategy(&mut env, 10_000, &[bob()], &[200_000], 500_000, 9_000);

    // 0.8 * 1.75 = 1.4 of stake, capped at the 10_000 staked
    let g = env.state.garden(env.garden).unwrap();
    assert_eq!(g.contributor(&alice()).unwrap().balance, 990_000);
}

// ════════════════════════════════════════════════════════════════════════════
// 2. PROFIT SETTLEMENT (spec scenario: 200-unit injected profit)
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn injected_profit_reserves_the_strategist_share() {
    const UNIT: u128 = 1_000_000;
    let mut env = new_env(ProtocolConfig::default());
    // 1 unit of capital returning 201 units
    register_mock(&mut env, 201 * WAD);
    env.state.deposit(env.garden, alice(), UNIT, 0, alice(), T0).unwrap();

    let sid = run_strategy(&mut env, 500_000, &[], &[], UNIT, 10_000);

    let s = env.state.strategy(sid).unwrap();
    assert_eq!(s.capital_returned, 201 * UNIT);
    assert!(s.capital_returned > s.capital_allocated);

    // profit 200 units; strategist share 10% of it, exactly
    let rec = env.state.rewards.strategy_rewards.get(&sid).unwrap();
    assert_eq!(rec.profit, 200 * UNIT);
    assert_eq!(rec.strategist_profit, 20 * UNIT);
    // set-aside holds strategist + steward shares (10% + 5%)
    let g = env.state.garden(env.garden).unwrap();
    assert_eq!(g.rewards_set_aside, 30 * UNIT);
}

// ════════════════════════════════════════════════════════════════════════════
// 3. GRV MINING
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn mining_reward_splits_follow_the_benchmark_segment() {
    let mut env = new_env(ProtocolConfig::default());
    register_mock(&mut env, WAD * 12 / 10);
    env.state.deposit(env.garden, alice(), 1_000_000, 0, alice(), T0).unwrap();
    env.state.deposit(env.garden, bob(), 500_000, 0, bob(), T0).unwrap();

    let sid = run_strategy(&mut env, 10_000, &[bob()], &[200_000], 500_000, 9_000);

    // emission pool: 500_000 * 5% * (30 days / year) = 2_054
    // ratio 1.2 annualizes far above the 1.2 threshold → good segment 2x
    // base = 2_054 * 2 = 4_108, split 10% / 5% / remainder
    let rec = env.state.rewards.strategy_rewards.get(&sid).unwrap();
    assert_eq!(rec.grv_strategist, 410);
    assert_eq!(rec.grv_stewards, 205);
    assert_eq!(rec.grv_lp, 3_493);
    assert_eq!(env.state.rewards.grv_minted_total, 4_108);
}

#[test]
fn losing_strategy_mines_at_the_bad_segment_with_reduced_stewards() {
    let mut env = new_env(ProtocolConfig::default());
    register_mock(&mut env, WAD * 8 / 10);
    env.state.deposit(env.garden, alice(), 1_000_000, 0, alice(), T0).unwrap();
    env.state.deposit(env.garden, bob(), 500_000, 0, bob(), T0).unwrap();

    // bob voted FOR the losing strategy: no dissent recorded
    let sid = run_strategy(&mut env, 10_000, &[bob()], &[200_000], 500_000, 9_000);

    // bad segment 0.5x: base = 2_054 / 2 = 1_027
    // strategist forfeits, stewards reduced to 80%: 51 → 40
    let rec = env.state.rewards.strategy_rewards.get(&sid).unwrap();
    assert_eq!(rec.grv_strategist, 0);
    assert_eq!(rec.grv_stewards, 40);
    assert_eq!(rec.grv_lp, 874);
}

#[test]
fn dissenting_stewards_keep_the_loss_factor_share() {
    let mut env = new_env(ProtocolConfig::default());
    register_mock(&mut env, WAD * 8 / 10);
    env.state.deposit(env.garden, alice(), 1_000_000, 0, alice(), T0).unwrap();
    env.state.deposit(env.garden, bob(), 500_000, 0, bob(), T0).unwrap();
    env.state.deposit(env.garden, carol(), 500_000, 0, carol(), T0).unwrap();

    // bob dissents, carol supports; the strategy still activates and loses
    let sid = run_strategy(
        &mut env,
        10_000,
        &[bob(), carol()],
        &[-100_000, 200_000],
        500_000,
        9_000,
    );
    let rec = env.state.rewards.strategy_rewards.get(&sid).unwrap();
    assert!(rec.has_dissent);
    // loss factor 90%: 51 → 45
    assert_eq!(rec.grv_strategist, 0);
    assert_eq!(rec.grv_stewards, 45);

    // only the dissenting steward is eligible for the steward pool
    let (_, bob_grv) = env
        .state
        .claim_rewards(env.garden, bob(), &[sid], T0 + 40 * DAY)
        .unwrap();
    // steward 45 + LP share 874 * (500_000 / 2_000_000) = 218
    assert_eq!(bob_grv, 45 + 218);

    // carol voted for the loss: steward pool excluded, LP share only
    let (_, carol_grv) = env
        .state
        .claim_rewards(env.garden, carol(), &[sid], T0 + 40 * DAY)
        .unwrap();
    assert_eq!(carol_grv, 218);
}

#[test]
fn cumulative_minting_never_exceeds_the_cap() {
    let mut config = ProtocolConfig::default();
    config.max_grv_cap = 1_000;
    let mut env = new_env(config);
    register_mock(&mut env, WAD * 12 / 10);
    env.state.deposit(env.garden, alice(), 1_000_000, 0, alice(), T0).unwrap();
    env.state.deposit(env.garden, bob(), 500_000, 0, bob(), T0).unwrap();

    // unclamped this strategy would mint 4_108
    run_strategy(&mut env, 10_000, &[bob()], &[200_000], 500_000, 9_000);
    let minted = env.state.rewards.grv_minted_total;
    assert!(minted > 0);
    assert!(minted <= 1_000);
}

// ════════════════════════════════════════════════════════════════════════════
// 4. CONTRIBUTOR POWER
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn sole_depositor_has_full_power() {
    let mut env = new_env(ProtocolConfig::default());
    env.state.deposit(env.garden, alice(), 250_000, 0, alice(), T0).unwrap();

    let power = env
        .state
        .contributor_power(env.garden, alice(), T0, T0 + 10 * DAY)
        .unwrap();
    assert_eq!(power, WAD);

    // point query agrees
    let instant = env
        .state
        .contributor_power(env.garden, alice(), T0 + DAY, T0 + DAY)
        .unwrap();
    assert_eq!(instant, WAD);
}

#[test]
fn power_rejects_invalid_windows() {
    let mut env = new_env(ProtocolConfig::default());
    env.state.deposit(env.garden, alice(), 250_000, 0, alice(), T0).unwrap();

    let err = env
        .state
        .contributor_power(env.garden, alice(), T0 + 100, T0 + 50)
        .unwrap_err();
    assert_eq!(err, CoreError::InvalidWindow);

    // window ending before the garden existed
    let err = env
        .state
        .contributor_power(env.garden, alice(), T0 - 100, T0 - 50)
        .unwrap_err();
    assert_eq!(err, CoreError::InvalidWindow);
}

#[test]
fn late_flash_deposit_earns_only_its_time_slice() {
    let mut env = new_env(ProtocolConfig::default());
    env.state.deposit(env.garden, alice(), 100_000, 0, alice(), T0).unwrap();
    // bob drops 9x the pool with 10 seconds left in a 100-second window
    env.state.deposit(env.garden, bob(), 900_000, 0, bob(), T0 + 90).unwrap();

    let power = env
        .state
        .contributor_power(env.garden, bob(), T0, T0 + 100)
        .unwrap();
    // balance-time 900_000*10 against supply-time 100_000*90 + 1_000_000*10
    let expected = 9_000_000u128 * WAD / 19_000_000u128;
    assert_eq!(power, expected);
    // far below bob's 90% instantaneous share at the window end
    assert!(power < WAD * 9 / 10);
}

// ════════════════════════════════════════════════════════════════════════════
// 5. CLAIMS
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn claims_pay_each_role_and_reject_replay() {
    let mut env = new_env(ProtocolConfig::default());
    register_mock(&mut env, WAD * 12 / 10);
    env.state.deposit(env.garden, alice(), 1_000_000, 0, alice(), T0).unwrap();
    env.state.deposit(env.garden, bob(), 500_000, 0, bob(), T0).unwrap();

    let sid = run_strategy(&mut env, 10_000, &[bob()], &[200_000], 500_000, 9_000);

    // profit 100_000: strategist 10_000, stewards 5_000 (weights 10_000 vs
    // 200_000), GRV 410/205/3_493 with LP power 2/3 vs 1/3
    let (alice_profit, alice_grv) = env
        .state
        .claim_rewards(env.garden, alice(), &[sid], T0 + 40 * DAY)
        .unwrap();
    // 10_000 + 5_000 * 10/210 = 10_238
    assert_eq!(alice_profit, 10_238);
    // 410 + 205 * 10/210 + 3_493 * 2/3 = 410 + 9 + 2_328
    assert_eq!(alice_grv, 2_747);

    let (bob_profit, bob_grv) = env
        .state
        .claim_rewards(env.garden, bob(), &[sid], T0 + 40 * DAY)
        .unwrap();
    assert_eq!(bob_profit, 4_761);
    assert_eq!(bob_grv, 195 + 1_164);

    // paid in the reserve asset and credited in GRV
    assert_eq!(
        env.state.reserve_balance_of(&asset(), &alice()),
        9_000_000 + 10_238
    );
    assert_eq!(env.state.rewards.grv_balance_of(&alice()), 2_747);
    assert_eq!(
        env.state.garden(env.garden).unwrap().rewards_set_aside,
        15_000 - 10_238 - 4_761
    );

    // replay is rejected
    let err = env
        .state
        .claim_rewards(env.garden, alice(), &[sid], T0 + 41 * DAY)
        .unwrap_err();
    assert_eq!(err, CoreError::AlreadyClaimed);
}

#[test]
fn unrelated_contributor_claims_nothing() {
    let mut env = new_env(ProtocolConfig::default());
    register_mock(&mut env, WAD * 12 / 10);
    env.state.deposit(env.garden, alice(), 1_000_000, 0, alice(), T0).unwrap();
    env.state.deposit(env.garden, bob(), 500_000, 0, bob(), T0).unwrap();
    let sid = run_strategy(&mut env, 10_000, &[bob()], &[200_000], 500_000, 9_000);

    let (profit, grv) = env
        .state
        .claim_rewards(env.garden, carol(), &[sid], T0 + 40 * DAY)
        .unwrap();
    assert_eq!((profit, grv), (0, 0));
}

#[test]
fn claim_requires_a_settled_strategy() {
    let mut env = new_env(ProtocolConfig::default());
    env.state.deposit(env.garden, alice(), 1_000_000, 0, alice(), T0).unwrap();
    let err = env
        .state
        .claim_rewards(env.garden, alice(), &[StrategyId(99)], T0 + DAY)
        .unwrap_err();
    assert_eq!(err, CoreError::NotFinalized);
}

// ════════════════════════════════════════════════════════════════════════════
// 6. GOVERNANCE OVERRIDES
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn profit_sharing_update_is_governance_only() {
    use grove_core::tokenomics::ProfitSharing;
    let mut env = new_env(ProtocolConfig::default());
    let sharing = ProfitSharing {
        strategist_bps: 1_500,
        steward_bps: 500,
        lp_bps: 8_000,
    };
    let err = env
        .state
        .set_profit_rewards(alice(), env.garden, sharing)
        .unwrap_err();
    assert_eq!(err, CoreError::NotGovernance);

    env.state
        .set_profit_rewards(governance(), env.garden, sharing)
        .unwrap();
    assert_eq!(
        env.state.garden(env.garden).unwrap().profit_sharing.strategist_bps,
        1_500
    );
}

#[test]
fn reward_correction_adjusts_the_set_aside() {
    let mut env = new_env(ProtocolConfig::default());
    register_mock(&mut env, WAD * 12 / 10);
    env.state.deposit(env.garden, alice(), 1_000_000, 0, alice(), T0).unwrap();
    env.state.deposit(env.garden, bob(), 500_000, 0, bob(), T0).unwrap();
    let sid = run_strategy(&mut env, 10_000, &[bob()], &[200_000], 500_000, 9_000);
    assert_eq!(env.state.garden(env.garden).unwrap().rewards_set_aside, 15_000);

    let correction = StrategyRewardsOverride {
        strategist_profit: Some(0),
        ..Default::default()
    };
    let err = env
        .state
        .update_strategy_rewards(bob(), sid, correction, T0 + 40 * DAY)
        .unwrap_err();
    assert_eq!(err, CoreError::NotGovernance);

    env.state
        .update_strategy_rewards(governance(), sid, correction, T0 + 40 * DAY)
        .unwrap();
    // the zeroed strategist share flows back to LPs
    let g = env.state.garden(env.garden).unwrap();
    assert_eq!(g.rewards_set_aside, 5_000);
    assert_eq!(g.principal, 1_595_000);
    let rec = env.state.rewards.strategy_rewards.get(&sid).unwrap();
    assert_eq!(rec.strategist_profit, 0);
}
