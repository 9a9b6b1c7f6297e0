//! Operation interface: the pluggable enter/exit/getNAV unit a strategy
//! deploys capital through.
//!
//! Concrete DeFi adapters live outside the core; the engine sees them only
//! through the `Operation` trait, dispatched per `OperationKind` via an
//! injected `OperationRegistry` keyed by integration address. Capital flows
//! through a strategy's operation list as a pipeline: each `enter` receives
//! the value forwarded by the previous stage and reports what it forwards
//! on. Routing stages hold nothing; terminal stages hold the position they
//! received.

use crate::types::{Address, StrategyId};
use crate::{CoreError, Result};
use grove_common::fixed_point::wad_mul;
use grove_common::WAD;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Lend,
    Pool,
    Vault,
    Trade,
    Custom,
}

/// One step of a strategy's capital pipeline, as stored on the strategy.
/// `params` is opaque adapter data passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSpec {
    pub kind: OperationKind,
    pub integration: Address,
    pub params: Vec<u8>,
}

/// Contract every integration adapter implements.
pub trait Operation {
    /// Deploy `capital` for `strategy`; returns the value forwarded to the
    /// next pipeline stage (in reserve-asset terms).
    fn enter(&mut self, strategy: StrategyId, capital: u128, params: &[u8]) -> Result<u128>;

    /// Unwind `percentage_wad` (WAD fraction) of the held position;
    /// returns the reserve amount released.
    fn exit(&mut self, strategy: StrategyId, percentage_wad: u128) -> Result<u128>;

    /// Current value of the held position, denominated in the returned
    /// token. The engine converts to the garden reserve via the oracle.
    fn get_nav(&self, strategy: StrategyId) -> Result<(Address, u128)>;

    fn kind(&self) -> OperationKind;
}

/// Integration lookup injected into execute/finalize/unwind transitions.
#[derive(Default)]
pub struct OperationRegistry {
    integrations: HashMap<Address, Box<dyn Operation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        OperationRegistry {
            integrations: HashMap::new(),
        }
    }

    pub fn register(&mut self, integration: Address, op: Box<dyn Operation>) {
        self.integrations.insert(integration, op);
    }

    pub fn contains(&self, integration: &Address) -> bool {
        self.integrations.contains_key(integration)
    }

    pub fn get(&self, integration: &Address) -> Result<&dyn Operation> {
        self.integrations
            .get(integration)
            .map(|b| b.as_ref())
            .ok_or(CoreError::UnknownIntegration(*integration))
    }

    pub fn get_mut(&mut self, integration: &Address) -> Result<&mut Box<dyn Operation>> {
        self.integrations
            .get_mut(integration)
            .ok_or(CoreError::UnknownIntegration(*integration))
    }
}

/// In-crate adapter double.
///
/// Holds per-strategy positions, values them at a configurable multiplier
/// (profit or loss injection for tests), and can be flipped into a
/// pass-through routing stage or a failing adapter.
pub struct MockOperation {
    kind: OperationKind,
    denomination: Address,
    positions: HashMap<StrategyId, u128>,
    return_multiplier_wad: u128,
    pass_through: bool,
    fail_enter: bool,
    fail_exit: bool,
}

impl MockOperation {
    pub fn new(kind: OperationKind, denomination: Address) -> Self {
        MockOperation {
            kind,
            denomination,
            positions: HashMap::new(),
            return_multiplier_wad: WAD,
            pass_through: false,
            fail_enter: false,
            fail_exit: false,
        }
    }

    /// Value held positions at `multiplier` (WAD): 1.2e18 injects a 20%
    /// profit, 0.5e18 a 50% loss.
    pub fn with_return_multiplier(mut self, multiplier_wad: u128) -> Self {
        self.return_multiplier_wad = multiplier_wad;
        self
    }

    /// Turn this adapter into a routing stage that holds nothing.
    pub fn pass_through(mut self) -> Self {
        self.pass_through = true;
        self
    }

    pub fn failing_enter(mut self) -> Self {
        self.fail_enter = true;
        self
    }

    pub fn failing_exit(mut self) -> Self {
        self.fail_exit = true;
        self
    }

    pub fn position(&self, strategy: StrategyId) -> u128 {
        self.positions.get(&strategy).copied().unwrap_or(0)
    }
}

impl Operation for MockOperation {
    fn enter(&mut self, strategy: StrategyId, capital: u128, _params: &[u8]) -> Result<u128> {
        if self.fail_enter {
            return Err(CoreError::OperationFailed("mock enter failure".into()));
        }
        if !self.pass_through {
            let pos = self.positions.entry(strategy).or_insert(0);
            *pos = pos.saturating_add(capital);
        }
        Ok(capital)
    }

    fn exit(&mut self, strategy: StrategyId, percentage_wad: u128) -> Result<u128> {
        if self.fail_exit {
            return Err(CoreError::OperationFailed("mock exit failure".into()));
        }
        let held = self.positions.get(&strategy).copied().unwrap_or(0);
        if held == 0 {
            return Ok(0);
        }
        let basis = wad_mul(held, percentage_wad)?;
        let returned = wad_mul(basis, self.return_multiplier_wad)?;
        self.positions.insert(strategy, held - basis);
        Ok(returned)
    }

    fn get_nav(&self, strategy: StrategyId) -> Result<(Address, u128)> {
        let held = self.positions.get(&strategy).copied().unwrap_or(0);
        let value = wad_mul(held, self.return_multiplier_wad)?;
        Ok((self.denomination, value))
    }

    fn kind(&self) -> OperationKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    #[test]
    fn mock_holds_and_values_position() {
        let mut op = MockOperation::new(OperationKind::Lend, addr(9))
            .with_return_multiplier(12 * WAD / 10);
        let sid = StrategyId(1);
        assert_eq!(op.enter(sid, 1_000, &[]).unwrap(), 1_000);
        let (token, nav) = op.get_nav(sid).unwrap();
        assert_eq!(token, addr(9));
        assert_eq!(nav, 1_200);
    }

    #[test]
    fn mock_full_exit_drains_position() {
        let mut op = MockOperation::new(OperationKind::Vault, addr(9));
        let sid = StrategyId(1);
        op.enter(sid, 500, &[]).unwrap();
        let out = op.exit(sid, WAD).unwrap();
        assert_eq!(out, 500);
        assert_eq!(op.position(sid), 0);
    }

    #[test]
    fn pass_through_holds_nothing() {
        let mut op = MockOperation::new(OperationKind::Trade, addr(9)).pass_through();
        let sid = StrategyId(1);
        assert_eq!(op.enter(sid, 500, &[]).unwrap(), 500);
        assert_eq!(op.position(sid), 0);
        assert_eq!(op.exit(sid, WAD).unwrap(), 0);
    }

    #[test]
    fn registry_rejects_unknown_integration() {
        let reg = OperationRegistry::new();
        let err = reg.get(&addr(1)).err().unwrap();
        assert!(matches!(err, CoreError::UnknownIntegration(_)));
    }
}
