//! Keeper-relayed signed deposits and withdrawals.
//!
//! A contributor signs a typed request off-chain; an allow-listed keeper
//! submits it and is paid a fee bounded by the signer's `max_fee`, taken
//! out of the proceeds. Each signer carries a strictly increasing nonce
//! per garden: a failed transition does not consume it, a committed one
//! does, and replaying a consumed nonce is rejected.

use crate::crypto::{verify_request, RequestAction, SignedRequest};
use crate::events::Event;
use crate::operation::OperationRegistry;
use crate::oracle::PriceOracle;
use crate::state::ProtocolState;
use crate::types::Address;
use crate::{CoreError, Result};
use tracing::debug;

impl ProtocolState {
    /// Relay a signed deposit. The keeper fee is deducted from the
    /// deposited amount; shares are minted on the net.
    ///
    /// Returns the shares minted for the signer.
    pub fn deposit_by_signature(
        &mut self,
        keeper: Address,
        req: &SignedRequest,
        fee: u128,
        now: u64,
    ) -> Result<u128> {
        // ── validation ──────────────────────────────────────
        if !self.registry.is_valid_keeper(&keeper) {
            return Err(CoreError::NotKeeper);
        }
        if req.action != RequestAction::Deposit {
            return Err(CoreError::InvalidParameter(
                "request is not a deposit".into(),
            ));
        }
        if fee > req.max_fee {
            return Err(CoreError::FeeTooHigh {
                fee,
                max: req.max_fee,
            });
        }
        verify_request(req)?;
        let garden = self.garden(req.garden)?;
        let expected = garden
            .contributor(&req.signer)
            .map(|c| c.nonce)
            .unwrap_or(0);
        if req.nonce != expected {
            return Err(CoreError::InvalidNonce {
                got: req.nonce,
                expected,
            });
        }
        let asset = garden.reserve_asset;
        if fee >= req.amount_in {
            return Err(CoreError::InvalidParameter(
                "fee consumes the whole deposit".into(),
            ));
        }
        let have = self.reserve_balance_of(&asset, &req.signer);
        if have < req.amount_in {
            return Err(CoreError::InsufficientFunds {
                have,
                need: req.amount_in,
            });
        }
        let net = req.amount_in - fee;

        // ── mutation ────────────────────────────────────────
        let shares = self.deposit(req.garden, req.signer, net, req.min_amount_out, req.signer, now)?;
        self.bump_nonce(req)?;

        // keeper fee moves last
        if fee > 0 {
            self.debit_holder(asset, req.signer, fee)?;
            self.credit_holder(asset, keeper, fee);
            self.push_event(Event::KeeperPaid {
                keeper,
                fee,
                at: now,
            });
        }
        debug!(garden = %req.garden, signer = %req.signer, net, fee, "signed deposit relayed");
        Ok(shares)
    }

    /// Relay a signed withdrawal of `amount_in` shares. The keeper fee is
    /// deducted from the reserve proceeds; the signer's `min_amount_out`
    /// applies to their net.
    pub fn withdraw_by_signature(
        &mut self,
        keeper: Address,
        req: &SignedRequest,
        fee: u128,
        ops: &mut OperationRegistry,
        oracle: &dyn PriceOracle,
        now: u64,
    ) -> Result<u128> {
        // ── validation ──────────────────────────────────────
        if !self.registry.is_valid_keeper(&keeper) {
            return Err(CoreError::NotKeeper);
        }
        if req.action != RequestAction::Withdraw {
            return Err(CoreError::InvalidParameter(
                "request is not a withdrawal".into(),
            ));
        }
        if fee > req.max_fee {
            return Err(CoreError::FeeTooHigh {
                fee,
                max: req.max_fee,
            });
        }
        verify_request(req)?;
        let garden = self.garden(req.garden)?;
        let expected = garden
            .contributor(&req.signer)
            .map(|c| c.nonce)
            .unwrap_or(0);
        if req.nonce != expected {
            return Err(CoreError::InvalidNonce {
                got: req.nonce,
                expected,
            });
        }
        let asset = garden.reserve_asset;
        let min_gross = req.min_amount_out.saturating_add(fee);

        // ── mutation ────────────────────────────────────────
        let amount_out = self.withdraw(
            req.garden,
            req.signer,
            req.amount_in,
            min_gross,
            req.signer,
            false,
            None,
            ops,
            oracle,
            now,
        )?;
        self.bump_nonce(req)?;

        if fee > 0 {
            self.debit_holder(asset, req.signer, fee)?;
            self.credit_holder(asset, keeper, fee);
            self.push_event(Event::KeeperPaid {
                keeper,
                fee,
                at: now,
            });
        }
        debug!(garden = %req.garden, signer = %req.signer, amount_out, fee, "signed withdrawal relayed");
        Ok(amount_out.saturating_sub(fee))
    }

    fn bump_nonce(&mut self, req: &SignedRequest) -> Result<()> {
        let garden = self.garden_mut(req.garden)?;
        let contributor = garden.contributors.entry(req.signer).or_default();
        contributor.nonce = contributor.nonce.saturating_add(1);
        Ok(())
    }
}
