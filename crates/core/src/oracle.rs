//! Price oracle abstraction.
//!
//! The engine consumes prices through the `PriceOracle` trait and never
//! owns an oracle implementation; concrete feeds live outside the core.
//! `ConstantPriceOracle` is the in-crate double used by tests and local
//! simulation.

use crate::types::Address;
use crate::{CoreError, Result};
use grove_common::WAD;
use std::collections::HashMap;

/// Exchange-rate source. Rates are WAD fixed-point: `get_price(a, b)`
/// returns how many units of `b` one WAD-unit of `a` is worth.
pub trait PriceOracle {
    fn get_price(&self, token_in: Address, token_out: Address) -> Result<u128>;
}

/// Fixed-rate oracle: identical tokens price at 1.0, configured pairs at
/// their set rate, everything else at `default_rate`.
pub struct ConstantPriceOracle {
    rates: HashMap<(Address, Address), u128>,
    default_rate: u128,
}

impl ConstantPriceOracle {
    pub fn new() -> Self {
        ConstantPriceOracle {
            rates: HashMap::new(),
            default_rate: WAD,
        }
    }

    pub fn with_default_rate(default_rate: u128) -> Self {
        ConstantPriceOracle {
            rates: HashMap::new(),
            default_rate,
        }
    }

    pub fn set_rate(&mut self, token_in: Address, token_out: Address, rate_wad: u128) {
        self.rates.insert((token_in, token_out), rate_wad);
    }
}

impl Default for ConstantPriceOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceOracle for ConstantPriceOracle {
    fn get_price(&self, token_in: Address, token_out: Address) -> Result<u128> {
        if token_in == token_out {
            return Ok(WAD);
        }
        let rate = self
            .rates
            .get(&(token_in, token_out))
            .copied()
            .unwrap_or(self.default_rate);
        if rate == 0 {
            return Err(CoreError::OracleFailure(format!(
                "zero rate for pair {token_in}/{token_out}"
            )));
        }
        Ok(rate)
    }
}
