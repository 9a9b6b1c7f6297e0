//! Time-weighted contributor power.
//!
//! Power over a window is the contributor's balance integrated against
//! the garden's supply, both piecewise-constant between checkpoints,
//! expressed as a WAD fraction of supply-time. A late flash deposit only
//! earns weight for the time it was actually held inside the window.

use super::internal_model::{BalanceCheckpoint, SupplyCheckpoint};
use crate::state::ProtocolState;
use crate::types::{Address, GardenId};
use crate::{CoreError, Result};
use grove_common::fixed_point::wad_div;
use grove_common::WAD;

impl ProtocolState {
    /// Time-weighted fraction of `garden_id`'s supply held by `addr` over
    /// `[from, to]`, as a WAD fraction of 1.
    ///
    /// Rejects inverted windows and windows ending before the garden
    /// existed; `from` is clamped to the garden's initialization time.
    pub fn contributor_power(
        &self,
        garden_id: GardenId,
        addr: Address,
        from: u64,
        to: u64,
    ) -> Result<u128> {
        let garden = self.garden(garden_id)?;
        if to < from || to < garden.initialized_at {
            return Err(CoreError::InvalidWindow);
        }
        let from = from.max(garden.initialized_at);

        let contributor = match garden.contributor(&addr) {
            Some(c) => c,
            None => return Ok(0),
        };

        // point query: instantaneous share of supply
        if from == to {
            let balance = balance_at(&contributor.checkpoints, to);
            let supply = supply_at(&garden.supply_checkpoints, to);
            if supply == 0 {
                return Ok(0);
            }
            return Ok(safe_wad_ratio(balance, supply));
        }

        // merge both checkpoint timelines into segment boundaries
        let mut cuts: Vec<u64> = Vec::with_capacity(
            2 + contributor.checkpoints.len() + garden.supply_checkpoints.len(),
        );
        cuts.push(from);
        cuts.push(to);
        for cp in &contributor.checkpoints {
            if cp.at > from && cp.at < to {
                cuts.push(cp.at);
            }
        }
        for cp in &garden.supply_checkpoints {
            if cp.at > from && cp.at < to {
                cuts.push(cp.at);
            }
        }
        cuts.sort_unstable();
        cuts.dedup();

        let mut balance_time: u128 = 0;
        let mut supply_time: u128 = 0;
        for pair in cuts.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let dt = (end - start) as u128;
            let balance = balance_at(&contributor.checkpoints, start);
            let supply = supply_at(&garden.supply_checkpoints, start);
            balance_time = balance_time.saturating_add(balance.saturating_mul(dt));
            supply_time = supply_time.saturating_add(supply.saturating_mul(dt));
        }

        if supply_time == 0 {
            return Ok(0);
        }
        Ok(safe_wad_ratio(balance_time, supply_time))
    }
}

/// Balance in effect at `t`: the last checkpoint at or before `t`, zero
/// before the first one.
fn balance_at(checkpoints: &[BalanceCheckpoint], t: u64) -> u128 {
    checkpoints
        .iter()
        .rev()
        .find(|cp| cp.at <= t)
        .map(|cp| cp.balance)
        .unwrap_or(0)
}

fn supply_at(checkpoints: &[SupplyCheckpoint], t: u64) -> u128 {
    checkpoints
        .iter()
        .rev()
        .find(|cp| cp.at <= t)
        .map(|cp| cp.supply)
        .unwrap_or(0)
}

/// WAD ratio `num / den` with overflow-safe downscaling for very large
/// integrals. `num <= den` is the expected shape, so the result stays in
/// `[0, WAD]`.
fn safe_wad_ratio(num: u128, den: u128) -> u128 {
    if den == 0 {
        return 0;
    }
    let limit = u128::MAX / WAD;
    let largest = num.max(den);
    if largest <= limit {
        return wad_div(num, den).unwrap_or(0);
    }
    let scale = largest / limit + 1;
    let den_scaled = den / scale;
    if den_scaled == 0 {
        return 0;
    }
    wad_div(num / scale, den_scaled).unwrap_or(0)
}

/// Record a balance checkpoint, coalescing same-timestamp updates.
pub(crate) fn push_balance_checkpoint(list: &mut Vec<BalanceCheckpoint>, at: u64, balance: u128) {
    if let Some(last) = list.last_mut() {
        if last.at == at {
            last.balance = balance;
            return;
        }
    }
    list.push(BalanceCheckpoint { at, balance });
}

/// Record a supply checkpoint, coalescing same-timestamp updates.
pub(crate) fn push_supply_checkpoint(list: &mut Vec<SupplyCheckpoint>, at: u64, supply: u128) {
    if let Some(last) = list.last_mut() {
        if last.at == at {
            last.supply = supply;
            return;
        }
    }
    list.push(SupplyCheckpoint { at, supply });
}
