//! Protocol registry: governance address, keeper allow-list, pause flags,
//! and the reserve-asset whitelist.
//!
//! The registry is an injected service passed into the engine at
//! construction. The engine only ever queries it; mutation happens on the
//! admin side before a state is built or between transitions.

use crate::types::{Address, GardenId, StrategyId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolRegistry {
    /// Address allowed to call governance-only paths.
    pub governance: Address,

    /// Keepers allowed to drive time-gated transitions for a fee.
    keepers: HashSet<Address>,

    /// Emergency switch: pauses every garden at once.
    global_pause: bool,

    paused_gardens: HashSet<GardenId>,
    paused_strategies: HashSet<StrategyId>,

    /// Assets accepted as a garden reserve.
    whitelisted_assets: HashSet<Address>,
}

impl ProtocolRegistry {
    pub fn new(governance: Address) -> Self {
        ProtocolRegistry {
            governance,
            keepers: HashSet::new(),
            global_pause: false,
            paused_gardens: HashSet::new(),
            paused_strategies: HashSet::new(),
            whitelisted_assets: HashSet::new(),
        }
    }

    // ── admin-side mutation ─────────────────────────────────

    pub fn add_keeper(&mut self, keeper: Address) {
        self.keepers.insert(keeper);
    }

    pub fn remove_keeper(&mut self, keeper: &Address) {
        self.keepers.remove(keeper);
    }

    pub fn whitelist_asset(&mut self, asset: Address) {
        self.whitelisted_assets.insert(asset);
    }

    pub fn set_global_pause(&mut self, paused: bool) {
        self.global_pause = paused;
    }

    pub fn set_garden_paused(&mut self, garden: GardenId, paused: bool) {
        if paused {
            self.paused_gardens.insert(garden);
        } else {
            self.paused_gardens.remove(&garden);
        }
    }

    pub fn set_strategy_paused(&mut self, strategy: StrategyId, paused: bool) {
        if paused {
            self.paused_strategies.insert(strategy);
        } else {
            self.paused_strategies.remove(&strategy);
        }
    }

    // ── engine-side queries ─────────────────────────────────

    pub fn is_valid_keeper(&self, addr: &Address) -> bool {
        self.keepers.contains(addr)
    }

    pub fn is_governance(&self, addr: &Address) -> bool {
        *addr == self.governance
    }

    pub fn is_garden_paused(&self, garden: GardenId) -> bool {
        self.global_pause || self.paused_gardens.contains(&garden)
    }

    pub fn is_strategy_paused(&self, strategy: StrategyId) -> bool {
        self.global_pause || self.paused_strategies.contains(&strategy)
    }

    pub fn is_whitelisted_asset(&self, asset: &Address) -> bool {
        self.whitelisted_assets.contains(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    #[test]
    fn keeper_list_membership() {
        let mut reg = ProtocolRegistry::new(addr(1));
        assert!(!reg.is_valid_keeper(&addr(2)));
        reg.add_keeper(addr(2));
        assert!(reg.is_valid_keeper(&addr(2)));
        reg.remove_keeper(&addr(2));
        assert!(!reg.is_valid_keeper(&addr(2)));
    }

    #[test]
    fn global_pause_covers_every_garden() {
        let mut reg = ProtocolRegistry::new(addr(1));
        let g = GardenId(7);
        assert!(!reg.is_garden_paused(g));
        reg.set_global_pause(true);
        assert!(reg.is_garden_paused(g));
    }
}
