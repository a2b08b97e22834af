//! # Pity Tracker
//!
//! Per-(player, banner) bad-luck counter. Pure state transitions over the
//! ledger's keyed store; every call writes through so later reads in the
//! same batch see the new value.

use crate::banner::BannerId;
use crate::ledger::{Ledger, PlayerId};

/// Counter operations over a ledger's pity store.
#[derive(Debug)]
pub struct PityTracker<'a, L: Ledger + ?Sized> {
    ledger: &'a L,
}

impl<'a, L: Ledger + ?Sized> PityTracker<'a, L> {
    /// Wraps a ledger.
    #[inline]
    #[must_use]
    pub const fn new(ledger: &'a L) -> Self {
        Self { ledger }
    }

    /// Current count (0 if the player never pulled on this banner).
    #[inline]
    #[must_use]
    pub fn get(&self, player: PlayerId, banner: BannerId) -> u32 {
        self.ledger.pity(player, banner)
    }

    /// Increments the count and returns the new value.
    pub fn advance(&self, player: PlayerId, banner: BannerId) -> u32 {
        let next = self.get(player, banner).saturating_add(1);
        self.ledger.set_pity(player, banner, next);
        next
    }

    /// Sets the count back to 0.
    pub fn reset(&self, player: PlayerId, banner: BannerId) {
        self.ledger.set_pity(player, banner, 0);
    }
}
