//! # Weighted Rolls
//!
//! Cumulative-weight selection over a banner pool, optionally restricted to a
//! guaranteed tier.
//!
//! ## Algorithm
//!
//! ```text
//! r = uniform [0, total)
//! pool:  [ A:60 ][ B:30 ][ C:9 ][ D:1 ]
//! cum:       60     90     99    100
//! pick first entry with r < cum
//! ```
//!
//! Weights are integers, so `r < cum` always hits an entry. The fall-through
//! branch exists only for a roll that is out of range; it resolves to the
//! last entry and is logged as an error.

use rand::Rng;

use crate::banner::{Guarantee, PoolEntry};

/// A read-only view of the entries a pull may land on.
#[derive(Clone, Debug)]
pub struct EffectivePool<'a> {
    entries: Vec<&'a PoolEntry>,
    total_weight: u64,
    restricted: bool,
}

impl<'a> EffectivePool<'a> {
    /// Builds the view for one pull.
    ///
    /// With a guarantee, only entries of the guaranteed tier are kept. If no
    /// entry has that tier, the full pool is used.
    #[must_use]
    pub fn new(pool: &'a [PoolEntry], guarantee: Option<Guarantee>) -> Self {
        if let Some(guarantee) = guarantee {
            let tier = guarantee.tier();
            let entries: Vec<&PoolEntry> = pool.iter().filter(|e| e.rarity == tier).collect();
            if !entries.is_empty() {
                return Self::from_entries(entries, true);
            }
            tracing::warn!(
                tier = tier.as_str(),
                "guaranteed tier missing from pool, rolling on full pool"
            );
        }
        Self::from_entries(pool.iter().collect(), false)
    }

    fn from_entries(entries: Vec<&'a PoolEntry>, restricted: bool) -> Self {
        let total_weight = entries.iter().map(|e| u64::from(e.weight)).sum();
        Self {
            entries,
            total_weight,
            restricted,
        }
    }

    /// Entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[&'a PoolEntry] {
        &self.entries
    }

    /// Sum of the view's weights.
    #[inline]
    #[must_use]
    pub const fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Returns true if a guarantee narrowed the pool.
    #[inline]
    #[must_use]
    pub const fn is_restricted(&self) -> bool {
        self.restricted
    }

    /// Selects the entry a roll value lands on.
    ///
    /// Returns `None` only for an empty view.
    #[must_use]
    pub fn select(&self, roll: u64) -> Option<&'a PoolEntry> {
        let mut cumulative = 0u64;
        for &entry in &self.entries {
            cumulative += u64::from(entry.weight);
            if roll < cumulative {
                return Some(entry);
            }
        }

        let last = self.entries.last().copied();
        if let Some(entry) = last {
            tracing::error!(
                roll,
                total_weight = self.total_weight,
                item_id = entry.item_id,
                "weighted roll fell through the pool, resolving to last entry"
            );
        }
        last
    }

    /// Draws one uniform value and selects an entry.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&'a PoolEntry> {
        self.roll_with(|total| rng.gen_range(0..total))
    }

    /// Rolls with a caller-supplied draw. `draw` gets the view's total weight
    /// and must return a value in `[0, total)`; it is not called for an empty
    /// view.
    pub fn roll_with<F: FnOnce(u64) -> u64>(&self, draw: F) -> Option<&'a PoolEntry> {
        if self.total_weight == 0 {
            return None;
        }
        self.select(draw(self.total_weight))
    }
}
