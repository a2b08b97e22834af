//! # Banner Catalog
//!
//! Named, time-windowed pull offers. Each banner references a weighted subset
//! of the item catalog plus its own pity rules and ticket cost.
//!
//! Banners are validated once at load time. A banner that references an
//! unknown item, costs nothing, or has a zero-weight pool never makes it into
//! the catalog: the process refuses to start instead.
//!
//! ## Pool Resolution
//!
//! ```text
//! BannerDefinition (TOML)         Banner (validated)
//! ┌────────────────────┐          ┌─────────────────────────────┐
//! │ item_id, weight    │ ───────> │ item_id, weight, rarity     │
//! │ pity (all Option)  │          │ PityRules { hard, soft? }   │
//! └────────────────────┘          │ total_weight, top_tier      │
//!                                 └─────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::catalog::{ItemCatalog, ItemId, Rarity};
use crate::error::{GachaError, GachaResult};

/// Unique identifier for a banner.
pub type BannerId = u32;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// A `(item, weight)` pair as authored in the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedEntry {
    /// The item in the pool.
    pub item_id: ItemId,
    /// Relative weight (higher = more common). Must be positive.
    pub weight: u32,
}

/// Pity thresholds as authored. Every field is optional in the file;
/// [`PityRules`] is the validated form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PityConfig {
    /// Pull count at which the hard guarantee fires.
    pub hard_pity_count: Option<u32>,
    /// Tier forced by the hard guarantee.
    pub hard_pity_tier: Option<Rarity>,
    /// Every Nth pull is restricted to the soft tier.
    pub soft_pity_interval: Option<u32>,
    /// Tier forced by the soft guarantee.
    pub soft_pity_tier: Option<Rarity>,
}

/// A banner as authored in the catalog file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerDefinition {
    /// Unique identifier.
    pub id: BannerId,
    /// Name shown on the banner carousel.
    pub display_name: String,
    /// First second the banner is open (inclusive).
    pub active_from: Timestamp,
    /// First second the banner is closed (exclusive).
    pub active_until: Timestamp,
    /// Weighted item pool.
    pub pool: Vec<WeightedEntry>,
    /// Optional pity thresholds.
    #[serde(default)]
    pub pity: Option<PityConfig>,
    /// Ticket cost of a single pull.
    pub cost_per_pull: u64,
}

/// The terminal, counter-resetting guarantee.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HardPity {
    /// Pull count at which the guarantee fires.
    pub count: u32,
    /// Tier the guarantee forces.
    pub tier: Rarity,
}

/// The periodic guarantee. Does not reset the counter by itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SoftPity {
    /// Every `interval`-th pull is restricted.
    pub interval: u32,
    /// Tier the guarantee forces.
    pub tier: Rarity,
}

/// Validated pity rules. A soft pity cannot exist without a hard pity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PityRules {
    /// Hard pity (always present).
    pub hard: HardPity,
    /// Optional soft pity.
    pub soft: Option<SoftPity>,
}

/// A guarantee override applied to a single pull.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guarantee {
    /// Periodic soft-pity restriction.
    Soft(Rarity),
    /// Terminal hard-pity restriction.
    Hard(Rarity),
}

impl Guarantee {
    /// The tier the pool is restricted to.
    #[inline]
    #[must_use]
    pub const fn tier(self) -> Rarity {
        match self {
            Self::Soft(tier) | Self::Hard(tier) => tier,
        }
    }

    /// Returns true for the hard guarantee.
    #[inline]
    #[must_use]
    pub const fn is_hard(self) -> bool {
        matches!(self, Self::Hard(_))
    }
}

impl PityRules {
    /// Determines the override for a pull, given the counter after advancing.
    ///
    /// Hard pity takes priority over soft pity.
    #[must_use]
    pub fn guarantee_for(&self, pity_count: u32) -> Option<Guarantee> {
        if pity_count >= self.hard.count {
            return Some(Guarantee::Hard(self.hard.tier));
        }
        match self.soft {
            Some(soft) if pity_count > 0 && pity_count % soft.interval == 0 => {
                Some(Guarantee::Soft(soft.tier))
            }
            _ => None,
        }
    }

    fn from_config(banner_id: BannerId, config: PityConfig) -> GachaResult<Self> {
        let integrity = |msg: &str| {
            GachaError::CatalogIntegrity(format!("banner {banner_id}: {msg}"))
        };

        let hard = match (config.hard_pity_count, config.hard_pity_tier) {
            (Some(0), _) => return Err(integrity("hard_pity_count must be positive")),
            (Some(count), Some(tier)) => HardPity { count, tier },
            (None, None) => {
                return Err(integrity("pity is configured without a hard pity"));
            }
            _ => return Err(integrity("hard pity needs both a count and a tier")),
        };

        let soft = match (config.soft_pity_interval, config.soft_pity_tier) {
            (None, None) => None,
            (Some(0), _) => return Err(integrity("soft_pity_interval must be positive")),
            (Some(interval), Some(tier)) => Some(SoftPity { interval, tier }),
            _ => return Err(integrity("soft pity needs both an interval and a tier")),
        };

        Ok(Self { hard, soft })
    }
}

/// A pool entry with its item's rarity resolved from the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolEntry {
    /// The item in the pool.
    pub item_id: ItemId,
    /// Relative weight.
    pub weight: u32,
    /// The item's rarity.
    pub rarity: Rarity,
}

/// Published probability of one item on a banner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemOdds {
    /// The item.
    pub item_id: ItemId,
    /// The item's rarity.
    pub rarity: Rarity,
    /// Chance of a single unguaranteed pull, in `[0, 1]`.
    pub probability: f64,
}

/// A validated banner.
#[derive(Clone, Debug)]
pub struct Banner {
    id: BannerId,
    display_name: String,
    active_from: Timestamp,
    active_until: Timestamp,
    pool: Vec<PoolEntry>,
    pity: Option<PityRules>,
    cost_per_pull: u64,
    total_weight: u64,
    top_tier: Rarity,
}

impl Banner {
    /// Validates a definition against the item catalog.
    ///
    /// # Errors
    ///
    /// Returns `GachaError::CatalogIntegrity` on an unknown item reference,
    /// zero weight, empty pool, zero cost, empty window or bad pity rules.
    pub fn from_definition(def: BannerDefinition, items: &ItemCatalog) -> GachaResult<Self> {
        let id = def.id;
        let integrity = |msg: String| GachaError::CatalogIntegrity(format!("banner {id}: {msg}"));

        if def.cost_per_pull == 0 {
            return Err(integrity("cost_per_pull must be positive".to_string()));
        }
        if def.active_from >= def.active_until {
            return Err(integrity(format!(
                "empty active window [{}, {})",
                def.active_from, def.active_until
            )));
        }
        if def.pool.is_empty() {
            return Err(integrity("pool is empty".to_string()));
        }

        let mut pool = Vec::with_capacity(def.pool.len());
        for entry in &def.pool {
            if entry.weight == 0 {
                return Err(integrity(format!("item {} has zero weight", entry.item_id)));
            }
            let item = items
                .get(entry.item_id)
                .map_err(|_| integrity(format!("unknown item {}", entry.item_id)))?;
            pool.push(PoolEntry {
                item_id: entry.item_id,
                weight: entry.weight,
                rarity: item.rarity,
            });
        }

        let total_weight: u64 = pool.iter().map(|e| u64::from(e.weight)).sum();

        let pity = def
            .pity
            .map(|config| PityRules::from_config(id, config))
            .transpose()?;

        let top_tier = match pity {
            Some(rules) => rules.hard.tier,
            None => pool
                .iter()
                .map(|e| e.rarity)
                .max()
                .unwrap_or(Rarity::Common),
        };

        Ok(Self {
            id,
            display_name: def.display_name,
            active_from: def.active_from,
            active_until: def.active_until,
            pool,
            pity,
            cost_per_pull: def.cost_per_pull,
            total_weight,
            top_tier,
        })
    }

    /// Banner identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> BannerId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns true if `active_from <= now < active_until`.
    #[inline]
    #[must_use]
    pub const fn is_active(&self, now: Timestamp) -> bool {
        self.active_from <= now && now < self.active_until
    }

    /// The resolved pool, in declaration order.
    #[must_use]
    pub fn pool(&self) -> &[PoolEntry] {
        &self.pool
    }

    /// Pity rules, if the banner has any.
    #[inline]
    #[must_use]
    pub const fn pity(&self) -> Option<&PityRules> {
        self.pity.as_ref()
    }

    /// Ticket cost of one pull.
    #[inline]
    #[must_use]
    pub const fn cost_per_pull(&self) -> u64 {
        self.cost_per_pull
    }

    /// Sum of all pool weights. Always positive.
    #[inline]
    #[must_use]
    pub const fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// The counter-resetting tier: the hard-pity tier when configured,
    /// otherwise the highest rarity in the pool.
    #[inline]
    #[must_use]
    pub const fn top_tier(&self) -> Rarity {
        self.top_tier
    }

    /// Per-item probabilities of an unguaranteed pull, in pool order.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn odds(&self) -> Vec<ItemOdds> {
        let total = self.total_weight as f64;
        self.pool
            .iter()
            .map(|entry| ItemOdds {
                item_id: entry.item_id,
                rarity: entry.rarity,
                probability: f64::from(entry.weight) / total,
            })
            .collect()
    }

    /// Aggregate probability per tier, lowest tier first. Tiers absent from
    /// the pool are omitted.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn tier_odds(&self) -> Vec<(Rarity, f64)> {
        let total = self.total_weight as f64;
        Rarity::ALL
            .iter()
            .filter_map(|&tier| {
                let weight: u64 = self
                    .pool
                    .iter()
                    .filter(|e| e.rarity == tier)
                    .map(|e| u64::from(e.weight))
                    .sum();
                (weight > 0).then(|| (tier, weight as f64 / total))
            })
            .collect()
    }
}

/// All banners, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct BannerCatalog {
    banners: Vec<Banner>,
    by_id: HashMap<BannerId, usize>,
}

impl BannerCatalog {
    /// Validates every definition and builds the catalog.
    ///
    /// # Errors
    ///
    /// Returns `GachaError::CatalogIntegrity` on the first invalid banner or
    /// on a duplicate banner id.
    pub fn new(definitions: Vec<BannerDefinition>, items: &ItemCatalog) -> GachaResult<Self> {
        let mut banners = Vec::with_capacity(definitions.len());
        let mut by_id = HashMap::with_capacity(definitions.len());

        for def in definitions {
            let banner = Banner::from_definition(def, items)?;
            if by_id.insert(banner.id, banners.len()).is_some() {
                return Err(GachaError::CatalogIntegrity(format!(
                    "duplicate banner id {}",
                    banner.id
                )));
            }
            banners.push(banner);
        }

        Ok(Self { banners, by_id })
    }

    /// Gets a banner regardless of its window.
    ///
    /// # Errors
    ///
    /// Returns `GachaError::BannerNotFound` if the id is unknown.
    pub fn get(&self, id: BannerId) -> GachaResult<&Banner> {
        self.by_id
            .get(&id)
            .map(|&index| &self.banners[index])
            .ok_or(GachaError::BannerNotFound(id))
    }

    /// Gets a banner only if it is open at `now`.
    ///
    /// # Errors
    ///
    /// Returns `GachaError::BannerNotFound` if the id is unknown or the banner
    /// is outside its window.
    pub fn get_active(&self, id: BannerId, now: Timestamp) -> GachaResult<&Banner> {
        let banner = self.get(id)?;
        if banner.is_active(now) {
            Ok(banner)
        } else {
            Err(GachaError::BannerNotFound(id))
        }
    }

    /// Banners open at `now`, in declaration order (not sorted by time).
    #[must_use]
    pub fn list_active(&self, now: Timestamp) -> Vec<&Banner> {
        self.banners.iter().filter(|b| b.is_active(now)).collect()
    }

    /// Number of banners.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.banners.len()
    }

    /// Returns true if there are no banners.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.banners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Item;

    fn items() -> ItemCatalog {
        let item = |id, rarity| Item {
            id,
            display_name: format!("Item {id}"),
            affinity_tag: "bitter".to_string(),
            rarity,
            base_power: 50,
        };
        ItemCatalog::new(vec![
            item(1, Rarity::Common),
            item(2, Rarity::Common),
            item(3, Rarity::Rare),
            item(4, Rarity::Legendary),
        ])
        .unwrap()
    }

    fn definition(id: BannerId) -> BannerDefinition {
        BannerDefinition {
            id,
            display_name: format!("Banner {id}"),
            active_from: 100,
            active_until: 200,
            pool: vec![
                WeightedEntry { item_id: 1, weight: 60 },
                WeightedEntry { item_id: 2, weight: 30 },
                WeightedEntry { item_id: 3, weight: 9 },
                WeightedEntry { item_id: 4, weight: 1 },
            ],
            pity: Some(PityConfig {
                hard_pity_count: Some(90),
                hard_pity_tier: Some(Rarity::Legendary),
                soft_pity_interval: Some(10),
                soft_pity_tier: Some(Rarity::Rare),
            }),
            cost_per_pull: 1,
        }
    }

    #[test]
    fn test_banner_resolves_pool() {
        let banner = Banner::from_definition(definition(1), &items()).unwrap();
        assert_eq!(banner.total_weight(), 100);
        assert_eq!(banner.top_tier(), Rarity::Legendary);
        assert_eq!(banner.pool()[2].rarity, Rarity::Rare);
    }

    #[test]
    fn test_unknown_item_rejected() {
        let mut def = definition(1);
        def.pool.push(WeightedEntry { item_id: 99, weight: 5 });
        let err = Banner::from_definition(def, &items()).unwrap_err();
        assert!(matches!(err, GachaError::CatalogIntegrity(msg) if msg.contains("unknown item 99")));
    }

    #[test]
    fn test_zero_cost_rejected() {
        let mut def = definition(1);
        def.cost_per_pull = 0;
        assert!(matches!(
            Banner::from_definition(def, &items()),
            Err(GachaError::CatalogIntegrity(_))
        ));
    }

    #[test]
    fn test_zero_weight_and_empty_pool_rejected() {
        let mut def = definition(1);
        def.pool[0].weight = 0;
        assert!(Banner::from_definition(def, &items()).is_err());

        let mut def = definition(1);
        def.pool.clear();
        assert!(Banner::from_definition(def, &items()).is_err());
    }

    #[test]
    fn test_soft_pity_without_hard_rejected() {
        let mut def = definition(1);
        def.pity = Some(PityConfig {
            soft_pity_interval: Some(10),
            soft_pity_tier: Some(Rarity::Rare),
            ..PityConfig::default()
        });
        assert!(matches!(
            Banner::from_definition(def, &items()),
            Err(GachaError::CatalogIntegrity(_))
        ));
    }

    #[test]
    fn test_top_tier_without_pity_is_highest_in_pool() {
        let mut def = definition(1);
        def.pity = None;
        def.pool.truncate(3);
        let banner = Banner::from_definition(def, &items()).unwrap();
        assert_eq!(banner.top_tier(), Rarity::Rare);
    }

    #[test]
    fn test_guarantee_priority() {
        let rules = PityRules {
            hard: HardPity { count: 20, tier: Rarity::Legendary },
            soft: Some(SoftPity { interval: 10, tier: Rarity::Rare }),
        };
        assert_eq!(rules.guarantee_for(0), None);
        assert_eq!(rules.guarantee_for(9), None);
        assert_eq!(rules.guarantee_for(10), Some(Guarantee::Soft(Rarity::Rare)));
        // Hard pity wins on a count that is also a soft multiple.
        assert_eq!(rules.guarantee_for(20), Some(Guarantee::Hard(Rarity::Legendary)));
        assert_eq!(rules.guarantee_for(25), Some(Guarantee::Hard(Rarity::Legendary)));
    }

    #[test]
    fn test_list_active_window_and_order() {
        let mut late = definition(7);
        late.active_from = 150;
        late.active_until = 300;
        let catalog = BannerCatalog::new(vec![late, definition(3)], &items()).unwrap();

        let ids = |now| -> Vec<BannerId> {
            catalog.list_active(now).iter().map(|b| b.id()).collect()
        };
        assert_eq!(ids(99), Vec::<BannerId>::new());
        assert_eq!(ids(100), vec![3]);
        assert_eq!(ids(160), vec![7, 3]);
        assert_eq!(ids(200), vec![7]);

        assert!(catalog.get_active(3, 250).is_err());
        assert!(catalog.get(3).is_ok());
    }

    #[test]
    fn test_duplicate_banner_rejected() {
        let result = BannerCatalog::new(vec![definition(1), definition(1)], &items());
        assert!(matches!(result, Err(GachaError::CatalogIntegrity(_))));
    }

    #[test]
    fn test_odds_sum_to_one() {
        let banner = Banner::from_definition(definition(1), &items()).unwrap();
        let total: f64 = banner.odds().iter().map(|o| o.probability).sum();
        assert!((total - 1.0).abs() < 1e-9);

        let tiers = banner.tier_odds();
        assert_eq!(tiers[0].0, Rarity::Common);
        assert!((tiers[0].1 - 0.9).abs() < 1e-9);
        assert!((tiers[2].1 - 0.01).abs() < 1e-9);
    }
}
