//! # Item Catalog
//!
//! Static table of pullable items. Built once at load time, read-only after.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{GachaError, GachaResult};

/// Unique identifier for an item.
pub type ItemId = u32;

/// Rarity tier of an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Rarity {
    /// Common items.
    Common = 0,
    /// Rare items.
    Rare = 1,
    /// Legendary items.
    Legendary = 2,
}

impl Rarity {
    /// All tiers, lowest first.
    pub const ALL: [Self; 3] = [Self::Common, Self::Rare, Self::Legendary];

    /// Tokens awarded when a pull of this tier is a duplicate.
    #[inline]
    #[must_use]
    pub const fn duplicate_tokens(self) -> u64 {
        match self {
            Self::Common => 1,
            Self::Rare => 5,
            Self::Legendary => 20,
        }
    }

    /// Lowercase name, matching the catalog format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Legendary => "legendary",
        }
    }
}

/// A pullable item definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier.
    pub id: ItemId,
    /// Name shown on the reveal card.
    pub display_name: String,
    /// Affinity the item boosts (e.g. "sweet", "bitter").
    pub affinity_tag: String,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Strength at base level.
    pub base_power: u32,
}

/// Read-only lookup table of items.
#[derive(Clone, Debug, Default)]
pub struct ItemCatalog {
    /// Items in declaration order.
    items: Vec<Item>,
    /// Index into `items` by id.
    by_id: HashMap<ItemId, usize>,
}

impl ItemCatalog {
    /// Builds a catalog from item definitions.
    ///
    /// # Errors
    ///
    /// Returns `GachaError::CatalogIntegrity` if two items share an id.
    pub fn new(items: Vec<Item>) -> GachaResult<Self> {
        let mut by_id = HashMap::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if by_id.insert(item.id, index).is_some() {
                return Err(GachaError::CatalogIntegrity(format!(
                    "duplicate item id {}",
                    item.id
                )));
            }
        }
        Ok(Self { items, by_id })
    }

    /// Gets an item by id.
    ///
    /// # Errors
    ///
    /// Returns `GachaError::ItemNotFound` if the id is unknown.
    pub fn get(&self, id: ItemId) -> GachaResult<&Item> {
        self.by_id
            .get(&id)
            .map(|&index| &self.items[index])
            .ok_or(GachaError::ItemNotFound(id))
    }

    /// Returns true if the id is in the catalog.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Lists items of one tier, in declaration order.
    #[must_use]
    pub fn list_by_rarity(&self, tier: Rarity) -> Vec<&Item> {
        self.items.iter().filter(|item| item.rarity == tier).collect()
    }

    /// Number of items.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the catalog has no items.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: ItemId, rarity: Rarity) -> Item {
        Item {
            id,
            display_name: format!("Item {id}"),
            affinity_tag: "sweet".to_string(),
            rarity,
            base_power: 100,
        }
    }

    #[test]
    fn test_get_item() {
        let catalog = ItemCatalog::new(vec![item(1, Rarity::Common), item(2, Rarity::Rare)]).unwrap();
        assert_eq!(catalog.get(2).unwrap().rarity, Rarity::Rare);
        assert_eq!(catalog.get(3), Err(GachaError::ItemNotFound(3)));
    }

    #[test]
    fn test_list_by_rarity_keeps_order() {
        let catalog = ItemCatalog::new(vec![
            item(5, Rarity::Common),
            item(1, Rarity::Rare),
            item(3, Rarity::Common),
        ])
        .unwrap();

        let ids: Vec<ItemId> = catalog
            .list_by_rarity(Rarity::Common)
            .iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![5, 3]);
        assert!(catalog.list_by_rarity(Rarity::Legendary).is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = ItemCatalog::new(vec![item(1, Rarity::Common), item(1, Rarity::Rare)]);
        assert!(matches!(result, Err(GachaError::CatalogIntegrity(_))));
    }

    #[test]
    fn test_rarity_order_and_tokens() {
        assert!(Rarity::Common < Rarity::Rare);
        assert!(Rarity::Rare < Rarity::Legendary);
        assert_eq!(Rarity::Common.duplicate_tokens(), 1);
        assert_eq!(Rarity::Rare.duplicate_tokens(), 5);
        assert_eq!(Rarity::Legendary.duplicate_tokens(), 20);
    }
}
