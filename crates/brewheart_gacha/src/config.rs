//! # Catalog Configuration
//!
//! Items and banners are authored in TOML and loaded once at process start.
//! Any integrity error is fatal: the engine is never built from a partially
//! valid catalog.
//!
//! ```toml
//! [[items]]
//! id = 1
//! display_name = "Mocha Kai"
//! affinity_tag = "sweet"
//! rarity = "common"
//! base_power = 120
//!
//! [[banners]]
//! id = 10
//! display_name = "Autumn Roast"
//! active_from = 0
//! active_until = 4102444800
//! cost_per_pull = 1
//! pool = [{ item_id = 1, weight = 90 }]
//!
//! [banners.pity]
//! hard_pity_count = 10
//! hard_pity_tier = "legendary"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::banner::{BannerCatalog, BannerDefinition};
use crate::catalog::{Item, ItemCatalog};
use crate::error::{GachaError, GachaResult};

/// Raw catalog file contents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GachaConfig {
    /// Item definitions.
    #[serde(default)]
    pub items: Vec<Item>,
    /// Banner definitions.
    #[serde(default)]
    pub banners: Vec<BannerDefinition>,
}

/// Validated item and banner catalogs.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    /// All items.
    pub items: ItemCatalog,
    /// All banners.
    pub banners: BannerCatalog,
}

impl GachaConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `GachaError::InvalidConfig` if the document does not parse.
    pub fn from_toml_str(source: &str) -> GachaResult<Self> {
        toml::from_str(source).map_err(|e| GachaError::InvalidConfig(e.to_string()))
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `GachaError::InvalidConfig` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> GachaResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| GachaError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Validates the definitions and builds both catalogs.
    ///
    /// # Errors
    ///
    /// Returns `GachaError::CatalogIntegrity` on the first inconsistency.
    pub fn into_catalog(self) -> GachaResult<Catalog> {
        let items = ItemCatalog::new(self.items)?;
        let banners = BannerCatalog::new(self.banners, &items)?;

        tracing::info!(
            items = items.len(),
            banners = banners.len(),
            "gacha catalog loaded"
        );

        Ok(Catalog { items, banners })
    }
}

impl Catalog {
    /// Parses and validates a TOML document in one step.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on parse failure, `CatalogIntegrity` on
    /// validation failure.
    pub fn from_toml_str(source: &str) -> GachaResult<Self> {
        GachaConfig::from_toml_str(source)?.into_catalog()
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on read/parse failure, `CatalogIntegrity` on
    /// validation failure.
    pub fn from_file(path: impl AsRef<Path>) -> GachaResult<Self> {
        GachaConfig::from_file(path)?.into_catalog()
    }
}
