//! # Brewheart Gacha
//!
//! The randomized-reward pull engine of the Brewheart cafe.
//!
//! ## Design Principles
//!
//! 1. **Integer economy** - weights, costs and token awards are integers
//! 2. **All-or-nothing settlement** - nothing is debited unless the whole batch is paid for
//! 3. **Ledger-owned state** - balances, collections and pity live in the [`Ledger`]
//! 4. **External configuration** - items and banners are loaded from TOML and
//!    validated before the engine exists
//!
//! ## Thread Safety
//!
//! [`PullEngine`] is `Send + Sync`. Batches for one player are serialized;
//! batches for different players run concurrently.
//!
//! ## Example
//!
//! ```rust,ignore
//! use brewheart_gacha::{Catalog, EventBuffer, MemoryLedger, PullEngine};
//!
//! let catalog = Catalog::from_file("data/gacha/catalog.toml")?;
//! let ledger = Arc::new(MemoryLedger::new());
//! let engine = PullEngine::new(catalog, Arc::clone(&ledger), EventBuffer::new());
//!
//! let result = engine.pull(player_id, banner_id, 10)?;
//! for outcome in &result.outcomes {
//!     reveal(outcome.item_id, outcome.rarity, outcome.is_duplicate);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod banner;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod pity;
pub mod roll;

pub use banner::{
    Banner, BannerCatalog, BannerDefinition, BannerId, Guarantee, HardPity, ItemOdds, PityConfig,
    PityRules, PoolEntry, SoftPity, Timestamp, WeightedEntry,
};
pub use catalog::{Item, ItemCatalog, ItemId, Rarity};
pub use config::{Catalog, GachaConfig};
pub use engine::{
    Charge, PullBatchResult, PullEngine, PullOutcome, PullStatistics, PREMIUM_PER_TICKET,
};
pub use error::{GachaError, GachaResult};
pub use events::{ChannelSink, EventBuffer, EventSink, GachaEvent, NullSink};
pub use ledger::{Currency, Ledger, MemoryLedger, Overdraft, PlayerAccount, PlayerId};
pub use pity::PityTracker;
pub use roll::EffectivePool;
