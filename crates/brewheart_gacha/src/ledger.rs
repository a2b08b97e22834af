//! # Player Ledger
//!
//! The engine does not own balances, collections or pity counters. It talks
//! to a [`Ledger`] through plain function calls and never caches what it reads.
//!
//! [`MemoryLedger`] is the in-process store used by hosts without their own
//! persistence and by the test suite.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::banner::BannerId;
use crate::catalog::ItemId;

/// Player identifier.
pub type PlayerId = u64;

/// Currencies the ledger tracks for the pull engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Currency {
    /// Primary pull currency.
    Tickets,
    /// Premium currency (diamonds), converted into tickets on shortfall.
    Premium,
    /// Tokens awarded for duplicate pulls.
    Tokens,
}

/// A debit larger than the balance.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("overdraft on {currency:?}: requested {requested}, available {available}")]
pub struct Overdraft {
    /// Currency that was debited.
    pub currency: Currency,
    /// Amount requested.
    pub requested: u64,
    /// Balance at the time of the debit.
    pub available: u64,
}

/// The store the pull engine reads from and writes to.
///
/// Implementations use interior mutability so one ledger can be shared by
/// the engine and the rest of the game.
pub trait Ledger: Send + Sync {
    /// Current balance of a currency (0 for unknown players).
    fn balance(&self, player: PlayerId, currency: Currency) -> u64;

    /// Removes `amount` from a balance.
    ///
    /// # Errors
    ///
    /// Returns [`Overdraft`] and leaves the balance untouched if it is too low.
    fn debit(&self, player: PlayerId, currency: Currency, amount: u64) -> Result<(), Overdraft>;

    /// Adds `amount` to a balance.
    fn credit(&self, player: PlayerId, currency: Currency, amount: u64);

    /// Returns true if the player owns the item.
    fn has_item(&self, player: PlayerId, item: ItemId) -> bool;

    /// Adds an item to the player's collection at its base level.
    fn add_item(&self, player: PlayerId, item: ItemId);

    /// Pity counter for a banner (0 if never pulled).
    fn pity(&self, player: PlayerId, banner: BannerId) -> u32;

    /// Overwrites the pity counter for a banner.
    fn set_pity(&self, player: PlayerId, banner: BannerId, value: u32);
}

/// Level an item enters the collection at.
pub const BASE_ITEM_LEVEL: u32 = 1;

/// An item in a player's collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnedItem {
    /// The item.
    pub item_id: ItemId,
    /// Current level.
    pub level: u32,
}

/// Everything the ledger knows about one player.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerAccount {
    /// Ticket balance.
    pub tickets: u64,
    /// Premium balance.
    pub premium: u64,
    /// Duplicate token balance.
    pub tokens: u64,
    /// Owned items by id.
    pub collection: BTreeMap<ItemId, OwnedItem>,
    /// Pity counters by banner.
    pub pity: HashMap<BannerId, u32>,
}

impl PlayerAccount {
    fn balance_mut(&mut self, currency: Currency) -> &mut u64 {
        match currency {
            Currency::Tickets => &mut self.tickets,
            Currency::Premium => &mut self.premium,
            Currency::Tokens => &mut self.tokens,
        }
    }

    /// Balance of a currency.
    #[must_use]
    pub const fn balance(&self, currency: Currency) -> u64 {
        match currency {
            Currency::Tickets => self.tickets,
            Currency::Premium => self.premium,
            Currency::Tokens => self.tokens,
        }
    }
}

/// In-memory ledger.
///
/// ## Thread Safety
///
/// All state sits behind one `parking_lot::RwLock`. Individual calls are
/// atomic; sequences of calls are not, which is why the engine serializes
/// pulls per player.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: RwLock<HashMap<PlayerId, PlayerAccount>>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a player's account.
    #[must_use]
    pub fn account(&self, player: PlayerId) -> Option<PlayerAccount> {
        self.accounts.read().get(&player).cloned()
    }

    /// Level of an owned item.
    #[must_use]
    pub fn item_level(&self, player: PlayerId, item: ItemId) -> Option<u32> {
        self.accounts
            .read()
            .get(&player)
            .and_then(|account| account.collection.get(&item))
            .map(|owned| owned.level)
    }

    /// Number of distinct items a player owns.
    #[must_use]
    pub fn collection_size(&self, player: PlayerId) -> usize {
        self.accounts
            .read()
            .get(&player)
            .map_or(0, |account| account.collection.len())
    }
}

impl Ledger for MemoryLedger {
    fn balance(&self, player: PlayerId, currency: Currency) -> u64 {
        self.accounts
            .read()
            .get(&player)
            .map_or(0, |account| account.balance(currency))
    }

    fn debit(&self, player: PlayerId, currency: Currency, amount: u64) -> Result<(), Overdraft> {
        let mut accounts = self.accounts.write();
        let account = accounts.entry(player).or_default();
        let balance = account.balance_mut(currency);

        if *balance < amount {
            return Err(Overdraft {
                currency,
                requested: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        Ok(())
    }

    fn credit(&self, player: PlayerId, currency: Currency, amount: u64) {
        let mut accounts = self.accounts.write();
        let balance = accounts.entry(player).or_default().balance_mut(currency);
        *balance = balance.saturating_add(amount);
    }

    fn has_item(&self, player: PlayerId, item: ItemId) -> bool {
        self.accounts
            .read()
            .get(&player)
            .is_some_and(|account| account.collection.contains_key(&item))
    }

    fn add_item(&self, player: PlayerId, item: ItemId) {
        self.accounts
            .write()
            .entry(player)
            .or_default()
            .collection
            .entry(item)
            .or_insert(OwnedItem {
                item_id: item,
                level: BASE_ITEM_LEVEL,
            });
    }

    fn pity(&self, player: PlayerId, banner: BannerId) -> u32 {
        self.accounts
            .read()
            .get(&player)
            .and_then(|account| account.pity.get(&banner).copied())
            .unwrap_or(0)
    }

    fn set_pity(&self, player: PlayerId, banner: BannerId, value: u32) {
        self.accounts
            .write()
            .entry(player)
            .or_default()
            .pity
            .insert(banner, value);
    }
}
