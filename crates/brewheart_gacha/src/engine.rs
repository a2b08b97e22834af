//! # Pull Engine
//!
//! Converts spent currency into collectible items.
//!
//! ## The Pull Pipeline
//!
//! ```text
//! pull(player, banner, count) ->
//!   1. Resolve banner (must be active)
//!   2. Lock the player's gate
//!   3. Settle cost (tickets, premium fallback) - all or nothing
//!   4. For each pull, in order:
//!        advance pity -> guarantee override -> restricted pool view
//!        -> weighted roll -> pity reset -> duplicate check -> ledger credit
//!   5. Emit PullCompleted
//!   6. Return outcomes in pull order
//! ```
//!
//! ## Atomicity
//!
//! Every balance check happens before the first debit. A batch that cannot be
//! paid for returns `InsufficientFunds` with the ledger and pity counter
//! untouched. Once settlement succeeds the rolling loop cannot fail on funds.
//!
//! ## Thread Safety
//!
//! `PullEngine` is `Send + Sync`. Batches for the same player are serialized
//! by a per-player gate, since settlement and pity updates are sequences of
//! ledger calls.

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::banner::{Banner, BannerId, Guarantee, Timestamp};
use crate::catalog::{ItemId, Rarity};
use crate::config::Catalog;
use crate::error::{GachaError, GachaResult};
use crate::events::{EventSink, GachaEvent, NullSink};
use crate::ledger::{Currency, Ledger, MemoryLedger, PlayerId};
use crate::pity::PityTracker;
use crate::roll::EffectivePool;

/// Premium currency units per ticket when covering a shortfall.
pub const PREMIUM_PER_TICKET: u64 = 10;

/// Result of a single pull.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PullOutcome {
    /// The item pulled.
    pub item_id: ItemId,
    /// Its rarity.
    pub rarity: Rarity,
    /// True if the player owned the item before this pull.
    pub is_duplicate: bool,
    /// Tokens credited for a duplicate (0 for a new item).
    pub tokens_awarded: u64,
    /// Guarantee that shaped this pull, if any.
    pub guarantee: Option<Guarantee>,
    /// Pity counter after this pull.
    pub pity_after: u32,
}

/// What a batch actually cost.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Charge {
    /// Tickets taken from the player's own balance.
    pub tickets_spent: u64,
    /// Premium debited to cover a ticket shortfall.
    pub premium_spent: u64,
    /// Tickets bought with that premium.
    pub tickets_converted: u64,
}

impl Charge {
    /// Total ticket cost of the batch.
    #[inline]
    #[must_use]
    pub const fn total_tickets(&self) -> u64 {
        self.tickets_spent + self.tickets_converted
    }
}

/// Result of a pull batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullBatchResult {
    /// Outcomes in pull order.
    pub outcomes: Vec<PullOutcome>,
    /// Sum of duplicate token awards.
    pub tokens_gained: u64,
    /// Cost settled before rolling.
    pub charge: Charge,
}

impl PullBatchResult {
    /// Number of pulls that added a new item.
    #[must_use]
    pub fn new_items(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_duplicate).count()
    }

    /// Number of pulls converted into tokens.
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_duplicate).count()
    }
}

/// Aggregate results of a simulated pull run.
#[derive(Clone, Debug, Default)]
pub struct PullStatistics {
    /// Total pulls simulated.
    pub total_pulls: u64,
    /// Pull counts by item.
    pub item_counts: HashMap<ItemId, u64>,
    /// Pull counts by tier.
    pub rarity_counts: HashMap<Rarity, u64>,
    /// Pulls shaped by a soft guarantee.
    pub soft_guarantees: u64,
    /// Pulls shaped by a hard guarantee.
    pub hard_guarantees: u64,
    /// Pulls that were duplicates.
    pub duplicates: u64,
    /// Tokens gained from duplicates.
    pub tokens_gained: u64,
}

impl PullStatistics {
    fn record(&mut self, outcome: &PullOutcome) {
        self.total_pulls += 1;
        *self.item_counts.entry(outcome.item_id).or_insert(0) += 1;
        *self.rarity_counts.entry(outcome.rarity).or_insert(0) += 1;
        match outcome.guarantee {
            Some(Guarantee::Soft(_)) => self.soft_guarantees += 1,
            Some(Guarantee::Hard(_)) => self.hard_guarantees += 1,
            None => {}
        }
        if outcome.is_duplicate {
            self.duplicates += 1;
        }
        self.tokens_gained += outcome.tokens_awarded;
    }

    /// Observed share of a tier, in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rarity_rate(&self, tier: Rarity) -> f64 {
        if self.total_pulls == 0 {
            return 0.0;
        }
        let count = self.rarity_counts.get(&tier).copied().unwrap_or(0);
        count as f64 / self.total_pulls as f64
    }

    /// Observed share of an item, in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn item_rate(&self, item_id: ItemId) -> f64 {
        if self.total_pulls == 0 {
            return 0.0;
        }
        let count = self.item_counts.get(&item_id).copied().unwrap_or(0);
        count as f64 / self.total_pulls as f64
    }
}

/// Current unix time in seconds.
#[must_use]
pub fn unix_now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// The pull engine.
///
/// ## Usage
///
/// ```rust,ignore
/// let catalog = Catalog::from_file("data/catalog.toml")?;
/// let ledger = Arc::new(MemoryLedger::new());
/// let engine = PullEngine::new(catalog, Arc::clone(&ledger), EventBuffer::new());
///
/// match engine.pull(player, banner, 10) {
///     Ok(result) => ui.play_reveal(&result.outcomes),
///     Err(err) if err.is_insufficient_funds() => ui.prompt_conversion(),
///     Err(err) => return Err(err),
/// }
/// ```
pub struct PullEngine<L: Ledger, S: EventSink = NullSink> {
    /// Validated items and banners.
    catalog: Catalog,
    /// Balances, collections and pity counters.
    ledger: Arc<L>,
    /// Completion notifications.
    sink: S,
    /// Shared RNG; locked for one draw at a time.
    rng: Mutex<ChaCha8Rng>,
    /// Per-player pull gates.
    gates: Mutex<HashMap<PlayerId, Arc<Mutex<()>>>>,
}

impl<L: Ledger, S: EventSink> PullEngine<L, S> {
    /// Creates an engine with an entropy-seeded RNG.
    #[must_use]
    pub fn new(catalog: Catalog, ledger: Arc<L>, sink: S) -> Self {
        Self::with_rng(catalog, ledger, sink, ChaCha8Rng::from_entropy())
    }

    /// Creates an engine with a fixed seed (reproducible roll sequence).
    #[must_use]
    pub fn with_seed(catalog: Catalog, ledger: Arc<L>, sink: S, seed: u64) -> Self {
        Self::with_rng(catalog, ledger, sink, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(catalog: Catalog, ledger: Arc<L>, sink: S, rng: ChaCha8Rng) -> Self {
        Self {
            catalog,
            ledger,
            sink,
            rng: Mutex::new(rng),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// The loaded catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The ledger the engine writes to.
    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// The notification sink.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Banners open right now, in declaration order.
    #[must_use]
    pub fn active_banners(&self) -> Vec<&Banner> {
        self.catalog.banners.list_active(unix_now())
    }

    /// A player's pity counter on a banner.
    #[must_use]
    pub fn pity(&self, player: PlayerId, banner: BannerId) -> u32 {
        PityTracker::new(&*self.ledger).get(player, banner)
    }

    /// Performs `count` pulls on a banner at the current time.
    ///
    /// # Errors
    ///
    /// - `InvalidPullCount` if `count` is 0
    /// - `BannerNotFound` if the banner is unknown or not active
    /// - `InsufficientFunds` if neither tickets nor premium cover the cost
    pub fn pull(
        &self,
        player: PlayerId,
        banner_id: BannerId,
        count: u32,
    ) -> GachaResult<PullBatchResult> {
        self.pull_at(player, banner_id, count, unix_now())
    }

    /// Performs `count` pulls on a banner as of `now`.
    ///
    /// # Errors
    ///
    /// Same as [`PullEngine::pull`].
    pub fn pull_at(
        &self,
        player: PlayerId,
        banner_id: BannerId,
        count: u32,
        now: Timestamp,
    ) -> GachaResult<PullBatchResult> {
        if count == 0 {
            return Err(GachaError::InvalidPullCount);
        }
        let banner = self.catalog.banners.get_active(banner_id, now)?;

        let gate = self.gate(player);
        let result = {
            let _guard = gate.lock();
            self.run_batch(player, banner, count)
        };
        self.release_gate(player, &gate);
        result
    }

    fn run_batch(
        &self,
        player: PlayerId,
        banner: &Banner,
        count: u32,
    ) -> GachaResult<PullBatchResult> {
        let banner_id = banner.id();
        let charge = self.settle(player, banner, count)?;

        let mut outcomes = Vec::with_capacity(count as usize);
        let mut tokens_gained = 0u64;
        for _ in 0..count {
            // RNG lock covers the draw only, not the ledger calls.
            let outcome = pull_once(&*self.ledger, banner, player, |total| {
                self.rng.lock().gen_range(0..total)
            })?;
            tokens_gained += outcome.tokens_awarded;
            outcomes.push(outcome);
        }

        tracing::info!(
            player,
            banner = banner_id,
            count,
            tickets_spent = charge.tickets_spent,
            premium_spent = charge.premium_spent,
            tickets_converted = charge.tickets_converted,
            tokens_gained,
            "pull batch completed"
        );

        self.sink.emit(GachaEvent::PullCompleted {
            player_id: player,
            banner_id,
            pull_count: count,
            tickets_spent: charge.tickets_spent,
            premium_spent: charge.premium_spent,
            tickets_converted: charge.tickets_converted,
        });

        Ok(PullBatchResult {
            outcomes,
            tokens_gained,
            charge,
        })
    }

    /// Runs `pulls` pulls on a banner against a scratch ledger.
    ///
    /// Costs and the real ledger are ignored; no event is emitted. The banner
    /// window is not checked, so upcoming banners can be balanced ahead of
    /// time.
    ///
    /// # Errors
    ///
    /// Returns `BannerNotFound` if the banner id is unknown.
    pub fn simulate(
        &self,
        banner_id: BannerId,
        pulls: u32,
        seed: u64,
    ) -> GachaResult<PullStatistics> {
        const SIM_PLAYER: PlayerId = 0;

        let banner = self.catalog.banners.get(banner_id)?;
        let scratch = MemoryLedger::new();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut stats = PullStatistics::default();

        for _ in 0..pulls {
            let outcome = pull_once(&scratch, banner, SIM_PLAYER, |total| {
                rng.gen_range(0..total)
            })?;
            stats.record(&outcome);
        }

        Ok(stats)
    }

    fn gate(&self, player: PlayerId) -> Arc<Mutex<()>> {
        Arc::clone(self.gates.lock().entry(player).or_default())
    }

    /// Drops an idle gate so the map only holds players with a batch in
    /// flight. Call after the gate's guard is released.
    fn release_gate(&self, player: PlayerId, gate: &Arc<Mutex<()>>) {
        let mut gates = self.gates.lock();
        // Clones are only taken under the map lock: map + caller means idle.
        if Arc::strong_count(gate) == 2 {
            gates.remove(&player);
        }
    }

    /// Number of players with a gate in the map.
    #[cfg(test)]
    fn gate_count(&self) -> usize {
        self.gates.lock().len()
    }

    /// Settles the batch cost. Validates every balance before the first debit.
    fn settle(&self, player: PlayerId, banner: &Banner, count: u32) -> GachaResult<Charge> {
        let ledger = &*self.ledger;
        let total = banner
            .cost_per_pull()
            .checked_mul(u64::from(count))
            .ok_or(GachaError::ArithmeticOverflow)?;

        let tickets = ledger.balance(player, Currency::Tickets);
        if tickets >= total {
            ledger.debit(player, Currency::Tickets, total)?;
            return Ok(Charge {
                tickets_spent: total,
                premium_spent: 0,
                tickets_converted: 0,
            });
        }

        let shortfall = total - tickets;
        let premium = ledger.balance(player, Currency::Premium);
        let premium_needed = shortfall.checked_mul(PREMIUM_PER_TICKET);

        let Some(premium_needed) = premium_needed.filter(|&needed| premium >= needed) else {
            tracing::debug!(player, banner = banner.id(), total, tickets, premium, "insufficient funds");
            return Err(GachaError::InsufficientFunds {
                required_tickets: total,
                available_tickets: tickets,
                required_premium: premium_needed.unwrap_or(u64::MAX),
                available_premium: premium,
            });
        };

        ledger.debit(player, Currency::Premium, premium_needed)?;
        ledger.credit(player, Currency::Tickets, shortfall);
        ledger.debit(player, Currency::Tickets, total)?;

        tracing::debug!(player, shortfall, premium_needed, "premium converted to tickets");

        Ok(Charge {
            tickets_spent: tickets,
            premium_spent: premium_needed,
            tickets_converted: shortfall,
        })
    }
}

/// One iteration of the rolling loop. `draw` returns a value in `[0, total)`.
fn pull_once<L: Ledger + ?Sized, F: FnOnce(u64) -> u64>(
    ledger: &L,
    banner: &Banner,
    player: PlayerId,
    draw: F,
) -> GachaResult<PullOutcome> {
    let tracker = PityTracker::new(ledger);
    let pity = tracker.advance(player, banner.id());

    let guarantee = banner.pity().and_then(|rules| rules.guarantee_for(pity));
    let view = EffectivePool::new(banner.pool(), guarantee);
    let entry = view.roll_with(draw).ok_or_else(|| {
        GachaError::CatalogIntegrity(format!("banner {} has an empty pool", banner.id()))
    })?;

    if guarantee.is_some_and(Guarantee::is_hard) || entry.rarity == banner.top_tier() {
        tracker.reset(player, banner.id());
    }

    let is_duplicate = ledger.has_item(player, entry.item_id);
    let tokens_awarded = if is_duplicate {
        let tokens = entry.rarity.duplicate_tokens();
        ledger.credit(player, Currency::Tokens, tokens);
        tokens
    } else {
        ledger.add_item(player, entry.item_id);
        0
    };

    let pity_after = tracker.get(player, banner.id());

    tracing::debug!(
        player,
        banner = banner.id(),
        item = entry.item_id,
        rarity = entry.rarity.as_str(),
        is_duplicate,
        pity_after,
        "pull resolved"
    );

    Ok(PullOutcome {
        item_id: entry.item_id,
        rarity: entry.rarity,
        is_duplicate,
        tokens_awarded,
        guarantee,
        pity_after,
    })
}
