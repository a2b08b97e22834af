//! # Pull Notifications
//!
//! The engine emits exactly one event per successful batch, after every
//! ledger write has landed. Delivery and storage belong to the sink.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::banner::BannerId;
use crate::ledger::PlayerId;

/// Events produced by the pull engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GachaEvent {
    /// A pull batch settled and rolled.
    PullCompleted {
        /// The player who pulled.
        player_id: PlayerId,
        /// Banner pulled on.
        banner_id: BannerId,
        /// Number of pulls in the batch.
        pull_count: u32,
        /// Tickets taken from the player's own balance.
        tickets_spent: u64,
        /// Premium converted to cover a ticket shortfall.
        premium_spent: u64,
        /// Tickets bought with that premium. Ticket cost of the batch is
        /// `tickets_spent + tickets_converted`.
        tickets_converted: u64,
    },
}

impl GachaEvent {
    /// Telemetry event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PullCompleted { .. } => "pull_completed",
        }
    }
}

/// Receives engine events.
pub trait EventSink: Send + Sync {
    /// Delivers one event. Must not block on slow consumers.
    fn emit(&self, event: GachaEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: GachaEvent) {}
}

/// Buffers events until the host drains them (e.g. once per frame).
#[derive(Debug, Default)]
pub struct EventBuffer {
    events: Mutex<Vec<GachaEvent>>,
}

impl EventBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes all pending events.
    pub fn drain(&self) -> Vec<GachaEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.events.lock().len()
    }
}

impl EventSink for EventBuffer {
    fn emit(&self, event: GachaEvent) {
        self.events.lock().push(event);
    }
}

/// Forwards events over a crossbeam channel.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    sender: Sender<GachaEvent>,
}

impl ChannelSink {
    /// Creates a sink with an unbounded channel.
    #[must_use]
    pub fn unbounded() -> (Self, Receiver<GachaEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }

    /// Creates a sink with a bounded channel. Events are dropped when full.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, Receiver<GachaEvent>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: GachaEvent) {
        if let Err(err) = self.sender.try_send(event) {
            tracing::warn!(event = err.into_inner().name(), "gacha event dropped");
        }
    }
}
