use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{menu::DailyMenu, reservation::Reservation};

/// Capacity of each store's change channel. Slow websocket clients that fall
/// further behind than this skip ahead.
const CHANNEL_CAPACITY: usize = 256;

/// A committed change to one of the stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StoreEvent {
    MenuPublished(DailyMenu),
    MenuDeleted { id: Uuid },
    ReservationAdded(Reservation),
    PaymentChanged { id: Uuid, is_paid: bool },
    ReservationDeleted { id: Uuid },
}

/// Fan-out of store changes. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// No subscribers is not an error.
    pub fn publish(&self, event: StoreEvent) {
        let _ = self.sender.send(event);
    }
}
