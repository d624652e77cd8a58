use super::{DisplayEvent, DisplayId, DisplaySink};
use crate::provider::Location;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Current state of one display
#[derive(Clone, Debug, PartialEq)]
pub struct Display {
    pub observer_id: Uuid,
    pub location: Location,
    pub text: String,
}

/// In-process display registry.
///
/// Holds every live display and broadcasts each change so a transport (the
/// websocket stream) can forward it to the owning observer.
pub struct DisplayBoard {
    displays: DashMap<DisplayId, Display>,
    next_id: AtomicU64,
    events_tx: broadcast::Sender<DisplayEvent>,
}

impl DisplayBoard {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(1000);
        Self {
            displays: DashMap::new(),
            next_id: AtomicU64::new(1),
            events_tx,
        }
    }

    /// Subscribe to display changes for all observers
    pub fn subscribe(&self) -> broadcast::Receiver<DisplayEvent> {
        self.events_tx.subscribe()
    }

    pub fn get(&self, display_id: DisplayId) -> Option<Display> {
        self.displays.get(&display_id).map(|d| d.clone())
    }

    /// Live displays owned by one observer
    pub fn displays_for(&self, observer_id: Uuid) -> Vec<(DisplayId, Display)> {
        self.displays
            .iter()
            .filter(|d| d.observer_id == observer_id)
            .map(|d| (*d.key(), d.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.displays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }

    fn publish(&self, event: DisplayEvent) {
        // No subscribers is fine
        let _ = self.events_tx.send(event);
    }
}

impl Default for DisplayBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for DisplayBoard {
    fn spawn(&self, observer_id: Uuid, location: &Location, text: &str) -> Option<DisplayId> {
        let display_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.displays.insert(
            display_id,
            Display {
                observer_id,
                location: location.clone(),
                text: text.to_string(),
            },
        );
        debug!(display_id = display_id, observer_id = %observer_id, "Display spawned");
        self.publish(DisplayEvent::Spawned {
            display_id,
            observer_id,
            location: location.clone(),
            text: text.to_string(),
        });
        Some(display_id)
    }

    fn set_text(&self, display_id: DisplayId, text: &str) -> bool {
        let observer_id = match self.displays.get_mut(&display_id) {
            Some(mut display) => {
                display.text = text.to_string();
                display.observer_id
            }
            None => return false,
        };
        self.publish(DisplayEvent::TextChanged {
            display_id,
            observer_id,
            text: text.to_string(),
        });
        true
    }

    fn move_to(&self, display_id: DisplayId, location: &Location) -> bool {
        let observer_id = match self.displays.get_mut(&display_id) {
            Some(mut display) => {
                display.location = location.clone();
                display.observer_id
            }
            None => return false,
        };
        self.publish(DisplayEvent::Moved {
            display_id,
            observer_id,
            location: location.clone(),
        });
        true
    }

    fn remove(&self, display_id: DisplayId) -> bool {
        match self.displays.remove(&display_id) {
            Some((_, removed)) => {
                debug!(display_id = display_id, observer_id = %removed.observer_id, "Display removed");
                self.publish(DisplayEvent::Removed {
                    display_id,
                    observer_id: removed.observer_id,
                });
                true
            }
            None => false,
        }
    }

    fn is_alive(&self, display_id: DisplayId) -> bool {
        self.displays.contains_key(&display_id)
    }
}
