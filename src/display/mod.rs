// Per-observer display resources

mod board;
mod render;


pub use board::{Display, DisplayBoard};
pub use render::{render_hologram, LOADING_TEXT};

use crate::provider::Location;
use serde::Serialize;
use uuid::Uuid;

pub type DisplayId = u64;

/// Change to a display, delivered only to the owning observer
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayEvent {
    Spawned {
        display_id: DisplayId,
        observer_id: Uuid,
        location: Location,
        text: String,
    },
    TextChanged {
        display_id: DisplayId,
        observer_id: Uuid,
        text: String,
    },
    Moved {
        display_id: DisplayId,
        observer_id: Uuid,
        location: Location,
    },
    Removed {
        display_id: DisplayId,
        observer_id: Uuid,
    },
}

impl DisplayEvent {
    pub fn observer_id(&self) -> Uuid {
        match self {
            DisplayEvent::Spawned { observer_id, .. }
            | DisplayEvent::TextChanged { observer_id, .. }
            | DisplayEvent::Moved { observer_id, .. }
            | DisplayEvent::Removed { observer_id, .. } => *observer_id,
        }
    }
}

/// Host-side renderable text resource, visible only to its owner.
///
/// Operations on a display that is already gone return `false`; callers
/// treat that as a no-op.
pub trait DisplaySink: Send + Sync {
    fn spawn(&self, observer_id: Uuid, location: &Location, text: &str) -> Option<DisplayId>;

    fn set_text(&self, display_id: DisplayId, text: &str) -> bool;

    fn move_to(&self, display_id: DisplayId, location: &Location) -> bool;

    fn remove(&self, display_id: DisplayId) -> bool;

    fn is_alive(&self, display_id: DisplayId) -> bool;
}
