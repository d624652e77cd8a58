// Online observers as reported by the host

use crate::provider::Location;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An online observer and where it currently stands
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    pub id: Uuid,
    pub name: String,
    pub location: Location,
}

/// Source of the observers currently online
pub trait ObserverSource: Send + Sync {
    fn online_observers(&self) -> Vec<Observer>;
}

/// Observers pushed in by the host through the presence API
pub struct PresenceRegistry {
    observers: DashMap<Uuid, Observer>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            observers: DashMap::new(),
        }
    }

    /// Record a join or a move. Returns true when the observer is new.
    pub fn upsert(&self, observer: Observer) -> bool {
        self.observers.insert(observer.id, observer).is_none()
    }

    pub fn remove(&self, observer_id: &Uuid) -> Option<Observer> {
        self.observers.remove(observer_id).map(|(_, observer)| observer)
    }

    pub fn get(&self, observer_id: &Uuid) -> Option<Observer> {
        self.observers.get(observer_id).map(|o| o.clone())
    }

    /// Names of everyone online, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.observers.iter().map(|o| o.name.clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverSource for PresenceRegistry {
    fn online_observers(&self) -> Vec<Observer> {
        self.observers.iter().map(|o| o.value().clone()).collect()
    }
}
