// Observer -> island attachment tracking


use crate::config::TrackerConfig;
use crate::display::{DisplayId, DisplaySink, LOADING_TEXT};
use crate::presence::Observer;
use crate::provider::{IslandKey, Location, WorthProvider};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// One attached observer
#[derive(Clone, Debug, PartialEq)]
pub struct ObserverState {
    pub observer_id: Uuid,
    pub island_id: Uuid,
    /// Where the display currently sits
    pub anchor: Location,
    pub display_id: DisplayId,
    /// Version of the last snapshot pushed to the display
    pub last_rendered_version: Option<u64>,
}

/// What a tick did to one observer
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    Attached { observer_id: Uuid, island_id: Uuid },
    Switched { observer_id: Uuid, from: Uuid, to: Uuid },
    Moved { observer_id: Uuid, island_id: Uuid },
    Detached { observer_id: Uuid, island_id: Uuid },
}

impl Transition {
    /// Island that now needs a fresh breakdown, if any
    pub fn newly_viewed_island(&self) -> Option<Uuid> {
        match self {
            Transition::Attached { island_id, .. } => Some(*island_id),
            Transition::Switched { to, .. } => Some(*to),
            Transition::Moved { .. } | Transition::Detached { .. } => None,
        }
    }
}

/// Tracks which island each observer is looking at and owns their displays.
///
/// Per observer: `Unattached -> Attached(island) -> Unattached`. Display
/// resources are created on attach, moved when the anchor drifts, and
/// released on detach.
pub struct ViewerTracker {
    states: DashMap<Uuid, ObserverState>,
    display: Arc<dyn DisplaySink>,
    anchor_height: f64,
    anchor_tolerance_squared: f64,
}

impl ViewerTracker {
    pub fn new(display: Arc<dyn DisplaySink>, config: &TrackerConfig) -> Self {
        Self {
            states: DashMap::new(),
            display,
            anchor_height: config.anchor_height,
            anchor_tolerance_squared: config.anchor_tolerance_squared,
        }
    }

    /// Evaluate every online observer once.
    ///
    /// Observers missing from `online` are detached, and so is everyone when
    /// the provider is unavailable.
    pub fn tick(&self, provider: &dyn WorthProvider, online: &[Observer]) -> Vec<Transition> {
        if !provider.is_available() {
            return self.detach_all();
        }

        let online_ids: HashSet<Uuid> = online.iter().map(|o| o.id).collect();
        let gone: Vec<Uuid> = self
            .states
            .iter()
            .filter(|s| !online_ids.contains(s.key()))
            .map(|s| *s.key())
            .collect();

        let mut transitions: Vec<Transition> = gone
            .into_iter()
            .filter_map(|observer_id| self.detach(&observer_id))
            .collect();

        transitions.extend(
            online
                .iter()
                .filter_map(|observer| self.update_observer(provider, observer)),
        );
        transitions
    }

    /// Re-evaluate one observer's anchor
    pub fn update_observer(
        &self,
        provider: &dyn WorthProvider,
        observer: &Observer,
    ) -> Option<Transition> {
        let Some((island_id, anchor)) = self.resolve_anchor(provider, observer) else {
            return self.detach(&observer.id);
        };

        let existing = self.states.get(&observer.id).map(|s| s.clone());
        let Some(state) = existing.filter(|s| self.display.is_alive(s.display_id)) else {
            self.attach(observer.id, island_id, anchor)?;
            return Some(Transition::Attached {
                observer_id: observer.id,
                island_id,
            });
        };

        if state.island_id != island_id {
            self.display.remove(state.display_id);
            self.attach(observer.id, island_id, anchor)?;
            info!(
                observer_id = %observer.id,
                from = %state.island_id,
                to = %island_id,
                "Observer switched island"
            );
            return Some(Transition::Switched {
                observer_id: observer.id,
                from: state.island_id,
                to: island_id,
            });
        }

        if state.anchor.distance_squared(&anchor) > self.anchor_tolerance_squared {
            self.display.move_to(state.display_id, &anchor);
            if let Some(mut current) = self.states.get_mut(&observer.id) {
                current.anchor = anchor;
            }
            return Some(Transition::Moved {
                observer_id: observer.id,
                island_id,
            });
        }

        None
    }

    /// Island under the observer and the display point above its home.
    fn resolve_anchor(
        &self,
        provider: &dyn WorthProvider,
        observer: &Observer,
    ) -> Option<(Uuid, Location)> {
        let island = provider.lookup_island(&IslandKey::At(observer.location.clone()))?;
        let home = provider.home_anchor(&island, &observer.location.world)?;
        Some((island.id, home.offset(0.0, self.anchor_height, 0.0)))
    }

    fn attach(&self, observer_id: Uuid, island_id: Uuid, anchor: Location) -> Option<()> {
        let Some(display_id) = self.display.spawn(observer_id, &anchor, LOADING_TEXT) else {
            self.states.remove(&observer_id);
            return None;
        };
        self.states.insert(
            observer_id,
            ObserverState {
                observer_id,
                island_id,
                anchor,
                display_id,
                last_rendered_version: None,
            },
        );
        debug!(observer_id = %observer_id, island_id = %island_id, "Observer attached");
        Some(())
    }

    /// Detach an observer and release its display
    pub fn detach(&self, observer_id: &Uuid) -> Option<Transition> {
        let (_, state) = self.states.remove(observer_id)?;
        // Already gone is fine
        self.display.remove(state.display_id);
        debug!(observer_id = %observer_id, island_id = %state.island_id, "Observer detached");
        Some(Transition::Detached {
            observer_id: state.observer_id,
            island_id: state.island_id,
        })
    }

    pub fn detach_all(&self) -> Vec<Transition> {
        let ids: Vec<Uuid> = self.states.iter().map(|s| *s.key()).collect();
        ids.iter().filter_map(|id| self.detach(id)).collect()
    }

    /// Attached observers with a live display, grouped by island
    pub fn observers_by_island(&self) -> HashMap<Uuid, Vec<Uuid>> {
        let mut grouped: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for state in self.states.iter() {
            if !self.display.is_alive(state.display_id) {
                continue;
            }
            grouped
                .entry(state.island_id)
                .or_default()
                .push(state.observer_id);
        }
        grouped
    }

    /// Whether the observer's display already shows `version`
    pub fn has_rendered(&self, observer_id: &Uuid, version: u64) -> bool {
        self.states
            .get(observer_id)
            .is_some_and(|s| s.last_rendered_version == Some(version))
    }

    /// Push `text` to the observer's display unless `version` is already shown.
    ///
    /// Returns true when the display was updated.
    pub fn push_render(&self, observer_id: &Uuid, version: u64, text: &str) -> bool {
        let Some(mut state) = self.states.get_mut(observer_id) else {
            return false;
        };
        if state.last_rendered_version == Some(version) {
            return false;
        }
        if !self.display.set_text(state.display_id, text) {
            return false;
        }
        state.last_rendered_version = Some(version);
        true
    }

    pub fn state(&self, observer_id: &Uuid) -> Option<ObserverState> {
        self.states.get(observer_id).map(|s| s.clone())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
