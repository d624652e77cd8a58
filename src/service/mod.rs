// Refresh pipeline wiring provider, cache, tracker and displays


use crate::cache::{EntityCache, Refresh};
use crate::config::ServiceConfig;
use crate::display::{render_hologram, DisplaySink};
use crate::event::WorthEvent;
use crate::presence::ObserverSource;
use crate::provider::{IslandHandle, IslandKey, WorthProvider};
use crate::telemetry::{run_availability_reporter, AvailabilitySample, ServiceMetrics};
use crate::tracker::{Transition, ViewerTracker};
use crate::worth::{rank_breakdown, EntityWorthSnapshot, IslandWorthDetails, ItemWorthLine};
use rust_decimal::Decimal;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

/// Owner name shown when the provider has none
pub const UNKNOWN_OWNER: &str = "Unknown";

/// Long-lived breakdown service.
///
/// Two loops drive it: the viewer tick keeps observer attachments and
/// display anchors current, the refresh tick recomputes stale breakdowns for
/// observed islands and pushes rendered text. Both only touch shared state
/// through the cache and the tracker, so ticks may overlap safely.
pub struct WorthService {
    provider: Arc<dyn WorthProvider>,
    observers: Arc<dyn ObserverSource>,
    cache: EntityCache,
    tracker: ViewerTracker,
    metrics: ServiceMetrics,
    config: ServiceConfig,
    /// Latest provider availability sample
    availability: watch::Sender<Option<AvailabilitySample>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl WorthService {
    pub fn new(
        provider: Arc<dyn WorthProvider>,
        observers: Arc<dyn ObserverSource>,
        display: Arc<dyn DisplaySink>,
        config: ServiceConfig,
    ) -> Self {
        let (availability, _) = watch::channel(None);
        Self {
            provider,
            observers,
            cache: EntityCache::new(config.cache.refresh_interval()),
            tracker: ViewerTracker::new(display, &config.tracker),
            metrics: ServiceMetrics::new(),
            config,
            availability,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn WorthProvider> {
        &self.provider
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn tracker(&self) -> &ViewerTracker {
        &self.tracker
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Most recent availability sample, once the reporter has run
    pub fn latest_availability(&self) -> Option<AvailabilitySample> {
        self.availability.borrow().clone()
    }

    /// Spawn the viewer loop, the refresh loop and the availability reporter.
    pub async fn start(self: &Arc<Self>) {
        let viewer_every = Duration::from_millis(self.config.tracker.viewer_tick_millis.max(1));
        let refresh_every = Duration::from_millis(self.config.cache.refresh_tick_millis.max(1));

        let service = Arc::clone(self);
        let viewer_loop = tokio::spawn(async move {
            let mut ticker = interval(viewer_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                service.tick_viewers();
            }
        });

        let service = Arc::clone(self);
        let refresh_loop = tokio::spawn(async move {
            let mut ticker = interval(refresh_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                service.refresh_active_islands(Utc::now());
            }
        });

        let reporter = tokio::spawn(run_availability_reporter(
            Arc::clone(&self.provider),
            self.config.telemetry.report_interval_seconds,
            self.availability.clone(),
        ));

        self.tasks
            .lock()
            .await
            .extend([viewer_loop, refresh_loop, reporter]);

        info!(
            viewer_tick_ms = viewer_every.as_millis() as u64,
            refresh_tick_ms = refresh_every.as_millis() as u64,
            provider_available = self.provider.is_available(),
            "Worth service started"
        );
    }

    /// Stop every loop, release every display and drop all cached state.
    ///
    /// Returns once the loops have finished, so no display is touched after
    /// this resolves.
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        for handle in &handles {
            handle.abort();
        }
        // Cancelled is the expected outcome for each
        join_all(handles).await;

        let released = self.tracker.detach_all().len();
        self.cache.clear();
        info!(displays_released = released, "Worth service stopped");
    }

    /// Viewer tick: update attachments and mark newly viewed islands dirty.
    pub fn tick_viewers(&self) -> Vec<Transition> {
        let online = self.observers.online_observers();
        let transitions = self.tracker.tick(self.provider.as_ref(), &online);
        for transition in &transitions {
            if let Some(island_id) = transition.newly_viewed_island() {
                self.cache.mark_dirty(island_id);
            }
        }
        transitions
    }

    /// Refresh tick: one cache refresh per observed island, then push the
    /// rendered breakdown to observers that have not seen this version.
    ///
    /// Returns the number of observed islands.
    pub fn refresh_active_islands(&self, now: DateTime<Utc>) -> usize {
        if !self.provider.is_available() {
            return 0;
        }

        let by_island = self.tracker.observers_by_island();

        for (island_id, observer_ids) in &by_island {
            let result = self
                .cache
                .refresh_if_needed(*island_id, now, || self.build_snapshot(*island_id, now));

            match &result {
                Refresh::Refreshed(snapshot) => {
                    self.metrics.record_refresh();
                    debug!(island_id = %island_id, version = snapshot.version, "Breakdown refreshed");
                }
                Refresh::Stale(_) => {
                    self.metrics.record_stale_retained();
                    debug!(island_id = %island_id, "Refresh failed, serving previous breakdown");
                }
                Refresh::Missing => {
                    debug!(island_id = %island_id, "No breakdown available");
                }
                Refresh::Cached(_) => {}
            }

            let Some(snapshot) = result.snapshot() else {
                continue;
            };

            // Rendered at most once per island per tick
            let mut text: Option<String> = None;
            for observer_id in observer_ids {
                if self.tracker.has_rendered(observer_id, snapshot.version) {
                    continue;
                }
                let text = text.get_or_insert_with(|| render_hologram(snapshot));
                if self.tracker.push_render(observer_id, snapshot.version, text) {
                    self.metrics.record_render();
                }
            }
        }

        if let Some(grace) = self.config.cache.eviction_grace() {
            let observed: HashSet<Uuid> = by_island.keys().copied().collect();
            let evicted = self.cache.evict_unobserved(&observed, now, grace);
            if evicted > 0 {
                self.metrics.record_evictions(evicted);
                debug!(evicted = evicted, "Evicted unobserved breakdowns");
            }
        }

        by_island.len()
    }

    /// Compute a fresh snapshot for the hologram. `None` when the island no
    /// longer resolves.
    pub fn build_snapshot(&self, island_id: Uuid, now: DateTime<Utc>) -> Option<EntityWorthSnapshot> {
        self.metrics.record_provider_fetch();
        let island = self.provider.lookup_island(&IslandKey::Id(island_id))?;

        // Worth is read once; the lines are clamped to this same figure
        let total_worth = self.provider.total_worth(&island);
        let top_lines = self.top_lines(
            &island,
            total_worth,
            Some(self.config.breakdown.hologram_limit),
        );

        Some(EntityWorthSnapshot {
            island_id,
            owner_name: self
                .provider
                .owner_name(&island)
                .unwrap_or_else(|| UNKNOWN_OWNER.to_string()),
            worth_rank: self.provider.worth_rank(&island),
            total_worth,
            top_lines,
            computed_at: now,
            version: 0,
        })
    }

    /// Ranked breakdown for one island, clamped to `budget`.
    ///
    /// `budget` must be the worth figure reported alongside the lines.
    pub fn top_lines(
        &self,
        island: &IslandHandle,
        budget: Option<Decimal>,
        limit: Option<usize>,
    ) -> Vec<ItemWorthLine> {
        let Some(budget) = budget else {
            return Vec::new();
        };
        let counts = self.provider.raw_counts(island);
        rank_breakdown(
            &counts,
            |key| self.provider.unit_worth(island, key),
            budget,
            limit,
        )
    }

    /// On-demand lookup by owner or member name, bypassing the cache
    pub fn lookup_by_name(
        &self,
        name: &str,
        limit: usize,
    ) -> Option<(IslandWorthDetails, Vec<ItemWorthLine>)> {
        let island = self
            .provider
            .lookup_island(&IslandKey::Member(name.to_string()))?;
        let details = self.provider.worth_details(&island)?;
        let lines = self.top_lines(&island, Some(details.worth), Some(limit));
        Some((details, lines))
    }

    /// Force a refresh of the island on the next refresh tick
    pub fn mark_dirty(&self, island_id: Uuid) {
        self.cache.mark_dirty(island_id);
    }

    /// Force a refresh of every cached island, e.g. after unit worths change.
    ///
    /// Returns the number of islands marked.
    pub fn mark_all_dirty(&self) -> usize {
        self.cache.mark_all_dirty()
    }

    /// Mark the referenced island dirty if `payload` is a worth event.
    ///
    /// Returns the island that was marked; anything else is ignored.
    pub fn handle_event(&self, payload: &Value) -> Option<Uuid> {
        match WorthEvent::from_value(payload) {
            Ok(event) => {
                debug!(island_id = %event.island_id, event = %event.name, "Worth event received");
                self.mark_dirty(event.island_id);
                Some(event.island_id)
            }
            Err(e) => {
                debug!(reason = %e, "Event ignored");
                None
            }
        }
    }

    /// Explicit leave: detach now rather than on the next tick
    pub fn remove_observer(&self, observer_id: &Uuid) -> Option<Transition> {
        self.tracker.detach(observer_id)
    }
}
