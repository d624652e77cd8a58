use crate::provider::WorthProvider;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Periodic provider availability signal
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilitySample {
    pub available: bool,
    pub timestamp: DateTime<Utc>,
}

/// Report provider availability every `interval_seconds`.
///
/// Runs until the task is aborted. Availability changes are logged at
/// `warn`/`info`; the latest sample replaces the previous one.
pub async fn run_availability_reporter(
    provider: Arc<dyn WorthProvider>,
    interval_seconds: u64,
    samples_tx: watch::Sender<Option<AvailabilitySample>>,
) {
    let mut ticker = interval(Duration::from_secs(interval_seconds.max(1)));

    // Skip missed ticks to prevent backlog under load
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last: Option<bool> = None;

    loop {
        ticker.tick().await;

        let available = provider.is_available();
        if last != Some(available) {
            if available {
                info!("Island provider available");
            } else {
                warn!("Island provider unavailable, breakdowns disabled");
            }
            last = Some(available);
        }

        samples_tx.send_replace(Some(AvailabilitySample {
            available,
            timestamp: Utc::now(),
        }));
    }
}
