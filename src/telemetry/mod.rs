// Service counters and provider availability reporting

mod metrics;
mod reporter;

pub use metrics::{MetricsSnapshot, ServiceMetrics};
pub use reporter::{run_availability_reporter, AvailabilitySample};
