use anyhow::{Context, Result};
use chrono::Duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub breakdown: BreakdownConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Provider feed location and supported schema range
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub feed_path: Option<PathBuf>,
    #[serde(default = "default_schema_version")]
    pub min_schema_version: u32,
    #[serde(default = "default_schema_version")]
    pub max_schema_version: u32,
}

fn default_schema_version() -> u32 {
    1
}

impl ProviderConfig {
    pub fn supports(&self, schema_version: u32) -> bool {
        (self.min_schema_version..=self.max_schema_version).contains(&schema_version)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            feed_path: None,
            min_schema_version: default_schema_version(),
            max_schema_version: default_schema_version(),
        }
    }
}

/// Observer tracking
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// How often observer anchors are re-evaluated (milliseconds)
    #[serde(default = "default_viewer_tick")]
    pub viewer_tick_millis: u64,
    /// Display height above the island home
    #[serde(default = "default_anchor_height")]
    pub anchor_height: f64,
    /// Squared distance the anchor may drift before the display is moved
    #[serde(default = "default_anchor_tolerance")]
    pub anchor_tolerance_squared: f64,
}

fn default_viewer_tick() -> u64 {
    1000
}

fn default_anchor_height() -> f64 {
    3.0
}

fn default_anchor_tolerance() -> f64 {
    0.25
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            viewer_tick_millis: default_viewer_tick(),
            anchor_height: default_anchor_height(),
            anchor_tolerance_squared: default_anchor_tolerance(),
        }
    }
}

/// Breakdown cache refresh policy
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// How often observed islands are refreshed and re-rendered (milliseconds)
    #[serde(default = "default_refresh_tick")]
    pub refresh_tick_millis: u64,
    /// Age after which a cached breakdown is recomputed (seconds)
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: i64,
    /// Unobserved entries are dropped after this long (seconds, 0 keeps them)
    #[serde(default = "default_eviction_grace")]
    pub eviction_grace_seconds: i64,
}

fn default_refresh_tick() -> u64 {
    2000
}

fn default_refresh_interval() -> i64 {
    10
}

fn default_eviction_grace() -> i64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_tick_millis: default_refresh_tick(),
            refresh_interval_seconds: default_refresh_interval(),
            eviction_grace_seconds: default_eviction_grace(),
        }
    }
}

impl CacheConfig {
    /// Refresh interval; out-of-range values saturate instead of panicking.
    pub fn refresh_interval(&self) -> Duration {
        saturating_seconds(self.refresh_interval_seconds)
    }

    /// Eviction grace period, `None` when eviction is disabled
    pub fn eviction_grace(&self) -> Option<Duration> {
        (self.eviction_grace_seconds > 0).then(|| saturating_seconds(self.eviction_grace_seconds))
    }
}

fn saturating_seconds(seconds: i64) -> Duration {
    Duration::try_seconds(seconds).unwrap_or(if seconds > 0 {
        Duration::MAX
    } else {
        Duration::MIN
    })
}

/// Number of breakdown lines shown per surface
#[derive(Debug, Clone, Deserialize)]
pub struct BreakdownConfig {
    #[serde(default = "default_hologram_limit")]
    pub hologram_limit: usize,
    #[serde(default = "default_command_limit")]
    pub command_limit: usize,
}

fn default_hologram_limit() -> usize {
    5
}

fn default_command_limit() -> usize {
    10
}

impl Default for BreakdownConfig {
    fn default() -> Self {
        Self {
            hologram_limit: default_hologram_limit(),
            command_limit: default_command_limit(),
        }
    }
}

/// Provider availability reporting
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_report_interval")]
    pub report_interval_seconds: u64,
}

fn default_report_interval() -> u64 {
    1800
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            report_interval_seconds: default_report_interval(),
        }
    }
}

/// HTTP surface
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Command name shown in usage messages
    #[serde(default = "default_command_label")]
    pub command_label: String,
}

fn default_port() -> u16 {
    3000
}

fn default_command_label() -> String {
    "isvalue".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            command_label: default_command_label(),
        }
    }
}

impl ServiceConfig {
    /// Apply environment overrides, ignoring unparsable values.
    pub fn apply_env(mut self) -> Self {
        if let Ok(v) = std::env::var("ISLAND_VALUE_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.api.port = port;
            }
        }
        if let Ok(v) = std::env::var("ISLAND_VALUE_FEED_PATH") {
            if !v.is_empty() {
                self.provider.feed_path = Some(PathBuf::from(v));
            }
        }
        self
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<ServiceConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: ServiceConfig = toml::from_str(&contents).context("Failed to parse config")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert!(config.provider.feed_path.is_none());
        assert_eq!(config.tracker.viewer_tick_millis, 1000);
        assert_eq!(config.tracker.anchor_tolerance_squared, 0.25);
        assert_eq!(config.cache.refresh_tick_millis, 2000);
        assert_eq!(config.cache.refresh_interval_seconds, 10);
        assert_eq!(config.breakdown.hologram_limit, 5);
        assert_eq!(config.breakdown.command_limit, 10);
        assert_eq!(config.api.command_label, "isvalue");
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [provider]
            feed_path = "/var/lib/islands/feed.json"
            max_schema_version = 2

            [tracker]
            viewer_tick_millis = 500
            anchor_height = 4.5

            [cache]
            refresh_interval_seconds = 30
            eviction_grace_seconds = 0

            [breakdown]
            hologram_limit = 3

            [api]
            port = 8080
            command_label = "worth"
        "#;

        let config: ServiceConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.provider.feed_path,
            Some(PathBuf::from("/var/lib/islands/feed.json"))
        );
        assert!(config.provider.supports(2));
        assert!(!config.provider.supports(3));
        assert_eq!(config.tracker.viewer_tick_millis, 500);
        assert_eq!(config.tracker.anchor_height, 4.5);
        assert_eq!(config.cache.refresh_interval_seconds, 30);
        assert_eq!(config.cache.eviction_grace_seconds, 0);
        assert_eq!(config.breakdown.hologram_limit, 3);
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.command_label, "worth");
    }

    #[test]
    fn test_partial_config() {
        // Missing sections use defaults
        let toml = r#"
            [cache]
            refresh_tick_millis = 4000
        "#;

        let config: ServiceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.refresh_tick_millis, 4000);
        assert_eq!(config.cache.refresh_interval_seconds, 10); // Default
        assert_eq!(config.telemetry.report_interval_seconds, 1800); // Default
    }

    #[test]
    fn test_cache_durations() {
        let mut cache = CacheConfig::default();
        assert_eq!(cache.refresh_interval(), Duration::seconds(10));
        assert_eq!(cache.eviction_grace(), Some(Duration::seconds(60)));

        cache.eviction_grace_seconds = 0;
        assert_eq!(cache.eviction_grace(), None);
    }

    #[test]
    fn test_extreme_cache_durations_saturate() {
        let toml = r#"
            [cache]
            refresh_interval_seconds = 9223372036854775807
            eviction_grace_seconds = 9223372036854775807
        "#;

        let config: ServiceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.refresh_interval(), Duration::MAX);
        assert_eq!(config.cache.eviction_grace(), Some(Duration::MAX));

        let negative = CacheConfig {
            refresh_interval_seconds: i64::MIN,
            ..CacheConfig::default()
        };
        assert_eq!(negative.refresh_interval(), Duration::MIN);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("island-value.toml");
        std::fs::write(&path, "[api]\nport = 4000\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.api.port, 4000);
        assert!(load_config(&dir.path().join("missing.toml")).is_err());
    }
}
