use super::{IslandHandle, IslandKey, Location, ProviderStatus, WorthProvider};
use crate::config::ProviderConfig;
use crate::worth::{IslandWorthDetails, ItemKey};
use anyhow::{Context, Result};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// On-disk provider feed (JSON)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedDocument {
    pub schema_version: u32,

    /// Unit worth per item key, keyed by `GLOBAL` or `GLOBAL:SUB`
    #[serde(default)]
    pub block_values: HashMap<String, Decimal>,

    #[serde(default)]
    pub islands: Vec<IslandRecord>,
}

/// One island as published by the island-management system
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IslandRecord {
    pub id: Uuid,
    pub owner: String,
    #[serde(default)]
    pub members: Vec<String>,
    pub worth: Option<Decimal>,
    #[serde(default)]
    pub raw_worth: Option<Decimal>,
    #[serde(default)]
    pub bonus_worth: Option<Decimal>,
    #[serde(default)]
    pub region: Option<RegionRecord>,
    #[serde(default)]
    pub homes: Vec<HomeRecord>,
    /// Raw item counts, keyed by `GLOBAL` or `GLOBAL:SUB`
    #[serde(default)]
    pub block_counts: HashMap<String, u64>,
}

/// Horizontal bounds of an island on one world
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegionRecord {
    pub world: String,
    pub min_x: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_z: f64,
}

impl RegionRecord {
    fn contains(&self, location: &Location) -> bool {
        self.world == location.world
            && (self.min_x..=self.max_x).contains(&location.x)
            && (self.min_z..=self.max_z).contains(&location.z)
    }
}

/// Island home point for one world
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HomeRecord {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<&HomeRecord> for Location {
    fn from(home: &HomeRecord) -> Self {
        Location::new(home.world.clone(), home.x, home.y, home.z)
    }
}

/// Provider backed by a JSON feed published by the island-management system.
///
/// Availability is decided once in [`FeedProvider::detect`] and cached; an
/// unavailable provider answers every call with `None` or an empty map.
pub struct FeedProvider {
    status: ProviderStatus,
    islands: DashMap<Uuid, IslandRecord>,
    block_values: DashMap<ItemKey, Decimal>,
}

impl FeedProvider {
    /// Run the capability check against the configured feed.
    pub fn detect(config: &ProviderConfig) -> Self {
        let Some(path) = config.feed_path.as_deref() else {
            info!("No provider feed configured, island data unavailable");
            return Self::unavailable(ProviderStatus::Absent);
        };

        match load_document(path) {
            Ok(None) => {
                info!(path = %path.display(), "Provider feed not found, island data unavailable");
                Self::unavailable(ProviderStatus::Absent)
            }
            Ok(Some(doc)) if config.supports(doc.schema_version) => {
                let provider = Self::from_document(doc);
                info!(
                    path = %path.display(),
                    islands = provider.islands.len(),
                    block_values = provider.block_values.len(),
                    "Provider feed loaded"
                );
                provider
            }
            Ok(Some(doc)) => {
                warn!(
                    schema_version = doc.schema_version,
                    min = config.min_schema_version,
                    max = config.max_schema_version,
                    "Provider feed schema version unsupported"
                );
                Self::unavailable(ProviderStatus::Incompatible)
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Provider feed unreadable");
                Self::unavailable(ProviderStatus::Incompatible)
            }
        }
    }

    /// Available provider over an already parsed document
    pub fn from_document(doc: FeedDocument) -> Self {
        let provider = Self {
            status: ProviderStatus::Available,
            islands: DashMap::new(),
            block_values: DashMap::new(),
        };
        for (raw_key, value) in doc.block_values {
            provider.block_values.insert(ItemKey::parse(&raw_key), value);
        }
        for island in doc.islands {
            provider.islands.insert(island.id, island);
        }
        provider
    }

    pub fn unavailable(status: ProviderStatus) -> Self {
        Self {
            status,
            islands: DashMap::new(),
            block_values: DashMap::new(),
        }
    }

    pub fn status(&self) -> ProviderStatus {
        self.status
    }

    /// Island for a player name: owners before members, exact case before
    /// case-insensitive matches, then the lowest island id.
    fn resolve_member(&self, name: &str) -> Option<Uuid> {
        self.islands
            .iter()
            .filter_map(|island| {
                let rank = if island.owner == name {
                    0
                } else if island.owner.eq_ignore_ascii_case(name) {
                    1
                } else if island.members.iter().any(|m| m == name) {
                    2
                } else if island.members.iter().any(|m| m.eq_ignore_ascii_case(name)) {
                    3
                } else {
                    return None;
                };
                Some((rank, island.id))
            })
            .min()
            .map(|(_, id)| id)
    }

    /// Replace one island's record. Ignored when the provider is unavailable.
    pub fn upsert_island(&self, record: IslandRecord) -> bool {
        if !self.is_available() {
            return false;
        }
        self.islands.insert(record.id, record);
        true
    }

    /// Set the unit worth of one item key. Ignored when unavailable.
    pub fn set_block_value(&self, key: ItemKey, value: Decimal) -> bool {
        if !self.is_available() {
            return false;
        }
        self.block_values.insert(key, value);
        true
    }

    fn with_island<T>(&self, island: &IslandHandle, f: impl FnOnce(&IslandRecord) -> Option<T>) -> Option<T> {
        if !self.is_available() {
            return None;
        }
        self.islands.get(&island.id).and_then(|record| f(&record))
    }
}

impl WorthProvider for FeedProvider {
    fn is_available(&self) -> bool {
        self.status == ProviderStatus::Available
    }

    fn lookup_island(&self, key: &IslandKey) -> Option<IslandHandle> {
        if !self.is_available() {
            return None;
        }

        let id = match key {
            IslandKey::Id(id) => self.islands.contains_key(id).then_some(*id)?,
            IslandKey::Member(name) => self.resolve_member(name)?,
            IslandKey::At(location) => self
                .islands
                .iter()
                .find(|island| {
                    island
                        .region
                        .as_ref()
                        .is_some_and(|region| region.contains(location))
                })
                .map(|island| island.id)?,
        };

        Some(IslandHandle { id })
    }

    fn total_worth(&self, island: &IslandHandle) -> Option<Decimal> {
        self.with_island(island, |record| record.worth)
    }

    fn worth_details(&self, island: &IslandHandle) -> Option<IslandWorthDetails> {
        self.with_island(island, |record| {
            Some(IslandWorthDetails {
                worth: record.worth?,
                raw_worth: record.raw_worth,
                bonus_worth: record.bonus_worth,
            })
        })
    }

    fn raw_counts(&self, island: &IslandHandle) -> HashMap<ItemKey, u64> {
        self.with_island(island, |record| {
            Some(
                record
                    .block_counts
                    .iter()
                    .map(|(raw_key, count)| (ItemKey::parse(raw_key), *count))
                    .collect(),
            )
        })
        .unwrap_or_default()
    }

    fn unit_worth(&self, island: &IslandHandle, key: &ItemKey) -> Option<Decimal> {
        if !self.is_available() || !self.islands.contains_key(&island.id) {
            return None;
        }
        if let Some(value) = self.block_values.get(key) {
            return Some(*value);
        }
        let global = key.global_key()?;
        self.block_values.get(&global).map(|value| *value)
    }

    fn owner_name(&self, island: &IslandHandle) -> Option<String> {
        self.with_island(island, |record| {
            let owner = record.owner.trim();
            (!owner.is_empty()).then(|| owner.to_string())
        })
    }

    fn worth_rank(&self, island: &IslandHandle) -> Option<u32> {
        let worth = self.total_worth(island)?;

        let mut board: Vec<(Decimal, Uuid)> = self
            .islands
            .iter()
            .filter_map(|record| record.worth.map(|w| (w, record.id)))
            .collect();
        board.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let position = board.iter().position(|entry| *entry == (worth, island.id))?;
        u32::try_from(position + 1).ok()
    }

    fn home_anchor(&self, island: &IslandHandle, world: &str) -> Option<Location> {
        self.with_island(island, |record| {
            record
                .homes
                .iter()
                .find(|home| home.world == world)
                .map(Location::from)
        })
    }
}

fn load_document(path: &Path) -> Result<Option<FeedDocument>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read provider feed {}", path.display()))?;
    let doc = serde_json::from_str(&contents).context("Failed to parse provider feed")?;
    Ok(Some(doc))
}
