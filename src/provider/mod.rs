// Provider adapter over the external island data source

mod feed;


pub use feed::{FeedDocument, FeedProvider, HomeRecord, IslandRecord, RegionRecord};

use crate::worth::{IslandWorthDetails, ItemKey};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A point in a named world
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Copy shifted by the given offsets
    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(self.world.clone(), self.x + dx, self.y + dy, self.z + dz)
    }

    /// Squared distance; infinite across worlds.
    pub fn distance_squared(&self, other: &Location) -> f64 {
        if self.world != other.world {
            return f64::INFINITY;
        }
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

/// Resolved island reference
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct IslandHandle {
    pub id: Uuid,
}

/// Ways to look an island up
#[derive(Clone, Debug)]
pub enum IslandKey {
    Id(Uuid),
    /// Owner or member name, case-insensitive
    Member(String),
    /// The island whose region contains the point
    At(Location),
}

/// Result of the one-time capability check
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Absent,
    Incompatible,
    Available,
}

/// Read-only access to island worth data.
///
/// Every accessor is failure tolerant: when the source is absent or
/// incompatible, or the island cannot be resolved, the result is `None` or
/// an empty collection. Callers never see an error.
pub trait WorthProvider: Send + Sync {
    fn is_available(&self) -> bool;

    fn lookup_island(&self, key: &IslandKey) -> Option<IslandHandle>;

    fn total_worth(&self, island: &IslandHandle) -> Option<Decimal>;

    fn worth_details(&self, island: &IslandHandle) -> Option<IslandWorthDetails>;

    fn raw_counts(&self, island: &IslandHandle) -> HashMap<ItemKey, u64>;

    fn unit_worth(&self, island: &IslandHandle, key: &ItemKey) -> Option<Decimal>;

    fn owner_name(&self, island: &IslandHandle) -> Option<String>;

    /// 1-based position on the worth leaderboard
    fn worth_rank(&self, island: &IslandHandle) -> Option<u32>;

    /// Island home on the given world
    fn home_anchor(&self, island: &IslandHandle, world: &str) -> Option<Location>;
}
