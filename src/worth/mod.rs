// Worth breakdown model and ranking

mod ranker;


pub use ranker::rank_breakdown;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Two-part item identifier as reported by the provider.
///
/// `global` is the item category (e.g. "WOOD"), `sub` an optional variant
/// (e.g. "OAK"). A key with an empty `sub` is a bare global key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub global: String,
    #[serde(default)]
    pub sub: String,
}

impl ItemKey {
    pub fn new(global: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            global: global.into(),
            sub: sub.into(),
        }
    }

    /// Key with no sub-category
    pub fn bare(global: impl Into<String>) -> Self {
        Self::new(global, "")
    }

    /// Parse the provider's textual form, `GLOBAL` or `GLOBAL:SUB`.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((global, sub)) => Self::new(global.trim(), sub.trim()),
            None => Self::bare(raw.trim()),
        }
    }

    pub fn has_sub(&self) -> bool {
        !self.sub.is_empty()
    }

    /// The bare global key this key belongs to, if this key has a sub part.
    pub fn global_key(&self) -> Option<ItemKey> {
        if self.has_sub() && !self.global.is_empty() {
            Some(Self::bare(self.global.clone()))
        } else {
            None
        }
    }

    /// Display label used in breakdown lines.
    pub fn label(&self) -> String {
        if self.sub.is_empty() {
            return self.global.clone();
        }
        if self.global.is_empty() {
            return self.sub.clone();
        }
        format!("{}:{}", self.global, self.sub).to_uppercase()
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// One contributing item in a breakdown.
///
/// Lines can only be built through [`ItemWorthLine::new`], which guarantees a
/// positive amount, a positive unit worth and `worth_total == worth_each * amount`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemWorthLine {
    key: String,
    amount: u64,
    worth_each: Decimal,
    worth_total: Decimal,
}

impl ItemWorthLine {
    /// Returns `None` for non-positive inputs or when the product overflows.
    pub fn new(key: impl Into<String>, amount: u64, worth_each: Decimal) -> Option<Self> {
        if amount == 0 || worth_each <= Decimal::ZERO {
            return None;
        }
        let worth_total = worth_each.checked_mul(Decimal::from(amount))?;
        if worth_total <= Decimal::ZERO {
            return None;
        }
        Some(Self {
            key: key.into(),
            amount,
            worth_each,
            worth_total,
        })
    }

    /// Same item with a different amount.
    pub fn with_amount(&self, amount: u64) -> Option<Self> {
        Self::new(self.key.clone(), amount, self.worth_each)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn worth_each(&self) -> Decimal {
        self.worth_each
    }

    pub fn worth_total(&self) -> Decimal {
        self.worth_total
    }
}

/// Worth figures reported by the provider for one island
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IslandWorthDetails {
    pub worth: Decimal,
    pub raw_worth: Option<Decimal>,
    pub bonus_worth: Option<Decimal>,
}

/// Computed breakdown for one island at a point in time.
///
/// Replaced wholesale by the cache on every refresh. The sum of
/// `top_lines[..].worth_total` never exceeds `total_worth`.
#[derive(Clone, Debug, Serialize)]
pub struct EntityWorthSnapshot {
    pub island_id: Uuid,
    pub owner_name: String,
    pub worth_rank: Option<u32>,
    pub total_worth: Option<Decimal>,
    pub top_lines: Vec<ItemWorthLine>,
    pub computed_at: DateTime<Utc>,
    /// Assigned by the cache when the snapshot is stored
    pub version: u64,
}

impl EntityWorthSnapshot {
    /// Sum of all line totals
    pub fn lines_total(&self) -> Decimal {
        self.top_lines.iter().map(ItemWorthLine::worth_total).sum()
    }
}

/// Render a decimal for humans: plain notation, no trailing zeros, at most two
/// fractional digits (rounded half-up).
pub fn format_decimal(value: Decimal) -> String {
    let normalized = value.normalize();
    if normalized.scale() > 2 {
        return value
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
            .to_string();
    }
    normalized.to_string()
}
