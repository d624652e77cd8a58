use serde_json::Value;
use std::fmt;
use uuid::Uuid;


/// Event names that mean an island's worth was recalculated
const WORTH_EVENT_NAMES: [&str; 2] = ["IslandWorthCalculatedEvent", "IslandWorthCalculated"];

/// Fields that may carry the event name
const NAME_FIELDS: [&str; 3] = ["event", "type", "name"];

/// Fields of a nested island object that may carry its id
const ISLAND_ID_FIELDS: [&str; 4] = ["id", "uuid", "unique_id", "uniqueId"];

/// Inbound worth-recalculated notification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorthEvent {
    pub name: String,
    pub island_id: Uuid,
}

/// Why an inbound payload was not accepted as a worth event
#[derive(Debug, Clone, PartialEq)]
pub enum EventError {
    MissingName,
    NotAWorthEvent(String),
    MissingIsland,
    InvalidIsland(String),
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventError::MissingName => write!(f, "event name is required"),
            EventError::NotAWorthEvent(name) => {
                write!(f, "'{}' is not an island worth event", name)
            }
            EventError::MissingIsland => write!(f, "island reference is required"),
            EventError::InvalidIsland(raw) => {
                write!(f, "invalid island reference '{}': expected a UUID", raw)
            }
        }
    }
}

impl std::error::Error for EventError {}

impl WorthEvent {
    /// Recognise a worth event by shape rather than a fixed schema.
    ///
    /// The name is read from `event`, `type` or `name` and matched by suffix,
    /// so fully qualified names work. The island comes from `island` (a UUID
    /// string or an object with an id field) or `island_id`.
    pub fn from_value(payload: &Value) -> Result<Self, EventError> {
        let name = NAME_FIELDS
            .iter()
            .find_map(|field| payload.get(field).and_then(Value::as_str))
            .ok_or(EventError::MissingName)?;

        if !WORTH_EVENT_NAMES.iter().any(|n| name.ends_with(n)) {
            return Err(EventError::NotAWorthEvent(name.to_string()));
        }

        let raw = island_reference(payload).ok_or(EventError::MissingIsland)?;
        let island_id =
            Uuid::parse_str(raw.trim()).map_err(|_| EventError::InvalidIsland(raw.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            island_id,
        })
    }
}

fn island_reference(payload: &Value) -> Option<&str> {
    match payload.get("island") {
        Some(Value::String(raw)) => Some(raw.as_str()),
        Some(Value::Object(island)) => ISLAND_ID_FIELDS
            .iter()
            .find_map(|field| island.get(*field).and_then(Value::as_str)),
        _ => payload.get("island_id").and_then(Value::as_str),
    }
}
