//! State-feed signal extraction
//!
//! The state feed delivers untyped JSON whose shape varies between
//! indexer versions: sometimes a flat entity array, sometimes a
//! paginated edge list. An ordered list of shape matchers locates the
//! entity collection; the first matcher that produces a candidate
//! wins. Every numeric field is coerced independently, so one bad
//! field never poisons the rest of a snapshot.

use serde_json::Value;
use tracing::debug;

use crate::types::Beast;

/// Option-typed snapshot of the adventurer entity
///
/// `None` means the field was absent or non-numeric in the payload;
/// it is never merged into the run state. `beast` carries the blocking
/// beast when the payload names one alongside the adventurer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitySignal {
    pub hp: Option<u32>,
    pub max_hp: Option<u32>,
    pub gold: Option<u32>,
    pub xp: Option<u32>,
    pub level: Option<u32>,
    pub strength: Option<u32>,
    pub vitality: Option<u32>,
    pub dexterity: Option<u32>,
    pub wisdom: Option<u32>,
    pub intelligence: Option<u32>,
    pub charisma: Option<u32>,
    pub luck: Option<u32>,
    pub beast: Option<Beast>,
}

impl EntitySignal {
    /// True when no field carried a usable value
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Extracts adventurer snapshots from raw feed payloads
///
/// Holds at most the latest snapshot; each payload overwrites the
/// previous one (last-write-wins — merging happens in the store).
#[derive(Debug, Default)]
pub struct SignalExtractor {
    latest: Option<EntitySignal>,
}

impl SignalExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one feed payload
    ///
    /// Never fails the caller: payloads that match no known shape are
    /// logged at debug and dropped, leaving the previous snapshot in
    /// place.
    pub fn update_from_feed(&mut self, payload: &Value) {
        let Some(entities) = locate_entities(payload) else {
            debug!("feed payload matched no known entity shape");
            return;
        };

        let Some(adventurer) = entities.iter().find(|e| looks_like_adventurer(e)) else {
            debug!(count = entities.len(), "no adventurer-like entity in feed payload");
            return;
        };

        let mut signal = read_signal(adventurer);
        signal.beast = entities
            .iter()
            .find(|e| looks_like_beast(e))
            .map(|e| read_beast(e));
        self.latest = Some(signal);
    }

    /// Latest snapshot, if any payload has produced one
    pub fn latest(&self) -> Option<&EntitySignal> {
        self.latest.as_ref()
    }

    /// Take the latest snapshot, leaving none behind
    pub fn take(&mut self) -> Option<EntitySignal> {
        self.latest.take()
    }
}

/// Ordered shape matchers for the entity collection
///
/// 1. Flat list: `data.entities` is an array.
/// 2. Paginated edge list: `data.entities.edges[].node`.
fn locate_entities(payload: &Value) -> Option<Vec<&Value>> {
    let entities = payload.get("data")?.get("entities")?;

    if let Some(list) = entities.as_array() {
        return Some(list.iter().collect());
    }

    if let Some(edges) = entities.get("edges").and_then(Value::as_array) {
        return Some(edges.iter().filter_map(|e| e.get("node")).collect());
    }

    None
}

/// Duck test for the player entity: a health-like field plus an
/// xp- or gold-like field
fn looks_like_adventurer(entity: &Value) -> bool {
    if !entity.is_object() {
        return false;
    }
    let has_health = entity.get("health").is_some() || entity.get("hp").is_some();
    let has_progress = entity.get("xp").is_some() || entity.get("gold").is_some();
    has_health && has_progress
}

/// Duck test for a blocking beast: named, with a power-like field,
/// and none of the adventurer progress fields
fn looks_like_beast(entity: &Value) -> bool {
    if !entity.is_object() || looks_like_adventurer(entity) {
        return false;
    }
    entity.get("name").and_then(Value::as_str).is_some() && entity.get("power").is_some()
}

fn read_beast(entity: &Value) -> Beast {
    Beast {
        name: entity
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        power: field(entity, &["power"]),
        hp: field(entity, &["health", "hp"]),
        kind: entity
            .get("kind")
            .or_else(|| entity.get("type"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn read_signal(entity: &Value) -> EntitySignal {
    EntitySignal {
        hp: field(entity, &["health", "hp"]),
        max_hp: field(entity, &["max_health", "maxHp", "max_health_points"]),
        gold: field(entity, &["gold"]),
        xp: field(entity, &["xp"]),
        level: field(entity, &["level"]),
        strength: field(entity, &["strength", "str"]),
        vitality: field(entity, &["vitality", "vit"]),
        dexterity: field(entity, &["dexterity", "dex"]),
        wisdom: field(entity, &["wisdom", "wis"]),
        intelligence: field(entity, &["intelligence", "int"]),
        charisma: field(entity, &["charisma", "cha"]),
        luck: field(entity, &["luck", "luc"]),
        beast: None,
    }
}

/// First alias that coerces to a non-negative integer
///
/// Indexers emit numbers both as JSON numbers and as decimal strings.
fn field(entity: &Value, aliases: &[&str]) -> Option<u32> {
    for key in aliases {
        if let Some(v) = entity.get(*key) {
            if let Some(n) = coerce_u32(v) {
                return Some(n);
            }
        }
    }
    None
}

fn coerce_u32(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}
