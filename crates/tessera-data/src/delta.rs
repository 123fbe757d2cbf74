//! Delta shapes exchanged with the proxy
//!
//! A delta is a tagged union keyed by variant name. Serialized with serde's
//! default external tagging it reads exactly like the proxy's message:
//!
//! ```text
//! {"register": {"value": {...}, "clock": "CUSTOM", "customClockValue": 42}}
//! {"counter":  {"change": -3}}
//! {"set":      {"cleared": false, "removed": [...], "added": [...]}}
//! ```
//!
//! Values inside deltas are always [`Envelope`]s; decoding them needs the
//! codec and happens in `apply_delta`.

use crate::data::DataKind;
use serde::{Deserialize, Serialize};
use tessera_any::Envelope;

/// Clock used by the proxy to order concurrent register writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Clock {
    /// The proxy's system clock
    #[default]
    Default,
    /// The negated system clock, so the earliest write wins
    Reverse,
    /// The caller's `custom_clock_value`
    Custom,
    /// The caller's value, bumped past the current clock if it is not ahead
    CustomAutoIncrement,
}

impl Clock {
    /// Whether `custom_clock_value` means anything for this clock
    pub fn uses_custom_value(self) -> bool {
        matches!(self, Clock::Custom | Clock::CustomAutoIncrement)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDelta {
    pub value: Envelope,
    #[serde(default)]
    pub clock: Clock,
    #[serde(default)]
    pub custom_clock_value: i64,
}

impl RegisterDelta {
    pub fn new(value: Envelope, clock: Clock, custom_clock_value: i64) -> Self {
        Self {
            value,
            clock,
            custom_clock_value,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterDelta {
    pub change: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagDelta {
    pub value: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDelta {
    #[serde(default)]
    pub cleared: bool,
    #[serde(default)]
    pub removed: Vec<Envelope>,
    #[serde(default)]
    pub added: Vec<Envelope>,
}

impl SetDelta {
    pub fn is_empty(&self) -> bool {
        !self.cleared && self.removed.is_empty() && self.added.is_empty()
    }
}

/// One keyed entry of a map delta.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntryDelta {
    pub key: Envelope,
    pub delta: ReplicatedDelta,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDelta {
    #[serde(default)]
    pub cleared: bool,
    #[serde(default)]
    pub removed: Vec<Envelope>,
    #[serde(default)]
    pub updated: Vec<MapEntryDelta>,
    #[serde(default)]
    pub added: Vec<MapEntryDelta>,
}

impl MapDelta {
    pub fn is_empty(&self) -> bool {
        !self.cleared && self.removed.is_empty() && self.updated.is_empty() && self.added.is_empty()
    }
}

/// A delta for any replicated data variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicatedDelta {
    Register(RegisterDelta),
    Counter(CounterDelta),
    Flag(FlagDelta),
    Set(SetDelta),
    Map(MapDelta),
}

impl ReplicatedDelta {
    pub fn kind(&self) -> DataKind {
        match self {
            ReplicatedDelta::Register(_) => DataKind::Register,
            ReplicatedDelta::Counter(_) => DataKind::Counter,
            ReplicatedDelta::Flag(_) => DataKind::Flag,
            ReplicatedDelta::Set(_) => DataKind::Set,
            ReplicatedDelta::Map(_) => DataKind::Map,
        }
    }
}
