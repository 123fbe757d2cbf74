//! The replicated data contract
//!
//! Every variant keeps a current value plus a pending delta describing the
//! local changes the proxy has not seen yet. The runtime treats all variants
//! the same way:
//!
//! ```text
//! per command turn:   delta = data.get_and_reset_delta()   // None => nothing to send
//! on inbound delta:   data.apply_delta(&delta, &codec)?
//! ```
//!
//! Instances are single-writer: the entity layer never runs two commands for
//! one entity at once, so there is no internal locking, and the `&mut self`
//! receiver on `get_and_reset_delta` makes read-and-clear a single step.

use crate::counter::ReplicatedCounter;
use crate::delta::{MapDelta, ReplicatedDelta, SetDelta};
use crate::error::{DataError, Result};
use crate::flag::ReplicatedFlag;
use crate::map::ReplicatedMap;
use crate::register::ReplicatedRegister;
use crate::set::ReplicatedSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_any::AnySupport;

/// Variant tag shared by data instances and deltas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Register,
    Counter,
    Flag,
    Set,
    Map,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataKind::Register => "ReplicatedRegister",
            DataKind::Counter => "ReplicatedCounter",
            DataKind::Flag => "ReplicatedFlag",
            DataKind::Set => "ReplicatedSet",
            DataKind::Map => "ReplicatedMap",
        };
        f.write_str(name)
    }
}

/// Delta lifecycle shared by all variants.
///
/// `Display` renders the current value for diagnostics; it is never parsed.
pub trait ReplicatedData: fmt::Display {
    fn kind(&self) -> DataKind;

    /// Whether there are local changes waiting to be flushed
    fn has_delta(&self) -> bool;

    /// Drop pending local changes without touching the current value
    fn reset_delta(&mut self);

    /// Take the pending delta, leaving none behind
    fn get_and_reset_delta(&mut self) -> Option<ReplicatedDelta>;

    /// Apply a delta delivered by the proxy.
    ///
    /// Fails with [`DataError::MalformedDelta`] when the delta belongs to
    /// another variant. On any error the instance is left unchanged.
    fn apply_delta(&mut self, delta: &ReplicatedDelta, codec: &AnySupport) -> Result<()>;
}

pub(crate) fn malformed(expected: DataKind, delta: &ReplicatedDelta) -> DataError {
    DataError::MalformedDelta {
        expected,
        found: delta.kind(),
    }
}

/// The closed set of replicated data variants.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyReplicatedData {
    Register(ReplicatedRegister),
    Counter(ReplicatedCounter),
    Flag(ReplicatedFlag),
    Set(ReplicatedSet),
    Map(ReplicatedMap),
}

impl AnyReplicatedData {
    /// Build an instance from the first delta the proxy sends for it.
    ///
    /// The result holds no pending delta.
    pub fn from_delta(delta: &ReplicatedDelta, codec: &AnySupport) -> Result<Self> {
        let data: Self = match delta {
            ReplicatedDelta::Register(register) => {
                ReplicatedRegister::from_remote(register, codec)?.into()
            }
            _ => {
                let mut data = Self::empty(delta.kind()).ok_or_else(|| malformed(delta.kind(), delta))?;
                data.apply_delta(delta, codec)?;
                data
            }
        };
        Ok(data)
    }

    /// The bottom value of a kind; registers have none.
    pub fn empty(kind: DataKind) -> Option<Self> {
        match kind {
            DataKind::Register => None,
            DataKind::Counter => Some(ReplicatedCounter::new().into()),
            DataKind::Flag => Some(ReplicatedFlag::new().into()),
            DataKind::Set => Some(ReplicatedSet::new().into()),
            DataKind::Map => Some(ReplicatedMap::new().into()),
        }
    }

    /// A delta that recreates the whole current state on a fresh replica.
    pub fn state_delta(&self) -> ReplicatedDelta {
        match self {
            AnyReplicatedData::Register(register) => ReplicatedDelta::Register(register.state_delta()),
            AnyReplicatedData::Counter(counter) => ReplicatedDelta::Counter(counter.state_delta()),
            AnyReplicatedData::Flag(flag) => ReplicatedDelta::Flag(flag.state_delta()),
            AnyReplicatedData::Set(set) => ReplicatedDelta::Set(SetDelta {
                added: set.keys().cloned().collect(),
                ..SetDelta::default()
            }),
            AnyReplicatedData::Map(map) => ReplicatedDelta::Map(MapDelta {
                added: map.state_entries(),
                ..MapDelta::default()
            }),
        }
    }

    /// Like [`state_delta`](Self::state_delta), but registers anywhere in
    /// the tree ship their pending write with its clock. Clears every
    /// pending delta.
    pub(crate) fn take_full_delta(&mut self) -> ReplicatedDelta {
        let delta = match self {
            AnyReplicatedData::Register(register) => register
                .get_and_reset_delta()
                .unwrap_or_else(|| ReplicatedDelta::Register(register.state_delta())),
            AnyReplicatedData::Map(map) => ReplicatedDelta::Map(MapDelta {
                added: map.take_state_entries(),
                ..MapDelta::default()
            }),
            ref other => other.state_delta(),
        };
        self.reset_delta();
        delta
    }

    pub fn as_register(&self) -> Option<&ReplicatedRegister> {
        match self {
            AnyReplicatedData::Register(register) => Some(register),
            _ => None,
        }
    }

    pub fn as_register_mut(&mut self) -> Option<&mut ReplicatedRegister> {
        match self {
            AnyReplicatedData::Register(register) => Some(register),
            _ => None,
        }
    }

    pub fn as_counter(&self) -> Option<&ReplicatedCounter> {
        match self {
            AnyReplicatedData::Counter(counter) => Some(counter),
            _ => None,
        }
    }

    pub fn as_counter_mut(&mut self) -> Option<&mut ReplicatedCounter> {
        match self {
            AnyReplicatedData::Counter(counter) => Some(counter),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<&ReplicatedFlag> {
        match self {
            AnyReplicatedData::Flag(flag) => Some(flag),
            _ => None,
        }
    }

    pub fn as_flag_mut(&mut self) -> Option<&mut ReplicatedFlag> {
        match self {
            AnyReplicatedData::Flag(flag) => Some(flag),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&ReplicatedSet> {
        match self {
            AnyReplicatedData::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_set_mut(&mut self) -> Option<&mut ReplicatedSet> {
        match self {
            AnyReplicatedData::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ReplicatedMap> {
        match self {
            AnyReplicatedData::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut ReplicatedMap> {
        match self {
            AnyReplicatedData::Map(map) => Some(map),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn ReplicatedData {
        match self {
            AnyReplicatedData::Register(data) => data,
            AnyReplicatedData::Counter(data) => data,
            AnyReplicatedData::Flag(data) => data,
            AnyReplicatedData::Set(data) => data,
            AnyReplicatedData::Map(data) => data,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ReplicatedData {
        match self {
            AnyReplicatedData::Register(data) => data,
            AnyReplicatedData::Counter(data) => data,
            AnyReplicatedData::Flag(data) => data,
            AnyReplicatedData::Set(data) => data,
            AnyReplicatedData::Map(data) => data,
        }
    }
}

impl ReplicatedData for AnyReplicatedData {
    fn kind(&self) -> DataKind {
        self.inner().kind()
    }

    fn has_delta(&self) -> bool {
        self.inner().has_delta()
    }

    fn reset_delta(&mut self) {
        self.inner_mut().reset_delta()
    }

    fn get_and_reset_delta(&mut self) -> Option<ReplicatedDelta> {
        self.inner_mut().get_and_reset_delta()
    }

    fn apply_delta(&mut self, delta: &ReplicatedDelta, codec: &AnySupport) -> Result<()> {
        self.inner_mut().apply_delta(delta, codec)
    }
}

impl fmt::Display for AnyReplicatedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.inner(), f)
    }
}

impl From<ReplicatedRegister> for AnyReplicatedData {
    fn from(data: ReplicatedRegister) -> Self {
        AnyReplicatedData::Register(data)
    }
}

impl From<ReplicatedCounter> for AnyReplicatedData {
    fn from(data: ReplicatedCounter) -> Self {
        AnyReplicatedData::Counter(data)
    }
}

impl From<ReplicatedFlag> for AnyReplicatedData {
    fn from(data: ReplicatedFlag) -> Self {
        AnyReplicatedData::Flag(data)
    }
}

impl From<ReplicatedSet> for AnyReplicatedData {
    fn from(data: ReplicatedSet) -> Self {
        AnyReplicatedData::Set(data)
    }
}

impl From<ReplicatedMap> for AnyReplicatedData {
    fn from(data: ReplicatedMap) -> Self {
        AnyReplicatedData::Map(data)
    }
}
