//! Replicated Set (observed-remove semantics, resolved by the proxy)
//!
//! Elements are keyed by their encoded envelope, so two values are the same
//! element exactly when they encode to the same bytes. The pending delta
//! mirrors the proxy's message: a `cleared` marker followed by removals and
//! additions.
//!
//! Local bookkeeping keeps the delta minimal:
//! - adding an element removed earlier in the same turn cancels the removal
//! - removing an element added earlier in the same turn cancels the addition
//! - removing the last element is sent as a clear

use crate::data::{malformed, DataKind, ReplicatedData};
use crate::delta::{ReplicatedDelta, SetDelta};
use crate::error::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tessera_any::{encode, AnySupport, EncodeOptions, Envelope, Value};

const ELEMENT_OPTIONS: EncodeOptions = EncodeOptions::GENERAL;

#[derive(Clone, Debug, Default, PartialEq)]
struct PendingSetDelta {
    cleared: bool,
    added: BTreeSet<Envelope>,
    removed: BTreeSet<Envelope>,
}

impl PendingSetDelta {
    fn is_empty(&self) -> bool {
        !self.cleared && self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplicatedSet {
    elements: BTreeMap<Envelope, Value>,
    delta: PendingSetDelta,
}

impl ReplicatedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element. Adding a present element is a no-op.
    pub fn add(&mut self, element: impl Into<Value>) -> Result<&mut Self> {
        let element = element.into();
        let key = encode(&element, ELEMENT_OPTIONS)?;

        if !self.elements.contains_key(&key) {
            if !self.delta.removed.remove(&key) {
                self.delta.added.insert(key.clone());
            }
            self.elements.insert(key, element);
        }
        Ok(self)
    }

    /// Remove an element. Removing an absent element is a no-op.
    pub fn remove(&mut self, element: impl Into<Value>) -> Result<&mut Self> {
        let key = encode(&element.into(), ELEMENT_OPTIONS)?;

        if self.elements.contains_key(&key) {
            if self.elements.len() == 1 {
                self.clear();
            } else {
                self.elements.remove(&key);
                if !self.delta.added.remove(&key) {
                    self.delta.removed.insert(key);
                }
            }
        }
        Ok(self)
    }

    /// Remove every element
    pub fn clear(&mut self) -> &mut Self {
        if !self.elements.is_empty() {
            self.elements.clear();
            self.delta = PendingSetDelta {
                cleared: true,
                ..PendingSetDelta::default()
            };
        }
        self
    }

    /// Membership test; values the codec cannot represent are never members
    pub fn contains(&self, element: &Value) -> bool {
        encode(element, ELEMENT_OPTIONS)
            .map(|key| self.elements.contains_key(&key))
            .unwrap_or(false)
    }

    /// Elements in encoded-key order
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.elements.values()
    }

    pub fn value(&self) -> Vec<&Value> {
        self.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &Envelope> {
        self.elements.keys()
    }
}

impl ReplicatedData for ReplicatedSet {
    fn kind(&self) -> DataKind {
        DataKind::Set
    }

    fn has_delta(&self) -> bool {
        !self.delta.is_empty()
    }

    fn reset_delta(&mut self) {
        self.delta = PendingSetDelta::default();
    }

    fn get_and_reset_delta(&mut self) -> Option<ReplicatedDelta> {
        if self.delta.is_empty() {
            return None;
        }
        let pending = std::mem::take(&mut self.delta);
        Some(ReplicatedDelta::Set(SetDelta {
            cleared: pending.cleared,
            removed: pending.removed.into_iter().collect(),
            added: pending.added.into_iter().collect(),
        }))
    }

    /// Apply a clear, then removals, then additions. Additions are decoded
    /// up front so a bad element leaves the set untouched.
    fn apply_delta(&mut self, delta: &ReplicatedDelta, codec: &AnySupport) -> Result<()> {
        let ReplicatedDelta::Set(delta) = delta else {
            return Err(malformed(DataKind::Set, delta));
        };

        let added = delta
            .added
            .iter()
            .map(|key| -> Result<(Envelope, Value)> { Ok((key.clone(), codec.decode(key)?)) })
            .collect::<Result<Vec<_>>>()?;

        if delta.cleared {
            self.elements.clear();
        }
        for key in &delta.removed {
            self.elements.remove(key);
        }
        self.elements.extend(added);
        Ok(())
    }
}

impl fmt::Display for ReplicatedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", DataKind::Set)?;
        for (i, element) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", element)?;
        }
        f.write_str(")")
    }
}
