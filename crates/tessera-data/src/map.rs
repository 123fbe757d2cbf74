//! Replicated Map - keys mapped to nested replicated data
//!
//! Keys are arbitrary values, keyed internally by their encoded envelope.
//! Values are themselves replicated data, so a map of counters or a map of
//! registers is expressed by nesting [`AnyReplicatedData`].
//!
//! The map's delta has four parts, applied by the receiver in this order:
//!
//! ```text
//! cleared  - drop every entry
//! removed  - keys to drop
//! updated  - (key, nested delta) for entries that already exist
//! added    - (key, full nested state) for new or replaced entries
//! ```

use crate::data::{malformed, AnyReplicatedData, DataKind, ReplicatedData};
use crate::delta::{MapDelta, MapEntryDelta, ReplicatedDelta};
use crate::error::{DataError, Result};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tessera_any::{encode, AnySupport, EncodeOptions, Envelope, Value};

const KEY_OPTIONS: EncodeOptions = EncodeOptions::GENERAL;

#[derive(Clone, Debug, PartialEq)]
struct MapEntry {
    key: Value,
    data: AnyReplicatedData,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct PendingMapDelta {
    cleared: bool,
    added: BTreeSet<Envelope>,
    removed: BTreeSet<Envelope>,
}

impl PendingMapDelta {
    fn is_empty(&self) -> bool {
        !self.cleared && self.added.is_empty() && self.removed.is_empty()
    }
}

/// Name a key for error messages, falling back to its type URL
fn describe_key(key: &Envelope, codec: &AnySupport) -> String {
    codec
        .decode(key)
        .map(|value| value.to_string())
        .unwrap_or_else(|_| key.type_url().to_string())
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplicatedMap {
    entries: BTreeMap<Envelope, MapEntry>,
    delta: PendingMapDelta,
}

impl ReplicatedMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &Value) -> Option<&AnyReplicatedData> {
        let key = encode(key, KEY_OPTIONS).ok()?;
        self.entries.get(&key).map(|entry| &entry.data)
    }

    /// Mutable access to a nested value; its changes flush as `updated`
    pub fn get_mut(&mut self, key: &Value) -> Option<&mut AnyReplicatedData> {
        let key = encode(key, KEY_OPTIONS).ok()?;
        self.entries.get_mut(&key).map(|entry| &mut entry.data)
    }

    /// Insert or replace the data at `key`
    pub fn insert(
        &mut self,
        key: impl Into<Value>,
        data: impl Into<AnyReplicatedData>,
    ) -> Result<&mut Self> {
        let key = key.into();
        let encoded = encode(&key, KEY_OPTIONS)?;

        if self.entries.contains_key(&encoded) && !self.delta.added.contains(&encoded) {
            self.delta.removed.insert(encoded.clone());
        }
        self.delta.added.insert(encoded.clone());
        self.entries.insert(
            encoded,
            MapEntry {
                key,
                data: data.into(),
            },
        );
        Ok(self)
    }

    /// Get the data at `key`, inserting `default()` first if absent
    pub fn get_or_insert_with<F>(&mut self, key: impl Into<Value>, default: F) -> Result<&mut AnyReplicatedData>
    where
        F: FnOnce() -> AnyReplicatedData,
    {
        let key = key.into();
        let encoded = encode(&key, KEY_OPTIONS)?;

        if !self.entries.contains_key(&encoded) {
            self.delta.added.insert(encoded.clone());
        }
        let entry = self.entries.entry(encoded).or_insert_with(|| MapEntry {
            key,
            data: default(),
        });
        Ok(&mut entry.data)
    }

    /// Remove the entry at `key`. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: impl Into<Value>) -> Result<&mut Self> {
        let encoded = encode(&key.into(), KEY_OPTIONS)?;

        if self.entries.contains_key(&encoded) {
            if self.entries.len() == 1 {
                self.clear();
            } else {
                self.entries.remove(&encoded);
                if !self.delta.added.remove(&encoded) {
                    self.delta.removed.insert(encoded);
                }
            }
        }
        Ok(self)
    }

    pub fn clear(&mut self) -> &mut Self {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.delta = PendingMapDelta {
                cleared: true,
                ..PendingMapDelta::default()
            };
        }
        self
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        encode(key, KEY_OPTIONS)
            .map(|key| self.entries.contains_key(&key))
            .unwrap_or(false)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.values().map(|entry| &entry.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &AnyReplicatedData)> {
        self.entries.values().map(|entry| (&entry.key, &entry.data))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn state_entries(&self) -> Vec<MapEntryDelta> {
        self.entries
            .iter()
            .map(|(key, entry)| MapEntryDelta {
                key: key.clone(),
                delta: entry.data.state_delta(),
            })
            .collect()
    }

    /// Full entries for a map the proxy has not seen, pending clocks included
    pub(crate) fn take_state_entries(&mut self) -> Vec<MapEntryDelta> {
        self.entries
            .iter_mut()
            .map(|(key, entry)| MapEntryDelta {
                key: key.clone(),
                delta: entry.data.take_full_delta(),
            })
            .collect()
    }
}

impl ReplicatedData for ReplicatedMap {
    fn kind(&self) -> DataKind {
        DataKind::Map
    }

    fn has_delta(&self) -> bool {
        !self.delta.is_empty() || self.entries.values().any(|entry| entry.data.has_delta())
    }

    fn reset_delta(&mut self) {
        self.delta = PendingMapDelta::default();
        for entry in self.entries.values_mut() {
            entry.data.reset_delta();
        }
    }

    fn get_and_reset_delta(&mut self) -> Option<ReplicatedDelta> {
        if !self.has_delta() {
            return None;
        }

        let pending = std::mem::take(&mut self.delta);
        let mut added = Vec::new();
        let mut updated = Vec::new();

        for (key, entry) in self.entries.iter_mut() {
            if pending.added.contains(key) {
                added.push(MapEntryDelta {
                    key: key.clone(),
                    delta: entry.data.take_full_delta(),
                });
            } else if let Some(delta) = entry.data.get_and_reset_delta() {
                updated.push(MapEntryDelta {
                    key: key.clone(),
                    delta,
                });
            }
        }

        Some(ReplicatedDelta::Map(MapDelta {
            cleared: pending.cleared,
            removed: pending.removed.into_iter().collect(),
            updated,
            added,
        }))
    }

    /// Everything is decoded and applied to copies before the map changes,
    /// so a failing entry leaves the map as it was.
    fn apply_delta(&mut self, delta: &ReplicatedDelta, codec: &AnySupport) -> Result<()> {
        let ReplicatedDelta::Map(delta) = delta else {
            return Err(malformed(DataKind::Map, delta));
        };

        let removed: BTreeSet<&Envelope> = delta.removed.iter().collect();

        // Several updates for one key compose on the same staged copy
        let mut updated: BTreeMap<Envelope, AnyReplicatedData> = BTreeMap::new();
        for entry in &delta.updated {
            let staged = match updated.entry(entry.key.clone()) {
                Entry::Occupied(slot) => slot.into_mut(),
                Entry::Vacant(slot) => {
                    let existing = self
                        .entries
                        .get(&entry.key)
                        .filter(|_| !delta.cleared && !removed.contains(&entry.key))
                        .ok_or_else(|| DataError::MissingMapEntry(describe_key(&entry.key, codec)))?;
                    slot.insert(existing.data.clone())
                }
            };
            staged.apply_delta(&entry.delta, codec)?;
        }

        let mut added = Vec::with_capacity(delta.added.len());
        for entry in &delta.added {
            let key = codec.decode(&entry.key)?;
            let data = AnyReplicatedData::from_delta(&entry.delta, codec)?;
            added.push((entry.key.clone(), MapEntry { key, data }));
        }

        if delta.cleared {
            self.entries.clear();
        }
        for key in removed {
            self.entries.remove(key);
        }
        for (key, data) in updated {
            if let Some(entry) = self.entries.get_mut(&key) {
                entry.data = data;
            }
        }
        self.entries.extend(added);

        tracing::trace!(entries = self.entries.len(), "map delta applied");
        Ok(())
    }
}

impl fmt::Display for ReplicatedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", DataKind::Map)?;
        for (i, (key, data)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{} -> {}", key, data)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::ReplicatedCounter;
    use crate::delta::{Clock, CounterDelta, RegisterDelta};
    use crate::register::ReplicatedRegister;

    fn key(value: impl Into<Value>) -> Envelope {
        encode(&value.into(), KEY_OPTIONS).unwrap()
    }

    fn map_delta(delta: Option<ReplicatedDelta>) -> MapDelta {
        match delta {
            Some(ReplicatedDelta::Map(delta)) => delta,
            other => panic!("expected a map delta, got {other:?}"),
        }
    }

    fn counter(value: i64) -> ReplicatedCounter {
        let mut counter = ReplicatedCounter::new();
        counter.increment(value);
        counter
    }

    #[test]
    fn test_map_insert_flushes_full_state_as_added() {
        let mut map = ReplicatedMap::new();
        map.insert("hits", counter(3)).unwrap();

        let delta = map_delta(map.get_and_reset_delta());
        assert_eq!(
            delta.added,
            vec![MapEntryDelta {
                key: key("hits"),
                delta: ReplicatedDelta::Counter(CounterDelta { change: 3 }),
            }]
        );
        assert!(delta.updated.is_empty());
        assert_eq!(map.get_and_reset_delta(), None);
    }

    #[test]
    fn test_map_nested_change_flushes_as_updated() {
        let mut map = ReplicatedMap::new();
        map.insert("hits", ReplicatedCounter::new()).unwrap();
        map.reset_delta();

        map.get_mut(&Value::from("hits"))
            .and_then(AnyReplicatedData::as_counter_mut)
            .unwrap()
            .increment(2);

        assert!(map.has_delta());
        let delta = map_delta(map.get_and_reset_delta());
        assert!(delta.added.is_empty());
        assert_eq!(
            delta.updated,
            vec![MapEntryDelta {
                key: key("hits"),
                delta: ReplicatedDelta::Counter(CounterDelta { change: 2 }),
            }]
        );
    }

    #[test]
    fn test_map_added_register_keeps_its_clock() {
        let mut map = ReplicatedMap::new();
        let register = ReplicatedRegister::with_clock("v", Clock::Custom, 9).unwrap();
        map.insert("name", register).unwrap();

        let delta = map_delta(map.get_and_reset_delta());
        match &delta.added[0].delta {
            ReplicatedDelta::Register(register) => {
                assert_eq!(register.clock, Clock::Custom);
                assert_eq!(register.custom_clock_value, 9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_map_nested_register_keeps_its_clock() {
        let mut profile = ReplicatedMap::new();
        profile
            .insert("name", ReplicatedRegister::with_clock("v", Clock::Custom, 9).unwrap())
            .unwrap();
        let mut map = ReplicatedMap::new();
        map.insert("profile", profile).unwrap();

        let delta = map_delta(map.get_and_reset_delta());
        let nested = match &delta.added[0].delta {
            ReplicatedDelta::Map(nested) => nested,
            other => panic!("unexpected {other:?}"),
        };
        match &nested.added[0].delta {
            ReplicatedDelta::Register(register) => {
                assert_eq!(register.clock, Clock::Custom);
                assert_eq!(register.custom_clock_value, 9);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!map.has_delta());
    }

    #[test]
    fn test_map_replacing_entry_removes_then_adds() {
        let mut map = ReplicatedMap::new();
        map.insert("a", counter(1)).unwrap().insert("b", counter(1)).unwrap();
        map.reset_delta();

        map.insert("a", counter(7)).unwrap();
        let delta = map_delta(map.get_and_reset_delta());
        assert_eq!(delta.removed, vec![key("a")]);
        assert_eq!(delta.added.len(), 1);
    }

    #[test]
    fn test_map_remove_and_clear() {
        let mut map = ReplicatedMap::new();
        map.insert("a", counter(1)).unwrap().insert("b", counter(2)).unwrap();
        map.reset_delta();

        map.remove("a").unwrap();
        assert_eq!(map_delta(map.get_and_reset_delta()).removed, vec![key("a")]);

        map.remove("b").unwrap();
        let delta = map_delta(map.get_and_reset_delta());
        assert!(delta.cleared);
        assert!(map.is_empty());
    }

    #[test]
    fn test_map_insert_then_remove_cancels() {
        let mut map = ReplicatedMap::new();
        map.insert("keep", counter(1)).unwrap();
        map.reset_delta();

        map.insert("temp", counter(1)).unwrap();
        map.remove("temp").unwrap();
        assert!(!map.has_delta());
    }

    #[test]
    fn test_map_get_or_insert_with() {
        let mut map = ReplicatedMap::new();
        map.get_or_insert_with("hits", || ReplicatedCounter::new().into())
            .unwrap()
            .as_counter_mut()
            .unwrap()
            .increment(4);
        map.get_or_insert_with("hits", || unreachable!())
            .unwrap()
            .as_counter_mut()
            .unwrap()
            .increment(1);

        let delta = map_delta(map.get_and_reset_delta());
        assert_eq!(delta.added[0].delta, ReplicatedDelta::Counter(CounterDelta { change: 5 }));
    }

    #[test]
    fn test_map_apply_added_and_updated() {
        let codec = AnySupport::default();
        let mut map = ReplicatedMap::new();
        map.insert("hits", counter(1)).unwrap();
        map.reset_delta();

        let name = encode(&Value::from("alice"), EncodeOptions::GENERAL).unwrap();
        let remote = ReplicatedDelta::Map(MapDelta {
            updated: vec![MapEntryDelta {
                key: key("hits"),
                delta: ReplicatedDelta::Counter(CounterDelta { change: 10 }),
            }],
            added: vec![MapEntryDelta {
                key: key("name"),
                delta: ReplicatedDelta::Register(RegisterDelta::new(name, Clock::Default, 0)),
            }],
            ..MapDelta::default()
        });
        map.apply_delta(&remote, &codec).unwrap();

        assert_eq!(
            map.get(&Value::from("hits")).and_then(|d| d.as_counter()).map(|c| c.value()),
            Some(11)
        );
        assert_eq!(
            map.get(&Value::from("name")).and_then(|d| d.as_register()).map(|r| r.value()),
            Some(&Value::from("alice"))
        );
        assert!(!map.has_delta());
        assert_eq!(
            map.to_string(),
            "ReplicatedMap(hits -> ReplicatedCounter(11),name -> ReplicatedRegister(alice))"
        );
    }

    #[test]
    fn test_map_updates_for_one_key_compose() {
        let codec = AnySupport::default();
        let mut map = ReplicatedMap::new();
        map.insert("hits", counter(1)).unwrap();
        map.reset_delta();

        let remote = ReplicatedDelta::Map(MapDelta {
            updated: vec![
                MapEntryDelta {
                    key: key("hits"),
                    delta: ReplicatedDelta::Counter(CounterDelta { change: 1 }),
                },
                MapEntryDelta {
                    key: key("hits"),
                    delta: ReplicatedDelta::Counter(CounterDelta { change: 2 }),
                },
            ],
            ..MapDelta::default()
        });
        map.apply_delta(&remote, &codec).unwrap();

        assert_eq!(
            map.get(&Value::from("hits")).and_then(|d| d.as_counter()).map(|c| c.value()),
            Some(4)
        );
    }

    #[test]
    fn test_map_update_of_missing_entry_is_rejected_atomically() {
        let codec = AnySupport::default();
        let mut map = ReplicatedMap::new();
        map.insert("hits", counter(1)).unwrap();
        map.reset_delta();
        let before = map.clone();

        let remote = ReplicatedDelta::Map(MapDelta {
            removed: vec![key("hits")],
            updated: vec![MapEntryDelta {
                key: key("ghost"),
                delta: ReplicatedDelta::Counter(CounterDelta { change: 1 }),
            }],
            ..MapDelta::default()
        });

        assert_eq!(
            map.apply_delta(&remote, &codec),
            Err(DataError::MissingMapEntry("ghost".to_string()))
        );
        assert_eq!(map, before);
    }

    #[test]
    fn test_map_nested_kind_mismatch_is_malformed() {
        let codec = AnySupport::default();
        let mut map = ReplicatedMap::new();
        map.insert("hits", counter(1)).unwrap();
        map.reset_delta();

        let remote = ReplicatedDelta::Map(MapDelta {
            updated: vec![MapEntryDelta {
                key: key("hits"),
                delta: ReplicatedDelta::Flag(crate::delta::FlagDelta { value: true }),
            }],
            ..MapDelta::default()
        });

        assert!(matches!(
            map.apply_delta(&remote, &codec),
            Err(DataError::MalformedDelta { .. })
        ));
    }
}
