//! Per-entity holder for replicated data
//!
//! An entity owns at most one replicated data instance. User code sets it
//! once; a replica that has never been written locally gets it from the
//! first delta the proxy delivers.

use crate::data::{AnyReplicatedData, ReplicatedData};
use crate::delta::ReplicatedDelta;
use crate::error::{DataError, Result};
use tessera_any::AnySupport;
use tracing::debug;

#[derive(Clone, Debug, PartialEq)]
pub struct EntityState {
    entity_id: String,
    data: Option<AnyReplicatedData>,
}

impl EntityState {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            data: None,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Install the entity's data.
    ///
    /// Setting an equal instance again is a no-op; anything else once data
    /// is present fails with [`DataError::StateAlreadySet`].
    pub fn set_data(&mut self, data: impl Into<AnyReplicatedData>) -> Result<&mut AnyReplicatedData> {
        let data = data.into();
        match &self.data {
            Some(existing) if *existing != data => {
                return Err(DataError::StateAlreadySet {
                    entity_id: self.entity_id.clone(),
                    existing: existing.kind(),
                });
            }
            Some(_) => {}
            None => debug!(entity_id = %self.entity_id, kind = %data.kind(), "entity data set"),
        }
        Ok(self.data.get_or_insert(data))
    }

    pub fn data(&self) -> Option<&AnyReplicatedData> {
        self.data.as_ref()
    }

    pub fn data_mut(&mut self) -> Option<&mut AnyReplicatedData> {
        self.data.as_mut()
    }

    /// Take the delta produced by the current command turn, if any
    pub fn flush(&mut self) -> Option<ReplicatedDelta> {
        let delta = self.data.as_mut()?.get_and_reset_delta()?;
        debug!(entity_id = %self.entity_id, kind = %delta.kind(), "flushing delta");
        Some(delta)
    }

    /// Apply a delta from the proxy, creating the data if none exists yet
    pub fn apply_delta(&mut self, delta: &ReplicatedDelta, codec: &AnySupport) -> Result<()> {
        match &mut self.data {
            Some(data) => data.apply_delta(delta, codec),
            None => {
                let data = AnyReplicatedData::from_delta(delta, codec)?;
                debug!(entity_id = %self.entity_id, kind = %data.kind(), "entity data created from delta");
                self.data = Some(data);
                Ok(())
            }
        }
    }
}
