//! Replicated Flag - a boolean that can only go from false to true.

use crate::data::{malformed, DataKind, ReplicatedData};
use crate::delta::{FlagDelta, ReplicatedDelta};
use crate::error::Result;
use std::fmt;
use tessera_any::AnySupport;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplicatedFlag {
    value: bool,
    delta: bool,
}

impl ReplicatedFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> bool {
        self.value
    }

    /// Enable the flag. Enabling an enabled flag records nothing.
    pub fn enable(&mut self) -> &mut Self {
        if !self.value {
            self.value = true;
            self.delta = true;
        }
        self
    }

    pub(crate) fn state_delta(&self) -> FlagDelta {
        FlagDelta { value: self.value }
    }
}

impl ReplicatedData for ReplicatedFlag {
    fn kind(&self) -> DataKind {
        DataKind::Flag
    }

    fn has_delta(&self) -> bool {
        self.delta
    }

    fn reset_delta(&mut self) {
        self.delta = false;
    }

    fn get_and_reset_delta(&mut self) -> Option<ReplicatedDelta> {
        std::mem::take(&mut self.delta).then_some(ReplicatedDelta::Flag(FlagDelta { value: true }))
    }

    fn apply_delta(&mut self, delta: &ReplicatedDelta, _codec: &AnySupport) -> Result<()> {
        let ReplicatedDelta::Flag(FlagDelta { value }) = delta else {
            return Err(malformed(DataKind::Flag, delta));
        };
        self.value |= *value;
        Ok(())
    }
}

impl fmt::Display for ReplicatedFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", DataKind::Flag, self.value)
    }
}
