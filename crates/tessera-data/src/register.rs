//! Last-Write-Wins (LWW) Register
//!
//! The register holds a single value. Concurrent writes are ordered by the
//! proxy: the write with the strictly greater clock wins, and on equal clocks
//! the write from the node with the lowest address wins. The SDK side never
//! resolves conflicts itself; it only remembers the value the proxy last
//! confirmed plus its own unacknowledged write, and ships that write with
//! the clock the caller picked.
//!
//! Unlike the other variants the register's delta is not incremental: it
//! always carries the complete new value, so only the latest local write
//! before a flush matters.

use crate::data::{malformed, DataKind, ReplicatedData};
use crate::delta::{Clock, RegisterDelta, ReplicatedDelta};
use crate::error::{DataError, Result};
use std::fmt;
use tessera_any::{encode, AnySupport, EncodeOptions, Envelope, Value};

/// Register values may be anything the codec can represent.
const VALUE_OPTIONS: EncodeOptions = EncodeOptions::GENERAL;

/// A Last-Write-Wins Register
#[derive(Clone, Debug, PartialEq)]
pub struct ReplicatedRegister {
    /// The current value
    value: Value,
    /// `value` in wire form
    encoded: Envelope,
    /// The local write the proxy has not seen yet
    delta: Option<RegisterDelta>,
}

impl ReplicatedRegister {
    /// Create a register using the default clock.
    ///
    /// The initial value is pending, so the first flush sends it to the proxy.
    pub fn new(value: impl Into<Value>) -> Result<Self> {
        Self::with_clock(value, Clock::Default, 0)
    }

    /// Create a register whose initial write uses `clock`
    pub fn with_clock(value: impl Into<Value>, clock: Clock, custom_clock_value: i64) -> Result<Self> {
        let value = value.into();
        if value.is_null() {
            return Err(DataError::MissingInitialValue(DataKind::Register));
        }

        let encoded = encode(&value, VALUE_OPTIONS)?;
        let delta = RegisterDelta::new(encoded.clone(), clock, custom_clock_value);
        Ok(Self {
            value,
            encoded,
            delta: Some(delta),
        })
    }

    /// Create a register from a value that may be absent
    pub fn from_optional(value: Option<Value>) -> Result<Self> {
        match value {
            Some(value) => Self::new(value),
            None => Err(DataError::MissingInitialValue(DataKind::Register)),
        }
    }

    /// Rebuild the register the proxy described, with nothing pending
    pub(crate) fn from_remote(delta: &RegisterDelta, codec: &AnySupport) -> Result<Self> {
        Ok(Self {
            value: codec.decode(&delta.value)?,
            encoded: delta.value.clone(),
            delta: None,
        })
    }

    /// Get the current value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Set the value with the default clock
    pub fn set(&mut self, value: impl Into<Value>) -> Result<&mut Self> {
        self.set_with_clock(value, Clock::Default, 0)
    }

    /// Set the value with an explicit clock.
    ///
    /// `custom_clock_value` is ignored unless `clock` is a custom clock. If
    /// the value cannot be encoded nothing changes.
    pub fn set_with_clock(
        &mut self,
        value: impl Into<Value>,
        clock: Clock,
        custom_clock_value: i64,
    ) -> Result<&mut Self> {
        let value = value.into();
        let encoded = encode(&value, VALUE_OPTIONS)?;

        self.delta = Some(RegisterDelta::new(encoded.clone(), clock, custom_clock_value));
        self.encoded = encoded;
        self.value = value;
        Ok(self)
    }

    /// The write waiting to be flushed, if any
    pub fn pending_delta(&self) -> Option<&RegisterDelta> {
        self.delta.as_ref()
    }

    pub(crate) fn state_delta(&self) -> RegisterDelta {
        RegisterDelta::new(self.encoded.clone(), Clock::Default, 0)
    }
}

impl ReplicatedData for ReplicatedRegister {
    fn kind(&self) -> DataKind {
        DataKind::Register
    }

    fn has_delta(&self) -> bool {
        self.delta.is_some()
    }

    fn reset_delta(&mut self) {
        self.delta = None;
    }

    fn get_and_reset_delta(&mut self) -> Option<ReplicatedDelta> {
        self.delta.take().map(ReplicatedDelta::Register)
    }

    /// Replace the value with the one the proxy resolved, dropping any
    /// unacknowledged local write.
    fn apply_delta(&mut self, delta: &ReplicatedDelta, codec: &AnySupport) -> Result<()> {
        let ReplicatedDelta::Register(delta) = delta else {
            return Err(malformed(DataKind::Register, delta));
        };

        let value = codec.decode(&delta.value)?;
        tracing::trace!(value = %value, "register replaced by remote delta");

        self.value = value;
        self.encoded = delta.value.clone();
        self.delta = None;
        Ok(())
    }
}

impl fmt::Display for ReplicatedRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", DataKind::Register, self.value)
    }
}
