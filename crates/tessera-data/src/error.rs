//! Error types for replicated data operations.

use crate::data::DataKind;
use tessera_any::CodecError;
use thiserror::Error;

/// Errors that can occur while mutating or synchronizing replicated data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("{0} must be instantiated with an initial value")]
    MissingInitialValue(DataKind),

    #[error("Cannot apply {found} delta to {expected}")]
    MalformedDelta { expected: DataKind, found: DataKind },

    #[error("Map delta updates missing key {0}")]
    MissingMapEntry(String),

    #[error("Entity {entity_id} already holds {existing}")]
    StateAlreadySet { entity_id: String, existing: DataKind },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl DataError {
    pub fn is_unsupported_value(&self) -> bool {
        matches!(self, DataError::Codec(CodecError::UnsupportedValue(_)))
    }

    pub fn is_unknown_type(&self) -> bool {
        matches!(self, DataError::Codec(CodecError::UnknownType(_)))
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
