//! The wire form of a value: a type URL plus encoded bytes.

use crate::type_url::TypeUrl;
use serde::{Deserialize, Serialize};

/// A self-describing value.
///
/// Envelopes are totally ordered (type URL first, then bytes), which lets
/// replicated sets and maps key their elements by encoded form.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Envelope {
    type_url: TypeUrl,
    #[serde(default)]
    value: Vec<u8>,
}

impl Envelope {
    pub fn new(type_url: TypeUrl, value: Vec<u8>) -> Self {
        Self { type_url, value }
    }

    pub fn type_url(&self) -> &TypeUrl {
        &self.type_url
    }

    /// The encoded payload
    pub fn payload(&self) -> &[u8] {
        &self.value
    }

    pub fn is_empty_payload(&self) -> bool {
        self.value.is_empty()
    }

    pub fn into_parts(self) -> (TypeUrl, Vec<u8>) {
        (self.type_url, self.value)
    }
}
