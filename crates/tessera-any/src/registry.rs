//! Schema registry for structured messages.
//!
//! The registry is an explicit value handed to [`AnySupport`](crate::AnySupport);
//! there is no process-wide table, so tests can build isolated registries.

use crate::error::Result;
use crate::value::{MessageValue, NamedMessage};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Decoding logic for one message schema.
pub trait MessageSchema: Send + Sync {
    /// Fully qualified schema name
    fn full_name(&self) -> &str;

    /// Decode a payload; an empty payload is the default instance
    fn decode(&self, payload: &[u8]) -> Result<MessageValue>;
}

/// Schema for a Rust type whose canonical encoding is its bincode form.
pub struct SerdeSchema<M>(PhantomData<fn() -> M>);

impl<M> SerdeSchema<M> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<M> Default for SerdeSchema<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: NamedMessage> MessageSchema for SerdeSchema<M> {
    fn full_name(&self) -> &str {
        M::TYPE_NAME
    }

    fn decode(&self, payload: &[u8]) -> Result<MessageValue> {
        if payload.is_empty() {
            return Ok(MessageValue::new(M::default()));
        }
        let message: M = bincode::deserialize(payload)?;
        Ok(MessageValue::new(message))
    }
}

/// Lookup table from schema name to decoder.
#[derive(Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<dyn MessageSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the serde schema for `M`
    pub fn register<M: NamedMessage>(&mut self) -> &mut Self {
        self.register_schema(Arc::new(SerdeSchema::<M>::new()))
    }

    /// Builder form of [`register`](Self::register)
    pub fn with<M: NamedMessage>(mut self) -> Self {
        self.register::<M>();
        self
    }

    /// Register a custom schema, replacing any schema with the same name
    pub fn register_schema(&mut self, schema: Arc<dyn MessageSchema>) -> &mut Self {
        let name = schema.full_name().to_string();
        if self.schemas.insert(name.clone(), schema).is_some() {
            tracing::debug!(schema = %name, "replaced registered schema");
        }
        self
    }

    pub fn lookup(&self, full_name: &str) -> Option<&Arc<dyn MessageSchema>> {
        self.schemas.get(full_name)
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.schemas.contains_key(full_name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Greeting {
        text: String,
    }

    impl NamedMessage for Greeting {
        const TYPE_NAME: &'static str = "test.Greeting";
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = SchemaRegistry::new().with::<Greeting>();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("test.Greeting"));
        assert!(registry.lookup("test.Missing").is_none());
    }

    #[test]
    fn test_serde_schema_decodes_empty_payload_to_default() {
        let schema = SerdeSchema::<Greeting>::new();
        let decoded = schema.decode(&[]).unwrap();
        assert_eq!(decoded.downcast_ref::<Greeting>(), Some(&Greeting::default()));
    }

    #[test]
    fn test_serde_schema_rejects_garbage() {
        let schema = SerdeSchema::<Greeting>::new();
        assert!(schema.decode(&[0xFF]).is_err());
    }
}
