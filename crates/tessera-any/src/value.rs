//! Application values that can travel inside an envelope.

use crate::error::Result;
use crate::type_url::PrimitiveKind;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A structured message with a globally unique schema name.
///
/// The canonical binary encoding is the bincode form of the serde model;
/// the default instance stands in for an empty payload.
pub trait NamedMessage:
    Serialize + DeserializeOwned + Default + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// Fully qualified name, e.g. `com.example.Example`
    const TYPE_NAME: &'static str;
}

/// Object-safe view of a [`NamedMessage`].
pub trait DynMessage: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;
    fn encode(&self) -> Result<Vec<u8>>;
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn DynMessage) -> bool;
}

impl<M: NamedMessage> DynMessage for M {
    fn type_name(&self) -> &str {
        M::TYPE_NAME
    }

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn DynMessage) -> bool {
        other
            .as_any()
            .downcast_ref::<M>()
            .is_some_and(|other| other == self)
    }
}

/// A shared, type-erased structured message.
#[derive(Clone)]
pub struct MessageValue(Arc<dyn DynMessage>);

impl MessageValue {
    pub fn new<M: NamedMessage>(message: M) -> Self {
        Self(Arc::new(message))
    }

    pub fn type_name(&self) -> &str {
        self.0.type_name()
    }

    pub fn downcast_ref<M: NamedMessage>(&self) -> Option<&M> {
        self.0.as_any().downcast_ref::<M>()
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        self.0.encode()
    }
}

impl PartialEq for MessageValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.dyn_eq(other.0.as_ref())
    }
}

impl fmt::Debug for MessageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.0.as_ref(), f)
    }
}

/// Any value an envelope can carry.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    String(String),
    Int64(i64),
    Bytes(Vec<u8>),
    Bool(bool),
    Double(f64),
    Message(MessageValue),
    /// Fallback for values without a schema
    Json(serde_json::Value),
}

impl Value {
    pub fn message<M: NamedMessage>(message: M) -> Self {
        Value::Message(MessageValue::new(message))
    }

    /// The primitive kind of this value, if it is one
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            Value::String(_) => Some(PrimitiveKind::String),
            Value::Int64(_) => Some(PrimitiveKind::Int64),
            Value::Bytes(_) => Some(PrimitiveKind::Bytes),
            Value::Bool(_) => Some(PrimitiveKind::Bool),
            Value::Double(_) => Some(PrimitiveKind::Double),
            Value::Message(_) | Value::Json(_) => None,
        }
    }

    /// True for the JSON `null`, which stands for "no value"
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Json(serde_json::Value::Null))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_message<M: NamedMessage>(&self) -> Option<&M> {
        match self {
            Value::Message(m) => m.downcast_ref(),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Bytes(bytes) => {
                f.write_str("0x")?;
                bytes.iter().try_for_each(|b| write!(f, "{:02x}", b))
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::Double(v) => write!(f, "{}", v),
            Value::Message(m) => write!(f, "{:?}", m),
            Value::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<MessageValue> for Value {
    fn from(m: MessageValue) -> Self {
        Value::Message(m)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}
