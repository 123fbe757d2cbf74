//! Tessera Any - self-describing value envelopes
//!
//! Replicated data deltas carry application values of arbitrary type. This
//! crate turns a [`Value`] into an [`Envelope`] (type URL plus bytes) and
//! back, following the proxy's wire conventions:
//!
//! - primitives get a reserved URL and a protobuf field-1 payload, which is
//!   empty for the type's default value
//! - structured messages are named by their schema and decoded through an
//!   explicit [`SchemaRegistry`]
//! - anything else may fall back to canonical JSON when the call site allows it
//!
//! # Example
//!
//! ```rust
//! use tessera_any::{encode, AnySupport, EncodeOptions, Value};
//!
//! let envelope = encode(&Value::from("foo"), EncodeOptions::PRIMITIVES).unwrap();
//! assert_eq!(envelope.type_url().to_string(), "p.akkaserverless.com/string");
//!
//! let codec = AnySupport::default();
//! assert_eq!(codec.decode(&envelope).unwrap(), Value::from("foo"));
//! ```

pub mod codec;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod type_url;
pub mod value;
mod wire;

pub use codec::{encode, AnySupport, EncodeOptions};
pub use envelope::Envelope;
pub use error::{CodecError, Result};
pub use registry::{MessageSchema, SchemaRegistry, SerdeSchema};
pub use type_url::{PrimitiveKind, TypeUrl};
pub use value::{DynMessage, MessageValue, NamedMessage, Value};
