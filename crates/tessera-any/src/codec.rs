//! Value <-> envelope conversion.
//!
//! Encoding needs no registry: a message value carries its own schema name
//! and encoder. Decoding dispatches on the parsed [`TypeUrl`] and consults
//! the injected [`SchemaRegistry`] for structured messages.

use crate::envelope::Envelope;
use crate::error::{CodecError, Result};
use crate::registry::SchemaRegistry;
use crate::type_url::{PrimitiveKind, TypeUrl};
use crate::value::Value;
use crate::wire::{self, FieldValue, WireType};

/// What a call site is willing to put on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Permit bare primitives
    pub allow_primitives: bool,
    /// Permit the JSON fallback for values without a schema
    pub allow_json: bool,
    /// Reject JSON objects that carry no `type` tag
    pub require_json_type: bool,
}

impl EncodeOptions {
    /// Structured messages only.
    pub const STRICT: EncodeOptions = EncodeOptions::new(false, false);
    /// Structured messages and primitives.
    pub const PRIMITIVES: EncodeOptions = EncodeOptions::new(true, false);
    /// Everything, including the JSON fallback. Used by replicated data slots.
    pub const GENERAL: EncodeOptions = EncodeOptions::new(true, true);

    pub const fn new(allow_primitives: bool, allow_json: bool) -> Self {
        Self {
            allow_primitives,
            allow_json,
            require_json_type: false,
        }
    }

    pub const fn require_json_type(mut self, required: bool) -> Self {
        self.require_json_type = required;
        self
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::PRIMITIVES
    }
}

fn primitive_envelope(kind: PrimitiveKind, field: Option<FieldValue<'_>>) -> Envelope {
    let payload = field.map(wire::encode_field_one).unwrap_or_default();
    Envelope::new(TypeUrl::primitive(kind), payload)
}

fn encode_string(s: &str) -> Vec<u8> {
    if s.is_empty() {
        Vec::new()
    } else {
        wire::encode_field_one(FieldValue::Bytes(s.as_bytes()))
    }
}

/// Encode `value` under the constraints of `options`.
///
/// Default primitive values always produce an empty payload.
pub fn encode(value: &Value, options: EncodeOptions) -> Result<Envelope> {
    if value.primitive_kind().is_some() && !options.allow_primitives {
        return Err(CodecError::UnsupportedValue(format!(
            "primitive {} is not allowed here",
            value
        )));
    }

    let envelope = match value {
        Value::Message(message) => {
            Envelope::new(TypeUrl::message(message.type_name()), message.encode()?)
        }
        Value::Json(json) => encode_json(json, options)?,
        Value::String(s) => Envelope::new(TypeUrl::primitive(PrimitiveKind::String), encode_string(s)),
        Value::Bytes(b) => primitive_envelope(
            PrimitiveKind::Bytes,
            (!b.is_empty()).then_some(FieldValue::Bytes(b)),
        ),
        Value::Int64(v) => primitive_envelope(
            PrimitiveKind::Int64,
            (*v != 0).then_some(FieldValue::Varint(*v as u64)),
        ),
        Value::Bool(b) => {
            primitive_envelope(PrimitiveKind::Bool, b.then_some(FieldValue::Varint(1)))
        }
        Value::Double(v) => primitive_envelope(
            PrimitiveKind::Double,
            (v.to_bits() != 0).then(|| FieldValue::Fixed64(v.to_le_bytes())),
        ),
    };
    Ok(envelope)
}

fn encode_json(json: &serde_json::Value, options: EncodeOptions) -> Result<Envelope> {
    if !options.allow_json {
        return Err(CodecError::UnsupportedValue(format!(
            "{} has no schema and the JSON fallback is disabled",
            json
        )));
    }

    let tag = match json {
        serde_json::Value::Object(fields) => fields
            .get("type")
            .and_then(serde_json::Value::as_str)
            .filter(|tag| !tag.is_empty()),
        serde_json::Value::Array(_) => None,
        other => {
            return Err(CodecError::UnsupportedValue(format!(
                "JSON fallback needs an object or array, got {}",
                other
            )))
        }
    };

    if tag.is_none() && options.require_json_type {
        return Err(CodecError::UnsupportedValue(format!(
            "{} has no `type` property",
            json
        )));
    }

    let text = serde_json::to_string(json)?;
    Ok(Envelope::new(TypeUrl::json(tag), encode_string(&text)))
}

fn decode_string(payload: &[u8]) -> std::result::Result<String, String> {
    match wire::find_field_one(payload, WireType::LengthDelimited)? {
        Some(FieldValue::Bytes(bytes)) => String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string()),
        _ => Ok(String::new()),
    }
}

fn decode_primitive(kind: PrimitiveKind, payload: &[u8]) -> std::result::Result<Value, String> {
    let value = match kind {
        PrimitiveKind::String => Value::String(decode_string(payload)?),
        PrimitiveKind::Bytes => match wire::find_field_one(payload, WireType::LengthDelimited)? {
            Some(FieldValue::Bytes(bytes)) => Value::Bytes(bytes.to_vec()),
            _ => Value::Bytes(Vec::new()),
        },
        PrimitiveKind::Int64 => match wire::find_field_one(payload, WireType::Varint)? {
            Some(FieldValue::Varint(v)) => Value::Int64(v as i64),
            _ => Value::Int64(0),
        },
        PrimitiveKind::Bool => match wire::find_field_one(payload, WireType::Varint)? {
            Some(FieldValue::Varint(v)) => Value::Bool(v != 0),
            _ => Value::Bool(false),
        },
        PrimitiveKind::Double => match wire::find_field_one(payload, WireType::Fixed64)? {
            Some(FieldValue::Fixed64(bytes)) => Value::Double(f64::from_le_bytes(bytes)),
            _ => Value::Double(0.0),
        },
    };
    Ok(value)
}

/// The codec: encoding plus registry-backed decoding.
#[derive(Clone, Debug, Default)]
pub struct AnySupport {
    registry: SchemaRegistry,
}

impl AnySupport {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn encode(&self, value: &Value, options: EncodeOptions) -> Result<Envelope> {
        encode(value, options)
    }

    /// Decode an envelope back into a value.
    pub fn decode(&self, envelope: &Envelope) -> Result<Value> {
        let payload = envelope.payload();
        let malformed = |reason: String| CodecError::MalformedPayload {
            type_url: envelope.type_url().to_string(),
            reason,
        };

        match envelope.type_url() {
            TypeUrl::Primitive(kind) => decode_primitive(*kind, payload).map_err(malformed),
            TypeUrl::Message(name) => {
                let schema = self.registry.lookup(name).ok_or_else(|| {
                    tracing::warn!(type_url = %envelope.type_url(), "no schema registered");
                    CodecError::UnknownType(envelope.type_url().to_string())
                })?;
                Ok(Value::Message(schema.decode(payload)?))
            }
            TypeUrl::Json(_) => {
                let text = decode_string(payload).map_err(malformed)?;
                Ok(Value::Json(serde_json::from_str(&text)?))
            }
        }
    }
}
