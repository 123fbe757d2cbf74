//! Round-trip and compaction laws for the envelope codec
//!
//! - decode(encode(v)) == v for every primitive kind and registered schema
//! - default primitives encode to an empty payload and decode back

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use tessera_any::{
    encode, AnySupport, CodecError, EncodeOptions, Envelope, NamedMessage, PrimitiveKind,
    SchemaRegistry, TypeUrl, Value,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Example {
    field1: String,
    field2: String,
}

impl NamedMessage for Example {
    const TYPE_NAME: &'static str = "com.example.Example";
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Reading {
    sensor: u32,
    celsius: Vec<i32>,
}

impl NamedMessage for Reading {
    const TYPE_NAME: &'static str = "com.example.Reading";
}

fn codec() -> AnySupport {
    AnySupport::new(SchemaRegistry::new().with::<Example>().with::<Reading>())
}

fn primitive_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        ".{0,16}".prop_map(Value::String),
        any::<i64>().prop_map(Value::Int64),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
        any::<bool>().prop_map(Value::Bool),
        any::<f64>()
            .prop_filter("NaN never equals itself", |v| !v.is_nan())
            .prop_map(Value::Double),
    ]
}

proptest! {
    #[test]
    fn primitives_roundtrip(value in primitive_strategy()) {
        let envelope = encode(&value, EncodeOptions::PRIMITIVES).unwrap();
        prop_assert!(envelope.type_url().is_primitive());
        prop_assert_eq!(codec().decode(&envelope).unwrap(), value);
    }

    #[test]
    fn messages_roundtrip(sensor in any::<u32>(), celsius in prop::collection::vec(any::<i32>(), 0..8)) {
        let value = Value::message(Reading { sensor, celsius });
        let envelope = encode(&value, EncodeOptions::STRICT).unwrap();
        prop_assert_eq!(envelope.type_url(), &TypeUrl::message("com.example.Reading"));
        prop_assert_eq!(codec().decode(&envelope).unwrap(), value);
    }

    #[test]
    fn decode_never_panics_on_arbitrary_primitive_payloads(
        bytes in prop::collection::vec(any::<u8>(), 0..24),
        kind in prop::sample::select(PrimitiveKind::ALL.to_vec()),
    ) {
        let envelope = Envelope::new(TypeUrl::primitive(kind), bytes);
        match codec().decode(&envelope) {
            Ok(value) => prop_assert_eq!(value.primitive_kind(), Some(kind)),
            Err(CodecError::MalformedPayload { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }
}

#[test]
fn default_primitives_compact_to_empty_payload() {
    let defaults = [
        Value::from(""),
        Value::from(0i64),
        Value::from(Vec::new()),
        Value::from(false),
        Value::from(0.0),
    ];

    for value in defaults {
        let envelope = encode(&value, EncodeOptions::PRIMITIVES).unwrap();
        assert!(envelope.is_empty_payload(), "{value:?} should compact");

        let empty = Envelope::new(envelope.type_url().clone(), Vec::new());
        assert_eq!(codec().decode(&empty).unwrap(), value);
    }
}

#[test]
fn structured_message_roundtrip() {
    let example = Example {
        field1: "foo".to_string(),
        field2: "bar".to_string(),
    };
    let envelope = encode(&Value::message(example.clone()), EncodeOptions::STRICT).unwrap();

    assert_eq!(
        envelope.type_url().to_string(),
        "type.googleapis.com/com.example.Example"
    );
    let decoded = codec().decode(&envelope).unwrap();
    assert_eq!(decoded.as_message::<Example>(), Some(&example));
}

#[test]
fn empty_message_payload_decodes_to_default_instance() {
    let envelope = Envelope::new(TypeUrl::message("com.example.Example"), Vec::new());
    let decoded = codec().decode(&envelope).unwrap();
    assert_eq!(decoded.as_message::<Example>(), Some(&Example::default()));
}

#[test]
fn unregistered_message_fails_with_unknown_type() {
    let isolated = AnySupport::new(SchemaRegistry::new().with::<Reading>());
    let envelope = encode(&Value::message(Example::default()), EncodeOptions::STRICT).unwrap();

    assert!(matches!(
        isolated.decode(&envelope),
        Err(CodecError::UnknownType(url)) if url == "type.googleapis.com/com.example.Example"
    ));
}

#[test]
fn envelope_survives_json_transport() {
    let envelope = encode(&Value::from("transported"), EncodeOptions::PRIMITIVES).unwrap();
    let json = serde_json::to_string(&envelope).unwrap();
    let back: Envelope = serde_json::from_str(&json).unwrap();

    assert_eq!(back, envelope);
    assert_eq!(codec().decode(&back).unwrap(), Value::from("transported"));
}
