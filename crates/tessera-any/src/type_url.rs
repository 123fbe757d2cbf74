//! Type URLs - the namespace half of an envelope
//!
//! Every envelope names its payload type with a URL drawn from one of three
//! disjoint authorities:
//!
//! ```text
//! p.akkaserverless.com/<kind>       primitive (string, int64, bytes, bool, double)
//! type.googleapis.com/<full.name>   structured message
//! json.akkaserverless.com/<tag>     JSON fallback (tag or "object")
//! ```
//!
//! The strings are a wire contract with the proxy and must not change.
//! Inside the crate a URL is always the parsed [`TypeUrl`], so dispatch is an
//! exhaustive `match` rather than prefix inspection.

use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const PRIMITIVE_AUTHORITY: &str = "p.akkaserverless.com/";
pub const MESSAGE_AUTHORITY: &str = "type.googleapis.com/";
pub const JSON_AUTHORITY: &str = "json.akkaserverless.com/";

/// Placeholder tag for JSON values that carry no `type` field.
pub const GENERIC_JSON_TYPE: &str = "object";

/// The primitive kinds that have a reserved type URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimitiveKind {
    String,
    Int64,
    Bytes,
    Bool,
    Double,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 5] = [
        PrimitiveKind::String,
        PrimitiveKind::Int64,
        PrimitiveKind::Bytes,
        PrimitiveKind::Bool,
        PrimitiveKind::Double,
    ];

    /// The URL suffix for this kind
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Int64 => "int64",
            PrimitiveKind::Bytes => "bytes",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Double => "double",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed type URL.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeUrl {
    Primitive(PrimitiveKind),
    /// Fully qualified schema name, e.g. `com.example.Example`
    Message(String),
    /// Explicit type tag, or [`GENERIC_JSON_TYPE`]
    Json(String),
}

impl TypeUrl {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        TypeUrl::Primitive(kind)
    }

    pub fn message(full_name: impl Into<String>) -> Self {
        TypeUrl::Message(full_name.into())
    }

    pub fn json(tag: Option<&str>) -> Self {
        TypeUrl::Json(tag.unwrap_or(GENERIC_JSON_TYPE).to_string())
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeUrl::Primitive(_))
    }
}

impl fmt::Display for TypeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeUrl::Primitive(kind) => write!(f, "{}{}", PRIMITIVE_AUTHORITY, kind),
            TypeUrl::Message(name) => write!(f, "{}{}", MESSAGE_AUTHORITY, name),
            TypeUrl::Json(tag) => write!(f, "{}{}", JSON_AUTHORITY, tag),
        }
    }
}

impl FromStr for TypeUrl {
    type Err = CodecError;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        let unknown = || CodecError::UnknownType(url.to_string());

        if let Some(kind) = url.strip_prefix(PRIMITIVE_AUTHORITY) {
            PrimitiveKind::from_name(kind)
                .map(TypeUrl::Primitive)
                .ok_or_else(unknown)
        } else if let Some(name) = url.strip_prefix(MESSAGE_AUTHORITY) {
            if name.is_empty() {
                return Err(unknown());
            }
            Ok(TypeUrl::Message(name.to_string()))
        } else if let Some(tag) = url.strip_prefix(JSON_AUTHORITY) {
            if tag.is_empty() {
                return Err(unknown());
            }
            Ok(TypeUrl::Json(tag.to_string()))
        } else {
            Err(unknown())
        }
    }
}

impl TryFrom<String> for TypeUrl {
    type Error = CodecError;

    fn try_from(url: String) -> Result<Self, Self::Error> {
        url.parse()
    }
}

impl From<TypeUrl> for String {
    fn from(url: TypeUrl) -> Self {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_urls_are_wire_exact() {
        assert_eq!(
            TypeUrl::primitive(PrimitiveKind::String).to_string(),
            "p.akkaserverless.com/string"
        );
        assert_eq!(
            TypeUrl::primitive(PrimitiveKind::Int64).to_string(),
            "p.akkaserverless.com/int64"
        );
        assert_eq!(
            TypeUrl::primitive(PrimitiveKind::Double).to_string(),
            "p.akkaserverless.com/double"
        );
    }

    #[test]
    fn test_parse_every_namespace() {
        for kind in PrimitiveKind::ALL {
            let url = TypeUrl::primitive(kind);
            assert_eq!(url.to_string().parse::<TypeUrl>().unwrap(), url);
        }

        assert_eq!(
            "type.googleapis.com/com.example.Example".parse::<TypeUrl>().unwrap(),
            TypeUrl::message("com.example.Example")
        );
        assert_eq!(
            "json.akkaserverless.com/object".parse::<TypeUrl>().unwrap(),
            TypeUrl::json(None)
        );
    }

    #[test]
    fn test_unknown_urls_are_rejected() {
        for url in [
            "",
            "p.akkaserverless.com/float",
            "type.googleapis.com/",
            "json.akkaserverless.com/",
            "example.com/Thing",
        ] {
            assert!(
                matches!(url.parse::<TypeUrl>(), Err(CodecError::UnknownType(_))),
                "{url} should not parse"
            );
        }
    }

    #[test]
    fn test_serde_uses_string_form() {
        let url = TypeUrl::json(Some("MyType"));
        let json = serde_json::to_string(&url).unwrap();
        assert_eq!(json, "\"json.akkaserverless.com/MyType\"");

        let back: TypeUrl = serde_json::from_str(&json).unwrap();
        assert_eq!(back, url);
        assert!(serde_json::from_str::<TypeUrl>("\"nope\"").is_err());
    }
}
