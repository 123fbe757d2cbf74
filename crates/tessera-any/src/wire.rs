//! Protobuf-compatible encoding for primitive payloads
//!
//! A primitive travels as field 1 of a single-field message:
//!
//! ```text
//! key    = (1 << 3) | wire_type          (one byte)
//! string = key 0x0A, varint length, UTF-8 bytes
//! bytes  = key 0x0A, varint length, raw bytes
//! int64  = key 0x08, two's-complement varint
//! bool   = key 0x08, varint 1
//! double = key 0x09, 8 bytes little-endian
//! ```
//!
//! Readers scan every field, skip what they do not recognize and keep the
//! last occurrence of field 1, so payloads produced by richer schemas still
//! decode.

const PRIMITIVE_FIELD: u64 = 1;
const MAX_VARINT_LEN: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireType {
    fn bits(self) -> u64 {
        match self {
            WireType::Varint => 0,
            WireType::Fixed64 => 1,
            WireType::LengthDelimited => 2,
            WireType::Fixed32 => 5,
        }
    }

    fn from_bits(bits: u64) -> Option<Self> {
        match bits {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }
}

/// A decoded field value, borrowing from the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FieldValue<'a> {
    Varint(u64),
    Fixed64([u8; 8]),
    Fixed32([u8; 4]),
    Bytes(&'a [u8]),
}

impl FieldValue<'_> {
    fn wire_type(&self) -> WireType {
        match self {
            FieldValue::Varint(_) => WireType::Varint,
            FieldValue::Fixed64(_) => WireType::Fixed64,
            FieldValue::Fixed32(_) => WireType::Fixed32,
            FieldValue::Bytes(_) => WireType::LengthDelimited,
        }
    }
}

pub(crate) fn write_varint(mut value: u64, buf: &mut Vec<u8>) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

pub(crate) fn read_varint(bytes: &[u8]) -> Option<(u64, &[u8])> {
    let mut value = 0u64;
    for (i, byte) in bytes.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, &bytes[i + 1..]));
        }
    }
    None
}

/// Encode `value` as field 1.
pub(crate) fn encode_field_one(value: FieldValue<'_>) -> Vec<u8> {
    let mut buf = Vec::new();
    write_varint((PRIMITIVE_FIELD << 3) | value.wire_type().bits(), &mut buf);

    match value {
        FieldValue::Varint(v) => write_varint(v, &mut buf),
        FieldValue::Fixed64(bytes) => buf.extend_from_slice(&bytes),
        FieldValue::Fixed32(bytes) => buf.extend_from_slice(&bytes),
        FieldValue::Bytes(bytes) => {
            write_varint(bytes.len() as u64, &mut buf);
            buf.extend_from_slice(bytes);
        }
    }
    buf
}

fn split<const N: usize>(bytes: &[u8]) -> Result<([u8; N], &[u8]), String> {
    if bytes.len() < N {
        return Err(format!("expected {} bytes, found {}", N, bytes.len()));
    }
    let (head, tail) = bytes.split_at(N);
    let mut fixed = [0u8; N];
    fixed.copy_from_slice(head);
    Ok((fixed, tail))
}

fn read_value(wire_type: WireType, bytes: &[u8]) -> Result<(FieldValue<'_>, &[u8]), String> {
    match wire_type {
        WireType::Varint => read_varint(bytes)
            .map(|(v, rest)| (FieldValue::Varint(v), rest))
            .ok_or_else(|| "truncated varint".to_string()),
        WireType::Fixed64 => split::<8>(bytes).map(|(v, rest)| (FieldValue::Fixed64(v), rest)),
        WireType::Fixed32 => split::<4>(bytes).map(|(v, rest)| (FieldValue::Fixed32(v), rest)),
        WireType::LengthDelimited => {
            let (len, rest) = read_varint(bytes).ok_or("truncated length prefix")?;
            let len = usize::try_from(len).map_err(|_| "length prefix overflows".to_string())?;
            if rest.len() < len {
                return Err(format!("length prefix {} exceeds {} remaining bytes", len, rest.len()));
            }
            let (value, rest) = rest.split_at(len);
            Ok((FieldValue::Bytes(value), rest))
        }
    }
}

/// Find the last field 1 of the expected wire type, skipping everything else.
pub(crate) fn find_field_one(
    bytes: &[u8],
    expected: WireType,
) -> Result<Option<FieldValue<'_>>, String> {
    let mut rest = bytes;
    let mut found = None;

    while !rest.is_empty() {
        let (key, tail) = read_varint(rest).ok_or("truncated field key")?;
        let wire_type = WireType::from_bits(key & 0x7)
            .ok_or_else(|| format!("unsupported wire type {}", key & 0x7))?;
        let (value, tail) = read_value(wire_type, tail)?;

        if key >> 3 == PRIMITIVE_FIELD && wire_type == expected {
            found = Some(value);
        }
        rest = tail;
    }

    Ok(found)
}
