//! Clarity value wire-format decoder.
//!
//! Decodes the consensus serialization of Clarity values into JSON
//! descriptions. Covers every value type id; nesting is depth-limited so
//! hostile payloads cannot blow the stack.

use serde_json::{json, Value};

use super::c32::c32_address;

/// Maximum nesting depth accepted.
const MAX_DEPTH: usize = 32;

/// Clarity decode failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClarityError {
    #[error("unexpected end of input at byte {0}")]
    Truncated(usize),
    #[error("unknown clarity type id {0:#04x}")]
    UnknownTypeId(u8),
    #[error("value nesting exceeds depth limit")]
    TooDeep,
    #[error("invalid name encoding")]
    BadName,
    #[error("trailing bytes after value")]
    TrailingBytes,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ClarityError> {
        if self.pos + n > self.bytes.len() {
            return Err(ClarityError::Truncated(self.pos));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClarityError> {
        Ok(self.take(1)?[0])
    }

    fn u32_be(&mut self) -> Result<u32, ClarityError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u128_be(&mut self) -> Result<u128, ClarityError> {
        let b = self.take(16)?;
        let mut buf = [0u8; 16];
        buf.copy_from_slice(b);
        Ok(u128::from_be_bytes(buf))
    }

    fn name(&mut self) -> Result<String, ClarityError> {
        let len = self.u8()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ClarityError::BadName)
    }

    fn principal(&mut self) -> Result<String, ClarityError> {
        let version = self.u8()?;
        let hash = self.take(20)?;
        let mut h = [0u8; 20];
        h.copy_from_slice(hash);
        Ok(c32_address(version, &h))
    }
}

/// Decodes one Clarity value; the whole input must be consumed.
pub fn decode_clarity_value(bytes: &[u8]) -> Result<Value, ClarityError> {
    let mut reader = Reader::new(bytes);
    let value = decode_value(&mut reader, 0)?;
    if reader.pos != reader.bytes.len() {
        return Err(ClarityError::TrailingBytes);
    }
    Ok(value)
}

fn decode_value(r: &mut Reader<'_>, depth: usize) -> Result<Value, ClarityError> {
    if depth > MAX_DEPTH {
        return Err(ClarityError::TooDeep);
    }
    let type_id = r.u8()?;
    match type_id {
        0x00 => {
            let raw = r.u128_be()?;
            let signed = raw as i128;
            Ok(json!({"type": "int", "value": signed.to_string()}))
        }
        0x01 => {
            let raw = r.u128_be()?;
            Ok(json!({"type": "uint", "value": raw.to_string()}))
        }
        0x02 => {
            let len = r.u32_be()? as usize;
            let data = r.take(len)?;
            Ok(json!({"type": "buffer", "value": format!("0x{}", hex::encode(data))}))
        }
        0x03 => Ok(json!({"type": "bool", "value": true})),
        0x04 => Ok(json!({"type": "bool", "value": false})),
        0x05 => {
            let address = r.principal()?;
            Ok(json!({"type": "principal", "value": address}))
        }
        0x06 => {
            let address = r.principal()?;
            let name = r.name()?;
            Ok(json!({"type": "contract", "value": format!("{address}.{name}")}))
        }
        0x07 => {
            let inner = decode_value(r, depth + 1)?;
            Ok(json!({"type": "response", "ok": true, "value": inner}))
        }
        0x08 => {
            let inner = decode_value(r, depth + 1)?;
            Ok(json!({"type": "response", "ok": false, "value": inner}))
        }
        0x09 => Ok(json!({"type": "none"})),
        0x0a => {
            let inner = decode_value(r, depth + 1)?;
            Ok(json!({"type": "some", "value": inner}))
        }
        0x0b => {
            let count = r.u32_be()? as usize;
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                items.push(decode_value(r, depth + 1)?);
            }
            Ok(json!({"type": "list", "value": items}))
        }
        0x0c => {
            let count = r.u32_be()? as usize;
            let mut entries = serde_json::Map::new();
            for _ in 0..count {
                let name = r.name()?;
                let value = decode_value(r, depth + 1)?;
                entries.insert(name, value);
            }
            Ok(json!({"type": "tuple", "value": Value::Object(entries)}))
        }
        0x0d => {
            let len = r.u32_be()? as usize;
            let data = r.take(len)?;
            let text = String::from_utf8_lossy(data).into_owned();
            Ok(json!({"type": "string-ascii", "value": text}))
        }
        0x0e => {
            let len = r.u32_be()? as usize;
            let data = r.take(len)?;
            let text = String::from_utf8_lossy(data).into_owned();
            Ok(json!({"type": "string-utf8", "value": text}))
        }
        other => Err(ClarityError::UnknownTypeId(other)),
    }
}
