// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Header field lists: `<len:u32><name>=<value>` repeated

use std::collections::HashMap;
use std::io::Read;

use crate::error::{BagError, Result};

/// Reserved field name carrying the record op code
pub const OP_FIELD: &str = "op";

/// Decoded `name=value` field list of one record
///
/// Values are kept as raw bytes; the caller decides whether a field is
/// text (one byte per character) or a little-endian integer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderFields {
    op: Option<u8>,
    fields: HashMap<String, Vec<u8>>,
}

impl HeaderFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Op code, if the list carried one
    pub fn op(&self) -> Option<u8> {
        self.op
    }

    pub fn set_op(&mut self, op: u8) {
        self.op = Some(op);
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Vec<u8>) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    /// Field decoded as single-byte-per-character text
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).map(latin1)
    }

    /// Field decoded as a little-endian u32 (first four bytes)
    pub fn get_u32(&self, name: &str) -> Option<u32> {
        let bytes = self.get(name)?;
        let array: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        Some(u32::from_le_bytes(array))
    }

    /// Field decoded as a little-endian u64 (first eight bytes)
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        let bytes = self.get(name)?;
        let array: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
        Some(u64::from_le_bytes(array))
    }

    /// Number of fields, `op` included
    pub fn len(&self) -> usize {
        self.fields.len() + usize::from(self.op.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.op
            .iter()
            .map(|_| OP_FIELD)
            .chain(self.fields.keys().map(String::as_str))
    }
}

/// Decode a field list of exactly `length` bytes
///
/// The cursor advances by exactly `length` bytes on success. A field
/// whose declared size overruns the remaining list is a framing error.
pub fn read_fields<R: Read>(reader: &mut R, length: u32) -> Result<HeaderFields> {
    let mut fields = HeaderFields::new();
    let mut remaining = i64::from(length);

    while remaining > 0 {
        let field_len = read_u32(reader)?;
        remaining -= i64::from(field_len) + 4;
        if remaining < 0 {
            return Err(BagError::framing(format!(
                "field of {} bytes overruns header by {} bytes",
                field_len, -remaining
            )));
        }

        let name = read_name(reader, field_len)?;
        let value_len = (field_len as usize)
            .checked_sub(name.len() + 1)
            .ok_or_else(|| {
                BagError::framing(format!(
                    "field '{}' does not fit its declared length of {} bytes",
                    name, field_len
                ))
            })?;

        if name == OP_FIELD {
            if value_len != 1 {
                return Err(BagError::framing(format!(
                    "op field must hold exactly one byte, found {}",
                    value_len
                )));
            }
            let mut op = [0u8; 1];
            reader.read_exact(&mut op)?;
            fields.set_op(op[0]);
        } else {
            let mut value = vec![0u8; value_len];
            reader.read_exact(&mut value)?;
            fields.insert(name, value);
        }
    }

    Ok(fields)
}

/// Append one encoded field to `buf`
pub fn write_field(buf: &mut Vec<u8>, name: &str, value: &[u8]) {
    let len = (name.len() + 1 + value.len()) as u32;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(name.as_bytes());
    buf.push(b'=');
    buf.extend_from_slice(value);
}

/// Read a little-endian u32
pub(crate) fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

/// Read the field name up to and including `=`, which is dropped
fn read_name<R: Read>(reader: &mut R, field_len: u32) -> Result<String> {
    let mut name = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        reader.read_exact(&mut byte)?;
        if byte[0] == b'=' {
            break;
        }
        name.push(byte[0]);
        if name.len() >= field_len as usize {
            return Err(BagError::framing(format!(
                "no '=' within field of {} bytes",
                field_len
            )));
        }
    }
    Ok(latin1(&name))
}

pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_fields_round_trip() {
        let mut buf = Vec::new();
        write_field(&mut buf, "op", &[7]);
        write_field(&mut buf, "topic", b"/camera/front");
        write_field(&mut buf, "conn", &3u32.to_le_bytes());

        let mut cursor = Cursor::new(buf.clone());
        let fields = read_fields(&mut cursor, buf.len() as u32).unwrap();

        assert_eq!(fields.op(), Some(7));
        assert_eq!(fields.get_string("topic").unwrap(), "/camera/front");
        assert_eq!(fields.get_u32("conn"), Some(3));
        assert_eq!(fields.len(), 3);
        assert_eq!(cursor.position(), buf.len() as u64);
    }

    #[test]
    fn test_declared_length_matches_encoded_size() {
        let fields = [("op", vec![2u8]), ("time", vec![0u8; 8]), ("x", vec![])];
        let mut buf = Vec::new();
        for (name, value) in &fields {
            write_field(&mut buf, name, value);
        }
        let expected: usize = fields
            .iter()
            .map(|(name, value)| 4 + name.len() + 1 + value.len())
            .sum();
        assert_eq!(buf.len(), expected);
    }

    #[test]
    fn test_stops_at_declared_length() {
        let mut buf = Vec::new();
        write_field(&mut buf, "op", &[3]);
        let header_len = buf.len() as u32;
        buf.extend_from_slice(b"trailing");

        let mut cursor = Cursor::new(buf);
        let fields = read_fields(&mut cursor, header_len).unwrap();
        assert_eq!(fields.op(), Some(3));
        assert_eq!(cursor.position(), u64::from(header_len));
    }

    #[test]
    fn test_overrun_is_framing_error() {
        let mut buf = Vec::new();
        write_field(&mut buf, "topic", b"/imu");

        let mut cursor = Cursor::new(buf.clone());
        let result = read_fields(&mut cursor, buf.len() as u32 - 2);
        assert!(matches!(result, Err(BagError::Framing(_))));
    }

    #[test]
    fn test_zero_length_field_is_framing_error() {
        let buf = [0, 0, 0, 0, b'=', b'x', b'y', b'z'];
        let mut cursor = Cursor::new(buf);
        let result = read_fields(&mut cursor, buf.len() as u32);
        assert!(matches!(result, Err(BagError::Framing(_))));
    }

    #[test]
    fn test_name_longer_than_field_is_framing_error() {
        let mut buf = 2u32.to_le_bytes().to_vec();
        buf.extend_from_slice(b"topic=/imu");
        let mut cursor = Cursor::new(buf.clone());
        let result = read_fields(&mut cursor, buf.len() as u32);
        assert!(matches!(result, Err(BagError::Framing(_))));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let mut buf = Vec::new();
        write_field(&mut buf, "message_definition", b"int32 A=1\n");

        let mut cursor = Cursor::new(buf.clone());
        let fields = read_fields(&mut cursor, buf.len() as u32).unwrap();
        assert_eq!(
            fields.get_string("message_definition").unwrap(),
            "int32 A=1\n"
        );
    }

    #[test]
    fn test_latin1_text() {
        assert_eq!(latin1(&[0x61, 0xE9]), "aé");
    }
}
