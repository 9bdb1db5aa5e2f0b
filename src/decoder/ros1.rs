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

// ROS1 serialization decoder driven by definition text

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::schema::{ArrayKind, FieldDef, FieldType, MessageSchema, Primitive};
use super::value::{DecodedField, FieldValue, Value};
use super::MessageDecoder;
use crate::error::{BagError, Result};

/// Decodes little-endian ROS1 payloads into flattened fields
///
/// Nested messages are flattened into dot-joined names
/// (`pose.pose.position.x`). Primitive arrays become tuples, byte arrays
/// a single bytes value, and arrays of messages a tuple of JSON texts.
/// Parsed schemas are cached per type signature.
#[derive(Default)]
pub struct Ros1Decoder {
    schemas: HashMap<String, Arc<MessageSchema>>,
}

impl Ros1Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema(&mut self, type_signature: &str, definition: &str) -> Result<Arc<MessageSchema>> {
        let key = if type_signature.is_empty() {
            definition
        } else {
            type_signature
        };
        if let Some(schema) = self.schemas.get(key) {
            return Ok(schema.clone());
        }

        let schema = Arc::new(MessageSchema::parse(definition)?);
        debug!(
            "Parsed definition for signature '{}' ({} root fields)",
            type_signature,
            schema.root.len()
        );
        self.schemas.insert(key.to_string(), schema.clone());
        Ok(schema)
    }
}

impl MessageDecoder for Ros1Decoder {
    fn decode(
        &mut self,
        type_signature: &str,
        definition: &str,
        data: &[u8],
    ) -> Result<Vec<DecodedField>> {
        let schema = self.schema(type_signature, definition)?;
        let mut reader = ByteReader::new(data);
        let mut out = Vec::with_capacity(schema.root.len());
        decode_fields(&schema, &schema.root, "", &mut reader, &mut out)?;

        if reader.remaining() > 0 {
            debug!(
                "{} trailing bytes after message with signature '{}'",
                reader.remaining(),
                type_signature
            );
        }
        Ok(out)
    }
}

fn decode_fields(
    schema: &MessageSchema,
    fields: &[FieldDef],
    prefix: &str,
    reader: &mut ByteReader<'_>,
    out: &mut Vec<DecodedField>,
) -> Result<()> {
    for field in fields {
        let name = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{}.{}", prefix, field.name)
        };

        match (&field.ty, field.array) {
            (FieldType::Primitive(primitive), ArrayKind::Scalar) => {
                out.push(DecodedField::scalar(name, reader.primitive(*primitive)?));
            }
            (FieldType::Primitive(Primitive::UInt8), array) => {
                let len = reader.array_len(array)?;
                let bytes = reader.take(len)?.to_vec();
                out.push(DecodedField::scalar(name, Value::Bytes(bytes)));
            }
            (FieldType::Primitive(primitive), array) => {
                let len = reader.array_len(array)?;
                let mut values = Vec::with_capacity(len.min(reader.remaining()));
                for _ in 0..len {
                    values.push(reader.primitive(*primitive)?);
                }
                out.push(DecodedField::tuple(name, values));
            }
            (FieldType::Message(type_name), ArrayKind::Scalar) => {
                let nested = schema.fields_of(type_name)?;
                decode_fields(schema, nested, &name, reader, out)?;
            }
            (FieldType::Message(type_name), array) => {
                let nested = schema.fields_of(type_name)?;
                let len = reader.array_len(array)?;
                let mut values = Vec::with_capacity(len.min(reader.remaining()));
                for _ in 0..len {
                    let mut element = Vec::with_capacity(nested.len());
                    decode_fields(schema, nested, "", reader, &mut element)?;
                    let object: serde_json::Map<String, serde_json::Value> = element
                        .into_iter()
                        .map(|f| (f.name, f.value.to_json()))
                        .collect();
                    values.push(Value::Text(serde_json::Value::Object(object).to_string()));
                }
                out.push(DecodedField {
                    name,
                    value: FieldValue::Tuple(values),
                });
            }
        }
    }
    Ok(())
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(BagError::decode(format!(
                "payload truncated: need {} bytes at offset {}, {} left",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let data = self.data;
        let slice = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(self.take(N)?);
        Ok(bytes)
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn array_len(&mut self, array: ArrayKind) -> Result<usize> {
        match array {
            ArrayKind::Fixed(len) => Ok(len),
            ArrayKind::Dynamic => Ok(self.u32()? as usize),
            ArrayKind::Scalar => Ok(1),
        }
    }

    fn primitive(&mut self, primitive: Primitive) -> Result<Value> {
        let value = match primitive {
            Primitive::Bool => Value::Bool(self.array::<1>()?[0] != 0),
            Primitive::Int8 => Value::Int(i8::from_le_bytes(self.array()?).into()),
            Primitive::UInt8 => Value::UInt(self.array::<1>()?[0].into()),
            Primitive::Int16 => Value::Int(i16::from_le_bytes(self.array()?).into()),
            Primitive::UInt16 => Value::UInt(u16::from_le_bytes(self.array()?).into()),
            Primitive::Int32 => Value::Int(self.i32()?.into()),
            Primitive::UInt32 => Value::UInt(self.u32()?.into()),
            Primitive::Int64 => Value::Int(i64::from_le_bytes(self.array()?)),
            Primitive::UInt64 => Value::UInt(u64::from_le_bytes(self.array()?)),
            Primitive::Float32 => Value::Float(f32::from_le_bytes(self.array()?).into()),
            Primitive::Float64 => Value::Float(f64::from_le_bytes(self.array()?)),
            Primitive::String => {
                let len = self.u32()? as usize;
                Value::Text(String::from_utf8_lossy(self.take(len)?).into_owned())
            }
            Primitive::Time => Value::Time {
                secs: self.u32()?,
                nsecs: self.u32()?,
            },
            Primitive::Duration => Value::Duration {
                secs: self.i32()?,
                nsecs: self.i32()?,
            },
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::value::find;

    const POINT_DEF: &str = "\
Header header
geometry_msgs/Point position
================================================================================
MSG: std_msgs/Header
uint32 seq
time stamp
string frame_id
================================================================================
MSG: geometry_msgs/Point
float64 x
float64 y
float64 z
";

    fn encode_header(buf: &mut Vec<u8>, seq: u32, frame: &str) {
        buf.extend_from_slice(&seq.to_le_bytes());
        buf.extend_from_slice(&10u32.to_le_bytes());
        buf.extend_from_slice(&20u32.to_le_bytes());
        buf.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        buf.extend_from_slice(frame.as_bytes());
    }

    #[test]
    fn test_nested_fields_are_flattened() {
        let mut data = Vec::new();
        encode_header(&mut data, 7, "map");
        for v in [1.0f64, 2.0, 3.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }

        let mut decoder = Ros1Decoder::new();
        let fields = decoder.decode("sig", POINT_DEF, &data).unwrap();
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "header.seq",
                "header.stamp",
                "header.frame_id",
                "position.x",
                "position.y",
                "position.z"
            ]
        );
        assert_eq!(
            find(&fields, "header.frame_id"),
            Some(&FieldValue::Scalar(Value::Text("map".to_string())))
        );
        assert_eq!(
            find(&fields, "position.z"),
            Some(&FieldValue::Scalar(Value::Float(3.0)))
        );
    }

    #[test]
    fn test_arrays() {
        let def = "float32[3] gains\nuint8[] blob\nint16[] deltas\n";
        let mut data = Vec::new();
        for v in [0.5f32, 1.5, 2.5] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&[0xAA, 0xBB]);
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&(-1i16).to_le_bytes());
        data.extend_from_slice(&5i16.to_le_bytes());

        let fields = Ros1Decoder::new().decode("", def, &data).unwrap();
        assert_eq!(
            fields[0].value,
            FieldValue::Tuple(vec![Value::Float(0.5), Value::Float(1.5), Value::Float(2.5)])
        );
        assert_eq!(
            fields[1].value,
            FieldValue::Scalar(Value::Bytes(vec![0xAA, 0xBB]))
        );
        assert_eq!(
            fields[2].value,
            FieldValue::Tuple(vec![Value::Int(-1), Value::Int(5)])
        );
    }

    #[test]
    fn test_message_arrays_render_as_json() {
        let def = "\
Pair[] pairs
================================================================================
MSG: test_msgs/Pair
int32 a
bool b
";
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&4i32.to_le_bytes());
        data.push(1);

        let fields = Ros1Decoder::new().decode("pairsig", def, &data).unwrap();
        assert_eq!(
            fields[0].value,
            FieldValue::Tuple(vec![Value::Text(r#"{"a":4,"b":true}"#.to_string())])
        );
    }

    #[test]
    fn test_truncated_payload_is_error() {
        let result = Ros1Decoder::new().decode("", "float64 x\n", &[0u8; 4]);
        assert!(matches!(result, Err(BagError::Decode(_))));
    }

    #[test]
    fn test_schema_cached_per_signature() {
        let mut decoder = Ros1Decoder::new();
        decoder.decode("abc", "uint8 x\n", &[1]).unwrap();
        decoder.decode("abc", "uint8 x\n", &[2]).unwrap();
        assert_eq!(decoder.schemas.len(), 1);
    }
}
