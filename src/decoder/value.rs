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

use std::fmt;

/// One decoded scalar
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Time { secs: u32, nsecs: u32 },
    Duration { secs: i32, nsecs: i32 },
    /// Packed byte arrays (`uint8[]`, `char[]`)
    Bytes(Vec<u8>),
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Int(v) => serde_json::Value::from(*v),
            Value::UInt(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Value::from(*v),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            // Debug keeps the fractional part on integral floats (1.0, not 1)
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Text(s) => f.write_str(s),
            Value::Time { secs, nsecs } => write!(f, "{}.{:09}", secs, nsecs),
            Value::Duration { secs, nsecs } => {
                let sign = if *secs < 0 || *nsecs < 0 { "-" } else { "" };
                write!(
                    f,
                    "{}{}.{:09}",
                    sign,
                    secs.unsigned_abs(),
                    nsecs.unsigned_abs()
                )
            }
            Value::Bytes(b) => f.write_str(&hex::encode(b)),
        }
    }
}

/// A field is either one value or a fixed-shape tuple of values
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Value),
    Tuple(Vec<Value>),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            FieldValue::Tuple(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Scalar(v) => v.to_json(),
            FieldValue::Tuple(values) => {
                serde_json::Value::Array(values.iter().map(Value::to_json).collect())
            }
        }
    }
}

/// Named field in decoder output order
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    pub name: String,
    pub value: FieldValue,
}

impl DecodedField {
    pub fn scalar(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Scalar(value),
        }
    }

    pub fn tuple(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Tuple(values),
        }
    }
}

/// First field with the given name
pub fn find<'a>(fields: &'a [DecodedField], name: &str) -> Option<&'a FieldValue> {
    fields.iter().find(|f| f.name == name).map(|f| &f.value)
}

/// First scalar field with the given name
pub fn find_scalar<'a>(fields: &'a [DecodedField], name: &str) -> Option<&'a Value> {
    find(fields, name).and_then(FieldValue::as_scalar)
}
