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

/// Message definition text parsing
///
/// A connection's definition holds the root message followed by every
/// dependency, each introduced by a separator line and a `MSG:` line:
///
/// ```text
/// Header header
/// geometry_msgs/Point position
/// ================================================================================
/// MSG: std_msgs/Header
/// uint32 seq
/// time stamp
/// string frame_id
/// ================================================================================
/// MSG: geometry_msgs/Point
/// float64 x
/// float64 y
/// float64 z
/// ```
use std::collections::HashMap;

use crate::error::{BagError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Bool,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    String,
    Time,
    Duration,
}

impl Primitive {
    pub fn parse(name: &str) -> Option<Self> {
        let primitive = match name {
            "bool" => Primitive::Bool,
            "int8" | "byte" => Primitive::Int8,
            "uint8" | "char" => Primitive::UInt8,
            "int16" => Primitive::Int16,
            "uint16" => Primitive::UInt16,
            "int32" => Primitive::Int32,
            "uint32" => Primitive::UInt32,
            "int64" => Primitive::Int64,
            "uint64" => Primitive::UInt64,
            "float32" => Primitive::Float32,
            "float64" => Primitive::Float64,
            "string" => Primitive::String,
            "time" => Primitive::Time,
            "duration" => Primitive::Duration,
            _ => return None,
        };
        Some(primitive)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Primitive(Primitive),
    /// Fully qualified message type (`pkg/Name`)
    Message(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    Scalar,
    Fixed(usize),
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
    pub array: ArrayKind,
}

/// Parsed definition with every dependency resolved
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSchema {
    pub root: Vec<FieldDef>,
    pub types: HashMap<String, Vec<FieldDef>>,
}

impl MessageSchema {
    pub fn parse(definition: &str) -> Result<Self> {
        let mut sections = split_sections(definition).into_iter();
        let (_, root_lines) = sections.next().unwrap_or((None, Vec::new()));

        let mut raw_types = HashMap::new();
        for (name, lines) in sections {
            let name = name.ok_or_else(|| {
                BagError::decode("definition section without a 'MSG:' line")
            })?;
            raw_types.insert(name, lines);
        }

        let names: Vec<String> = raw_types.keys().cloned().collect();
        let mut types = HashMap::new();
        for (name, lines) in &raw_types {
            let package = name.split('/').next();
            types.insert(name.clone(), parse_fields(lines, package, &names)?);
        }
        let root = parse_fields(&root_lines, None, &names)?;

        Ok(Self { root, types })
    }

    pub fn fields_of(&self, type_name: &str) -> Result<&[FieldDef]> {
        self.types
            .get(type_name)
            .map(Vec::as_slice)
            .ok_or_else(|| BagError::decode(format!("definition of '{}' missing", type_name)))
    }
}

fn split_sections(definition: &str) -> Vec<(Option<String>, Vec<&str>)> {
    let mut sections = vec![(None, Vec::new())];
    for line in definition.lines() {
        let trimmed = line.trim();
        if trimmed.len() >= 3 && trimmed.chars().all(|c| c == '=') {
            sections.push((None, Vec::new()));
            continue;
        }
        let Some(current) = sections.last_mut() else {
            continue;
        };
        if let Some(name) = trimmed.strip_prefix("MSG:") {
            if current.0.is_none() {
                current.0 = Some(name.trim().to_string());
                continue;
            }
        }
        current.1.push(line);
    }
    sections
}

fn parse_fields(lines: &[&str], package: Option<&str>, known: &[String]) -> Result<Vec<FieldDef>> {
    let mut fields = Vec::new();
    for line in lines {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut tokens = line.splitn(2, char::is_whitespace);
        let type_token = tokens.next().unwrap_or_default();
        let rest = tokens.next().unwrap_or_default().trim();

        // Constants
        if rest.contains('=') {
            continue;
        }
        if rest.is_empty() {
            return Err(BagError::decode(format!("field without a name: '{}'", line)));
        }

        let (base, array) = parse_array(type_token)?;
        let ty = match Primitive::parse(base) {
            Some(primitive) => FieldType::Primitive(primitive),
            None => FieldType::Message(resolve_type(base, package, known)?),
        };

        fields.push(FieldDef {
            name: rest.to_string(),
            ty,
            array,
        });
    }
    Ok(fields)
}

fn parse_array(token: &str) -> Result<(&str, ArrayKind)> {
    let Some(open) = token.find('[') else {
        return Ok((token, ArrayKind::Scalar));
    };
    let inner = token[open + 1..]
        .strip_suffix(']')
        .ok_or_else(|| BagError::decode(format!("malformed array type '{}'", token)))?;
    let array = if inner.is_empty() {
        ArrayKind::Dynamic
    } else {
        let len = inner
            .parse()
            .map_err(|_| BagError::decode(format!("malformed array length '{}'", token)))?;
        ArrayKind::Fixed(len)
    };
    Ok((&token[..open], array))
}

fn resolve_type(name: &str, package: Option<&str>, known: &[String]) -> Result<String> {
    if name == "Header" {
        return Ok("std_msgs/Header".to_string());
    }
    if name.contains('/') {
        return Ok(name.to_string());
    }
    if let Some(package) = package {
        let qualified = format!("{}/{}", package, name);
        if known.contains(&qualified) {
            return Ok(qualified);
        }
    }
    known
        .iter()
        .find(|candidate| candidate.rsplit('/').next() == Some(name))
        .cloned()
        .ok_or_else(|| BagError::decode(format!("cannot resolve message type '{}'", name)))
}
