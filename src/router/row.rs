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

// Tabular row flattening

use tracing::warn;

use crate::bag::BagTime;
use crate::connection::Connection;
use crate::decoder::{DecodedField, FieldValue};
use crate::error::Result;

/// Column names and cell values of one flattened message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRow {
    pub columns: Vec<String>,
    pub values: Vec<String>,
}

impl FlatRow {
    /// Flatten fields into columns; a tuple of N values becomes
    /// `<name>_0 .. <name>_{N-1}`
    pub fn from_fields<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = &'a DecodedField>,
    {
        let mut row = FlatRow::default();
        for field in fields {
            match &field.value {
                FieldValue::Scalar(value) => {
                    row.columns.push(field.name.clone());
                    row.values.push(value.to_string());
                }
                FieldValue::Tuple(values) => {
                    for (i, value) in values.iter().enumerate() {
                        row.columns.push(format!("{}_{}", field.name, i));
                        row.values.push(value.to_string());
                    }
                }
            }
        }
        row
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Fields named in `selection`, in selection order
///
/// Falls back to every field when none of the names is present.
pub fn select_fields<'a>(fields: &'a [DecodedField], selection: &[&str]) -> Vec<&'a DecodedField> {
    let selected: Vec<&DecodedField> = selection
        .iter()
        .filter_map(|name| fields.iter().find(|f| f.name == *name))
        .collect();

    if selected.is_empty() {
        fields.iter().collect()
    } else {
        selected
    }
}

/// Append `Time, ISOTime, <columns>` to the connection's table
///
/// The header comes from the first row written. Later rows are not
/// reshaped; a different column count is reported once per connection.
pub fn write_row(connection: &mut Connection, time: BagTime, row: FlatRow) -> Result<()> {
    match connection.header_columns() {
        None => {
            let header = ["Time".to_string(), "ISOTime".to_string()]
                .into_iter()
                .chain(row.columns.iter().cloned());
            connection.table().write_row(header)?;
            connection.mark_header_written(row.len());
        }
        Some(columns) if columns != row.len() => {
            if connection.take_shape_warning() {
                warn!(
                    "Topic '{}' changed shape: header has {} columns, message has {}; columns will not line up",
                    connection.info.topic,
                    columns,
                    row.len()
                );
            }
        }
        Some(_) => {}
    }

    let cells = [time.raw().to_string(), time.iso()]
        .into_iter()
        .chain(row.values);
    connection.table().write_row(cells)
}
