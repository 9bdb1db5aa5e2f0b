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

// Comma-delimited table files

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

const DELIMITER: char = ',';

/// Append-only CSV writer backing one channel
pub struct TableWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    rows: usize,
}

impl TableWriter {
    /// Create the file (and missing parent directories), truncating it
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far, header included
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    pub fn write_row<I, S>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Some(writer) = self.writer.as_mut() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("table {} already closed", self.path.display()),
            )
            .into());
        };

        let mut line = String::new();
        for (i, cell) in cells.into_iter().enumerate() {
            if i > 0 {
                line.push(DELIMITER);
            }
            push_cell(&mut line, cell.as_ref());
        }
        line.push_str("\r\n");

        writer.write_all(line.as_bytes())?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and release the file handle; later calls are no-ops
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

fn push_cell(line: &mut String, cell: &str) {
    if cell.contains([DELIMITER, '"', '\n', '\r']) {
        line.push('"');
        line.push_str(&cell.replace('"', "\"\""));
        line.push('"');
    } else {
        line.push_str(cell);
    }
}
