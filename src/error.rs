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

//! Error types for bag extraction

/// Result type alias
pub type Result<T> = std::result::Result<T, BagError>;

/// Errors raised while reading a bag and producing its artifacts
///
/// Everything except the variants the reader explicitly recovers from
/// (unknown op codes are never surfaced as errors) aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum BagError {
    /// I/O error, including a stream truncated inside a record
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record boundaries can no longer be trusted
    #[error("Framing error: {0}")]
    Framing(String),

    /// Version line did not announce a 2.0 container
    #[error("Unsupported bag version: '{0}'. Only V2.0 is supported")]
    UnsupportedVersion(String),

    /// A required header field is absent
    #[error("Record '{record}' is missing required field '{field}'")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    /// Message references a connection never declared
    #[error("Unknown connection id {0}")]
    UnknownConnection(u32),

    /// Connection id declared twice with different metadata
    #[error("Duplicate connection id {0}")]
    DuplicateConnection(u32),

    /// Chunk body could not be decompressed
    #[error("Failed to decompress {method} chunk: {source}")]
    Decompression {
        method: String,
        #[source]
        source: std::io::Error,
    },

    /// Message payload did not match its definition
    #[error("Message decode error: {0}")]
    Decode(String),

    /// Image pixel encoding has no known layout
    #[error("Unsupported image encoding '{0}'")]
    UnsupportedEncoding(String),

    /// Image message is inconsistent (dimensions vs. payload)
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Frame could not be written
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Upload worker is gone
    #[error("Upload queue closed")]
    QueueClosed,
}

impl BagError {
    pub(crate) fn framing(message: impl Into<String>) -> Self {
        BagError::Framing(message.into())
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        BagError::Decode(message.into())
    }
}
