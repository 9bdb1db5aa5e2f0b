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

// Chunk bodies and their compression

use std::io::Read;
use tracing::{debug, warn};

use crate::bag::record::RecordHeader;
use crate::error::{BagError, Result};

/// Compression method declared by a chunk's `compression` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkCompression {
    None,
    Bz2,
    Lz4,
    Other(String),
}

impl ChunkCompression {
    pub fn parse(method: &str) -> Self {
        match method {
            "none" | "" => ChunkCompression::None,
            "bz2" => ChunkCompression::Bz2,
            "lz4" => ChunkCompression::Lz4,
            other => ChunkCompression::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChunkCompression::None => "none",
            ChunkCompression::Bz2 => "bz2",
            ChunkCompression::Lz4 => "lz4",
            ChunkCompression::Other(method) => method,
        }
    }
}

/// Chunk metadata taken from its record header
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkInfo {
    pub compression: ChunkCompression,
    /// Declared uncompressed size, used as the iteration budget
    pub size: u32,
}

impl ChunkInfo {
    pub fn from_record(record: &RecordHeader) -> Result<Self> {
        let size = record
            .fields
            .get_u32("size")
            .ok_or(BagError::MissingField {
                record: "chunk",
                field: "size",
            })?;
        let compression = record
            .fields
            .get_string("compression")
            .map(|method| ChunkCompression::parse(&method))
            .unwrap_or(ChunkCompression::None);

        Ok(Self { compression, size })
    }
}

/// Read `data_length` bytes of chunk body and undo its compression
pub fn read_chunk_body<R: Read>(
    reader: &mut R,
    data_length: u32,
    info: &ChunkInfo,
) -> Result<Vec<u8>> {
    let mut body = vec![0u8; data_length as usize];
    reader.read_exact(&mut body)?;
    decompress(body, info)
}

/// Decompress a chunk body according to its declared method
pub fn decompress(body: Vec<u8>, info: &ChunkInfo) -> Result<Vec<u8>> {
    let failed = |source: std::io::Error| BagError::Decompression {
        method: info.compression.as_str().to_string(),
        source,
    };

    let data = match &info.compression {
        ChunkCompression::None => body,
        ChunkCompression::Bz2 => {
            let mut out = Vec::with_capacity(info.size as usize);
            bzip2::read::BzDecoder::new(&body[..])
                .read_to_end(&mut out)
                .map_err(failed)?;
            out
        }
        ChunkCompression::Lz4 => {
            let mut out = Vec::with_capacity(info.size as usize);
            let mut decoder = lz4::Decoder::new(&body[..]).map_err(failed)?;
            decoder.read_to_end(&mut out).map_err(failed)?;
            out
        }
        ChunkCompression::Other(method) => {
            warn!("Unrecognized chunk compression '{}', using body verbatim", method);
            body
        }
    };

    debug!(
        "Chunk body: {} bytes ({}), {} declared uncompressed",
        data.len(),
        info.compression.as_str(),
        info.size
    );

    Ok(data)
}
