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

// Bag reader
//
// Drives the record framer over one sequential stream. The top-level
// stream and every chunk body go through the same region decoder; only
// the byte budget differs. Connection state, the router and the upload
// queue are owned here until `finalize`.

use std::io::{Cursor, ErrorKind, Read};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::bag::chunk::{read_chunk_body, ChunkInfo};
use crate::bag::record::{read_connection_header, read_record_header, RecordHeader, RecordKind};
use crate::bag::time::BagTime;
use crate::connection::{ConnectionInfo, ConnectionRegistry};
use crate::decoder::MessageDecoder;
use crate::error::{BagError, Result};
use crate::router::{DecodedMessage, MessageRouter};
use crate::upload::UploadQueue;

/// Longest accepted version line
const MAX_VERSION_LINE: usize = 4096;

const SUPPORTED_VERSION: &str = "2.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    ExpectVersionLine,
    ReadingRecords,
    Done,
}

/// How far a region may extend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Budget {
    /// Until end of stream
    Unbounded,
    /// Until this many framed bytes were consumed
    Bytes(i64),
}

/// Counters for one read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub records: u64,
    pub connections: u64,
    pub chunks: u64,
    pub messages: u64,
    /// Index and unknown records
    pub skipped: u64,
}

pub struct BagReader<D: MessageDecoder> {
    state: ReaderState,
    registry: ConnectionRegistry,
    router: MessageRouter,
    decoder: D,
    uploads: UploadQueue,
    stats: ReadStats,
}

impl<D: MessageDecoder> BagReader<D> {
    /// Reader writing every channel's artifacts under `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>, decoder: D, uploads: UploadQueue) -> Self {
        let output_dir = output_dir.into();
        Self {
            state: ReaderState::ExpectVersionLine,
            registry: ConnectionRegistry::new(output_dir.clone()),
            router: MessageRouter::new(output_dir),
            decoder,
            uploads,
            stats: ReadStats::default(),
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &ReadStats {
        &self.stats
    }

    /// Read the whole stream, then finalize every connection
    ///
    /// Any error is fatal: connections are left open and nothing more is
    /// queued for upload.
    pub fn read<R: Read>(&mut self, reader: &mut R) -> Result<ReadStats> {
        loop {
            match self.state {
                ReaderState::ExpectVersionLine => {
                    let line = read_version_line(reader)?;
                    if !line.contains(SUPPORTED_VERSION) {
                        return Err(BagError::UnsupportedVersion(line));
                    }
                    info!("Reading bag '{}'", line.trim());
                    self.state = ReaderState::ReadingRecords;
                }
                ReaderState::ReadingRecords => {
                    self.decode_region(reader, Budget::Unbounded, false)?;
                    self.state = ReaderState::Done;
                }
                ReaderState::Done => break,
            }
        }

        self.finalize()?;

        info!(
            "Read {} records: {} connections, {} chunks, {} messages, {} skipped",
            self.stats.records,
            self.stats.connections,
            self.stats.chunks,
            self.stats.messages,
            self.stats.skipped
        );
        Ok(self.stats.clone())
    }

    /// Close every connection table and queue it for upload
    pub fn finalize(&mut self) -> Result<()> {
        for path in self.registry.finalize_all()? {
            self.uploads.push_table(path)?;
        }
        Ok(())
    }

    fn decode_region<R: Read>(&mut self, reader: &mut R, budget: Budget, in_chunk: bool) -> Result<()> {
        let mut remaining = match budget {
            Budget::Unbounded => None,
            Budget::Bytes(size) => Some(size),
        };

        loop {
            if matches!(remaining, Some(left) if left <= 0) {
                break;
            }
            let Some(record) = read_record_header(reader)? else {
                break;
            };
            self.stats.records += 1;

            match record.kind()? {
                RecordKind::BagHeader => {
                    debug!("Skipping bag header ({} bytes)", record.data_length);
                    skip_data(reader, record.data_length)?;
                }
                RecordKind::Connection => self.handle_connection(reader, &record)?,
                RecordKind::Chunk if !in_chunk => self.handle_chunk(reader, &record)?,
                RecordKind::Message => self.handle_message(reader, &record)?,
                kind @ (RecordKind::IndexData | RecordKind::ChunkInfo) => {
                    debug!("Skipping {:?} record ({} bytes)", kind, record.data_length);
                    self.stats.skipped += 1;
                    skip_data(reader, record.data_length)?;
                }
                RecordKind::Chunk | RecordKind::Unknown(_) => {
                    warn!(
                        "Skipping record with unexpected op {:?} ({} bytes)",
                        record.fields.op(),
                        record.data_length
                    );
                    self.stats.skipped += 1;
                    skip_data(reader, record.data_length)?;
                }
            }

            if let Some(left) = remaining.as_mut() {
                *left -= record.framed_size();
            }
        }
        Ok(())
    }

    fn handle_connection<R: Read>(&mut self, reader: &mut R, record: &RecordHeader) -> Result<()> {
        let data = read_data(reader, record.data_length)?;
        let embedded = read_connection_header(&data)?;
        let info = ConnectionInfo::from_records(record, &embedded)?;

        // Index sections repeat every connection record
        if let Some(existing) = self.registry.get(info.id) {
            if existing.info == info {
                debug!("Connection {} '{}' declared again, ignoring", info.id, info.topic);
                return Ok(());
            }
        }

        self.registry.register(info)?;
        self.stats.connections += 1;
        Ok(())
    }

    fn handle_chunk<R: Read>(&mut self, reader: &mut R, record: &RecordHeader) -> Result<()> {
        let info = ChunkInfo::from_record(record)?;
        let body = read_chunk_body(reader, record.data_length, &info)?;
        debug!(
            "Expanding {} chunk: {} bytes stored, {} declared",
            info.compression.as_str(),
            record.data_length,
            info.size
        );
        self.stats.chunks += 1;

        let mut cursor = Cursor::new(body);
        self.decode_region(&mut cursor, Budget::Bytes(i64::from(info.size)), true)
    }

    fn handle_message<R: Read>(&mut self, reader: &mut R, record: &RecordHeader) -> Result<()> {
        let id = record.fields.get_u32("conn").ok_or(BagError::MissingField {
            record: "message",
            field: "conn",
        })?;
        let time = record.fields.get_u64("time").ok_or(BagError::MissingField {
            record: "message",
            field: "time",
        })?;
        let data = read_data(reader, record.data_length)?;

        let connection = self.registry.lookup(id)?;
        let fields = self.decoder.decode(
            &connection.info.type_signature,
            &connection.info.definition,
            &data,
        )?;
        let message = DecodedMessage {
            connection: id,
            time: BagTime::from_raw(time),
            fields,
        };

        self.router.route(connection, &message, &self.uploads)?;
        self.stats.messages += 1;
        Ok(())
    }
}

/// Read the newline-terminated version line, without the newline
fn read_version_line<R: Read>(reader: &mut R) -> Result<String> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) if byte[0] == b'\n' => break,
            Ok(_) => {
                if line.len() == MAX_VERSION_LINE {
                    return Err(BagError::UnsupportedVersion(
                        String::from_utf8_lossy(&line[..64]).into_owned(),
                    ));
                }
                line.push(byte[0]);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}

fn read_data<R: Read>(reader: &mut R, length: u32) -> Result<Vec<u8>> {
    let mut data = vec![0u8; length as usize];
    reader.read_exact(&mut data)?;
    Ok(data)
}

fn skip_data<R: Read>(reader: &mut R, length: u32) -> Result<()> {
    let skipped = std::io::copy(&mut reader.by_ref().take(u64::from(length)), &mut std::io::sink())?;
    if skipped < u64::from(length) {
        return Err(BagError::Io(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            format!("record data truncated: {} of {} bytes", skipped, length),
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_line() {
        let mut input = Cursor::new(b"#ROSBAG V2.0\nrest".to_vec());
        assert_eq!(read_version_line(&mut input).unwrap(), "#ROSBAG V2.0");

        let mut rest = String::new();
        input.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "rest");
    }

    #[test]
    fn test_version_line_too_long() {
        let mut input = Cursor::new(vec![b'#'; MAX_VERSION_LINE + 10]);
        assert!(matches!(
            read_version_line(&mut input),
            Err(BagError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_skip_data_truncated() {
        let mut input = Cursor::new(vec![0u8; 3]);
        assert!(matches!(skip_data(&mut input, 8), Err(BagError::Io(_))));
    }
}
