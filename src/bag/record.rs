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

/// Record framing for the bag container
///
/// Every record is laid out as:
///
/// ```text
/// <header_len:u32> <field list: header_len bytes> <data_len:u32> <data: data_len bytes>
/// ```
///
/// The framer only decodes the header part. Callers consume exactly
/// `data_length` bytes afterwards so the cursor stays aligned.
use std::io::{Cursor, ErrorKind, Read};

use crate::bag::header::{read_fields, read_u32, HeaderFields};
use crate::error::{BagError, Result};

pub const OP_MESSAGE: u8 = 0x02;
pub const OP_BAG_HEADER: u8 = 0x03;
pub const OP_INDEX_DATA: u8 = 0x04;
pub const OP_CHUNK: u8 = 0x05;
pub const OP_CHUNK_INFO: u8 = 0x06;
pub const OP_CONNECTION: u8 = 0x07;

/// Record kinds selected by the `op` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Message,
    BagHeader,
    IndexData,
    Chunk,
    ChunkInfo,
    Connection,
    Unknown(u8),
}

impl RecordKind {
    pub fn from_op(op: u8) -> Self {
        match op {
            OP_MESSAGE => RecordKind::Message,
            OP_BAG_HEADER => RecordKind::BagHeader,
            OP_INDEX_DATA => RecordKind::IndexData,
            OP_CHUNK => RecordKind::Chunk,
            OP_CHUNK_INFO => RecordKind::ChunkInfo,
            OP_CONNECTION => RecordKind::Connection,
            other => RecordKind::Unknown(other),
        }
    }
}

/// Decoded header of one record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordHeader {
    pub fields: HeaderFields,
    /// Bytes taken by the field list, excluding its length prefix
    pub header_length: u32,
    /// Bytes in the trailing data section, excluding its length prefix
    pub data_length: u32,
}

impl RecordHeader {
    pub fn kind(&self) -> Result<RecordKind> {
        self.fields
            .op()
            .map(RecordKind::from_op)
            .ok_or(BagError::MissingField {
                record: "record",
                field: "op",
            })
    }

    /// Bytes this record occupies in its enclosing stream
    pub fn framed_size(&self) -> i64 {
        i64::from(self.header_length) + i64::from(self.data_length) + 8
    }
}

/// Decode the next record header
///
/// Returns `Ok(None)` at end of stream: either an explicit zero header
/// length or a stream that ends exactly on a record boundary.
pub fn read_record_header<R: Read>(reader: &mut R) -> Result<Option<RecordHeader>> {
    let header_length = match read_length_prefix(reader)? {
        Some(0) | None => return Ok(None),
        Some(len) => len,
    };

    let fields = read_fields(reader, header_length)?;
    let data_length = read_u32(reader)?;

    Ok(Some(RecordHeader {
        fields,
        header_length,
        data_length,
    }))
}

/// Decode the connection header held in a connection record's data
///
/// The field list spans the whole of `data`. A trailing data length is
/// read when present and defaults to zero otherwise.
pub fn read_connection_header(data: &[u8]) -> Result<RecordHeader> {
    let header_length = u32::try_from(data.len())
        .map_err(|_| BagError::framing("connection header larger than 4 GiB"))?;
    let mut cursor = Cursor::new(data);
    let fields = read_fields(&mut cursor, header_length)?;

    let data_length = match read_length_prefix(&mut cursor)? {
        Some(len) => len,
        None => 0,
    };

    Ok(RecordHeader {
        fields,
        header_length,
        data_length,
    })
}

/// Append one framed record to `buf`
pub fn write_record(buf: &mut Vec<u8>, header: &[u8], data: &[u8]) {
    buf.extend_from_slice(&(header.len() as u32).to_le_bytes());
    buf.extend_from_slice(header);
    buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
    buf.extend_from_slice(data);
}

/// Read a u32 prefix, `None` if the stream is already exhausted
fn read_length_prefix<R: Read>(reader: &mut R) -> Result<Option<u32>> {
    let mut bytes = [0u8; 4];
    let mut filled = 0;
    while filled < bytes.len() {
        match reader.read(&mut bytes[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    match filled {
        0 => Ok(None),
        4 => Ok(Some(u32::from_le_bytes(bytes))),
        n => Err(BagError::framing(format!(
            "stream ended {} bytes into a length prefix",
            n
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::header::write_field;

    fn message_header(conn: u32) -> Vec<u8> {
        let mut header = Vec::new();
        write_field(&mut header, "op", &[OP_MESSAGE]);
        write_field(&mut header, "conn", &conn.to_le_bytes());
        write_field(&mut header, "time", &0u64.to_le_bytes());
        header
    }

    #[test]
    fn test_reads_n_records_then_end_of_stream() {
        let mut stream = Vec::new();
        for i in 0..5u32 {
            write_record(&mut stream, &message_header(i), &vec![0xAB; i as usize]);
        }
        stream.extend_from_slice(&0u32.to_le_bytes());

        let mut cursor = Cursor::new(stream);
        let mut count = 0;
        while let Some(record) = read_record_header(&mut cursor).unwrap() {
            assert_eq!(record.kind().unwrap(), RecordKind::Message);
            assert_eq!(record.fields.get_u32("conn"), Some(count));
            let mut data = vec![0u8; record.data_length as usize];
            cursor.read_exact(&mut data).unwrap();
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[test]
    fn test_exhausted_stream_is_end_of_stream() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(read_record_header(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_partial_length_prefix_is_framing_error() {
        let mut cursor = Cursor::new(vec![0x10, 0x00]);
        let result = read_record_header(&mut cursor);
        assert!(matches!(result, Err(BagError::Framing(_))));
    }

    #[test]
    fn test_truncated_record_is_error() {
        let mut stream = Vec::new();
        write_record(&mut stream, &message_header(1), b"");
        stream.truncate(stream.len() - 6);

        let mut cursor = Cursor::new(stream);
        assert!(read_record_header(&mut cursor).is_err());
    }

    #[test]
    fn test_connection_header_without_trailing_length() {
        let mut data = Vec::new();
        write_field(&mut data, "topic", b"/imu");
        write_field(&mut data, "type", b"sensor_msgs/Imu");

        let header = read_connection_header(&data).unwrap();
        assert_eq!(header.fields.get_string("type").unwrap(), "sensor_msgs/Imu");
        assert_eq!(header.header_length as usize, data.len());
        assert_eq!(header.data_length, 0);
    }

    #[test]
    fn test_missing_op_reported() {
        let mut header = Vec::new();
        write_field(&mut header, "conn", &1u32.to_le_bytes());
        let mut stream = Vec::new();
        write_record(&mut stream, &header, b"");

        let record = read_record_header(&mut Cursor::new(stream))
            .unwrap()
            .unwrap();
        assert!(matches!(
            record.kind(),
            Err(BagError::MissingField { field: "op", .. })
        ));
    }

    #[test]
    fn test_unknown_op_kind() {
        assert_eq!(RecordKind::from_op(42), RecordKind::Unknown(42));
        assert_eq!(RecordKind::from_op(7), RecordKind::Connection);
    }
}
