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

// Synthetic bag construction shared by the integration tests

#![allow(dead_code)]

use bagstream::bag::header::write_field;
use bagstream::bag::record::write_record;

pub const FLOAT64_TYPE: &str = "std_msgs/Float64";
pub const FLOAT64_MD5: &str = "fdb28210bfa9d7c91146260178d9a584";
pub const FLOAT64_DEFINITION: &str = "float64 data\n";

pub const IMAGE_TYPE: &str = "sensor_msgs/Image";
pub const IMAGE_MD5: &str = "060021388200f6f0f447d0fcd9c64743";
pub const IMAGE_DEFINITION: &str = "std_msgs/Header header
uint32 height
uint32 width
string encoding
uint8 is_bigendian
uint32 step
uint8[] data

================================================================================
MSG: std_msgs/Header
uint32 seq
time stamp
string frame_id
";

/// Framed connection record
pub fn connection_record(id: u32, topic: &str, message_type: &str, md5: &str, definition: &str) -> Vec<u8> {
    let mut header = Vec::new();
    write_field(&mut header, "op", &[0x07]);
    write_field(&mut header, "conn", &id.to_le_bytes());
    write_field(&mut header, "topic", topic.as_bytes());

    let mut data = Vec::new();
    write_field(&mut data, "topic", topic.as_bytes());
    write_field(&mut data, "type", message_type.as_bytes());
    write_field(&mut data, "md5sum", md5.as_bytes());
    write_field(&mut data, "message_definition", definition.as_bytes());

    let mut buf = Vec::new();
    write_record(&mut buf, &header, &data);
    buf
}

/// Framed message record
pub fn message_record(conn: u32, time: u64, payload: &[u8]) -> Vec<u8> {
    let mut header = Vec::new();
    write_field(&mut header, "op", &[0x02]);
    write_field(&mut header, "conn", &conn.to_le_bytes());
    write_field(&mut header, "time", &time.to_le_bytes());

    let mut buf = Vec::new();
    write_record(&mut buf, &header, payload);
    buf
}

/// Framed record with an arbitrary op code
pub fn op_record(op: u8, data: &[u8]) -> Vec<u8> {
    let mut header = Vec::new();
    write_field(&mut header, "op", &[op]);

    let mut buf = Vec::new();
    write_record(&mut buf, &header, data);
    buf
}

/// Bag header record padded like real bags
pub fn bag_header_record(conn_count: u32, chunk_count: u32) -> Vec<u8> {
    let mut header = Vec::new();
    write_field(&mut header, "op", &[0x03]);
    write_field(&mut header, "index_pos", &0u64.to_le_bytes());
    write_field(&mut header, "conn_count", &conn_count.to_le_bytes());
    write_field(&mut header, "chunk_count", &chunk_count.to_le_bytes());

    let mut buf = Vec::new();
    write_record(&mut buf, &header, &[b' '; 64]);
    buf
}

/// Framed chunk record; `size` is the declared uncompressed size
pub fn chunk_record(compression: &str, size: u32, body: &[u8]) -> Vec<u8> {
    let mut header = Vec::new();
    write_field(&mut header, "op", &[0x05]);
    write_field(&mut header, "compression", compression.as_bytes());
    write_field(&mut header, "size", &size.to_le_bytes());

    let mut buf = Vec::new();
    write_record(&mut buf, &header, body);
    buf
}

pub fn float64_payload(value: f64) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

/// Serialized sensor_msgs/Image
pub fn image_payload(width: u32, height: u32, encoding: &str, step: u32, pixels: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    // header: seq, stamp, frame_id
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    push_string(&mut buf, "camera");

    buf.extend_from_slice(&height.to_le_bytes());
    buf.extend_from_slice(&width.to_le_bytes());
    push_string(&mut buf, encoding);
    buf.push(0);
    buf.extend_from_slice(&step.to_le_bytes());
    buf.extend_from_slice(&(pixels.len() as u32).to_le_bytes());
    buf.extend_from_slice(pixels);
    buf
}

fn push_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

/// Raw record timestamp: seconds in the low word, nanoseconds in the high word
pub fn stamp(secs: u32, nsecs: u32) -> u64 {
    (u64::from(nsecs) << 32) | u64::from(secs)
}

/// Assembles a bag stream record by record
pub struct BagBuilder {
    buf: Vec<u8>,
}

impl BagBuilder {
    pub fn new() -> Self {
        Self::with_version("#ROSBAG V2.0")
    }

    pub fn with_version(line: &str) -> Self {
        let mut buf = line.as_bytes().to_vec();
        buf.push(b'\n');
        Self { buf }
    }

    pub fn record(mut self, bytes: Vec<u8>) -> Self {
        self.buf.extend_from_slice(&bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}
