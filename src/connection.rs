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

// Per-channel state keyed by connection id

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::bag::record::RecordHeader;
use crate::error::{BagError, Result};
use crate::table::TableWriter;

/// Metadata declared by a connection record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: u32,
    pub topic: String,
    pub message_type: String,
    /// md5 type signature
    pub type_signature: String,
    pub definition: String,
}

impl ConnectionInfo {
    /// Build from the outer connection record and its embedded header
    ///
    /// The id comes from the outer record; the topic falls back to the
    /// outer record when the embedded header omits it.
    pub fn from_records(outer: &RecordHeader, embedded: &RecordHeader) -> Result<Self> {
        let id = outer.fields.get_u32("conn").ok_or(BagError::MissingField {
            record: "connection",
            field: "conn",
        })?;
        let topic = embedded
            .fields
            .get_string("topic")
            .or_else(|| outer.fields.get_string("topic"))
            .ok_or(BagError::MissingField {
                record: "connection",
                field: "topic",
            })?;
        let message_type = embedded
            .fields
            .get_string("type")
            .ok_or(BagError::MissingField {
                record: "connection",
                field: "type",
            })?;

        Ok(Self {
            id,
            topic,
            message_type,
            type_signature: embedded.fields.get_string("md5sum").unwrap_or_default(),
            definition: embedded
                .fields
                .get_string("message_definition")
                .unwrap_or_default(),
        })
    }
}

/// One registered channel and its open output
pub struct Connection {
    pub info: ConnectionInfo,
    /// Filesystem-safe form of the topic
    pub channel: String,
    table: TableWriter,
    frame_count: u32,
    /// Column count of the header row, once written
    header_columns: Option<usize>,
    shape_warned: bool,
}

impl Connection {
    pub fn table(&mut self) -> &mut TableWriter {
        &mut self.table
    }

    pub fn table_path(&self) -> &Path {
        self.table.path()
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Current frame number, then advance the counter
    pub fn next_frame(&mut self) -> u32 {
        let frame = self.frame_count;
        self.frame_count += 1;
        frame
    }

    pub fn header_written(&self) -> bool {
        self.header_columns.is_some()
    }

    pub fn header_columns(&self) -> Option<usize> {
        self.header_columns
    }

    pub fn mark_header_written(&mut self, columns: usize) {
        self.header_columns = Some(columns);
    }

    /// True the first time it is called
    pub(crate) fn take_shape_warning(&mut self) -> bool {
        !std::mem::replace(&mut self.shape_warned, true)
    }
}

/// Connections of one bag, owning every per-channel writer until finalize
pub struct ConnectionRegistry {
    output_dir: PathBuf,
    connections: BTreeMap<u32, Connection>,
    /// Channel names already bound to a table path
    channels: HashSet<String>,
    finalized: bool,
}

impl ConnectionRegistry {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            connections: BTreeMap::new(),
            channels: HashSet::new(),
            finalized: false,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Register a connection and open its table under the output dir
    pub fn register(&mut self, info: ConnectionInfo) -> Result<&mut Connection> {
        if self.connections.contains_key(&info.id) {
            return Err(BagError::DuplicateConnection(info.id));
        }

        let channel = self.claim_channel(&info);
        let table = TableWriter::create(self.output_dir.join(format!("{}.csv", channel)))?;

        info!(
            "Registered connection {} '{}' ({}) -> {}",
            info.id,
            info.topic,
            info.message_type,
            table.path().display()
        );

        let id = info.id;
        let connection = Connection {
            info,
            channel,
            table,
            frame_count: 0,
            header_columns: None,
            shape_warned: false,
        };
        Ok(self.connections.entry(id).or_insert(connection))
    }

    /// Unique channel name for a connection
    ///
    /// Distinct topics can sanitize to the same name (`/a/b` and `/a_b`);
    /// later ones get their connection id appended.
    fn claim_channel(&mut self, info: &ConnectionInfo) -> String {
        let base = topic_to_channel_name(&info.topic);
        let mut channel = base.clone();
        while self.channels.contains(&channel) {
            channel = format!("{}_{}", channel, info.id);
        }
        if channel != base {
            warn!(
                "Topic '{}' maps to channel '{}' already in use, writing to '{}'",
                info.topic, base, channel
            );
        }
        self.channels.insert(channel.clone());
        channel
    }

    pub fn get(&self, id: u32) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn lookup(&mut self, id: u32) -> Result<&mut Connection> {
        self.connections
            .get_mut(&id)
            .ok_or(BagError::UnknownConnection(id))
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Close every table and return their paths, ordered by connection id
    ///
    /// A second call returns an empty list.
    pub fn finalize_all(&mut self) -> Result<Vec<PathBuf>> {
        if self.finalized {
            return Ok(Vec::new());
        }
        self.finalized = true;

        let mut paths = Vec::with_capacity(self.connections.len());
        for connection in self.connections.values_mut() {
            connection.table.close()?;
            debug!(
                "Closed table {} ({} rows)",
                connection.table.path().display(),
                connection.table.rows()
            );
            paths.push(connection.table.path().to_path_buf());
        }
        Ok(paths)
    }
}

/// Convert a topic to a name usable as a single path segment
pub fn topic_to_channel_name(topic: &str) -> String {
    topic
        .trim_start_matches('/')
        .replace(['/', ':', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn info(id: u32, topic: &str) -> ConnectionInfo {
        ConnectionInfo {
            id,
            topic: topic.to_string(),
            message_type: "std_msgs/Float64".to_string(),
            type_signature: "fdb28210bfa9d7c91146260178d9a584".to_string(),
            definition: "float64 data\n".to_string(),
        }
    }

    #[test]
    fn test_register_opens_table() {
        let dir = TempDir::new().unwrap();
        let mut registry = ConnectionRegistry::new(dir.path());

        let conn = registry.register(info(0, "/vehicle/speed")).unwrap();
        assert_eq!(conn.channel, "vehicle_speed");
        assert_eq!(conn.frame_count(), 0);
        assert!(!conn.header_written());
        assert!(dir.path().join("vehicle_speed.csv").exists());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let dir = TempDir::new().unwrap();
        let mut registry = ConnectionRegistry::new(dir.path());
        registry.register(info(1, "/a")).unwrap();

        let result = registry.register(info(1, "/b"));
        assert!(matches!(result, Err(BagError::DuplicateConnection(1))));
    }

    #[test]
    fn test_unknown_lookup() {
        let dir = TempDir::new().unwrap();
        let mut registry = ConnectionRegistry::new(dir.path());
        assert!(matches!(
            registry.lookup(9),
            Err(BagError::UnknownConnection(9))
        ));
    }

    #[test]
    fn test_finalize_all_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut registry = ConnectionRegistry::new(dir.path());
        registry.register(info(2, "/b")).unwrap();
        registry.register(info(1, "/a")).unwrap();

        let paths = registry.finalize_all().unwrap();
        assert_eq!(
            paths,
            vec![dir.path().join("a.csv"), dir.path().join("b.csv")]
        );
        assert!(registry.finalize_all().unwrap().is_empty());
    }

    #[test]
    fn test_frame_counter() {
        let dir = TempDir::new().unwrap();
        let mut registry = ConnectionRegistry::new(dir.path());
        let conn = registry.register(info(0, "/cam")).unwrap();
        assert_eq!(conn.next_frame(), 0);
        assert_eq!(conn.next_frame(), 1);
        assert_eq!(conn.frame_count(), 2);
    }

    #[test]
    fn test_colliding_channel_names_get_distinct_tables() {
        let dir = TempDir::new().unwrap();
        let mut registry = ConnectionRegistry::new(dir.path());
        registry.register(info(0, "/a/b")).unwrap();
        let second = registry.register(info(1, "/a_b")).unwrap();
        assert_eq!(second.channel, "a_b_1");

        // A later topic that sanitizes to the renamed channel still gets its own
        let third = registry.register(info(2, "/a_b_1")).unwrap();
        assert_eq!(third.channel, "a_b_1_2");

        let paths = registry.finalize_all().unwrap();
        assert_eq!(
            paths,
            vec![
                dir.path().join("a_b.csv"),
                dir.path().join("a_b_1.csv"),
                dir.path().join("a_b_1_2.csv"),
            ]
        );
    }

    #[test]
    fn test_topic_to_channel_name() {
        assert_eq!(topic_to_channel_name("/camera/front"), "camera_front");
        assert_eq!(topic_to_channel_name("imu/data"), "imu_data");
        assert_eq!(topic_to_channel_name("/a:b"), "a_b");
    }
}
