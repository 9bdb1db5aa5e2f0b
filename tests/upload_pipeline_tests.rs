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

// Upload pipeline tests with a recording sink and video assembler

mod common;

use anyhow::{bail, Result};
use async_trait::async_trait;
use bagstream::config::{ExtractorConfig, FilesystemSinkConfig, SinkBackendConfig};
use bagstream::sink::RemoteSink;
use bagstream::upload::{UploadSettings, UploadWorker, VideoAssembler};
use bagstream::Extractor;
use common::*;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Shared log of sink and assembler calls, in order
#[derive(Default)]
struct Journal {
    events: Mutex<Vec<String>>,
}

impl Journal {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

struct RecordingSink {
    journal: Arc<Journal>,
    fail_on: Option<String>,
}

#[async_trait]
impl RemoteSink for RecordingSink {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn put(&self, _local_path: &Path, key: &str) -> Result<()> {
        if self.fail_on.as_deref() == Some(key) {
            bail!("simulated failure for {}", key);
        }
        self.journal.push(format!("put {}", key));
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn backend_type(&self) -> &str {
        "recording"
    }
}

/// Sink whose destination is never usable
struct UnhealthySink;

#[async_trait]
impl RemoteSink for UnhealthySink {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn put(&self, _local_path: &Path, key: &str) -> Result<()> {
        bail!("unexpected upload of {}", key)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn backend_type(&self) -> &str {
        "unhealthy"
    }
}

struct RecordingAssembler {
    journal: Arc<Journal>,
}

#[async_trait]
impl VideoAssembler for RecordingAssembler {
    async fn assemble(&self, channel_dir: &Path, frames: &[PathBuf], frame_rate: u32) -> Result<PathBuf> {
        let name = channel_dir.file_name().unwrap().to_string_lossy().to_string();
        self.journal
            .push(format!("assemble {} frames={} fps={}", name, frames.len(), frame_rate));
        if name == "broken" {
            bail!("encoder crashed");
        }
        Ok(channel_dir.with_extension("mp4"))
    }
}

fn settings(run_dir: &Path) -> UploadSettings {
    UploadSettings {
        run_dir: run_dir.to_path_buf(),
        key_prefix: "out".to_string(),
        frame_rate: 20,
    }
}

fn worker_parts(fail_on: Option<&str>) -> (Arc<Journal>, Arc<dyn RemoteSink>, Arc<dyn VideoAssembler>) {
    let journal = Arc::new(Journal::default());
    let sink: Arc<dyn RemoteSink> = Arc::new(RecordingSink {
        journal: journal.clone(),
        fail_on: fail_on.map(str::to_string),
    });
    let assembler: Arc<dyn VideoAssembler> = Arc::new(RecordingAssembler {
        journal: journal.clone(),
    });
    (journal, sink, assembler)
}

#[tokio::test]
async fn test_items_transferred_in_order_without_video() {
    let run = Path::new("/work/run");
    let (journal, sink, assembler) = worker_parts(None);
    let (queue, handle) = UploadWorker::spawn(sink, Some(assembler), settings(run));

    queue.push_table(run.join("bag/a.csv")).unwrap();
    queue.push_table(run.join("bag/b.csv")).unwrap();
    queue.finish().unwrap();

    let report = handle.await.unwrap();
    assert!(report.finished);
    assert_eq!(report.uploaded, 2);
    assert!(report.videos.is_empty());
    // No frames, so no assembly
    assert_eq!(journal.events(), vec!["put out/bag/a.csv", "put out/bag/b.csv"]);
}

#[tokio::test]
async fn test_frames_assembled_after_finish() {
    let run = Path::new("/work/run");
    let (journal, sink, assembler) = worker_parts(None);
    let (queue, handle) = UploadWorker::spawn(sink, Some(assembler), settings(run));

    queue.push_frame(run.join("bag/cam/cam-0.png")).unwrap();
    queue.push_frame(run.join("bag/cam/cam-1.png")).unwrap();
    queue.push_table(run.join("bag/cam.csv")).unwrap();
    queue.finish().unwrap();

    let report = handle.await.unwrap();
    assert_eq!(report.videos, vec![run.join("bag/cam.mp4")]);
    assert_eq!(
        journal.events(),
        vec![
            "put out/bag/cam/cam-0.png",
            "put out/bag/cam/cam-1.png",
            "put out/bag/cam.csv",
            "assemble cam frames=2 fps=20",
            "put out/bag/cam.mp4",
        ]
    );
}

#[tokio::test]
async fn test_failures_do_not_stop_worker() {
    let run = Path::new("/work/run");
    let (journal, sink, assembler) = worker_parts(Some("out/bag/a.csv"));
    let (queue, handle) = UploadWorker::spawn(sink, Some(assembler), settings(run));

    queue.push_table(run.join("bag/a.csv")).unwrap();
    queue.push_frame(run.join("bag/broken/f-0.png")).unwrap();
    queue.push_frame(run.join("bag/cam/f-0.png")).unwrap();
    queue.finish().unwrap();

    let report = handle.await.unwrap();
    assert_eq!(report.failed, 1);
    // two frames and one video
    assert_eq!(report.uploaded, 3);
    assert_eq!(report.videos, vec![run.join("bag/cam.mp4")]);
    assert!(journal
        .events()
        .contains(&"assemble broken frames=1 fps=20".to_string()));
}

#[tokio::test]
async fn test_closed_queue_skips_video() {
    let run = Path::new("/work/run");
    let (journal, sink, assembler) = worker_parts(None);
    let (queue, handle) = UploadWorker::spawn(sink, Some(assembler), settings(run));

    queue.push_frame(run.join("bag/cam/f-0.png")).unwrap();
    drop(queue);

    let report = handle.await.unwrap();
    assert!(!report.finished);
    assert!(report.videos.is_empty());
    assert_eq!(journal.events(), vec!["put out/bag/cam/f-0.png"]);
}

#[tokio::test]
async fn test_extractor_end_to_end() {
    let dir = TempDir::new().unwrap();
    let bag_path = dir.path().join("drive_01.bag");
    let bag = BagBuilder::new()
        .record(bag_header_record(1, 0))
        .record(connection_record(0, "/vehicle/speed", FLOAT64_TYPE, FLOAT64_MD5, FLOAT64_DEFINITION))
        .record(message_record(0, stamp(1, 0), &float64_payload(2.5)))
        .record(message_record(0, stamp(2, 0), &float64_payload(3.5)))
        .build();
    std::fs::write(&bag_path, bag).unwrap();

    let dest = dir.path().join("dest");
    let work = dir.path().join("work");
    let mut config = ExtractorConfig::default();
    config.source.location = bag_path.to_string_lossy().to_string();
    config.sink.prefix = "runs".to_string();
    config.sink.backend_config = SinkBackendConfig::Filesystem {
        filesystem: FilesystemSinkConfig {
            base_path: dest.to_string_lossy().to_string(),
        },
    };
    config.pipeline.working_dir = work.to_string_lossy().to_string();

    let extractor = Extractor::from_config(config).unwrap();
    let summary = extractor.run().await.unwrap();

    assert_eq!(summary.bag_name, "drive_01");
    assert_eq!(summary.stats.messages, 2);
    assert_eq!(summary.uploads.uploaded, 1);

    let table = std::fs::read_to_string(dest.join("runs/drive_01/vehicle_speed.csv")).unwrap();
    assert_eq!(
        table,
        "Time,ISOTime,data\r\n1,1970-01-01T00_00_01,2.5\r\n2,1970-01-01T00_00_02,3.5\r\n"
    );

    // Working directory released
    assert!(!work.join(summary.run_id.to_string()).exists());
}

#[tokio::test]
async fn test_extractor_reports_fatal_error() {
    let dir = TempDir::new().unwrap();
    let bag_path = dir.path().join("bad.bag");
    std::fs::write(&bag_path, BagBuilder::with_version("#ROSBAG V1.2").build()).unwrap();

    let mut config = ExtractorConfig::default();
    config.source.location = bag_path.to_string_lossy().to_string();
    config.pipeline.working_dir = dir.path().join("work").to_string_lossy().to_string();

    let (_journal, sink, _assembler) = worker_parts(None);
    let extractor = Extractor::new(config, sink, None);

    let err = extractor.run().await.unwrap_err();
    assert!(format!("{:#}", err).contains("Unsupported bag version"));
}

#[tokio::test]
async fn test_extractor_stops_on_unhealthy_sink() {
    let dir = TempDir::new().unwrap();
    let bag_path = dir.path().join("drive.bag");
    std::fs::write(&bag_path, BagBuilder::new().record(bag_header_record(0, 0)).build()).unwrap();

    let work = dir.path().join("work");
    let mut config = ExtractorConfig::default();
    config.source.location = bag_path.to_string_lossy().to_string();
    config.pipeline.working_dir = work.to_string_lossy().to_string();

    let extractor = Extractor::new(config, Arc::new(UnhealthySink), None);
    let err = extractor.run().await.unwrap_err();

    assert!(err.to_string().contains("health check"));
    // Fails before any run directory is created
    assert!(!work.exists());
}
