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

// Upload pipeline
//
// The bag reader pushes finished artifacts onto an unbounded FIFO and
// never waits on the network. A single worker task drains the queue in
// order and hands each file to the remote sink. The `Finished` marker
// switches the worker into its final phase: assemble one video per
// image channel, upload those, then complete.

pub mod video;

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{BagError, Result};
use crate::sink::RemoteSink;
pub use video::{FfmpegAssembler, VideoAssembler};

/// Item carried by the upload queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadItem {
    /// Closed channel table
    Table(PathBuf),
    /// Saved image frame
    Frame(PathBuf),
    /// No more items; assemble videos and stop
    Finished,
}

/// Producer side of the upload queue
#[derive(Clone)]
pub struct UploadQueue {
    tx: mpsc::UnboundedSender<UploadItem>,
}

impl UploadQueue {
    /// Create a queue and the receiver a worker drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UploadItem>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn push_table(&self, path: PathBuf) -> Result<()> {
        debug!("Queuing table {} for upload", path.display());
        self.send(UploadItem::Table(path))
    }

    pub fn push_frame(&self, path: PathBuf) -> Result<()> {
        debug!("Queuing frame {} for upload", path.display());
        self.send(UploadItem::Frame(path))
    }

    /// Enqueue the terminal marker
    pub fn finish(&self) -> Result<()> {
        self.send(UploadItem::Finished)
    }

    fn send(&self, item: UploadItem) -> Result<()> {
        self.tx.send(item).map_err(|_| BagError::QueueClosed)
    }
}

/// Settings for one upload worker
#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Local directory that destination keys are relative to
    pub run_dir: PathBuf,
    /// Prepended to every destination key
    pub key_prefix: String,
    pub frame_rate: u32,
}

/// Outcome reported by the worker when it completes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: usize,
    pub failed: usize,
    pub videos: Vec<PathBuf>,
    /// False when the queue closed without the terminal marker
    pub finished: bool,
}

/// Consumer draining the upload queue
pub struct UploadWorker {
    rx: mpsc::UnboundedReceiver<UploadItem>,
    sink: Arc<dyn RemoteSink>,
    assembler: Option<Arc<dyn VideoAssembler>>,
    settings: UploadSettings,
    /// Frame paths grouped by channel directory, in first-seen order
    frames: Vec<(PathBuf, Vec<PathBuf>)>,
    report: UploadReport,
}

impl UploadWorker {
    pub fn new(
        rx: mpsc::UnboundedReceiver<UploadItem>,
        sink: Arc<dyn RemoteSink>,
        assembler: Option<Arc<dyn VideoAssembler>>,
        settings: UploadSettings,
    ) -> Self {
        Self {
            rx,
            sink,
            assembler,
            settings,
            frames: Vec::new(),
            report: UploadReport::default(),
        }
    }

    /// Start a worker task; await the handle for the completion signal
    pub fn spawn(
        sink: Arc<dyn RemoteSink>,
        assembler: Option<Arc<dyn VideoAssembler>>,
        settings: UploadSettings,
    ) -> (UploadQueue, JoinHandle<UploadReport>) {
        let (queue, rx) = UploadQueue::channel();
        let worker = Self::new(rx, sink, assembler, settings);
        let handle = tokio::spawn(worker.run());
        (queue, handle)
    }

    pub async fn run(mut self) -> UploadReport {
        info!(
            "Upload worker started (sink: {}, prefix: '{}')",
            self.sink.backend_type(),
            self.settings.key_prefix
        );

        loop {
            match self.rx.recv().await {
                Some(UploadItem::Table(path)) => self.transfer(&path).await,
                Some(UploadItem::Frame(path)) => {
                    self.transfer(&path).await;
                    self.record_frame(path);
                }
                Some(UploadItem::Finished) => {
                    self.report.finished = true;
                    self.assemble_videos().await;
                    break;
                }
                None => {
                    warn!("Upload queue closed without finish marker, skipping video assembly");
                    break;
                }
            }
        }

        info!(
            "Upload worker finished: {} uploaded, {} failed, {} videos",
            self.report.uploaded,
            self.report.failed,
            self.report.videos.len()
        );
        self.report
    }

    async fn transfer(&mut self, path: &Path) {
        let key = destination_key(&self.settings.run_dir, &self.settings.key_prefix, path);
        info!("Uploading {} to '{}'", path.display(), key);

        match self.sink.put(path, &key).await {
            Ok(()) => self.report.uploaded += 1,
            Err(e) => {
                warn!("Upload of {} failed: {:#}", path.display(), e);
                self.report.failed += 1;
            }
        }
    }

    fn record_frame(&mut self, path: PathBuf) {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        match self.frames.iter_mut().find(|(d, _)| *d == dir) {
            Some((_, frames)) => frames.push(path),
            None => self.frames.push((dir, vec![path])),
        }
    }

    async fn assemble_videos(&mut self) {
        if self.frames.is_empty() {
            debug!("No image frames queued, no videos to assemble");
            return;
        }
        let Some(assembler) = self.assembler.clone() else {
            info!("Video assembly disabled, {} image channels left as frames", self.frames.len());
            return;
        };

        let groups = std::mem::take(&mut self.frames);
        info!("Assembling videos for {} image channels", groups.len());

        for (dir, frames) in groups {
            match assembler
                .assemble(&dir, &frames, self.settings.frame_rate)
                .await
            {
                Ok(video) => {
                    self.transfer(&video).await;
                    self.report.videos.push(video);
                }
                Err(e) => warn!("Video assembly for {} failed: {:#}", dir.display(), e),
            }
        }
    }
}

/// Destination key for a local artifact: prefix + path relative to the run dir
pub fn destination_key(run_dir: &Path, prefix: &str, path: &Path) -> String {
    let relative = path.strip_prefix(run_dir).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    let relative = parts.join("/");

    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        relative
    } else {
        format!("{}/{}", prefix, relative)
    }
}
