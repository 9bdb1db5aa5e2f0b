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

// One extraction run
//
// The bag is parsed on a blocking thread (parsing is CPU bound and the
// source may be a blocking HTTP stream) while the upload worker runs on
// the async runtime. The run ends when the worker reports completion.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bag::{BagReader, ReadStats};
use crate::config::ExtractorConfig;
use crate::decoder::Ros1Decoder;
use crate::sink::{RemoteSink, SinkFactory};
use crate::source::{bag_name, open_source};
use crate::upload::{FfmpegAssembler, UploadReport, UploadSettings, UploadWorker, VideoAssembler};

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub bag_name: String,
    pub stats: ReadStats,
    pub uploads: UploadReport,
}

pub struct Extractor {
    config: ExtractorConfig,
    sink: Arc<dyn RemoteSink>,
    assembler: Option<Arc<dyn VideoAssembler>>,
}

impl Extractor {
    /// Build sink and video assembler from configuration
    pub fn from_config(config: ExtractorConfig) -> Result<Self> {
        let sink = SinkFactory::create(&config.sink)?;
        let assembler: Option<Arc<dyn VideoAssembler>> = if config.pipeline.video.enabled {
            Some(Arc::new(FfmpegAssembler::new(&config.pipeline.video)))
        } else {
            None
        };
        Ok(Self::new(config, sink, assembler))
    }

    pub fn new(
        config: ExtractorConfig,
        sink: Arc<dyn RemoteSink>,
        assembler: Option<Arc<dyn VideoAssembler>>,
    ) -> Self {
        Self {
            config,
            sink,
            assembler,
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let location = self.config.source.location.clone();
        if location.is_empty() {
            bail!("source.location is not set");
        }
        let gzip = self.config.source.is_gzip();
        let name = bag_name(&location);

        self.sink
            .initialize()
            .await
            .context("Failed to initialize sink")?;
        if !self.sink.health_check().await? {
            bail!("Sink '{}' failed its health check", self.sink.backend_type());
        }
        info!("Sink initialized: {}", self.sink.backend_type());

        let run_id = Uuid::new_v4();
        let run_dir = PathBuf::from(&self.config.pipeline.working_dir).join(run_id.to_string());
        let output_dir = run_dir.join(&name);
        tokio::fs::create_dir_all(&output_dir)
            .await
            .context(format!("Failed to create {}", output_dir.display()))?;
        info!("Run {} extracting '{}' into {}", run_id, name, output_dir.display());

        let settings = UploadSettings {
            run_dir: run_dir.clone(),
            key_prefix: self.config.sink.prefix.clone(),
            frame_rate: self.config.pipeline.frame_rate,
        };
        let (queue, worker) = UploadWorker::spawn(self.sink.clone(), self.assembler.clone(), settings);

        // The queue is dropped with the closure; on failure the worker
        // sees it close without the finish marker.
        let producer = tokio::task::spawn_blocking(move || -> Result<ReadStats> {
            let mut input = open_source(&location, gzip)?;
            let mut reader = BagReader::new(output_dir, Ros1Decoder::new(), queue.clone());
            let stats = reader.read(&mut input)?;
            queue.finish()?;
            Ok(stats)
        });

        let (parsed, uploads) = settle(
            producer,
            worker,
            &run_dir,
            self.config.pipeline.keep_working_dir,
        )
        .await?;
        let stats = parsed.context(format!("Failed to extract '{}'", name))?;
        info!(
            "Run {} done: {} messages, {} uploaded, {} failed, {} videos",
            run_id,
            stats.messages,
            uploads.uploaded,
            uploads.failed,
            uploads.videos.len()
        );

        Ok(RunSummary {
            run_id,
            bag_name: name,
            stats,
            uploads,
        })
    }
}

/// Wait for both tasks, release the run dir, then surface join errors
///
/// A panicked producer drops the queue, so the worker still drains
/// and the run dir is removed either way.
async fn settle(
    producer: JoinHandle<Result<ReadStats>>,
    worker: JoinHandle<UploadReport>,
    run_dir: &Path,
    keep_working_dir: bool,
) -> Result<(Result<ReadStats>, UploadReport)> {
    let parsed = producer.await;
    let uploads = worker.await;

    if keep_working_dir {
        info!("Keeping working directory {}", run_dir.display());
    } else {
        remove_run_dir(run_dir).await;
    }

    let parsed = parsed.context("Bag reader task panicked")?;
    let uploads = uploads.context("Upload worker panicked")?;
    Ok((parsed, uploads))
}

async fn remove_run_dir(run_dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(run_dir).await {
        warn!("Failed to remove {}: {}", run_dir.display(), e);
    }
}
