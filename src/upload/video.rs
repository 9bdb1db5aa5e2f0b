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

// Video assembly from image frames

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::VideoConfig;

/// Turns an ordered frame sequence into one video file
#[async_trait]
pub trait VideoAssembler: Send + Sync {
    /// Assemble `frames` (in order) found under `channel_dir`
    ///
    /// Returns the path of the encoded video.
    async fn assemble(
        &self,
        channel_dir: &Path,
        frames: &[PathBuf],
        frame_rate: u32,
    ) -> Result<PathBuf>;
}

/// Runs an external `ffmpeg` per channel
pub struct FfmpegAssembler {
    ffmpeg_path: String,
    crf: u8,
}

impl FfmpegAssembler {
    pub fn new(config: &VideoConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            crf: config.crf,
        }
    }

    /// ffconcat playlist holding every frame for `1 / frame_rate` seconds
    fn playlist(frames: &[PathBuf], frame_rate: u32) -> String {
        let duration = 1.0 / f64::from(frame_rate.max(1));
        let mut list = String::from("ffconcat version 1.0\n");
        for frame in frames {
            let escaped = frame.to_string_lossy().replace('\'', r"'\''");
            list.push_str(&format!("file '{}'\nduration {:.6}\n", escaped, duration));
        }
        // The concat demuxer ignores the duration of the final entry
        if let Some(last) = frames.last() {
            let escaped = last.to_string_lossy().replace('\'', r"'\''");
            list.push_str(&format!("file '{}'\n", escaped));
        }
        list
    }
}

#[async_trait]
impl VideoAssembler for FfmpegAssembler {
    async fn assemble(
        &self,
        channel_dir: &Path,
        frames: &[PathBuf],
        frame_rate: u32,
    ) -> Result<PathBuf> {
        if frames.is_empty() {
            bail!("no frames for {}", channel_dir.display());
        }

        let playlist = channel_dir.join("frames.ffconcat");
        tokio::fs::write(&playlist, Self::playlist(frames, frame_rate))
            .await
            .context("Failed to write frame playlist")?;

        let mut output = channel_dir.as_os_str().to_owned();
        output.push(".mp4");
        let output = PathBuf::from(output);

        info!(
            "Encoding {} frames from {} at {} fps",
            frames.len(),
            channel_dir.display(),
            frame_rate
        );

        let result = Command::new(&self.ffmpeg_path)
            .args(["-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i"])
            .arg(&playlist)
            .arg("-r")
            .arg(frame_rate.to_string())
            .args(["-c:v", "libx264", "-crf"])
            .arg(self.crf.to_string())
            .args(["-pix_fmt", "yuv420p", "-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"])
            .arg(&output)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.ffmpeg_path))?;

        if !result.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.ffmpeg_path,
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            );
        }

        debug!("Wrote video {}", output.display());
        Ok(output)
    }
}
