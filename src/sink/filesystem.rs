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

// Filesystem sink implementation

use super::backend::RemoteSink;
use crate::config::FilesystemSinkConfig;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Copies artifacts under a local (or mounted) base directory
pub struct FilesystemSink {
    base_path: PathBuf,
}

impl FilesystemSink {
    pub fn new(config: FilesystemSinkConfig) -> Result<Self> {
        let base_path = PathBuf::from(&config.base_path);

        info!("Initializing filesystem sink at: {}", base_path.display());

        Ok(Self { base_path })
    }

    /// Destination path for a key; keys may not escape the base path
    fn target_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("Invalid destination key: '{}'", key);
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl RemoteSink for FilesystemSink {
    async fn initialize(&self) -> Result<()> {
        if !self.base_path.exists() {
            info!("Creating base directory: {}", self.base_path.display());
            fs::create_dir_all(&self.base_path)
                .await
                .context("Failed to create base directory")?;
        }
        Ok(())
    }

    async fn put(&self, local_path: &Path, key: &str) -> Result<()> {
        let target = self.target_path(key)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create destination directory")?;
        }

        let bytes = fs::copy(local_path, &target).await.context(format!(
            "Failed to copy {} to {}",
            local_path.display(),
            target.display()
        ))?;

        debug!("Copied {} bytes to {}", bytes, target.display());
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        // Writable base dir, checked with a throwaway marker file
        let marker = self.base_path.join(".bagstream-writable");
        if let Err(e) = fs::write(&marker, b"ok").await {
            warn!(
                "Sink directory {} is not writable: {}",
                self.base_path.display(),
                e
            );
            return Ok(false);
        }
        if let Err(e) = fs::remove_file(&marker).await {
            debug!("Could not remove {}: {}", marker.display(), e);
        }
        Ok(true)
    }

    fn backend_type(&self) -> &str {
        "filesystem"
    }
}
