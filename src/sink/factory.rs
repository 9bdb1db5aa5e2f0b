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

// Sink factory for creating remote sinks from configuration

use super::backend::RemoteSink;
use super::filesystem::FilesystemSink;
use super::http::HttpSink;
use crate::config::SinkConfig;
use anyhow::{bail, Result};
use std::sync::Arc;

pub struct SinkFactory;

impl SinkFactory {
    /// Create remote sink from configuration
    pub fn create(config: &SinkConfig) -> Result<Arc<dyn RemoteSink>> {
        match config.backend.as_str() {
            "filesystem" => {
                let backend_config = config
                    .backend_config
                    .as_filesystem()
                    .ok_or_else(|| anyhow::anyhow!("Filesystem config missing"))?;

                Ok(Arc::new(FilesystemSink::new(backend_config.clone())?))
            }

            "http" => {
                let backend_config = config
                    .backend_config
                    .as_http()
                    .ok_or_else(|| anyhow::anyhow!("HTTP config missing"))?;

                Ok(Arc::new(HttpSink::new(backend_config.clone())?))
            }

            unknown => bail!(
                "Unknown sink backend: '{}'. Supported: filesystem, http",
                unknown
            ),
        }
    }
}
