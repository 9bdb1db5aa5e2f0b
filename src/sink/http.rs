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

// HTTP object store sink implementation

use super::backend::{content_type, RemoteSink};
use crate::config::HttpSinkConfig;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Uploads artifacts with `PUT {url}/{bucket}/{key}`
pub struct HttpSink {
    client: Client,
    base_url: String,
    bucket: String,
}

impl HttpSink {
    pub fn new(config: HttpSinkConfig) -> Result<Self> {
        let mut client_builder = reqwest::ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(Duration::from_secs(config.timeout_seconds));

        // Add API token if provided
        if let Some(token) = &config.api_token {
            let mut headers = reqwest::header::HeaderMap::new();
            let auth_value = format!("Bearer {}", token);
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&auth_value).context("Invalid API token")?,
            );
            client_builder = client_builder.default_headers(headers);
        }

        let client = client_builder
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            bucket: config.bucket,
        })
    }

    fn bucket_url(&self) -> String {
        format!("{}/{}", self.base_url, self.bucket)
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.bucket_url(), key.trim_start_matches('/'))
    }

    /// Create bucket if it doesn't exist
    async fn ensure_bucket(&self) -> Result<()> {
        let url = self.bucket_url();

        match self.client.head(&url).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Bucket '{}' already exists", self.bucket);
                Ok(())
            }
            _ => {
                info!("Creating bucket '{}'", self.bucket);
                let response = self
                    .client
                    .put(&url)
                    .send()
                    .await
                    .context("Failed to create bucket")?;

                if response.status().is_success() || response.status().as_u16() == 409 {
                    info!("Bucket '{}' ready", self.bucket);
                    Ok(())
                } else {
                    let status = response.status();
                    let error_text = response.text().await.unwrap_or_default();
                    bail!("Failed to create bucket: {} - {}", status, error_text)
                }
            }
        }
    }
}

#[async_trait]
impl RemoteSink for HttpSink {
    async fn initialize(&self) -> Result<()> {
        self.ensure_bucket().await
    }

    async fn put(&self, local_path: &Path, key: &str) -> Result<()> {
        let data = tokio::fs::read(local_path)
            .await
            .context(format!("Failed to read {}", local_path.display()))?;
        let size = data.len();
        let url = self.object_url(key);

        let response = self
            .client
            .put(&url)
            .header("Content-Type", content_type(local_path))
            .body(data)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("Upload failed with status {}: {}", status, error_text);
        }

        debug!("Uploaded {} bytes to {}", size, url);
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.head(self.bucket_url()).send().await {
            Ok(response) if response.status().is_success() => Ok(true),
            Ok(response) => {
                warn!("Health check failed with status: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Health check error: {}", e);
                Ok(false)
            }
        }
    }

    fn backend_type(&self) -> &str {
        "http"
    }
}
