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

// Remote sink trait for artifact uploads

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Destination for finished artifacts
///
/// One call transfers one local file to one destination key. No
/// batching or transactional semantics are assumed; the upload worker
/// logs failures and moves on.
#[async_trait]
pub trait RemoteSink: Send + Sync {
    /// Prepare the destination (create bucket/directory if needed)
    async fn initialize(&self) -> Result<()>;

    /// Transfer `local_path` to `key`
    ///
    /// # Arguments
    /// * `local_path` - File produced by the run
    /// * `key` - Destination key, `/`-separated
    async fn put(&self, local_path: &Path, key: &str) -> Result<()>;

    /// Health check
    async fn health_check(&self) -> Result<bool>;

    /// Get backend type identifier
    fn backend_type(&self) -> &str;
}

/// Content type reported for an artifact
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => "text/csv",
        Some("png") => "image/png",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}
