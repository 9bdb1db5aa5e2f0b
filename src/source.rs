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

// Input stream for a bag: local file or HTTP download, read sequentially

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Open `location` for sequential reading
///
/// `http://` and `https://` locations are streamed with a blocking GET;
/// anything else is a local path. Must not be called from an async
/// context (use `spawn_blocking`).
pub fn open_source(location: &str, gzip: bool) -> Result<Box<dyn Read + Send>> {
    let raw: Box<dyn Read + Send> = if is_remote(location) {
        info!("Streaming bag from {}", location);
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(None)
            .build()
            .context("Failed to build HTTP client")?;
        let response = client
            .get(location)
            .send()
            .context(format!("Failed to request {}", location))?;
        if !response.status().is_success() {
            bail!("GET {} failed with status {}", location, response.status());
        }
        Box::new(response)
    } else {
        info!("Reading bag from {}", location);
        let file = File::open(location).context(format!("Failed to open {}", location))?;
        Box::new(file)
    };

    let reader: Box<dyn Read + Send> = if gzip {
        Box::new(GzDecoder::new(raw))
    } else {
        raw
    };
    Ok(Box::new(BufReader::with_capacity(1 << 20, reader)))
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Bag name used as output folder: last path segment without `.gz` / `.bag`
pub fn bag_name(location: &str) -> String {
    let without_query = location.split(['?', '#']).next().unwrap_or(location);
    let file_name = Path::new(without_query.trim_end_matches('/'))
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let stem = file_name.strip_suffix(".gz").unwrap_or(&file_name);
    let stem = stem.strip_suffix(".bag").unwrap_or(stem);
    if stem.is_empty() {
        "bag".to_string()
    } else {
        stem.to_string()
    }
}
