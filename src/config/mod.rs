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

// Configuration module for bagstream
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution and overrides
// - Configuration validation

mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExtractorConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<ExtractorConfig> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Allow environment variables to override config values
pub fn apply_env_overrides(config: &mut ExtractorConfig) -> Result<()> {
    if let Ok(source) = std::env::var("BAG_SOURCE") {
        config.source.location = source;
    }

    if let Ok(prefix) = std::env::var("SINK_PREFIX") {
        config.sink.prefix = prefix;
    }

    if let Ok(frame_rate) = std::env::var("FRAME_RATE") {
        config.pipeline.frame_rate = frame_rate
            .parse()
            .context(format!("FRAME_RATE is not a number: '{}'", frame_rate))?;
    }

    if let Ok(api_token) = std::env::var("SINK_API_TOKEN") {
        if let Some(http) = config.sink.backend_config.as_http_mut() {
            http.api_token = Some(api_token);
        }
    }

    ConfigLoader::validate(config)
}
