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

// Configuration loader with environment variable substitution

use super::types::*;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ExtractorConfig> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration text
    pub fn from_yaml(content: &str) -> Result<ExtractorConfig> {
        // Substitute environment variables
        let content = Self::substitute_env_vars(content)?;

        // Parse YAML
        let config: ExtractorConfig =
            serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;

        // Validate configuration
        Self::validate(&config)?;

        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${BAG_BUCKET:-artifacts} -> artifacts (if BAG_BUCKET not set)
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}")
            .context("Invalid substitution pattern")?;

        let substituted = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    // Keep original if no default and var not found
                    None => format!("${{{}}}", var_name),
                },
            }
        });

        Ok(substituted.to_string())
    }

    /// Validate configuration
    pub fn validate(config: &ExtractorConfig) -> Result<()> {
        if config.pipeline.frame_rate == 0 {
            bail!("pipeline.frame_rate must be > 0");
        }

        if config.pipeline.video.crf > 51 {
            bail!("pipeline.video.crf must be 0-51");
        }

        if config.pipeline.working_dir.is_empty() {
            bail!("pipeline.working_dir cannot be empty");
        }

        // Validate backend
        match config.sink.backend.as_str() {
            "filesystem" => {
                if config.sink.backend_config.as_filesystem().is_none() {
                    bail!("filesystem backend selected but filesystem config missing");
                }
            }
            "http" => match config.sink.backend_config.as_http() {
                None => bail!("http backend selected but http config missing"),
                Some(http) if !http.url.starts_with("http://") && !http.url.starts_with("https://") => {
                    bail!("sink.http.url must be an http(s) URL, got '{}'", http.url)
                }
                Some(http) if http.bucket.is_empty() => bail!("sink.http.bucket cannot be empty"),
                Some(_) => {}
            },
            unknown => bail!("Unknown backend: '{}'. Supported: filesystem, http", unknown),
        }

        Ok(())
    }
}
