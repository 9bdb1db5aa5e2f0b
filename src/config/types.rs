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

// Configuration types for bagstream

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExtractorConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the bag stream comes from
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Local path or http(s) URL
    #[serde(default)]
    pub location: String,

    /// Force gzip on/off; detected from a `.gz` suffix when unset
    #[serde(default)]
    pub gzip: Option<bool>,
}

impl SourceConfig {
    pub fn is_gzip(&self) -> bool {
        self.gzip.unwrap_or_else(|| self.location.ends_with(".gz"))
    }
}

/// Sink configuration with backend selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SinkConfig {
    /// Backend type: "filesystem", "http"
    pub backend: String,

    /// Backend-specific configuration
    #[serde(flatten)]
    pub backend_config: SinkBackendConfig,

    /// Prepended to every destination key
    #[serde(default)]
    pub prefix: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            backend: "filesystem".to_string(),
            backend_config: SinkBackendConfig::Filesystem {
                filesystem: FilesystemSinkConfig::default(),
            },
            prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SinkBackendConfig {
    Filesystem {
        #[serde(rename = "filesystem")]
        filesystem: FilesystemSinkConfig,
    },
    Http {
        #[serde(rename = "http")]
        http: HttpSinkConfig,
    },
}

impl SinkBackendConfig {
    pub fn as_filesystem(&self) -> Option<&FilesystemSinkConfig> {
        match self {
            SinkBackendConfig::Filesystem { filesystem } => Some(filesystem),
            _ => None,
        }
    }

    pub fn as_http(&self) -> Option<&HttpSinkConfig> {
        match self {
            SinkBackendConfig::Http { http } => Some(http),
            _ => None,
        }
    }

    pub fn as_http_mut(&mut self) -> Option<&mut HttpSinkConfig> {
        match self {
            SinkBackendConfig::Http { http } => Some(http),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilesystemSinkConfig {
    pub base_path: String,
}

impl Default for FilesystemSinkConfig {
    fn default() -> Self {
        Self {
            base_path: "/data/extracted".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSinkConfig {
    pub url: String,
    pub bucket: String,
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for HttpSinkConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9000".to_string(),
            bucket: "bag-artifacts".to_string(),
            api_token: None,
            timeout_seconds: default_timeout(),
        }
    }
}

/// Extraction run settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineSettings {
    /// Parent of the per-run working directories
    #[serde(default = "default_working_dir")]
    pub working_dir: String,

    /// Frames per second of assembled videos
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Leave local artifacts in place after the run
    #[serde(default)]
    pub keep_working_dir: bool,

    #[serde(default)]
    pub video: VideoConfig,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            frame_rate: default_frame_rate(),
            keep_working_dir: false,
            video: VideoConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// x264 constant rate factor, 0-51
    #[serde(default = "default_crf")]
    pub crf: u8,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ffmpeg_path: default_ffmpeg_path(),
            crf: default_crf(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_timeout() -> u64 { 300 }
fn default_working_dir() -> String { std::env::temp_dir().join("bagstream").to_string_lossy().to_string() }
fn default_frame_rate() -> u32 { 20 }
fn default_true() -> bool { true }
fn default_ffmpeg_path() -> String { "ffmpeg".to_string() }
fn default_crf() -> u8 { 23 }
fn default_log_level() -> String { "info".to_string() }
