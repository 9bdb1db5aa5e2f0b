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

use anyhow::Result;
use bagstream::config::{load_config_with_env, ConfigLoader};
use bagstream::Extractor;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Bagstream - Extract ROS bag channels into tables, frames and videos
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.yaml")]
    config: PathBuf,

    /// Bag location, local path or http(s) URL (overrides config file)
    #[arg(short, long)]
    source: Option<String>,

    /// Video frame rate (overrides config file)
    #[arg(short, long)]
    frame_rate: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration from file
    let mut config = load_config_with_env(&args.config)?;

    // Apply CLI overrides
    if let Some(source) = args.source {
        config.source.location = source;
    }
    if let Some(frame_rate) = args.frame_rate {
        config.pipeline.frame_rate = frame_rate;
    }
    ConfigLoader::validate(&config)?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_lowercase()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting bagstream");
    info!("Loaded configuration from: {:?}", args.config);
    info!("Source: {}", config.source.location);
    info!("Sink backend: {}", config.sink.backend);

    let extractor = Extractor::from_config(config)?;
    let summary = extractor.run().await?;

    info!(
        "Extracted '{}': {} connections, {} messages, {} artifacts uploaded ({} failed)",
        summary.bag_name,
        summary.stats.connections,
        summary.stats.messages,
        summary.uploads.uploaded,
        summary.uploads.failed
    );

    Ok(())
}
