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

// Streaming ROS bag extractor
//
// Reads a bag v2.0 container sequentially and, per channel:
// - Writes one CSV table of decoded messages
// - Saves image messages as PNG frames
// - Uploads every artifact to a remote sink as soon as it is finished
// - Assembles the frames of each image channel into a video at the end

pub mod bag;
pub mod config;
pub mod connection;
pub mod decoder;
pub mod error;
pub mod extractor;
pub mod router;
pub mod sink;
pub mod source;
pub mod table;
pub mod upload;

// Re-export main types
pub use bag::{BagReader, BagTime, ReadStats};
pub use config::{load_config, load_config_with_env, ExtractorConfig};
pub use connection::{topic_to_channel_name, Connection, ConnectionInfo, ConnectionRegistry};
pub use decoder::{DecodedField, FieldValue, MessageDecoder, Ros1Decoder, Value};
pub use error::{BagError, Result};
pub use extractor::{Extractor, RunSummary};
pub use router::{DecodedMessage, MessageCategory, MessageRouter};
pub use sink::{RemoteSink, SinkFactory};
pub use upload::{UploadItem, UploadQueue, UploadReport, UploadSettings, UploadWorker};
