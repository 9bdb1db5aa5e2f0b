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

// Bag v2.0 container format: header fields, record framing, chunks,
// timestamps and the reader that ties them together.

pub mod chunk;
pub mod header;
pub mod reader;
pub mod record;
pub mod time;

pub use chunk::{ChunkCompression, ChunkInfo};
pub use header::HeaderFields;
pub use reader::{BagReader, ReadStats, ReaderState};
pub use record::{RecordHeader, RecordKind};
pub use time::BagTime;
