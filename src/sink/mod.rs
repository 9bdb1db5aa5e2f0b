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

// Remote sink module
//
// Provides a trait-based abstraction for the destination of extracted
// artifacts, so the upload worker can write to different systems
// (local/mounted filesystem, HTTP object store).
//
// This module focuses on WRITE-ONLY operations.

pub mod backend;
pub mod factory;
pub mod filesystem;
pub mod http;

pub use backend::RemoteSink;
pub use factory::SinkFactory;
pub use filesystem::FilesystemSink;
pub use http::HttpSink;
