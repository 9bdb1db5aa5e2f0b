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

// Record timestamps

use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Raw 64-bit record timestamp
///
/// Low 32 bits hold whole seconds since the Unix epoch, high 32 bits
/// hold nanoseconds. Nanoseconds are truncated to microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BagTime(u64);

impl BagTime {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn from_parts(secs: u32, nsecs: u32) -> Self {
        Self(u64::from(secs) | (u64::from(nsecs) << 32))
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn secs(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    pub fn nsecs(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
            + Duration::seconds(i64::from(self.secs()))
            + Duration::microseconds(i64::from(self.nsecs() / 1000))
    }

    /// ISO-8601 rendering safe for path segments (`:` becomes `_`)
    ///
    /// Fractional seconds are printed as six digits and omitted when zero.
    pub fn iso(self) -> String {
        let time = self.to_datetime();
        let rendered = if time.timestamp_subsec_micros() == 0 {
            time.format("%Y-%m-%dT%H:%M:%S").to_string()
        } else {
            time.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
        };
        rendered.replace(':', "_")
    }
}

impl fmt::Display for BagTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
