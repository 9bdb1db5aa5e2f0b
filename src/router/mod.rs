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

// Message routing
//
// Every decoded message lands in its connection's table. Image channels
// additionally save one PNG per message under `<output>/<channel>/` and
// queue it for upload right away; their table row records the frame path.

pub mod frame;
pub mod row;

use std::path::PathBuf;
use tracing::debug;

use crate::bag::BagTime;
use crate::connection::Connection;
use crate::decoder::DecodedField;
use crate::error::Result;
use crate::upload::UploadQueue;
pub use frame::{ImageFrame, PixelLayout};
pub use row::{select_fields, write_row, FlatRow};

const RANGE_SCAN_FIELDS: &[&str] = &[
    "header.seq",
    "header.frame_id",
    "angle_min",
    "angle_max",
    "angle_increment",
    "time_increment",
    "scan_time",
    "range_min",
    "range_max",
];

const ODOMETRY_FIELDS: &[&str] = &[
    "header.seq",
    "header.frame_id",
    "child_frame_id",
    "pose.pose.position.x",
    "pose.pose.position.y",
    "pose.pose.position.z",
    "pose.pose.orientation.x",
    "pose.pose.orientation.y",
    "pose.pose.orientation.z",
    "pose.pose.orientation.w",
    "twist.twist.linear.x",
    "twist.twist.linear.y",
    "twist.twist.linear.z",
];

const WRENCH_FIELDS: &[&str] = &["force.x", "force.y", "force.z", "torque.x", "torque.y", "torque.z"];

const SCALAR_FIELDS: &[&str] = &["data"];

/// Formatter family chosen from a connection's declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCategory {
    Image,
    RangeScan,
    Odometry,
    Wrench,
    Scalar,
    Generic,
}

impl MessageCategory {
    pub fn from_type(message_type: &str) -> Self {
        match message_type {
            "sensor_msgs/Image" => MessageCategory::Image,
            "sensor_msgs/LaserScan" => MessageCategory::RangeScan,
            "nav_msgs/Odometry" => MessageCategory::Odometry,
            "geometry_msgs/Wrench" => MessageCategory::Wrench,
            t if t.starts_with("std_msgs/") => MessageCategory::Scalar,
            _ => MessageCategory::Generic,
        }
    }

    /// Fixed column subset, `None` for all decoded fields
    pub fn selected_fields(self) -> Option<&'static [&'static str]> {
        match self {
            MessageCategory::RangeScan => Some(RANGE_SCAN_FIELDS),
            MessageCategory::Odometry => Some(ODOMETRY_FIELDS),
            MessageCategory::Wrench => Some(WRENCH_FIELDS),
            MessageCategory::Scalar => Some(SCALAR_FIELDS),
            MessageCategory::Image | MessageCategory::Generic => None,
        }
    }
}

/// One message record, decoded
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub connection: u32,
    pub time: BagTime,
    pub fields: Vec<DecodedField>,
}

/// Writes decoded messages into per-channel artifacts
pub struct MessageRouter {
    output_dir: PathBuf,
}

impl MessageRouter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn route(
        &self,
        connection: &mut Connection,
        message: &DecodedMessage,
        uploads: &UploadQueue,
    ) -> Result<()> {
        let category = MessageCategory::from_type(&connection.info.message_type);

        if category == MessageCategory::Image {
            return self.route_image(connection, message, uploads);
        }

        let row = match category.selected_fields() {
            Some(selection) => FlatRow::from_fields(select_fields(&message.fields, selection)),
            None => FlatRow::from_fields(&message.fields),
        };
        write_row(connection, message.time, row)
    }

    fn route_image(
        &self,
        connection: &mut Connection,
        message: &DecodedMessage,
        uploads: &UploadQueue,
    ) -> Result<()> {
        let frame = ImageFrame::from_fields(&message.fields)?;

        let iso = message.time.iso();
        let number = connection.next_frame();
        let file_name = format!("{}-{}-{:04}.png", connection.channel, iso, number);
        let channel_dir = self.output_dir.join(&connection.channel);
        std::fs::create_dir_all(&channel_dir)?;

        let path = channel_dir.join(&file_name);
        frame.save_png(&path)?;
        debug!(
            "Saved {}x{} frame {} of '{}'",
            frame.width, frame.height, number, connection.info.topic
        );
        uploads.push_frame(path)?;

        if !connection.header_written() {
            connection
                .table()
                .write_row(["Time", "ISOTime", "Frame"])?;
            connection.mark_header_written(1);
        }
        let relative = format!("{}/{}", connection.channel, file_name);
        connection
            .table()
            .write_row([message.time.raw().to_string(), iso, relative])
    }
}
