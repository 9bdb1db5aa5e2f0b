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

// Image frames from decoded image messages

use image::{GrayImage, ImageFormat, RgbImage, RgbaImage};
use std::path::Path;

use crate::decoder::{find_scalar, DecodedField};
use crate::error::{BagError, Result};

/// Pixel layout of a supported encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb,
    Rgba,
    Luma,
    /// 3 channels in blue, green, red order
    Bgr,
}

impl PixelLayout {
    pub fn from_encoding(encoding: &str) -> Result<Self> {
        match encoding {
            "rgb8" => Ok(PixelLayout::Rgb),
            "rgba8" => Ok(PixelLayout::Rgba),
            "mono8" => Ok(PixelLayout::Luma),
            "8UC3" => Ok(PixelLayout::Bgr),
            other => Err(BagError::UnsupportedEncoding(other.to_string())),
        }
    }

    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Rgb | PixelLayout::Bgr => 3,
            PixelLayout::Rgba => 4,
            PixelLayout::Luma => 1,
        }
    }
}

/// Tightly packed pixels of one image message
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pixels: Vec<u8>,
}

impl ImageFrame {
    /// Build a frame from the `width`, `height`, `encoding`, `step` and
    /// `data` fields of an image message
    pub fn from_fields(fields: &[DecodedField]) -> Result<Self> {
        let encoding = find_scalar(fields, "encoding")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BagError::InvalidImage("missing 'encoding'".to_string()))?;
        let layout = PixelLayout::from_encoding(encoding)?;

        let width = dimension(fields, "width")?;
        let height = dimension(fields, "height")?;
        let data = find_scalar(fields, "data")
            .and_then(|v| v.as_bytes())
            .ok_or_else(|| BagError::InvalidImage("missing pixel 'data'".to_string()))?;

        let row_len = width as usize * layout.channels();
        let step = match find_scalar(fields, "step").and_then(|v| v.as_u64()) {
            Some(step) if step > 0 => step as usize,
            _ => row_len,
        };
        if step < row_len {
            return Err(BagError::InvalidImage(format!(
                "step {} shorter than a {}-pixel row ({} bytes)",
                step, width, row_len
            )));
        }

        let needed = match height as usize {
            0 => 0,
            h => step * (h - 1) + row_len,
        };
        if data.len() < needed {
            return Err(BagError::InvalidImage(format!(
                "{}x{} {} needs {} bytes, got {}",
                width,
                height,
                encoding,
                needed,
                data.len()
            )));
        }

        // Drop row padding
        let mut pixels = Vec::with_capacity(row_len * height as usize);
        for row in 0..height as usize {
            let start = row * step;
            pixels.extend_from_slice(&data[start..start + row_len]);
        }

        if layout == PixelLayout::Bgr {
            for pixel in pixels.chunks_exact_mut(3) {
                pixel.swap(0, 2);
            }
        }

        Ok(Self {
            width,
            height,
            layout,
            pixels,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Write the frame as PNG
    pub fn save_png(&self, path: &Path) -> Result<()> {
        let (w, h) = (self.width, self.height);
        let pixels = self.pixels.clone();
        let mismatch = || BagError::InvalidImage(format!("{}x{} buffer size mismatch", w, h));

        match self.layout {
            PixelLayout::Rgb | PixelLayout::Bgr => RgbImage::from_raw(w, h, pixels)
                .ok_or_else(mismatch)?
                .save_with_format(path, ImageFormat::Png)?,
            PixelLayout::Rgba => RgbaImage::from_raw(w, h, pixels)
                .ok_or_else(mismatch)?
                .save_with_format(path, ImageFormat::Png)?,
            PixelLayout::Luma => GrayImage::from_raw(w, h, pixels)
                .ok_or_else(mismatch)?
                .save_with_format(path, ImageFormat::Png)?,
        }
        Ok(())
    }
}

fn dimension(fields: &[DecodedField], name: &str) -> Result<u32> {
    find_scalar(fields, name)
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| BagError::InvalidImage(format!("missing or invalid '{}'", name)))
}
