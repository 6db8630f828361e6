//! Still photo encoding
//!
//! Turns a frame grabbed from the live preview into a PNG or JPEG blob.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CaptureError, CaptureResult};
use crate::types::{Blob, FacingMode, ObjectUrl, VideoFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PhotoFormat {
    #[default]
    Png,
    Jpeg,
}

impl PhotoFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            PhotoFormat::Png => "image/png",
            PhotoFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Photo configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    pub format: PhotoFormat,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Bake the preview mirroring into photos from the user-facing camera
    pub mirror_user_facing: bool,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            format: PhotoFormat::Png,
            jpeg_quality: 92,
            mirror_user_facing: false,
        }
    }
}

/// A captured still with its reference URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: Uuid,
    pub url: ObjectUrl,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
    pub facing: FacingMode,
    pub taken_at: DateTime<Utc>,
}

impl Photo {
    pub fn download_name(&self) -> String {
        format!(
            "photo-{}.{}",
            self.taken_at.format("%Y%m%d-%H%M%S"),
            crate::recording::extension_for_mime(&self.mime_type)
        )
    }
}

/// Encodes `frame` according to `config`.
pub fn encode_frame(frame: VideoFrame, config: &PhotoConfig, mirror: bool) -> CaptureResult<Blob> {
    if !frame.is_valid() {
        return Err(CaptureError::Encoding(format!(
            "frame of {} bytes does not match {}x{} RGB",
            frame.data.len(),
            frame.width,
            frame.height
        )));
    }

    let img = RgbImage::from_vec(frame.width, frame.height, frame.data)
        .ok_or_else(|| CaptureError::Encoding("Failed to create image from frame data".to_string()))?;
    let img = if mirror {
        image::imageops::flip_horizontal(&img)
    } else {
        img
    };
    let dynamic_img = DynamicImage::ImageRgb8(img);

    let mut out = Cursor::new(Vec::new());
    match config.format {
        PhotoFormat::Png => dynamic_img
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| CaptureError::Encoding(format!("PNG encoding failed: {}", e)))?,
        PhotoFormat::Jpeg => {
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, config.jpeg_quality);
            dynamic_img
                .write_with_encoder(encoder)
                .map_err(|e| CaptureError::Encoding(format!("JPEG encoding failed: {}", e)))?
        }
    }

    Ok(Blob::new(out.into_inner(), config.format.mime_type()))
}
