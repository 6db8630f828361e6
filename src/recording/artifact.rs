use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::RecordingStats;
use crate::types::ObjectUrl;

/// Finished recording, playable and downloadable through its reference URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Uuid,
    pub url: ObjectUrl,
    pub mime_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub stats: RecordingStats,
}

impl Artifact {
    pub fn is_empty(&self) -> bool {
        self.size_bytes == 0
    }

    /// File extension matching the container in the mime type.
    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }

    /// Name offered for download, e.g. `recording-20240131-154500.webm`.
    pub fn download_name(&self) -> String {
        format!(
            "recording-{}.{}",
            self.created_at.format("%Y%m%d-%H%M%S"),
            self.extension()
        )
    }
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let container = mime_type.split(';').next().unwrap_or("").trim();
    match container {
        "video/webm" | "audio/webm" => "webm",
        "video/mp4" | "audio/mp4" => "mp4",
        "video/x-matroska" => "mkv",
        "video/ogg" | "audio/ogg" => "ogg",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        _ => "bin",
    }
}
