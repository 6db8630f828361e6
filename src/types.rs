use crate::provider::MediaTrack;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Logical camera selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, mirrored in preview
    #[default]
    User,
    /// Rear camera
    Environment,
}

impl FacingMode {
    pub fn flipped(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }

    /// Preview of the user-facing camera is shown mirrored.
    pub fn is_mirrored(self) -> bool {
        self == FacingMode::User
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
        }
    }
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(FacingMode::User),
            "environment" => Ok(FacingMode::Environment),
            other => Err(format!("unknown facing mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// Descriptor returned by device enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDeviceInfo {
    pub device_id: String,
    pub kind: DeviceKind,
    pub label: String,
    pub group_id: Option<String>,
}

impl MediaDeviceInfo {
    pub fn video_input(device_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            kind: DeviceKind::VideoInput,
            label: label.into(),
            group_id: None,
        }
    }
}

/// How the video source is picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoSelector {
    /// Symbolic facing constraint; the host picks a matching camera
    Facing(FacingMode),
    /// Exact device id match
    DeviceId(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConstraints {
    pub selector: VideoSelector,
    pub ideal_width: Option<u32>,
    pub ideal_height: Option<u32>,
    pub zoom: Option<f32>,
}

/// Constraints passed to [`MediaProvider::request_access`](crate::provider::MediaProvider::request_access).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: VideoConstraints,
}

impl MediaConstraints {
    pub fn facing(facing: FacingMode) -> Self {
        Self {
            audio: true,
            video: VideoConstraints {
                selector: VideoSelector::Facing(facing),
                ideal_width: None,
                ideal_height: None,
                zoom: None,
            },
        }
    }

    pub fn device(device_id: impl Into<String>) -> Self {
        Self {
            audio: true,
            video: VideoConstraints {
                selector: VideoSelector::DeviceId(device_id.into()),
                ideal_width: None,
                ideal_height: None,
                zoom: None,
            },
        }
    }

    pub fn with_audio(mut self, audio: bool) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_ideal_size(mut self, width: u32, height: u32) -> Self {
        self.video.ideal_width = Some(width);
        self.video.ideal_height = Some(height);
        self
    }

    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.video.zoom = Some(zoom);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Handle to a set of live tracks returned by one acquisition.
#[derive(Debug, Clone)]
pub struct MediaStream {
    pub id: Uuid,
    pub tracks: Vec<Arc<dyn MediaTrack>>,
}

impl MediaStream {
    pub fn new(tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tracks,
        }
    }

    /// Stops every track. Stopping an already stopped track is harmless.
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    pub fn live_track_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    pub fn is_active(&self) -> bool {
        self.live_track_count() > 0
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &Arc<dyn MediaTrack>> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    /// A stream can be previewed, photographed or recorded only while its
    /// video track is live; a surviving audio track is not enough.
    pub fn has_live_video(&self) -> bool {
        self.video_tracks().any(|t| t.is_live())
    }

    /// Device the live video track was opened on, when the host reports it.
    pub fn video_device_id(&self) -> Option<&str> {
        self.video_tracks()
            .filter(|t| t.is_live())
            .find_map(|t| t.device_id())
    }
}

/// Assembled binary payload with its mime type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub data: Bytes,
    pub mime_type: String,
}

impl Blob {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Revocable reference URL for a blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectUrl(pub String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single RGB24 frame grabbed from the live preview.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl VideoFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == (self.width as usize) * (self.height as usize) * 3
    }
}
