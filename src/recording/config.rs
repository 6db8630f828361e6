//! Recording configuration types

use serde::{Deserialize, Serialize};

/// Quality presets for video recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordingQuality {
    /// Lower bitrate, good for previews and quick clips
    Low,
    /// Balanced quality
    Medium,
    /// High quality
    #[default]
    High,
    /// Let the host pick its own bitrates
    Custom,
}

impl RecordingQuality {
    /// Recommended video bitrate in bits per second
    pub fn video_bitrate(&self) -> Option<u32> {
        match self {
            RecordingQuality::Low => Some(1_000_000),
            RecordingQuality::Medium => Some(2_500_000),
            RecordingQuality::High => Some(5_000_000),
            RecordingQuality::Custom => None,
        }
    }

    /// Recommended audio bitrate in bits per second
    pub fn audio_bitrate(&self) -> Option<u32> {
        match self {
            RecordingQuality::Low => Some(64_000),
            RecordingQuality::Medium => Some(96_000),
            RecordingQuality::High => Some(128_000),
            RecordingQuality::Custom => None,
        }
    }
}

/// Configuration for recording the active stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Container/codec hints tried in order; the first one the host supports wins
    pub mime_types: Vec<String>,
    /// Quality preset used for bitrate hints
    pub quality: RecordingQuality,
    /// Fragment interval in milliseconds (`None` = single fragment on stop)
    pub timeslice_ms: Option<u64>,
    /// Upper bound on waiting for the recorder to finalize after stop
    pub finalize_timeout_ms: u64,
}

impl RecordingConfig {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_types: vec![mime_type.into()],
            ..Self::default()
        }
    }

    pub fn with_quality(mut self, quality: RecordingQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_timeslice(mut self, timeslice_ms: u64) -> Self {
        self.timeslice_ms = Some(timeslice_ms);
        self
    }

    pub fn with_fallback(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_types.push(mime_type.into());
        self
    }

    pub fn with_finalize_timeout(mut self, timeout_ms: u64) -> Self {
        self.finalize_timeout_ms = timeout_ms;
        self
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            mime_types: vec![
                "video/webm;codecs=vp8,opus".to_string(),
                "video/webm".to_string(),
                "video/mp4".to_string(),
            ],
            quality: RecordingQuality::default(),
            timeslice_ms: Some(1000),
            finalize_timeout_ms: 5000,
        }
    }
}

/// Statistics for a finished recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingStats {
    /// Number of fragments received from the recorder
    pub chunks: u64,
    /// Size of the assembled artifact
    pub bytes: u64,
    /// Wall-clock duration in seconds
    pub duration_secs: f64,
    /// Whether the recorder signalled finalization before the timeout
    pub finalized: bool,
}

impl RecordingStats {
    /// Average bitrate achieved
    pub fn avg_bitrate(&self) -> f64 {
        if self.duration_secs > 0.0 {
            (self.bytes as f64 * 8.0) / self.duration_secs
        } else {
            0.0
        }
    }
}
