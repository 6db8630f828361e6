//! Configuration management for CrabRecorder
//!
//! Provides configuration loading, saving and validation for camera
//! acquisition, recording and photo settings.

use crate::errors::CaptureError;
use crate::photo::PhotoConfig;
use crate::recording::RecordingConfig;
use crate::types::{FacingMode, MediaConstraints};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CrabRecorderConfig {
    pub camera: CameraConfig,
    pub recording: RecordingConfig,
    pub photo: PhotoConfig,
}

/// Camera acquisition configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Facing mode requested at initialization
    pub initial_facing_mode: FacingMode,
    /// Allow flipping and cycling between cameras
    pub enable_flip: bool,
    /// Allow still photo capture
    pub enable_photo: bool,
    /// Request microphone access together with the camera
    pub audio: bool,
    /// Preferred resolution [width, height], passed as an ideal constraint
    pub ideal_resolution: Option<[u32; 2]>,
    /// Requested zoom level
    pub zoom: Option<f32>,
    /// Upper bound on a single acquisition or enumeration in milliseconds
    pub acquire_timeout_ms: u64,
    /// Open and immediately stop a stream before enumerating so hosts that
    /// hide device labels until permission is granted report them. Without
    /// it `MediaDeviceInfo::label` may be blank on such hosts.
    pub prime_device_labels: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            initial_facing_mode: FacingMode::User,
            enable_flip: true,
            enable_photo: true,
            audio: true,
            ideal_resolution: Some([1280, 720]),
            zoom: Some(1.0),
            acquire_timeout_ms: 10_000,
            prime_device_labels: false,
        }
    }
}

impl CameraConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Applies the audio, resolution and zoom preferences to `constraints`.
    pub fn apply(&self, constraints: MediaConstraints) -> MediaConstraints {
        let mut constraints = constraints.with_audio(self.audio);
        if let Some([w, h]) = self.ideal_resolution {
            constraints = constraints.with_ideal_size(w, h);
        }
        if let Some(zoom) = self.zoom {
            constraints = constraints.with_zoom(zoom);
        }
        constraints
    }
}

impl CrabRecorderConfig {
    pub fn with_flip(mut self, enabled: bool) -> Self {
        self.camera.enable_flip = enabled;
        self
    }

    pub fn with_photo(mut self, enabled: bool) -> Self {
        self.camera.enable_photo = enabled;
        self
    }

    pub fn with_initial_facing(mut self, facing: FacingMode) -> Self {
        self.camera.initial_facing_mode = facing;
        self
    }

    pub fn with_label_priming(mut self, enabled: bool) -> Self {
        self.camera.prime_device_labels = enabled;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.camera.acquire_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CaptureError::Config(format!("Failed to read config file: {}", e)))?;

        let config: CrabRecorderConfig = toml::from_str(&contents)
            .map_err(|e| CaptureError::Config(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CaptureError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CaptureError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CaptureError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CaptureError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabrecorder.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.camera.acquire_timeout_ms == 0 {
            return Err(CaptureError::Config("Acquire timeout must be positive".to_string()));
        }
        if let Some([w, h]) = self.camera.ideal_resolution {
            if w == 0 || h == 0 {
                return Err(CaptureError::Config("Invalid ideal resolution".to_string()));
            }
        }
        if let Some(zoom) = self.camera.zoom {
            if !(zoom.is_finite() && zoom > 0.0) {
                return Err(CaptureError::Config("Zoom must be a positive number".to_string()));
            }
        }

        if self.recording.mime_types.is_empty() {
            return Err(CaptureError::Config("At least one recording mime type is required".to_string()));
        }
        if self.recording.mime_types.iter().any(|m| m.trim().is_empty()) {
            return Err(CaptureError::Config("Recording mime types must not be empty".to_string()));
        }
        if self.recording.timeslice_ms == Some(0) {
            return Err(CaptureError::Config("Recording timeslice must be positive".to_string()));
        }

        if self.photo.jpeg_quality == 0 || self.photo.jpeg_quality > 100 {
            return Err(CaptureError::Config("JPEG quality must be between 1 and 100".to_string()));
        }

        Ok(())
    }
}
