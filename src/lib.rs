//! CrabRecorder: camera capture sessions over an injected media stack
//!
//! This crate owns the lifecycle of a camera view: permission negotiation,
//! live preview, recording, still photos, camera flipping and resource
//! teardown. Device access and encoding are delegated to a
//! [`MediaProvider`](provider::MediaProvider) supplied by the host.
//!
//! # Features
//! - One live stream at a time, released before every reacquisition
//! - Facing-mode flipping and device-id camera cycling
//! - Recording into a single blob with a revocable reference URL
//! - PNG/JPEG snapshots of the live preview
//! - Idempotent teardown that revokes every URL exactly once
//!
//! # Usage
//! ```rust,ignore
//! use std::sync::Arc;
//! use crabrecorder::{CaptureSession, CrabRecorderConfig};
//!
//! let session = CaptureSession::new(Arc::new(provider), CrabRecorderConfig::default())?;
//! session.initialize().await?;
//! session.start_recording()?;
//! let artifact = session.stop_recording().await?;
//! println!("download {} as {}", artifact.url, artifact.download_name());
//! session.teardown();
//! ```
pub mod config;
pub mod errors;
pub mod permissions;
pub mod photo;
pub mod provider;
pub mod recording;
pub mod session;
pub mod types;
pub mod urls;

// Testing utilities - synthetic provider for offline testing
pub mod testing;

// Re-exports for convenience
pub use config::CrabRecorderConfig;
pub use errors::{CaptureError, CaptureResult, ErrorKind};
pub use permissions::{PermissionState, PermissionStatus};
pub use photo::Photo;
pub use provider::{MediaProvider, MediaTrack, RecorderEvent, RecorderOptions, RecorderSession};
pub use recording::{Artifact, RecordingConfig};
pub use session::{CaptureSession, SessionSnapshot, SessionState, TeardownReport};
pub use types::{FacingMode, MediaConstraints, MediaDeviceInfo, MediaStream, ObjectUrl};

/// Initialize logging for the capture session
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crabrecorder=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}
