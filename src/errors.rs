use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the capture session and its media provider.
///
/// Acquisition failures are also recorded in the session's
/// [`PermissionState`](crate::permissions::PermissionState) so the UI can
/// show them without handling the returned error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CaptureError {
    #[error("Permission denied error: {0}")]
    PermissionDenied(String),
    #[error("No matching device: {0}")]
    NoMatchingDevice(String),
    #[error("Overconstrained request: {0}")]
    OverconstrainedRequest(String),
    #[error("No active stream")]
    NoActiveStream,
    #[error("Encoding unavailable: {0}")]
    EncodingUnavailable(String),
    #[error("Device acquisition timed out after {0} ms")]
    AcquisitionTimeout(u64),
    #[error("Another device acquisition is already in flight")]
    AcquisitionInFlight,
    #[error("Camera flip unavailable: {0}")]
    FlipUnavailable(String),
    #[error("Photo capture is disabled")]
    PhotoDisabled,
    #[error("Invalid session state: {0}")]
    InvalidState(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Media provider error: {0}")]
    Provider(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Field-less discriminant of [`CaptureError`], handy for UI mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    PermissionDenied,
    NoMatchingDevice,
    OverconstrainedRequest,
    NoActiveStream,
    EncodingUnavailable,
    AcquisitionTimeout,
    AcquisitionInFlight,
    FlipUnavailable,
    PhotoDisabled,
    InvalidState,
    Encoding,
    Provider,
    Config,
}

impl CaptureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaptureError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            CaptureError::NoMatchingDevice(_) => ErrorKind::NoMatchingDevice,
            CaptureError::OverconstrainedRequest(_) => ErrorKind::OverconstrainedRequest,
            CaptureError::NoActiveStream => ErrorKind::NoActiveStream,
            CaptureError::EncodingUnavailable(_) => ErrorKind::EncodingUnavailable,
            CaptureError::AcquisitionTimeout(_) => ErrorKind::AcquisitionTimeout,
            CaptureError::AcquisitionInFlight => ErrorKind::AcquisitionInFlight,
            CaptureError::FlipUnavailable(_) => ErrorKind::FlipUnavailable,
            CaptureError::PhotoDisabled => ErrorKind::PhotoDisabled,
            CaptureError::InvalidState(_) => ErrorKind::InvalidState,
            CaptureError::Encoding(_) => ErrorKind::Encoding,
            CaptureError::Provider(_) => ErrorKind::Provider,
            CaptureError::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether this error came out of a device acquisition and belongs in the
    /// permission state.
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::PermissionDenied
                | ErrorKind::NoMatchingDevice
                | ErrorKind::OverconstrainedRequest
                | ErrorKind::AcquisitionTimeout
                | ErrorKind::Provider
        )
    }
}

pub type CaptureResult<T> = Result<T, CaptureError>;
