use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::permissions::PermissionStatus;
use crate::photo::Photo;
use crate::recording::Artifact;
use crate::types::FacingMode;

/// Lifecycle of a capture session.
///
/// ```text
/// Uninitialized -> AwaitingPermission -> Previewing <-> Recording -> Finished
///                         |                  ^                          |
///                         v                  +---------- retry ---------+
///                       Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    /// An acquisition is in flight
    AwaitingPermission,
    Previewing,
    Recording,
    Finished,
    /// The last acquisition failed; see the permission state for the cause
    Failed,
    TornDown,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::AwaitingPermission => "awaiting_permission",
            SessionState::Previewing => "previewing",
            SessionState::Recording => "recording",
            SessionState::Finished => "finished",
            SessionState::Failed => "failed",
            SessionState::TornDown => "torn_down",
        }
    }

    /// States in which the camera may be flipped or cycled. Callers hold the
    /// acquisition guard, so `AwaitingPermission` here means the previous
    /// acquisition was cancelled.
    pub fn allows_camera_switch(&self) -> bool {
        matches!(
            self,
            SessionState::Previewing | SessionState::Failed | SessionState::AwaitingPermission
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a session for the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub permission: PermissionStatus,
    pub permission_error: Option<String>,
    pub facing: FacingMode,
    pub mirror_preview: bool,
    pub can_flip: bool,
    pub can_take_photo: bool,
    pub device_count: usize,
    pub camera_index: usize,
    pub stream_id: Option<Uuid>,
    pub recording_bytes: Option<usize>,
    pub artifact: Option<Artifact>,
    pub photo: Option<Photo>,
}

impl SessionSnapshot {
    /// Acquisition in flight; the UI shows its loading overlay.
    pub fn is_loading(&self) -> bool {
        self.state == SessionState::AwaitingPermission
    }

    /// The persistent "camera unavailable" indicator.
    pub fn camera_unavailable(&self) -> bool {
        self.permission != PermissionStatus::Granted
    }
}

/// What [`CaptureSession::teardown`](super::CaptureSession::teardown) released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownReport {
    pub tracks_stopped: usize,
    pub urls_revoked: usize,
    pub recording_aborted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_switch_states() {
        assert!(SessionState::Previewing.allows_camera_switch());
        assert!(SessionState::Failed.allows_camera_switch());
        assert!(SessionState::AwaitingPermission.allows_camera_switch());
        assert!(!SessionState::Recording.allows_camera_switch());
        assert!(!SessionState::Finished.allows_camera_switch());
        assert!(!SessionState::TornDown.allows_camera_switch());
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&SessionState::AwaitingPermission).unwrap();
        assert_eq!(json, "\"awaiting_permission\"");
        assert_eq!(SessionState::TornDown.to_string(), "torn_down");
    }
}
