use crate::errors::CaptureError;

/// Permission status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PermissionStatus {
    /// Permission granted
    Granted,
    /// Permission denied, or the last acquisition failed
    Denied,
    /// Permission not determined (no acquisition has settled yet)
    NotDetermined,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
        }
    }
}

/// Outcome of the most recent device acquisition.
///
/// Written once per acquisition attempt and read by the UI to gate controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PermissionState {
    pub granted: bool,
    pub error: Option<CaptureError>,
}

impl PermissionState {
    pub fn granted() -> Self {
        Self {
            granted: true,
            error: None,
        }
    }

    pub fn denied(error: CaptureError) -> Self {
        Self {
            granted: false,
            error: Some(error),
        }
    }

    /// Cleared state used while an acquisition is pending.
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn status(&self) -> PermissionStatus {
        match (self.granted, &self.error) {
            (true, _) => PermissionStatus::Granted,
            (false, Some(_)) => PermissionStatus::Denied,
            (false, None) => PermissionStatus::NotDetermined,
        }
    }

    pub fn message(&self) -> String {
        match (&self.error, self.granted) {
            (_, true) => "Camera access granted".to_string(),
            (Some(e), false) => format!("Camera unavailable: {}", e),
            (None, false) => "Camera permission not yet requested".to_string(),
        }
    }
}
