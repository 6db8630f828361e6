//! Capture session controller
//!
//! [`CaptureSession`] negotiates camera access, keeps exactly one live stream,
//! cycles between cameras and drives recording and photo capture on top of an
//! injected [`MediaProvider`](crate::provider::MediaProvider).

mod controller;
mod state;

pub use controller::CaptureSession;
pub use state::{SessionSnapshot, SessionState, TeardownReport};
