//! Host capabilities the capture session is built on.
//!
//! The session never touches devices or encoders directly. Everything goes
//! through a [`MediaProvider`], so a browser binding, a native backend or the
//! synthetic provider in [`crate::testing`] can be swapped in.

use crate::errors::CaptureResult;
use crate::types::{Blob, MediaConstraints, MediaDeviceInfo, MediaStream, ObjectUrl, TrackKind, VideoFrame};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc::UnboundedReceiver;

/// One live audio or video track.
pub trait MediaTrack: std::fmt::Debug + Send + Sync {
    fn id(&self) -> &str;
    fn kind(&self) -> TrackKind;
    /// Releases the underlying device. Must be idempotent.
    fn stop(&self);
    fn is_live(&self) -> bool;

    /// Id of the device backing this track. Hosts that cannot tell return
    /// `None`.
    fn device_id(&self) -> Option<&str> {
        None
    }
}

/// Options handed to the recorder when a recording starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderOptions {
    pub mime_type: String,
    pub video_bits_per_second: Option<u32>,
    pub audio_bits_per_second: Option<u32>,
    /// Fragment interval in milliseconds; `None` emits one fragment on stop
    pub timeslice_ms: Option<u64>,
}

/// Events emitted by a running recorder, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    Data(Bytes),
    Finalized,
    Error(String),
}

/// A running host recorder. Data arrives on the event channel returned by
/// [`MediaProvider::create_recorder`].
pub trait RecorderSession: Send {
    /// Requests finalization. The recorder flushes pending data and then
    /// emits [`RecorderEvent::Finalized`].
    fn stop(&mut self) -> CaptureResult<()>;
    fn mime_type(&self) -> &str;
}

#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Lists every media device the host exposes.
    async fn enumerate_devices(&self) -> CaptureResult<Vec<MediaDeviceInfo>>;

    /// Acquires a stream matching `constraints`, prompting for permission if
    /// the host requires it.
    async fn request_access(&self, constraints: &MediaConstraints) -> CaptureResult<MediaStream>;

    fn is_mime_supported(&self, mime_type: &str) -> bool;

    /// Starts recording `stream`.
    fn create_recorder(
        &self,
        stream: &MediaStream,
        options: &RecorderOptions,
    ) -> CaptureResult<(Box<dyn RecorderSession>, UnboundedReceiver<RecorderEvent>)>;

    /// Grabs the frame currently shown by the preview.
    fn grab_frame(&self, stream: &MediaStream) -> CaptureResult<VideoFrame>;

    fn export_blob(&self, blob: &Blob) -> CaptureResult<ObjectUrl>;

    /// Revokes a URL created by [`MediaProvider::export_blob`]. Callers must
    /// revoke each URL exactly once.
    fn revoke(&self, url: &ObjectUrl);
}
