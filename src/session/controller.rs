use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use super::state::{SessionSnapshot, SessionState, TeardownReport};
use crate::config::CrabRecorderConfig;
use crate::errors::{CaptureError, CaptureResult};
use crate::permissions::PermissionState;
use crate::photo::{encode_frame, Photo};
use crate::provider::MediaProvider;
use crate::recording::{Artifact, Recorder};
use crate::types::{DeviceKind, FacingMode, MediaConstraints, MediaDeviceInfo, MediaStream};
use crate::urls::{UrlPurpose, UrlRegistry};

struct Inner {
    state: SessionState,
    permission: PermissionState,
    stream: Option<MediaStream>,
    devices: Vec<MediaDeviceInfo>,
    camera_index: usize,
    facing: FacingMode,
    recorder: Option<Recorder>,
    artifact: Option<Artifact>,
    photo: Option<Photo>,
    urls: UrlRegistry,
}

impl Inner {
    /// Stops the current stream, if any. The session never holds more than
    /// one stream, so this leaves no live tracks behind.
    fn release_stream(&mut self) -> usize {
        match self.stream.take() {
            Some(stream) => {
                let live = stream.live_track_count();
                stream.stop_all();
                log::debug!("Stopped stream {} ({} live tracks)", stream.id, live);
                live
            }
            None => 0,
        }
    }

    fn active_stream(&self) -> Option<&MediaStream> {
        self.stream.as_ref().filter(|s| s.has_live_video())
    }

    /// Points the cycling cursor at the device the stream was opened on.
    fn sync_cursor(&mut self) {
        let opened = self.stream.as_ref().and_then(MediaStream::video_device_id);
        if let Some(idx) = opened.and_then(|id| self.devices.iter().position(|d| d.device_id == id)) {
            self.camera_index = idx;
        }
    }
}

/// Clears the in-flight flag when an acquisition settles or is cancelled.
struct AcquireGuard<'a>(&'a AtomicBool);

impl Drop for AcquireGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns device acquisition, the recording lifecycle and resource teardown for
/// one camera view.
///
/// All methods take `&self`; at most one acquisition (initialize, flip or
/// cycle) may be in flight at a time and a concurrent one is rejected with
/// [`CaptureError::AcquisitionInFlight`].
pub struct CaptureSession<P: MediaProvider> {
    provider: Arc<P>,
    config: CrabRecorderConfig,
    inner: Mutex<Inner>,
    acquiring: AtomicBool,
}

impl<P: MediaProvider> CaptureSession<P> {
    pub fn new(provider: Arc<P>, config: CrabRecorderConfig) -> CaptureResult<Self> {
        config.validate()?;
        let facing = config.camera.initial_facing_mode;
        Ok(Self {
            provider,
            config,
            inner: Mutex::new(Inner {
                state: SessionState::Uninitialized,
                permission: PermissionState::pending(),
                stream: None,
                devices: Vec::new(),
                camera_index: 0,
                facing,
                recorder: None,
                artifact: None,
                photo: None,
                urls: UrlRegistry::new(),
            }),
            acquiring: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &CrabRecorderConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_acquire(&self) -> CaptureResult<AcquireGuard<'_>> {
        self.acquiring
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CaptureError::AcquisitionInFlight)?;
        Ok(AcquireGuard(&self.acquiring))
    }

    async fn acquire(&self, constraints: MediaConstraints) -> CaptureResult<MediaStream> {
        let timeout = self.config.camera.acquire_timeout();
        log::debug!("Requesting access with {:?}", constraints.video.selector);
        match tokio::time::timeout(timeout, self.provider.request_access(&constraints)).await {
            Ok(result) => result,
            Err(_) => Err(CaptureError::AcquisitionTimeout(timeout.as_millis() as u64)),
        }
    }

    /// Records the outcome of an acquisition. `on_success` runs under the
    /// same lock that installs the stream.
    fn settle(
        &self,
        result: CaptureResult<MediaStream>,
        on_success: impl FnOnce(&mut Inner),
    ) -> CaptureResult<()> {
        let mut inner = self.lock();

        if inner.state == SessionState::TornDown {
            if let Ok(stream) = &result {
                stream.stop_all();
            }
            return Err(CaptureError::InvalidState(
                "session was torn down during acquisition".to_string(),
            ));
        }

        match result {
            Ok(stream) => {
                inner.release_stream();
                log::info!(
                    "Camera access granted: stream {} with {} tracks",
                    stream.id,
                    stream.tracks.len()
                );
                inner.stream = Some(stream);
                inner.sync_cursor();
                inner.permission = PermissionState::granted();
                inner.state = SessionState::Previewing;
                on_success(&mut *inner);
                Ok(())
            }
            Err(e) => {
                log::warn!("Camera access failed: {}", e);
                inner.permission = PermissionState::denied(e.clone());
                inner.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Enumerates cameras and opens the initially configured one.
    ///
    /// A failed acquisition is recorded in [`Self::permission`] and is not
    /// retried automatically; calling `initialize` again from `Failed` asks
    /// for access anew.
    pub async fn initialize(&self) -> CaptureResult<()> {
        let _guard = self.begin_acquire()?;
        let facing = {
            let mut inner = self.lock();
            // AwaitingPermission without an in-flight acquisition is left over
            // from a cancelled call.
            let resumable = matches!(
                inner.state,
                SessionState::Uninitialized
                    | SessionState::AwaitingPermission
                    | SessionState::Failed
            );
            if !resumable || inner.stream.is_some() {
                return Err(CaptureError::InvalidState(format!(
                    "cannot initialize while {}",
                    inner.state
                )));
            }
            inner.state = SessionState::AwaitingPermission;
            inner.permission = PermissionState::pending();
            inner.facing
        };

        if self.config.camera.prime_device_labels {
            self.prime_labels(facing).await;
        }

        let timeout = self.config.camera.acquire_timeout();
        let devices = match tokio::time::timeout(timeout, self.provider.enumerate_devices()).await {
            Ok(Ok(devices)) => devices
                .into_iter()
                .filter(|d| d.kind == DeviceKind::VideoInput)
                .collect::<Vec<_>>(),
            Ok(Err(e)) => {
                log::warn!("Device enumeration failed, camera switching disabled: {}", e);
                Vec::new()
            }
            Err(_) => {
                log::warn!(
                    "Device enumeration timed out after {:?}, camera switching disabled",
                    timeout
                );
                Vec::new()
            }
        };
        log::info!("Found {} video input(s)", devices.len());

        {
            let mut inner = self.lock();
            if inner.state == SessionState::TornDown {
                return Err(CaptureError::InvalidState(
                    "session was torn down during initialization".to_string(),
                ));
            }
            inner.devices = devices;
            inner.camera_index = 0;
        }

        let constraints = self.config.camera.apply(MediaConstraints::facing(facing));
        let result = self.acquire(constraints).await;
        self.settle(result, |_| {})
    }

    /// Opens and immediately stops a stream so the host fills in device
    /// labels. Failures are logged; the real acquisition reports them.
    async fn prime_labels(&self, facing: FacingMode) {
        let constraints = self.config.camera.apply(MediaConstraints::facing(facing));
        match self.acquire(constraints).await {
            Ok(stream) => {
                stream.stop_all();
                log::debug!("Primed device labels with stream {}", stream.id);
            }
            Err(e) => log::warn!("Could not prime device labels: {}", e),
        }
    }

    fn check_switch(&self, inner: &Inner) -> CaptureResult<()> {
        if !self.config.camera.enable_flip {
            return Err(CaptureError::FlipUnavailable("camera switching is disabled".to_string()));
        }
        if inner.devices.len() < 2 {
            return Err(CaptureError::FlipUnavailable(format!(
                "{} video input(s) available",
                inner.devices.len()
            )));
        }
        if !inner.state.allows_camera_switch() {
            return Err(CaptureError::InvalidState(format!(
                "cannot switch camera while {}",
                inner.state
            )));
        }
        Ok(())
    }

    /// Reopens the camera facing the other way. The current stream is fully
    /// stopped before the new one is requested.
    pub async fn toggle_facing(&self) -> CaptureResult<FacingMode> {
        let _guard = self.begin_acquire()?;
        let target = {
            let mut inner = self.lock();
            self.check_switch(&inner)?;
            inner.release_stream();
            inner.state = SessionState::AwaitingPermission;
            inner.permission = PermissionState::pending();
            inner.facing.flipped()
        };

        let constraints = self.config.camera.apply(MediaConstraints::facing(target));
        let result = self.acquire(constraints).await;
        self.settle(result, |inner| inner.facing = target)?;
        log::info!("Switched to {} facing camera", target);
        Ok(target)
    }

    /// Opens the next camera in enumeration order, wrapping back to the first
    /// after the last. The cursor advances even when the acquisition fails so
    /// a broken device does not block cycling.
    pub async fn cycle_camera(&self) -> CaptureResult<MediaDeviceInfo> {
        let _guard = self.begin_acquire()?;
        let device = {
            let mut inner = self.lock();
            self.check_switch(&inner)?;
            let next = (inner.camera_index + 1) % inner.devices.len();
            inner.camera_index = next;
            let device = inner.devices[next].clone();
            inner.release_stream();
            inner.state = SessionState::AwaitingPermission;
            inner.permission = PermissionState::pending();
            device
        };

        let constraints = self
            .config
            .camera
            .apply(MediaConstraints::device(device.device_id.clone()));
        let result = self.acquire(constraints).await;
        self.settle(result, |_| {})?;
        log::info!("Switched to camera {} ({})", device.label, device.device_id);
        Ok(device)
    }

    /// Starts recording the active stream.
    ///
    /// Returns `Ok(false)` without creating a recorder when there is no active
    /// stream or the session is not previewing.
    pub fn start_recording(&self) -> CaptureResult<bool> {
        let mut inner = self.lock();
        if inner.state != SessionState::Previewing {
            log::debug!("Ignoring start_recording while {}", inner.state);
            return Ok(false);
        }
        let stream = match inner.active_stream() {
            Some(stream) => stream.clone(),
            None => {
                log::debug!("Ignoring start_recording without an active stream");
                return Ok(false);
            }
        };

        let recorder = Recorder::start(&*self.provider, &stream, &self.config.recording)?;
        inner.recorder = Some(recorder);
        inner.state = SessionState::Recording;
        Ok(true)
    }

    /// Drains fragments emitted so far and returns the buffered byte count,
    /// or `None` when not recording.
    pub fn poll_recording(&self) -> Option<usize> {
        self.lock().recorder.as_mut().map(Recorder::poll)
    }

    /// Stops the recorder and turns its fragments into a playable artifact.
    pub async fn stop_recording(&self) -> CaptureResult<Artifact> {
        let recorder = {
            let mut inner = self.lock();
            if inner.state != SessionState::Recording {
                return Err(CaptureError::InvalidState(format!(
                    "cannot stop recording while {}",
                    inner.state
                )));
            }
            inner.recorder.take().ok_or_else(|| {
                CaptureError::InvalidState("recording is already stopping".to_string())
            })?
        };

        let timeout = Duration::from_millis(self.config.recording.finalize_timeout_ms);
        let result = recorder.finish(timeout).await;

        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.state == SessionState::TornDown {
            return Err(CaptureError::InvalidState(
                "session was torn down while stopping".to_string(),
            ));
        }

        let media = match result {
            Ok(media) => media,
            Err(e) => {
                inner.state = SessionState::Previewing;
                return Err(e);
            }
        };

        let url = match self.provider.export_blob(&media.blob) {
            Ok(url) => url,
            Err(e) => {
                log::error!("Failed to export recording {}: {}", media.id, e);
                inner.state = SessionState::Previewing;
                return Err(e);
            }
        };
        inner.urls.track(url.clone(), UrlPurpose::Recording);

        let artifact = Artifact {
            id: media.id,
            url,
            mime_type: media.blob.mime_type.clone(),
            size_bytes: media.blob.len() as u64,
            created_at: Utc::now(),
            stats: media.stats,
        };
        inner.artifact = Some(artifact.clone());
        inner.state = SessionState::Finished;
        Ok(artifact)
    }

    /// Captures the current preview frame as a still photo.
    ///
    /// Returns `Ok(None)` when there is no active stream. The previous photo's
    /// URL is revoked once the new one is exported.
    pub fn take_photo(&self) -> CaptureResult<Option<Photo>> {
        if !self.config.camera.enable_photo {
            return Err(CaptureError::PhotoDisabled);
        }

        let mut guard = self.lock();
        let inner = &mut *guard;
        let stream = match inner.active_stream() {
            Some(stream) => stream,
            None => return Ok(None),
        };

        let frame = self.provider.grab_frame(stream)?;
        let (width, height) = (frame.width, frame.height);
        let mirror = self.config.photo.mirror_user_facing && inner.facing.is_mirrored();
        let blob = encode_frame(frame, &self.config.photo, mirror)?;
        let url = self.provider.export_blob(&blob)?;

        if let Some(previous) = inner.photo.take() {
            inner.urls.revoke(&previous.url, &*self.provider);
        }
        inner.urls.track(url.clone(), UrlPurpose::Photo);

        let photo = Photo {
            id: Uuid::new_v4(),
            url,
            mime_type: blob.mime_type,
            width,
            height,
            size_bytes: blob.data.len() as u64,
            facing: inner.facing,
            taken_at: Utc::now(),
        };
        log::info!("Photo {} taken ({}x{}, {} bytes)", photo.id, width, height, photo.size_bytes);
        inner.photo = Some(photo.clone());
        Ok(Some(photo))
    }

    /// Discards the finished recording and returns to the live preview on the
    /// same stream.
    pub fn retry(&self) -> CaptureResult<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.state != SessionState::Finished {
            return Err(CaptureError::InvalidState(format!(
                "cannot retry while {}",
                inner.state
            )));
        }

        if let Some(artifact) = inner.artifact.take() {
            inner.urls.revoke(&artifact.url, &*self.provider);
        }
        inner.state = SessionState::Previewing;
        log::info!("Returned to preview");
        Ok(())
    }

    /// Stops the camera and returns to `Uninitialized`. Outstanding URLs stay
    /// valid until [`Self::teardown`]. Returns whether a stream was released.
    pub fn release_camera(&self) -> CaptureResult<bool> {
        let mut inner = self.lock();
        match inner.state {
            SessionState::Recording => {
                return Err(CaptureError::InvalidState(
                    "stop the recording before releasing the camera".to_string(),
                ))
            }
            SessionState::TornDown | SessionState::Uninitialized => return Ok(false),
            _ => {}
        }
        if inner.stream.is_none() {
            return Ok(false);
        }

        inner.release_stream();
        inner.artifact = None;
        inner.permission = PermissionState::pending();
        inner.state = SessionState::Uninitialized;
        log::info!("Camera released");
        Ok(true)
    }

    /// Stops every track and recorder and revokes every outstanding URL.
    /// Safe to call repeatedly; later calls release nothing.
    pub fn teardown(&self) -> TeardownReport {
        let mut guard = self.lock();
        let inner = &mut *guard;

        let recording_aborted = match inner.recorder.take() {
            Some(recorder) => {
                recorder.abort();
                true
            }
            None => false,
        };
        let tracks_stopped = inner.release_stream();
        let urls_revoked = inner.urls.revoke_all(&*self.provider);
        inner.artifact = None;
        inner.photo = None;

        if inner.state != SessionState::TornDown {
            log::info!(
                "Session torn down: {} tracks stopped, {} urls revoked",
                tracks_stopped,
                urls_revoked
            );
        }
        inner.state = SessionState::TornDown;

        TeardownReport {
            tracks_stopped,
            urls_revoked,
            recording_aborted,
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn permission(&self) -> PermissionState {
        self.lock().permission.clone()
    }

    /// True while permission has not been granted.
    pub fn camera_unavailable(&self) -> bool {
        !self.lock().permission.granted
    }

    pub fn facing(&self) -> FacingMode {
        self.lock().facing
    }

    pub fn mirror_preview(&self) -> bool {
        self.lock().facing.is_mirrored()
    }

    pub fn can_flip(&self) -> bool {
        self.config.camera.enable_flip && self.lock().devices.len() > 1
    }

    pub fn devices(&self) -> Vec<MediaDeviceInfo> {
        self.lock().devices.clone()
    }

    pub fn camera_index(&self) -> usize {
        self.lock().camera_index
    }

    pub fn active_stream_id(&self) -> Option<Uuid> {
        self.lock().stream.as_ref().map(|s| s.id)
    }

    pub fn is_recording(&self) -> bool {
        self.lock().state == SessionState::Recording
    }

    pub fn artifact(&self) -> Option<Artifact> {
        self.lock().artifact.clone()
    }

    pub fn photo(&self) -> Option<Photo> {
        self.lock().photo.clone()
    }

    pub fn outstanding_urls(&self) -> usize {
        self.lock().urls.outstanding_count()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        SessionSnapshot {
            state: inner.state,
            permission: inner.permission.status(),
            permission_error: inner.permission.error.as_ref().map(|e| e.to_string()),
            facing: inner.facing,
            mirror_preview: inner.facing.is_mirrored(),
            can_flip: self.config.camera.enable_flip && inner.devices.len() > 1,
            can_take_photo: self.config.camera.enable_photo && inner.active_stream().is_some(),
            device_count: inner.devices.len(),
            camera_index: inner.camera_index,
            stream_id: inner.stream.as_ref().map(|s| s.id),
            recording_bytes: inner.recorder.as_ref().map(Recorder::buffered_bytes),
            artifact: inner.artifact.clone(),
            photo: inner.photo.clone(),
        }
    }
}

impl<P: MediaProvider> Drop for CaptureSession<P> {
    fn drop(&mut self) {
        let report = self.teardown();
        if report.tracks_stopped > 0 || report.urls_revoked > 0 {
            log::debug!("Released resources on drop: {:?}", report);
        }
    }
}
