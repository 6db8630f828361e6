//! In-memory media provider
//!
//! Behaves like a browser media stack with a configurable set of cameras:
//! acquisitions hand out tracks that can be stopped, recorders emit scripted
//! fragments and every exported URL is tracked so tests can check that it
//! was revoked exactly once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use super::synthetic_data::synthetic_video_frame;
use crate::errors::{CaptureError, CaptureResult};
use crate::provider::{MediaProvider, MediaTrack, RecorderEvent, RecorderOptions, RecorderSession};
use crate::types::{
    Blob, DeviceKind, MediaConstraints, MediaDeviceInfo, MediaStream, ObjectUrl, TrackKind,
    VideoFrame, VideoSelector,
};

#[derive(Debug)]
pub struct SyntheticTrack {
    id: String,
    kind: TrackKind,
    device_id: String,
    live: AtomicBool,
}

impl MediaTrack for SyntheticTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn device_id(&self) -> Option<&str> {
        Some(&self.device_id)
    }
}

struct SyntheticRecorder {
    mime_type: String,
    sender: UnboundedSender<RecorderEvent>,
    on_stop: Vec<Bytes>,
    finalize: bool,
    stopped: bool,
}

impl RecorderSession for SyntheticRecorder {
    fn stop(&mut self) -> CaptureResult<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        for chunk in self.on_stop.drain(..) {
            let _ = self.sender.send(RecorderEvent::Data(chunk));
        }
        if self.finalize {
            let _ = self.sender.send(RecorderEvent::Finalized);
        }
        Ok(())
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

#[derive(Default)]
struct State {
    devices: Vec<MediaDeviceInfo>,
    supported_mime: Vec<String>,
    scripted_failures: Vec<CaptureError>,
    deny_all: Option<CaptureError>,
    acquire_delay: Option<Duration>,
    enumerate_delay: Option<Duration>,
    labels_require_grant: bool,
    granted_once: bool,
    requests: Vec<MediaConstraints>,
    streams: Vec<(MediaStream, Vec<Arc<SyntheticTrack>>)>,
    recorder_sender: Option<UnboundedSender<RecorderEvent>>,
    recorder_options: Vec<RecorderOptions>,
    chunks_on_stop: Vec<Bytes>,
    finalize_on_stop: bool,
    frame_size: (u32, u32),
    frames_grabbed: u64,
    live_urls: HashMap<ObjectUrl, Blob>,
    revocations: HashMap<ObjectUrl, u32>,
}

/// Media provider backed by memory, for tests and the demo binary.
pub struct SyntheticMediaProvider {
    state: Mutex<State>,
    url_counter: AtomicU64,
}

impl SyntheticMediaProvider {
    /// Provider with `count` cameras and one microphone.
    pub fn with_cameras(count: usize) -> Self {
        let mut devices: Vec<MediaDeviceInfo> = (0..count)
            .map(|i| MediaDeviceInfo::video_input(format!("camera-{}", i), format!("Synthetic Camera {}", i)))
            .collect();
        devices.push(MediaDeviceInfo {
            device_id: "microphone-0".to_string(),
            kind: DeviceKind::AudioInput,
            label: "Synthetic Microphone".to_string(),
            group_id: None,
        });

        Self {
            state: Mutex::new(State {
                devices,
                supported_mime: vec!["video/webm".to_string(), "video/webm;codecs=vp8,opus".to_string()],
                finalize_on_stop: true,
                frame_size: (64, 48),
                ..State::default()
            }),
            url_counter: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Every subsequent acquisition fails with `error`.
    pub fn deny_all(&self, error: CaptureError) {
        self.lock().deny_all = Some(error);
    }

    pub fn allow_all(&self) {
        self.lock().deny_all = None;
    }

    /// The next acquisition fails with `error`; later ones are unaffected.
    pub fn fail_next(&self, error: CaptureError) {
        self.lock().scripted_failures.push(error);
    }

    /// Delays every acquisition by `delay`.
    pub fn set_acquire_delay(&self, delay: Duration) {
        self.lock().acquire_delay = Some(delay);
    }

    pub fn set_supported_mime_types(&self, mime_types: &[&str]) {
        self.lock().supported_mime = mime_types.iter().map(|m| m.to_string()).collect();
    }

    /// Fragments emitted when a recorder is stopped.
    pub fn set_chunks_on_stop(&self, chunks: Vec<Bytes>) {
        self.lock().chunks_on_stop = chunks;
    }

    /// When false, stopped recorders never send the finalize event.
    pub fn set_finalize_on_stop(&self, finalize: bool) {
        self.lock().finalize_on_stop = finalize;
    }

    pub fn set_frame_size(&self, width: u32, height: u32) {
        self.lock().frame_size = (width, height);
    }

    /// Emits a fragment from the most recently created recorder.
    pub fn emit_chunk(&self, chunk: impl Into<Bytes>) -> bool {
        match &self.lock().recorder_sender {
            Some(sender) => sender.send(RecorderEvent::Data(chunk.into())).is_ok(),
            None => false,
        }
    }

    /// Emits a recorder failure from the most recently created recorder.
    pub fn emit_error(&self, message: &str) -> bool {
        match &self.lock().recorder_sender {
            Some(sender) => sender.send(RecorderEvent::Error(message.to_string())).is_ok(),
            None => false,
        }
    }

    /// Delays device enumeration by `delay`.
    pub fn set_enumerate_delay(&self, delay: Duration) {
        self.lock().enumerate_delay = Some(delay);
    }

    /// When true, enumeration reports blank labels until an acquisition has
    /// been granted, like browsers do before the permission prompt.
    pub fn set_labels_require_grant(&self, required: bool) {
        self.lock().labels_require_grant = required;
    }

    /// Ends only the video tracks, leaving audio live.
    pub fn end_video_tracks(&self) {
        for (_, tracks) in &self.lock().streams {
            for track in tracks.iter().filter(|t| t.kind() == TrackKind::Video) {
                track.stop();
            }
        }
    }

    /// Ends every track as if the devices were unplugged.
    pub fn end_all_tracks(&self) {
        for (_, tracks) in &self.lock().streams {
            for track in tracks {
                track.stop();
            }
        }
    }

    pub fn requests(&self) -> Vec<MediaConstraints> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn recorder_options(&self) -> Vec<RecorderOptions> {
        self.lock().recorder_options.clone()
    }

    /// Number of acquired streams that still have a live track.
    pub fn live_stream_count(&self) -> usize {
        self.lock()
            .streams
            .iter()
            .filter(|(_, tracks)| tracks.iter().any(|t| t.is_live()))
            .count()
    }

    pub fn live_track_count(&self) -> usize {
        self.lock()
            .streams
            .iter()
            .flat_map(|(_, tracks)| tracks.iter())
            .filter(|t| t.is_live())
            .count()
    }

    /// Device the live video track was opened on, if any.
    pub fn live_video_device(&self) -> Option<String> {
        self.lock()
            .streams
            .iter()
            .flat_map(|(_, tracks)| tracks.iter())
            .find(|t| t.is_live() && t.kind() == TrackKind::Video)
            .map(|t| t.device_id.clone())
    }

    pub fn frames_grabbed(&self) -> u64 {
        self.lock().frames_grabbed
    }

    pub fn live_url_count(&self) -> usize {
        self.lock().live_urls.len()
    }

    pub fn exported_count(&self) -> u64 {
        self.url_counter.load(Ordering::SeqCst)
    }

    pub fn revoke_count(&self, url: &ObjectUrl) -> u32 {
        self.lock().revocations.get(url).copied().unwrap_or(0)
    }

    pub fn revocations(&self) -> HashMap<ObjectUrl, u32> {
        self.lock().revocations.clone()
    }

    pub fn blob(&self, url: &ObjectUrl) -> Option<Blob> {
        self.lock().live_urls.get(url).cloned()
    }

    fn resolve_device(state: &State, constraints: &MediaConstraints) -> CaptureResult<String> {
        let mut cameras = state.devices.iter().filter(|d| d.kind == DeviceKind::VideoInput);
        match &constraints.video.selector {
            VideoSelector::DeviceId(id) => cameras
                .find(|d| &d.device_id == id)
                .map(|d| d.device_id.clone())
                .ok_or_else(|| CaptureError::NoMatchingDevice(format!("no camera with id {}", id))),
            VideoSelector::Facing(facing) => {
                let cameras: Vec<_> = cameras.collect();
                // Hosts treat facing as a soft constraint: fall back to any camera.
                let idx = match facing {
                    crate::types::FacingMode::User => 0,
                    crate::types::FacingMode::Environment => 1,
                };
                cameras
                    .get(idx)
                    .or_else(|| cameras.first())
                    .map(|d| d.device_id.clone())
                    .ok_or_else(|| CaptureError::NoMatchingDevice("no video input".to_string()))
            }
        }
    }
}

#[async_trait]
impl MediaProvider for SyntheticMediaProvider {
    async fn enumerate_devices(&self) -> CaptureResult<Vec<MediaDeviceInfo>> {
        let delay = self.lock().enumerate_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.lock();
        let mut devices = state.devices.clone();
        if state.labels_require_grant && !state.granted_once {
            for device in &mut devices {
                device.label.clear();
            }
        }
        Ok(devices)
    }

    async fn request_access(&self, constraints: &MediaConstraints) -> CaptureResult<MediaStream> {
        let delay = {
            let mut state = self.lock();
            state.requests.push(constraints.clone());
            state.acquire_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if let Some(error) = state.deny_all.clone() {
            return Err(error);
        }
        if !state.scripted_failures.is_empty() {
            return Err(state.scripted_failures.remove(0));
        }

        let device_id = Self::resolve_device(&state, constraints)?;
        let mut tracks = vec![Arc::new(SyntheticTrack {
            id: Uuid::new_v4().to_string(),
            kind: TrackKind::Video,
            device_id: device_id.clone(),
            live: AtomicBool::new(true),
        })];
        if constraints.audio {
            tracks.push(Arc::new(SyntheticTrack {
                id: Uuid::new_v4().to_string(),
                kind: TrackKind::Audio,
                device_id: "microphone-0".to_string(),
                live: AtomicBool::new(true),
            }));
        }

        let handles: Vec<Arc<dyn MediaTrack>> = tracks
            .iter()
            .map(|t| t.clone() as Arc<dyn MediaTrack>)
            .collect();
        let stream = MediaStream::new(handles);
        state.granted_once = true;
        state.streams.push((stream.clone(), tracks));
        Ok(stream)
    }

    fn is_mime_supported(&self, mime_type: &str) -> bool {
        self.lock().supported_mime.iter().any(|m| m == mime_type)
    }

    fn create_recorder(
        &self,
        stream: &MediaStream,
        options: &RecorderOptions,
    ) -> CaptureResult<(Box<dyn RecorderSession>, UnboundedReceiver<RecorderEvent>)> {
        if !stream.is_active() {
            return Err(CaptureError::NoActiveStream);
        }
        let mut state = self.lock();
        if !state.supported_mime.iter().any(|m| m == &options.mime_type) {
            return Err(CaptureError::EncodingUnavailable(options.mime_type.clone()));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        state.recorder_sender = Some(sender.clone());
        state.recorder_options.push(options.clone());

        let recorder = SyntheticRecorder {
            mime_type: options.mime_type.clone(),
            sender,
            on_stop: state.chunks_on_stop.clone(),
            finalize: state.finalize_on_stop,
            stopped: false,
        };
        Ok((Box::new(recorder), receiver))
    }

    fn grab_frame(&self, stream: &MediaStream) -> CaptureResult<VideoFrame> {
        if stream.video_tracks().all(|t| !t.is_live()) {
            return Err(CaptureError::NoActiveStream);
        }
        let mut state = self.lock();
        state.frames_grabbed += 1;
        let (width, height) = state.frame_size;
        Ok(synthetic_video_frame(state.frames_grabbed, width, height))
    }

    fn export_blob(&self, blob: &Blob) -> CaptureResult<ObjectUrl> {
        let n = self.url_counter.fetch_add(1, Ordering::SeqCst);
        let url = ObjectUrl(format!("blob:synthetic/{}-{}", n, Uuid::new_v4()));
        self.lock().live_urls.insert(url.clone(), blob.clone());
        Ok(url)
    }

    fn revoke(&self, url: &ObjectUrl) {
        let mut state = self.lock();
        state.live_urls.remove(url);
        *state.revocations.entry(url.clone()).or_insert(0) += 1;
    }
}
