//! Chunk buffering around a host recorder

use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use super::config::{RecordingConfig, RecordingStats};
use crate::errors::{CaptureError, CaptureResult};
use crate::provider::{MediaProvider, RecorderEvent, RecorderOptions, RecorderSession};
use crate::types::{Blob, MediaStream};

/// Picks the first configured mime type the host can record.
pub fn negotiate_mime_type(
    provider: &dyn MediaProvider,
    config: &RecordingConfig,
) -> CaptureResult<String> {
    config
        .mime_types
        .iter()
        .find(|mime| provider.is_mime_supported(mime))
        .cloned()
        .ok_or_else(|| {
            CaptureError::EncodingUnavailable(format!(
                "none of [{}] is supported",
                config.mime_types.join(", ")
            ))
        })
}

/// Recording in progress: owns the host recorder and the fragments it has
/// emitted so far.
pub struct Recorder {
    id: Uuid,
    session: Box<dyn RecorderSession>,
    events: UnboundedReceiver<RecorderEvent>,
    chunks: Vec<Bytes>,
    mime_type: String,
    started_at: Instant,
    finalized: bool,
    failure: Option<String>,
}

/// Output of [`Recorder::finish`], before it is exported.
#[derive(Debug, Clone)]
pub struct RecordedMedia {
    pub id: Uuid,
    pub blob: Blob,
    pub stats: RecordingStats,
}

impl Recorder {
    /// Starts recording `stream` with the first supported mime type.
    pub fn start(
        provider: &dyn MediaProvider,
        stream: &MediaStream,
        config: &RecordingConfig,
    ) -> CaptureResult<Self> {
        let mime_type = negotiate_mime_type(provider, config)?;
        let options = RecorderOptions {
            mime_type: mime_type.clone(),
            video_bits_per_second: config.quality.video_bitrate(),
            audio_bits_per_second: config.quality.audio_bitrate(),
            timeslice_ms: config.timeslice_ms,
        };

        let (session, events) = provider.create_recorder(stream, &options)?;
        let id = Uuid::new_v4();
        log::info!("Recording {} started on stream {} as {}", id, stream.id, mime_type);

        Ok(Self {
            id,
            session,
            events,
            chunks: Vec::new(),
            mime_type,
            started_at: Instant::now(),
            finalized: false,
            failure: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Moves every fragment emitted so far into the buffer without blocking.
    /// Returns the buffered byte count.
    pub fn poll(&mut self) -> usize {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.handle(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.buffered_bytes()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    fn handle(&mut self, event: RecorderEvent) {
        match event {
            RecorderEvent::Data(chunk) => {
                // Hosts may emit empty fragments when nothing was encoded yet.
                if !chunk.is_empty() {
                    log::debug!("Recording {} fragment of {} bytes", self.id, chunk.len());
                    self.chunks.push(chunk);
                }
            }
            RecorderEvent::Finalized => self.finalized = true,
            RecorderEvent::Error(msg) => {
                log::error!("Recording {} failed: {}", self.id, msg);
                self.failure = Some(msg);
            }
        }
    }

    /// Stops the host recorder, waits for the finalize event and assembles
    /// the fragments into one blob. The recorder is released either way.
    ///
    /// A recorder that never finalizes within `timeout` still yields the
    /// fragments received so far.
    pub async fn finish(mut self, timeout: Duration) -> CaptureResult<RecordedMedia> {
        self.session.stop()?;

        let deadline = tokio::time::Instant::now() + timeout;
        while !self.finalized && self.failure.is_none() {
            match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Some(event)) => self.handle(event),
                Ok(None) => break,
                Err(_) => {
                    log::warn!(
                        "Recording {} did not finalize within {:?}, assembling {} fragments",
                        self.id,
                        timeout,
                        self.chunks.len()
                    );
                    break;
                }
            }
        }
        // Late fragments queued together with the finalize event.
        self.poll();

        if let Some(msg) = self.failure.take() {
            return Err(CaptureError::Provider(msg));
        }

        let mut assembled = BytesMut::with_capacity(self.buffered_bytes());
        for chunk in &self.chunks {
            assembled.extend_from_slice(chunk);
        }

        let stats = RecordingStats {
            chunks: self.chunks.len() as u64,
            bytes: assembled.len() as u64,
            duration_secs: self.started_at.elapsed().as_secs_f64(),
            finalized: self.finalized,
        };

        log::info!(
            "Recording {} stopped: {} fragments, {} bytes, {:.2}s",
            self.id,
            stats.chunks,
            stats.bytes,
            stats.duration_secs
        );

        Ok(RecordedMedia {
            id: self.id,
            blob: Blob::new(assembled.freeze(), self.mime_type),
            stats,
        })
    }

    /// Stops the host recorder without waiting for its output.
    pub fn abort(mut self) {
        if let Err(e) = self.session.stop() {
            log::warn!("Error stopping recording {} during abort: {}", self.id, e);
        }
    }
}
