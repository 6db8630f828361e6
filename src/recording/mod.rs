//! Recording support for the capture session
//!
//! Encoding and muxing are done by the host recorder. This module negotiates
//! the container format, buffers the fragments the recorder emits and
//! assembles them into a single blob on stop.
//!
//! # Example
//! ```rust,ignore
//! use crabrecorder::recording::{Recorder, RecordingConfig};
//!
//! let mut recorder = Recorder::start(&provider, &stream, &RecordingConfig::default())?;
//! recorder.poll();
//! let media = recorder.finish(Duration::from_secs(5)).await?;
//! ```

mod artifact;
mod config;
mod recorder;

pub use artifact::{extension_for_mime, Artifact};
pub use config::{RecordingConfig, RecordingQuality, RecordingStats};
pub use recorder::{negotiate_mime_type, RecordedMedia, Recorder};
