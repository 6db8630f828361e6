//! Testing utilities for CrabRecorder
//!
//! Provides an in-memory media provider and synthetic media data so the
//! capture session can be exercised without a browser or camera.

pub mod synthetic_data;
pub mod synthetic_provider;

pub use synthetic_data::{synthetic_video_frame, synthetic_webm_chunks};
pub use synthetic_provider::{SyntheticMediaProvider, SyntheticTrack};
