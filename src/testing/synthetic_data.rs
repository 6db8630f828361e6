//! Synthetic frames and recorder fragments for offline testing

use bytes::Bytes;

use crate::types::VideoFrame;

/// Create a synthetic RGB24 frame whose content changes with `frame_number`.
pub fn synthetic_video_frame(frame_number: u64, width: u32, height: u32) -> VideoFrame {
    let mut data = vec![0u8; (width * height * 3) as usize];

    // Gradient shifted by the frame number so consecutive grabs differ
    let base = (frame_number % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 3) as usize;
            data[idx] = base.wrapping_add((x % 256) as u8);
            data[idx + 1] = base.wrapping_add((y % 256) as u8);
            data[idx + 2] = base.wrapping_add(((x + y) % 256) as u8);
        }
    }

    VideoFrame::new(data, width, height)
}

/// Fragments shaped like a WebM recording: an EBML header chunk followed by
/// `count - 1` cluster-sized payloads.
pub fn synthetic_webm_chunks(count: usize, chunk_size: usize) -> Vec<Bytes> {
    const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

    (0..count)
        .map(|i| {
            if i == 0 {
                let mut header = EBML_MAGIC.to_vec();
                header.resize(chunk_size.max(EBML_MAGIC.len()), 0);
                Bytes::from(header)
            } else {
                Bytes::from(vec![(i % 256) as u8; chunk_size])
            }
        })
        .collect()
}
