use anyhow::Context;
use crabrecorder::testing::{synthetic_webm_chunks, SyntheticMediaProvider};
use crabrecorder::{CaptureSession, CrabRecorderConfig};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    crabrecorder::init_logging();

    let args: Vec<String> = env::args().collect();
    let mut cameras = 2usize;
    let mut chunks = 3usize;
    let mut config_path: Option<PathBuf> = None;
    let mut json = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--cameras" => {
                i += 1;
                cameras = args.get(i).context("--cameras needs a value")?.parse()?;
            }
            "--chunks" => {
                i += 1;
                chunks = args.get(i).context("--chunks needs a value")?.parse()?;
            }
            "--config" => {
                i += 1;
                config_path = Some(PathBuf::from(args.get(i).context("--config needs a path")?));
            }
            "--json" => json = true,
            other => {
                eprintln!("Usage: crabrecorder-demo [--cameras <n>] [--chunks <n>] [--config <file>] [--json]");
                anyhow::bail!("unknown argument: {}", other);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => CrabRecorderConfig::load_from_file(path)?,
        None => CrabRecorderConfig::load_or_default(),
    };

    let provider = Arc::new(SyntheticMediaProvider::with_cameras(cameras));
    let session = CaptureSession::new(provider.clone(), config)?;

    let report = |label: &str| -> anyhow::Result<()> {
        let snapshot = session.snapshot();
        if json {
            println!("{}", serde_json::to_string(&snapshot)?);
        } else {
            println!(
                "{:<12} state={} permission={} facing={} mirrored={} camera={}/{}",
                label,
                snapshot.state,
                snapshot.permission,
                snapshot.facing,
                snapshot.mirror_preview,
                snapshot.camera_index,
                snapshot.device_count
            );
        }
        Ok(())
    };

    session.initialize().await.context("camera unavailable")?;
    report("initialized")?;

    if session.can_flip() {
        session.toggle_facing().await?;
        report("flipped")?;
        let device = session.cycle_camera().await?;
        report(&format!("cycled:{}", device.device_id))?;
    }

    if let Some(photo) = session.take_photo()? {
        println!("photo {} -> {} ({} bytes)", photo.download_name(), photo.url, photo.size_bytes);
    }

    session.start_recording()?;
    for chunk in synthetic_webm_chunks(chunks, 1024) {
        provider.emit_chunk(chunk);
    }
    report("recording")?;

    let artifact = session.stop_recording().await?;
    report("finished")?;
    println!(
        "recording {} -> {} ({} bytes in {} chunks)",
        artifact.download_name(),
        artifact.url,
        artifact.size_bytes,
        artifact.stats.chunks
    );

    session.retry()?;
    report("retry")?;

    let teardown = session.teardown();
    report("teardown")?;
    println!(
        "released {} tracks, revoked {} urls",
        teardown.tracks_stopped, teardown.urls_revoked
    );

    Ok(())
}
