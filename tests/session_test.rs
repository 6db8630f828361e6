#[cfg(test)]
mod session_tests {
    use crabrecorder::testing::{synthetic_webm_chunks, SyntheticMediaProvider};
    use crabrecorder::types::VideoSelector;
    use crabrecorder::{
        CaptureError, CaptureSession, CrabRecorderConfig, ErrorKind, FacingMode, PermissionStatus,
        SessionState,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn session_with(
        cameras: usize,
        config: CrabRecorderConfig,
    ) -> (Arc<SyntheticMediaProvider>, CaptureSession<SyntheticMediaProvider>) {
        let provider = Arc::new(SyntheticMediaProvider::with_cameras(cameras));
        let session = CaptureSession::new(provider.clone(), config).expect("valid config");
        (provider, session)
    }

    async fn previewing(cameras: usize) -> (Arc<SyntheticMediaProvider>, CaptureSession<SyntheticMediaProvider>) {
        let (provider, session) = session_with(cameras, CrabRecorderConfig::default());
        session.initialize().await.expect("initialize should succeed");
        (provider, session)
    }

    #[tokio::test]
    async fn test_initialize_grants_and_previews() {
        let (provider, session) = previewing(2).await;

        assert_eq!(session.state(), SessionState::Previewing);
        assert_eq!(session.permission().status(), PermissionStatus::Granted);
        assert!(!session.camera_unavailable());
        // Microphone is filtered out of the camera list
        assert_eq!(session.devices().len(), 2);
        assert!(session.can_flip());
        assert!(session.mirror_preview());
        assert_eq!(provider.live_stream_count(), 1);

        let request = &provider.requests()[0];
        assert!(request.audio);
        assert_eq!(request.video.selector, VideoSelector::Facing(FacingMode::User));
        assert_eq!(request.video.ideal_width, Some(1280));
        assert_eq!(request.video.ideal_height, Some(720));
    }

    #[tokio::test]
    async fn test_initial_facing_from_config() {
        let config = CrabRecorderConfig::default().with_initial_facing(FacingMode::Environment);
        let (provider, session) = session_with(2, config);
        session.initialize().await.unwrap();

        assert_eq!(session.facing(), FacingMode::Environment);
        assert!(!session.mirror_preview());
        assert_eq!(provider.live_video_device().as_deref(), Some("camera-1"));
    }

    #[tokio::test]
    async fn test_permission_denied_is_recorded_and_not_retried() {
        let (provider, session) = session_with(1, CrabRecorderConfig::default());
        provider.deny_all(CaptureError::PermissionDenied("NotAllowedError".to_string()));

        let err = session.initialize().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.camera_unavailable());
        let permission = session.permission();
        assert!(!permission.granted);
        assert_eq!(permission.error, Some(err));
        assert_eq!(provider.request_count(), 1);

        let snapshot = session.snapshot();
        assert!(snapshot.camera_unavailable());
        assert!(snapshot.permission_error.unwrap().contains("NotAllowedError"));
    }

    #[tokio::test]
    async fn test_initialize_twice_is_rejected() {
        let (provider, session) = previewing(1).await;
        let err = session.initialize().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(provider.request_count(), 1);
        assert_eq!(session.state(), SessionState::Previewing);
    }

    #[tokio::test]
    async fn test_acquisition_timeout() {
        let config = CrabRecorderConfig::default().with_acquire_timeout(Duration::from_millis(20));
        let (provider, session) = session_with(1, config);
        provider.set_acquire_delay(Duration::from_secs(5));

        let err = session.initialize().await.unwrap_err();
        assert_eq!(err, CaptureError::AcquisitionTimeout(20));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(
            session.permission().error.map(|e| e.kind()),
            Some(ErrorKind::AcquisitionTimeout)
        );
    }

    #[tokio::test]
    async fn test_flip_unavailable_with_single_camera() {
        let (provider, session) = previewing(1).await;
        let stream_id = session.active_stream_id();

        assert!(!session.can_flip());
        let err = session.toggle_facing().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FlipUnavailable);
        let err = session.cycle_camera().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FlipUnavailable);

        assert_eq!(session.active_stream_id(), stream_id);
        assert_eq!(provider.live_stream_count(), 1);
    }

    #[tokio::test]
    async fn test_flip_disabled_by_config() {
        let (_provider, session) = session_with(3, CrabRecorderConfig::default().with_flip(false));
        session.initialize().await.unwrap();

        assert!(!session.can_flip());
        assert!(matches!(
            session.toggle_facing().await,
            Err(CaptureError::FlipUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_facing_replaces_stream() {
        let (provider, session) = previewing(2).await;
        let first = session.active_stream_id().unwrap();

        let facing = session.toggle_facing().await.unwrap();
        assert_eq!(facing, FacingMode::Environment);
        assert!(!session.mirror_preview());
        assert_ne!(session.active_stream_id(), Some(first));
        assert_eq!(provider.live_stream_count(), 1);
        assert_eq!(
            provider.requests()[1].video.selector,
            VideoSelector::Facing(FacingMode::Environment)
        );

        assert_eq!(session.toggle_facing().await.unwrap(), FacingMode::User);
        assert_eq!(provider.live_stream_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_toggle_leaves_no_live_stream() {
        let (provider, session) = previewing(2).await;
        provider.fail_next(CaptureError::OverconstrainedRequest("facingMode".to_string()));

        let err = session.toggle_facing().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverconstrainedRequest);
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.facing(), FacingMode::User);
        assert_eq!(provider.live_stream_count(), 0);
        assert_eq!(session.active_stream_id(), None);

        // The user may try again by hand
        assert_eq!(session.toggle_facing().await.unwrap(), FacingMode::Environment);
        assert_eq!(session.state(), SessionState::Previewing);
        assert_eq!(provider.live_stream_count(), 1);
    }

    #[tokio::test]
    async fn test_cycle_camera_wraps_to_first_device() {
        let (provider, session) = previewing(3).await;
        assert_eq!(provider.live_video_device().as_deref(), Some("camera-0"));

        let mut opened = Vec::new();
        for _ in 0..3 {
            let device = session.cycle_camera().await.unwrap();
            assert_eq!(provider.live_stream_count(), 1);
            assert_eq!(provider.live_video_device(), Some(device.device_id.clone()));
            opened.push(device.device_id);
        }

        assert_eq!(opened, vec!["camera-1", "camera-2", "camera-0"]);
        assert_eq!(session.camera_index(), 0);

        let request = provider.requests().last().cloned().unwrap();
        assert_eq!(request.video.selector, VideoSelector::DeviceId("camera-0".to_string()));
    }

    #[tokio::test]
    async fn test_cycle_advances_past_failing_device() {
        let (provider, session) = previewing(3).await;
        provider.fail_next(CaptureError::NoMatchingDevice("camera-1".to_string()));

        assert!(session.cycle_camera().await.is_err());
        assert_eq!(session.camera_index(), 1);

        let device = session.cycle_camera().await.unwrap();
        assert_eq!(device.device_id, "camera-2");
        assert_eq!(session.state(), SessionState::Previewing);
    }

    #[tokio::test]
    async fn test_concurrent_acquisition_is_rejected() {
        let (provider, session) = previewing(2).await;
        provider.set_acquire_delay(Duration::from_millis(50));

        let (flip, cycle) = futures::join!(session.toggle_facing(), session.cycle_camera());
        assert!(flip.is_ok());
        assert_eq!(cycle.unwrap_err(), CaptureError::AcquisitionInFlight);
        assert_eq!(provider.live_stream_count(), 1);

        // Guard is released once the first acquisition settles
        assert!(session.cycle_camera().await.is_ok());
    }

    #[tokio::test]
    async fn test_start_then_stop_yields_empty_artifact() {
        let (provider, session) = previewing(1).await;

        assert!(session.start_recording().unwrap());
        assert_eq!(session.state(), SessionState::Recording);
        assert!(session.is_recording());

        let artifact = session.stop_recording().await.unwrap();
        assert!(artifact.is_empty());
        assert_eq!(artifact.stats.chunks, 0);
        assert!(artifact.stats.finalized);
        assert_eq!(artifact.mime_type, "video/webm;codecs=vp8,opus");
        assert!(artifact.download_name().ends_with(".webm"));
        assert_eq!(session.state(), SessionState::Finished);

        let blob = provider.blob(&artifact.url).expect("artifact url is live");
        assert!(blob.is_empty());
        assert_eq!(session.outstanding_urls(), 1);
    }

    #[tokio::test]
    async fn test_recording_assembles_fragments_in_order() {
        let (provider, session) = previewing(1).await;
        provider.set_chunks_on_stop(vec![bytes::Bytes::from_static(b"tail")]);

        session.start_recording().unwrap();
        for chunk in synthetic_webm_chunks(3, 16) {
            provider.emit_chunk(chunk);
        }
        assert_eq!(session.poll_recording(), Some(48));
        assert_eq!(session.snapshot().recording_bytes, Some(48));

        let artifact = session.stop_recording().await.unwrap();
        assert_eq!(artifact.size_bytes, 52);
        assert_eq!(artifact.stats.chunks, 4);

        let blob = provider.blob(&artifact.url).unwrap();
        assert!(blob.data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]));
        assert!(blob.data.ends_with(b"tail"));
        assert_eq!(session.poll_recording(), None);
    }

    #[tokio::test]
    async fn test_start_recording_without_active_stream_is_noop() {
        let (provider, session) = previewing(1).await;
        provider.end_all_tracks();

        assert!(!session.start_recording().unwrap());
        assert_eq!(session.state(), SessionState::Previewing);
        assert!(provider.recorder_options().is_empty());
        assert!(session.take_photo().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_start_recording_before_initialize_is_noop() {
        let (provider, session) = session_with(1, CrabRecorderConfig::default());
        assert!(!session.start_recording().unwrap());
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(provider.recorder_options().is_empty());
    }

    #[tokio::test]
    async fn test_encoding_unavailable() {
        let (provider, session) = previewing(1).await;
        provider.set_supported_mime_types(&[]);

        let err = session.start_recording().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EncodingUnavailable);
        assert_eq!(session.state(), SessionState::Previewing);
    }

    #[tokio::test]
    async fn test_flip_rejected_while_recording() {
        let (provider, session) = previewing(2).await;
        session.start_recording().unwrap();

        let err = session.toggle_facing().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(provider.live_stream_count(), 1);
        assert_eq!(session.state(), SessionState::Recording);
    }

    #[tokio::test]
    async fn test_stop_without_recording_is_invalid() {
        let (_provider, session) = previewing(1).await;
        let err = session.stop_recording().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_retry_keeps_preview_stream() {
        let (provider, session) = previewing(1).await;
        let stream_id = session.active_stream_id();

        session.start_recording().unwrap();
        let artifact = session.stop_recording().await.unwrap();
        session.retry().unwrap();

        assert_eq!(session.state(), SessionState::Previewing);
        assert_eq!(session.active_stream_id(), stream_id);
        assert_eq!(provider.request_count(), 1);
        assert_eq!(provider.revoke_count(&artifact.url), 1);
        assert!(session.artifact().is_none());

        // Recording again works on the same stream
        assert!(session.start_recording().unwrap());
        assert!(session.retry().is_err());
    }

    #[tokio::test]
    async fn test_take_photo() {
        let (provider, session) = previewing(1).await;
        provider.set_frame_size(32, 24);

        let photo = session.take_photo().unwrap().expect("stream is active");
        assert_eq!((photo.width, photo.height), (32, 24));
        assert_eq!(photo.mime_type, "image/png");
        assert_eq!(photo.facing, FacingMode::User);
        assert!(photo.download_name().ends_with(".png"));

        let blob = provider.blob(&photo.url).unwrap();
        assert!(blob.data.starts_with(&[0x89, b'P', b'N', b'G']));

        let second = session.take_photo().unwrap().unwrap();
        assert_eq!(provider.revoke_count(&photo.url), 1);
        assert_eq!(session.photo().map(|p| p.url), Some(second.url));
        assert_eq!(session.outstanding_urls(), 1);
    }

    #[tokio::test]
    async fn test_take_photo_while_recording() {
        let (provider, session) = previewing(1).await;
        session.start_recording().unwrap();

        assert!(session.take_photo().unwrap().is_some());
        assert_eq!(session.state(), SessionState::Recording);
        assert_eq!(provider.frames_grabbed(), 1);
    }

    #[tokio::test]
    async fn test_photo_disabled() {
        let (_provider, session) = session_with(1, CrabRecorderConfig::default().with_photo(false));
        session.initialize().await.unwrap();
        assert_eq!(session.take_photo().unwrap_err(), CaptureError::PhotoDisabled);
        assert!(!session.snapshot().can_take_photo);
    }

    #[tokio::test]
    async fn test_teardown_revokes_every_url_exactly_once() {
        let (provider, session) = previewing(2).await;

        session.take_photo().unwrap();
        session.take_photo().unwrap();
        session.start_recording().unwrap();
        session.stop_recording().await.unwrap();
        session.retry().unwrap();
        session.start_recording().unwrap();
        session.stop_recording().await.unwrap();

        let report = session.teardown();
        assert_eq!(report.tracks_stopped, 2);
        assert_eq!(report.urls_revoked, 2);
        assert!(!report.recording_aborted);

        assert_eq!(provider.exported_count(), 4);
        assert_eq!(provider.live_url_count(), 0);
        assert_eq!(provider.live_track_count(), 0);
        let revocations = provider.revocations();
        assert_eq!(revocations.len(), 4);
        assert!(revocations.values().all(|&n| n == 1));

        let again = session.teardown();
        assert_eq!(again.tracks_stopped, 0);
        assert_eq!(again.urls_revoked, 0);
        assert!(provider.revocations().values().all(|&n| n == 1));
        assert_eq!(session.state(), SessionState::TornDown);
    }

    #[tokio::test]
    async fn test_teardown_while_recording() {
        let (provider, session) = previewing(1).await;
        session.start_recording().unwrap();

        let report = session.teardown();
        assert!(report.recording_aborted);
        assert_eq!(provider.live_stream_count(), 0);

        assert!(!session.start_recording().unwrap());
        assert_eq!(session.initialize().await.unwrap_err().kind(), ErrorKind::InvalidState);
        assert!(session.stop_recording().await.is_err());
    }

    #[tokio::test]
    async fn test_teardown_during_acquisition_releases_new_stream() {
        let (provider, session) = session_with(1, CrabRecorderConfig::default());
        provider.set_acquire_delay(Duration::from_millis(50));

        let (init, _) = futures::join!(session.initialize(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            session.teardown()
        });

        assert_eq!(init.unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(provider.live_stream_count(), 0);
        assert_eq!(session.state(), SessionState::TornDown);
    }

    #[tokio::test]
    async fn test_release_camera_then_reinitialize() {
        let (provider, session) = previewing(2).await;

        assert!(session.release_camera().unwrap());
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert_eq!(provider.live_stream_count(), 0);
        assert!(session.camera_unavailable());
        assert!(!session.release_camera().unwrap());

        session.initialize().await.unwrap();
        assert_eq!(session.state(), SessionState::Previewing);
        assert_eq!(provider.live_stream_count(), 1);
    }

    #[tokio::test]
    async fn test_release_camera_rejected_while_recording() {
        let (_provider, session) = previewing(1).await;
        session.start_recording().unwrap();
        assert_eq!(session.release_camera().unwrap_err().kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_drop_releases_resources() {
        let (provider, session) = previewing(1).await;
        session.take_photo().unwrap();
        drop(session);

        assert_eq!(provider.live_track_count(), 0);
        assert_eq!(provider.live_url_count(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_serialization() {
        let (_provider, session) = previewing(2).await;
        let snapshot = session.snapshot();
        assert!(!snapshot.is_loading());
        assert_eq!(snapshot.device_count, 2);

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"state\":\"previewing\""));
        assert!(json.contains("\"facing\":\"user\""));
    }

    #[tokio::test]
    async fn test_photo_and_recording_need_live_video() {
        let (provider, session) = previewing(1).await;
        provider.end_video_tracks();
        assert!(provider.live_track_count() > 0);

        assert!(session.take_photo().unwrap().is_none());
        assert_eq!(provider.frames_grabbed(), 0);
        assert!(!session.start_recording().unwrap());
        assert_eq!(session.state(), SessionState::Previewing);
        assert!(provider.recorder_options().is_empty());
        assert!(!session.snapshot().can_take_photo);
    }

    #[tokio::test]
    async fn test_cycle_starts_after_environment_camera() {
        let config = CrabRecorderConfig::default().with_initial_facing(FacingMode::Environment);
        let (provider, session) = session_with(2, config);
        session.initialize().await.unwrap();
        assert_eq!(provider.live_video_device().as_deref(), Some("camera-1"));
        assert_eq!(session.camera_index(), 1);

        let device = session.cycle_camera().await.unwrap();
        assert_eq!(device.device_id, "camera-0");
        assert_eq!(provider.live_video_device().as_deref(), Some("camera-0"));
    }

    #[tokio::test]
    async fn test_cycle_after_toggle_moves_off_live_camera() {
        let (provider, session) = previewing(3).await;

        session.toggle_facing().await.unwrap();
        assert_eq!(provider.live_video_device().as_deref(), Some("camera-1"));
        assert_eq!(session.camera_index(), 1);

        let device = session.cycle_camera().await.unwrap();
        assert_eq!(device.device_id, "camera-2");
    }

    #[tokio::test]
    async fn test_enumeration_timeout_does_not_block_session() {
        let config = CrabRecorderConfig::default().with_acquire_timeout(Duration::from_millis(50));
        let (provider, session) = session_with(2, config);
        provider.set_enumerate_delay(Duration::from_secs(3600));

        let settled = tokio::time::timeout(Duration::from_secs(2), session.initialize()).await;
        assert!(settled.is_ok(), "initialize should not hang on enumeration");
        assert!(settled.unwrap().is_ok());

        // Treated like an enumeration failure: preview works, switching does not
        assert_eq!(session.state(), SessionState::Previewing);
        assert!(session.devices().is_empty());
        assert_eq!(
            session.toggle_facing().await.unwrap_err().kind(),
            ErrorKind::FlipUnavailable
        );
    }

    #[tokio::test]
    async fn test_initialize_again_after_denial() {
        let (provider, session) = session_with(1, CrabRecorderConfig::default());
        provider.deny_all(CaptureError::PermissionDenied("dismissed".to_string()));
        assert!(session.initialize().await.is_err());
        assert_eq!(session.state(), SessionState::Failed);

        provider.allow_all();
        session.initialize().await.unwrap();
        assert_eq!(session.state(), SessionState::Previewing);
        assert_eq!(session.permission().status(), PermissionStatus::Granted);
        assert_eq!(provider.request_count(), 2);
        assert_eq!(provider.live_stream_count(), 1);
    }

    #[tokio::test]
    async fn test_label_priming() {
        let (provider, session) = session_with(2, CrabRecorderConfig::default());
        provider.set_labels_require_grant(true);
        session.initialize().await.unwrap();
        assert!(session.devices().iter().all(|d| d.label.is_empty()));

        let (provider, session) = session_with(2, CrabRecorderConfig::default().with_label_priming(true));
        provider.set_labels_require_grant(true);
        session.initialize().await.unwrap();

        assert!(session.devices().iter().all(|d| !d.label.is_empty()));
        assert_eq!(provider.request_count(), 2);
        assert_eq!(provider.live_stream_count(), 1);
        assert_eq!(session.state(), SessionState::Previewing);
    }
}
