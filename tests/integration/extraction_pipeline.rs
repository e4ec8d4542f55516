//! Extraction through the site session: stride selection, run lifecycle and
//! frame directory ownership

use crate::support::{site_session, touch_video, FakeDecoder, ScriptedProvider};
use futures::StreamExt;
use minewatch::extraction::{resolve_interval, ExtractionEvent};
use minewatch::frame::frame_file_name;
use std::sync::Arc;
use tempfile::TempDir;

fn extracted_indices(events: &[ExtractionEvent]) -> Vec<(usize, Option<u64>)> {
    events
        .iter()
        .filter_map(|event| match event {
            ExtractionEvent::FrameExtracted { frame } => Some((frame.index, frame.source_offset)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_every_thirtieth_frame_of_95() {
    let temp = TempDir::new().unwrap();
    let video = touch_video(temp.path());
    let decoder = FakeDecoder::new(95);
    let probe = decoder.probe();
    let session = site_session(
        temp.path(),
        Arc::new(ScriptedProvider::all_relevant()),
        Arc::new(decoder),
    );

    let events: Vec<_> = session.start_extraction(&video, Some(30)).await.collect().await;

    assert_eq!(
        extracted_indices(&events),
        vec![(0, Some(0)), (1, Some(30)), (2, Some(60)), (3, Some(90))]
    );
    assert_eq!(
        events.last(),
        Some(&ExtractionEvent::ExtractionComplete { total_count: 4 })
    );
    assert_eq!(events.len(), 5);

    let on_disk: Vec<_> = session
        .store()
        .list()
        .unwrap()
        .iter()
        .map(|frame| frame.file_name())
        .collect();
    assert_eq!(
        on_disk,
        vec![
            "frame_00000.jpg",
            "frame_00001.jpg",
            "frame_00002.jpg",
            "frame_00003.jpg"
        ]
    );
    assert_eq!(session.frames().len(), 4);
    assert_eq!(probe.decoded(), 95);
    assert!(probe.released());
}

#[tokio::test]
async fn test_disconnect_stops_writes_and_releases_video() {
    let temp = TempDir::new().unwrap();
    let video = touch_video(temp.path());
    let decoder = FakeDecoder::new(1_000);
    let probe = decoder.probe();
    let session = site_session(
        temp.path(),
        Arc::new(ScriptedProvider::all_relevant()),
        Arc::new(decoder),
    );

    let mut events = session.start_extraction(&video, Some(1)).await;
    loop {
        match events.next().await {
            Some(ExtractionEvent::FrameExtracted { frame }) if frame.index == 1 => break,
            Some(ExtractionEvent::FrameExtracted { .. }) => continue,
            other => panic!("unexpected event before disconnect: {:?}", other),
        }
    }
    assert!(events.is_running());
    drop(events);

    assert!(probe.released());
    assert_eq!(probe.decoded(), 2);
    assert_eq!(session.store().list().unwrap().len(), 2);
    assert!(!session.store().frame_path(2).exists());
    assert_eq!(session.frames().len(), 2);

    // The run lock was released with the stream
    assert_eq!(session.adopt_frames().await.unwrap(), 2);
}

#[tokio::test]
async fn test_second_run_leaves_no_residue() {
    let temp = TempDir::new().unwrap();
    let video = touch_video(temp.path());
    let session = site_session(
        temp.path(),
        Arc::new(ScriptedProvider::all_relevant()),
        Arc::new(FakeDecoder::new(10)),
    );

    let first: Vec<_> = session.start_extraction(&video, Some(1)).await.collect().await;
    assert_eq!(extracted_indices(&first).len(), 10);
    std::fs::write(session.store().directory().join("notes.txt"), b"stray").unwrap();

    let second: Vec<_> = session.start_extraction(&video, Some(5)).await.collect().await;
    assert_eq!(extracted_indices(&second), vec![(0, Some(0)), (1, Some(5))]);

    let entries: Vec<_> = std::fs::read_dir(session.store().directory())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries.len(), 2, "unexpected entries: {:?}", entries);
    assert_eq!(session.frames().len(), 2);
}

#[tokio::test]
async fn test_unusable_interval_falls_back_to_default() {
    let temp = TempDir::new().unwrap();
    let video = touch_video(temp.path());
    let session = site_session(
        temp.path(),
        Arc::new(ScriptedProvider::all_relevant()),
        Arc::new(FakeDecoder::new(61)),
    );

    for interval in [Some(0), Some(-4), None] {
        let events: Vec<_> = session.start_extraction(&video, interval).await.collect().await;
        assert_eq!(
            extracted_indices(&events),
            vec![(0, Some(0)), (1, Some(30)), (2, Some(60))],
            "interval = {:?}",
            interval
        );
    }

    let resolved = resolve_interval(Some("every other"), 30);
    assert_eq!(resolved.value, 30);
    assert!(resolved.warning.is_some());
}

#[tokio::test]
async fn test_missing_video_is_a_single_failure() {
    let temp = TempDir::new().unwrap();
    let decoder = FakeDecoder::new(10);
    let probe = decoder.probe();
    let session = site_session(
        temp.path(),
        Arc::new(ScriptedProvider::all_relevant()),
        Arc::new(decoder),
    );

    let events: Vec<_> = session
        .start_extraction(&temp.path().join("absent.mp4"), None)
        .await
        .collect()
        .await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        ExtractionEvent::ExtractionFailed { reason } => assert!(reason.contains("absent.mp4")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(probe.opened(), 0);
    assert!(session.frames().is_empty());
    assert!(session.store().list().unwrap().is_empty());
}

#[tokio::test]
async fn test_unusable_frame_directory_is_a_single_failure() {
    let temp = TempDir::new().unwrap();
    let video = touch_video(temp.path());
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, b"regular file").unwrap();
    let decoder = FakeDecoder::new(10);
    let probe = decoder.probe();
    let session = site_session(
        &blocker,
        Arc::new(ScriptedProvider::all_relevant()),
        Arc::new(decoder),
    );

    let events: Vec<_> = session.start_extraction(&video, Some(1)).await.collect().await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        ExtractionEvent::ExtractionFailed { reason } => {
            assert!(reason.contains("blocker"), "{}", reason)
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(probe.opened(), 0);
    assert!(session.frames().is_empty());
    assert!(blocker.is_file());
}

#[tokio::test]
async fn test_decode_error_keeps_frames_written_so_far() {
    let temp = TempDir::new().unwrap();
    let video = touch_video(temp.path());
    let decoder = FakeDecoder::new(50).with_decode_error_at(25);
    let probe = decoder.probe();
    let session = site_session(
        temp.path(),
        Arc::new(ScriptedProvider::all_relevant()),
        Arc::new(decoder),
    );

    let events: Vec<_> = session.start_extraction(&video, Some(10)).await.collect().await;

    assert_eq!(
        extracted_indices(&events),
        vec![(0, Some(0)), (1, Some(10)), (2, Some(20))]
    );
    assert!(matches!(
        events.last(),
        Some(ExtractionEvent::ExtractionFailed { .. })
    ));
    assert!(!events
        .iter()
        .any(|e| matches!(e, ExtractionEvent::ExtractionComplete { .. })));
    assert!(probe.released());
    assert_eq!(session.frames().len(), 3);
}

#[tokio::test]
async fn test_write_failure_does_not_leave_a_gap() {
    let temp = TempDir::new().unwrap();
    let video = touch_video(temp.path());
    let frames_dir = temp.path().join("frames");
    let decoder = FakeDecoder::new(5).with_write_failures(&frames_dir, 1, [2]);
    let session = site_session(
        temp.path(),
        Arc::new(ScriptedProvider::all_relevant()),
        Arc::new(decoder),
    );

    let events: Vec<_> = session.start_extraction(&video, Some(1)).await.collect().await;

    assert_eq!(
        extracted_indices(&events),
        vec![(0, Some(0)), (1, Some(1)), (2, Some(3)), (3, Some(4))]
    );
    assert!(events.iter().any(|e| matches!(
        e,
        ExtractionEvent::WriteWarning {
            index: 2,
            source_offset: 2,
            ..
        }
    )));
    assert_eq!(
        events.last(),
        Some(&ExtractionEvent::ExtractionComplete { total_count: 4 })
    );
    for index in 0..4 {
        assert!(frames_dir.join(frame_file_name(index)).is_file());
    }
    assert!(!frames_dir.join(frame_file_name(4)).exists());
}
