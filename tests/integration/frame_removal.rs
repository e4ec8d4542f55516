//! Frame removal: filesystem and session state stay consistent

use crate::support::{site_session, touch_video, FakeDecoder, ScriptedProvider};
use futures::StreamExt;
use minewatch::error::ValidationError;
use minewatch::session::{FrameRef, FrameRemovalRequest, SiteSession};
use std::sync::Arc;
use tempfile::TempDir;

async fn analysed(temp: &TempDir, frames: u64) -> SiteSession {
    let video = touch_video(temp.path());
    let session = site_session(
        temp.path(),
        Arc::new(ScriptedProvider::all_relevant()),
        Arc::new(FakeDecoder::new(frames)),
    );
    let _: Vec<_> = session.start_extraction(&video, Some(1)).await.collect().await;
    session.run_analysis(None).await.unwrap();
    session
}

fn indices(session: &SiteSession) -> (Vec<usize>, Vec<usize>) {
    let frames = session.frames().iter().map(|f| f.index).collect();
    let analysed = session
        .analysis()
        .unwrap_or_default()
        .iter()
        .map(|entry| entry.frame.index)
        .collect();
    (frames, analysed)
}

#[tokio::test]
async fn test_removal_updates_disk_frames_and_analysis_together() {
    let temp = TempDir::new().unwrap();
    let session = analysed(&temp, 5).await;

    let request = FrameRemovalRequest::new(vec![
        FrameRef::Name("frame_00001.jpg".to_string()),
        FrameRef::Index(3),
    ])
    .unwrap();
    let report = session.remove_frames(&request);

    assert_eq!(report.removed, vec!["frame_00001.jpg", "3"]);
    assert!(report.not_found.is_empty());
    assert!(report.failed.is_empty());
    assert!(!session.store().frame_path(1).exists());
    assert!(!session.store().frame_path(3).exists());
    assert_eq!(indices(&session), (vec![0, 2, 4], vec![0, 2, 4]));

    // Remaining frames keep their indices and summary only covers them
    let report = session.summarize().await.unwrap();
    assert_eq!(report.frame_count, 3);
}

#[tokio::test]
async fn test_unknown_frame_is_a_no_op() {
    let temp = TempDir::new().unwrap();
    let session = analysed(&temp, 3).await;

    let report = session.remove_frames(
        &FrameRemovalRequest::new(vec![FrameRef::Name("frame_00042.jpg".to_string())]).unwrap(),
    );

    assert!(report.removed.is_empty());
    assert_eq!(report.not_found, vec!["frame_00042.jpg"]);
    assert_eq!(indices(&session), (vec![0, 1, 2], vec![0, 1, 2]));
    assert_eq!(session.store().list().unwrap().len(), 3);
}

#[tokio::test]
async fn test_frame_already_gone_from_disk_is_dropped_from_session() {
    let temp = TempDir::new().unwrap();
    let session = analysed(&temp, 3).await;
    std::fs::remove_file(session.store().frame_path(2)).unwrap();

    let report = session.remove_frames(&FrameRemovalRequest::new(vec![FrameRef::Index(2)]).unwrap());

    assert_eq!(report.removed, vec!["2"]);
    assert_eq!(indices(&session), (vec![0, 1], vec![0, 1]));
}

#[tokio::test]
async fn test_unsafe_names_fail_without_blocking_others() {
    let temp = TempDir::new().unwrap();
    let session = analysed(&temp, 2).await;
    let outside = temp.path().join("site.mp4");

    let request = FrameRemovalRequest::from_json(
        r#"{"frames": ["../site.mp4", "frame_00000.jpg", "/etc/passwd"]}"#,
    )
    .unwrap();
    let report = session.remove_frames(&request);

    assert_eq!(report.removed, vec!["frame_00000.jpg"]);
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.failed[0].frame, "../site.mp4");
    assert!(outside.exists());
    assert_eq!(indices(&session), (vec![1], vec![1]));
}

#[tokio::test]
async fn test_foreign_files_in_frame_directory_are_never_removed() {
    let temp = TempDir::new().unwrap();
    let session = analysed(&temp, 2).await;
    let stray = session.store().directory().join("keep.toml");
    std::fs::write(&stray, b"title = \"keep\"").unwrap();

    let report = session.remove_frames(
        &FrameRemovalRequest::new(vec![
            FrameRef::Name("keep.toml".to_string()),
            FrameRef::Name("frame_00001.jpg".to_string()),
        ])
        .unwrap(),
    );

    assert_eq!(report.removed, vec!["frame_00001.jpg"]);
    assert!(report.not_found.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].frame, "keep.toml");
    assert!(report.failed[0].reason.contains("not a frame file name"));
    assert!(stray.exists());
    assert_eq!(indices(&session), (vec![0], vec![0]));
}

#[test]
fn test_removal_request_validation_messages() {
    assert_eq!(
        FrameRemovalRequest::from_json(r#"{"frames": []}"#).unwrap_err(),
        ValidationError::EmptyRemovalRequest
    );
    assert_eq!(
        ValidationError::EmptyRemovalRequest.to_string(),
        "No frames specified for removal."
    );

    for body in [r#"["frame_00000.jpg"]"#, r#"{"frame": []}"#, "not json"] {
        let err = FrameRemovalRequest::from_json(body).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRemovalRequest(_)), "body = {}", body);
        assert!(err
            .to_string()
            .starts_with("Invalid request format. Expected {\"frames\": [...]}"));
    }
}
