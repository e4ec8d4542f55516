//! Progress events emitted alongside the pipeline

use crate::support::{site_session, touch_video, FakeDecoder, ScriptedProvider};
use futures::StreamExt;
use minewatch::config::MinewatchConfig;
use minewatch::cli::{Commands, OutputFormat, RunContext};
use minewatch::progress::{JsonLinesSink, MemorySink, ProgressEvent, ProgressRecorder, SessionStatus};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_pipeline_events_in_order() {
    let temp = TempDir::new().unwrap();
    let video = touch_video(temp.path());
    let session = site_session(
        temp.path(),
        Arc::new(ScriptedProvider::with_relevance(vec!["yes", "no"])),
        Arc::new(FakeDecoder::new(2)),
    );
    let sink = Arc::new(MemorySink::default());
    let recorder = ProgressRecorder::new(sink.clone());

    recorder.start("run");
    let mut events = session.start_extraction(&video, Some(1)).await;
    while let Some(event) = events.next().await {
        recorder.extraction(&event);
    }
    let mut results = session.analysis_stream(None).await.unwrap();
    while let Some((frame, analysis)) = results.next().await {
        recorder.frame_analyzed(&frame, &analysis);
    }
    recorder.analysis_complete(session.analysis().unwrap().stats());
    let report = session.summarize().await.unwrap();
    recorder.summary(&report);
    recorder.finish(SessionStatus::Completed, None);

    let recorded = sink.events();
    let kinds: Vec<&str> = recorded.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(
        kinds,
        vec![
            "session_started",
            "frame_extracted",
            "frame_extracted",
            "extraction_complete",
            "frame_analyzed",
            "frame_analyzed",
            "analysis_complete",
            "summary_generated",
            "session_ended",
        ]
    );
    assert_eq!(recorded[1].data["frame"]["index"], 0);
    assert_eq!(recorded[4].data["analysis"]["status"], "relevant");
    assert_eq!(recorded[5].data["analysis"]["status"], "irrelevant");
    assert_eq!(recorded[6].data["relevant"], 1);
    assert_eq!(recorded[7].data["observation_count"], 4);
    let seqs: Vec<u64> = recorded.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, (1..=9).collect::<Vec<u64>>());
}

#[test]
fn test_run_context_writes_json_lines() {
    let temp = TempDir::new().unwrap();
    let progress_path = temp.path().join("progress.ndjson");
    let file = std::fs::File::create(&progress_path).unwrap();

    let mut config = MinewatchConfig::default();
    config.provider.api_key = Some("sk-test".to_string());
    let ctx = RunContext::from_config(temp.path().to_path_buf(), config)
        .unwrap()
        .with_progress_sink(Arc::new(JsonLinesSink::new(file)));

    let result = ctx.execute(&Commands::Extract {
        video: temp.path().join("absent.mp4"),
        interval: None,
        format: OutputFormat::Json,
    });
    assert!(result.is_ok());

    let contents = std::fs::read_to_string(&progress_path).unwrap();
    let events: Vec<ProgressEvent> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let kinds: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(kinds, vec!["session_started", "extraction_failed", "session_ended"]);
    assert_eq!(events[0].data["command"], "extract");
    assert_eq!(events[2].data["status"], "completed");
    assert!(events.iter().all(|e| e.session == events[0].session));
}
