//! Frame index properties of an extraction run

use crate::support::{touch_video, FakeDecoder};
use minewatch::extraction::{ExtractionEvent, FrameExtractor};
use minewatch::frame::{frame_file_name, FrameStore};
use proptest::collection::btree_set;
use proptest::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn run(decoder: FakeDecoder, temp: &TempDir, interval: i64) -> Vec<ExtractionEvent> {
    let video = touch_video(temp.path());
    let store = FrameStore::new(temp.path().join("frames"));
    FrameExtractor::new(Arc::new(decoder))
        .extract(&video, &store, Some(interval), CancellationToken::new())
        .collect()
}

fn written(events: &[ExtractionEvent]) -> Vec<(usize, u64)> {
    events
        .iter()
        .filter_map(|event| match event {
            ExtractionEvent::FrameExtracted { frame } => {
                Some((frame.index, frame.source_offset.unwrap_or(u64::MAX)))
            }
            _ => None,
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn selected_offsets_follow_the_stride(frames in 0u64..200, interval in 1i64..40) {
        let temp = TempDir::new().unwrap();
        let events = run(FakeDecoder::new(frames), &temp, interval);

        let expected: Vec<(usize, u64)> = (0..frames)
            .filter(|offset| offset % interval as u64 == 0)
            .enumerate()
            .collect();
        prop_assert_eq!(written(&events), expected.clone());
        prop_assert_eq!(
            events.last(),
            Some(&ExtractionEvent::ExtractionComplete { total_count: expected.len() })
        );
    }

    #[test]
    fn indices_stay_contiguous_under_write_failures(
        frames in 1u64..120,
        interval in 1i64..10,
        failing in btree_set(0u64..40, 0..6),
    ) {
        let temp = TempDir::new().unwrap();
        let selected = (frames + interval as u64 - 1) / interval as u64;
        let failing: Vec<u64> = failing.into_iter().filter(|o| *o < selected).collect();
        let decoder = FakeDecoder::new(frames).with_write_failures(
            temp.path().join("frames"),
            interval as u64,
            failing.iter().copied(),
        );
        let events = run(decoder, &temp, interval);

        let indices: Vec<usize> = written(&events).iter().map(|(index, _)| *index).collect();
        let expected_count = (selected as usize) - failing.len();
        prop_assert_eq!(indices, (0..expected_count).collect::<Vec<_>>());

        let warnings = events
            .iter()
            .filter(|e| matches!(e, ExtractionEvent::WriteWarning { .. }))
            .count();
        prop_assert_eq!(warnings, failing.len());
        prop_assert_eq!(
            events.last(),
            Some(&ExtractionEvent::ExtractionComplete { total_count: expected_count })
        );

        let frames_dir = temp.path().join("frames");
        for index in 0..expected_count {
            prop_assert!(frames_dir.join(frame_file_name(index)).is_file());
        }
        prop_assert!(!frames_dir.join(frame_file_name(expected_count)).exists());
    }
}
