//! Scenario tests for the collection loop using scripted capture, OCR and scroll fakes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use scrollscribe::prelude::*;
use tokio_util::sync::CancellationToken;

const SIZE: u32 = 4;

enum Step {
    Frame(u8),
    Fail,
}

/// Plays `steps` in order and repeats the last one forever.
struct ScriptedCapture {
    steps: Vec<Step>,
    calls: Arc<AtomicUsize>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedCapture {
    fn frames(shades: &[u8]) -> Self {
        Self::new(shades.iter().map(|s| Step::Frame(*s)).collect())
    }

    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            calls: Arc::new(AtomicUsize::new(0)),
            cancel_after: None,
        }
    }
}

impl ViewportCapture for ScriptedCapture {
    fn capture(&mut self, region: &Region) -> Result<Capture, CaptureError> {
        assert_eq!(region.dimensions(), (SIZE, SIZE));
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((after, token)) = &self.cancel_after {
            if call + 1 >= *after {
                token.cancel();
            }
        }
        match &self.steps[call.min(self.steps.len() - 1)] {
            Step::Frame(shade) => Ok(frame(*shade)),
            Step::Fail => Err(CaptureError::Command {
                program: "scripted".into(),
                message: "display unavailable".into(),
            }),
        }
    }
}

fn frame(shade: u8) -> Capture {
    Capture::new(RgbaImage::from_pixel(SIZE, SIZE, Rgba([shade, shade, shade, 255])))
}

/// Recognises a frame by its shade; unknown shades fail.
struct ScriptedOcr {
    texts: HashMap<u8, &'static str>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedOcr {
    fn new(texts: &[(u8, &'static str)]) -> Self {
        Self {
            texts: texts.iter().copied().collect(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let OcrInput::Bytes(png) = input else {
            return Err(OcrError::Unsupported);
        };
        let shade = image::load_from_memory(png).unwrap().to_rgba8().get_pixel(0, 0)[0];
        match self.texts.get(&shade) {
            Some(text) => Ok(OcrOutput {
                text: text.to_string(),
                regions: Vec::new(),
            }),
            None => Err(OcrError::EngineError(format!("no script for shade {shade}"))),
        }
    }
}

#[derive(Clone, Default)]
struct RecordingScroll(Arc<Mutex<Vec<i32>>>);

impl ScrollDriver for RecordingScroll {
    fn scroll(&mut self, amount: i32) {
        self.0.lock().unwrap().push(amount);
    }
}

impl RecordingScroll {
    fn amounts(&self) -> Vec<i32> {
        self.0.lock().unwrap().clone()
    }
}

fn config() -> CollectorConfig {
    CollectorConfig {
        reset_scrolls: 3,
        ..CollectorConfig::default().with_region(Region::new(0, 0, SIZE, SIZE).unwrap())
    }
}

struct Harness {
    collector: Collector<ScriptedCapture, RecordingScroll>,
    capture_calls: Arc<AtomicUsize>,
    ocr_calls: Arc<AtomicUsize>,
    scroll: RecordingScroll,
}

fn harness(config: CollectorConfig, capture: ScriptedCapture, ocr: ScriptedOcr) -> Harness {
    let capture_calls = capture.calls.clone();
    let ocr_calls = ocr.calls.clone();
    let scroll = RecordingScroll::default();
    let extractor = TextExtractor::new(Arc::new(ocr), config.cleaning.clone());
    let collector = Collector::new(config, capture, extractor, scroll.clone()).unwrap();
    Harness {
        collector,
        capture_calls,
        ocr_calls,
        scroll,
    }
}

#[tokio::test(start_paused = true)]
async fn test_scripted_session_merges_two_chunks_and_stops_after_four_unchanged() {
    // Frames 0-1 differ, 1-2 differ, 2-6 are identical. Frame 2 re-renders text already seen.
    let mut h = harness(
        config(),
        ScriptedCapture::frames(&[1, 2, 3, 3, 3, 3, 3]),
        ScriptedOcr::new(&[
            (1, "First paragraph of the answer"),
            (2, "Second paragraph of the answer"),
            (3, "Second paragraph of the answer"),
        ]),
    );

    let report = h.collector.run().await;

    assert_eq!(report.termination, Termination::Stable);
    assert_eq!(
        report.chunks,
        vec!["First paragraph of the answer", "Second paragraph of the answer"]
    );
    assert_eq!(
        report.text,
        "First paragraph of the answer\nSecond paragraph of the answer"
    );
    // Last capture index is 6 (zero-based).
    assert_eq!(report.iterations, 7);
    assert_eq!(h.capture_calls.load(Ordering::SeqCst), 7);
    assert_eq!(report.extractions, 3);
    assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_terminates_four_captures_after_last_change() {
    let k = 5u8;
    let shades: Vec<u8> = (1..=k).collect();
    let texts: Vec<(u8, &'static str)> = vec![
        (1, "line one of output"),
        (2, "line two of output"),
        (3, "line three of output"),
        (4, "line four of output"),
        (5, "line five of output"),
    ];
    let mut h = harness(config(), ScriptedCapture::frames(&shades), ScriptedOcr::new(&texts));

    let report = h.collector.run().await;

    assert_eq!(report.termination, Termination::Stable);
    assert_eq!(report.chunks.len(), k as usize);
    assert_eq!(report.iterations, u32::from(k) + 4);
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_captures_skip_extraction() {
    let mut h = harness(
        config(),
        ScriptedCapture::frames(&[9]),
        ScriptedOcr::new(&[(9, "static panel text")]),
    );

    let report = h.collector.run().await;

    assert_eq!(report.chunks, vec!["static panel text"]);
    assert_eq!(report.iterations, 5);
    assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.extractions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_capture_failure_counts_once_and_keeps_previous_capture() {
    // Three failures push stability to 3; the next capture equals the retained
    // previous one, which makes the fourth unchanged iteration.
    let mut h = harness(
        config(),
        ScriptedCapture::new(vec![
            Step::Frame(1),
            Step::Fail,
            Step::Fail,
            Step::Fail,
            Step::Frame(1),
        ]),
        ScriptedOcr::new(&[(1, "visible text")]),
    );

    let report = h.collector.run().await;

    assert_eq!(report.termination, Termination::Stable);
    assert_eq!(report.iterations, 5);
    assert_eq!(report.captures_failed, 3);
    assert_eq!(report.chunks, vec!["visible text"]);
    assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_capture_failure_does_not_abort_run() {
    let mut h = harness(
        config(),
        ScriptedCapture::new(vec![Step::Frame(1), Step::Fail, Step::Frame(2)]),
        ScriptedOcr::new(&[(1, "before the glitch"), (2, "after the glitch")]),
    );

    let report = h.collector.run().await;

    assert_eq!(report.chunks, vec!["before the glitch", "after the glitch"]);
    assert_eq!(report.captures_failed, 1);
    // 1 changed, 1 failed, 1 changed, then 4 unchanged.
    assert_eq!(report.iterations, 7);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_text_never_grows_result() {
    // Pixels flip every capture but the text never changes, so only the
    // iteration ceiling ends the run.
    let shades: Vec<u8> = (0..20).map(|i| if i % 2 == 0 { 1 } else { 2 }).collect();
    let mut h = harness(
        CollectorConfig {
            max_iterations: Some(10),
            ..config()
        },
        ScriptedCapture::frames(&shades),
        ScriptedOcr::new(&[(1, "blinking cursor answer"), (2, "blinking cursor answer")]),
    );

    let report = h.collector.run().await;

    assert_eq!(report.termination, Termination::IterationLimit);
    assert_eq!(report.iterations, 10);
    assert_eq!(report.extractions, 10);
    assert_eq!(report.chunks, vec!["blinking cursor answer"]);
}

#[tokio::test(start_paused = true)]
async fn test_chunks_keep_discovery_order_without_repeats() {
    let mut h = harness(
        config(),
        ScriptedCapture::frames(&[1, 2, 3, 4]),
        ScriptedOcr::new(&[
            (1, "alpha section"),
            (2, "beta section"),
            (3, "alpha section"),
            (4, "gamma section"),
        ]),
    );

    let report = h.collector.run().await;

    assert_eq!(report.chunks, vec!["alpha section", "beta section", "gamma section"]);
    assert_eq!(report.text, "alpha section\nbeta section\ngamma section");
}

#[tokio::test(start_paused = true)]
async fn test_noise_only_and_failed_ocr_merge_nothing() {
    let mut h = harness(
        config(),
        ScriptedCapture::frames(&[1, 2, 3]),
        // Shade 3 has no script, so OCR fails for it.
        ScriptedOcr::new(&[(1, "ab\n----\n@#@"), (2, "ChatGPT can make mistakes")]),
    );

    let report = h.collector.run().await;

    assert!(report.chunks.is_empty());
    assert_eq!(report.text, "");
    assert_eq!(report.termination, Termination::Stable);
    // Three changed captures, none novel, then four unchanged.
    assert_eq!(report.iterations, 7);
    assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_reset_then_one_scroll_per_continuing_iteration() {
    let mut h = harness(
        config(),
        ScriptedCapture::frames(&[1, 2]),
        ScriptedOcr::new(&[(1, "top of content"), (2, "bottom of content")]),
    );

    let report = h.collector.run().await;
    let amounts = h.scroll.amounts();

    assert_eq!(&amounts[..3], &[10, 10, 10]);
    assert_eq!(amounts.len() as u32, 3 + report.iterations - 1);
    assert!(amounts[3..].iter().all(|a| *a == -5));
}

#[tokio::test(start_paused = true)]
async fn test_pre_cancelled_run_captures_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let h = harness(
        config(),
        ScriptedCapture::frames(&[1]),
        ScriptedOcr::new(&[(1, "never read")]),
    );
    let capture_calls = h.capture_calls.clone();
    let mut collector = h.collector.with_cancellation(token);

    let report = collector.run().await;

    assert_eq!(report.termination, Termination::Cancelled);
    assert_eq!(report.iterations, 0);
    assert_eq!(capture_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_mid_run_keeps_partial_text() {
    let token = CancellationToken::new();
    let mut capture = ScriptedCapture::frames(&[1, 2, 3, 4, 5, 6]);
    capture.cancel_after = Some((2, token.clone()));
    let h = harness(
        config(),
        capture,
        ScriptedOcr::new(&[
            (1, "first screenful"),
            (2, "second screenful"),
            (3, "third screenful"),
        ]),
    );
    let mut collector = h.collector.with_cancellation(token);

    let report = collector.run().await;

    assert_eq!(report.termination, Termination::Cancelled);
    assert_eq!(report.iterations, 2);
    assert_eq!(report.chunks, vec!["first screenful", "second screenful"]);
}

#[tokio::test(start_paused = true)]
async fn test_time_budget_stops_endless_animation() {
    let shades: Vec<u8> = (1..=50).collect();
    let texts: Vec<(u8, &'static str)> = shades.iter().map(|s| (*s, "animated frame text")).collect();
    let mut h = harness(
        CollectorConfig {
            reset_scrolls: 0,
            pace_ms: 1000,
            max_iterations: None,
            time_budget_secs: Some(3),
            ..config()
        },
        ScriptedCapture::frames(&shades),
        ScriptedOcr::new(&texts),
    );

    let report = h.collector.run().await;

    assert_eq!(report.termination, Termination::TimeBudget);
    assert_eq!(report.iterations, 4);
    assert_eq!(report.chunks.len(), 1);
}

#[test]
fn test_invalid_config_rejected_before_any_work() {
    let scroll = RecordingScroll::default();
    let extractor = TextExtractor::new(Arc::new(ScriptedOcr::new(&[])), CleaningPolicy::default());
    let result = Collector::new(
        CollectorConfig {
            stability_threshold: 0,
            ..config()
        },
        ScriptedCapture::frames(&[1]),
        extractor,
        scroll.clone(),
    );
    assert!(matches!(result, Err(ConfigError::ZeroThreshold)));

    let extractor = TextExtractor::new(Arc::new(ScriptedOcr::new(&[])), CleaningPolicy::default());
    let result = Collector::new(
        CollectorConfig::default(),
        ScriptedCapture::frames(&[1]),
        extractor,
        scroll.clone(),
    );
    assert!(matches!(result, Err(ConfigError::MissingRegion)));
    assert!(scroll.amounts().is_empty());
}
