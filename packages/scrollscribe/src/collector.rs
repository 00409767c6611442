//! The capture, extract, merge and scroll loop.
//!
//! A run moves through three phases. `Reset` scrolls toward the start of the
//! content a fixed number of times. `Scanning` repeats capture, change
//! detection, extraction and merging, then scrolls toward the end, until the
//! viewport has been unchanged for `stability_threshold` consecutive
//! iterations or a configured limit fires. `Done` hands back the merged text.
//!
//! Every step is awaited to completion before the next one starts. Capture
//! and OCR failures never abort a run.
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::capture::{Capture, ViewportCapture};
use crate::change::changed;
use crate::config::{CollectorConfig, ConfigError};
use crate::extract::TextExtractor;
use crate::region::Region;
use crate::scroll::ScrollDriver;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The viewport stopped changing.
    Stable,
    /// `max_iterations` captures were attempted.
    IterationLimit,
    /// `time_budget_secs` elapsed.
    TimeBudget,
    /// The cancellation token fired.
    Cancelled,
}

impl Termination {
    /// Only `Stable` means the viewport was followed to its end.
    pub fn is_complete(&self) -> bool {
        matches!(self, Termination::Stable)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionReport {
    /// Chunks joined by newlines.
    pub text: String,
    /// Distinct chunks in discovery order.
    pub chunks: Vec<String>,
    pub iterations: u32,
    pub captures_failed: u32,
    pub extractions: u32,
    pub termination: Termination,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

enum Phase {
    Reset,
    Scanning,
    Done(Termination),
}

/// Accumulators owned by a single run.
#[derive(Default)]
struct ScanState {
    prev: Option<Capture>,
    stability: u32,
    collected: Vec<String>,
    seen: HashSet<String>,
    iterations: u32,
    captures_failed: u32,
    extractions: u32,
}

impl ScanState {
    /// Appends `chunk` unless it is empty or already collected.
    fn merge(&mut self, chunk: String) -> bool {
        if chunk.is_empty() || self.seen.contains(&chunk) {
            return false;
        }
        self.seen.insert(chunk.clone());
        self.collected.push(chunk);
        true
    }
}

pub struct Collector<C, S> {
    config: CollectorConfig,
    region: Region,
    capture: C,
    extractor: TextExtractor,
    scroll: S,
    cancel: CancellationToken,
}

impl<C, S> Collector<C, S>
where
    C: ViewportCapture,
    S: ScrollDriver,
{
    /// Validates `config` before any capture or scroll happens.
    pub fn new(
        config: CollectorConfig,
        capture: C,
        extractor: TextExtractor,
        scroll: S,
    ) -> Result<Self, ConfigError> {
        let region = config.validate()?;
        Ok(Self {
            config,
            region,
            capture,
            extractor,
            scroll,
            cancel: CancellationToken::new(),
        })
    }

    /// Stops the run at the next iteration boundary once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub async fn run(&mut self) -> CollectionReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut state = ScanState::default();
        let mut phase = Phase::Reset;

        info!(region = %self.region, "starting collection");

        let termination = loop {
            phase = match phase {
                Phase::Reset => {
                    self.reset().await;
                    Phase::Scanning
                }
                Phase::Scanning => match self.scan_once(&mut state, clock).await {
                    Some(termination) => Phase::Done(termination),
                    None => Phase::Scanning,
                },
                Phase::Done(termination) => break termination,
            };
        };

        let report = CollectionReport {
            text: state.collected.join("\n"),
            chunks: state.collected,
            iterations: state.iterations,
            captures_failed: state.captures_failed,
            extractions: state.extractions,
            termination,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            chunks = report.chunks.len(),
            iterations = report.iterations,
            termination = ?report.termination,
            "collection finished"
        );
        report
    }

    async fn reset(&mut self) {
        debug!(
            scrolls = self.config.reset_scrolls,
            amount = self.config.reset_amount,
            "scrolling toward the start"
        );
        for _ in 0..self.config.reset_scrolls {
            self.scroll.scroll(self.config.reset_amount);
        }
        if self.config.reset_scrolls > 0 {
            self.pause().await;
        }
    }

    /// One scanning iteration. Returns the termination reason once the run is over.
    async fn scan_once(&mut self, state: &mut ScanState, clock: Instant) -> Option<Termination> {
        if self.cancel.is_cancelled() {
            return Some(Termination::Cancelled);
        }
        state.iterations += 1;

        match self.capture.capture(&self.region) {
            Ok(curr) => {
                if changed(state.prev.as_ref(), &curr) {
                    state.extractions += 1;
                    let chunk = self.extractor.extract(&curr).await;
                    if state.merge(chunk) {
                        state.stability = 0;
                        info!(
                            iteration = state.iterations,
                            chunks = state.collected.len(),
                            "merged new text"
                        );
                    } else {
                        debug!(iteration = state.iterations, "capture changed but held no new text");
                    }
                    state.prev = Some(curr);
                } else {
                    state.stability += 1;
                    debug!(
                        iteration = state.iterations,
                        stability = state.stability,
                        "viewport unchanged"
                    );
                }
            }
            Err(e) => {
                state.captures_failed += 1;
                state.stability += 1;
                warn!(
                    iteration = state.iterations,
                    stability = state.stability,
                    error = %e,
                    "capture failed; counting iteration as unchanged"
                );
            }
        }

        if state.stability >= self.config.stability_threshold {
            return Some(Termination::Stable);
        }
        if self
            .config
            .max_iterations
            .is_some_and(|max| state.iterations >= max)
        {
            warn!(iterations = state.iterations, "iteration limit reached before the viewport settled");
            return Some(Termination::IterationLimit);
        }
        if self
            .config
            .time_budget()
            .is_some_and(|budget| clock.elapsed() >= budget)
        {
            warn!(elapsed = ?clock.elapsed(), "time budget exhausted before the viewport settled");
            return Some(Termination::TimeBudget);
        }

        self.scroll.scroll(self.config.scroll_amount);
        self.pause().await;
        None
    }

    async fn pause(&self) {
        let pace = self.config.pace();
        if pace.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(pace) => {}
            _ = self.cancel.cancelled() => {}
        }
    }
}
