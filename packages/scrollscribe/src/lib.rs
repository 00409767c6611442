//! # scrollscribe
//!
//! Harvests the text of a long, scrollable screen panel (an LLM chat answer, a
//! feed, a log view) by repeatedly capturing a fixed region, detecting pixel
//! changes, running OCR on what changed, and merging de-duplicated text until
//! the viewport stops moving.
//!
//! ## Features
//!
//! - **Change-gated OCR**: extraction only runs when the captured pixels differ
//! - **Noise Filtering**: drops short lines, table-border debris and configured disclaimers
//! - **Exact De-duplication**: every distinct chunk is kept once, in discovery order
//! - **Bounded Runs**: stability threshold plus optional iteration, time and cancellation limits
//! - **Pluggable Boundaries**: capture, scroll and OCR are traits with command-line backed defaults
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use scrollscribe::prelude::*;
//!
//! let config = CollectorConfig::default().with_region("200,200,800x600".parse()?);
//! let extractor = TextExtractor::new(Arc::new(TesseractEngine::new()), config.cleaning.clone());
//! let mut collector = Collector::new(
//!     config,
//!     CommandCapture::platform_default(),
//!     extractor,
//!     CommandScroll::xdotool(),
//! )?;
//!
//! let report = collector.run().await;
//! println!("{}", report.text);
//! ```

pub mod capture;
pub mod change;
pub mod cleaning;
pub mod collector;
pub mod config;
pub mod extract;
pub mod region;
pub mod scroll;

// Re-export commonly used types at the root level
pub use capture::{Capture, CaptureError, CommandCapture, FrameReplay, ViewportCapture};
pub use change::changed;
pub use cleaning::{clean_ocr_text, clean_with_defaults, CleaningPolicy, LineCleaner};
pub use collector::{CollectionReport, Collector, Termination};
pub use config::{CollectorConfig, ConfigError};
pub use extract::TextExtractor;
pub use region::{Region, RegionError};
pub use scroll::{CommandScroll, NoopScroll, ScrollDriver};

pub use scrollscribe_ocr::{OcrEngine, OcrError, OcrInput, OcrOutput, TesseractEngine};

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```ignore
/// use scrollscribe::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        changed, clean_ocr_text, clean_with_defaults, Capture, CaptureError, CleaningPolicy,
        CollectionReport, Collector, CollectorConfig, CommandCapture, CommandScroll, ConfigError,
        FrameReplay, LineCleaner, NoopScroll, OcrEngine, OcrError, OcrInput, OcrOutput, Region,
        RegionError, ScrollDriver, TesseractEngine, Termination, TextExtractor, ViewportCapture,
    };
}
