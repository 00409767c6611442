//! OCR plus cleaning: turns one capture into one text chunk.
use std::sync::Arc;

use scrollscribe_ocr::{OcrEngine, OcrInput};
use tracing::{debug, warn};

use crate::capture::Capture;
use crate::cleaning::{CleaningPolicy, LineCleaner};

pub struct TextExtractor {
    engine: Arc<dyn OcrEngine>,
    cleaner: LineCleaner,
}

impl TextExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>, policy: CleaningPolicy) -> Self {
        Self {
            engine,
            cleaner: LineCleaner::new(policy),
        }
    }

    pub fn policy(&self) -> &CleaningPolicy {
        self.cleaner.policy()
    }

    /// Recognises and cleans `capture`.
    ///
    /// Encoding or OCR failures yield an empty chunk; they never abort a run.
    pub async fn extract(&self, capture: &Capture) -> String {
        let png = match capture.to_png() {
            Ok(png) => png,
            Err(e) => {
                warn!(error = %e, "failed to encode capture for OCR");
                return String::new();
            }
        };

        match self.engine.recognize(&OcrInput::Bytes(png)).await {
            Ok(output) => {
                let chunk = self.cleaner.clean(&output.text);
                debug!(
                    raw_bytes = output.text.len(),
                    chunk_bytes = chunk.len(),
                    "extracted text chunk"
                );
                chunk
            }
            Err(e) => {
                warn!(error = %e, "OCR failed; treating capture as empty");
                String::new()
            }
        }
    }
}
