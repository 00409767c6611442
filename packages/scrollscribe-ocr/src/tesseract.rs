//! OCR backed by the `tesseract` command-line program.
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::engine::{OcrEngine, OcrError, OcrInput, OcrOutput};
use crate::region::{BoundingBox, TextRegion};

const TSV_WORD_LEVEL: &str = "5";
const TSV_COLUMNS: usize = 12;

pub struct TesseractEngine {
    program: PathBuf,
    language: Option<String>,
    page_segmentation: Option<u8>,
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self::with_program("tesseract")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            language: None,
            page_segmentation: None,
        }
    }

    /// Language pack passed as `-l`, e.g. `eng` or `eng+deu`.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Page segmentation mode passed as `--psm`.
    pub fn page_segmentation(mut self, mode: u8) -> Self {
        self.page_segmentation = Some(mode);
        self
    }

    fn command(&self, source: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(source).arg("stdout");
        if let Some(language) = &self.language {
            cmd.arg("-l").arg(language);
        }
        if let Some(mode) = self.page_segmentation {
            cmd.arg("--psm").arg(mode.to_string());
        }
        cmd.arg("tsv");
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }

    fn launch_error(&self, source: std::io::Error) -> OcrError {
        OcrError::Launch {
            program: self.program.display().to_string(),
            source,
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput, OcrError> {
        let output = match input {
            OcrInput::FilePath(path) => {
                let source = path
                    .to_str()
                    .ok_or_else(|| OcrError::InvalidInput(format!("non UTF-8 path: {}", path.display())))?;
                self.command(source)
                    .stdin(Stdio::null())
                    .output()
                    .await
                    .map_err(|e| self.launch_error(e))?
            }
            OcrInput::Bytes(data) => {
                if data.is_empty() {
                    return Err(OcrError::InvalidInput("empty image buffer".into()));
                }
                let mut child = self
                    .command("stdin")
                    .stdin(Stdio::piped())
                    .spawn()
                    .map_err(|e| self.launch_error(e))?;
                if let Some(mut stdin) = child.stdin.take() {
                    stdin
                        .write_all(data)
                        .await
                        .map_err(|e| OcrError::EngineError(format!("failed to stream image: {e}")))?;
                }
                child
                    .wait_with_output()
                    .await
                    .map_err(|e| OcrError::EngineError(e.to_string()))?
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            return Err(OcrError::EngineError(if stderr.is_empty() {
                format!("tesseract exited with status {code}")
            } else {
                stderr
            }));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let regions = parse_tsv(&tsv);
        debug!(lines = regions.len(), "tesseract finished");
        Ok(OcrOutput::from_regions(regions))
    }
}

struct LineAccumulator {
    key: (String, String, String, String),
    words: Vec<String>,
    bounding_box: BoundingBox,
    confidence_sum: f32,
    confidence_count: u32,
}

impl LineAccumulator {
    fn into_region(self) -> TextRegion {
        let confidence = (self.confidence_count > 0)
            .then(|| self.confidence_sum / self.confidence_count as f32 / 100.0);
        TextRegion {
            text: self.words.join(" "),
            bounding_box: Some(self.bounding_box),
            confidence,
        }
    }
}

/// Groups word rows of tesseract's TSV output into one region per text line.
pub(crate) fn parse_tsv(tsv: &str) -> Vec<TextRegion> {
    let mut lines: Vec<LineAccumulator> = Vec::new();

    for row in tsv.lines() {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < TSV_COLUMNS || fields[0] != TSV_WORD_LEVEL {
            continue;
        }
        let word = fields[11].trim();
        if word.is_empty() {
            continue;
        }

        let number = |i: usize| fields[i].trim().parse::<f32>().unwrap_or(0.0);
        let word_box = BoundingBox {
            x: number(6),
            y: number(7),
            width: number(8),
            height: number(9),
        };
        let confidence = fields[10].trim().parse::<f32>().ok().filter(|c| *c >= 0.0);
        let key = (
            fields[1].to_string(),
            fields[2].to_string(),
            fields[3].to_string(),
            fields[4].to_string(),
        );

        match lines.last_mut() {
            Some(line) if line.key == key => {
                line.words.push(word.to_string());
                line.bounding_box = line.bounding_box.union(&word_box);
                if let Some(c) = confidence {
                    line.confidence_sum += c;
                    line.confidence_count += 1;
                }
            }
            _ => lines.push(LineAccumulator {
                key,
                words: vec![word.to_string()],
                bounding_box: word_box,
                confidence_sum: confidence.unwrap_or(0.0),
                confidence_count: u32::from(confidence.is_some()),
            }),
        }
    }

    lines.into_iter().map(LineAccumulator::into_region).collect()
}
