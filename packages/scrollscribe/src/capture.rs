//! Screen capture boundary and the adapters that feed it.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};
use thiserror::Error;
use tracing::debug;

use crate::region::Region;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to launch capture command {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("capture command {program} failed: {message}")]
    Command { program: String, message: String },
    #[error("failed to decode capture {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("capture command template is empty")]
    EmptyTemplate,
    #[error("failed to read frames from {path}: {source}")]
    Frames {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no frames to replay")]
    NoFrames,
}

/// One still raster of a region at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    image: RgbaImage,
}

impl Capture {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Raw RGBA bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Encodes the capture as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut buf = std::io::Cursor::new(Vec::new());
        self.image.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }

    /// Returns the capture scaled to exactly `width`x`height`.
    fn fit_to(self, width: u32, height: u32) -> Self {
        if self.image.dimensions() == (width, height) {
            return self;
        }
        debug!(
            from = ?self.image.dimensions(),
            to = ?(width, height),
            "resizing capture to region size"
        );
        Self::new(imageops::resize(&self.image, width, height, FilterType::Triangle))
    }
}

/// Produces still images of a screen region on demand.
pub trait ViewportCapture {
    fn capture(&mut self, region: &Region) -> Result<Capture, CaptureError>;
}

/// Runs a host screenshot program and decodes the file it writes.
///
/// Template arguments may use `{x}`, `{y}`, `{width}`, `{height}` and `{out}`.
pub struct CommandCapture {
    program: String,
    args: Vec<String>,
    out_path: PathBuf,
}

impl CommandCapture {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        let out_path = std::env::temp_dir().join(format!("scrollscribe-{}.png", std::process::id()));
        Self {
            program: program.into(),
            args,
            out_path,
        }
    }

    /// Parses a whitespace separated template such as `grim -g "{x},{y} {width}x{height}" {out}`.
    /// Double quotes group words.
    pub fn from_template(template: &str) -> Result<Self, CaptureError> {
        let mut words = split_template(template).into_iter();
        let program = words.next().ok_or(CaptureError::EmptyTemplate)?;
        Ok(Self::new(program, words.collect()))
    }

    /// `screencapture` on macOS, `grim` elsewhere.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new(
                "screencapture",
                vec![
                    "-x".into(),
                    "-R{x},{y},{width},{height}".into(),
                    "-t".into(),
                    "png".into(),
                    "{out}".into(),
                ],
            )
        } else {
            Self::new(
                "grim",
                vec!["-g".into(), "{x},{y} {width}x{height}".into(), "{out}".into()],
            )
        }
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.out_path = path.into();
        self
    }

    pub(crate) fn render_args(&self, region: &Region) -> Vec<String> {
        let out = self.out_path.display().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{x}", &region.x().to_string())
                    .replace("{y}", &region.y().to_string())
                    .replace("{width}", &region.width().to_string())
                    .replace("{height}", &region.height().to_string())
                    .replace("{out}", &out)
            })
            .collect()
    }
}

impl ViewportCapture for CommandCapture {
    fn capture(&mut self, region: &Region) -> Result<Capture, CaptureError> {
        let output = Command::new(&self.program)
            .args(self.render_args(region))
            .output()
            .map_err(|source| CaptureError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CaptureError::Command {
                program: self.program.clone(),
                message: if stderr.is_empty() {
                    format!("exit status {}", output.status.code().unwrap_or(-1))
                } else {
                    stderr
                },
            });
        }

        let capture = load_capture(&self.out_path)?;
        let _ = fs::remove_file(&self.out_path);
        Ok(capture.fit_to(region.width(), region.height()))
    }
}

/// Serves recorded frames in order, repeating the last one once exhausted.
pub struct FrameReplay {
    frames: Vec<PathBuf>,
    next: usize,
}

impl FrameReplay {
    pub fn new(frames: Vec<PathBuf>) -> Result<Self, CaptureError> {
        if frames.is_empty() {
            return Err(CaptureError::NoFrames);
        }
        Ok(Self { frames, next: 0 })
    }

    /// Collects `.png`, `.jpg` and `.jpeg` files from `dir`, sorted by file name.
    pub fn from_dir(dir: &Path) -> Result<Self, CaptureError> {
        let mut frames = fs::read_dir(dir)
            .map_err(|source| CaptureError::Frames {
                path: dir.to_path_buf(),
                source,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                    .unwrap_or(false)
            })
            .collect::<Vec<_>>();
        frames.sort();
        Self::new(frames)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Size of the first frame, read from its header.
    pub fn frame_dimensions(&self) -> Result<(u32, u32), CaptureError> {
        let path = &self.frames[0];
        image::image_dimensions(path).map_err(|source| CaptureError::Decode {
            path: path.clone(),
            source,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl ViewportCapture for FrameReplay {
    fn capture(&mut self, region: &Region) -> Result<Capture, CaptureError> {
        let index = self.next.min(self.frames.len() - 1);
        self.next = self.next.saturating_add(1);
        let capture = load_capture(&self.frames[index])?;
        Ok(capture.fit_to(region.width(), region.height()))
    }
}

fn load_capture(path: &Path) -> Result<Capture, CaptureError> {
    let image = image::open(path).map_err(|source| CaptureError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Capture::new(image.to_rgba8()))
}

fn split_template(template: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in template.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    words.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        words.push(current);
    }
    words
}
