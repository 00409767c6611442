//! Scroll actions against whatever surface has input focus.
use std::process::Command;

use tracing::warn;

/// Positive amounts scroll toward the start of content, negative toward the end.
pub trait ScrollDriver {
    fn scroll(&mut self, amount: i32);
}

/// Ignores scroll requests. Used when replaying recorded frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScroll;

impl ScrollDriver for NoopScroll {
    fn scroll(&mut self, _amount: i32) {}
}

/// Emits wheel clicks through a host input tool.
///
/// Arguments may use `{count}` (absolute amount) and `{button}` (`up_button`
/// for positive amounts, `down_button` for negative ones).
pub struct CommandScroll {
    program: String,
    args: Vec<String>,
    up_button: String,
    down_button: String,
}

impl CommandScroll {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            up_button: "4".to_string(),
            down_button: "5".to_string(),
        }
    }

    /// `xdotool click --repeat {count} {button}` with X11 wheel buttons 4 and 5.
    pub fn xdotool() -> Self {
        Self::new(
            "xdotool",
            vec![
                "click".into(),
                "--repeat".into(),
                "{count}".into(),
                "{button}".into(),
            ],
        )
    }

    /// Parses a whitespace separated template, e.g. `ydotool mousemove --wheel -y {count}`.
    pub fn from_template(template: &str) -> Option<Self> {
        let mut words = template.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self::new(program, words.collect()))
    }

    pub fn buttons(mut self, up: impl Into<String>, down: impl Into<String>) -> Self {
        self.up_button = up.into();
        self.down_button = down.into();
        self
    }

    pub(crate) fn render_args(&self, amount: i32) -> Vec<String> {
        let button = if amount >= 0 { &self.up_button } else { &self.down_button };
        let count = amount.unsigned_abs().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{count}", &count).replace("{button}", button))
            .collect()
    }
}

impl ScrollDriver for CommandScroll {
    fn scroll(&mut self, amount: i32) {
        if amount == 0 {
            return;
        }
        match Command::new(&self.program).args(self.render_args(amount)).status() {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(program = %self.program, %status, "scroll command failed"),
            Err(e) => warn!(program = %self.program, error = %e, "failed to launch scroll command"),
        }
    }
}
