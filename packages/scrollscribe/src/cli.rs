//! Command line arguments backing the `scrollscribe` binary.
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use scrollscribe::Region;

#[derive(Parser, Debug)]
#[command(
  name = "scrollscribe",
  about = "Collect the text of a scrollable screen region with OCR",
  version
)]
pub struct Args {
  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Print version information
  Version,
  /// Scroll through a live screen region and collect its text
  Collect {
    /// Screen region as x,y,WIDTHxHEIGHT (overrides the config file)
    #[arg(long, short = 'r')]
    region: Option<Region>,

    /// Screenshot command template using {x} {y} {width} {height} {out}
    #[arg(long)]
    capture_command: Option<String>,

    /// Scroll command template using {count} and {button}
    #[arg(long)]
    scroll_command: Option<String>,

    #[command(flatten)]
    run: RunArgs,
  },
  /// Run the collector over recorded frames instead of the live screen
  Replay {
    /// Directory of .png/.jpg frames, replayed in file name order
    frames: PathBuf,

    /// Region the frames represent; defaults to the first frame's size
    #[arg(long, short = 'r')]
    region: Option<Region>,

    #[command(flatten)]
    run: RunArgs,
  },
  /// Apply the cleaning policy to raw OCR text
  Clean {
    /// File with raw OCR text; reads stdin when omitted or "-"
    input: Option<PathBuf>,

    /// JSON config file whose cleaning policy is used
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
  },
}

#[derive(ClapArgs, Debug)]
pub struct RunArgs {
  /// JSON config file
  #[arg(long, short = 'c')]
  pub config: Option<PathBuf>,

  /// Pause after each scroll, in milliseconds
  #[arg(long)]
  pub pace_ms: Option<u64>,

  /// Consecutive unchanged captures that end the run
  #[arg(long)]
  pub threshold: Option<u32>,

  /// Upper bound on capture attempts
  #[arg(long)]
  pub max_iterations: Option<u32>,

  /// Upper bound on run time, in seconds
  #[arg(long)]
  pub time_budget_secs: Option<u64>,

  /// Path to the tesseract executable
  #[arg(long, default_value = "tesseract")]
  pub tesseract: PathBuf,

  /// Tesseract language, e.g. eng
  #[arg(long)]
  pub lang: Option<String>,

  /// Print the full report as JSON
  #[arg(long)]
  pub json: bool,

  /// Write the result to this file instead of stdout
  #[arg(long, short = 'o')]
  pub output: Option<PathBuf>,
}
