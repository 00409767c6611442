mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Commands, RunArgs};
use scrollscribe::{
  clean_ocr_text, CleaningPolicy, CollectionReport, Collector, CollectorConfig, CommandCapture, CommandScroll,
  FrameReplay, NoopScroll, Region, ScrollDriver, TesseractEngine, TextExtractor, ViewportCapture,
};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = Args::parse();

  if let Err(e) = run(args).await {
    eprintln!("Error: {:#}", e);
    std::process::exit(1);
  }
}

async fn run(args: Args) -> Result<()> {
  match args.command {
    Commands::Version => {
      println!("scrollscribe {}", env!("CARGO_PKG_VERSION"));
      Ok(())
    }
    Commands::Collect {
      region,
      capture_command,
      scroll_command,
      run,
    } => {
      let mut config = load_config(&run)?;
      if region.is_some() {
        config.region = region;
      }

      let capture = match capture_command.as_deref() {
        Some(template) => CommandCapture::from_template(template).context("invalid --capture-command")?,
        None => CommandCapture::platform_default(),
      };
      let scroll = match scroll_command.as_deref() {
        Some(template) => CommandScroll::from_template(template).context("--scroll-command is empty")?,
        None => CommandScroll::xdotool(),
      };

      let report = collect(config, capture, scroll, &run).await?;
      emit(&report, &run).await
    }
    Commands::Replay { frames, region, run } => {
      let mut config = load_config(&run)?;
      if run.pace_ms.is_none() {
        config.pace_ms = 0;
      }

      let replay = FrameReplay::from_dir(&frames)
        .with_context(|| format!("cannot replay frames from {}", frames.display()))?;
      config.region = match region.or(config.region) {
        Some(region) => Some(region),
        None => {
          let (width, height) = replay.frame_dimensions()?;
          Some(Region::new(0, 0, width, height)?)
        }
      };
      info!(frames = replay.len(), "replaying recorded frames");

      let report = collect(config, replay, NoopScroll, &run).await?;
      emit(&report, &run).await
    }
    Commands::Clean { input, config } => {
      let policy = match config {
        Some(path) => CollectorConfig::from_file(&path)?.cleaning,
        None => CleaningPolicy::default(),
      };
      let raw = read_input(input.as_deref()).await?;
      println!("{}", clean_ocr_text(&raw, &policy));
      Ok(())
    }
  }
}

fn load_config(run: &RunArgs) -> Result<CollectorConfig> {
  let mut config = match &run.config {
    Some(path) => CollectorConfig::from_file(path)?,
    None => CollectorConfig::default(),
  };
  if let Some(pace_ms) = run.pace_ms {
    config.pace_ms = pace_ms;
  }
  if let Some(threshold) = run.threshold {
    config.stability_threshold = threshold;
  }
  if run.max_iterations.is_some() {
    config.max_iterations = run.max_iterations;
  }
  if run.time_budget_secs.is_some() {
    config.time_budget_secs = run.time_budget_secs;
  }
  Ok(config)
}

async fn collect<C, S>(config: CollectorConfig, capture: C, scroll: S, run: &RunArgs) -> Result<CollectionReport>
where
  C: ViewportCapture,
  S: ScrollDriver,
{
  let mut engine = TesseractEngine::with_program(&run.tesseract);
  if let Some(lang) = &run.lang {
    engine = engine.language(lang.clone());
  }
  let extractor = TextExtractor::new(Arc::new(engine), config.cleaning.clone());

  let cancel = CancellationToken::new();
  let mut collector = Collector::new(config, capture, extractor, scroll)
    .context("invalid collector configuration")?
    .with_cancellation(cancel.clone());

  let interrupt = tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      cancel.cancel();
    }
  });
  let report = collector.run().await;
  interrupt.abort();

  if !report.termination.is_complete() {
    warn!(termination = ?report.termination, "returning partial text");
  }
  Ok(report)
}

async fn emit(report: &CollectionReport, run: &RunArgs) -> Result<()> {
  let rendered = if run.json {
    serde_json::to_string_pretty(report)?
  } else {
    report.text.clone()
  };

  match &run.output {
    Some(path) => {
      tokio::fs::write(path, format!("{}\n", rendered))
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
      info!(path = %path.display(), "wrote result");
    }
    None => println!("{}", rendered),
  }
  Ok(())
}

async fn read_input(input: Option<&Path>) -> Result<String> {
  match input {
    Some(path) if path != Path::new("-") => tokio::fs::read_to_string(path)
      .await
      .with_context(|| format!("failed to read {}", path.display())),
    _ => {
      let mut raw = String::new();
      tokio::io::stdin()
        .read_to_string(&mut raw)
        .await
        .context("failed to read stdin")?;
      Ok(raw)
    }
  }
}
