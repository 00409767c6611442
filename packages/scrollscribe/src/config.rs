//! Run configuration, loadable from JSON and validated before any work starts.
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cleaning::CleaningPolicy;
use crate::region::Region;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no capture region configured")]
    MissingRegion,
    #[error("stability_threshold must be at least 1")]
    ZeroThreshold,
    #[error("scroll_amount must be non-zero")]
    ZeroScroll,
    #[error("max_iterations must be at least 1 when set")]
    ZeroIterations,
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything one collection run needs to know up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub region: Option<Region>,
    /// Scroll issued after every scanning iteration; negative moves toward the end.
    pub scroll_amount: i32,
    /// Scroll issued by each reset step; positive moves toward the start.
    pub reset_amount: i32,
    pub reset_scrolls: u32,
    /// Pause after each scroll so the surface can redraw.
    pub pace_ms: u64,
    /// Consecutive unchanged captures that end the run.
    pub stability_threshold: u32,
    pub max_iterations: Option<u32>,
    pub time_budget_secs: Option<u64>,
    pub cleaning: CleaningPolicy,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            region: None,
            scroll_amount: -5,
            reset_amount: 10,
            reset_scrolls: 10,
            pace_ms: 1000,
            stability_threshold: 4,
            max_iterations: Some(500),
            time_budget_secs: None,
            cleaning: CleaningPolicy::default(),
        }
    }
}

impl CollectorConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_secs.map(Duration::from_secs)
    }

    /// Checks the preconditions of a run and returns its region.
    pub fn validate(&self) -> Result<Region, ConfigError> {
        let region = self.region.ok_or(ConfigError::MissingRegion)?;
        if self.stability_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.scroll_amount == 0 {
            return Err(ConfigError::ZeroScroll);
        }
        if self.max_iterations == Some(0) {
            return Err(ConfigError::ZeroIterations);
        }
        Ok(region)
    }
}
