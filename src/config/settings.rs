use std::time::Duration;

use crate::cli::Args;

use super::defaults::*;

/// Runtime settings for the document recompression engine
#[derive(Debug, Clone)]
pub struct CompressionSettings {
    /// Images at or below this size in both dimensions are skipped
    pub min_dimension: u32,
    /// Neither output dimension exceeds this (no upscaling)
    pub max_dimension: u32,
    /// JPEG re-encode quality (1-100)
    pub jpeg_quality: u8,
    /// A replacement must be smaller than this fraction of the original
    pub min_savings: f32,
    /// Written into the Producer and Creator metadata fields
    pub tool_name: String,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            min_dimension: MIN_IMAGE_DIMENSION,
            max_dimension: MAX_IMAGE_DIMENSION,
            jpeg_quality: JPEG_QUALITY,
            min_savings: MIN_SAVINGS_RATIO,
            tool_name: TOOL_NAME.to_string(),
        }
    }
}

impl CompressionSettings {
    /// Create settings from CLI arguments
    pub fn from_args(args: &Args) -> Self {
        Self {
            jpeg_quality: args.quality,
            ..Default::default()
        }
    }
}

/// Runtime settings for the job scheduler
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Maximum number of jobs processing at once
    pub max_concurrent: usize,
    /// Cadence of the simulated progress estimate
    pub progress_interval: Duration,
    /// Progress increment per interval; also the value set at dispatch
    pub progress_step: u8,
    /// Simulated progress cap; only a real success outcome reaches 100
    pub progress_ceiling: u8,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_concurrent: MAX_CONCURRENT_JOBS,
            progress_interval: Duration::from_millis(PROGRESS_INTERVAL_MS),
            progress_step: PROGRESS_STEP,
            progress_ceiling: PROGRESS_CEILING,
        }
    }
}

impl SchedulerSettings {
    /// Create settings from CLI arguments
    pub fn from_args(args: &Args) -> Self {
        Self {
            max_concurrent: args.jobs.max(1),
            ..Default::default()
        }
    }
}
