/// Default ceiling on concurrently processing jobs
pub const MAX_CONCURRENT_JOBS: usize = 3;

/// Interval between simulated progress increments in milliseconds
pub const PROGRESS_INTERVAL_MS: u64 = 200;

/// Simulated progress increment per interval (also the value set at dispatch)
pub const PROGRESS_STEP: u8 = 5;

/// Simulated progress never exceeds this until the real outcome arrives
pub const PROGRESS_CEILING: u8 = 90;

/// Images whose width and height are both at or below this are left alone
pub const MIN_IMAGE_DIMENSION: u32 = 500;

/// Images are downscaled so neither dimension exceeds this
pub const MAX_IMAGE_DIMENSION: u32 = 2000;

/// JPEG re-encode quality (1-100, maps to a 0.7 quality factor)
pub const JPEG_QUALITY: u8 = 70;

/// A re-encoded image is accepted only below this fraction of the original size
pub const MIN_SAVINGS_RATIO: f32 = 0.9;

/// Identifying string written into Producer and Creator metadata
pub const TOOL_NAME: &str = "pdfshrink";

/// Prefix for per-job output filenames
pub const OUTPUT_PREFIX: &str = "compressed-";

/// Filename for the batch archive
pub const ARCHIVE_NAME: &str = "compressed-pdfs.zip";

/// Media type accepted into a batch
pub const PDF_MEDIA_TYPE: &str = "application/pdf";
