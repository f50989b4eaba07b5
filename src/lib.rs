pub mod archive;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod scheduler;

pub use archive::{build_archive, BatchPackager};
pub use config::{CompressionSettings, SchedulerSettings};
pub use engine::{CompressionEngine, CompressionOutcome, PdfEngine};
pub use error::{ArchiveError, EngineError, ImageError};
pub use scheduler::{FileInput, Job, JobId, JobScheduler, JobStatus};

use std::sync::atomic::AtomicBool;

/// High-level API for compressing a single PDF in one call.
///
/// This is the recommended entry point when no batch scheduling is needed:
/// it runs the full pipeline (JPEG recompression, metadata scrub, compact
/// re-serialization) to completion on the calling thread.
///
/// # Arguments
///
/// * `input` - Original PDF file contents
/// * `settings` - Image policy and tool identification
///
/// # Returns
///
/// The rewritten document plus diagnostic counters, or an `EngineError` on
/// parse/save failure. Note the output is not guaranteed to be smaller than
/// the input, though it is the common case.
///
/// # Example
///
/// ```no_run
/// use pdfshrink::{compress_pdf, CompressionSettings};
///
/// let input = std::fs::read("scan.pdf").unwrap();
/// let outcome = compress_pdf(&input, &CompressionSettings::default()).unwrap();
///
/// println!(
///     "{} -> {} bytes ({} images optimized)",
///     input.len(),
///     outcome.output.len(),
///     outcome.optimized_images
/// );
/// std::fs::write("compressed-scan.pdf", outcome.output).unwrap();
/// ```
pub fn compress_pdf(
    input: &[u8],
    settings: &CompressionSettings,
) -> Result<CompressionOutcome, EngineError> {
    let cancel = AtomicBool::new(false);
    engine::compress_document(input, settings, &cancel)
}
