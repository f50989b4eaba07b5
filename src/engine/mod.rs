//! Document recompression engine and the per-image step it applies.

pub mod document;
pub mod image;

pub use document::{compress_document, CompressionOutcome};
pub use image::{recompress_jpeg, target_dimensions, RecompressedImage};

use std::sync::atomic::AtomicBool;

use crate::config::CompressionSettings;
use crate::error::EngineError;

/// The seam between the scheduler and the compression work it dispatches.
///
/// One invocation per job: runs to completion or failure and produces
/// exactly one outcome. The cancel flag is cooperative; implementations
/// should check it between units of work.
pub trait CompressionEngine: Send + Sync {
    fn run(&self, input: &[u8], cancel: &AtomicBool) -> Result<CompressionOutcome, EngineError>;
}

/// The real engine: full PDF recompression pipeline
#[derive(Debug, Clone, Default)]
pub struct PdfEngine {
    settings: CompressionSettings,
}

impl PdfEngine {
    pub fn new(settings: CompressionSettings) -> Self {
        Self { settings }
    }
}

impl CompressionEngine for PdfEngine {
    fn run(&self, input: &[u8], cancel: &AtomicBool) -> Result<CompressionOutcome, EngineError> {
        compress_document(input, &self.settings, cancel)
    }
}
