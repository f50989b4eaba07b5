use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use crate::config::defaults::{OUTPUT_PREFIX, PDF_MEDIA_TYPE};

/// Opaque job token, unique within one scheduler for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub(crate) u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One file offered to a batch add. Entries whose media type is not PDF
/// are silently dropped at enqueue.
#[derive(Debug, Clone)]
pub struct FileInput {
    pub name: String,
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

impl FileInput {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Convenience constructor for a PDF input
    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, PDF_MEDIA_TYPE, bytes)
    }
}

/// Lifecycle state of a job. Result bytes and the error message live inside
/// the terminal variants, so a job can never carry both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Processing,
    Success { output: Vec<u8> },
    Error { message: String },
}

/// One file's journey through the compression pipeline
#[derive(Debug)]
pub struct Job {
    pub id: JobId,
    /// Original filename, used to derive the download name
    pub name: String,
    pub status: JobStatus,
    /// 0..=100; a fixed-cadence estimate while processing, exactly 100 only
    /// on success
    pub progress: u8,
    pub(crate) source: Arc<[u8]>,
    pub(crate) started_at: Option<Instant>,
    pub(crate) cancel: Arc<AtomicBool>,
}

impl Job {
    pub(crate) fn new(id: JobId, name: String, source: Arc<[u8]>) -> Self {
        Self {
            id,
            name,
            status: JobStatus::Queued,
            progress: 0,
            source,
            started_at: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn original_size(&self) -> usize {
        self.source.len()
    }

    /// The compressed document, present only on success
    pub fn result_bytes(&self) -> Option<&[u8]> {
        match &self.status {
            JobStatus::Success { output } => Some(output),
            _ => None,
        }
    }

    pub fn compressed_size(&self) -> Option<usize> {
        self.result_bytes().map(<[u8]>::len)
    }

    /// The failure message, present only on error
    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            JobStatus::Error { message } => Some(message),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            JobStatus::Success { .. } | JobStatus::Error { .. }
        )
    }

    /// Download filename: `compressed-<original-name>`
    pub fn download_name(&self) -> String {
        format!("{}{}", OUTPUT_PREFIX, self.name)
    }
}
