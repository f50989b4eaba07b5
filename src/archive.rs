//! Batch packager - bundles every successful job into one zip archive.

use std::io::{Cursor, Write};
use std::thread;

use flume::{Receiver, Sender};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;
use crate::scheduler::Job;

/// Build an archive from the successful jobs in the given snapshot, one
/// deflated entry per job named after its download name. Returns the
/// serialized zip; on failure nothing partial is emitted.
pub fn build_archive(jobs: &[Job]) -> Result<Vec<u8>, ArchiveError> {
    write_archive(
        jobs.iter()
            .filter_map(|job| job.result_bytes().map(|bytes| (job.download_name(), bytes))),
    )
}

fn write_archive<'a>(
    entries: impl Iterator<Item = (String, &'a [u8])>,
) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in entries {
        writer.start_file(name, options)?;
        writer.write_all(bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Serializes archives off the control thread, at most one build in flight.
///
/// `start` snapshots the successful jobs and rejects re-entrant invocation
/// with [`ArchiveError::Busy`]; it never queues. A failed build is logged
/// and clears the busy flag so the caller can retry.
pub struct BatchPackager {
    busy: bool,
    result_tx: Sender<Result<Vec<u8>, ArchiveError>>,
    result_rx: Receiver<Result<Vec<u8>, ArchiveError>>,
}

impl Default for BatchPackager {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchPackager {
    pub fn new() -> Self {
        let (result_tx, result_rx) = flume::unbounded();
        Self {
            busy: false,
            result_tx,
            result_rx,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Kick off an archive build over the current snapshot of successful
    /// jobs. Fails fast with `Busy` while a build is already in flight.
    pub fn start(&mut self, jobs: &[Job]) -> Result<(), ArchiveError> {
        if self.busy {
            return Err(ArchiveError::Busy);
        }

        let entries: Vec<(String, Vec<u8>)> = jobs
            .iter()
            .filter_map(|job| {
                job.result_bytes()
                    .map(|bytes| (job.download_name(), bytes.to_vec()))
            })
            .collect();

        self.busy = true;
        let tx = self.result_tx.clone();
        thread::spawn(move || {
            let result = write_archive(
                entries
                    .iter()
                    .map(|(name, bytes)| (name.clone(), bytes.as_slice())),
            );
            let _ = tx.send(result);
        });

        Ok(())
    }

    /// Collect the finished archive, if any. Clears the busy flag on
    /// completion; build failures are logged and returned.
    pub fn poll(&mut self) -> Option<Result<Vec<u8>, ArchiveError>> {
        match self.result_rx.try_recv() {
            Ok(result) => {
                self.busy = false;
                if let Err(ref err) = result {
                    log::error!("Archive build failed: {}", err);
                }
                Some(result)
            }
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{JobId, JobStatus};
    use std::io::Read;
    use std::time::Duration;

    fn successful_job(id: u64, name: &str, output: Vec<u8>) -> Job {
        let mut job = Job::new(JobId(id), name.to_string(), vec![0u8; 8].into());
        job.progress = 100;
        job.status = JobStatus::Success { output };
        job
    }

    fn failed_job(id: u64, name: &str) -> Job {
        let mut job = Job::new(JobId(id), name.to_string(), vec![0u8; 8].into());
        job.status = JobStatus::Error {
            message: "Compression failed".to_string(),
        };
        job
    }

    #[test]
    fn test_archive_contains_only_successful_jobs() {
        let jobs = vec![
            successful_job(1, "a.pdf", b"first".to_vec()),
            failed_job(2, "b.pdf"),
            successful_job(3, "c.pdf", b"third".to_vec()),
        ];

        let bytes = build_archive(&jobs).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

        assert_eq!(archive.len(), 2);

        let mut content = Vec::new();
        archive
            .by_name("compressed-a.pdf")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"first");

        assert!(archive.by_name("compressed-b.pdf").is_err());
    }

    #[test]
    fn test_empty_snapshot_yields_empty_archive() {
        let bytes = build_archive(&[]).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }

    #[test]
    fn test_packager_rejects_reentrant_build() {
        let jobs = vec![successful_job(1, "a.pdf", vec![0u8; 1024])];
        let mut packager = BatchPackager::new();

        packager.start(&jobs).unwrap();
        assert!(packager.is_busy());
        assert!(matches!(packager.start(&jobs), Err(ArchiveError::Busy)));

        // Wait out the build, then a fresh one is allowed again
        let result = loop {
            if let Some(result) = packager.poll() {
                break result;
            }
            thread::sleep(Duration::from_millis(5));
        };
        assert!(result.is_ok());
        assert!(!packager.is_busy());
        packager.start(&jobs).unwrap();
    }
}
