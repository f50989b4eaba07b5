//! Job scheduler - bounded-concurrency dispatch of compression work
//!
//! Single control thread for bookkeeping: every engine invocation runs on
//! its own worker thread owning an independent copy of the input, and sends
//! exactly one outcome message back over a shared channel. The hosting code
//! drives the scheduler by calling [`JobScheduler::poll`] periodically.

pub mod job;

pub use job::{FileInput, Job, JobId, JobStatus};

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use flume::{Receiver, Sender};

use crate::config::defaults::PDF_MEDIA_TYPE;
use crate::config::SchedulerSettings;
use crate::engine::{CompressionEngine, CompressionOutcome};
use crate::error::EngineError;

/// One-shot outcome message from a worker thread
struct JobOutcome {
    job_id: JobId,
    result: Result<CompressionOutcome, EngineError>,
}

/// Holds the ordered job collection and enforces the concurrency ceiling.
///
/// All state mutation happens on the caller's thread; workers only ever
/// talk back through the outcome channel, so every `poll` observes a
/// consistent snapshot.
pub struct JobScheduler {
    jobs: Vec<Job>,
    next_id: u64,
    settings: SchedulerSettings,
    engine: Arc<dyn CompressionEngine>,
    outcome_tx: Sender<JobOutcome>,
    outcome_rx: Receiver<JobOutcome>,
}

impl JobScheduler {
    pub fn new(settings: SchedulerSettings, engine: Arc<dyn CompressionEngine>) -> Self {
        let (outcome_tx, outcome_rx) = flume::unbounded();
        Self {
            jobs: Vec::new(),
            next_id: 1,
            settings,
            engine,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Add a batch of files. Non-PDF entries are silently dropped; accepted
    /// ones become queued jobs in input order and dispatch starts
    /// immediately where slots are free. Returns the ids of accepted jobs.
    pub fn enqueue(&mut self, files: Vec<FileInput>) -> Vec<JobId> {
        let mut accepted = Vec::new();

        for file in files {
            if file.media_type != PDF_MEDIA_TYPE {
                log::debug!(
                    "Dropping {}: media type {:?} is not {:?}",
                    file.name,
                    file.media_type,
                    PDF_MEDIA_TYPE
                );
                continue;
            }

            let id = JobId(self.next_id);
            self.next_id += 1;
            log::info!("Queued job {} ({}, {} bytes)", id, file.name, file.bytes.len());
            self.jobs.push(Job::new(id, file.name, file.bytes));
            accepted.push(id);
        }

        self.tick();
        accepted
    }

    /// Advance the scheduler: refresh progress estimates, apply any worker
    /// outcomes that have arrived, and fill freed slots. Returns the ids of
    /// jobs that reached a terminal state during this call.
    pub fn poll(&mut self) -> Vec<JobId> {
        self.refresh_progress();

        let mut finished = Vec::new();
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            if let Some(id) = self.apply_outcome(outcome) {
                finished.push(id);
            }
        }

        self.tick();
        finished
    }

    /// Remove a job regardless of state. An in-flight engine is abandoned:
    /// its cancel flag is raised (best-effort) and any late outcome will be
    /// discarded as orphaned.
    pub fn remove(&mut self, id: JobId) -> bool {
        let Some(index) = self.jobs.iter().position(|job| job.id == id) else {
            return false;
        };

        let job = self.jobs.remove(index);
        if job.status == JobStatus::Processing {
            job.cancel.store(true, Ordering::Relaxed);
            log::debug!("Abandoning in-flight job {}", job.id);
        }

        self.tick();
        true
    }

    /// Remove all jobs, abandoning any in-flight work
    pub fn clear(&mut self) {
        for job in &self.jobs {
            if job.status == JobStatus::Processing {
                job.cancel.store(true, Ordering::Relaxed);
            }
        }
        self.jobs.clear();
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == id)
    }

    pub fn processing_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| job.status == JobStatus::Processing)
            .count()
    }

    /// True when no job is queued or processing
    pub fn is_idle(&self) -> bool {
        self.jobs.iter().all(Job::is_terminal)
    }

    /// Dispatch queued jobs in FIFO order while slots are free
    fn tick(&mut self) {
        while self.processing_count() < self.settings.max_concurrent {
            let Some(index) = self
                .jobs
                .iter()
                .position(|job| job.status == JobStatus::Queued)
            else {
                break;
            };
            self.dispatch(index);
        }
    }

    fn dispatch(&mut self, index: usize) {
        let job = &mut self.jobs[index];
        job.status = JobStatus::Processing;
        job.progress = self.settings.progress_step;
        job.started_at = Some(Instant::now());
        log::info!("Dispatching job {} ({})", job.id, job.name);

        let job_id = job.id;
        let engine = Arc::clone(&self.engine);
        let source = Arc::clone(&job.source);
        let cancel = Arc::clone(&job.cancel);
        let tx = self.outcome_tx.clone();

        thread::spawn(move || {
            // A panic inside the engine must not cross the channel boundary;
            // it becomes a worker-failure outcome distinct from document
            // errors.
            let result = panic::catch_unwind(AssertUnwindSafe(|| engine.run(&source, &cancel)))
                .unwrap_or(Err(EngineError::Worker));
            // A closed channel means the scheduler itself is gone
            let _ = tx.send(JobOutcome { job_id, result });
        });
    }

    /// Apply one worker outcome. Outcomes for removed jobs are orphaned and
    /// dropped. Returns the job id when a job reached a terminal state.
    fn apply_outcome(&mut self, outcome: JobOutcome) -> Option<JobId> {
        let JobOutcome { job_id, result } = outcome;

        let Some(job) = self.jobs.iter_mut().find(|job| job.id == job_id) else {
            log::debug!("Ignoring orphaned outcome for removed job {}", job_id);
            return None;
        };
        if job.status != JobStatus::Processing {
            return None;
        }

        match result {
            Ok(outcome) => {
                log::info!(
                    "Job {} finished: {} -> {} bytes ({} images optimized, {} skipped)",
                    job.id,
                    job.original_size(),
                    outcome.output.len(),
                    outcome.optimized_images,
                    outcome.skipped_images
                );
                job.progress = 100;
                job.status = JobStatus::Success {
                    output: outcome.output,
                };
            }
            Err(err) => {
                log::warn!("Job {} failed: {}", job.id, err);
                job.status = JobStatus::Error {
                    message: err.to_string(),
                };
            }
        }

        Some(job_id)
    }

    /// Fixed-cadence progress estimate: starts at one step on dispatch,
    /// climbs one step per interval, capped below 100 until the real
    /// outcome arrives. Monotonic by construction.
    fn refresh_progress(&mut self) {
        let interval_ms = self.settings.progress_interval.as_millis().max(1);
        for job in &mut self.jobs {
            if job.status != JobStatus::Processing {
                continue;
            }
            let Some(started_at) = job.started_at else {
                continue;
            };

            let ticks = (started_at.elapsed().as_millis() / interval_ms) as u64;
            let estimate = (self.settings.progress_step as u64)
                .saturating_mul(ticks + 1)
                .min(self.settings.progress_ceiling as u64) as u8;
            if estimate > job.progress {
                job.progress = estimate;
            }
        }
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        // Let in-flight workers wind down early instead of compressing into
        // a closed channel.
        self.clear();
    }
}
