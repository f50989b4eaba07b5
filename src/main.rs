use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pdfshrink::cli::Args;
use pdfshrink::config::defaults::PDF_MEDIA_TYPE;
use pdfshrink::config::{CompressionSettings, SchedulerSettings};
use pdfshrink::scheduler::{FileInput, JobId, JobScheduler};
use pdfshrink::{build_archive, PdfEngine};

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    if let Some(ref dir) = args.output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }

    // Read inputs; anything that isn't a .pdf is skipped up front with a
    // warning, mirroring the silent media-type filter of the batch add.
    let mut files = Vec::new();
    let mut sources: Vec<PathBuf> = Vec::new();
    for path in &args.inputs {
        let is_pdf = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !is_pdf {
            log::warn!("Skipping {}: not a PDF", path.display());
            continue;
        }

        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input.pdf".to_string());

        files.push(FileInput::new(name, PDF_MEDIA_TYPE, bytes));
        sources.push(path.clone());
    }

    if files.is_empty() {
        anyhow::bail!("No PDF files to process");
    }

    log::info!("Processing {} files", files.len());

    let engine = Arc::new(PdfEngine::new(CompressionSettings::from_args(&args)));
    let mut scheduler = JobScheduler::new(SchedulerSettings::from_args(&args), engine);

    let ids: Vec<JobId> = scheduler.enqueue(files);

    while !scheduler.is_idle() {
        scheduler.poll();
        thread::sleep(Duration::from_millis(50));
    }

    let mut failures = 0;
    for (id, source) in ids.iter().zip(&sources) {
        let job = scheduler
            .job(*id)
            .ok_or_else(|| anyhow::anyhow!("Job {} disappeared from the scheduler", id))?;

        if let Some(output) = job.result_bytes() {
            let output_path = args.output_path(source, &job.download_name());
            fs::write(&output_path, output).with_context(|| {
                format!("Failed to write output file: {}", output_path.display())
            })?;
            println!(
                "{}: {} -> {} ({})",
                job.name,
                format_bytes(job.original_size() as u64),
                format_bytes(output.len() as u64),
                savings(job.original_size(), output.len())
            );
        } else {
            failures += 1;
            eprintln!(
                "{}: {}",
                job.name,
                job.error_message().unwrap_or("Compression failed")
            );
        }
    }

    if args.zip {
        let archive = build_archive(scheduler.jobs())
            .with_context(|| "Failed to build the batch archive")?;
        let archive_path = args.archive_path();
        fs::write(&archive_path, archive)
            .with_context(|| format!("Failed to write archive: {}", archive_path.display()))?;
        println!("Wrote archive to {}", archive_path.display());
    }

    if failures > 0 {
        anyhow::bail!("{} of {} files failed", failures, ids.len());
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn savings(original: usize, compressed: usize) -> String {
    if compressed <= original && original > 0 {
        format!("-{:.0}%", (1.0 - compressed as f64 / original as f64) * 100.0)
    } else {
        "no savings".to_string()
    }
}
