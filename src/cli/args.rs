use clap::Parser;
use std::path::{Path, PathBuf};

use crate::config::defaults;

#[derive(Parser, Debug)]
#[command(name = "pdfshrink")]
#[command(
    author,
    version,
    about = "Shrink PDFs by recompressing embedded JPEG images and scrubbing metadata"
)]
pub struct Args {
    /// Input PDF files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory (defaults to each input's directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Also bundle all results into a single zip archive
    #[arg(long)]
    pub zip: bool,

    /// Maximum number of files compressed concurrently
    #[arg(short = 'j', long, default_value_t = defaults::MAX_CONCURRENT_JOBS)]
    pub jobs: usize,

    /// JPEG re-encode quality (1-100)
    #[arg(short, long, default_value_t = defaults::JPEG_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Where one input's compressed result should be written
    pub fn output_path(&self, input: &Path, download_name: &str) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.join(download_name),
            None => input
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(download_name),
        }
    }

    /// Where the batch archive should be written
    pub fn archive_path(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(defaults::ARCHIVE_NAME)
    }
}
