use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Failed to save PDF: {0}")]
    Save(String),

    #[error("Compression cancelled")]
    Cancelled,

    #[error("Worker terminated unexpectedly")]
    Worker,
}

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to decode JPEG image: {0}")]
    Decode(String),

    #[error("Failed to encode JPEG image: {0}")]
    Encode(String),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("An archive build is already in flight")]
    Busy,

    #[error("Failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
