use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ZooError {
    #[error("target directory is not empty: {0}")]
    #[diagnostic(help("remove the directory or choose another output path"))]
    DirectoryNotEmpty(PathBuf),

    #[error("unknown dataset: {0}")]
    #[diagnostic(help("run `dzoo zoo available` to see the built-in datasets"))]
    UnknownDataset(String),

    #[error("dataset already registered: {0}")]
    DuplicateDataset(String),

    #[error("dataset not downloaded: {0}")]
    NotDownloaded(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("download returned status {status}: {message}")]
    DownloadStatus { status: u16, message: String },

    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("archive extraction failed: {0}")]
    Extraction(String),

    #[error("failed to parse dataset metadata: {0}")]
    MetadataParse(String),

    #[error("sample index {index} out of range for {len} samples")]
    SampleIndexOutOfRange { index: usize, len: usize },

    #[error("unknown fine label index: {0}")]
    UnknownLabel(u8),

    #[error("invalid dataset file: {0}")]
    DatasetFormat(String),

    #[error("image encoding failed: {0}")]
    ImageEncode(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
