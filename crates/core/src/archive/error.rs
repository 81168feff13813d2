//! Error types for archive validation and extraction.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while validating or extracting an uploaded
/// bundle.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The file is smaller than a zip magic header.
    #[error("Archive is too small to be a valid zip ({size} bytes)")]
    TooSmall { size: u64 },

    /// The file does not start with a recognized zip magic sequence.
    #[error("Archive is not a valid zip (magic bytes {magic})")]
    InvalidFormat { magic: String },

    /// The archive file could not be read from disk.
    #[error("Failed to read archive at {path:?}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The zip central directory or an entry header could not be parsed.
    #[error("Failed to parse archive at {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    /// Writing an extracted entry to the destination failed. The partial
    /// extraction is left in place for the caller to discard.
    #[error("Failed to extract entry {entry:?}: {source}")]
    ExtractionFailed {
        entry: String,
        source: std::io::Error,
    },
}

/// Type alias for Result with ArchiveError.
pub type ArchiveResult<T> = Result<T, ArchiveError>;
