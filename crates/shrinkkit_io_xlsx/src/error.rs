//! Fatal error types. Non-fatal anomalies live in [`crate::report`].

use std::path::PathBuf;

use thiserror::Error;

use crate::report::SpecSheetFailure;

/// Document construction failures.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("duplicate sheet name: {0:?}")]
    DuplicateSheetName(String),
}

/// Capture failures. Any of these aborts the whole capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("source unreadable ({source_identifier}): {message}")]
    SourceUnreadable {
        source_identifier: String,
        message: String,
    },
    #[error("source {source_identifier} produced an invalid document: {source}")]
    InvalidDocument {
        source_identifier: String,
        #[source]
        source: ModelError,
    },
}

/// Wire decoding failures. No partial document is produced.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("wire document has no \"sheets\" collection")]
    MissingSheets,
    #[error("malformed wire document: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("wire document is not a valid document: {0}")]
    InvalidDocument(#[from] ModelError),
}

/// Reconstruction failures.
#[derive(Debug, Error)]
pub enum ReconstructError {
    #[error("value pass produced no usable sheet ({} failed)", .failures.len())]
    NoUsableSheets { failures: Vec<SpecSheetFailure> },
    #[error("failed to save output workbook: {message}")]
    Save { message: String },
}

/// Façade failures, tagged by stage.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("capture stage failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("decode stage failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("reconstruct stage failed: {0}")]
    Reconstruct(#[from] ReconstructError),
    #[error("encode stage failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("I/O failed at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Batch setup failures. Per-file failures go into the batch report.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid file pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),
    #[error("failed to initialize destination {}: {message}", .path.display())]
    DestinationInitFailed { path: PathBuf, message: String },
}
