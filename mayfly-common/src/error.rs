//! Error types for the mayfly-asm toolkit
//!
//! One crate-level enum covers the recoverable failures of the I/O layer and
//! the alignment core. Search-level failures (budget exhausted, no path within
//! the edit-distance bound) are *values*, not errors: they surface as an empty
//! path with a negative score and are contained at the gap level.

use thiserror::Error;

/// Errors produced by the mayfly-asm crates.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying I/O failure while reading a sequence file.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A FASTA/FASTQ record that cannot be parsed.
    #[error("malformed {format} record near '{name}': {reason}")]
    MalformedRecord {
        format: &'static str,
        name: String,
        reason: String,
    },

    /// Two paired streams ran out of sync (different lengths, mismatched ids).
    #[error("paired streams out of sync: {0}")]
    PairedDesync(String),

    /// A configuration value that cannot be honoured.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;
