//! # Centralized Error Handling
//!
//! Unified error types for the entire crate using `thiserror`.
//!
//! Contract violations inside the solver core (a rank array that is not a
//! permutation, a record addressing a haplotype outside the panel) are
//! programming errors in the loading layer and are signalled with asserts,
//! not with these recoverable variants.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for shrike operations
#[derive(Error, Debug)]
pub enum ShrikeError {
    /// I/O errors (file missing, permission denied, read/write failures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// VCF errors (malformed header, unexpected record shape)
    #[error("VCF error: {message}")]
    Vcf { message: String },

    /// Invalid data errors (position order, ploidy, chromosome mixing)
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Configuration errors (invalid CLI arguments)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File not found errors
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Parse errors with line context
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Type alias for Results using ShrikeError
pub type Result<T> = std::result::Result<T, ShrikeError>;

impl ShrikeError {
    /// Create a VCF error with a message
    pub fn vcf(message: impl Into<String>) -> Self {
        Self::Vcf {
            message: message.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

// Convert noodles VCF errors to ShrikeError
impl From<noodles::vcf::header::ParseError> for ShrikeError {
    fn from(err: noodles::vcf::header::ParseError) -> Self {
        Self::Vcf {
            message: err.to_string(),
        }
    }
}
