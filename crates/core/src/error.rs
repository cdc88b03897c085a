//! Error types for the pdfpack engine.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for decoding, rewriting and writing PDF documents.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("malformed header: no %PDF-M.m marker in the first 1024 bytes")]
    MalformedHeader,

    #[error("malformed cross-reference data at offset {offset}: {reason}")]
    MalformedXRef { offset: usize, reason: String },

    #[error("stream of object {objid} at offset {offset} runs past end of file")]
    TruncatedStream { objid: u32, offset: usize },

    #[error("unsupported encryption: {0}")]
    UnsupportedEncryption(String),

    #[error("incorrect password")]
    WrongPassword,

    #[error("offset computation did not converge after {passes} passes")]
    SizeEstimationDivergence { passes: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not replace {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid token at position {pos}: {msg}")]
    TokenError { pos: usize, msg: String },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("PDF syntax error: {0}")]
    SyntaxError(String),

    #[error("PDF object not found: {0}")]
    ObjectNotFound(u32),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("SASLprep error: {0}")]
    SaslPrepError(String),
}

impl PdfError {
    /// Shorthand for an xref error at a byte offset.
    pub fn xref(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedXRef {
            offset,
            reason: reason.into(),
        }
    }
}

/// The error surfaced by [`crate::api::compress`].
pub type CompressionError = PdfError;

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
