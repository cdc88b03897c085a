//! High-level API module for PDF compaction.
//!
//! # Example
//!
//! ```ignore
//! use pdfpack_core::api::{compress, CompressOptions};
//!
//! let pdf_bytes = std::fs::read("document.pdf")?;
//! let smaller = compress(&pdf_bytes, &CompressOptions::default())?;
//! ```

pub mod builder;
pub mod high_level;

// Re-export for convenience
pub use builder::CompressorBuilder;
pub use high_level::{
    CompressOptions, CompressOutcome, CompressReport, compress, compress_file,
    compress_with_report, unlock, unlock_file, write_atomic,
};
