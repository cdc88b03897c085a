//! pdfpack - PDF structural compaction and linearization.
//!
//! Decodes a PDF into an in-memory object graph, drops unreachable objects,
//! recompresses streams, packs small objects into object streams and writes
//! a new file with a rebuilt cross-reference section, optionally in
//! first-page-first (linearized) order.

pub mod api;
pub mod codec;
pub mod document;
pub mod error;
pub mod filters;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod writer;

pub use api::{
    CompressOptions, CompressOutcome, CompressReport, CompressorBuilder, compress, compress_file,
    compress_with_report, unlock, unlock_file,
};
pub use error::{CompressionError, PdfError, Result};
pub use model::{Document, ObjectId, PDFObject, PDFStream};
pub use normalize::StreamPolicy;
pub use writer::LinearizationStatus;
pub use writer::xref::XrefMode;
