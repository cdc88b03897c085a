//! Object model: PDF values, the document arena and cross-reference entries.

pub mod document;
pub mod objects;
pub mod xref;

pub use document::Document;
pub use objects::{Dict, ObjectId, PDFObject, PDFStream};
pub use xref::XrefEntry;
