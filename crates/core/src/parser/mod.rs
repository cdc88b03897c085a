//! PDF object syntax.
//!
//! - `lexer`: tokenizer over raw bytes
//! - `pdf_parser`: object parser built on the lexer

pub mod lexer;
pub mod pdf_parser;

pub use lexer::{PSBaseParser, PSToken};
pub use pdf_parser::PDFParser;
