//! Reading documents.
//!
//! This module contains:
//! - `reader` - header, cross-reference and object loading (with scan fallback)
//! - `security` - standard security handler decryption
//! - `saslprep` - RFC 4013 SASLprep for password normalization

pub mod reader;
pub mod saslprep;
pub mod security;

pub use reader::{DecodeInfo, decode, parse_header};
pub use saslprep::saslprep;
pub use security::{Authenticated, CryptHandler, PASSWORD_PADDING, StandardSecurityHandler};
