//! Builder pattern for compaction.
//!
//! Provides a fluent API over [`CompressOptions`] and the compaction
//! functions.
//!
//! # Example
//! ```ignore
//! use pdfpack_core::api::CompressorBuilder;
//!
//! let report = CompressorBuilder::new("input.pdf")
//!     .password("secret")
//!     .linearize(false)
//!     .max_objects_per_stream(50)
//!     .compress_to("output.pdf")?;
//! ```

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::normalize::StreamPolicy;
use crate::writer::xref::XrefMode;

use super::high_level::{CompressOptions, CompressOutcome, CompressReport, compress_file, compress_with_report};

/// A builder for configuring compaction of one file.
#[derive(Debug, Clone)]
pub struct CompressorBuilder {
    source: PathBuf,
    options: CompressOptions,
}

impl CompressorBuilder {
    /// Creates a new builder for the PDF at `source` with default options.
    pub fn new(source: impl AsRef<Path>) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            options: CompressOptions::default(),
        }
    }

    /// Starts from existing options, e.g. ones loaded from a config file.
    pub fn with_options(mut self, options: CompressOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the password for encrypted input.
    pub fn password(mut self, pwd: &str) -> Self {
        self.options.password = Some(pwd.to_string());
        self
    }

    /// Enables or disables linearization (default: enabled).
    pub fn linearize(mut self, enabled: bool) -> Self {
        self.options.linearize = enabled;
        self
    }

    /// Enables or disables object streams (default: enabled).
    pub fn object_streams(mut self, enabled: bool) -> Self {
        self.options.use_object_streams = enabled;
        self
    }

    /// Chooses the cross-reference format.
    ///
    /// `XrefMode::Table` also turns object streams off when the options are
    /// applied.
    pub fn xref_mode(mut self, mode: XrefMode) -> Self {
        self.options.xref_mode = mode;
        self
    }

    /// Uncompressed byte cap per object stream.
    pub fn max_objstm_bytes(mut self, bytes: usize) -> Self {
        self.options.max_objstm_bytes = bytes;
        self
    }

    /// Member cap per object stream.
    pub fn max_objects_per_stream(mut self, count: usize) -> Self {
        self.options.max_objects_per_stream = count;
        self
    }

    /// Flate level, clamped to 0-9.
    pub fn compression_level(mut self, level: u32) -> Self {
        self.options.compression_level = level.min(9);
        self
    }

    /// Replaces the stream policy.
    pub fn stream_policy(mut self, policy: StreamPolicy) -> Self {
        self.options.stream_policy = policy;
        self
    }

    /// Leaves streams of this `/Type` or `/Subtype` untouched.
    pub fn skip_type(mut self, name: &str) -> Self {
        self.options.stream_policy.skip_types.push(name.to_string());
        self
    }

    /// The options this builder would use.
    pub fn options(&self) -> &CompressOptions {
        &self.options
    }

    /// Compresses the source into memory.
    pub fn compress(self) -> Result<CompressOutcome> {
        let data = std::fs::read(&self.source)?;
        compress_with_report(&data, &self.options)
    }

    /// Compresses the source into `output`, replacing it atomically.
    pub fn compress_to(self, output: impl AsRef<Path>) -> Result<CompressReport> {
        compress_file(&self.source, output, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_options() {
        let builder = CompressorBuilder::new("a.pdf")
            .password("pw")
            .linearize(false)
            .object_streams(false)
            .xref_mode(XrefMode::Table)
            .max_objstm_bytes(4096)
            .max_objects_per_stream(10)
            .compression_level(42)
            .skip_type("Form");
        let opts = builder.options();
        assert_eq!(opts.password.as_deref(), Some("pw"));
        assert!(!opts.linearize);
        assert!(!opts.use_object_streams);
        assert_eq!(opts.xref_mode, XrefMode::Table);
        assert_eq!(opts.max_objstm_bytes, 4096);
        assert_eq!(opts.max_objects_per_stream, 10);
        assert_eq!(opts.compression_level, 9);
        assert_eq!(opts.stream_policy.skip_types, vec!["Form".to_string()]);
    }

    #[test]
    fn default_builder_matches_default_options() {
        let builder = CompressorBuilder::new("a.pdf");
        assert_eq!(builder.options(), &CompressOptions::default());
    }
}
