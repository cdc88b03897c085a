//! High-level compaction API.
//!
//! Pipeline: decode, drop unreachable objects and renumber, normalize
//! streams, then write (packing, cross-reference, optional linearization).

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::document::reader::{DecodeInfo, decode, parse_header};
use crate::error::{PdfError, Result};
use crate::model::Document;
use crate::normalize::{NormalizeStats, StreamPolicy, normalize_document};
use crate::writer::objstm::PackLimits;
use crate::writer::xref::XrefMode;
use crate::writer::{LinearizationStatus, WriteOptions, write_document};

/// Options for [`compress`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressOptions {
    /// Password for encrypted input. `None` tries the empty password.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Write first-page-first output.
    pub linearize: bool,

    /// Pack non-stream objects into object streams.
    pub use_object_streams: bool,

    /// Cross-reference format. `Table` turns object streams off.
    pub xref_mode: XrefMode,

    /// Uncompressed byte cap per object stream.
    pub max_objstm_bytes: usize,

    /// Member cap per object stream.
    pub max_objects_per_stream: usize,

    /// Flate level (0-9) for streams written by the engine.
    pub compression_level: u32,

    /// Which streams are re-encoded.
    pub stream_policy: StreamPolicy,
}

impl Default for CompressOptions {
    fn default() -> Self {
        let limits = PackLimits::default();
        Self {
            password: None,
            linearize: true,
            use_object_streams: true,
            xref_mode: XrefMode::Stream,
            max_objstm_bytes: limits.max_bytes,
            max_objects_per_stream: limits.max_objects,
            compression_level: 9,
            stream_policy: StreamPolicy::default(),
        }
    }
}

impl CompressOptions {
    fn write_options(&self, warnings: &mut Vec<String>) -> WriteOptions {
        let mut use_object_streams = self.use_object_streams;
        if use_object_streams && self.xref_mode == XrefMode::Table {
            warnings.push("object streams disabled: classic xref tables cannot reference them".into());
            use_object_streams = false;
        }
        WriteOptions {
            use_object_streams,
            xref_mode: self.xref_mode,
            limits: PackLimits {
                max_bytes: self.max_objstm_bytes,
                max_objects: self.max_objects_per_stream,
            },
            level: self.compression_level.min(9),
            linearize: self.linearize,
        }
    }
}

/// What [`compress_with_report`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressReport {
    pub input_bytes: usize,
    pub output_bytes: usize,
    /// Header version of the output, e.g. `"1.5"`.
    pub version: String,
    pub encrypted: bool,
    /// The cross-reference data was unusable and the file was scanned.
    pub used_fallback: bool,
    pub objects_kept: usize,
    pub objects_dropped: usize,
    pub packed_objects: usize,
    pub object_streams: usize,
    pub streams: NormalizeStats,
    pub xref_mode: XrefMode,
    pub linearization: LinearizationStatus,
    pub layout_passes: usize,
    pub warnings: Vec<String>,
}

/// Output bytes plus the report.
#[derive(Debug, Clone)]
pub struct CompressOutcome {
    pub bytes: Vec<u8>,
    pub report: CompressReport,
}

/// Decode `input` and drop everything unreachable from the trailer.
fn load(input: &[u8], password: Option<&str>) -> Result<(Document, DecodeInfo, usize)> {
    let (mut doc, info) = decode(input, password)?;
    let dropped = doc.compact();
    Ok((doc, info, dropped))
}

/// Rewrite a PDF into a smaller, structurally optimized file.
///
/// # Example
/// ```ignore
/// use pdfpack_core::api::{CompressOptions, compress};
///
/// let pdf = std::fs::read("report.pdf")?;
/// let smaller = compress(&pdf, &CompressOptions::default())?;
/// ```
pub fn compress(input: &[u8], opts: &CompressOptions) -> Result<Vec<u8>> {
    compress_with_report(input, opts).map(|outcome| outcome.bytes)
}

/// [`compress`], also returning what was done.
pub fn compress_with_report(input: &[u8], opts: &CompressOptions) -> Result<CompressOutcome> {
    let (mut doc, info, dropped) = load(input, opts.password.as_deref())?;
    let mut warnings = Vec::new();
    if info.used_fallback {
        warnings.push("cross-reference data was unusable; objects were recovered by scanning".into());
    }

    let streams = normalize_document(&mut doc, &opts.stream_policy, opts.compression_level.min(9));
    let write_opts = opts.write_options(&mut warnings);
    let written = write_document(&doc, &write_opts)?;
    if let LinearizationStatus::FellBack(reason) = &written.linearization {
        warnings.push(format!("linearization fell back to plain output: {}", reason));
    }

    let version = parse_header(&written.bytes)
        .map(|(major, minor)| format!("{}.{}", major, minor))
        .unwrap_or_default();
    let report = CompressReport {
        input_bytes: input.len(),
        output_bytes: written.bytes.len(),
        version,
        encrypted: info.encrypted,
        used_fallback: info.used_fallback,
        objects_kept: doc.objects.len(),
        objects_dropped: dropped,
        packed_objects: written.stats.packed_objects,
        object_streams: written.stats.object_streams,
        streams,
        xref_mode: write_opts.xref_mode,
        linearization: written.linearization,
        layout_passes: written.stats.passes,
        warnings,
    };
    info!(
        input = report.input_bytes,
        output = report.output_bytes,
        kept = report.objects_kept,
        dropped = report.objects_dropped,
        object_streams = report.object_streams,
        "compressed document"
    );
    Ok(CompressOutcome {
        bytes: written.bytes,
        report,
    })
}

/// Rewrite an encrypted document without encryption. Streams, object
/// placement and the xref format are left as plain as possible.
pub fn unlock(input: &[u8], password: Option<&str>) -> Result<Vec<u8>> {
    let (doc, info, _) = load(input, password)?;
    if !info.encrypted {
        warn!("document is not encrypted; rewriting as is");
    }
    let opts = WriteOptions {
        use_object_streams: false,
        xref_mode: XrefMode::Table,
        linearize: false,
        ..WriteOptions::default()
    };
    Ok(write_document(&doc, &opts)?.bytes)
}

/// Map a file read-only.
fn map_input(path: &Path) -> Result<Mmap> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file) }?;
    Ok(mmap)
}

/// Write `bytes` to a temporary file next to `path` and rename it into
/// place once it is fully flushed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| PdfError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Compress the file at `input` into `output`.
///
/// The destination is replaced atomically: on any error it is left as it
/// was. `input` and `output` may be the same path.
pub fn compress_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    opts: &CompressOptions,
) -> Result<CompressReport> {
    let outcome = {
        let mmap = map_input(input.as_ref())?;
        compress_with_report(&mmap, opts)?
    };
    write_atomic(output.as_ref(), &outcome.bytes)?;
    Ok(outcome.report)
}

/// Decrypt the file at `input` into `output`.
pub fn unlock_file(input: impl AsRef<Path>, output: impl AsRef<Path>, password: Option<&str>) -> Result<()> {
    let bytes = {
        let mmap = map_input(input.as_ref())?;
        unlock(&mmap, password)?
    };
    write_atomic(output.as_ref(), &bytes)
}
