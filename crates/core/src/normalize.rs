//! Stream normalizer.
//!
//! Every stream whose filter chain can be undone exactly is decoded and
//! re-encoded with a single `/FlateDecode`. Image codecs, crypt filters and
//! unknown filters leave the stream as it was, as does any decode failure.

use crate::codec::deflate;
use crate::filters::{ChainKind, Filter, classify, decode_chain};
use crate::model::objects::name;
use crate::model::{Document, PDFObject, PDFStream};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which streams the normalizer may touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamPolicy {
    /// Re-encode streams at all.
    pub normalize_streams: bool,
    /// Leave `/Type /Metadata` (XMP) streams byte-identical.
    pub skip_metadata: bool,
    /// `/Type` or `/Subtype` names that are never touched.
    pub skip_types: Vec<String>,
}

impl Default for StreamPolicy {
    fn default() -> Self {
        Self {
            normalize_streams: true,
            skip_metadata: true,
            skip_types: Vec::new(),
        }
    }
}

impl StreamPolicy {
    /// Reason to leave `stream` alone, if the policy excludes it.
    fn excludes(&self, stream: &PDFStream) -> Option<String> {
        if !self.normalize_streams {
            return Some("normalization disabled".into());
        }
        let type_name = stream.get("Type").and_then(|t| t.as_name().ok());
        let subtype = stream.get("Subtype").and_then(|t| t.as_name().ok());
        if self.skip_metadata && type_name == Some("Metadata") {
            return Some("metadata stream".into());
        }
        // Image payloads keep their own encoding
        if subtype == Some("Image") {
            return Some("image XObject".into());
        }
        [type_name, subtype]
            .into_iter()
            .flatten()
            .find(|t| self.skip_types.iter().any(|s| s == t))
            .map(|t| format!("/{} is in the deny list", t))
    }
}

/// What happened to one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Payload now carries exactly `/Filter /FlateDecode`.
    Normalized,
    /// Already canonical (or re-encoding would not shrink it).
    Unchanged,
    /// Left untouched.
    Skipped(String),
}

/// Per-document counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeStats {
    pub normalized: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

/// Normalize every stream in `doc`.
pub fn normalize_document(doc: &mut Document, policy: &StreamPolicy, level: u32) -> NormalizeStats {
    let mut stats = NormalizeStats::default();
    for (id, obj) in doc.objects.iter_mut() {
        let PDFObject::Stream(stream) = obj else {
            continue;
        };
        let outcome = match policy.excludes(stream) {
            Some(reason) => StreamOutcome::Skipped(reason),
            None => normalize_stream(stream, level),
        };
        match outcome {
            StreamOutcome::Normalized => stats.normalized += 1,
            StreamOutcome::Unchanged => stats.unchanged += 1,
            StreamOutcome::Skipped(reason) => {
                debug!(object = %id, %reason, "stream left unnormalized");
                stats.skipped += 1;
            }
        }
    }
    stats
}

/// Whether the payload is raw or plain Flate with no parameters. Such
/// streams keep their current bytes when re-encoding would not shrink them.
fn is_plain(kind: &ChainKind<'_>) -> bool {
    match kind {
        ChainKind::Unfiltered => true,
        ChainKind::Reversible(chain) => matches!(chain.as_slice(), [(Filter::Flate, None)]),
        _ => false,
    }
}

/// Re-encode one stream with Flate.
pub fn normalize_stream(stream: &mut PDFStream, level: u32) -> StreamOutcome {
    let kind = classify(stream);
    let plain = is_plain(&kind);
    let decoded = match &kind {
        ChainKind::Unfiltered => stream.data().to_vec(),
        ChainKind::Reversible(chain) => match decode_chain(stream.data(), chain, true) {
            Ok(decoded) => decoded,
            Err(e) => return StreamOutcome::Skipped(format!("decode failed: {}", e)),
        },
        ChainKind::Opaque(filter) => return StreamOutcome::Skipped(format!("{:?} filter", filter)),
        ChainKind::Unknown(filter) => return StreamOutcome::Skipped(format!("unknown filter /{}", filter)),
        ChainKind::Malformed => return StreamOutcome::Skipped("malformed /Filter".into()),
    };
    drop(kind);

    let encoded = match deflate(&decoded, level) {
        Ok(encoded) => encoded,
        Err(e) => return StreamOutcome::Skipped(format!("deflate failed: {}", e)),
    };
    if plain && encoded.len() >= stream.data().len() {
        return StreamOutcome::Unchanged;
    }

    for key in ["Filter", "DecodeParms", "DL"] {
        stream.attrs.shift_remove(key);
    }
    stream.attrs.insert("Filter".into(), name("FlateDecode"));
    stream.set_data(encoded);
    StreamOutcome::Normalized
}
