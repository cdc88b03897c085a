//! Output writer.
//!
//! - `serialize` - object syntax
//! - `objstm` - object stream packing
//! - `xref` - cross-reference streams and tables
//! - `linearize` - first-page-first layout
//!
//! The writer takes a compacted [`Document`] (objects numbered `1..=N`) and
//! lays out blocks of serialized objects. Object streams and structural
//! objects are numbered after `N`.

pub mod linearize;
pub mod objstm;
pub mod serialize;
pub mod xref;

use crate::error::{PdfError, Result};
use crate::model::{Dict, Document, ObjectId, PDFObject, XrefEntry};
use objstm::PackLimits;
use serde::{Deserialize, Serialize};
use serialize::{header_bytes, indirect_bytes};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};
use xref::XrefMode;

/// Bound on layout passes before giving up.
pub const MAX_LAYOUT_PASSES: usize = 5;

/// Trailer keys owned by the writer; anything else in the document trailer
/// is carried over.
const WRITER_KEYS: &[&str] = &["Size", "Prev", "XRefStm", "Encrypt"];

/// Layout settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub use_object_streams: bool,
    pub xref_mode: XrefMode,
    pub limits: PackLimits,
    /// Flate level for object and xref streams.
    pub level: u32,
    pub linearize: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            use_object_streams: true,
            xref_mode: XrefMode::Stream,
            limits: PackLimits::default(),
            level: 9,
            linearize: false,
        }
    }
}

impl WriteOptions {
    /// Packing needs compressed xref entries.
    fn packs(&self) -> bool {
        self.use_object_streams && self.xref_mode == XrefMode::Stream
    }
}

/// Whether the output is linearized, and why not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum LinearizationStatus {
    Applied,
    Skipped(String),
    FellBack(String),
}

/// Counters from one write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteStats {
    pub packed_objects: usize,
    pub object_streams: usize,
    /// Layout passes until offsets were stable.
    pub passes: usize,
}

/// Serialized file plus what the writer did.
#[derive(Debug, Clone)]
pub struct Written {
    pub bytes: Vec<u8>,
    pub stats: WriteStats,
    pub linearization: LinearizationStatus,
}

/// A serialized indirect object. For object streams `members` lists the
/// packed objects in directory order.
#[derive(Debug, Clone)]
pub(crate) struct Block {
    pub id: ObjectId,
    pub bytes: Vec<u8>,
    pub members: Vec<ObjectId>,
}

/// Hands out object numbers above the document's own.
#[derive(Debug)]
pub(crate) struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn after(doc: &Document) -> Self {
        Self {
            next: doc.max_objid() + 1,
        }
    }

    pub fn next(&mut self) -> ObjectId {
        let id = ObjectId::new(self.next, 0);
        self.next += 1;
        id
    }

    /// `/Size` for a trailer covering every number handed out so far.
    pub fn size(&self) -> i64 {
        i64::from(self.next)
    }
}

/// Serialize the objects `ids` as blocks: object streams for the packable
/// ones (ascending id), then the rest in the given order.
pub(crate) fn build_blocks(
    doc: &Document,
    ids: &[ObjectId],
    opts: &WriteOptions,
    excluded: &HashSet<ObjectId>,
    alloc: &mut IdAllocator,
    stats: &mut WriteStats,
) -> Result<Vec<Block>> {
    let mut packable = Vec::new();
    let mut loose = Vec::new();
    for &id in ids {
        let Some(obj) = doc.get(id) else { continue };
        if opts.packs() && objstm::is_packable(id, obj, excluded) {
            packable.push(id);
        } else {
            loose.push(id);
        }
    }
    packable.sort_unstable();

    let mut blocks = Vec::new();
    for members in objstm::group(doc, &packable, opts.limits) {
        let id = alloc.next();
        let stream = objstm::build(doc, &members, opts.level)?;
        stats.packed_objects += members.len();
        stats.object_streams += 1;
        blocks.push(Block {
            id,
            bytes: indirect_bytes(id, &stream.into()),
            members,
        });
    }
    for id in loose {
        if let Some(obj) = doc.get(id) {
            blocks.push(Block {
                id,
                bytes: indirect_bytes(id, obj),
                members: Vec::new(),
            });
        }
    }
    Ok(blocks)
}

/// Append `blocks` to `out`, recording where each object ended up.
pub(crate) fn place(out: &mut Vec<u8>, blocks: &[Block], entries: &mut BTreeMap<u32, XrefEntry>) {
    for block in blocks {
        entries.insert(
            block.id.objid,
            XrefEntry::InUse {
                offset: out.len(),
                genno: block.id.genno,
            },
        );
        for (index, member) in block.members.iter().enumerate() {
            entries.insert(
                member.objid,
                XrefEntry::Compressed {
                    stream: block.id.objid,
                    index: index as u32,
                },
            );
        }
        out.extend_from_slice(&block.bytes);
    }
}

/// Header version: the document's, raised to 1.5 for xref or object streams.
pub(crate) fn output_version(doc: &Document, opts: &WriteOptions) -> (u8, u8) {
    if opts.xref_mode == XrefMode::Stream {
        doc.version.max((1, 5))
    } else {
        doc.version
    }
}

/// Trailer entries: `/Size` followed by the document's own keys.
pub(crate) fn trailer_with_size(doc: &Document, size: i64) -> Dict {
    let mut trailer = Dict::new();
    trailer.insert("Size".into(), PDFObject::Int(size));
    for (key, value) in &doc.trailer {
        if !WRITER_KEYS.contains(&key.as_str()) {
            trailer.insert(key.clone(), value.clone());
        }
    }
    trailer
}

pub(crate) fn free_head() -> XrefEntry {
    XrefEntry::Free {
        next: 0,
        genno: 65535,
    }
}

/// Run `pass` until the offsets it measures match the ones it was given.
///
/// Each pass renders the whole file from the previous pass's measurements;
/// the first pass starts from `M::default()`. Returns the stable output,
/// its measurements and the number of passes.
pub(crate) fn converge<M, F>(mut pass: F) -> Result<(Vec<u8>, M, usize)>
where
    M: PartialEq + Default,
    F: FnMut(&M) -> Result<(Vec<u8>, M)>,
{
    let mut guess = M::default();
    for passes in 1..=MAX_LAYOUT_PASSES {
        let (bytes, measured) = pass(&guess)?;
        if measured == guess {
            return Ok((bytes, measured, passes));
        }
        guess = measured;
    }
    Err(PdfError::SizeEstimationDivergence {
        passes: MAX_LAYOUT_PASSES,
    })
}

/// Non-linearized layout: header, object streams, loose objects in id
/// order, one cross-reference section.
///
/// The section comes last, so every offset it records is already known
/// when it is written and one pass suffices.
pub fn write_plain(doc: &Document, opts: &WriteOptions) -> Result<(Vec<u8>, WriteStats)> {
    let mut stats = WriteStats {
        passes: 1,
        ..WriteStats::default()
    };
    let mut alloc = IdAllocator::after(doc);
    let excluded = objstm::encryption_closure(doc);
    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();
    let blocks = build_blocks(doc, &ids, opts, &excluded, &mut alloc, &mut stats)?;

    let mut out = header_bytes(output_version(doc, opts));
    let mut entries = BTreeMap::from([(0, free_head())]);
    place(&mut out, &blocks, &mut entries);

    let xref_pos = out.len();
    match opts.xref_mode {
        XrefMode::Stream => {
            let xref_id = alloc.next();
            entries.insert(
                xref_id.objid,
                XrefEntry::InUse {
                    offset: xref_pos,
                    genno: 0,
                },
            );
            let trailer = trailer_with_size(doc, alloc.size());
            let stream = xref::xref_stream(&entries, &trailer, true, opts.level)?;
            serialize::write_indirect(&mut out, xref_id, &stream.into());
        }
        XrefMode::Table => {
            let trailer = trailer_with_size(doc, alloc.size());
            xref::write_xref_table(&mut out, &entries, &trailer)?;
        }
    }
    xref::write_startxref(&mut out, xref_pos);
    debug!(
        bytes = out.len(),
        objects = doc.objects.len(),
        object_streams = stats.object_streams,
        "wrote document"
    );
    Ok((out, stats))
}

/// Write `doc`, linearized when requested and possible.
pub fn write_document(doc: &Document, opts: &WriteOptions) -> Result<Written> {
    if !opts.linearize {
        let (bytes, stats) = write_plain(doc, opts)?;
        return Ok(Written {
            bytes,
            stats,
            linearization: LinearizationStatus::Skipped("disabled".into()),
        });
    }
    let Some(plan) = linearize::plan(doc) else {
        let (bytes, stats) = write_plain(doc, opts)?;
        return Ok(Written {
            bytes,
            stats,
            linearization: LinearizationStatus::Skipped("document has no pages".into()),
        });
    };
    match linearize::write_linearized(doc, &plan, opts)? {
        linearize::Linearized::Valid { bytes, stats } => Ok(Written {
            bytes,
            stats,
            linearization: LinearizationStatus::Applied,
        }),
        linearize::Linearized::Invalid(reason) => {
            warn!(%reason, "linearized layout failed validation, writing a plain file");
            let (bytes, stats) = write_plain(doc, opts)?;
            Ok(Written {
                bytes,
                stats,
                linearization: LinearizationStatus::FellBack(reason),
            })
        }
    }
}
