//! Linearized (first-page-first) layout.
//!
//! File order:
//!
//! ```text
//! header
//! linearization dictionary
//! first-page cross-reference section (/Prev -> main section)
//! primary hint stream
//! first-page part: page 1, catalog, page-tree path, everything page 1 uses
//! one part per remaining page
//! shared part: objects used by several pages or by none
//! main cross-reference section
//! startxref -> first-page section
//! ```
//!
//! The dictionary, the first-page section and the hint stream all hold
//! offsets of things written after them, so the layout is rendered until the
//! offsets it measures stop changing. The result is then checked for
//! self-consistency; a layout that fails is reported as invalid and the
//! caller writes a plain file instead.

use super::serialize::{header_bytes, write_indirect};
use super::{
    Block, IdAllocator, WriteOptions, WriteStats, build_blocks, converge, free_head, objstm,
    output_version, place, trailer_with_size, xref,
};
use crate::dict;
use crate::error::Result;
use crate::model::{Document, ObjectId, PDFObject, PDFStream, XrefEntry};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use tracing::debug;
use xref::XrefMode;

/// Bytes in the page-offset hint table header.
const PAGE_HINT_HEADER: usize = 36;
/// Bytes per page in the page-offset hint table.
const PAGE_HINT_ENTRY: usize = 8;

/// Partition of the document's objects into layout parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearizationPlan {
    /// Leaf pages in document order.
    pub pages: Vec<ObjectId>,
    /// Page 1 first, then the rest of the first-page part by id.
    pub first_page: Vec<ObjectId>,
    /// Objects private to pages 2..=n, each part led by its page.
    pub page_parts: Vec<Vec<ObjectId>>,
    /// Everything else, by id.
    pub shared: Vec<ObjectId>,
}

impl LinearizationPlan {
    /// Object counts per page part, page 1 first.
    fn objects_per_page(&self) -> Vec<usize> {
        std::iter::once(self.first_page.len())
            .chain(self.page_parts.iter().map(Vec::len))
            .collect()
    }
}

fn is_tree_node(obj: &PDFObject) -> bool {
    match obj.type_entry() {
        Some("Page" | "Pages") => true,
        _ => obj.as_dict().is_ok_and(|d| d.contains_key("Kids") && d.contains_key("Count")),
    }
}

/// Objects `page` needs: itself plus everything reachable without passing
/// through another page-tree node.
fn page_closure(doc: &Document, page: ObjectId) -> Vec<ObjectId> {
    doc.reachable_from([page], |id, obj| id != page && is_tree_node(obj))
        .into_iter()
        .filter(|id| *id == page || doc.get(*id).is_some_and(|o| !is_tree_node(o)))
        .collect()
}

/// Page attributes a leaf inherits from its page-tree ancestors.
const INHERITABLE: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Objects reachable from the inheritable entries of the page-tree `node`,
/// stopping at page-tree nodes.
fn inherited_closure(doc: &Document, node: ObjectId) -> Vec<ObjectId> {
    let Some(dict) = doc.get(node).and_then(|o| o.as_dict().ok()) else {
        return Vec::new();
    };
    let mut start = Vec::new();
    for key in INHERITABLE {
        if let Some(value) = dict.get(key) {
            value.for_each_ref(&mut |r| start.push(r));
        }
    }
    doc.reachable_from(start, |_, obj| is_tree_node(obj))
        .into_iter()
        .filter(|id| doc.get(*id).is_some_and(|o| !is_tree_node(o)))
        .collect()
}

/// Page-tree nodes from `page` up to the root, following `/Parent`.
fn ancestors(doc: &Document, page: ObjectId) -> Vec<ObjectId> {
    let mut path = Vec::new();
    let mut seen = HashSet::from([page]);
    let mut current = page;
    while let Some(parent) = doc
        .get(current)
        .and_then(|o| o.as_dict().ok())
        .and_then(|d| d.get("Parent"))
        .and_then(|p| p.as_ref().ok())
    {
        if !seen.insert(parent) || doc.get(parent).is_none() {
            break;
        }
        path.push(parent);
        current = parent;
    }
    path
}

/// Partition `doc` for linearization. `None` when there are no pages.
pub fn plan(doc: &Document) -> Option<LinearizationPlan> {
    let pages = doc.page_ids();
    let (&page1, rest) = pages.split_first()?;

    let mut assigned = HashSet::from([page1]);
    let path = ancestors(doc, page1);
    let inherited: Vec<ObjectId> = path.iter().flat_map(|&node| inherited_closure(doc, node)).collect();
    let mut first_rest: Vec<ObjectId> = doc
        .root_id()
        .into_iter()
        .chain(path)
        .chain(inherited)
        .chain(page_closure(doc, page1))
        .filter(|id| doc.get(*id).is_some() && assigned.insert(*id))
        .collect();
    first_rest.sort_unstable();
    let first_page = std::iter::once(page1).chain(first_rest).collect();

    let closures: Vec<Vec<ObjectId>> = rest
        .iter()
        .map(|&page| {
            page_closure(doc, page)
                .into_iter()
                .filter(|id| !assigned.contains(id))
                .collect()
        })
        .collect();
    let mut users: HashMap<ObjectId, usize> = HashMap::new();
    for closure in &closures {
        for id in closure {
            *users.entry(*id).or_default() += 1;
        }
    }

    let mut page_parts = Vec::with_capacity(rest.len());
    for (&page, closure) in rest.iter().zip(closures) {
        let mut own: Vec<ObjectId> = closure
            .into_iter()
            .filter(|id| *id != page && users.get(id) == Some(&1) && assigned.insert(*id))
            .collect();
        own.sort_unstable();
        let mut part = Vec::with_capacity(own.len() + 1);
        if assigned.insert(page) {
            part.push(page);
        }
        part.extend(own);
        page_parts.push(part);
    }

    let shared = doc
        .objects
        .keys()
        .filter(|id| !assigned.contains(id))
        .copied()
        .collect();

    Some(LinearizationPlan {
        pages,
        first_page,
        page_parts,
        shared,
    })
}

/// Outcome of a linearized write.
#[derive(Debug)]
pub enum Linearized {
    Valid { bytes: Vec<u8>, stats: WriteStats },
    Invalid(String),
}

/// Offsets measured by one layout pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Marks {
    file_len: usize,
    first_xref: usize,
    hint: (usize, usize),
    first_part_end: usize,
    main_xref: usize,
    /// `(start, length)` of each page part, page 1 first.
    parts: Vec<(usize, usize)>,
    shared_start: usize,
    /// Where every object lives, keyed by object number.
    entries: BTreeMap<u32, XrefEntry>,
}

impl Marks {
    /// Offset of the block holding `objid`.
    fn location(&self, objid: u32) -> Option<usize> {
        match self.entries.get(&objid)? {
            XrefEntry::InUse { offset, .. } => Some(*offset),
            XrefEntry::Compressed { stream, .. } => self.location(*stream),
            XrefEntry::Free { .. } => None,
        }
    }
}

fn to_u32(v: usize) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

/// Primary hint stream: page-offset hint table followed by the shared
/// object hint table header. All fields are byte aligned with fixed widths,
/// so the stream's size depends only on the page count.
fn hint_stream(plan: &LinearizationPlan, marks: &Marks, page1: ObjectId) -> PDFStream {
    let counts = plan.objects_per_page();
    let lengths: Vec<usize> = (0..counts.len())
        .map(|i| marks.parts.get(i).map_or(0, |p| p.1))
        .collect();
    let least_count = counts.iter().copied().min().unwrap_or(0);
    let least_len = lengths.iter().copied().min().unwrap_or(0);

    let mut data = Vec::with_capacity(PAGE_HINT_HEADER + PAGE_HINT_ENTRY * counts.len() + 24);
    let u32s = |data: &mut Vec<u8>, v: usize| data.extend_from_slice(&to_u32(v).to_be_bytes());
    let u16s = |data: &mut Vec<u8>, v: u16| data.extend_from_slice(&v.to_be_bytes());

    u32s(&mut data, least_count);
    u32s(&mut data, marks.location(page1.objid).unwrap_or(0));
    u16s(&mut data, 32);
    u32s(&mut data, least_len);
    u16s(&mut data, 32);
    // Content stream offsets and lengths, shared references and fractional
    // positions are not recorded
    u32s(&mut data, 0);
    u16s(&mut data, 0);
    u32s(&mut data, 0);
    u16s(&mut data, 0);
    u16s(&mut data, 0);
    u16s(&mut data, 0);
    u16s(&mut data, 0);
    u16s(&mut data, 1);
    for count in &counts {
        u32s(&mut data, count - least_count);
    }
    for len in &lengths {
        u32s(&mut data, len - least_len);
    }

    let shared_offset = data.len();
    let first_shared = plan.shared.first().map_or(0, |id| id.objid as usize);
    u32s(&mut data, first_shared);
    u32s(&mut data, marks.shared_start);
    u32s(&mut data, 0);
    u32s(&mut data, 0);
    u16s(&mut data, 0);
    u32s(&mut data, 0);
    u16s(&mut data, 0);

    PDFStream::new(dict! { "S" => shared_offset as i64 }, data)
}

/// Linearization parameter dictionary with fixed-width numbers.
fn write_lin_dict(out: &mut Vec<u8>, id: ObjectId, marks: &Marks, page1: ObjectId, n_pages: usize) {
    let _ = write!(
        out,
        "{} {} obj\n<</Linearized 1/L {:010}/H[{:010} {:010}]/O {:010}/E {:010}/N {:010}/T {:010}>>\nendobj\n",
        id.objid,
        id.genno,
        marks.file_len,
        marks.hint.0,
        marks.hint.1,
        page1.objid,
        marks.first_part_end,
        n_pages,
        marks.main_xref,
    );
}

/// Structural object numbers, allocated after the object streams.
struct Ids {
    lin: ObjectId,
    hint: ObjectId,
    first_xref: Option<ObjectId>,
    main_xref: Option<ObjectId>,
}

/// Render one pass of the layout from `guess`.
fn render(
    doc: &Document,
    plan: &LinearizationPlan,
    opts: &WriteOptions,
    parts: &[Vec<Block>],
    ids: &Ids,
    size: i64,
    guess: &Marks,
) -> Result<(Vec<u8>, Marks)> {
    let page1 = plan.first_page[0];
    let mut marks = Marks::default();
    let mut out = header_bytes(output_version(doc, opts));

    let lin_pos = out.len();
    write_lin_dict(&mut out, ids.lin, guess, page1, plan.pages.len());
    marks.entries.insert(
        ids.lin.objid,
        XrefEntry::InUse {
            offset: lin_pos,
            genno: 0,
        },
    );

    // First-page section: lin dict, its own stream, hint stream and the
    // first part, all at last pass's offsets
    marks.first_xref = out.len();
    let mut first_entries: BTreeMap<u32, XrefEntry> = BTreeMap::new();
    let mut first_numbers = vec![ids.lin.objid, ids.hint.objid];
    first_numbers.extend(ids.first_xref.map(|id| id.objid));
    for block in &parts[0] {
        first_numbers.push(block.id.objid);
        first_numbers.extend(block.members.iter().map(|m| m.objid));
    }
    for objid in first_numbers {
        let entry = guess.entries.get(&objid).copied().unwrap_or(XrefEntry::InUse {
            offset: 0,
            genno: 0,
        });
        first_entries.insert(objid, entry);
    }
    let mut first_trailer = trailer_with_size(doc, size);
    first_trailer.insert("Prev".into(), PDFObject::Int(guess.main_xref as i64));
    match ids.first_xref {
        Some(xref_id) => {
            let stream = xref::xref_stream(&first_entries, &first_trailer, false, opts.level)?;
            write_indirect(&mut out, xref_id, &stream.into());
            marks.entries.insert(
                xref_id.objid,
                XrefEntry::InUse {
                    offset: marks.first_xref,
                    genno: 0,
                },
            );
        }
        None => xref::write_xref_table(&mut out, &first_entries, &first_trailer)?,
    }
    out.extend_from_slice(b"startxref\n0\n%%EOF\n");

    let hint_pos = out.len();
    write_indirect(&mut out, ids.hint, &hint_stream(plan, guess, page1).into());
    marks.hint = (hint_pos, out.len() - hint_pos);
    marks.entries.insert(
        ids.hint.objid,
        XrefEntry::InUse {
            offset: hint_pos,
            genno: 0,
        },
    );

    for (i, blocks) in parts.iter().enumerate() {
        if i == parts.len() - 1 {
            marks.shared_start = out.len();
        }
        let start = out.len();
        place(&mut out, blocks, &mut marks.entries);
        if i == 0 {
            marks.first_part_end = out.len();
        }
        if i < parts.len() - 1 {
            marks.parts.push((start, out.len() - start));
        }
    }

    marks.main_xref = out.len();
    let mut main_entries: BTreeMap<u32, XrefEntry> = marks
        .entries
        .iter()
        .filter(|(objid, _)| !first_entries.contains_key(objid))
        .map(|(k, v)| (*k, *v))
        .collect();
    main_entries.insert(0, free_head());
    let main_trailer = trailer_with_size(doc, size);
    match ids.main_xref {
        Some(xref_id) => {
            let entry = XrefEntry::InUse {
                offset: marks.main_xref,
                genno: 0,
            };
            main_entries.insert(xref_id.objid, entry);
            marks.entries.insert(xref_id.objid, entry);
            let stream = xref::xref_stream(&main_entries, &main_trailer, true, opts.level)?;
            write_indirect(&mut out, xref_id, &stream.into());
        }
        None => xref::write_xref_table(&mut out, &main_entries, &main_trailer)?,
    }
    xref::write_startxref(&mut out, marks.first_xref);
    marks.file_len = out.len();
    Ok((out, marks))
}

/// Self-consistency checks on a converged layout.
fn validate(plan: &LinearizationPlan, marks: &Marks, file_len: usize) -> std::result::Result<(), String> {
    if marks.file_len != file_len {
        return Err(format!("/L {} but file is {} bytes", marks.file_len, file_len));
    }
    let mut sequence = vec![marks.first_xref, marks.hint.0];
    sequence.extend(marks.parts.iter().map(|p| p.0));
    sequence.push(marks.shared_start);
    sequence.push(marks.main_xref);
    if let Some(w) = sequence.windows(2).find(|w| w[0] > w[1]) {
        return Err(format!("offsets not monotonic: {} before {}", w[0], w[1]));
    }
    let (hint_pos, hint_len) = marks.hint;
    if hint_len == 0 || hint_pos + hint_len > marks.first_part_end || hint_pos + hint_len > file_len {
        return Err(format!("hint stream [{} {}] outside its range", hint_pos, hint_len));
    }
    let page1 = plan.first_page[0];
    match marks.location(page1.objid) {
        Some(at) if at >= hint_pos + hint_len && at < marks.first_part_end => {}
        _ => return Err(format!("/O {} is not in the first-page part", page1.objid)),
    }
    for id in &plan.first_page {
        match marks.location(id.objid) {
            Some(at) if at < marks.first_part_end => {}
            _ => {
                return Err(format!(
                    "first-page object {} lies beyond /E {}",
                    id.objid, marks.first_part_end
                ));
            }
        }
    }
    Ok(())
}

/// Write `doc` in linearized order.
pub fn write_linearized(doc: &Document, plan: &LinearizationPlan, opts: &WriteOptions) -> Result<Linearized> {
    let mut stats = WriteStats::default();
    let mut alloc = IdAllocator::after(doc);
    let excluded = objstm::encryption_closure(doc);

    let mut parts = Vec::with_capacity(plan.page_parts.len() + 2);
    parts.push(build_blocks(doc, &plan.first_page, opts, &excluded, &mut alloc, &mut stats)?);
    for part in &plan.page_parts {
        parts.push(build_blocks(doc, part, opts, &excluded, &mut alloc, &mut stats)?);
    }
    parts.push(build_blocks(doc, &plan.shared, opts, &excluded, &mut alloc, &mut stats)?);

    let streams = opts.xref_mode == XrefMode::Stream;
    let ids = Ids {
        lin: alloc.next(),
        hint: alloc.next(),
        first_xref: streams.then(|| alloc.next()),
        main_xref: streams.then(|| alloc.next()),
    };
    let size = alloc.size();

    let (bytes, marks, passes) =
        converge(|guess: &Marks| render(doc, plan, opts, &parts, &ids, size, guess))?;
    stats.passes = passes;
    debug!(passes, bytes = bytes.len(), pages = plan.pages.len(), "linearized layout converged");

    match validate(plan, &marks, bytes.len()) {
        Ok(()) => Ok(Linearized::Valid { bytes, stats }),
        Err(reason) => Ok(Linearized::Invalid(reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::reader::decode;
    use crate::model::objects::name;

    /// Catalog 1, page tree 2, pages 3.., each page with its own content
    /// stream and a font shared by all pages.
    fn doc_with_pages(n: u32) -> Document {
        let mut doc = Document::new((1, 4));
        let font = ObjectId::new(100, 0);
        doc.objects.insert(
            font,
            dict! { "Type" => name("Font"), "Subtype" => name("Type1"), "BaseFont" => name("Helvetica") }
                .into(),
        );
        let mut kids = Vec::new();
        for i in 0..n {
            let page = ObjectId::new(3 + 2 * i, 0);
            let content = ObjectId::new(4 + 2 * i, 0);
            kids.push(PDFObject::Ref(page));
            doc.objects.insert(
                page,
                dict! {
                    "Type" => name("Page"),
                    "Parent" => ObjectId::new(2, 0),
                    "Contents" => content,
                    "Resources" => dict! { "Font" => dict! { "F1" => font } },
                }
                .into(),
            );
            doc.objects.insert(
                content,
                PDFStream::new(dict! {}, format!("BT /F1 12 Tf (page {}) Tj ET", i + 1).into_bytes()).into(),
            );
        }
        doc.objects.insert(
            ObjectId::new(2, 0),
            dict! { "Type" => name("Pages"), "Kids" => PDFObject::Array(kids), "Count" => i64::from(n) }.into(),
        );
        doc.objects.insert(
            ObjectId::new(1, 0),
            dict! { "Type" => name("Catalog"), "Pages" => ObjectId::new(2, 0) }.into(),
        );
        doc.trailer.insert("Root".into(), ObjectId::new(1, 0).into());
        doc.compact();
        doc
    }

    #[test]
    fn plan_partitions_every_object_once() {
        let doc = doc_with_pages(3);
        let plan = plan(&doc).unwrap();
        let pages = doc.page_ids();
        assert_eq!(plan.first_page[0], pages[0]);
        assert_eq!(plan.page_parts.len(), 2);
        assert_eq!(plan.page_parts[0][0], pages[1]);

        let mut all: Vec<ObjectId> = plan
            .first_page
            .iter()
            .chain(plan.page_parts.iter().flatten())
            .chain(&plan.shared)
            .copied()
            .collect();
        all.sort_unstable();
        let expected: Vec<ObjectId> = doc.objects.keys().copied().collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn shared_font_goes_to_first_page() {
        let doc = doc_with_pages(2);
        let plan = plan(&doc).unwrap();
        // The font is used by page 1, so page 1 carries it
        let font = doc
            .objects
            .iter()
            .find(|(_, o)| o.type_entry() == Some("Font"))
            .map(|(id, _)| *id)
            .unwrap();
        assert!(plan.first_page.contains(&font));
        assert!(!plan.page_parts[0].contains(&font));
    }

    #[test]
    fn inherited_resources_join_the_first_page_part() {
        let mut doc = doc_with_pages(2);
        let tree = doc.catalog().unwrap().get("Pages").unwrap().as_ref().unwrap();
        let font = doc.add_object(dict! { "Type" => name("Font"), "BaseFont" => name("Courier") });
        let resources = doc.add_object(dict! { "Font" => dict! { "F2" => font } });
        doc.objects
            .get_mut(&tree)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .insert("Resources".into(), resources.into());

        let plan = plan(&doc).unwrap();
        assert!(plan.first_page.contains(&resources));
        assert!(plan.first_page.contains(&font));
        assert!(!plan.shared.contains(&font));
    }

    #[test]
    fn no_pages_means_no_plan() {
        let mut doc = Document::new((1, 4));
        let pages = doc.add_object(dict! { "Type" => name("Pages"), "Kids" => PDFObject::Array(vec![]), "Count" => 0i64 });
        let root = doc.add_object(dict! { "Type" => name("Catalog"), "Pages" => pages });
        doc.trailer.insert("Root".into(), root.into());
        assert!(plan(&doc).is_none());
    }

    fn lin_value(bytes: &[u8], key: &str) -> usize {
        let text = String::from_utf8_lossy(&bytes[..bytes.len().min(400)]);
        let at = text.find(&format!("/{} ", key)).unwrap() + key.len() + 2;
        text[at..at + 10].parse().unwrap()
    }

    #[test]
    fn linearized_output_is_consistent_and_decodes() {
        for mode in [XrefMode::Stream, XrefMode::Table] {
            let doc = doc_with_pages(4);
            let opts = WriteOptions {
                linearize: true,
                xref_mode: mode,
                ..WriteOptions::default()
            };
            let plan = plan(&doc).unwrap();
            let Linearized::Valid { bytes, stats } = write_linearized(&doc, &plan, &opts).unwrap() else {
                panic!("layout should validate");
            };
            assert!(stats.passes <= crate::writer::MAX_LAYOUT_PASSES);
            assert_eq!(lin_value(&bytes, "L"), bytes.len());
            assert_eq!(lin_value(&bytes, "N"), 4);
            assert_eq!(lin_value(&bytes, "O"), plan.first_page[0].objid as usize);

            // Page 1's content stream lies before /E
            let e = lin_value(&bytes, "E");
            let first_content = b"(page 1) Tj";
            let at = bytes
                .windows(first_content.len())
                .position(|w| w == first_content)
                .unwrap();
            assert!(at < e);
            let last_content = b"(page 4) Tj";
            let at = bytes
                .windows(last_content.len())
                .position(|w| w == last_content)
                .unwrap();
            assert!(at > e);

            let (back, info) = decode(&bytes, None).unwrap();
            assert!(!info.used_fallback);
            assert_eq!(back.page_ids().len(), 4);
            for (id, obj) in &doc.objects {
                assert_eq!(back.get(*id), Some(obj), "object {} differs", id);
            }
        }
    }
}
