//! Decoder: raw file bytes to a [`Document`].
//!
//! Locates the cross-reference chain from `startxref`, follows `/Prev` and
//! `/XRefStm` links, loads every in-use object, expands object streams and
//! decrypts strings and stream payloads through a [`CryptHandler`]. When the
//! declared cross-reference data is unusable the file is scanned for
//! `N G obj` markers instead.

use super::security::{CryptHandler, StandardSecurityHandler, stream_crypt_filter};
use crate::error::{PdfError, Result};
use crate::filters::decode_stream;
use crate::model::{Dict, Document, ObjectId, PDFObject, PDFStream, XrefEntry};
use crate::parser::{PDFParser, PSToken};
use regex::bytes::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// The header must start within this many bytes of the file start.
const HEADER_WINDOW: usize = 1024;

/// `startxref` is searched for in this many trailing bytes before falling
/// back to the whole file.
const STARTXREF_WINDOW: usize = 2048;

/// Trailer keys that describe a single cross-reference section rather than
/// the document.
const SECTION_KEYS: &[&str] = &[
    "Prev", "XRefStm", "Size", "Type", "W", "Index", "Filter", "DecodeParms", "Length", "DL",
];

/// What the decoder learned besides the document itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeInfo {
    /// The input carried an `/Encrypt` dictionary.
    pub encrypted: bool,
    /// Declared cross-reference data was unusable and the file was scanned.
    pub used_fallback: bool,
    /// Cross-reference sections followed (0 for a scanned file).
    pub xref_sections: usize,
    /// Object streams expanded.
    pub object_streams: usize,
}

/// Parse `data` into a document, decrypting with `password` when the file
/// is encrypted (`None` tries the empty password).
pub fn decode(data: &[u8], password: Option<&str>) -> Result<(Document, DecodeInfo)> {
    let version = parse_header(data)?;
    let mut reader = Reader::new(data);

    let mut info = DecodeInfo::default();
    let loaded = match reader.load_from_xref() {
        Ok(sections) => {
            info.xref_sections = sections;
            true
        }
        Err(e @ PdfError::TruncatedStream { .. }) => return Err(e),
        Err(e) => {
            warn!(error = %e, "cross-reference data unusable, scanning file for objects");
            false
        }
    };
    if !loaded {
        reader.load_by_scanning()?;
        info.used_fallback = true;
    }

    info.encrypted = reader.trailer.contains_key("Encrypt");
    if info.encrypted {
        reader.decrypt(password.unwrap_or(""))?;
    }
    info.object_streams = reader.expand_object_streams()?;

    let mut doc = reader.into_document(version);
    if let Some(catalog_version) = doc
        .catalog()
        .and_then(|c| c.get("Version"))
        .and_then(|v| v.as_name().ok())
        .and_then(parse_version)
    {
        doc.version = doc.version.max(catalog_version);
    }
    debug!(
        objects = doc.objects.len(),
        version = ?doc.version,
        fallback = info.used_fallback,
        encrypted = info.encrypted,
        "decoded document"
    );
    Ok((doc, info))
}

/// Find `%PDF-M.m` in the first kilobyte.
pub fn parse_header(data: &[u8]) -> Result<(u8, u8)> {
    let window = &data[..data.len().min(HEADER_WINDOW)];
    let pos = find(window, b"%PDF-").ok_or(PdfError::MalformedHeader)?;
    let rest = &window[pos + 5..];
    let end = rest
        .iter()
        .position(|b| !(b.is_ascii_digit() || *b == b'.'))
        .unwrap_or(rest.len());
    std::str::from_utf8(&rest[..end])
        .ok()
        .and_then(parse_version)
        .ok_or(PdfError::MalformedHeader)
}

fn parse_version(s: &str) -> Option<(u8, u8)> {
    let (major, minor) = s.split_once('.')?;
    Some((major.parse().ok()?, minor.get(..1)?.parse().ok()?))
}

fn find(hay: &[u8], needle: &[u8]) -> Option<usize> {
    hay.windows(needle.len()).position(|w| w == needle)
}

fn rfind(hay: &[u8], needle: &[u8]) -> Option<usize> {
    hay.windows(needle.len()).rposition(|w| w == needle)
}

/// A parsed top-level object with its source offset.
struct Loaded {
    obj: PDFObject,
    offset: usize,
}

struct Reader<'a> {
    data: &'a [u8],
    /// Merged cross-reference entries, newest section first wins.
    xref: BTreeMap<u32, XrefEntry>,
    trailer: Dict,
    objects: BTreeMap<ObjectId, Loaded>,
    /// Objects that came out of object streams (already decrypted).
    compressed: HashSet<ObjectId>,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            xref: BTreeMap::new(),
            trailer: Dict::new(),
            objects: BTreeMap::new(),
            compressed: HashSet::new(),
        }
    }

    fn find_startxref(&self) -> Result<usize> {
        let tail_start = self.data.len().saturating_sub(STARTXREF_WINDOW);
        let pos = rfind(&self.data[tail_start..], b"startxref")
            .map(|p| p + tail_start)
            .or_else(|| rfind(self.data, b"startxref"))
            .ok_or_else(|| PdfError::xref(self.data.len(), "no startxref"))?;
        let mut parser = PDFParser::at(self.data, pos + 9);
        match parser.next_token()? {
            Some((_, PSToken::Int(n))) if n >= 0 && (n as usize) < self.data.len() => Ok(n as usize),
            _ => Err(PdfError::xref(pos, "startxref without a valid offset")),
        }
    }

    /// Walk the section chain. Returns the number of sections read.
    fn load_from_xref(&mut self) -> Result<usize> {
        let mut pos = self.find_startxref()?;
        let mut visited = HashSet::new();
        let mut sections = 0;

        while visited.insert(pos) {
            let (entries, trailer) = self.load_section(pos)?;
            sections += 1;

            // Hybrid files: the table's in-use entries take priority over
            // the XRefStm stream, whose entries beat the table's free ones.
            let xref_stm = trailer
                .get("XRefStm")
                .and_then(|p| p.as_int().ok())
                .and_then(|p| usize::try_from(p).ok());
            let (free, used): (Vec<_>, Vec<_>) =
                entries.into_iter().partition(|(_, e)| e.is_free());
            for (objid, entry) in used {
                self.xref.entry(objid).or_insert(entry);
            }
            if let Some(stm_pos) = xref_stm
                && visited.insert(stm_pos)
            {
                let (stm_entries, _) = self.load_xref_stream(stm_pos)?;
                sections += 1;
                for (objid, entry) in stm_entries {
                    self.xref.entry(objid).or_insert(entry);
                }
            }
            for (objid, entry) in free {
                self.xref.entry(objid).or_insert(entry);
            }

            let prev = trailer
                .get("Prev")
                .and_then(|p| p.as_int().ok())
                .and_then(|p| usize::try_from(p).ok());
            for (key, value) in trailer {
                self.trailer.entry(key).or_insert(value);
            }
            match prev {
                Some(p) => pos = p,
                None => break,
            }
        }

        if !self.trailer.contains_key("Root") {
            return Err(PdfError::xref(pos, "trailer has no /Root"));
        }

        let in_use: Vec<(u32, usize, u16)> = self
            .xref
            .iter()
            .filter_map(|(&objid, entry)| match *entry {
                XrefEntry::InUse { offset, genno } if objid != 0 => Some((objid, offset, genno)),
                _ => None,
            })
            .collect();
        for (objid, offset, genno) in in_use {
            let (id, obj) = self.parse_object_at(offset)?;
            if id.objid != objid {
                return Err(PdfError::xref(
                    offset,
                    format!("expected object {} but found {}", objid, id.objid),
                ));
            }
            if id.genno != genno {
                debug!(objid, declared = genno, found = id.genno, "generation mismatch");
            }
            self.objects.insert(id, Loaded { obj, offset });
        }
        Ok(sections)
    }

    fn load_section(&self, pos: usize) -> Result<(Vec<(u32, XrefEntry)>, Dict)> {
        let mut parser = PDFParser::at(self.data, pos);
        match parser.next_token()? {
            Some((_, PSToken::Keyword(kw))) if kw == b"xref" => self.load_table(parser, pos),
            _ => self.load_xref_stream(pos),
        }
    }

    /// Classic `xref` table followed by `trailer << ... >>`.
    fn load_table(&self, mut parser: PDFParser<'_>, pos: usize) -> Result<(Vec<(u32, XrefEntry)>, Dict)> {
        let mut entries = Vec::new();
        loop {
            let (tok_pos, tok) = parser
                .next_token()?
                .ok_or_else(|| PdfError::xref(pos, "table ends before trailer"))?;
            let start = match tok {
                PSToken::Keyword(kw) if kw == b"trailer" => break,
                PSToken::Int(n) if n >= 0 => n,
                _ => return Err(PdfError::xref(tok_pos, "bad subsection header")),
            };
            let count = parser.next_int()?;
            if count < 0 {
                return Err(PdfError::xref(tok_pos, "negative subsection count"));
            }
            let mut base = start;
            for i in 0..count {
                let offset = parser.next_int()?;
                let genno = parser.next_int()?;
                let (kind_pos, kind) = parser
                    .next_token()?
                    .ok_or_else(|| PdfError::xref(tok_pos, "truncated subsection"))?;
                let PSToken::Keyword(kind) = kind else {
                    return Err(PdfError::xref(kind_pos, "entry type must be n or f"));
                };
                // Subsections that wrongly start at 1 but still carry the
                // object 0 free-list head
                if i == 0 && base == 1 && kind == b"f" && offset == 0 && genno == 65535 {
                    base = 0;
                }
                let objid = u32::try_from(base + i)
                    .map_err(|_| PdfError::xref(kind_pos, "object number out of range"))?;
                let genno = u16::try_from(genno).unwrap_or(u16::MAX);
                let entry = match kind.as_slice() {
                    b"n" => XrefEntry::InUse {
                        offset: usize::try_from(offset)
                            .map_err(|_| PdfError::xref(kind_pos, "negative offset"))?,
                        genno,
                    },
                    b"f" => XrefEntry::Free {
                        next: u32::try_from(offset).unwrap_or(0),
                        genno,
                    },
                    _ => return Err(PdfError::xref(kind_pos, "entry type must be n or f")),
                };
                entries.push((objid, entry));
            }
        }
        let trailer = match parser.parse_object()? {
            PDFObject::Dict(d) => d,
            _ => return Err(PdfError::xref(pos, "trailer is not a dictionary")),
        };
        Ok((entries, trailer))
    }

    /// Cross-reference stream (`/Type /XRef`).
    fn load_xref_stream(&self, pos: usize) -> Result<(Vec<(u32, XrefEntry)>, Dict)> {
        let (_, obj) = self.parse_object_at(pos)?;
        let PDFObject::Stream(stream) = obj else {
            return Err(PdfError::xref(pos, "expected a cross-reference stream"));
        };
        let bad = |reason: &str| PdfError::xref(pos, reason.to_string());

        let widths: Vec<usize> = stream
            .get("W")
            .and_then(|w| w.as_array().ok())
            .ok_or_else(|| bad("missing /W"))?
            .iter()
            .map(|w| w.as_int().ok().and_then(|n| usize::try_from(n).ok()))
            .collect::<Option<_>>()
            .ok_or_else(|| bad("bad /W"))?;
        let [w0, w1, w2] = widths[..] else {
            return Err(bad("/W must have 3 elements"));
        };
        if w0 > 8 || w1 > 8 || w2 > 8 {
            return Err(bad("/W field wider than 8 bytes"));
        }
        let entry_size = w0 + w1 + w2;
        if entry_size == 0 {
            return Err(bad("/W fields are all zero"));
        }

        let size = stream
            .get("Size")
            .and_then(|s| s.as_int().ok())
            .ok_or_else(|| bad("missing /Size"))?;
        let index: Vec<(i64, i64)> = match stream.get("Index").and_then(|i| i.as_array().ok()) {
            Some(arr) => arr
                .chunks_exact(2)
                .map(|pair| Some((pair[0].as_int().ok()?, pair[1].as_int().ok()?)))
                .collect::<Option<_>>()
                .ok_or_else(|| bad("bad /Index"))?,
            None => vec![(0, size)],
        };

        let data = decode_stream(&stream, false)?;
        let mut rows = data.chunks_exact(entry_size);
        let mut entries = Vec::new();
        for (start, count) in index {
            for i in 0..count.max(0) {
                let Some(row) = rows.next() else {
                    return Err(bad("stream shorter than /Index"));
                };
                let objid = u32::try_from(start + i).map_err(|_| bad("object number out of range"))?;
                let kind = if w0 == 0 { 1 } else { be_int(&row[..w0]) };
                let f1 = be_int(&row[w0..w0 + w1]);
                let f2 = be_int(&row[w0 + w1..]);
                let entry = match kind {
                    0 => XrefEntry::Free {
                        next: f1 as u32,
                        genno: f2 as u16,
                    },
                    1 => XrefEntry::InUse {
                        offset: f1 as usize,
                        genno: if w2 == 0 { 0 } else { f2 as u16 },
                    },
                    2 => XrefEntry::Compressed {
                        stream: f1 as u32,
                        index: f2 as u32,
                    },
                    // Unknown types are references to the null object
                    _ => continue,
                };
                entries.push((objid, entry));
            }
        }

        let mut trailer = stream.attrs;
        for key in SECTION_KEYS.iter().filter(|k| !matches!(**k, "Prev" | "XRefStm")) {
            trailer.shift_remove(*key);
        }
        Ok((entries, trailer))
    }

    /// Parse `N G obj ... endobj` at `offset`, reading a stream payload if
    /// one follows the dictionary.
    fn parse_object_at(&self, offset: usize) -> Result<(ObjectId, PDFObject)> {
        if offset >= self.data.len() {
            return Err(PdfError::xref(offset, "object offset past end of file"));
        }
        let mut parser = PDFParser::at(self.data, offset);
        let id = parser.parse_object_header()?;
        let obj = parser.parse_object()?;

        let PDFObject::Dict(attrs) = obj else {
            return Ok((id, obj));
        };
        let Some(after_kw) = parser.eat_keyword(b"stream")? else {
            return Ok((id, PDFObject::Dict(attrs)));
        };

        // The keyword is followed by CRLF or LF (a lone CR is tolerated)
        let mut start = after_kw;
        match self.data.get(start..start + 2) {
            Some(b"\r\n") => start += 2,
            _ if matches!(self.data.get(start), Some(b'\n' | b'\r')) => start += 1,
            _ => {}
        }

        let declared = attrs.get("Length").and_then(|l| self.resolve_length(l));
        let end = match declared {
            Some(len) if self.endstream_follows(start + len) => start + len,
            _ => self.scan_endstream(start).ok_or(PdfError::TruncatedStream {
                objid: id.objid,
                offset: start,
            })?,
        };
        let payload = self.data[start..end].to_vec();
        Ok((id, PDFStream::new(attrs, payload).into()))
    }

    /// `/Length` as a direct integer or a reference to one.
    fn resolve_length(&self, obj: &PDFObject) -> Option<usize> {
        let value = match obj {
            PDFObject::Int(n) => *n,
            PDFObject::Ref(id) => match self.xref.get(&id.objid) {
                Some(XrefEntry::InUse { offset, .. }) => {
                    let mut parser = PDFParser::at(self.data, *offset);
                    parser.parse_object_header().ok()?;
                    parser.parse_object().ok()?.as_int().ok()?
                }
                _ => return None,
            },
            _ => return None,
        };
        usize::try_from(value).ok()
    }

    fn endstream_follows(&self, pos: usize) -> bool {
        let Some(rest) = self.data.get(pos..) else {
            return false;
        };
        let skip = rest
            .iter()
            .take_while(|b| matches!(b, b'\r' | b'\n' | b' ' | b'\t' | b'\x0c' | b'\x00'))
            .count();
        rest[skip..].starts_with(b"endstream")
    }

    /// End of payload before the next `endstream`, minus the EOL that
    /// precedes the keyword.
    fn scan_endstream(&self, start: usize) -> Option<usize> {
        let rel = find(&self.data[start..], b"endstream")?;
        let mut end = start + rel;
        if end > start && self.data[end - 1] == b'\n' {
            end -= 1;
        }
        if end > start && self.data[end - 1] == b'\r' {
            end -= 1;
        }
        Some(end)
    }

    /// Linear scan for object markers. Later definitions win, matching
    /// incremental-update order.
    fn load_by_scanning(&mut self) -> Result<()> {
        self.xref.clear();
        self.trailer.clear();
        self.objects.clear();

        let marker = Regex::new(r"(\d+)\s+(\d+)\s+obj\b")
            .map_err(|e| PdfError::SyntaxError(e.to_string()))?;
        let mut latest: HashMap<u32, (ObjectId, Loaded)> = HashMap::new();
        for m in marker.find_iter(self.data) {
            // Skip markers that are the tail of a longer number
            if m.start() > 0 && self.data[m.start() - 1].is_ascii_digit() {
                continue;
            }
            match self.parse_object_at(m.start()) {
                Ok((id, obj)) => {
                    let loaded = Loaded {
                        obj,
                        offset: m.start(),
                    };
                    latest.insert(id.objid, (id, loaded));
                }
                Err(e @ PdfError::TruncatedStream { .. }) => return Err(e),
                Err(e) => debug!(offset = m.start(), error = %e, "skipping unparsable object"),
            }
        }
        self.objects = latest.into_values().collect();
        if self.objects.is_empty() {
            return Err(PdfError::xref(0, "no objects found while scanning"));
        }

        // Trailer dictionaries, oldest first so newer keys overwrite
        let mut pos = 0;
        while let Some(rel) = find(&self.data[pos..], b"trailer") {
            let at = pos + rel + 7;
            let mut parser = PDFParser::at(self.data, at);
            if let Ok(PDFObject::Dict(d)) = parser.parse_object() {
                for (k, v) in d {
                    self.trailer.insert(k, v);
                }
            }
            pos = at;
        }
        // Cross-reference streams double as trailers
        for loaded in self.objects.values() {
            if let PDFObject::Stream(s) = &loaded.obj
                && s.get("Type").and_then(|t| t.as_name().ok()) == Some("XRef")
            {
                for (k, v) in &s.attrs {
                    self.trailer.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        }
        for key in SECTION_KEYS {
            self.trailer.shift_remove(*key);
        }

        let root_ok = self
            .trailer
            .get("Root")
            .and_then(|r| r.as_ref().ok())
            .is_some_and(|id| self.objects.keys().any(|k| k.objid == id.objid));
        if !root_ok {
            let catalog = self
                .objects
                .iter()
                .rev()
                .find(|(_, l)| l.obj.type_entry() == Some("Catalog"))
                .map(|(id, _)| *id)
                .ok_or_else(|| PdfError::xref(0, "no document catalog found while scanning"))?;
            self.trailer.insert("Root".into(), catalog.into());
        }
        Ok(())
    }

    /// Authenticate and decrypt every object loaded from the file.
    fn decrypt(&mut self, password: &str) -> Result<()> {
        let encrypt_ref = self.trailer.get("Encrypt").cloned().unwrap_or(PDFObject::Null);
        let encrypt_id = encrypt_ref.as_ref().ok();
        let encrypt = match &encrypt_ref {
            PDFObject::Dict(d) => d.clone(),
            PDFObject::Ref(id) => self
                .objects
                .get(id)
                .and_then(|l| l.obj.as_dict().ok())
                .cloned()
                .ok_or_else(|| {
                    PdfError::UnsupportedEncryption(format!("encryption dictionary {} not found", id))
                })?,
            _ => return Err(PdfError::UnsupportedEncryption("malformed /Encrypt entry".into())),
        };
        let doc_id = self
            .trailer
            .get("ID")
            .and_then(|ids| ids.as_array().ok())
            .and_then(|ids| ids.first())
            .and_then(|first| first.as_string().ok())
            .unwrap_or(&[])
            .to_vec();

        let handler = StandardSecurityHandler::new(&encrypt, &doc_id, password)?;
        debug!(
            revision = handler.revision(),
            authenticated = ?handler.authenticated(),
            "authenticated encrypted document"
        );

        for (id, loaded) in self.objects.iter_mut() {
            if Some(*id) == encrypt_id || self.compressed.contains(id) {
                continue;
            }
            // Cross-reference streams are never encrypted
            if loaded.obj.is_stream() && loaded.obj.type_entry() == Some("XRef") {
                continue;
            }
            decrypt_object(&handler, *id, &mut loaded.obj).map_err(|e| {
                warn!(object = %id, offset = loaded.offset, error = %e, "decryption failed");
                e
            })?;
        }
        if let Some(id) = encrypt_id {
            self.objects.remove(&id);
        }
        self.trailer.shift_remove("Encrypt");
        Ok(())
    }

    /// Unpack object streams. Members referenced by compressed xref entries
    /// are added unless a direct definition of the same object exists.
    fn expand_object_streams(&mut self) -> Result<usize> {
        let streams: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, l)| l.obj.is_stream() && l.obj.type_entry() == Some("ObjStm"))
            .map(|(id, _)| *id)
            .collect();

        let known: HashSet<u32> = self.objects.keys().map(|id| id.objid).collect();
        let mut members: HashMap<u32, (u32, PDFObject)> = HashMap::new();
        for stream_id in &streams {
            let Some(PDFObject::Stream(stream)) = self.objects.get(stream_id).map(|l| &l.obj) else {
                continue;
            };
            let parsed = match parse_object_stream(stream, stream_id.objid) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(stream = %stream_id, error = %e, "skipping unreadable object stream");
                    continue;
                }
            };
            for (objid, obj) in parsed {
                members.entry(objid).or_insert((stream_id.objid, obj));
            }
        }

        for (objid, (stream_objid, obj)) in members {
            let wanted = match self.xref.get(&objid) {
                Some(XrefEntry::Compressed { stream, .. }) => *stream == stream_objid,
                // Scanned files have no xref: take members not defined directly
                None => !known.contains(&objid),
                Some(_) => false,
            };
            if wanted {
                let id = ObjectId::new(objid, 0);
                self.compressed.insert(id);
                self.objects.insert(id, Loaded { obj, offset: 0 });
            }
        }
        Ok(streams.len())
    }

    fn into_document(self, version: (u8, u8)) -> Document {
        let mut doc = Document::new(version);
        for (id, loaded) in self.objects {
            // Structural objects are rebuilt by the writer
            let structural = matches!(loaded.obj.type_entry(), Some("XRef" | "ObjStm"))
                || loaded
                    .obj
                    .as_dict()
                    .is_ok_and(|d| d.contains_key("Linearized"));
            if !structural {
                doc.objects.insert(id, loaded.obj);
            }
        }
        doc.trailer = self.trailer;
        for key in SECTION_KEYS {
            doc.trailer.shift_remove(*key);
        }
        repair_generations(&mut doc);
        doc
    }
}

fn be_int(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Decrypt strings (recursively) and the stream payload of one object.
fn decrypt_object(handler: &dyn CryptHandler, id: ObjectId, obj: &mut PDFObject) -> Result<()> {
    match obj {
        PDFObject::String(s) => *s = handler.decrypt_string(id, s)?,
        PDFObject::Array(arr) => {
            for item in arr {
                decrypt_object(handler, id, item)?;
            }
        }
        PDFObject::Dict(d) => {
            for value in d.values_mut() {
                decrypt_object(handler, id, value)?;
            }
        }
        PDFObject::Stream(stream) => {
            for value in stream.attrs.values_mut() {
                decrypt_object(handler, id, value)?;
            }
            let plain = handler.decrypt_stream(id, stream.data(), &stream.attrs)?;
            stream.set_data(plain);
            drop_crypt_filter(&mut stream.attrs);
        }
        _ => {}
    }
    Ok(())
}

/// Remove a leading `/Crypt` filter once its payload has been decrypted.
fn drop_crypt_filter(attrs: &mut Dict) {
    if stream_crypt_filter(attrs).is_none() {
        return;
    }
    let chained = matches!(attrs.get("Filter"), Some(PDFObject::Array(f)) if f.len() > 1);
    if !chained {
        attrs.shift_remove("Filter");
        attrs.shift_remove("DecodeParms");
        return;
    }
    if let Some(PDFObject::Array(filters)) = attrs.get_mut("Filter") {
        filters.remove(0);
    }
    if let Some(PDFObject::Array(parms)) = attrs.get_mut("DecodeParms")
        && !parms.is_empty()
    {
        parms.remove(0);
    }
}

/// Members of an object stream as `(objid, object)` in directory order.
pub fn parse_object_stream(stream: &PDFStream, stream_objid: u32) -> Result<Vec<(u32, PDFObject)>> {
    let bad = |reason: String| PdfError::SyntaxError(format!("object stream {}: {}", stream_objid, reason));
    let n = stream
        .get("N")
        .and_then(|v| v.as_int().ok())
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| bad("missing /N".into()))?;
    let first = stream
        .get("First")
        .and_then(|v| v.as_int().ok())
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| bad("missing /First".into()))?;
    let data = decode_stream(stream, false)?;
    if first > data.len() {
        return Err(bad(format!("/First {} past payload end {}", first, data.len())));
    }

    let mut directory = PDFParser::new(&data[..first]);
    let mut members = Vec::with_capacity(n);
    for _ in 0..n {
        let (Ok(objid), Ok(offset)) = (directory.next_int(), directory.next_int()) else {
            break;
        };
        let (Ok(objid), Ok(offset)) = (u32::try_from(objid), usize::try_from(offset)) else {
            continue;
        };
        let Some(at) = first.checked_add(offset).filter(|&at| at < data.len()) else {
            continue;
        };
        let mut parser = PDFParser::at(&data, at);
        match parser.parse_object() {
            Ok(obj) => members.push((objid, obj)),
            Err(e) => debug!(stream_objid, objid, error = %e, "unparsable object stream member"),
        }
    }
    Ok(members)
}

/// Point references with a stale generation at the object that exists
/// under the same number.
fn repair_generations(doc: &mut Document) {
    let by_number: HashMap<u32, ObjectId> = doc.objects.keys().map(|id| (id.objid, *id)).collect();
    let mut fix = |id: ObjectId| match by_number.get(&id.objid) {
        Some(actual) => PDFObject::Ref(*actual),
        None => PDFObject::Ref(id),
    };
    for obj in doc.objects.values_mut() {
        obj.map_refs(&mut fix);
    }
    for value in doc.trailer.values_mut() {
        value.map_refs(&mut fix);
    }
}
