//! Object stream packer.
//!
//! Groups eligible non-stream objects into `/Type /ObjStm` streams. A group
//! closes when the next member would push the uncompressed payload past the
//! byte cap or the member count past its cap; an object larger than the byte
//! cap gets a stream of its own.

use super::serialize::object_bytes;
use crate::codec::deflate;
use crate::dict;
use crate::error::Result;
use crate::model::objects::name;
use crate::model::{Document, ObjectId, PDFObject, PDFStream};
use std::collections::HashSet;
use std::fmt::Write;

/// Size caps for a single object stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackLimits {
    /// Uncompressed member bytes per stream.
    pub max_bytes: usize,
    /// Members per stream.
    pub max_objects: usize,
}

impl Default for PackLimits {
    fn default() -> Self {
        Self {
            max_bytes: 64 * 1024,
            max_objects: 100,
        }
    }
}

/// Objects reachable from the trailer's `/Encrypt` entry. These must stay
/// loose so a reader can decrypt everything else.
pub fn encryption_closure(doc: &Document) -> HashSet<ObjectId> {
    let mut roots = Vec::new();
    if let Some(encrypt) = doc.trailer.get("Encrypt") {
        encrypt.for_each_ref(&mut |r| roots.push(r));
    }
    doc.reachable_from(roots, |_, _| false).into_iter().collect()
}

/// Whether `obj` may live inside an object stream.
pub fn is_packable(id: ObjectId, obj: &PDFObject, excluded: &HashSet<ObjectId>) -> bool {
    id.genno == 0
        && !obj.is_stream()
        && !excluded.contains(&id)
        && !matches!(obj.type_entry(), Some("XRef" | "ObjStm"))
}

/// Split `candidates` (already in serialization order) into groups.
pub fn group(doc: &Document, candidates: &[ObjectId], limits: PackLimits) -> Vec<Vec<ObjectId>> {
    let max_objects = limits.max_objects.max(1);
    let mut groups = Vec::new();
    let mut current = Vec::new();
    let mut current_bytes = 0usize;

    for &id in candidates {
        let Some(obj) = doc.get(id) else { continue };
        // Body plus the separating newline
        let size = object_bytes(obj).len() + 1;
        let full = current.len() >= max_objects || current_bytes + size > limits.max_bytes;
        if !current.is_empty() && full {
            groups.push(std::mem::take(&mut current));
            current_bytes = 0;
        }
        current.push(id);
        current_bytes += size;
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Build the object stream holding `members`, compressed at `level`.
pub fn build(doc: &Document, members: &[ObjectId], level: u32) -> Result<PDFStream> {
    let mut directory = String::new();
    let mut body = Vec::new();
    for (i, id) in members.iter().enumerate() {
        let obj = doc.get(*id).unwrap_or(&PDFObject::Null);
        if i > 0 {
            directory.push(' ');
        }
        let _ = write!(directory, "{} {}", id.objid, body.len());
        body.extend_from_slice(&object_bytes(obj));
        body.push(b'\n');
    }
    directory.push('\n');

    let first = directory.len();
    let mut payload = directory.into_bytes();
    payload.extend_from_slice(&body);

    let attrs = dict! {
        "Type" => name("ObjStm"),
        "N" => members.len() as i64,
        "First" => first as i64,
        "Filter" => name("FlateDecode"),
    };
    Ok(PDFStream::new(attrs, deflate(&payload, level)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::reader::parse_object_stream;

    fn doc_with(n: u32) -> Document {
        let mut doc = Document::new((1, 4));
        for i in 1..=n {
            doc.objects.insert(
                ObjectId::new(i, 0),
                dict! { "Type" => name("Annot"), "N" => i as i64 }.into(),
            );
        }
        doc
    }

    #[test]
    fn groups_respect_member_cap() {
        let doc = doc_with(250);
        let ids: Vec<_> = doc.objects.keys().copied().collect();
        let groups = group(&doc, &ids, PackLimits::default());
        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(groups[1][0], ObjectId::new(101, 0));
    }

    #[test]
    fn oversized_object_gets_its_own_stream() {
        let mut doc = doc_with(3);
        doc.objects.insert(
            ObjectId::new(2, 0),
            PDFObject::String(vec![b'x'; 500]),
        );
        let ids: Vec<_> = doc.objects.keys().copied().collect();
        let limits = PackLimits {
            max_bytes: 100,
            max_objects: 100,
        };
        let groups = group(&doc, &ids, limits);
        assert_eq!(
            groups,
            vec![
                vec![ObjectId::new(1, 0)],
                vec![ObjectId::new(2, 0)],
                vec![ObjectId::new(3, 0)],
            ]
        );
    }

    #[test]
    fn streams_and_encryption_objects_stay_loose() {
        let mut doc = doc_with(2);
        let s = doc.add_object(PDFStream::new(dict! {}, b"x".to_vec()));
        doc.trailer.insert("Encrypt".into(), ObjectId::new(1, 0).into());
        let excluded = encryption_closure(&doc);
        assert!(!is_packable(ObjectId::new(1, 0), doc.get(ObjectId::new(1, 0)).unwrap(), &excluded));
        assert!(is_packable(ObjectId::new(2, 0), doc.get(ObjectId::new(2, 0)).unwrap(), &excluded));
        assert!(!is_packable(s, doc.get(s).unwrap(), &excluded));
    }

    #[test]
    fn built_stream_reads_back() {
        let doc = doc_with(3);
        let ids: Vec<_> = doc.objects.keys().copied().collect();
        let stream = build(&doc, &ids, 9).unwrap();
        assert_eq!(stream.get("N"), Some(&PDFObject::Int(3)));
        let members = parse_object_stream(&stream, 10).unwrap();
        let numbers: Vec<u32> = members.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(&members[2].1, doc.get(ObjectId::new(3, 0)).unwrap());
    }
}
