//! Cross-reference sections: compressed `/Type /XRef` streams and classic
//! `xref` tables.

use super::serialize::write_object;
use crate::codec::{deflate, png_up_encode};
use crate::dict;
use crate::error::{PdfError, Result};
use crate::model::objects::name;
use crate::model::{Dict, PDFObject, PDFStream, XrefEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// Cross-reference format of the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XrefMode {
    /// Cross-reference stream (PDF 1.5+). Supports compressed entries.
    #[default]
    Stream,
    /// Classic `xref` table. Cannot describe objects inside object streams.
    Table,
}

/// Bytes needed to store `value` big-endian (at least one).
pub fn byte_width(value: u64) -> usize {
    (((64 - value.leading_zeros()) as usize).div_ceil(8)).max(1)
}

/// Contiguous `(first, count)` runs of object numbers.
pub fn subsections(entries: &BTreeMap<u32, XrefEntry>) -> Vec<(u32, u32)> {
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for &objid in entries.keys() {
        match runs.last_mut() {
            Some((first, count)) if *first + *count == objid => *count += 1,
            _ => runs.push((objid, 1)),
        }
    }
    runs
}

/// Build a cross-reference stream over `entries`.
///
/// `trailer` supplies the document keys (`Size`, `Root`, `Prev`, ...). With
/// `compress` the rows are Flate-encoded behind a PNG Up predictor;
/// otherwise they are stored raw so the stream size depends only on the
/// number of entries and the field widths.
pub fn xref_stream(entries: &BTreeMap<u32, XrefEntry>, trailer: &Dict, compress: bool, level: u32) -> Result<PDFStream> {
    let (max1, max2) = entries
        .values()
        .map(XrefEntry::fields)
        .fold((0, 0), |(a, b), (f1, f2)| (a.max(f1), b.max(f2)));
    let widths = [1, byte_width(max1), byte_width(max2)];
    let row_len: usize = widths.iter().sum();

    let mut rows = Vec::with_capacity(entries.len() * row_len);
    for entry in entries.values() {
        let (f1, f2) = entry.fields();
        rows.push(entry.type_code());
        rows.extend_from_slice(&f1.to_be_bytes()[8 - widths[1]..]);
        rows.extend_from_slice(&f2.to_be_bytes()[8 - widths[2]..]);
    }

    let index: Vec<PDFObject> = subsections(entries)
        .into_iter()
        .flat_map(|(first, count)| [PDFObject::Int(i64::from(first)), PDFObject::Int(i64::from(count))])
        .collect();
    let mut attrs = dict! {
        "Type" => name("XRef"),
        "W" => PDFObject::Array(widths.iter().map(|w| PDFObject::Int(*w as i64)).collect()),
        "Index" => PDFObject::Array(index),
    };
    for (key, value) in trailer {
        attrs.insert(key.clone(), value.clone());
    }

    let data = if compress {
        attrs.insert("Filter".into(), name("FlateDecode"));
        attrs.insert(
            "DecodeParms".into(),
            dict! { "Predictor" => 12i64, "Columns" => row_len as i64 }.into(),
        );
        deflate(&png_up_encode(&rows, row_len), level)?
    } else {
        rows
    };
    Ok(PDFStream::new(attrs, data))
}

/// Write a classic table followed by its `trailer` dictionary.
pub fn write_xref_table(out: &mut Vec<u8>, entries: &BTreeMap<u32, XrefEntry>, trailer: &Dict) -> Result<()> {
    out.extend_from_slice(b"xref\n");
    let mut rows = entries.iter();
    for (first, count) in subsections(entries) {
        let _ = writeln!(out, "{} {}", first, count);
        for (objid, entry) in rows.by_ref().take(count as usize) {
            let line = match *entry {
                XrefEntry::Free { next, genno } => format!("{:010} {:05} f\r\n", next, genno),
                XrefEntry::InUse { offset, genno } => format!("{:010} {:05} n\r\n", offset, genno),
                XrefEntry::Compressed { .. } => {
                    return Err(PdfError::SyntaxError(format!(
                        "object {} is compressed but a classic table was requested",
                        objid
                    )));
                }
            };
            out.extend_from_slice(line.as_bytes());
        }
    }
    out.extend_from_slice(b"trailer\n");
    write_object(out, &PDFObject::Dict(trailer.clone()));
    out.push(b'\n');
    Ok(())
}

/// `startxref` footer pointing at `offset`.
pub fn write_startxref(out: &mut Vec<u8>, offset: usize) {
    let _ = write!(out, "startxref\n{}\n%%EOF\n", offset);
}
