//! Byte serializer for PDF objects.
//!
//! Output is compact: a separator is written only where two regular
//! characters would otherwise merge into one token.

use crate::model::{ObjectId, PDFObject, PDFStream};
use crate::parser::lexer::{is_delimiter, is_whitespace};
use std::io::Write;

/// Second header line; four bytes above 127 mark the file as binary.
const BINARY_MARKER: &[u8] = b"%\xE2\xE3\xCF\xD3\n";

/// `%PDF-M.m` header plus the binary marker comment.
pub fn header_bytes(version: (u8, u8)) -> Vec<u8> {
    let mut out = format!("%PDF-{}.{}\n", version.0, version.1).into_bytes();
    out.extend_from_slice(BINARY_MARKER);
    out
}

const fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Append `token`, inserting a space if it would fuse with the previous one.
fn push_token(out: &mut Vec<u8>, token: &[u8]) {
    if let (Some(&last), Some(&first)) = (out.last(), token.first())
        && is_regular(last)
        && is_regular(first)
    {
        out.push(b' ');
    }
    out.extend_from_slice(token);
}

/// Serialize a direct object.
pub fn write_object(out: &mut Vec<u8>, obj: &PDFObject) {
    match obj {
        PDFObject::Null => push_token(out, b"null"),
        PDFObject::Bool(true) => push_token(out, b"true"),
        PDFObject::Bool(false) => push_token(out, b"false"),
        PDFObject::Int(n) => push_token(out, n.to_string().as_bytes()),
        PDFObject::Real(r) => push_token(out, format_real(*r).as_bytes()),
        PDFObject::Name(n) => write_name(out, n),
        PDFObject::String(s) => write_string(out, s),
        PDFObject::Array(arr) => {
            out.push(b'[');
            for item in arr {
                write_object(out, item);
            }
            out.push(b']');
        }
        PDFObject::Dict(d) => {
            out.extend_from_slice(b"<<");
            for (key, value) in d {
                write_name(out, key);
                write_object(out, value);
            }
            out.extend_from_slice(b">>");
        }
        // Streams are only valid as indirect objects; inline they degrade
        // to their dictionary
        PDFObject::Stream(s) => write_object(out, &PDFObject::Dict(s.attrs.clone())),
        PDFObject::Ref(id) => push_token(out, format!("{} {} R", id.objid, id.genno).as_bytes()),
    }
}

/// Reals use the shortest representation that reads back to the same value.
/// Rust's `Display` for `f64` never switches to exponent notation.
fn format_real(r: f64) -> String {
    if r.is_finite() {
        let s = r.to_string();
        if s == "-0" { "0".into() } else { s }
    } else {
        "0".into()
    }
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for &b in name.as_bytes() {
        if (0x21..=0x7E).contains(&b) && !is_delimiter(b) && b != b'#' {
            out.push(b);
        } else {
            // Infallible for Vec
            let _ = write!(out, "#{:02X}", b);
        }
    }
}

fn write_string(out: &mut Vec<u8>, s: &[u8]) {
    let unprintable = s
        .iter()
        .filter(|&&b| !(0x20..=0x7E).contains(&b) && !matches!(b, b'\n' | b'\r' | b'\t'))
        .count();
    if unprintable * 4 > s.len() {
        out.push(b'<');
        for b in s {
            let _ = write!(out, "{:02X}", b);
        }
        out.push(b'>');
        return;
    }
    out.push(b'(');
    for &b in s {
        match b {
            b'(' | b')' | b'\\' => out.extend_from_slice(&[b'\\', b]),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            0x20..=0x7E | b'\t' => out.push(b),
            _ => {
                let _ = write!(out, "\\{:03o}", b);
            }
        }
    }
    out.push(b')');
}

/// Serialize an object body as it appears between `obj` and `endobj`.
pub fn object_bytes(obj: &PDFObject) -> Vec<u8> {
    let mut out = Vec::new();
    write_object(&mut out, obj);
    out
}

/// Stream dictionary with `/Length` first, then keyword, payload and
/// `endstream`.
fn write_stream(out: &mut Vec<u8>, stream: &PDFStream) {
    out.extend_from_slice(b"<<");
    push_token(out, b"/Length");
    push_token(out, stream.data().len().to_string().as_bytes());
    for (key, value) in &stream.attrs {
        write_name(out, key);
        write_object(out, value);
    }
    out.extend_from_slice(b">>\nstream\n");
    out.extend_from_slice(stream.data());
    out.extend_from_slice(b"\nendstream");
}

/// Serialize `N G obj ... endobj`.
pub fn write_indirect(out: &mut Vec<u8>, id: ObjectId, obj: &PDFObject) {
    let _ = writeln!(out, "{} {} obj", id.objid, id.genno);
    match obj {
        PDFObject::Stream(s) => write_stream(out, s),
        other => write_object(out, other),
    }
    out.extend_from_slice(b"\nendobj\n");
}

pub fn indirect_bytes(id: ObjectId, obj: &PDFObject) -> Vec<u8> {
    let mut out = Vec::new();
    write_indirect(&mut out, id, obj);
    out
}
