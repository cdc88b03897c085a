//! PDF object types.
//!
//! Objects are plain values. Indirect objects refer to each other through
//! [`ObjectId`]s, never through pointers, so cyclic graphs (page -> parent ->
//! kids -> page) are representable without shared ownership.

use crate::error::{PdfError, Result};
use bytes::Bytes;
use indexmap::IndexMap;
use std::fmt;

/// Dictionary storage. Insertion order carries no meaning in PDF but is kept
/// so that serialization is deterministic.
pub type Dict = IndexMap<String, PDFObject>;

/// PDF Object types - the fundamental value type in PDF.
#[derive(Debug, Clone, PartialEq)]
pub enum PDFObject {
    /// Null object
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Real (floating point) value
    Real(f64),
    /// Name object (e.g., /Type, /Font)
    Name(String),
    /// String (byte array)
    String(Vec<u8>),
    /// Array of objects
    Array(Vec<Self>),
    /// Dictionary (name -> object mapping)
    Dict(Dict),
    /// Stream (dictionary + binary data)
    Stream(Box<PDFStream>),
    /// Indirect object reference
    Ref(ObjectId),
}

impl PDFObject {
    /// Check if this is a null object
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if this is a stream object
    pub const fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Get as boolean
    pub const fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(PdfError::TypeError {
                expected: "bool",
                got: self.type_name(),
            }),
        }
    }

    /// Get as integer
    pub const fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            _ => Err(PdfError::TypeError {
                expected: "int",
                got: self.type_name(),
            }),
        }
    }

    /// Get numeric value (int or real coerced to f64)
    pub const fn as_num(&self) -> Result<f64> {
        match self {
            Self::Int(n) => Ok(*n as f64),
            Self::Real(n) => Ok(*n),
            _ => Err(PdfError::TypeError {
                expected: "number",
                got: self.type_name(),
            }),
        }
    }

    /// Get as name string
    pub fn as_name(&self) -> Result<&str> {
        match self {
            Self::Name(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "name",
                got: self.type_name(),
            }),
        }
    }

    /// Get as byte string
    pub fn as_string(&self) -> Result<&[u8]> {
        match self {
            Self::String(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "string",
                got: self.type_name(),
            }),
        }
    }

    /// Get as array
    pub const fn as_array(&self) -> Result<&Vec<Self>> {
        match self {
            Self::Array(arr) => Ok(arr),
            _ => Err(PdfError::TypeError {
                expected: "array",
                got: self.type_name(),
            }),
        }
    }

    /// Get as dictionary. Streams answer with their attribute dictionary.
    pub fn as_dict(&self) -> Result<&Dict> {
        match self {
            Self::Dict(d) => Ok(d),
            Self::Stream(s) => Ok(&s.attrs),
            _ => Err(PdfError::TypeError {
                expected: "dict",
                got: self.type_name(),
            }),
        }
    }

    /// Get as mutable dictionary. Streams answer with their attribute dictionary.
    pub fn as_dict_mut(&mut self) -> Result<&mut Dict> {
        match self {
            Self::Dict(d) => Ok(d),
            Self::Stream(s) => Ok(&mut s.attrs),
            _ => Err(PdfError::TypeError {
                expected: "dict",
                got: self.type_name(),
            }),
        }
    }

    /// Get as stream
    pub fn as_stream(&self) -> Result<&PDFStream> {
        match self {
            Self::Stream(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "stream",
                got: self.type_name(),
            }),
        }
    }

    /// Get as object reference
    pub const fn as_ref(&self) -> Result<ObjectId> {
        match self {
            Self::Ref(r) => Ok(*r),
            _ => Err(PdfError::TypeError {
                expected: "ref",
                got: self.type_name(),
            }),
        }
    }

    /// Name of the `/Type` entry, if this is a dictionary or stream carrying one.
    pub fn type_entry(&self) -> Option<&str> {
        self.as_dict()
            .ok()
            .and_then(|d| d.get("Type"))
            .and_then(|t| t.as_name().ok())
    }

    /// Visit every reference held directly or nested inside this object.
    pub fn for_each_ref(&self, f: &mut impl FnMut(ObjectId)) {
        match self {
            Self::Ref(r) => f(*r),
            Self::Array(arr) => arr.iter().for_each(|o| o.for_each_ref(f)),
            Self::Dict(d) => d.values().for_each(|o| o.for_each_ref(f)),
            Self::Stream(s) => s.attrs.values().for_each(|o| o.for_each_ref(f)),
            _ => {}
        }
    }

    /// Rewrite every reference in place.
    pub fn map_refs(&mut self, f: &mut impl FnMut(ObjectId) -> Self) {
        match self {
            Self::Ref(r) => *self = f(*r),
            Self::Array(arr) => arr.iter_mut().for_each(|o| o.map_refs(f)),
            Self::Dict(d) => d.values_mut().for_each(|o| o.map_refs(f)),
            Self::Stream(s) => s.attrs.values_mut().for_each(|o| o.map_refs(f)),
            _ => {}
        }
    }

    /// Get type name for error messages
    const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::Name(_) => "name",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Dict(_) => "dict",
            Self::Stream(_) => "stream",
            Self::Ref(_) => "ref",
        }
    }
}

impl From<Dict> for PDFObject {
    fn from(d: Dict) -> Self {
        Self::Dict(d)
    }
}

impl From<ObjectId> for PDFObject {
    fn from(id: ObjectId) -> Self {
        Self::Ref(id)
    }
}

impl From<i64> for PDFObject {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<PDFStream> for PDFObject {
    fn from(s: PDFStream) -> Self {
        Self::Stream(Box::new(s))
    }
}

/// Identity of an indirect object: (object number, generation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    /// Object number
    pub objid: u32,
    /// Generation number
    pub genno: u16,
}

impl ObjectId {
    /// Create a new object id.
    pub const fn new(objid: u32, genno: u16) -> Self {
        Self { objid, genno }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.objid, self.genno)
    }
}

/// PDF Stream - dictionary attributes + still-filtered payload.
///
/// `attrs` never holds `/Length`; the serializer derives it from `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct PDFStream {
    /// Stream dictionary attributes
    pub attrs: Dict,
    /// Raw payload, encoded with the filter chain named in `attrs`
    data: Bytes,
}

impl PDFStream {
    /// Create a new stream.
    pub fn new(mut attrs: Dict, data: impl Into<Bytes>) -> Self {
        attrs.shift_remove("Length");
        Self {
            attrs,
            data: data.into(),
        }
    }

    /// Get raw (still filtered) data.
    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Replace the payload. The caller is responsible for keeping
    /// `/Filter` consistent with the new bytes.
    pub fn set_data(&mut self, data: impl Into<Bytes>) {
        self.data = data.into();
    }

    /// Get attribute by name.
    pub fn get(&self, name: &str) -> Option<&PDFObject> {
        self.attrs.get(name)
    }

    /// Filter names in application order. Missing filter means an empty chain;
    /// a malformed `/Filter` entry yields `None`.
    pub fn filter_names(&self) -> Option<Vec<&str>> {
        match self.attrs.get("Filter") {
            None | Some(PDFObject::Null) => Some(Vec::new()),
            Some(PDFObject::Name(n)) => Some(vec![n.as_str()]),
            Some(PDFObject::Array(arr)) => arr.iter().map(|o| o.as_name().ok()).collect(),
            Some(_) => None,
        }
    }

    /// Decode parameters aligned with [`Self::filter_names`].
    pub fn decode_parms(&self) -> Vec<Option<&Dict>> {
        match self.attrs.get("DecodeParms") {
            Some(PDFObject::Dict(d)) => vec![Some(d)],
            Some(PDFObject::Array(arr)) => arr
                .iter()
                .map(|o| match o {
                    PDFObject::Dict(d) => Some(d),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Build a [`Dict`] from `name => value` pairs.
#[macro_export]
macro_rules! dict {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut d = $crate::model::objects::Dict::new();
        $(d.insert(String::from($key), $crate::model::objects::PDFObject::from($value));)*
        d
    }};
}

/// Convenience constructor for a name object.
pub fn name(s: &str) -> PDFObject {
    PDFObject::Name(s.to_string())
}
