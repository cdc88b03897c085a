//! Stream filter chains.
//!
//! Maps `/Filter` names (full and abbreviated) onto codecs and runs a chain
//! over a stream payload. Only general-purpose filters are decoded; image
//! codecs are recognised so callers can leave such streams alone.

use crate::codec::{Predictor, ascii85decode, asciihexdecode, inflate, inflate_lenient, lzwdecode, rldecode};
use crate::error::{PdfError, Result};
use crate::model::{Dict, PDFStream};

/// Filters named in `/Filter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Flate,
    Lzw,
    AsciiHex,
    Ascii85,
    RunLength,
    Dct,
    Jpx,
    CcittFax,
    Jbig2,
    Crypt,
}

impl Filter {
    /// Parse a filter name, accepting inline-image abbreviations.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "FlateDecode" | "Fl" => Self::Flate,
            "LZWDecode" | "LZW" => Self::Lzw,
            "ASCIIHexDecode" | "AHx" => Self::AsciiHex,
            "ASCII85Decode" | "A85" => Self::Ascii85,
            "RunLengthDecode" | "RL" => Self::RunLength,
            "DCTDecode" | "DCT" => Self::Dct,
            "JPXDecode" => Self::Jpx,
            "CCITTFaxDecode" | "CCF" => Self::CcittFax,
            "JBIG2Decode" => Self::Jbig2,
            "Crypt" => Self::Crypt,
            _ => return None,
        })
    }

    /// True when the payload can be decoded to its exact original bytes and
    /// re-encoded without loss.
    pub const fn is_reversible(self) -> bool {
        matches!(
            self,
            Self::Flate | Self::Lzw | Self::AsciiHex | Self::Ascii85 | Self::RunLength
        )
    }
}

/// How a stream's filter chain relates to re-encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainKind<'a> {
    /// No filters: raw payload.
    Unfiltered,
    /// Every filter is reversible.
    Reversible(Vec<(Filter, Option<&'a Dict>)>),
    /// At least one image or crypt filter.
    Opaque(Filter),
    /// A filter name this engine does not know.
    Unknown(String),
    /// `/Filter` is neither a name nor an array of names.
    Malformed,
}

/// Classify the filter chain of `stream`.
pub fn classify(stream: &PDFStream) -> ChainKind<'_> {
    let Some(names) = stream.filter_names() else {
        return ChainKind::Malformed;
    };
    if names.is_empty() {
        return ChainKind::Unfiltered;
    }
    let parms = stream.decode_parms();
    let mut chain = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        let Some(filter) = Filter::from_name(name) else {
            return ChainKind::Unknown((*name).to_string());
        };
        if !filter.is_reversible() {
            return ChainKind::Opaque(filter);
        }
        chain.push((filter, parms.get(i).copied().flatten()));
    }
    ChainKind::Reversible(chain)
}

/// Run one filter over `data`.
fn apply(filter: Filter, parms: Option<&Dict>, data: &[u8], strict: bool) -> Result<Vec<u8>> {
    let out = match filter {
        Filter::Flate => {
            if strict {
                inflate(data)?
            } else {
                inflate_lenient(data)
            }
        }
        Filter::Lzw => {
            let early = parms
                .and_then(|p| p.get("EarlyChange"))
                .and_then(|v| v.as_int().ok())
                .unwrap_or(1);
            lzwdecode(data, early, strict)?
        }
        Filter::AsciiHex => return asciihexdecode(data, strict),
        Filter::Ascii85 => return ascii85decode(data, strict),
        Filter::RunLength => return rldecode(data, strict),
        other => {
            return Err(PdfError::DecodeError(format!(
                "{:?} streams are not decoded",
                other
            )));
        }
    };
    match Predictor::from_parms(parms)? {
        Some(predictor) => predictor.decode(&out, strict),
        None => Ok(out),
    }
}

/// Decode a chain of reversible filters.
pub fn decode_chain(data: &[u8], chain: &[(Filter, Option<&Dict>)], strict: bool) -> Result<Vec<u8>> {
    let mut buf = data.to_vec();
    for &(filter, parms) in chain {
        buf = apply(filter, parms, &buf, strict)?;
    }
    Ok(buf)
}

/// Fully decode a stream payload. Fails for image codecs and unknown filters.
pub fn decode_stream(stream: &PDFStream, strict: bool) -> Result<Vec<u8>> {
    match classify(stream) {
        ChainKind::Unfiltered => Ok(stream.data().to_vec()),
        ChainKind::Reversible(chain) => decode_chain(stream.data(), &chain, strict),
        ChainKind::Opaque(filter) => Err(PdfError::DecodeError(format!(
            "{:?} streams are not decoded",
            filter
        ))),
        ChainKind::Unknown(name) => Err(PdfError::DecodeError(format!("unknown filter /{}", name))),
        ChainKind::Malformed => Err(PdfError::DecodeError("malformed /Filter entry".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::deflate;
    use crate::dict;
    use crate::model::PDFObject;
    use crate::model::objects::name;

    #[test]
    fn classifies_chains() {
        let s = PDFStream::new(Dict::new(), b"raw".to_vec());
        assert_eq!(classify(&s), ChainKind::Unfiltered);

        let s = PDFStream::new(
            dict! { "Filter" => PDFObject::Array(vec![name("A85"), name("DCTDecode")]) },
            Vec::new(),
        );
        assert_eq!(classify(&s), ChainKind::Opaque(Filter::Dct));

        let s = PDFStream::new(dict! { "Filter" => name("Brotli") }, Vec::new());
        assert_eq!(classify(&s), ChainKind::Unknown("Brotli".into()));
    }

    #[test]
    fn decodes_hex_then_flate() {
        let packed = deflate(b"q 1 0 0 1 0 0 cm Q", 9).unwrap();
        let hexed = format!("{}>", hex::encode(&packed));
        let s = PDFStream::new(
            dict! { "Filter" => PDFObject::Array(vec![name("ASCIIHexDecode"), name("FlateDecode")]) },
            hexed.into_bytes(),
        );
        assert_eq!(decode_stream(&s, true).unwrap(), b"q 1 0 0 1 0 0 cm Q");
    }

    #[test]
    fn applies_png_predictor_after_flate() {
        let rows = crate::codec::png_up_encode(&[1, 0, 10, 1, 0, 20], 3);
        let s = PDFStream::new(
            dict! {
                "Filter" => name("FlateDecode"),
                "DecodeParms" => dict! { "Predictor" => 12i64, "Columns" => 3i64 },
            },
            deflate(&rows, 6).unwrap(),
        );
        assert_eq!(decode_stream(&s, true).unwrap(), vec![1, 0, 10, 1, 0, 20]);
    }
}
