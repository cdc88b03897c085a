//! LZW stream decoder using the weezl crate.

use crate::error::{PdfError, Result};
use weezl::{BitOrder, decode::Decoder};

/// Decode LZW-encoded data (PDF variant: MSB first, 8-bit codes).
///
/// `early_change` follows the `/EarlyChange` decode parameter: 1 (the
/// default) widens codes one entry early, 0 widens them on the boundary.
/// With `strict`, corrupt input is an error; otherwise the output decoded
/// before the corruption is returned.
pub fn lzwdecode(data: &[u8], early_change: i64, strict: bool) -> Result<Vec<u8>> {
    let mut decoder = if early_change == 0 {
        Decoder::new(BitOrder::Msb, 8)
    } else {
        Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
    };
    let mut output = Vec::new();
    let status = decoder.into_vec(&mut output).decode(data).status;
    match status {
        Err(e) if strict => Err(PdfError::DecodeError(format!("LZW: {}", e))),
        _ => Ok(output),
    }
}
