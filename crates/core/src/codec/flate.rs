//! zlib/deflate helpers over flate2.

use crate::error::{PdfError, Result};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use flate2::{Decompress, FlushDecompress, Status};
use std::io::Write;

/// Inflate a complete zlib stream. Corruption or a missing end of stream
/// is an error.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    run_inflate(data, true)
}

/// Best-effort inflate: returns whatever decompresses before the stream
/// breaks (commonly a bad checksum or a truncated tail).
pub fn inflate_lenient(data: &[u8]) -> Vec<u8> {
    run_inflate(data, false).unwrap_or_default()
}

fn run_inflate(data: &[u8], strict: bool) -> Result<Vec<u8>> {
    let mut decoder = Decompress::new(true);
    let mut out = Vec::with_capacity(data.len().saturating_mul(3).max(64));
    loop {
        if out.capacity() - out.len() < 4096 {
            out.reserve(out.capacity().max(4096));
        }
        let before_in = decoder.total_in();
        let before_out = decoder.total_out();
        let consumed = before_in as usize;
        let res = decoder.decompress_vec(&data[consumed..], &mut out, FlushDecompress::Finish);
        let stalled = decoder.total_in() == before_in && decoder.total_out() == before_out;
        match res {
            Ok(Status::StreamEnd) => return Ok(out),
            Ok(_) if !stalled => {}
            Ok(_) if strict => {
                return Err(PdfError::DecodeError(
                    "FlateDecode: unexpected end of stream".into(),
                ));
            }
            Err(e) if strict => return Err(PdfError::DecodeError(format!("FlateDecode: {}", e))),
            _ => return Ok(out),
        }
    }
}

/// Deflate `data` into a zlib stream at the given level (0-9).
pub fn deflate(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(data.len() / 2 + 64),
        Compression::new(level.min(9)),
    );
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
