//! RunLength stream decoder.

use crate::error::{PdfError, Result};

/// Decode RunLength-encoded data.
///
/// - Length byte 0-127: copy next (length + 1) bytes literally
/// - Length byte 128: end of data
/// - Length byte 129-255: repeat next byte (257 - length) times
///
/// A run cut short by the end of input is an error with `strict` and is
/// dropped otherwise.
pub fn rldecode(data: &[u8], strict: bool) -> Result<Vec<u8>> {
    let mut result = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let length = data[i];
        i += 1;

        match length {
            128 => break,
            0..=127 => {
                let count = length as usize + 1;
                if i + count <= data.len() {
                    result.extend_from_slice(&data[i..i + count]);
                    i += count;
                } else if strict {
                    return Err(PdfError::DecodeError("truncated RunLength literal".into()));
                } else {
                    break;
                }
            }
            129..=255 => {
                if let Some(&byte) = data.get(i) {
                    result.extend(std::iter::repeat_n(byte, 257 - length as usize));
                    i += 1;
                } else if strict {
                    return Err(PdfError::DecodeError("truncated RunLength repeat".into()));
                }
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_literal_and_repeat_runs() {
        let data = [2, b'a', b'b', b'c', 253, b'x', 128, 9, 9];
        assert_eq!(rldecode(&data, true).unwrap(), b"abcxxxx");
    }

    #[test]
    fn truncated_runs_fail_only_when_strict() {
        let data = [5, b'a'];
        assert!(rldecode(&data, true).is_err());
        assert_eq!(rldecode(&data, false).unwrap(), b"");
    }
}
