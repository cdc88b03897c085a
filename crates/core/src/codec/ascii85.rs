//! ASCII85 and ASCIIHex stream decoders.

use crate::error::{PdfError, Result};
use crate::parser::lexer::hex_nibble;

const fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x00' | b'\x0c')
}

/// Decode ASCII85-encoded data (PDF variant).
///
/// Handles z-encoding, the `<~ ~>` markers, embedded whitespace and a
/// missing EOD. With `strict`, characters outside the alphabet and a
/// one-character final group are errors; otherwise they are skipped.
pub fn ascii85decode(data: &[u8], strict: bool) -> Result<Vec<u8>> {
    let data = data.strip_prefix(b"<~").unwrap_or(data);
    let data = match data.iter().position(|&b| b == b'~') {
        Some(pos) => &data[..pos],
        None => data,
    };

    let mut result = Vec::with_capacity(data.len() / 5 * 4 + 4);
    let mut group = [0u8; 5];
    let mut n = 0;

    for &byte in data {
        match byte {
            b if is_ws(b) => {}
            b'z' if n == 0 => result.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[n] = byte - b'!';
                n += 1;
                if n == 5 {
                    result.extend_from_slice(&group_value(&group)?.to_be_bytes());
                    n = 0;
                }
            }
            _ if strict => {
                return Err(PdfError::DecodeError(format!(
                    "invalid ASCII85 character {:?}",
                    byte as char
                )));
            }
            _ => {}
        }
    }

    match n {
        0 => {}
        1 if strict => {
            return Err(PdfError::DecodeError(
                "ASCII85 final group has one character".into(),
            ));
        }
        1 => {}
        _ => {
            let mut padded = [b'u' - b'!'; 5];
            padded[..n].copy_from_slice(&group[..n]);
            let bytes = group_value(&padded)?.to_be_bytes();
            result.extend_from_slice(&bytes[..n - 1]);
        }
    }

    Ok(result)
}

fn group_value(group: &[u8; 5]) -> Result<u32> {
    let value = group
        .iter()
        .fold(0u64, |acc, &digit| acc * 85 + u64::from(digit));
    u32::try_from(value).map_err(|_| PdfError::DecodeError("ASCII85 group overflow".into()))
}

/// Decode ASCIIHex-encoded data. Decoding stops at `>`; an odd final digit
/// is padded with zero.
pub fn asciihexdecode(data: &[u8], strict: bool) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len() / 2);
    let mut pending: Option<u8> = None;

    for &byte in data {
        if byte == b'>' {
            break;
        }
        match hex_nibble(byte) {
            Some(nibble) => match pending.take() {
                Some(high) => result.push((high << 4) | nibble),
                None => pending = Some(nibble),
            },
            None if is_ws(byte) || !strict => {}
            None => {
                return Err(PdfError::DecodeError(format!(
                    "invalid ASCIIHex character {:?}",
                    byte as char
                )));
            }
        }
    }

    if let Some(high) = pending {
        result.push(high << 4);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asciihex_decode_expected() {
        let decoded = asciihexdecode(b"48656c6c6f 20776f726c64>", true).unwrap();
        assert_eq!(decoded, b"Hello world");
    }

    #[test]
    fn ascii85_decode_expected() {
        let decoded = ascii85decode(b"<~87cURD]i,\"Ebo7~>", true).unwrap();
        assert_eq!(decoded, b"Hello World");
    }

    #[test]
    fn ascii85_expands_z_groups() {
        assert_eq!(ascii85decode(b"z~>", true).unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn strict_mode_rejects_garbage() {
        assert!(ascii85decode(b"87c{URD~>", true).is_err());
        assert!(ascii85decode(b"87c{URD~>", false).is_ok());
        assert!(asciihexdecode(b"4G>", true).is_err());
    }
}
