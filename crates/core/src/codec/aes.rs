//! AES-CBC helpers for PDF encryption.

use crate::error::{PdfError, Result};
use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cbc::{Decryptor, Encryptor};

type Aes128CbcDec = Decryptor<aes::Aes128>;
type Aes256CbcDec = Decryptor<aes::Aes256>;
type Aes128CbcEnc = Encryptor<aes::Aes128>;
type Aes256CbcEnc = Encryptor<aes::Aes256>;

fn check_block_args(key: &[u8], iv: &[u8], data: &[u8]) -> Result<()> {
    if iv.len() != 16 {
        return Err(PdfError::DecodeError(format!(
            "AES IV must be 16 bytes, got {}",
            iv.len()
        )));
    }
    if data.len() % 16 != 0 {
        return Err(PdfError::DecodeError(format!(
            "AES data length {} is not a multiple of 16",
            data.len()
        )));
    }
    if key.len() != 16 && key.len() != 32 {
        return Err(PdfError::DecodeError(format!(
            "AES key must be 16 or 32 bytes, got {}",
            key.len()
        )));
    }
    Ok(())
}

/// Decrypt data using AES-CBC with a 128 or 256 bit key, no padding removal.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    check_block_args(key, iv, data)?;
    let mut buf = data.to_vec();
    let res = match key.len() {
        16 => Aes128CbcDec::new(key.into(), iv.into())
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map(|_| ()),
        _ => Aes256CbcDec::new(key.into(), iv.into())
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map(|_| ()),
    };
    res.map_err(|_| PdfError::DecodeError("AES decryption failed".into()))?;
    Ok(buf)
}

/// Encrypt data using AES-CBC with a 128 or 256 bit key, no padding.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    check_block_args(key, iv, data)?;
    let mut buf = data.to_vec();
    let len = data.len();
    let res = match key.len() {
        16 => Aes128CbcEnc::new(key.into(), iv.into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map(|_| ()),
        _ => Aes256CbcEnc::new(key.into(), iv.into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map(|_| ()),
    };
    res.map_err(|_| PdfError::DecodeError("AES encryption failed".into()))?;
    Ok(buf)
}

/// Remove PKCS#7 padding from AES-decrypted data.
///
/// Returns data unchanged if padding is invalid.
pub fn unpad_aes(data: &[u8]) -> &[u8] {
    let Some(&last) = data.last() else {
        return data;
    };
    let pad_len = last as usize;
    if pad_len == 0 || pad_len > 16 || pad_len > data.len() {
        return data;
    }

    let start = data.len() - pad_len;
    if data[start..].iter().all(|&b| b as usize == pad_len) {
        &data[..start]
    } else {
        data
    }
}

/// Apply PKCS#7 padding to a 16-byte boundary.
pub fn pad_aes(data: &[u8]) -> Vec<u8> {
    let pad_len = 16 - data.len() % 16;
    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    out.extend(std::iter::repeat_n(pad_len as u8, pad_len));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cbc_roundtrip_with_padding() {
        let key = [7u8; 16];
        let iv = [1u8; 16];
        let padded = pad_aes(b"hello");
        let enc = aes_cbc_encrypt(&key, &iv, &padded).unwrap();
        let dec = aes_cbc_decrypt(&key, &iv, &enc).unwrap();
        assert_eq!(unpad_aes(&dec), b"hello");
    }

    #[test]
    fn rejects_partial_blocks() {
        assert!(aes_cbc_decrypt(&[0u8; 16], &[0u8; 16], &[0u8; 15]).is_err());
        assert!(aes_cbc_decrypt(&[0u8; 20], &[0u8; 16], &[0u8; 16]).is_err());
    }

    #[test]
    fn invalid_padding_is_left_alone() {
        let data = [1u8, 2, 3, 0];
        assert_eq!(unpad_aes(&data), &data);
    }
}
