//! Codec modules for PDF stream filters and encryption.
//!
//! - `aes`: AES-CBC encryption/decryption
//! - `arcfour`: RC4
//! - `ascii85`: ASCII85 and ASCIIHex decoding
//! - `flate`: zlib inflate/deflate
//! - `lzw`: LZW decompression
//! - `predictor`: PNG and TIFF predictors
//! - `runlength`: Run-length decoding

pub mod aes;
pub mod arcfour;
pub mod ascii85;
pub mod flate;
pub mod lzw;
pub mod predictor;
pub mod runlength;

pub use aes::{aes_cbc_decrypt, aes_cbc_encrypt, pad_aes, unpad_aes};
pub use arcfour::{Arcfour, rc4};
pub use ascii85::{ascii85decode, asciihexdecode};
pub use flate::{deflate, inflate, inflate_lenient};
pub use lzw::lzwdecode;
pub use predictor::{Predictor, png_up_encode};
pub use runlength::rldecode;
