//! Standard security handler.
//!
//! Derives the file key from a password and decrypts strings and stream
//! payloads per object. Revisions 2-4 use the MD5/RC4 key schedule with RC4
//! or AES-128 crypt filters; revisions 5 and 6 use SHA-2 hashing with
//! AES-256.

use super::saslprep::saslprep;
use crate::codec::aes::{aes_cbc_decrypt, aes_cbc_encrypt, unpad_aes};
use crate::codec::arcfour::rc4;
use crate::error::{PdfError, Result};
use crate::model::{Dict, ObjectId, PDFObject};
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Standard 32-byte password padding string.
pub const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Per-object decryption capability.
///
/// The decoder calls through this for every string and stream payload, so
/// the rest of the pipeline never distinguishes encrypted input.
pub trait CryptHandler: Send + Sync {
    /// Decrypt a string belonging to object `id`.
    fn decrypt_string(&self, id: ObjectId, data: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt a stream payload belonging to object `id`.
    fn decrypt_stream(&self, id: ObjectId, data: &[u8], attrs: &Dict) -> Result<Vec<u8>>;
}

/// Crypt filter method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CryptMethod {
    Identity,
    /// RC4
    V2,
    /// AES-128
    AesV2,
    /// AES-256
    AesV3,
}

/// Which password unlocked the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authenticated {
    User,
    Owner,
}

/// Standard security handler state after successful authentication.
pub struct StandardSecurityHandler {
    key: Vec<u8>,
    revision: i64,
    strf: CryptMethod,
    stmf: CryptMethod,
    encrypt_metadata: bool,
    /// `/CF` dictionary, for crypt filters named by individual streams.
    crypt_filters: Option<Dict>,
    authenticated: Authenticated,
}

impl std::fmt::Debug for StandardSecurityHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardSecurityHandler")
            .field("revision", &self.revision)
            .field("strf", &self.strf)
            .field("stmf", &self.stmf)
            .field("encrypt_metadata", &self.encrypt_metadata)
            .finish_non_exhaustive()
    }
}

/// Values from the `/Encrypt` dictionary needed for R2-R4 key derivation.
struct Rc4Params<'a> {
    revision: i64,
    key_len: usize,
    o: &'a [u8],
    u: &'a [u8],
    p: u32,
    docid: &'a [u8],
    encrypt_metadata: bool,
}

impl StandardSecurityHandler {
    /// Authenticate `password` against the `/Encrypt` dictionary.
    ///
    /// `doc_id` is the first element of the trailer `/ID` array (empty when
    /// absent). Fails with `UnsupportedEncryption` for non-Standard filters or
    /// unknown (V, R) pairs and with `WrongPassword` when neither the user nor
    /// the owner password matches.
    pub fn new(encrypt: &Dict, doc_id: &[u8], password: &str) -> Result<Self> {
        let filter = encrypt
            .get("Filter")
            .and_then(|f| f.as_name().ok())
            .unwrap_or("Standard");
        if filter != "Standard" {
            return Err(PdfError::UnsupportedEncryption(format!(
                "security handler /{}",
                filter
            )));
        }

        let v = get_int(encrypt, "V").unwrap_or(0);
        let r = get_int(encrypt, "R").ok_or_else(|| {
            PdfError::UnsupportedEncryption("missing /R in encryption dictionary".into())
        })?;
        let encrypt_metadata = encrypt
            .get("EncryptMetadata")
            .and_then(|b| b.as_bool().ok())
            .unwrap_or(true);

        let cf = encrypt.get("CF").and_then(|d| d.as_dict().ok());
        let (strf, stmf) = match (v, r) {
            (1, 2) | (2, 3) => (CryptMethod::V2, CryptMethod::V2),
            (4, 4) | (5, 5) | (5, 6) => (
                crypt_method(cf, encrypt, "StrF")?,
                crypt_method(cf, encrypt, "StmF")?,
            ),
            _ => {
                return Err(PdfError::UnsupportedEncryption(format!(
                    "V={}, R={}",
                    v, r
                )));
            }
        };

        let o = get_bytes(encrypt, "O")?;
        let u = get_bytes(encrypt, "U")?;

        let (key, authenticated) = if r <= 4 {
            let key_len = match r {
                2 => 5,
                _ => {
                    let bits = get_int(encrypt, "Length").unwrap_or(if r == 4 { 128 } else { 40 });
                    (bits.clamp(40, 128) / 8) as usize
                }
            };
            let params = Rc4Params {
                revision: r,
                key_len,
                o,
                u,
                // P is a signed 32-bit field stored in its two's complement form
                p: get_int(encrypt, "P").unwrap_or(0) as u32,
                docid: doc_id,
                encrypt_metadata,
            };
            authenticate_rc4(&params, password.as_bytes())?
        } else {
            let oe = get_bytes(encrypt, "OE")?;
            let ue = get_bytes(encrypt, "UE")?;
            authenticate_aes256(r, o, u, oe, ue, password)?
        };

        Ok(Self {
            key,
            revision: r,
            strf,
            stmf,
            encrypt_metadata,
            crypt_filters: cf.cloned(),
            authenticated,
        })
    }

    /// Which password matched.
    pub fn authenticated(&self) -> Authenticated {
        self.authenticated
    }

    /// Security handler revision.
    pub fn revision(&self) -> i64 {
        self.revision
    }

    /// Object key for R2-R4: MD5(file key + objid[0..3] + genno[0..2] [+ "sAlT"]).
    fn object_key(&self, id: ObjectId, aes: bool) -> Vec<u8> {
        let mut ctx = md5::Context::new();
        ctx.consume(&self.key);
        ctx.consume(&id.objid.to_le_bytes()[..3]);
        ctx.consume(id.genno.to_le_bytes());
        if aes {
            ctx.consume(b"sAlT");
        }
        let digest = ctx.finalize();
        digest.0[..(self.key.len() + 5).min(16)].to_vec()
    }

    fn decrypt_with(&self, method: CryptMethod, id: ObjectId, data: &[u8]) -> Result<Vec<u8>> {
        match method {
            CryptMethod::Identity => Ok(data.to_vec()),
            CryptMethod::V2 => Ok(rc4(&self.object_key(id, false), data)),
            CryptMethod::AesV2 => decrypt_aes_payload(&self.object_key(id, true), data),
            CryptMethod::AesV3 => decrypt_aes_payload(&self.key, data),
        }
    }
}

impl CryptHandler for StandardSecurityHandler {
    fn decrypt_string(&self, id: ObjectId, data: &[u8]) -> Result<Vec<u8>> {
        self.decrypt_with(self.strf, id, data)
    }

    fn decrypt_stream(&self, id: ObjectId, data: &[u8], attrs: &Dict) -> Result<Vec<u8>> {
        let is_metadata = attrs.get("Type").and_then(|t| t.as_name().ok()) == Some("Metadata");
        if !self.encrypt_metadata && is_metadata {
            return Ok(data.to_vec());
        }
        // A stream-level crypt filter overrides /StmF
        let method = match stream_crypt_filter(attrs) {
            Some(name) => named_method(self.crypt_filters.as_ref(), name)?,
            None => self.stmf,
        };
        self.decrypt_with(method, id, data)
    }
}

/// IV-prefixed AES-CBC payload with PKCS#7 padding.
fn decrypt_aes_payload(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 16 {
        return Ok(Vec::new());
    }
    let (iv, ciphertext) = data.split_at(16);
    // Trailing partial blocks are dropped rather than failing the object
    let whole = ciphertext.len() - ciphertext.len() % 16;
    if whole == 0 {
        return Ok(Vec::new());
    }
    let plain = aes_cbc_decrypt(key, iv, &ciphertext[..whole])?;
    Ok(unpad_aes(&plain).to_vec())
}

/// Crypt filter named by a stream whose first filter is `/Crypt`.
///
/// The name comes from the matching `/DecodeParms` entry and defaults to
/// `Identity`.
pub(crate) fn stream_crypt_filter(attrs: &Dict) -> Option<&str> {
    let parms = match attrs.get("Filter")? {
        PDFObject::Name(n) if n == "Crypt" => attrs.get("DecodeParms"),
        PDFObject::Array(filters) if filters.first().and_then(|f| f.as_name().ok()) == Some("Crypt") => {
            match attrs.get("DecodeParms") {
                Some(PDFObject::Array(parms)) => parms.first(),
                other => other,
            }
        }
        _ => return None,
    };
    Some(
        parms
            .and_then(|p| p.as_dict().ok())
            .and_then(|p| p.get("Name"))
            .and_then(|n| n.as_name().ok())
            .unwrap_or("Identity"),
    )
}

fn crypt_method(cf: Option<&Dict>, encrypt: &Dict, entry: &str) -> Result<CryptMethod> {
    let name = encrypt
        .get(entry)
        .and_then(|n| n.as_name().ok())
        .unwrap_or("Identity");
    named_method(cf, name)
}

/// Method of the crypt filter `name` in `/CF`.
fn named_method(cf: Option<&Dict>, name: &str) -> Result<CryptMethod> {
    if name == "Identity" {
        return Ok(CryptMethod::Identity);
    }
    let filter = cf
        .and_then(|cf| cf.get(name))
        .and_then(|f| f.as_dict().ok())
        .ok_or_else(|| {
            PdfError::UnsupportedEncryption(format!("crypt filter /{} not found in /CF", name))
        })?;
    match filter.get("CFM").and_then(|m| m.as_name().ok()).unwrap_or("None") {
        "None" => Ok(CryptMethod::Identity),
        "V2" => Ok(CryptMethod::V2),
        "AESV2" => Ok(CryptMethod::AesV2),
        "AESV3" => Ok(CryptMethod::AesV3),
        other => Err(PdfError::UnsupportedEncryption(format!(
            "crypt filter method /{}",
            other
        ))),
    }
}

fn get_int(dict: &Dict, key: &str) -> Option<i64> {
    dict.get(key).and_then(|v| v.as_int().ok())
}

fn get_bytes<'a>(dict: &'a Dict, key: &str) -> Result<&'a [u8]> {
    dict.get(key)
        .and_then(|v| v.as_string().ok())
        .ok_or_else(|| {
            PdfError::UnsupportedEncryption(format!("missing /{} in encryption dictionary", key))
        })
}

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = PASSWORD_PADDING;
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PASSWORD_PADDING[..32 - len]);
    padded
}

/// Algorithm 2: file key from a (user) password.
fn rc4_file_key(params: &Rc4Params<'_>, password: &[u8]) -> Vec<u8> {
    let mut ctx = md5::Context::new();
    ctx.consume(pad_password(password));
    ctx.consume(params.o);
    ctx.consume(params.p.to_le_bytes());
    ctx.consume(params.docid);
    if params.revision >= 4 && !params.encrypt_metadata {
        ctx.consume([0xFF; 4]);
    }
    let mut hash = ctx.finalize().0.to_vec();
    let n = params.key_len;
    if params.revision >= 3 {
        for _ in 0..50 {
            hash = md5::compute(&hash[..n]).0.to_vec();
        }
    }
    hash.truncate(n);
    hash
}

/// Algorithms 4 and 5: expected /U for a file key.
fn rc4_u_value(params: &Rc4Params<'_>, key: &[u8]) -> Vec<u8> {
    if params.revision == 2 {
        return rc4(key, &PASSWORD_PADDING);
    }
    let mut ctx = md5::Context::new();
    ctx.consume(PASSWORD_PADDING);
    ctx.consume(params.docid);
    let mut result = rc4(key, &ctx.finalize().0);
    for i in 1..20u8 {
        let round_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
        result = rc4(&round_key, &result);
    }
    result
}

/// Algorithm 6: does `password` open the document as user?
fn rc4_check_user(params: &Rc4Params<'_>, password: &[u8]) -> Option<Vec<u8>> {
    let key = rc4_file_key(params, password);
    let expected = rc4_u_value(params, &key);
    let matches = if params.revision == 2 {
        params.u.len() >= 32 && expected[..] == params.u[..32]
    } else {
        params.u.len() >= 16 && expected[..16] == params.u[..16]
    };
    matches.then_some(key)
}

/// Algorithm 7 helper: RC4 key derived from the owner password.
fn rc4_owner_key(params: &Rc4Params<'_>, owner_password: &[u8]) -> Vec<u8> {
    let mut hash = md5::compute(pad_password(owner_password)).0.to_vec();
    if params.revision >= 3 {
        for _ in 0..50 {
            hash = md5::compute(&hash).0.to_vec();
        }
    }
    hash.truncate(params.key_len);
    hash
}

fn authenticate_rc4(params: &Rc4Params<'_>, password: &[u8]) -> Result<(Vec<u8>, Authenticated)> {
    if let Some(key) = rc4_check_user(params, password) {
        return Ok((key, Authenticated::User));
    }

    // Owner password: decrypt /O to recover the user password, then retry
    let owner_key = rc4_owner_key(params, password);
    let user_password = if params.revision == 2 {
        rc4(&owner_key, params.o)
    } else {
        let mut result = params.o.to_vec();
        for i in (0..20u8).rev() {
            let round_key: Vec<u8> = owner_key.iter().map(|b| b ^ i).collect();
            result = rc4(&round_key, &result);
        }
        result
    };
    rc4_check_user(params, &user_password)
        .map(|key| (key, Authenticated::Owner))
        .ok_or(PdfError::WrongPassword)
}

fn authenticate_aes256(
    revision: i64,
    o: &[u8],
    u: &[u8],
    oe: &[u8],
    ue: &[u8],
    password: &str,
) -> Result<(Vec<u8>, Authenticated)> {
    if o.len() < 48 || u.len() < 48 || oe.len() < 32 || ue.len() < 32 {
        return Err(PdfError::UnsupportedEncryption(
            "short /O, /U, /OE or /UE entry".into(),
        ));
    }
    let password = normalize_password(revision, password);
    let hash = |salt: &[u8], vector: Option<&[u8]>| password_hash(revision, &password, salt, vector);

    let u48 = &u[..48];
    if hash(&o[32..40], Some(u48))? == o[..32] {
        let key = aes_cbc_decrypt(&hash(&o[40..48], Some(u48))?, &[0u8; 16], &oe[..32])?;
        return Ok((key, Authenticated::Owner));
    }
    if hash(&u[32..40], None)? == u[..32] {
        let key = aes_cbc_decrypt(&hash(&u[40..48], None)?, &[0u8; 16], &ue[..32])?;
        return Ok((key, Authenticated::User));
    }
    Err(PdfError::WrongPassword)
}

/// R6 passwords go through SASLprep; both revisions truncate to 127 bytes.
fn normalize_password(revision: i64, password: &str) -> Vec<u8> {
    let prepared = if revision == 6 {
        saslprep(password).unwrap_or_else(|_| password.to_string())
    } else {
        password.to_string()
    };
    let mut bytes = prepared.into_bytes();
    bytes.truncate(127);
    bytes
}

fn password_hash(revision: i64, password: &[u8], salt: &[u8], vector: Option<&[u8]>) -> Result<Vec<u8>> {
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(salt);
    if let Some(v) = vector {
        hasher.update(v);
    }
    let digest = hasher.finalize().to_vec();
    if revision == 5 {
        Ok(digest)
    } else {
        r6_hash(password, digest, vector.unwrap_or(&[]))
    }
}

/// Algorithm 2.B: iterated SHA-2/AES hash for revision 6.
fn r6_hash(password: &[u8], mut k: Vec<u8>, vector: &[u8]) -> Result<Vec<u8>> {
    let mut round = 0u32;
    loop {
        let mut block = Vec::with_capacity(password.len() + k.len() + vector.len());
        block.extend_from_slice(password);
        block.extend_from_slice(&k);
        block.extend_from_slice(vector);
        let k1 = block.repeat(64);

        let e = aes_cbc_encrypt(&k[..16], &k[16..32], &k1)?;
        // 256 is 1 mod 3, so the byte sum mod 3 equals the 128-bit value mod 3
        let selector = e[..16].iter().map(|&b| u32::from(b)).sum::<u32>() % 3;
        k = match selector {
            0 => Sha256::digest(&e).to_vec(),
            1 => Sha384::digest(&e).to_vec(),
            _ => Sha512::digest(&e).to_vec(),
        };

        round += 1;
        let last = u32::from(e[e.len() - 1]);
        if round >= 64 && last + 32 <= round {
            break;
        }
    }
    k.truncate(32);
    Ok(k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;

    const DOC_ID: &[u8] = b"0123456789abcdef";

    /// Build an R3 /Encrypt dictionary for the given passwords.
    fn rc4_encrypt_dict(user: &str, owner: &str) -> (Dict, Vec<u8>) {
        let mut params = Rc4Params {
            revision: 3,
            key_len: 16,
            o: &[],
            u: &[],
            p: -4i32 as u32,
            docid: DOC_ID,
            encrypt_metadata: true,
        };
        let owner_key = rc4_owner_key(&params, owner.as_bytes());
        let mut o = pad_password(user.as_bytes()).to_vec();
        for i in 0..20u8 {
            let round_key: Vec<u8> = owner_key.iter().map(|b| b ^ i).collect();
            o = rc4(&round_key, &o);
        }
        params.o = &o;
        let key = rc4_file_key(&params, user.as_bytes());
        let mut u = rc4_u_value(&params, &key);
        u.extend_from_slice(&[0u8; 16]);
        let encrypt = dict! {
            "Filter" => PDFObject::Name("Standard".into()),
            "V" => 2i64,
            "R" => 3i64,
            "Length" => 128i64,
            "P" => -4i64,
            "O" => PDFObject::String(o.clone()),
            "U" => PDFObject::String(u),
        };
        (encrypt, key)
    }

    #[test]
    fn rc4_user_and_owner_passwords() {
        let (encrypt, key) = rc4_encrypt_dict("", "secret");
        let user = StandardSecurityHandler::new(&encrypt, DOC_ID, "").unwrap();
        assert_eq!(user.authenticated(), Authenticated::User);
        assert_eq!(user.key, key);

        let owner = StandardSecurityHandler::new(&encrypt, DOC_ID, "secret").unwrap();
        assert_eq!(owner.authenticated(), Authenticated::Owner);
        assert_eq!(owner.key, key);
    }

    #[test]
    fn rc4_wrong_password() {
        let (encrypt, _) = rc4_encrypt_dict("open", "secret");
        let err = StandardSecurityHandler::new(&encrypt, DOC_ID, "nope").unwrap_err();
        assert!(matches!(err, PdfError::WrongPassword));
    }

    #[test]
    fn rc4_object_strings_roundtrip() {
        let (encrypt, _) = rc4_encrypt_dict("", "owner");
        let handler = StandardSecurityHandler::new(&encrypt, DOC_ID, "").unwrap();
        let id = ObjectId::new(7, 0);
        let cipher = rc4(&handler.object_key(id, false), b"Hello");
        assert_eq!(handler.decrypt_string(id, &cipher).unwrap(), b"Hello");
    }

    #[test]
    fn unknown_handler_is_unsupported() {
        let encrypt = dict! { "Filter" => PDFObject::Name("Adobe.PubSec".into()), "V" => 4i64, "R" => 4i64 };
        let err = StandardSecurityHandler::new(&encrypt, DOC_ID, "").unwrap_err();
        assert!(matches!(err, PdfError::UnsupportedEncryption(_)));

        let encrypt = dict! { "V" => 3i64, "R" => 3i64 };
        let err = StandardSecurityHandler::new(&encrypt, DOC_ID, "").unwrap_err();
        assert!(matches!(err, PdfError::UnsupportedEncryption(_)));
    }

    fn aes256_encrypt_dict(revision: i64, user: &str, owner: &str, file_key: &[u8; 32]) -> Dict {
        let user_pw = normalize_password(revision, user);
        let owner_pw = normalize_password(revision, owner);

        let mut u = password_hash(revision, &user_pw, b"uvsaltuv", None).unwrap();
        u.extend_from_slice(b"uvsaltuv");
        u.extend_from_slice(b"uksaltuk");
        let ue_key = password_hash(revision, &user_pw, b"uksaltuk", None).unwrap();
        let ue = aes_cbc_encrypt(&ue_key, &[0u8; 16], file_key).unwrap();

        let mut o = password_hash(revision, &owner_pw, b"ovsaltov", Some(&u)).unwrap();
        o.extend_from_slice(b"ovsaltov");
        o.extend_from_slice(b"oksaltok");
        let oe_key = password_hash(revision, &owner_pw, b"oksaltok", Some(&u)).unwrap();
        let oe = aes_cbc_encrypt(&oe_key, &[0u8; 16], file_key).unwrap();

        let stdcf = dict! { "CFM" => PDFObject::Name("AESV3".into()), "Length" => 32i64 };
        dict! {
            "Filter" => PDFObject::Name("Standard".into()),
            "V" => 5i64,
            "R" => revision,
            "O" => PDFObject::String(o),
            "U" => PDFObject::String(u),
            "OE" => PDFObject::String(oe),
            "UE" => PDFObject::String(ue),
            "P" => -4i64,
            "CF" => dict! { "StdCF" => stdcf },
            "StmF" => PDFObject::Name("StdCF".into()),
            "StrF" => PDFObject::Name("StdCF".into()),
        }
    }

    #[test]
    fn aes256_revisions_authenticate_both_passwords() {
        let file_key = [42u8; 32];
        for revision in [5, 6] {
            let encrypt = aes256_encrypt_dict(revision, "user", "owner", &file_key);
            let user = StandardSecurityHandler::new(&encrypt, b"", "user").unwrap();
            assert_eq!(user.authenticated(), Authenticated::User);
            assert_eq!(user.key, file_key);
            let owner = StandardSecurityHandler::new(&encrypt, b"", "owner").unwrap();
            assert_eq!(owner.authenticated(), Authenticated::Owner);
            assert!(matches!(
                StandardSecurityHandler::new(&encrypt, b"", "other"),
                Err(PdfError::WrongPassword)
            ));
        }
    }

    #[test]
    fn stream_crypt_filter_selects_the_named_method() {
        let file_key = [7u8; 32];
        let mut encrypt = aes256_encrypt_dict(6, "", "owner", &file_key);
        // Strings and streams default to no encryption, StdCF is opt-in
        encrypt.insert("StmF".into(), PDFObject::Name("Identity".into()));
        let handler = StandardSecurityHandler::new(&encrypt, b"", "").unwrap();
        let id = ObjectId::new(4, 0);

        let plain = b"BT (named crypt filter) Tj ET";
        let iv = [3u8; 16];
        let mut cipher = iv.to_vec();
        cipher.extend(aes_cbc_encrypt(&file_key, &iv, &crate::codec::aes::pad_aes(plain)).unwrap());

        let named = dict! {
            "Filter" => PDFObject::Array(vec![PDFObject::Name("Crypt".into())]),
            "DecodeParms" => PDFObject::Array(vec![dict! { "Name" => PDFObject::Name("StdCF".into()) }.into()]),
        };
        assert_eq!(handler.decrypt_stream(id, &cipher, &named).unwrap(), plain);

        let identity = dict! { "Filter" => PDFObject::Name("Crypt".into()) };
        assert_eq!(handler.decrypt_stream(id, plain, &identity).unwrap(), plain);

        let missing = dict! {
            "Filter" => PDFObject::Name("Crypt".into()),
            "DecodeParms" => dict! { "Name" => PDFObject::Name("Other".into()) },
        };
        assert!(matches!(
            handler.decrypt_stream(id, &cipher, &missing),
            Err(PdfError::UnsupportedEncryption(_))
        ));
    }

    #[test]
    fn aes256_metadata_can_stay_clear() {
        let file_key = [9u8; 32];
        let mut encrypt = aes256_encrypt_dict(6, "", "owner", &file_key);
        encrypt.insert("EncryptMetadata".into(), PDFObject::Bool(false));
        let handler = StandardSecurityHandler::new(&encrypt, b"", "").unwrap();
        let attrs = dict! { "Type" => PDFObject::Name("Metadata".into()) };
        let xml = b"<x:xmpmeta/>";
        assert_eq!(
            handler.decrypt_stream(ObjectId::new(3, 0), xml, &attrs).unwrap(),
            xml
        );
    }
}
