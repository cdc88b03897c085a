//! Hand-assembled PDF fixtures for the integration tests.
//!
//! Files are built as text with a classic xref table whose offsets are
//! computed here, so the fixtures never depend on the writer under test.

#![allow(dead_code)]

use pdfpack_core::codec::{aes_cbc_encrypt, pad_aes, rc4};
use pdfpack_core::document::{PASSWORD_PADDING, decode};
use pdfpack_core::filters::decode_stream;
use pdfpack_core::{Document, PDFObject};
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Body of one indirect object: `(number, text between "obj" and "endobj")`.
pub type Body = (u32, Vec<u8>);

pub fn body(objid: u32, text: impl AsRef<[u8]>) -> Body {
    (objid, text.as_ref().to_vec())
}

pub fn stream_body(dict_entries: &str, data: &[u8]) -> Vec<u8> {
    let mut out = format!("<< /Length {} {} >>\nstream\n", data.len(), dict_entries).into_bytes();
    out.extend_from_slice(data);
    out.extend_from_slice(b"\nendstream");
    out
}

/// Assemble a complete file. `trailer` holds extra trailer entries; `/Size`
/// is added here.
pub fn assemble(version: &str, objects: &[Body], trailer: &str) -> Vec<u8> {
    let mut out = format!("%PDF-{}\n%\u{e2}\u{e3}\n", version).into_bytes();
    let max = objects.iter().map(|(id, _)| *id).max().unwrap_or(0);
    let mut offsets = vec![None; max as usize + 1];
    for (id, text) in objects {
        offsets[*id as usize] = Some(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
        out.extend_from_slice(text);
        out.extend_from_slice(b"\nendobj\n");
    }
    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", max + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f\r\n");
    for offset in &offsets[1..] {
        match offset {
            Some(at) => out.extend_from_slice(format!("{:010} 00000 n\r\n", at).as_bytes()),
            None => out.extend_from_slice(b"0000000000 00001 f\r\n"),
        }
    }
    out.extend_from_slice(format!("trailer\n<< /Size {} {} >>\nstartxref\n{}\n%%EOF\n", max + 1, trailer, xref_at).as_bytes());
    out
}

/// Content of page `i` (0-based). Long enough that deflate wins.
pub fn page_text(i: usize) -> Vec<u8> {
    let mut text = String::from("BT /F1 12 Tf 72 720 Td\n");
    for line in 0..12 {
        text.push_str(&format!("(Page {} line {} of the sample document) Tj 0 -14 Td\n", i + 1, line));
    }
    text.push_str("ET\n");
    text.into_bytes()
}

/// `pages` pages sharing one font, with `annots_per_page` annotation
/// dictionaries each, an Info dictionary, an XMP stream and one orphan.
///
/// Numbering: 1 catalog, 2 page tree, 3 font, 4 info, 5 metadata,
/// 6 orphan, then page, content and annotations per page.
pub fn sample_objects(pages: usize, annots_per_page: usize) -> Vec<Body> {
    let mut objects = Vec::new();
    let per_page = 2 + annots_per_page as u32;
    let page_id = |i: usize| 7 + i as u32 * per_page;

    let kids: Vec<String> = (0..pages).map(|i| format!("{} 0 R", page_id(i))).collect();
    objects.push(body(1, "<< /Type /Catalog /Pages 2 0 R /Metadata 5 0 R >>"));
    objects.push(body(
        2,
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages),
    ));
    objects.push(body(3, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>"));
    objects.push(body(4, "<< /Title (Sample document) /Producer (fixture) >>"));
    objects.push(body(
        5,
        stream_body(
            "/Type /Metadata /Subtype /XML",
            b"<?xpacket begin=\"\"?><x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/><?xpacket end=\"w\"?>",
        ),
    ));
    objects.push(body(6, "<< /Unused true >>"));

    for i in 0..pages {
        let page = page_id(i);
        let annots: Vec<String> = (0..annots_per_page as u32)
            .map(|a| format!("{} 0 R", page + 2 + a))
            .collect();
        objects.push(body(
            page,
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R /Annots [{}] >>",
                page + 1,
                annots.join(" ")
            ),
        ));
        objects.push(body(page + 1, stream_body("", &page_text(i))));
        for a in 0..annots_per_page as u32 {
            objects.push(body(
                page + 2 + a,
                format!(
                    "<< /Type /Annot /Subtype /Text /Rect [{} 10 {} 30] /Contents (note {} on page {}) >>",
                    a * 20,
                    a * 20 + 16,
                    a + 1,
                    i + 1
                ),
            ));
        }
    }
    objects
}

pub fn sample_pdf(pages: usize) -> Vec<u8> {
    assemble("1.4", &sample_objects(pages, 1), "/Root 1 0 R /Info 4 0 R")
}

/// A catalog whose page tree is empty.
pub fn empty_pdf() -> Vec<u8> {
    let objects = vec![
        body(1, "<< /Type /Catalog /Pages 2 0 R >>"),
        body(2, "<< /Type /Pages /Kids [] /Count 0 >>"),
    ];
    assemble("1.4", &objects, "/Root 1 0 R")
}

/// Decoded content of every page, in page order.
pub fn page_contents(doc: &Document) -> Vec<Vec<u8>> {
    doc.page_ids()
        .into_iter()
        .map(|page| {
            let page = doc.get(page).unwrap().as_dict().unwrap();
            let contents = doc.resolve_key(page, "Contents").unwrap();
            decode_stream(contents.as_stream().unwrap(), true).unwrap()
        })
        .collect()
}

pub fn decoded_pages(bytes: &[u8], password: Option<&str>) -> Vec<Vec<u8>> {
    let (doc, _) = decode(bytes, password).unwrap();
    page_contents(&doc)
}

/// Integer value of `/key` in the first dictionary of the file.
pub fn leading_dict_int(bytes: &[u8], key: &str) -> Option<i64> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).into_owned();
    let start = head.find("<<")?;
    let end = start + head[start..].find(">>")?;
    let dict = &head[start..end];
    let at = dict.find(&format!("/{} ", key))? + key.len() + 2;
    let digits: String = dict[at..]
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

pub fn count_matches(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

const DOC_ID: &[u8] = b"fixture-doc-id-0";
const P: i32 = -44;

/// Standard security handler configurations the fixtures can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// V 1, R 2: 40-bit RC4
    Rc4,
    /// V 4, R 4: AES-128 crypt filter
    AesV2,
    /// V 5, R 6: AES-256 crypt filter
    AesV3,
}

fn padded(password: &[u8]) -> Vec<u8> {
    let mut out = password[..password.len().min(32)].to_vec();
    out.extend_from_slice(&PASSWORD_PADDING[..32 - out.len()]);
    out
}

fn md5_object_key(file_key: &[u8], objid: u32, aes: bool) -> Vec<u8> {
    let mut material = file_key.to_vec();
    material.extend_from_slice(&objid.to_le_bytes()[..3]);
    material.extend_from_slice(&[0, 0]);
    if aes {
        material.extend_from_slice(b"sAlT");
    }
    let hash = md5::compute(&material).0;
    hash[..(file_key.len() + 5).min(16)].to_vec()
}

fn aes_payload(key: &[u8], objid: u32, plain: &[u8]) -> Vec<u8> {
    let iv = [objid as u8; 16];
    let mut out = iv.to_vec();
    out.extend(aes_cbc_encrypt(key, &iv, &pad_aes(plain)).unwrap());
    out
}

/// R3/R4 MD5 iteration: 50 extra rounds over the first `len` bytes.
fn md5_rounds(mut hash: Vec<u8>, len: usize) -> Vec<u8> {
    for _ in 0..50 {
        hash = md5::compute(&hash[..len]).0.to_vec();
    }
    hash.truncate(len);
    hash
}

/// Revision 6 password hash.
fn r6_hash(password: &[u8], salt: &[u8], vector: &[u8]) -> Vec<u8> {
    let mut k = Sha256::new()
        .chain_update(password)
        .chain_update(salt)
        .chain_update(vector)
        .finalize()
        .to_vec();
    let mut round = 0u32;
    loop {
        let block = [password, &k[..], vector].concat().repeat(64);
        let e = aes_cbc_encrypt(&k[..16], &k[16..32], &block).unwrap();
        let selector = e[..16].iter().map(|&b| u32::from(b)).sum::<u32>() % 3;
        k = match selector {
            0 => Sha256::digest(&e).to_vec(),
            1 => Sha384::digest(&e).to_vec(),
            _ => Sha512::digest(&e).to_vec(),
        };
        round += 1;
        if round >= 64 && u32::from(e[e.len() - 1]) + 32 <= round {
            break;
        }
    }
    k.truncate(32);
    k
}

/// `/Encrypt` body and per-object encryption for one scheme.
struct Security {
    dict: String,
    encrypt: Box<dyn Fn(u32, &[u8]) -> Vec<u8>>,
}

fn rc4_security(user: &str, owner: &str) -> Security {
    let owner_key = md5::compute(padded(owner.as_bytes())).0[..5].to_vec();
    let o = rc4(&owner_key, &padded(user.as_bytes()));

    let mut material = padded(user.as_bytes());
    material.extend_from_slice(&o);
    material.extend_from_slice(&P.to_le_bytes());
    material.extend_from_slice(DOC_ID);
    let file_key = md5::compute(&material).0[..5].to_vec();
    let u = rc4(&file_key, &PASSWORD_PADDING);

    Security {
        dict: format!(
            "<< /Filter /Standard /V 1 /R 2 /Length 40 /P {} /O <{}> /U <{}> >>",
            P,
            hex::encode_upper(&o),
            hex::encode_upper(&u)
        ),
        encrypt: Box::new(move |objid: u32, plain: &[u8]| rc4(&md5_object_key(&file_key, objid, false), plain)),
    }
}

fn aesv2_security(user: &str, owner: &str) -> Security {
    let owner_key = md5_rounds(md5::compute(padded(owner.as_bytes())).0.to_vec(), 16);
    let mut o = padded(user.as_bytes());
    for i in 0..20u8 {
        let round_key: Vec<u8> = owner_key.iter().map(|b| b ^ i).collect();
        o = rc4(&round_key, &o);
    }

    let mut material = padded(user.as_bytes());
    material.extend_from_slice(&o);
    material.extend_from_slice(&P.to_le_bytes());
    material.extend_from_slice(DOC_ID);
    let file_key = md5_rounds(md5::compute(&material).0.to_vec(), 16);

    let mut seed = PASSWORD_PADDING.to_vec();
    seed.extend_from_slice(DOC_ID);
    let mut u = rc4(&file_key, &md5::compute(&seed).0);
    for i in 1..20u8 {
        let round_key: Vec<u8> = file_key.iter().map(|b| b ^ i).collect();
        u = rc4(&round_key, &u);
    }
    u.extend_from_slice(&[0u8; 16]);

    Security {
        dict: format!(
            "<< /Filter /Standard /V 4 /R 4 /Length 128 /P {} /O <{}> /U <{}> \
             /CF << /StdCF << /CFM /AESV2 /Length 16 /AuthEvent /DocOpen >> >> /StmF /StdCF /StrF /StdCF >>",
            P,
            hex::encode_upper(&o),
            hex::encode_upper(&u)
        ),
        encrypt: Box::new(move |objid: u32, plain: &[u8]| {
            aes_payload(&md5_object_key(&file_key, objid, true), objid, plain)
        }),
    }
}

fn aesv3_security(user: &str, owner: &str) -> Security {
    let file_key = [0x5au8; 32];
    let zero_iv = [0u8; 16];

    let mut u = r6_hash(user.as_bytes(), b"uvsaltuv", b"");
    u.extend_from_slice(b"uvsaltuv");
    u.extend_from_slice(b"uksaltuk");
    let ue = aes_cbc_encrypt(&r6_hash(user.as_bytes(), b"uksaltuk", b""), &zero_iv, &file_key).unwrap();

    let mut o = r6_hash(owner.as_bytes(), b"ovsaltov", &u);
    o.extend_from_slice(b"ovsaltov");
    o.extend_from_slice(b"oksaltok");
    let oe = aes_cbc_encrypt(&r6_hash(owner.as_bytes(), b"oksaltok", &u), &zero_iv, &file_key).unwrap();

    Security {
        dict: format!(
            "<< /Filter /Standard /V 5 /R 6 /Length 256 /P {} /O <{}> /U <{}> /OE <{}> /UE <{}> \
             /CF << /StdCF << /CFM /AESV3 /Length 32 /AuthEvent /DocOpen >> >> /StmF /StdCF /StrF /StdCF >>",
            P,
            hex::encode_upper(&o),
            hex::encode_upper(&u),
            hex::encode_upper(&oe),
            hex::encode_upper(&ue)
        ),
        encrypt: Box::new(move |objid: u32, plain: &[u8]| aes_payload(&file_key, objid, plain)),
    }
}

/// Three-page document encrypted with the 40-bit RC4 standard handler
/// (V 1, R 2). String values and content streams are encrypted.
pub fn encrypted_pdf(user: &str, owner: &str) -> Vec<u8> {
    encrypted_pdf_with(Scheme::Rc4, user, owner)
}

/// Three pages (4/5, 6/7, 8/9), an encrypted Info title (10) and the
/// `/Encrypt` dictionary (11), encrypted under `scheme`.
pub fn encrypted_pdf_with(scheme: Scheme, user: &str, owner: &str) -> Vec<u8> {
    let security = match scheme {
        Scheme::Rc4 => rc4_security(user, owner),
        Scheme::AesV2 => aesv2_security(user, owner),
        Scheme::AesV3 => aesv3_security(user, owner),
    };
    let version = match scheme {
        Scheme::Rc4 => "1.4",
        Scheme::AesV2 => "1.6",
        Scheme::AesV3 => "1.7",
    };

    let mut objects = vec![
        body(1, "<< /Type /Catalog /Pages 2 0 R >>"),
        body(2, "<< /Type /Pages /Kids [4 0 R 6 0 R 8 0 R] /Count 3 >>"),
        body(3, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>"),
    ];
    for i in 0..3 {
        let page = 4 + 2 * i as u32;
        objects.push(body(
            page,
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                page + 1
            ),
        ));
        let cipher = (security.encrypt)(page + 1, &page_text(i));
        objects.push(body(page + 1, stream_body("", &cipher)));
    }
    let title = (security.encrypt)(10, b"Secret report");
    objects.push(body(10, format!("<< /Title <{}> >>", hex::encode_upper(&title))));
    objects.push(body(11, security.dict));
    let trailer = format!(
        "/Root 1 0 R /Info 10 0 R /Encrypt 11 0 R /ID [<{}> <{}>]",
        hex::encode_upper(DOC_ID),
        hex::encode_upper(DOC_ID)
    );
    assemble(version, &objects, &trailer)
}

/// The same three pages without encryption.
pub fn plain_text_of_encrypted() -> Vec<Vec<u8>> {
    (0..3).map(page_text).collect()
}

pub fn info_title(doc: &Document) -> Option<Vec<u8>> {
    let info = doc.trailer.get("Info")?;
    let info = doc.resolve(info).as_dict().ok()?;
    match doc.resolve_key(info, "Title")? {
        PDFObject::String(s) => Some(s.clone()),
        _ => None,
    }
}
