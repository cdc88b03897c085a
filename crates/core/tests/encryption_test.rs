mod common;

use common::{
    Scheme, count_matches, decoded_pages, encrypted_pdf, encrypted_pdf_with, info_title,
    plain_text_of_encrypted,
};
use pdfpack_core::document::decode;
use pdfpack_core::{CompressOptions, PdfError, compress, compress_with_report, unlock};

fn with_password(password: &str) -> CompressOptions {
    CompressOptions {
        password: Some(password.to_string()),
        ..CompressOptions::default()
    }
}

#[test]
fn wrong_password_is_rejected() {
    let input = encrypted_pdf("open sesame", "owner");
    let err = compress(&input, &with_password("guess")).unwrap_err();
    assert!(matches!(err, PdfError::WrongPassword));

    // No password means the empty user password
    let err = compress(&input, &CompressOptions::default()).unwrap_err();
    assert!(matches!(err, PdfError::WrongPassword));
}

#[test]
fn user_and_owner_passwords_both_open() {
    let input = encrypted_pdf("open sesame", "owner");
    for password in ["open sesame", "owner"] {
        let outcome = compress_with_report(&input, &with_password(password)).unwrap();
        assert!(outcome.report.encrypted);
        assert_eq!(decoded_pages(&outcome.bytes, None), plain_text_of_encrypted());
    }
}

#[test]
fn empty_user_password_needs_no_password() {
    let input = encrypted_pdf("", "owner");
    let output = compress(&input, &CompressOptions::default()).unwrap();
    assert_eq!(decoded_pages(&output, None), plain_text_of_encrypted());
}

#[test]
fn output_is_decrypted() {
    let input = encrypted_pdf("", "owner");
    let output = compress(&input, &CompressOptions::default()).unwrap();
    assert_eq!(count_matches(&output, b"/Encrypt"), 0);

    let (doc, info) = decode(&output, None).unwrap();
    assert!(!info.encrypted);
    assert_eq!(info_title(&doc).as_deref(), Some(&b"Secret report"[..]));
}

#[test]
fn unlock_writes_a_plain_classic_file() {
    let input = encrypted_pdf("pw", "owner");
    assert!(matches!(unlock(&input, None), Err(PdfError::WrongPassword)));

    let output = unlock(&input, Some("pw")).unwrap();
    assert!(output.starts_with(b"%PDF-1.4\n"));
    assert_eq!(count_matches(&output, b"/Encrypt"), 0);
    assert_eq!(count_matches(&output, b"/ObjStm"), 0);
    assert_eq!(count_matches(&output, b"/Linearized"), 0);
    assert_eq!(decoded_pages(&output, None), plain_text_of_encrypted());
}

#[test]
fn aes_documents_decode_to_the_plain_pages() {
    for scheme in [Scheme::AesV2, Scheme::AesV3] {
        let input = encrypted_pdf_with(scheme, "user", "owner");
        assert_eq!(
            decoded_pages(&input, Some("user")),
            plain_text_of_encrypted(),
            "{:?}",
            scheme
        );

        let (doc, info) = decode(&input, Some("owner")).unwrap();
        assert!(info.encrypted);
        assert_eq!(info_title(&doc).as_deref(), Some(&b"Secret report"[..]), "{:?}", scheme);

        assert!(matches!(decode(&input, Some("intruder")), Err(PdfError::WrongPassword)));
    }
}

#[test]
fn aes_documents_compress_to_plain_output() {
    for scheme in [Scheme::AesV2, Scheme::AesV3] {
        let input = encrypted_pdf_with(scheme, "", "owner");
        let output = compress(&input, &CompressOptions::default()).unwrap();
        assert_eq!(count_matches(&output, b"/Encrypt"), 0);
        assert_eq!(decoded_pages(&output, None), plain_text_of_encrypted(), "{:?}", scheme);
    }
}
