//! SASLprep (RFC 4013) for revision 6 passwords.
//!
//! Mapping and prohibition follow the stringprep tables; normalization is
//! NFKC and the bidirectional rule uses Unicode bidi classes.

use crate::error::{PdfError, Result};
use unicode_bidi::{BidiClass, bidi_class};
use unicode_normalization::UnicodeNormalization;

/// RFC 3454 Table B.1: commonly mapped to nothing.
fn mapped_to_nothing(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{034F}'
            | '\u{1806}'
            | '\u{180B}'..='\u{180D}'
            | '\u{200B}'..='\u{200D}'
            | '\u{2060}'
            | '\u{FE00}'..='\u{FE0F}'
            | '\u{FEFF}'
    )
}

/// RFC 3454 Table C.1.2: non-ASCII space characters.
fn non_ascii_space(c: char) -> bool {
    matches!(
        c,
        '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200B}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

/// RFC 3454 Tables C.1.2 through C.9.
fn prohibited(c: char) -> bool {
    let cp = c as u32;
    non_ascii_space(c)
        // C.2.1 / C.2.2 control characters
        || c.is_control()
        || matches!(
            c,
            '\u{06DD}'
                | '\u{070F}'
                | '\u{180E}'
                | '\u{200C}'
                | '\u{200D}'
                | '\u{2028}'
                | '\u{2029}'
                | '\u{2060}'..='\u{2063}'
                | '\u{206A}'..='\u{206F}'
                | '\u{FEFF}'
                | '\u{FFF9}'..='\u{FFFC}'
                | '\u{1D173}'..='\u{1D17A}'
        )
        // C.3 private use
        || (0xE000..=0xF8FF).contains(&cp)
        || (0xF0000..=0xFFFFD).contains(&cp)
        || (0x100000..=0x10FFFD).contains(&cp)
        // C.4 non-character code points
        || (0xFDD0..=0xFDEF).contains(&cp)
        || (cp & 0xFFFE) == 0xFFFE
        // C.6 / C.7 inappropriate for plain text or canonical representation
        || c == '\u{FFFD}'
        || ('\u{2FF0}'..='\u{2FFB}').contains(&c)
        // C.8 change display properties
        || matches!(c, '\u{0340}' | '\u{0341}' | '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}')
        // C.9 tagging characters
        || cp == 0xE0001
        || (0xE0020..=0xE007F).contains(&cp)
}

fn is_rand_al(c: char) -> bool {
    matches!(bidi_class(c), BidiClass::R | BidiClass::AL)
}

/// Prepare a string using the SASLprep profile of stringprep.
///
/// Unassigned code points are allowed (query semantics).
pub fn saslprep(data: &str) -> Result<String> {
    let mapped: String = data
        .chars()
        .filter(|&c| !mapped_to_nothing(c))
        .map(|c| if non_ascii_space(c) { ' ' } else { c })
        .collect();
    let normalized: String = mapped.nfkc().collect();

    if let Some(c) = normalized.chars().find(|&c| prohibited(c)) {
        return Err(PdfError::SaslPrepError(format!(
            "prohibited character U+{:04X}",
            c as u32
        )));
    }

    // Strings containing right-to-left characters must start and end with
    // one and contain no left-to-right characters.
    if normalized.chars().any(is_rand_al) {
        let starts = normalized.chars().next().is_some_and(is_rand_al);
        let ends = normalized.chars().next_back().is_some_and(is_rand_al);
        let has_l = normalized.chars().any(|c| bidi_class(c) == BidiClass::L);
        if !starts || !ends || has_l {
            return Err(PdfError::SaslPrepError("failed bidirectional check".into()));
        }
    }

    Ok(normalized)
}
