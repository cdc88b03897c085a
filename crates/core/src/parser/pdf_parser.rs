//! PDF parser - converts tokens to PDF objects.
//!
//! Handles indirect references (`num num R`) with a two-token lookahead and
//! the `num num obj` header of indirect objects. Stream payloads are not read
//! here; the reader takes over after the `stream` keyword.

use super::lexer::{PSBaseParser, PSToken};
use crate::error::{PdfError, Result};
use crate::model::{Dict, ObjectId, PDFObject};

/// Nesting bound for arrays and dictionaries.
const MAX_DEPTH: usize = 512;

/// PDF Parser - parses PDF object syntax
pub struct PDFParser<'a> {
    base: PSBaseParser<'a>,
    /// Pushed-back tokens with their start offsets (top of stack is next)
    lookahead: Vec<(usize, PSToken)>,
}

impl<'a> PDFParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            base: PSBaseParser::new(data),
            lookahead: Vec::new(),
        }
    }

    /// Parser positioned at `pos`.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        let mut parser = Self::new(data);
        parser.set_pos(pos);
        parser
    }

    /// Offset of the next unconsumed token (or of the lexer cursor when
    /// nothing is pushed back).
    pub fn tell(&self) -> usize {
        self.lookahead
            .last()
            .map_or_else(|| self.base.tell(), |(pos, _)| *pos)
    }

    /// Jump to `pos`, discarding lookahead.
    pub fn set_pos(&mut self, pos: usize) {
        self.lookahead.clear();
        self.base.set_pos(pos);
    }

    /// Get next token with its start offset.
    pub fn next_token(&mut self) -> Result<Option<(usize, PSToken)>> {
        if let Some(tok) = self.lookahead.pop() {
            return Ok(Some(tok));
        }
        self.base.next_token().transpose()
    }

    /// Push token back to lookahead
    fn push_back(&mut self, pos: usize, tok: PSToken) {
        self.lookahead.push((pos, tok));
    }

    /// Parse next PDF object
    pub fn parse_object(&mut self) -> Result<PDFObject> {
        let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
        self.token_to_object(pos, token, 0)
    }

    /// Parse an indirect object header `objid genno obj`.
    pub fn parse_object_header(&mut self) -> Result<ObjectId> {
        let start = self.tell();
        let objid = self.next_int()?;
        let genno = self.next_int()?;
        match self.next_token()? {
            Some((_, PSToken::Keyword(kw))) if kw == b"obj" => {}
            _ => {
                return Err(PdfError::TokenError {
                    pos: start,
                    msg: "expected 'obj'".into(),
                });
            }
        }
        let objid = u32::try_from(objid).map_err(|_| PdfError::TokenError {
            pos: start,
            msg: format!("object number out of range: {}", objid),
        })?;
        let genno = u16::try_from(genno).map_err(|_| PdfError::TokenError {
            pos: start,
            msg: format!("generation out of range: {}", genno),
        })?;
        Ok(ObjectId::new(objid, genno))
    }

    /// Next token, which must be an integer.
    pub fn next_int(&mut self) -> Result<i64> {
        match self.next_token()? {
            Some((_, PSToken::Int(n))) => Ok(n),
            Some((pos, _)) => Err(PdfError::TokenError {
                pos,
                msg: "expected integer".into(),
            }),
            None => Err(PdfError::UnexpectedEof),
        }
    }

    /// Consume the next token if it is the keyword `kw`; returns the offset
    /// just past it.
    pub fn eat_keyword(&mut self, kw: &[u8]) -> Result<Option<usize>> {
        match self.next_token()? {
            Some((pos, PSToken::Keyword(k))) if k == kw => Ok(Some(pos + k.len())),
            Some((pos, tok)) => {
                self.push_back(pos, tok);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Convert a token to a PDF object
    fn token_to_object(&mut self, pos: usize, token: PSToken, depth: usize) -> Result<PDFObject> {
        match token {
            PSToken::Int(n) => {
                // Could be start of indirect reference: objid genno R
                if let Some((pos2, tok2)) = self.next_token()? {
                    if let PSToken::Int(m) = tok2 {
                        if let Some((pos3, tok3)) = self.next_token()? {
                            if matches!(&tok3, PSToken::Keyword(kw) if kw == b"R")
                                && let (Ok(objid), Ok(genno)) = (u32::try_from(n), u16::try_from(m))
                            {
                                return Ok(PDFObject::Ref(ObjectId::new(objid, genno)));
                            }
                            // Not R, push back both
                            self.push_back(pos3, tok3);
                        }
                        self.push_back(pos2, PSToken::Int(m));
                    } else {
                        self.push_back(pos2, tok2);
                    }
                }
                Ok(PDFObject::Int(n))
            }
            PSToken::Real(n) => Ok(PDFObject::Real(n)),
            PSToken::Bool(b) => Ok(PDFObject::Bool(b)),
            PSToken::Literal(s) => Ok(PDFObject::Name(s)),
            PSToken::String(s) => Ok(PDFObject::String(s)),
            PSToken::Keyword(kw) => {
                if depth >= MAX_DEPTH {
                    return Err(PdfError::TokenError {
                        pos,
                        msg: "nesting too deep".into(),
                    });
                }
                match kw.as_slice() {
                    b"null" => Ok(PDFObject::Null),
                    b"[" => self.parse_array(depth + 1),
                    b"<<" => self.parse_dict(pos, depth + 1),
                    // Other keywords are errors in object context
                    _ => Err(PdfError::TokenError {
                        pos,
                        msg: format!("unexpected keyword: {}", String::from_utf8_lossy(&kw)),
                    }),
                }
            }
        }
    }

    /// Parse array contents until ]
    fn parse_array(&mut self, depth: usize) -> Result<PDFObject> {
        let mut arr = Vec::new();

        loop {
            let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
            if matches!(&token, PSToken::Keyword(kw) if kw == b"]") {
                break;
            }
            arr.push(self.token_to_object(pos, token, depth)?);
        }

        Ok(PDFObject::Array(arr))
    }

    /// Parse dict contents until >>
    fn parse_dict(&mut self, start: usize, depth: usize) -> Result<PDFObject> {
        let mut dict = Dict::new();

        loop {
            let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;

            let key = match token {
                PSToken::Keyword(kw) if kw == b">>" => break,
                PSToken::Literal(name) => name,
                _ => {
                    return Err(PdfError::TokenError {
                        pos,
                        msg: format!("expected name as dict key in dictionary at {}", start),
                    });
                }
            };

            let (vpos, vtok) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
            if matches!(&vtok, PSToken::Keyword(kw) if kw == b">>") {
                // Key without a value: treat as null and close the dict
                break;
            }
            let value = self.token_to_object(vpos, vtok, depth)?;
            // Null values are equivalent to absent keys
            if !value.is_null() {
                dict.insert(key, value);
            }
        }

        Ok(PDFObject::Dict(dict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_references_inside_arrays() {
        let mut parser = PDFParser::new(b"[1 0 R 2 5 /X]");
        let obj = parser.parse_object().unwrap();
        assert_eq!(
            obj,
            PDFObject::Array(vec![
                PDFObject::Ref(ObjectId::new(1, 0)),
                PDFObject::Int(2),
                PDFObject::Int(5),
                PDFObject::Name("X".into()),
            ])
        );
    }

    #[test]
    fn dict_keeps_key_order_and_drops_nulls() {
        let mut parser = PDFParser::new(b"<< /B 1 /A null /C (x) >>");
        let obj = parser.parse_object().unwrap();
        let keys: Vec<&str> = obj.as_dict().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["B", "C"]);
    }

    #[test]
    fn tell_accounts_for_lookahead() {
        let data = b"1 0 obj 42 endobj";
        let mut parser = PDFParser::new(data);
        assert_eq!(parser.parse_object_header().unwrap(), ObjectId::new(1, 0));
        assert_eq!(parser.parse_object().unwrap(), PDFObject::Int(42));
        assert_eq!(parser.tell(), 11);
        assert_eq!(parser.eat_keyword(b"endobj").unwrap(), Some(17));
    }

    #[test]
    fn rejects_runaway_nesting() {
        let data = vec![b'['; MAX_DEPTH + 10];
        let mut parser = PDFParser::new(&data);
        assert!(parser.parse_object().is_err());
    }
}
