use regex::Regex;
use std::fmt::Write;
use std::str::CharIndices;
use std::sync::LazyLock;

use crate::{Error, ErrorKind, Result};

pub(crate) fn is_unreserved(c: char) -> bool {
    matches!(c, 'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' | '_' | '~')
}

pub(crate) fn is_reserved(c: char) -> bool {
    matches!(
        c,
        ':' | '/'
            | '?'
            | '#'
            | '['
            | ']'
            | '@'
            | '!'
            | '$'
            | '&'
            | '\''
            | '('
            | ')'
            | '*'
            | '+'
            | ','
            | ';'
            | '='
    )
}

/// Characters left literal by component encoding.
///
/// `!` is deliberately absent so that it is written as `%21`.
fn is_component_safe(c: char) -> bool {
    is_unreserved(c) || matches!(c, '*' | '\'' | '(' | ')')
}

fn encode_char(ch: char, out: &mut String) {
    for b in ch.encode_utf8(&mut [0; 4]).as_bytes() {
        write!(out, "%{b:02X}").unwrap();
    }
}

/// Encodes everything outside the component-safe set.
pub(crate) fn encode_component(s: &str, out: &mut String) {
    for ch in s.chars() {
        if is_component_safe(ch) {
            out.push(ch);
        } else {
            encode_char(ch, out);
        }
    }
}

static DOUBLE_ENCODED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("%25([0-9A-Fa-f]{2})").unwrap());

/// Encodes only what may not appear literally in a URI.
///
/// Existing `%XX` triplets in the input survive as-is.
pub(crate) fn encode_reserved(s: &str, out: &mut String) {
    let mut encoded = String::with_capacity(s.len());
    for ch in s.chars() {
        if is_unreserved(ch) || is_reserved(ch) {
            encoded.push(ch);
        } else {
            encode_char(ch, &mut encoded);
        }
    }
    out.push_str(&DOUBLE_ENCODED.replace_all(&encoded, "%$1"));
}

struct Decoder<'a> {
    source: &'a str,
    source_index: usize,
    out: String,
    bytes: Vec<u8>,
}
impl<'a> Decoder<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            source_index: 0,
            out: String::new(),
            bytes: Vec::new(),
        }
    }
    fn push_char(&mut self, ch: char) -> Result<()> {
        self.commit_bytes()?;
        self.source_index += ch.len_utf8();
        self.out.push(ch);
        Ok(())
    }
    fn push_byte(&mut self, b: u8) {
        self.bytes.push(b);
    }
    fn commit_bytes(&mut self) -> Result<()> {
        for chunk in self.bytes.utf8_chunks() {
            let valid = chunk.valid();
            self.source_index += valid.len() * 3;
            self.out.push_str(valid);
            if !chunk.invalid().is_empty() {
                return Err(Error::new(
                    self.source,
                    self.source_index,
                    ErrorKind::InvalidUtf8,
                ));
            }
        }
        self.bytes.clear();
        Ok(())
    }
    fn build(mut self) -> Result<String> {
        self.commit_bytes()?;
        Ok(self.out)
    }
}

/// Percent-decodes every escape in `s`.
///
/// A `%` that does not start a two-digit hex escape, or escapes that do not
/// form UTF-8, are errors. `+` is left alone.
pub(crate) fn decode_component(s: &str) -> Result<String> {
    let mut out = Decoder::new(s);
    for d in DecodedIter::new(s) {
        match d {
            Decoded::Char { index, ch: '%' } => {
                return Err(Error::new(s, index, ErrorKind::InvalidPercentEncoding));
            }
            Decoded::Char { ch, .. } => out.push_char(ch)?,
            Decoded::Byte { b, .. } => out.push_byte(b),
        }
    }
    out.build()
}

fn to_u8(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8 - b'0'),
        'a'..='f' => Some(c as u8 - b'a' + 10),
        'A'..='F' => Some(c as u8 - b'A' + 10),
        _ => None,
    }
}

#[derive(Clone, Copy)]
enum Decoded {
    Char { index: usize, ch: char },
    Byte { b: u8 },
}

#[derive(Clone)]
struct DecodedIter<'a> {
    chars_indices: CharIndices<'a>,
}
impl<'a> DecodedIter<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars_indices: source.char_indices(),
        }
    }
}
impl Iterator for DecodedIter<'_> {
    type Item = Decoded;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, ch) = self.chars_indices.next()?;
        if ch == '%' {
            let this = self.clone();
            if let Some(b) = next_decoded_u8(&mut self.chars_indices) {
                Some(Decoded::Byte { b })
            } else {
                *self = this;
                Some(Decoded::Char { index, ch: '%' })
            }
        } else {
            Some(Decoded::Char { index, ch })
        }
    }
}

fn next_decoded_u8(chars_indices: &mut CharIndices) -> Option<u8> {
    let c0 = next_hex(chars_indices)?;
    let c1 = next_hex(chars_indices)?;
    Some(c0 * 16 + c1)
}
fn next_hex(chars_indices: &mut CharIndices) -> Option<u8> {
    let (_, c) = chars_indices.next()?;
    to_u8(c)
}
