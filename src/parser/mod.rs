//! Lexical primitives and the generic object reader (spec §4.1).
//!
//! The grammar is walked with `nom` combinators over byte slices wrapped in
//! [`nom_locate::LocatedSpan`] so parse failures can be reported with a
//! byte offset and a human-readable context name (`ParserInput::new_extra`'s
//! second argument). Dictionary/array grouping and string/stream payloads
//! are NOT extracted with regular expressions (see design note in spec §9):
//! every byte is walked exactly once by the combinators below.

mod lexer;
mod object;
mod xref;

pub use lexer::*;
pub use object::{content_stream_tokens, indirect_object, object};
pub use xref::xref_and_trailer;

use nom_locate::LocatedSpan;

pub type ParserInput<'a> = LocatedSpan<&'a [u8], &'static str>;

pub trait NewExtra<'a> {
    fn new_extra(input: &'a [u8], extra: &'static str) -> ParserInput<'a>;
}

impl<'a> NewExtra<'a> for ParserInput<'a> {
    fn new_extra(input: &'a [u8], extra: &'static str) -> ParserInput<'a> {
        LocatedSpan::new_extra(input, extra)
    }
}

/// Parses the leading `%PDF-M.N` header, returning the version string
/// (e.g. `"1.7"`).
pub fn header(input: ParserInput) -> Option<String> {
    let bytes = input.fragment();
    let prefix = b"%PDF-";
    if !bytes.starts_with(prefix) {
        return None;
    }
    let rest = &bytes[prefix.len()..];
    let end = rest
        .iter()
        .position(|&b| b == b'\r' || b == b'\n' || b.is_ascii_whitespace())
        .unwrap_or(rest.len());
    let version = std::str::from_utf8(&rest[..end]).ok()?;
    if version.split('.').count() == 2 && version.chars().all(|c| c.is_ascii_digit() || c == '.') {
        Some(version.to_string())
    } else {
        None
    }
}

/// Parses the binary-marker comment line (a `%` comment whose bytes are all
/// >= 0x80) that conventionally follows the header on line 2.
pub fn binary_mark(input: ParserInput) -> Option<Vec<u8>> {
    let bytes = input.fragment();
    if bytes.first() != Some(&b'%') {
        return None;
    }
    let rest = &bytes[1..];
    let end = rest.iter().position(|&b| b == b'\r' || b == b'\n').unwrap_or(rest.len());
    let mark = &rest[..end];
    if mark.len() >= 4 && mark.iter().all(|&b| b >= 0x80) {
        Some(mark.to_vec())
    } else {
        None
    }
}

/// Parses the operand of the terminal `startxref` keyword. This is the one
/// place the design notes (§9) permit scanning plain ASCII near the file
/// end rather than a full grammar combinator, since by the time we reach
/// here we already know we are looking at trailing bookkeeping text.
pub fn xref_start(input: ParserInput) -> Option<i64> {
    let bytes = input.fragment();
    if !bytes.starts_with(b"startxref") {
        return None;
    }
    let rest = skip_whitespace(&bytes[b"startxref".len()..]);
    let end = rest.iter().position(|b| !b.is_ascii_digit()).unwrap_or(rest.len());
    std::str::from_utf8(&rest[..end]).ok()?.parse().ok()
}
