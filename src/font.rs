//! Font-encoding decoder (spec §4.8): turns the raw character codes a
//! content stream shows through `Tj`/`TJ` into Unicode text, using
//! whichever of ToUnicode / Differences / BaseEncoding the font dictionary
//! supplies, in that priority order.

use std::collections::HashMap;

use crate::encodings;
use crate::error::Result;
use crate::object::{Dictionary, Object};
use crate::parser::content_stream_tokens;

/// Per-font lookup table built once from the font dictionary (spec §3,
/// entity `FontDecoder`). Lookup priority: ToUnicode > Differences >
/// BaseEncoding > raw-byte-as-Unicode.
#[derive(Debug, Clone, Default)]
pub struct FontDecoder {
    to_unicode: HashMap<u32, String>,
    differences: HashMap<u32, char>,
    base_encoding: Option<BaseEncoding>,
    two_byte: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseEncoding {
    WinAnsi,
    MacRoman,
    MacExpert,
    Standard,
}

impl BaseEncoding {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"WinAnsiEncoding" => Some(BaseEncoding::WinAnsi),
            b"MacRomanEncoding" => Some(BaseEncoding::MacRoman),
            b"MacExpertEncoding" => Some(BaseEncoding::MacExpert),
            b"StandardEncoding" => Some(BaseEncoding::Standard),
            _ => None,
        }
    }

    fn lookup(self, code: u8) -> Option<char> {
        match self {
            BaseEncoding::WinAnsi => encodings::win_ansi(code),
            BaseEncoding::MacRoman => encodings::mac_roman(code),
            BaseEncoding::MacExpert => encodings::mac_expert(code),
            BaseEncoding::Standard => encodings::standard(code),
        }
    }
}

impl FontDecoder {
    /// Builds a decoder from a `/Font` resource entry's dictionary, resolving
    /// `/Encoding` and (if present and already decompressed) a `/ToUnicode`
    /// CMap stream's payload.
    pub fn from_font_dict(dict: &Dictionary, to_unicode_stream: Option<&[u8]>) -> Result<Self> {
        let mut decoder = FontDecoder::default();

        match dict.get(b"Encoding") {
            Ok(Object::Name(name)) => decoder.base_encoding = BaseEncoding::from_name(name),
            Ok(Object::Dictionary(enc_dict)) => {
                if let Ok(Object::Name(name)) = enc_dict.get(b"BaseEncoding") {
                    decoder.base_encoding = BaseEncoding::from_name(name);
                }
                if let Ok(Object::Array(differences)) = enc_dict.get(b"Differences") {
                    decoder.apply_differences(differences);
                }
            }
            _ => {}
        }

        if let Some(cmap) = to_unicode_stream {
            decoder.parse_to_unicode(cmap);
        }

        Ok(decoder)
    }

    fn apply_differences(&mut self, differences: &[Object]) {
        let mut code = 0u32;
        for entry in differences {
            match entry {
                Object::Integer(n) => code = (*n).max(0) as u32,
                Object::Name(name) => {
                    if let Some(ch) = encodings::glyph_name_to_unicode(name) {
                        self.differences.insert(code, ch);
                    }
                    code += 1;
                }
                _ => {}
            }
        }
    }

    /// Parses the `beginbfchar`/`endbfchar` and `beginbfrange`/`endbfrange`
    /// blocks of a decompressed ToUnicode CMap program (spec §4.8).
    fn parse_to_unicode(&mut self, data: &[u8]) {
        let groups = content_stream_tokens(data);
        let mut i = 0;
        while i < groups.len() {
            let (operands, op) = &groups[i];
            match op.as_str() {
                "endbfchar" => {
                    for pair in operands.chunks_exact(2) {
                        if let (Some(src), Some(dst)) = (hex_code(&pair[0]), utf16be_string(&pair[1])) {
                            if src >= 256 {
                                self.two_byte = true;
                            }
                            self.to_unicode.insert(src, dst);
                        }
                    }
                }
                "endbfrange" => {
                    for triple in operands.chunks_exact(3) {
                        let (lo, hi) = match (hex_code(&triple[0]), hex_code(&triple[1])) {
                            (Some(lo), Some(hi)) => (lo, hi),
                            _ => continue,
                        };
                        if hi >= 256 || lo >= 256 {
                            self.two_byte = true;
                        }
                        match &triple[2] {
                            Object::String(bytes, _) => {
                                if let Some(start) = utf16be_codepoint(bytes) {
                                    for (offset, code) in (lo..=hi).enumerate() {
                                        if let Some(ch) = char::from_u32(start + offset as u32) {
                                            self.to_unicode.insert(code, ch.to_string());
                                        }
                                    }
                                }
                            }
                            Object::Array(dsts) => {
                                for (code, dst) in (lo..=hi).zip(dsts.iter()) {
                                    if let Some(s) = utf16be_string(dst) {
                                        self.to_unicode.insert(code, s);
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }

    /// Whether character codes in this font are two bytes wide. Only
    /// meaningful once a ToUnicode CMap has been parsed; defaults to
    /// single-byte mode otherwise, matching non-CID simple fonts.
    pub fn is_two_byte(&self) -> bool {
        self.two_byte
    }

    /// Decodes one character code, trying ToUnicode, then Differences,
    /// then the base encoding, then falling back to treating the low byte
    /// as a Unicode scalar directly.
    pub fn decode_code(&self, code: u32) -> String {
        if let Some(s) = self.to_unicode.get(&code) {
            return s.clone();
        }
        if let Some(ch) = self.differences.get(&code) {
            return ch.to_string();
        }
        if code <= 0xFF {
            if let Some(enc) = self.base_encoding {
                if let Some(ch) = enc.lookup(code as u8) {
                    return ch.to_string();
                }
            }
            return (code as u8 as char).to_string();
        }
        char::from_u32(code).map(|c| c.to_string()).unwrap_or_default()
    }

    /// Decodes a raw show-text byte string into Unicode text, splitting it
    /// into 1- or 2-byte codes per [`is_two_byte`](Self::is_two_byte).
    pub fn decode_bytes(&self, bytes: &[u8]) -> String {
        let mut out = String::new();
        if self.two_byte {
            for pair in bytes.chunks(2) {
                let code = if pair.len() == 2 {
                    ((pair[0] as u32) << 8) | pair[1] as u32
                } else {
                    pair[0] as u32
                };
                out.push_str(&self.decode_code(code));
            }
        } else {
            for &b in bytes {
                out.push_str(&self.decode_code(b as u32));
            }
        }
        out
    }
}

fn hex_code(obj: &Object) -> Option<u32> {
    match obj {
        Object::String(bytes, _) => Some(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)),
        Object::Integer(n) => Some((*n).max(0) as u32),
        _ => None,
    }
}

fn utf16be_codepoint(bytes: &[u8]) -> Option<u32> {
    if bytes.len() < 2 {
        return None;
    }
    Some(((bytes[0] as u32) << 8) | bytes[1] as u32)
}

fn utf16be_string(obj: &Object) -> Option<String> {
    let bytes = match obj {
        Object::String(bytes, _) => bytes,
        _ => return None,
    };
    let units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
    // Per spec §9 open question: multi-rune ligature mappings store only
    // the first scalar; materializing the full sequence is a product
    // decision left unresolved upstream.
    char::decode_utf16(units.into_iter())
        .next()
        .and_then(|r| r.ok())
        .map(|c| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_winansi_identity() {
        let decoder = FontDecoder {
            base_encoding: Some(BaseEncoding::WinAnsi),
            ..Default::default()
        };
        assert_eq!(decoder.decode_bytes(b"Hi"), "Hi");
    }

    #[test]
    fn to_unicode_overrides_differences() {
        let mut decoder = FontDecoder::default();
        decoder.differences.insert(65, 'Z');
        decoder.to_unicode.insert(65, "A".to_string());
        assert_eq!(decoder.decode_code(65), "A");
    }

    #[test]
    fn parses_bfchar_block() {
        let cmap = b"1 beginbfchar\n<41> <0042>\nendbfchar";
        let mut decoder = FontDecoder::default();
        decoder.parse_to_unicode(cmap);
        assert_eq!(decoder.decode_code(0x41), "B");
    }
}
