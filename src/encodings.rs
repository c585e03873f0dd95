//! Named base encodings and the Adobe Glyph List subset used to resolve
//! `/Differences` entries (spec §4.8). Each base-encoding table maps a
//! single byte directly to the Unicode scalar a conforming reader would
//! paint for that code; the glyph-name tables exist only to resolve
//! `/Differences`, which is keyed by name rather than by code.

use std::collections::HashMap;

/// WinAnsiEncoding (Windows code page 1252), the most common `/Encoding`
/// name for non-symbolic Latin text fonts.
pub fn win_ansi(code: u8) -> Option<char> {
    Some(match code {
        0x00..=0x7F => code as char,
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        0x81 | 0x8D | 0x8F | 0x90 | 0x9D => return None,
        0xA0..=0xFF => code as char, // Latin-1 supplement is identity above 0x9F
        _ => return None,
    })
}

/// MacRomanEncoding, the classic Mac OS encoding for Western text.
pub fn mac_roman(code: u8) -> Option<char> {
    if code < 0x80 {
        return Some(code as char);
    }
    const TABLE: [char; 128] = [
        '\u{00C4}', '\u{00C5}', '\u{00C7}', '\u{00C9}', '\u{00D1}', '\u{00D6}', '\u{00DC}', '\u{00E1}', '\u{00E0}',
        '\u{00E2}', '\u{00E4}', '\u{00E3}', '\u{00E5}', '\u{00E7}', '\u{00E9}', '\u{00E8}', '\u{00EA}', '\u{00EB}',
        '\u{00ED}', '\u{00EC}', '\u{00EE}', '\u{00EF}', '\u{00F1}', '\u{00F3}', '\u{00F2}', '\u{00F4}', '\u{00F6}',
        '\u{00F5}', '\u{00FA}', '\u{00F9}', '\u{00FB}', '\u{00FC}', '\u{2020}', '\u{00B0}', '\u{00A2}', '\u{00A3}',
        '\u{00A7}', '\u{2022}', '\u{00B6}', '\u{00DF}', '\u{00AE}', '\u{00A9}', '\u{2122}', '\u{00B4}', '\u{00A8}',
        '\u{2260}', '\u{00C6}', '\u{00D8}', '\u{221E}', '\u{00B1}', '\u{2264}', '\u{2265}', '\u{00A5}', '\u{00B5}',
        '\u{2202}', '\u{2211}', '\u{220F}', '\u{03C0}', '\u{222B}', '\u{00AA}', '\u{00BA}', '\u{03A9}', '\u{00E6}',
        '\u{00F8}', '\u{00BF}', '\u{00A1}', '\u{00AC}', '\u{221A}', '\u{0192}', '\u{2248}', '\u{2206}', '\u{00AB}',
        '\u{00BB}', '\u{2026}', '\u{00A0}', '\u{00C0}', '\u{00C3}', '\u{00D5}', '\u{0152}', '\u{0153}', '\u{2013}',
        '\u{2014}', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', '\u{00F7}', '\u{25CA}', '\u{00FF}', '\u{0178}',
        '\u{2044}', '\u{20AC}', '\u{2039}', '\u{203A}', '\u{FB01}', '\u{FB02}', '\u{2021}', '\u{00B7}', '\u{201A}',
        '\u{201E}', '\u{2030}', '\u{00C2}', '\u{00CA}', '\u{00C1}', '\u{00CB}', '\u{00C8}', '\u{00CD}', '\u{00CE}',
        '\u{00CF}', '\u{00CC}', '\u{00D3}', '\u{00D4}', '\u{F8FF}', '\u{00D2}', '\u{00DA}', '\u{00DB}', '\u{00D9}',
        '\u{0131}', '\u{02C6}', '\u{02DC}', '\u{00AF}', '\u{02D8}', '\u{02D9}', '\u{02DA}', '\u{00B8}', '\u{02DD}',
        '\u{02DB}', '\u{02C7}',
    ];
    TABLE.get((code - 0x80) as usize).copied()
}

/// StandardEncoding, the implicit base encoding for non-symbolic fonts
/// without an explicit `/Encoding`.
pub fn standard(code: u8) -> Option<char> {
    match code {
        0x20..=0x7E => Some(code as char),
        0xA1 => Some('\u{00A1}'),
        0xA2 => Some('\u{00A2}'),
        0xA3 => Some('\u{00A3}'),
        0xA4 => Some('\u{2044}'),
        0xA5 => Some('\u{00A5}'),
        0xA7 => Some('\u{00A7}'),
        0xA8 => Some('\u{00A4}'),
        0xA9 => Some('\u{0027}'),
        0xAA => Some('\u{201C}'),
        0xAB => Some('\u{00AB}'),
        0xAC => Some('\u{2039}'),
        0xAD => Some('\u{203A}'),
        0xAE => Some('\u{FB01}'),
        0xAF => Some('\u{FB02}'),
        0xB1 => Some('\u{2013}'),
        0xB2 => Some('\u{2020}'),
        0xB3 => Some('\u{2021}'),
        0xB4 => Some('\u{00B7}'),
        0xB6 => Some('\u{00B6}'),
        0xB7 => Some('\u{2022}'),
        0xB8 => Some('\u{201A}'),
        0xB9 => Some('\u{201E}'),
        0xBA => Some('\u{201D}'),
        0xBB => Some('\u{00BB}'),
        0xBC => Some('\u{2026}'),
        0xBD => Some('\u{2030}'),
        0xBF => Some('\u{00BF}'),
        0xC1 => Some('\u{0060}'),
        0xC2 => Some('\u{00B4}'),
        0xC3 => Some('\u{02C6}'),
        0xC4 => Some('\u{02DC}'),
        0xC5 => Some('\u{00AF}'),
        0xC6 => Some('\u{02D8}'),
        0xC7 => Some('\u{02D9}'),
        0xC8 => Some('\u{00A8}'),
        0xCA => Some('\u{02DA}'),
        0xCB => Some('\u{00B8}'),
        0xCD => Some('\u{02DD}'),
        0xCE => Some('\u{02DB}'),
        0xCF => Some('\u{02C7}'),
        0xD0 => Some('\u{2014}'),
        0xE1 => Some('\u{00C6}'),
        0xE3 => Some('\u{00AA}'),
        0xE8 => Some('\u{0141}'),
        0xE9 => Some('\u{00D8}'),
        0xEA => Some('\u{0152}'),
        0xEB => Some('\u{00BA}'),
        0xF1 => Some('\u{00E6}'),
        0xF5 => Some('\u{0131}'),
        0xF8 => Some('\u{0142}'),
        0xF9 => Some('\u{00F8}'),
        0xFA => Some('\u{0153}'),
        0xFB => Some('\u{00DF}'),
        _ => None,
    }
}

/// MacExpertEncoding. Only used with the small set of expert fonts; no
/// standard 14 font uses it, so only the ASCII-range small-caps/old-style
/// figures that actually differ from StandardEncoding are not modeled here
/// — callers fall back to identity for bytes this table doesn't cover.
pub fn mac_expert(code: u8) -> Option<char> {
    match code {
        0x20 => Some(' '),
        0x2E => Some('.'),
        0x2C => Some(','),
        _ => None,
    }
}

/// A small, curated subset of the Adobe Glyph List: the glyph names that
/// appear in practice inside `/Differences` arrays for Latin-text PDFs,
/// plus the `uniXXXX`/`uXXXX` naming conventions (handled algorithmically
/// rather than via table lookup). The full Adobe Glyph List has roughly
/// 4,300 entries; subsetting out-of-scope (rare ligature/symbol glyphs)
/// names is an intentional limitation, not an oversight.
pub fn glyph_name_to_unicode(name: &[u8]) -> Option<char> {
    if let Some(c) = agl_table().get(name) {
        return Some(*c);
    }
    let name_str = std::str::from_utf8(name).ok()?;
    if let Some(hex) = name_str.strip_prefix("uni") {
        if hex.len() >= 4 {
            return u32::from_str_radix(&hex[..4], 16).ok().and_then(char::from_u32);
        }
    }
    if let Some(hex) = name_str.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        }
    }
    None
}

fn agl_table() -> &'static HashMap<&'static [u8], char> {
    use std::sync::OnceLock;
    static TABLE: OnceLock<HashMap<&'static [u8], char>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut m: HashMap<&'static [u8], char> = HashMap::new();
        m.insert(b"space", ' ');
        m.insert(b"exclam", '!');
        m.insert(b"quotedbl", '"');
        m.insert(b"numbersign", '#');
        m.insert(b"dollar", '$');
        m.insert(b"percent", '%');
        m.insert(b"ampersand", '&');
        m.insert(b"quotesingle", '\'');
        m.insert(b"parenleft", '(');
        m.insert(b"parenright", ')');
        m.insert(b"asterisk", '*');
        m.insert(b"plus", '+');
        m.insert(b"comma", ',');
        m.insert(b"hyphen", '-');
        m.insert(b"period", '.');
        m.insert(b"slash", '/');
        m.insert(b"zero", '0');
        m.insert(b"one", '1');
        m.insert(b"two", '2');
        m.insert(b"three", '3');
        m.insert(b"four", '4');
        m.insert(b"five", '5');
        m.insert(b"six", '6');
        m.insert(b"seven", '7');
        m.insert(b"eight", '8');
        m.insert(b"nine", '9');
        m.insert(b"colon", ':');
        m.insert(b"semicolon", ';');
        m.insert(b"less", '<');
        m.insert(b"equal", '=');
        m.insert(b"greater", '>');
        m.insert(b"question", '?');
        m.insert(b"at", '@');
        m.insert(b"bracketleft", '[');
        m.insert(b"backslash", '\\');
        m.insert(b"bracketright", ']');
        m.insert(b"asciicircum", '^');
        m.insert(b"underscore", '_');
        m.insert(b"grave", '`');
        m.insert(b"braceleft", '{');
        m.insert(b"bar", '|');
        m.insert(b"braceright", '}');
        m.insert(b"asciitilde", '~');
        m.insert(b"quoteleft", '\u{2018}');
        m.insert(b"quoteright", '\u{2019}');
        m.insert(b"quotedblleft", '\u{201C}');
        m.insert(b"quotedblright", '\u{201D}');
        m.insert(b"endash", '\u{2013}');
        m.insert(b"emdash", '\u{2014}');
        m.insert(b"bullet", '\u{2022}');
        m.insert(b"ellipsis", '\u{2026}');
        m.insert(b"fi", '\u{FB01}');
        m.insert(b"fl", '\u{FB02}');
        for c in b'A'..=b'Z' {
            let name: &'static [u8] = Box::leak(vec![c].into_boxed_slice());
            m.insert(name, c as char);
        }
        for c in b'a'..=b'z' {
            let name: &'static [u8] = Box::leak(vec![c].into_boxed_slice());
            m.insert(name, c as char);
        }
        m
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_ansi_is_ascii_identity_below_128() {
        assert_eq!(win_ansi(b'A'), Some('A'));
        assert_eq!(win_ansi(0x20), Some(' '));
    }

    #[test]
    fn glyph_name_resolves_named_and_uni_forms() {
        assert_eq!(glyph_name_to_unicode(b"space"), Some(' '));
        assert_eq!(glyph_name_to_unicode(b"A"), Some('A'));
        assert_eq!(glyph_name_to_unicode(b"uni0041"), Some('A'));
        assert_eq!(glyph_name_to_unicode(b"u1F600"), char::from_u32(0x1F600));
    }

    #[test]
    fn mac_roman_high_byte_lookup() {
        assert_eq!(mac_roman(0x80), Some('\u{00C4}'));
    }
}
