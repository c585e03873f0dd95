use std::collections::HashSet;

use super::lexer::skip_whitespace;
use super::ParserInput;
use crate::error::{Error, ParseError, Result, XrefError};
use crate::object::{Dictionary, Object};
use crate::reader::Reader;
use crate::xref::{Xref, XrefEntry, XrefType};

/// Parses one cross-reference section (legacy table or xref-stream object)
/// together with its trailer dictionary, starting at the section's offset.
pub fn xref_and_trailer(input: ParserInput, reader: &Reader) -> Result<(Xref, Dictionary)> {
    let buffer = *input.fragment();
    let start = skip_whitespace(buffer);
    if start.starts_with(b"xref") {
        parse_legacy_xref(start)
    } else {
        parse_xref_stream(buffer, reader)
    }
}

fn parse_legacy_xref(input: &[u8]) -> Result<(Xref, Dictionary)> {
    let mut cursor = &input[b"xref".len()..];
    let mut xref = Xref::new(0, XrefType::Table);

    loop {
        cursor = skip_whitespace(cursor);
        if cursor.starts_with(b"trailer") {
            cursor = skip_whitespace(&cursor[b"trailer".len()..]);
            break;
        }
        if cursor.is_empty() {
            return Err(XrefError::Start.into());
        }

        let (rest, first) = take_uint(cursor).ok_or(ParseError::InvalidXref)?;
        let cur = skip_whitespace(rest);
        let (rest, count) = take_uint(cur).ok_or(ParseError::InvalidXref)?;
        cursor = skip_whitespace(rest);

        for i in 0..count {
            cursor = skip_whitespace(cursor);
            let (rest, offset) = take_uint(cursor).ok_or(ParseError::InvalidXref)?;
            let cur = skip_whitespace(rest);
            let (rest, generation) = take_uint(cur).ok_or(ParseError::InvalidXref)?;
            let cur = skip_whitespace(rest);
            let flag = *cur.first().ok_or(ParseError::InvalidXref)?;
            cursor = &cur[1..];

            let object_number = first as u32 + i as u32;
            let entry = match flag {
                b'n' => XrefEntry::Normal { offset: offset as u32, generation: generation as u16 },
                b'f' => XrefEntry::Free { next_free: offset as u32, generation: generation as u16 },
                _ => return Err(ParseError::InvalidXref.into()),
            };
            xref.insert(object_number, entry);
        }
    }

    let (_, trailer_obj) = super::object::content_dict(cursor).ok_or(ParseError::InvalidDictionary)?;
    let Object::Dictionary(trailer) = trailer_obj else {
        return Err(ParseError::InvalidDictionary.into());
    };
    if let Ok(size) = trailer.get(b"Size").and_then(Object::as_i64) {
        xref.size = size.max(0) as u32;
    }
    Ok((xref, trailer))
}

fn parse_xref_stream(buffer: &[u8], reader: &Reader) -> Result<(Xref, Dictionary)> {
    let input = ParserInput::new_extra(buffer, "xref-stream");
    let (_, object) = super::object::indirect_object(input, 0, None, reader, &mut HashSet::new())
        .map(|(id, obj)| (id, obj))?;
    let stream = object.as_stream().map_err(|_| ParseError::InvalidXref)?;
    if !stream.dict.has_type(b"XRef") {
        return Err(ParseError::InvalidXref.into());
    }

    let widths = stream.dict.get(b"W").and_then(Object::as_array).map_err(|_| ParseError::InvalidXref)?;
    if widths.len() != 3 {
        return Err(ParseError::InvalidXref.into());
    }
    let w: Vec<usize> = widths
        .iter()
        .map(|o| o.as_i64().unwrap_or(0).max(0) as usize)
        .collect();

    let size = stream.dict.get(b"Size").and_then(Object::as_i64).unwrap_or(0).max(0) as u32;
    let index_pairs: Vec<(u32, u32)> = match stream.dict.get(b"Index").and_then(Object::as_array) {
        Ok(arr) => arr
            .chunks_exact(2)
            .filter_map(|pair| Some((pair[0].as_i64().ok()? as u32, pair[1].as_i64().ok()? as u32)))
            .collect(),
        Err(_) => vec![(0, size)],
    };

    let decoded = stream.decompressed_content().map_err(|_| XrefError::XRefDecodeFailure)?;
    let entry_width = w[0] + w[1] + w[2];
    if entry_width == 0 {
        return Err(XrefError::XRefDecodeFailure.into());
    }

    let mut xref = Xref::new(size, XrefType::Stream);
    let mut pos = 0usize;
    for (first, count) in index_pairs {
        for i in 0..count {
            if pos + entry_width > decoded.len() {
                break;
            }
            let field1 = read_be(&decoded[pos..pos + w[0]]);
            pos += w[0];
            let field_type = if w[0] == 0 { 1 } else { field1 };
            let field2 = read_be(&decoded[pos..pos + w[1]]);
            pos += w[1];
            let field3 = read_be(&decoded[pos..pos + w[2]]);
            pos += w[2];

            let object_number = first + i;
            let entry = match field_type {
                0 => XrefEntry::Free { next_free: field2 as u32, generation: field3 as u16 },
                1 => XrefEntry::Normal { offset: field2 as u32, generation: field3 as u16 },
                2 => XrefEntry::Compressed { container: field2 as u32, index: field3 as u16 },
                _ => XrefEntry::UnusableFree,
            };
            xref.insert(object_number, entry);
        }
    }

    Ok((xref, stream.dict.clone()))
}

fn read_be(bytes: &[u8]) -> usize {
    bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize)
}

fn take_uint(input: &[u8]) -> Option<(&[u8], u64)> {
    let end = input.iter().position(|b| !b.is_ascii_digit()).unwrap_or(input.len());
    if end == 0 {
        return None;
    }
    let value = std::str::from_utf8(&input[..end]).ok()?.parse().ok()?;
    Some((&input[end..], value))
}
