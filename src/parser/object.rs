use std::collections::HashSet;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::combinator::{map, value};
use nom::IResult;
use nom::Parser;

use super::lexer::{is_regular, name, number, skip_one_eol, skip_whitespace, string_object};
use super::ParserInput;
use crate::error::{Error, ParseError, Result};
use crate::object::{Dictionary, Object, ObjectId, Stream};
use crate::reader::Reader;

/// Parse one generic (non-indirect) object from the start of `input`.
pub fn object(input: ParserInput) -> Option<Object> {
    parse_object(input.fragment()).ok().map(|(_, obj)| obj)
}

fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    let input = skip_whitespace(input);
    if let Ok((rest, obj)) = parse_reference_or_number(input) {
        return Ok((rest, obj));
    }
    alt((
        value(Object::Null, |i| keyword(i, b"null")),
        value(Object::Boolean(true), |i| keyword(i, b"true")),
        value(Object::Boolean(false), |i| keyword(i, b"false")),
        map(name, Object::Name),
        string_object,
        parse_array,
        parse_dict_or_null,
    ))
    .parse(input)
}

fn keyword<'a>(input: &'a [u8], kw: &[u8]) -> IResult<&'a [u8], ()> {
    let (input, _) = tag(kw)(input)?;
    // keyword must not be a prefix of a longer regular-character run
    if input.first().is_some_and(|&b| is_regular(b)) {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }
    Ok((input, ()))
}

fn parse_reference_or_number(input: &[u8]) -> IResult<&[u8], Object> {
    let (rest, first) = number(input)?;
    let Object::Integer(num) = first else {
        return Ok((rest, first));
    };
    if num < 0 {
        return Ok((rest, first));
    }
    let after_first = skip_whitespace(rest);
    if let Ok((rest2, Object::Integer(gen_))) = number(after_first) {
        if gen_ >= 0 {
            let after_gen = skip_whitespace(rest2);
            if after_gen.starts_with(b"R") && !after_gen.get(1).is_some_and(|&b| is_regular(b)) {
                return Ok((&after_gen[1..], Object::Reference((num as u32, gen_ as u16))));
            }
        }
    }
    Ok((rest, first))
}

fn parse_array(input: &[u8]) -> IResult<&[u8], Object> {
    let (mut input, _) = tag(b"[".as_slice())(input)?;
    let mut items = Vec::new();
    loop {
        input = skip_whitespace(input);
        if input.starts_with(b"]") {
            input = &input[1..];
            break;
        }
        if input.is_empty() {
            return Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Eof)));
        }
        let (rest, obj) = parse_object(input)?;
        items.push(obj);
        input = rest;
    }
    Ok((input, Object::Array(items)))
}

fn parse_dict_or_null(input: &[u8]) -> IResult<&[u8], Object> {
    let (mut input, _) = tag(b"<<".as_slice())(input)?;
    let mut dict = Dictionary::new();
    loop {
        input = skip_whitespace(input);
        if input.starts_with(b">>") {
            input = &input[2..];
            break;
        }
        if input.is_empty() {
            return Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Eof)));
        }
        let (rest, key) = name(input)?;
        let rest = skip_whitespace(rest);
        let (rest, value) = parse_object(rest)?;
        dict.set(key, value);
        input = rest;
    }
    Ok((input, Object::Dictionary(dict)))
}

/// Parses a `<< ... >>` dictionary (the trailer grammar) from the start of
/// `input`, returning the remainder and the parsed dictionary object.
pub(crate) fn content_dict(input: &[u8]) -> Option<(&[u8], Object)> {
    parse_dict_or_null(skip_whitespace(input)).ok()
}

/// Parses `N G obj <body> [stream ... endstream] endobj` starting at an
/// absolute byte offset inside the reader's buffer. When the dictionary
/// declares `/Length` as an indirect reference, that referenced object is
/// resolved recursively through `reader`, tracking `already_seen` to
/// detect and refuse self-referential cycles.
pub fn indirect_object(
    input: ParserInput, offset: usize, expected_id: Option<ObjectId>, reader: &Reader,
    already_seen: &mut HashSet<ObjectId>,
) -> Result<(ObjectId, Object)> {
    let buffer = *input.fragment();
    if offset > buffer.len() {
        return Err(Error::InvalidOffset(offset));
    }
    let mut cursor = skip_whitespace(&buffer[offset..]);

    let (rest, num_obj) = super::lexer::number(cursor).map_err(|_| ParseError::InvalidObjectHeader)?;
    let obj_num = match num_obj {
        Object::Integer(n) if n >= 0 => n as u32,
        _ => return Err(ParseError::InvalidObjectHeader.into()),
    };
    cursor = skip_whitespace(rest);
    let (rest, gen_obj) = super::lexer::number(cursor).map_err(|_| ParseError::InvalidObjectHeader)?;
    let generation = match gen_obj {
        Object::Integer(n) if n >= 0 => n as u16,
        _ => return Err(ParseError::InvalidObjectHeader.into()),
    };
    cursor = skip_whitespace(rest);
    if !cursor.starts_with(b"obj") {
        return Err(ParseError::MalformedObject(offset).into());
    }
    cursor = &cursor[3..];

    let id = (obj_num, generation);
    if let Some(expected) = expected_id {
        if expected.0 != id.0 {
            return Err(Error::Invariant(format!(
                "expected object {} at offset {offset}, found {}",
                expected.0, id.0
            )));
        }
    }

    cursor = skip_whitespace(cursor);
    let (rest, mut body) = parse_object(cursor).unwrap_or((cursor, Object::Null));
    cursor = rest;

    let after_body = skip_whitespace(cursor);
    if after_body.starts_with(b"stream") {
        let mut after_kw = &after_body[b"stream".len()..];
        after_kw = skip_one_eol(after_kw);

        let dict = match &body {
            Object::Dictionary(d) => d.clone(),
            _ => return Err(ParseError::InvalidDictionary.into()),
        };

        let length = resolve_length(&dict, reader, already_seen)?;
        let start_in_buffer = buffer.len() - after_kw.len();
        let end = start_in_buffer
            .checked_add(length)
            .filter(|&e| e <= buffer.len())
            .ok_or_else(|| Error::InvalidStream("stream extends past end of file".into()))?;

        let payload = buffer[start_in_buffer..end].to_vec();
        let mut remainder = &buffer[end..];
        remainder = skip_one_eol(skip_whitespace(remainder));
        if !remainder.starts_with(b"endstream") {
            // Tolerate producers who put extra bytes before endstream by
            // searching forward a bounded distance instead of failing outright.
            if let Some(pos) = find(remainder, b"endstream", 256) {
                remainder = &remainder[pos..];
            }
        }
        if remainder.starts_with(b"endstream") {
            remainder = &remainder[b"endstream".len()..];
        }
        cursor = remainder;

        let mut stream = Stream::new(dict, payload);
        stream.start_position = Some(start_in_buffer);
        body = Object::Stream(stream);
    }

    cursor = skip_whitespace(cursor);
    if !cursor.starts_with(b"endobj") {
        if let Some(pos) = find(cursor, b"endobj", 64) {
            cursor = &cursor[pos..];
        } else {
            return Err(ParseError::MissingEndobj.into());
        }
    }

    Ok((id, body))
}

fn resolve_length(dict: &Dictionary, reader: &Reader, already_seen: &mut HashSet<ObjectId>) -> Result<usize> {
    let length_obj = dict.get(b"Length").map_err(|_| Error::InvalidStream("missing /Length".into()))?;
    let length = match length_obj {
        Object::Integer(n) => *n,
        Object::Reference(id) => {
            let resolved = reader.get_object(*id, already_seen)?;
            resolved.as_i64().map_err(|_| Error::InvalidStream("/Length did not resolve to an integer".into()))?
        }
        _ => return Err(Error::InvalidStream("/Length has unexpected type".into())),
    };
    if length < 0 {
        return Err(Error::InvalidStream("negative stream length".into()));
    }
    Ok(length as usize)
}

fn find(haystack: &[u8], needle: &[u8], max_search: usize) -> Option<usize> {
    let bound = max_search.min(haystack.len());
    if bound < needle.len() {
        return None;
    }
    haystack[..bound].windows(needle.len()).position(|w| w == needle)
}

/// Tokenizes a decompressed content stream into `(operands, operator)`
/// groups for the interpreter (spec §4.7).
pub fn content_stream_tokens(data: &[u8]) -> Vec<(Vec<Object>, String)> {
    let mut groups = Vec::new();
    let mut operands = Vec::new();
    let mut cursor = data;
    loop {
        cursor = skip_whitespace(cursor);
        if cursor.is_empty() {
            break;
        }
        if cursor.starts_with(b"<<") {
            match parse_dict_or_null(cursor) {
                Ok((rest, obj)) => {
                    operands.push(obj);
                    cursor = rest;
                    continue;
                }
                Err(_) => break,
            }
        }
        if cursor.starts_with(b"[") {
            match parse_array(cursor) {
                Ok((rest, obj)) => {
                    operands.push(obj);
                    cursor = rest;
                    continue;
                }
                Err(_) => break,
            }
        }
        if cursor.starts_with(b"(") {
            match super::lexer::literal_string(cursor) {
                Ok((rest, s)) => {
                    operands.push(Object::String(s, crate::object::StringFormat::Literal));
                    cursor = rest;
                    continue;
                }
                Err(_) => break,
            }
        }
        if cursor.starts_with(b"<") {
            match super::lexer::hex_string(cursor) {
                Ok((rest, s)) => {
                    operands.push(Object::String(s, crate::object::StringFormat::Hexadecimal));
                    cursor = rest;
                    continue;
                }
                Err(_) => break,
            }
        }
        if cursor.starts_with(b"/") {
            match name(cursor) {
                Ok((rest, n)) => {
                    operands.push(Object::Name(n));
                    cursor = rest;
                    continue;
                }
                Err(_) => break,
            }
        }
        if cursor[0] == b'+' || cursor[0] == b'-' || cursor[0] == b'.' || cursor[0].is_ascii_digit() {
            match number(cursor) {
                Ok((rest, n)) => {
                    operands.push(n);
                    cursor = rest;
                    continue;
                }
                Err(_) => break,
            }
        }
        // Otherwise this is an operator (or BI/ID/EI inline image, which
        // is skipped wholesale since inline images carry no text runs).
        let end = cursor
            .iter()
            .position(|&b| b.is_ascii_whitespace() || matches!(b, b'(' | b'<' | b'[' | b'/' | b'%'))
            .unwrap_or(cursor.len());
        let (op_bytes, rest) = cursor.split_at(end.max(1));
        let op = String::from_utf8_lossy(op_bytes).into_owned();
        cursor = rest;
        if op == "BI" {
            if let Some(pos) = find(cursor, b"EI", cursor.len()) {
                cursor = &cursor[pos + 2..];
            }
            operands.clear();
            continue;
        }
        groups.push((std::mem::take(&mut operands), op));
    }
    groups
}
