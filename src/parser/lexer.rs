use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::digit1;
use nom::combinator::{map, opt, recognize};
use nom::sequence::pair;
use nom::IResult;
use nom::Parser;

use crate::object::{Object, StringFormat};

pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

pub(crate) fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Skip whitespace runs and `%...eol` comments, returning the remainder.
pub fn skip_whitespace(mut input: &[u8]) -> &[u8] {
    loop {
        let start = input;
        while input.first().is_some_and(|&b| is_whitespace(b)) {
            input = &input[1..];
        }
        if input.first() == Some(&b'%') {
            let end = input.iter().position(|&b| b == b'\r' || b == b'\n').unwrap_or(input.len());
            input = &input[end..];
        }
        if std::ptr::eq(start, input) {
            break;
        }
    }
    input
}

/// Skip exactly one line terminator (`\r`, `\n`, or `\r\n`).
pub fn skip_one_eol(input: &[u8]) -> &[u8] {
    match input {
        [b'\r', b'\n', rest @ ..] => rest,
        [b'\r', rest @ ..] | [b'\n', rest @ ..] => rest,
        other => other,
    }
}

fn ws0(input: &[u8]) -> IResult<&[u8], ()> {
    Ok((skip_whitespace(input), ()))
}

/// A PDF name token: `/Foo#20Bar` with `#xx` hex escapes resolved.
pub fn name(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (input, _) = tag(b"/".as_slice())(input)?;
    let (input, raw) = take_while(is_regular)(input)?;
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            let hex = &raw[i + 1..i + 3];
            if let Ok(s) = std::str::from_utf8(hex) {
                if let Ok(byte) = u8::from_str_radix(s, 16) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    Ok((input, out))
}

/// An integer or real numeric token.
pub fn number(input: &[u8]) -> IResult<&[u8], Object> {
    let (input, sign) = opt(alt((tag(b"+".as_slice()), tag(b"-".as_slice())))).parse(input)?;
    let (input, int_part) = digit1(input)?;
    let (input, frac) = opt(pair(tag(b".".as_slice()), opt(digit1))).parse(input)?;

    let mut text = String::new();
    if let Some(s) = sign {
        text.push_str(std::str::from_utf8(s).unwrap());
    }
    text.push_str(std::str::from_utf8(int_part).unwrap());

    if let Some((_, frac_digits)) = frac {
        text.push('.');
        if let Some(d) = frac_digits {
            text.push_str(std::str::from_utf8(d).unwrap());
        }
        let value: f64 = text.parse().unwrap_or(0.0);
        Ok((input, Object::Real(value)))
    } else {
        match text.parse::<i64>() {
            Ok(v) => Ok((input, Object::Integer(v))),
            Err(_) => Ok((input, Object::Real(text.parse().unwrap_or(0.0)))),
        }
    }
}

/// A literal `(...)` string with nested balanced parens and backslash
/// escapes resolved.
pub fn literal_string(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    if input.first() != Some(&b'(') {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char)));
    }
    let mut depth = 1i32;
    let mut i = 1usize;
    let mut out = Vec::new();
    while i < input.len() && depth > 0 {
        match input[i] {
            b'\\' if i + 1 < input.len() => {
                i += 1;
                match input[i] {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0C),
                    b'(' => out.push(b'('),
                    b')' => out.push(b')'),
                    b'\\' => out.push(b'\\'),
                    b'\r' | b'\n' => {
                        // Escaped EOL: line continuation, contributes no byte.
                        if input[i] == b'\r' && input.get(i + 1) == Some(&b'\n') {
                            i += 1;
                        }
                    }
                    d @ b'0'..=b'7' => {
                        let mut value = (d - b'0') as u32;
                        let mut consumed = 0;
                        while consumed < 2 && matches!(input.get(i + 1), Some(b'0'..=b'7')) {
                            i += 1;
                            value = value * 8 + (input[i] - b'0') as u32;
                            consumed += 1;
                        }
                        out.push(value as u8);
                    }
                    other => out.push(other),
                }
                i += 1;
            }
            b'(' => {
                depth += 1;
                out.push(b'(');
                i += 1;
            }
            b')' => {
                depth -= 1;
                if depth > 0 {
                    out.push(b')');
                }
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    if depth != 0 {
        return Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Char)));
    }
    Ok((&input[i..], out))
}

/// A `<...>` hex string; non-hex whitespace is ignored, an odd trailing
/// nibble is padded with `0`.
pub fn hex_string(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (input, _) = tag(b"<".as_slice())(input)?;
    let (input, raw) = recognize(take_while1(|b| b != b'>')).parse(input)
        .or_else(|_: nom::Err<nom::error::Error<&[u8]>>| Ok((input, &input[0..0])))?;
    let (input, _) = tag(b">".as_slice())(input)?;
    let mut nibbles: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| b.is_ascii_hexdigit())
        .map(|b| (b as char).to_digit(16).unwrap() as u8)
        .collect();
    if nibbles.len() % 2 == 1 {
        nibbles.push(0);
    }
    let bytes = nibbles.chunks_exact(2).map(|p| (p[0] << 4) | p[1]).collect();
    Ok((input, bytes))
}

pub fn string_object(input: &[u8]) -> IResult<&[u8], Object> {
    alt((
        map(literal_string, |s| Object::String(s, StringFormat::Literal)),
        map(hex_string, |s| Object::String(s, StringFormat::Hexadecimal)),
    ))
    .parse(input)
}

pub fn keyword<'a>(input: &'a [u8], kw: &[u8]) -> IResult<&'a [u8], ()> {
    let (input, _) = tag(kw)(input)?;
    Ok((input, ()))
}

pub fn ws(input: &[u8]) -> &[u8] {
    let (rest, _) = ws0(input).unwrap();
    rest
}
