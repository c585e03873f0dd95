//! Object-stream decoder (spec §4.3): unpacks a compressed container object
//! (`/Type /ObjStm`) that holds several indirect objects packed back to
//! back, saving space relative to writing each as a free-standing object.

use std::collections::BTreeMap;

use crate::error::{Error, ParseError, Result};
use crate::object::{Object, ObjectId, Stream};
use crate::parser::{self, ParserInput};

pub struct ObjectStream {
    pub objects: BTreeMap<ObjectId, Object>,
}

impl ObjectStream {
    /// Decompress `stream` and split it into its contained objects. The
    /// caller is responsible for having already decrypted `stream.content`
    /// if the document is encrypted — per spec, container bytes are
    /// decrypted exactly once, before this function ever sees them, and
    /// the objects it yields are never themselves re-encrypted.
    pub fn new(stream: &mut Stream) -> Result<Self> {
        if !stream.dict.has_type(b"ObjStm") {
            return Err(Error::InvalidStream("not an ObjStm".into()));
        }
        let n = stream
            .dict
            .get(b"N")
            .and_then(Object::as_i64)
            .map_err(|_| Error::InvalidStream("ObjStm missing /N".into()))? as usize;
        let first = stream
            .dict
            .get(b"First")
            .and_then(Object::as_i64)
            .map_err(|_| Error::InvalidStream("ObjStm missing /First".into()))? as usize;

        let decoded = stream.decompressed_content()?;
        if first > decoded.len() {
            return Err(Error::InvalidStream("ObjStm /First beyond stream end".into()));
        }

        let header = &decoded[..first];
        let pairs = parse_header_pairs(header, n)?;

        let mut objects = BTreeMap::new();
        for (i, &(obj_num, offset)) in pairs.iter().enumerate() {
            let start = first.checked_add(offset).ok_or(Error::ObjStmIndexOutOfRange(i))?;
            let end = pairs
                .get(i + 1)
                .map(|&(_, next_offset)| first + next_offset)
                .unwrap_or(decoded.len());
            if start > decoded.len() || end > decoded.len() || start > end {
                return Err(Error::ObjStmIndexOutOfRange(i));
            }
            let slice = &decoded[start..end];
            let object = parser::object(ParserInput::new_extra(slice, "objstm member"))
                .ok_or(ParseError::MalformedObject(start))?;
            objects.insert((obj_num, 0), object);
        }

        Ok(ObjectStream { objects })
    }
}

fn parse_header_pairs(header: &[u8], n: usize) -> Result<Vec<(u32, usize)>> {
    let mut numbers = header.split(|b| b.is_ascii_whitespace()).filter(|s| !s.is_empty());
    let mut pairs = Vec::with_capacity(n);
    for _ in 0..n {
        let obj_num: u32 = numbers
            .next()
            .and_then(|s| std::str::from_utf8(s).ok())
            .and_then(|s| s.parse().ok())
            .ok_or(ParseError::InvalidObjectHeader)?;
        let offset: usize = numbers
            .next()
            .and_then(|s| std::str::from_utf8(s).ok())
            .and_then(|s| s.parse().ok())
            .ok_or(ParseError::InvalidObjectHeader)?;
        pairs.push((obj_num, offset));
    }
    Ok(pairs)
}
