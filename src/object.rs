use indexmap::IndexMap;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Object number and generation number of an indirect object.
pub type ObjectId = (u32, u16);

/// How a literal/hex string was written, preserved so the writer can
/// reproduce the author's original notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StringFormat {
    Literal,
    Hexadecimal,
}

/// A PDF dictionary. Backed by an order-preserving map because the writer
/// must be able to reproduce insertion order for byte-perfect round-trips.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dictionary(IndexMap<Vec<u8>, Object>);

impl Dictionary {
    pub fn new() -> Self {
        Dictionary(IndexMap::new())
    }

    pub fn get<K: AsRef<[u8]>>(&self, key: K) -> Result<&Object> {
        self.0
            .get(key.as_ref())
            .ok_or_else(|| Error::DictKey(String::from_utf8_lossy(key.as_ref()).into_owned()))
    }

    pub fn get_mut<K: AsRef<[u8]>>(&mut self, key: K) -> Result<&mut Object> {
        self.0
            .get_mut(key.as_ref())
            .ok_or_else(|| Error::DictKey(String::from_utf8_lossy(key.as_ref()).into_owned()))
    }

    pub fn has<K: AsRef<[u8]>>(&self, key: K) -> bool {
        self.0.contains_key(key.as_ref())
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Vec<u8>>,
        V: Into<Object>,
    {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove<K: AsRef<[u8]>>(&mut self, key: K) -> Option<Object> {
        self.0.shift_remove(key.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Object)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Vec<u8>, &mut Object)> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get_type(&self) -> Result<&[u8]> {
        self.get(b"Type").and_then(Object::as_name)
    }

    pub fn has_type<N: AsRef<[u8]>>(&self, name: N) -> bool {
        matches!(self.get_type(), Ok(t) if t == name.as_ref())
    }
}

/// A stream object: a dictionary plus a byte payload. `content` holds the
/// raw (still-encoded/possibly-encrypted) bytes as they appear between
/// `stream` and `endstream`; `start_position` records where those bytes
/// begin in the owning document buffer, used to lazily slice the payload
/// once `/Length` has been resolved via an indirect reference.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stream {
    pub dict: Dictionary,
    pub content: Vec<u8>,
    pub allows_compression: bool,
    pub start_position: Option<usize>,
}

impl Stream {
    pub fn new(dict: Dictionary, content: Vec<u8>) -> Self {
        let mut stream = Stream {
            dict,
            content,
            allows_compression: true,
            start_position: None,
        };
        stream.set_plain_content_length();
        stream
    }

    pub fn set_content(&mut self, content: Vec<u8>) {
        self.content = content;
        self.set_plain_content_length();
    }

    fn set_plain_content_length(&mut self) {
        self.dict.set(b"Length", self.content.len() as i64);
    }

    /// Decode the stream payload by applying its declared `/Filter` chain.
    pub fn decompressed_content(&self) -> Result<Vec<u8>> {
        crate::filters::decode_stream(&self.dict, &self.content)
    }
}

/// An in-memory PDF object. Strings, dictionaries, and streams carry the
/// bytes/collections the parser produced; `Reference` is an unresolved
/// `N G R` pointer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(Vec<u8>, StringFormat),
    Name(Vec<u8>),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
}

impl From<bool> for Object {
    fn from(v: bool) -> Self {
        Object::Boolean(v)
    }
}
impl From<i64> for Object {
    fn from(v: i64) -> Self {
        Object::Integer(v)
    }
}
impl From<f64> for Object {
    fn from(v: f64) -> Self {
        Object::Real(v)
    }
}
impl From<Dictionary> for Object {
    fn from(v: Dictionary) -> Self {
        Object::Dictionary(v)
    }
}
impl From<Stream> for Object {
    fn from(v: Stream) -> Self {
        Object::Stream(v)
    }
}
impl From<Vec<Object>> for Object {
    fn from(v: Vec<Object>) -> Self {
        Object::Array(v)
    }
}
impl From<ObjectId> for Object {
    fn from(v: ObjectId) -> Self {
        Object::Reference(v)
    }
}

impl Object {
    pub fn string_literal<S: Into<Vec<u8>>>(s: S) -> Self {
        Object::String(s.into(), StringFormat::Literal)
    }

    pub fn name<S: Into<Vec<u8>>>(s: S) -> Self {
        Object::Name(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Object::Boolean(b) => Ok(*b),
            _ => Err(Error::Type("Boolean")),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Object::Integer(i) => Ok(*i),
            Object::Real(f) => Ok(*f as i64),
            _ => Err(Error::Type("Integer")),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(f) => Ok(*f),
            _ => Err(Error::Type("Number")),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Object::Name(n) => Ok(n),
            _ => Err(Error::Type("Name")),
        }
    }

    pub fn as_str(&self) -> Result<&[u8]> {
        match self {
            Object::String(s, _) => Ok(s),
            _ => Err(Error::Type("String")),
        }
    }

    pub fn as_array(&self) -> Result<&Vec<Object>> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(Error::Type("Array")),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Object>> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(Error::Type("Array")),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&s.dict),
            _ => Err(Error::Type("Dictionary")),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&mut s.dict),
            _ => Err(Error::Type("Dictionary")),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(Error::Type("Stream")),
        }
    }

    pub fn as_stream_mut(&mut self) -> Result<&mut Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(Error::Type("Stream")),
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Object::Reference(id) => Ok(*id),
            _ => Err(Error::Type("Reference")),
        }
    }

    /// Visit every string contained directly in this object (not through
    /// references), used by the encryption layer to encrypt/decrypt in
    /// place without touching dictionary structure bytes.
    pub fn for_each_string_mut(&mut self, f: &mut dyn FnMut(&mut Vec<u8>)) {
        match self {
            Object::String(s, _) => f(s),
            Object::Array(items) => items.iter_mut().for_each(|o| o.for_each_string_mut(f)),
            Object::Dictionary(d) => d.iter_mut().for_each(|(_, v)| v.for_each_string_mut(f)),
            Object::Stream(s) => s.dict.iter_mut().for_each(|(_, v)| v.for_each_string_mut(f)),
            _ => {}
        }
    }
}

/// Ordered collection of objects belonging to one revision, keyed by object
/// id. `BTreeMap` keeps deterministic iteration order for the writer.
pub type ObjectMap = BTreeMap<ObjectId, Object>;
