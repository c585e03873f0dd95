//! Writer (spec §4.10 fresh serialization, §4.11 incremental rebuilder):
//! turns an in-memory [`Document`] back into bytes, either as a complete
//! file or as an appended revision onto the bytes it was parsed from.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::document::Document;
use crate::encryption::encrypt_object;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectId, StringFormat};

impl Document {
    /// Writes the full document to `path`, overwriting it.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        self.save_to(&mut file)
    }

    /// Writes the full document to an arbitrary sink.
    pub fn save_to<W: Write>(&self, target: &mut W) -> Result<()> {
        let bytes = Writer::write(self)?;
        target.write_all(&bytes)?;
        Ok(())
    }
}

/// Stateless serializer for a complete [`Document`]: header, every object in
/// object-number order, a fresh legacy xref table, and the trailer.
pub struct Writer;

impl Writer {
    pub fn write(doc: &Document) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.extend_from_slice(format!("%PDF-{}\n", doc.version).as_bytes());
        buf.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        let max_id = doc.objects.keys().map(|id| id.0).max().unwrap_or(0);
        let mut offsets: BTreeMap<u32, usize> = BTreeMap::new();

        for (&(num, gen_), object) in doc.objects.iter() {
            offsets.insert(num, buf.len());
            let mut object = object.clone();
            if let Some(state) = &doc.encryption_state {
                encrypt_object(state, (num, gen_), &mut object)?;
            }
            write_indirect_object(&mut buf, num, gen_, &object);
        }

        let xref_offset = buf.len();
        write_xref_table(&mut buf, &offsets, max_id);

        let mut trailer = doc.trailer.clone();
        trailer.set(b"Size", (max_id + 1) as i64);
        trailer.remove(b"Prev");
        buf.extend_from_slice(b"trailer\n");
        write_object(&mut buf, &Object::Dictionary(trailer));
        buf.extend_from_slice(b"\nstartxref\n");
        buf.extend_from_slice(xref_offset.to_string().as_bytes());
        buf.extend_from_slice(b"\n%%EOF");

        Ok(buf)
    }
}

/// A document still backed by the bytes it was parsed from, letting new or
/// modified objects be appended as one more incremental revision instead of
/// rewriting the whole file (spec §4.11).
pub struct IncrementalDocument {
    original: Vec<u8>,
    pub document: Document,
    changes: BTreeMap<ObjectId, Object>,
    next_object_number: u32,
}

impl IncrementalDocument {
    /// Wraps a just-parsed `document` together with the exact bytes it came
    /// from, so later changes can be appended rather than rewritten.
    pub fn create_from(buffer: Vec<u8>, document: Document) -> Self {
        let next_object_number = document.objects.keys().map(|id| id.0).max().unwrap_or(0) + 1;
        IncrementalDocument { original: buffer, document, changes: BTreeMap::new(), next_object_number }
    }

    /// Reserves a fresh object number for a new indirect object.
    pub fn new_object_id(&mut self) -> ObjectId {
        let id = (self.next_object_number, 0);
        self.next_object_number += 1;
        id
    }

    /// Records a new or modified object to be written in the next appended
    /// revision, and updates the live in-memory view to match.
    pub fn set_object(&mut self, id: ObjectId, object: Object) {
        self.document.objects.insert(id, object.clone());
        self.changes.insert(id, object);
    }

    /// Whether any object has been modified or added since `create_from`.
    pub fn is_dirty(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Writes the original bytes plus one appended revision carrying every
    /// changed object, to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        self.save_to(&mut file)
    }

    /// Writes the original bytes plus one appended revision to an arbitrary
    /// sink. A no-op append (no recorded changes) still reproduces the
    /// original bytes unchanged.
    pub fn save_to<W: Write>(&self, target: &mut W) -> Result<()> {
        if self.original.is_empty() {
            return Err(Error::IncrementalWithoutParsedBase);
        }

        let mut buf = self.original.clone();
        if self.changes.is_empty() {
            target.write_all(&buf)?;
            return Ok(());
        }
        if !buf.ends_with(b"\n") {
            buf.push(b'\n');
        }

        let mut offsets: BTreeMap<u32, usize> = BTreeMap::new();
        for (&(num, gen_), object) in self.changes.iter() {
            offsets.insert(num, buf.len());
            let mut object = object.clone();
            if let Some(state) = &self.document.encryption_state {
                encrypt_object(state, (num, gen_), &mut object)?;
            }
            write_indirect_object(&mut buf, num, gen_, &object);
        }

        let xref_offset = buf.len();
        let max_id = *offsets.keys().max().unwrap_or(&0);
        write_incremental_xref_sections(&mut buf, &offsets);

        let mut trailer = self.document.trailer.clone();
        trailer.set(b"Size", (max_id + 1) as i64);
        trailer.set(b"Prev", self.document.xref_start as i64);
        buf.extend_from_slice(b"trailer\n");
        write_object(&mut buf, &Object::Dictionary(trailer));
        buf.extend_from_slice(b"\nstartxref\n");
        buf.extend_from_slice(xref_offset.to_string().as_bytes());
        buf.extend_from_slice(b"\n%%EOF");

        target.write_all(&buf)?;
        Ok(())
    }
}

fn write_xref_table(buf: &mut Vec<u8>, offsets: &BTreeMap<u32, usize>, max_id: u32) {
    buf.extend_from_slice(format!("xref\n0 {}\n", max_id + 1).as_bytes());
    buf.extend_from_slice(b"0000000000 65535 f \n");
    for num in 1..=max_id {
        match offsets.get(&num) {
            Some(&offset) => buf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes()),
            None => buf.extend_from_slice(b"0000000000 65535 f \n"),
        }
    }
}

/// Emits one `xref` subsection per contiguous run of changed object
/// numbers, which is all an incremental update needs to declare.
fn write_incremental_xref_sections(buf: &mut Vec<u8>, offsets: &BTreeMap<u32, usize>) {
    buf.extend_from_slice(b"xref\n");
    let nums: Vec<u32> = offsets.keys().copied().collect();
    let mut i = 0;
    while i < nums.len() {
        let start = nums[i];
        let mut end = start;
        while i + 1 < nums.len() && nums[i + 1] == end + 1 {
            end += 1;
            i += 1;
        }
        buf.extend_from_slice(format!("{} {}\n", start, end - start + 1).as_bytes());
        for num in start..=end {
            let offset = offsets[&num];
            buf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        i += 1;
    }
}

fn write_indirect_object(buf: &mut Vec<u8>, num: u32, gen_: u16, object: &Object) {
    buf.extend_from_slice(format!("{num} {gen_} obj\n").as_bytes());
    write_object(buf, object);
    buf.extend_from_slice(b"\nendobj\n");
}

fn write_object(buf: &mut Vec<u8>, object: &Object) {
    match object {
        Object::Null => buf.extend_from_slice(b"null"),
        Object::Boolean(b) => buf.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => buf.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(f) => buf.extend_from_slice(format_real(*f).as_bytes()),
        Object::Name(name) => {
            buf.push(b'/');
            write_name(buf, name);
        }
        Object::String(s, format) => write_string(buf, s, *format),
        Object::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b' ');
                }
                write_object(buf, item);
            }
            buf.push(b']');
        }
        Object::Dictionary(dict) => write_dictionary(buf, dict),
        Object::Stream(stream) => {
            write_dictionary(buf, &stream.dict);
            buf.extend_from_slice(b"\nstream\n");
            buf.extend_from_slice(&stream.content);
            buf.extend_from_slice(b"\nendstream");
        }
        Object::Reference(id) => buf.extend_from_slice(format!("{} {} R", id.0, id.1).as_bytes()),
    }
}

fn write_dictionary(buf: &mut Vec<u8>, dict: &Dictionary) {
    buf.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        buf.push(b'/');
        write_name(buf, key);
        buf.push(b' ');
        write_object(buf, value);
        buf.push(b' ');
    }
    buf.extend_from_slice(b">>");
}

fn write_name(buf: &mut Vec<u8>, name: &[u8]) {
    for &b in name {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.') {
            buf.push(b);
        } else {
            buf.extend_from_slice(format!("#{b:02X}").as_bytes());
        }
    }
}

fn write_string(buf: &mut Vec<u8>, s: &[u8], format: StringFormat) {
    match format {
        StringFormat::Hexadecimal => {
            buf.push(b'<');
            for &b in s {
                buf.extend_from_slice(format!("{b:02X}").as_bytes());
            }
            buf.push(b'>');
        }
        StringFormat::Literal => {
            buf.push(b'(');
            for &b in s {
                match b {
                    b'(' | b')' | b'\\' => {
                        buf.push(b'\\');
                        buf.push(b);
                    }
                    b'\n' => buf.extend_from_slice(b"\\n"),
                    b'\r' => buf.extend_from_slice(b"\\r"),
                    _ => buf.push(b),
                }
            }
            buf.push(b')');
        }
    }
}

fn format_real(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        return (f as i64).to_string();
    }
    let s = format!("{f:.6}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Stream;

    fn sample_document() -> Document {
        let mut doc = Document::new();
        doc.trailer.set(b"Root", (1u32, 0u16));

        let mut catalog = Dictionary::new();
        catalog.set(b"Type", Object::name(b"Catalog".to_vec()));
        catalog.set(b"Pages", (2u32, 0u16));
        doc.objects.insert((1, 0), Object::Dictionary(catalog));

        let mut pages = Dictionary::new();
        pages.set(b"Type", Object::name(b"Pages".to_vec()));
        pages.set(b"Kids", Object::Array(vec![Object::Reference((3, 0))]));
        pages.set(b"Count", 1i64);
        doc.objects.insert((2, 0), Object::Dictionary(pages));

        let mut page = Dictionary::new();
        page.set(b"Type", Object::name(b"Page".to_vec()));
        page.set(b"Parent", (2u32, 0u16));
        doc.objects.insert((3, 0), Object::Dictionary(page));
        doc
    }

    #[test]
    fn write_emits_header_and_trailer() {
        let doc = sample_document();
        let bytes = Writer::write(&doc).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.contains("trailer"));
        assert!(text.ends_with("%%EOF"));
        assert!(text.contains("1 0 obj"));
        assert!(text.contains("/Type/Catalog"));
    }

    #[test]
    fn write_round_trips_through_load_mem() {
        let doc = sample_document();
        let bytes = Writer::write(&doc).unwrap();
        let reloaded = Document::load_mem(&bytes).unwrap();
        let catalog = reloaded.catalog().unwrap();
        assert!(catalog.has_type(b"Catalog"));
    }

    #[test]
    fn incremental_save_with_no_changes_reproduces_original() {
        let doc = sample_document();
        let original = Writer::write(&doc).unwrap();
        let reloaded = Document::load_mem(&original).unwrap();
        let incremental = IncrementalDocument::create_from(original.clone(), reloaded);
        let mut out = Vec::new();
        incremental.save_to(&mut out).unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn incremental_save_appends_new_object() {
        let doc = sample_document();
        let original = Writer::write(&doc).unwrap();
        let reloaded = Document::load_mem(&original).unwrap();
        let mut incremental = IncrementalDocument::create_from(original.clone(), reloaded);

        let id = incremental.new_object_id();
        incremental.set_object(id, Object::Stream(Stream::new(Dictionary::new(), b"hello".to_vec())));

        let mut out = Vec::new();
        incremental.save_to(&mut out).unwrap();
        assert!(out.len() > original.len());
        assert!(out.starts_with(original.as_slice()));

        let reparsed = Document::load_mem(&out).unwrap();
        assert!(reparsed.get_object(id).is_ok());
    }

    #[test]
    fn write_keeps_length_in_sync_for_encrypted_streams() {
        use crate::encryption::{CryptMethod, EncryptionState};

        let mut doc = sample_document();
        doc.objects.insert((4, 0), Object::Stream(Stream::new(Dictionary::new(), b"plain text payload".to_vec())));
        doc.encryption_state = Some(EncryptionState {
            v: 2,
            r: 3,
            key_len: 16,
            method: CryptMethod::AesV2,
            o: vec![0; 32],
            u: vec![0; 32],
            oe: vec![],
            ue: vec![],
            p: -3904,
            encrypt_metadata: true,
            id0: b"0123456789012345".to_vec(),
            key: (0..16u8).collect(),
        });

        let bytes = Writer::write(&doc).unwrap();
        let find = |needle: &[u8], from: usize| -> usize {
            bytes[from..].windows(needle.len()).position(|w| w == needle).unwrap() + from
        };

        let obj_start = find(b"4 0 obj", 0);
        let length_key = find(b"/Length ", obj_start) + b"/Length ".len();
        let length_end = bytes[length_key..].iter().position(|b| !b.is_ascii_digit()).unwrap() + length_key;
        let declared_length: usize = std::str::from_utf8(&bytes[length_key..length_end]).unwrap().parse().unwrap();

        let stream_start = find(b"stream\n", length_end) + b"stream\n".len();
        let stream_end = find(b"\nendstream", stream_start);
        let ciphertext_len = stream_end - stream_start;

        assert_eq!(declared_length, ciphertext_len);
        assert_ne!(declared_length, "plain text payload".len());
    }
}
