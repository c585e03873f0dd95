//! The public façade (spec §4.12): opens a file, orchestrates decryption,
//! and exposes object-lookup and page-extraction handles.

use std::collections::{HashMap, HashSet};

use crate::encryption::EncryptionState;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectId, ObjectMap};
use crate::revision::Revision;
use crate::xref::Xref;

/// The full parsed artifact (spec §3, entity `Document`). Immutable after
/// parsing; a [`crate::writer::Writer`] consumes it to produce output bytes.
#[derive(Debug, Clone)]
pub struct Document {
    pub version: String,
    pub binary_mark: Vec<u8>,
    pub xref_start: usize,
    pub max_id: u32,
    pub reference_table: Xref,
    pub trailer: Dictionary,
    pub objects: ObjectMap,
    pub encryption_state: Option<EncryptionState>,
    /// One entry per `%%EOF`-terminated section of the file, oldest first.
    /// Empty for documents built in memory rather than parsed.
    pub revisions: Vec<Revision>,
    /// Raw (still-encrypted) per-object byte slices, populated only while
    /// loading an encrypted document before the file key is known.
    pub(crate) raw_objects: HashMap<ObjectId, Vec<u8>>,
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Document {
            version: String::from("1.4"),
            binary_mark: Vec::new(),
            xref_start: 0,
            max_id: 0,
            reference_table: Xref::default(),
            trailer: Dictionary::new(),
            objects: ObjectMap::new(),
            encryption_state: None,
            revisions: Vec::new(),
            raw_objects: HashMap::new(),
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.trailer.has(b"Encrypt") || self.encryption_state.is_some()
    }

    pub fn object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.objects.keys().map(|id| id.0)
    }

    /// Number of `%%EOF`-terminated sections the file was built from. A
    /// document built in memory (never parsed) reports 1.
    pub fn revision_count(&self) -> usize {
        self.revisions.len().max(1)
    }

    /// The original bytes of the `n`th revision (1-based), if this document
    /// was parsed from a buffer.
    pub fn extract_revision<'a>(&self, buffer: &'a [u8], n: usize) -> Option<&'a [u8]> {
        let revision = self.revisions.get(n.checked_sub(1)?)?;
        buffer.get(revision.byte_range())
    }

    pub fn get_object(&self, id: ObjectId) -> Result<&Object> {
        self.objects.get(&id).ok_or(Error::ObjectNotFound(id))
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.objects.get_mut(&id).ok_or(Error::ObjectNotFound(id))
    }

    /// Resolves references transitively until a non-reference object (or a
    /// cycle) is found, returning the final object id alongside the value.
    pub fn dereference<'a>(&'a self, object: &'a Object) -> Result<(Option<ObjectId>, &'a Object)> {
        let mut current = object;
        let mut last_id = None;
        let mut seen = HashSet::new();
        loop {
            match current {
                Object::Reference(id) => {
                    if !seen.insert(*id) {
                        return Err(Error::ReferenceCycle(*id));
                    }
                    last_id = Some(*id);
                    current = self.get_object(*id)?;
                }
                other => return Ok((last_id, other)),
            }
        }
    }

    pub fn get_dictionary(&self, id: ObjectId) -> Result<&Dictionary> {
        self.get_object(id)?.as_dict()
    }

    pub fn catalog(&self) -> Result<&Dictionary> {
        let root = self.trailer.get(b"Root").and_then(Object::as_reference)?;
        self.get_dictionary(root)
    }

    pub(crate) fn encryption_dictionary(&self) -> Result<Dictionary> {
        let encrypt = self.trailer.get(b"Encrypt")?;
        match encrypt {
            Object::Reference(id) => self.get_dictionary(*id).cloned().map_err(|_| Error::NotEncrypted),
            Object::Dictionary(d) => Ok(d.clone()),
            _ => Err(Error::NotEncrypted),
        }
    }

    pub(crate) fn first_id_entry(&self) -> Option<Vec<u8>> {
        let ids = self.trailer.get(b"ID").ok()?.as_array().ok()?;
        ids.first()?.as_str().ok().map(|s| s.to_vec())
    }

    /// Authenticates `password` against either the user or owner credential
    /// path without mutating `self`, used by the reader before installing
    /// the resulting [`EncryptionState`].
    pub fn authenticate_password(&self, password: &str) -> Result<EncryptionState> {
        EncryptionState::decode(self, password)
    }
}
