use std::collections::BTreeMap;

/// Discriminant for how a cross-reference section was encoded on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefType {
    Table,
    Stream,
}

/// A single object's location as recorded in one xref section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    Free { next_free: u32, generation: u16 },
    UnusableFree,
    Normal { offset: u32, generation: u16 },
    Compressed { container: u32, index: u16 },
}

/// The merged, total object table built from one or more xref sections
/// (legacy table or xref-stream), newest revision winning ties.
#[derive(Debug, Clone, Default)]
pub struct Xref {
    pub entries: BTreeMap<u32, XrefEntry>,
    pub size: u32,
    /// Byte offset of the xref section this table was parsed from, if any.
    pub offset: Option<usize>,
    pub xref_type: Option<XrefType>,
}

impl Xref {
    pub fn new(size: u32, xref_type: XrefType) -> Self {
        Xref {
            entries: BTreeMap::new(),
            size,
            offset: None,
            xref_type: Some(xref_type),
        }
    }

    pub fn get(&self, object_number: u32) -> Option<&XrefEntry> {
        self.entries.get(&object_number)
    }

    pub fn insert(&mut self, object_number: u32, entry: XrefEntry) {
        self.entries.insert(object_number, entry);
    }

    /// Merge an older section into this (newer) one. Per spec, object
    /// numbers already present in `self` keep their entry: the newest
    /// revision wins.
    pub fn merge(&mut self, older: Xref) {
        for (id, entry) in older.entries {
            self.entries.entry(id).or_insert(entry);
        }
        if older.size > self.size {
            self.size = older.size;
        }
    }

    pub fn max_id(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }

    /// Every object number that is in use (not free) in the merged view.
    pub fn live_object_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().filter_map(|(id, entry)| match entry {
            XrefEntry::Free { .. } | XrefEntry::UnusableFree => None,
            _ => Some(*id),
        })
    }
}
