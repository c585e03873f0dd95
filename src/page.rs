//! Page tree walker (spec §4.9): starting at the catalog's `/Pages`,
//! recurses `/Kids` in document order, merges inherited attributes, and
//! hands each leaf's decoded content stream to the interpreter.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::content::{interpret, ImagePlacement, TextElement, VectorGraphic};
use crate::destinations::Destination;
use crate::error::{Error, Result};
use crate::font::FontDecoder;
use crate::object::{Dictionary, Object, ObjectId};
use crate::Document;

/// One page leaf, fully resolved (spec §3, entity `Page`).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Page {
    pub number: u32,
    pub media_box: [f64; 4],
    pub crop_box: [f64; 4],
    pub rotation: i64,
    pub text: Vec<TextElement>,
    pub graphics: Vec<VectorGraphic>,
    pub images: Vec<ImagePlacement>,
    pub annotations: Vec<ObjectId>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub resources: Dictionary,
}

/// One bookmark entry from the document's `/Outlines` tree (spec §3,
/// entity `Outline`, `[SUPPLEMENT]`).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Outline {
    pub title: String,
    pub dest: Option<ObjectId>,
    pub children: Vec<Outline>,
}

#[derive(Clone, Default)]
struct InheritedAttrs {
    resources: Option<Dictionary>,
    media_box: Option<[f64; 4]>,
    crop_box: Option<[f64; 4]>,
    rotation: Option<i64>,
}

impl Document {
    /// Page numbers in document order mapped to the underlying `/Page`
    /// object's id, matching `get_pages_tree_count`'s traversal in the
    /// lightweight metadata path.
    pub fn get_pages(&self) -> std::collections::BTreeMap<u32, ObjectId> {
        let mut pages = std::collections::BTreeMap::new();
        if let Ok(leaves) = self.page_leaves() {
            for (i, id) in leaves.into_iter().enumerate() {
                pages.insert(i as u32 + 1, id);
            }
        }
        pages
    }

    /// Fully resolved [`Page`] values in document order.
    pub fn get_page_objects(&self) -> Result<Vec<Page>> {
        let leaves = self.page_leaves()?;
        let mut out = Vec::with_capacity(leaves.len());
        for (i, id) in leaves.into_iter().enumerate() {
            out.push(self.build_page(i as u32 + 1, id)?);
        }
        Ok(out)
    }

    /// Extracts and concatenates text from the given pages, one line per
    /// page, in the order the ids are given.
    pub fn extract_text(&self, page_ids: &[ObjectId]) -> Result<String> {
        let mut out = String::new();
        for &id in page_ids {
            let content = self.decode_page_content(id)?;
            let fonts = self.build_font_table(id)?;
            let interpreted = interpret(&content, &fonts);
            for run in interpreted.text {
                out.push_str(&run.text);
            }
            out.push('\n');
        }
        Ok(out)
    }

    /// Named destinations reachable from the catalog's `/Dests` name tree
    /// or, for older producers, the `/Names/Dests` tree.
    pub fn get_named_destinations_map(&self) -> Result<IndexMap<Vec<u8>, Destination>> {
        let mut out = IndexMap::new();
        let catalog = self.catalog()?;
        if let Ok(names) = catalog.get(b"Names").and_then(Object::as_reference).and_then(|id| self.get_dictionary(id))
        {
            if let Ok(dests) = names.get(b"Dests").and_then(Object::as_reference).and_then(|id| self.get_dictionary(id)) {
                self.get_named_destinations(dests, &mut out)?;
            }
        }
        Ok(out)
    }

    /// The document's `/Metadata` stream object id, if present on the
    /// catalog.
    pub fn metadata_stream_id(&self) -> Option<ObjectId> {
        self.catalog().ok()?.get(b"Metadata").ok()?.as_reference().ok()
    }

    /// The bookmark tree rooted at the catalog's `/Outlines`, in document
    /// order, each node's children following its own `/First`/`/Next`
    /// sibling chain.
    pub fn get_outlines(&self) -> Result<Vec<Outline>> {
        let catalog = self.catalog()?;
        let Ok(root) = catalog.get(b"Outlines").and_then(Object::as_reference) else {
            return Ok(Vec::new());
        };
        let Ok(root_dict) = self.get_dictionary(root) else {
            return Ok(Vec::new());
        };
        let Ok(first) = root_dict.get(b"First").and_then(Object::as_reference) else {
            return Ok(Vec::new());
        };
        let mut seen = HashSet::new();
        self.walk_outline_siblings(first, &mut seen)
    }

    fn walk_outline_siblings(&self, first: ObjectId, seen: &mut HashSet<ObjectId>) -> Result<Vec<Outline>> {
        let mut siblings = Vec::new();
        let mut current = Some(first);
        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            let Ok(dict) = self.get_dictionary(id) else { break };

            let title = dict.get(b"Title").and_then(Object::as_str).map(decode_text_string).unwrap_or_default();
            let dest = outline_destination(dict);
            let children = match dict.get(b"First").and_then(Object::as_reference) {
                Ok(child_first) => self.walk_outline_siblings(child_first, seen)?,
                Err(_) => Vec::new(),
            };

            siblings.push(Outline { title, dest, children });
            current = dict.get(b"Next").and_then(Object::as_reference).ok();
        }
        Ok(siblings)
    }

    fn page_leaves(&self) -> Result<Vec<ObjectId>> {
        let catalog = self.catalog()?;
        let pages_ref = catalog.get(b"Pages").and_then(Object::as_reference)?;
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.walk_pages(pages_ref, InheritedAttrs::default(), &mut out, &mut seen)?;
        Ok(out)
    }

    fn walk_pages(
        &self, node_id: ObjectId, inherited: InheritedAttrs, out: &mut Vec<ObjectId>, seen: &mut HashSet<ObjectId>,
    ) -> Result<()> {
        if !seen.insert(node_id) {
            return Err(Error::ReferenceCycle(node_id));
        }
        let dict = self.get_dictionary(node_id)?;
        let merged = merge_inherited(&inherited, dict);

        if dict.has_type(b"Page") || !dict.has(b"Kids") {
            out.push(node_id);
            return Ok(());
        }

        let kids = dict.get(b"Kids").and_then(Object::as_array)?;
        for kid in kids {
            if let Ok(kid_id) = kid.as_reference() {
                self.walk_pages(kid_id, merged.clone(), out, seen)?;
            }
        }
        Ok(())
    }

    fn build_page(&self, number: u32, id: ObjectId) -> Result<Page> {
        let inherited = self.inherited_attrs_for(id)?;
        let dict = self.get_dictionary(id)?;

        let media_box = inherited.media_box.unwrap_or([0.0, 0.0, 612.0, 792.0]);
        let crop_box = inherited.crop_box.unwrap_or(media_box);
        let rotation = inherited.rotation.unwrap_or(0).rem_euclid(360);
        let resources = inherited.resources.clone().unwrap_or_default();

        let annotations = dict
            .get(b"Annots")
            .and_then(Object::as_array)
            .map(|arr| arr.iter().filter_map(|o| o.as_reference().ok()).collect())
            .unwrap_or_default();

        let content = self.decode_page_content(id)?;
        let fonts = self.build_font_table(id)?;
        let interpreted = interpret(&content, &fonts);

        Ok(Page {
            number,
            media_box,
            crop_box,
            rotation,
            text: interpreted.text,
            graphics: interpreted.graphics,
            images: interpreted.images,
            annotations,
            resources,
        })
    }

    fn inherited_attrs_for(&self, leaf: ObjectId) -> Result<InheritedAttrs> {
        // Walk from the catalog down, re-merging, since Page dictionaries
        // carry no back-pointer to their merged ancestor context. `/Parent`
        // gives us the chain directly and more cheaply than a full re-walk.
        let mut chain = vec![leaf];
        let mut current = leaf;
        let mut seen = HashSet::new();
        while let Ok(dict) = self.get_dictionary(current) {
            if !seen.insert(current) {
                break;
            }
            match dict.get(b"Parent").and_then(Object::as_reference) {
                Ok(parent) => {
                    chain.push(parent);
                    current = parent;
                }
                Err(_) => break,
            }
        }

        let mut merged = InheritedAttrs::default();
        for &id in chain.iter().rev() {
            if let Ok(dict) = self.get_dictionary(id) {
                merged = merge_inherited(&merged, dict);
            }
        }
        Ok(merged)
    }

    fn decode_page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let dict = self.get_dictionary(page_id)?;
        let contents = match dict.get(b"Contents") {
            Ok(obj) => obj,
            Err(_) => return Ok(Vec::new()),
        };

        let mut data = Vec::new();
        match contents {
            Object::Reference(id) => self.append_stream_content(*id, &mut data)?,
            Object::Array(items) => {
                for item in items {
                    if let Ok(id) = item.as_reference() {
                        self.append_stream_content(id, &mut data)?;
                        data.push(b'\n');
                    }
                }
            }
            _ => {}
        }
        Ok(data)
    }

    fn append_stream_content(&self, id: ObjectId, out: &mut Vec<u8>) -> Result<()> {
        let stream = self.get_object(id)?.as_stream()?;
        out.extend_from_slice(&stream.decompressed_content()?);
        Ok(())
    }

    fn build_font_table(&self, page_id: ObjectId) -> Result<HashMap<String, FontDecoder>> {
        let mut table = HashMap::new();
        let inherited = self.inherited_attrs_for(page_id)?;
        let Some(resources) = inherited.resources else {
            return Ok(table);
        };
        let Ok(font_dict) = resources.get(b"Font").and_then(Object::as_dict) else {
            return Ok(table);
        };

        for (name, value) in font_dict.iter() {
            let Ok(font_ref) = value.as_reference() else { continue };
            let Ok(font) = self.get_dictionary(font_ref) else { continue };
            let to_unicode = font
                .get(b"ToUnicode")
                .and_then(Object::as_reference)
                .and_then(|id| self.get_object(id))
                .and_then(|o| o.as_stream())
                .and_then(|s| s.decompressed_content())
                .ok();
            if let Ok(decoder) = FontDecoder::from_font_dict(font, to_unicode.as_deref()) {
                table.insert(String::from_utf8_lossy(name).into_owned(), decoder);
            }
        }
        Ok(table)
    }
}

fn merge_inherited(parent: &InheritedAttrs, dict: &Dictionary) -> InheritedAttrs {
    InheritedAttrs {
        resources: dict.get(b"Resources").and_then(Object::as_dict).ok().cloned().or_else(|| parent.resources.clone()),
        media_box: rect_from(dict, b"MediaBox").or(parent.media_box),
        crop_box: rect_from(dict, b"CropBox").or(parent.crop_box),
        rotation: dict.get(b"Rotate").and_then(Object::as_i64).ok().or(parent.rotation),
    }
}

fn outline_destination(dict: &Dictionary) -> Option<ObjectId> {
    if let Ok(arr) = dict.get(b"Dest").and_then(Object::as_array) {
        return arr.first()?.as_reference().ok();
    }
    if let Ok(action) = dict.get(b"A").and_then(Object::as_dict) {
        if let Ok(arr) = action.get(b"D").and_then(Object::as_array) {
            return arr.first()?.as_reference().ok();
        }
    }
    None
}

fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..].chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn rect_from(dict: &Dictionary, key: &[u8]) -> Option<[f64; 4]> {
    let arr = dict.get(key).and_then(Object::as_array).ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut rect = [0.0; 4];
    for (i, v) in arr.iter().enumerate() {
        rect[i] = v.as_f64().ok()?;
    }
    Some(rect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Stream;
    use crate::xref::{Xref, XrefEntry, XrefType};

    fn minimal_document() -> Document {
        let mut doc = Document::new();
        doc.trailer.set(b"Root", (1u32, 0u16));
        doc.trailer.set(b"Size", 4i64);

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
        page.set(b"MediaBox", Object::Array(vec![0.0.into(), 0.0.into(), 612.0.into(), 792.0.into()]));
        page.set(b"Contents", (4u32, 0u16));
        doc.objects.insert((3, 0), Object::Dictionary(page));

        let content = b"BT /F1 12 Tf 72 720 Td (Hi) Tj ET".to_vec();
        let stream = Stream::new(Dictionary::new(), content);
        doc.objects.insert((4, 0), Object::Stream(stream));

        let mut xref = Xref::new(5, XrefType::Table);
        for n in 1..5 {
            xref.insert(n, XrefEntry::Normal { offset: 0, generation: 0 });
        }
        doc.reference_table = xref;
        doc
    }

    #[test]
    fn page_order_matches_kids_order() {
        let doc = minimal_document();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[&1], (3, 0));
    }

    #[test]
    fn extract_text_runs_interpreter_over_page_content() {
        let doc = minimal_document();
        let pages: Vec<_> = doc.get_pages().values().copied().collect();
        let text = doc.extract_text(&pages).unwrap();
        assert_eq!(text, "Hi\n");
    }

    #[test]
    fn get_outlines_walks_first_next_chain() {
        let mut doc = minimal_document();

        let mut root = Dictionary::new();
        root.set(b"Type", Object::name(b"Outlines".to_vec()));
        root.set(b"First", (10u32, 0u16));
        doc.objects.insert((5, 0), Object::Dictionary(root));

        let mut catalog = doc.objects.get(&(1, 0)).unwrap().as_dict().unwrap().clone();
        catalog.set(b"Outlines", (5u32, 0u16));
        doc.objects.insert((1, 0), Object::Dictionary(catalog));

        let mut child = Dictionary::new();
        child.set(b"Title", Object::String(b"Chapter 1".to_vec(), crate::object::StringFormat::Literal));
        child.set(b"Dest", Object::Array(vec![Object::Reference((3, 0))]));
        child.set(b"Next", (11u32, 0u16));
        doc.objects.insert((10, 0), Object::Dictionary(child));

        let mut sibling = Dictionary::new();
        sibling.set(b"Title", Object::String(b"Chapter 2".to_vec(), crate::object::StringFormat::Literal));
        doc.objects.insert((11, 0), Object::Dictionary(sibling));

        let outlines = doc.get_outlines().unwrap();
        assert_eq!(outlines.len(), 2);
        assert_eq!(outlines[0].title, "Chapter 1");
        assert_eq!(outlines[0].dest, Some((3, 0)));
        assert_eq!(outlines[1].title, "Chapter 2");
        assert_eq!(outlines[1].dest, None);
    }

    #[test]
    fn media_box_inherited_from_pages_node() {
        let doc = minimal_document();
        let page = doc.build_page(1, (3, 0)).unwrap();
        assert_eq!(page.media_box, [0.0, 0.0, 612.0, 792.0]);
    }
}
