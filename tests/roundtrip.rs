//! Integration tests covering the library's end-to-end seed scenarios:
//! minimal document parsing, incremental-update revision tracking, text
//! extraction through the full page pipeline, vector-graphic extraction,
//! and a standard-security-handler encrypt/decrypt round trip.

use pdfcore::encryption::{decrypt_bytes, encrypt_bytes, CryptMethod, EncryptionState};
use pdfcore::object::{Dictionary, Object, Stream};
use pdfcore::xref::{Xref, XrefEntry, XrefType};
use pdfcore::Document;

fn sample_pdf() -> Vec<u8> {
    let body = "%PDF-1.5
1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj
2 0 obj<</Type/Pages/Kids[3 0 R]/Count 1>>endobj
3 0 obj<</Type/Page/Parent 2 0 R/Contents 4 0 R/MediaBox[0 0 595 842]>>endobj
4 0 obj<</Length 44>>stream
BT /F1 24 Tf 72 700 Td (Hello World!) Tj ET
endstream endobj\n";
    let xref_offset = body.len();
    format!(
        "{body}xref\n0 5\n0000000000 65535 f \n0000000009 00000 n \n0000000052 00000 n \n0000000101 00000 n \n0000000184 00000 n \ntrailer\n<</Root 1 0 R/Size 5>>\nstartxref\n{xref_offset}\n%%EOF"
    )
    .into_bytes()
}

/// S1: a minimal single-page document parses and its catalog resolves.
#[test]
fn s1_minimal_document_parses() {
    let doc = Document::load_mem(&sample_pdf()).unwrap();
    assert_eq!(doc.version, "1.5");
    assert!(doc.catalog().is_ok());
    assert_eq!(doc.revision_count(), 1);
}

/// S2: an incrementally updated document exposes both revisions and can
/// slice the original bytes back out of the combined buffer.
#[test]
fn s2_incremental_update_exposes_both_revisions() {
    let original = sample_pdf();
    let original_xref_offset = original.windows(6).position(|w| w == b"\nxref\n").map(|p| p + 1).unwrap();

    let mut combined = original.clone();
    let append_offset = combined.len();
    combined.extend_from_slice(b"5 0 obj<</Type/Catalog/Pages 2 0 R/Extra true>>endobj\n");
    let new_xref_offset = combined.len();
    combined.extend_from_slice(
        format!(
            "xref\n5 1\n{append_offset:010} 00000 n \ntrailer\n<</Root 5 0 R/Size 6/Prev {original_xref_offset}>>\nstartxref\n{new_xref_offset}\n%%EOF"
        )
        .as_bytes(),
    );

    let doc = Document::load_mem(&combined).unwrap();
    assert_eq!(doc.revision_count(), 2);

    let first = doc.extract_revision(&combined, 1).unwrap();
    assert_eq!(first, original.as_slice());

    let second = doc.extract_revision(&combined, 2).unwrap();
    assert!(second.starts_with(b"5 0 obj"));
}

/// S3: text shown via `Tj` comes back out through the full page pipeline.
#[test]
fn s3_extracts_text_from_page_content() {
    let doc = Document::load_mem(&sample_pdf()).unwrap();
    let page_ids: Vec<_> = doc.get_pages().values().copied().collect();
    let text = doc.extract_text(&page_ids).unwrap();
    assert_eq!(text, "Hello World!\n");
}

/// S4: a filled rectangle path (`re ... f`) surfaces as a `Rectangle`
/// vector graphic with the expected bounding box.
#[test]
fn s4_extracts_rectangle_graphic() {
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

    let content = b"1 0 0 RG 50 60 100 200 re f".to_vec();
    doc.objects.insert((4, 0), Object::Stream(Stream::new(Dictionary::new(), content)));

    let mut xref = Xref::new(5, XrefType::Table);
    for n in 1..5 {
        xref.insert(n, XrefEntry::Normal { offset: 0, generation: 0 });
    }
    doc.reference_table = xref;

    let pages = doc.get_page_objects().unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].graphics.len(), 1);
    let rect = &pages[0].graphics[0];
    assert_eq!(rect.kind, pdfcore::GraphicKind::Rectangle);
    assert_eq!(rect.bbox, (50.0, 60.0, 150.0, 260.0));
}

/// S6: an R6 (AES-256) crypt filter round-trips a stream payload.
#[test]
fn s6_aes256_r6_round_trip() {
    let state = EncryptionState {
        v: 5,
        r: 6,
        key_len: 32,
        method: CryptMethod::AesV3,
        o: vec![0; 48],
        u: vec![0; 48],
        oe: vec![0; 32],
        ue: vec![0; 32],
        p: -3904,
        encrypt_metadata: true,
        id0: b"0123456789012345".to_vec(),
        key: (0..32u8).collect(),
    };
    let id = (9, 0);
    let plaintext = b"BT /F1 12 Tf 72 720 Td (Secret) Tj ET".to_vec();

    let encrypted = encrypt_bytes(&state, id, &plaintext).unwrap();
    assert_ne!(encrypted, plaintext);

    let decrypted = decrypt_bytes(&state, id, &encrypted).unwrap();
    assert_eq!(decrypted, plaintext);
}

/// A document with no changes round-trips through the writer byte for
/// byte, and one with a changed object saves as a true incremental
/// update layered on top of the original bytes.
#[test]
fn writer_round_trip_and_incremental_save() {
    let original = sample_pdf();
    let doc = Document::load_mem(&original).unwrap();

    let mut incremental = pdfcore::IncrementalDocument::create_from(original.clone(), doc);
    assert!(!incremental.is_dirty());

    let mut unchanged = Vec::new();
    incremental.save_to(&mut unchanged).unwrap();
    assert_eq!(unchanged, original);

    let mut updated_catalog = Dictionary::new();
    updated_catalog.set(b"Type", Object::name(b"Catalog".to_vec()));
    updated_catalog.set(b"Pages", (2u32, 0u16));
    updated_catalog.set(b"Extra", Object::Boolean(true));
    incremental.set_object((1, 0), Object::Dictionary(updated_catalog));
    assert!(incremental.is_dirty());

    let mut appended = Vec::new();
    incremental.save_to(&mut appended).unwrap();
    assert!(appended.starts_with(&original));
    assert!(appended.len() > original.len());

    let reloaded = Document::load_mem(&appended).unwrap();
    assert_eq!(reloaded.revision_count(), 2);
}
