#[test]
fn zzdebug() {
    let body = "%PDF-1.5
1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj
2 0 obj<</Type/Pages/Kids[3 0 R]/Count 1>>endobj
3 0 obj<</Type/Page/Parent 2 0 R/Contents 4 0 R/MediaBox[0 0 595 842]>>endobj
4 0 obj<</Length 44>>stream
BT /F1 24 Tf 72 700 Td (Hello World!) Tj ET
endstream endobj\n";
    let xref_offset = body.len();
    let doc = format!(
        "{body}xref\n0 5\n0000000000 65535 f \n0000000009 00000 n \n0000000052 00000 n \n0000000101 00000 n \n0000000184 00000 n \ntrailer\n<</Root 1 0 R/Size 5>>\nstartxref\n{xref_offset}\n%%EOF"
    );
    let d = pdfcore::Document::load_mem(doc.as_bytes()).unwrap();
    let out = pdfcore::Writer::write(&d).unwrap();
    std::fs::write("/tmp/out.pdf", &out).unwrap();
    println!("{}", String::from_utf8_lossy(&out));
}
