//! Content-stream interpreter (spec §4.7): runs the stack-based operator
//! language over a decoded page content stream and emits positioned text
//! runs, vector graphics, and image placements. Grounded on the operator
//! catalog and lexer shape of `connorskees-pdf`'s `content` module, since
//! the parser teacher carries no interpreter of its own.

use std::collections::HashMap;

use crate::font::FontDecoder;
use crate::object::Object;
use crate::parser::content_stream_tokens;

/// A 2D affine transform `[a b c d e f]`, applied to a point `(x, y)` as
/// `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    /// Pre-multiplies `self` by `other` (`other` is applied first), the
    /// semantics `cm` requires per spec §9's resolved design note.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: other.a * self.a + other.b * self.c,
            b: other.a * self.b + other.b * self.d,
            c: other.c * self.a + other.d * self.c,
            d: other.c * self.b + other.d * self.d,
            e: other.e * self.a + other.f * self.c + self.e,
            f: other.e * self.b + other.f * self.d + self.f,
        }
    }
}

/// One decoded, positioned run of text (spec §3, entity `TextElement`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextElement {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font: String,
    pub size: f64,
    pub char_spacing: f64,
    pub word_spacing: f64,
    pub rise: f64,
    pub text_matrix: [f64; 6],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicKind {
    Rectangle,
    Line,
    Path,
}

/// A painted vector primitive (spec §3, entity `VectorGraphic`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VectorGraphic {
    pub kind: GraphicKind,
    pub bbox: (f64, f64, f64, f64),
    pub stroke_color: Option<(f64, f64, f64)>,
    pub fill_color: Option<(f64, f64, f64)>,
    pub line_width: f64,
}

/// An XObject placement at the point of a `Do` operator (spec §3, entity
/// `ImagePlacement`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImagePlacement {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub matrix: [f64; 6],
}

#[derive(Debug, Clone)]
struct TextState {
    font: String,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    leading: f64,
    rise: f64,
    horizontal_scale: f64,
    matrix: Matrix,
    line_matrix: Matrix,
    active: bool,
}

impl Default for TextState {
    fn default() -> Self {
        TextState {
            font: String::new(),
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            leading: 0.0,
            rise: 0.0,
            horizontal_scale: 1.0,
            matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            active: false,
        }
    }
}

/// Transient interpreter state (spec §3, entity `ContentStreamState`):
/// the CTM stack, current colors/line width, and the nested text state.
#[derive(Debug, Clone)]
pub struct ContentStreamState {
    ctm: Matrix,
    ctm_stack: Vec<(Matrix, f64, Option<(f64, f64, f64)>, Option<(f64, f64, f64)>)>,
    line_width: f64,
    fill_color: Option<(f64, f64, f64)>,
    stroke_color: Option<(f64, f64, f64)>,
    text: TextState,
    path_start: Option<(f64, f64)>,
    path_current: Option<(f64, f64)>,
    path_bbox: Option<(f64, f64, f64, f64)>,
    pending_rect: Option<(f64, f64, f64, f64)>,
}

impl Default for ContentStreamState {
    fn default() -> Self {
        ContentStreamState {
            ctm: Matrix::IDENTITY,
            ctm_stack: Vec::new(),
            line_width: 1.0,
            fill_color: None,
            stroke_color: None,
            text: TextState::default(),
            path_start: None,
            path_current: None,
            path_bbox: None,
            pending_rect: None,
        }
    }
}

/// The result of interpreting one content stream.
#[derive(Debug, Clone, Default)]
pub struct InterpretedContent {
    pub text: Vec<TextElement>,
    pub graphics: Vec<VectorGraphic>,
    pub images: Vec<ImagePlacement>,
}

/// Runs the interpreter over a decompressed content stream, resolving font
/// resource names to decoders via `fonts` (built by the page walker from
/// the page's merged `/Resources`).
pub fn interpret(data: &[u8], fonts: &HashMap<String, FontDecoder>) -> InterpretedContent {
    let mut state = ContentStreamState::default();
    let mut out = InterpretedContent::default();

    for (operands, op) in content_stream_tokens(data) {
        run_operator(&mut state, &mut out, fonts, &op, &operands);
    }
    out
}

fn f64_at(operands: &[Object], i: usize) -> f64 {
    operands.get(i).and_then(|o| o.as_f64().ok()).unwrap_or(0.0)
}

fn name_at(operands: &[Object], i: usize) -> String {
    operands
        .get(i)
        .and_then(|o| o.as_name().ok())
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .unwrap_or_default()
}

fn run_operator(
    state: &mut ContentStreamState, out: &mut InterpretedContent, fonts: &HashMap<String, FontDecoder>, op: &str,
    operands: &[Object],
) {
    match op {
        "q" => {
            state
                .ctm_stack
                .push((state.ctm, state.line_width, state.fill_color, state.stroke_color));
        }
        "Q" => {
            if let Some((ctm, lw, fill, stroke)) = state.ctm_stack.pop() {
                state.ctm = ctm;
                state.line_width = lw;
                state.fill_color = fill;
                state.stroke_color = stroke;
            }
        }
        "cm" if operands.len() >= 6 => {
            let m = Matrix {
                a: f64_at(operands, 0),
                b: f64_at(operands, 1),
                c: f64_at(operands, 2),
                d: f64_at(operands, 3),
                e: f64_at(operands, 4),
                f: f64_at(operands, 5),
            };
            state.ctm = state.ctm.multiply(&m);
        }
        "w" => state.line_width = f64_at(operands, 0),
        "g" => state.fill_color = Some((f64_at(operands, 0), f64_at(operands, 0), f64_at(operands, 0))),
        "G" => state.stroke_color = Some((f64_at(operands, 0), f64_at(operands, 0), f64_at(operands, 0))),
        "rg" => state.fill_color = Some((f64_at(operands, 0), f64_at(operands, 1), f64_at(operands, 2))),
        "RG" => state.stroke_color = Some((f64_at(operands, 0), f64_at(operands, 1), f64_at(operands, 2))),
        "k" => state.fill_color = Some(cmyk_to_rgb(operands)),
        "K" => state.stroke_color = Some(cmyk_to_rgb(operands)),

        "re" if operands.len() >= 4 => {
            let (x, y, w, h) = (f64_at(operands, 0), f64_at(operands, 1), f64_at(operands, 2), f64_at(operands, 3));
            state.pending_rect = Some((x, y, x + w, y + h));
            state.path_start = Some((x, y));
            state.path_current = Some((x, y));
        }
        "m" if operands.len() >= 2 => {
            let p = (f64_at(operands, 0), f64_at(operands, 1));
            state.path_start = Some(p);
            state.path_current = Some(p);
            extend_bbox(state, p);
            state.pending_rect = None;
        }
        "l" if operands.len() >= 2 => {
            let p = (f64_at(operands, 0), f64_at(operands, 1));
            state.path_current = Some(p);
            extend_bbox(state, p);
            state.pending_rect = None;
        }
        "c" if operands.len() >= 6 => {
            let p = (f64_at(operands, 4), f64_at(operands, 5));
            state.path_current = Some(p);
            extend_bbox(state, p);
            state.pending_rect = None;
        }
        "v" | "y" if operands.len() >= 4 => {
            let p = (f64_at(operands, 2), f64_at(operands, 3));
            state.path_current = Some(p);
            extend_bbox(state, p);
            state.pending_rect = None;
        }
        "h" => {
            if let Some(start) = state.path_start {
                state.path_current = Some(start);
            }
        }

        "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
            let kind = if state.pending_rect.is_some() { GraphicKind::Rectangle } else { GraphicKind::Path };
            let bbox = state.pending_rect.or(state.path_bbox);
            if let Some(bbox) = bbox {
                out.graphics.push(VectorGraphic {
                    kind,
                    bbox,
                    stroke_color: state.stroke_color,
                    fill_color: state.fill_color,
                    line_width: state.line_width,
                });
            }
            state.pending_rect = None;
            state.path_bbox = None;
            state.path_start = None;
            state.path_current = None;
        }
        "n" => {
            state.pending_rect = None;
            state.path_bbox = None;
        }

        "BT" => {
            state.text = TextState::default();
            state.text.active = true;
        }
        "ET" => state.text.active = false,
        "Tf" if operands.len() >= 2 => {
            state.text.font = name_at(operands, 0);
            state.text.size = f64_at(operands, 1);
        }
        "Tc" => state.text.char_spacing = f64_at(operands, 0),
        "Tw" => state.text.word_spacing = f64_at(operands, 0),
        "Ts" => state.text.rise = f64_at(operands, 0),
        "TL" => state.text.leading = f64_at(operands, 0),
        "Tz" => state.text.horizontal_scale = f64_at(operands, 0) / 100.0,
        "Td" if operands.len() >= 2 => {
            let translate = Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: f64_at(operands, 0), f: f64_at(operands, 1) };
            state.text.line_matrix = state.text.line_matrix.multiply(&translate);
            state.text.matrix = state.text.line_matrix;
        }
        "TD" if operands.len() >= 2 => {
            state.text.leading = -f64_at(operands, 1);
            let translate = Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: f64_at(operands, 0), f: f64_at(operands, 1) };
            state.text.line_matrix = state.text.line_matrix.multiply(&translate);
            state.text.matrix = state.text.line_matrix;
        }
        "Tm" if operands.len() >= 6 => {
            let m = Matrix {
                a: f64_at(operands, 0),
                b: f64_at(operands, 1),
                c: f64_at(operands, 2),
                d: f64_at(operands, 3),
                e: f64_at(operands, 4),
                f: f64_at(operands, 5),
            };
            state.text.line_matrix = m;
            state.text.matrix = m;
        }
        "T*" => {
            let translate = Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: -state.text.leading };
            state.text.line_matrix = state.text.line_matrix.multiply(&translate);
            state.text.matrix = state.text.line_matrix;
        }

        "Tj" if !operands.is_empty() => emit_text(state, out, fonts, &operands[0], None),
        "'" if !operands.is_empty() => {
            let translate = Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: -state.text.leading };
            state.text.line_matrix = state.text.line_matrix.multiply(&translate);
            state.text.matrix = state.text.line_matrix;
            emit_text(state, out, fonts, &operands[0], None);
        }
        "\"" if operands.len() >= 3 => {
            state.text.word_spacing = f64_at(operands, 0);
            state.text.char_spacing = f64_at(operands, 1);
            let translate = Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: -state.text.leading };
            state.text.line_matrix = state.text.line_matrix.multiply(&translate);
            state.text.matrix = state.text.line_matrix;
            emit_text(state, out, fonts, &operands[2], None);
        }
        "TJ" if !operands.is_empty() => {
            if let Some(Object::Array(items)) = operands.first() {
                emit_text_array(state, out, fonts, items);
            }
        }

        "Do" if !operands.is_empty() => {
            let name = name_at(operands, 0);
            out.images.push(ImagePlacement {
                name,
                x: state.ctm.e,
                y: state.ctm.f,
                width: state.ctm.a.abs(),
                height: state.ctm.d.abs(),
                matrix: [state.ctm.a, state.ctm.b, state.ctm.c, state.ctm.d, state.ctm.e, state.ctm.f],
            });
        }
        _ => {}
    }
}

fn cmyk_to_rgb(operands: &[Object]) -> (f64, f64, f64) {
    let (c, m, y, k) = (f64_at(operands, 0), f64_at(operands, 1), f64_at(operands, 2), f64_at(operands, 3));
    ((1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k))
}

fn extend_bbox(state: &mut ContentStreamState, (x, y): (f64, f64)) {
    state.path_bbox = Some(match state.path_bbox {
        None => (x, y, x, y),
        Some((lx, ly, ux, uy)) => (lx.min(x), ly.min(y), ux.max(x), uy.max(y)),
    });
}

fn emit_text(
    state: &ContentStreamState, out: &mut InterpretedContent, fonts: &HashMap<String, FontDecoder>, obj: &Object,
    override_text: Option<String>,
) {
    let text = override_text.unwrap_or_else(|| match obj {
        Object::String(bytes, _) => fonts.get(&state.text.font).map(|f| f.decode_bytes(bytes)).unwrap_or_else(|| {
            String::from_utf8_lossy(bytes).into_owned()
        }),
        _ => String::new(),
    });
    if text.is_empty() {
        return;
    }
    out.text.push(TextElement {
        text,
        x: state.text.matrix.e,
        y: state.text.matrix.f,
        font: state.text.font.clone(),
        size: state.text.size,
        char_spacing: state.text.char_spacing,
        word_spacing: state.text.word_spacing,
        rise: state.text.rise,
        text_matrix: [
            state.text.matrix.a,
            state.text.matrix.b,
            state.text.matrix.c,
            state.text.matrix.d,
            state.text.matrix.e,
            state.text.matrix.f,
        ],
    });
}

/// `TJ`: strings are concatenated and numeric kerns are ignored for text
/// extraction (spec §4.7), emitted as a single text element.
fn emit_text_array(
    state: &ContentStreamState, out: &mut InterpretedContent, fonts: &HashMap<String, FontDecoder>, items: &[Object],
) {
    let mut combined = String::new();
    for item in items {
        if let Object::String(bytes, _) = item {
            let decoded =
                fonts.get(&state.text.font).map(|f| f.decode_bytes(bytes)).unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned());
            combined.push_str(&decoded);
        }
    }
    emit_text(state, out, fonts, &Object::Null, Some(combined));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tj_emits_one_text_element() {
        let data = b"BT /F1 12 Tf 72 720 Td (Hello World) Tj ET";
        let fonts = HashMap::new();
        let result = interpret(data, &fonts);
        assert_eq!(result.text.len(), 1);
        assert_eq!(result.text[0].text, "Hello World");
        assert_eq!(result.text[0].x, 72.0);
        assert_eq!(result.text[0].y, 720.0);
        assert_eq!(result.text[0].font, "F1");
        assert_eq!(result.text[0].size, 12.0);
    }

    #[test]
    fn tj_array_concatenates_and_drops_kerns() {
        let data = b"BT /F1 12 Tf 72 720 Td [(Hello) -20 (World)] TJ ET";
        let fonts = HashMap::new();
        let result = interpret(data, &fonts);
        assert_eq!(result.text.len(), 1);
        assert_eq!(result.text[0].text, "HelloWorld");
    }

    #[test]
    fn rectangle_fill_emits_vector_graphic() {
        let data = b"0.8 0.8 0.8 rg 100 100 200 150 re f";
        let fonts = HashMap::new();
        let result = interpret(data, &fonts);
        assert_eq!(result.graphics.len(), 1);
        let g = &result.graphics[0];
        assert_eq!(g.kind, GraphicKind::Rectangle);
        assert_eq!(g.bbox, (100.0, 100.0, 300.0, 250.0));
        assert_eq!(g.fill_color, Some((0.8, 0.8, 0.8)));
    }

    #[test]
    fn unknown_operator_is_skipped() {
        let data = b"BT /F1 12 Tf 72 720 Td (A) Tj 1 2 3 zzz (B) Tj ET";
        let fonts = HashMap::new();
        let result = interpret(data, &fonts);
        assert_eq!(result.text.len(), 2);
    }
}
