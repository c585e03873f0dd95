//! A pure-Rust library for reading, decrypting, and interpreting PDF
//! documents: structural parsing across incremental revisions, the
//! standard security handler (RC4 and AES, revisions 2 through 6), and a
//! content-stream interpreter that turns page operators into text,
//! vector graphics, and image placements.

pub mod content;
pub mod destinations;
pub mod document;
pub mod encodings;
pub mod encryption;
pub mod error;
pub mod filters;
pub mod font;
pub mod object;
pub mod object_stream;
pub mod page;
mod parser;
pub mod reader;
pub mod revision;
pub mod writer;
pub mod xref;

pub use content::{interpret, GraphicKind, ImagePlacement, InterpretedContent, Matrix, TextElement, VectorGraphic};
pub use destinations::Destination;
pub use document::Document;
pub use encryption::{CryptMethod, EncryptionState};
pub use error::{DecryptionError, Error, ParseError, Result, XrefError};
pub use font::FontDecoder;
pub use object::{Dictionary, Object, ObjectId, ObjectMap, Stream, StringFormat};
pub use page::{Outline, Page};
pub use reader::{FilterFunc, PdfMetadata, Reader};
pub use revision::Revision;
pub use writer::{IncrementalDocument, Writer};
pub use xref::{Xref, XrefEntry, XrefType};
