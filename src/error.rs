use std::num::TryFromIntError;

use crate::ObjectId;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error taxonomy. Variants group by the failure kinds named in
/// the crate's error-handling design: malformed input, not-found, unsupported
/// features, credential failures, crypto primitive failures, internal
/// invariant violations, and writer-input problems.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("xref error: {0}")]
    Xref(#[from] XrefError),

    #[error("decryption error: {0}")]
    Decryption(#[from] DecryptionError),

    #[error("I/O error: {0}")]
    IO(#[from] std::io::Error),

    #[error("object {0:?} not found")]
    ObjectNotFound(ObjectId),

    #[error("missing xref entry")]
    MissingXrefEntry,

    #[error("reference cycle detected while resolving object {0:?}")]
    ReferenceCycle(ObjectId),

    #[error("invalid offset: {0}")]
    InvalidOffset(usize),

    #[error("invalid stream: {0}")]
    InvalidStream(String),

    #[error("numeric cast failed: {0}")]
    NumericCast(String),

    #[error("type mismatch: expected {0}")]
    Type(&'static str),

    #[error("dictionary key not found: {0}")]
    DictKey(String),

    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("unsupported encryption version/revision: V={v} R={r}")]
    EncryptionVersionUnsupported { v: i64, r: i64 },

    #[error("unsupported predictor: {0}")]
    UnsupportedPredictor(i64),

    #[error("password is invalid")]
    InvalidPassword,

    #[error("document is not encrypted")]
    NotEncrypted,

    #[error("writer is missing a /Root reference")]
    WriterMissingRoot,

    #[error("incremental update requested without a parsed base document")]
    IncrementalWithoutParsedBase,

    #[error("writer input is malformed: {0}")]
    WriterInput(String),

    #[error("internal invariant violated: {0}")]
    Invariant(String),

    #[error("feature not implemented: {0}")]
    Unimplemented(&'static str),

    #[error("object-stream index {0} out of range")]
    ObjStmIndexOutOfRange(usize),

    #[error("object-stream object number mismatch: expected {expected}, found {found}")]
    ObjStmObjNumMismatch { expected: u32, found: u32 },
}

impl From<TryFromIntError> for Error {
    fn from(e: TryFromIntError) -> Self {
        Error::NumericCast(e.to_string())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid file header")]
    InvalidFileHeader,
    #[error("invalid object header")]
    InvalidObjectHeader,
    #[error("unbalanced delimiters")]
    UnbalancedDelimiters,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("invalid xref section")]
    InvalidXref,
    #[error("invalid dictionary")]
    InvalidDictionary,
    #[error("invalid number")]
    InvalidNumber,
    #[error("endobj not found within revision")]
    MissingEndobj,
    #[error("malformed object at offset {0}")]
    MalformedObject(usize),
    #[error("malformed content stream")]
    MalformedContentStream,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum XrefError {
    #[error("could not locate startxref")]
    Start,
    #[error("could not locate /Prev xref")]
    PrevStart,
    #[error("could not locate hybrid /XRefStm")]
    StreamStart,
    #[error("cross-reference chain contains a cycle")]
    Cycle,
    #[error("failed to decode xref stream")]
    XRefDecodeFailure,
    #[error("trailer is missing a required entry: {0}")]
    MissingTrailerEntry(&'static str),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    #[error("bad padding")]
    BadPadding,
    #[error("ciphertext length is not a multiple of the block size")]
    InvalidBlockLength,
    #[error("encryption dictionary is malformed: {0}")]
    MalformedEncryptDict(String),
    #[error("unsupported crypt filter")]
    UnsupportedCryptFilter,
}
