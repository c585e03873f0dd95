//! Security layer (spec §4.5): parses the encryption dictionary, derives
//! the file encryption key, verifies credentials, and crypts individual
//! objects/streams.

pub mod pkcs5;
mod rc4;
mod standard;

pub use standard::{decrypt_bytes, encrypt_bytes, verify_r2_r4, CryptMethod, EncryptionState};

use crate::error::Result;
use crate::object::{Object, ObjectId};

/// Decrypts every string and the stream payload (if any) contained
/// directly in `object`, in place. Dictionary structure — delimiters,
/// names, numbers, and references — is never touched: only the bytes
/// spec §4.5 designates as encrypted are decrypted here.
pub fn decrypt_object(state: &EncryptionState, id: ObjectId, object: &mut Object) -> Result<()> {
    if let Object::Stream(stream) = object {
        let decrypted = decrypt_bytes(state, id, &stream.content)?;
        stream.set_content(decrypted);
    }
    let mut error = None;
    object.for_each_string_mut(&mut |s| match decrypt_bytes(state, id, s) {
        Ok(plain) => *s = plain,
        Err(e) => error = Some(e),
    });
    if let Some(e) = error {
        return Err(e);
    }
    Ok(())
}

/// Encrypts every string and the stream payload (if any) contained
/// directly in `object`, in place. Mirror of [`decrypt_object`] used by the
/// writer when emitting an encrypted document.
pub fn encrypt_object(state: &EncryptionState, id: ObjectId, object: &mut Object) -> Result<()> {
    if let Object::Stream(stream) = object {
        let encrypted = encrypt_bytes(state, id, &stream.content)?;
        stream.set_content(encrypted);
    }
    let mut error = None;
    object.for_each_string_mut(&mut |s| match encrypt_bytes(state, id, s) {
        Ok(cipher) => *s = cipher,
        Err(e) => error = Some(e),
    });
    if let Some(e) = error {
        return Err(e);
    }
    Ok(())
}
