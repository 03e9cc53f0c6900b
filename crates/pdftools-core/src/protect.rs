//! Password protection
//!
//! Implements the PDF Standard Security Handler, revision 3: RC4 with a
//! 128-bit file key derived from the user password, the owner entry and the
//! file identifier. Every string and stream in the file is encrypted with a
//! key derived per object.

use crate::error::PdfToolsError;
use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};
use md5::{Digest, Md5};
use rc4::{consts::U16, KeyInit, Rc4, StreamCipher};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Password padding string from the PDF specification
const PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
    0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
    0x69, 0x7A,
];

const KEY_LEN: usize = 16;
const REVISION: i64 = 3;

type FileKey = [u8; KEY_LEN];

/// What a holder of the document is allowed to do without the owner password
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub print: bool,
    pub modify: bool,
    pub copy: bool,
    pub annotate: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            print: true,
            modify: true,
            copy: true,
            annotate: true,
        }
    }
}

impl Permissions {
    /// The `/P` value: reserved bits set, permission bits per flag
    pub fn to_p(&self) -> i32 {
        let mut bits: u32 = 0xFFFF_F0C0;
        if self.print {
            bits |= 0x0004 | 0x0800; // print, high-quality print
        }
        if self.modify {
            bits |= 0x0008 | 0x0400; // modify, assemble
        }
        if self.copy {
            bits |= 0x0010 | 0x0200; // copy, extract for accessibility
        }
        if self.annotate {
            bits |= 0x0020 | 0x0100; // annotate, fill forms
        }
        bits as i32
    }
}

/// Passwords applied when protecting a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Required to open the document
    pub user_password: String,
    /// Grants full access; defaults to the user password
    #[serde(default)]
    pub owner_password: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
}

impl Credential {
    pub fn new(user_password: impl Into<String>) -> Self {
        Self {
            user_password: user_password.into(),
            owner_password: None,
            permissions: Permissions::default(),
        }
    }

    pub fn with_owner_password(mut self, owner_password: impl Into<String>) -> Self {
        self.owner_password = Some(owner_password.into());
        self
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Which password authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccessLevel {
    User,
    Owner,
}

/// Encrypt a document so it cannot be opened without the user password
pub fn protect_document(bytes: &[u8], credential: &Credential) -> Result<Vec<u8>, PdfToolsError> {
    if credential.user_password.is_empty() {
        return Err(PdfToolsError::Validation(
            "Please enter a password to protect the PDF".into(),
        ));
    }

    let mut doc =
        Document::load_mem(bytes).map_err(|e| PdfToolsError::DocumentLoad(e.to_string()))?;
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(PdfToolsError::Validation("PDF is already protected".into()));
    }

    let file_id = ensure_file_id(&mut doc, bytes);
    let user = pad_password(&credential.user_password);
    let owner = pad_password(
        credential
            .owner_password
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&credential.user_password),
    );
    let p = credential.permissions.to_p();

    let o_entry = compute_owner_entry(&owner, &user);
    let key = compute_file_key(&user, &o_entry, p, &file_id);
    let u_entry = compute_user_entry(&key, &file_id);

    drop_cross_reference_streams(&mut doc);
    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();
    for id in ids {
        if let Some(object) = doc.objects.get_mut(&id) {
            transform_object(object, &object_key(&key, id), Direction::Encrypt);
        }
    }

    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 2,
        "R" => REVISION,
        "Length" => (KEY_LEN * 8) as i64,
        "O" => Object::String(o_entry.to_vec(), StringFormat::Hexadecimal),
        "U" => Object::String(u_entry.to_vec(), StringFormat::Hexadecimal),
        "P" => p as i64,
    });
    doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
    if doc.version.as_str() < "1.4" {
        doc.version = "1.4".to_string();
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| PdfToolsError::Serialization(format!("Failed to save protected PDF: {}", e)))?;

    // The output must only open with the credential it was given
    if authenticate(&output, "")?.is_some()
        || authenticate(&output, &credential.user_password)?.is_none()
    {
        return Err(PdfToolsError::Serialization(
            "Protected output failed password verification".into(),
        ));
    }

    info!(
        input = bytes.len(),
        output = output.len(),
        objects = doc.objects.len(),
        "protected PDF"
    );
    Ok(output)
}

/// Check a password against a protected document
///
/// Returns `None` when the password is wrong. Unprotected documents and
/// unsupported security handlers are errors.
pub fn authenticate(bytes: &[u8], password: &str) -> Result<Option<AccessLevel>, PdfToolsError> {
    let doc = Document::load_mem(bytes).map_err(|e| PdfToolsError::DocumentLoad(e.to_string()))?;
    let handler = SecurityHandler::read(&doc)?;
    Ok(handler.authenticate(password).map(|(level, _)| level))
}

/// Decrypt a protected document with either password
pub fn unlock_document(bytes: &[u8], password: &str) -> Result<Vec<u8>, PdfToolsError> {
    let mut doc =
        Document::load_mem(bytes).map_err(|e| PdfToolsError::DocumentLoad(e.to_string()))?;
    let handler = SecurityHandler::read(&doc)?;
    let (level, key) = handler
        .authenticate(password)
        .ok_or_else(|| PdfToolsError::Encryption("Incorrect password".into()))?;
    debug!(?level, "password accepted");

    doc.objects.remove(&handler.encrypt_id);
    doc.trailer.remove(b"Encrypt");

    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();
    for id in ids {
        if let Some(object) = doc.objects.get_mut(&id) {
            transform_object(object, &object_key(&key, id), Direction::Decrypt);
        }
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| PdfToolsError::Serialization(format!("Failed to save PDF: {}", e)))?;
    info!(output = output.len(), "unlocked PDF");
    Ok(output)
}

/// Encryption parameters read from a document's `/Encrypt` dictionary
struct SecurityHandler {
    encrypt_id: ObjectId,
    o_entry: [u8; 32],
    u_entry: [u8; 32],
    p: i32,
    file_id: Vec<u8>,
}

impl SecurityHandler {
    fn read(doc: &Document) -> Result<Self, PdfToolsError> {
        let encrypt_id = doc
            .trailer
            .get(b"Encrypt")
            .and_then(Object::as_reference)
            .map_err(|_| PdfToolsError::Encryption("PDF is not password protected".into()))?;
        let dict = doc
            .get_dictionary(encrypt_id)
            .map_err(|_| PdfToolsError::Encryption("Invalid Encrypt dictionary".into()))?;

        let filter = dict.get(b"Filter").and_then(Object::as_name).unwrap_or(b"");
        let revision = dict.get(b"R").and_then(Object::as_i64).unwrap_or(0);
        let length = dict.get(b"Length").and_then(Object::as_i64).unwrap_or(40);
        if filter != b"Standard" || revision != REVISION || length != (KEY_LEN * 8) as i64 {
            return Err(PdfToolsError::Encryption(format!(
                "Unsupported security handler (revision {}, {}-bit)",
                revision, length
            )));
        }

        let entry = |key: &[u8]| -> Result<[u8; 32], PdfToolsError> {
            let raw = dict
                .get(key)
                .and_then(Object::as_str)
                .map_err(|_| PdfToolsError::Encryption("Missing password entry".into()))?;
            let mut out = [0u8; 32];
            if raw.len() < 32 {
                return Err(PdfToolsError::Encryption("Truncated password entry".into()));
            }
            out.copy_from_slice(&raw[..32]);
            Ok(out)
        };

        let p = dict
            .get(b"P")
            .and_then(Object::as_i64)
            .map_err(|_| PdfToolsError::Encryption("Missing permissions entry".into()))?
            as i32;

        Ok(Self {
            encrypt_id,
            o_entry: entry(b"O")?,
            u_entry: entry(b"U")?,
            p,
            file_id: first_file_id(doc).unwrap_or_default(),
        })
    }

    fn authenticate(&self, password: &str) -> Option<(AccessLevel, FileKey)> {
        let padded = pad_password(password);
        if let Some(key) = self.check_user(&padded) {
            return Some((AccessLevel::User, key));
        }

        // The owner password decrypts O back into the padded user password
        let owner_key = owner_rc4_key(&padded);
        let mut user = self.o_entry;
        for round in (0..20u8).rev() {
            rc4(&xor_key(&owner_key, round), &mut user);
        }
        self.check_user(&user).map(|key| (AccessLevel::Owner, key))
    }

    fn check_user(&self, padded_user: &[u8; 32]) -> Option<FileKey> {
        let key = compute_file_key(padded_user, &self.o_entry, self.p, &self.file_id);
        let expected = compute_user_entry(&key, &self.file_id);
        (expected[..16] == self.u_entry[..16]).then_some(key)
    }
}

fn pad_password(password: &str) -> [u8; 32] {
    let bytes: Vec<u8> = password
        .chars()
        .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
        .take(32)
        .collect();
    let mut padded = PAD;
    padded[..bytes.len()].copy_from_slice(&bytes);
    padded[bytes.len()..].copy_from_slice(&PAD[..32 - bytes.len()]);
    padded
}

fn md5_of(parts: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Revision 3 strengthens each derived key with 50 extra MD5 passes
fn stretch(mut digest: [u8; 16]) -> [u8; 16] {
    for _ in 0..50 {
        digest = md5_of(&[&digest]);
    }
    digest
}

fn rc4(key: &FileKey, data: &mut [u8]) {
    let mut cipher = Rc4::<U16>::new(key.into());
    cipher.apply_keystream(data);
}

fn xor_key(key: &FileKey, round: u8) -> FileKey {
    let mut out = *key;
    for b in out.iter_mut() {
        *b ^= round;
    }
    out
}

fn owner_rc4_key(padded_owner: &[u8; 32]) -> FileKey {
    stretch(md5_of(&[padded_owner]))
}

fn compute_owner_entry(padded_owner: &[u8; 32], padded_user: &[u8; 32]) -> [u8; 32] {
    let key = owner_rc4_key(padded_owner);
    let mut entry = *padded_user;
    for round in 0..20u8 {
        rc4(&xor_key(&key, round), &mut entry);
    }
    entry
}

fn compute_file_key(padded_user: &[u8; 32], o_entry: &[u8; 32], p: i32, file_id: &[u8]) -> FileKey {
    let digest = md5_of(&[padded_user, o_entry, &p.to_le_bytes(), file_id]);
    stretch(digest)
}

fn compute_user_entry(key: &FileKey, file_id: &[u8]) -> [u8; 32] {
    let mut hash = md5_of(&[&PAD, file_id]);
    for round in 0..20u8 {
        rc4(&xor_key(key, round), &mut hash);
    }
    let mut entry = [0u8; 32];
    entry[..16].copy_from_slice(&hash);
    entry
}

fn object_key(key: &FileKey, id: ObjectId) -> FileKey {
    let num = id.0.to_le_bytes();
    let gen = id.1.to_le_bytes();
    md5_of(&[key, &num[..3], &gen[..2]])
}

#[derive(Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// RC4 is symmetric, so the same walk encrypts and decrypts. Ciphertext is
/// always written as hex; plaintext goes back to literal form when printable.
fn transform_object(object: &mut Object, key: &FileKey, direction: Direction) {
    match object {
        Object::String(bytes, string_format) => {
            rc4(key, bytes);
            *string_format = match direction {
                Direction::Decrypt if is_plain_text(bytes) => StringFormat::Literal,
                _ => StringFormat::Hexadecimal,
            };
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                transform_object(item, key, direction);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                transform_object(value, key, direction);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                transform_object(value, key, direction);
            }
            rc4(key, &mut stream.content);
        }
        _ => {}
    }
}

fn is_plain_text(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .all(|b| (0x20..0x7F).contains(b) || *b == b'\n' || *b == b'\t')
}

fn first_file_id(doc: &Document) -> Option<Vec<u8>> {
    let ids = doc.trailer.get(b"ID").and_then(Object::as_array).ok()?;
    ids.first()?.as_str().ok().map(|s| s.to_vec())
}

/// Reuse the document's identifier or derive one from its bytes
fn ensure_file_id(doc: &mut Document, bytes: &[u8]) -> Vec<u8> {
    if let Some(id) = first_file_id(doc) {
        return id;
    }
    let id = md5_of(&[bytes, &(bytes.len() as u64).to_le_bytes()]).to_vec();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id.clone(), StringFormat::Hexadecimal),
        ]),
    );
    id
}

/// Object and cross-reference streams are rebuilt by the writer and must
/// not be encrypted
fn drop_cross_reference_streams(doc: &mut Document) {
    doc.objects.retain(|_, object| match object {
        Object::Stream(stream) => !matches!(
            stream.dict.get(b"Type").and_then(Object::as_name),
            Ok(b"ObjStm") | Ok(b"XRef")
        ),
        _ => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{create_test_pdf, page_text};

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_permissions_bits() {
        assert_eq!(Permissions::default().to_p(), -4);
        let no_print = Permissions {
            print: false,
            ..Permissions::default()
        };
        assert_eq!(no_print.to_p(), -2056);
    }

    #[test]
    fn test_pad_password() {
        assert_eq!(pad_password(""), PAD);
        let padded = pad_password("abc");
        assert_eq!(&padded[..3], b"abc");
        assert_eq!(&padded[3..], &PAD[..29]);
    }

    #[test]
    fn test_protected_output_requires_password() {
        let pdf = create_test_pdf(2, "Secret");
        let protected = protect_document(&pdf, &Credential::new("hunter2")).unwrap();

        assert_eq!(authenticate(&protected, "").unwrap(), None);
        assert_eq!(authenticate(&protected, "wrong").unwrap(), None);
        assert_eq!(
            authenticate(&protected, "hunter2").unwrap(),
            Some(AccessLevel::User)
        );
    }

    #[test]
    fn test_protected_output_hides_content() {
        let pdf = create_test_pdf(1, "Secret");
        assert!(contains(&pdf, b"Secret-Page-1"));

        let protected = protect_document(&pdf, &Credential::new("pw")).unwrap();
        assert!(!contains(&protected, b"Secret-Page-1"));
        assert!(contains(&protected, b"/Encrypt"));
    }

    #[test]
    fn test_owner_password_authenticates_as_owner() {
        let pdf = create_test_pdf(1, "Owner");
        let credential = Credential::new("user").with_owner_password("owner");
        let protected = protect_document(&pdf, &credential).unwrap();

        assert_eq!(
            authenticate(&protected, "owner").unwrap(),
            Some(AccessLevel::Owner)
        );
        assert_eq!(
            authenticate(&protected, "user").unwrap(),
            Some(AccessLevel::User)
        );
    }

    #[test]
    fn test_unlock_restores_original_content() {
        let pdf = create_test_pdf(3, "Locked");
        let protected = protect_document(&pdf, &Credential::new("open sesame")).unwrap();
        let unlocked = unlock_document(&protected, "open sesame").unwrap();

        let doc = Document::load_mem(&unlocked).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
        assert!(doc.trailer.get(b"Encrypt").is_err());
        assert_eq!(page_text(&unlocked, 2), "Locked-Page-2");
    }

    #[test]
    fn test_unlock_with_wrong_password_fails() {
        let pdf = create_test_pdf(1, "Locked");
        let protected = protect_document(&pdf, &Credential::new("right")).unwrap();
        let result = unlock_document(&protected, "wrong");
        assert!(matches!(result, Err(PdfToolsError::Encryption(_))));
    }

    #[test]
    fn test_empty_password_rejected() {
        let pdf = create_test_pdf(1, "Empty");
        let result = protect_document(&pdf, &Credential::new(""));
        assert!(matches!(result, Err(PdfToolsError::Validation(_))));
    }

    #[test]
    fn test_already_protected_rejected() {
        let pdf = create_test_pdf(1, "Twice");
        let protected = protect_document(&pdf, &Credential::new("a")).unwrap();
        let result = protect_document(&protected, &Credential::new("b"));
        assert!(matches!(result, Err(PdfToolsError::Validation(_))));
    }

    #[test]
    fn test_malformed_input_is_load_error() {
        let result = protect_document(b"garbage", &Credential::new("pw"));
        assert!(matches!(result, Err(PdfToolsError::DocumentLoad(_))));
    }

    #[test]
    fn test_authenticate_unprotected_is_error() {
        let pdf = create_test_pdf(1, "Plain");
        assert!(matches!(
            authenticate(&pdf, "x"),
            Err(PdfToolsError::Encryption(_))
        ));
    }
}
