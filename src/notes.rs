//! Secure note keeper.
//!
//! Notes are protected by a master password. The password itself is only
//! stored as an Argon2 PHC hash; a separate Argon2 derivation over a random
//! salt yields the AES-256-GCM key that seals the whole note list before it
//! reaches storage. Without the password the stored vault is ciphertext.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bincode::{deserialize_from, serialize_into};
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Cursor, Write};
use thiserror::Error;
use rand_core::{OsRng, RngCore};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::storage::{Storage, StorageError, StorageKey};

const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;
const KEY_SALT_LENGTH: usize = 16;
const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error)]
pub enum NotesError {
    #[error("No master password has been set")]
    MasterPasswordNotSet,

    #[error("A master password is already set")]
    MasterPasswordAlreadySet,

    #[error("Master password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,

    #[error("Wrong master password")]
    WrongPassword,

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("A note needs a title or some content")]
    EmptyNote,

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: wrong key or corrupted vault")]
    DecryptionFailed,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Corrupted vault data: {0}")]
    Corrupted(String),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a user fills in when creating or editing a note
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
}

impl NoteDraft {
    fn validate(&self) -> Result<(), NotesError> {
        if self.title.trim().is_empty() && self.content.trim().is_empty() {
            return Err(NotesError::EmptyNote);
        }
        Ok(())
    }

    fn category_or_default(&self) -> String {
        let category = self.category.trim();
        if category.is_empty() {
            "General".to_string()
        } else {
            category.to_string()
        }
    }
}

/// What is stored under `masterPasswordSet`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MasterRecord {
    password_hash: String,
    key_salt: String,
}

/// What is stored under `secureNotes`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SealedVault {
    nonce: String,
    ciphertext: String,
}

/// Portable copy of a vault: still sealed, still needs the master password
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VaultBackup {
    master: MasterRecord,
    vault: Option<SealedVault>,
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct VaultKey([u8; KEY_LENGTH]);

impl VaultKey {
    fn derive(password: &str, salt: &[u8]) -> Result<Self, NotesError> {
        let mut key = [0u8; KEY_LENGTH];
        Argon2::default()
            .hash_password_into(password.as_bytes(), salt, &mut key)
            .map_err(|e| NotesError::Hashing(e.to_string()))?;
        Ok(Self(key))
    }

    fn seal(&self, plaintext: &[u8]) -> Result<SealedVault, NotesError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0));

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| NotesError::EncryptionFailed)?;

        Ok(SealedVault {
            nonce: BASE64.encode(nonce_bytes),
            ciphertext: BASE64.encode(ciphertext),
        })
    }

    fn open(&self, sealed: &SealedVault) -> Result<Vec<u8>, NotesError> {
        let nonce = BASE64
            .decode(&sealed.nonce)
            .map_err(|e| NotesError::Corrupted(e.to_string()))?;
        if nonce.len() != NONCE_LENGTH {
            return Err(NotesError::Corrupted("bad nonce length".to_string()));
        }
        let ciphertext = BASE64
            .decode(&sealed.ciphertext)
            .map_err(|e| NotesError::Corrupted(e.to_string()))?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0));
        cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
            .map_err(|_| NotesError::DecryptionFailed)
    }
}

fn hash_password(password: &str) -> Result<String, NotesError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| NotesError::Hashing(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, NotesError> {
    let parsed = PasswordHash::new(hash).map_err(|e| NotesError::Corrupted(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn new_master_record(password: &str) -> Result<(MasterRecord, VaultKey), NotesError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(NotesError::PasswordTooShort);
    }

    let mut salt = [0u8; KEY_SALT_LENGTH];
    OsRng.fill_bytes(&mut salt);
    let key = VaultKey::derive(password, &salt)?;

    let record = MasterRecord {
        password_hash: hash_password(password)?,
        key_salt: BASE64.encode(salt),
    };
    Ok((record, key))
}

pub fn has_master_password(storage: &Storage) -> bool {
    storage.contains(&StorageKey::MasterPassword)
}

/// An unlocked vault. Dropping it forgets the key.
pub struct NoteVault {
    key: VaultKey,
    notes: Vec<Note>,
}

impl NoteVault {
    /// First-time setup: store the master password record and an empty vault
    pub fn set_master_password(storage: &mut Storage, password: &str) -> Result<Self, NotesError> {
        if has_master_password(storage) {
            return Err(NotesError::MasterPasswordAlreadySet);
        }

        let (record, key) = new_master_record(password)?;
        storage.set(&StorageKey::MasterPassword, &record)?;

        let vault = Self {
            key,
            notes: Vec::new(),
        };
        vault.persist(storage)?;
        log::info!("master password set for secure notes");
        Ok(vault)
    }

    pub fn unlock(storage: &Storage, password: &str) -> Result<Self, NotesError> {
        let record: MasterRecord = storage
            .get(&StorageKey::MasterPassword)
            .ok_or(NotesError::MasterPasswordNotSet)?;

        if !verify_password(password, &record.password_hash)? {
            log::warn!("rejected secure notes unlock attempt");
            return Err(NotesError::WrongPassword);
        }

        let salt = BASE64
            .decode(&record.key_salt)
            .map_err(|e| NotesError::Corrupted(e.to_string()))?;
        let key = VaultKey::derive(password, &salt)?;

        let notes = match storage.get::<SealedVault>(&StorageKey::SecureNotes) {
            Some(sealed) => {
                let plaintext = key.open(&sealed)?;
                serde_json::from_slice(&plaintext).map_err(|e| NotesError::Corrupted(e.to_string()))?
            }
            None => Vec::new(),
        };

        Ok(Self { key, notes })
    }

    /// Re-key the vault under a new password
    ///
    /// The stored vault and master record either both move to the new
    /// password or both stay on the current one.
    pub fn change_master_password(
        &mut self,
        storage: &mut Storage,
        current: &str,
        new_password: &str,
    ) -> Result<(), NotesError> {
        let record: MasterRecord = storage
            .get(&StorageKey::MasterPassword)
            .ok_or(NotesError::MasterPasswordNotSet)?;
        if !verify_password(current, &record.password_hash)? {
            return Err(NotesError::WrongPassword);
        }

        let (new_record, new_key) = new_master_record(new_password)?;
        let sealed = new_key.seal(&self.plaintext()?)?;
        storage.set(&StorageKey::SecureNotes, &sealed)?;

        if let Err(e) = storage.set(&StorageKey::MasterPassword, &new_record) {
            // Put the vault back under the key the stored record still matches
            if let Err(restore) = self.persist(storage) {
                log::error!("failed to restore secure notes after a failed re-key: {restore}");
            }
            return Err(e.into());
        }

        self.key = new_key;
        log::info!("secure notes re-keyed under a new master password");
        Ok(())
    }

    fn plaintext(&self) -> Result<Vec<u8>, NotesError> {
        serde_json::to_vec(&self.notes).map_err(|e| NotesError::Corrupted(e.to_string()))
    }

    fn persist(&self, storage: &mut Storage) -> Result<(), NotesError> {
        let sealed = self.key.seal(&self.plaintext()?)?;
        storage.set(&StorageKey::SecureNotes, &sealed)?;
        Ok(())
    }

    pub fn list(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn add(&mut self, storage: &mut Storage, draft: NoteDraft) -> Result<Note, NotesError> {
        draft.validate()?;
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4().to_string(),
            title: draft.title.trim().to_string(),
            content: draft.content.clone(),
            category: draft.category_or_default(),
            created_at: now,
            updated_at: now,
        };

        self.notes.insert(0, note.clone());
        self.persist(storage)?;
        Ok(note)
    }

    pub fn update(&mut self, storage: &mut Storage, id: &str, draft: NoteDraft) -> Result<Note, NotesError> {
        draft.validate()?;
        let note = self
            .notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| NotesError::NoteNotFound(id.to_string()))?;

        note.title = draft.title.trim().to_string();
        note.content = draft.content.clone();
        note.category = draft.category_or_default();
        note.updated_at = Utc::now();
        let updated = note.clone();

        self.persist(storage)?;
        Ok(updated)
    }

    pub fn delete(&mut self, storage: &mut Storage, id: &str) -> Result<(), NotesError> {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        if self.notes.len() == before {
            return Err(NotesError::NoteNotFound(id.to_string()));
        }
        self.persist(storage)
    }

    /// Case-insensitive match on title, content or category
    pub fn search(&self, query: &str) -> Vec<&Note> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.notes.iter().collect();
        }
        self.notes
            .iter()
            .filter(|n| {
                n.title.to_lowercase().contains(&query)
                    || n.content.to_lowercase().contains(&query)
                    || n.category.to_lowercase().contains(&query)
            })
            .collect()
    }

    pub fn by_category(&self, category: &str) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|n| n.category.eq_ignore_ascii_case(category.trim()))
            .collect()
    }

    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self.notes.iter().map(|n| n.category.clone()).collect();
        categories.sort();
        categories.dedup();
        categories
    }
}

/// Export the sealed vault and its master record as gzip-compressed bincode
pub fn export_backup(storage: &Storage) -> Result<Vec<u8>, NotesError> {
    let master: MasterRecord = storage
        .get(&StorageKey::MasterPassword)
        .ok_or(NotesError::MasterPasswordNotSet)?;
    let backup = VaultBackup {
        master,
        vault: storage.get(&StorageKey::SecureNotes),
    };

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut writer = BufWriter::new(encoder);
    serialize_into(&mut writer, &backup).map_err(|e| NotesError::Backup(e.to_string()))?;
    writer.flush().map_err(|e| NotesError::Backup(e.to_string()))?;

    let encoder = writer
        .into_inner()
        .map_err(|e| NotesError::Backup(e.to_string()))?;
    encoder.finish().map_err(|e| NotesError::Backup(e.to_string()))
}

/// Replace the stored vault with a backup. Unlock with the backup's password.
pub fn import_backup(storage: &mut Storage, bytes: &[u8]) -> Result<(), NotesError> {
    let decoder = GzDecoder::new(Cursor::new(bytes));
    let mut reader = BufReader::new(decoder);
    let backup: VaultBackup =
        deserialize_from(&mut reader).map_err(|e| NotesError::Backup(e.to_string()))?;

    storage.set(&StorageKey::MasterPassword, &backup.master)?;
    match backup.vault {
        Some(vault) => storage.set(&StorageKey::SecureNotes, &vault)?,
        None => storage.remove(&StorageKey::SecureNotes)?,
    }
    log::info!("secure notes restored from backup");
    Ok(())
}
