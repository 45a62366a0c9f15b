//! Key-scoped persistence shared by every tool.
//!
//! Values go through a JSON codec and are wrapped in a versioned envelope
//! (`{"version": 1, "data": ...}`). Anything that fails to decode, or carries
//! another schema version, is logged and read back as absent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode value for {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },

    #[error("storage file {path} is corrupted: {reason}")]
    Corrupted { path: PathBuf, reason: String },
}

/// Every key a tool may read or write
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// `<toolName>-conversionHistory`
    ConversionHistory(String),
    SecureNotes,
    MasterPassword,
    PasswordLastBatch,
    BookSummaryLast,
}

impl StorageKey {
    pub fn name(&self) -> String {
        match self {
            StorageKey::ConversionHistory(tool) => format!("{tool}-conversionHistory"),
            StorageKey::SecureNotes => "secureNotes".to_string(),
            StorageKey::MasterPassword => "masterPasswordSet".to_string(),
            StorageKey::PasswordLastBatch => "passwordGenerator_lastBatch".to_string(),
            StorageKey::BookSummaryLast => "bookSummaryCreator_lastSummary".to_string(),
        }
    }
}

/// Raw string-to-string backend
pub trait KeyValueStore: Send {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_raw(&mut self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Vec<String>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set_raw(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// A single JSON object on disk, rewritten whole on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store, creating its directory and an empty `{}` file if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_dir_all(parent)?;
            }
        }

        if !path.exists() {
            let mut file = File::create(&path)?;
            file.write_all(b"{}")?;
        }

        let contents = fs::read_to_string(&path)?;
        let entries = serde_json::from_str(&contents).map_err(|e| StorageError::Corrupted {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        log::debug!("opened storage file {}", path.display());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| StorageError::Encode {
            key: self.path.display().to_string(),
            source: e,
        })?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set_raw(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

#[derive(Serialize)]
struct EnvelopeOut<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    version: u32,
    data: serde_json::Value,
}

/// Typed, versioned access to a [`KeyValueStore`]
pub struct Storage {
    backend: Box<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn open_file(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Ok(Self::new(JsonFileStore::open(path)?))
    }

    /// Read and decode a value; missing, stale or malformed entries yield `None`
    pub fn get<T: DeserializeOwned>(&self, key: &StorageKey) -> Option<T> {
        let name = key.name();
        let raw = match self.backend.get_raw(&name) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::error!("failed to read {name}: {e}");
                return None;
            }
        };

        let envelope: EnvelopeIn = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("discarding undecodable value for {name}: {e}");
                return None;
            }
        };

        if envelope.version != SCHEMA_VERSION {
            log::warn!(
                "ignoring {name}: schema version {} (expected {SCHEMA_VERSION})",
                envelope.version
            );
            return None;
        }

        match serde_json::from_value(envelope.data) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("value for {name} does not match its schema: {e}");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &StorageKey, value: &T) -> Result<(), StorageError> {
        let name = key.name();
        let raw = serde_json::to_string(&EnvelopeOut {
            version: SCHEMA_VERSION,
            data: value,
        })
        .map_err(|e| StorageError::Encode {
            key: name.clone(),
            source: e,
        })?;
        self.backend.set_raw(&name, raw)
    }

    pub fn remove(&mut self, key: &StorageKey) -> Result<(), StorageError> {
        self.backend.remove(&key.name())
    }

    pub fn contains(&self, key: &StorageKey) -> bool {
        matches!(self.backend.get_raw(&key.name()), Ok(Some(_)))
    }

    /// Names of every stored key, as the backend holds them
    pub fn keys(&self) -> Vec<String> {
        self.backend.keys()
    }

    pub fn get_raw(&self, name: &str) -> Result<Option<String>, StorageError> {
        self.backend.get_raw(name)
    }

    /// Every stored key with the size of its encoded value, sorted by name
    pub fn usage(&self) -> Vec<(String, usize)> {
        let mut usage: Vec<_> = self
            .keys()
            .into_iter()
            .map(|name| {
                let size = match self.get_raw(&name) {
                    Ok(raw) => raw.map_or(0, |raw| raw.len()),
                    Err(e) => {
                        log::error!("failed to read {name}: {e}");
                        0
                    }
                };
                (name, size)
            })
            .collect();
        usage.sort();
        usage
    }
}
