use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{Storage, StorageError, StorageKey};

/// Entries kept per tool; older ones fall off the end
pub const HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub file_name: String,
    pub original_format: String,
    pub target_format: String,
    pub status: ConversionStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl HistoryEntry {
    pub fn success(file_name: &str, original_format: &str, target_format: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            original_format: original_format.to_string(),
            target_format: target_format.to_string(),
            status: ConversionStatus::Success,
            timestamp: Utc::now(),
            download_url: None,
            message: None,
        }
    }

    pub fn error(file_name: &str, original_format: &str, target_format: &str, message: &str) -> Self {
        Self {
            status: ConversionStatus::Error,
            message: Some(message.to_string()),
            ..Self::success(file_name, original_format, target_format)
        }
    }
}

/// Newest-first history of a tool; an unreadable list counts as empty
pub fn load(storage: &Storage, tool: &str) -> Vec<HistoryEntry> {
    storage
        .get(&StorageKey::ConversionHistory(tool.to_string()))
        .unwrap_or_default()
}

/// Push an entry to the front and keep at most [`HISTORY_LIMIT`]
pub fn record(
    storage: &mut Storage,
    tool: &str,
    entry: HistoryEntry,
) -> Result<Vec<HistoryEntry>, StorageError> {
    let mut entries = load(storage, tool);
    entries.insert(0, entry);
    entries.truncate(HISTORY_LIMIT);
    storage.set(&StorageKey::ConversionHistory(tool.to_string()), &entries)?;
    Ok(entries)
}

pub fn clear(storage: &mut Storage, tool: &str) -> Result<(), StorageError> {
    storage.remove(&StorageKey::ConversionHistory(tool.to_string()))
}
