use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use toolbench::notes::{self, NoteDraft, NoteVault, NotesError};
use toolbench::storage::{KeyValueStore, MemoryStore, Storage, StorageError, StorageKey};

const MASTER: &str = "correct horse battery";

fn draft(title: &str, content: &str, category: &str) -> NoteDraft {
    NoteDraft {
        title: title.to_string(),
        content: content.to_string(),
        category: category.to_string(),
    }
}

fn vault_with_notes(storage: &mut Storage) -> NoteVault {
    let mut vault = NoteVault::set_master_password(storage, MASTER).unwrap();
    vault.add(storage, draft("Bank", "PIN 4821 for the savings card", "Finance")).unwrap();
    vault.add(storage, draft("Wifi", "guest network: otter-lake", "")).unwrap();
    vault
}

#[test]
fn master_password_is_set_once() {
    let mut storage = Storage::in_memory();
    assert!(!notes::has_master_password(&storage));

    NoteVault::set_master_password(&mut storage, MASTER).unwrap();
    assert!(notes::has_master_password(&storage));

    let again = NoteVault::set_master_password(&mut storage, "another password");
    assert!(matches!(again, Err(NotesError::MasterPasswordAlreadySet)));
}

#[test]
fn short_master_password_is_rejected() {
    let mut storage = Storage::in_memory();
    let result = NoteVault::set_master_password(&mut storage, "short");
    assert!(matches!(result, Err(NotesError::PasswordTooShort)));
    assert!(!notes::has_master_password(&storage));
}

#[test]
fn unlock_needs_the_right_password() {
    let mut storage = Storage::in_memory();
    assert!(matches!(
        NoteVault::unlock(&storage, MASTER),
        Err(NotesError::MasterPasswordNotSet)
    ));

    drop(vault_with_notes(&mut storage));
    assert!(matches!(
        NoteVault::unlock(&storage, "wrong password"),
        Err(NotesError::WrongPassword)
    ));

    let vault = NoteVault::unlock(&storage, MASTER).unwrap();
    assert_eq!(vault.list().len(), 2);
    assert_eq!(vault.list()[0].title, "Wifi");
}

#[test]
fn stored_vault_does_not_contain_plaintext() {
    let mut storage = Storage::in_memory();
    drop(vault_with_notes(&mut storage));

    for key in storage.keys() {
        let raw = storage.get_raw(&key).unwrap().unwrap_or_default();
        assert!(!raw.contains("4821"), "{key} leaks note content");
        assert!(!raw.contains("otter-lake"), "{key} leaks note content");
        assert!(!raw.contains(MASTER), "{key} leaks the master password");
    }
}

#[test]
fn notes_default_to_general_category() {
    let mut storage = Storage::in_memory();
    let vault = vault_with_notes(&mut storage);
    assert_eq!(vault.list()[0].category, "General");
    assert_eq!(vault.categories(), vec!["Finance".to_string(), "General".to_string()]);
    assert_eq!(vault.by_category("finance").len(), 1);
}

#[test]
fn empty_notes_are_rejected() {
    let mut storage = Storage::in_memory();
    let mut vault = NoteVault::set_master_password(&mut storage, MASTER).unwrap();
    let result = vault.add(&mut storage, draft("  ", "", "Misc"));
    assert!(matches!(result, Err(NotesError::EmptyNote)));
}

#[test]
fn update_and_delete_persist() {
    let mut storage = Storage::in_memory();
    let mut vault = vault_with_notes(&mut storage);
    let id = vault.list()[1].id.clone();

    let updated = vault
        .update(&mut storage, &id, draft("Bank", "PIN changed", "Finance"))
        .unwrap();
    assert!(updated.updated_at >= updated.created_at);

    let reopened = NoteVault::unlock(&storage, MASTER).unwrap();
    assert_eq!(reopened.get(&id).map(|n| n.content.as_str()), Some("PIN changed"));

    vault.delete(&mut storage, &id).unwrap();
    assert!(matches!(
        vault.delete(&mut storage, &id),
        Err(NotesError::NoteNotFound(_))
    ));
    assert_eq!(NoteVault::unlock(&storage, MASTER).unwrap().list().len(), 1);
}

#[test]
fn search_is_case_insensitive_across_fields() {
    let mut storage = Storage::in_memory();
    let vault = vault_with_notes(&mut storage);
    assert_eq!(vault.search("OTTER").len(), 1);
    assert_eq!(vault.search("finance").len(), 1);
    assert_eq!(vault.search("bank")[0].title, "Bank");
    assert_eq!(vault.search("").len(), 2);
    assert!(vault.search("nothing like this").is_empty());
}

#[test]
fn changing_the_master_password_rekeys_the_vault() {
    let mut storage = Storage::in_memory();
    let mut vault = vault_with_notes(&mut storage);

    assert!(matches!(
        vault.change_master_password(&mut storage, "wrong password", "brand new secret"),
        Err(NotesError::WrongPassword)
    ));
    vault
        .change_master_password(&mut storage, MASTER, "brand new secret")
        .unwrap();

    assert!(matches!(
        NoteVault::unlock(&storage, MASTER),
        Err(NotesError::WrongPassword)
    ));
    assert_eq!(NoteVault::unlock(&storage, "brand new secret").unwrap().list().len(), 2);
}

/// Memory store whose writes to the master record fail once `broken` is set
struct FailingMasterStore {
    inner: MemoryStore,
    broken: Arc<AtomicBool>,
}

impl KeyValueStore for FailingMasterStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_raw(key)
    }

    fn set_raw(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        if self.broken.load(Ordering::SeqCst) && key == StorageKey::MasterPassword.name() {
            return Err(io::Error::other("disk full").into());
        }
        self.inner.set_raw(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}

#[test]
fn failed_rekey_keeps_the_current_password_working() {
    let broken = Arc::new(AtomicBool::new(false));
    let mut storage = Storage::new(FailingMasterStore {
        inner: MemoryStore::new(),
        broken: broken.clone(),
    });
    let mut vault = vault_with_notes(&mut storage);

    broken.store(true, Ordering::SeqCst);
    let result = vault.change_master_password(&mut storage, MASTER, "brand new secret");
    assert!(matches!(result, Err(NotesError::Storage(StorageError::Io(_)))));
    broken.store(false, Ordering::SeqCst);

    let reopened = NoteVault::unlock(&storage, MASTER).unwrap();
    assert_eq!(reopened.list().len(), 2);
    assert!(matches!(
        NoteVault::unlock(&storage, "brand new secret"),
        Err(NotesError::WrongPassword)
    ));

    // The in-memory vault still writes under the current password
    vault.add(&mut storage, draft("Door", "code 1337", "Home")).unwrap();
    assert_eq!(NoteVault::unlock(&storage, MASTER).unwrap().list().len(), 3);
}

#[test]
fn backup_restores_into_fresh_storage() {
    let mut storage = Storage::in_memory();
    drop(vault_with_notes(&mut storage));
    let backup = notes::export_backup(&storage).unwrap();

    let mut restored = Storage::in_memory();
    notes::import_backup(&mut restored, &backup).unwrap();
    let vault = NoteVault::unlock(&restored, MASTER).unwrap();
    assert_eq!(vault.list().len(), 2);

    assert!(matches!(
        notes::import_backup(&mut restored, b"not a backup"),
        Err(NotesError::Backup(_))
    ));
}
