use super::*;

fn temp_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("minsoto-storage-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir.join("tokens.json")
}

// =============================================================================
// TokenKey
// =============================================================================

#[test]
fn keys_use_browser_storage_names() {
    assert_eq!(TokenKey::AccessToken.as_str(), "accessToken");
    assert_eq!(TokenKey::RefreshToken.as_str(), "refreshToken");
}

// =============================================================================
// MemoryTokenStore
// =============================================================================

#[test]
fn memory_store_starts_empty() {
    let store = MemoryTokenStore::new();
    assert_eq!(store.access_token(), None);
    assert_eq!(store.refresh_token(), None);
}

#[test]
fn memory_store_set_get_remove() {
    let store = MemoryTokenStore::new();
    store.set(TokenKey::AccessToken, "A").unwrap();
    assert_eq!(store.access_token().as_deref(), Some("A"));
    store.remove(TokenKey::AccessToken).unwrap();
    assert_eq!(store.access_token(), None);
}

#[test]
fn store_pair_without_refresh_keeps_existing_refresh() {
    let store = MemoryTokenStore::with_tokens(Some("old"), Some("R"));
    store
        .store_pair(&TokenPair { access_token: "new".into(), refresh_token: None })
        .unwrap();
    assert_eq!(store.access_token().as_deref(), Some("new"));
    assert_eq!(store.refresh_token().as_deref(), Some("R"));
}

#[test]
fn clear_removes_both_tokens() {
    let store = MemoryTokenStore::with_tokens(Some("A"), Some("B"));
    store.clear().unwrap();
    assert_eq!(store.access_token(), None);
    assert_eq!(store.refresh_token(), None);
}

// =============================================================================
// FileTokenStore
// =============================================================================

#[test]
fn file_store_missing_file_is_empty() {
    let path = temp_path("missing");
    let store = FileTokenStore::open(&path).unwrap();
    assert_eq!(store.access_token(), None);
    assert!(!path.exists());
}

#[test]
fn file_store_persists_across_reopen() {
    let path = temp_path("reopen");
    {
        let store = FileTokenStore::open(&path).unwrap();
        store
            .store_pair(&TokenPair { access_token: "A".into(), refresh_token: Some("B".into()) })
            .unwrap();
    }
    let reopened = FileTokenStore::open(&path).unwrap();
    assert_eq!(reopened.access_token().as_deref(), Some("A"));
    assert_eq!(reopened.refresh_token().as_deref(), Some("B"));

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"accessToken\""));
}

#[test]
fn file_store_clear_persists() {
    let path = temp_path("clear");
    let store = FileTokenStore::open(&path).unwrap();
    store.set(TokenKey::AccessToken, "A").unwrap();
    store.set(TokenKey::RefreshToken, "B").unwrap();
    store.clear().unwrap();

    let reopened = FileTokenStore::open(&path).unwrap();
    assert_eq!(reopened.access_token(), None);
    assert_eq!(reopened.refresh_token(), None);
}

#[test]
fn file_store_rejects_corrupt_file() {
    let path = temp_path("corrupt");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(FileTokenStore::open(&path), Err(StorageError::Json(_))));
}

#[cfg(unix)]
#[test]
fn file_store_is_private_to_owner() {
    use std::os::unix::fs::PermissionsExt;

    let path = temp_path("mode");
    let store = FileTokenStore::open(&path).unwrap();
    store.set(TokenKey::RefreshToken, "secret").unwrap();
    store.set(TokenKey::AccessToken, "A").unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
