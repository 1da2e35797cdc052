use super::*;
use crate::test_helpers;

// =============================================================================
// MemoryTokenStore
// =============================================================================

#[test]
fn memory_write_then_read_session() {
    let store = MemoryTokenStore::new();
    let user = test_helpers::salesperson();
    store.write("abc", Some(&user)).unwrap();

    assert_eq!(store.read().unwrap().as_deref(), Some("abc"));
    let session = store.read_session().unwrap().unwrap();
    assert_eq!(session.token, "abc");
    assert_eq!(session.user, Some(user));
}

#[test]
fn memory_write_is_idempotent() {
    let store = MemoryTokenStore::new();
    let user = test_helpers::contractor();
    store.write("t1", Some(&user)).unwrap();
    store.write("t1", Some(&user)).unwrap();
    assert_eq!(store.read_session().unwrap().unwrap().token, "t1");
}

#[test]
fn memory_clear_twice_is_fine() {
    let store = MemoryTokenStore::new();
    store.write("t1", None).unwrap();
    store.clear().unwrap();
    store.clear().unwrap();
    assert!(store.is_empty());
    assert_eq!(store.read().unwrap(), None);
}

#[test]
fn memory_corrupted_user_reports_corruption_but_token_still_reads() {
    let store = MemoryTokenStore::with_raw("abc", Some("{not json"));
    assert_eq!(store.read().unwrap().as_deref(), Some("abc"));
    assert!(matches!(store.read_session(), Err(AuthError::CorruptedLocalState(_))));
}

// =============================================================================
// restore
// =============================================================================

#[test]
fn restore_corrupted_session_clears_pair() {
    let store = MemoryTokenStore::with_raw("abc", Some("{\"id\": 1, \"role\": "));
    assert_eq!(restore(&store), None);
    assert!(store.is_empty());
}

#[test]
fn restore_valid_session_keeps_it() {
    let store = MemoryTokenStore::new();
    store.write("abc", Some(&test_helpers::admin())).unwrap();
    let session = restore(&store).unwrap();
    assert_eq!(session.user.unwrap().username, "root");
    assert!(!store.is_empty());
}

#[test]
fn restore_empty_store_is_anonymous() {
    assert_eq!(restore(&MemoryTokenStore::new()), None);
}

// =============================================================================
// FileTokenStore
// =============================================================================

#[test]
fn file_store_survives_reopen() {
    let path = test_helpers::temp_session_path("reopen");
    let user = test_helpers::salesperson();
    FileTokenStore::new(&path).write("abc", Some(&user)).unwrap();

    let reopened = FileTokenStore::new(&path);
    let session = reopened.read_session().unwrap().unwrap();
    assert_eq!(session.token, "abc");
    assert_eq!(session.user, Some(user));

    reopened.clear().unwrap();
}

#[test]
fn file_store_missing_file_is_anonymous() {
    let store = FileTokenStore::new(test_helpers::temp_session_path("missing"));
    assert_eq!(store.read().unwrap(), None);
    assert_eq!(store.read_session().unwrap(), None);
}

#[test]
fn file_store_clear_removes_pair_and_is_idempotent() {
    let path = test_helpers::temp_session_path("clear");
    let store = FileTokenStore::new(&path);
    store.write("abc", Some(&test_helpers::contractor())).unwrap();
    store.clear().unwrap();
    store.clear().unwrap();
    assert!(!path.exists());
    assert_eq!(store.read_session().unwrap(), None);
}

#[test]
fn file_store_leaves_no_temp_file_behind() {
    let path = test_helpers::temp_session_path("tmp");
    let store = FileTokenStore::new(&path);
    store.write("abc", None).unwrap();
    let tmp = path.with_file_name("session.json.tmp");
    assert!(!tmp.exists());
    store.clear().unwrap();
}

#[test]
fn file_store_corrupted_user_is_cleared_on_restore() {
    let path = test_helpers::temp_session_path("corrupt");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{"auth_token":"abc","auth_user":"{oops"}"#).unwrap();

    let store = FileTokenStore::new(&path);
    assert_eq!(store.read().unwrap().as_deref(), Some("abc"));
    assert_eq!(restore(&store), None);
    assert!(!path.exists());
}

#[test]
fn file_store_garbage_file_is_cleared_on_restore() {
    let path = test_helpers::temp_session_path("garbage");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "definitely not json").unwrap();

    let store = FileTokenStore::new(&path);
    assert_eq!(store.read().unwrap(), None);
    assert_eq!(restore(&store), None);
    assert!(!path.exists());
}
