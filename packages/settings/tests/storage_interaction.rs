// ABOUTME: Tests of the calls the settings engine makes against its storage backend
// ABOUTME: Uses a mocked KeyValueStore to count writes and inject failures

use std::sync::Arc;

use async_trait::async_trait;
use cellar_settings::{Settings, SettingsError};
use cellar_storage::{KeyValueStore, StorageError, StorageResult};
use mockall::mock;
use mockall::predicate::*;
use serde_json::{json, Value};

mock! {
    Store {}

    #[async_trait]
    impl KeyValueStore for Store {
        fn get(&self, key: &str) -> Option<Value>;
        async fn set_string(&self, key: &str, value: String) -> StorageResult<()>;
        async fn set_int(&self, key: &str, value: i64) -> StorageResult<()>;
        async fn set_double(&self, key: &str, value: f64) -> StorageResult<()>;
        async fn set_bool(&self, key: &str, value: bool) -> StorageResult<()>;
        async fn set_string_list(&self, key: &str, value: Vec<String>) -> StorageResult<()>;
        async fn remove(&self, key: &str) -> StorageResult<()>;
    }
}

#[tokio::test]
async fn test_default_is_written_once() {
    let mut store = MockStore::new();
    store.expect_get().returning(|_| None);
    store
        .expect_set_int()
        .with(eq("volume"), eq(7))
        .times(1)
        .returning(|_, _| Ok(()));

    let settings = Settings::new(Arc::new(store));
    let _volume = settings.int_setting("volume", 7).unwrap();

    let report = settings.flush().await.unwrap();
    assert_eq!(report.writes, 1);
}

#[tokio::test]
async fn test_matching_stored_value_is_not_written() {
    let mut store = MockStore::new();
    store.expect_get().with(eq("name")).returning(|_| Some(json!("ada")));
    store.expect_set_string().never();

    let settings = Settings::new(Arc::new(store));
    let name = settings.string_setting("name").unwrap();
    name.set(Some("ada".to_string())).unwrap();

    let report = settings.flush().await.unwrap();
    assert_eq!(report.writes, 0);
}

#[tokio::test]
async fn test_null_encoding_removes_key() {
    let mut store = MockStore::new();
    store.expect_get().returning(|_| Some(json!("ada")));
    store
        .expect_remove()
        .with(eq("name"))
        .times(1)
        .returning(|_| Ok(()));

    let settings = Settings::new(Arc::new(store));
    let name = settings.string_setting("name").unwrap();
    name.set(None).unwrap();

    settings.flush().await.unwrap();
}

#[tokio::test]
async fn test_failed_write_is_reported_after_other_writes() {
    let mut store = MockStore::new();
    store.expect_get().returning(|_| None);
    store
        .expect_set_int()
        .times(1)
        .returning(|_, _| Err(StorageError::Backend("disk full".to_string())));
    store
        .expect_set_bool()
        .with(eq("dark_mode"), eq(true))
        .times(1)
        .returning(|_, _| Ok(()));

    let settings = Settings::new(Arc::new(store));
    let _volume = settings.int_setting("volume", 7).unwrap();
    let _dark = settings.bool_setting("dark_mode", true).unwrap();

    let err = settings.flush().await.unwrap_err();

    assert!(matches!(
        err,
        SettingsError::Storage(StorageError::Backend(ref msg)) if msg == "disk full"
    ));
    assert_eq!(settings.pending_writes(), 0);
}

#[tokio::test]
async fn test_every_type_uses_its_typed_setter() {
    let mut store = MockStore::new();
    store.expect_get().returning(|_| None);
    store
        .expect_set_double()
        .with(eq("ratio"), eq(0.25))
        .times(1)
        .returning(|_, _| Ok(()));
    store
        .expect_set_string_list()
        .with(eq("tags"), eq(vec!["a".to_string()]))
        .times(1)
        .returning(|_, _| Ok(()));
    store
        .expect_set_string()
        .with(eq("name"), eq("ada".to_string()))
        .times(1)
        .returning(|_, _| Ok(()));

    let settings = Settings::new(Arc::new(store));
    settings.double_setting("ratio", 0.25).unwrap();
    let tags = settings.string_list_setting("tags").unwrap();
    let name = settings.string_setting("name").unwrap();
    tags.set(vec!["a".to_string()]).unwrap();
    name.set(Some("ada".to_string())).unwrap();

    settings.flush().await.unwrap();
}
