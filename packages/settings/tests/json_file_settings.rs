// ABOUTME: End-to-end tests of settings persisted to a JSON file
// ABOUTME: Defines an application settings struct and checks values survive a restart

use std::sync::Arc;

use cellar_settings::{Setting, Settings, SettingsResult};
use cellar_storage::JsonFileStorage;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

struct EditorSettings {
    settings: Settings,
    font_size: Setting<i64>,
    line_height: Setting<f64>,
    vim_mode: Setting<bool>,
    theme: Setting<Option<String>>,
    recent_files: Setting<Vec<String>>,
}

impl EditorSettings {
    fn new(settings: Settings) -> SettingsResult<Self> {
        Ok(Self {
            font_size: settings.int_setting("font_size", 14)?,
            line_height: settings.double_setting("line_height", 1.4)?,
            vim_mode: settings.bool_setting("vim_mode", false)?,
            theme: settings.string_setting("theme")?,
            recent_files: settings.string_list_setting("recent_files")?,
            settings,
        })
    }

    async fn open(temp_dir: &TempDir) -> Self {
        cellar_config::init_tracing();
        let storage = JsonFileStorage::open(temp_dir.path().join("settings.json"))
            .await
            .unwrap();
        Self::new(Settings::new(Arc::new(storage))).unwrap()
    }
}

#[tokio::test]
async fn test_values_survive_restart() {
    let temp_dir = TempDir::new().unwrap();

    {
        let editor = EditorSettings::open(&temp_dir).await;
        editor.font_size.set(16).unwrap();
        editor.line_height.set(2.0).unwrap();
        editor.vim_mode.toggle().unwrap();
        editor.theme.set(Some("solarized".to_string())).unwrap();
        editor
            .recent_files
            .set(vec!["main.rs".to_string(), "lib.rs".to_string()])
            .unwrap();
        editor.settings.flush().await.unwrap();
        editor.settings.dispose();
    }

    let editor = EditorSettings::open(&temp_dir).await;
    assert_eq!(editor.font_size.get(), 16);
    assert_eq!(editor.line_height.get(), 2.0);
    assert!(editor.vim_mode.get());
    assert_eq!(editor.theme.get(), Some("solarized".to_string()));
    assert_eq!(
        editor.recent_files.get(),
        vec!["main.rs".to_string(), "lib.rs".to_string()]
    );
}

#[tokio::test]
async fn test_clear_then_restart_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();

    {
        let editor = EditorSettings::open(&temp_dir).await;
        editor.font_size.set(20).unwrap();
        editor.theme.set(Some("dark".to_string())).unwrap();
        editor.settings.flush().await.unwrap();

        editor.settings.clear().unwrap();
        editor.settings.flush().await.unwrap();
    }

    let editor = EditorSettings::open(&temp_dir).await;
    assert_eq!(editor.font_size.get(), 14);
    assert_eq!(editor.theme.get(), None);
    assert_eq!(editor.settings.keys().len(), 5);
}
