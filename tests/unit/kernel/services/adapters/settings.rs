use super::*;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn write_default_if_missing_creates_loadable_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(SETTINGS_DIR).join(SETTINGS_FILE);
    write_default_if_missing(&path).unwrap();

    let settings = load_settings_from(&path).unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn write_default_if_missing_keeps_user_settings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(SETTINGS_FILE);
    std::fs::write(&path, r#"{"autosave_interval_ms": 750}"#).unwrap();
    write_default_if_missing(&path).unwrap();

    let settings = load_settings_from(&path).unwrap();
    assert_eq!(settings.autosave_interval_ms, 750);
    assert_eq!(settings.autosync_interval_ms, 5_000);
    assert_eq!(
        settings.workspace_config().autosave_interval,
        Duration::from_millis(750)
    );
}

#[test]
fn zero_intervals_are_clamped() {
    let settings = Settings {
        autosave_interval_ms: 0,
        autosync_interval_ms: 0,
        ..Settings::default()
    };
    let config = settings.workspace_config();
    assert_eq!(config.autosave_interval, Duration::from_millis(1));
    assert_eq!(config.autosync_interval, Duration::from_millis(1));
}

#[test]
fn invalid_json_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(SETTINGS_FILE);
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        load_settings_from(&path),
        Err(SettingsError::Json(_))
    ));
    assert!(matches!(
        load_settings_from(&dir.path().join("missing.json")),
        Err(SettingsError::Io(_))
    ));
}

#[test]
fn settings_path_lives_under_the_cache_dir() {
    if let Some(path) = get_settings_path() {
        assert!(path.ends_with(std::path::Path::new(SETTINGS_DIR).join(SETTINGS_FILE)));
    }
}
