use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use rdsctl_core::config::Config;
use tempfile::TempDir;

/// Returns true if running as root (euid == 0). Used to skip permission tests.
#[cfg(unix)]
fn is_root() -> bool {
    std::process::Command::new("id")
        .arg("-u")
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim() == "0")
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// 1. Missing config directory / nonexistent path
// ---------------------------------------------------------------------------

#[test]
fn load_from_nonexistent_path_returns_default_config() {
    let path = PathBuf::from("/tmp/rdsctl-test-nonexistent/does/not/exist/config.toml");
    assert!(!path.exists());

    let config = Config::load_from_path(&path).expect("should not error on missing path");

    assert_eq!(config, Config::default());
    assert!(config.default_profile.is_none());
    assert!(config.region.is_none());
}

// ---------------------------------------------------------------------------
// 2. Empty config file
// ---------------------------------------------------------------------------

#[test]
fn load_empty_config_file_returns_default_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "").unwrap();

    let config = Config::load_from_path(&config_path).expect("empty file should parse as default");

    assert_eq!(config, Config::default());
}

// ---------------------------------------------------------------------------
// 3. Corrupt / invalid TOML
// ---------------------------------------------------------------------------

#[test]
fn load_corrupt_toml_returns_parse_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[[[broken").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("Parse"),
        "error should mention parsing: {msg}"
    );
}

// ---------------------------------------------------------------------------
// 4. Wrongly typed polling values
// ---------------------------------------------------------------------------

#[test]
fn load_polling_with_wrong_types_returns_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    let content = r#"
[polling.snapshot]
delay_secs = "ten"
"#;
    fs::write(&config_path, content).unwrap();

    assert!(Config::load_from_path(&config_path).is_err());
}

// ---------------------------------------------------------------------------
// 5. Config with unknown / extra fields
// ---------------------------------------------------------------------------

#[test]
fn load_config_with_unknown_fields_ignores_them() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");

    let content = r#"
unknown_top_level_key = "hello"
region = "eu-west-1"

[polling.provisioning]
delay_secs = 20
totally_unknown_field = true
"#;
    fs::write(&config_path, content).unwrap();

    let config =
        Config::load_from_path(&config_path).expect("unknown fields should be silently ignored");

    assert_eq!(config.region.as_deref(), Some("eu-west-1"));
    let settings = config.polling_settings().unwrap();
    assert_eq!(settings.provisioning.delay, Duration::from_secs(20));
    assert_eq!(settings.provisioning.max_attempts, 60);
}

// ---------------------------------------------------------------------------
// 6. Save and load round trip through the filesystem
// ---------------------------------------------------------------------------

#[test]
fn save_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("nested").join("rdsctl").join("config.toml");
    let config = Config {
        default_profile: Some("staging".to_string()),
        ..Default::default()
    };

    config.save_to_path(&config_path).unwrap();

    assert!(config_path.exists());
    assert_eq!(Config::load_from_path(&config_path).unwrap(), config);
}

// ---------------------------------------------------------------------------
// 7. Permission errors (unix only)
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn load_unreadable_file_returns_clear_error() {
    use std::os::unix::fs::PermissionsExt;

    if is_root() {
        eprintln!("skipping test: running as root");
        return;
    }

    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "# valid toml").unwrap();

    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o000)).unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("load") || msg.contains("Load") || msg.contains("Permission"),
        "error should reference loading or permissions: {msg}"
    );

    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o644)).unwrap();
}

#[cfg(unix)]
#[test]
fn save_to_readonly_directory_returns_clear_error() {
    use std::os::unix::fs::PermissionsExt;

    if is_root() {
        eprintln!("skipping test: running as root");
        return;
    }

    let dir = TempDir::new().unwrap();
    let readonly_dir = dir.path().join("readonly");
    fs::create_dir(&readonly_dir).unwrap();
    fs::set_permissions(&readonly_dir, fs::Permissions::from_mode(0o444)).unwrap();

    let config_path = readonly_dir.join("config.toml");
    let err = Config::default().save_to_path(&config_path).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("save") || msg.contains("Save") || msg.contains("Permission"),
        "error should reference saving or permissions: {msg}"
    );

    fs::set_permissions(&readonly_dir, fs::Permissions::from_mode(0o755)).unwrap();
}
