//! Edge case and error scenario tests

use semnet_config::{Config, ConfigManager};
use std::fs;
use tempfile::TempDir;

fn setup_test_manager() -> Result<(TempDir, ConfigManager), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;
    Ok((temp_dir, manager))
}

fn write_config(manager: &ConfigManager, contents: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = manager.config_path();
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&config_path, contents)?;
    Ok(())
}

#[test]
fn test_corrupted_config_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    write_config(&manager, "this is not valid TOML {{{")?;

    assert!(manager.load().is_err());
    assert_eq!(manager.load_or_default(), Config::default());

    Ok(())
}

#[test]
fn test_save_creates_parent_directories() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let nested_path = temp_dir.path().join("a").join("b").join("c");
    let manager = ConfigManager::with_directory(nested_path)?;

    manager.save(&Config::default())?;
    assert!(manager.config_path().exists());

    Ok(())
}

#[test]
fn test_concurrent_config_loads() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let config_dir = temp_dir.path().to_path_buf();
    let manager = ConfigManager::with_directory(config_dir.clone())?;
    manager.initialize()?;

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let dir = config_dir.clone();
            std::thread::spawn(move || {
                if let Ok(mgr) = ConfigManager::with_directory(dir) {
                    for _ in 0..10 {
                        let _ = mgr.load();
                        std::thread::sleep(std::time::Duration::from_millis(1));
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().is_ok());
    }

    Ok(())
}

#[test]
fn test_boundary_values_validation() {
    let mut config = Config::default();

    config.loader.max_concurrent = 1;
    config.transport.max_redirects = 0;
    config.sync.batch_size = 1024;
    assert!(config.validate().is_ok());

    config.loader.max_concurrent = 256;
    config.transport.max_redirects = 20;
    assert!(config.validate().is_ok());

    config.loader.max_concurrent = 257;
    assert!(config.validate().is_err());

    config.loader.max_concurrent = 8;
    config.sync.batch_size = 1025;
    assert!(config.validate().is_err());
}

#[test]
fn test_empty_match_attribute_disables_matching() {
    let mut config = Config::default();
    config.sync.match_attribute = String::new();

    assert!(config.validate().is_ok());
    assert_eq!(config.sync.match_attribute(), None);
}

#[test]
fn test_blank_title_attribute_rejected() {
    let mut config = Config::default();
    config.sync.title_attribute = "   ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_all_validation_errors_collected() {
    let mut config = Config::default();

    config.loader.max_concurrent = 0;
    config.transport.timeout_secs = 0;
    config.transport.retry_attempts = 0;
    config.sync.strategy_batch_size = 5000;

    let errors = config.validate().expect_err("config should be invalid");
    assert!(errors.len() >= 4);
}

#[test]
fn test_rapid_saves() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    let mut config = Config::default();

    for i in 0..50 {
        config.sync.batch_size = i;
        manager.save(&config)?;
    }

    assert_eq!(manager.load()?.sync.batch_size, 49);
    Ok(())
}

#[test]
fn test_merge_with_defaults() {
    let mut base = Config::default();
    base.loader.max_concurrent = 32;
    base.merge(Config::default());

    assert_eq!(base.loader.max_concurrent, 8);
}

#[test]
#[cfg(unix)]
fn test_readonly_config_directory() -> Result<(), Box<dyn std::error::Error>> {
    use std::os::unix::fs::PermissionsExt;

    let (_temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;

    let dir = manager.config_dir().clone();
    let mut perms = fs::metadata(&dir)?.permissions();
    perms.set_mode(0o555);
    fs::set_permissions(&dir, perms)?;

    // Root can write anywhere, so only assert that loading still works
    let _ = manager.save(&Config::default());
    assert!(manager.load().is_ok());

    let mut perms = fs::metadata(&dir)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&dir, perms)?;

    Ok(())
}

#[test]
fn test_config_file_deleted_during_operation() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;

    fs::remove_file(manager.config_path())?;
    assert_eq!(manager.load_or_default(), Config::default());

    Ok(())
}

#[test]
fn test_empty_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    write_config(&manager, "")?;

    assert!(manager.load().is_err());
    assert_eq!(manager.load_or_default(), Config::default());

    Ok(())
}

#[test]
fn test_partial_config_toml() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let partial_toml = r#"
version = 1

[sync]
batch_size = 3
"#;
    write_config(&manager, partial_toml)?;

    let config = manager.load()?;
    assert_eq!(config.sync.batch_size, 3);
    assert_eq!(config.sync.title_attribute, "name");
    assert_eq!(config.loader.max_concurrent, 8);

    Ok(())
}

#[test]
fn test_update_with_invalid_value() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;

    let result = manager.update(|config| {
        config.transport.retry_initial_delay_ms = 0;
    });
    assert!(result.is_err());

    let config = manager.load()?;
    assert_eq!(config.transport.retry_initial_delay_ms, 100);

    Ok(())
}

#[test]
fn test_backup_preserved_on_failed_save() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let mut config = Config::default();
    config.loader.max_concurrent = 4;
    manager.save(&config)?;
    manager.save(&config)?;

    config.loader.max_concurrent = 0;
    assert!(manager.save(&config).is_err());

    let backup_path = manager.config_path().with_extension("toml.backup");
    let backup_config: Config = toml::from_str(&fs::read_to_string(&backup_path)?)?;
    assert_eq!(backup_config.loader.max_concurrent, 4);

    Ok(())
}
