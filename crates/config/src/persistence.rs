//! Reading and writing `config.toml`
//!
//! Saves go through a temporary file in the target directory followed by a
//! rename, so a crash never leaves a half-written file. The file being
//! replaced is copied to `config.toml.backup` first.

use crate::{Config, ConfigError, ConfigResult, ValidationError, CONFIG_VERSION};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// One config file on disk
pub struct ConfigPersistence {
    config_path: PathBuf,
}

impl ConfigPersistence {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Reads the file, or returns defaults when there is none
    ///
    /// Blank, unparsable and newer-version files are errors. Out-of-range
    /// values only produce a warning so they can be corrected in place.
    pub fn load(&self) -> ConfigResult<Config> {
        if !self.config_path.exists() {
            log::info!(
                "No config at {}, starting from defaults",
                self.config_path.display()
            );
            return Ok(Config::default());
        }

        let contents = self.read()?;
        let mut config = self.parse(&contents)?;

        match config.version {
            found if found > CONFIG_VERSION => {
                return Err(ConfigError::UnsupportedVersion {
                    found,
                    supported: CONFIG_VERSION,
                });
            }
            found if found < CONFIG_VERSION => {
                log::info!(
                    "Upgrading config from version {} to {}; new fields use defaults",
                    found,
                    CONFIG_VERSION
                );
                config.version = CONFIG_VERSION;
            }
            _ => {}
        }

        if let Err(errors) = config.validate() {
            log::warn!("Config has invalid values: {}", summarize(&errors));
        }
        Ok(config)
    }

    /// Validates `config` and replaces the file with it
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        config
            .validate()
            .map_err(|errors| ConfigError::ValidationError(summarize(&errors)))?;

        let dir = self
            .config_path
            .parent()
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "Config path has no parent directory".to_string(),
            })?;
        create_dir(dir)?;

        if self.config_path.exists() {
            self.backup()?;
        }

        let toml = toml::to_string_pretty(config)?;
        self.replace_with(dir, &toml)?;

        log::info!("Wrote config to {}", self.config_path.display());
        Ok(())
    }

    fn read(&self) -> ConfigResult<String> {
        let read_error = |source| ConfigError::ReadError {
            path: self.config_path.clone(),
            source,
        };

        let contents = fs::read_to_string(&self.config_path).map_err(read_error)?;
        if contents.trim().is_empty() {
            return Err(read_error(io::Error::new(
                io::ErrorKind::InvalidData,
                "config file is blank",
            )));
        }
        Ok(contents)
    }

    fn parse(&self, contents: &str) -> ConfigResult<Config> {
        toml::from_str(contents).map_err(|source| ConfigError::ParseError {
            path: self.config_path.clone(),
            source,
        })
    }

    fn backup(&self) -> ConfigResult<()> {
        let backup = self.config_path.with_extension("toml.backup");
        fs::copy(&self.config_path, &backup).map_err(|source| ConfigError::BackupError { source })?;
        log::debug!("Kept previous config as {}", backup.display());
        Ok(())
    }

    fn replace_with(&self, dir: &Path, contents: &str) -> ConfigResult<()> {
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(contents.as_bytes())?;
        staged.flush()?;

        staged
            .persist(&self.config_path)
            .map_err(|e| ConfigError::WriteError {
                path: self.config_path.clone(),
                source: e.error,
            })?;
        Ok(())
    }
}

fn create_dir(dir: &Path) -> ConfigResult<()> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|source| ConfigError::DirectoryCreationError {
        path: dir.to_path_buf(),
        source,
    })?;
    log::info!("Created config directory {}", dir.display());
    Ok(())
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_file() -> (TempDir, ConfigPersistence, PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("config.toml");
        (dir, ConfigPersistence::new(path.clone()), path)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let (_dir, persistence, path) = config_file();
        assert_eq!(persistence.load().unwrap(), Config::default());
        assert!(!path.exists());
    }

    #[test]
    fn test_saved_sections_load_back() {
        let (_dir, persistence, _) = config_file();
        let mut config = Config::default();
        config.loader.max_concurrent = 2;
        config.sync.strategy_batch_size = 1;
        config.sync.match_attribute = "title".to_string();

        persistence.save(&config).unwrap();
        assert_eq!(persistence.load().unwrap(), config);
    }

    #[test]
    fn test_save_into_missing_directory() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("semnet").join("config.toml");

        ConfigPersistence::new(path.clone())
            .save(&Config::default())
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_overwrite_keeps_previous_file() {
        let (_dir, persistence, path) = config_file();
        let mut first = Config::default();
        first.transport.timeout_secs = 5;
        persistence.save(&first).unwrap();
        persistence.save(&Config::default()).unwrap();

        let backup = fs::read_to_string(path.with_extension("toml.backup")).unwrap();
        let previous: Config = toml::from_str(&backup).unwrap();
        assert_eq!(previous.transport.timeout_secs, 5);
    }

    #[test]
    fn test_unreadable_files() {
        let (_dir, persistence, path) = config_file();

        fs::write(&path, "[loader\nmax_concurrent = ").unwrap();
        assert!(matches!(persistence.load(), Err(ConfigError::ParseError { .. })));

        fs::write(&path, "\n  \n").unwrap();
        assert!(matches!(persistence.load(), Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_version_handling() {
        let (_dir, persistence, path) = config_file();

        fs::write(&path, "version = 99\n").unwrap();
        assert!(matches!(
            persistence.load(),
            Err(ConfigError::UnsupportedVersion { found: 99, .. })
        ));

        fs::write(&path, "version = 0\n[loader]\nmax_concurrent = 3\n").unwrap();
        let config = persistence.load().unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.loader.max_concurrent, 3);
    }

    #[test]
    fn test_invalid_values_are_not_saved() {
        let (_dir, persistence, path) = config_file();
        let mut config = Config::default();
        config.loader.max_concurrent = 0;

        let err = persistence.save(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref msg) if msg.contains("loader.max_concurrent")));
        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_values_still_load() {
        let (_dir, persistence, path) = config_file();
        fs::write(&path, "[transport]\ntimeout_secs = 0\n").unwrap();

        let config = persistence.load().unwrap();
        assert_eq!(config.transport.timeout_secs, 0);
    }
}
