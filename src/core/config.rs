use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Errors that can occur when loading configuration from disk.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as valid TOML.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "Failed to parse config at {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Backend endpoint URL (e.g., "http://localhost:5000")
    pub endpoint: Option<String>,
    /// Model selected when the backend catalog has not chosen one yet
    pub default_model: Option<String>,
    /// Path the capture layer reads encoded frames from
    pub capture_source: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn StdError>> {
        Self::load_from_path(&Self::config_path())
    }

    pub fn load_from_path(config_path: &Path) -> Result<Config, Box<dyn StdError>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
                path: config_path.to_path_buf(),
                source,
            })?;
            let config: Config =
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: config_path.to_path_buf(),
                    source,
                })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn StdError>> {
        self.save_to_path(&Self::config_path())
    }

    pub(crate) fn save_to_path(&self, config_path: &Path) -> Result<(), Box<dyn StdError>> {
        let parent = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());

        if let Some(dir) = parent {
            fs::create_dir_all(dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };

        temp_file.write_all(contents.as_bytes())?;
        temp_file.as_file_mut().sync_all()?;
        temp_file
            .persist(config_path)
            .map_err(|err| -> Box<dyn StdError> { Box::new(err) })?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "atelier")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }

    pub fn print_all(&self) {
        println!(
            "endpoint = {}",
            self.endpoint.as_deref().unwrap_or("(unset)")
        );
        println!(
            "default-model = {}",
            self.default_model.as_deref().unwrap_or("(unset)")
        );
        println!(
            "capture-source = {}",
            self.capture_source
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(unset)".to_string())
        );
    }
}
