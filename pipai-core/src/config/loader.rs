use super::error::ConfigError;
use super::paths::ENV_FILE;
use dotenvy::from_path;
use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Once;
use tracing::debug;

static ENV_LOADER: Once = Once::new();

/// Loads `<config_dir>/.env` into the process environment, once.
/// Variables already set in the environment win.
pub fn ensure_env_loaded(config_dir: &Path) {
    ENV_LOADER.call_once(|| {
        let path = config_dir.join(ENV_FILE);
        if from_path(&path).is_ok() {
            debug!(path = %path.display(), "Loaded environment file");
        }
    });
}

/// Reads and parses a TOML file. `Ok(None)` when the file does not exist.
pub(super) fn read_optional_toml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    debug!(path = %path.display(), "Reading configuration file");
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    toml::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}
