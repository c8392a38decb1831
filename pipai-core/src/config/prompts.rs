//! Named prompt templates stored under `<config_dir>/prompts`.
//!
//! Each file is a small TOML document with `summary` and `prompt` keys. Files
//! that are not valid TOML are treated as a bare prompt body so hand-written
//! text files keep working.

use super::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: String,
    pub summary: String,
    pub prompt: String,
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawPrompt {
    summary: Option<String>,
    #[serde(default)]
    prompt: String,
}

/// All prompts discovered in one directory, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    dir: PathBuf,
    prompts: BTreeMap<String, PromptTemplate>,
}

impl PromptLibrary {
    /// Scans `dir` once. A missing directory yields an empty library.
    pub fn discover(dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let dir = dir.into();
        let mut prompts = BTreeMap::new();

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                return Ok(Self { dir, prompts });
            }
            Err(source) => return Err(ConfigError::Io { path: dir, source }),
        };

        for entry in entries {
            let entry = entry.map_err(|source| ConfigError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                warn!(path = %path.display(), "Skipping prompt with non UTF-8 name");
                continue;
            };
            if validate_name(name).is_err() {
                debug!(path = %path.display(), "Skipping file that is not a prompt");
                continue;
            }
            let template = read_template(name, &path)?;
            if template.prompt.is_empty() {
                debug!(prompt = name, "Skipping empty prompt");
                continue;
            }
            prompts.insert(name.to_string(), template);
        }

        debug!(count = prompts.len(), dir = %dir.display(), "Discovered prompts");
        Ok(Self { dir, prompts })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.prompts.keys().map(String::as_str)
    }

    pub fn templates(&self) -> impl Iterator<Item = &PromptTemplate> {
        self.prompts.values()
    }

    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.prompts.get(name)
    }

    /// Joins the bodies of the selected prompts, in library order, separated
    /// by a blank line. Unknown names are ignored.
    pub fn compose<'a, I>(&self, selected: I) -> Option<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let wanted: Vec<&str> = selected.into_iter().collect();
        let bodies: Vec<&str> = self
            .prompts
            .values()
            .filter(|template| wanted.contains(&template.name.as_str()))
            .map(|template| template.prompt.as_str())
            .collect();
        if bodies.is_empty() {
            None
        } else {
            Some(bodies.join("\n\n"))
        }
    }

    /// Writes a new prompt file. Existing prompts are never overwritten.
    pub fn create(&mut self, name: &str, summary: &str, prompt: &str) -> Result<&PromptTemplate, ConfigError> {
        validate_name(name)?;
        let path = self.dir.join(name);
        if path.exists() {
            return Err(ConfigError::PromptExists {
                name: name.to_string(),
            });
        }

        let mut document = toml::Table::new();
        document.insert("summary".into(), toml::Value::String(summary.trim().to_string()));
        document.insert("prompt".into(), toml::Value::String(prompt.trim().to_string()));
        let content = toml::to_string(&document).map_err(|err| ConfigError::Io {
            path: path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, err),
        })?;

        fs::create_dir_all(&self.dir).map_err(|source| ConfigError::Io {
            path: self.dir.clone(),
            source,
        })?;
        fs::write(&path, content).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        let template = PromptTemplate {
            name: name.to_string(),
            summary: summary.trim().to_string(),
            prompt: prompt.trim().to_string(),
            path,
        };
        Ok(self.prompts.entry(name.to_string()).or_insert(template))
    }

    pub fn delete(&mut self, name: &str) -> Result<(), ConfigError> {
        validate_name(name)?;
        let path = self
            .prompts
            .get(name)
            .map(|template| template.path.clone())
            .unwrap_or_else(|| self.dir.join(name));
        match fs::remove_file(&path) {
            Ok(()) => {
                self.prompts.remove(name);
                Ok(())
            }
            Err(source) if source.kind() == io::ErrorKind::NotFound => Err(ConfigError::PromptNotFound {
                name: name.to_string(),
            }),
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }
}

fn default_summary(name: &str) -> String {
    format!("Use the pre-defined '{name}' prompt")
}

fn read_template(name: &str, path: &Path) -> Result<PromptTemplate, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let template = match toml::from_str::<RawPrompt>(&content) {
        Ok(raw) => PromptTemplate {
            name: name.to_string(),
            summary: raw
                .summary
                .map(|summary| summary.trim().to_string())
                .unwrap_or_else(|| default_summary(name)),
            prompt: raw.prompt.trim().to_string(),
            path: path.to_path_buf(),
        },
        Err(_) => PromptTemplate {
            name: name.to_string(),
            summary: default_summary(name),
            prompt: content.trim().to_string(),
            path: path.to_path_buf(),
        },
    };
    Ok(template)
}

fn validate_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidPromptName {
            name: name.to_string(),
        })
    }
}
