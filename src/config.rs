use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use glob::Pattern;
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use toml::{Table, Value};

use crate::errors::{CocoaError, Result};

/// Environment variable that points at the configuration file.
pub const CONFIG_ENV_VAR: &str = "COCOA_CONFIG";

/// Name of the configuration file inside the user config directory.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Matches `$VAR`, `env:VAR` and `${VAR}` references.
static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$(\w+)|env:(\w+)|\$\{(\w+)\}").expect("static pattern is valid")
});

/// Key/value configuration backed by a single TOML file.
///
/// Values are stored exactly as written. Environment references inside
/// string values are expanded when read through [`ConfigStore::get`], never
/// when written.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    table: Table,
}

impl ConfigStore {
    /// Creates a store with no backing file.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the store from `path`. A missing file yields an empty store that
    /// will be written to `path` on [`ConfigStore::save`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                path: Some(path.to_path_buf()),
                table: Table::new(),
            });
        }

        let contents = fs::read_to_string(path).map_err(|e| CocoaError::Config {
            message: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        let mut store = Self::from_toml_str(&contents).map_err(|e| CocoaError::Config {
            message: format!("failed to parse config file '{}': {}", path.display(), e),
        })?;
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    /// Parses a store from TOML text without a backing file.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let table: Table = toml::from_str(contents)?;
        Ok(Self { path: None, table })
    }

    /// Returns the file backing this store, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns `section.key` with environment references expanded, or `None`
    /// when either the section or the key is absent.
    pub fn get(&self, section: &str, key: &str) -> Option<Value> {
        self.get_with(section, key, |name| std::env::var(name).ok())
    }

    /// Like [`ConfigStore::get`] but resolves variables through `lookup`.
    pub fn get_with<F>(&self, section: &str, key: &str, lookup: F) -> Option<Value>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = self.table.get(section)?.as_table()?.get(key)?;
        Some(expand_value(raw, &lookup))
    }

    /// Returns `section.key` as a string, if present and a string.
    pub fn get_str(&self, section: &str, key: &str) -> Option<String> {
        match self.get(section, key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Stores `value` under `section.key`, creating the section if needed.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<Value>) {
        if !matches!(self.table.get(section), Some(Value::Table(_))) {
            self.table
                .insert(section.to_string(), Value::Table(Table::new()));
        }
        if let Some(Value::Table(t)) = self.table.get_mut(section) {
            t.insert(key.to_string(), value.into());
        }
    }

    /// Writes the raw (unexpanded) values back to the backing file.
    ///
    /// Writes to a temporary file first and then renames it over the target.
    pub fn save(&self) -> Result<()> {
        let path = self.path.as_ref().ok_or_else(|| CocoaError::Config {
            message: "config store has no backing file".to_string(),
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let text = toml::to_string(&self.table).map_err(|e| CocoaError::Config {
            message: format!("failed to serialize config: {}", e),
        })?;
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, text)?;
        fs::rename(&tmp_path, path).map_err(|e| CocoaError::Config {
            message: format!(
                "failed to rename '{}' to '{}': {}",
                tmp_path.display(),
                path.display(),
                e
            ),
        })?;
        Ok(())
    }
}

/// Expands environment references in `value`. Unknown variables are kept as
/// written.
pub fn expand_env_variables<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_REFERENCE
        .replace_all(value, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            lookup(name).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn expand_value<F>(value: &Value, lookup: &F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(s) => Value::String(expand_env_variables(s, lookup)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| expand_value(v, lookup)).collect())
        }
        Value::Table(t) => Value::Table(
            t.iter()
                .map(|(k, v)| (k.clone(), expand_value(v, lookup)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Resolves which configuration file to use: an explicit path, then
/// `$COCOA_CONFIG`, then the per-user config directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    if let Ok(p) = std::env::var(CONFIG_ENV_VAR) {
        if !p.is_empty() {
            return Some(PathBuf::from(p));
        }
    }
    dirs::config_dir().map(|d| d.join("cocoa").join(CONFIG_FILENAME))
}

/// Settings the toolbox reads from the `[analysis]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolboxSettings {
    /// Precomputed analyzer output to load instead of running the analyzer.
    pub analysis_json: Option<PathBuf>,
    /// Analyzer jar used to produce `analysis.json` when none exists.
    pub codeanalyzer_jar: Option<PathBuf>,
    /// Java executable used to run the analyzer.
    pub java: String,
    /// Analysis depth passed to the analyzer.
    pub analysis_level: u32,
    /// Directory receiving analyzer output; defaults to a per-project cache dir.
    pub output_dir: Option<PathBuf>,
    /// Glob patterns ignored when looking for Java sources.
    pub exclude: Vec<String>,
    /// Re-run the analyzer even when earlier output exists.
    pub eager: bool,
}

impl Default for ToolboxSettings {
    fn default() -> Self {
        Self {
            analysis_json: None,
            codeanalyzer_jar: None,
            java: "java".to_string(),
            analysis_level: 2,
            output_dir: None,
            exclude: vec![
                "target/**".to_string(),
                "build/**".to_string(),
                "out/**".to_string(),
                ".git/**".to_string(),
                ".gradle/**".to_string(),
                "node_modules/**".to_string(),
            ],
            eager: false,
        }
    }
}

impl ToolboxSettings {
    const SECTION: &'static str = "analysis";

    /// Reads the settings from `store`, falling back to defaults for absent keys.
    pub fn from_store(store: &ConfigStore) -> Result<Self> {
        let mut settings = Self::default();
        let section = Self::SECTION;

        settings.analysis_json = store.get_str(section, "analysis_json").map(PathBuf::from);
        settings.codeanalyzer_jar = store
            .get_str(section, "codeanalyzer_jar")
            .map(PathBuf::from);
        settings.output_dir = store.get_str(section, "output_dir").map(PathBuf::from);
        if let Some(java) = store.get_str(section, "java") {
            settings.java = java;
        }

        match store.get(section, "eager") {
            None => {}
            Some(Value::Boolean(b)) => settings.eager = b,
            Some(other) => {
                return Err(CocoaError::Config {
                    message: format!("analysis.eager must be a boolean, got {}", other),
                });
            }
        }

        match store.get(section, "analysis_level") {
            None => {}
            Some(Value::Integer(level)) if (1..=2).contains(&level) => {
                settings.analysis_level = level as u32;
            }
            Some(other) => {
                return Err(CocoaError::Config {
                    message: format!("analysis.analysis_level must be 1 or 2, got {}", other),
                });
            }
        }

        match store.get(section, "exclude") {
            None => {}
            Some(Value::Array(items)) => {
                settings.exclude = items
                    .iter()
                    .map(|v| {
                        v.as_str().map(str::to_string).ok_or_else(|| CocoaError::Config {
                            message: "analysis.exclude must be a list of strings".to_string(),
                        })
                    })
                    .collect::<Result<_>>()?;
            }
            Some(_) => {
                return Err(CocoaError::Config {
                    message: "analysis.exclude must be a list of strings".to_string(),
                });
            }
        }

        Ok(settings)
    }

    /// Directory the analyzer writes into for `project_root`.
    ///
    /// Without an explicit setting this is `<cache>/cocoa/<hash>` where the
    /// hash is derived from the project path, or `<project>/.cocoa` when no
    /// user cache directory exists.
    pub fn output_dir_for(&self, project_root: &Path) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        match dirs::cache_dir() {
            Some(cache) => cache.join("cocoa").join(project_fingerprint(project_root)),
            None => project_root.join(".cocoa"),
        }
    }

    /// Whether a project-relative path is excluded from the source scan.
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        let match_opts = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        self.exclude.iter().any(|p| {
            Pattern::new(p)
                .map(|pattern| pattern.matches_with(relative_path, match_opts))
                .unwrap_or(false)
        })
    }
}

/// First 16 hex characters of the SHA-256 of the project path.
pub fn project_fingerprint(project_root: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(project_root.to_string_lossy().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}
