//! Configuration management for stylelens
//!
//! Settings are read from TOML. Lookup order:
//!
//! 1. an explicit `--config` path (any failure is fatal)
//! 2. `./stylelens.toml`
//! 3. `~/.config/stylelens/config.toml`
//! 4. built-in defaults
//!
//! A discovered file that fails to parse is reported and ignored.
//!
//! ```toml
//! prompt_template = "rules.txt"
//!
//! [check]
//! tab_width = 4
//! show_warnings = true
//!
//! [backend]
//! endpoint = "https://api.openai.com/v1/chat/completions"
//! model = "gpt-4o"
//!
//! [cache]
//! enabled = true
//! ```

use crate::cache::{default_cache_root, ResponseCache};
use crate::check::CheckSettings;
use crate::llm::{BackendSettings, ConfigError};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const LOCAL_CONFIG_FILE: &str = "stylelens.toml";
const API_KEY_ENV: &str = "STYLELENS_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub check: CheckSettings,
    pub backend: BackendSettings,
    /// Replaces the built-in rule template
    pub prompt_template: Option<PathBuf>,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Defaults to `~/.llm-checks-cache`
    pub dir: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

/// Values given on the command line; `None` keeps the file's value
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub tab_width: Option<usize>,
    pub column_offset: Option<i64>,
    pub no_warnings: bool,
    pub no_cache: bool,
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    fn sanitize(&mut self) {
        self.check.sanitize();
        self.backend.endpoint = self.backend.endpoint.trim().to_string();
        if self.backend.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            self.backend.api_key = None;
        }
    }

    /// Get the user config file path
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("stylelens").join("config.toml"))
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content).map_err(|e| ConfigError::Invalid {
            path: origin.display().to_string(),
            reason: e.to_string(),
        })?;
        config.sanitize();
        Ok(config)
    }

    /// Load from an explicit path. Relative template paths are resolved
    /// against the config file's directory.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut config = Self::from_toml_str(&content, path)?;
        if let (Some(template), Some(dir)) = (config.prompt_template.as_mut(), path.parent()) {
            if template.is_relative() {
                *template = dir.join(&*template);
            }
        }
        Ok(config)
    }

    /// Load config following the discovery order
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => Ok(Self::discover()),
        }
    }

    /// Apply command-line overrides and the environment API key fallback
    pub fn finish(&mut self, overrides: Overrides) {
        if let Some(endpoint) = overrides.endpoint {
            self.backend.endpoint = endpoint;
        }
        if overrides.model.is_some() {
            self.backend.model = overrides.model;
        }
        if overrides.api_key.is_some() {
            self.backend.api_key = overrides.api_key;
        }
        if let Some(tab_width) = overrides.tab_width {
            self.check.tab_width = tab_width;
        }
        if let Some(column_offset) = overrides.column_offset {
            self.check.column_offset = column_offset;
        }
        if overrides.no_warnings {
            self.check.show_warnings = false;
        }
        if overrides.no_cache {
            self.cache.enabled = false;
        }
        if overrides.cache_dir.is_some() {
            self.cache.dir = overrides.cache_dir;
        }
        self.sanitize();
        self.apply_env_api_key(|name| env::var(name).ok());
    }

    fn discover() -> Self {
        let candidates = [Some(PathBuf::from(LOCAL_CONFIG_FILE)), Self::user_config_path()];
        for path in candidates.into_iter().flatten() {
            if !path.is_file() {
                continue;
            }
            match Self::load_from(&path) {
                Ok(config) => {
                    log::debug!("loaded config from {}", path.display());
                    return config;
                }
                Err(err) => {
                    log::warn!("{}; using defaults", err);
                    return Self::default();
                }
            }
        }
        Self::default()
    }

    /// Fill a missing API key from `STYLELENS_API_KEY`, then from the
    /// provider's conventional variable
    pub fn apply_env_api_key(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.backend.api_key.is_some() {
            return;
        }
        let provider_var = self.backend.provider().ok().and_then(|p| p.api_key_env());
        self.backend.api_key = std::iter::once(API_KEY_ENV)
            .chain(provider_var)
            .filter_map(|name| lookup(name))
            .find(|key| !key.trim().is_empty());
    }

    /// Reply cache, unless disabled
    pub fn response_cache(&self) -> Option<ResponseCache> {
        if !self.cache.enabled {
            return None;
        }
        let root = self.cache.dir.clone().or_else(default_cache_root);
        if root.is_none() {
            log::warn!("Could not determine home directory; reply cache disabled");
        }
        root.map(ResponseCache::new)
    }
}
