//! Playground configuration.
//!
//! Layers, later wins: built-in defaults, the JSON config file, environment
//! variables, then command-line flags (applied by the binary).

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::render::ExpansionPolicy;
use crate::api::*;

pub const ENV_CONFIG: &str = "INFER_PLAYGROUND_CONFIG";
pub const ENV_ENGINE: &str = "INFER_PLAYGROUND_ENGINE";
pub const ENV_RUNTIME: &str = "INFER_PLAYGROUND_RUNTIME";
pub const ENV_TIMEOUT_MS: &str = "INFER_PLAYGROUND_TIMEOUT_MS";
pub const DEFAULT_SHARE_BASE: &str = "http://localhost:8000/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaygroundConfig {
    pub engine: WasmSource,
    /// WASI runner executable; looked up on `PATH` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<PathBuf>,
    pub timeout_ms: u64,
    pub debounce_ms: u64,
    pub max_depth: usize,
    pub expansion: ExpansionPolicy,
    pub history_limit: usize,
    /// Prefix for generated share links.
    pub share_base: String,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            engine: WasmSource::default(),
            runtime: None,
            timeout_ms: 10_000,
            debounce_ms: 300,
            max_depth: 100,
            expansion: ExpansionPolicy::default(),
            history_limit: 20,
            share_base: DEFAULT_SHARE_BASE.to_string(),
        }
    }
}

impl PlaygroundConfig {
    /// Defaults, then `path` (or `$INFER_PLAYGROUND_CONFIG`), then the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, PlaygroundError> {
        let from_env = env::var_os(ENV_CONFIG).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, PlaygroundError> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            PlaygroundError::runtime(format!("cannot read config '{}': {err}", path.display()))
        })?;
        let config = serde_json::from_str(&text).map_err(|err| {
            PlaygroundError::parsing(format!("invalid config '{}': {err}", path.display()))
        })?;
        debug!(path = %path.display(), "config file loaded");
        Ok(config)
    }

    /// Apply environment overrides read through `get`.
    pub fn apply_env_with<F>(&mut self, mut get: F) -> Result<(), PlaygroundError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(value) = get(ENV_ENGINE).filter(|v| !v.trim().is_empty()) {
            self.engine = WasmSource::from_location(value.trim());
        }
        if let Some(value) = get(ENV_RUNTIME).filter(|v| !v.trim().is_empty()) {
            self.runtime = Some(PathBuf::from(value.trim()));
        }
        if let Some(value) = get(ENV_TIMEOUT_MS) {
            self.timeout_ms = value.trim().parse().map_err(|_| {
                PlaygroundError::parsing(format!(
                    "{ENV_TIMEOUT_MS} must be a number of milliseconds, got '{value}'"
                ))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), PlaygroundError> {
        let checks = [
            ("timeoutMs", self.timeout_ms as usize),
            ("maxDepth", self.max_depth),
            ("historyLimit", self.history_limit),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(PlaygroundError::runtime(format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            show_steps: true,
            max_depth: self.max_depth,
        }
    }
}
