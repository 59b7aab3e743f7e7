//! Persisted preferences: engine source and recent expressions.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::*;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    #[serde(rename = "wasm-source", skip_serializing_if = "Option::is_none")]
    pub wasm_source: Option<WasmSource>,
    #[serde(rename = "expression-history")]
    pub expression_history: Vec<String>,
}

/// Most-recent-first, without duplicates, at most `limit` entries.
pub fn remember(history: &mut Vec<String>, expression: &str, limit: usize) {
    let expression = expression.trim();
    if expression.is_empty() {
        return;
    }
    history.retain(|e| e != expression);
    history.insert(0, expression.to_string());
    history.truncate(limit);
}

#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
    prefs: Preferences,
}

impl PreferenceStore {
    /// `$XDG_CONFIG_HOME/infer-playground/preferences.json`, falling back to
    /// `~/.config`.
    pub fn default_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
        Some(base.join("infer-playground").join("preferences.json"))
    }

    /// A missing or unreadable file yields empty preferences.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let prefs = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "ignoring corrupt preferences");
                Preferences::default()
            }),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "no stored preferences");
                Preferences::default()
            }
        };
        Self { path, prefs }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn wasm_source(&self) -> Option<&WasmSource> {
        self.prefs.wasm_source.as_ref()
    }

    pub fn set_wasm_source(&mut self, source: WasmSource) {
        self.prefs.wasm_source = Some(source);
    }

    pub fn history(&self) -> &[String] {
        &self.prefs.expression_history
    }

    pub fn set_history(&mut self, history: Vec<String>) {
        self.prefs.expression_history = history;
    }

    pub fn push_history(&mut self, expression: &str, limit: usize) {
        remember(&mut self.prefs.expression_history, expression, limit);
    }

    pub fn save(&self) -> Result<(), PlaygroundError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|err| {
                PlaygroundError::runtime(format!("cannot create '{}': {err}", parent.display()))
            })?;
        }
        let text = serde_json::to_string_pretty(&self.prefs)
            .map_err(|err| PlaygroundError::runtime(format!("cannot encode preferences: {err}")))?;
        std::fs::write(&self.path, text).map_err(|err| {
            PlaygroundError::runtime(format!("cannot write '{}': {err}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), "preferences saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remember_moves_repeat_to_front() {
        let mut history = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        remember(&mut history, "c", 3);
        assert_eq!(history, vec!["c", "a", "b"]);
        remember(&mut history, "d", 3);
        assert_eq!(history, vec!["d", "c", "a"]);
    }

    #[test]
    fn blank_input_is_not_remembered() {
        let mut history = Vec::new();
        remember(&mut history, "   ", 5);
        assert!(history.is_empty());
    }
}
