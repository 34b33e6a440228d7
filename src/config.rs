//! Validation switches and alias definitions, loaded from JSON.
use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const ENABLED_ENV: &str = "DUCK_TYPES_ENABLED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// When off, `Types::pass` lets every value through unchecked.
    pub enabled: bool,
    pub warn_exact_shape_indexers: bool,
    /// name → annotation, registered lazily in declaration order.
    pub aliases: IndexMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            warn_exact_shape_indexers: true,
            aliases: IndexMap::new(),
        }
    }
}

impl Config {
    pub fn from_json_str(source: &str) -> Result<Self> {
        from_str_with_path(source).map_err(Error::Config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        from_slice_with_path(&bytes).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Applies `DUCK_TYPES_ENABLED` from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        let enabled = std::env::var(ENABLED_ENV).ok();
        self.with_enabled_override(enabled.as_deref())
    }

    pub fn with_enabled_override(mut self, raw: Option<&str>) -> Result<Self> {
        let Some(raw) = raw else { return Ok(self) };
        self.enabled = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" => true,
            "0" | "false" | "off" => false,
            other => {
                return Err(Error::Config(format!("{ENABLED_ENV}: expected on/off, got `{other}`")));
            }
        };
        Ok(self)
    }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        format!("at JSON path {path} → {}", err.into_inner())
    })
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        format!("at JSON path {path} → {}", err.into_inner())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = Config::from_json_str(r#"{"aliases": {"Id": "int"}}"#).unwrap();
        assert!(config.enabled);
        assert!(config.warn_exact_shape_indexers);
        assert_eq!(config.aliases.get("Id").map(String::as_str), Some("int"));
    }

    #[test]
    fn errors_carry_the_json_path() {
        let err = Config::from_json_str(r#"{"aliases": {"Id": 3}}"#).unwrap_err();
        let Error::Config(message) = err else { panic!("expected config error") };
        assert!(message.contains("aliases.Id"), "{message}");

        let err = Config::from_json_str(r#"{"enabeld": false}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn enabled_override() {
        let config = Config::default();
        assert!(!config.clone().with_enabled_override(Some("off")).unwrap().enabled);
        assert!(!config.clone().with_enabled_override(Some("0")).unwrap().enabled);
        assert!(config.clone().with_enabled_override(Some("TRUE")).unwrap().enabled);
        assert!(config.clone().with_enabled_override(None).unwrap().enabled);
        assert!(config.with_enabled_override(Some("maybe")).is_err());
    }

    #[test]
    fn reads_from_disk() {
        let path = std::env::temp_dir().join(format!("duck-types-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"enabled": false}"#).unwrap();
        let config = Config::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(!config.enabled);
        assert!(Config::from_path(&path).is_err());
    }
}
