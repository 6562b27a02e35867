//! Tunables of the editing core, loaded from TOML.
//!
//! ```toml
//! query_page_size = 1000
//! change_batch_size = 10000
//! id_max_attempts = 5
//! secondary_modules = ["900000000000207008"]
//! ```

use crate::concepts::MODULE_SCT_CORE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_QUERY_PAGE_SIZE: usize = 1000;
pub const DEFAULT_CHANGE_BATCH_SIZE: usize = 10_000;
pub const DEFAULT_ID_MAX_ATTEMPTS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml at {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditConfig {
    /// Page size used when paging the query resolver and the member index.
    pub query_page_size: usize,
    /// Number of membership changes handed out per evaluation batch.
    pub change_batch_size: usize,
    /// Upper bound on identifier reservation rounds per namespace group.
    pub id_max_attempts: usize,
    /// Modules ranked after the component's own module when choosing which
    /// member to keep.
    pub secondary_modules: Vec<String>,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            query_page_size: DEFAULT_QUERY_PAGE_SIZE,
            change_batch_size: DEFAULT_CHANGE_BATCH_SIZE,
            id_max_attempts: DEFAULT_ID_MAX_ATTEMPTS,
            secondary_modules: vec![MODULE_SCT_CORE.to_string()],
        }
    }
}

impl EditConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "<inline>")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::ParseToml {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_page_size == 0 {
            return Err(ConfigError::Invalid(
                "query_page_size must be positive".to_string(),
            ));
        }
        if self.change_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "change_batch_size must be positive".to_string(),
            ));
        }
        if self.id_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "id_max_attempts must be positive".to_string(),
            ));
        }
        if let Some(blank) = self
            .secondary_modules
            .iter()
            .position(|module| module.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "secondary_modules[{blank}] is blank"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EditConfig::from_toml_str("").expect("empty config parses");
        assert_eq!(config, EditConfig::default());
        assert_eq!(config.secondary_modules, vec![MODULE_SCT_CORE.to_string()]);
    }

    #[test]
    fn partial_document_overrides_selected_fields() {
        let config = EditConfig::from_toml_str(
            r#"
            change_batch_size = 250
            secondary_modules = ["900000000000012004", "900000000000207008"]
            "#,
        )
        .expect("config parses");
        assert_eq!(config.change_batch_size, 250);
        assert_eq!(config.query_page_size, DEFAULT_QUERY_PAGE_SIZE);
        assert_eq!(config.secondary_modules.len(), 2);
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let err = EditConfig::from_toml_str("query_page_size = 0").expect_err("must fail");
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("query_page_size")));
    }

    #[test]
    fn malformed_toml_reports_origin() {
        let err = EditConfig::from_toml_str("query_page_size = [").expect_err("must fail");
        match err {
            ConfigError::ParseToml { path, .. } => assert_eq!(path, "<inline>"),
            other => panic!("expected toml parse error, got {other:?}"),
        }
    }

    #[test]
    fn load_reads_from_disk() {
        let unique = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "termstore-config-{}-{unique}.toml",
            std::process::id()
        ));
        fs::write(&path, "id_max_attempts = 2\n").expect("fixture should write");

        let config = EditConfig::load(&path).expect("config loads");
        assert_eq!(config.id_max_attempts, 2);

        let _ = fs::remove_file(path);
    }
}
