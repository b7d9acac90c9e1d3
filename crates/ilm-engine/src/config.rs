//! Engine configuration
//!
//! Loaded from TOML; every section is optional and falls back to its
//! default.
//!
//! ```toml
//! store_timeout_ms = 5000
//! ontology_path = "rules/ontology.yaml"
//!
//! [cache]
//! max_size = 1000
//! default_ttl_secs = 300
//!
//! [gates]
//! semantic = true
//!
//! [roles]
//! publish = ["admin"]
//! ```

use ilm_cache::CacheConfig;
use ilm_lifecycle::RolePolicy;
use ilm_validation::GateConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// Config file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Values parsed but are unusable
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Cache rejected its settings
    #[error(transparent)]
    Cache(#[from] ilm_cache::CacheError),

    /// Ontology rules could not be loaded
    #[error(transparent)]
    Ontology(#[from] ilm_validation::RuleSetError),
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Query cache sizing and expiry
    pub cache: CacheConfig,
    /// Caller-level timeout for each graph-store call
    pub store_timeout_ms: u64,
    /// Gate switches
    pub gates: GateConfig,
    /// Permitted roles per lifecycle action
    pub roles: RolePolicy,
    /// Ontology rule file; the bundled rules are used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ontology_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            store_timeout_ms: 5000,
            gates: GateConfig::default(),
            roles: RolePolicy::default(),
            ontology_path: None,
        }
    }
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With cache settings
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// With store timeout in milliseconds
    #[inline]
    #[must_use]
    pub fn with_store_timeout_ms(mut self, ms: u64) -> Self {
        self.store_timeout_ms = ms;
        self
    }

    /// With gate switches
    #[inline]
    #[must_use]
    pub fn with_gates(mut self, gates: GateConfig) -> Self {
        self.gates = gates;
        self
    }

    /// With role policy
    #[inline]
    #[must_use]
    pub fn with_roles(mut self, roles: RolePolicy) -> Self {
        self.roles = roles;
        self
    }

    /// With ontology rule file
    #[inline]
    #[must_use]
    pub fn with_ontology_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ontology_path = Some(path.into());
        self
    }

    /// Store timeout as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// Returns error if the TOML is malformed or fails [`validate`](Self::validate)
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// A relative `ontology_path` is resolved against the file's directory.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or its contents are invalid
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&toml)?;

        if let (Some(rules), Some(dir)) = (config.ontology_path.as_ref(), path.parent()) {
            if rules.is_relative() {
                config.ontology_path = Some(dir.join(rules));
            }
        }

        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first bad setting
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_size == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_size must be greater than zero".to_string(),
            ));
        }
        if self.store_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "store_timeout_ms must be greater than zero".to_string(),
            ));
        }
        self.roles.validate().map_err(|action| {
            ConfigError::Invalid(format!("roles.{} permits no role", action.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ilm_model::Role;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
        assert!(config.gates.semantic);
        assert!(config.ontology_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_sections() {
        let config = EngineConfig::from_toml_str(
            r#"
            store_timeout_ms = 250

            [cache]
            max_size = 10

            [gates]
            semantic = false

            [roles]
            publish = ["approver", "admin"]
            "#,
        )
        .unwrap();

        assert_eq!(config.store_timeout_ms, 250);
        assert_eq!(config.cache.max_size, 10);
        assert_eq!(config.cache.default_ttl_secs, 300);
        assert!(!config.gates.semantic);
        assert_eq!(config.roles.publish, vec![Role::Approver, Role::Admin]);
        assert_eq!(config.roles.approve, RolePolicy::default().approve);
    }

    #[test]
    fn rejects_zero_values() {
        let err = EngineConfig::from_toml_str("store_timeout_ms = 0").unwrap_err();
        assert!(err.to_string().contains("store_timeout_ms"));

        let err = EngineConfig::from_toml_str("[cache]\nmax_size = 0").unwrap_err();
        assert!(err.to_string().contains("cache.max_size"));
    }

    #[test]
    fn rejects_empty_role_list() {
        let err = EngineConfig::from_toml_str("[roles]\napprove = []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("roles.approve"));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = EngineConfig::from_toml_str("store_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
