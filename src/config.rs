//! Client configuration
//!
//! Configuration is plain serde data. It can be built in code, or loaded from
//! YAML with every field optional:
//!
//! ```yaml
//! transaction:
//!   infer: false
//!   prefetch_size: 50
//! logging:
//!   level: "typegraph=debug"
//! ```

use crate::error::{ConceptError, ConceptResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Per-transaction options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionOptions {
    /// Enable rule inference for reads
    pub infer: bool,
    /// Record explanations for inferred answers
    pub explain: bool,
    /// Number of answers fetched per cursor batch
    pub prefetch_size: usize,
    pub transaction_timeout_ms: u64,
    pub schema_lock_acquire_timeout_ms: u64,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            infer: false,
            explain: false,
            prefetch_size: 50,
            transaction_timeout_ms: 300_000,      // 5 minutes
            schema_lock_acquire_timeout_ms: 10_000, // 10 seconds
        }
    }
}

impl TransactionOptions {
    pub fn with_infer(mut self, infer: bool) -> Self {
        self.infer = infer;
        self
    }

    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    pub fn with_prefetch_size(mut self, prefetch_size: usize) -> Self {
        self.prefetch_size = prefetch_size;
        self
    }

    pub fn validate(&self) -> ConceptResult<()> {
        if self.prefetch_size == 0 {
            return Err(ConceptError::Config(
                "prefetch_size must be at least 1".to_string(),
            ));
        }
        if self.explain && !self.infer {
            return Err(ConceptError::Config(
                "explain requires infer to be enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// tracing subscriber settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `typegraph=trace`
    pub level: String,
    pub ansi: bool,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
            with_target: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub transaction: TransactionOptions,
    pub logging: LoggingConfig,
}

impl ClientConfig {
    pub fn from_yaml_str(yaml: &str) -> ConceptResult<Self> {
        let config: ClientConfig =
            serde_yaml::from_str(yaml).map_err(|e| ConceptError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConceptResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConceptError::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Loading client configuration from {}", path.display());
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> ConceptResult<()> {
        self.transaction.validate()?;
        EnvFilter::try_new(&self.logging.level)
            .map_err(|e| ConceptError::Config(format!("invalid log level '{}': {}", self.logging.level, e)))?;
        Ok(())
    }
}

/// Install the global fmt subscriber.
///
/// Only the first call installs anything; later calls (and calls after a
/// host application set its own subscriber) are no-ops.
pub fn init_logging(config: &LoggingConfig) -> ConceptResult<()> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| ConceptError::Config(format!("invalid log level '{}': {}", config.level, e)))?;
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(config.with_target)
        .try_init();
    if installed.is_err() {
        debug!("A global tracing subscriber is already installed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.transaction.prefetch_size, 50);
        assert!(!config.transaction.infer);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ClientConfig::from_yaml_str("transaction:\n  prefetch_size: 7\n").unwrap();
        assert_eq!(config.transaction.prefetch_size, 7);
        assert_eq!(config.transaction.transaction_timeout_ms, 300_000);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_zero_prefetch_rejected() {
        let err = ClientConfig::from_yaml_str("transaction:\n  prefetch_size: 0\n").unwrap_err();
        assert_eq!(err.code(), "CLI09");
    }

    #[test]
    fn test_explain_requires_infer() {
        let options = TransactionOptions::default().with_explain(true);
        assert!(options.validate().is_err());
        assert!(options.with_infer(true).validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "logging:\n  level: debug\n  ansi: false").unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.ansi);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ConceptError::Config(_)));
    }

    #[test]
    fn test_init_logging_twice_is_noop() {
        let config = LoggingConfig::default();
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }
}
