//! # Configuration Module
//!
//! Runtime knobs for the router, the static path enumerator and hot reload.
//!
//! Configuration is layered: built-in defaults, then an optional YAML file, then
//! environment variables. Every field has a default, so an empty file (or no file
//! at all) is a valid configuration.
//!
//! ## Environment Variables
//!
//! | Variable                       | Field                          | Default   |
//! |--------------------------------|--------------------------------|-----------|
//! | `SEGROUTE_SLOW_MATCH_US`       | `slow_match_threshold_us`      | `1000`    |
//! | `SEGROUTE_ENUM_WORKERS`        | `enumerator.num_workers`       | `4`       |
//! | `SEGROUTE_ENUM_TIMEOUT_MS`     | `enumerator.source_timeout_ms` | `5000`    |
//! | `SEGROUTE_ENUM_MAX_PATHS`      | `enumerator.max_paths`         | `100000`  |
//! | `SEGROUTE_STACK_SIZE`          | `enumerator.stack_size`        | `0x10000` |
//! | `SEGROUTE_RELOAD_DEBOUNCE_MS`  | `hot_reload.debounce_ms`       | `50`      |
//!
//! `SEGROUTE_STACK_SIZE` accepts decimal (`65536`) or hexadecimal (`0x10000`).
//! Unparseable values fall back to the value already configured.
//!
//! ## Example
//!
//! ```yaml
//! slow_match_threshold_us: 500
//! enumerator:
//!   num_workers: 8
//!   source_timeout_ms: 2000
//! hot_reload:
//!   debounce_ms: 100
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Static path enumeration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumeratorConfig {
    /// Number of worker coroutines running value sources
    pub num_workers: usize,
    /// Per-call timeout for a value source
    pub source_timeout_ms: u64,
    /// Cap on emitted paths per node
    pub max_paths: usize,
    /// Coroutine stack size in bytes
    pub stack_size: usize,
}

impl Default for EnumeratorConfig {
    fn default() -> Self {
        Self {
            num_workers: 4,
            source_timeout_ms: 5000,
            max_paths: 100_000,
            stack_size: 0x10000,
        }
    }
}

impl EnumeratorConfig {
    #[must_use]
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }
}

/// Hot reload settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotReloadConfig {
    /// Quiet period after the last filesystem event before rebuilding
    pub debounce_ms: u64,
}

impl Default for HotReloadConfig {
    fn default() -> Self {
        Self { debounce_ms: 50 }
    }
}

impl HotReloadConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Matches slower than this are logged at `warn`
    pub slow_match_threshold_us: u64,
    pub enumerator: EnumeratorConfig,
    pub hot_reload: HotReloadConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            slow_match_threshold_us: 1000,
            enumerator: EnumeratorConfig::default(),
            hot_reload: HotReloadConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Defaults overridden by environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Parse a YAML document; missing fields keep their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid YAML for this shape.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).context("Failed to parse router configuration")
    }

    /// Load a YAML file, then apply environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_yaml_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.apply_env();
        Ok(config)
    }

    /// Overwrite fields for which an environment variable is set
    pub fn apply_env(&mut self) {
        override_from_env("SEGROUTE_SLOW_MATCH_US", &mut self.slow_match_threshold_us);
        override_from_env("SEGROUTE_ENUM_WORKERS", &mut self.enumerator.num_workers);
        override_from_env(
            "SEGROUTE_ENUM_TIMEOUT_MS",
            &mut self.enumerator.source_timeout_ms,
        );
        override_from_env("SEGROUTE_ENUM_MAX_PATHS", &mut self.enumerator.max_paths);
        if let Ok(val) = env::var("SEGROUTE_STACK_SIZE") {
            if let Some(size) = parse_stack_size(&val) {
                self.enumerator.stack_size = size;
            }
        }
        override_from_env(
            "SEGROUTE_RELOAD_DEBOUNCE_MS",
            &mut self.hot_reload.debounce_ms,
        );
        self.enumerator.num_workers = self.enumerator.num_workers.max(1);
    }

    #[must_use]
    pub fn slow_match_threshold(&self) -> Duration {
        Duration::from_micros(self.slow_match_threshold_us)
    }
}

fn override_from_env<T: std::str::FromStr>(var: &str, field: &mut T) {
    if let Some(v) = env::var(var).ok().and_then(|s| s.trim().parse().ok()) {
        *field = v;
    }
}

/// Parse a byte count given in decimal or `0x`-prefixed hexadecimal
#[must_use]
pub fn parse_stack_size(val: &str) -> Option<usize> {
    let val = val.trim();
    if let Some(hex) = val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.slow_match_threshold_us, 1000);
        assert_eq!(config.enumerator.num_workers, 4);
        assert_eq!(config.enumerator.source_timeout(), Duration::from_secs(5));
        assert_eq!(config.enumerator.max_paths, 100_000);
        assert_eq!(config.enumerator.stack_size, 0x10000);
        assert_eq!(config.hot_reload.debounce_ms, 50);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = RouterConfig::from_yaml_str(
            "enumerator:\n  num_workers: 8\nhot_reload:\n  debounce_ms: 10\n",
        )
        .unwrap();
        assert_eq!(config.enumerator.num_workers, 8);
        assert_eq!(config.enumerator.max_paths, 100_000);
        assert_eq!(config.hot_reload.debounce_ms, 10);
        assert_eq!(config.slow_match_threshold_us, 1000);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(
            RouterConfig::from_yaml_str("  \n").unwrap(),
            RouterConfig::default()
        );
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(RouterConfig::from_yaml_str("enumerator: [1, 2").is_err());
    }

    #[test]
    fn test_parse_stack_size() {
        assert_eq!(parse_stack_size("0x4000"), Some(0x4000));
        assert_eq!(parse_stack_size("16384"), Some(16384));
        assert_eq!(parse_stack_size("0xZZ"), None);
        assert_eq!(parse_stack_size("lots"), None);
    }
}
