//! Engine configuration.
//!
//! ```toml
//! cache_dir = "/var/cache/starlet"
//! max_steps = 1000000
//!
//! [dialect]
//! recursion = true
//! while_loops = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use starlet_engine::{FileOptions, Thread};
use tracing::debug;

use crate::error::{Result, StarletError};

/// Configuration for compiling and running programs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dialect programs are compiled with
    pub dialect: FileOptions,

    /// Directory for compiled programs; no caching when unset
    pub cache_dir: Option<PathBuf>,

    /// Instruction budget per evaluation; zero means unlimited
    pub max_steps: u64,
}

impl Config {
    /// Parses configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|source| StarletError::Config {
            path: PathBuf::from("<string>"),
            source,
        })
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = toml::from_str(&text).map_err(|source| StarletError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Creates a thread carrying the configured step budget.
    pub fn thread(&self, name: &str) -> Thread {
        let mut thread = Thread::new(name);
        thread.set_max_steps(self.max_steps);
        thread
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml_str("").expect("Should parse empty config");
        assert_eq!(config, Config::default());
        assert_eq!(config.dialect, FileOptions::default());
        assert!(config.cache_dir.is_none());
        assert_eq!(config.max_steps, 0);
    }

    #[test]
    fn test_partial_dialect() {
        let config = Config::from_toml_str("max_steps = 500\n\n[dialect]\nrecursion = true\n")
            .expect("Should parse config");
        assert_eq!(config.max_steps, 500);
        assert!(config.dialect.recursion);
        assert!(!config.dialect.while_loops);
        assert_eq!(config.thread("t").steps(), 0);
    }

    #[test]
    fn test_invalid_config() {
        let err = Config::from_toml_str("max_steps = \"lots\"\n").expect_err("Should reject");
        assert!(matches!(err, StarletError::Config { .. }));
        assert!(err.to_string().starts_with("invalid configuration <string>: "));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("starlet.toml");
        std::fs::write(&path, "cache_dir = \"/tmp/starlet\"\n").expect("Should write config");
        let config = Config::load(&path).expect("Should load config");
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/starlet")));

        let missing = Config::load(&dir.path().join("missing.toml")).expect_err("Should fail");
        assert!(matches!(missing, StarletError::Io(_)));
    }
}
