//! Importer configuration file.
//!
//! ```toml
//! [postgres]
//! url = "postgres://dbsnp@localhost/dbsnp_chicken"
//! max_connections = 2
//!
//! [dbsnp]
//! build = 150
//! assembly = "Gallus_gallus-5.0"
//! assembly_types = ["Primary_Assembly"]
//! shared_schema = "dbsnp_shared"
//!
//! [import]
//! page_size = 1000
//! fetch_size = 1000
//! chunk_size = 1000
//! ```
//!
//! Every key is optional; command-line flags override file values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ImportError, ImportResult};
use crate::pipeline::DEFAULT_CHUNK_SIZE;
use crate::query::DEFAULT_SHARED_SCHEMA;
use crate::reader::DEFAULT_FETCH_SIZE;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "dbsnp-importer.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    pub postgres: PostgresConfig,
    pub dbsnp: DbsnpConfig,
    pub import: ImportSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbsnpConfig {
    pub build: Option<u32>,
    pub assembly: Option<String>,
    pub assembly_types: Vec<String>,
    pub shared_schema: String,
}

impl Default for DbsnpConfig {
    fn default() -> Self {
        Self {
            build: None,
            assembly: None,
            assembly_types: Vec::new(),
            shared_schema: DEFAULT_SHARED_SCHEMA.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Rows per keyset page in paged mode. Signed so that bad values reach validation.
    pub page_size: i64,
    pub fetch_size: usize,
    pub chunk_size: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            page_size: 1000,
            fetch_size: DEFAULT_FETCH_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ImporterConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> ImportResult<Self> {
        toml::from_str(content).map_err(|e| ImportError::config(format!("invalid config: {}", e)))
    }

    /// Read a config file.
    pub fn from_file(path: &Path) -> ImportResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ImportError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `explicit` if given (it must exist), otherwise the first default
    /// location that exists, otherwise built-in defaults.
    pub fn load(explicit: Option<&Path>) -> ImportResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        for path in default_locations() {
            if path.exists() {
                debug!(path = %path.display(), "Loading config");
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }
}

/// `./dbsnp-importer.toml`, then `<config dir>/dbsnp-importer/config.toml`.
pub fn default_locations() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("dbsnp-importer").join("config.toml"));
    }
    paths
}
