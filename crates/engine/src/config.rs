//! Store configuration via `docstore.toml`
//!
//! A store is described by the host of its cluster, the bucket to open and
//! the bucket password. The file is plain TOML; there is no environment
//! variable layer.

use serde::{Deserialize, Serialize};
use std::path::Path;

use docstore_core::Fault;

use crate::Result;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "docstore.toml";

/// Name a store reports until `set_name` is called
pub const DEFAULT_STORE_NAME: &str = "docstore";

/// Cap on rows drained by a single query
pub const DEFAULT_MAX_QUERY_ROWS: usize = 100_000;

fn default_name() -> String {
    DEFAULT_STORE_NAME.to_string()
}

fn default_max_query_rows() -> usize {
    DEFAULT_MAX_QUERY_ROWS
}

/// Store configuration loaded from `docstore.toml`.
///
/// # Example
///
/// ```toml
/// host = "couchbase://127.0.0.1"
/// bucket = "documents"
/// # password = "secret"
/// # name = "docstore"
/// # max_query_rows = 100000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Cluster host; stores with the same host share a cluster handle
    pub host: String,
    /// Bucket to open
    pub bucket: String,
    /// Bucket password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Store name reported by `get_name`
    #[serde(default = "default_name")]
    pub name: String,
    /// Queries returning more rows than this fail with `TooBig`
    #[serde(default = "default_max_query_rows")]
    pub max_query_rows: usize,
}

impl StoreConfig {
    /// Config for `bucket` on `host` with defaults for everything else
    pub fn new(host: impl Into<String>, bucket: impl Into<String>) -> Self {
        StoreConfig {
            host: host.into(),
            bucket: bucket.into(),
            password: None,
            name: default_name(),
            max_query_rows: DEFAULT_MAX_QUERY_ROWS,
        }
    }

    /// Set the bucket password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the row cap for queries
    pub fn with_max_query_rows(mut self, rows: usize) -> Self {
        self.max_query_rows = rows;
        self
    }

    /// Check that the config can open a store
    ///
    /// # Errors
    ///
    /// Returns `InvalidArguments` if the host or bucket is empty or the row
    /// cap is zero.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Fault::invalid_arguments("host must not be empty"));
        }
        if self.bucket.trim().is_empty() {
            return Err(Fault::invalid_arguments("bucket must not be empty"));
        }
        if self.max_query_rows == 0 {
            return Err(Fault::invalid_arguments("max_query_rows must be positive"));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# docstore configuration
#
# Cluster host. Stores opened against the same host share one connection.
host = "couchbase://127.0.0.1"

# Bucket holding the documents
bucket = "default"

# Bucket password, if the bucket requires one
# password = "secret"

# Name reported by the store (default: "docstore")
# name = "docstore"

# Queries are drained into memory; more rows than this fail with TooBig
# max_query_rows = 100000
"#
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArguments` if the text does not parse or fails
    /// validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(content).map_err(|e| {
            Fault::invalid_arguments(format!("failed to parse store config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the file cannot be read, `InvalidArguments` if
    /// it cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Fault::internal(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Fault::InvalidArguments { reason } => Fault::InvalidArguments {
                reason: format!("{} ({})", reason, path.display()),
            },
            other => other,
        })
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Fault::internal(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Fault::internal(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
