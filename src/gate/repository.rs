//! Token repositories backing the delivery gate.
//!
//! A token maps a source key to the minimum severity that key is allowed to
//! emit. Lookups are on the submission hot path and never touch I/O: the
//! file-backed repository keeps its table in memory and swaps it atomically
//! on reload.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::Deserialize;
use thiserror::Error;

use crate::record::Severity;

/// Error type for token repository loading.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to read token file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse token file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Key → threshold lookup consulted by the gate.
pub trait TokenRepository: Send + Sync {
    /// Threshold configured for `key`, if any.
    fn lookup(&self, key: &str) -> Option<Severity>;

    /// Set or replace the threshold for `key`.
    fn set(&self, key: &str, threshold: Severity);

    /// Remove the token for `key`. Returns the previous threshold.
    fn remove(&self, key: &str) -> Option<Severity>;

    /// All keys currently holding a token.
    fn keys(&self) -> Vec<String>;
}

/// Concurrent in-memory token table.
#[derive(Debug, Default)]
pub struct InMemoryTokenRepository {
    tokens: DashMap<String, Severity>,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tokens<I, K>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (K, Severity)>,
        K: Into<String>,
    {
        let repo = Self::new();
        for (key, threshold) in tokens {
            repo.tokens.insert(key.into(), threshold);
        }
        repo
    }
}

impl TokenRepository for InMemoryTokenRepository {
    fn lookup(&self, key: &str) -> Option<Severity> {
        self.tokens.get(key).map(|entry| *entry.value())
    }

    fn set(&self, key: &str, threshold: Severity) {
        self.tokens.insert(key.to_string(), threshold);
    }

    fn remove(&self, key: &str) -> Option<Severity> {
        self.tokens.remove(key).map(|(_, threshold)| threshold)
    }

    fn keys(&self) -> Vec<String> {
        self.tokens.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[derive(Debug, Default, Deserialize)]
struct TokenFile {
    #[serde(default)]
    tokens: HashMap<String, Severity>,
}

/// Token table loaded from a TOML file:
///
/// ```toml
/// [tokens]
/// "orders.api" = "WARNING"
/// billing = "DEBUG"
/// ```
///
/// Runtime `set`/`remove` calls change the in-memory table only; the next
/// [`reload`](Self::reload) replaces it with the file contents.
#[derive(Debug)]
pub struct FileTokenRepository {
    path: PathBuf,
    table: ArcSwap<HashMap<String, Severity>>,
}

impl FileTokenRepository {
    /// Load the token file. A missing file yields an empty table.
    pub fn open(path: &Path) -> Result<Self, RepositoryError> {
        let repo = Self {
            path: path.to_path_buf(),
            table: ArcSwap::from_pointee(HashMap::new()),
        };
        repo.reload()?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and atomically swap in the new table.
    /// On error the current table is kept. Returns the number of tokens loaded.
    pub fn reload(&self) -> Result<usize, RepositoryError> {
        let tokens = if self.path.exists() {
            let content = fs::read_to_string(&self.path).map_err(|source| RepositoryError::Io {
                path: self.path.clone(),
                source,
            })?;
            let file: TokenFile = toml::from_str(&content).map_err(|source| RepositoryError::Parse {
                path: self.path.clone(),
                source,
            })?;
            file.tokens
        } else {
            tracing::debug!(path = ?self.path, "Token file not found, starting with empty table");
            HashMap::new()
        };

        let count = tokens.len();
        self.table.store(Arc::new(tokens));
        tracing::info!(path = ?self.path, tokens = count, "Token table loaded");
        Ok(count)
    }
}

impl TokenRepository for FileTokenRepository {
    fn lookup(&self, key: &str) -> Option<Severity> {
        self.table.load().get(key).copied()
    }

    fn set(&self, key: &str, threshold: Severity) {
        self.table.rcu(|table| {
            let mut next = HashMap::clone(table);
            next.insert(key.to_string(), threshold);
            next
        });
    }

    fn remove(&self, key: &str) -> Option<Severity> {
        let mut removed = None;
        self.table.rcu(|table| {
            let mut next = HashMap::clone(table);
            removed = next.remove(key);
            next
        });
        removed
    }

    fn keys(&self) -> Vec<String> {
        self.table.load().keys().cloned().collect()
    }
}
