//! nlframe past-action store
//!
//! Persists the parameter values a user settled on so later sessions can offer
//! them again. The store is a flat key → value map written as pretty JSON:
//!
//! ```text
//! {
//!   "inplace":    { "value": true,  "updated_at": "2026-10-18T09:12:00Z" },
//!   "subset_col": { "value": "price", "updated_at": "2026-10-18T09:14:31Z" }
//! }
//! ```
//!
//! The engine only reads it through `nlframe_codegen::PastActions`; writes
//! (`save`, `delete`, `reset`) belong to the host.

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use nlframe_codegen::PastActions;
use nlframe_dsl::Literal;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot access past-action store `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt past-action store `{path}`: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file holding the remembered values.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./past_actions.json"),
        }
    }
}

impl StoreConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

// ============================================================================
// Store
// ============================================================================

/// One remembered value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAction {
    pub value: Literal,
    pub updated_at: DateTime<Utc>,
}

pub struct PastActionStore {
    config: StoreConfig,
    entries: RwLock<BTreeMap<String, StoredAction>>,
}

impl PastActionStore {
    /// Open the store at `config.path`. A missing file is an empty store.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let entries = if config.path.exists() {
            let contents = std::fs::read_to_string(&config.path).map_err(|source| StoreError::Io {
                path: config.path.clone(),
                source,
            })?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents).map_err(|source| StoreError::Json {
                    path: config.path.clone(),
                    source,
                })?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %config.path.display(), entries = entries.len(), "opened past-action store");

        Ok(Self {
            config,
            entries: RwLock::new(entries),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Remember every item, replacing earlier values, and persist.
    pub fn save<I, K>(&self, items: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = (K, Literal)>,
        K: Into<String>,
    {
        let now = Utc::now();
        {
            let mut entries = self.entries.write();
            for (key, value) in items {
                entries.insert(
                    key.into(),
                    StoredAction {
                        value,
                        updated_at: now,
                    },
                );
            }
        }
        self.persist()
    }

    pub fn load(&self, key: &str) -> Option<Literal> {
        self.entries.read().get(key).map(|e| e.value.clone())
    }

    /// Forget `key`. Returns whether it was present.
    pub fn delete(&self, key: &str) -> StoreResult<bool> {
        let removed = self.entries.write().remove(key).is_some();
        if removed {
            self.persist()?;
        } else {
            tracing::debug!(key, "delete of unknown past action");
        }
        Ok(removed)
    }

    /// Forget everything.
    pub fn reset(&self) -> StoreResult<()> {
        self.entries.write().clear();
        self.persist()
    }

    pub fn entries(&self) -> BTreeMap<String, StoredAction> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn persist(&self) -> StoreResult<()> {
        let json = {
            let entries = self.entries.read();
            serde_json::to_string_pretty(&*entries).map_err(|source| StoreError::Json {
                path: self.config.path.clone(),
                source,
            })?
        };

        let io = |source| StoreError::Io {
            path: self.config.path.clone(),
            source,
        };
        if let Some(parent) = self.config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        std::fs::write(&self.config.path, json).map_err(io)
    }
}

impl PastActions for PastActionStore {
    fn recall(&self, key: &str) -> Option<Literal> {
        self.load(key)
    }
}
