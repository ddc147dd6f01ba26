//! Persistence boundary: load an agent's items at startup, save after
//! every ledger mutation and on the periodic backup timer.
//!
//! Save failures are non-fatal: the in-memory mutation stands, the
//! failure is logged by the caller, and the save is retried on the next
//! opportunity. Load failures are fatal at startup.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::PersistenceError;
use crate::ledger::Item;

/// Durable storage for an agent's item collection.
pub trait ItemStore: Send + Sync {
    fn load_items(&self) -> Result<Vec<Item>, PersistenceError>;
    fn save_items(&self, items: &[Item]) -> Result<(), PersistenceError>;
}

/// On-disk JSON document: `{"tasks": [...], "total_load": n}`.
#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    tasks: Vec<Item>,
    total_load: f64,
}

/// JSON file store, one file per agent.
#[derive(Debug, Clone)]
pub struct JsonItemStore {
    path: PathBuf,
}

impl JsonItemStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ItemStore for JsonItemStore {
    fn load_items(&self) -> Result<Vec<Item>, PersistenceError> {
        let content = std::fs::read_to_string(&self.path)?;
        let document: StoreDocument = serde_json::from_str(&content)?;
        Ok(document.tasks)
    }

    fn save_items(&self, items: &[Item]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let document = StoreDocument {
            tasks: items.to_vec(),
            total_load: items.iter().map(|item| item.magnitude).sum(),
        };
        let content = serde_json::to_string_pretty(&document)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral agents.
#[derive(Debug, Default)]
pub struct MemoryItemStore {
    items: Mutex<Vec<Item>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    /// The last saved snapshot.
    pub fn snapshot(&self) -> Vec<Item> {
        self.items.lock().clone()
    }
}

impl ItemStore for MemoryItemStore {
    fn load_items(&self) -> Result<Vec<Item>, PersistenceError> {
        Ok(self.items.lock().clone())
    }

    fn save_items(&self, items: &[Item]) -> Result<(), PersistenceError> {
        *self.items.lock() = items.to_vec();
        Ok(())
    }
}
