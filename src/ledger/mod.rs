//! Item ledger: an agent's local collection of work items plus the
//! derived aggregate load.
//!
//! The cached aggregate is recomputed from scratch after every mutation,
//! never incrementally adjusted, so it cannot drift from the true sum.
//! No internal locking: all mutation happens inside the owning agent's
//! single mutation domain.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::LedgerError;

/// A discrete unit of load. Immutable once created; ownership moves
/// between ledgers through the transfer protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    /// Human-readable label, carried through transfers and persistence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Weight or time cost; non-negative.
    pub magnitude: f64,
    /// Capability tags an owner must possess. Empty means anyone may
    /// hold the item.
    #[serde(default, skip_serializing_if = "HashSet::is_empty")]
    pub requires: HashSet<String>,
}

impl Item {
    /// Create an unconstrained item with a fresh id.
    pub fn new(magnitude: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: None,
            magnitude,
            requires: HashSet::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_requirement(mut self, tag: impl Into<String>) -> Self {
        self.requires.insert(tag.into());
        self
    }

    /// Whether the item may be held by an owner with the given
    /// capability set (requirement is a subset of the capabilities).
    pub fn compatible_with(&self, capabilities: &HashSet<String>) -> bool {
        self.requires.is_subset(capabilities)
    }
}

/// An agent's owned item collection with its cached aggregate load.
#[derive(Debug, Clone, Default)]
pub struct ItemLedger {
    items: Vec<Item>,
    total_load: f64,
}

impl ItemLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<Item>) -> Self {
        let mut ledger = Self {
            items,
            total_load: 0.0,
        };
        ledger.recompute();
        ledger
    }

    /// Aggregate magnitude of all items. Cached; always equal to the
    /// true sum.
    pub fn total_load(&self) -> f64 {
        self.total_load
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Read view of the owned items.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Add an item and recompute the aggregate.
    pub fn add(&mut self, item: Item) {
        self.items.push(item);
        self.recompute();
    }

    /// Remove the item with the given id and recompute the aggregate.
    ///
    /// Fails with [`LedgerError::ItemNotFound`] when absent; removal
    /// must never silently no-op.
    pub fn remove(&mut self, item_id: &Uuid) -> Result<Item, LedgerError> {
        let position = self
            .items
            .iter()
            .position(|item| item.id == *item_id)
            .ok_or(LedgerError::ItemNotFound { item_id: *item_id })?;
        let item = self.items.remove(position);
        self.recompute();
        Ok(item)
    }

    fn recompute(&mut self) {
        self.total_load = self.items.iter().map(|item| item.magnitude).sum();
    }
}
