//! A single named, ordered list of item ids.

use crate::error::{BoardError, Result};
use crate::types::{ItemId, PartitionKey};
use serde::{Deserialize, Serialize};

/// An ordered sequence of item ids. Position in the sequence is the
/// on-screen rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub key: PartitionKey,
    sequence: Vec<ItemId>,
}

impl Partition {
    /// Create an empty partition
    pub fn new(key: impl Into<PartitionKey>) -> Self {
        Self {
            key: key.into(),
            sequence: Vec::new(),
        }
    }

    /// Ids in display order
    pub fn sequence(&self) -> &[ItemId] {
        &self.sequence
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Whether the partition holds no items
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Id at `index`
    pub fn get(&self, index: usize) -> Option<&ItemId> {
        self.sequence.get(index)
    }

    /// Index of `id`
    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.sequence.iter().position(|i| i == id)
    }

    /// Whether `id` is in this partition
    pub fn contains(&self, id: &ItemId) -> bool {
        self.sequence.contains(id)
    }

    /// Insert `id` at `index`, clamped to `[0, len]`. Returns the index the
    /// id actually landed at.
    pub fn insert(&mut self, index: usize, id: ItemId) -> usize {
        let index = index.min(self.sequence.len());
        self.sequence.insert(index, id);
        index
    }

    /// Remove `id`, returning the index it was at
    pub fn remove(&mut self, id: &ItemId) -> Result<usize> {
        let index = self
            .position(id)
            .ok_or_else(|| BoardError::not_in_partition(self.key.as_str(), id.as_str()))?;
        self.sequence.remove(index);
        Ok(index)
    }

    /// Remove whatever sits at `index`
    pub fn remove_at(&mut self, index: usize) -> Result<ItemId> {
        if index >= self.sequence.len() {
            return Err(BoardError::empty_slot(self.key.as_str(), index));
        }
        Ok(self.sequence.remove(index))
    }

    /// Reorder within this partition.
    ///
    /// `to` is read against the sequence after the item has been taken out,
    /// and clamped. `from == to` is a no-op.
    pub fn move_within(&mut self, from: usize, to: usize) -> Result<()> {
        if from == to {
            return Ok(());
        }
        let id = self.remove_at(from)?;
        self.insert(to, id);
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Partition {
    type Item = &'a ItemId;
    type IntoIter = std::slice::Iter<'a, ItemId>;

    fn into_iter(self) -> Self::IntoIter {
        self.sequence.iter()
    }
}
