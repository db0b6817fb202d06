//! All partitions of one view plus the item table they reference.

use crate::error::{BoardError, Result};
use crate::layout::BoardLayout;
use crate::partition::Partition;
use crate::types::{ItemId, OrderedItem, PartitionKey};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// A broken placement invariant, as reported by [`PartitionSet::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    /// An id is placed in more than one partition
    #[error("item '{id}' is placed in several partitions: {keys:?}")]
    PlacedTwice { id: ItemId, keys: Vec<PartitionKey> },

    /// An id appears more than once in one sequence
    #[error("item '{id}' appears more than once in '{key}'")]
    DuplicateInSequence { key: PartitionKey, id: ItemId },

    /// A sequence names an id with no item behind it
    #[error("partition '{key}' references unknown item '{id}'")]
    UnknownItem { key: PartitionKey, id: ItemId },

    /// An item is in the table but in no partition
    #[error("item '{id}' is not placed in any partition")]
    Orphan { id: ItemId },

    /// An item's cached partition key disagrees with where it is placed
    #[error("item '{id}' claims partition '{cached}' but is placed in '{actual}'")]
    StalePartitionKey {
        id: ItemId,
        cached: PartitionKey,
        actual: PartitionKey,
    },
}

/// The partitions of a view and the items placed in them.
///
/// Partition order follows the layout. Every item is placed exactly once;
/// [`validate`](Self::validate) checks that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionSet {
    partitions: IndexMap<PartitionKey, Partition>,
    items: IndexMap<ItemId, OrderedItem>,
}

impl PartitionSet {
    /// Create an empty set with the given partition keys, in order
    pub fn new<K: Into<PartitionKey>>(keys: impl IntoIterator<Item = K>) -> Self {
        let partitions = keys
            .into_iter()
            .map(|k| {
                let key = k.into();
                (key.clone(), Partition::new(key))
            })
            .collect();
        Self {
            partitions,
            items: IndexMap::new(),
        }
    }

    /// Create an empty set with the partitions of a layout
    pub fn from_layout(layout: &BoardLayout) -> Self {
        Self::new(layout.keys().cloned())
    }

    /// Add a server-provided item, placing it in the partition named by its
    /// `partition_key`. `index` defaults to the end and is clamped.
    pub fn add_item(&mut self, item: OrderedItem, index: Option<usize>) -> Result<usize> {
        if self.items.contains_key(&item.id) {
            return Err(BoardError::DuplicateItem {
                id: item.id.to_string(),
            });
        }
        let partition = self
            .partitions
            .get_mut(&item.partition_key)
            .ok_or_else(|| BoardError::unknown_partition(item.partition_key.as_str()))?;
        let at = partition.insert(index.unwrap_or(usize::MAX), item.id.clone());
        self.items.insert(item.id.clone(), item);
        Ok(at)
    }

    /// Builder form of [`add_item`](Self::add_item) that appends
    pub fn with_item(mut self, item: OrderedItem) -> Result<Self> {
        self.add_item(item, None)?;
        Ok(self)
    }

    /// Remove an item from its partition and from the item table
    pub fn remove_item(&mut self, id: &ItemId) -> Result<OrderedItem> {
        let item = self
            .items
            .get(id)
            .ok_or_else(|| BoardError::unknown_item(id.as_str()))?;
        let key = item.partition_key.clone();
        self.remove(&key, id)?;
        self.items
            .shift_remove(id)
            .ok_or_else(|| BoardError::unknown_item(id.as_str()))
    }

    /// Insert a known item into `key` at `index` (clamped) and update its
    /// cached partition key. The item must not currently be placed anywhere.
    pub fn insert(&mut self, key: &PartitionKey, index: usize, id: ItemId) -> Result<usize> {
        if !self.partitions.contains_key(key) {
            return Err(BoardError::unknown_partition(key.as_str()));
        }
        if self.locate(&id).is_some() {
            return Err(BoardError::DuplicateItem { id: id.to_string() });
        }
        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| BoardError::unknown_item(id.as_str()))?;
        item.partition_key = key.clone();

        let partition = self
            .partitions
            .get_mut(key)
            .ok_or_else(|| BoardError::unknown_partition(key.as_str()))?;
        Ok(partition.insert(index, id))
    }

    /// Remove `id` from the sequence of `key`, returning its former index
    pub fn remove(&mut self, key: &PartitionKey, id: &ItemId) -> Result<usize> {
        self.partitions
            .get_mut(key)
            .ok_or_else(|| BoardError::unknown_partition(key.as_str()))?
            .remove(id)
    }

    /// Reorder inside one partition. See [`Partition::move_within`].
    pub fn move_within(&mut self, key: &PartitionKey, from: usize, to: usize) -> Result<()> {
        self.partitions
            .get_mut(key)
            .ok_or_else(|| BoardError::unknown_partition(key.as_str()))?
            .move_within(from, to)
    }

    /// Look up a partition
    pub fn partition(&self, key: &PartitionKey) -> Option<&Partition> {
        self.partitions.get(key)
    }

    pub(crate) fn partition_mut(&mut self, key: &PartitionKey) -> Option<&mut Partition> {
        self.partitions.get_mut(key)
    }

    /// Ids of one partition in display order
    pub fn sequence(&self, key: &PartitionKey) -> Option<&[ItemId]> {
        self.partitions.get(key).map(|p| p.sequence())
    }

    /// All partitions in layout order
    pub fn partitions(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.values()
    }

    /// Partition keys in layout order
    pub fn keys(&self) -> impl Iterator<Item = &PartitionKey> {
        self.partitions.keys()
    }

    /// Whether `key` is a partition of this set
    pub fn has_partition(&self, key: &PartitionKey) -> bool {
        self.partitions.contains_key(key)
    }

    /// Look up an item
    pub fn item(&self, id: &ItemId) -> Option<&OrderedItem> {
        self.items.get(id)
    }

    pub(crate) fn item_mut(&mut self, id: &ItemId) -> Option<&mut OrderedItem> {
        self.items.get_mut(id)
    }

    /// All items, in the order they were added
    pub fn items(&self) -> impl Iterator<Item = &OrderedItem> {
        self.items.values()
    }

    /// Number of items on the board
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Items of one partition in display order. Unknown keys yield nothing.
    pub fn items_in<'a>(
        &'a self,
        key: &PartitionKey,
    ) -> impl Iterator<Item = &'a OrderedItem> + 'a {
        self.partitions
            .get(key)
            .into_iter()
            .flat_map(|p| p.sequence().iter())
            .filter_map(move |id| self.items.get(id))
    }

    /// Where an item is placed, from the partition sequences rather than
    /// the cached key
    pub fn locate(&self, id: &ItemId) -> Option<(PartitionKey, usize)> {
        self.partitions
            .values()
            .find_map(|p| p.position(id).map(|i| (p.key.clone(), i)))
    }

    /// Check every placement invariant. Returns an empty list when the set
    /// is consistent.
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut placed: HashMap<&ItemId, Vec<PartitionKey>> = HashMap::new();

        for partition in self.partitions.values() {
            let mut seen = std::collections::HashSet::new();
            for id in partition {
                if !seen.insert(id) {
                    violations.push(Violation::DuplicateInSequence {
                        key: partition.key.clone(),
                        id: id.clone(),
                    });
                    continue;
                }
                if !self.items.contains_key(id) {
                    violations.push(Violation::UnknownItem {
                        key: partition.key.clone(),
                        id: id.clone(),
                    });
                }
                placed.entry(id).or_default().push(partition.key.clone());
            }
        }

        for (id, keys) in &placed {
            if keys.len() > 1 {
                violations.push(Violation::PlacedTwice {
                    id: (*id).clone(),
                    keys: keys.clone(),
                });
            }
        }

        for item in self.items.values() {
            match placed.get(&item.id) {
                None => violations.push(Violation::Orphan {
                    id: item.id.clone(),
                }),
                Some(keys) if keys.len() == 1 && keys[0] != item.partition_key => {
                    violations.push(Violation::StalePartitionKey {
                        id: item.id.clone(),
                        cached: item.partition_key.clone(),
                        actual: keys[0].clone(),
                    })
                }
                Some(_) => {}
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> PartitionSet {
        let mut set = PartitionSet::new(["product", "sprint"]);
        for (id, key) in [("a", "product"), ("b", "product"), ("c", "sprint")] {
            set.add_item(OrderedItem::new(id, key), None).unwrap();
        }
        set
    }

    fn ids(set: &PartitionSet, key: &str) -> Vec<String> {
        set.sequence(&key.into())
            .unwrap()
            .iter()
            .map(|i| i.to_string())
            .collect()
    }

    #[test]
    fn test_add_item_places_in_its_partition() {
        let set = board();
        assert_eq!(ids(&set, "product"), vec!["a", "b"]);
        assert_eq!(ids(&set, "sprint"), vec!["c"]);
        assert!(set.validate().is_empty());
    }

    #[test]
    fn test_add_item_at_index() {
        let mut set = board();
        let at = set
            .add_item(OrderedItem::new("d", "product"), Some(0))
            .unwrap();
        assert_eq!(at, 0);
        assert_eq!(ids(&set, "product"), vec!["d", "a", "b"]);
    }

    #[test]
    fn test_add_duplicate_item() {
        let mut set = board();
        let result = set.add_item(OrderedItem::new("a", "sprint"), None);
        assert!(matches!(result, Err(BoardError::DuplicateItem { .. })));
        assert!(set.validate().is_empty());
    }

    #[test]
    fn test_add_item_unknown_partition() {
        let mut set = board();
        let result = set.add_item(OrderedItem::new("z", "archive"), None);
        assert!(matches!(result, Err(BoardError::UnknownPartition { .. })));
        assert!(set.item(&"z".into()).is_none());
    }

    #[test]
    fn test_remove_item() {
        let mut set = board();
        let removed = set.remove_item(&"a".into()).unwrap();
        assert_eq!(removed.id.as_str(), "a");
        assert_eq!(ids(&set, "product"), vec!["b"]);
        assert!(set.validate().is_empty());
    }

    #[test]
    fn test_insert_rejects_already_placed_item() {
        let mut set = board();
        let result = set.insert(&"sprint".into(), 0, "a".into());
        assert!(matches!(result, Err(BoardError::DuplicateItem { .. })));
    }

    #[test]
    fn test_remove_then_insert_updates_cached_key() {
        let mut set = board();
        set.remove(&"product".into(), &"a".into()).unwrap();
        set.insert(&"sprint".into(), 10, "a".into()).unwrap();

        assert_eq!(ids(&set, "sprint"), vec!["c", "a"]);
        assert_eq!(set.item(&"a".into()).unwrap().partition_key.as_str(), "sprint");
        assert!(set.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_orphan() {
        let mut set = board();
        set.remove(&"product".into(), &"b".into()).unwrap();
        assert_eq!(
            set.validate(),
            vec![Violation::Orphan { id: "b".into() }]
        );
    }

    #[test]
    fn test_validate_reports_duplicates_and_unknown_ids() {
        let mut set = board();
        let sprint = set.partition_mut(&"sprint".into()).unwrap();
        sprint.insert(0, "a".into());
        sprint.insert(0, "ghost".into());
        let product = set.partition_mut(&"product".into()).unwrap();
        product.insert(0, "b".into());

        let violations = set.validate();
        assert!(violations.contains(&Violation::PlacedTwice {
            id: "a".into(),
            keys: vec!["product".into(), "sprint".into()],
        }));
        assert!(violations.contains(&Violation::UnknownItem {
            key: "sprint".into(),
            id: "ghost".into(),
        }));
        assert!(violations.contains(&Violation::DuplicateInSequence {
            key: "product".into(),
            id: "b".into(),
        }));
    }

    #[test]
    fn test_validate_reports_stale_partition_key() {
        let mut set = board();
        set.item_mut(&"c".into()).unwrap().partition_key = "product".into();
        assert_eq!(
            set.validate(),
            vec![Violation::StalePartitionKey {
                id: "c".into(),
                cached: "product".into(),
                actual: "sprint".into(),
            }]
        );
    }

    #[test]
    fn test_items_in_follows_sequence_order() {
        let mut set = board();
        set.move_within(&"product".into(), 0, 1).unwrap();
        let order: Vec<&str> = set
            .items_in(&"product".into())
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(set.items_in(&"archive".into()).count(), 0);
    }

    #[test]
    fn test_locate() {
        let set = board();
        assert_eq!(set.locate(&"b".into()), Some(("product".into(), 1)));
        assert_eq!(set.locate(&"nope".into()), None);
    }

    #[test]
    fn test_from_layout_keeps_layout_order() {
        let set = PartitionSet::from_layout(&BoardLayout::kanban());
        let keys: Vec<&str> = set.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["backlog", "todo", "in_progress", "review", "completed"]);
    }
}
