//! Move intents: one per drag-and-drop gesture.

use super::ids::{ItemId, PartitionKey};
use serde::{Deserialize, Serialize};

/// Where an item sits: partition plus zero-based index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub key: PartitionKey,
    pub index: usize,
}

impl Slot {
    /// Create a slot
    pub fn new(key: impl Into<PartitionKey>, index: usize) -> Self {
        Self {
            key: key.into(),
            index,
        }
    }
}

/// The outcome of a drag gesture as reported by the drag-and-drop layer.
///
/// `dest_index` is read against the destination sequence with the item
/// already removed, which is what drag libraries report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveIntent {
    pub item_id: ItemId,
    pub source_key: PartitionKey,
    pub source_index: usize,
    pub dest_key: PartitionKey,
    pub dest_index: usize,
}

impl MoveIntent {
    /// Create an intent from explicit source and destination slots
    pub fn new(item_id: impl Into<ItemId>, source: Slot, dest: Slot) -> Self {
        Self {
            item_id: item_id.into(),
            source_key: source.key,
            source_index: source.index,
            dest_key: dest.key,
            dest_index: dest.index,
        }
    }

    /// Reorder inside a single partition
    pub fn within(
        item_id: impl Into<ItemId>,
        key: impl Into<PartitionKey>,
        from: usize,
        to: usize,
    ) -> Self {
        let key = key.into();
        Self {
            item_id: item_id.into(),
            source_key: key.clone(),
            source_index: from,
            dest_key: key,
            dest_index: to,
        }
    }

    /// Move across partitions
    pub fn across(
        item_id: impl Into<ItemId>,
        from: (impl Into<PartitionKey>, usize),
        to: (impl Into<PartitionKey>, usize),
    ) -> Self {
        Self::new(item_id, Slot::new(from.0, from.1), Slot::new(to.0, to.1))
    }

    /// Source slot
    pub fn source(&self) -> Slot {
        Slot::new(self.source_key.clone(), self.source_index)
    }

    /// Destination slot
    pub fn dest(&self) -> Slot {
        Slot::new(self.dest_key.clone(), self.dest_index)
    }

    /// True when the item is dropped back where it was picked up
    pub fn is_noop(&self) -> bool {
        self.source_key == self.dest_key && self.source_index == self.dest_index
    }

    /// True when the item changes partition
    pub fn is_cross_partition(&self) -> bool {
        self.source_key != self.dest_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_detection() {
        assert!(MoveIntent::within("a", "todo", 1, 1).is_noop());
        assert!(!MoveIntent::within("a", "todo", 1, 2).is_noop());
        assert!(!MoveIntent::across("a", ("todo", 1), ("review", 1)).is_noop());
    }

    #[test]
    fn test_cross_partition() {
        let intent = MoveIntent::across("a", ("product", 0), ("sprint", 3));
        assert!(intent.is_cross_partition());
        assert_eq!(intent.dest(), Slot::new("sprint", 3));
        assert_eq!(intent.source(), Slot::new("product", 0));
    }
}
