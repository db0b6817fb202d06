//! Core types for the partition engine

mod ids;
mod intent;
mod item;

// Re-export all types
pub use ids::{ItemId, PartitionKey, SyncId};
pub use intent::{MoveIntent, Slot};
pub use item::{Attributes, OrderedItem};
