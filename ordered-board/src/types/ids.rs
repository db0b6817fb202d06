//! Newtype identifiers for board entities.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Get the inner string value
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&$name> for $name {
            fn from(id: &$name) -> Self {
                id.clone()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Opaque item identifier, stable across moves.
    ///
    /// Items normally arrive from the server with their own ids; `new()` mints
    /// a ULID for items created locally.
    ItemId
);

string_id!(
    /// Stable partition name, e.g. `"sprint"` or `"in_progress"`.
    PartitionKey
);

impl ItemId {
    /// Generate a fresh ULID-based item id
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonically increasing identifier of one optimistic move awaiting
/// confirmation. Later moves always get larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncId(u64);

impl SyncId {
    /// The id before any move was made
    pub const ZERO: SyncId = SyncId(0);

    /// The id that follows this one
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Raw counter value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_new_is_ulid() {
        let id = ItemId::new();
        assert_eq!(id.as_str().len(), 26);
        assert_ne!(id, ItemId::new());
    }

    #[test]
    fn test_partition_key_serializes_transparently() {
        let key = PartitionKey::from("sprint");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"sprint\"");
    }

    #[test]
    fn test_sync_id_ordering() {
        let first = SyncId::ZERO.next();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.value(), 2);
        assert_eq!(second.to_string(), "#2");
    }
}
