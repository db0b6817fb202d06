//! Error types for the partition engine

use thiserror::Error;

/// Result type for board operations
pub type Result<T> = std::result::Result<T, BoardError>;

/// Errors that can occur in board operations.
///
/// None of these are meant to reach a renderer. The engine fails closed on
/// every variant below: the partition set is left exactly as it was.
#[derive(Debug, Error)]
pub enum BoardError {
    /// Partition key is not part of the board layout
    #[error("partition not found: {key}")]
    UnknownPartition { key: String },

    /// Item id does not resolve to a known item
    #[error("item not found: {id}")]
    UnknownItem { id: String },

    /// Item is not where the caller says it is
    #[error("item '{id}' is not in partition '{key}'")]
    ItemNotInPartition { key: String, id: String },

    /// Source index names no item
    #[error("no item at index {index} of partition '{key}'")]
    EmptySlot { key: String, index: usize },

    /// Item is already placed on the board
    #[error("duplicate item ID: {id}")]
    DuplicateItem { id: String },

    /// Layout declares the same partition twice, or none at all
    #[error("invalid layout: {message}")]
    InvalidLayout { message: String },

    /// Layout definition could not be parsed
    #[error("layout parse error: {0}")]
    Layout(#[from] serde_yaml_ng::Error),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BoardError {
    /// Create an unknown partition error
    pub fn unknown_partition(key: impl Into<String>) -> Self {
        Self::UnknownPartition { key: key.into() }
    }

    /// Create an unknown item error
    pub fn unknown_item(id: impl Into<String>) -> Self {
        Self::UnknownItem { id: id.into() }
    }

    /// Create an item-not-in-partition error
    pub fn not_in_partition(key: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ItemNotInPartition {
            key: key.into(),
            id: id.into(),
        }
    }

    /// Create an empty slot error
    pub fn empty_slot(key: impl Into<String>, index: usize) -> Self {
        Self::EmptySlot {
            key: key.into(),
            index,
        }
    }

    /// Create an invalid layout error
    pub fn invalid_layout(message: impl Into<String>) -> Self {
        Self::InvalidLayout {
            message: message.into(),
        }
    }

    /// Check if this error means the caller's view of the board disagrees
    /// with the engine's, i.e. a bug upstream rather than bad input.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::ItemNotInPartition { .. }
                | Self::UnknownItem { .. }
                | Self::DuplicateItem { .. }
                | Self::EmptySlot { .. }
        )
    }
}

impl From<figment::Error> for BoardError {
    fn from(error: figment::Error) -> Self {
        Self::Config(Box::new(error))
    }
}
