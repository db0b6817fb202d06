//! Ordered multi-list partition engine
//!
//! This crate keeps items distributed across named, ordered lists (kanban
//! columns, product/sprint backlogs) and applies drag-and-drop moves to them
//! optimistically while a remote authority confirms or rejects each move.
//!
//! ## Overview
//!
//! - **One engine per open view** - A [`MoveEngine`] exclusively owns its [`PartitionSet`]
//! - **Every item placed exactly once** - Moves are built so placement invariants always hold
//! - **Optimistic, with rollback** - Rejected moves are undone from a per-item snapshot
//! - **Last move wins** - An answer for a move superseded by a newer move of the same item
//!   is ignored
//! - **Pure aggregates** - Counts, story points, capacity and priority buckets derive from the set
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ordered_board::{
//!     BoardConfig, BoardLayout, BoardSession, MoveEngine, MoveIntent, OrderedItem,
//!     RecordingGateway,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = MoveEngine::with_items(
//!     BoardLayout::backlog("sprint-12"),
//!     [
//!         OrderedItem::new("login", "product").with_attribute("storyPoints", 5),
//!         OrderedItem::new("search", "sprint").with_attribute("storyPoints", 8),
//!     ],
//! )?;
//! let mut session = BoardSession::new(
//!     engine,
//!     Arc::new(RecordingGateway::new()),
//!     BoardConfig::load(None)?.with_planned_capacity(20.0),
//! );
//!
//! // Drag "login" to the top of the sprint backlog.
//! session.handle_gesture(&MoveIntent::across("login", ("product", 0), ("sprint", 0)));
//! println!("sprint points: {}", session.summary().partition("sprint").unwrap().points);
//!
//! // Apply the remote authority's answers as they arrive.
//! session.settle().await;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
mod config;
mod engine;
mod error;
pub mod layout;
pub mod logging;
mod partition;
mod partition_set;
mod session;
pub mod sync;
pub mod types;

pub use aggregate::{BoardSummary, Bucket, CapacityRatio, PartitionSummary};
pub use config::{BoardConfig, BucketSpec, ENV_PREFIX};
pub use engine::{
    EngineState, MoveEngine, MoveOutcome, PendingSync, PendingSyncSnapshot, Resolution,
};
pub use error::{BoardError, Result};
pub use layout::{BoardLayout, Discriminator, PartitionDef};
pub use partition::Partition;
pub use partition_set::{PartitionSet, Violation};
pub use session::{BoardEvent, BoardSession, GestureOutcome};
pub use sync::{PersistRequest, RecordingGateway, RejectReason, SyncGateway, SyncResult, SyncTicket};

// Re-export commonly used types
pub use types::{Attributes, ItemId, MoveIntent, OrderedItem, PartitionKey, Slot, SyncId};

// Re-export for gateway implementations
pub use async_trait::async_trait;
