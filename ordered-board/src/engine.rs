//! The move engine: applies drag-drop gestures optimistically and settles
//! them once the remote authority answers.
//!
//! ## Protocol
//!
//! 1. [`MoveEngine::apply_move`] validates the gesture, snapshots the
//!    partition set, mutates it and returns a [`PendingSync`] holding the
//!    request to persist.
//! 2. The caller sends the request through a
//!    [`SyncGateway`](crate::sync::SyncGateway) without waiting on it.
//! 3. [`MoveEngine::resolve`] is fed the answer. A confirmation drops the
//!    snapshot; a rejection rolls the item back.
//!
//! At most one snapshot is kept per item. A second move of the same item
//! replaces the first one's snapshot, and the first move's answer is then
//! ignored whatever it says, so a stale rejection can never undo a newer
//! move.

use crate::error::{BoardError, Result};
use crate::layout::BoardLayout;
use crate::partition_set::PartitionSet;
use crate::sync::{PersistRequest, RejectReason, SyncResult, SyncTicket};
use crate::types::{Attributes, ItemId, MoveIntent, OrderedItem, PartitionKey, SyncId};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error, info, trace, warn};

/// Whether any moves are waiting on the remote authority.
///
/// Dragging and rolling back happen inside a single call and are never
/// observed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Resolving { outstanding: usize },
}

/// Copy of the partition set taken just before a move was applied
#[derive(Debug, Clone)]
pub struct PendingSyncSnapshot {
    pub sync_id: SyncId,
    pub intent: MoveIntent,
    pub before: PartitionSet,
    /// Attributes the move changed through discriminator bindings
    pub derived_changes: Attributes,
    /// Engine revision right after the move; equal to the current revision
    /// when nothing else has touched the board since
    revision: u64,
}

/// A move applied locally that still needs to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSync {
    pub ticket: SyncTicket,
    pub request: PersistRequest,
}

/// Result of [`MoveEngine::apply_move`]
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Dropped where it was picked up: nothing changed, nothing to persist
    NoOp,
    Applied(PendingSync),
}

/// What [`MoveEngine::resolve`] did with an answer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum Resolution {
    /// The optimistic state is now the durable state
    Confirmed { item_id: ItemId, sync_id: SyncId },
    /// The move was undone
    RolledBack {
        item_id: ItemId,
        sync_id: SyncId,
        reason: RejectReason,
    },
    /// A newer move of the same item owns the outcome; this answer was
    /// ignored
    Superseded { item_id: ItemId, sync_id: SyncId },
}

/// Owns the partition set of one view and every mutation to it
#[derive(Debug)]
pub struct MoveEngine {
    layout: BoardLayout,
    set: PartitionSet,
    pending: HashMap<ItemId, PendingSyncSnapshot>,
    last_sync: SyncId,
    revision: u64,
}

impl MoveEngine {
    /// Create an engine over an empty board with the given layout
    pub fn new(layout: BoardLayout) -> Self {
        let set = PartitionSet::from_layout(&layout);
        Self {
            layout,
            set,
            pending: HashMap::new(),
            last_sync: SyncId::ZERO,
            revision: 0,
        }
    }

    /// Create an engine and load server-provided items, appended in order
    pub fn with_items(
        layout: BoardLayout,
        items: impl IntoIterator<Item = OrderedItem>,
    ) -> Result<Self> {
        let mut engine = Self::new(layout);
        for item in items {
            engine.add_item(item, None)?;
        }
        Ok(engine)
    }

    /// Read-only view of the board
    pub fn partitions(&self) -> &PartitionSet {
        &self.set
    }

    /// The layout this engine was built with
    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    /// Current protocol state
    pub fn state(&self) -> EngineState {
        if self.pending.is_empty() {
            EngineState::Idle
        } else {
            EngineState::Resolving {
                outstanding: self.pending.len(),
            }
        }
    }

    /// Number of moves awaiting an answer
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether `id` has a move awaiting an answer
    pub fn is_pending(&self, id: &ItemId) -> bool {
        self.pending.contains_key(id)
    }

    /// The retained snapshot for an item, if one is outstanding
    pub fn pending_snapshot(&self, id: &ItemId) -> Option<&PendingSyncSnapshot> {
        self.pending.get(id)
    }

    /// Counter bumped by every mutation of the board
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a gesture optimistically.
    ///
    /// Fails closed: on error the board is exactly as it was.
    pub fn apply_move(&mut self, intent: &MoveIntent) -> Result<MoveOutcome> {
        if intent.is_noop() {
            trace!(item_id = %intent.item_id, "dropped in place");
            return Ok(MoveOutcome::NoOp);
        }

        let intent = self.normalize(intent).inspect_err(|e| {
            error!(
                item_id = %intent.item_id,
                source = %intent.source_key,
                dest = %intent.dest_key,
                error = %e,
                "rejecting move"
            );
        })?;
        if intent.is_noop() {
            trace!(item_id = %intent.item_id, "dropped in place");
            return Ok(MoveOutcome::NoOp);
        }

        let before = self.set.clone();
        let (new_index, derived_changes) = match self.mutate(&intent) {
            Ok(applied) => applied,
            Err(e) => {
                error!(item_id = %intent.item_id, error = %e, "move failed midway, restoring");
                self.set = before;
                return Err(e);
            }
        };
        debug_assert!(
            self.set.validate().is_empty(),
            "move broke placement invariants: {:?}",
            self.set.validate()
        );

        self.revision += 1;
        self.last_sync = self.last_sync.next();
        let sync_id = self.last_sync;

        let snapshot = PendingSyncSnapshot {
            sync_id,
            intent: intent.clone(),
            before,
            derived_changes: derived_changes.clone(),
            revision: self.revision,
        };
        if let Some(old) = self.pending.insert(intent.item_id.clone(), snapshot) {
            debug!(
                item_id = %intent.item_id,
                superseded = %old.sync_id,
                by = %sync_id,
                "newer move supersedes pending move"
            );
        }

        debug!(
            item_id = %intent.item_id,
            %sync_id,
            from = %intent.source_key,
            to = %intent.dest_key,
            index = new_index,
            "applied move"
        );

        Ok(MoveOutcome::Applied(PendingSync {
            ticket: SyncTicket {
                sync_id,
                item_id: intent.item_id.clone(),
            },
            request: PersistRequest {
                item_id: intent.item_id.clone(),
                new_partition_key: intent.dest_key.clone(),
                new_index,
                derived_attribute_changes: derived_changes,
            },
        }))
    }

    /// Settle a pending move with the remote authority's answer
    pub fn resolve(&mut self, ticket: &SyncTicket, result: SyncResult) -> Resolution {
        let snapshot = match self.pending.remove(&ticket.item_id) {
            Some(s) if s.sync_id == ticket.sync_id => s,
            other => {
                if let Some(newer) = other {
                    self.pending.insert(ticket.item_id.clone(), newer);
                }
                warn!(
                    item_id = %ticket.item_id,
                    sync_id = %ticket.sync_id,
                    confirmed = result.is_confirmed(),
                    "ignoring answer for superseded move"
                );
                return Resolution::Superseded {
                    item_id: ticket.item_id.clone(),
                    sync_id: ticket.sync_id,
                };
            }
        };

        match result {
            SyncResult::Confirmed { canonical } => {
                if let Some(canonical) = canonical {
                    self.merge_canonical(&ticket.item_id, canonical);
                }
                debug!(item_id = %ticket.item_id, sync_id = %ticket.sync_id, "move confirmed");
                Resolution::Confirmed {
                    item_id: ticket.item_id.clone(),
                    sync_id: ticket.sync_id,
                }
            }
            SyncResult::Rejected { reason } => {
                info!(
                    item_id = %ticket.item_id,
                    sync_id = %ticket.sync_id,
                    %reason,
                    "move rejected, rolling back"
                );
                self.roll_back(snapshot);
                Resolution::RolledBack {
                    item_id: ticket.item_id.clone(),
                    sync_id: ticket.sync_id,
                    reason,
                }
            }
        }
    }

    /// Add a server-provided item. Its discriminator attribute is aligned
    /// with the partition it lands in.
    pub fn add_item(&mut self, mut item: OrderedItem, index: Option<usize>) -> Result<usize> {
        if let Some(disc) = self.layout.discriminator(&item.partition_key) {
            disc.apply(&mut item.attributes);
        }
        let id = item.id.clone();
        let at = self.set.add_item(item, index)?;
        self.revision += 1;
        trace!(item_id = %id, index = at, "added item");
        Ok(at)
    }

    /// Remove an item deleted elsewhere. Any pending move for it is dropped,
    /// so a late answer for that move will be ignored.
    pub fn remove_item(&mut self, id: &ItemId) -> Result<OrderedItem> {
        let item = self.set.remove_item(id)?;
        if let Some(dropped) = self.pending.remove(id) {
            debug!(
                item_id = %id,
                sync_id = %dropped.sync_id,
                "dropping pending move of removed item"
            );
        }
        self.revision += 1;
        Ok(item)
    }

    /// Merge an external attribute edit into an item.
    ///
    /// Discriminator attributes follow placement, so they are re-derived
    /// after the merge.
    pub fn update_attributes(&mut self, id: &ItemId, attributes: Attributes) -> Result<()> {
        let key = self
            .set
            .item(id)
            .map(|i| i.partition_key.clone())
            .ok_or_else(|| BoardError::unknown_item(id.as_str()))?;
        let discriminator = self.layout.discriminator(&key).cloned();
        let item = self
            .set
            .item_mut(id)
            .ok_or_else(|| BoardError::unknown_item(id.as_str()))?;
        item.attributes.extend(attributes);
        if let Some(disc) = discriminator {
            disc.apply(&mut item.attributes);
        }
        self.revision += 1;
        Ok(())
    }

    /// Check the intent against the board and pin down the real source index.
    ///
    /// A stale source index is tolerated as long as the item really is in
    /// the source partition; its actual position wins.
    fn normalize(&self, intent: &MoveIntent) -> Result<MoveIntent> {
        for key in [&intent.source_key, &intent.dest_key] {
            if !self.set.has_partition(key) {
                return Err(BoardError::unknown_partition(key.as_str()));
            }
        }
        if self.set.item(&intent.item_id).is_none() {
            return Err(BoardError::unknown_item(intent.item_id.as_str()));
        }

        let source = self
            .set
            .partition(&intent.source_key)
            .ok_or_else(|| BoardError::unknown_partition(intent.source_key.as_str()))?;
        if source.get(intent.source_index) == Some(&intent.item_id) {
            return Ok(intent.clone());
        }

        let actual = source.position(&intent.item_id).ok_or_else(|| {
            BoardError::not_in_partition(intent.source_key.as_str(), intent.item_id.as_str())
        })?;
        warn!(
            item_id = %intent.item_id,
            reported = intent.source_index,
            actual,
            "stale source index"
        );
        let mut fixed = intent.clone();
        fixed.source_index = actual;
        Ok(fixed)
    }

    /// Apply a validated intent. Returns the landing index and the
    /// attributes changed through the destination's discriminator.
    fn mutate(&mut self, intent: &MoveIntent) -> Result<(usize, Attributes)> {
        let source = self
            .set
            .partition_mut(&intent.source_key)
            .ok_or_else(|| BoardError::unknown_partition(intent.source_key.as_str()))?;
        let id = source.remove_at(intent.source_index)?;

        if !intent.is_cross_partition() {
            let at = source.insert(intent.dest_index, id);
            return Ok((at, Attributes::new()));
        }

        let dest = self
            .set
            .partition_mut(&intent.dest_key)
            .ok_or_else(|| BoardError::unknown_partition(intent.dest_key.as_str()))?;
        let at = dest.insert(intent.dest_index, id);

        let discriminator = self.layout.discriminator(&intent.dest_key).cloned();
        let item = self
            .set
            .item_mut(&intent.item_id)
            .ok_or_else(|| BoardError::unknown_item(intent.item_id.as_str()))?;
        item.partition_key = intent.dest_key.clone();

        let mut changes = Attributes::new();
        if let Some((name, value)) = discriminator.and_then(|d| d.apply(&mut item.attributes)) {
            changes.insert(name, value);
        }
        Ok((at, changes))
    }

    fn merge_canonical(&mut self, id: &ItemId, canonical: Attributes) {
        let Some(key) = self.set.item(id).map(|i| i.partition_key.clone()) else {
            return;
        };
        let discriminator = self.layout.discriminator(&key).cloned();
        if let Some(item) = self.set.item_mut(id) {
            item.attributes.extend(canonical);
            if let Some(disc) = discriminator {
                if let Some((name, _)) = disc.apply(&mut item.attributes) {
                    warn!(
                        item_id = %id,
                        attribute = %name,
                        "canonical item disagreed with placement"
                    );
                }
            }
            self.revision += 1;
        }
    }

    /// Undo one move. Restores the whole snapshot when nothing else changed
    /// since; otherwise puts back only this item so later moves of other
    /// items survive.
    fn roll_back(&mut self, snapshot: PendingSyncSnapshot) {
        let id = snapshot.intent.item_id.clone();
        if snapshot.revision == self.revision {
            self.set = snapshot.before;
        } else if let Err(e) = self.restore_item(&id, &snapshot) {
            error!(item_id = %id, error = %e, "rollback failed, keeping current placement");
            return;
        }
        self.revision += 1;
        debug_assert!(
            self.set.validate().is_empty(),
            "rollback broke placement invariants: {:?}",
            self.set.validate()
        );
    }

    fn restore_item(&mut self, id: &ItemId, snapshot: &PendingSyncSnapshot) -> Result<()> {
        let (prior_key, prior_index): (PartitionKey, usize) = snapshot
            .before
            .locate(id)
            .ok_or_else(|| BoardError::unknown_item(id.as_str()))?;
        let (current_key, _) = self
            .set
            .locate(id)
            .ok_or_else(|| BoardError::unknown_item(id.as_str()))?;
        let prior_attributes = snapshot
            .before
            .item(id)
            .map(|i| i.attributes.clone())
            .unwrap_or_default();

        self.set.remove(&current_key, id)?;
        if let Err(e) = self.set.insert(&prior_key, prior_index, id.clone()) {
            // Put it back where it was so nothing is orphaned.
            self.set.insert(&current_key, usize::MAX, id.clone())?;
            return Err(e);
        }

        if let Some(item) = self.set.item_mut(id) {
            for name in snapshot.derived_changes.keys() {
                match prior_attributes.get(name) {
                    Some(value) => {
                        item.attributes.insert(name.clone(), value.clone());
                    }
                    None => {
                        item.attributes.remove(name);
                    }
                }
            }
        }
        Ok(())
    }
}
