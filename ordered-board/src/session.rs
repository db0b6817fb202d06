//! Event-loop adapter binding a [`MoveEngine`] to a [`SyncGateway`].
//!
//! A session owns the engine of one open view. Gestures are applied
//! synchronously and the persist call is spawned in the background; its
//! answer comes back over a channel and is applied when the owner polls
//! [`BoardSession::next_resolution`] or [`BoardSession::drain_resolutions`].
//! Answers are applied in arrival order, which may differ from gesture
//! order; the engine's per-item sync ids sort that out.

use crate::aggregate::BoardSummary;
use crate::config::BoardConfig;
use crate::engine::{EngineState, MoveEngine, MoveOutcome, PendingSync, Resolution};
use crate::error::Result;
use crate::partition_set::PartitionSet;
use crate::sync::{RejectReason, SyncGateway, SyncResult, SyncTicket};
use crate::types::{Attributes, ItemId, MoveIntent, OrderedItem, SyncId};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, warn};

/// Change notification for subscribers such as a reactive UI layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BoardEvent {
    Moved { item_id: ItemId, sync_id: SyncId },
    Confirmed { item_id: ItemId, sync_id: SyncId },
    /// The user should be told their move did not stick
    RolledBack {
        item_id: ItemId,
        sync_id: SyncId,
        reason: RejectReason,
    },
    Superseded { item_id: ItemId, sync_id: SyncId },
    ItemAdded { item_id: ItemId },
    ItemRemoved { item_id: ItemId },
}

impl From<&Resolution> for BoardEvent {
    fn from(resolution: &Resolution) -> Self {
        match resolution.clone() {
            Resolution::Confirmed { item_id, sync_id } => Self::Confirmed { item_id, sync_id },
            Resolution::RolledBack {
                item_id,
                sync_id,
                reason,
            } => Self::RolledBack {
                item_id,
                sync_id,
                reason,
            },
            Resolution::Superseded { item_id, sync_id } => Self::Superseded { item_id, sync_id },
        }
    }
}

/// What happened to a gesture
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// Dropped in place; nothing sent
    NoOp,
    /// Applied locally, persist in flight
    Applied(SyncTicket),
    /// The gesture disagreed with the board and was dropped. The board is
    /// unchanged; the reason has been logged.
    Ignored { reason: String },
}

/// One open board view
pub struct BoardSession {
    engine: MoveEngine,
    gateway: Arc<dyn SyncGateway>,
    config: BoardConfig,
    summary: BoardSummary,
    results_tx: mpsc::UnboundedSender<(SyncTicket, SyncResult)>,
    results_rx: mpsc::UnboundedReceiver<(SyncTicket, SyncResult)>,
    in_flight: usize,
    events: broadcast::Sender<BoardEvent>,
}

impl BoardSession {
    /// Create a session around an engine
    pub fn new(engine: MoveEngine, gateway: Arc<dyn SyncGateway>, config: BoardConfig) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let summary = BoardSummary::compute(engine.partitions(), &config);
        Self {
            engine,
            gateway,
            config,
            summary,
            results_tx,
            results_rx,
            in_flight: 0,
            events,
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    /// The board as it should be rendered now
    pub fn view(&self) -> &PartitionSet {
        self.engine.partitions()
    }

    /// Aggregates for the current board
    pub fn summary(&self) -> &BoardSummary {
        &self.summary
    }

    /// The underlying engine
    pub fn engine(&self) -> &MoveEngine {
        &self.engine
    }

    /// Session configuration
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Engine protocol state
    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    /// Persist calls whose answers have not been applied yet, superseded
    /// ones included
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Handle the end of a drag gesture.
    ///
    /// Never blocks on the network. Must be called from within a tokio
    /// runtime, since the persist call is spawned.
    pub fn handle_gesture(&mut self, intent: &MoveIntent) -> GestureOutcome {
        match self.engine.apply_move(intent) {
            Ok(MoveOutcome::NoOp) => GestureOutcome::NoOp,
            Ok(MoveOutcome::Applied(pending)) => {
                let ticket = pending.ticket.clone();
                self.refresh();
                self.emit(BoardEvent::Moved {
                    item_id: ticket.item_id.clone(),
                    sync_id: ticket.sync_id,
                });
                self.spawn_persist(pending);
                GestureOutcome::Applied(ticket)
            }
            Err(e) => {
                debug!(item_id = %intent.item_id, error = %e, "gesture ignored");
                GestureOutcome::Ignored {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Wait for the next persist answer and apply it. Returns `None` when
    /// nothing is in flight.
    pub async fn next_resolution(&mut self) -> Option<Resolution> {
        if self.in_flight == 0 {
            return None;
        }
        let (ticket, result) = self.results_rx.recv().await?;
        Some(self.apply_result(ticket, result))
    }

    /// Apply every answer that has already arrived, without waiting
    pub fn drain_resolutions(&mut self) -> Vec<Resolution> {
        let mut resolutions = Vec::new();
        while let Ok((ticket, result)) = self.results_rx.try_recv() {
            resolutions.push(self.apply_result(ticket, result));
        }
        resolutions
    }

    /// Wait until every in-flight persist call has been answered and applied
    pub async fn settle(&mut self) -> Vec<Resolution> {
        let mut resolutions = Vec::new();
        while let Some(resolution) = self.next_resolution().await {
            resolutions.push(resolution);
        }
        resolutions
    }

    /// Add a server-provided item
    pub fn add_item(&mut self, item: OrderedItem, index: Option<usize>) -> Result<usize> {
        let item_id = item.id.clone();
        let at = self.engine.add_item(item, index)?;
        self.refresh();
        self.emit(BoardEvent::ItemAdded { item_id });
        Ok(at)
    }

    /// Remove an item deleted elsewhere
    pub fn remove_item(&mut self, id: &ItemId) -> Result<OrderedItem> {
        let item = self.engine.remove_item(id)?;
        self.refresh();
        self.emit(BoardEvent::ItemRemoved {
            item_id: id.clone(),
        });
        Ok(item)
    }

    /// Merge an external attribute edit
    pub fn update_attributes(&mut self, id: &ItemId, attributes: Attributes) -> Result<()> {
        self.engine.update_attributes(id, attributes)?;
        self.refresh();
        Ok(())
    }

    fn spawn_persist(&mut self, pending: PendingSync) {
        let gateway = Arc::clone(&self.gateway);
        let results = self.results_tx.clone();
        let timeout = self.config.sync_timeout();
        self.in_flight += 1;

        tokio::spawn(async move {
            let PendingSync { ticket, request } = pending;
            // The call runs in its own task so a panicking gateway still
            // yields exactly one answer for this ticket.
            let mut call = tokio::spawn(async move { gateway.persist(&request).await });
            let result = match tokio::time::timeout(timeout, &mut call).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    error!(
                        item_id = %ticket.item_id,
                        sync_id = %ticket.sync_id,
                        error = %e,
                        "persist call failed"
                    );
                    SyncResult::rejected(RejectReason::Network(format!(
                        "persist call failed: {}",
                        e
                    )))
                }
                Err(_) => {
                    call.abort();
                    warn!(
                        item_id = %ticket.item_id,
                        sync_id = %ticket.sync_id,
                        timeout_ms = timeout.as_millis() as u64,
                        "persist timed out"
                    );
                    SyncResult::rejected(RejectReason::Timeout)
                }
            };
            // A closed channel means the session is gone and nobody cares.
            let _ = results.send((ticket, result));
        });
    }

    fn apply_result(&mut self, ticket: SyncTicket, result: SyncResult) -> Resolution {
        self.in_flight = self.in_flight.saturating_sub(1);
        let resolution = self.engine.resolve(&ticket, result);
        if !matches!(resolution, Resolution::Superseded { .. }) {
            self.refresh();
        }
        self.emit(BoardEvent::from(&resolution));
        resolution
    }

    fn refresh(&mut self) {
        self.summary = BoardSummary::compute(self.engine.partitions(), &self.config);
    }

    fn emit(&self, event: BoardEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
