//! Drag items between a product backlog and a sprint against a flaky backend.
//!
//! Usage:
//!   cargo run -p ordered-board --example sprint_planning -- [config.yaml]
//!
//! Set `RUST_LOG=ordered_board=debug` to watch moves being applied and settled.

use ordered_board::{
    async_trait, logging, BoardConfig, BoardLayout, BoardSession, MoveEngine, MoveIntent,
    OrderedItem, PersistRequest, RejectReason, SyncGateway, SyncResult,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Backend that refuses to schedule the payments epic
struct PointLimitGateway;

#[async_trait]
impl SyncGateway for PointLimitGateway {
    async fn persist(&self, request: &PersistRequest) -> SyncResult {
        if request.item_id.as_str() == "payments" {
            SyncResult::rejected(RejectReason::Validation("epic too large for one sprint".into()))
        } else {
            SyncResult::confirmed()
        }
    }
}

#[tokio::main]
async fn main() {
    logging::init_tracing("ordered_board=info");

    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = match BoardConfig::load(path.as_deref()) {
        Ok(config) => config.with_planned_capacity(20.0),
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let items = [
        OrderedItem::new("login", "product").with_attribute("storyPoints", 5),
        OrderedItem::new("search", "product").with_attribute("storyPoints", 8),
        OrderedItem::new("payments", "product").with_attribute("storyPoints", 13),
        OrderedItem::new("profile", "sprint").with_attribute("storyPoints", 3),
    ];
    let engine = match MoveEngine::with_items(BoardLayout::backlog("sprint-12"), items) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Invalid board: {}", e);
            std::process::exit(1);
        }
    };
    let mut session = BoardSession::new(engine, Arc::new(PointLimitGateway), config);

    session.handle_gesture(&MoveIntent::across("login", ("product", 0), ("sprint", 1)));
    session.handle_gesture(&MoveIntent::across("payments", ("product", 1), ("sprint", 0)));
    print_summary("after dragging", &session);

    for resolution in session.settle().await {
        eprintln!("{:?}", resolution);
    }
    print_summary("after the backend answered", &session);
}

fn print_summary(label: &str, session: &BoardSession) {
    eprintln!("-- {} --", label);
    for partition in session.view().partitions() {
        let ids: Vec<&str> = partition.sequence().iter().map(|id| id.as_str()).collect();
        eprintln!("{:>8}: {:?}", partition.key.as_str(), ids);
    }
    if let Some(capacity) = session.summary().capacity {
        eprintln!(
            "capacity: {} / {} points{}",
            capacity.actual,
            capacity.planned,
            if capacity.over_committed { " (over committed)" } else { "" }
        );
    }
}
