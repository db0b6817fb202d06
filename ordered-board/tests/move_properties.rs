//! Ordering and aggregate properties over arbitrary move sequences

use ordered_board::{
    aggregate::{capacity_ratio, number_attribute, sum_attribute},
    BoardLayout, MoveEngine, MoveIntent, MoveOutcome, OrderedItem, PartitionKey, PendingSync,
    RejectReason, SyncResult,
};
use proptest::prelude::*;

const KANBAN: [&str; 5] = ["backlog", "todo", "in_progress", "review", "completed"];

fn kanban_engine(count: usize) -> MoveEngine {
    let items = (0..count).map(|i| {
        OrderedItem::new(format!("item-{}", i), KANBAN[i % KANBAN.len()])
            .with_attribute("storyPoints", (i % 8) as u64)
    });
    MoveEngine::with_items(BoardLayout::kanban(), items).unwrap()
}

fn backlog_engine(count: usize) -> MoveEngine {
    let items = (0..count).map(|i| {
        let key = if i % 3 == 0 { "sprint" } else { "product" };
        OrderedItem::new(format!("item-{}", i), key)
            .with_attribute("storyPoints", (i % 5) as u64 + 1)
    });
    MoveEngine::with_items(BoardLayout::backlog("sprint-1"), items).unwrap()
}

/// Turn raw numbers into a move of an item that is really on the board,
/// so the engine exercises the move paths rather than the error paths.
fn gesture(
    engine: &MoveEngine,
    pick: usize,
    dest: usize,
    dest_index: usize,
) -> Option<MoveIntent> {
    let set = engine.partitions();
    let keys: Vec<PartitionKey> = set.keys().cloned().collect();
    let item = set.items().nth(pick % set.item_count().max(1))?;
    let (source_key, source_index) = set.locate(&item.id)?;
    Some(MoveIntent::across(
        item.id.clone(),
        (source_key, source_index),
        (keys[dest % keys.len()].clone(), dest_index),
    ))
}

/// Sum of story points over items whose cached key is `key`, computed from
/// the item table without going through partition sequences
fn independent_points(engine: &MoveEngine, key: &str) -> f64 {
    engine
        .partitions()
        .items()
        .filter(|i| i.partition_key.as_str() == key)
        .filter_map(|i| i.number("storyPoints"))
        .sum()
}

proptest! {
    #[test]
    fn moves_preserve_invariants(
        moves in prop::collection::vec((0usize..64, 0usize..8, 0usize..20), 1..60)
    ) {
        let mut engine = kanban_engine(12);
        for (pick, dest, index) in moves {
            if let Some(intent) = gesture(&engine, pick, dest, index) {
                engine.apply_move(&intent).unwrap();
            }
            prop_assert!(engine.partitions().validate().is_empty());
            prop_assert_eq!(engine.partitions().item_count(), 12);
        }
    }

    #[test]
    fn resolutions_preserve_invariants(
        steps in prop::collection::vec(
            (0usize..64, 0usize..4, 0usize..10, any::<bool>(), any::<bool>()),
            1..60,
        )
    ) {
        let mut engine = backlog_engine(9);
        let mut outstanding: Vec<PendingSync> = Vec::new();

        for (pick, dest, index, answer_now, accept) in steps {
            if let Some(intent) = gesture(&engine, pick, dest, index) {
                if let MoveOutcome::Applied(pending) = engine.apply_move(&intent).unwrap() {
                    outstanding.push(pending);
                }
            }
            if answer_now && !outstanding.is_empty() {
                // Answer an arbitrary outstanding move, not necessarily the oldest.
                let pending = outstanding.remove(pick % outstanding.len());
                let result = if accept {
                    SyncResult::confirmed()
                } else {
                    SyncResult::rejected(RejectReason::Network("flaky".into()))
                };
                engine.resolve(&pending.ticket, result);
            }

            prop_assert!(engine.partitions().validate().is_empty());
            prop_assert!(engine.pending_count() <= 9);

            let sprint = sum_attribute(
                engine.partitions(),
                &"sprint".into(),
                number_attribute("storyPoints"),
            );
            prop_assert_eq!(sprint, independent_points(&engine, "sprint"));
        }
    }

    #[test]
    fn noop_moves_change_nothing(pick in 0usize..64) {
        let mut engine = kanban_engine(10);
        let before = engine.partitions().clone();
        let item = engine.partitions().items().nth(pick % 10).unwrap().id.clone();
        let (key, index) = engine.partitions().locate(&item).unwrap();

        let outcome = engine
            .apply_move(&MoveIntent::within(item, key, index, index))
            .unwrap();

        prop_assert_eq!(outcome, MoveOutcome::NoOp);
        prop_assert_eq!(engine.partitions(), &before);
        prop_assert_eq!(engine.pending_count(), 0);
        prop_assert_eq!(
            serde_json::to_vec(engine.partitions()).unwrap(),
            serde_json::to_vec(&before).unwrap()
        );
    }
}

#[test]
fn capacity_overcommit_after_moves() {
    let mut engine = MoveEngine::with_items(
        BoardLayout::backlog("sprint-9"),
        [
            OrderedItem::new("a", "sprint").with_attribute("storyPoints", 13),
            OrderedItem::new("b", "product").with_attribute("storyPoints", 5),
            OrderedItem::new("c", "product").with_attribute("storyPoints", 3),
        ],
    )
    .unwrap();
    let points = number_attribute("storyPoints");

    engine
        .apply_move(&MoveIntent::across("b", ("product", 0), ("sprint", 1)))
        .unwrap();
    let actual = sum_attribute(engine.partitions(), &"sprint".into(), &points);
    assert_eq!(actual, 18.0);
    assert!(!capacity_ratio(actual, 20.0).over_committed);

    engine
        .apply_move(&MoveIntent::across("c", ("product", 0), ("sprint", 0)))
        .unwrap();
    let actual = sum_attribute(engine.partitions(), &"sprint".into(), &points);
    assert_eq!(actual, 21.0);
    assert!(capacity_ratio(actual, 20.0).over_committed);
}

#[test]
fn backlog_moves_keep_sprint_id_in_step() {
    let mut engine = backlog_engine(6);
    for i in 0..6 {
        let id = format!("item-{}", i);
        let (key, index) = engine.partitions().locate(&id.as_str().into()).unwrap();
        let dest = if key.as_str() == "sprint" { "product" } else { "sprint" };
        engine
            .apply_move(&MoveIntent::across(id.as_str(), (key, index), (dest, 0)))
            .unwrap();
    }

    for item in engine.partitions().items() {
        let expected = if item.partition_key.as_str() == "sprint" {
            serde_json::json!("sprint-1")
        } else {
            serde_json::Value::Null
        };
        assert_eq!(item.attribute("sprintId"), Some(&expected));
    }
}
