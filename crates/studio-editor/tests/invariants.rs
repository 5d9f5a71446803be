//! Property tests: random operation sequences never break the tree.
//!
//! Operations pick their targets by index into the current pre-order, so
//! every generated sequence stays meaningful as the page changes shape.

use std::collections::HashSet;

use proptest::prelude::*;
use studio_core::{ComponentId, PageData, Props, ZoneId, validate_document};
use studio_editor::EditorSession;

const SLOTS: [&str; 2] = ["left", "right"];

#[derive(Debug, Clone)]
enum Op {
    Add {
        parent: Option<u8>,
        slot: Option<u8>,
        index: Option<u8>,
    },
    Delete(u8),
    Duplicate(u8),
    Move {
        target: u8,
        parent: Option<u8>,
        slot: Option<u8>,
        index: u8,
    },
    Props(u8, u8),
    Undo,
    Redo,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<Option<u8>>(), prop::option::of(0u8..3), prop::option::of(0u8..6))
            .prop_map(|(parent, slot, index)| Op::Add { parent, slot, index }),
        1 => any::<u8>().prop_map(Op::Delete),
        1 => any::<u8>().prop_map(Op::Duplicate),
        3 => (any::<u8>(), any::<Option<u8>>(), prop::option::of(0u8..3), 0u8..6)
            .prop_map(|(target, parent, slot, index)| Op::Move { target, parent, slot, index }),
        1 => (any::<u8>(), any::<u8>()).prop_map(|(target, value)| Op::Props(target, value)),
        1 => Just(Op::Undo),
        1 => Just(Op::Redo),
    ]
}

fn pick(data: &PageData, n: u8) -> Option<ComponentId> {
    let order = data.preorder();
    if order.is_empty() {
        return None;
    }
    Some(order[n as usize % order.len()])
}

/// Resolve generated placement hints to `(parent_id, zone_id)` arguments.
fn target(data: &PageData, parent: Option<u8>, slot: Option<u8>) -> (ComponentId, Option<ZoneId>) {
    let owner = parent.and_then(|n| pick(data, n));
    let parent_id = owner.unwrap_or_else(ComponentId::root);
    let zone = match slot {
        Some(2) => Some(ZoneId::from("root:footer")),
        Some(s) => Some(ZoneId::new(parent_id, SLOTS[s as usize % SLOTS.len()])),
        None => None,
    };
    (parent_id, zone)
}

fn assert_well_formed(data: &PageData, step: usize, op: &Op) {
    let diags = validate_document(data);
    assert!(diags.is_empty(), "after step {step} ({op:?}): {diags:?}");
    assert_eq!(
        data.preorder().len(),
        data.len(),
        "after step {step} ({op:?}): unreachable components"
    );
}

fn run(session: &mut EditorSession, step: usize, op: &Op) {
    let data = session.data().clone();
    match *op {
        Op::Add { parent, slot, index } => {
            let (parent_id, zone) = target(&data, parent, slot);
            let created = session.add_component(
                "box",
                Props::new(),
                parent_id,
                index.map(usize::from),
                zone,
            );
            assert!(created.is_some(), "step {step}: add into a resolvable parent failed");
        }
        Op::Delete(n) => {
            let Some(victim) = pick(&data, n) else { return };
            let doomed = data.subtree(victim);
            assert!(session.delete_component(victim));
            let after = session.data();
            for id in doomed {
                assert!(!after.contains(id), "step {step}: {id} survived delete");
            }
        }
        Op::Duplicate(n) => {
            let Some(source) = pick(&data, n) else { return };
            let original: HashSet<_> = data.subtree(source).into_iter().collect();
            let clone = session
                .duplicate_component(source)
                .unwrap_or_else(|| panic!("step {step}: duplicate of {source} failed"));
            let copies = session.data().subtree(clone);
            assert_eq!(copies.len(), original.len());
            for id in copies {
                assert!(!data.contains(id), "step {step}: clone reused {id}");
            }
        }
        Op::Move { target: t, parent, slot, index } => {
            let Some(mover) = pick(&data, t) else { return };
            let (parent_id, zone) = target(&data, parent, slot);
            if session.move_component(mover, parent_id, usize::from(index), zone) {
                let after = session.data();
                let (_, at) = after.position_of(mover).unwrap();
                let placement = after.get(mover).unwrap().placement();
                let len = after.placement_list(&placement).unwrap().len();
                assert_eq!(at, usize::from(index).min(len - 1), "step {step}: move index");
            }
        }
        Op::Props(n, value) => {
            let Some(id) = pick(&data, n) else { return };
            let mut props = Props::new();
            props.insert("v".into(), value.into());
            session.update_component_props(id, props);
        }
        Op::Undo => {
            session.undo();
        }
        Op::Redo => {
            session.redo();
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn random_sequences_keep_tree_well_formed(ops in prop::collection::vec(arb_op(), 1..60)) {
        let mut session = EditorSession::new();
        for (step, op) in ops.iter().enumerate() {
            run(&mut session, step, op);
            assert_well_formed(session.data(), step, op);
        }
    }

    #[test]
    fn undoing_everything_restores_each_state(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut session = EditorSession::new();
        let mut states = vec![session.data().clone()];
        for (step, op) in ops.iter().enumerate() {
            if matches!(op, Op::Undo | Op::Redo) {
                continue;
            }
            let undo_len = session.history().undo_len();
            run(&mut session, step, op);
            if session.history().undo_len() > undo_len {
                states.push(session.data().clone());
            }
        }
        states.pop();
        while let Some(expected) = states.pop() {
            prop_assert!(session.undo().is_some());
            prop_assert_eq!(session.data(), &expected);
        }
        prop_assert!(!session.can_undo());
    }
}
