#![no_main]

use arbitrary::Arbitrary;
use dashgrid_layout::{
    ConflictPolicy, GridSpan, ItemId, LayoutItem, LayoutStore, invariant_report,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Policy {
    PushDown,
    ClampToNeighbors,
    RejectOverlap,
}

impl From<&Policy> for ConflictPolicy {
    fn from(policy: &Policy) -> Self {
        match policy {
            Policy::PushDown => Self::PushDown,
            Policy::ClampToNeighbors => Self::ClampToNeighbors,
            Policy::RejectOverlap => Self::RejectOverlap,
        }
    }
}

#[derive(Debug, Arbitrary)]
enum Op {
    Add { w: u8, h: u8 },
    Move { pick: u8, x: u8, y: u8 },
    Resize { pick: u8, w: u8, h: u8, policy: Policy },
    Remove { pick: u8 },
}

#[derive(Debug, Arbitrary)]
struct Input {
    columns: u8,
    /// Untrusted initial layout: `(x, y, w, h)` per item.
    initial: Vec<(u8, u8, u8, u8)>,
    ops: Vec<Op>,
}

fn pick(store: &LayoutStore, index: u8) -> Option<ItemId> {
    let items = store.items();
    if items.is_empty() {
        return None;
    }
    Some(items[usize::from(index) % items.len()].id.clone())
}

fn assert_invariants(store: &LayoutStore) {
    let report = invariant_report(store.items(), store.columns());
    assert!(report.is_clean(), "invariants broken: {:?}", report.issues);
}

fuzz_target!(|input: Input| {
    let columns = u32::from(input.columns % 24) + 1;
    let initial: Vec<_> = input
        .initial
        .iter()
        .take(64)
        .enumerate()
        .map(|(i, &(x, y, w, h))| {
            LayoutItem::new(
                format!("i{}", i % 48),
                "fuzz",
                u32::from(x % 32),
                u32::from(y % 32),
                u32::from(w % 16),
                u32::from(h % 8),
            )
        })
        .collect();

    let (mut store, _) = LayoutStore::from_initial(columns, initial);
    assert_invariants(&store);

    for op in input.ops.iter().take(256) {
        let before = store.items().to_vec();
        let result = match op {
            Op::Add { w, h } => store
                .add("fuzz", GridSpan::new(u32::from(*w % 16), u32::from(*h % 8)))
                .map(|_| ()),
            Op::Move { pick: index, x, y } => match pick(&store, *index) {
                Some(id) => store.move_item(&id, u32::from(*x % 32), u32::from(*y)).map(|_| ()),
                None => Ok(()),
            },
            Op::Resize { pick: index, w, h, policy } => match pick(&store, *index) {
                Some(id) => store
                    .resize_item(&id, u32::from(*w % 16), u32::from(*h % 8), policy.into())
                    .map(|_| ()),
                None => Ok(()),
            },
            Op::Remove { pick: index } => match pick(&store, *index) {
                Some(id) => store.remove(&id).map(|_| ()),
                None => Ok(()),
            },
        };
        if result.is_err() {
            assert_eq!(store.items(), before.as_slice(), "refused op mutated layout: {op:?}");
        }
        assert_invariants(&store);
    }
});
