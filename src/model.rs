//! Model-based checking of [`AvlTree`] against a `BTreeMap` multiset.
//!
//! Shared by the property tests and the fuzz targets.

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use proptest::strategy::{Just, Strategy};

use crate::{AvlTree, NodeHandle};

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..100,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue),
    Find(ItemValue),
    Remove(ItemValue),
    RemoveHandle(usize),
    Min,
    Max,
    PopFirst,
    PopLast,
    Select(usize),
    Position(usize),
}

impl Op {
    fn finalize(self, keys: &[u32], live: usize) -> FinalOp {
        fn get_value(v: &[u32], i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) => {
                    if v.is_empty() {
                        idx as u32
                    } else {
                        v[idx % v.len()]
                    }
                }
                ItemValue::Random(v) => v,
            }
        }

        match self {
            Op::Insert(item) => FinalOp::Insert(get_value(keys, item)),
            Op::Find(item) => FinalOp::Find(get_value(keys, item)),
            Op::Remove(item) => FinalOp::Remove(get_value(keys, item)),
            Op::RemoveHandle(idx) => FinalOp::RemoveHandle(idx % live.max(1)),
            Op::Min => FinalOp::Min,
            Op::Max => FinalOp::Max,
            Op::PopFirst => FinalOp::PopFirst,
            Op::PopLast => FinalOp::PopLast,
            // Allow one index past the end to exercise the miss.
            Op::Select(idx) => FinalOp::Select(idx % (live + 1)),
            Op::Position(idx) => FinalOp::Position(idx % live.max(1)),
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(u32),
    Find(u32),
    Remove(u32),
    RemoveHandle(usize),
    Min,
    Max,
    PopFirst,
    PopLast,
    Select(usize),
    Position(usize),
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        3 => value_strategy().prop_map(Op::Insert),
        1 => value_strategy().prop_map(Op::Find),
        1 => value_strategy().prop_map(Op::Remove),
        1 => (0usize..1000).prop_map(Op::RemoveHandle),
        1 => Just(Op::Min),
        1 => Just(Op::Max),
        1 => Just(Op::PopFirst),
        1 => Just(Op::PopLast),
        1 => (0usize..1000).prop_map(Op::Select),
        1 => (0usize..1000).prop_map(Op::Position),
    ]
}

/// A multiset of keys, tracking the handle of every live node.
#[derive(Default)]
struct Model {
    counts: BTreeMap<u32, usize>,
    handles: Vec<(NodeHandle, u32)>,
}

impl Model {
    fn insert(&mut self, handle: NodeHandle, key: u32) {
        *self.counts.entry(key).or_default() += 1;
        self.handles.push((handle, key));
    }

    fn forget(&mut self, handle: NodeHandle) -> Option<u32> {
        let idx = self.handles.iter().position(|&(h, _)| h == handle)?;
        let (_, key) = self.handles.swap_remove(idx);

        match self.counts.get_mut(&key) {
            Some(1) => {
                self.counts.remove(&key);
            }
            Some(n) => *n -= 1,
            None => unreachable!("model lost track of key {key}"),
        }

        Some(key)
    }

    fn keys(&self) -> Vec<u32> {
        self.counts.keys().copied().collect()
    }

    fn sorted(&self) -> Vec<u32> {
        self.counts
            .iter()
            .flat_map(|(&key, &n)| core::iter::repeat(key).take(n))
            .collect()
    }
}

pub fn run_model_equivalence(ops: Vec<Op>) {
    let mut model = Model::default();
    let mut tree: AvlTree<u32> = AvlTree::new();

    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&model.keys(), model.handles.len());

        match final_op {
            FinalOp::Insert(value) => {
                let handle = tree.insert(value);
                model.insert(handle, value);

                assert_eq!(tree.key(handle), Some(&value), "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Find(value) => {
                let found = tree.find(&value);
                let from_tree = found.and_then(|h| tree.key(h)).copied();
                let from_model = model.counts.contains_key(&value).then_some(value);

                assert_eq!(from_model, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Remove(value) => {
                let found = tree.find(&value);
                let removed = tree.remove(&value);

                assert_eq!(
                    model.counts.contains_key(&value),
                    removed,
                    "FinalOp #{op_id}: {final_op:?}"
                );

                if let Some(found) = found {
                    assert_eq!(model.forget(found), Some(value));
                    assert!(!tree.contains_node(found));
                }
            }

            FinalOp::RemoveHandle(idx) => {
                let Some(&(handle, key)) = model.handles.get(idx) else {
                    continue;
                };

                assert_eq!(tree.take(handle), Some(key), "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(tree.take(handle), None, "FinalOp #{op_id}: {final_op:?}");
                model.forget(handle);
            }

            FinalOp::Min => {
                let from_model = model.counts.keys().next();
                let from_tree = tree.min().and_then(|h| tree.key(h));

                assert_eq!(from_model, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Max => {
                let from_model = model.counts.keys().next_back();
                let from_tree = tree.max().and_then(|h| tree.key(h));

                assert_eq!(from_model, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopFirst => {
                let first = tree.min();
                let from_model = model.counts.keys().next().copied();
                let from_tree = tree.pop_first();

                assert_eq!(from_model, from_tree, "FinalOp #{op_id}: {final_op:?}");
                if let Some(first) = first {
                    model.forget(first);
                }
            }

            FinalOp::PopLast => {
                let last = tree.max();
                let from_model = model.counts.keys().next_back().copied();
                let from_tree = tree.pop_last();

                assert_eq!(from_model, from_tree, "FinalOp #{op_id}: {final_op:?}");
                if let Some(last) = last {
                    model.forget(last);
                }
            }

            FinalOp::Select(idx) => {
                let from_model = model.sorted().get(idx).copied();
                let selected = tree.select(idx);
                let from_tree = selected.and_then(|h| tree.key(h)).copied();

                assert_eq!(from_model, from_tree, "FinalOp #{op_id}: {final_op:?}");
                if let Some(selected) = selected {
                    assert_eq!(tree.position(selected), Some(idx));
                }
            }

            FinalOp::Position(idx) => {
                let Some(&(handle, _)) = model.handles.get(idx) else {
                    continue;
                };

                let position = tree.position(handle).expect("live handle has a position");
                assert_eq!(tree.select(position), Some(handle), "FinalOp #{op_id}: {final_op:?}");
            }
        }

        tree.assert_invariants();
        assert_eq!(model.handles.len(), tree.len());
        assert_eq!(
            model.sorted(),
            tree.iter().map(|node| *node.key()).collect::<Vec<_>>()
        );

        for &(handle, key) in &model.handles {
            assert_eq!(tree.key(handle), Some(&key));
        }
    }
}
