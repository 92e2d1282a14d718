use std::ops::Range;

use proptest::prelude::*;

use crate::model;

use super::*;

fn insert_find_all(keys: &[u32]) {
    let mut tree: AvlTree<u32> = AvlTree::new();

    for &key in keys {
        tree.insert(key);
        tree.assert_invariants();
    }

    for key in keys {
        let node = tree.find(key).expect("item not found");
        assert_eq!(tree.key(node), Some(key));
    }
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree: AvlTree<u32> = AvlTree::new();

    for &key in keys {
        tree.insert(key);
        tree.assert_invariants();
    }

    for key in keys {
        assert!(tree.remove(key), "item not found");
        tree.assert_invariants();
    }

    assert!(tree.is_empty());

    let handles: Vec<NodeHandle> = keys.iter().map(|&key| tree.insert(key)).collect();
    tree.assert_invariants();

    for &handle in handles.iter().rev() {
        assert!(tree.remove_at(handle));
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
    assert_eq!(tree.root(), None);
}

fn permutations(n: u32) -> Vec<Vec<u32>> {
    if n == 0 {
        return vec![vec![]];
    }

    let mut out = Vec::new();
    for perm in permutations(n - 1) {
        for at in 0..=perm.len() {
            let mut p = perm.clone();
            p.insert(at, n - 1);
            out.push(p);
        }
    }
    out
}

/// Returns `(key, height, count)` for every node in level order.
fn level_order<T: Copy>(tree: &AvlTree<T>) -> Vec<(T, u32, usize)> {
    tree.breadth_first()
        .map(|node| (*node.key(), node.height(), node.count()))
        .collect()
}

fn keys_of<T: Copy>(tree: &AvlTree<T>) -> Vec<T> {
    tree.iter().map(|node| *node.key()).collect()
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn small_permutations_find() {
    for n in 3..=6 {
        for perm in permutations(n) {
            insert_find_all(&perm);
        }
    }
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn small_permutations_remove() {
    for n in 3..=6 {
        for perm in permutations(n) {
            insert_remove_all(&perm);
        }
    }
}

#[test]
fn empty_tree_reports_not_found() {
    let mut tree: AvlTree<i64> = AvlTree::new();

    assert!(tree.is_empty());
    assert_eq!(tree.root(), None);
    assert_eq!(tree.min(), None);
    assert_eq!(tree.max(), None);
    assert_eq!(tree.find(&3), None);
    assert_eq!(tree.select(0), None);
    assert!(!tree.remove(&3));
    assert_eq!(tree.pop_first(), None);
    assert_eq!(tree.pop_last(), None);
    tree.assert_invariants();
}

#[test]
fn staged_rotations() {
    let mut tree: AvlTree<i64> = AvlTree::new();

    for key in 0..3 {
        tree.insert(key);
    }
    assert_eq!(level_order(&tree), [(1, 2, 3), (0, 1, 1), (2, 1, 1)]);

    // Right rotation of 5, then left rotation of 2.
    tree.insert(5);
    tree.insert(4);
    assert_eq!(
        level_order(&tree),
        [(1, 3, 5), (0, 1, 1), (4, 2, 3), (2, 1, 1), (5, 1, 1)]
    );

    // Left rotation of -3, then right rotation of 0.
    tree.insert(-3);
    tree.insert(-2);
    assert_eq!(
        level_order(&tree),
        [
            (1, 3, 7),
            (-2, 2, 3),
            (4, 2, 3),
            (-3, 1, 1),
            (0, 1, 1),
            (2, 1, 1),
            (5, 1, 1),
        ]
    );
    tree.assert_invariants();

    // 4's successor is its own right child, 5.
    let five = tree.find(&5).unwrap();
    assert!(tree.remove(&4));
    tree.assert_invariants();
    assert_eq!(tree.len(), 6);
    assert_eq!(tree.node(tree.root().unwrap()).unwrap().count(), 6);
    assert_eq!(keys_of(&tree), [-3, -2, 0, 1, 2, 5]);
    assert_eq!(
        level_order(&tree),
        [(1, 3, 6), (-2, 2, 3), (5, 2, 2), (-3, 1, 1), (0, 1, 1), (2, 1, 1)]
    );
    assert_eq!(tree.key(five), Some(&5));

    // Duplicates of a key already present.
    let count_of = |tree: &AvlTree<i64>, key: i64| tree.iter().filter(|n| *n.key() == key).count();

    let h1 = tree.insert(-2);
    let h2 = tree.insert(-2);
    assert_ne!(h1, h2);
    tree.assert_invariants();
    assert_eq!(count_of(&tree, -2), 3);

    assert!(tree.remove_at(h1));
    tree.assert_invariants();
    assert_eq!(count_of(&tree, -2), 2);
    assert!(!tree.contains_node(h1));
    assert_eq!(tree.key(h2), Some(&-2));

    assert!(tree.remove_at(h2));
    tree.assert_invariants();
    assert_eq!(count_of(&tree, -2), 1);
    assert_eq!(keys_of(&tree), [-3, -2, 0, 1, 2, 5]);
}

#[test]
fn duplicates_removed_by_handle() {
    let mut tree: AvlTree<i64> = [1, 0, 4].into_iter().collect();

    let h1 = tree.insert(-2);
    let h2 = tree.insert(-2);
    assert_ne!(h1, h2);
    assert_eq!(tree.key(h1), Some(&-2));
    assert_eq!(tree.key(h2), Some(&-2));

    assert!(tree.remove_at(h1));
    tree.assert_invariants();
    assert_eq!(tree.find(&-2), Some(h2));

    assert!(tree.remove_at(h2));
    tree.assert_invariants();
    assert_eq!(tree.find(&-2), None);
    assert_eq!(keys_of(&tree), [0, 1, 4]);
}

#[test]
fn equal_keys_descend_right() {
    let mut tree: AvlTree<u32> = AvlTree::new();

    let first = tree.insert(7);
    let second = tree.insert(7);

    assert_eq!(tree.root(), Some(first));
    assert_eq!(tree.node(first).unwrap().right(), Some(second));
    assert_eq!(tree.node(second).unwrap().parent(), Some(first));
    assert_eq!(tree.find(&7), Some(first));
}

#[test]
fn many_duplicates_stay_balanced() {
    let mut tree: AvlTree<u32> = AvlTree::new();

    let handles: Vec<NodeHandle> = (0..64).map(|i| tree.insert(i % 3)).collect();
    tree.assert_invariants();
    assert_eq!(tree.len(), 64);

    // Every handle is still addressable after all the rotations above.
    for (i, &handle) in handles.iter().enumerate() {
        assert_eq!(tree.key(handle), Some(&(i as u32 % 3)));
    }

    for &handle in handles.iter().step_by(2) {
        assert!(tree.remove_at(handle));
        tree.assert_invariants();
    }

    assert_eq!(tree.len(), 32);
    for &handle in handles.iter().skip(1).step_by(2) {
        assert!(tree.contains_node(handle));
    }
}

#[test]
fn handles_survive_rotations() {
    let mut tree: AvlTree<u32> = AvlTree::new();

    let handles: Vec<(NodeHandle, u32)> = (0..100).map(|key| (tree.insert(key), key)).collect();
    tree.assert_invariants();

    for &(handle, key) in &handles {
        assert_eq!(tree.key(handle), Some(&key));
        assert_eq!(tree.find(&key), Some(handle));
    }
}

#[test]
fn stale_handles_are_rejected() {
    let mut tree: AvlTree<u32> = (0..8).collect();

    let three = tree.find(&3).unwrap();
    assert_eq!(tree.take(three), Some(3));

    assert!(!tree.remove_at(three));
    assert_eq!(tree.take(three), None);
    assert!(tree.node(three).is_none());
    assert_eq!(tree.position(three), None);
    assert_eq!(tree.successor(three), None);
    assert_eq!(tree.predecessor(three), None);

    // The freed slot is reused without reviving the old handle.
    let again = tree.insert(3);
    assert_ne!(again, three);
    assert!(tree.node(three).is_none());
    assert_eq!(tree.len(), 8);
    tree.assert_invariants();
}

#[test]
fn remove_root_without_right_child() {
    let mut tree: AvlTree<u32> = AvlTree::new();

    let root = tree.insert(2);
    let left = tree.insert(1);

    assert!(tree.remove_at(root));
    assert_eq!(tree.root(), Some(left));
    assert!(tree.node(left).unwrap().is_root());
    tree.assert_invariants();

    assert!(tree.remove_at(left));
    assert!(tree.is_empty());
    tree.assert_invariants();
}

#[test]
fn remove_with_deep_successor() {
    let mut tree: AvlTree<u32> = [8, 4, 12, 2, 6, 10, 14, 1, 3, 5, 7, 9, 11, 13, 15]
        .into_iter()
        .collect();

    // 8's successor, 9, sits two levels down on the left spine of 12.
    let root = tree.root().unwrap();
    let nine = tree.find(&9).unwrap();
    assert_eq!(tree.key(root), Some(&8));

    assert!(tree.remove_at(root));
    tree.assert_invariants();
    assert_eq!(tree.root(), Some(nine));
    assert_eq!(tree.node(nine).unwrap().count(), 14);
    assert_eq!(keys_of(&tree), [1, 2, 3, 4, 5, 6, 7, 9, 10, 11, 12, 13, 14, 15]);
}

#[test]
fn min_max_pop() {
    let mut tree: AvlTree<i32> = [5, -1, 9, 3, 3, 12].into_iter().collect();

    assert_eq!(tree.min().and_then(|h| tree.key(h)), Some(&-1));
    assert_eq!(tree.max().and_then(|h| tree.key(h)), Some(&12));

    assert_eq!(tree.pop_first(), Some(-1));
    assert_eq!(tree.pop_last(), Some(12));
    tree.assert_invariants();
    assert_eq!(keys_of(&tree), [3, 3, 5, 9]);
}

#[test]
fn select_and_position() {
    let tree: AvlTree<u32> = (0..50).map(|k| k * 2).collect();

    for index in 0..50 {
        let node = tree.select(index).unwrap();
        assert_eq!(tree.key(node), Some(&(index as u32 * 2)));
        assert_eq!(tree.position(node), Some(index));
    }

    assert_eq!(tree.select(50), None);
}

#[test]
fn successor_and_predecessor_walk() {
    let tree: AvlTree<u32> = [4, 2, 6, 1, 3, 5, 7].into_iter().collect();

    let mut forward = Vec::new();
    let mut opt_cur = tree.min();
    while let Some(cur) = opt_cur {
        forward.push(*tree.key(cur).unwrap());
        opt_cur = tree.successor(cur);
    }
    assert_eq!(forward, [1, 2, 3, 4, 5, 6, 7]);

    let mut backward = Vec::new();
    let mut opt_cur = tree.max();
    while let Some(cur) = opt_cur {
        backward.push(*tree.key(cur).unwrap());
        opt_cur = tree.predecessor(cur);
    }
    assert_eq!(backward, [7, 6, 5, 4, 3, 2, 1]);
}

#[test]
fn clear_releases_everything() {
    let mut tree: AvlTree<u32> = AvlTree::new();
    let handles: Vec<NodeHandle> = (0..20).map(|k| tree.insert(k)).collect();

    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.root(), None);
    assert!(handles.iter().all(|&h| !tree.contains_node(h)));

    tree.extend([3, 1, 2]);
    tree.assert_invariants();
    assert_eq!(keys_of(&tree), [1, 2, 3]);
}

#[test]
fn node_view_links() {
    let tree: AvlTree<u32> = [1, 0, 2].into_iter().collect();

    let root = tree.node(tree.root().unwrap()).unwrap();
    assert!(root.is_root());
    assert_eq!(*root.key(), 1);

    let left = tree.node(root.left().unwrap()).unwrap();
    let right = tree.node(root.right().unwrap()).unwrap();
    assert_eq!((*left.key(), *right.key()), (0, 2));
    assert_eq!(left.parent(), Some(root.handle()));
    assert_eq!(right.parent(), Some(root.handle()));
    assert_eq!((left.left(), left.right()), (None, None));
    assert_eq!(root.balance_factor(), 0);

    let tree: AvlTree<u32> = [1, 2].into_iter().collect();
    let root = tree.node(tree.root().unwrap()).unwrap();
    assert_eq!(root.balance_factor(), 1);
}

#[test]
fn breadth_first_nodes_match_iterator() {
    let tree: AvlTree<u32> = (0..31).collect();

    let handles = tree.breadth_first_nodes();
    assert_eq!(handles.len(), 31);
    assert_eq!(handles[0], tree.root().unwrap());

    let depths: Vec<usize> = handles
        .iter()
        .map(|&h| {
            let mut depth = 0;
            let mut cur = tree.node(h).unwrap();
            while let Some(parent) = cur.parent() {
                depth += 1;
                cur = tree.node(parent).unwrap();
            }
            depth
        })
        .collect();
    assert!(depths.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn debug_lists_keys_in_order() {
    let tree: AvlTree<u32> = [3, 1, 2].into_iter().collect();
    assert_eq!(format!("{tree:?}"), "[1, 2, 3]");
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn model_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_model_equivalence(ops);
    }

    #[test]
    fn count_matches_len(keys in proptest::collection::vec(0u32..50, 0..200)) {
        let tree: AvlTree<u32> = keys.iter().copied().collect();

        tree.assert_invariants();
        prop_assert_eq!(tree.root().map_or(0, |r| tree.node(r).unwrap().count()), keys.len());

        let mut sorted = keys.clone();
        sorted.sort_unstable();
        prop_assert_eq!(keys_of(&tree), sorted);
    }
}
