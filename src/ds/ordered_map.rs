//! Arena-backed AVL tree used for both queue indexes.
//!
//! The Item Index (item id → bucket member handle) and the Score Index
//! (score → bucket) both need exact lookup, insert and delete; the Score
//! Index additionally needs the maximum key on every dispatch. An AVL tree
//! gives all of those in `O(log n)` worst case with no amortisation spikes,
//! which matters because every operation runs under the single queue lock.
//!
//! ## Architecture
//!
//! ```text
//!   nodes (SlotArena<Node<K, V>>)
//!   ┌────────┬───────────────────────────────────────────────────┐
//!   │ SlotId │ Node { key, value, left, right, height }          │
//!   ├────────┼───────────────────────────────────────────────────┤
//!   │ id_0   │ { key: 7,  left: id_1, right: id_2, height: 2 }   │
//!   │ id_1   │ { key: 3,  left: None, right: None, height: 1 }   │
//!   │ id_2   │ { key: 19, left: None, right: None, height: 1 }   │
//!   └────────┴───────────────────────────────────────────────────┘
//!
//!                root ─► [7]
//!                       /    \
//!                    [3]      [19]   ◄── last_key_value()
//! ```
//!
//! Children are linked by [`SlotId`], so no node owns another and removal is
//! a relink followed by freeing one arena slot. Recursion depth during
//! insert/remove is bounded by the tree height (`≤ 1.44·log2 n`).
//!
//! ## Operations
//!
//! | Operation         | Time       |
//! |-------------------|------------|
//! | `get` / `get_mut` | O(log n)   |
//! | `insert`          | O(log n)   |
//! | `remove`          | O(log n)   |
//! | `first_key_value` | O(log n)   |
//! | `last_key_value`  | O(log n)   |
//! | `iter` / `iter_rev` | O(n)     |
//!
//! `debug_validate_invariants()` checks ordering, cached heights and balance
//! in debug/test builds.

use std::cmp::Ordering;
use std::mem;

use crate::ds::slot_arena::{SlotArena, SlotId};

#[derive(Debug)]
struct Node<K, V> {
    left: Option<SlotId>,
    right: Option<SlotId>,
    height: u8,
    key: K,
    value: V,
}

impl<K, V> Node<K, V> {
    fn leaf(key: K, value: V) -> Self {
        Self {
            left: None,
            right: None,
            height: 1,
            key,
            value,
        }
    }
}

/// Ordered map over an index arena (AVL balanced).
///
/// # Example
///
/// ```
/// use ticketkit::ds::OrderedMap;
///
/// let mut scores = OrderedMap::new();
/// scores.insert(5, "five");
/// scores.insert(19, "nineteen");
/// scores.insert(1, "one");
///
/// assert_eq!(scores.get(&5), Some(&"five"));
/// assert_eq!(scores.last_key_value(), Some((&19, &"nineteen")));
/// assert_eq!(scores.remove(&19), Some("nineteen"));
/// assert_eq!(scores.last_key_value(), Some((&5, &"five")));
///
/// let keys: Vec<_> = scores.iter().map(|(k, _)| *k).collect();
/// assert_eq!(keys, vec![1, 5]);
/// ```
#[derive(Debug)]
pub struct OrderedMap<K, V> {
    nodes: SlotArena<Node<K, V>>,
    root: Option<SlotId>,
}

impl<K: Ord, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self {
            nodes: SlotArena::new(),
            root: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: SlotArena::with_capacity(capacity),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|id| &self.node(id).value)
    }

    #[inline]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.find(key)?;
        Some(&mut self.node_mut(id).value)
    }

    /// Inserts `key → value`, returning the previous value if `key` existed.
    ///
    /// Replacing a value keeps the node in place; the tree is only rebalanced
    /// when a new node is added.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (root, previous) = self.insert_at(self.root, key, value);
        self.root = Some(root);
        previous
    }

    /// Removes `key` and returns its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let (root, removed) = self.remove_at(self.root, key);
        self.root = root;
        removed
    }

    /// Smallest key and its value.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        let mut id = self.root?;
        while let Some(left) = self.node(id).left {
            id = left;
        }
        let node = self.node(id);
        Some((&node.key, &node.value))
    }

    /// Largest key and its value.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let mut id = self.root?;
        while let Some(right) = self.node(id).right {
            id = right;
        }
        let node = self.node(id);
        Some((&node.key, &node.value))
    }

    /// Ascending in-order iterator.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self, false)
    }

    /// Descending in-order iterator.
    pub fn iter_rev(&self) -> Iter<'_, K, V> {
        Iter::new(self, true)
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let mut count = 0usize;
        self.validate_subtree(self.root, None, None, &mut count);
        assert_eq!(count, self.len(), "reachable nodes != arena len");
    }

    #[cfg(any(test, debug_assertions))]
    fn validate_subtree(
        &self,
        at: Option<SlotId>,
        lower: Option<&K>,
        upper: Option<&K>,
        count: &mut usize,
    ) -> i32 {
        let Some(id) = at else {
            return 0;
        };
        let node = self.nodes.get(id).expect("dangling child link");
        if let Some(lower) = lower {
            assert!(node.key > *lower, "left-subtree key out of order");
        }
        if let Some(upper) = upper {
            assert!(node.key < *upper, "right-subtree key out of order");
        }
        *count += 1;
        let lh = self.validate_subtree(node.left, lower, Some(&node.key), count);
        let rh = self.validate_subtree(node.right, Some(&node.key), upper, count);
        assert!((lh - rh).abs() <= 1, "AVL balance violated");
        let height = 1 + lh.max(rh);
        assert_eq!(i32::from(node.height), height, "stale cached height");
        height
    }

    fn find(&self, key: &K) -> Option<SlotId> {
        let mut current = self.root;
        while let Some(id) = current {
            let node = self.node(id);
            current = match key.cmp(&node.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(id),
            };
        }
        None
    }

    fn insert_at(&mut self, at: Option<SlotId>, key: K, value: V) -> (SlotId, Option<V>) {
        let Some(id) = at else {
            return (self.nodes.insert(Node::leaf(key, value)), None);
        };
        match key.cmp(&self.node(id).key) {
            Ordering::Less => {
                let left = self.node(id).left;
                let (child, previous) = self.insert_at(left, key, value);
                self.node_mut(id).left = Some(child);
                if previous.is_some() {
                    return (id, previous);
                }
                (self.rebalance(id), None)
            },
            Ordering::Greater => {
                let right = self.node(id).right;
                let (child, previous) = self.insert_at(right, key, value);
                self.node_mut(id).right = Some(child);
                if previous.is_some() {
                    return (id, previous);
                }
                (self.rebalance(id), None)
            },
            Ordering::Equal => {
                let previous = mem::replace(&mut self.node_mut(id).value, value);
                (id, Some(previous))
            },
        }
    }

    fn remove_at(&mut self, at: Option<SlotId>, key: &K) -> (Option<SlotId>, Option<V>) {
        let Some(id) = at else {
            return (None, None);
        };
        match key.cmp(&self.node(id).key) {
            Ordering::Less => {
                let left = self.node(id).left;
                let (child, removed) = self.remove_at(left, key);
                if removed.is_none() {
                    return (Some(id), None);
                }
                self.node_mut(id).left = child;
                (Some(self.rebalance(id)), removed)
            },
            Ordering::Greater => {
                let right = self.node(id).right;
                let (child, removed) = self.remove_at(right, key);
                if removed.is_none() {
                    return (Some(id), None);
                }
                self.node_mut(id).right = child;
                (Some(self.rebalance(id)), removed)
            },
            Ordering::Equal => {
                let (left, right) = {
                    let node = self.node(id);
                    (node.left, node.right)
                };
                let replacement = match (left, right) {
                    (None, None) => None,
                    (Some(child), None) | (None, Some(child)) => Some(child),
                    (Some(left), Some(right)) => {
                        // The in-order successor takes this node's place.
                        let (rest, successor) = self.detach_min(right);
                        let node = self.node_mut(successor);
                        node.left = Some(left);
                        node.right = rest;
                        Some(self.rebalance(successor))
                    },
                };
                let removed = self.nodes.remove(id).map(|node| node.value);
                (replacement, removed)
            },
        }
    }

    /// Unlinks the minimum node of the subtree at `id`.
    /// Returns `(new subtree root, detached node)`.
    fn detach_min(&mut self, id: SlotId) -> (Option<SlotId>, SlotId) {
        match self.node(id).left {
            None => {
                let right = self.node_mut(id).right.take();
                (right, id)
            },
            Some(left) => {
                let (rest, min) = self.detach_min(left);
                self.node_mut(id).left = rest;
                (Some(self.rebalance(id)), min)
            },
        }
    }

    fn rebalance(&mut self, id: SlotId) -> SlotId {
        self.update_height(id);
        let balance = self.balance(id);
        if balance > 1 {
            let left = self.node(id).left.expect("left-heavy node without left child");
            if self.balance(left) < 0 {
                let rotated = self.rotate_left(left);
                self.node_mut(id).left = Some(rotated);
            }
            return self.rotate_right(id);
        }
        if balance < -1 {
            let right = self.node(id).right.expect("right-heavy node without right child");
            if self.balance(right) > 0 {
                let rotated = self.rotate_right(right);
                self.node_mut(id).right = Some(rotated);
            }
            return self.rotate_left(id);
        }
        id
    }

    fn rotate_right(&mut self, id: SlotId) -> SlotId {
        let pivot = self.node(id).left.expect("rotate_right without left child");
        let inner = self.node_mut(pivot).right.replace(id);
        self.node_mut(id).left = inner;
        self.update_height(id);
        self.update_height(pivot);
        pivot
    }

    fn rotate_left(&mut self, id: SlotId) -> SlotId {
        let pivot = self.node(id).right.expect("rotate_left without right child");
        let inner = self.node_mut(pivot).left.replace(id);
        self.node_mut(id).right = inner;
        self.update_height(id);
        self.update_height(pivot);
        pivot
    }

    fn height(&self, at: Option<SlotId>) -> i32 {
        at.map_or(0, |id| i32::from(self.node(id).height))
    }

    fn balance(&self, id: SlotId) -> i32 {
        let node = self.node(id);
        self.height(node.left) - self.height(node.right)
    }

    fn update_height(&mut self, id: SlotId) {
        let (left, right) = {
            let node = self.node(id);
            (node.left, node.right)
        };
        let height = 1 + self.height(left).max(self.height(right));
        self.node_mut(id).height = height as u8;
    }

    fn node(&self, id: SlotId) -> &Node<K, V> {
        self.nodes.get(id).expect("ordered map: dangling node link")
    }

    fn node_mut(&mut self, id: SlotId) -> &mut Node<K, V> {
        self.nodes.get_mut(id).expect("ordered map: dangling node link")
    }
}

impl<K: Ord, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-order iterator over an [`OrderedMap`], ascending or descending.
#[derive(Debug)]
pub struct Iter<'a, K, V> {
    map: &'a OrderedMap<K, V>,
    stack: Vec<SlotId>,
    descending: bool,
}

impl<'a, K: Ord, V> Iter<'a, K, V> {
    fn new(map: &'a OrderedMap<K, V>, descending: bool) -> Self {
        let mut iter = Self {
            map,
            stack: Vec::new(),
            descending,
        };
        iter.push_spine(map.root);
        iter
    }

    fn push_spine(&mut self, mut at: Option<SlotId>) {
        while let Some(id) = at {
            self.stack.push(id);
            let node = self.map.node(id);
            at = if self.descending { node.right } else { node.left };
        }
    }
}

impl<'a, K: Ord, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.map.node(id);
        let next = if self.descending { node.left } else { node.right };
        self.push_spine(next);
        Some((&node.key, &node.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_map_basic_flow() {
        let mut map = OrderedMap::new();
        assert!(map.is_empty());
        assert_eq!(map.insert(7, 'a'), None);
        assert_eq!(map.insert(3, 'b'), None);
        assert_eq!(map.insert(11, 'c'), None);
        assert_eq!(map.len(), 3);

        assert_eq!(map.get(&3), Some(&'b'));
        assert_eq!(map.get(&4), None);
        assert!(map.contains_key(&11));

        assert_eq!(map.remove(&7), Some('a'));
        assert_eq!(map.remove(&7), None);
        assert_eq!(map.len(), 2);
        map.debug_validate_invariants();
    }

    #[test]
    fn ordered_map_insert_existing_replaces_value() {
        let mut map = OrderedMap::new();
        map.insert(1, "old");
        assert_eq!(map.insert(1, "new"), Some("old"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&"new"));
    }

    #[test]
    fn ordered_map_first_and_last() {
        let mut map = OrderedMap::new();
        assert_eq!(map.first_key_value(), None);
        assert_eq!(map.last_key_value(), None);
        for key in [19, 5, 7, 1] {
            map.insert(key, key * 10);
        }
        assert_eq!(map.first_key_value(), Some((&1, &10)));
        assert_eq!(map.last_key_value(), Some((&19, &190)));
    }

    #[test]
    fn ordered_map_iterates_in_both_directions() {
        let mut map = OrderedMap::new();
        for key in [50, 20, 80, 10, 30, 70, 90, 25] {
            map.insert(key, ());
        }
        let ascending: Vec<i32> = map.iter().map(|(k, _)| *k).collect();
        assert_eq!(ascending, vec![10, 20, 25, 30, 50, 70, 80, 90]);
        let descending: Vec<i32> = map.iter_rev().map(|(k, _)| *k).collect();
        assert_eq!(descending, vec![90, 80, 70, 50, 30, 25, 20, 10]);
    }

    #[test]
    fn ordered_map_stays_balanced_under_sequential_inserts() {
        let mut map = OrderedMap::with_capacity(1024);
        for key in 0..1024 {
            map.insert(key, key);
        }
        map.debug_validate_invariants();
        // A perfectly balanced tree of 1024 nodes has height 11; AVL allows ~1.44x.
        assert!(map.height(map.root) <= 15);

        for key in (0..1024).step_by(2) {
            assert_eq!(map.remove(&key), Some(key));
        }
        map.debug_validate_invariants();
        assert_eq!(map.len(), 512);
        assert_eq!(map.first_key_value(), Some((&1, &1)));
    }

    #[test]
    fn ordered_map_remove_node_with_two_children() {
        let mut map = OrderedMap::new();
        for key in [40, 20, 60, 10, 30, 50, 70, 35] {
            map.insert(key, key);
        }
        assert_eq!(map.remove(&20), Some(20));
        map.debug_validate_invariants();
        assert_eq!(map.remove(&40), Some(40));
        map.debug_validate_invariants();
        let keys: Vec<i32> = map.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![10, 30, 35, 50, 60, 70]);
    }

    #[test]
    fn ordered_map_empties_after_removing_every_key() {
        let mut map = OrderedMap::new();
        map.insert(1, 1);
        map.insert(2, 2);
        assert_eq!(map.remove(&1), Some(1));
        assert_eq!(map.remove(&2), Some(2));
        assert!(map.is_empty());
        assert_eq!(map.iter().count(), 0);
        map.insert(3, 3);
        assert_eq!(map.len(), 1);
    }
}
