//! Disjoint sets of segment ids.
//!
//! A union-find over [`Uint64`] where the representative value of each set is
//! its maximum member. Nodes live in an arena and refer to each other by
//! index: `parent` for the union-find forest, and `next`/`prev` for a
//! circular list of all members of the same set, which makes enumerating a
//! set O(set size).

use std::cell::Cell;
use std::collections::HashMap;
use std::collections::hash_map;

use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::segments::types::Uint64;

#[derive(Debug, Clone)]
struct Node {
    value: Uint64,
    /// Interior mutability lets `find` compress paths behind `&self`.
    parent: Cell<usize>,
    rank: u32,
    next: usize,
    prev: usize,
    /// Only meaningful on a root.
    max: Uint64,
}

impl Node {
    fn singleton(value: Uint64, index: usize) -> Self {
        Node {
            value,
            parent: Cell::new(index),
            rank: 0,
            next: index,
            prev: index,
            max: value,
        }
    }
}

/// A collection of disjoint sets of segment ids.
///
/// Ids that have never been linked are not stored; each is implicitly its
/// own singleton set.
#[derive(Debug, Clone, Default)]
pub struct DisjointUint64Sets {
    map: HashMap<Uint64, usize>,
    nodes: Vec<Node>,
    free: Vec<usize>,
    generation: u64,
}

impl DisjointUint64Sets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped on every structural change; never on a no-op.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of tracked ids.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn find_representative(&self, index: usize) -> usize {
        let mut root = index;
        while self.nodes[root].parent.get() != root {
            root = self.nodes[root].parent.get();
        }
        let mut current = index;
        while current != root {
            let next = self.nodes[current].parent.get();
            self.nodes[current].parent.set(root);
            current = next;
        }
        root
    }

    fn link_unequal_representatives(&mut self, i: usize, j: usize) -> usize {
        let i_rank = self.nodes[i].rank;
        let j_rank = self.nodes[j].rank;
        if i_rank > j_rank {
            self.nodes[j].parent.set(i);
            return i;
        }
        self.nodes[i].parent.set(j);
        if i_rank == j_rank {
            self.nodes[j].rank = j_rank + 1;
        }
        j
    }

    fn splice_circular_lists(&mut self, i: usize, j: usize) {
        let i_prev = self.nodes[i].prev;
        let j_prev = self.nodes[j].prev;

        // End of i's list to the start of j's.
        self.nodes[j].prev = i_prev;
        self.nodes[i_prev].next = j;

        // End of j's list back to the start of i's.
        self.nodes[i].prev = j_prev;
        self.nodes[j_prev].next = i;
    }

    fn allocate(&mut self, value: Uint64) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Node::singleton(value, index);
                index
            }
            None => {
                let index = self.nodes.len();
                self.nodes.push(Node::singleton(value, index));
                index
            }
        }
    }

    /// Returns the root of `x`'s set, tracking `x` as a singleton first if needed.
    fn make_set(&mut self, x: Uint64) -> usize {
        if let Some(&index) = self.map.get(&x) {
            return self.find_representative(index);
        }
        let index = self.allocate(x);
        self.map.insert(x, index);
        index
    }

    pub fn has(&self, x: Uint64) -> bool {
        self.map.contains_key(&x)
    }

    /// The maximum id in `x`'s set, or `x` itself if untracked.
    pub fn get(&self, x: Uint64) -> Uint64 {
        match self.map.get(&x) {
            Some(&index) => self.nodes[self.find_representative(index)].max,
            None => x,
        }
    }

    pub fn is_max_element(&self, x: Uint64) -> bool {
        self.get(x) == x
    }

    /// Puts `a` and `b` in the same set. Returns `false` if they already were.
    pub fn link(&mut self, a: Uint64, b: Uint64) -> bool {
        let a = self.make_set(a);
        let b = self.make_set(b);
        if a == b {
            return false;
        }
        self.generation += 1;
        let root = self.link_unequal_representatives(a, b);
        self.splice_circular_lists(a, b);
        let max = self.nodes[a].max.max(self.nodes[b].max);
        self.nodes[root].max = max;
        true
    }

    /// Stops tracking every member of `a`'s set. Returns `false` if `a` was
    /// untracked. Removing a set bumps the generation like `link` and `clear`.
    pub fn delete_set(&mut self, a: Uint64) -> bool {
        let Some(&start) = self.map.get(&a) else {
            return false;
        };
        let members: Vec<usize> = self.member_indices(start).collect();
        for index in members {
            self.map.remove(&self.nodes[index].value);
            self.free.push(index);
        }
        if self.map.is_empty() {
            self.nodes.clear();
            self.free.clear();
        }
        self.generation += 1;
        true
    }

    /// Enumerates exactly the members of `a`'s set, or just `a` if untracked.
    pub fn set_elements(&self, a: Uint64) -> SetElements<'_> {
        match self.map.get(&a) {
            Some(&index) => {
                debug_assert_eq!(self.nodes[index].value, a);
                SetElements(ElementsState::Members {
                    nodes: &self.nodes,
                    start: index,
                    current: Some(index),
                })
            }
            None => SetElements(ElementsState::Singleton(Some(a))),
        }
    }

    fn member_indices(&self, start: usize) -> impl Iterator<Item = usize> + '_ {
        let mut current = Some(start);
        std::iter::from_fn(move || {
            let index = current?;
            let next = self.nodes[index].next;
            current = (next != start).then_some(next);
            Some(index)
        })
    }

    /// `(member, representative)` for every tracked id, in no particular order.
    pub fn mappings(&self) -> Mappings<'_> {
        Mappings {
            sets: self,
            entries: self.map.iter(),
        }
    }

    /// Drops all tracking. Returns `false` if nothing was tracked.
    pub fn clear(&mut self) -> bool {
        if self.map.is_empty() {
            return false;
        }
        self.generation += 1;
        self.map.clear();
        self.nodes.clear();
        self.free.clear();
        true
    }

    /// Canonical serialization: one array per set, members sorted
    /// numerically, sets ordered by their smallest member.
    pub fn to_json(&self) -> Vec<Vec<String>> {
        let mut sets: Vec<Vec<Uint64>> = Vec::new();
        for &index in self.map.values() {
            if self.nodes[index].parent.get() != index {
                continue;
            }
            let mut members: Vec<Uint64> = self
                .member_indices(index)
                .map(|member| self.nodes[member].value)
                .collect();
            members.sort_unstable();
            sets.push(members);
        }
        sets.sort_unstable_by_key(|members| members[0]);
        sets.into_iter()
            .map(|members| members.iter().map(Uint64::to_string).collect())
            .collect()
    }

    /// Replaces the contents with the groups in `value`, which has the shape
    /// produced by [`DisjointUint64Sets::to_json`]. On a parse error nothing
    /// is changed.
    pub fn restore_state(&mut self, value: &serde_json::Value) -> Result<()> {
        let groups: Vec<Vec<Uint64>> = serde_json::from_value(value.clone())?;
        self.clear();
        for group in groups {
            if let Some((&first, rest)) = group.split_first() {
                self.make_set(first);
                for &member in rest {
                    self.link(first, member);
                }
            }
        }
        Ok(())
    }
}

/// Iterator returned by [`DisjointUint64Sets::set_elements`].
#[derive(Debug, Clone)]
pub struct SetElements<'a>(ElementsState<'a>);

#[derive(Debug, Clone)]
enum ElementsState<'a> {
    Singleton(Option<Uint64>),
    Members {
        nodes: &'a [Node],
        start: usize,
        current: Option<usize>,
    },
}

impl Iterator for SetElements<'_> {
    type Item = Uint64;

    fn next(&mut self) -> Option<Uint64> {
        match &mut self.0 {
            ElementsState::Singleton(value) => value.take(),
            ElementsState::Members {
                nodes,
                start,
                current,
            } => {
                let index = (*current)?;
                let next = nodes[index].next;
                *current = (next != *start).then_some(next);
                Some(nodes[index].value)
            }
        }
    }
}

/// Iterator returned by [`DisjointUint64Sets::mappings`].
#[derive(Debug, Clone)]
pub struct Mappings<'a> {
    sets: &'a DisjointUint64Sets,
    entries: hash_map::Iter<'a, Uint64, usize>,
}

impl Iterator for Mappings<'_> {
    type Item = (Uint64, Uint64);

    fn next(&mut self) -> Option<Self::Item> {
        let (&value, &index) = self.entries.next()?;
        let root = self.sets.find_representative(index);
        Some((value, self.sets.nodes[root].max))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<'a> IntoIterator for &'a DisjointUint64Sets {
    type Item = (Uint64, Uint64);
    type IntoIter = Mappings<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.mappings()
    }
}

impl Serialize for DisjointUint64Sets {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: u64) -> Uint64 {
        Uint64::new(value)
    }

    fn sorted(iter: impl Iterator<Item = Uint64>) -> Vec<u64> {
        let mut values: Vec<u64> = iter.map(|v| v.as_u64()).collect();
        values.sort_unstable();
        values
    }

    #[test]
    fn test_untracked_is_own_singleton() {
        let sets = DisjointUint64Sets::new();
        assert!(!sets.has(id(4)));
        assert_eq!(sets.get(id(4)), id(4));
        assert!(sets.is_max_element(id(4)));
        assert_eq!(sorted(sets.set_elements(id(4))), vec![4]);
        assert!(sets.is_empty());
    }

    #[test]
    fn test_representative_is_maximum() {
        let mut sets = DisjointUint64Sets::new();
        assert!(sets.link(id(5), id(9)));
        assert!(sets.link(id(9), id(3)));

        for member in [5, 9, 3] {
            assert_eq!(sets.get(id(member)), id(9));
        }
        assert!(sets.is_max_element(id(9)));
        assert!(!sets.is_max_element(id(3)));
    }

    #[test]
    fn test_link_same_set_is_noop() {
        let mut sets = DisjointUint64Sets::new();
        assert!(sets.link(id(1), id(2)));
        let generation = sets.generation();

        assert!(!sets.link(id(2), id(1)));
        assert!(!sets.link(id(1), id(1)));
        assert_eq!(sets.generation(), generation);
    }

    #[test]
    fn test_self_link_tracks_without_merge() {
        let mut sets = DisjointUint64Sets::new();
        assert!(!sets.link(id(8), id(8)));
        assert!(sets.has(id(8)));
        assert_eq!(sets.generation(), 0);
    }

    #[test]
    fn test_set_elements_enumerates_each_member_once() {
        let mut sets = DisjointUint64Sets::new();
        sets.link(id(10), id(20));
        sets.link(id(20), id(5));
        sets.link(id(100), id(200));

        assert_eq!(sorted(sets.set_elements(id(5))), vec![5, 10, 20]);
        assert_eq!(sorted(sets.set_elements(id(200))), vec![100, 200]);
        assert_eq!(sets.get(id(10)), id(20));

        // Restartable: a clone replays the same sequence.
        let iter = sets.set_elements(id(10));
        assert_eq!(iter.clone().count(), 3);
        assert_eq!(sorted(iter), vec![5, 10, 20]);
    }

    #[test]
    fn test_mappings_cover_every_tracked_id() {
        let mut sets = DisjointUint64Sets::new();
        sets.link(id(1), id(2));
        sets.link(id(3), id(4));

        let mut pairs: Vec<(u64, u64)> = sets
            .mappings()
            .map(|(member, rep)| (member.as_u64(), rep.as_u64()))
            .collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(1, 2), (2, 2), (3, 4), (4, 4)]);
        assert_eq!((&sets).into_iter().count(), 4);
    }

    #[test]
    fn test_delete_set_reverts_members_to_singletons() {
        let mut sets = DisjointUint64Sets::new();
        sets.link(id(1), id(2));
        sets.link(id(2), id(3));
        sets.link(id(7), id(8));
        let generation = sets.generation();

        assert!(sets.delete_set(id(2)));
        assert!(sets.generation() > generation);
        for member in [1, 2, 3] {
            assert!(!sets.has(id(member)));
            assert_eq!(sets.get(id(member)), id(member));
        }
        assert_eq!(sets.get(id(7)), id(8));
        assert!(!sets.delete_set(id(2)));

        // Freed slots are reused without disturbing live sets.
        sets.link(id(30), id(40));
        assert_eq!(sorted(sets.set_elements(id(30))), vec![30, 40]);
        assert_eq!(sorted(sets.set_elements(id(7))), vec![7, 8]);
    }

    #[test]
    fn test_clear_and_generation() {
        let mut sets = DisjointUint64Sets::new();
        assert!(!sets.clear());
        assert_eq!(sets.generation(), 0);

        sets.link(id(1), id(2));
        assert_eq!(sets.generation(), 1);
        assert!(sets.clear());
        assert_eq!(sets.generation(), 2);
        assert!(!sets.clear());
        assert_eq!(sets.generation(), 2);
        assert!(!sets.has(id(1)));
    }

    #[test]
    fn test_to_json_numeric_order() {
        let mut sets = DisjointUint64Sets::new();
        sets.link(id(10), id(20));
        sets.link(id(20), id(5));
        sets.link(id(100), id(3));

        assert_eq!(
            sets.to_json(),
            vec![vec!["3", "100"], vec!["5", "10", "20"]]
        );
        assert_eq!(
            serde_json::to_string(&sets).unwrap(),
            r#"[["3","100"],["5","10","20"]]"#
        );
    }

    #[test]
    fn test_restore_state() {
        let mut sets = DisjointUint64Sets::new();
        sets.link(id(1), id(2));

        sets.restore_state(&serde_json::json!([["5", "10", "20"], ["7"]]))
            .unwrap();
        assert!(!sets.has(id(1)));
        assert_eq!(sets.get(id(5)), id(20));
        assert!(sets.has(id(7)));
        assert_eq!(sets.get(id(7)), id(7));

        assert!(sets.restore_state(&serde_json::json!([["1", "nope"]])).is_err());
        assert_eq!(sets.get(id(5)), id(20));
    }

    #[test]
    fn test_saved_state_round_trips_with_singletons() {
        let mut sets = DisjointUint64Sets::new();
        sets.link(id(8), id(8));
        sets.link(id(1), id(2));
        let saved = serde_json::to_value(&sets).unwrap();
        assert_eq!(saved, serde_json::json!([["1", "2"], ["8"]]));

        let mut restored = DisjointUint64Sets::new();
        restored.restore_state(&saved).unwrap();
        assert_eq!(restored.to_json(), sets.to_json());
        assert!(restored.has(id(8)));
    }

    #[test]
    fn test_large_ids_keep_full_precision() {
        let mut sets = DisjointUint64Sets::new();
        let a = Uint64::new(u64::MAX);
        let b = Uint64::new(u64::MAX - 1);
        sets.link(a, b);
        assert_eq!(sets.get(b), a);
        assert_eq!(
            sets.to_json(),
            vec![vec!["18446744073709551614", "18446744073709551615"]]
        );
    }
}
