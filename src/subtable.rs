//! Per-variable unique tables.
//!
//! The manager keeps every inner node in one arena and, for each variable,
//! a subtable mapping `(low, high)` children to the arena index of the node:
//!
//! ```text
//! subtables[0] → nodes labelled x1
//! subtables[1] → nodes labelled x2
//! ...
//! ```
//!
//! A lookup before every allocation guarantees that two structurally equal
//! nodes are never created (hash consing), which is what makes equality of
//! [`Ref`]s coincide with equivalence of the represented functions.

use std::collections::HashMap;

use crate::reference::Ref;
use crate::types::Var;

/// Unique table for nodes of a single variable.
#[derive(Debug, Clone)]
pub struct Subtable {
    pub variable: Var,
    nodes: HashMap<(Ref, Ref), u32>,
}

impl Subtable {
    pub fn new(variable: Var) -> Self {
        Self {
            variable,
            nodes: HashMap::new(),
        }
    }

    /// Arena index of the node with these children, if it exists.
    pub fn find(&self, low: Ref, high: Ref) -> Option<u32> {
        self.nodes.get(&(low, high)).copied()
    }

    pub fn insert(&mut self, low: Ref, high: Ref, index: u32) {
        self.nodes.insert((low, high), index);
    }

    pub fn remove(&mut self, low: Ref, high: Ref) -> Option<u32> {
        self.nodes.remove(&(low, high))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every entry whose index is rejected by `keep`, returning the dropped indices.
    pub fn sweep(&mut self, mut keep: impl FnMut(u32) -> bool) -> Vec<u32> {
        let mut dropped = Vec::new();
        self.nodes.retain(|_, &mut index| {
            let alive = keep(index);
            if !alive {
                dropped.push(index);
            }
            alive
        });
        dropped
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_subtable_basic() {
        let mut st = Subtable::new(Var::new(1));

        let low = -Ref::positive(1);
        let high = Ref::positive(1);

        assert!(st.find(low, high).is_none());

        st.insert(low, high, 42);
        assert_eq!(st.find(low, high), Some(42));
        assert_eq!(st.len(), 1);

        st.remove(low, high);
        assert!(st.find(low, high).is_none());
        assert!(st.is_empty());
    }

    #[test]
    fn test_subtable_sweep() {
        let mut st = Subtable::new(Var::new(2));
        st.insert(-Ref::positive(1), Ref::positive(1), 10);
        st.insert(Ref::positive(2), Ref::positive(3), 20);
        st.insert(-Ref::positive(1), Ref::positive(3), 30);

        let mut dropped = st.sweep(|i| i != 20);
        dropped.sort();
        assert_eq!(dropped, vec![20]);
        assert_eq!(st.len(), 2);
        assert_eq!(st.find(Ref::positive(2), Ref::positive(3)), None);
        assert_eq!(st.find(-Ref::positive(1), Ref::positive(3)), Some(30));
    }
}
