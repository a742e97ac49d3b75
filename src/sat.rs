use std::collections::HashMap;

use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::reference::Ref;
use crate::types::Var;

impl Bdd {
    /// Number of assignments to `vars` satisfying `node`.
    ///
    /// `vars` must be sorted in variable order and cover the support of `node`.
    pub fn sat_count(&self, node: Ref, vars: &[Var]) -> BigUint {
        debug_assert!(vars.windows(2).all(|w| w[0] < w[1]));
        let position: HashMap<u32, usize> = vars.iter().enumerate().map(|(i, v)| (v.id(), i)).collect();
        let mut cache = HashMap::new();
        let count = self.sat_count_(node, &position, vars.len(), &mut cache);
        count << self.position_of(node, &position, vars.len())
    }

    fn position_of(&self, node: Ref, position: &HashMap<u32, usize>, n: usize) -> usize {
        if self.is_terminal(node) {
            return n;
        }
        let v = self.variable(node.index());
        match position.get(&v) {
            Some(&p) => p,
            None => panic!("sat_count: variable x{} is outside of the counted set", v),
        }
    }

    // Counts assignments to the variables from `node`'s own position downwards.
    fn sat_count_(
        &self,
        node: Ref,
        position: &HashMap<u32, usize>,
        n: usize,
        cache: &mut HashMap<Ref, BigUint>,
    ) -> BigUint {
        if self.is_zero(node) {
            return BigUint::ZERO;
        }
        if self.is_one(node) {
            return BigUint::from(1u32);
        }
        if let Some(count) = cache.get(&node) {
            return count.clone();
        }

        let p = self.position_of(node, position, n);
        let low = self.low_node(node);
        let high = self.high_node(node);
        let count_low = self.sat_count_(low, position, n, cache) << (self.position_of(low, position, n) - p - 1);
        let count_high = self.sat_count_(high, position, n, cache) << (self.position_of(high, position, n) - p - 1);
        let count = count_low + count_high;

        cache.insert(node, count.clone());
        count
    }

    /// The lexicographically smallest assignment to `vars` (false before true) satisfying `node`.
    ///
    /// `vars` must be sorted in variable order and cover the support of `node`.
    /// Returns `None` for the constant false function.
    pub fn pick_cube(&self, node: Ref, vars: &[Var]) -> Option<Vec<bool>> {
        if self.is_zero(node) {
            return None;
        }

        let mut assignment = Vec::with_capacity(vars.len());
        let mut current = node;
        for var in vars {
            if !self.is_terminal(current) && self.variable(current.index()) == var.id() {
                let low = self.low_node(current);
                if self.is_zero(low) {
                    assignment.push(true);
                    current = self.high_node(current);
                } else {
                    assignment.push(false);
                    current = low;
                }
            } else {
                assignment.push(false);
            }
        }
        debug_assert!(self.is_one(current));
        Some(assignment)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn vars(bdd: &Bdd, n: usize) -> Vec<Var> {
        (0..n).map(|_| bdd.allocate_variable()).collect()
    }

    #[test]
    fn test_sat_count_terminal() {
        let bdd = Bdd::default();
        let v = vars(&bdd, 3);

        assert_eq!(bdd.sat_count(bdd.zero, &v), BigUint::ZERO);
        assert_eq!(bdd.sat_count(bdd.one, &v), BigUint::from(8u32));
        assert_eq!(bdd.sat_count(bdd.one, &[]), BigUint::from(1u32));
    }

    #[test]
    fn test_sat_count_var() {
        let bdd = Bdd::default();
        let v = vars(&bdd, 3);

        let x2 = bdd.mk_var(2);
        assert_eq!(bdd.sat_count(x2, &v), BigUint::from(4u32));
        assert_eq!(bdd.sat_count(-x2, &v), BigUint::from(4u32));
        assert_eq!(bdd.sat_count(x2, &v[1..2]), BigUint::from(1u32));
    }

    #[test]
    fn test_sat_count_sparse_set() {
        let bdd = Bdd::default();
        let v = vars(&bdd, 5);

        // Count over {x1, x3, x5} only.
        let set = [v[0], v[2], v[4]];
        let f = bdd.apply_or(bdd.mk_var(1), bdd.mk_var(5));
        assert_eq!(bdd.sat_count(f, &set), BigUint::from(6u32));
        assert_eq!(bdd.sat_count(-f, &set), BigUint::from(2u32));
    }

    #[test]
    fn test_pick_cube_is_smallest() {
        let bdd = Bdd::default();
        let v = vars(&bdd, 3);

        // x1 ∨ x3: smallest model is 001 (x3 only).
        let f = bdd.apply_or(bdd.mk_var(1), bdd.mk_var(3));
        assert_eq!(bdd.pick_cube(f, &v), Some(vec![false, false, true]));

        let g = bdd.cube([1, -2, 3]);
        assert_eq!(bdd.pick_cube(g, &v), Some(vec![true, false, true]));
        assert_eq!(bdd.pick_cube(bdd.zero, &v), None);
    }
}
