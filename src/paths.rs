//! Enumeration of the full assignments ("cubes") of a diagram over a pool.
//!
//! Unlike a path enumeration, every don't-care variable of the pool is
//! expanded, so each yielded assignment names exactly one encoded item. This
//! is how symbolic layers are turned back into concrete states during
//! incremental construction.
//!
//! Assignments are produced in lexicographic order (false before true), so
//! the first one is [`Bdd::pick_cube`].
//!
//! Note: the number of cubes is exponential in the pool width; it is meant for
//! frontiers whose size is bounded by the number of encoded items.

use crate::bdd::Bdd;
use crate::reference::Ref;
use crate::types::Var;

impl Bdd {
    /// Iterator over the satisfying assignments of `f` to `vars`.
    ///
    /// `vars` must be sorted in variable order and cover the support of `f`.
    pub fn cubes<'a>(&'a self, f: Ref, vars: &[Var]) -> Cubes<'a> {
        Cubes::new(self, f, vars)
    }
}

#[derive(Debug)]
struct Frame {
    node: Ref,
    depth: usize,
    // Value given to `vars[depth - 1]` on the way to this frame.
    bit: bool,
}

pub struct Cubes<'a> {
    bdd: &'a Bdd,
    vars: Vec<u32>,
    assignment: Vec<bool>,
    stack: Vec<Frame>,
}

impl<'a> Cubes<'a> {
    fn new(bdd: &'a Bdd, f: Ref, vars: &[Var]) -> Self {
        debug_assert!(vars.windows(2).all(|w| w[0] < w[1]));
        let mut stack = Vec::new();
        if !bdd.is_zero(f) {
            stack.push(Frame {
                node: f,
                depth: 0,
                bit: false,
            });
        }
        Self {
            bdd,
            vars: vars.iter().map(|v| v.id()).collect(),
            assignment: vec![false; vars.len()],
            stack,
        }
    }
}

impl Iterator for Cubes<'_> {
    type Item = Vec<bool>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(Frame { node, depth, bit }) = self.stack.pop() {
            if depth > 0 {
                self.assignment[depth - 1] = bit;
            }

            if depth == self.vars.len() {
                debug_assert!(self.bdd.is_one(node));
                return Some(self.assignment.clone());
            }

            let (low, high) = self.bdd.top_cofactors(node, self.vars[depth]);
            // High is pushed first so that the low branch is explored first.
            for (child, bit) in [(high, true), (low, false)] {
                if !self.bdd.is_zero(child) {
                    self.stack.push(Frame {
                        node: child,
                        depth: depth + 1,
                        bit,
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_cubes_expand_dont_cares() {
        let bdd = Bdd::default();
        let v: Vec<Var> = (0..3).map(|_| bdd.allocate_variable()).collect();

        // x1 alone: x2 and x3 are don't-cares, four cubes.
        let f = bdd.mk_var(1);
        let cubes: Vec<_> = bdd.cubes(f, &v).collect();
        assert_eq!(
            cubes,
            vec![
                vec![true, false, false],
                vec![true, false, true],
                vec![true, true, false],
                vec![true, true, true],
            ]
        );
    }

    #[test]
    fn test_cubes_terminals() {
        let bdd = Bdd::default();
        let v: Vec<Var> = (0..2).map(|_| bdd.allocate_variable()).collect();

        assert_eq!(bdd.cubes(bdd.zero, &v).count(), 0);
        assert_eq!(bdd.cubes(bdd.one, &v).count(), 4);
        assert_eq!(bdd.cubes(bdd.one, &[]).collect::<Vec<_>>(), vec![Vec::<bool>::new()]);
    }

    #[test]
    fn test_first_cube_is_pick_cube() {
        let bdd = Bdd::default();
        let v: Vec<Var> = (0..3).map(|_| bdd.allocate_variable()).collect();

        let f = bdd.apply_xor(bdd.mk_var(1), bdd.mk_var(3));
        let first = bdd.cubes(f, &v).next();
        assert_eq!(first, bdd.pick_cube(f, &v));
        assert_eq!(bdd.cubes(f, &v).count(), 4);
    }
}
