//! The Boolean decision-diagram manager.
//!
//! All relation diagrams of a planning problem (state sets, transition
//! relations, observation relations, automaton relations, winning regions) live
//! in one [`Bdd`] manager. Nodes are hash-consed into an arena with
//! per-variable [`Subtable`]s, and edges carry a complement bit, so:
//!
//! - two [`Ref`]s are equal iff they denote the same Boolean function;
//! - negation is free (`-f`);
//! - the stored high edge of a node is never complemented.
//!
//! The variable order is the allocation order of [`Bdd::allocate_variable`].
//!
//! Besides the usual connectives, the manager provides the operations a
//! symbolic planner leans on: existential / universal quantification,
//! relational product ([`Bdd::and_exists`]), simultaneous variable renaming
//! ([`Bdd::rename`]) and composition.

use std::cell::{Cell, RefCell};
use std::cmp::min;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;

use log::{debug, trace};

use crate::cache::Cache;
use crate::node::Node;
use crate::reference::Ref;
use crate::subtable::Subtable;
use crate::types::Var;

/// Key of the computed table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum OpKey {
    Ite(Ref, Ref, Ref),
    Exists(Ref, Ref),
    AndExists(Ref, Ref, Ref),
}

pub struct Bdd {
    nodes: RefCell<Vec<Node>>,
    subtables: RefCell<Vec<Subtable>>,
    free: RefCell<Vec<u32>>,
    cache: RefCell<Cache<OpKey, Ref>>,
    num_vars: Cell<u32>,
    pub zero: Ref,
    pub one: Ref,
}

impl Bdd {
    pub fn new(storage_bits: usize) -> Self {
        assert!(
            storage_bits <= 31,
            "Storage bits should be in the range 0..=31"
        );

        let bits = min(storage_bits, 16);

        let mut nodes = Vec::with_capacity(1 << bits);
        // Index 0 is never used, index 1 is the terminal.
        nodes.push(Node::FREE);
        nodes.push(Node::FREE);
        let one = Ref::positive(1);

        Self {
            nodes: RefCell::new(nodes),
            subtables: RefCell::new(Vec::new()),
            free: RefCell::new(Vec::new()),
            cache: RefCell::new(Cache::new(bits)),
            num_vars: Cell::new(0),
            zero: -one,
            one,
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(20)
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bdd")
            .field("num_vars", &self.num_vars())
            .field("live_nodes", &self.live_nodes())
            .field("cache_hits", &self.cache.borrow().hits())
            .field("cache_misses", &self.cache.borrow().misses())
            .finish()
    }
}

impl Bdd {
    /// Number of allocated variables.
    pub fn num_vars(&self) -> usize {
        self.num_vars.get() as usize
    }

    /// Allocates a fresh variable, placed below every existing one.
    pub fn allocate_variable(&self) -> Var {
        let id = self.num_vars.get() + 1;
        self.num_vars.set(id);
        let var = Var::new(id);
        self.subtables.borrow_mut().push(Subtable::new(var));
        var
    }

    fn ensure_variable(&self, v: u32) {
        while self.num_vars.get() < v {
            self.allocate_variable();
        }
    }

    /// Number of inner nodes currently stored.
    pub fn live_nodes(&self) -> usize {
        self.subtables.borrow().iter().map(|st| st.len()).sum()
    }

    pub fn variable(&self, index: usize) -> u32 {
        self.nodes.borrow()[index].variable
    }
    pub fn low(&self, index: usize) -> Ref {
        self.nodes.borrow()[index].low
    }
    pub fn high(&self, index: usize) -> Ref {
        self.nodes.borrow()[index].high
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.low(node.index());
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.high(node.index());
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == self.zero
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == self.one
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.id() == self.one.id()
    }

    /// Position of the top variable of `node` in the order; terminals sit below everything.
    pub fn level(&self, node: Ref) -> u32 {
        if self.is_terminal(node) {
            u32::MAX
        } else {
            self.variable(node.index())
        }
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");

        if low == high {
            return low;
        }

        // Keep the high edge regular.
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }

        debug_assert!(self.level(low) > v && self.level(high) > v);
        self.ensure_variable(v);

        let slot = (v - 1) as usize;
        if let Some(i) = self.subtables.borrow()[slot].find(low, high) {
            return Ref::positive(i);
        }

        let node = Node {
            variable: v,
            low,
            high,
        };
        let reused = self.free.borrow_mut().pop();
        let i = match reused {
            Some(i) => {
                self.nodes.borrow_mut()[i as usize] = node;
                i
            }
            None => {
                let mut nodes = self.nodes.borrow_mut();
                nodes.push(node);
                (nodes.len() - 1) as u32
            }
        };
        self.subtables.borrow_mut()[slot].insert(low, high, i);
        trace!("mk(v = {}, low = {}, high = {}) -> @{}", v, low, high, i);
        Ref::positive(i)
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");
        self.mk_node(v, self.zero, self.one)
    }

    /// Conjunction of DIMACS-style literals.
    pub fn cube(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        let mut literals = literals.into_iter().collect::<Vec<_>>();
        literals.sort_by_key(|&v| std::cmp::Reverse(v.abs()));
        let mut current = self.one;
        for lit in literals {
            assert_ne!(lit, 0, "Variable index should not be zero");
            current = if lit < 0 {
                self.mk_node(-lit as u32, current, self.zero)
            } else {
                self.mk_node(lit as u32, self.zero, current)
            };
        }
        current
    }

    /// The cube assigning `values[i]` to `vars[i]`.
    pub fn assignment_cube(&self, vars: &[Var], values: impl IntoIterator<Item = bool>) -> Ref {
        self.cube(vars.iter().zip(values).map(|(v, b)| {
            let lit = v.id() as i32;
            if b {
                lit
            } else {
                -lit
            }
        }))
    }

    /// Positive cube of `vars`, the form in which quantified variable sets are passed around.
    pub fn var_set(&self, vars: impl IntoIterator<Item = Var>) -> Ref {
        self.cube(vars.into_iter().map(|v| v.id() as i32))
    }

    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "Variable index should not be zero");

        if self.is_terminal(node) || v < self.variable(node.index()) {
            return (node, node);
        }
        debug_assert_eq!(v, self.variable(node.index()));
        (self.low_node(node), self.high_node(node))
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(x, y, z) = (x ∧ y) ∨ (¬x ∧ z)
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        trace!("apply_ite(f = {}, g = {}, h = {})", f, g, h);

        // Base cases:
        //   ite(1,G,H) => G
        //   ite(0,G,H) => H
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }

        // More base cases:
        //   ite(F,G,G) => G
        //   ite(F,1,0) => F
        //   ite(F,0,1) => ~F
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,~F) => ite(F,G,1)
        if g == f {
            return self.apply_ite(f, self.one, h);
        }
        if h == f {
            return self.apply_ite(f, g, self.zero);
        }
        if g == -f {
            return self.apply_ite(f, self.zero, h);
        }
        if h == -f {
            return self.apply_ite(f, g, self.one);
        }

        let (mut f, mut g, mut h) = (f, g, h);

        // ite(~F,G,H) => ite(F,H,G)
        if f.is_negated() {
            f = -f;
            std::mem::swap(&mut g, &mut h);
        }

        // ite(F,~G,H) => ~ite(F,G,~H)
        let mut n = false;
        if g.is_negated() {
            n = true;
            g = -g;
            h = -h;
        }

        let key = OpKey::Ite(f, g, h);
        let cached = self.cache.borrow_mut().get(&key);
        if let Some(res) = cached {
            return if n { -res } else { res };
        }

        let m = self.level(f).min(self.level(g)).min(self.level(h));
        assert_ne!(m, u32::MAX);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);

        let res = self.mk_node(m, e, t);
        self.cache.borrow_mut().insert(key, res);

        if n {
            -res
        } else {
            res
        }
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.zero)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, self.one, v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_imply(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.one)
    }

    /// `u ∧ ¬v`
    pub fn apply_diff(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(v, self.zero, u)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.one;
        for node in nodes.into_iter() {
            res = self.apply_and(res, node);
            if self.is_zero(res) {
                break;
            }
        }
        res
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.zero;
        for node in nodes.into_iter() {
            res = self.apply_or(res, node);
            if self.is_one(res) {
                break;
            }
        }
        res
    }

    /// Whether `f → g` is valid.
    pub fn is_implies(&self, f: Ref, g: Ref) -> bool {
        self.is_zero(self.apply_diff(f, g))
    }

    /// `∃ vars. f`, where `vars` is a positive cube (see [`Bdd::var_set`]).
    pub fn exists(&self, f: Ref, vars: Ref) -> Ref {
        if self.is_terminal(f) || self.is_one(vars) {
            return f;
        }

        let v = self.variable(f.index());
        let mut cube = vars;
        while !self.is_one(cube) && self.variable(cube.index()) < v {
            cube = self.high_node(cube);
        }
        if self.is_one(cube) {
            return f;
        }

        let key = OpKey::Exists(f, cube);
        let cached = self.cache.borrow_mut().get(&key);
        if let Some(res) = cached {
            return res;
        }

        let (f0, f1) = self.top_cofactors(f, v);
        let res = if self.variable(cube.index()) == v {
            let rest = self.high_node(cube);
            let r0 = self.exists(f0, rest);
            if self.is_one(r0) {
                self.one
            } else {
                let r1 = self.exists(f1, rest);
                self.apply_or(r0, r1)
            }
        } else {
            let r0 = self.exists(f0, cube);
            let r1 = self.exists(f1, cube);
            self.mk_node(v, r0, r1)
        };

        self.cache.borrow_mut().insert(key, res);
        res
    }

    /// `∀ vars. f`, computed as `¬∃ vars. ¬f`.
    pub fn forall(&self, f: Ref, vars: Ref) -> Ref {
        -self.exists(-f, vars)
    }

    /// Relational product `∃ vars. f ∧ g`, without building `f ∧ g` first.
    pub fn and_exists(&self, f: Ref, g: Ref, vars: Ref) -> Ref {
        if self.is_zero(f) || self.is_zero(g) || f == -g {
            return self.zero;
        }
        if self.is_one(f) {
            return self.exists(g, vars);
        }
        if self.is_one(g) || f == g {
            return self.exists(f, vars);
        }
        if self.is_one(vars) {
            return self.apply_and(f, g);
        }

        let (f, g) = if f.raw() <= g.raw() { (f, g) } else { (g, f) };

        let m = self.level(f).min(self.level(g));
        let mut cube = vars;
        while !self.is_one(cube) && self.variable(cube.index()) < m {
            cube = self.high_node(cube);
        }
        if self.is_one(cube) {
            return self.apply_and(f, g);
        }

        let key = OpKey::AndExists(f, g, cube);
        let cached = self.cache.borrow_mut().get(&key);
        if let Some(res) = cached {
            return res;
        }

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let res = if self.variable(cube.index()) == m {
            let rest = self.high_node(cube);
            let r0 = self.and_exists(f0, g0, rest);
            if self.is_one(r0) {
                self.one
            } else {
                let r1 = self.and_exists(f1, g1, rest);
                self.apply_or(r0, r1)
            }
        } else {
            let r0 = self.and_exists(f0, g0, cube);
            let r1 = self.and_exists(f1, g1, cube);
            self.mk_node(m, r0, r1)
        };

        self.cache.borrow_mut().insert(key, res);
        res
    }

    /// Simultaneous renaming of variables: every `v` in the domain of `map` becomes `map[v]`.
    ///
    /// The map may permute variables (e.g. swap the current and next pools).
    pub fn rename(&self, f: Ref, map: &HashMap<u32, u32>) -> Ref {
        let mut cache = HashMap::new();
        self.rename_(f, map, &mut cache)
    }

    fn rename_(&self, f: Ref, map: &HashMap<u32, u32>, cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }
        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let v = self.variable(f.index());
        let low = self.rename_(self.low_node(f), map, cache);
        let high = self.rename_(self.high_node(f), map, cache);
        let target = map.get(&v).copied().unwrap_or(v);
        let res = self.apply_ite(self.mk_var(target), high, low);

        cache.insert(f, res);
        res
    }

    /// Swaps each pair of variables in `pairs`.
    pub fn swap(&self, f: Ref, pairs: &[(Var, Var)]) -> Ref {
        let mut map = HashMap::with_capacity(2 * pairs.len());
        for &(a, b) in pairs {
            map.insert(a.id(), b.id());
            map.insert(b.id(), a.id());
        }
        self.rename(f, &map)
    }

    // f|v<-b
    pub fn restrict(&self, f: Ref, v: u32, b: bool) -> Ref {
        let mut cache = HashMap::new();
        self.restrict_(f, v, b, &mut cache)
    }

    fn restrict_(&self, f: Ref, v: u32, b: bool, cache: &mut HashMap<Ref, Ref>) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");

        if self.is_terminal(f) {
            return f;
        }

        let i = self.variable(f.index());
        if v < i {
            // 'f' does not depend on 'v'
            return f;
        }
        if v == i {
            return if b {
                self.high_node(f)
            } else {
                self.low_node(f)
            };
        }

        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let low = self.restrict_(self.low_node(f), v, b, cache);
        let high = self.restrict_(self.high_node(f), v, b, cache);
        let res = self.mk_node(i, low, high);
        cache.insert(f, res);
        res
    }

    // f|v<-g
    pub fn compose(&self, f: Ref, v: u32, g: Ref) -> Ref {
        let f1 = self.restrict(f, v, true);
        let f0 = self.restrict(f, v, false);
        self.apply_ite(g, f1, f0)
    }

    /// Evaluates `f` under an assignment given as a predicate on variable ids.
    pub fn eval(&self, f: Ref, assignment: impl Fn(u32) -> bool) -> bool {
        let mut current = f;
        while !self.is_terminal(current) {
            let v = self.variable(current.index());
            current = if assignment(v) {
                self.high_node(current)
            } else {
                self.low_node(current)
            };
        }
        self.is_one(current)
    }

    /// Variables `f` depends on, in order.
    pub fn support(&self, f: Ref) -> Vec<u32> {
        let mut vars = self
            .descendants([f])
            .into_iter()
            .filter(|&i| i != self.one.id())
            .map(|i| self.variable(i as usize))
            .collect::<Vec<_>>();
        vars.sort_unstable();
        vars.dedup();
        vars
    }

    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<u32> {
        let mut visited = HashSet::new();
        visited.insert(self.one.id());
        let mut queue = VecDeque::from_iter(nodes);

        while let Some(node) = queue.pop_front() {
            let i = node.id();
            if visited.insert(i) {
                queue.push_back(self.low(node.index()));
                queue.push_back(self.high(node.index()));
            }
        }

        visited
    }

    /// Number of nodes of `f`, terminal included.
    pub fn size(&self, f: Ref) -> usize {
        self.descendants([f]).len()
    }

    /// Frees every node not reachable from `roots` and clears the computed table.
    ///
    /// References not listed in `roots` are invalid afterwards.
    pub fn collect_garbage(&self, roots: &[Ref]) -> usize {
        self.cache.borrow_mut().clear();

        let alive = self.descendants(roots.iter().copied());
        let mut dropped = Vec::new();
        for st in self.subtables.borrow_mut().iter_mut() {
            dropped.extend(st.sweep(|i| alive.contains(&i)));
        }

        let mut nodes = self.nodes.borrow_mut();
        let mut free = self.free.borrow_mut();
        for &i in &dropped {
            nodes[i as usize] = Node::FREE;
            free.push(i);
        }
        debug!(
            "collect_garbage: kept {} nodes, dropped {}",
            alive.len(),
            dropped.len()
        );
        dropped.len()
    }
}
