//! Weighted decision diagrams (ADDs) with [`Cost`] terminals.
//!
//! A weighted diagram maps every assignment to a cost, `INFINITY` standing
//! for "absent". It shares variable ids with the [`Bdd`] manager it was
//! created next to, so Boolean relations can be lifted into weighted ones
//! ([`Add::from_bdd`]) and cost levels cut back into Boolean sets
//! ([`Add::to_bdd`]).
//!
//! Nodes carry no complement bit: there is no cheap negation of a cost function.

use std::cell::RefCell;
use std::cmp::min;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::{Debug, Display, Formatter};

use log::{debug, trace};

use crate::bdd::Bdd;
use crate::cache::Cache;
use crate::reference::Ref;

/// Path cost. `INFINITY` is absorbing under addition.
pub type Cost = u64;

pub const INFINITY: Cost = Cost::MAX;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct AddRef(u32);

impl AddRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for AddRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
enum AddNode {
    Terminal(Cost),
    Inner { variable: u32, low: AddRef, high: AddRef },
}

/// Pointwise binary operations.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AddOp {
    Plus,
    Min,
    Max,
}

impl AddOp {
    fn eval(self, a: Cost, b: Cost) -> Cost {
        match self {
            AddOp::Plus => a.saturating_add(b),
            AddOp::Min => a.min(b),
            AddOp::Max => a.max(b),
        }
    }
}

pub struct Add {
    nodes: RefCell<Vec<AddNode>>,
    unique: RefCell<HashMap<AddNode, AddRef>>,
    free: RefCell<Vec<u32>>,
    /// Roots kept by every sweep, with their holder counts.
    pinned: RefCell<HashMap<AddRef, usize>>,
    cache: RefCell<Cache<(AddOp, AddRef, AddRef), AddRef>>,
}

impl Add {
    pub fn new(storage_bits: usize) -> Self {
        let bits = min(storage_bits, 16);
        Self {
            nodes: RefCell::new(Vec::with_capacity(1 << bits)),
            unique: RefCell::new(HashMap::with_capacity(1 << bits)),
            free: RefCell::new(Vec::new()),
            pinned: RefCell::new(HashMap::new()),
            cache: RefCell::new(Cache::new(bits)),
        }
    }
}

impl Default for Add {
    fn default() -> Self {
        Add::new(20)
    }
}

impl Debug for Add {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Add")
            .field("nodes", &self.nodes.borrow().len())
            .field("cache_hits", &self.cache.borrow().hits())
            .finish()
    }
}

impl Add {
    fn intern(&self, node: AddNode) -> AddRef {
        if let Some(&r) = self.unique.borrow().get(&node) {
            return r;
        }
        let mut nodes = self.nodes.borrow_mut();
        let r = match self.free.borrow_mut().pop() {
            Some(i) => {
                nodes[i as usize] = node;
                AddRef(i)
            }
            None => {
                nodes.push(node);
                AddRef(nodes.len() as u32 - 1)
            }
        };
        self.unique.borrow_mut().insert(node, r);
        r
    }

    fn node(&self, f: AddRef) -> AddNode {
        self.nodes.borrow()[f.index()]
    }

    pub fn constant(&self, value: Cost) -> AddRef {
        self.intern(AddNode::Terminal(value))
    }

    pub fn infinity(&self) -> AddRef {
        self.constant(INFINITY)
    }

    pub fn mk_node(&self, v: u32, low: AddRef, high: AddRef) -> AddRef {
        assert_ne!(v, 0, "Variable index should not be zero");
        if low == high {
            return low;
        }
        debug_assert!(self.level(low) > v && self.level(high) > v);
        self.intern(AddNode::Inner {
            variable: v,
            low,
            high,
        })
    }

    /// The terminal value, if `f` is constant.
    pub fn value(&self, f: AddRef) -> Option<Cost> {
        match self.node(f) {
            AddNode::Terminal(c) => Some(c),
            AddNode::Inner { .. } => None,
        }
    }

    pub fn level(&self, f: AddRef) -> u32 {
        match self.node(f) {
            AddNode::Terminal(_) => u32::MAX,
            AddNode::Inner { variable, .. } => variable,
        }
    }

    fn cofactors(&self, f: AddRef, v: u32) -> (AddRef, AddRef) {
        match self.node(f) {
            AddNode::Inner { variable, low, high } if variable == v => (low, high),
            _ => (f, f),
        }
    }

    /// Pointwise `op(f, g)`.
    pub fn apply(&self, op: AddOp, f: AddRef, g: AddRef) -> AddRef {
        if let (Some(a), Some(b)) = (self.value(f), self.value(g)) {
            return self.constant(op.eval(a, b));
        }
        match op {
            AddOp::Plus => {
                if self.value(f) == Some(INFINITY) || self.value(g) == Some(INFINITY) {
                    return self.infinity();
                }
                if self.value(f) == Some(0) {
                    return g;
                }
                if self.value(g) == Some(0) {
                    return f;
                }
            }
            AddOp::Min => {
                if f == g || self.value(g) == Some(INFINITY) {
                    return f;
                }
                if self.value(f) == Some(INFINITY) {
                    return g;
                }
            }
            AddOp::Max => {
                if f == g || self.value(g) == Some(0) {
                    return f;
                }
                if self.value(f) == Some(0) {
                    return g;
                }
            }
        }

        // All three operations are commutative.
        let (f, g) = if f <= g { (f, g) } else { (g, f) };
        let key = (op, f, g);
        let cached = self.cache.borrow_mut().get(&key);
        if let Some(res) = cached {
            return res;
        }

        let m = self.level(f).min(self.level(g));
        let (f0, f1) = self.cofactors(f, m);
        let (g0, g1) = self.cofactors(g, m);
        let low = self.apply(op, f0, g0);
        let high = self.apply(op, f1, g1);
        let res = self.mk_node(m, low, high);

        trace!("apply({:?}, {}, {}) -> {}", op, f, g, res);
        self.cache.borrow_mut().insert(key, res);
        res
    }

    pub fn plus(&self, f: AddRef, g: AddRef) -> AddRef {
        self.apply(AddOp::Plus, f, g)
    }

    pub fn minimum(&self, f: AddRef, g: AddRef) -> AddRef {
        self.apply(AddOp::Min, f, g)
    }

    pub fn maximum(&self, f: AddRef, g: AddRef) -> AddRef {
        self.apply(AddOp::Max, f, g)
    }

    /// Lifts a Boolean function: `then` where `f` holds, `otherwise` elsewhere.
    pub fn from_bdd(&self, bdd: &Bdd, f: Ref, then: Cost, otherwise: Cost) -> AddRef {
        let mut cache = HashMap::new();
        self.from_bdd_(bdd, f, then, otherwise, &mut cache)
    }

    fn from_bdd_(&self, bdd: &Bdd, f: Ref, then: Cost, otherwise: Cost, cache: &mut HashMap<Ref, AddRef>) -> AddRef {
        if bdd.is_one(f) {
            return self.constant(then);
        }
        if bdd.is_zero(f) {
            return self.constant(otherwise);
        }
        if let Some(&res) = cache.get(&f) {
            return res;
        }
        let v = bdd.variable(f.index());
        let low = self.from_bdd_(bdd, bdd.low_node(f), then, otherwise, cache);
        let high = self.from_bdd_(bdd, bdd.high_node(f), then, otherwise, cache);
        let res = self.mk_node(v, low, high);
        cache.insert(f, res);
        res
    }

    /// The set of assignments whose value satisfies `pred`.
    pub fn to_bdd(&self, bdd: &Bdd, f: AddRef, pred: impl Fn(Cost) -> bool) -> Ref {
        let mut cache = HashMap::new();
        self.to_bdd_(bdd, f, &pred, &mut cache)
    }

    fn to_bdd_(&self, bdd: &Bdd, f: AddRef, pred: &impl Fn(Cost) -> bool, cache: &mut HashMap<AddRef, Ref>) -> Ref {
        if let Some(&res) = cache.get(&f) {
            return res;
        }
        let res = match self.node(f) {
            AddNode::Terminal(c) => {
                if pred(c) {
                    bdd.one
                } else {
                    bdd.zero
                }
            }
            AddNode::Inner { variable, low, high } => {
                let low = self.to_bdd_(bdd, low, pred, cache);
                let high = self.to_bdd_(bdd, high, pred, cache);
                bdd.mk_node(variable, low, high)
            }
        };
        cache.insert(f, res);
        res
    }

    /// Assignments with a finite value.
    pub fn finite(&self, bdd: &Bdd, f: AddRef) -> Ref {
        self.to_bdd(bdd, f, |c| c != INFINITY)
    }

    /// Keeps the values of `f` on `set` and makes everything else infinite.
    pub fn restrict_to(&self, bdd: &Bdd, f: AddRef, set: Ref) -> AddRef {
        let mask = self.from_bdd(bdd, set, 0, INFINITY);
        self.plus(f, mask)
    }

    /// `min over vars. f`, the weighted counterpart of existential quantification.
    pub fn min_abstract(&self, f: AddRef, vars: &BTreeSet<u32>) -> AddRef {
        let mut cache = HashMap::new();
        self.min_abstract_(f, vars, &mut cache)
    }

    fn min_abstract_(&self, f: AddRef, vars: &BTreeSet<u32>, cache: &mut HashMap<AddRef, AddRef>) -> AddRef {
        let (variable, low, high) = match self.node(f) {
            AddNode::Terminal(_) => return f,
            AddNode::Inner { variable, low, high } => (variable, low, high),
        };
        if vars.range(variable..).next().is_none() {
            return f;
        }
        if let Some(&res) = cache.get(&f) {
            return res;
        }
        let low = self.min_abstract_(low, vars, cache);
        let high = self.min_abstract_(high, vars, cache);
        let res = if vars.contains(&variable) {
            self.minimum(low, high)
        } else {
            self.mk_node(variable, low, high)
        };
        cache.insert(f, res);
        res
    }

    /// Simultaneous variable renaming, as [`Bdd::rename`].
    pub fn rename(&self, f: AddRef, map: &HashMap<u32, u32>) -> AddRef {
        let mut cache = HashMap::new();
        self.rename_(f, map, &mut cache)
    }

    fn rename_(&self, f: AddRef, map: &HashMap<u32, u32>, cache: &mut HashMap<AddRef, AddRef>) -> AddRef {
        let (variable, low, high) = match self.node(f) {
            AddNode::Terminal(_) => return f,
            AddNode::Inner { variable, low, high } => (variable, low, high),
        };
        if let Some(&res) = cache.get(&f) {
            return res;
        }
        let low = self.rename_(low, map, cache);
        let high = self.rename_(high, map, cache);
        let target = map.get(&variable).copied().unwrap_or(variable);
        // ite(target, high, low) = min(high on target, low off target)
        let on = self.mk_node(target, self.infinity(), self.constant(0));
        let off = self.mk_node(target, self.constant(0), self.infinity());
        let res = self.minimum(self.plus(on, high), self.plus(off, low));
        cache.insert(f, res);
        res
    }

    /// Distinct finite terminal values reachable in `f`, ascending.
    pub fn terminals(&self, f: AddRef) -> BTreeSet<Cost> {
        let mut values = BTreeSet::new();
        let mut visited = std::collections::HashSet::new();
        let mut stack = vec![f];
        while let Some(g) = stack.pop() {
            if !visited.insert(g) {
                continue;
            }
            match self.node(g) {
                AddNode::Terminal(c) => {
                    if c != INFINITY {
                        values.insert(c);
                    }
                }
                AddNode::Inner { low, high, .. } => {
                    stack.push(low);
                    stack.push(high);
                }
            }
        }
        values
    }

    /// Value of `f` under an assignment given as a predicate on variable ids.
    pub fn eval(&self, f: AddRef, assignment: impl Fn(u32) -> bool) -> Cost {
        let mut current = f;
        loop {
            match self.node(current) {
                AddNode::Terminal(c) => return c,
                AddNode::Inner { variable, low, high } => {
                    current = if assignment(variable) { high } else { low };
                }
            }
        }
    }

    /// Number of nodes in the arena, including freed slots.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    pub fn live_nodes(&self) -> usize {
        self.unique.borrow().len()
    }

    /// Keeps `f` alive across [`collect_garbage`][Self::collect_garbage] until a matching [`unpin`][Self::unpin].
    pub fn pin(&self, f: AddRef) {
        *self.pinned.borrow_mut().entry(f).or_insert(0) += 1;
    }

    pub fn unpin(&self, f: AddRef) {
        let mut pinned = self.pinned.borrow_mut();
        if let Some(count) = pinned.get_mut(&f) {
            *count -= 1;
            if *count == 0 {
                pinned.remove(&f);
            }
        }
    }

    /// Frees every node not reachable from `roots` or a pinned diagram.
    /// Returns the number of dropped nodes.
    ///
    /// Any other `AddRef` held by the caller is invalid afterwards.
    pub fn collect_garbage(&self, roots: &[AddRef]) -> usize {
        self.cache.borrow_mut().clear();

        let mut alive = HashSet::new();
        let mut stack: Vec<AddRef> = roots.to_vec();
        stack.extend(self.pinned.borrow().keys().copied());
        while let Some(f) = stack.pop() {
            if !alive.insert(f) {
                continue;
            }
            if let AddNode::Inner { low, high, .. } = self.node(f) {
                stack.push(low);
                stack.push(high);
            }
        }

        let mut dropped = Vec::new();
        self.unique.borrow_mut().retain(|_, r| {
            let keep = alive.contains(r);
            if !keep {
                dropped.push(r.0);
            }
            keep
        });
        self.free.borrow_mut().extend_from_slice(&dropped);
        debug!("collect_garbage: kept {} weighted nodes, dropped {}", alive.len(), dropped.len());
        dropped.len()
    }
}
