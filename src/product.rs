//! Lazy composition of a transition system with one or more automata.
//!
//! Product states are conjunctions of a TS cube over `X` and one cube per
//! automaton over its `Q` pool; they are never enumerated. The automata step
//! `A(X′, Q, Q′)` reads the label of the *next* TS state through the
//! observation relation and is conjoined with a TS relation only inside
//! [`Product::image`] and [`Product::preimage`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use log::debug;

use crate::add::{AddRef, Cost, INFINITY};
use crate::automaton::{Automaton, SymbolicAutomaton};
use crate::bdd::Bdd;
use crate::config::Semantics;
use crate::encoder::{Side, VarPool};
use crate::error::{Error, Result};
use crate::predicate::{PredicateTable, State};
use crate::reference::Ref;
use crate::transition::TransitionSystem;
use crate::types::Var;

/// A decoded product state.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ProductState {
    pub state: State,
    pub automata: Vec<u32>,
}

impl ProductState {
    pub fn display<'a>(&'a self, table: &'a PredicateTable) -> impl fmt::Display + 'a {
        ProductStateDisplay { state: self, table }
    }
}

struct ProductStateDisplay<'a> {
    state: &'a ProductState,
    table: &'a PredicateTable,
}

impl fmt::Display for ProductStateDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} q{:?}", self.state.state.display(self.table), self.state.automata)
    }
}

pub struct Product<'a> {
    ts: &'a TransitionSystem,
    automata: Vec<SymbolicAutomaton>,
    semantics: Semantics,
    /// `A(X′, Q, Q′)`
    step: Ref,
    weighted_step: AddRef,
    pairs: Vec<(Var, Var)>,
    state_vars: Vec<Var>,
    x_ids: BTreeSet<u32>,
    q_ids: BTreeSet<u32>,
    next_to_current: HashMap<u32, u32>,
    init: Ref,
    accepting: Ref,
    goal: Ref,
}

impl<'a> Product<'a> {
    pub fn new(ts: &'a TransitionSystem, automata: impl IntoIterator<Item = Automaton>, semantics: Semantics) -> Result<Self> {
        let bdd = ts.bdd();
        let automata = automata
            .into_iter()
            .map(|dfa| SymbolicAutomaton::new(bdd, ts.labels(), dfa))
            .collect::<Result<Vec<_>>>()?;

        let mut pairs = ts.pairs();
        let mut state_vars = ts.vars(Side::Current).to_vec();
        for a in &automata {
            pairs.extend(a.pool().pairs());
            state_vars.extend_from_slice(a.pool().vars(Side::Current));
        }
        state_vars.sort();

        let x_ids = ts.vars(Side::Current).iter().map(|v| v.id()).collect();
        let q_ids = automata
            .iter()
            .flat_map(|a| a.pool().vars(Side::Current).iter().map(|v| v.id()))
            .collect();
        let next_to_current = pairs.iter().map(|&(x, xn)| (xn.id(), x.id())).collect();

        let observation_next = bdd.swap(ts.observation(), &ts.pairs());
        let step = automata_step(bdd, ts, &automata, semantics, observation_next);
        let current_step = automata_step(bdd, ts, &automata, semantics, ts.observation());

        // The automata first read the label of the initial TS state.
        let q_initial = bdd.apply_and_many(automata.iter().map(|a| a.initial()));
        let q_pairs: Vec<(Var, Var)> = automata.iter().flat_map(|a| a.pool().pairs()).collect();
        let q_current = bdd.var_set(q_pairs.iter().map(|&(q, _)| q));
        let init = bdd.and_exists(bdd.apply_and(ts.init(), q_initial), current_step, q_current);
        let init = bdd.swap(init, &q_pairs);

        let accepting = bdd.apply_and_many(automata.iter().map(|a| a.accepting()));
        let goal = bdd.apply_and(ts.goal(), accepting);
        let add = ts.context().add();
        let weighted_step = add.from_bdd(bdd, step, 0, INFINITY);
        add.pin(weighted_step);
        add.collect_garbage(&[]);

        debug!(
            "product of {} automata: step of {} node(s), init of {} node(s)",
            automata.len(),
            bdd.size(step),
            bdd.size(init)
        );

        Ok(Self {
            ts,
            automata,
            semantics,
            step,
            weighted_step,
            pairs,
            state_vars,
            x_ids,
            q_ids,
            next_to_current,
            init,
            accepting,
            goal,
        })
    }

    pub fn ts(&self) -> &'a TransitionSystem {
        self.ts
    }

    pub fn bdd(&self) -> &'a Bdd {
        self.ts.bdd()
    }

    pub fn automata(&self) -> &[SymbolicAutomaton] {
        &self.automata
    }

    pub fn semantics(&self) -> Semantics {
        self.semantics
    }

    pub fn num_actions(&self) -> usize {
        self.ts.actions().len()
    }

    /// `A(X′, Q, Q′)`
    pub fn step(&self) -> Ref {
        self.step
    }

    pub fn init(&self) -> Ref {
        self.init
    }

    /// Product states where every automaton accepts.
    pub fn accepting(&self) -> Ref {
        self.accepting
    }

    /// TS goal states where every automaton accepts.
    pub fn goal(&self) -> Ref {
        self.goal
    }

    /// Variables of a product state (`X ∪ Q`), in order.
    pub fn state_vars(&self) -> &[Var] {
        &self.state_vars
    }

    pub fn pairs(&self) -> &[(Var, Var)] {
        &self.pairs
    }

    pub fn var_set(&self, side: Side) -> Ref {
        let bdd = self.bdd();
        match side {
            Side::Current => bdd.var_set(self.state_vars.iter().copied()),
            Side::Next => bdd.var_set(self.pairs.iter().map(|&(_, next)| next)),
        }
    }

    fn q_set(&self, side: Side) -> Ref {
        let bdd = self.bdd();
        bdd.apply_and_many(self.automata.iter().map(|a| a.pool().var_set(bdd, side)))
    }

    /// Successors of `set` through action `a`.
    pub fn image(&self, set: Ref, action: usize) -> Ref {
        let bdd = self.bdd();
        let moved = bdd.and_exists(set, self.ts.relation(action), self.ts.var_set(Side::Current));
        let stepped = bdd.and_exists(moved, self.step, self.q_set(Side::Current));
        bdd.swap(stepped, &self.pairs)
    }

    /// Successors of `set` through any action.
    pub fn image_all(&self, set: Ref) -> Ref {
        let bdd = self.bdd();
        bdd.apply_or_many((0..self.num_actions()).map(|a| self.image(set, a)))
    }

    /// Predecessors of `set` through action `a`.
    pub fn preimage(&self, set: Ref, action: usize) -> Ref {
        let bdd = self.bdd();
        let next = bdd.swap(set, &self.pairs);
        let stepped = bdd.and_exists(next, self.step, self.q_set(Side::Next));
        bdd.and_exists(stepped, self.ts.relation(action), self.ts.var_set(Side::Next))
    }

    /// Min-plus image of a cost map over product states.
    ///
    /// `frontier` maps product states to costs (`INFINITY` elsewhere); the
    /// result maps each successor to the cheapest cost of reaching it in one step.
    pub fn weighted_image(&self, frontier: AddRef) -> AddRef {
        let add = self.ts.context().add();
        let mut result = add.infinity();
        for a in 0..self.num_actions() {
            let moved = add.min_abstract(add.plus(frontier, self.ts.weighted(a)), &self.x_ids);
            let stepped = add.min_abstract(add.plus(moved, self.weighted_step), &self.q_ids);
            result = add.minimum(result, add.rename(stepped, &self.next_to_current));
        }
        result
    }

    /// Admissible and consistent cost-to-go estimate over the automata pools.
    ///
    /// Each automaton contributes `w_min` per transition still needed to
    /// accept; contributions are combined with `max` under conjunctive
    /// semantics and summed under prioritized semantics. Automaton states with
    /// no way to acceptance are valued `INFINITY`.
    pub fn heuristic(&self, w_min: Cost) -> AddRef {
        let bdd = self.bdd();
        let add = self.ts.context().add();
        let mut h = add.constant(0);
        for a in &self.automata {
            let mut h_a = add.infinity();
            for (q, d) in a.automaton().distance_to_accept().into_iter().enumerate() {
                let value = d.map_or(INFINITY, |d| (d as Cost).saturating_mul(w_min));
                let cube = a.pool().cube(bdd, q as u32, Side::Current);
                h_a = add.minimum(h_a, add.from_bdd(bdd, cube, value, INFINITY));
            }
            h = match self.semantics {
                Semantics::Conjunctive => add.maximum(h, h_a),
                Semantics::Prioritized => add.plus(h, h_a),
            };
        }
        h
    }

    /// The lexicographically smallest product state of `set`, as a cube.
    pub fn pick(&self, set: Ref) -> Option<Ref> {
        let bdd = self.bdd();
        let bits = bdd.pick_cube(set, &self.state_vars)?;
        Some(bdd.assignment_cube(&self.state_vars, bits))
    }

    /// The smallest product state of `set`, decoded.
    pub fn decode(&self, set: Ref) -> Result<ProductState> {
        let unknown = || Error::UnknownCode {
            pool: self.ts.states().pool().name().to_string(),
        };
        let bits = self.bdd().pick_cube(set, &self.state_vars).ok_or_else(unknown)?;
        let value: HashMap<u32, bool> = self.state_vars.iter().zip(bits).map(|(v, b)| (v.id(), b)).collect();
        let code = |vars: &[Var]| {
            let bits: Vec<bool> = vars.iter().map(|v| value.get(&v.id()).copied().unwrap_or(false)).collect();
            VarPool::code_of(&bits)
        };

        let state = self
            .ts
            .states()
            .item(code(self.ts.vars(Side::Current)))
            .cloned()
            .ok_or_else(unknown)?;
        let automata = self
            .automata
            .iter()
            .map(|a| code(a.pool().vars(Side::Current)))
            .collect();
        Ok(ProductState { state, automata })
    }

    pub fn roots(&self) -> Vec<Ref> {
        let mut roots = vec![self.step, self.init, self.accepting, self.goal];
        for a in &self.automata {
            roots.extend([a.delta(), a.initial(), a.accepting()]);
        }
        roots
    }
}

impl Drop for Product<'_> {
    fn drop(&mut self) {
        self.ts.context().add().unpin(self.weighted_step);
    }
}

// Conjunction of the per-automaton steps reading labels through `observation(X?, L)`.
fn automata_step(
    bdd: &Bdd,
    ts: &TransitionSystem,
    automata: &[SymbolicAutomaton],
    semantics: Semantics,
    observation: Ref,
) -> Ref {
    let labels = ts.labels().var_set(bdd);
    let steps: Vec<Ref> = automata
        .iter()
        .map(|a| bdd.and_exists(observation, a.delta(), labels))
        .collect();

    match semantics {
        Semantics::Conjunctive => bdd.apply_and_many(steps),
        Semantics::Prioritized => {
            let mut result = bdd.one;
            let mut before_accept = bdd.one;
            for (a, &step) in automata.iter().zip(&steps) {
                let active = bdd.apply_and(before_accept, -a.accepting());
                let moves = bdd.apply_ite(active, step, a.frozen(bdd));
                result = bdd.apply_and(result, moves);
                before_accept = bdd.apply_and(before_accept, a.accepting());
            }
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::action::{GroundedOperator, GroundedTask};
    use crate::automaton::Guard;
    use crate::context::Context;
    use crate::domain::FactDomain;
    use crate::transition::Builder;

    // Agent on a cycle a -> b -> c -> a.
    fn cycle() -> TransitionSystem {
        let task = GroundedTask {
            facts: vec!["(at a)".into(), "(at b)".into(), "(at c)".into()],
            operators: vec![
                GroundedOperator::new("(move a b)", ["(at a)"], ["(at b)"], ["(at a)"]),
                GroundedOperator::new("(move b c)", ["(at b)"], ["(at c)"], ["(at b)"]),
                GroundedOperator::new("(move c a)", ["(at c)"], ["(at a)"], ["(at c)"]),
            ],
            initial: vec!["(at a)".into()],
            goal: vec![],
        };
        let (ctx, problem) = Context::from_task(&task, 16).unwrap();
        let domain = FactDomain::new(ctx.predicates());
        Builder::new(ctx.clone(), &domain, problem).build_direct().unwrap()
    }

    fn at(ts: &TransitionSystem, fact: &str) -> State {
        State::singleton(ts.context().predicates().id(fact).unwrap().unwrap())
    }

    #[test]
    fn test_init_reads_initial_label() {
        let ts = cycle();
        let product = Product::new(&ts, [Automaton::eventually("f", "(at a)")], Semantics::Conjunctive).unwrap();
        let init = product.decode(product.init()).unwrap();
        assert_eq!(init.state, at(&ts, "(at a)"));
        assert_eq!(init.automata, vec![1]);
    }

    #[test]
    fn test_image_advances_automaton() {
        let ts = cycle();
        let product = Product::new(&ts, [Automaton::eventually("f", "(at c)")], Semantics::Conjunctive).unwrap();
        let bdd = ts.bdd();

        let s0 = product.init();
        assert!(bdd.is_zero(product.image(s0, 1)));
        let s1 = product.image(s0, 0);
        let decoded = product.decode(s1).unwrap();
        assert_eq!((decoded.state, decoded.automata), (at(&ts, "(at b)"), vec![0]));

        let s2 = product.image_all(s1);
        let decoded = product.decode(s2).unwrap();
        assert_eq!((decoded.state, decoded.automata), (at(&ts, "(at c)"), vec![1]));
        assert!(!bdd.is_zero(bdd.apply_and(s2, product.goal())));

        assert!(bdd.is_implies(s1, product.preimage(s2, 1)));
        assert!(bdd.is_zero(product.preimage(s2, 0)));
    }

    #[test]
    fn test_prioritized_freezes_later_automata() {
        let ts = cycle();
        let first = Automaton::eventually("first", "(at b)");
        let second = Automaton::eventually("second", "(at a)");
        let product = Product::new(&ts, [first, second], Semantics::Prioritized).unwrap();

        // At a: the first automaton is active and does not move, the second is frozen at 0.
        let init = product.decode(product.init()).unwrap();
        assert_eq!(init.automata, vec![0, 0]);

        let s1 = product.image(product.init(), 0);
        assert_eq!(product.decode(s1).unwrap().automata, vec![1, 0]);
        let s2 = product.image(s1, 1);
        assert_eq!(product.decode(s2).unwrap().automata, vec![1, 0]);
        let s3 = product.image(s2, 2);
        assert_eq!(product.decode(s3).unwrap().automata, vec![1, 1]);
    }

    #[test]
    fn test_weighted_image_matches_boolean_image() {
        let ts = cycle();
        let product = Product::new(&ts, [Automaton::eventually("f", "(at c)")], Semantics::Conjunctive).unwrap();
        let bdd = ts.bdd();
        let add = ts.context().add();

        let frontier = add.from_bdd(bdd, product.init(), 7, INFINITY);
        let next = product.weighted_image(frontier);
        assert_eq!(add.finite(bdd, next), product.image_all(product.init()));
        assert_eq!(add.terminals(next).into_iter().collect::<Vec<_>>(), vec![8]);
    }

    fn h_value(p: &Product, h: AddRef, codes: &[u32]) -> Cost {
        let mut bits = HashMap::new();
        for (a, &code) in p.automata().iter().zip(codes) {
            let vars = a.pool().vars(Side::Current);
            for (j, v) in vars.iter().enumerate() {
                bits.insert(v.id(), (code >> (vars.len() - 1 - j)) & 1 == 1);
            }
        }
        p.ts().context().add().eval(h, |v| bits.get(&v).copied().unwrap_or(false))
    }

    #[test]
    fn test_heuristic() {
        let ts = cycle();
        let seq = Automaton::new("seq", 3, 0)
            .accepting([2])
            .transition(0, Guard::atom("(at b)"), 1)
            .transition(0, Guard::not(Guard::atom("(at b)")), 0)
            .transition(1, Guard::atom("(at c)"), 2)
            .transition(1, Guard::not(Guard::atom("(at c)")), 1)
            .transition(2, Guard::True, 2);
        let once = Automaton::eventually("once", "(at a)");

        let conj = Product::new(&ts, [seq.clone(), once.clone()], Semantics::Conjunctive).unwrap();
        let h = conj.heuristic(3);
        assert_eq!(h_value(&conj, h, &[0, 0]), 6);
        assert_eq!(h_value(&conj, h, &[1, 1]), 3);
        assert_eq!(h_value(&conj, h, &[2, 1]), 0);
        let add = ts.context().add();
        assert_eq!(add.terminals(h).into_iter().collect::<Vec<_>>(), vec![0, 3, 6]);

        let prio = Product::new(&ts, [seq, once], Semantics::Prioritized).unwrap();
        let h = prio.heuristic(3);
        assert_eq!(h_value(&prio, h, &[0, 0]), 9);
        assert_eq!(h_value(&prio, h, &[1, 1]), 3);
    }
}
