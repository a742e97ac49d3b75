//! Symbolic transition systems and their construction.
//!
//! A [`TransitionSystem`] keeps one relation `T_a(X, X′)` per action, the
//! observation relation `Obs(X, L)` linking every encoded state to its label,
//! and the initial and goal sets over `X`. Every action also gets a weighted
//! relation with its weight on the edges and `INFINITY` elsewhere.
//!
//! Three construction modes are provided by [`Builder`]:
//!
//! - **direct**: every fact is one state, relations are assembled from the
//!   operator cubes without exploring anything;
//! - **incremental**: states are fact sets discovered layer by layer from the
//!   initial state;
//! - **game**: like incremental, but a step is a system action followed by an
//!   environment response, recorded in a game relation `G(X, S, E, X′)`.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use log::{debug, info};
use num_bigint::BigUint;

use crate::action::{Action, Player, Problem};
use crate::add::{AddRef, INFINITY};
use crate::bdd::Bdd;
use crate::cancel::CancelToken;
use crate::context::Context;
use crate::cost::{assign_weights, CostAdjuster, WeightTable};
use crate::domain::Domain;
use crate::encoder::{width_for, Encoder, LabelEncoder, Side, VarPool};
use crate::error::{Error, Result};
use crate::predicate::{PredicateTable, State};
use crate::reference::Ref;
use crate::stats::{count_to_usize, Diagnostics};
use crate::types::Var;

/// Two-player step relation.
///
/// System codes index [`system_actions`][Self::system_actions]. Environment
/// code 0 is "no intervention" and code `i > 0` is `environment_actions[i - 1]`.
#[derive(Debug, Clone)]
pub struct GameRelation {
    pub system: VarPool,
    pub environment: VarPool,
    /// `G(X, S, E, X′)`
    pub relation: Ref,
    pub system_actions: Vec<usize>,
    pub environment_actions: Vec<usize>,
}

impl GameRelation {
    /// Action index behind an environment code, `None` for "no intervention".
    pub fn environment_action(&self, code: u32) -> Option<usize> {
        match code {
            0 => None,
            i => self.environment_actions.get(i as usize - 1).copied(),
        }
    }
}

#[derive(Debug)]
pub struct TransitionSystem {
    ctx: Rc<Context>,
    actions: Vec<Action>,
    states: Encoder<State>,
    labels: LabelEncoder,
    relations: Vec<Ref>,
    weighted: Vec<AddRef>,
    observation: Ref,
    init: Ref,
    goal: Ref,
    game: Option<GameRelation>,
    diagnostics: Diagnostics,
}

impl TransitionSystem {
    pub fn context(&self) -> &Rc<Context> {
        &self.ctx
    }

    pub fn bdd(&self) -> &Bdd {
        self.ctx.bdd()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn states(&self) -> &Encoder<State> {
        &self.states
    }

    pub fn labels(&self) -> &LabelEncoder {
        &self.labels
    }

    /// `T_a(X, X′)`
    pub fn relation(&self, action: usize) -> Ref {
        self.relations[action]
    }

    /// `T_a` valued with the action weight.
    pub fn weighted(&self, action: usize) -> AddRef {
        self.weighted[action]
    }

    pub fn weight(&self, action: usize) -> u64 {
        self.actions[action].weight_or_default() as u64
    }

    /// `Obs(X, L)`
    pub fn observation(&self) -> Ref {
        self.observation
    }

    pub fn init(&self) -> Ref {
        self.init
    }

    pub fn goal(&self) -> Ref {
        self.goal
    }

    pub fn game(&self) -> Option<&GameRelation> {
        self.game.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn vars(&self, side: Side) -> &[Var] {
        self.states.pool().vars(side)
    }

    pub fn var_set(&self, side: Side) -> Ref {
        self.states.pool().var_set(self.bdd(), side)
    }

    pub fn pairs(&self) -> Vec<(Var, Var)> {
        self.states.pool().pairs().collect()
    }

    /// States reachable from `set` through action `a` in one step.
    pub fn image(&self, set: Ref, action: usize) -> Ref {
        let bdd = self.bdd();
        let next = bdd.and_exists(set, self.relations[action], self.var_set(Side::Current));
        bdd.swap(next, &self.pairs())
    }

    /// States reaching `set` through action `a` in one step.
    pub fn preimage(&self, set: Ref, action: usize) -> Ref {
        let bdd = self.bdd();
        let next = bdd.swap(set, &self.pairs());
        bdd.and_exists(next, self.relations[action], self.var_set(Side::Next))
    }

    /// The smallest encoded state in `f`.
    pub fn decode(&self, f: Ref) -> Result<&State> {
        self.states.decode(self.bdd(), f, Side::Current)
    }

    pub fn cube(&self, state: &State) -> Option<Ref> {
        self.states.encode(self.bdd(), state, Side::Current)
    }

    /// Explicit successor of `state` under action `a`, read back from the relation.
    pub fn successor(&self, state: &State, action: usize) -> Result<Option<&State>> {
        let Some(cube) = self.cube(state) else {
            return Ok(None);
        };
        let next = self.image(cube, action);
        if self.bdd().is_zero(next) {
            return Ok(None);
        }
        self.decode(next).map(Some)
    }

    /// Every diagram that must survive a garbage collection.
    pub fn roots(&self) -> Vec<Ref> {
        let mut roots = self.relations.clone();
        roots.extend([self.observation, self.init, self.goal]);
        if let Some(game) = &self.game {
            roots.push(game.relation);
        }
        roots
    }
}

/// Builds a [`TransitionSystem`] from a grounded [`Problem`].
pub struct Builder<'a> {
    ctx: Rc<Context>,
    domain: &'a dyn Domain,
    problem: Problem,
    cancel: CancelToken,
    collect_garbage: bool,
}

// Recorded successors, keyed by (state code, system action name, environment action name).
type EdgeMap = HashMap<(u32, String, Option<String>), u32>;

impl<'a> Builder<'a> {
    pub fn new(ctx: Rc<Context>, domain: &'a dyn Domain, problem: Problem) -> Self {
        Self {
            ctx,
            domain,
            problem,
            cancel: CancelToken::new(),
            collect_garbage: false,
        }
    }

    /// Attaches weights looked up by schema name and passed through `adjuster`.
    pub fn with_weights(mut self, table: &WeightTable, adjuster: &dyn CostAdjuster) -> Result<Self> {
        assign_weights(&mut self.problem, table, adjuster)?;
        Ok(self)
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Sweep the intermediate diagrams of the construction once it is done.
    pub fn collect_garbage(mut self, enabled: bool) -> Self {
        self.collect_garbage = enabled;
        self
    }

    /// Every fact is a state; relations are built from operator cubes.
    pub fn build_direct(self) -> Result<TransitionSystem> {
        let start = Instant::now();
        let ctx = self.ctx.clone();
        let bdd = ctx.bdd();
        let table = ctx.predicates();

        let states = Encoder::from_items(bdd, "x", table.iter().map(|(id, _)| State::singleton(id)), true)?;
        let labels = LabelEncoder::new(bdd, self.domain.label_slots())?;
        let fact = |id, side| states.encode(bdd, &State::singleton(id), side).unwrap_or(bdd.zero);

        let valid = bdd.apply_and(states.domain(bdd, Side::Current), states.domain(bdd, Side::Next));
        let mut relations = Vec::with_capacity(self.problem.actions.len());
        for action in &self.problem.actions {
            self.cancel.check()?;
            let pre = bdd.apply_and_many(action.pre.ids().iter().map(|&id| fact(id, Side::Current)));
            let add = bdd.apply_and_many(action.add.ids().iter().map(|&id| fact(id, Side::Next)));
            let del = bdd.apply_or_many(action.del.ids().iter().map(|&id| fact(id, Side::Next)));
            let rel = bdd.apply_and_many([pre, add, -del, valid]);
            debug!("relation of {}: {} node(s)", action, bdd.size(rel));
            relations.push(rel);
        }

        let observation = bdd.apply_or_many(states.items().iter().enumerate().map(|(code, s)| {
            let label = self.domain.label(s, table);
            bdd.apply_and(states.cube(bdd, code as u32, Side::Current), labels.cube(bdd, &label))
        }));

        let init = bdd.apply_or_many(self.problem.initial.ids().iter().map(|&id| fact(id, Side::Current)));
        let goal = if self.problem.goal.is_empty() {
            states.domain(bdd, Side::Current)
        } else {
            bdd.apply_or_many(self.problem.goal.ids().iter().map(|&id| fact(id, Side::Current)))
        };

        let diagnostics = Diagnostics {
            states: states.len(),
            layer_times: vec![start.elapsed()],
            ..Default::default()
        };
        self.finish(states, labels, relations, observation, init, goal, None, diagnostics)
    }

    /// Discovers the states reachable from the initial one, layer by layer.
    ///
    /// `capacity` bounds the number of states the encoder can address.
    pub fn build_incremental(self, capacity: usize) -> Result<TransitionSystem> {
        self.explore(capacity, false)
    }

    /// Like [`build_incremental`][Self::build_incremental], with environment responses.
    pub fn build_game(self, capacity: usize) -> Result<TransitionSystem> {
        self.explore(capacity, true)
    }

    fn explore(self, capacity: usize, game: bool) -> Result<TransitionSystem> {
        let ctx = self.ctx.clone();
        let bdd = ctx.bdd();
        let table = ctx.predicates();
        let actions = &self.problem.actions;

        let mut states = Encoder::with_capacity(bdd, "x", capacity, true)?;
        let labels = LabelEncoder::new(bdd, self.domain.label_slots())?;

        let (system_actions, environment_actions): (Vec<usize>, Vec<usize>) = if game {
            (0..actions.len()).partition(|&a| actions[a].player == Player::System)
        } else {
            ((0..actions.len()).collect(), Vec::new())
        };
        let pools = if game {
            let system = VarPool::new(bdd, "s", width_for(system_actions.len()), false)?;
            let environment = VarPool::new(bdd, "e", width_for(environment_actions.len() + 1), false)?;
            Some((system, environment))
        } else {
            None
        };

        let x_vars = states.pool().vars(Side::Current).to_vec();
        let mut relations = vec![bdd.zero; actions.len()];
        let mut game_relation = bdd.zero;
        let mut edges = EdgeMap::new();

        let (init_code, _) = states.insert(self.problem.initial.clone())?;
        let init = states.cube(bdd, init_code, Side::Current);
        let init_label = self.domain.label(&self.problem.initial, table);
        let mut observation = bdd.apply_and(init, labels.cube(bdd, &init_label));

        let mut diagnostics = Diagnostics::default();
        let mut open = init;
        let mut closed = bdd.zero;

        loop {
            self.cancel.check()?;
            let start = Instant::now();

            open = bdd.apply_diff(open, closed);
            if bdd.is_zero(open) {
                break;
            }
            closed = bdd.apply_or(closed, open);

            let codes: Vec<u32> = bdd.cubes(open, &x_vars).map(|bits| VarPool::code_of(&bits)).collect();
            let mut next = bdd.zero;
            for code in codes {
                let state = states
                    .item(code)
                    .cloned()
                    .ok_or_else(|| Error::UnknownCode {
                        pool: states.pool().name().to_string(),
                    })?;
                let from = states.cube(bdd, code, Side::Current);

                for (si, &a) in system_actions.iter().enumerate() {
                    let action = &actions[a];
                    if !self.domain.admits(action, &state, table) {
                        continue;
                    }
                    let mid = action.successor(&state);

                    // Environment responses: none, then every admitted environment action.
                    let mut responses = vec![(0u32, None, mid.clone())];
                    if game {
                        for (ei, &e) in environment_actions.iter().enumerate() {
                            let response = &actions[e];
                            if self.domain.admits(response, &mid, table) {
                                responses.push((ei as u32 + 1, Some(e), response.successor(&mid)));
                            }
                        }
                    }

                    for (ecode, env, succ) in responses {
                        let key = (code, action.name.clone(), env.map(|e| actions[e].name.clone()));
                        let (to, new) = states.insert(succ.clone())?;
                        if let Some(&first) = edges.get(&key) {
                            if first != to {
                                return Err(conflict(&states, table, action, code, first, to));
                            }
                        }
                        edges.insert(key, to);

                        if new {
                            let label = self.domain.label(&succ, table);
                            let cube = states.cube(bdd, to, Side::Current);
                            observation = bdd.apply_or(observation, bdd.apply_and(cube, labels.cube(bdd, &label)));
                            debug!("new state #{}: {}", to, succ.display(table));
                        }

                        let edge = bdd.apply_and(from, states.cube(bdd, to, Side::Next));
                        relations[a] = bdd.apply_or(relations[a], edge);
                        if let Some((system, environment)) = &pools {
                            let step = bdd.apply_and_many([
                                edge,
                                system.cube(bdd, si as u32, Side::Current),
                                environment.cube(bdd, ecode, Side::Current),
                            ]);
                            game_relation = bdd.apply_or(game_relation, step);
                        }
                        next = bdd.apply_or(next, states.cube(bdd, to, Side::Current));
                    }
                }
            }

            let elapsed = start.elapsed();
            info!(
                "layer {}: expanded {} state(s), {} discovered so far in {:?}",
                diagnostics.layer_times.len(),
                count_to_usize(&bdd.sat_count(open, &x_vars)),
                states.len(),
                elapsed
            );
            diagnostics.layer_times.push(elapsed);
            open = next;
        }

        let goal = bdd.apply_or_many(
            states
                .items()
                .iter()
                .enumerate()
                .filter(|(_, s)| s.is_superset(&self.problem.goal))
                .map(|(code, _)| states.cube(bdd, code as u32, Side::Current)),
        );
        diagnostics.states = states.len();

        let game = pools.map(|(system, environment)| GameRelation {
            system,
            environment,
            relation: game_relation,
            system_actions,
            environment_actions,
        });
        self.finish(states, labels, relations, observation, init, goal, game, diagnostics)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        self,
        states: Encoder<State>,
        labels: LabelEncoder,
        relations: Vec<Ref>,
        observation: Ref,
        init: Ref,
        goal: Ref,
        game: Option<GameRelation>,
        mut diagnostics: Diagnostics,
    ) -> Result<TransitionSystem> {
        let bdd = self.ctx.bdd();
        let add = self.ctx.add();

        let mut edge_vars: Vec<Var> = states.pool().vars(Side::Current).to_vec();
        edge_vars.extend_from_slice(states.pool().vars(Side::Next));
        edge_vars.sort();
        let edges: BigUint = relations.iter().map(|&rel| bdd.sat_count(rel, &edge_vars)).sum();

        let weighted = self
            .problem
            .actions
            .iter()
            .zip(&relations)
            .map(|(action, &rel)| add.from_bdd(bdd, rel, action.weight_or_default() as u64, INFINITY))
            .collect();

        diagnostics.variables = bdd.num_vars();
        diagnostics.edges = count_to_usize(&edges);
        info!(
            "transition system: {} state(s), {} edge(s), {} variable(s)",
            diagnostics.states, diagnostics.edges, diagnostics.variables
        );

        let ts = TransitionSystem {
            ctx: self.ctx.clone(),
            actions: self.problem.actions,
            states,
            labels,
            relations,
            weighted,
            observation,
            init,
            goal,
            game,
            diagnostics,
        };
        for &w in &ts.weighted {
            add.pin(w);
        }
        if self.collect_garbage {
            bdd.collect_garbage(&ts.roots());
            add.collect_garbage(&[]);
        }
        Ok(ts)
    }
}

impl Drop for TransitionSystem {
    fn drop(&mut self) {
        let add = self.ctx.add();
        for &w in &self.weighted {
            add.unpin(w);
        }
    }
}

fn conflict(
    states: &Encoder<State>,
    table: &PredicateTable,
    action: &Action,
    from: u32,
    first: u32,
    second: u32,
) -> Error {
    let show = |code: u32| {
        states
            .item(code)
            .map(|s| s.display(table).to_string())
            .unwrap_or_else(|| format!("#{}", code))
    };
    Error::ConflictingEdge {
        action: action.name.clone(),
        from: show(from),
        first: show(first),
        second: show(second),
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::action::{GroundedOperator, GroundedTask};
    use crate::domain::FactDomain;
    use crate::error::ErrorKind;

    // Agent on a line a - b - c.
    fn line() -> GroundedTask {
        GroundedTask {
            facts: vec!["(at a)".into(), "(at b)".into(), "(at c)".into()],
            operators: vec![
                GroundedOperator::new("(move a b)", ["(at a)"], ["(at b)"], ["(at a)"]),
                GroundedOperator::new("(move b c)", ["(at b)"], ["(at c)"], ["(at b)"]),
                GroundedOperator::new("(move b a)", ["(at b)"], ["(at a)"], ["(at b)"]),
            ],
            initial: vec!["(at a)".into()],
            goal: vec!["(at c)".into()],
        }
    }

    #[test]
    fn test_direct_relations() {
        let (ctx, problem) = Context::from_task(&line(), 16).unwrap();
        let domain = FactDomain::new(ctx.predicates());
        let ts = Builder::new(ctx.clone(), &domain, problem).build_direct().unwrap();

        assert_eq!(ts.diagnostics().edges, 3);
        assert_eq!(ts.diagnostics().states, 3);

        let table = ctx.predicates();
        let id = |f: &str| table.id(f).unwrap().unwrap();
        let a = State::singleton(id("(at a)"));
        let b = State::singleton(id("(at b)"));
        let c = State::singleton(id("(at c)"));

        assert_eq!(ts.successor(&a, 0).unwrap(), Some(&b));
        assert_eq!(ts.successor(&a, 1).unwrap(), None);
        assert_eq!(ts.successor(&b, 1).unwrap(), Some(&c));
        assert_eq!(ts.successor(&b, 2).unwrap(), Some(&a));

        let bdd = ts.bdd();
        assert_eq!(ts.init(), ts.cube(&a).unwrap());
        assert_eq!(ts.goal(), ts.cube(&c).unwrap());
        assert_eq!(ts.preimage(ts.goal(), 1), ts.cube(&b).unwrap());
        assert!(bdd.is_zero(ts.preimage(ts.goal(), 0)));
    }

    #[test]
    fn test_observation_relates_each_state_to_its_label() {
        let (ctx, problem) = Context::from_task(&line(), 16).unwrap();
        let domain = FactDomain::new(ctx.predicates());
        let ts = Builder::new(ctx.clone(), &domain, problem).build_direct().unwrap();
        let bdd = ts.bdd();

        let at_b = State::singleton(ctx.predicates().id("(at b)").unwrap().unwrap());
        let b = ts.cube(&at_b).unwrap();
        let label = bdd.exists(bdd.apply_and(ts.observation(), b), ts.var_set(Side::Current));
        assert_eq!(label, ts.labels().cube(bdd, &vec![None, Some(0), None]));
        assert_eq!(ts.labels().decode(bdd, label), Some(domain.label(&at_b, ctx.predicates())));
        for (fact, holds) in [("(at a)", false), ("(at b)", true), ("(at c)", false)] {
            let atom = ts.labels().atom(bdd, fact).unwrap();
            assert_eq!(bdd.is_implies(label, atom), holds, "{}", fact);
        }
    }

    #[test]
    fn test_weighted_relation() {
        let (ctx, problem) = Context::from_task(&line(), 16).unwrap();
        let domain = FactDomain::new(ctx.predicates());
        let weights = WeightTable::new().with("move", 5);
        let ts = Builder::new(ctx.clone(), &domain, problem)
            .with_weights(&weights, &crate::cost::Unadjusted)
            .unwrap()
            .build_direct()
            .unwrap();
        let add = ctx.add();
        assert_eq!(add.terminals(ts.weighted(0)).into_iter().collect::<Vec<_>>(), vec![5]);
        assert_eq!(ts.weight(1), 5);
    }

    #[test]
    fn test_missing_weight() {
        let (ctx, problem) = Context::from_task(&line(), 16).unwrap();
        let domain = FactDomain::new(ctx.predicates());
        let weights = WeightTable::new().with("grasp", 1);
        let err = Builder::new(ctx.clone(), &domain, problem)
            .with_weights(&weights, &crate::cost::Unadjusted)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    // Two counters, each incremented independently up to 2.
    fn counters() -> GroundedTask {
        let mut task = GroundedTask {
            facts: vec![],
            operators: vec![],
            initial: vec!["(p 0)".into(), "(q 0)".into()],
            goal: vec!["(p 2)".into(), "(q 2)".into()],
        };
        for c in ["p", "q"] {
            for i in 0..3 {
                task.facts.push(format!("({} {})", c, i));
            }
            for i in 0..2 {
                task.operators.push(GroundedOperator::new(
                    format!("(inc-{} {})", c, i),
                    [format!("({} {})", c, i)],
                    [format!("({} {})", c, i + 1)],
                    [format!("({} {})", c, i)],
                ));
            }
        }
        task
    }

    #[test]
    fn test_incremental_discovers_product_of_counters() {
        let (ctx, problem) = Context::from_task(&counters(), 16).unwrap();
        let domain = FactDomain::new(ctx.predicates());
        let ts = Builder::new(ctx.clone(), &domain, problem.clone())
            .build_incremental(16)
            .unwrap();

        // 3 x 3 states, 2 x 2 x 3 edges.
        assert_eq!(ts.diagnostics().states, 9);
        assert_eq!(ts.diagnostics().edges, 12);
        // Distance 4 to the far corner: 5 expanded layers.
        assert_eq!(ts.diagnostics().layers(), 5);

        // Every encoded state has exactly the expected successor per applicable action.
        let table = ctx.predicates();
        for state in ts.states().items() {
            for (a, action) in problem.actions.iter().enumerate() {
                let expected = action.is_applicable(state, table).then(|| action.successor(state));
                assert_eq!(ts.successor(state, a).unwrap().cloned(), expected);
            }
        }

        let goal = ts.decode(ts.goal()).unwrap();
        assert_eq!(goal.display(table).to_string(), "{(p 2), (q 2)}");
    }

    #[test]
    fn test_incremental_overflow() {
        let (ctx, problem) = Context::from_task(&counters(), 16).unwrap();
        let domain = FactDomain::new(ctx.predicates());
        let err = Builder::new(ctx.clone(), &domain, problem).build_incremental(4).unwrap_err();
        assert!(matches!(err, Error::EncodingOverflow { .. }));
    }

    #[test]
    fn test_conflicting_edge() {
        let mut task = line();
        task.operators
            .push(GroundedOperator::new("(move a b)", ["(at a)"], ["(at c)"], ["(at a)"]));
        let (ctx, problem) = Context::from_task(&task, 16).unwrap();
        let domain = FactDomain::new(ctx.predicates());
        let err = Builder::new(ctx.clone(), &domain, problem).build_incremental(8).unwrap_err();
        assert!(matches!(err, Error::ConflictingEdge { .. }));
        assert_eq!(err.kind(), ErrorKind::InternalInvariant);
    }

    #[test]
    fn test_cancelled_build() {
        let (ctx, problem) = Context::from_task(&counters(), 16).unwrap();
        let domain = FactDomain::new(ctx.predicates());
        let token = CancelToken::new();
        token.cancel();
        let err = Builder::new(ctx.clone(), &domain, problem)
            .with_cancel(token)
            .build_incremental(16)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_game_relation() {
        let mut task = line();
        task.operators.push(
            GroundedOperator::new("(push b a)", ["(at b)"], ["(at a)"], ["(at b)"]).owned_by(Player::Environment),
        );
        let (ctx, problem) = Context::from_task(&task, 16).unwrap();
        let domain = FactDomain::new(ctx.predicates());
        let ts = Builder::new(ctx.clone(), &domain, problem)
            .collect_garbage(true)
            .build_game(8)
            .unwrap();
        let bdd = ts.bdd();
        let game = ts.game().unwrap();

        assert_eq!(game.system_actions, vec![0, 1, 2]);
        assert_eq!(game.environment_actions, vec![3]);
        assert_eq!(game.environment_action(0), None);
        assert_eq!(game.environment_action(1), Some(3));

        // From a, (move a b) ends in b, or back in a when pushed.
        let a = ts.init();
        let step = bdd.apply_and_many([a, game.system.cube(bdd, 0, Side::Current)]);
        let outcomes = bdd.exists(
            bdd.apply_and(game.relation, step),
            bdd.apply_and_many([
                ts.var_set(Side::Current),
                game.system.var_set(bdd, Side::Current),
                game.environment.var_set(bdd, Side::Current),
            ]),
        );
        let outcomes = bdd.swap(outcomes, &ts.pairs());
        let table = ctx.predicates();
        let b = ts.cube(&State::singleton(table.id("(at b)").unwrap().unwrap())).unwrap();
        assert_eq!(outcomes, bdd.apply_or(a, b));

        // The cooperative relation of (move a b) holds both outcomes.
        assert_eq!(ts.image(a, 0), outcomes);
        // Environment actions have no relation of their own.
        assert!(bdd.is_zero(ts.relation(3)));
    }
}
