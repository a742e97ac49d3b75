//! Uniform-cost search with a weighted distance diagram.
//!
//! Product states are kept in buckets keyed by `(f, g)`: `g` is the cost
//! so far and `f = g + h` for a heuristic `h` (zero here, see
//! [`astar`][super::astar]). The smallest bucket is expanded first; each
//! expansion is one *batch*. Distances live in a weighted diagram that is
//! only ever lowered, and relaxed states are sorted into buckets by the
//! terminals of the relaxed diagram. Zero-weight edges put states back into
//! the current bucket, which is popped again next.

use std::collections::BTreeMap;
use std::time::Instant;

use log::{debug, info};

use super::{plan_step, Plan, PlanStep, SearchOutcome};
use crate::add::{AddRef, Cost, INFINITY};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::product::Product;
use crate::reference::Ref;
use crate::stats::{count_to_usize, SearchStats};

pub fn search(product: &Product, cancel: &CancelToken) -> Result<SearchOutcome> {
    best_first(product, None, cancel)
}

/// Buckets of product states keyed by `(f, g)`.
struct Buckets<'p, 'a> {
    product: &'p Product<'a>,
    // Heuristic level sets, one per finite value.
    levels: Vec<(Cost, Ref)>,
    queue: BTreeMap<(Cost, Cost), Ref>,
}

impl<'p, 'a> Buckets<'p, 'a> {
    fn new(product: &'p Product<'a>, heuristic: Option<AddRef>) -> Self {
        let bdd = product.bdd();
        let levels = match heuristic {
            Some(h) => {
                let add = product.ts().context().add();
                add.terminals(h)
                    .into_iter()
                    .map(|value| (value, add.to_bdd(bdd, h, |c| c == value)))
                    .collect()
            }
            None => vec![(0, bdd.one)],
        };
        Self {
            product,
            levels,
            queue: BTreeMap::new(),
        }
    }

    /// Files `set`, reached at cost `g`, under `(g + h, g)`. States with an
    /// infinite estimate cannot reach the goal and are dropped.
    fn push(&mut self, g: Cost, set: Ref) {
        let bdd = self.product.bdd();
        for &(h, level) in &self.levels {
            let part = bdd.apply_and(set, level);
            if bdd.is_zero(part) {
                continue;
            }
            let entry = self.queue.entry((g.saturating_add(h), g)).or_insert(bdd.zero);
            *entry = bdd.apply_or(*entry, part);
        }
    }

    fn pop(&mut self) -> Option<((Cost, Cost), Ref)> {
        self.queue.pop_first()
    }
}

pub(super) fn best_first(product: &Product, heuristic: Option<AddRef>, cancel: &CancelToken) -> Result<SearchOutcome> {
    let outcome = expand(product, heuristic, cancel);
    // Frontiers, distances and the heuristic are dead once the search returns.
    let dropped = product.ts().context().add().collect_garbage(&[]);
    debug!("best-first: released {} weighted node(s)", dropped);
    outcome
}

fn expand(product: &Product, heuristic: Option<AddRef>, cancel: &CancelToken) -> Result<SearchOutcome> {
    let bdd = product.bdd();
    let add = product.ts().context().add();
    let mut stats = SearchStats::default();

    let mut buckets = Buckets::new(product, heuristic);
    buckets.push(0, product.init());
    let mut dist = add.from_bdd(bdd, product.init(), 0, INFINITY);
    let mut closed = bdd.zero;
    let mut batches: Vec<(Cost, Ref)> = Vec::new();

    while let Some(((f, g), set)) = buckets.pop() {
        cancel.check()?;
        let start = Instant::now();

        let set = bdd.apply_diff(set, closed);
        if bdd.is_zero(set) {
            continue;
        }
        batches.push((g, set));
        stats.iterations += 1;

        let hit = bdd.apply_and(set, product.goal());
        if !bdd.is_zero(hit) {
            stats.visited = count_to_usize(&bdd.sat_count(bdd.apply_or(closed, set), product.state_vars()));
            let steps = reconstruct(product, &batches, hit)?;
            info!(
                "best-first: plan of {} step(s), cost {}, after {} batch(es)",
                steps.len(),
                g,
                stats.iterations
            );
            return Ok(SearchOutcome::Found(Plan { steps, cost: g, stats }));
        }
        closed = bdd.apply_or(closed, set);

        let frontier = add.from_bdd(bdd, set, g, INFINITY);
        let relaxed = product.weighted_image(frontier);
        for value in add.terminals(relaxed) {
            let reached = add.to_bdd(bdd, relaxed, |c| c == value);
            let worse = add.to_bdd(bdd, dist, |d| d > value);
            let improved = bdd.apply_diff(bdd.apply_and(reached, worse), closed);
            if !bdd.is_zero(improved) {
                debug!("relaxed to {}: {} node(s)", value, bdd.size(improved));
                buckets.push(value, improved);
            }
        }
        dist = add.minimum(dist, relaxed);

        stats.layer_times.push(start.elapsed());
        debug!("batch {} at (f = {}, g = {}) expanded", stats.iterations, f, g);
    }

    stats.visited = count_to_usize(&bdd.sat_count(closed, product.state_vars()));
    info!("best-first: goal unreachable after {} batch(es)", stats.iterations);
    Ok(SearchOutcome::Unreachable(stats))
}

// Walks back from the goal batch. The predecessor of a state expanded at cost
// `g` in batch `i` lies in an earlier batch at cost `g - w(a)`; ties go to the
// lowest action index, then to the smallest predecessor cube.
fn reconstruct(product: &Product, batches: &[(Cost, Ref)], hit: Ref) -> Result<Vec<PlanStep>> {
    let bdd = product.bdd();
    let ts = product.ts();
    let mut target = product
        .pick(hit)
        .ok_or_else(|| Error::Witness("empty goal intersection".to_string()))?;
    let mut i = batches.len() - 1;
    let mut g = batches[i].0;
    let mut steps = Vec::new();

    while !(g == 0 && bdd.is_implies(target, product.init())) {
        let found = (0..product.num_actions()).find_map(|a| {
            let w = ts.weight(a);
            if w > g {
                return None;
            }
            let pre = product.preimage(target, a);
            let candidates = bdd.apply_or_many(
                batches[..i]
                    .iter()
                    .filter(|&&(cost, _)| cost == g - w)
                    .map(|&(_, set)| bdd.apply_and(pre, set)),
            );
            product.pick(candidates).map(|from| (a, w, from))
        });
        let (action, w, from) =
            found.ok_or_else(|| Error::Witness(format!("no predecessor at cost below {}", g)))?;

        i = batches[..i]
            .iter()
            .position(|&(cost, set)| cost == g - w && bdd.is_implies(from, set))
            .ok_or_else(|| Error::Witness("predecessor outside of the expanded batches".to_string()))?;
        steps.push(plan_step(product, action, from, target)?);
        target = from;
        g -= w;
    }

    steps.reverse();
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::action::{GroundedOperator, GroundedTask};
    use crate::automaton::{Automaton, Guard};
    use crate::config::Semantics;
    use crate::context::Context;
    use crate::cost::{Unadjusted, WeightTable};
    use crate::domain::FactDomain;
    use crate::transition::{Builder, TransitionSystem};

    // a -> b -> c costs 2 + 2, the direct jump costs 5, the free hop b <-> d costs nothing.
    fn ts() -> TransitionSystem {
        let task = GroundedTask {
            facts: vec!["(at a)".into(), "(at b)".into(), "(at c)".into(), "(at d)".into()],
            operators: vec![
                GroundedOperator::new("(jump a c)", ["(at a)"], ["(at c)"], ["(at a)"]),
                GroundedOperator::new("(move a b)", ["(at a)"], ["(at b)"], ["(at a)"]),
                GroundedOperator::new("(move b c)", ["(at b)"], ["(at c)"], ["(at b)"]),
                GroundedOperator::new("(hop b d)", ["(at b)"], ["(at d)"], ["(at b)"]),
                GroundedOperator::new("(hop d b)", ["(at d)"], ["(at b)"], ["(at d)"]),
            ],
            initial: vec!["(at a)".into()],
            goal: vec![],
        };
        let (ctx, problem) = Context::from_task(&task, 16).unwrap();
        let domain = FactDomain::new(ctx.predicates());
        let weights = WeightTable::new().with("jump", 5).with("move", 2).with("hop", 0);
        Builder::new(ctx.clone(), &domain, problem)
            .with_weights(&weights, &Unadjusted)
            .unwrap()
            .build_direct()
            .unwrap()
    }

    #[test]
    fn test_cheapest_plan() {
        let ts = ts();
        let product = Product::new(&ts, [Automaton::eventually("f", "(at c)")], Semantics::Conjunctive).unwrap();
        let plan = search(&product, &CancelToken::new()).unwrap().plan().cloned().unwrap();
        assert_eq!(plan.actions(), vec!["(move a b)", "(move b c)"]);
        assert_eq!(plan.cost, 4);
        assert_eq!(plan.steps.iter().map(|s| s.cost).sum::<Cost>(), plan.cost);
    }

    #[test]
    fn test_zero_weight_edges() {
        let ts = ts();
        // Reaching d needs the free hop after the first move.
        let product = Product::new(&ts, [Automaton::eventually("f", "(at d)")], Semantics::Conjunctive).unwrap();
        let plan = search(&product, &CancelToken::new()).unwrap().plan().cloned().unwrap();
        assert_eq!(plan.actions(), vec!["(move a b)", "(hop b d)"]);
        assert_eq!(plan.cost, 2);
    }

    #[test]
    fn test_unreachable() {
        let ts = ts();
        let product = Product::new(&ts, [Automaton::eventually("f", "(at e)")], Semantics::Conjunctive);
        // Unknown atoms are rejected before any search.
        assert!(product.is_err());

        // Leave a, then come back: nothing leads back to a.
        let a = || Guard::atom("(at a)");
        let back_to_a = Automaton::new("return", 4, 0)
            .accepting([3])
            .transition(0, a(), 1)
            .transition(1, Guard::not(a()), 2)
            .transition(2, a(), 3)
            .transition(2, Guard::not(a()), 2)
            .transition(3, Guard::True, 3);
        let product = Product::new(&ts, [back_to_a], Semantics::Conjunctive).unwrap();
        let outcome = search(&product, &CancelToken::new()).unwrap();
        assert!(!outcome.is_found());
        assert!(outcome.stats().iterations > 0);
    }

    #[test]
    fn test_search_releases_weighted_nodes() {
        let ts = ts();
        let add = ts.context().add();
        let product = Product::new(&ts, [Automaton::eventually("f", "(at c)")], Semantics::Conjunctive).unwrap();
        let live = add.live_nodes();

        for _ in 0..3 {
            let plan = search(&product, &CancelToken::new()).unwrap().plan().cloned().unwrap();
            assert_eq!(plan.cost, 4);
            assert_eq!(add.live_nodes(), live);
        }

        drop(product);
        add.collect_garbage(&[]);
        assert!(add.live_nodes() < live);
        assert_eq!(add.terminals(ts.weighted(0)).into_iter().collect::<Vec<_>>(), vec![5]);
    }
}
