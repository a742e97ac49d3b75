//! Breadth-first search: fewest steps, action weights ignored.

use std::time::Instant;

use log::{debug, info};

use super::{plan_step, Plan, SearchOutcome};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::product::Product;
use crate::reference::Ref;
use crate::stats::{count_to_usize, SearchStats};

pub fn search(product: &Product, cancel: &CancelToken) -> Result<SearchOutcome> {
    let bdd = product.bdd();
    let mut stats = SearchStats::default();
    let mut layers = vec![product.init()];
    let mut reached = product.init();

    loop {
        cancel.check()?;
        let start = Instant::now();
        let frontier = layers[layers.len() - 1];

        let hit = bdd.apply_and(frontier, product.goal());
        if !bdd.is_zero(hit) {
            stats.visited = count_to_usize(&bdd.sat_count(reached, product.state_vars()));
            let steps = reconstruct(product, &layers, hit)?;
            let cost = steps.iter().map(|s| s.cost).sum();
            info!("bfs: plan of {} step(s), cost {}, after {} layer(s)", steps.len(), cost, stats.iterations);
            return Ok(SearchOutcome::Found(Plan { steps, cost, stats }));
        }

        let next = bdd.apply_diff(product.image_all(frontier), reached);
        stats.iterations += 1;
        stats.layer_times.push(start.elapsed());
        debug!("bfs layer {}: frontier of {} node(s)", stats.iterations, bdd.size(next));

        if bdd.is_zero(next) {
            stats.visited = count_to_usize(&bdd.sat_count(reached, product.state_vars()));
            info!("bfs: goal unreachable, fixed point after {} layer(s)", stats.iterations);
            return Ok(SearchOutcome::Unreachable(stats));
        }
        reached = bdd.apply_or(reached, next);
        layers.push(next);
    }
}

// Walks the layers backwards from the smallest goal cube, preferring the
// lowest action index and then the smallest predecessor cube.
fn reconstruct(product: &Product, layers: &[Ref], hit: Ref) -> Result<Vec<super::PlanStep>> {
    let bdd = product.bdd();
    let mut target = product
        .pick(hit)
        .ok_or_else(|| Error::Witness("empty goal intersection".to_string()))?;
    let mut steps = Vec::with_capacity(layers.len() - 1);

    for i in (1..layers.len()).rev() {
        let (action, from) = (0..product.num_actions())
            .find_map(|a| {
                let pre = bdd.apply_and(product.preimage(target, a), layers[i - 1]);
                product.pick(pre).map(|from| (a, from))
            })
            .ok_or_else(|| Error::Witness(format!("no predecessor in layer {}", i - 1)))?;
        steps.push(plan_step(product, action, from, target)?);
        target = from;
    }

    steps.reverse();
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::action::{GroundedOperator, GroundedTask};
    use crate::automaton::Automaton;
    use crate::config::Semantics;
    use crate::context::Context;
    use crate::domain::FactDomain;
    use crate::error::ErrorKind;
    use crate::transition::{Builder, TransitionSystem};

    // a -> b -> c and a shortcut a -> c with a higher index.
    fn ts() -> TransitionSystem {
        let task = GroundedTask {
            facts: vec!["(at a)".into(), "(at b)".into(), "(at c)".into()],
            operators: vec![
                GroundedOperator::new("(move a b)", ["(at a)"], ["(at b)"], ["(at a)"]),
                GroundedOperator::new("(move b c)", ["(at b)"], ["(at c)"], ["(at b)"]),
                GroundedOperator::new("(move c a)", ["(at c)"], ["(at a)"], ["(at c)"]),
                GroundedOperator::new("(jump a c)", ["(at a)"], ["(at c)"], ["(at a)"]),
            ],
            initial: vec!["(at a)".into()],
            goal: vec![],
        };
        let (ctx, problem) = Context::from_task(&task, 16).unwrap();
        let domain = FactDomain::new(ctx.predicates());
        Builder::new(ctx.clone(), &domain, problem).build_direct().unwrap()
    }

    #[test]
    fn test_shortest_plan() {
        let ts = ts();
        let product = Product::new(&ts, [Automaton::eventually("f", "(at c)")], Semantics::Conjunctive).unwrap();
        let outcome = search(&product, &CancelToken::new()).unwrap();
        let plan = outcome.plan().unwrap();
        assert_eq!(plan.actions(), vec!["(jump a c)"]);
        assert_eq!(plan.cost, 1);
        assert_eq!(plan.stats.iterations, 1);
    }

    #[test]
    fn test_plan_through_intermediate_goal() {
        let ts = ts();
        // Visit b, then c.
        let visit_b = Automaton::eventually("b", "(at b)");
        let visit_c = Automaton::eventually("c", "(at c)");
        let product = Product::new(&ts, [visit_b, visit_c], Semantics::Conjunctive).unwrap();
        let plan = search(&product, &CancelToken::new()).unwrap().plan().cloned().unwrap();
        assert_eq!(plan.actions(), vec!["(move a b)", "(move b c)"]);
        assert_eq!(plan.steps[1].to.automata, vec![1, 1]);
    }

    #[test]
    fn test_already_at_goal() {
        let ts = ts();
        let product = Product::new(&ts, [Automaton::eventually("f", "(at a)")], Semantics::Conjunctive).unwrap();
        let plan = search(&product, &CancelToken::new()).unwrap().plan().cloned().unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.cost, 0);
    }

    #[test]
    fn test_unreachable() {
        let ts = ts();
        let never = Automaton::new("never", 1, 0);
        let product = Product::new(&ts, [never], Semantics::Conjunctive).unwrap();
        let outcome = search(&product, &CancelToken::new()).unwrap();
        assert!(!outcome.is_found());
    }

    #[test]
    fn test_cancelled() {
        let ts = ts();
        let product = Product::new(&ts, [Automaton::eventually("f", "(at c)")], Semantics::Conjunctive).unwrap();
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(search(&product, &token).unwrap_err().kind(), ErrorKind::Cancelled);
    }
}
