//! One-stop entry point: builds the transition system described by a
//! [`Config`] and runs searches or games over products with automata.

use log::info;

use crate::action::GroundedTask;
use crate::automaton::Automaton;
use crate::cancel::CancelToken;
use crate::config::{Algorithm, Config, Construction};
use crate::context::Context;
use crate::cost::{CostAdjuster, WeightTable};
use crate::domain::Domain;
use crate::error::Result;
use crate::game::{Game, GameOutcome};
use crate::product::Product;
use crate::search::{astar, bfs, dijkstra, SearchOutcome};
use crate::stats::Diagnostics;
use crate::transition::{Builder, TransitionSystem};

pub struct Planner {
    config: Config,
    ts: TransitionSystem,
    cancel: CancelToken,
}

/// Collects everything needed to build a [`Planner`].
pub struct PlannerBuilder<'a> {
    config: Config,
    task: &'a GroundedTask,
    domain: &'a dyn Domain,
    weights: Option<(&'a WeightTable, &'a dyn CostAdjuster)>,
    cancel: CancelToken,
    game: bool,
}

impl<'a> PlannerBuilder<'a> {
    /// Action weights for Dijkstra and A*. Without them every action weighs 1.
    pub fn weights(mut self, table: &'a WeightTable, adjuster: &'a dyn CostAdjuster) -> Self {
        self.weights = Some((table, adjuster));
        self
    }

    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Build the two-player game relation, always by incremental discovery.
    pub fn game(mut self, enabled: bool) -> Self {
        self.game = enabled;
        self
    }

    pub fn build(self) -> Result<Planner> {
        let bounded;
        let (task, capacity) = match self.config.max_interventions {
            Some(budget) if self.game => {
                info!("environment limited to {} intervention(s)", budget);
                bounded = self.task.with_intervention_budget(budget)?;
                (&bounded, self.config.capacity.saturating_mul(budget.saturating_add(1)))
            }
            _ => (self.task, self.config.capacity),
        };
        let (ctx, problem) = Context::from_task(task, self.config.storage_bits)?;
        let mut builder = Builder::new(ctx, self.domain, problem)
            .with_cancel(self.cancel.clone())
            .collect_garbage(self.config.collect_garbage);
        if let Some((table, adjuster)) = self.weights {
            builder = builder.with_weights(table, adjuster)?;
        }

        let ts = match (self.game, self.config.construction) {
            (true, _) => builder.build_game(capacity)?,
            (false, Construction::Direct) => builder.build_direct()?,
            (false, Construction::Incremental) => builder.build_incremental(capacity)?,
        };
        Ok(Planner {
            config: self.config,
            ts,
            cancel: self.cancel,
        })
    }
}

impl Planner {
    pub fn builder<'a>(config: Config, task: &'a GroundedTask, domain: &'a dyn Domain) -> PlannerBuilder<'a> {
        PlannerBuilder {
            config,
            task,
            domain,
            weights: None,
            cancel: CancelToken::new(),
            game: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ts(&self) -> &TransitionSystem {
        &self.ts
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.ts.diagnostics()
    }

    /// A token that stops the running search or game when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn product(&self, automata: impl IntoIterator<Item = Automaton>) -> Result<Product<'_>> {
        Product::new(&self.ts, automata, self.config.semantics)
    }

    /// Searches for a plan satisfying every automaton, with the configured algorithm.
    pub fn plan(&self, automata: impl IntoIterator<Item = Automaton>) -> Result<SearchOutcome> {
        let product = self.product(automata)?;
        info!(
            "planning with {} over {} automaton(s), {:?} semantics",
            self.config.algorithm,
            product.automata().len(),
            self.config.semantics
        );
        match self.config.algorithm {
            Algorithm::Bfs => bfs::search(&product, &self.cancel),
            Algorithm::Dijkstra => dijkstra::search(&product, &self.cancel),
            Algorithm::AStar => astar::search(&product, &self.cancel),
        }
    }

    /// Solves the reachability game; the planner must have been built with
    /// [`PlannerBuilder::game`].
    pub fn synthesize(&self, automata: impl IntoIterator<Item = Automaton>) -> Result<GameOutcome> {
        let product = self.product(automata)?;
        Game::new(&product)?.solve(&self.cancel)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::config::Semantics;
    use crate::cost::Unadjusted;
    use crate::domain::FactDomain;
    use crate::error::ErrorKind;
    use crate::predicate::PredicateTable;
    use crate::error::Error;
    use crate::worlds::{GridWorld, TableTop};

    fn corner_to_corner(algorithm: Algorithm, construction: Construction) -> SearchOutcome {
        let grid = GridWorld::new(3, 3);
        let task = grid.task();
        let domain = FactDomain::new(&PredicateTable::new(&task.facts).unwrap());
        let config = Config {
            storage_bits: 14,
            algorithm,
            construction,
            ..Default::default()
        };
        let weights = GridWorld::weights();
        let planner = Planner::builder(config, &task, &domain)
            .weights(&weights, &Unadjusted)
            .build()
            .unwrap();
        planner
            .plan([Automaton::eventually("corner", grid.at(2, 2))])
            .unwrap()
    }

    #[test]
    fn test_algorithms_agree_on_grid() {
        // Two steps right (2 each) and two down (4 each).
        for construction in [Construction::Direct, Construction::Incremental] {
            let bfs = corner_to_corner(Algorithm::Bfs, construction);
            assert_eq!(bfs.plan().map(|p| p.len()), Some(4));
            let dijkstra = corner_to_corner(Algorithm::Dijkstra, construction);
            assert_eq!(dijkstra.plan().map(|p| p.cost), Some(12));
            let astar = corner_to_corner(Algorithm::AStar, construction);
            assert_eq!(astar.plan().map(|p| p.cost), Some(12));
        }
    }

    #[test]
    fn test_prioritized_semantics() {
        let grid = GridWorld::new(1, 3);
        let task = grid.task();
        let domain = FactDomain::new(&PredicateTable::new(&task.facts).unwrap());
        let config = Config {
            storage_bits: 12,
            semantics: Semantics::Prioritized,
            ..Default::default()
        };
        let planner = Planner::builder(config, &task, &domain).build().unwrap();
        // Right end first, then back to the middle.
        let outcome = planner
            .plan([
                Automaton::eventually("right", grid.at(0, 2)),
                Automaton::eventually("middle", grid.at(0, 1)),
            ])
            .unwrap();
        assert_eq!(outcome.plan().map(|p| p.len()), Some(3));
    }

    #[test]
    fn test_synthesize_requires_game() {
        let grid = GridWorld::new(1, 2);
        let task = grid.task();
        let domain = FactDomain::new(&PredicateTable::new(&task.facts).unwrap());
        let planner = Planner::builder(Config::default(), &task, &domain).build().unwrap();
        let err = planner
            .synthesize([Automaton::eventually("f", grid.at(0, 1))])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_cancelled_before_build() {
        let grid = GridWorld::new(2, 2);
        let task = grid.task();
        let domain = FactDomain::new(&PredicateTable::new(&task.facts).unwrap());
        let token = CancelToken::new();
        token.cancel();
        let result = Planner::builder(Config::default(), &task, &domain).cancel(token).build();
        assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::Cancelled));
    }

    #[test]
    fn test_storage_bits_out_of_range() {
        let grid = GridWorld::new(1, 2);
        let task = grid.task();
        let domain = FactDomain::new(&PredicateTable::new(&task.facts).unwrap());
        let config = Config {
            storage_bits: 32,
            ..Default::default()
        };
        let err = Planner::builder(config, &task, &domain).build().err().unwrap();
        assert!(matches!(err, Error::StorageBits { bits: 32, .. }));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_capacity_beyond_codes() {
        let world = TableTop::new(7, 12);
        assert!(world.capacity() > u32::MAX as usize);
        let task = world.task();
        let domain = world.domain();
        let config = Config {
            storage_bits: 16,
            construction: Construction::Incremental,
            capacity: world.capacity(),
            ..Default::default()
        };
        let err = Planner::builder(config, &task, &domain).build().err().unwrap();
        assert!(matches!(err, Error::EncodingOverflow { .. }));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
