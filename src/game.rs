//! Two-player reachability games and strategy synthesis.
//!
//! The system moves first, then the environment responds (possibly with "no
//! intervention"). The winning region is the least fixed point
//!
//! ```text
//! Win₀   = goal ∧ accepting
//! Winᵢ₊₁ = Winᵢ ∨ CPre(Winᵢ)
//! CPre(W) = ∃S. enabled(X, Q, S) ∧ ¬∃E, X′, Q′. P(X, Q, S, E, X′, Q′) ∧ ¬W(X′, Q′)
//! ```
//!
//! where `P` is the game relation of the transition system conjoined with the
//! automata step. A state first added at iteration `r` has rank `r`; its
//! strategy move is the lowest-index system action all of whose outcomes lie
//! in `Win_{r-1}`.

use std::time::Instant;

use log::{debug, info};

use crate::cancel::CancelToken;
use crate::encoder::{Side, VarPool};
use crate::error::{Error, Result};
use crate::product::{Product, ProductState};
use crate::reference::Ref;
use crate::stats::{count_to_usize, SearchStats};
use crate::transition::GameRelation;

#[derive(Debug, Clone)]
pub struct Synthesis {
    /// Cumulative winning sets, `layers[i] = Winᵢ`.
    pub layers: Vec<Ref>,
    /// `W(X, Q)`, the fixed point.
    pub winning: Ref,
    /// `σ(X, Q, S)`, one system action per winning non-goal state.
    pub strategy: Ref,
    /// Number of `CPre` evaluations until the fixed point.
    pub iterations: usize,
    pub stats: SearchStats,
}

impl Synthesis {
    /// Index of the first layer containing the product state `cube`.
    pub fn rank(&self, product: &Product, cube: Ref) -> Option<usize> {
        let bdd = product.bdd();
        self.layers.iter().position(|&w| bdd.is_implies(cube, w))
    }
}

#[derive(Debug, Clone)]
pub enum GameOutcome {
    Winning(Synthesis),
    /// The initial state is outside of the winning region.
    NoWinningStrategy(Synthesis),
}

impl GameOutcome {
    pub fn synthesis(&self) -> &Synthesis {
        match self {
            GameOutcome::Winning(s) | GameOutcome::NoWinningStrategy(s) => s,
        }
    }

    pub fn is_winning(&self) -> bool {
        matches!(self, GameOutcome::Winning(_))
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RolloutStep {
    pub system: usize,
    /// `None` when the environment did not intervene.
    pub environment: Option<usize>,
    pub from: ProductState,
    pub to: ProductState,
    pub rank: usize,
}

/// Picks one of the offered environment responses, by position.
pub type EnvironmentPolicy<'f> = dyn FnMut(&ProductState, &[Option<usize>]) -> usize + 'f;

pub struct Game<'p, 'a> {
    product: &'p Product<'a>,
    game: &'a GameRelation,
    /// `P(X, Q, S, E, X′, Q′)`
    relation: Ref,
    /// `∃E, X′, Q′. P`
    enabled: Ref,
    // Quantified away when looking at outcomes.
    outcome_vars: Ref,
}

impl<'p, 'a> Game<'p, 'a> {
    pub fn new(product: &'p Product<'a>) -> Result<Self> {
        let game = product.ts().game().ok_or(Error::NotAGame)?;
        let bdd = product.bdd();
        let relation = bdd.apply_and(game.relation, product.step());
        let outcome_vars = bdd.apply_and(
            game.environment.var_set(bdd, Side::Current),
            product.var_set(Side::Next),
        );
        let enabled = bdd.exists(relation, outcome_vars);
        debug!("game relation of {} node(s)", bdd.size(relation));
        Ok(Self {
            product,
            game,
            relation,
            enabled,
            outcome_vars,
        })
    }

    pub fn relation(&self) -> Ref {
        self.relation
    }

    /// `(X, Q, S)` pairs whose every outcome lies in `w`.
    pub fn safe_moves(&self, w: Ref) -> Ref {
        let bdd = self.product.bdd();
        let w_next = bdd.swap(w, self.product.pairs());
        let bad = bdd.and_exists(self.relation, -w_next, self.outcome_vars);
        bdd.apply_diff(self.enabled, bad)
    }

    /// Controllable predecessor of `w`.
    pub fn cpre(&self, w: Ref) -> Ref {
        let bdd = self.product.bdd();
        bdd.exists(self.safe_moves(w), self.game.system.var_set(bdd, Side::Current))
    }

    pub fn solve(&self, cancel: &CancelToken) -> Result<GameOutcome> {
        let bdd = self.product.bdd();
        let system = &self.game.system;
        let s_vars = system.var_set(bdd, Side::Current);
        let mut stats = SearchStats::default();

        let mut win = self.product.goal();
        let mut layers = vec![win];
        let mut strategy = bdd.zero;

        loop {
            cancel.check()?;
            let start = Instant::now();
            stats.iterations += 1;

            let moves = self.safe_moves(win);
            let fresh = bdd.apply_diff(bdd.exists(moves, s_vars), win);
            stats.layer_times.push(start.elapsed());
            if bdd.is_zero(fresh) {
                break;
            }

            let mut remaining = fresh;
            for code in 0..self.game.system_actions.len() as u32 {
                let s = system.cube(bdd, code, Side::Current);
                let chosen = bdd.apply_and(bdd.and_exists(moves, s, s_vars), remaining);
                if bdd.is_zero(chosen) {
                    continue;
                }
                strategy = bdd.apply_or(strategy, bdd.apply_and(chosen, s));
                remaining = bdd.apply_diff(remaining, chosen);
            }

            win = bdd.apply_or(win, fresh);
            layers.push(win);
            info!(
                "game iteration {}: {} winning state(s)",
                stats.iterations,
                count_to_usize(&bdd.sat_count(win, self.product.state_vars()))
            );
        }

        stats.visited = count_to_usize(&bdd.sat_count(win, self.product.state_vars()));
        let synthesis = Synthesis {
            layers,
            winning: win,
            strategy,
            iterations: stats.iterations,
            stats,
        };
        let init = self.product.init();
        if !bdd.is_zero(init) && bdd.is_implies(init, win) {
            info!("game: winning, {} iteration(s)", synthesis.iterations);
            Ok(GameOutcome::Winning(synthesis))
        } else {
            info!("game: initial state is not winning");
            Ok(GameOutcome::NoWinningStrategy(synthesis))
        }
    }

    /// The strategy move in a winning product state, as an action index.
    pub fn strategy_move(&self, synthesis: &Synthesis, state: Ref) -> Option<usize> {
        let bdd = self.product.bdd();
        let choice = bdd.and_exists(synthesis.strategy, state, self.product.var_set(Side::Current));
        let code = self.game.system.decode(bdd, choice, Side::Current)?;
        self.game.system_actions.get(code as usize).copied()
    }

    /// Plays the strategy from the initial state against `environment` until an
    /// accepting goal state is reached. Every step strictly lowers the rank.
    pub fn rollout(
        &self,
        synthesis: &Synthesis,
        environment: &mut EnvironmentPolicy<'_>,
        cancel: &CancelToken,
    ) -> Result<Vec<RolloutStep>> {
        let product = self.product;
        let bdd = product.bdd();
        let system = &self.game.system;
        let env_pool = &self.game.environment;
        let state_vars = product.var_set(Side::Current);

        let mut current = product
            .pick(bdd.apply_and(product.init(), synthesis.winning))
            .ok_or_else(|| Error::Witness("initial state is not winning".to_string()))?;
        let mut rank = synthesis
            .rank(product, current)
            .ok_or_else(|| Error::Witness("initial state has no rank".to_string()))?;
        let mut steps = Vec::new();

        while rank > 0 {
            cancel.check()?;
            let from = product.decode(current)?;
            let choice = bdd.and_exists(synthesis.strategy, current, state_vars);
            let code = system
                .decode(bdd, choice, Side::Current)
                .ok_or_else(|| Error::Witness(format!("no strategy move at rank {}", rank)))?;
            let action = self.game.system_actions[code as usize];

            let s = system.cube(bdd, code, Side::Current);
            let outcomes = bdd.and_exists(
                bdd.apply_and(self.relation, current),
                s,
                bdd.apply_and(state_vars, system.var_set(bdd, Side::Current)),
            );
            let responses: Vec<u32> = bdd
                .cubes(
                    bdd.exists(outcomes, product.var_set(Side::Next)),
                    env_pool.vars(Side::Current),
                )
                .map(|bits| VarPool::code_of(&bits))
                .collect();
            let offered: Vec<Option<usize>> = responses.iter().map(|&e| self.game.environment_action(e)).collect();

            let pick = environment(&from, &offered);
            let &ecode = responses
                .get(pick)
                .ok_or_else(|| Error::Witness(format!("environment picked response {} of {}", pick, responses.len())))?;

            let e = env_pool.cube(bdd, ecode, Side::Current);
            let next = bdd.and_exists(outcomes, e, env_pool.var_set(bdd, Side::Current));
            let next = product
                .pick(bdd.swap(next, product.pairs()))
                .ok_or_else(|| Error::Witness("strategy move without outcome".to_string()))?;
            let next_rank = synthesis
                .rank(product, next)
                .filter(|&r| r < rank)
                .ok_or_else(|| Error::Witness(format!("rank did not decrease below {}", rank)))?;

            debug!(
                "rollout: {} then {:?}, rank {} -> {}",
                product.ts().actions()[action],
                offered[pick],
                rank,
                next_rank
            );
            steps.push(RolloutStep {
                system: action,
                environment: offered[pick],
                from,
                to: product.decode(next)?,
                rank,
            });
            current = next;
            rank = next_rank;
        }

        Ok(steps)
    }
}
