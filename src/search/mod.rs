//! Symbolic search over a [`Product`].
//!
//! All engines work on sets of product states through image and pre-image
//! computations only. A search that reaches its fixed point without touching
//! the goal returns [`SearchOutcome::Unreachable`]; that is a result, not an
//! error.

use std::fmt;

use crate::add::Cost;
use crate::error::Result;
use crate::predicate::PredicateTable;
use crate::product::{Product, ProductState};
use crate::reference::Ref;
use crate::stats::SearchStats;

pub mod astar;
pub mod bfs;
pub mod dijkstra;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PlanStep {
    /// Index of the action in registration order.
    pub action: usize,
    pub name: String,
    pub cost: Cost,
    pub from: ProductState,
    pub to: ProductState,
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
    pub cost: Cost,
    pub stats: SearchStats,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn actions(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn display<'a>(&'a self, table: &'a PredicateTable) -> impl fmt::Display + 'a {
        PlanDisplay { plan: self, table }
    }
}

struct PlanDisplay<'a> {
    plan: &'a Plan,
    table: &'a PredicateTable,
}

impl fmt::Display for PlanDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.plan.steps.iter().enumerate() {
            writeln!(
                f,
                "{:>3}. {} [{}]  {} -> {}",
                i + 1,
                step.name,
                step.cost,
                step.from.display(self.table),
                step.to.display(self.table)
            )?;
        }
        write!(f, "total cost: {}", self.plan.cost)
    }
}

#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Found(Plan),
    Unreachable(SearchStats),
}

impl SearchOutcome {
    pub fn plan(&self) -> Option<&Plan> {
        match self {
            SearchOutcome::Found(plan) => Some(plan),
            SearchOutcome::Unreachable(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }

    pub fn stats(&self) -> &SearchStats {
        match self {
            SearchOutcome::Found(plan) => &plan.stats,
            SearchOutcome::Unreachable(stats) => stats,
        }
    }
}

/// Decodes one reconstructed step between two product cubes.
fn plan_step(product: &Product, action: usize, from: Ref, to: Ref) -> Result<PlanStep> {
    let ts = product.ts();
    Ok(PlanStep {
        action,
        name: ts.actions()[action].name.clone(),
        cost: ts.weight(action),
        from: product.decode(from)?,
        to: product.decode(to)?,
    })
}
