//! Action weights: the schema → weight table and the pluggable adjustment hook
//! applied on top of it.

use std::collections::{BTreeMap, BTreeSet};

use crate::action::{Action, ActionKind, Problem};
use crate::error::{Error, Result};

/// Weight per action schema (`transit`, `grasp`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeightTable(BTreeMap<String, u32>);

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, schema: impl Into<String>, weight: u32) -> Self {
        self.0.insert(schema.into(), weight);
        self
    }

    /// Same weight for every listed schema.
    pub fn uniform<S: Into<String>>(schemas: impl IntoIterator<Item = S>, weight: u32) -> Self {
        Self(schemas.into_iter().map(|s| (s.into(), weight)).collect())
    }

    /// Weights of the tabletop manipulation domain.
    pub fn manipulation() -> Self {
        Self::new()
            .with("transit", 1)
            .with("grasp", 2)
            .with("transfer", 3)
            .with("release", 4)
            .with("retreat", 1)
            .with("human-move", 0)
    }

    pub fn get(&self, schema: &str) -> Option<u32> {
        self.0.get(schema).copied()
    }
}

/// Adjusts the base weight of an action before it is attached to the relation.
pub trait CostAdjuster {
    fn adjust(&self, action: &Action, base: u32) -> u32;
}

/// Leaves weights untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unadjusted;

impl CostAdjuster for Unadjusted {
    fn adjust(&self, _action: &Action, base: u32) -> u32 {
        base
    }
}

/// Multiplies the weight of robot moves that start and end inside a region.
///
/// Grasp and release count as inside when their single location is.
#[derive(Debug, Clone, Default)]
pub struct RegionCost {
    pub locations: BTreeSet<String>,
    pub factor: u32,
}

impl RegionCost {
    pub fn new<S: Into<String>>(locations: impl IntoIterator<Item = S>, factor: u32) -> Self {
        Self {
            locations: locations.into_iter().map(Into::into).collect(),
            factor,
        }
    }

    fn inside(&self, location: &str) -> bool {
        self.locations.contains(location)
    }
}

impl CostAdjuster for RegionCost {
    fn adjust(&self, action: &Action, base: u32) -> u32 {
        let inside = match &action.kind {
            ActionKind::Transit { from, to, .. } | ActionKind::Transfer { from, to, .. } => {
                self.inside(from) && self.inside(to)
            }
            ActionKind::Grasp { at, .. } | ActionKind::Release { at, .. } => self.inside(at),
            _ => false,
        };
        if inside {
            base.saturating_mul(self.factor)
        } else {
            base
        }
    }
}

/// Looks up and adjusts the weight of every action.
pub fn assign_weights(problem: &mut Problem, table: &WeightTable, adjuster: &dyn CostAdjuster) -> Result<()> {
    for action in &mut problem.actions {
        let base = table.get(&action.schema).ok_or_else(|| Error::MissingWeight {
            schema: action.schema.clone(),
            action: action.name.clone(),
        })?;
        action.weight = Some(adjuster.adjust(action, base));
    }
    Ok(())
}
