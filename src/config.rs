//! Planner configuration.

use std::fmt;
use std::str::FromStr;

/// Search algorithm used by [`Planner::plan`][crate::planner::Planner::plan].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Algorithm {
    #[default]
    Bfs,
    Dijkstra,
    AStar,
}

/// How several automata share one product.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Semantics {
    /// All automata move every step; accept when all accept.
    #[default]
    Conjunctive,
    /// Automata are satisfied one after the other in registration order.
    Prioritized,
}

/// How the transition system is discovered.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Construction {
    /// States are the facts, all known up front.
    #[default]
    Direct,
    /// States are fact sets reached from the initial state.
    Incremental,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Initial arena size hint for both managers, as a power of two.
    pub storage_bits: usize,
    pub algorithm: Algorithm,
    pub semantics: Semantics,
    pub construction: Construction,
    /// Number of states the incremental encoder must be able to address.
    pub capacity: usize,
    /// Sweep construction garbage once the transition system is built.
    pub collect_garbage: bool,
    /// Interventions the environment may make over a whole game run; `None`
    /// lets it respond after every system move. The capacity is scaled by
    /// the number of counter levels.
    pub max_interventions: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_bits: 20,
            algorithm: Algorithm::default(),
            semantics: Semantics::default(),
            construction: Construction::default(),
            capacity: 1 << 10,
            collect_garbage: true,
            max_interventions: None,
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bfs" => Ok(Algorithm::Bfs),
            "dijkstra" => Ok(Algorithm::Dijkstra),
            "astar" | "a*" => Ok(Algorithm::AStar),
            other => Err(format!("unknown algorithm '{}'", other)),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Bfs => "bfs",
            Algorithm::Dijkstra => "dijkstra",
            Algorithm::AStar => "astar",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Semantics {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "conjunctive" | "and" => Ok(Semantics::Conjunctive),
            "prioritized" | "priority" => Ok(Semantics::Prioritized),
            other => Err(format!("unknown semantics '{}'", other)),
        }
    }
}
