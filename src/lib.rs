//! # symplan: symbolic planning and strategy synthesis
//!
//! **`symplan`** plans for an agent whose goals are finite automata over
//! world-configuration labels, and synthesizes strategies when a second
//! actor (the "human") may interfere. States are never enumerated during
//! search: everything runs on decision diagrams through image and pre-image
//! computations.
//!
//! ## Pipeline
//!
//! 1. A [`GroundedTask`][crate::action::GroundedTask] (facts and operators) is
//!    interned into a [`Context`][crate::context::Context], which owns the
//!    Boolean ([`Bdd`][crate::bdd::Bdd]) and weighted ([`Add`][crate::add::Add])
//!    diagram managers.
//! 2. The [`Builder`][crate::transition::Builder] encodes states as cubes and
//!    builds one relation per action, either directly from the operators or by
//!    discovering reachable states layer by layer.
//! 3. A [`Product`][crate::product::Product] composes the transition system with
//!    one or more [`Automaton`][crate::automaton::Automaton]s, lazily.
//! 4. [`search`] finds plans (BFS, Dijkstra, A*); [`game`] solves the
//!    two-player reachability game and plays out its strategy.
//!
//! The [`Planner`][crate::planner::Planner] wires all of it from a
//! [`Config`][crate::config::Config].
//!
//! ## Basic Usage
//!
//! ```rust
//! use symplan::automaton::Automaton;
//! use symplan::config::Config;
//! use symplan::domain::FactDomain;
//! use symplan::planner::Planner;
//! use symplan::predicate::PredicateTable;
//! use symplan::worlds::GridWorld;
//!
//! let grid = GridWorld::new(2, 2);
//! let task = grid.task();
//! let domain = FactDomain::new(&PredicateTable::new(&task.facts)?);
//! let planner = Planner::builder(Config::default(), &task, &domain).build()?;
//!
//! // Reach the opposite corner.
//! let outcome = planner.plan([Automaton::eventually("corner", grid.at(1, 1))])?;
//! assert_eq!(outcome.plan().map(|p| p.len()), Some(2));
//! # Ok::<(), symplan::error::Error>(())
//! ```
//!
//! ## Decision diagrams
//!
//! The substrate is a manager-centric, hash-consed arena with complement
//! edges. Variables are 1-indexed and ordered by allocation; all operations
//! go through the manager. See the [`bdd`] module.

pub mod action;
pub mod add;
pub mod automaton;
pub mod bdd;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod context;
pub mod cost;
pub mod domain;
pub mod encoder;
pub mod error;
pub mod game;
pub mod node;
pub mod paths;
pub mod planner;
pub mod predicate;
pub mod product;
pub mod reference;
pub mod sat;
pub mod search;
pub mod stats;
pub mod subtable;
pub mod transition;
pub mod types;
pub mod worlds;

pub use error::{Error, ErrorKind, Result};
