//! Finite automata over label atoms and their symbolic encoding.
//!
//! An [`Automaton`] is handed over explicitly, typically produced from a
//! temporal-logic formula by an external translator. Guards are Boolean
//! combinations of label atoms (`(on b0 l1)`, `(gripper free)`, ...); a
//! missing transition is an implicit rejecting sink.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use log::debug;

use crate::bdd::Bdd;
use crate::encoder::{width_for, LabelEncoder, Side, VarPool};
use crate::error::{Error, Result};
use crate::reference::Ref;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Guard {
    True,
    False,
    Atom(String),
    Not(Box<Guard>),
    And(Vec<Guard>),
    Or(Vec<Guard>),
}

impl Guard {
    pub fn atom(name: impl Into<String>) -> Guard {
        Guard::Atom(name.into())
    }

    pub fn not(guard: Guard) -> Guard {
        Guard::Not(Box::new(guard))
    }

    pub fn and(guards: impl IntoIterator<Item = Guard>) -> Guard {
        Guard::And(guards.into_iter().collect())
    }

    pub fn or(guards: impl IntoIterator<Item = Guard>) -> Guard {
        Guard::Or(guards.into_iter().collect())
    }

    /// Evaluates the guard given the truth of each atom.
    pub fn holds(&self, atom: &dyn Fn(&str) -> bool) -> bool {
        match self {
            Guard::True => true,
            Guard::False => false,
            Guard::Atom(name) => atom(name),
            Guard::Not(g) => !g.holds(atom),
            Guard::And(gs) => gs.iter().all(|g| g.holds(atom)),
            Guard::Or(gs) => gs.iter().any(|g| g.holds(atom)),
        }
    }

    fn to_bdd(&self, bdd: &Bdd, atom: &mut dyn FnMut(&str) -> Result<Ref>) -> Result<Ref> {
        Ok(match self {
            Guard::True => bdd.one,
            Guard::False => bdd.zero,
            Guard::Atom(name) => atom(name)?,
            Guard::Not(g) => -g.to_bdd(bdd, atom)?,
            Guard::And(gs) => {
                let mut res = bdd.one;
                for g in gs {
                    res = bdd.apply_and(res, g.to_bdd(bdd, atom)?);
                }
                res
            }
            Guard::Or(gs) => {
                let mut res = bdd.zero;
                for g in gs {
                    res = bdd.apply_or(res, g.to_bdd(bdd, atom)?);
                }
                res
            }
        })
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, gs: &[Guard], op: &str| -> fmt::Result {
            write!(f, "(")?;
            for (i, g) in gs.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", op)?;
                }
                write!(f, "{}", g)?;
            }
            write!(f, ")")
        };
        match self {
            Guard::True => write!(f, "true"),
            Guard::False => write!(f, "false"),
            Guard::Atom(name) => write!(f, "{}", name),
            Guard::Not(g) => write!(f, "!{}", g),
            Guard::And(gs) => join(f, gs, "&"),
            Guard::Or(gs) => join(f, gs, "|"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Transition {
    pub from: usize,
    pub guard: Guard,
    pub to: usize,
}

/// Explicit finite automaton with states `0..num_states`.
#[derive(Debug, Clone)]
pub struct Automaton {
    pub name: String,
    pub num_states: usize,
    pub initial: usize,
    pub accepting: BTreeSet<usize>,
    pub transitions: Vec<Transition>,
}

impl Automaton {
    pub fn new(name: impl Into<String>, num_states: usize, initial: usize) -> Self {
        Self {
            name: name.into(),
            num_states,
            initial,
            accepting: BTreeSet::new(),
            transitions: Vec::new(),
        }
    }

    pub fn accepting(mut self, states: impl IntoIterator<Item = usize>) -> Self {
        self.accepting.extend(states);
        self
    }

    pub fn transition(mut self, from: usize, guard: Guard, to: usize) -> Self {
        self.transitions.push(Transition { from, guard, to });
        self
    }

    /// "Eventually `atom`": two states, the second accepting and absorbing.
    pub fn eventually(name: impl Into<String>, atom: impl Into<String>) -> Self {
        let atom = Guard::atom(atom);
        Automaton::new(name, 2, 0)
            .accepting([1])
            .transition(0, Guard::not(atom.clone()), 0)
            .transition(0, atom, 1)
            .transition(1, Guard::True, 1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_states == 0 {
            return Err(Error::EmptyAutomaton(self.name.clone()));
        }
        let invalid = |reason: String| Error::InvalidAutomaton {
            automaton: self.name.clone(),
            reason,
        };
        if self.initial >= self.num_states {
            return Err(invalid(format!("initial state {} out of range", self.initial)));
        }
        if let Some(&q) = self.accepting.iter().find(|&&q| q >= self.num_states) {
            return Err(invalid(format!("accepting state {} out of range", q)));
        }
        if let Some(t) = self
            .transitions
            .iter()
            .find(|t| t.from >= self.num_states || t.to >= self.num_states)
        {
            return Err(invalid(format!("transition {} -> {} out of range", t.from, t.to)));
        }
        Ok(())
    }

    /// Number of transitions from each state to the accepting set, `None` when
    /// no accepting state can be reached. Transitions guarded by `false` are ignored.
    pub fn distance_to_accept(&self) -> Vec<Option<usize>> {
        let mut reverse = vec![Vec::new(); self.num_states];
        for t in &self.transitions {
            if t.guard != Guard::False {
                reverse[t.to].push(t.from);
            }
        }

        let mut distance = vec![None; self.num_states];
        let mut queue = VecDeque::new();
        for &q in &self.accepting {
            distance[q] = Some(0);
            queue.push_back(q);
        }
        while let Some(q) = queue.pop_front() {
            let d = distance[q].unwrap_or(0);
            for &p in &reverse[q] {
                if distance[p].is_none() {
                    distance[p] = Some(d + 1);
                    queue.push_back(p);
                }
            }
        }
        distance
    }

    /// First transition out of `q` whose guard holds.
    pub fn step(&self, q: usize, atom: &dyn Fn(&str) -> bool) -> Option<usize> {
        self.transitions
            .iter()
            .find(|t| t.from == q && t.guard.holds(atom))
            .map(|t| t.to)
    }
}

/// An automaton encoded over its own primed pool `Q`, with guards over the label pool `L`.
#[derive(Debug, Clone)]
pub struct SymbolicAutomaton {
    automaton: Automaton,
    pool: VarPool,
    /// `δ(L, Q, Q′)`
    delta: Ref,
    initial: Ref,
    accepting: Ref,
}

impl SymbolicAutomaton {
    pub fn new(bdd: &Bdd, labels: &LabelEncoder, automaton: Automaton) -> Result<Self> {
        automaton.validate()?;
        let pool = VarPool::new(bdd, format!("q:{}", automaton.name), width_for(automaton.num_states), true)?;

        let mut atom = |name: &str| {
            labels.atom(bdd, name).ok_or_else(|| Error::UnknownAtom {
                automaton: automaton.name.clone(),
                atom: name.to_string(),
            })
        };
        let mut delta = bdd.zero;
        for t in &automaton.transitions {
            let guard = t.guard.to_bdd(bdd, &mut atom)?;
            let edge = bdd.apply_and_many([
                pool.cube(bdd, t.from as u32, Side::Current),
                guard,
                pool.cube(bdd, t.to as u32, Side::Next),
            ]);
            delta = bdd.apply_or(delta, edge);
        }

        let initial = pool.cube(bdd, automaton.initial as u32, Side::Current);
        let accepting = bdd.apply_or_many(
            automaton
                .accepting
                .iter()
                .map(|&q| pool.cube(bdd, q as u32, Side::Current)),
        );
        debug!(
            "automaton '{}': {} state(s), {} bit(s), delta of {} node(s)",
            automaton.name,
            automaton.num_states,
            pool.width(),
            bdd.size(delta)
        );

        Ok(Self {
            automaton,
            pool,
            delta,
            initial,
            accepting,
        })
    }

    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    pub fn name(&self) -> &str {
        &self.automaton.name
    }

    pub fn pool(&self) -> &VarPool {
        &self.pool
    }

    pub fn delta(&self) -> Ref {
        self.delta
    }

    pub fn initial(&self) -> Ref {
        self.initial
    }

    pub fn accepting(&self) -> Ref {
        self.accepting
    }

    /// `Q = Q′`
    pub fn frozen(&self, bdd: &Bdd) -> Ref {
        bdd.apply_and_many(
            self.pool
                .pairs()
                .map(|(q, qn)| bdd.apply_eq(bdd.mk_var(q.id()), bdd.mk_var(qn.id()))),
        )
    }
}
