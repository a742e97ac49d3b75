//! Ground predicates, their run-scoped interning table, and explicit states.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

/// Interned id of a ground predicate.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PredId(u32);

impl PredId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A ground atom `(name arg1 arg2 ...)`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Predicate {
    pub name: String,
    pub args: Vec<String>,
}

impl Predicate {
    pub fn parse(text: &str) -> Result<Predicate> {
        let malformed = || Error::MalformedPredicate(text.to_string());

        let inner = text
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(malformed)?;
        if inner.contains(['(', ')']) {
            return Err(malformed());
        }

        let mut tokens = inner.split_whitespace().map(str::to_string);
        let name = tokens.next().ok_or_else(malformed)?;
        Ok(Predicate {
            name,
            args: tokens.collect(),
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        write!(f, ")")
    }
}

/// Bidirectional predicate ⇄ id map, built once per problem and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct PredicateTable {
    predicates: Vec<Predicate>,
    names: Vec<String>,
    ids: HashMap<String, PredId>,
}

impl PredicateTable {
    /// Interns `facts` in order; duplicates keep their first id.
    pub fn new<S: AsRef<str>>(facts: impl IntoIterator<Item = S>) -> Result<Self> {
        let mut table = PredicateTable::default();
        for fact in facts {
            let predicate = Predicate::parse(fact.as_ref())?;
            let name = predicate.to_string();
            if table.ids.contains_key(&name) {
                continue;
            }
            let id = PredId(table.predicates.len() as u32);
            table.ids.insert(name.clone(), id);
            table.names.push(name);
            table.predicates.push(predicate);
        }
        Ok(table)
    }

    /// Id of a fact, written in any whitespace layout.
    pub fn id(&self, fact: &str) -> Result<Option<PredId>> {
        let name = Predicate::parse(fact)?.to_string();
        Ok(self.ids.get(&name).copied())
    }

    pub fn name(&self, id: PredId) -> &str {
        &self.names[id.index()]
    }

    pub fn predicate(&self, id: PredId) -> &Predicate {
        &self.predicates[id.index()]
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PredId, &Predicate)> {
        self.predicates.iter().enumerate().map(|(i, p)| (PredId(i as u32), p))
    }
}

/// A full discrete configuration: sorted, duplicate-free predicate ids.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct State(Box<[PredId]>);

impl State {
    pub fn new(ids: impl IntoIterator<Item = PredId>) -> Self {
        let mut ids: Vec<PredId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        State(ids.into_boxed_slice())
    }

    pub fn singleton(id: PredId) -> Self {
        State(Box::new([id]))
    }

    pub fn ids(&self) -> &[PredId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: PredId) -> bool {
        self.0.binary_search(&id).is_ok()
    }

    pub fn is_superset(&self, other: &State) -> bool {
        other.0.iter().all(|&id| self.contains(id))
    }

    /// `(self − del) ∪ add`
    pub fn apply(&self, del: &State, add: &State) -> State {
        State::new(
            self.0
                .iter()
                .copied()
                .filter(|&id| !del.contains(id))
                .chain(add.0.iter().copied()),
        )
    }

    pub fn display<'a>(&'a self, table: &'a PredicateTable) -> impl fmt::Display + 'a {
        StateDisplay { state: self, table }
    }
}

struct StateDisplay<'a> {
    state: &'a State,
    table: &'a PredicateTable,
}

impl fmt::Display for StateDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, &id) in self.state.ids().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.table.name(id))?;
        }
        write!(f, "}}")
    }
}
