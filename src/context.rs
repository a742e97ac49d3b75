use std::rc::Rc;

use crate::action::{GroundedTask, Problem};
use crate::add::Add;
use crate::bdd::Bdd;
use crate::error::{Error, Result};
use crate::predicate::PredicateTable;

/// Per-problem state shared by every component: both diagram managers and
/// the predicate table. Nothing in it changes meaning after construction.
#[derive(Debug)]
pub struct Context {
    bdd: Bdd,
    add: Add,
    predicates: PredicateTable,
}

/// Largest initial arena, as a power of two.
pub const MAX_STORAGE_BITS: usize = 31;

impl Context {
    pub fn new(predicates: PredicateTable, storage_bits: usize) -> Result<Rc<Self>> {
        if storage_bits > MAX_STORAGE_BITS {
            return Err(Error::StorageBits {
                bits: storage_bits,
                max: MAX_STORAGE_BITS,
            });
        }
        Ok(Rc::new(Self {
            bdd: Bdd::new(storage_bits),
            add: Add::new(storage_bits),
            predicates,
        }))
    }

    /// Interns the task's facts and grounds its operators.
    pub fn from_task(task: &GroundedTask, storage_bits: usize) -> Result<(Rc<Self>, Problem)> {
        let predicates = PredicateTable::new(&task.facts)?;
        let problem = Problem::ground(task, &predicates)?;
        Ok((Self::new(predicates, storage_bits)?, problem))
    }

    pub fn bdd(&self) -> &Bdd {
        &self.bdd
    }

    pub fn add(&self) -> &Add {
        &self.add
    }

    pub fn predicates(&self) -> &PredicateTable {
        &self.predicates
    }
}
