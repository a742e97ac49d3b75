//! Programmatic task generators: a grid world for a single agent and a
//! tabletop manipulation world for a robot arm, optionally with a human who
//! moves objects around.

use std::collections::BTreeSet;

use crate::action::{GroundedOperator, GroundedTask};
use crate::cost::WeightTable;
use crate::domain::{ManipulationDomain, GRIPPER_FREE};

/// Name of the grid agent in every fact.
pub const AGENT: &str = "skbn";

/// Robot resting location outside of the table.
pub const ELSEWHERE: &str = "else";

/// A `rows × cols` grid with blocked cells; one fact `(at skbn lN)` per free
/// cell, numbered row by row from `l1`.
#[derive(Debug, Clone)]
pub struct GridWorld {
    pub rows: usize,
    pub cols: usize,
    pub obstacles: BTreeSet<(usize, usize)>,
    pub start: (usize, usize),
}

impl GridWorld {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            obstacles: BTreeSet::new(),
            start: (0, 0),
        }
    }

    pub fn with_obstacles(mut self, cells: impl IntoIterator<Item = (usize, usize)>) -> Self {
        self.obstacles.extend(cells);
        self
    }

    pub fn starting_at(mut self, row: usize, col: usize) -> Self {
        self.start = (row, col);
        self
    }

    pub fn location(&self, row: usize, col: usize) -> String {
        format!("l{}", row * self.cols + col + 1)
    }

    /// The fact stating that the agent is in a cell, usable as a guard atom.
    pub fn at(&self, row: usize, col: usize) -> String {
        format!("(at {} {})", AGENT, self.location(row, col))
    }

    fn is_free(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && !self.obstacles.contains(&(row, col))
    }

    pub fn task(&self) -> GroundedTask {
        let mut task = GroundedTask::default();
        for row in 0..self.rows {
            for col in 0..self.cols {
                if self.is_free(row, col) {
                    task.facts.push(self.at(row, col));
                }
            }
        }

        for row in 0..self.rows {
            for col in 0..self.cols {
                if !self.is_free(row, col) {
                    continue;
                }
                let moves = [
                    ("moveleft", col.checked_sub(1).map(|c| (row, c))),
                    ("moveright", Some((row, col + 1))),
                    ("moveup", row.checked_sub(1).map(|r| (r, col))),
                    ("movedown", Some((row + 1, col))),
                ];
                for (schema, target) in moves {
                    let Some((r, c)) = target.filter(|&(r, c)| self.is_free(r, c)) else {
                        continue;
                    };
                    let name = format!("({} {} {} {})", schema, AGENT, self.location(row, col), self.location(r, c));
                    let here = self.at(row, col);
                    task.operators
                        .push(GroundedOperator::new(name, [here.clone()], [self.at(r, c)], [here]));
                }
            }
        }

        if self.is_free(self.start.0, self.start.1) {
            task.initial.push(self.at(self.start.0, self.start.1));
        }
        task
    }

    /// Moving left is cheapest, moving down the most expensive.
    pub fn weights() -> WeightTable {
        WeightTable::new()
            .with("moveleft", 1)
            .with("moveright", 2)
            .with("moveup", 3)
            .with("movedown", 4)
    }
}

/// Objects on a table, a robot arm and optionally a human.
///
/// The robot cycles through `transit` (to an object), `grasp`, `transfer`
/// (to a location) and `release`. The human, when present, moves any object
/// that rests on a location to another free one; the robot can then `retreat`
/// from where the object used to be and head for it again.
#[derive(Debug, Clone)]
pub struct TableTop {
    pub objects: Vec<String>,
    pub locations: Vec<String>,
    /// Where each object starts, by index into `locations`.
    pub initial: Vec<usize>,
    pub human: bool,
}

impl TableTop {
    /// Objects `b0..` start on locations `l0..` in order.
    pub fn new(objects: usize, locations: usize) -> Self {
        Self {
            objects: (0..objects).map(|i| format!("b{}", i)).collect(),
            locations: (0..locations).map(|i| format!("l{}", i)).collect(),
            initial: (0..objects).collect(),
            human: false,
        }
    }

    pub fn with_human(mut self, human: bool) -> Self {
        self.human = human;
        self
    }

    pub fn on(object: &str, location: &str) -> String {
        format!("(on {} {})", object, location)
    }

    pub fn domain(&self) -> ManipulationDomain {
        ManipulationDomain::new(self.objects.iter().cloned(), self.locations.iter().cloned())
    }

    /// Upper bound on the number of reachable states, for the incremental encoder.
    pub fn capacity(&self) -> usize {
        let n = self.objects.len();
        let l = self.locations.len();
        let placements = (l + 1).saturating_pow(n as u32);
        let robot = (l + 1).saturating_add(3usize.saturating_mul(n).saturating_mul(l));
        placements.saturating_mul(robot)
    }

    pub fn task(&self) -> GroundedTask {
        let ready = |l: &str| format!("(ready {})", l);
        let to_obj = |o: &str, l: &str| format!("(to-obj {} {})", o, l);
        let holding = |o: &str, l: &str| format!("(holding {} {})", o, l);
        let to_loc = |o: &str, l: &str| format!("(to-loc {} {})", o, l);

        let mut resting = vec![ELSEWHERE.to_string()];
        resting.extend(self.locations.iter().cloned());

        let mut task = GroundedTask::default();
        for o in &self.objects {
            for l in &self.locations {
                task.facts
                    .extend([Self::on(o, l), holding(o, l), to_obj(o, l), to_loc(o, l)]);
            }
        }
        task.facts.extend(resting.iter().map(|l| ready(l)));
        task.facts.push(GRIPPER_FREE.to_string());

        for o in &self.objects {
            for l in &self.locations {
                for from in &resting {
                    task.operators.push(GroundedOperator::new(
                        format!("(transit {} {} {})", o, from, l),
                        [ready(from), Self::on(o, l), GRIPPER_FREE.to_string()],
                        [to_obj(o, l)],
                        [ready(from)],
                    ));
                }
                task.operators.push(GroundedOperator::new(
                    format!("(grasp {} {})", o, l),
                    [to_obj(o, l), Self::on(o, l), GRIPPER_FREE.to_string()],
                    [holding(o, l)],
                    [to_obj(o, l), Self::on(o, l), GRIPPER_FREE.to_string()],
                ));
                for to in &self.locations {
                    task.operators.push(GroundedOperator::new(
                        format!("(transfer {} {} {})", o, l, to),
                        [holding(o, l)],
                        [to_loc(o, to)],
                        [holding(o, l)],
                    ));
                }
                task.operators.push(GroundedOperator::new(
                    format!("(release {} {})", o, l),
                    [to_loc(o, l)],
                    [Self::on(o, l), GRIPPER_FREE.to_string(), ready(l)],
                    [to_loc(o, l)],
                ));
            }
        }

        if self.human {
            for o in &self.objects {
                for l in &self.locations {
                    task.operators.push(GroundedOperator::new(
                        format!("(retreat {} {})", o, l),
                        [to_obj(o, l), GRIPPER_FREE.to_string()],
                        [ready(l)],
                        [to_obj(o, l)],
                    ));
                }
                for from in &self.locations {
                    for to in self.locations.iter().filter(|&to| to != from) {
                        task.operators.push(GroundedOperator::new(
                            format!("(human-move {} {} {})", o, from, to),
                            [Self::on(o, from)],
                            [Self::on(o, to)],
                            [Self::on(o, from)],
                        ));
                    }
                }
            }
        }

        task.initial = self
            .objects
            .iter()
            .zip(&self.initial)
            .filter_map(|(o, &l)| self.locations.get(l).map(|l| Self::on(o, l)))
            .collect();
        task.initial.push(ready(ELSEWHERE));
        task.initial.push(GRIPPER_FREE.to_string());
        task
    }
}
