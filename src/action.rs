//! Grounded operators, as handed over by a grounding component, and their
//! interned form.
//!
//! Operator names are predicate-shaped (`(transfer b0 l1 l2)`); the first
//! token is the action *schema* and is resolved once, here, into an
//! [`ActionKind`]. Everything downstream dispatches on the kind, never on
//! the name.

use std::fmt;

use crate::error::{Error, Result};
use crate::predicate::{PredId, Predicate, PredicateTable, State};

/// Which player owns an action in the two-player game.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Player {
    #[default]
    System,
    Environment,
}

/// Closed set of action variants, with the arguments the domain logic needs.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ActionKind {
    /// Robot moves its empty gripper next to an object.
    Transit { object: String, from: String, to: String },
    /// Robot closes the gripper on an object.
    Grasp { object: String, at: String },
    /// Robot carries a grasped object.
    Transfer { object: String, from: String, to: String },
    /// Robot puts a carried object down.
    Release { object: String, at: String },
    /// The human relocates an object.
    HumanMove { object: String, from: String, to: String },
    /// Single agent move between locations (`move`, `moveleft`, ...).
    Move,
    Other,
}

impl ActionKind {
    /// Resolves the kind from a parsed operator name.
    pub fn resolve(name: &Predicate) -> Result<ActionKind> {
        let malformed = |kind: &'static str| Error::MalformedAction {
            kind,
            action: name.to_string(),
        };
        let args = &name.args;
        let kind = match name.name.as_str() {
            "transit" => match args.as_slice() {
                [object, from, to] => ActionKind::Transit {
                    object: object.clone(),
                    from: from.clone(),
                    to: to.clone(),
                },
                _ => return Err(malformed("transit")),
            },
            "grasp" => match args.as_slice() {
                [object, at] => ActionKind::Grasp {
                    object: object.clone(),
                    at: at.clone(),
                },
                _ => return Err(malformed("grasp")),
            },
            "transfer" => match args.as_slice() {
                [object, from, to] => ActionKind::Transfer {
                    object: object.clone(),
                    from: from.clone(),
                    to: to.clone(),
                },
                _ => return Err(malformed("transfer")),
            },
            "release" => match args.as_slice() {
                [object, at] => ActionKind::Release {
                    object: object.clone(),
                    at: at.clone(),
                },
                _ => return Err(malformed("release")),
            },
            "human-move" => match args.as_slice() {
                [object, from, to] => ActionKind::HumanMove {
                    object: object.clone(),
                    from: from.clone(),
                    to: to.clone(),
                },
                _ => return Err(malformed("human-move")),
            },
            schema if schema.starts_with("move") => ActionKind::Move,
            _ => ActionKind::Other,
        };
        Ok(kind)
    }

    /// The object this action puts down somewhere, with the location.
    pub fn destination(&self) -> Option<(&str, &str)> {
        match self {
            ActionKind::Transfer { object, to, .. } | ActionKind::HumanMove { object, to, .. } => {
                Some((object, to))
            }
            ActionKind::Release { object, at } => Some((object, at)),
            _ => None,
        }
    }

    /// Whether another object already sits (`(on other loc)`) at this action's destination.
    pub fn collides(&self, state: &State, table: &PredicateTable) -> bool {
        let Some((object, location)) = self.destination() else {
            return false;
        };
        state.ids().iter().any(|&id| {
            let p = table.predicate(id);
            p.name == "on" && p.args.len() == 2 && p.args[1] == location && p.args[0] != object
        })
    }

    pub fn player(&self) -> Player {
        match self {
            ActionKind::HumanMove { .. } => Player::Environment,
            _ => Player::System,
        }
    }
}

/// An operator as produced by an external grounding component.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GroundedOperator {
    pub name: String,
    pub preconditions: Vec<String>,
    pub add_effects: Vec<String>,
    pub del_effects: Vec<String>,
    pub player: Player,
}

impl GroundedOperator {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        preconditions: impl IntoIterator<Item = S>,
        add_effects: impl IntoIterator<Item = S>,
        del_effects: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            preconditions: preconditions.into_iter().map(Into::into).collect(),
            add_effects: add_effects.into_iter().map(Into::into).collect(),
            del_effects: del_effects.into_iter().map(Into::into).collect(),
            player: Player::System,
        }
    }

    pub fn owned_by(mut self, player: Player) -> Self {
        self.player = player;
        self
    }
}

/// A grounded planning task.
#[derive(Debug, Clone, Default)]
pub struct GroundedTask {
    pub facts: Vec<String>,
    pub operators: Vec<GroundedOperator>,
    pub initial: Vec<String>,
    pub goal: Vec<String>,
}

/// Counter fact for `k` environment interventions left.
pub fn interventions_left(k: usize) -> String {
    format!("(interventions-left {})", k)
}

impl GroundedTask {
    /// The same task with the environment limited to `budget` interventions
    /// over a whole run.
    ///
    /// Adds one counter fact per remaining budget, starting at `budget`.
    /// Every environment operator is grounded once per nonzero level and
    /// moves the counter one level down, so none is applicable at zero.
    pub fn with_intervention_budget(&self, budget: usize) -> Result<GroundedTask> {
        let mut task = GroundedTask {
            facts: self.facts.clone(),
            operators: Vec::with_capacity(self.operators.len()),
            initial: self.initial.clone(),
            goal: self.goal.clone(),
        };
        task.facts.extend((0..=budget).map(interventions_left));
        task.initial.push(interventions_left(budget));

        for op in &self.operators {
            let kind = ActionKind::resolve(&Predicate::parse(&op.name)?)?;
            if op.player == Player::System && kind.player() == Player::System {
                task.operators.push(op.clone());
                continue;
            }
            for k in 1..=budget {
                let mut bounded = op.clone();
                bounded.preconditions.push(interventions_left(k));
                bounded.add_effects.push(interventions_left(k - 1));
                bounded.del_effects.push(interventions_left(k));
                task.operators.push(bounded);
            }
        }
        Ok(task)
    }
}

/// An interned, immutable action.
#[derive(Debug, Clone)]
pub struct Action {
    pub name: String,
    pub schema: String,
    pub kind: ActionKind,
    pub pre: State,
    pub add: State,
    pub del: State,
    pub weight: Option<u32>,
    pub player: Player,
}

impl Action {
    /// Precondition holds and the destination (if any) is free.
    pub fn is_applicable(&self, state: &State, table: &PredicateTable) -> bool {
        state.is_superset(&self.pre) && !self.kind.collides(state, table)
    }

    /// `(state − del) ∪ add`
    pub fn successor(&self, state: &State) -> State {
        state.apply(&self.del, &self.add)
    }

    pub fn weight_or_default(&self) -> u32 {
        self.weight.unwrap_or(1)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A task with every fact interned; actions keep their registration order.
#[derive(Debug, Clone)]
pub struct Problem {
    pub actions: Vec<Action>,
    pub initial: State,
    pub goal: State,
}

impl Problem {
    pub fn ground(task: &GroundedTask, table: &PredicateTable) -> Result<Problem> {
        let intern = |owner: &str, facts: &[String]| -> Result<State> {
            let mut ids: Vec<PredId> = Vec::with_capacity(facts.len());
            for fact in facts {
                match table.id(fact)? {
                    Some(id) => ids.push(id),
                    None => {
                        return Err(Error::UnknownFact {
                            operator: owner.to_string(),
                            fact: fact.clone(),
                        })
                    }
                }
            }
            Ok(State::new(ids))
        };

        let mut actions = Vec::with_capacity(task.operators.len());
        for op in &task.operators {
            let parsed = Predicate::parse(&op.name)?;
            let kind = ActionKind::resolve(&parsed)?;
            let player = match kind.player() {
                Player::Environment => Player::Environment,
                Player::System => op.player,
            };
            actions.push(Action {
                name: parsed.to_string(),
                schema: parsed.name.clone(),
                kind,
                pre: intern(&op.name, &op.preconditions)?,
                add: intern(&op.name, &op.add_effects)?,
                del: intern(&op.name, &op.del_effects)?,
                weight: None,
                player,
            });
        }

        Ok(Problem {
            actions,
            initial: intern("initial state", &task.initial)?,
            goal: intern("goal", &task.goal)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn table() -> PredicateTable {
        PredicateTable::new([
            "(on b0 l1)",
            "(on b1 l2)",
            "(holding b0 l1)",
            "(to-loc b0 l2)",
            "(gripper free)",
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_kinds() {
        let kind = ActionKind::resolve(&Predicate::parse("(transfer b0 l1 l2)").unwrap()).unwrap();
        assert_eq!(kind.destination(), Some(("b0", "l2")));
        assert_eq!(kind.player(), Player::System);

        let kind = ActionKind::resolve(&Predicate::parse("(human-move b1 l2 l3)").unwrap()).unwrap();
        assert_eq!(kind.player(), Player::Environment);

        let kind = ActionKind::resolve(&Predicate::parse("(moveright l1 l2)").unwrap()).unwrap();
        assert_eq!(kind, ActionKind::Move);

        let err = ActionKind::resolve(&Predicate::parse("(grasp b0)").unwrap()).unwrap_err();
        assert!(matches!(err, Error::MalformedAction { kind: "grasp", .. }));
    }

    #[test]
    fn test_collision_with_other_object() {
        let table = table();
        let id = |f: &str| table.id(f).unwrap().unwrap();
        let state = State::new([id("(on b1 l2)"), id("(holding b0 l1)")]);

        let onto_b1 = ActionKind::resolve(&Predicate::parse("(transfer b0 l1 l2)").unwrap()).unwrap();
        assert!(onto_b1.collides(&state, &table));

        let elsewhere = ActionKind::resolve(&Predicate::parse("(transfer b0 l1 l3)").unwrap()).unwrap();
        assert!(!elsewhere.collides(&state, &table));
    }

    #[test]
    fn test_ground_and_apply() {
        let table = table();
        let task = GroundedTask {
            facts: vec![],
            operators: vec![GroundedOperator::new(
                "(transfer b0 l1 l2)",
                ["(holding b0 l1)"],
                ["(to-loc b0 l2)"],
                ["(holding b0 l1)"],
            )],
            initial: vec!["(holding b0 l1)".into(), "(on b1 l2)".into()],
            goal: vec![],
        };
        let problem = Problem::ground(&task, &table).unwrap();
        let action = &problem.actions[0];
        assert_eq!(action.schema, "transfer");

        // Blocked by b1 sitting on l2.
        assert!(!action.is_applicable(&problem.initial, &table));

        let free = State::singleton(table.id("(holding b0 l1)").unwrap().unwrap());
        assert!(action.is_applicable(&free, &table));
        let next = action.successor(&free);
        assert_eq!(next.display(&table).to_string(), "{(to-loc b0 l2)}");
    }

    #[test]
    fn test_intervention_budget() {
        let task = GroundedTask {
            facts: vec!["(on b0 l1)".into(), "(on b0 l2)".into()],
            operators: vec![
                GroundedOperator::new("(human-move b0 l1 l2)", ["(on b0 l1)"], ["(on b0 l2)"], ["(on b0 l1)"]),
                GroundedOperator::new("(nudge b0 l2 l1)", ["(on b0 l2)"], ["(on b0 l1)"], ["(on b0 l2)"])
                    .owned_by(Player::Environment),
                GroundedOperator::new("(sweep b0 l2 l1)", ["(on b0 l2)"], ["(on b0 l1)"], ["(on b0 l2)"]),
            ],
            initial: vec!["(on b0 l1)".into()],
            goal: vec![],
        };
        let bounded = task.with_intervention_budget(2).unwrap();
        assert_eq!(bounded.facts.len(), 5);
        assert_eq!(bounded.initial, vec!["(on b0 l1)", "(interventions-left 2)"]);
        // Two levels per environment operator, the system operator untouched.
        assert_eq!(bounded.operators.len(), 5);
        assert_eq!(bounded.operators.iter().filter(|op| op.name == "(sweep b0 l2 l1)").count(), 1);

        let table = PredicateTable::new(&bounded.facts).unwrap();
        let problem = Problem::ground(&bounded, &table).unwrap();
        let human = |state: &State| {
            problem
                .actions
                .iter()
                .filter(|a| a.player == Player::Environment && a.is_applicable(state, &table))
                .collect::<Vec<_>>()
        };
        let once = human(&problem.initial)[0].successor(&problem.initial);
        let twice = human(&once)[0].successor(&once);
        assert_eq!(human(&problem.initial).len(), 1);
        assert_eq!(
            twice.display(&table).to_string(),
            "{(on b0 l1), (interventions-left 0)}"
        );
        assert!(human(&twice).is_empty());

        let none = task.with_intervention_budget(0).unwrap();
        assert_eq!(none.operators.len(), 1);
    }

    #[test]
    fn test_ground_rejects_unknown_fact() {
        let table = table();
        let task = GroundedTask {
            operators: vec![GroundedOperator::new("(grasp b0 l1)", ["(to-obj b0 l1)"], [], [])],
            ..Default::default()
        };
        let err = Problem::ground(&task, &table).unwrap_err();
        assert!(matches!(err, Error::UnknownFact { .. }));
    }
}
