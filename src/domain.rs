//! Domain knowledge the builder needs beyond the operators themselves: how a
//! state is observed (its world-configuration [`Label`]) and whether an
//! action may fire in it.

use crate::action::Action;
use crate::encoder::{Label, LabelSlot};
use crate::predicate::{PredicateTable, State};

pub trait Domain {
    /// Shape of the labels produced by [`Domain::label`].
    fn label_slots(&self) -> Vec<LabelSlot>;

    fn label(&self, state: &State, table: &PredicateTable) -> Label;

    /// Applicability test used during construction, including mutual exclusion.
    fn admits(&self, action: &Action, state: &State, table: &PredicateTable) -> bool {
        action.is_applicable(state, table)
    }
}

/// One presence slot per fact: the label of a state is the set of facts
/// holding in it.
///
/// Guard atoms are fact names such as `(at agent l3)`.
#[derive(Debug, Clone)]
pub struct FactDomain {
    facts: Vec<String>,
}

impl FactDomain {
    pub fn new(table: &PredicateTable) -> Self {
        Self {
            facts: table.iter().map(|(_, p)| p.to_string()).collect(),
        }
    }
}

impl Domain for FactDomain {
    fn label_slots(&self) -> Vec<LabelSlot> {
        self.facts.iter().map(|f| LabelSlot::new(f.clone(), [f.clone()])).collect()
    }

    fn label(&self, state: &State, _table: &PredicateTable) -> Label {
        let mut label: Label = vec![None; self.facts.len()];
        for id in state.ids() {
            if let Some(slot) = label.get_mut(id.index()) {
                *slot = Some(0);
            }
        }
        label
    }
}

/// Objects on locations plus the gripper status.
///
/// One slot per object, valued `(on o l)`, and one `gripper` slot valued
/// `(gripper free)`. A grasped object has no `on` fact, so its slot is empty.
#[derive(Debug, Clone)]
pub struct ManipulationDomain {
    pub objects: Vec<String>,
    pub locations: Vec<String>,
}

pub const GRIPPER_FREE: &str = "(gripper free)";

impl ManipulationDomain {
    pub fn new<S: Into<String>>(objects: impl IntoIterator<Item = S>, locations: impl IntoIterator<Item = S>) -> Self {
        Self {
            objects: objects.into_iter().map(Into::into).collect(),
            locations: locations.into_iter().map(Into::into).collect(),
        }
    }
}

impl Domain for ManipulationDomain {
    fn label_slots(&self) -> Vec<LabelSlot> {
        let mut slots: Vec<LabelSlot> = self
            .objects
            .iter()
            .map(|o| LabelSlot::new(o.clone(), self.locations.iter().map(|l| format!("(on {} {})", o, l))))
            .collect();
        slots.push(LabelSlot::new("gripper", [GRIPPER_FREE]));
        slots
    }

    fn label(&self, state: &State, table: &PredicateTable) -> Label {
        let mut label: Label = vec![None; self.objects.len() + 1];
        for &id in state.ids() {
            let p = table.predicate(id);
            match (p.name.as_str(), p.args.as_slice()) {
                ("on", [object, location]) => {
                    let o = self.objects.iter().position(|x| x == object);
                    let l = self.locations.iter().position(|x| x == location);
                    if let (Some(o), Some(l)) = (o, l) {
                        label[o] = Some(l);
                    }
                }
                ("gripper", [status]) if status == "free" => {
                    label[self.objects.len()] = Some(0);
                }
                _ => {}
            }
        }
        label
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_manipulation_label() {
        let table = PredicateTable::new(["(on b0 l2)", "(on b1 l1)", "(holding b1 l1)", "(gripper free)", "(ready else)"]).unwrap();
        let id = |f: &str| table.id(f).unwrap().unwrap();
        let domain = ManipulationDomain::new(["b0", "b1"], ["l1", "l2"]);

        let s = State::new([id("(on b0 l2)"), id("(on b1 l1)"), id("(gripper free)"), id("(ready else)")]);
        assert_eq!(domain.label(&s, &table), vec![Some(1), Some(0), Some(0)]);

        let held = State::new([id("(on b0 l2)"), id("(holding b1 l1)")]);
        assert_eq!(domain.label(&held, &table), vec![Some(1), None, None]);

        let slots = domain.label_slots();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[1].values, vec!["(on b1 l1)", "(on b1 l2)"]);
    }

    #[test]
    fn test_fact_label() {
        let table = PredicateTable::new(["(at a)", "(at b)", "(lit c)"]).unwrap();
        let domain = FactDomain::new(&table);
        let id = |f: &str| table.id(f).unwrap().unwrap();
        assert_eq!(domain.label(&State::singleton(id("(at b)")), &table), vec![None, Some(0), None]);

        let both = State::new([id("(at b)"), id("(lit c)")]);
        assert_eq!(domain.label(&both, &table), vec![None, Some(0), Some(0)]);

        let slots = domain.label_slots();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[2].values, vec!["(lit c)"]);
    }
}
