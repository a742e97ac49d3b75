use crate::reference::Ref;

/// Inner node of a Boolean diagram. Variable 0 marks the terminal and free slots.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Node {
    pub variable: u32,
    pub low: Ref,
    pub high: Ref,
}

impl Node {
    pub const FREE: Node = Node {
        variable: 0,
        low: Ref::INVALID,
        high: Ref::INVALID,
    };

    pub fn is_free(&self) -> bool {
        self.variable == 0
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::FREE
    }
}
