use std::fmt::{Display, Formatter};
use std::ops::Neg;

/// Handle to a node of a [`Bdd`][crate::bdd::Bdd], with a complement bit.
///
/// The lowest bit stores the negation flag, the remaining bits store the node id.
/// Negation is therefore a single XOR, and `f` and `¬f` share one node.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref(u32);

impl Ref {
    /// Placeholder for "no node yet".
    pub const INVALID: Ref = Ref(0);

    pub const fn positive(id: u32) -> Self {
        Self(id << 1)
    }

    pub const fn negative(id: u32) -> Self {
        Self((id << 1) | 1)
    }

    /// Node id (without the complement bit).
    pub const fn id(self) -> u32 {
        self.0 >> 1
    }

    pub const fn index(self) -> usize {
        (self.0 >> 1) as usize
    }

    pub const fn is_negated(self) -> bool {
        self.0 & 1 != 0
    }

    /// Raw representation, used as a cache key.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Same node, positive polarity.
    pub const fn regular(self) -> Self {
        Self(self.0 & !1)
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(self.0 ^ 1)
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.id())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_negation_is_involution() {
        let r = Ref::positive(7);
        assert!(!r.is_negated());
        assert!((-r).is_negated());
        assert_eq!(-(-r), r);
        assert_eq!((-r).id(), 7);
        assert_eq!((-r).regular(), r);
        assert_eq!(Ref::negative(7), -r);
    }

    #[test]
    fn test_display() {
        assert_eq!(Ref::positive(3).to_string(), "@3");
        assert_eq!(Ref::negative(3).to_string(), "~@3");
    }
}
