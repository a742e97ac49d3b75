use thiserror::Error;

/// Broad classes of [`Error`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// The inputs cannot be encoded or built as given.
    Configuration,
    /// An encoder/builder invariant broke; the partial result must not be trusted.
    InternalInvariant,
    /// The run was cancelled through a [`CancelToken`][crate::cancel::CancelToken].
    Cancelled,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("encoding overflow in pool '{pool}': item #{index} does not fit in {width} bits")]
    EncodingOverflow { pool: String, index: usize, width: usize },

    #[error("storage bits must be at most {max}, got {bits}")]
    StorageBits { bits: usize, max: usize },

    #[error("no weight for action schema '{schema}' (action '{action}')")]
    MissingWeight { schema: String, action: String },

    #[error("operator '{operator}' mentions unknown fact '{fact}'")]
    UnknownFact { operator: String, fact: String },

    #[error("guard of automaton '{automaton}' mentions unknown label atom '{atom}'")]
    UnknownAtom { automaton: String, atom: String },

    #[error("automaton '{0}' has no states")]
    EmptyAutomaton(String),

    #[error("invalid automaton '{automaton}': {reason}")]
    InvalidAutomaton { automaton: String, reason: String },

    #[error("malformed predicate '{0}'")]
    MalformedPredicate(String),

    #[error("malformed arguments for {kind} action '{action}'")]
    MalformedAction { kind: &'static str, action: String },

    #[error("conflicting edge: action '{action}' from {from} leads both to {first} and {second}")]
    ConflictingEdge {
        action: String,
        from: String,
        first: String,
        second: String,
    },

    #[error("cube in pool '{pool}' does not decode to a known item")]
    UnknownCode { pool: String },

    #[error("transition system was not built with a game relation")]
    NotAGame,

    #[error("broken witness: {0}")]
    Witness(String),

    #[error("cancelled")]
    Cancelled,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EncodingOverflow { .. }
            | Error::StorageBits { .. }
            | Error::MissingWeight { .. }
            | Error::UnknownFact { .. }
            | Error::UnknownAtom { .. }
            | Error::EmptyAutomaton(_)
            | Error::InvalidAutomaton { .. }
            | Error::NotAGame => ErrorKind::Configuration,
            Error::MalformedPredicate(_)
            | Error::MalformedAction { .. }
            | Error::ConflictingEdge { .. }
            | Error::UnknownCode { .. }
            | Error::Witness(_) => ErrorKind::InternalInvariant,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_kinds() {
        let e = Error::MissingWeight {
            schema: "transit".to_string(),
            action: "(transit b0 l1 l2)".to_string(),
        };
        assert_eq!(e.kind(), ErrorKind::Configuration);
        assert_eq!(
            e.to_string(),
            "no weight for action schema 'transit' (action '(transit b0 l1 l2)')"
        );
        assert_eq!(Error::MalformedPredicate("(on".into()).kind(), ErrorKind::InternalInvariant);
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
    }
}
