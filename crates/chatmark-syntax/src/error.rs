//! Parse errors.
//!
//! Parsing is total for well-formed and malformed markdown alike; the only
//! failures are the guards that bound work on pathological input, and the
//! final check that the tree has a document at its root.

use std::fmt;

use thiserror::Error;

/// Which parsing loop a guard belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardScope {
    Block,
    Inline,
}

impl fmt::Display for GuardScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardScope::Block => f.write_str("block"),
            GuardScope::Inline => f.write_str("inline"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{scope} parsing timeout: document too complex or infinite loop detected")]
    Timeout { scope: GuardScope },

    #[error("{scope} parser stuck: infinite loop detected at token position {position}")]
    Stuck { scope: GuardScope, position: usize },

    #[error("too many consecutive empty blocks: possible infinite loop in parser")]
    TooManyEmptyBlocks,

    #[error("nesting too deep: {depth} levels exceeds the configured maximum")]
    NestingTooDeep { depth: usize },

    #[error("invalid tree: root node is not a document")]
    NotADocument,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_messages_name_the_loop() {
        let err = ParseError::Stuck {
            scope: GuardScope::Inline,
            position: 7,
        };
        assert_eq!(
            err.to_string(),
            "inline parser stuck: infinite loop detected at token position 7"
        );
        assert_eq!(
            ParseError::Timeout {
                scope: GuardScope::Block
            }
            .to_string(),
            "block parsing timeout: document too complex or infinite loop detected"
        );
    }
}
