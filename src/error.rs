//! # Error management
//!
//! Two categories of failure exist, and only one of them is an [`Error`]:
//!
//! - **Parse failure** is expected and is represented by a `false`
//!   [`Value::Bool`][crate::Value] bubbling up through combinators, each of
//!   which is responsible for restoring the cursor when it chooses to fail.
//!   Only the outermost [`parse`][crate::Parser::parse] converts a final
//!   `false` into [`Error::Failed`].
//! - **Engine errors** are fatal and non-recoverable: a type mismatch
//!   against a declared return kind, a missing `case`/`flip` arm, an
//!   unresolved rule name. They abort the parse; the receiver keeps
//!   whatever state its last event produced.

use std::fmt;

/// Holds the result of an engine operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A fatal engine error.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The top rule reported no match.
    Failed,
    /// The top rule matched but left input behind, starting at `pos`.
    Trailing {
        /// Cursor position (in characters) where matching stopped.
        pos: usize,
    },
    /// A rule produced a value of the wrong type for its declaration or
    /// for its caller's expectation.
    TypeMismatch {
        /// Trace name of the offending rule.
        rule: String,
        /// What the declaration or the caller required.
        expected: &'static str,
        /// What the rule actually produced.
        actual: &'static str,
    },
    /// A `case` or `flip` selector matched none of the arms.
    MissingArm {
        /// The selector variable.
        var: String,
        /// The selector value that had no arm.
        key: String,
    },
    /// A `case` or `flip` selector variable is not bound in any enclosing
    /// frame.
    UnboundVar {
        /// The selector variable.
        var: String,
    },
    /// A by-name reference did not resolve against the grammar.
    UnknownRule {
        /// The name that failed to resolve.
        name: String,
    },
    /// A one-character lookbehind was attempted at the start of input.
    LookbehindAtStart,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Failed => f.write_str("parser failed"),
            Error::Trailing { pos } => {
                write!(f, "parser finished before end of input at position {pos}")
            }
            Error::TypeMismatch {
                rule,
                expected,
                actual,
            } => {
                write!(f, "rule '{rule}' returned {actual}, expected {expected}")
            }
            Error::MissingArm { var, key } => {
                write!(f, "no arm for '{key}' (selector variable '{var}')")
            }
            Error::UnboundVar { var } => {
                write!(f, "selector variable '{var}' is not bound")
            }
            Error::UnknownRule { name } => {
                write!(f, "unknown rule '{name}'")
            }
            Error::LookbehindAtStart => f.write_str("lookbehind at start of input"),
        }
    }
}

impl std::error::Error for Error {}
