//! # thresh, a grammar-driven parser VM
//!
//! `thresh` interprets a grammar expressed as a runtime tree of parsing
//! [combinators][crate::combinator] — a tiny virtual machine for a
//! PEG-like grammar with backtracking, rather than a compile-time
//! combinator library. The pieces:
//!
//! - a [`Grammar`][crate::grammar::Grammar] supplies named productions as
//!   [`Combinator`][crate::combinator::Combinator] values;
//! - the [`Parser`] dispatches calls over them, managing the cursor and
//!   the backtracking activation stack;
//! - a [`Receiver`][crate::receiver::Receiver] observes rule lifecycle
//!   events (`try`/`got`/`not`), keyed by the rule-call path, and
//!   accumulates the application's result;
//! - an optional [`Trace`][crate::trace::Trace] renders every call as a
//!   human-readable diagnostic stream.
//!
//! ## Example
//!
//! ```rust
//! use thresh::combinator::{all, chr, rep, Combinator};
//! use thresh::grammar::RuleSet;
//! use thresh::Parser;
//!
//! // TOP := 'a' 'b'*
//! let mut grammar = RuleSet::new("TOP");
//! grammar.define(
//!     "TOP",
//!     all(vec![
//!         chr('a'),
//!         rep(Combinator::lit(0), Combinator::lit(0), chr('b')),
//!     ]),
//! );
//!
//! let mut receiver = ();
//! let mut parser = Parser::new(&grammar, &mut receiver, "abbb");
//! assert!(parser.parse().is_ok());
//! ```
//!
//! Parsing is fail-fast: the expected failure of a rule is an ordinary
//! `false` that alternations backtrack over, while engine
//! misconfigurations surface as [`Error`][crate::error::Error]s from
//! [`Parser::parse`]. There is no left-recursion handling, no
//! memoization, and no error recovery.

#![deny(missing_docs)]

pub mod combinator;
pub mod error;
pub mod grammar;
pub mod receiver;
pub mod stream;
pub mod trace;

mod parser;
mod value;

pub use self::parser::{Frame, Parser};
pub use self::value::{Kind, Value};

/// Core concepts available for glob import.
///
/// ## Example
///
/// ```rust
/// use thresh::prelude::*;
///
/// let mut grammar = RuleSet::new("TOP");
/// grammar.define("TOP", chr('a'));
/// let mut receiver = ();
/// assert!(Parser::new(&grammar, &mut receiver, "a").parse().is_ok());
/// ```
pub mod prelude {
    pub use crate::combinator::{
        all, any, but, chk, chr, empty, end_of_stream, refer, rep, rng, set, start_of_line,
        Assert, Combinator,
    };
    pub use crate::error::{Error, Result};
    pub use crate::grammar::{Grammar, RuleSet};
    pub use crate::receiver::{Event, Hook, Hooks, Receiver};
    pub use crate::trace::Trace;
    pub use crate::Kind;
    pub use crate::Parser;
    pub use crate::Value;
}
