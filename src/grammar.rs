//! # The grammar interface
//!
//! The engine never owns a grammar; it consumes one through [`Grammar`].
//! A grammar is any source of named [`Combinator`]s plus a designated top
//! rule to start a parse from. [`RuleSet`] is the supplied table-backed
//! implementation, enough for test grammars and for grammars built
//! programmatically at startup; recursive productions reference each other
//! through [`refer`][crate::combinator::refer], which resolves back
//! through this interface at call time.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::combinator::{Combinator, Step};
use crate::error::{Error, Result};
use crate::parser::Parser;
use crate::value::{Kind, Value};

/// A source of named productions.
pub trait Grammar {
    /// The starting combinator for [`parse`][crate::Parser::parse].
    fn top(&self) -> Combinator;

    /// Look up a named production.
    fn lookup_rule(&self, name: &str) -> Option<Combinator>;
}

/// A grammar backed by a name → combinator table.
///
/// [`define`][RuleSet::define] wraps each body in a rule carrying the
/// production's name, so the name owns the activation record and the body
/// runs inside it via the dispatcher trampoline.
pub struct RuleSet {
    start: Rc<str>,
    rules: FxHashMap<Rc<str>, Combinator>,
}

impl RuleSet {
    /// An empty grammar that will start from the production `start`.
    pub fn new(start: &str) -> Self {
        Self {
            start: start.into(),
            rules: FxHashMap::default(),
        }
    }

    /// Define a production: `name` becomes a boolean rule that expands to
    /// `body`.
    pub fn define(&mut self, name: &str, body: Combinator) {
        let name: Rc<str> = name.into();
        let rule = Combinator::rule(Rc::clone(&name), Kind::Boolean, move |_, _| {
            Ok(Step::Jump(body.clone()))
        });
        self.rules.insert(name, rule);
    }

    /// Define a production with an explicit return type and a hand-written
    /// body, e.g. a parameterized production reading its applied args.
    pub fn define_with(
        &mut self,
        name: &str,
        returns: Kind,
        body: impl Fn(&mut Parser<'_>, &[Value]) -> Result<Step> + 'static,
    ) {
        let name: Rc<str> = name.into();
        let rule = Combinator::rule(Rc::clone(&name), returns, body);
        self.rules.insert(name, rule);
    }
}

impl Grammar for RuleSet {
    fn top(&self) -> Combinator {
        match self.lookup_rule(&self.start) {
            Some(rule) => rule,
            // Surface the misconfiguration through the call path rather
            // than here, so it flushes the trace like any fatal error.
            None => {
                let name = self.start.to_string();
                Combinator::rule(Rc::clone(&self.start), Kind::Boolean, move |_, _| {
                    Err(Error::UnknownRule { name: name.clone() })
                })
            }
        }
    }

    fn lookup_rule(&self, name: &str) -> Option<Combinator> {
        self.rules.get(name).cloned()
    }
}
