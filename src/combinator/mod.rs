//! # The combinator library
//!
//! A grammar is a tree of [`Combinator`] values, built from the factories
//! in this module and interpreted by the [`Parser`][crate::Parser] call
//! dispatcher. Construction is declarative: `all(vec![a, b])` returns a
//! value that, when called, performs the actual match.
//!
//! | combinator | behavior |
//! |---|---|
//! | [`all`] | every child in order, cumulative consumption |
//! | [`any`] | first child to match wins |
//! | [`rep`] | bounded repetition, `max == 0` meaning unbounded |
//! | [`chr`] | match one exact character |
//! | [`rng`] | match one character in an inclusive range |
//! | [`but`] | match the head unless a negative also matches there |
//! | [`chk`] | zero-width assertion (lookahead, negation, lookbehind) |
//! | [`case`] | branch on a frame variable |
//! | [`flip`] | map a frame variable to a value or sub-rule |
//! | [`set`] | bind a frame variable |
//! | [`add`], [`sub`] | integer arithmetic over call results |
//! | [`max`], [`exclude`] | reserved placeholders, always succeed |
//! | [`refer`] | call a production by name through the grammar |
//!
//! Terminals the engine provides directly: [`chr`], [`rng`],
//! [`start_of_line`], [`end_of_stream`], [`empty`],
//! [`auto_detect_indent`].
//!
//! Combinators that consume input restore the cursor themselves when they
//! fail; the dispatcher never rewinds on their behalf.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::parser::Parser;
use crate::value::{Kind, Value};

#[cfg(test)]
mod tests;

/// A rule body: invoked by the dispatcher with the evaluated call
/// arguments once the activation record is in place.
pub type Body = dyn Fn(&mut Parser<'_>, &[Value]) -> Result<Step>;

/// A deferred argument, invoked at call time.
pub type Thunk = dyn Fn(&mut Parser<'_>) -> Result<Value>;

/// What a rule body hands back to the dispatcher.
pub enum Step {
    /// A ground value; the call is complete.
    Done(Value),
    /// Another combinator to run in the same activation record.
    ///
    /// This is the trampoline that lets a production expand to its body
    /// without a second stack frame, and caps host-stack growth on long
    /// reference chains.
    Jump(Combinator),
}

impl Step {
    /// Shorthand for `Step::Done(value.into())`.
    #[inline]
    pub fn done(value: impl Into<Value>) -> Self {
        Step::Done(value.into())
    }
}

/// A named parsing function.
pub struct Rule {
    name: Rc<str>,
    returns: Kind,
    body: Box<Body>,
}

impl Rule {
    /// The trace name, e.g. `ns_char` or the synthetic `rep(0,5)`.
    #[inline]
    pub fn name(&self) -> &Rc<str> {
        &self.name
    }

    /// The declared return type.
    #[inline]
    pub fn returns(&self) -> Kind {
        self.returns
    }

    pub(crate) fn invoke(&self, parser: &mut Parser<'_>, args: &[Value]) -> Result<Step> {
        (self.body)(parser, args)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

/// A combinator paired with arguments to resolve at call time.
#[derive(Debug)]
pub struct Apply {
    pub(crate) head: Combinator,
    pub(crate) args: Vec<Arg>,
}

/// An argument of an [`Apply`].
#[derive(Clone)]
pub enum Arg {
    /// Evaluated by calling through the dispatcher with an `Any`
    /// expectation.
    Comb(Combinator),
    /// Invoked at call time to produce its value.
    Thunk(Rc<Thunk>),
    /// Passed through unchanged.
    Val(Value),
}

impl Arg {
    /// Wrap a closure as a deferred argument.
    pub fn thunk(f: impl Fn(&mut Parser<'_>) -> Result<Value> + 'static) -> Self {
        Arg::Thunk(Rc::new(f))
    }
}

impl From<Combinator> for Arg {
    fn from(c: Combinator) -> Self {
        Arg::Comb(c)
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Val(v)
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Comb(c) => f.debug_tuple("Comb").field(c).finish(),
            Arg::Thunk(_) => f.write_str("Thunk(..)"),
            Arg::Val(v) => f.debug_tuple("Val").field(v).finish(),
        }
    }
}

/// A callable fragment of grammar.
///
/// Cloning is cheap: rules and applications are reference-counted, and the
/// engine keys its receiver-hook cache on that shared identity.
#[derive(Clone)]
pub enum Combinator {
    /// A numeric literal, returned verbatim by
    /// [`call`][crate::Parser::call] with no frame, trace, or receiver
    /// involvement. Numeric arguments such as `rep` bounds piggy-back on
    /// the call path this way.
    Lit(i64),
    /// A named parsing function.
    Rule(Rc<Rule>),
    /// A combinator applied to a fixed argument list.
    Apply(Rc<Apply>),
}

impl Combinator {
    /// A numeric literal.
    #[inline]
    pub fn lit(n: i64) -> Self {
        Combinator::Lit(n)
    }

    /// A named rule with a declared return type.
    ///
    /// This is the extension point for grammar-specific terminals; every
    /// factory in this module goes through it.
    pub fn rule(
        name: impl Into<Rc<str>>,
        returns: Kind,
        body: impl Fn(&mut Parser<'_>, &[Value]) -> Result<Step> + 'static,
    ) -> Self {
        Combinator::Rule(Rc::new(Rule {
            name: name.into(),
            returns,
            body: Box::new(body),
        }))
    }

    /// Pair a combinator with arguments to be resolved at call time.
    pub fn apply(head: Combinator, args: Vec<Arg>) -> Self {
        Combinator::Apply(Rc::new(Apply { head, args }))
    }

    /// The trace name of the underlying rule.
    pub fn label(&self) -> &str {
        match self {
            Combinator::Lit(_) => "lit",
            Combinator::Rule(r) => r.name(),
            Combinator::Apply(app) => app.head.label(),
        }
    }
}

impl fmt::Debug for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::Lit(n) => write!(f, "Lit({n})"),
            Combinator::Rule(r) => write!(f, "Rule({})", r.name()),
            Combinator::Apply(app) => write!(f, "Apply({})", app.head.label()),
        }
    }
}

/// Succeed iff all children succeed in order, consuming cumulatively.
///
/// On any child failure the cursor is restored to the entry position.
///
/// # Example
///
/// ```rust
/// use thresh::combinator::{all, chr};
/// use thresh::grammar::RuleSet;
/// use thresh::Parser;
///
/// let mut grammar = RuleSet::new("TOP");
/// grammar.define("TOP", all(vec![chr('a'), chr('b')]));
///
/// let mut receiver = ();
/// assert!(Parser::new(&grammar, &mut receiver, "ab").parse().is_ok());
/// assert!(Parser::new(&grammar, &mut receiver, "ba").parse().is_err());
/// ```
pub fn all(seq: Vec<Combinator>) -> Combinator {
    Combinator::rule("all", Kind::Boolean, move |p, _| {
        let entry = p.pos();
        for child in &seq {
            if !p.call_bool(child)? {
                p.set_pos(entry);
                return Ok(Step::done(false));
            }
        }
        Ok(Step::done(true))
    })
}

/// Try children in order; the first success is the result.
///
/// Input consumed by the winning child stays consumed. On total failure
/// the cursor is left wherever the last child left it: children own their
/// own rollback, and callers that require a clean rewind wrap the
/// alternation in [`chk`] or [`all`].
pub fn any(seq: Vec<Combinator>) -> Combinator {
    Combinator::rule("any", Kind::Boolean, move |p, _| {
        for child in &seq {
            if p.call_bool(child)? {
                return Ok(Step::done(true));
            }
        }
        Ok(Step::done(false))
    })
}

/// Repeat `f` between `min` and `max` times; `max == 0` means unbounded.
///
/// Bounds are combinators resolved at match time, so they may be
/// [`Lit`][Combinator::Lit]s or computed by [`add`]/[`sub`]. A successful
/// zero-width match succeeds immediately when `min == 0` (the
/// zero-progress guard) and otherwise ends the loop after being counted
/// once.
///
/// # Example
///
/// ```rust
/// use thresh::combinator::{chr, rep, Combinator};
/// use thresh::grammar::RuleSet;
/// use thresh::Parser;
///
/// let mut grammar = RuleSet::new("TOP");
/// grammar.define(
///     "TOP",
///     rep(Combinator::lit(2), Combinator::lit(3), chr('a')),
/// );
///
/// let mut receiver = ();
/// assert!(Parser::new(&grammar, &mut receiver, "a").parse().is_err());
/// assert!(Parser::new(&grammar, &mut receiver, "aaa").parse().is_ok());
/// ```
pub fn rep(min: Combinator, max: Combinator, f: Combinator) -> Combinator {
    let label = format!("rep({},{})", bound_label(&min), bound_label(&max));
    Combinator::rule(label, Kind::Boolean, move |p, _| {
        let min = p.call_int(&min)?;
        let max = p.call_int(&max)?;
        let entry = p.pos();
        let mut count: i64 = 0;
        while p.pos() < p.len() {
            let before = p.pos();
            if !p.call_bool(&f)? {
                break;
            }
            if p.pos() == before {
                if min == 0 {
                    return Ok(Step::done(true));
                }
                count += 1;
                break;
            }
            count += 1;
            if max != 0 && count >= max {
                break;
            }
        }
        if count >= min && (max == 0 || count <= max) {
            Ok(Step::done(true))
        } else {
            p.set_pos(entry);
            Ok(Step::done(false))
        }
    })
}

fn bound_label(bound: &Combinator) -> String {
    match bound {
        Combinator::Lit(n) => n.to_string(),
        Combinator::Rule(r) => r.name().to_string(),
        Combinator::Apply(app) => bound_label(&app.head),
    }
}

/// Match exactly the character `c`, advancing one position.
pub fn chr(c: char) -> Combinator {
    let label = format!("chr(0x{:x})", c as u32);
    Combinator::rule(label, Kind::Boolean, move |p, _| {
        Ok(Step::done(match p.char_at(p.pos()) {
            Some(have) if have == c => {
                p.set_pos(p.pos() + 1);
                true
            }
            _ => false,
        }))
    })
}

/// Match one character in `[lo, hi]` inclusive, advancing one position.
pub fn rng(lo: char, hi: char) -> Combinator {
    let label = format!("rng(0x{:x},0x{:x})", lo as u32, hi as u32);
    Combinator::rule(label, Kind::Boolean, move |p, _| {
        Ok(Step::done(match p.char_at(p.pos()) {
            Some(have) if lo <= have && have <= hi => {
                p.set_pos(p.pos() + 1);
                true
            }
            _ => false,
        }))
    })
}

/// Succeed iff `head` matches and none of `negatives` match at the same
/// entry position.
///
/// The cursor ends where `head` left it on success, and at entry on
/// failure.
pub fn but(head: Combinator, negatives: Vec<Combinator>) -> Combinator {
    Combinator::rule("but", Kind::Boolean, move |p, _| {
        let entry = p.pos();
        if !p.call_bool(&head)? {
            p.set_pos(entry);
            return Ok(Step::done(false));
        }
        let matched = p.pos();
        for negative in &negatives {
            p.set_pos(entry);
            if p.call_bool(negative)? {
                p.set_pos(entry);
                return Ok(Step::done(false));
            }
        }
        p.set_pos(matched);
        Ok(Step::done(true))
    })
}

/// The flavor of a [`chk`] assertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assert {
    /// `=`: succeed iff the expression matches here.
    Is,
    /// `!`: succeed iff the expression does not match here.
    Not,
    /// `<=`: succeed iff the expression matches one character back.
    Back,
}

/// A zero-width assertion: the cursor is always restored.
///
/// [`Assert::Back`] probes one character behind the cursor and is a fatal
/// [`Error::LookbehindAtStart`] at position zero.
pub fn chk(assert: Assert, expr: Combinator) -> Combinator {
    let label = match assert {
        Assert::Is => "chk(=)",
        Assert::Not => "chk(!)",
        Assert::Back => "chk(<=)",
    };
    Combinator::rule(label, Kind::Boolean, move |p, _| {
        let entry = p.pos();
        if assert == Assert::Back {
            if entry == 0 {
                return Err(Error::LookbehindAtStart);
            }
            p.set_pos(entry - 1);
        }
        let matched = p.call_bool(&expr)?;
        p.set_pos(entry);
        Ok(Step::done(if assert == Assert::Not {
            !matched
        } else {
            matched
        }))
    })
}

/// Branch on a frame variable: the arm whose key equals the variable's
/// value is called as a rule.
///
/// An unbound variable or a value with no arm is fatal.
pub fn case(var: &str, arms: Vec<(&str, Combinator)>) -> Combinator {
    let var: Rc<str> = var.into();
    let arms: FxHashMap<Box<str>, Combinator> =
        arms.into_iter().map(|(k, v)| (k.into(), v)).collect();
    Combinator::rule("case", Kind::Boolean, move |p, _| {
        let key = p.selector(&var)?;
        match arms.get(key.as_str()) {
            Some(arm) => Ok(Step::done(p.call_bool(arm)?)),
            None => Err(Error::MissingArm {
                var: var.to_string(),
                key,
            }),
        }
    })
}

/// Map a frame variable to a value.
///
/// A ground arm ([`Arg::Val`]) is returned directly; a combinator arm is
/// called with an `Any` expectation; a thunk arm is invoked. Used where a
/// grammar parameter is data rather than a sub-parser.
pub fn flip(var: &str, arms: Vec<(&str, Arg)>) -> Combinator {
    let var: Rc<str> = var.into();
    let arms: FxHashMap<Box<str>, Arg> = arms.into_iter().map(|(k, v)| (k.into(), v)).collect();
    Combinator::rule("flip", Kind::Any, move |p, _| {
        let key = p.selector(&var)?;
        match arms.get(key.as_str()) {
            Some(Arg::Val(v)) => Ok(Step::Done(v.clone())),
            Some(Arg::Comb(c)) => Ok(Step::Done(p.call(c, Kind::Any)?)),
            Some(Arg::Thunk(t)) => Ok(Step::Done(t(p)?)),
            None => Err(Error::MissingArm {
                var: var.to_string(),
                key,
            }),
        }
    })
}

/// Evaluate `expr` and bind the result under `var` in the frame this
/// `set` was invoked under; always succeeds.
///
/// The binding is visible to later siblings and to anything called below
/// that frame.
pub fn set(var: &str, expr: Combinator) -> Combinator {
    let var: Rc<str> = var.into();
    Combinator::rule("set", Kind::Boolean, move |p, _| {
        let value = p.call(&expr, Kind::Any)?;
        p.set_var(Rc::clone(&var), value);
        Ok(Step::done(true))
    })
}

/// The integer sum of two calls.
pub fn add(x: Combinator, y: Combinator) -> Combinator {
    Combinator::rule("add", Kind::Any, move |p, _| {
        let sum = p.call_int(&x)? + p.call_int(&y)?;
        Ok(Step::done(sum))
    })
}

/// The integer difference of two calls.
pub fn sub(x: Combinator, y: Combinator) -> Combinator {
    Combinator::rule("sub", Kind::Any, move |p, _| {
        let diff = p.call_int(&x)? - p.call_int(&y)?;
        Ok(Step::done(diff))
    })
}

/// Reserved placeholder; always succeeds without consuming.
pub fn max(width: Combinator) -> Combinator {
    let _ = width;
    Combinator::rule("max", Kind::Boolean, |_, _| Ok(Step::done(true)))
}

/// Reserved placeholder; always succeeds without consuming.
pub fn exclude(rule: Combinator) -> Combinator {
    let _ = rule;
    Combinator::rule("exclude", Kind::Boolean, |_, _| Ok(Step::done(true)))
}

/// True at position zero or just after a newline.
pub fn start_of_line() -> Combinator {
    Combinator::rule("start_of_line", Kind::Boolean, |p, _| {
        let pos = p.pos();
        Ok(Step::done(pos == 0 || p.char_at(pos - 1) == Some('\n')))
    })
}

/// True at or past the end of input.
pub fn end_of_stream() -> Combinator {
    Combinator::rule("end_of_stream", Kind::Boolean, |p, _| {
        Ok(Step::done(p.pos() >= p.len()))
    })
}

/// Always true; consumes nothing.
pub fn empty() -> Combinator {
    Combinator::rule("empty", Kind::Boolean, |_, _| Ok(Step::done(true)))
}

/// Placeholder indentation probe; returns the integer `1`.
pub fn auto_detect_indent() -> Combinator {
    Combinator::rule("auto_detect_indent", Kind::Any, |_, _| {
        Ok(Step::done(1i64))
    })
}

/// Call a production by name, resolved through the grammar at call time.
///
/// The resolved rule runs in this call's activation record, so the name
/// owns a single frame; applied arguments are forwarded.
pub fn refer(name: &str) -> Combinator {
    let name: Rc<str> = name.into();
    let label = Rc::clone(&name);
    Combinator::rule(label, Kind::Boolean, move |p, _| {
        match p.lookup_rule(&name) {
            Some(target) => Ok(Step::Jump(target)),
            None => Err(Error::UnknownRule {
                name: name.to_string(),
            }),
        }
    })
}
