//! The parser VM: call dispatch, the activation stack, and the cursor.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::combinator::{Arg, Combinator, Rule, Step};
use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::receiver::{Event, Hook, HookCache, Receiver};
use crate::stream::Input;
use crate::trace::{Mark, Trace};
use crate::value::{Kind, Value};

/// One in-flight rule call: trace name, nesting level, entry position,
/// and the rule-local variables bound by `set`.
#[derive(Debug)]
pub struct Frame {
    name: Rc<str>,
    lvl: usize,
    pos: usize,
    vars: FxHashMap<Rc<str>, Value>,
}

impl Frame {
    pub(crate) fn new(name: Rc<str>, lvl: usize, pos: usize) -> Self {
        Self {
            name,
            lvl,
            pos,
            vars: FxHashMap::default(),
        }
    }

    /// The trace name, e.g. `ns_plain` or the synthetic `chr(0x20)`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nesting level; the synthetic root is 0.
    #[inline]
    pub fn lvl(&self) -> usize {
        self.lvl
    }

    /// Cursor position at call entry, the rollback target.
    #[inline]
    pub fn entry(&self) -> usize {
        self.pos
    }

    /// A variable bound in this frame by `set`.
    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }
}

/// The parser VM.
///
/// One `Parser` holds exactly one input, cursor, activation stack, trace
/// buffer, and receiver borrow; it is single-threaded and strictly
/// synchronous, and runs one parse.
///
/// ## Example
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
/// let mut parser = Parser::new(&grammar, &mut receiver, "ab");
/// assert!(parser.parse().is_ok());
/// ```
pub struct Parser<'a> {
    input: Input<'a>,
    pos: usize,
    stack: Vec<Frame>,
    root: Frame,
    grammar: &'a dyn Grammar,
    receiver: &'a mut dyn Receiver,
    hooks: HookCache,
    trace: Option<Trace>,
}

impl<'a> Parser<'a> {
    /// A parser over `input`, matching `grammar` and reporting to
    /// `receiver`.
    pub fn new(grammar: &'a dyn Grammar, receiver: &'a mut dyn Receiver, input: &'a str) -> Self {
        Self {
            input: Input::new(input),
            pos: 0,
            stack: Vec::new(),
            root: Frame::new("".into(), 0, 0),
            grammar,
            receiver,
            hooks: HookCache::new(),
            trace: None,
        }
    }

    /// Attach a [`Trace`] recorder to this parse.
    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Match the grammar's top rule against the whole input.
    ///
    /// Fails with [`Error::Failed`] if the top rule reports no match, and
    /// with [`Error::Trailing`] if it matches without consuming
    /// everything.
    pub fn parse(&mut self) -> Result<()> {
        let top = self.grammar.top();
        self.run(top)
    }

    /// Like [`parse`][Self::parse], starting from a named production.
    pub fn parse_rule(&mut self, name: &str) -> Result<()> {
        match self.grammar.lookup_rule(name) {
            Some(rule) => self.run(rule),
            None => Err(Error::UnknownRule {
                name: name.to_owned(),
            }),
        }
    }

    fn run(&mut self, top: Combinator) -> Result<()> {
        let result = self.call(&top, Kind::Boolean);
        // the pending trace line flushes before any error surfaces
        self.trace_flush();
        let matched = matches!(result?, Value::Bool(true));
        if !matched {
            return Err(Error::Failed);
        }
        if self.pos < self.input.len() {
            return Err(Error::Trailing { pos: self.pos });
        }
        Ok(())
    }

    /// Call a combinator with the given expectation.
    ///
    /// Literals return verbatim with no frame, trace, or receiver
    /// involvement; applications evaluate their arguments eagerly; rules
    /// run the full protocol: push frame, trace `?`, receiver `try`,
    /// invoke, trampoline [`Step::Jump`]s in place, enforce the declared
    /// return type, then — for boolean expectations only — trace `+`/`x`
    /// and fire `got`/`not`.
    ///
    /// The combinator, not this dispatcher, restores the cursor when it
    /// fails; failure is reported with the cursor wherever the combinator
    /// left it.
    pub fn call(&mut self, target: &Combinator, expected: Kind) -> Result<Value> {
        let mut args: Vec<Value> = Vec::new();
        let mut head = target.clone();
        let rule = loop {
            match head {
                Combinator::Lit(n) => return Ok(Value::Int(n)),
                Combinator::Rule(r) => break r,
                Combinator::Apply(app) => {
                    args = self.eval_args(&app.args)?;
                    head = app.head.clone();
                }
            }
        };

        let entry = self.pos;
        self.push_frame(Rc::clone(rule.name()));
        self.trace_event(Mark::Try, rule.name(), &args);
        if expected == Kind::Boolean {
            self.receive(&rule, Hook::Try, entry);
        }

        let (value, declared) = match self.run_body(&rule, args) {
            Ok(done) => done,
            Err(err) => {
                self.stack.pop();
                return Err(err);
            }
        };

        let is_bool = matches!(value, Value::Bool(_));
        if (declared == Kind::Boolean || expected == Kind::Boolean) && !is_bool {
            let rule = rule.name().to_string();
            self.stack.pop();
            return Err(Error::TypeMismatch {
                rule,
                expected: "boolean",
                actual: value.kind_name(),
            });
        }

        if expected != Kind::Boolean {
            self.stack.pop();
            return Ok(value);
        }

        let matched = matches!(value, Value::Bool(true));
        if matched {
            self.trace_event(Mark::Got, rule.name(), &[]);
            self.receive(&rule, Hook::Got, entry);
        } else {
            self.trace_event(Mark::Not, rule.name(), &[]);
            self.receive(&rule, Hook::Not, entry);
        }
        self.stack.pop();
        Ok(Value::Bool(matched))
    }

    /// Call with a boolean expectation.
    #[inline]
    pub fn call_bool(&mut self, target: &Combinator) -> Result<bool> {
        Ok(matches!(
            self.call(target, Kind::Boolean)?,
            Value::Bool(true)
        ))
    }

    /// Call with an `Any` expectation and require an integer result, as
    /// `rep` does for its bounds.
    pub fn call_int(&mut self, target: &Combinator) -> Result<i64> {
        let value = self.call(target, Kind::Any)?;
        value.as_int().ok_or_else(|| Error::TypeMismatch {
            rule: target.label().to_owned(),
            expected: "integer",
            actual: value.kind_name(),
        })
    }

    // Invoke the rule body, running any returned combinator in the same
    // activation record until a ground value is produced.
    fn run_body(&mut self, rule: &Rc<Rule>, mut args: Vec<Value>) -> Result<(Value, Kind)> {
        let mut current = Rc::clone(rule);
        loop {
            match current.invoke(self, &args)? {
                Step::Done(value) => return Ok((value, current.returns())),
                Step::Jump(mut next) => loop {
                    match next {
                        Combinator::Lit(n) => return Ok((Value::Int(n), Kind::Any)),
                        Combinator::Rule(r) => {
                            current = r;
                            break;
                        }
                        Combinator::Apply(app) => {
                            args = self.eval_args(&app.args)?;
                            next = app.head.clone();
                        }
                    }
                },
            }
        }
    }

    fn eval_args(&mut self, args: &[Arg]) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(match arg {
                Arg::Comb(c) => self.call(c, Kind::Any)?,
                Arg::Thunk(t) => t(self)?,
                Arg::Val(v) => v.clone(),
            });
        }
        Ok(values)
    }

    fn push_frame(&mut self, name: Rc<str>) {
        let lvl = self.state().lvl() + 1;
        self.stack.push(Frame::new(name, lvl, self.pos));
    }

    /// The top activation record, or the synthetic root when no rule is
    /// in flight.
    pub fn state(&self) -> &Frame {
        self.stack.last().unwrap_or(&self.root)
    }

    fn receive(&mut self, rule: &Rc<Rule>, hook: Hook, start: usize) {
        let (hooks, base) = self.hooks.resolve(rule, &self.stack, &*self.receiver);
        if !hooks.has(hook) {
            return;
        }
        let text = match hook {
            Hook::Try => "",
            Hook::Got | Hook::Not => self.input.slice(start, self.pos),
        };
        let state = self.stack.last().unwrap_or(&self.root);
        self.receiver.on_event(Event {
            hook,
            base: &*base,
            text,
            start,
            state,
        });
    }

    fn trace_event(&mut self, mark: Mark, name: &str, args: &[Value]) {
        if self.trace.is_none() {
            return;
        }
        let lvl = self.state().lvl();
        let pos = self.pos;
        let tail = self.input.tail(pos);
        if let Some(trace) = self.trace.as_mut() {
            trace.event(mark, lvl, name, args, pos, tail);
        }
    }

    fn trace_flush(&mut self) {
        if let Some(trace) = self.trace.as_mut() {
            trace.flush();
        }
    }

    /// The cursor: a character index into the input.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Move the cursor. Combinators use this both to consume input and to
    /// roll back to a saved entry position.
    #[inline]
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Input length in characters.
    #[inline]
    pub fn len(&self) -> usize {
        self.input.len()
    }

    /// Whether the input holds no characters.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    /// The character at `pos`, or `None` past the end.
    #[inline]
    pub fn char_at(&self, pos: usize) -> Option<char> {
        self.input.char_at(pos)
    }

    /// The input buffer.
    #[inline]
    pub fn input(&self) -> &Input<'a> {
        &self.input
    }

    /// The nearest binding of `name`, searching enclosing frames
    /// innermost first.
    pub fn var(&self, name: &str) -> Option<&Value> {
        self.stack
            .iter()
            .rev()
            .find_map(|frame| frame.vars.get(name))
    }

    /// Bind `name` in the frame this combinator was invoked under, so the
    /// binding outlives the combinator's own record and is visible to its
    /// later siblings.
    pub fn set_var(&mut self, name: impl Into<Rc<str>>, value: Value) {
        let idx = self.stack.len().saturating_sub(2);
        if let Some(frame) = self.stack.get_mut(idx) {
            frame.vars.insert(name.into(), value);
        }
    }

    pub(crate) fn selector(&self, var: &str) -> Result<String> {
        match self.var(var) {
            Some(value) => Ok(value.to_string()),
            None => Err(Error::UnboundVar {
                var: var.to_owned(),
            }),
        }
    }

    pub(crate) fn lookup_rule(&self, name: &str) -> Option<Combinator> {
        self.grammar.lookup_rule(name)
    }
}
