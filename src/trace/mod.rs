//! # Parse execution tracing
//!
//! A human-readable diagnostic stream of every rule call, off unless the
//! parse is started with a [`Trace`] attached. One line per call event:
//!
//! ```text
//!    3 2 = chr(0x61)                          0 'ab'
//! ```
//!
//! Marks: `?` try, `+` got, `x` not. A `?` immediately answered by its own
//! `+`/`x` at the same level coalesces into a single `=`/`!` line, keeping
//! leaf terminals to one line each. Lines are numbered as they flush; the
//! indent encodes the call depth with the level's digits overwriting the
//! leading spaces.
//!
//! A *quiet set* of rule names suppresses whole subtrees, and a start
//! marker delays tracing until a given rule is first tried. Both are
//! cosmetic; neither affects parsing.

mod internals;

use std::io::Write;

use rustc_hash::FxHashSet;

use crate::value::Value;

// Pending lines keep only as much tail as a terminal could ever show.
const TAIL_KEEP: usize = 160;

/// Call-event marks, including the coalesced rewrites.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mark {
    Try,
    Got,
    Not,
    TryGot,
    TryNot,
}

impl Mark {
    fn glyph(self) -> char {
        match self {
            Mark::Try => '?',
            Mark::Got => '+',
            Mark::Not => 'x',
            Mark::TryGot => '=',
            Mark::TryNot => '!',
        }
    }
}

struct Pending {
    mark: Mark,
    lvl: usize,
    name: Box<str>,
    call: String,
    pos: usize,
    tail: String,
}

/// The trace recorder: a one-line lookahead buffer over a sink.
pub struct Trace {
    pending: Option<Pending>,
    next_line: usize,
    quiet: FxHashSet<Box<str>>,
    quiet_depth: usize,
    start_with: Option<Box<str>>,
    started: bool,
    writer: Box<dyn Write>,
    styled: bool,
}

impl Trace {
    /// Trace to standard error, with marks styled when it is a terminal.
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(anstream::stderr()), true)
    }

    /// Trace to an arbitrary sink, unstyled.
    pub fn to_writer(writer: impl Write + 'static) -> Self {
        Self::with_writer(Box::new(writer), false)
    }

    fn with_writer(writer: Box<dyn Write>, styled: bool) -> Self {
        Self {
            pending: None,
            next_line: 1,
            quiet: FxHashSet::default(),
            quiet_depth: 0,
            start_with: None,
            started: true,
            writer,
            styled,
        }
    }

    /// Suppress the subtree of every call of the named rule.
    pub fn quiet(mut self, rule: &str) -> Self {
        self.quiet.insert(rule.into());
        self
    }

    /// Stay silent until the named rule is first tried.
    pub fn start_with(mut self, rule: &str) -> Self {
        self.start_with = Some(rule.into());
        self.started = false;
        self
    }

    pub(crate) fn event(
        &mut self,
        mark: Mark,
        lvl: usize,
        name: &str,
        args: &[Value],
        pos: usize,
        tail: &str,
    ) {
        if !self.started {
            match &self.start_with {
                Some(marker) if mark == Mark::Try && **marker == *name => self.started = true,
                _ => return,
            }
        }

        if self.quiet_depth > 0 {
            if self.quiet.contains(name) {
                match mark {
                    Mark::Try => self.quiet_depth += 1,
                    _ => self.quiet_depth -= 1,
                }
            }
            return;
        }
        if mark == Mark::Try && self.quiet.contains(name) {
            self.quiet_depth = 1;
            return;
        }

        if let Some(p) = self.pending.as_mut() {
            if p.mark == Mark::Try
                && p.lvl == lvl
                && *p.name == *name
                && matches!(mark, Mark::Got | Mark::Not)
            {
                // the answered `?` absorbs its outcome; the incoming line
                // is redundant with the rewrite
                p.mark = if mark == Mark::Got {
                    Mark::TryGot
                } else {
                    Mark::TryNot
                };
                return;
            }
        }

        self.emit_pending();
        self.pending = Some(Pending {
            mark,
            lvl,
            name: name.into(),
            call: call_display(name, args),
            pos,
            tail: tail.chars().take(TAIL_KEEP).collect(),
        });
    }

    /// Drain the buffered line. Called at end of parse and before a fatal
    /// error surfaces.
    pub(crate) fn flush(&mut self) {
        self.emit_pending();
        let _ = self.writer.flush();
    }

    fn emit_pending(&mut self) {
        if let Some(p) = self.pending.take() {
            let line = internals::format_line(
                self.next_line,
                p.lvl,
                p.mark.glyph(),
                &p.call,
                p.pos,
                &p.tail,
                self.styled,
            );
            self.next_line += 1;
            let _ = writeln!(self.writer, "{line}");
        }
    }
}

impl Drop for Trace {
    fn drop(&mut self) {
        self.flush();
    }
}

fn call_display(name: &str, args: &[Value]) -> String {
    if args.is_empty() {
        return name.to_owned();
    }
    let mut out = String::from(name);
    out.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&arg.to_string());
    }
    out.push(')');
    out
}
