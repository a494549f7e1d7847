//! # Receiver dispatch
//!
//! As rules match, the engine reports lifecycle events to a user-supplied
//! [`Receiver`] which accumulates the application-specific result (e.g. a
//! document tree). Events are keyed by a *hook base name* derived from the
//! rule-call path:
//!
//! - Walking the activation stack from the top, frame names are collected
//!   until one containing an underscore is found; that name is the prefix
//!   and the walk stops. Underscore names are the grammar's named
//!   productions; intervening anonymous combinators (`any`, `chr(0x20)`)
//!   are sub-paths within the production and become suffixes, letting a
//!   receiver distinguish alternative positions inside one production.
//! - `chr(0x..)` names canonicalize to `chr_<hex>`.
//! - Segments join with `__`, e.g. `ns_plain__any__chr_20`.
//!
//! The derived base and the receiver's capability mask are memoized per
//! combinator identity for the lifetime of the parse.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::combinator::Rule;
use crate::parser::Frame;

/// Which lifecycle hook fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hook {
    /// A rule is about to be tried at the current position.
    Try,
    /// The rule matched; the event text covers what it consumed.
    Got,
    /// The rule did not match.
    Not,
}

/// The hooks a receiver implements for one base name.
///
/// The translation of the source's memoized triple of optional method
/// references: a receiver reports which of `try`/`got`/`not` it cares
/// about, and the engine skips the rest without building events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hooks {
    /// Deliver [`Hook::Try`] events.
    pub on_try: bool,
    /// Deliver [`Hook::Got`] events.
    pub on_got: bool,
    /// Deliver [`Hook::Not`] events.
    pub on_not: bool,
}

impl Hooks {
    /// Every hook.
    pub const ALL: Hooks = Hooks {
        on_try: true,
        on_got: true,
        on_not: true,
    };

    /// No hooks.
    pub const NONE: Hooks = Hooks {
        on_try: false,
        on_got: false,
        on_not: false,
    };

    /// Whether `hook` is wanted.
    #[inline]
    pub fn has(&self, hook: Hook) -> bool {
        match hook {
            Hook::Try => self.on_try,
            Hook::Got => self.on_got,
            Hook::Not => self.on_not,
        }
    }
}

impl Default for Hooks {
    fn default() -> Self {
        Hooks::ALL
    }
}

/// The payload delivered with every hook.
#[derive(Debug)]
pub struct Event<'a> {
    /// Which hook fired.
    pub hook: Hook,
    /// The derived hook base name.
    pub base: &'a str,
    /// Input consumed by the rule so far: `[start, current)`. Empty for
    /// [`Hook::Try`].
    pub text: &'a str,
    /// Cursor position at rule entry.
    pub start: usize,
    /// The current activation record (level and variables).
    pub state: &'a Frame,
}

/// Accumulates an application result from rule lifecycle events.
///
/// Events fire in strict depth-first pre/post order along the call tree:
/// `try` before any nested event, `got`/`not` after every nested event of
/// the frame. For every `try` on a boolean call exactly one of `got`/`not`
/// follows; non-boolean calls fire nothing.
pub trait Receiver {
    /// Which hooks to deliver for `base`. Consulted once per combinator
    /// and memoized.
    fn hooks(&self, base: &str) -> Hooks {
        let _ = base;
        Hooks::ALL
    }

    /// Handle one lifecycle event.
    fn on_event(&mut self, event: Event<'_>);
}

/// A receiver that ignores everything, for hook-free parses.
impl Receiver for () {
    fn hooks(&self, _base: &str) -> Hooks {
        Hooks::NONE
    }

    fn on_event(&mut self, _event: Event<'_>) {}
}

pub(crate) fn derive_base(stack: &[Frame]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for frame in stack.iter().rev() {
        let name = frame.name();
        if name.contains('_') {
            parts.push(name.to_owned());
            break;
        }
        parts.push(canonical(name));
    }
    parts.reverse();
    parts.join("__")
}

fn canonical(name: &str) -> String {
    name.strip_prefix("chr(0x")
        .and_then(|rest| rest.strip_suffix(')'))
        .map(|hex| format!("chr_{hex}"))
        .unwrap_or_else(|| name.to_owned())
}

pub(crate) struct HookCache {
    entries: FxHashMap<usize, CacheEntry>,
}

struct CacheEntry {
    base: Rc<str>,
    hooks: Hooks,
    // Pins the rule so its address cannot be recycled under the cache.
    _owner: Rc<Rule>,
}

impl HookCache {
    pub(crate) fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// The memoized `(hooks, base)` for this rule, derived from the stack
    /// on first sight.
    pub(crate) fn resolve(
        &mut self,
        rule: &Rc<Rule>,
        stack: &[Frame],
        receiver: &dyn Receiver,
    ) -> (Hooks, Rc<str>) {
        let key = Rc::as_ptr(rule) as usize;
        let entry = self.entries.entry(key).or_insert_with(|| {
            let base: Rc<str> = derive_base(stack).into();
            let hooks = receiver.hooks(&base);
            CacheEntry {
                base,
                hooks,
                _owner: Rc::clone(rule),
            }
        });
        (entry.hooks, Rc::clone(&entry.base))
    }
}
