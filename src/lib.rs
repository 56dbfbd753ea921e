//! Full-string regular expression matching over a Thompson NFA.
//!
//! Patterns are byte strings; the engine has no notion of Unicode and every
//! symbol is a single byte in `0..=255`.  A match succeeds only when the
//! automaton consumes the **entire** input and lands on its accept state;
//! there is no substring search.
//!
//! # Architecture
//!
//! The pipeline is:
//!
//! ```text
//! pattern bytes ──Parser──> Token tree ──NfaBuilder──> State arena ──Matcher──> bool
//! ```
//!
//! ## Syntax
//!
//! | Syntax          | Meaning                                               |
//! |-----------------|-------------------------------------------------------|
//! | `x`             | the literal byte `x` (anything not listed below)      |
//! | `[abc]`, `[a-z]`| one byte from the class; `-` is literal when first or last |
//! | `( ... )`       | grouping                                              |
//! | `a\|b`          | alternation, left-associative within a scope          |
//! | `*`, `+`, `?`   | greedy repetition of the preceding token              |
//! | `{m}`, `{m,}`, `{m,n}` | bounded repetition of the preceding token      |
//!
//! There are no escapes, no `.` wildcard and no anchors: `.`, `\`, `^` and
//! `$` are ordinary literals.
//!
//! ## Alternation
//!
//! A `|` turns everything accumulated so far in the current scope into the
//! left branch, and everything up to the next `|`, the closing `)` of the
//! enclosing group, or the end of the pattern into the right branch.  A
//! second `|` in the same scope captures the previous alternation as its
//! own left branch, so `a|b|c` is parsed as `(a|b)|c`.
//!
//! ## Repetitions
//!
//! A repetition `body{min,max}` is unrolled into `max` chained copies of the
//! body (or `max(min, 1)` copies when unbounded).  Copies past the `min`-th
//! get an epsilon exit to the end of the repetition, and unbounded
//! repetitions get an epsilon back-edge from the end to the last copy:
//!
//! ```text
//!            ┌──────────── ε (min == 0) ─────────────┐
//!            │                                        v
//!  start ─ε─> body₁ ─ε─> body₂ ─ε─> ... ─ε─> bodyₖ ─ε─> end
//!                          │                  │  ^      │
//!                          └─ε (2 > min) ─> end  └─ ε ──┘ (max unbounded)
//! ```
//!
//! ## Matching
//!
//! [`Regex::is_match`] runs a depth-first search over `(state, position)`
//! pairs.  Every pair is explored at most once per call, which bounds the
//! work to `O(states × (input.len() + 1))` pairs no matter how ambiguous the
//! automaton is.  Without that cache, patterns such as `a*a*a*a*a*a*` make
//! a naive backtracker explode exponentially on inputs that do not match.

use std::fmt;
use std::io::{self, Write};
use std::ops::{Index, IndexMut};

use indexmap::IndexMap;
use log::{debug, trace};
use rustc_hash::FxHashSet;
use thiserror::Error;

/// Default upper bound for the count in a bounded repetition (`{m,n}`).
pub const DEFAULT_MAX_REPEAT: u32 = 1000;

/// Default upper bound for the number of states in a compiled automaton.
pub const DEFAULT_MAX_STATES: usize = 1_000_000;

/// Default upper bound for how deeply groups, repetitions and alternations
/// may nest.
pub const DEFAULT_NEST_LIMIT: u32 = 250;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// An error returned when a pattern can't be compiled.
///
/// Every variant carries the byte offset in the pattern where the problem
/// was detected.  Matching never fails, so this is only produced by
/// [`compile`], [`parse`] and [`RegexBuilder::build`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A `(` without its closing `)`.
    #[error("missing `)` for group opened at offset {at}")]
    UnterminatedGroup { at: usize },

    /// A `[` without its closing `]`.
    #[error("missing `]` for character class opened at offset {at}")]
    UnterminatedCharSet { at: usize },

    /// A `{` without its closing `}`.
    #[error("missing `}}` for repetition opened at offset {at}")]
    UnterminatedBound { at: usize },

    /// A range whose start is greater than its end, or a `-` that has no
    /// single byte before it to start the range.
    #[error("invalid range in character class at offset {at}")]
    InvalidRange { at: usize },

    /// `[]` matches nothing at all.
    #[error("empty character class at offset {at}")]
    EmptyCharSet { at: usize },

    /// A quantifier with no token before it.
    #[error("`{quantifier}` at offset {at} has nothing to repeat")]
    DanglingQuantifier { quantifier: char, at: usize },

    /// `{}` or `{,n}`.
    #[error("repetition at offset {at} has no minimum")]
    MissingMin { at: usize },

    /// `{m,n}` with `n < m`, or a maximum of zero.
    #[error("repetition at offset {at} must have max >= min and max > 0")]
    InvalidBound { at: usize },

    /// Anything between `{` and `}` that isn't `m`, `m,` or `m,n`.
    #[error("repetition at offset {at} must be `{{m}}`, `{{m,}}` or `{{m,n}}`")]
    MalformedBound { at: usize },

    /// The repetition count is above [`RegexBuilder::max_repeat`].
    #[error("repetition count at offset {at} exceeds the limit of {limit}")]
    RepeatTooLarge { at: usize, limit: u32 },

    /// The automaton would have more than [`RegexBuilder::max_states`]
    /// states.
    #[error("automaton exceeds the limit of {limit} states")]
    TooManyStates { limit: usize },

    /// Groups, repetitions and alternations nest deeper than
    /// [`RegexBuilder::nest_limit`].
    #[error("nesting at offset {at} exceeds the limit of {limit}")]
    NestTooDeep { at: usize, limit: u32 },
}

// ---------------------------------------------------------------------------
// Byte classes
// ---------------------------------------------------------------------------

/// A 256-entry membership table for a character class.  `class[b]` is
/// `true` when byte `b` is a member.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteClass([bool; 256]);

impl ByteClass {
    /// A class with no members.
    pub const NONE: Self = Self([false; 256]);

    /// Add a single byte.
    pub fn insert(&mut self, byte: u8) {
        self.0[byte as usize] = true;
    }

    /// Add every byte in `start..=end`.
    pub fn insert_range(&mut self, start: u8, end: u8) {
        for byte in start..=end {
            self.insert(byte);
        }
    }

    #[inline]
    pub fn contains(&self, byte: u8) -> bool {
        self.0[byte as usize]
    }

    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|&member| member)
    }

    pub fn len(&self) -> usize {
        self.0.iter().filter(|&&member| member).count()
    }

    /// Iterate over the members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(move |&byte| self.contains(byte))
    }

    /// Members as inclusive `(start, end)` runs of consecutive bytes.
    fn runs(&self) -> Vec<(u8, u8)> {
        let mut runs: Vec<(u8, u8)> = Vec::new();
        for byte in self.iter() {
            if let Some((_, end)) = runs.last_mut() {
                if *end as u16 + 1 == byte as u16 {
                    *end = byte;
                    continue;
                }
            }
            runs.push((byte, byte));
        }
        runs
    }
}

/// `class[byte]` — test whether a byte is a member of this class.
impl Index<u8> for ByteClass {
    type Output = bool;

    #[inline]
    fn index(&self, byte: u8) -> &bool {
        &self.0[byte as usize]
    }
}

impl FromIterator<u8> for ByteClass {
    fn from_iter<T: IntoIterator<Item = u8>>(iter: T) -> Self {
        let mut class = Self::NONE;
        for byte in iter {
            class.insert(byte);
        }
        class
    }
}

impl fmt::Debug for ByteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (start, end) in self.runs() {
            write!(f, "{}", start.escape_ascii())?;
            if end != start {
                write!(f, "-{}", end.escape_ascii())?;
            }
        }
        write!(f, "]")
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// A parsed pattern fragment.
///
/// Tokens form a tree in which every parent exclusively owns its children.
/// A top-level pattern is a sequence of tokens that must match one after
/// the other.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// Exactly one occurrence of this byte.
    Literal(u8),

    /// Exactly one byte from the class.  Never empty.
    CharSet(ByteClass),

    /// Every child, one after the other.
    Group(Vec<Token>),

    /// Either the `left` sequence or the `right` sequence.
    Alternation { left: Vec<Token>, right: Vec<Token> },

    /// `inner` repeated between `min` and `max` times, inclusive.  A `max`
    /// of `None` means unbounded.  When `max` is bounded it is at least 1
    /// and at least `min`.
    Repeat { inner: Box<Token>, min: u32, max: Option<u32> },
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Recursive-descent parser over the raw pattern bytes.
///
/// Every token has a height: 0 for a literal or a class, and one more than
/// its tallest child for a group, a repetition or an alternation.  Building
/// and dropping the tree recurse once per level, so no height may exceed
/// `nest_limit`.
struct Parser<'p> {
    pattern: &'p [u8],
    /// Index of the next byte to read.
    pos: usize,
    /// Number of groups currently open.
    depth: u32,
    max_repeat: u32,
    nest_limit: u32,
}

impl<'p> Parser<'p> {
    fn new(pattern: &'p [u8], max_repeat: u32, nest_limit: u32) -> Self {
        Self {
            pattern,
            pos: 0,
            depth: 0,
            max_repeat,
            nest_limit,
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.pattern.get(self.pos).copied()
    }

    fn parse(mut self) -> Result<Vec<Token>, Error> {
        // At the top level `)` is a literal, so only the end of the pattern
        // stops the outermost sequence.
        let (tokens, _) = self.sequence(false)?;
        debug_assert_eq!(self.pos, self.pattern.len());
        Ok(tokens)
    }

    /// Check the height of a token introduced at offset `at`.
    fn nest(&self, height: u32, at: usize) -> Result<u32, Error> {
        if height > self.nest_limit {
            return Err(Error::NestTooDeep {
                at,
                limit: self.nest_limit,
            });
        }
        Ok(height)
    }

    /// Parse a scope: a concatenation, possibly split by `|`.  Stops before
    /// the `)` that closes the enclosing group, if any.  Returns the tokens
    /// along with the height of the tallest one.
    fn sequence(&mut self, in_group: bool) -> Result<(Vec<Token>, u32), Error> {
        let mut tokens = Vec::new();
        let mut height = self.concat(in_group, &mut tokens)?;
        while self.peek() == Some(b'|') {
            let at = self.pos;
            self.pos += 1;
            let mut right = Vec::new();
            let right_height = self.concat(in_group, &mut right)?;
            height = self.nest(height.max(right_height).saturating_add(1), at)?;
            let left = std::mem::take(&mut tokens);
            tokens.push(Token::Alternation { left, right });
        }
        Ok((tokens, height))
    }

    /// Append tokens until the next `|`, the closing `)` of the enclosing
    /// group, or the end of the pattern.  Returns the height of the tallest
    /// token appended.
    fn concat(&mut self, in_group: bool, tokens: &mut Vec<Token>) -> Result<u32, Error> {
        let mut height = 0;
        // Height of `tokens.last()`.
        let mut last = 0;
        while let Some(byte) = self.peek() {
            match byte {
                b'|' => break,
                b')' if in_group => break,
                b'(' => {
                    let (group, group_height) = self.group()?;
                    tokens.push(group);
                    last = group_height;
                }
                b'[' => {
                    let class = self.char_set()?;
                    tokens.push(class);
                    last = 0;
                }
                b'*' | b'+' | b'?' => {
                    let at = self.pos;
                    self.pos += 1;
                    let (min, max) = match byte {
                        b'*' => (0, None),
                        b'+' => (1, None),
                        _ => (0, Some(1)),
                    };
                    Self::quantify(tokens, byte, at, min, max)?;
                    last = self.nest(last.saturating_add(1), at)?;
                }
                b'{' => {
                    let at = self.pos;
                    let (min, max) = self.bound()?;
                    Self::quantify(tokens, byte, at, min, max)?;
                    last = self.nest(last.saturating_add(1), at)?;
                }
                _ => {
                    self.pos += 1;
                    tokens.push(Token::Literal(byte));
                    last = 0;
                }
            }
            height = height.max(last);
        }
        Ok(height)
    }

    /// `( ... )`
    fn group(&mut self) -> Result<(Token, u32), Error> {
        let at = self.pos;
        // Checked on the way down too, since parsing a group recurses.
        self.depth = self.nest(self.depth.saturating_add(1), at)?;
        self.pos += 1;
        let (children, height) = self.sequence(true)?;
        self.depth -= 1;
        match self.peek() {
            Some(b')') => {
                self.pos += 1;
                let height = self.nest(height.saturating_add(1), at)?;
                Ok((Token::Group(children), height))
            }
            _ => Err(Error::UnterminatedGroup { at }),
        }
    }

    /// `[ ... ]`
    ///
    /// A `-` is a literal when it is the first byte of the class or the last
    /// one before `]`.  Anywhere else it joins the previous single byte and
    /// the following byte into a range; a range can't start another range.
    fn char_set(&mut self) -> Result<Token, Error> {
        let at = self.pos;
        self.pos += 1;
        let mut class = ByteClass::NONE;
        let mut anchor: Option<u8> = None;
        let mut first = true;
        loop {
            let byte = self.peek().ok_or(Error::UnterminatedCharSet { at })?;
            match byte {
                b']' => {
                    self.pos += 1;
                    break;
                }
                b'-' if first || self.pattern.get(self.pos + 1) == Some(&b']') => {
                    class.insert(byte);
                    anchor = Some(byte);
                    self.pos += 1;
                }
                b'-' => {
                    let start = anchor.take().ok_or(Error::InvalidRange { at: self.pos })?;
                    let end = self
                        .pattern
                        .get(self.pos + 1)
                        .copied()
                        .ok_or(Error::UnterminatedCharSet { at })?;
                    if start > end {
                        return Err(Error::InvalidRange { at: self.pos });
                    }
                    class.insert_range(start, end);
                    self.pos += 2;
                }
                _ => {
                    class.insert(byte);
                    anchor = Some(byte);
                    self.pos += 1;
                }
            }
            first = false;
        }
        if class.is_empty() {
            return Err(Error::EmptyCharSet { at });
        }
        Ok(Token::CharSet(class))
    }

    /// `{m}`, `{m,}` or `{m,n}`.  Leaves `pos` right after the `}`.
    fn bound(&mut self) -> Result<(u32, Option<u32>), Error> {
        let at = self.pos;
        let rest = &self.pattern[at + 1..];
        let len = rest
            .iter()
            .position(|&b| b == b'}')
            .ok_or(Error::UnterminatedBound { at })?;
        self.pos = at + len + 2;

        let parts: Vec<&[u8]> = rest[..len].split(|&b| b == b',').collect();
        let (min, max) = match parts.as_slice() {
            [min, ..] if min.is_empty() => return Err(Error::MissingMin { at }),
            [exact] => {
                let n = self.count(exact, at)?;
                (n, Some(n))
            }
            [min, max] => {
                let min = self.count(min, at)?;
                let max = if max.is_empty() { None } else { Some(self.count(max, at)?) };
                (min, max)
            }
            _ => return Err(Error::MalformedBound { at }),
        };

        if let Some(max) = max {
            if max < min || max == 0 {
                return Err(Error::InvalidBound { at });
            }
        }
        if max.unwrap_or(min) > self.max_repeat {
            return Err(Error::RepeatTooLarge {
                at,
                limit: self.max_repeat,
            });
        }
        Ok((min, max))
    }

    /// Parse a repetition count made only of decimal digits.
    fn count(&self, digits: &[u8], at: usize) -> Result<u32, Error> {
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(Error::MalformedBound { at });
        }
        // Only digits left, so the only way to fail is overflowing u32.
        std::str::from_utf8(digits)
            .ok()
            .and_then(|digits| digits.parse().ok())
            .ok_or(Error::RepeatTooLarge {
                at,
                limit: self.max_repeat,
            })
    }

    /// Wrap the last token in `tokens` into a [`Token::Repeat`].
    fn quantify(
        tokens: &mut Vec<Token>,
        quantifier: u8,
        at: usize,
        min: u32,
        max: Option<u32>,
    ) -> Result<(), Error> {
        let inner = tokens.pop().ok_or(Error::DanglingQuantifier {
            quantifier: quantifier as char,
            at,
        })?;
        tokens.push(Token::Repeat {
            inner: Box::new(inner),
            min,
            max,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NFA states
// ---------------------------------------------------------------------------

/// A transition label.  Epsilon lives outside the byte domain, so every
/// byte value including `0x00` stays an ordinary input symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Symbol {
    Byte(u8),
    Epsilon,
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Byte(byte) => write!(f, "{}", byte.escape_ascii()),
            Symbol::Epsilon => write!(f, "ε"),
        }
    }
}

/// A single NFA state.
///
/// Only the synthetic entry state has `start` set and only the synthetic
/// final state has `accept` set.  Transitions are kept in insertion order,
/// which is also the order in which the matcher explores them.
#[derive(Debug, Default)]
struct State {
    start: bool,
    accept: bool,
    transitions: IndexMap<Symbol, Vec<StateIdx>>,
}

impl State {
    /// Destinations reachable from this state through `symbol`.
    #[inline]
    fn targets(&self, symbol: Symbol) -> &[StateIdx] {
        self.transitions.get(&symbol).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Index into the state arena ([`Regex::states`]).
///
/// Back-edges created by unbounded repetitions are plain indices, so cycles
/// in the transition graph never become ownership cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct StateIdx(u32);

impl StateIdx {
    #[inline]
    fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `states[state_idx]` — typed access to the state arena.
impl Index<StateIdx> for [State] {
    type Output = State;

    #[inline]
    fn index(&self, idx: StateIdx) -> &State {
        &self[idx.idx()]
    }
}

impl IndexMut<StateIdx> for [State] {
    #[inline]
    fn index_mut(&mut self, idx: StateIdx) -> &mut State {
        &mut self[idx.idx()]
    }
}

// ---------------------------------------------------------------------------
// NFA builder (Token tree -> State arena)
// ---------------------------------------------------------------------------

/// A partially-built automaton with a single entry and a single exit.
#[derive(Clone, Copy, Debug)]
struct Fragment {
    start: StateIdx,
    end: StateIdx,
}

impl Fragment {
    fn new(start: StateIdx, end: StateIdx) -> Self {
        Self { start, end }
    }
}

/// Thompson construction: one `(start, end)` fragment per token, wired
/// together with epsilon transitions.
struct NfaBuilder {
    states: Vec<State>,
    max_states: usize,
}

impl NfaBuilder {
    fn new(max_states: usize) -> Self {
        Self {
            states: Vec::new(),
            max_states: max_states.min(u32::MAX as usize),
        }
    }

    /// Push a fresh state and return its index.
    fn state(&mut self) -> Result<StateIdx, Error> {
        if self.states.len() >= self.max_states {
            return Err(Error::TooManyStates {
                limit: self.max_states,
            });
        }
        let idx = StateIdx(self.states.len() as u32);
        self.states.push(State::default());
        Ok(idx)
    }

    fn transition(&mut self, from: StateIdx, to: StateIdx, symbol: Symbol) {
        self.states.as_mut_slice()[from].transitions.entry(symbol).or_default().push(to);
    }

    #[inline]
    fn epsilon(&mut self, from: StateIdx, to: StateIdx) {
        self.transition(from, to, Symbol::Epsilon);
    }

    fn fragment(&mut self, token: &Token) -> Result<Fragment, Error> {
        match token {
            Token::Literal(byte) => {
                let start = self.state()?;
                let end = self.state()?;
                self.transition(start, end, Symbol::Byte(*byte));
                Ok(Fragment::new(start, end))
            }
            Token::CharSet(class) => {
                let start = self.state()?;
                let end = self.state()?;
                for byte in class.iter() {
                    self.transition(start, end, Symbol::Byte(byte));
                }
                Ok(Fragment::new(start, end))
            }
            Token::Group(children) => self.concat(children),
            Token::Alternation { left, right } => {
                let start = self.state()?;
                let end = self.state()?;
                let left = self.concat(left)?;
                let right = self.concat(right)?;
                self.epsilon(start, left.start);
                self.epsilon(start, right.start);
                self.epsilon(left.end, end);
                self.epsilon(right.end, end);
                Ok(Fragment::new(start, end))
            }
            Token::Repeat { inner, min, max } => self.repeat(inner, *min, *max),
        }
    }

    /// Chain the fragments of `tokens` with epsilon transitions.  An empty
    /// sequence is a single state that is both entry and exit.
    fn concat(&mut self, tokens: &[Token]) -> Result<Fragment, Error> {
        let Some((first, rest)) = tokens.split_first() else {
            let state = self.state()?;
            return Ok(Fragment::new(state, state));
        };
        let mut frag = self.fragment(first)?;
        for token in rest {
            let next = self.fragment(token)?;
            self.epsilon(frag.end, next.start);
            frag.end = next.end;
        }
        Ok(frag)
    }

    /// Unroll `inner` into `max` copies (or `max(min, 1)` when unbounded).
    fn repeat(&mut self, inner: &Token, min: u32, max: Option<u32>) -> Result<Fragment, Error> {
        let start = self.state()?;
        let end = self.state()?;
        if min == 0 {
            self.epsilon(start, end);
        }

        let copies = max.unwrap_or(min.max(1));
        let mut copy = self.fragment(inner)?;
        self.epsilon(start, copy.start);
        for ordinal in 2..=copies {
            let next = self.fragment(inner)?;
            self.epsilon(copy.end, next.start);
            copy = next;
            // `ordinal - 1` copies are already behind us.
            if ordinal > min {
                self.epsilon(copy.start, end);
            }
        }
        self.epsilon(copy.end, end);

        if max.is_none() {
            self.epsilon(end, copy.start);
        }
        Ok(Fragment::new(start, end))
    }

    /// Build the whole automaton, framed by a synthetic start state and a
    /// synthetic accept state.
    fn build(mut self, tokens: &[Token]) -> Result<Regex, Error> {
        let body = self.concat(tokens)?;
        let start = self.state()?;
        let accept = self.state()?;
        self.epsilon(start, body.start);
        self.epsilon(body.end, accept);
        self.states.as_mut_slice()[start].start = true;
        self.states.as_mut_slice()[accept].accept = true;
        Ok(Regex {
            states: StateList(self.states.into_boxed_slice()),
            start,
        })
    }
}

// ---------------------------------------------------------------------------
// Compiled regex
// ---------------------------------------------------------------------------

struct StateList(Box<[State]>);

impl fmt::Debug for StateList {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_map().entries(self.0.iter().enumerate()).finish()
    }
}

impl std::ops::Deref for StateList {
    type Target = [State];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A compiled pattern ready for matching.
///
/// The automaton is immutable once built, so a `Regex` can be shared
/// between threads and matched concurrently; every call to
/// [`is_match`](Self::is_match) allocates its own scratch memory.
#[derive(Debug)]
pub struct Regex {
    states: StateList,
    start: StateIdx,
}

impl Regex {
    /// Compile `pattern` with the default limits.  Same as [`compile`].
    pub fn new(pattern: impl AsRef<[u8]>) -> Result<Self, Error> {
        RegexBuilder::new().build(pattern)
    }

    /// Returns `true` if the whole `input` matches the pattern.
    pub fn is_match(&self, input: impl AsRef<[u8]>) -> bool {
        let input = input.as_ref();
        let mut matcher = Matcher::new(self, input);
        let matched = matcher.run();
        trace!(
            "match over {} bytes explored {} state/position pairs: {}",
            input.len(),
            matcher.memo.len(),
            matched
        );
        matched
    }

    /// Number of states in the automaton.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Emit a Graphviz DOT representation of the automaton.
    pub fn to_dot(&self, mut buffer: impl Write) -> io::Result<()> {
        writeln!(buffer, "digraph nfa {{")?;
        writeln!(buffer, "\trankdir=LR;")?;
        for (idx, state) in self.states.iter().enumerate() {
            if state.start {
                writeln!(buffer, "\t{} [shape=box];", idx)?;
            }
            if state.accept {
                writeln!(buffer, "\t{} [peripheries=2];", idx)?;
            }
            for (symbol, targets) in &state.transitions {
                for target in targets {
                    // escape_ascii already escapes `"` and `\` for us.
                    writeln!(buffer, "\t{} -> {} [label=\"{}\"];", idx, target, symbol)?;
                }
            }
        }
        writeln!(buffer, "}}")
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Compiles patterns into [`Regex`]es under configurable safety limits.
///
/// ```
/// use regex_thompson_backtrack::RegexBuilder;
///
/// let re = RegexBuilder::new().max_repeat(10).build("(ab){2,4}").unwrap();
/// assert!(re.is_match("ababab"));
/// assert!(RegexBuilder::new().max_repeat(10).build("a{11}").is_err());
/// ```
#[derive(Clone, Debug)]
pub struct RegexBuilder {
    max_repeat: u32,
    max_states: usize,
    nest_limit: u32,
}

impl Default for RegexBuilder {
    fn default() -> Self {
        Self {
            max_repeat: DEFAULT_MAX_REPEAT,
            max_states: DEFAULT_MAX_STATES,
            nest_limit: DEFAULT_NEST_LIMIT,
        }
    }
}

impl RegexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest count accepted in `{m}`, `{m,}` and `{m,n}`.  Bounded
    /// repetitions are unrolled, so the automaton grows linearly with this
    /// count.  Default: [`DEFAULT_MAX_REPEAT`].
    pub fn max_repeat(mut self, limit: u32) -> Self {
        self.max_repeat = limit;
        self
    }

    /// Largest number of states the automaton may have.  Nested bounded
    /// repetitions multiply, so this catches what `max_repeat` alone can't.
    /// Default: [`DEFAULT_MAX_STATES`].
    pub fn max_states(mut self, limit: usize) -> Self {
        self.max_states = limit;
        self
    }

    /// How deeply groups, repetitions and alternations may nest.  `(a)` and
    /// `a*` have a depth of 1, `(a*)` and `a|b|c` a depth of 2.  Compiling
    /// recurses once per level, so a very large limit lets a hostile pattern
    /// overflow the stack.  Default: [`DEFAULT_NEST_LIMIT`].
    pub fn nest_limit(mut self, limit: u32) -> Self {
        self.nest_limit = limit;
        self
    }

    /// Parse `pattern` and build its automaton.
    pub fn build(&self, pattern: impl AsRef<[u8]>) -> Result<Regex, Error> {
        let pattern = pattern.as_ref();
        let tokens = Parser::new(pattern, self.max_repeat, self.nest_limit).parse()?;
        let regex = NfaBuilder::new(self.max_states).build(&tokens)?;
        debug!(
            "compiled `{}` into {} tokens and {} states",
            pattern.escape_ascii(),
            tokens.len(),
            regex.state_count()
        );
        Ok(regex)
    }
}

/// Compile `pattern` with the default limits.
pub fn compile(pattern: impl AsRef<[u8]>) -> Result<Regex, Error> {
    RegexBuilder::new().build(pattern)
}

/// Returns `true` if the whole `input` matches `regex`.
pub fn matches(regex: &Regex, input: impl AsRef<[u8]>) -> bool {
    regex.is_match(input)
}

/// Parse `pattern` into its token sequence without building an automaton.
pub fn parse(pattern: impl AsRef<[u8]>) -> Result<Vec<Token>, Error> {
    Parser::new(pattern.as_ref(), DEFAULT_MAX_REPEAT, DEFAULT_NEST_LIMIT).parse()
}

// ---------------------------------------------------------------------------
// Matcher (memoized depth-first search)
// ---------------------------------------------------------------------------

/// Searches for a path from the start state that consumes the whole input
/// and ends on the accept state.
///
/// The search is depth-first over `(state, position)` pairs, driven by an
/// explicit stack so that deep automata and long inputs can't overflow the
/// native stack.  `memo` holds every pair already explored.  The answer is
/// existential, so the search stops at the first success; any pair found
/// in `memo` therefore either failed or is still being explored further
/// down the current path, and in neither case does exploring it again help.
/// This is also what makes epsilon cycles such as `(a*)*` terminate.
struct Matcher<'a> {
    states: &'a [State],
    input: &'a [u8],
    start: StateIdx,
    memo: FxHashSet<(StateIdx, usize)>,
    stack: Vec<(StateIdx, usize)>,
}

impl<'a> Matcher<'a> {
    fn new(regex: &'a Regex, input: &'a [u8]) -> Self {
        Self {
            states: &regex.states,
            input,
            start: regex.start,
            memo: FxHashSet::default(),
            stack: Vec::new(),
        }
    }

    fn run(&mut self) -> bool {
        let states = self.states;
        self.stack.push((self.start, 0));
        while let Some((idx, pos)) = self.stack.pop() {
            if !self.memo.insert((idx, pos)) {
                continue;
            }
            let state = &states[idx];
            match self.input.get(pos) {
                // Out of input: only epsilon moves are left.
                None => {
                    if state.accept {
                        return true;
                    }
                    self.push(state.targets(Symbol::Epsilon), pos);
                }
                Some(&byte) => {
                    self.push(state.targets(Symbol::Epsilon), pos);
                    self.push(state.targets(Symbol::Byte(byte)), pos + 1);
                }
            }
        }
        false
    }

    /// Schedule `targets` at `pos`, first target on top of the stack.
    #[inline]
    fn push(&mut self, targets: &[StateIdx], pos: usize) {
        self.stack.extend(targets.iter().rev().map(|&target| (target, pos)));
    }
}
