//! Character trie over every dictionary entry.
//!
//! States live in an arena and are addressed by [`StateId`], assigned in
//! creation order with the root at 0. Transitions are kept sorted by
//! character so lookups are a binary search. Whitespace in entries is folded
//! to a single canonical space, and a state entered through a space loops
//! back to itself on further spaces, so `"new york"` and `"new   york"` end
//! in the same state.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::lookup::Lookup;
use crate::pattern::is_letter;

pub type StateId = usize;

const ROOT: StateId = 0;

/// The character every whitespace character is folded to.
pub const CANONICAL_SPACE: char = ' ';

/// Whitespace for the purpose of folding: Unicode whitespace plus the ASCII
/// information separators (U+001C..=U+001F).
pub fn is_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

fn normalize(c: char) -> char {
    if is_space(c) { CANONICAL_SPACE } else { c }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Debug, Clone, Default)]
struct State {
    transitions: Vec<(char, StateId)>,
    lookups: BTreeSet<Lookup>,
    /// First entry text that ended in this state.
    entry: Option<String>,
}

impl State {
    fn next(&self, c: char) -> Option<StateId> {
        self.transitions
            .binary_search_by_key(&c, |&(key, _)| key)
            .ok()
            .map(|idx| self.transitions[idx].1)
    }

    fn put(&mut self, c: char, target: StateId) {
        if let Err(idx) = self.transitions.binary_search_by_key(&c, |&(key, _)| key) {
            self.transitions.insert(idx, (c, target));
        }
    }

    fn is_final(&self) -> bool {
        !self.lookups.is_empty()
    }
}

/// One match found by [`Automaton::find_matches`], as byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutomatonMatch {
    pub start: usize,
    pub end: usize,
    pub state: StateId,
}

#[derive(Debug, Clone)]
pub struct Automaton {
    states: Vec<State>,
}

impl Default for Automaton {
    fn default() -> Self {
        Self {
            states: vec![State::default()],
        }
    }
}

impl Automaton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `entry` and attach `lookup` to the state it ends in.
    ///
    /// An empty entry is ignored; the root never accepts.
    pub fn insert(&mut self, entry: &str, lookup: Lookup) {
        if entry.is_empty() {
            return;
        }
        let mut current = ROOT;
        for c in entry.chars() {
            let space = is_space(c);
            let c = normalize(c);
            current = match self.states[current].next(c) {
                Some(next) => next,
                None => {
                    let next = self.states.len();
                    self.states.push(State::default());
                    self.states[current].put(c, next);
                    if space {
                        self.states[next].put(CANONICAL_SPACE, next);
                    }
                    next
                }
            };
        }
        let state = &mut self.states[current];
        state.lookups.insert(lookup);
        state.entry.get_or_insert_with(|| entry.to_string());
    }

    fn walk(&self, text: &str) -> Option<StateId> {
        text.chars()
            .try_fold(ROOT, |state, c| self.states[state].next(normalize(c)))
    }

    /// The lookups accepted for exactly `text`, if any.
    pub fn lookup(&self, text: &str) -> Option<&BTreeSet<Lookup>> {
        let state = self.walk(text)?;
        self.lookups(state)
    }

    /// The state `text` ends in, if it is accepting.
    pub fn accepting_state(&self, text: &str) -> Option<StateId> {
        self.walk(text).filter(|&state| self.states[state].is_final())
    }

    pub fn lookups(&self, state: StateId) -> Option<&BTreeSet<Lookup>> {
        self.states
            .get(state)
            .map(|s| &s.lookups)
            .filter(|lookups| !lookups.is_empty())
    }

    pub fn entry(&self, state: StateId) -> Option<&str> {
        self.states.get(state).and_then(|s| s.entry.as_deref())
    }

    /// Every dictionary occurrence in `text`.
    ///
    /// A match may start at any character, but a match that begins (or
    /// ends) with a letter must begin (or end) on a word boundary.
    /// Only entries that themselves start with whitespace can match from a
    /// whitespace character. Matches are ordered by start ascending, then by end
    /// descending, so the longest match at a position comes first.
    pub fn find_matches(&self, text: &str) -> Vec<AutomatonMatch> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut matches = Vec::new();
        let mut at_start = Vec::new();

        for (i, &(start, first)) in chars.iter().enumerate() {
            if is_letter(first) && i > 0 && is_word_char(chars[i - 1].1) {
                continue;
            }

            let mut state = ROOT;
            for (j, &(_, c)) in chars.iter().enumerate().skip(i) {
                let Some(next) = self.states[state].next(normalize(c)) else {
                    break;
                };
                state = next;
                if !self.states[state].is_final() {
                    continue;
                }
                let following = chars.get(j + 1);
                if is_letter(c) && following.is_some_and(|&(_, n)| is_word_char(n)) {
                    continue;
                }
                let end = following.map_or(text.len(), |&(offset, _)| offset);
                at_start.push(AutomatonMatch { start, end, state });
            }
            matches.extend(at_start.drain(..).rev());
        }
        matches
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_accepting(&self) -> usize {
        self.states.iter().filter(|s| s.is_final()).count()
    }

    /// Graph Modeling Language rendering of the automaton, for inspection in
    /// graph tools. Nodes and edges appear in state id order.
    pub fn to_gml(&self) -> String {
        let mut nodes = String::new();
        let mut edges = String::new();
        for (id, state) in self.states.iter().enumerate() {
            let _ = write!(nodes, "node[ id {id} label \"{id}");
            if state.is_final() {
                let lookups: Vec<String> = state.lookups.iter().map(Lookup::to_string).collect();
                let _ = write!(nodes, ",F\\n[{}]", gml_escape(&lookups.join(", ")));
            }
            nodes.push_str("\"  ]\n");
            for &(c, target) in &state.transitions {
                let _ = write!(
                    edges,
                    "\nedge [ source {id} target {target} label \"'{}'\" ]\n",
                    gml_escape(&c.to_string())
                );
            }
        }
        format!("graph[ \ndirected 1\n{nodes}{edges}]\n")
    }
}

fn gml_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('"', "&quot;")
}
