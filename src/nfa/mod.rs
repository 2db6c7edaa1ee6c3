pub mod delta;
pub mod inclusion;
pub mod ops;
pub mod product;
pub mod serialize;
pub mod sync_iter;
pub mod tarjan;

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

pub use delta::{Delta, EPSILON, Move, Run, State, StatePost, StateSet, Symbol, SymbolPost, Transition, Word};
pub use inclusion::{are_equivalent, is_included, is_universal};
pub use ops::{
    complement, concatenate, determinize, fragile_revert, minimize, reduce, remove_epsilon,
    revert, uni,
};
pub use product::{intersection, product};
pub use sync_iter::{SyncExistentialIterator, SyncUniversalIterator};
pub use tarjan::TarjanVisitor;

use crate::alphabet::{Alphabet, OnTheFlyAlphabet};
use crate::errors::InputError;
use crate::utils::{OrdVector, SparseSet};

/// Mapping from original state indices to the indices they received in a
/// transformed automaton.
pub type StateRenaming = HashMap<State, State>;

/// A nondeterministic finite automaton over finite words.
///
/// The states are the numbers `0..num_of_states()`; a state may or may not
/// appear in the transition relation. Alphabets are not owned: operations
/// that need one borrow it from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nfa {
    /// The transition relation: `delta[q]` lists the moves of `q` ordered by
    /// symbol.
    pub delta: Delta,
    /// Initial states.
    pub initial: SparseSet,
    /// Accepting (final) states.
    pub accepting: SparseSet,
}

impl Nfa {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an automaton with `num_of_states` preallocated states and the
    /// given initial and accepting sets.
    #[must_use]
    pub fn with_capacity(
        num_of_states: usize,
        initial: impl Into<SparseSet>,
        accepting: impl Into<SparseSet>,
    ) -> Self {
        let mut nfa = Self {
            delta: Delta::with_num_of_states(num_of_states),
            initial: initial.into(),
            accepting: accepting.into(),
        };
        nfa.initial.reserve(num_of_states);
        nfa.accepting.reserve(num_of_states);
        nfa
    }

    /// Adds a fresh state and returns it.
    pub fn add_state(&mut self) -> State {
        let state = self.num_of_states();
        self.delta.allocate(state + 1);
        state
    }

    /// Makes `state` part of the automaton, growing it if needed.
    pub fn add_state_at(&mut self, state: State) -> State {
        if state >= self.delta.num_of_states() {
            self.delta.allocate(state + 1);
        }
        state
    }

    /// Current number of states, covering the initial and accepting sets as
    /// well as every state in the transition relation.
    pub fn num_of_states(&self) -> usize {
        self.delta
            .num_of_states()
            .max(self.initial.domain_size())
            .max(self.accepting.domain_size())
    }

    pub fn is_state(&self, state: State) -> bool {
        state < self.num_of_states()
    }

    pub fn clear(&mut self) {
        self.delta.clear();
        self.initial.clear();
        self.accepting.clear();
    }

    /// Exact equality including state numbering; stronger than isomorphism
    /// and mostly useful in tests.
    pub fn is_identical(&self, other: &Nfa) -> bool {
        self.initial == other.initial
            && self.accepting == other.accepting
            && self.delta == other.delta
    }

    /// The set of states reachable from `states` over `symbol` in one step.
    pub fn post(&self, states: &StateSet, symbol: Symbol) -> StateSet {
        let mut result = StateSet::new();
        for &state in states {
            if let Some(symbol_post) = self.delta.state_post(state).find(symbol) {
                result = result.union(&symbol_post.targets);
            }
        }
        result
    }

    /// Collapses all initial states into a single fresh one that copies
    /// their outgoing moves.
    pub fn unify_initial(&mut self) {
        if self.initial.len() <= 1 {
            return;
        }
        let unified = self.add_state();
        let originals: Vec<State> = self.initial.iter().copied().collect();
        for original in originals {
            let moves: Vec<(Symbol, StateSet)> = self
                .delta
                .state_post(original)
                .iter()
                .map(|post| (post.symbol, post.targets.clone()))
                .collect();
            for (symbol, targets) in moves {
                self.delta.add_targets(unified, symbol, &targets);
            }
            if self.accepting.contains(original) {
                self.accepting.insert(unified);
            }
        }
        self.initial.clear();
        self.initial.insert(unified);
    }

    /// Collapses all accepting states into a single fresh one that copies
    /// their incoming transitions.
    pub fn unify_final(&mut self) {
        if self.accepting.len() <= 1 {
            return;
        }
        let unified = self.add_state();
        let originals: Vec<State> = self.accepting.iter().copied().collect();
        for original in originals {
            for transition in self.delta.get_transitions_to(original) {
                self.delta.add(transition.source, transition.symbol, unified);
            }
            if self.initial.contains(original) {
                self.initial.insert(unified);
            }
        }
        self.accepting.clear();
        self.accepting.insert(unified);
    }

    /// States reachable from the initial states.
    pub fn get_reachable_states(&self) -> StateSet {
        let reachable = self.reachable_mask();
        reachable
            .iter()
            .enumerate()
            .filter_map(|(state, &is_reachable)| is_reachable.then_some(state))
            .collect()
    }

    fn reachable_mask(&self) -> Vec<bool> {
        let mut reachable = vec![false; self.num_of_states()];
        let mut worklist: Vec<State> = Vec::new();
        for &state in &self.initial {
            if !reachable[state] {
                reachable[state] = true;
                worklist.push(state);
            }
        }
        while let Some(state) = worklist.pop() {
            for symbol_post in self.delta.state_post(state) {
                for &target in &symbol_post.targets {
                    if !reachable[target] {
                        reachable[target] = true;
                        worklist.push(target);
                    }
                }
            }
        }
        reachable
    }

    /// States from which some accepting state is reachable.
    pub fn get_terminating_states(&self) -> StateSet {
        ops::revert(self).get_reachable_states()
    }

    /// BFS distances from the initial states; `usize::MAX` marks unreachable
    /// states. Indexed by state, one extra slot for the sink-free case.
    pub fn distances_from_initial(&self) -> Vec<usize> {
        let mut distances = vec![usize::MAX; self.num_of_states() + 1];
        let mut queue: VecDeque<State> = VecDeque::new();
        for &state in &self.initial {
            distances[state] = 0;
            queue.push_back(state);
        }
        while let Some(source) = queue.pop_front() {
            for mv in self.delta.state_post(source).moves() {
                if distances[mv.target] == usize::MAX {
                    distances[mv.target] = distances[source] + 1;
                    queue.push_back(mv.target);
                }
            }
        }
        distances
    }

    /// Removes states that are not both reachable from an initial state and
    /// co-reachable from an accepting one, renumbering the survivors
    /// densely. Returns the renaming of surviving original states.
    pub fn trim(&mut self) -> StateRenaming {
        let useful = self.get_useful_states();
        let mut renaming = vec![0; useful.len()];
        let mut fresh = 0;
        for (state, &is_useful) in useful.iter().enumerate() {
            if is_useful {
                renaming[state] = fresh;
                fresh += 1;
            }
        }
        tracing::debug!(
            original = useful.len(),
            trimmed = fresh,
            "trimming automaton"
        );

        self.delta.defragment(&useful, &renaming);
        let is_useful = |state: State| state < useful.len() && useful[state];
        self.initial.filter(is_useful);
        self.accepting.filter(is_useful);
        self.initial.rename(|state| renaming[state]);
        self.accepting.rename(|state| renaming[state]);
        self.initial.truncate();
        self.accepting.truncate();

        useful
            .iter()
            .enumerate()
            .filter_map(|(state, &keep)| keep.then_some((state, renaming[state])))
            .collect()
    }

    /// Is the language of the automaton empty?
    ///
    /// Without a counterexample sink this short-circuits through the Tarjan
    /// walker. With one, a BFS with parent pointers reconstructs a witness
    /// run ending in the first accepting state discovered.
    pub fn is_lang_empty(&self, cex: Option<&mut Run>) -> bool {
        let Some(cex) = cex else {
            return self.is_lang_empty_scc();
        };

        let mut worklist: VecDeque<State> = self.initial.iter().copied().collect();
        let mut processed: HashSet<State> = self.initial.iter().copied().collect();
        // paths[s] == t: state s was first reached from t; s == t marks an
        // initial state.
        let mut paths: HashMap<State, State> = worklist.iter().map(|&s| (s, s)).collect();

        while let Some(state) = worklist.pop_front() {
            if self.accepting.contains(state) {
                let mut path = vec![state];
                let mut current = state;
                while paths[&current] != current {
                    current = paths[&current];
                    path.push(current);
                }
                path.reverse();
                cex.path = path;
                cex.word = self
                    .get_word_for_path(&Run {
                        word: Vec::new(),
                        path: cex.path.clone(),
                    })
                    .map(|run| run.word)
                    .unwrap_or_default();
                return false;
            }
            for symbol_post in self.delta.state_post(state) {
                for &target in &symbol_post.targets {
                    if processed.insert(target) {
                        worklist.push_back(target);
                        paths.insert(target, state);
                    }
                }
            }
        }
        true
    }

    /// Recovers a word labeling the path of `run`, picking any symbol for
    /// each consecutive state pair. Returns `None` when some pair has no
    /// connecting transition.
    pub fn get_word_for_path(&self, run: &Run) -> Option<Run> {
        if run.path.is_empty() {
            return Some(Run::default());
        }
        let mut word = Word::new();
        let mut current = run.path[0];
        for &next in &run.path[1..] {
            let symbol = self
                .delta
                .state_post(current)
                .iter()
                .find(|post| post.targets.contains(&next))
                .map(|post| post.symbol)?;
            word.push(symbol);
            current = next;
        }
        Some(Run {
            word,
            path: run.path.clone(),
        })
    }

    /// Is `word` accepted by the automaton?
    pub fn is_in_lang(&self, word: &[Symbol]) -> bool {
        let mut current = self.initial.to_ord_vector();
        for &symbol in word {
            current = self.post(&current, symbol);
            if current.is_empty() {
                return false;
            }
        }
        self.accepting.intersects_with(&current)
    }

    /// Is some prefix of `word` accepted by the automaton?
    pub fn is_prefix_in_lang(&self, word: &[Symbol]) -> bool {
        let mut current = self.initial.to_ord_vector();
        for &symbol in word {
            if self.accepting.intersects_with(&current) {
                return true;
            }
            current = self.post(&current, symbol);
            if current.is_empty() {
                return false;
            }
        }
        self.accepting.intersects_with(&current)
    }

    /// All accepted words of length at most `max_length`.
    pub fn get_words(&self, max_length: usize) -> BTreeSet<Word> {
        let mut words = BTreeSet::new();
        let mut layer: Vec<(State, Word)> = Vec::new();
        for &state in &self.initial {
            if self.accepting.contains(state) {
                words.insert(Word::new());
            }
            layer.push((state, Word::new()));
        }
        for _ in 0..max_length {
            let mut next_layer = Vec::new();
            for (state, word) in &layer {
                for symbol_post in self.delta.state_post(*state) {
                    let mut longer = word.clone();
                    longer.push(symbol_post.symbol);
                    for &target in &symbol_post.targets {
                        if self.accepting.contains(target) {
                            words.insert(longer.clone());
                        }
                        next_layer.push((target, longer.clone()));
                    }
                }
            }
            layer = next_layer;
            if layer.is_empty() {
                break;
            }
        }
        words
    }

    /// Does the automaton have exactly one initial state and at most one
    /// target per state and symbol? Checks the whole automaton, not only the
    /// reachable part.
    pub fn is_deterministic(&self) -> bool {
        if self.initial.len() != 1 {
            return false;
        }
        for state in 0..self.delta.num_of_states() {
            for symbol_post in self.delta.state_post(state) {
                if symbol_post.num_of_targets() != 1 {
                    return false;
                }
            }
        }
        true
    }

    /// Does every reachable state have an outgoing transition over every
    /// symbol of `alphabet`? Errors when a transition symbol lies outside
    /// the alphabet.
    pub fn is_complete(&self, alphabet: &dyn Alphabet) -> Result<bool, InputError> {
        let symbols = alphabet.get_alphabet_symbols();
        let mut worklist: VecDeque<State> = self.initial.iter().copied().collect();
        let mut processed: HashSet<State> = self.initial.iter().copied().collect();
        while let Some(state) = worklist.pop_front() {
            let mut outgoing = 0;
            for symbol_post in self.delta.state_post(state) {
                outgoing += 1;
                if !symbols.contains(&symbol_post.symbol) {
                    return Err(InputError::SymbolOutsideAlphabet {
                        symbol: symbol_post.symbol,
                    });
                }
                for &target in &symbol_post.targets {
                    if processed.insert(target) {
                        worklist.push_back(target);
                    }
                }
            }
            if outgoing != symbols.len() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// For every state adds transitions to `sink_state` over the symbols of
    /// `symbols` missing from its outgoing moves. Self-loops over the whole
    /// alphabet are added at a fresh sink only when some transition was
    /// actually redirected. Returns whether anything was added.
    pub fn make_complete(&mut self, symbols: &OrdVector<Symbol>, sink_state: State) -> bool {
        let mut added = false;
        let num_of_states = self.num_of_states();
        for state in 0..num_of_states {
            let used: OrdVector<Symbol> = self
                .delta
                .state_post(state)
                .iter()
                .map(|post| post.symbol)
                .collect();
            for &symbol in &symbols.difference(&used) {
                self.delta.add(state, symbol, sink_state);
                added = true;
            }
        }
        if added && num_of_states <= sink_state {
            for &symbol in symbols {
                self.delta.add(sink_state, symbol, sink_state);
            }
        }
        added
    }

    /// Swaps accepting and non-accepting states.
    pub fn swap_final_nonfinal(&mut self) {
        let num_of_states = self.num_of_states();
        let mut swapped = SparseSet::with_capacity(num_of_states);
        for state in 0..num_of_states {
            if !self.accepting.contains(state) {
                swapped.insert(state);
            }
        }
        self.accepting = swapped;
    }

    /// Completes a deterministic automaton against `symbols` and swaps
    /// accepting and non-accepting states. An automaton without initial
    /// states receives an initial sink so that its complement accepts
    /// everything.
    pub fn complement_deterministic(&mut self, symbols: &OrdVector<Symbol>, sink_state: Option<State>) {
        let sink = sink_state.unwrap_or_else(|| self.num_of_states());
        if self.initial.is_empty() {
            self.initial.insert(sink);
            self.add_state_at(sink);
        }
        self.make_complete(symbols, sink);
        self.swap_final_nonfinal();
    }

    /// A digraph abstraction: the same graph with every transition relabeled
    /// to `abstract_symbol`.
    #[must_use]
    pub fn get_one_letter_aut(&self, abstract_symbol: Symbol) -> Nfa {
        let mut digraph = Nfa::with_capacity(
            self.num_of_states(),
            self.initial.clone(),
            self.accepting.clone(),
        );
        for transition in self.delta.transitions() {
            digraph
                .delta
                .add(transition.source, abstract_symbol, transition.target);
        }
        digraph
    }

    /// Contributes the symbols of this automaton to a shared alphabet.
    /// Values of already present symbols are not overwritten.
    pub fn fill_alphabet(&self, alphabet: &mut OnTheFlyAlphabet) {
        self.delta.add_symbols_to(alphabet);
    }

    /// Any accepted word, or `None` for an empty language. Symbols at or
    /// above `first_epsilon` are traversed but do not appear in the word.
    pub fn get_word(&self, first_epsilon: Symbol) -> Option<Word> {
        if self.initial.is_empty() || self.accepting.is_empty() {
            return None;
        }
        let mut worklist: Vec<(State, Word)> = Vec::new();
        for &initial in &self.initial {
            if self.accepting.contains(initial) {
                return Some(Word::new());
            }
            worklist.push((initial, Word::new()));
        }
        let mut searched = vec![false; self.num_of_states()];
        while let Some((state, word)) = worklist.pop() {
            for mv in self.delta.state_post(state).moves() {
                if searched[mv.target] {
                    continue;
                }
                let mut target_word = word.clone();
                if mv.symbol < first_epsilon {
                    target_word.push(mv.symbol);
                }
                if self.accepting.contains(mv.target) {
                    return Some(target_word);
                }
                worklist.push((mv.target, target_word));
                searched[mv.target] = true;
            }
        }
        None
    }

    /// Drops every transition but keeps the states.
    pub fn clear_transitions(&mut self) {
        let num_of_states = self.delta.num_of_states();
        self.delta.clear();
        self.delta.allocate(num_of_states);
    }

    /// Sorted set of symbols used on transitions; not necessarily the whole
    /// alphabet of the automaton.
    pub fn get_used_symbols(&self) -> OrdVector<Symbol> {
        self.delta.get_used_symbols()
    }
}

impl std::fmt::Display for Nfa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&serialize::write_mata(self))
    }
}

/// Creates an automaton accepting exactly the empty word.
#[must_use]
pub fn empty_string_nfa() -> Nfa {
    Nfa::with_capacity(1, [0], [0])
}

/// Creates an automaton accepting every word over `symbols`.
#[must_use]
pub fn sigma_star_nfa(symbols: &OrdVector<Symbol>) -> Nfa {
    let mut nfa = Nfa::with_capacity(1, [0], [0]);
    for &symbol in symbols {
        nfa.delta.add(0, symbol, 0);
    }
    nfa
}

/// Builds one shared alphabet from the used symbols of several automata.
#[must_use]
pub fn create_alphabet(nfas: &[&Nfa]) -> OnTheFlyAlphabet {
    let mut alphabet = OnTheFlyAlphabet::new();
    for nfa in nfas {
        nfa.fill_alphabet(&mut alphabet);
    }
    alphabet
}
