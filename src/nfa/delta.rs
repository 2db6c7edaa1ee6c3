use crate::errors::AbsentTransitionError;
use crate::utils::OrdVector;

/// Identifier type for automaton states. States of an automaton with `n`
/// states are exactly the numbers `0..n`.
pub type State = usize;

/// Symbols are 64-bit unsigned integers; the top of the range is reserved.
pub type Symbol = u64;

/// The reserved epsilon symbol, interpreted as a silent move.
pub const EPSILON: Symbol = Symbol::MAX;

/// A set of states as a sorted vector.
pub type StateSet = OrdVector<State>;

/// A finite word over [`Symbol`]s.
pub type Word = Vec<Symbol>;

/// A word together with a path through the automaton reading it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    /// A finite-length word.
    pub word: Word,
    /// A finite-length path through the automaton.
    pub path: Vec<State>,
}

/// A single transition triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Transition {
    pub source: State,
    pub symbol: Symbol,
    pub target: State,
}

impl Transition {
    #[must_use]
    pub fn new(source: State, symbol: Symbol, target: State) -> Self {
        Self {
            source,
            symbol,
            target,
        }
    }
}

/// One step of a state: a symbol and a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub symbol: Symbol,
    pub target: State,
}

/// The transitions of one state over one symbol: the symbol and the sorted
/// set of target states. Targets are nonempty for any [`SymbolPost`] stored
/// in a [`StatePost`]; posts whose last target is removed are pruned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolPost {
    pub symbol: Symbol,
    pub targets: StateSet,
}

impl SymbolPost {
    #[must_use]
    pub fn new(symbol: Symbol, targets: impl Into<StateSet>) -> Self {
        Self {
            symbol,
            targets: targets.into(),
        }
    }

    pub fn num_of_targets(&self) -> usize {
        self.targets.len()
    }
}

/// The outgoing transitions of one state: [`SymbolPost`]s in strictly
/// ascending symbol order, no two sharing a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatePost {
    posts: Vec<SymbolPost>,
}

/// The canonical empty post returned for states without allocated
/// transitions, so reads never force an allocation.
static EMPTY_STATE_POST: StatePost = StatePost { posts: Vec::new() };

impl StatePost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SymbolPost> {
        self.posts.iter()
    }

    pub fn as_slice(&self) -> &[SymbolPost] {
        &self.posts
    }

    pub fn back(&self) -> Option<&SymbolPost> {
        self.posts.last()
    }

    fn position(&self, symbol: Symbol) -> Result<usize, usize> {
        self.posts.binary_search_by_key(&symbol, |post| post.symbol)
    }

    /// The post for `symbol`, if any transitions over it exist.
    pub fn find(&self, symbol: Symbol) -> Option<&SymbolPost> {
        self.position(symbol).ok().map(|index| &self.posts[index])
    }

    pub fn find_mut(&mut self, symbol: Symbol) -> Option<&mut SymbolPost> {
        self.position(symbol).ok().map(|index| &mut self.posts[index])
    }

    /// Inserts a post at its symbol-ordered position, unioning targets when
    /// the symbol is already present.
    pub fn insert(&mut self, post: SymbolPost) {
        match self.position(post.symbol) {
            Ok(index) => {
                let targets = std::mem::take(&mut self.posts[index].targets);
                self.posts[index].targets = targets.union(&post.targets);
            }
            Err(index) => self.posts.insert(index, post),
        }
    }

    /// Appends a post without searching for its position.
    ///
    /// The caller must guarantee its symbol is strictly greater than the
    /// current maximum; checked in debug builds only.
    pub fn push_back(&mut self, post: SymbolPost) {
        debug_assert!(
            self.posts.last().is_none_or(|last| last.symbol < post.symbol),
            "push_back would break the symbol ordering invariant"
        );
        self.posts.push(post);
    }

    pub fn remove(&mut self, symbol: Symbol) -> Option<SymbolPost> {
        self.position(symbol).ok().map(|index| self.posts.remove(index))
    }

    pub fn retain(&mut self, keep: impl FnMut(&SymbolPost) -> bool) {
        self.posts.retain(keep);
    }

    /// Index of the first post whose symbol is at least `first_epsilon`, or
    /// `len()` when there is none. Scans from the back, since epsilons sit
    /// at the tail and are typically few, mostly one.
    pub fn first_epsilon_index(&self, first_epsilon: Symbol) -> usize {
        let mut index = self.posts.len();
        while index > 0 && self.posts[index - 1].symbol >= first_epsilon {
            index -= 1;
        }
        index
    }

    /// Flattened iteration over (symbol, target) pairs.
    pub fn moves(&self) -> impl Iterator<Item = Move> + '_ {
        self.posts.iter().flat_map(|post| {
            post.targets.iter().map(|&target| Move {
                symbol: post.symbol,
                target,
            })
        })
    }

    /// Total number of moves, i.e. the sum of target-set sizes.
    pub fn num_of_moves(&self) -> usize {
        self.posts.iter().map(SymbolPost::num_of_targets).sum()
    }
}

impl<'a> IntoIterator for &'a StatePost {
    type Item = &'a SymbolPost;
    type IntoIter = std::slice::Iter<'a, SymbolPost>;

    fn into_iter(self) -> Self::IntoIter {
        self.posts.iter()
    }
}

impl FromIterator<SymbolPost> for StatePost {
    fn from_iter<I: IntoIterator<Item = SymbolPost>>(iter: I) -> Self {
        let mut post = StatePost::new();
        for symbol_post in iter {
            post.insert(symbol_post);
        }
        post
    }
}

/// The transition relation: one [`StatePost`] per source state.
///
/// The table grows on writes; reading the post of a state beyond the table
/// returns the canonical empty post. `num_of_states()` is the length of the
/// table and covers every state mentioned as a source or a target.
#[derive(Debug, Clone, Default)]
pub struct Delta {
    state_posts: Vec<StatePost>,
}

impl Delta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a relation with `n` allocated (empty) state posts.
    #[must_use]
    pub fn with_num_of_states(n: usize) -> Self {
        Self {
            state_posts: vec![StatePost::new(); n],
        }
    }

    pub fn num_of_states(&self) -> usize {
        self.state_posts.len()
    }

    /// Grows the table so that states below `n` have allocated posts.
    pub fn allocate(&mut self, n: usize) {
        if n > self.state_posts.len() {
            self.state_posts.resize(n, StatePost::new());
        }
    }

    pub fn reserve(&mut self, n: usize) {
        self.state_posts.reserve(n.saturating_sub(self.state_posts.len()));
    }

    pub fn clear(&mut self) {
        self.state_posts.clear();
    }

    /// The outgoing transitions of `state`; the canonical empty post when the
    /// state has none allocated.
    pub fn state_post(&self, state: State) -> &StatePost {
        self.state_posts.get(state).unwrap_or(&EMPTY_STATE_POST)
    }

    /// Write access to the post of `state`, allocating the table up to
    /// `state + 1` if needed.
    pub fn mutable_state_post(&mut self, state: State) -> &mut StatePost {
        if state >= self.state_posts.len() {
            self.state_posts.resize(state + 1, StatePost::new());
        }
        &mut self.state_posts[state]
    }

    /// Inserts the transition `(source, symbol, target)`, growing the state
    /// table up to `max(source, target) + 1`.
    pub fn add(&mut self, source: State, symbol: Symbol, target: State) {
        let max_state = source.max(target);
        if max_state >= self.state_posts.len() {
            self.state_posts.resize(max_state + 1, StatePost::new());
        }
        let state_post = &mut self.state_posts[source];
        match state_post.back() {
            Some(back) if back.symbol >= symbol => {
                if let Some(symbol_post) = state_post.find_mut(symbol) {
                    symbol_post.targets.insert(target);
                } else {
                    state_post.insert(SymbolPost::new(symbol, vec![target]));
                }
            }
            _ => state_post.push_back(SymbolPost::new(symbol, vec![target])),
        }
    }

    /// Inserts a transition to every state of `targets` at once.
    pub fn add_targets(&mut self, source: State, symbol: Symbol, targets: &StateSet) {
        let Some(&max_target) = targets.last() else {
            return;
        };
        let max_state = source.max(max_target);
        if max_state >= self.state_posts.len() {
            self.state_posts.resize(max_state + 1, StatePost::new());
        }
        let state_post = &mut self.state_posts[source];
        match state_post.back() {
            Some(back) if back.symbol >= symbol => {
                state_post.insert(SymbolPost::new(symbol, targets.clone()));
            }
            _ => state_post.push_back(SymbolPost::new(symbol, targets.clone())),
        }
    }

    pub fn add_transition(&mut self, transition: Transition) {
        self.add(transition.source, transition.symbol, transition.target);
    }

    /// Removes the transition `(source, symbol, target)`.
    ///
    /// Removing a transition that is not present is an error. A symbol post
    /// whose last target is removed is deleted from the state post.
    pub fn remove(
        &mut self,
        source: State,
        symbol: Symbol,
        target: State,
    ) -> Result<(), AbsentTransitionError> {
        let absent = || AbsentTransitionError::new(source, symbol, target);
        let state_post = self.state_posts.get_mut(source).ok_or_else(absent)?;
        let symbol_post = state_post.find_mut(symbol).ok_or_else(absent)?;
        if !symbol_post.targets.remove(&target) {
            return Err(absent());
        }
        if symbol_post.targets.is_empty() {
            state_post.remove(symbol);
        }
        Ok(())
    }

    pub fn contains(&self, source: State, symbol: Symbol, target: State) -> bool {
        self.state_posts
            .get(source)
            .and_then(|post| post.find(symbol))
            .is_some_and(|symbol_post| symbol_post.targets.contains(&target))
    }

    /// Total number of transition triples; linear in their count.
    pub fn num_of_transitions(&self) -> usize {
        self.state_posts.iter().map(StatePost::num_of_moves).sum()
    }

    /// True when the relation holds no transitions at all.
    pub fn empty(&self) -> bool {
        self.state_posts.iter().all(StatePost::is_empty)
    }

    /// Iterates over transitions in ascending `(source, symbol, target)`
    /// order.
    pub fn transitions(&self) -> Transitions<'_> {
        Transitions {
            delta: self,
            source: 0,
            post_index: 0,
            target_index: 0,
        }
    }

    /// The epsilon post of `state`, if present.
    ///
    /// When `epsilon` is the reserved [`EPSILON`] the post can only be the
    /// last element, which gives an O(1) fast path.
    pub fn epsilon_symbol_posts(&self, state: State, epsilon: Symbol) -> Option<&SymbolPost> {
        let state_post = self.state_post(state);
        if epsilon == EPSILON {
            state_post.back().filter(|post| post.symbol == EPSILON)
        } else {
            state_post.find(epsilon)
        }
    }

    /// All transitions leading into `target`. Traverses the entire relation.
    pub fn get_transitions_to(&self, target: State) -> Vec<Transition> {
        let mut incoming = Vec::new();
        for (source, state_post) in self.state_posts.iter().enumerate() {
            for symbol_post in state_post {
                if symbol_post.targets.contains(&target) {
                    incoming.push(Transition::new(source, symbol_post.symbol, target));
                }
            }
        }
        incoming
    }

    /// A copy of the relation with every target state replaced by
    /// `renumber(target)`; source indices are preserved.
    #[must_use]
    pub fn renumber_targets(&self, renumber: impl Fn(State) -> State) -> Vec<StatePost> {
        self.state_posts
            .iter()
            .map(|state_post| {
                state_post
                    .iter()
                    .map(|symbol_post| {
                        let targets: StateSet =
                            symbol_post.targets.iter().map(|&t| renumber(t)).collect();
                        SymbolPost::new(symbol_post.symbol, targets)
                    })
                    .collect()
            })
            .collect()
    }

    /// Appends state posts after the current table, as used by union.
    pub fn append(&mut self, posts: Vec<StatePost>) {
        self.state_posts.extend(posts);
    }

    /// Collapses the relation onto the states where `is_staying` holds,
    /// renaming every appearing state through `renaming` and dropping
    /// transitions that touch removed states.
    pub fn defragment(&mut self, is_staying: &[bool], renaming: &[State]) {
        let staying = |state: State| state < is_staying.len() && is_staying[state];
        let mut index = 0;
        self.state_posts.retain(|_| {
            let keep = staying(index);
            index += 1;
            keep
        });
        for state_post in &mut self.state_posts {
            for symbol_post in &mut state_post.posts {
                symbol_post.targets.retain(|&target| staying(target));
                symbol_post.targets.rename(renaming);
            }
            state_post.retain(|symbol_post| !symbol_post.targets.is_empty());
        }
    }

    /// Contributes every transition symbol to a shared alphabet, naming it
    /// by its decimal value. Values of already present symbols are not
    /// overwritten.
    pub fn add_symbols_to(&self, alphabet: &mut crate::alphabet::OnTheFlyAlphabet) {
        for state_post in &self.state_posts {
            for symbol_post in state_post {
                alphabet.update_next_symbol_value(symbol_post.symbol);
                alphabet.try_add_new_symbol(symbol_post.symbol.to_string(), symbol_post.symbol);
            }
        }
    }

    /// Sorted set of symbols appearing on any transition.
    pub fn get_used_symbols(&self) -> OrdVector<Symbol> {
        let mut symbols = Vec::new();
        for state_post in &self.state_posts {
            for symbol_post in state_post {
                symbols.push(symbol_post.symbol);
            }
        }
        symbols.into()
    }

    /// The largest symbol on any transition; 0 for an empty relation.
    pub fn max_symbol(&self) -> Symbol {
        self.state_posts
            .iter()
            .filter_map(|post| post.back().map(|symbol_post| symbol_post.symbol))
            .max()
            .unwrap_or(0)
    }
}

impl std::ops::Index<State> for Delta {
    type Output = StatePost;

    fn index(&self, state: State) -> &StatePost {
        self.state_post(state)
    }
}

/// Deltas compare equal when they hold the same transition triples,
/// regardless of trailing empty posts.
impl PartialEq for Delta {
    fn eq(&self, other: &Self) -> bool {
        self.transitions().eq(other.transitions())
    }
}

impl Eq for Delta {}

/// Lazy iterator over the transition triples of a [`Delta`].
pub struct Transitions<'a> {
    delta: &'a Delta,
    source: State,
    post_index: usize,
    target_index: usize,
}

impl Iterator for Transitions<'_> {
    type Item = Transition;

    fn next(&mut self) -> Option<Transition> {
        while self.source < self.delta.num_of_states() {
            let state_post = self.delta.state_post(self.source);
            if let Some(symbol_post) = state_post.as_slice().get(self.post_index) {
                if let Some(&target) = symbol_post.targets.as_slice().get(self.target_index) {
                    self.target_index += 1;
                    return Some(Transition::new(self.source, symbol_post.symbol, target));
                }
                self.post_index += 1;
                self.target_index = 0;
            } else {
                self.source += 1;
                self.post_index = 0;
                self.target_index = 0;
            }
        }
        None
    }
}
