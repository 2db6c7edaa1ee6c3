use crate::nfa::delta::{StatePost, StateSet, Symbol, SymbolPost};

/// Lockstep walk over several [`StatePost`]s that stops at every symbol
/// present in **all** of them.
///
/// Usage protocol: construct (or [`SyncUniversalIterator::reset`]), feed the
/// posts with `push_back`, then alternate `advance`/`current`. Feeding posts
/// after the first `advance` breaks the iterator.
#[derive(Debug, Default)]
pub struct SyncUniversalIterator<'a> {
    slices: Vec<&'a [SymbolPost]>,
    positions: Vec<usize>,
    synchronized: bool,
}

impl<'a> SyncUniversalIterator<'a> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slices: Vec::with_capacity(capacity),
            positions: Vec::with_capacity(capacity),
            synchronized: false,
        }
    }

    pub fn push_back(&mut self, post: &'a StatePost) {
        self.slices.push(post.as_slice());
        self.positions.push(0);
    }

    pub fn reset(&mut self) {
        self.slices.clear();
        self.positions.clear();
        self.synchronized = false;
    }

    /// Advances all positions to the next symbol they share. Returns false
    /// when no further shared symbol exists.
    pub fn advance(&mut self) -> bool {
        if self.slices.is_empty() {
            return false;
        }
        if self.synchronized {
            self.positions[0] += 1;
            self.synchronized = false;
        }
        loop {
            // The candidate is the largest symbol under the current
            // positions; every position below it has to catch up.
            let mut candidate: Symbol = 0;
            for (slice, &position) in self.slices.iter().zip(&self.positions) {
                match slice.get(position) {
                    Some(post) => candidate = candidate.max(post.symbol),
                    None => return false,
                }
            }
            let mut all_equal = true;
            for (slice, position) in self.slices.iter().zip(self.positions.iter_mut()) {
                while slice[*position].symbol < candidate {
                    *position += 1;
                    if *position >= slice.len() {
                        return false;
                    }
                }
                if slice[*position].symbol != candidate {
                    all_equal = false;
                }
            }
            if all_equal {
                self.synchronized = true;
                return true;
            }
        }
    }

    /// The posts all sequences agree on, one per pushed state post.
    pub fn current(&self) -> impl Iterator<Item = &'a SymbolPost> + '_ {
        debug_assert!(self.synchronized, "current() before a successful advance()");
        self.slices
            .iter()
            .zip(&self.positions)
            .map(|(slice, &position)| &slice[position])
    }

    pub fn current_symbol(&self) -> Symbol {
        debug_assert!(self.synchronized);
        self.slices[0][self.positions[0]].symbol
    }
}

/// Lockstep walk over several [`StatePost`]s that stops at every symbol
/// present in **any** of them, exposing the posts that carry it.
///
/// Exhausted sequences are dropped as the walk proceeds, so after a failed
/// `advance` the iterator is empty and may be refilled without a reset.
#[derive(Debug, Default)]
pub struct SyncExistentialIterator<'a> {
    slices: Vec<&'a [SymbolPost]>,
    positions: Vec<usize>,
    current: Vec<&'a SymbolPost>,
}

impl<'a> SyncExistentialIterator<'a> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slices: Vec::with_capacity(capacity),
            positions: Vec::with_capacity(capacity),
            current: Vec::with_capacity(capacity),
        }
    }

    /// Feeds one state post; empty posts have no effect.
    pub fn push_back(&mut self, post: &'a StatePost) {
        if post.is_empty() {
            return;
        }
        self.slices.push(post.as_slice());
        self.positions.push(0);
    }

    pub fn reset(&mut self) {
        self.slices.clear();
        self.positions.clear();
        self.current.clear();
    }

    pub fn is_synchronized(&self) -> bool {
        !self.current.is_empty()
    }

    /// Advances to the next symbol present anywhere, collecting the posts at
    /// that minimum. Returns false when every sequence is exhausted.
    pub fn advance(&mut self) -> bool {
        self.current.clear();
        // Drop exhausted sequences; swap-remove keeps this O(1) each.
        let mut index = 0;
        while index < self.slices.len() {
            if self.positions[index] >= self.slices[index].len() {
                self.slices.swap_remove(index);
                self.positions.swap_remove(index);
            } else {
                index += 1;
            }
        }
        let minimum = self
            .slices
            .iter()
            .zip(&self.positions)
            .map(|(slice, &position)| slice[position].symbol)
            .min();
        let Some(minimum) = minimum else {
            return false;
        };
        for (slice, position) in self.slices.iter().zip(self.positions.iter_mut()) {
            if slice[*position].symbol == minimum {
                self.current.push(&slice[*position]);
                *position += 1;
            }
        }
        true
    }

    /// The posts at the current minimum symbol.
    pub fn current(&self) -> &[&'a SymbolPost] {
        &self.current
    }

    pub fn current_symbol(&self) -> Symbol {
        debug_assert!(self.is_synchronized(), "current_symbol() on an unsynchronized iterator");
        self.current[0].symbol
    }

    /// Union of the target sets at the current minimum symbol.
    #[must_use]
    pub fn unify_targets(&self) -> StateSet {
        let mut unified = StateSet::new();
        for post in &self.current {
            unified = unified.union(&post.targets);
        }
        unified
    }

    /// Fast-forwards to `symbol`. Returns whether any sequence carries it.
    pub fn synchronize_with(&mut self, symbol: Symbol) -> bool {
        loop {
            if self.is_synchronized() && self.current_symbol() >= symbol {
                break;
            }
            if !self.advance() {
                break;
            }
        }
        self.is_synchronized() && self.current_symbol() == symbol
    }
}
