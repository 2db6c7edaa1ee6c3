use std::collections::{HashMap, VecDeque};

use crate::nfa::delta::{EPSILON, StatePost, Symbol, SymbolPost};
use crate::nfa::sync_iter::SyncUniversalIterator;
use crate::nfa::{Nfa, State};

/// Caller-visible mapping from pairs of operand states to product states.
pub type ProductMap = HashMap<(State, State), State>;

/// The largest matrix of state pairs worth allocating; beyond it the
/// pair-to-product map falls back to per-state hash maps to cap memory.
const MAX_PRODUCT_MATRIX_SIZE: usize = 50_000_000;

const NO_STATE: State = usize::MAX;

/// Pair-to-product-state storage: a dense matrix for small products, a
/// vector of hash maps indexed by the left state otherwise.
enum PairStorage {
    Matrix(Vec<Vec<State>>),
    VecMap(Vec<HashMap<State, State>>),
}

impl PairStorage {
    fn new(lhs_states: usize, rhs_states: usize) -> Self {
        if lhs_states.saturating_mul(rhs_states) <= MAX_PRODUCT_MATRIX_SIZE {
            Self::Matrix(vec![vec![NO_STATE; rhs_states]; lhs_states])
        } else {
            Self::VecMap(vec![HashMap::new(); lhs_states])
        }
    }

    fn get(&self, lhs_state: State, rhs_state: State) -> State {
        match self {
            Self::Matrix(matrix) => matrix[lhs_state][rhs_state],
            Self::VecMap(maps) => maps[lhs_state].get(&rhs_state).copied().unwrap_or(NO_STATE),
        }
    }

    fn insert(&mut self, lhs_state: State, rhs_state: State, product_state: State) {
        match self {
            Self::Matrix(matrix) => matrix[lhs_state][rhs_state] = product_state,
            Self::VecMap(maps) => {
                maps[lhs_state].insert(rhs_state, product_state);
            }
        }
    }
}

/// Intersection of two automata, preserving epsilon transitions.
///
/// For each ε-transition `s -ε-> p` of one side and each product state
/// `(s, a)`, the product gets `(s, a) -ε-> (p, a)`; a product state is
/// accepting when both components are.
#[must_use]
pub fn intersection(lhs: &Nfa, rhs: &Nfa, prod_map: Option<&mut ProductMap>) -> Nfa {
    if lhs.initial.is_empty()
        || lhs.accepting.is_empty()
        || rhs.initial.is_empty()
        || rhs.accepting.is_empty()
    {
        return Nfa::new();
    }
    product(
        lhs,
        rhs,
        |lhs_state, rhs_state| {
            lhs.accepting.contains(lhs_state) && rhs.accepting.contains(rhs_state)
        },
        EPSILON,
        prod_map,
    )
}

/// General product of two automata.
///
/// `final_condition` decides product-state acceptance from the component
/// pair. Symbols below `first_epsilon` are composed synchronously through a
/// universal lockstep iterator; every symbol at or above the bound is
/// treated as an epsilon and composed one-sided, keeping the other component
/// fixed.
#[must_use]
pub fn product(
    lhs: &Nfa,
    rhs: &Nfa,
    final_condition: impl Fn(State, State) -> bool,
    first_epsilon: Symbol,
    mut prod_map: Option<&mut ProductMap>,
) -> Nfa {
    let lhs_states = lhs.num_of_states();
    let rhs_states = rhs.num_of_states();
    let mut result = Nfa::new();
    let mut worklist: VecDeque<State> = VecDeque::new();

    let mut pair_storage = PairStorage::new(lhs_states, rhs_states);
    // Reverse maps from a product state to its two components.
    let mut product_to_lhs: Vec<State> = Vec::with_capacity(lhs_states + rhs_states);
    let mut product_to_rhs: Vec<State> = Vec::with_capacity(lhs_states + rhs_states);

    // Seed the worklist with all initial pairs.
    for &lhs_initial in &lhs.initial {
        for &rhs_initial in &rhs.initial {
            let product_initial = result.add_state();
            pair_storage.insert(lhs_initial, rhs_initial, product_initial);
            product_to_lhs.push(lhs_initial);
            product_to_rhs.push(rhs_initial);
            if let Some(map) = prod_map.as_deref_mut() {
                map.insert((lhs_initial, rhs_initial), product_initial);
            }
            worklist.push_back(product_initial);
            result.initial.insert(product_initial);
            if final_condition(lhs_initial, rhs_initial) {
                result.accepting.insert(product_initial);
            }
        }
    }

    // Creates the product state for a component pair on first sight and
    // records its target in the symbol post under construction.
    let mut create_product_state = |lhs_target: State,
                                    rhs_target: State,
                                    product_symbol_post: &mut SymbolPost,
                                    result: &mut Nfa,
                                    worklist: &mut VecDeque<State>,
                                    pair_storage: &mut PairStorage,
                                    product_to_lhs: &mut Vec<State>,
                                    product_to_rhs: &mut Vec<State>| {
        let mut product_target = pair_storage.get(lhs_target, rhs_target);
        if product_target == NO_STATE {
            product_target = result.add_state();
            pair_storage.insert(lhs_target, rhs_target, product_target);
            product_to_lhs.push(lhs_target);
            product_to_rhs.push(rhs_target);
            if let Some(map) = prod_map.as_deref_mut() {
                map.insert((lhs_target, rhs_target), product_target);
            }
            worklist.push_back(product_target);
            if final_condition(lhs_target, rhs_target) {
                result.accepting.insert(product_target);
            }
        }
        product_symbol_post.targets.insert(product_target);
    };

    // Merges an epsilon symbol post into the product source's post. Epsilon
    // posts from the two sides arrive out of symbol order and may repeat a
    // symbol, so they are inserted rather than appended.
    let add_product_epsilon_post =
        |product_source: State, symbol_post: SymbolPost, result: &mut Nfa| {
            if symbol_post.targets.is_empty() {
                return;
            }
            result
                .delta
                .mutable_state_post(product_source)
                .insert(symbol_post);
        };

    while let Some(product_source) = worklist.pop_back() {
        let lhs_source = product_to_lhs[product_source];
        let rhs_source = product_to_rhs[product_source];

        // Classic synchronous product under the epsilon bound.
        let mut sync_iterator = SyncUniversalIterator::new(2);
        sync_iterator.push_back(lhs.delta.state_post(lhs_source));
        sync_iterator.push_back(rhs.delta.state_post(rhs_source));

        while sync_iterator.advance() {
            let symbol = sync_iterator.current_symbol();
            if symbol >= first_epsilon {
                break;
            }
            let posts: Vec<&SymbolPost> = sync_iterator.current().collect();
            debug_assert_eq!(posts.len(), 2, "one post per operand");
            let mut product_symbol_post = SymbolPost::new(symbol, Vec::new());
            for &lhs_target in &posts[0].targets {
                for &rhs_target in &posts[1].targets {
                    create_product_state(
                        lhs_target,
                        rhs_target,
                        &mut product_symbol_post,
                        &mut result,
                        &mut worklist,
                        &mut pair_storage,
                        &mut product_to_lhs,
                        &mut product_to_rhs,
                    );
                }
            }
            // Symbols of the synchronous phase arrive in ascending order, so
            // this lands at the back of the post.
            result
                .delta
                .mutable_state_post(product_source)
                .insert(product_symbol_post);
        }

        // Epsilon transitions of the left side, right component fixed.
        let lhs_post: &StatePost = lhs.delta.state_post(lhs_source);
        for symbol_post in &lhs_post.as_slice()[lhs_post.first_epsilon_index(first_epsilon)..] {
            let mut product_symbol_post = SymbolPost::new(symbol_post.symbol, Vec::new());
            for &lhs_target in &symbol_post.targets {
                create_product_state(
                    lhs_target,
                    rhs_source,
                    &mut product_symbol_post,
                    &mut result,
                    &mut worklist,
                    &mut pair_storage,
                    &mut product_to_lhs,
                    &mut product_to_rhs,
                );
            }
            add_product_epsilon_post(product_source, product_symbol_post, &mut result);
        }

        // Epsilon transitions of the right side, left component fixed.
        let rhs_post: &StatePost = rhs.delta.state_post(rhs_source);
        for symbol_post in &rhs_post.as_slice()[rhs_post.first_epsilon_index(first_epsilon)..] {
            let mut product_symbol_post = SymbolPost::new(symbol_post.symbol, Vec::new());
            for &rhs_target in &symbol_post.targets {
                create_product_state(
                    lhs_source,
                    rhs_target,
                    &mut product_symbol_post,
                    &mut result,
                    &mut worklist,
                    &mut pair_storage,
                    &mut product_to_lhs,
                    &mut product_to_rhs,
                );
            }
            add_product_epsilon_post(product_source, product_symbol_post, &mut result);
        }
    }

    result
}
