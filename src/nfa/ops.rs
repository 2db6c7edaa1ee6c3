use indexmap::IndexMap;
use tracing::debug;

use crate::errors::ParamError;
use crate::nfa::delta::{Delta, EPSILON, StateSet, Symbol, SymbolPost};
use crate::nfa::sync_iter::SyncExistentialIterator;
use crate::nfa::{Nfa, State, StateRenaming};
use crate::params::{ParameterMap, check_keys, require};
use crate::sim::{BinaryRelation, Lts};
use crate::utils::OrdVector;

/// Reverses the automaton: every transition is flipped and the initial and
/// accepting sets are swapped. The language of the result is the reverse of
/// the language of `aut`.
#[must_use]
pub fn revert(aut: &Nfa) -> Nfa {
    simple_revert(aut)
}

/// The canonical reversal: random-access insertion into the reversed
/// relation, one transition at a time.
#[must_use]
pub fn simple_revert(aut: &Nfa) -> Nfa {
    let mut result = Nfa::new();
    result.delta.allocate(aut.num_of_states());
    for source in 0..aut.delta.num_of_states() {
        for symbol_post in aut.delta.state_post(source) {
            for &target in &symbol_post.targets {
                result.delta.add(target, symbol_post.symbol, source);
            }
        }
    }
    result.initial = aut.accepting.clone();
    result.accepting = aut.initial.clone();
    result
}

/// Reversal by bucket-sorting edges per symbol and emitting the reversed
/// posts in ascending source order, avoiding per-insertion binary search.
///
/// Allocates arrays indexed by symbol values, so it is unsuitable for
/// automata using large symbol numbers; epsilon edges go to a separate
/// bucket so the reserved maximal symbol does not blow the arrays up.
#[must_use]
pub fn fragile_revert(aut: &Nfa) -> Nfa {
    let num_of_states = aut.num_of_states();
    let mut result = Nfa::new();
    result.delta.allocate(num_of_states);
    result.initial = aut.accepting.clone();
    result.accepting = aut.initial.clone();

    let mut symbols = aut.delta.get_used_symbols();
    if symbols.last() == Some(&EPSILON) {
        symbols.remove(&EPSILON);
    }
    let alphasize = symbols.last().map_or(0, |&max| max as usize + 1);

    // All transitions are copied into parallel source/target arrays indexed
    // by the symbol; since delta is walked in source order, the source
    // arrays come out ordered and targets can be appended without search.
    let mut sources: Vec<Vec<State>> = vec![Vec::new(); alphasize];
    let mut targets: Vec<Vec<State>> = vec![Vec::new(); alphasize];
    let mut e_sources: Vec<State> = Vec::new();
    let mut e_targets: Vec<State> = Vec::new();

    for source in 0..num_of_states {
        for symbol_post in aut.delta.state_post(source) {
            if symbol_post.symbol == EPSILON {
                for &target in &symbol_post.targets {
                    e_sources.push(source);
                    e_targets.push(target);
                }
            } else {
                for &target in &symbol_post.targets {
                    sources[symbol_post.symbol as usize].push(source);
                    targets[symbol_post.symbol as usize].push(target);
                }
            }
        }
    }

    for &symbol in &symbols {
        let bucket = symbol as usize;
        for i in 0..sources[bucket].len() {
            let reversed_target = sources[bucket][i];
            let reversed_source = targets[bucket][i];
            let post = result.delta.mutable_state_post(reversed_source);
            if post.back().is_none_or(|back| back.symbol != symbol) {
                post.push_back(SymbolPost::new(symbol, Vec::new()));
            }
            // Sources were visited in ascending order, so appending keeps
            // the target set sorted.
            let symbol_post = post.find_mut(symbol).expect("post was just ensured");
            symbol_post.targets.insert(reversed_target);
        }
    }

    for i in 0..e_sources.len() {
        let reversed_target = e_sources[i];
        let reversed_source = e_targets[i];
        let post = result.delta.mutable_state_post(reversed_source);
        if post.back().is_none_or(|back| back.symbol != EPSILON) {
            post.push_back(SymbolPost::new(EPSILON, Vec::new()));
        }
        let symbol_post = post.find_mut(EPSILON).expect("post was just ensured");
        symbol_post.targets.insert(reversed_target);
    }

    result
}

/// Eliminates `epsilon` transitions.
///
/// Computes the reflexive-transitive closure of the epsilon edges by
/// fixed-point iteration; in the result a state is accepting iff its closure
/// hits an accepting state, and it carries the non-epsilon moves of every
/// state in its closure.
#[must_use]
pub fn remove_epsilon(aut: &Nfa, epsilon: Symbol) -> Nfa {
    let num_of_states = aut.num_of_states();
    let mut closure: Vec<StateSet> = (0..num_of_states)
        .map(StateSet::singleton)
        .collect();
    for (state, state_closure) in closure.iter_mut().enumerate() {
        if let Some(post) = aut.delta.epsilon_symbol_posts(state, epsilon) {
            *state_closure = state_closure.union(&post.targets);
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for state in 0..num_of_states {
            let Some(post) = aut.delta.epsilon_symbol_posts(state, epsilon) else {
                continue;
            };
            let mut grown = closure[state].clone();
            for &target in &post.targets {
                grown = grown.union(&closure[target]);
            }
            if grown.len() > closure[state].len() {
                closure[state] = grown;
                changed = true;
            }
        }
    }

    let mut result = Nfa {
        delta: Delta::new(),
        initial: aut.initial.clone(),
        accepting: aut.accepting.clone(),
    };
    for (state, state_closure) in closure.iter().enumerate() {
        for &reached in state_closure {
            if aut.accepting.contains(reached) {
                result.accepting.insert(state);
            }
            for symbol_post in aut.delta.state_post(reached) {
                if symbol_post.symbol == epsilon {
                    continue;
                }
                result.delta.add_targets(state, symbol_post.symbol, &symbol_post.targets);
            }
        }
    }
    result
}

/// Subset construction.
///
/// The worklist carries macro-states as sorted state sets; an existential
/// synchronized iterator over the member posts emits, per symbol, the union
/// of the member target sets. `subset_map` (optional, caller-visible)
/// canonicalizes macro-states to result states. Epsilon is treated as an
/// ordinary symbol; eliminate it first for the standard semantics.
#[must_use]
pub fn determinize(aut: &Nfa, subset_map: Option<&mut IndexMap<StateSet, State>>) -> Nfa {
    let mut owned_map = IndexMap::new();
    let subset_map = match subset_map {
        Some(map) => map,
        None => &mut owned_map,
    };

    let mut result = Nfa::new();
    let start: StateSet = aut.initial.to_ord_vector();
    let start_id = result.add_state();
    result.initial.insert(start_id);
    if aut.accepting.intersects_with(&start) {
        result.accepting.insert(start_id);
    }
    let mut worklist: Vec<(State, StateSet)> = vec![(start_id, start.clone())];
    subset_map.insert(start, start_id);

    if aut.delta.empty() {
        return result;
    }

    let mut sync_iterator = SyncExistentialIterator::new(2);
    while let Some((source_id, source_set)) = worklist.pop() {
        // Target sets are never empty, so macro-states are not either.
        debug_assert!(!source_set.is_empty() || source_id == start_id);
        for &member in &source_set {
            sync_iterator.push_back(aut.delta.state_post(member));
        }
        while sync_iterator.advance() {
            let symbol = sync_iterator.current_symbol();
            let targets = sync_iterator.unify_targets();
            let target_id = match subset_map.get(&targets) {
                Some(&known) => known,
                None => {
                    let fresh = result.add_state();
                    if aut.accepting.intersects_with(&targets) {
                        result.accepting.insert(fresh);
                    }
                    subset_map.insert(targets.clone(), fresh);
                    worklist.push((fresh, targets));
                    fresh
                }
            };
            // Symbols come out ascending, so this lands at the post's back.
            result
                .delta
                .mutable_state_post(source_id)
                .insert(SymbolPost::new(symbol, vec![target_id]));
        }
    }
    result
}

/// Minimal deterministic automaton by Brzozowski's double reversal.
#[must_use]
pub fn minimize_brzozowski(aut: &Nfa) -> Nfa {
    determinize(&revert(&determinize(&revert(aut), None)), None)
}

/// Computes a minimal deterministic automaton.
///
/// Recognized parameters: `algorithm: brzozowski`.
pub fn minimize(aut: &Nfa, params: &ParameterMap) -> Result<Nfa, ParamError> {
    check_keys(params, &["algorithm"])?;
    match require(params, "algorithm")? {
        "brzozowski" => Ok(minimize_brzozowski(aut)),
        other => Err(ParamError::unknown_value("algorithm", other)),
    }
}

/// Language union by disjoint juxtaposition: the states of `rhs` are
/// renumbered past the states of `lhs`.
#[must_use]
pub fn uni(lhs: &Nfa, rhs: &Nfa) -> Nfa {
    let mut result = lhs.clone();
    result.union_with(rhs);
    result
}

impl Nfa {
    /// In-place union; see [`uni`].
    pub fn union_with(&mut self, other: &Nfa) -> &mut Self {
        let offset = self.num_of_states();
        // Copy the other side's sets first; `other` may alias `self`.
        let other_initial: Vec<State> = other.initial.iter().copied().collect();
        let other_accepting: Vec<State> = other.accepting.iter().copied().collect();

        self.delta.allocate(offset);
        self.delta.append(other.delta.renumber_targets(|target| target + offset));

        for state in other_accepting {
            self.accepting.insert(state + offset);
        }
        for state in other_initial {
            self.initial.insert(state + offset);
        }
        self
    }
}

/// Concatenates two automata.
///
/// Without epsilon, edges reaching an accepting state of `lhs` are copied to
/// the (renumbered) initial states of `rhs`; acceptance happens only in
/// `rhs`. With epsilon, an [`EPSILON`] edge connects every accepting state
/// of `lhs` to every initial state of `rhs` instead.
#[must_use]
pub fn concatenate(lhs: &Nfa, rhs: &Nfa) -> Nfa {
    concatenate_with_maps(lhs, rhs, false).0
}

/// Concatenation returning the state maps of both operands into the result.
#[must_use]
pub fn concatenate_with_maps(
    lhs: &Nfa,
    rhs: &Nfa,
    use_epsilon: bool,
) -> (Nfa, StateRenaming, StateRenaming) {
    let offset = lhs.num_of_states();
    let mut result = Nfa::new();
    result.delta = lhs.delta.clone();
    result.delta.allocate(offset);
    result.delta.append(rhs.delta.renumber_targets(|target| target + offset));
    result.initial = lhs.initial.clone();
    for &accepting in &rhs.accepting {
        result.accepting.insert(accepting + offset);
    }

    if use_epsilon {
        for &accepting in &lhs.accepting {
            for &initial in &rhs.initial {
                result.delta.add(accepting, EPSILON, initial + offset);
            }
        }
    } else {
        // Duplicate every edge into an accepting lhs state onto the mapped
        // rhs initial states.
        let incoming: Vec<(State, Symbol)> = lhs
            .delta
            .transitions()
            .filter(|transition| lhs.accepting.contains(transition.target))
            .map(|transition| (transition.source, transition.symbol))
            .collect();
        for (source, symbol) in incoming {
            for &initial in &rhs.initial {
                result.delta.add(source, symbol, initial + offset);
            }
        }
        // The empty word in lhs shifts the start into rhs.
        if lhs.initial.iter().any(|&state| lhs.accepting.contains(state)) {
            for &initial in &rhs.initial {
                result.initial.insert(initial + offset);
            }
        }
    }

    let lhs_map: StateRenaming = (0..lhs.num_of_states()).map(|state| (state, state)).collect();
    let rhs_map: StateRenaming = (0..rhs.num_of_states())
        .map(|state| (state, state + offset))
        .collect();
    (result, lhs_map, rhs_map)
}

/// Complements the language with respect to `symbols`.
///
/// Recognized parameters: `algorithm: classical` (determinize, make
/// complete, swap accepting and non-accepting states) and `minimize:
/// true | false` (minimize the deterministic automaton first).
pub fn complement(
    aut: &Nfa,
    symbols: &OrdVector<Symbol>,
    params: &ParameterMap,
) -> Result<Nfa, ParamError> {
    check_keys(params, &["algorithm", "minimize"])?;
    match require(params, "algorithm")? {
        "classical" => {}
        other => return Err(ParamError::unknown_value("algorithm", other)),
    }
    let minimize_first = match params.get("minimize").map(String::as_str) {
        None | Some("false") => false,
        Some("true") => true,
        Some(other) => return Err(ParamError::unknown_value("minimize", other)),
    };

    let mut deterministic = determinize(aut, None);
    if minimize_first {
        deterministic = minimize_brzozowski(&deterministic);
    }
    deterministic.complement_deterministic(symbols, None);
    Ok(deterministic)
}

/// Computes the forward simulation preorder of `aut` as a state-by-state
/// relation.
///
/// The automaton is loaded into an LTS with symbols compressed to dense
/// labels; accepting states get a self-loop over a fresh label so that no
/// non-accepting state can simulate an accepting one.
#[must_use]
pub fn compute_fw_direct_simulation(aut: &Nfa) -> BinaryRelation {
    let symbols = aut.delta.get_used_symbols();
    let label_of = |symbol: Symbol| symbols.find(&symbol).expect("symbol is in the used set");
    let num_of_states = aut.num_of_states();
    let mut lts = Lts::new(num_of_states);

    for transition in aut.delta.transitions() {
        lts.add_transition(transition.source, label_of(transition.symbol), transition.target);
    }
    let accepting_marker = symbols.len();
    for &accepting in &aut.accepting {
        lts.add_transition(accepting, accepting_marker, accepting);
    }
    lts.compute_simulation(num_of_states)
}

fn compute_simulation_relation(aut: &Nfa, direction: &str) -> Result<BinaryRelation, ParamError> {
    match direction {
        "forward" => Ok(compute_fw_direct_simulation(aut)),
        "backward" => Ok(compute_fw_direct_simulation(&revert(aut))),
        "bidirectional" => {
            let mut forward = compute_fw_direct_simulation(aut);
            let backward = compute_fw_direct_simulation(&revert(aut));
            forward.intersect_with(&backward);
            Ok(forward)
        }
        other => Err(ParamError::unknown_value("direction", other)),
    }
}

/// Quotients the automaton by the symmetric fragment of the simulation
/// preorder, keeping only the transitions of class representatives and
/// dropping targets subsumed by a simulating representative.
fn reduce_size_by_simulation(aut: &Nfa, relation: &BinaryRelation) -> (Nfa, StateRenaming) {
    let mut symmetric = relation.clone();
    symmetric.restrict_to_symmetric();
    let quot_proj = symmetric.get_quotient_projection();

    let num_of_states = aut.num_of_states();
    let mut result = Nfa::new();
    let mut renaming = StateRenaming::new();

    // Map every state to the result state of its equivalence class.
    for state in 0..num_of_states {
        let representative = quot_proj[state];
        if let Some(&class_state) = renaming.get(&representative) {
            renaming.insert(state, class_state);
        } else {
            let class_state = result.add_state();
            renaming.insert(representative, class_state);
            renaming.insert(state, class_state);
        }
    }

    for state in 0..num_of_states {
        let class_state = renaming[&state];
        if aut.initial.contains(state) {
            // A class with an initial state is initial as a whole.
            result.initial.insert(class_state);
        }
        if quot_proj[state] != state {
            continue;
        }
        // Representative transitions are enough under simulation.
        for symbol_post in aut.delta.state_post(state) {
            let representatives: StateSet =
                symbol_post.targets.iter().map(|&target| quot_proj[target]).collect();
            let mut class_targets = StateSet::new();
            for &target in &representatives {
                let subsumed = representatives.iter().any(|&other| {
                    other != target && relation.get(target, other)
                });
                if !subsumed {
                    class_targets.insert(renaming[&target]);
                }
            }
            result
                .delta
                .mutable_state_post(class_state)
                .insert(SymbolPost::new(symbol_post.symbol, class_targets));
        }
        if aut.accepting.contains(state) {
            result.accepting.insert(class_state);
        }
    }

    debug!(
        original = num_of_states,
        reduced = result.num_of_states(),
        "simulation quotient"
    );
    (result, renaming)
}

/// Reduces the size of the automaton.
///
/// Recognized parameters:
/// - `algorithm: simulation` with `direction: forward | backward |
///   bidirectional` — quotient by simulation equivalence;
/// - `algorithm: residual` with `direction: forward | backward` and
///   `type: with | after` — canonical residual automaton with covering
///   macro-states removed during or after the final determinization.
///
/// Returns the reduced automaton and the renaming of original states to
/// reduced states (empty for the residual algorithms, which renumber
/// through two determinizations).
pub fn reduce(aut: &Nfa, params: &ParameterMap) -> Result<(Nfa, StateRenaming), ParamError> {
    match require(params, "algorithm")? {
        "simulation" => {
            check_keys(params, &["algorithm", "direction"])?;
            let direction = params.get("direction").map_or("forward", String::as_str);
            if direction == "backward" {
                // Backward simulation is forward simulation of the reverse;
                // reduce there and flip back.
                let reverted = revert(aut);
                let relation = compute_fw_direct_simulation(&reverted);
                let (reduced, renaming) = reduce_size_by_simulation(&reverted, &relation);
                return Ok((revert(&reduced), renaming));
            }
            let relation = compute_simulation_relation(aut, direction)?;
            Ok(reduce_size_by_simulation(aut, &relation))
        }
        "residual" => {
            check_keys(params, &["algorithm", "direction", "type"])?;
            let direction = require(params, "direction")?;
            if direction != "forward" && direction != "backward" {
                return Err(ParamError::unknown_value("direction", direction));
            }
            let residual_type = require(params, "type")?;

            // The forward canonical residual automaton determinizes
            // backwards first and builds residually forwards; backward is
            // the mirror image, with the two initial reversals cancelling.
            let mut back_determinized = aut.clone();
            if direction == "forward" {
                back_determinized = revert(&back_determinized);
            }
            back_determinized = revert(&determinize(&back_determinized, None));

            let mut result = match residual_type {
                "with" => residual_with(&back_determinized),
                "after" => residual_after(&back_determinized),
                other => return Err(ParamError::unknown_value("type", other)),
            };
            if direction == "backward" {
                result = revert(&result);
            }
            result.trim();
            Ok((result, StateRenaming::new()))
        }
        other => Err(ParamError::unknown_value("algorithm", other)),
    }
}

/// Disconnects `removed` from the automaton, re-routing its incoming
/// transitions to every state of `covering_set` and transplanting its
/// initial/accepting flags there.
fn remove_covered_state(covering_set: &StateSet, removed: State, nfa: &mut Nfa) {
    let outgoing: Vec<(Symbol, StateSet)> = nfa
        .delta
        .state_post(removed)
        .iter()
        .map(|post| (post.symbol, post.targets.clone()))
        .collect();
    for (symbol, targets) in outgoing {
        for &target in &targets {
            nfa.delta
                .remove(removed, symbol, target)
                .expect("transition listed in the post");
        }
    }

    for transition in nfa.delta.get_transitions_to(removed) {
        for &covering in covering_set {
            nfa.delta.add(transition.source, transition.symbol, covering);
        }
        nfa.delta
            .remove(transition.source, transition.symbol, transition.target)
            .expect("transition listed in the incoming set");
    }

    nfa.accepting.remove(removed);
    if nfa.initial.contains(removed) {
        nfa.initial.remove(removed);
        for &covering in covering_set {
            nfa.initial.insert(covering);
        }
    }
}

/// Updates the covering bookkeeping for a freshly discovered macro-state `t`
/// against every macro-state seen so far; macro-states that just became
/// fully covered are removed from the automaton and moved from `subset_map`
/// to `covered`.
fn check_covered_and_covering(
    covering_states: &mut Vec<StateSet>,
    covering_indexes: &mut Vec<StateSet>,
    covered: &mut IndexMap<StateSet, State>,
    subset_map: &mut IndexMap<StateSet, State>,
    t_id: State,
    t: &StateSet,
    result: &mut Nfa,
) {
    covering_states.push(StateSet::new());
    covering_indexes.push(StateSet::new());

    let mut index = 0;
    while index < subset_map.len() {
        let (seen, &seen_id) = subset_map.get_index(index).expect("index is in range");
        if seen.is_subset_of(t) {
            // The seen macro-state contributes to covering t.
            let seen = seen.clone();
            covering_states[t_id] = covering_states[t_id].union(&seen);
            covering_indexes[t_id].insert(seen_id);
        } else if t.is_subset_of(seen) {
            let seen = seen.clone();
            covering_states[seen_id] = covering_states[seen_id].union(t);
            covering_indexes[seen_id].insert(t_id);

            // The seen macro-state may just have become fully covered.
            if seen == covering_states[seen_id] {
                let erased = seen_id;
                // Replace the erased state in every covering-index set it
                // appears in by its own covering set, and vice versa.
                let covered_ids: Vec<State> = covered.values().copied().collect();
                for covered_id in covered_ids {
                    if covering_indexes[covered_id].contains(&erased) {
                        covering_indexes[covered_id].remove(&erased);
                        covering_indexes[covered_id] =
                            covering_indexes[covered_id].union(&covering_indexes[erased]);
                    }
                    if covering_indexes[erased].contains(&covered_id) {
                        covering_indexes[erased].remove(&covered_id);
                        covering_indexes[erased] =
                            covering_indexes[erased].union(&covering_indexes[covered_id]);
                    }
                }

                let covering = covering_indexes[erased].clone();
                remove_covered_state(&covering, erased, result);

                let (key, value) = subset_map
                    .shift_remove_index(index)
                    .expect("index is in range");
                covered.insert(key, value);
                continue;
            }
        }
        index += 1;
    }
}

/// Residual construction fused into the subset construction: covering
/// macro-states are detected and removed while determinizing.
fn residual_with(aut: &Nfa) -> Nfa {
    let mut result = Nfa::new();
    let mut worklist: Vec<(State, StateSet)> = Vec::new();
    let mut subset_map: IndexMap<StateSet, State> = IndexMap::new();
    let mut covered: IndexMap<StateSet, State> = IndexMap::new();
    let mut covering_states: Vec<StateSet> = Vec::new();
    let mut covering_indexes: Vec<StateSet> = Vec::new();

    let start: StateSet = aut.initial.to_ord_vector();
    let start_id = result.add_state();
    result.initial.insert(start_id);
    if aut.accepting.intersects_with(&start) {
        result.accepting.insert(start_id);
    }
    worklist.push((start_id, start.clone()));
    subset_map.insert(start, start_id);
    covering_states.push(StateSet::new());
    covering_indexes.push(StateSet::new());

    if aut.delta.empty() {
        return result;
    }

    let mut sync_iterator = SyncExistentialIterator::new(2);
    while let Some((source_id, source_set)) = worklist.pop() {
        for &member in &source_set {
            sync_iterator.push_back(aut.delta.state_post(member));
        }
        while sync_iterator.advance() {
            let symbol = sync_iterator.current_symbol();
            let targets = sync_iterator.unify_targets();
            // Whether to add a plain transition to the macro-state itself
            // (as opposed to its covering set).
            let mut add_plain = false;

            let target_id = if let Some(&known) = subset_map.get(&targets) {
                add_plain = true;
                known
            } else if let Some(&known) = covered.get(&targets) {
                known
            } else {
                let fresh = result.add_state();
                check_covered_and_covering(
                    &mut covering_states,
                    &mut covering_indexes,
                    &mut covered,
                    &mut subset_map,
                    fresh,
                    &targets,
                    &mut result,
                );
                if targets != covering_states[fresh] {
                    subset_map.insert(targets.clone(), fresh);
                    if aut.accepting.intersects_with(&targets) {
                        result.accepting.insert(fresh);
                    }
                    worklist.push((fresh, targets.clone()));
                    add_plain = true;
                } else {
                    covered.insert(targets.clone(), fresh);
                }
                fresh
            };

            // The source may just have become covered; its transitions are
            // already re-routed, do not grow it further.
            if covered.contains_key(&source_set) {
                continue;
            }

            if add_plain {
                result
                    .delta
                    .mutable_state_post(source_id)
                    .insert(SymbolPost::new(symbol, vec![target_id]));
            } else {
                let covering: Vec<State> = covering_indexes[target_id].iter().copied().collect();
                for switch_target in covering {
                    result.delta.add(source_id, symbol, switch_target);
                }
            }
        }
    }

    result
}

/// Recursive pass of [`residual_after`]: macro-states covering a covered one
/// may themselves be covered by smaller macro-states.
fn residual_recurse_coverable(
    macrostates: &[StateSet],
    covering_indexes: &[usize],
    covered: &mut [bool],
    visited: &mut [bool],
    start_index: usize,
    subset_map: &IndexMap<StateSet, State>,
    nfa: &mut Nfa,
) {
    let check_state = macrostates[covering_indexes[start_index]].clone();
    let mut covering_union = StateSet::new();
    let mut sub_covering_indexes: Vec<usize> = Vec::new();

    for &index in &covering_indexes[start_index + 1..] {
        if covered[index] {
            continue;
        }
        if macrostates[index].is_subset_of(&check_state) {
            covering_union = covering_union.union(&macrostates[index]);
            sub_covering_indexes.push(index);
        }
    }

    if covering_union == check_state {
        if !sub_covering_indexes.is_empty() {
            for position in 0..sub_covering_indexes.len() - 1 {
                let candidate = sub_covering_indexes[position];
                if macrostates[candidate].len() == 1 {
                    break;
                }
                if visited[candidate] {
                    continue;
                }
                visited[candidate] = true;
                residual_recurse_coverable(
                    macrostates,
                    &sub_covering_indexes,
                    covered,
                    visited,
                    position,
                    subset_map,
                    nfa,
                );
            }
        }

        let mut covering_set = StateSet::new();
        for &index in &sub_covering_indexes {
            if !covered[index] {
                let id = subset_map
                    .get(&macrostates[index])
                    .expect("macro-state is registered");
                covering_set.insert(*id);
            }
        }
        let removed = *subset_map.get(&check_state).expect("macro-state is registered");
        remove_covered_state(&covering_set, removed, nfa);
        covered[covering_indexes[start_index]] = true;
    }
}

/// Residual construction as a post-pass: determinize first, then remove
/// every macro-state that equals the union of smaller macro-states.
fn residual_after(aut: &Nfa) -> Nfa {
    let mut subset_map: IndexMap<StateSet, State> = IndexMap::new();
    let mut result = determinize(aut, Some(&mut subset_map));

    // Macro-states ordered from largest to smallest.
    let mut macrostates: Vec<StateSet> = subset_map.keys().cloned().collect();
    macrostates.sort_by_key(|macrostate| std::cmp::Reverse(macrostate.len()));

    let mut covered = vec![false; macrostates.len()];
    let mut visited = vec![false; macrostates.len()];

    for i in 0..macrostates.len().saturating_sub(1) {
        if macrostates[i].len() == 1 {
            break;
        }
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let mut covering_union = StateSet::new();
        let mut covering_indexes: Vec<usize> = Vec::new();
        for j in i + 1..macrostates.len() {
            if covered[j] {
                continue;
            }
            if macrostates[j].is_subset_of(&macrostates[i]) {
                covering_union = covering_union.union(&macrostates[j]);
                covering_indexes.push(j);
            }
        }

        if covering_union == macrostates[i] {
            if !covering_indexes.is_empty() {
                for position in 0..covering_indexes.len() - 1 {
                    let candidate = covering_indexes[position];
                    if macrostates[candidate].len() == 1 {
                        break;
                    }
                    if visited[candidate] {
                        continue;
                    }
                    visited[candidate] = true;
                    residual_recurse_coverable(
                        &macrostates,
                        &covering_indexes,
                        &mut covered,
                        &mut visited,
                        position,
                        &subset_map,
                        &mut result,
                    );
                }
            }

            let mut covering_set = StateSet::new();
            for &index in &covering_indexes {
                if !covered[index] {
                    let id = subset_map
                        .get(&macrostates[index])
                        .expect("macro-state is registered");
                    covering_set.insert(*id);
                }
            }
            let removed = *subset_map
                .get(&macrostates[i])
                .expect("macro-state is registered");
            remove_covered_state(&covering_set, removed, &mut result);
            covered[i] = true;
        }
    }

    result
}
