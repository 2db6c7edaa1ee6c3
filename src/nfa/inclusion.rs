use std::collections::HashMap;

use tracing::debug;

use crate::alphabet::Alphabet;
use crate::errors::ParamError;
use crate::nfa::delta::{Run, StateSet, Symbol};
use crate::nfa::sync_iter::SyncExistentialIterator;
use crate::nfa::{Nfa, State, create_alphabet, ops, product};
use crate::params::{ParameterMap, check_keys, require};
use crate::utils::OrdVector;

/// A product state of the inclusion check: a state of the smaller automaton,
/// the set of bigger-automaton states tracking it, and the shortest distance
/// from the tracked set to a bigger-automaton accepting state.
type ProdState = (State, StateSet, usize);

fn used_or_given_alphabet(lhs: &Nfa, rhs: &Nfa, alphabet: Option<&OrdVector<Symbol>>) -> OrdVector<Symbol> {
    match alphabet {
        Some(symbols) => symbols.clone(),
        None => create_alphabet(&[lhs, rhs]).get_alphabet_symbols(),
    }
}

/// Naive inclusion: complement the bigger automaton, intersect with the
/// smaller one and test emptiness.
pub fn is_included_naive(
    smaller: &Nfa,
    bigger: &Nfa,
    cex: Option<&mut Run>,
    alphabet: Option<&OrdVector<Symbol>>,
) -> Result<bool, ParamError> {
    let symbols = used_or_given_alphabet(smaller, bigger, alphabet);
    let bigger_cmpl = ops::complement(
        bigger,
        &symbols,
        &crate::params::params(&[("algorithm", "classical")]),
    )?;
    let isect = product::intersection(smaller, &bigger_cmpl, None);
    Ok(isect.is_lang_empty(cex))
}

/// Antichain-based inclusion check.
///
/// Explores product states `(p, S, k)` pruned by subsumption: a state is
/// discarded as soon as one with the same `p` and a subset `S` is known.
/// The distance component `k` comes from a reversed BFS and cuts branches
/// whose smaller-side suffix is shorter than anything the bigger side can
/// still accept.
pub fn is_included_antichains(
    smaller: &Nfa,
    bigger: &Nfa,
    mut cex: Option<&mut Run>,
) -> Result<bool, ParamError> {
    let subsumes = |lhs: &ProdState, rhs: &ProdState| {
        lhs.0 == rhs.0 && lhs.1.is_subset_of(&rhs.1)
    };

    // Pairs (q, S) to be processed, and the per-state antichain of pairs
    // already processed.
    let mut worklist: Vec<ProdState> = Vec::new();
    let mut processed: Vec<Vec<ProdState>> = vec![Vec::new(); smaller.num_of_states()];

    // Distances to an accepting state, via BFS on the reversed automata.
    let distances_smaller = ops::revert(smaller).distances_from_initial();
    let distances_bigger = ops::revert(bigger).distances_from_initial();

    let min_dst = |set: &StateSet| {
        set.iter()
            .map(|&state| distances_bigger[state])
            .min()
            .unwrap_or(usize::MAX)
    };
    let lengths_incompatible =
        |pair: &ProdState| distances_smaller[pair.0] < pair.2;

    // paths[s] == (t, a): product state s was reached from t over a;
    // s == t marks an initial product state.
    let mut paths: HashMap<ProdState, (ProdState, Symbol)> = HashMap::new();

    for &state in &smaller.initial {
        if smaller.accepting.contains(state)
            && !bigger.initial.iter().any(|&q| bigger.accepting.contains(q))
        {
            // The empty word separates the languages.
            if let Some(cex) = cex.as_deref_mut() {
                cex.word.clear();
                cex.path.clear();
            }
            return Ok(false);
        }
        let bigger_set: StateSet = bigger.initial.to_ord_vector();
        let product_state = (state, bigger_set.clone(), min_dst(&bigger_set));
        if cex.is_some() {
            paths.insert(product_state.clone(), (product_state.clone(), 0));
        }
        worklist.push(product_state.clone());
        processed[state].push(product_state);
    }

    // Synchronized iteration over the posts of the tracked bigger set.
    let mut sync_iterator = SyncExistentialIterator::new(2);

    while let Some(prod_state) = worklist.pop() {
        let (smaller_state, bigger_set, _) = &prod_state;

        sync_iterator.reset();
        for &tracked in bigger_set {
            sync_iterator.push_back(bigger.delta.state_post(tracked));
        }

        for smaller_move in smaller.delta.state_post(*smaller_state) {
            let smaller_symbol = smaller_move.symbol;
            let bigger_succ = if sync_iterator.synchronize_with(smaller_symbol) {
                sync_iterator.unify_targets()
            } else {
                StateSet::new()
            };

            for &smaller_succ in &smaller_move.targets {
                let succ = (smaller_succ, bigger_succ.clone(), min_dst(&bigger_succ));

                if lengths_incompatible(&succ)
                    || (smaller.accepting.contains(smaller_succ)
                        && !bigger.accepting.intersects_with(&bigger_succ))
                {
                    if let Some(cex) = cex.as_deref_mut() {
                        cex.word.clear();
                        cex.word.push(smaller_symbol);
                        let mut trav = prod_state.clone();
                        while paths[&trav].0 != trav {
                            cex.word.push(paths[&trav].1);
                            trav = paths[&trav].0.clone();
                        }
                        cex.word.reverse();
                        cex.path.clear();
                    }
                    debug!(symbol = smaller_symbol, "inclusion counterexample found");
                    return Ok(false);
                }

                let is_subsumed = processed[smaller_succ]
                    .iter()
                    .any(|anti_state| subsumes(anti_state, &succ));
                if is_subsumed {
                    continue;
                }

                // The fresh pair prunes every subsumed pair it dominates,
                // both among the processed pairs and on the worklist.
                processed[smaller_succ].retain(|existing| !subsumes(&succ, existing));
                worklist.retain(|existing| !subsumes(&succ, existing));
                processed[smaller_succ].push(succ.clone());
                worklist.push(succ.clone());

                if cex.is_some() {
                    paths.insert(succ, (prod_state.clone(), smaller_symbol));
                }
            }
        }
    }
    Ok(true)
}

/// Decides `L(smaller) ⊆ L(bigger)`.
///
/// Recognized parameters: `algorithm: naive | antichains`. The optional
/// `alphabet` is only needed by the naive algorithm; the used symbols of
/// both automata are taken when it is absent. The counterexample sink is
/// populated iff the result is false.
pub fn is_included(
    smaller: &Nfa,
    bigger: &Nfa,
    cex: Option<&mut Run>,
    alphabet: Option<&OrdVector<Symbol>>,
    params: &ParameterMap,
) -> Result<bool, ParamError> {
    check_keys(params, &["algorithm"])?;
    match require(params, "algorithm")? {
        "naive" => is_included_naive(smaller, bigger, cex, alphabet),
        "antichains" => is_included_antichains(smaller, bigger, cex),
        other => Err(ParamError::unknown_value("algorithm", other)),
    }
}

/// Decides language equivalence by two inclusion checks.
pub fn are_equivalent(
    lhs: &Nfa,
    rhs: &Nfa,
    alphabet: Option<&OrdVector<Symbol>>,
    params: &ParameterMap,
) -> Result<bool, ParamError> {
    check_keys(params, &["algorithm"])?;
    let derived;
    let alphabet = match (alphabet, require(params, "algorithm")?) {
        (None, "naive") => {
            // The naive check complements, which needs a shared alphabet.
            derived = used_or_given_alphabet(lhs, rhs, None);
            Some(&derived)
        }
        (given, _) => given,
    };
    Ok(is_included(lhs, rhs, None, alphabet, params)?
        && is_included(rhs, lhs, None, alphabet, params)?)
}

/// Antichain-based universality: the special case of inclusion with the
/// whole of `Σ*` on the left, leaving an antichain over macro-states only.
pub fn is_universal_antichains(
    aut: &Nfa,
    symbols: &OrdVector<Symbol>,
    mut cex: Option<&mut Run>,
) -> Result<bool, ParamError> {
    let start: StateSet = aut.initial.to_ord_vector();
    if !aut.accepting.intersects_with(&start) {
        if let Some(cex) = cex.as_deref_mut() {
            cex.word.clear();
            cex.path.clear();
        }
        return Ok(false);
    }

    let mut worklist: Vec<StateSet> = vec![start.clone()];
    let mut processed: Vec<StateSet> = vec![start.clone()];
    let mut paths: HashMap<StateSet, (StateSet, Symbol)> = HashMap::new();
    if cex.is_some() {
        paths.insert(start.clone(), (start, 0));
    }

    while let Some(macro_state) = worklist.pop() {
        for &symbol in symbols {
            let successor = aut.post(&macro_state, symbol);
            if !aut.accepting.intersects_with(&successor) {
                if let Some(cex) = cex.as_deref_mut() {
                    cex.word.clear();
                    cex.word.push(symbol);
                    let mut trav = macro_state.clone();
                    while paths[&trav].0 != trav {
                        cex.word.push(paths[&trav].1);
                        trav = paths[&trav].0.clone();
                    }
                    cex.word.reverse();
                    cex.path.clear();
                }
                return Ok(false);
            }

            // A processed subset already covers every failure of this one.
            if processed.iter().any(|known| known.is_subset_of(&successor)) {
                continue;
            }
            processed.retain(|known| !successor.is_subset_of(known));
            worklist.retain(|known| !successor.is_subset_of(known));
            if cex.is_some() {
                paths.insert(successor.clone(), (macro_state.clone(), symbol));
            }
            processed.push(successor.clone());
            worklist.push(successor);
        }
    }
    Ok(true)
}

/// Naive universality: emptiness of the classical complement.
pub fn is_universal_naive(
    aut: &Nfa,
    symbols: &OrdVector<Symbol>,
    cex: Option<&mut Run>,
) -> Result<bool, ParamError> {
    let complemented = ops::complement(
        aut,
        symbols,
        &crate::params::params(&[("algorithm", "classical")]),
    )?;
    Ok(complemented.is_lang_empty(cex))
}

/// Decides `L(aut) = Σ*` over the given alphabet.
///
/// Recognized parameters: `algorithm: naive | antichains`. The
/// counterexample sink is populated iff the result is false.
pub fn is_universal(
    aut: &Nfa,
    symbols: &OrdVector<Symbol>,
    cex: Option<&mut Run>,
    params: &ParameterMap,
) -> Result<bool, ParamError> {
    check_keys(params, &["algorithm"])?;
    match require(params, "algorithm")? {
        "naive" => is_universal_naive(aut, symbols, cex),
        "antichains" => is_universal_antichains(aut, symbols, cex),
        other => Err(ParamError::unknown_value("algorithm", other)),
    }
}
