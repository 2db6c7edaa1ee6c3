use std::collections::HashMap;

use crate::alphabet::OnTheFlyAlphabet;
use crate::errors::{BuildError, FormatError};
use crate::nfa::{Nfa, State};
use crate::symbolic::inter_aut::{AlphabetType, FormulaTerm, IntermediateAut};

/// Constructs an [`Nfa`] from the neutral representation.
///
/// Only explicit-alphabet NFA sections are accepted; mintermize a symbolic
/// section first. Symbols are translated through (and contributed to) the
/// caller's shared alphabet. Returns the automaton and the name-to-state
/// map.
pub fn construct_nfa(
    inter_aut: &IntermediateAut,
    alphabet: &mut OnTheFlyAlphabet,
) -> Result<(Nfa, HashMap<String, State>), BuildError> {
    if !inter_aut.is_nfa() {
        return Err(FormatError::WrongSectionType {
            found: "AFA".to_string(),
        }
        .into());
    }
    if inter_aut.alphabet_type != AlphabetType::Explicit {
        return Err(FormatError::WrongSectionType {
            found: "symbolic alphabet".to_string(),
        }
        .into());
    }

    let mut nfa = Nfa::new();
    let mut state_map: HashMap<String, State> = HashMap::new();

    // Enumerated states first, so their numbering follows the declaration.
    let state_of = |name: &str, nfa: &mut Nfa, map: &mut HashMap<String, State>| -> State {
        if let Some(&known) = map.get(name) {
            return known;
        }
        let fresh = nfa.add_state();
        map.insert(name.to_string(), fresh);
        fresh
    };
    for name in &inter_aut.states_names {
        state_of(name, &mut nfa, &mut state_map);
    }

    for name in inter_aut.get_enumerated_initials() {
        let state = state_of(&name, &mut nfa, &mut state_map);
        nfa.initial.insert(state);
    }
    for name in inter_aut.get_final_names()? {
        let state = state_of(&name, &mut nfa, &mut state_map);
        nfa.accepting.insert(state);
    }

    for transition in &inter_aut.transitions {
        let symbol_part = inter_aut.symbol_part_of_transition(transition)?;
        let symbol_name = match symbol_part {
            FormulaTerm::Symbol(name) => name,
            other => {
                return Err(FormatError::MalformedTransition {
                    from_state: transition.0.clone(),
                    reason: format!("expected a plain symbol, got {other:?}"),
                }
                .into());
            }
        };
        let symbol = alphabet.add_new_symbol(symbol_name.clone());
        let source = state_of(&transition.0, &mut nfa, &mut state_map);
        let target_name = inter_aut.target_of_transition(transition)?.to_string();
        let target = state_of(&target_name, &mut nfa, &mut state_map);
        nfa.delta.add(source, symbol, target);
    }

    Ok((nfa, state_map))
}
