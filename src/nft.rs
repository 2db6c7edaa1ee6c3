use std::collections::HashMap;
use std::fmt::Write;

use crate::nfa::{Nfa, State, Symbol};
use crate::utils::OrdVector;

/// Level of an NFT state: the tape the next symbol is read from.
pub type Level = usize;

/// A minimal nondeterministic finite transducer wrapping an [`Nfa`]: the
/// underlying automaton plus a level per state. Just enough structure to
/// wrap NFA results as `k`-tape transducers and serialize them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nft {
    pub nfa: Nfa,
    /// Level of each state, indexed by state.
    pub levels: Vec<Level>,
    pub num_of_levels: usize,
}

impl Nft {
    /// Wraps an automaton as a one-level transducer.
    #[must_use]
    pub fn from_nfa(nfa: Nfa) -> Self {
        let levels = vec![0; nfa.num_of_states()];
        Self {
            nfa,
            levels,
            num_of_levels: 1,
        }
    }

    /// Builds a `num_of_levels`-tape transducer from an automaton by
    /// expanding every non-epsilon transition into a chain of
    /// `num_of_levels - 1` fresh intermediate states repeating its symbol,
    /// one per level. Epsilon transitions stay single-step at level 0.
    #[must_use]
    pub fn create_from_nfa(nfa: &Nfa, num_of_levels: usize, epsilons: &OrdVector<Symbol>) -> Self {
        assert!(num_of_levels > 0, "a transducer has at least one level");
        let intermediate_per_transition = num_of_levels - 1;
        let mut nft = Nft {
            nfa: Nfa::new(),
            levels: Vec::new(),
            num_of_levels,
        };
        let mut state_mapping: HashMap<State, State> = HashMap::new();
        let mut next_state: State = 0;
        let mut state_for = |nfa_state: State, next_state: &mut State| -> State {
            *state_mapping.entry(nfa_state).or_insert_with(|| {
                let fresh = *next_state;
                *next_state += 1;
                fresh
            })
        };

        let set_level = |levels: &mut Vec<Level>, state: State, level: Level| {
            if state >= levels.len() {
                levels.resize(state + 1, 0);
            }
            levels[state] = level;
        };

        for source in 0..nfa.num_of_states() {
            let mapped_source = state_for(source, &mut next_state);
            for symbol_post in nfa.delta.state_post(source) {
                let mut current = mapped_source;
                let mut level: Level = 0;
                if !epsilons.contains(&symbol_post.symbol) {
                    while level < intermediate_per_transition {
                        set_level(&mut nft.levels, current, level);
                        nft.nfa.delta.add(current, symbol_post.symbol, next_state);
                        current = next_state;
                        next_state += 1;
                        level += 1;
                    }
                }
                for &target in &symbol_post.targets {
                    let mapped_target = state_for(target, &mut next_state);
                    set_level(&mut nft.levels, current, level);
                    nft.nfa.delta.add(current, symbol_post.symbol, mapped_target);
                }
            }
        }

        for &initial in &nfa.initial {
            let mapped = state_for(initial, &mut next_state);
            nft.nfa.initial.insert(mapped);
        }
        for &accepting in &nfa.accepting {
            let mapped = state_for(accepting, &mut next_state);
            nft.nfa.accepting.insert(mapped);
        }
        nft.levels.resize(nft.nfa.num_of_states(), 0);
        nft
    }

    /// Renders the transducer as an `@NFT-explicit` section, with the
    /// `%LevelsCnt` and `%Levels` directives on top of the NFA body.
    #[must_use]
    pub fn write_mata(&self) -> String {
        let mut out = String::new();
        out.push_str("@NFT-explicit\n");
        out.push_str("%Alphabet-auto\n");

        if !self.nfa.initial.is_empty() {
            out.push_str("%Initial");
            for &initial in &self.nfa.initial {
                let _ = write!(out, " q{initial}");
            }
            out.push('\n');
        }
        if !self.nfa.accepting.is_empty() {
            out.push_str("%Final");
            for &accepting in &self.nfa.accepting {
                let _ = write!(out, " q{accepting}");
            }
            out.push('\n');
        }

        let _ = writeln!(out, "%LevelsCnt {}", self.num_of_levels);
        if !self.levels.is_empty() {
            out.push_str("%Levels");
            for (state, level) in self.levels.iter().enumerate() {
                let _ = write!(out, " q{state}:{level}");
            }
            out.push('\n');
        }

        for transition in self.nfa.delta.transitions() {
            let _ = writeln!(
                out,
                "q{} {} q{}",
                transition.source, transition.symbol, transition.target
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_level_expansion() {
        let mut nfa = Nfa::new();
        nfa.initial.insert(0);
        nfa.accepting.insert(1);
        nfa.delta.add(0, 7, 1);

        let nft = Nft::create_from_nfa(&nfa, 2, &OrdVector::new());
        // One intermediate state on the single transition.
        assert_eq!(nft.nfa.num_of_states(), 3);
        assert_eq!(nft.nfa.delta.num_of_transitions(), 2);
        assert_eq!(nft.num_of_levels, 2);
        // The word is read twice, once per level.
        assert!(nft.nfa.is_in_lang(&[7, 7]));
        // Levels alternate along the chain.
        let source = *nft.nfa.initial.iter().next().unwrap();
        assert_eq!(nft.levels[source], 0);
    }

    #[test]
    fn test_epsilons_stay_single_step() {
        use crate::nfa::EPSILON;
        let mut nfa = Nfa::new();
        nfa.initial.insert(0);
        nfa.accepting.insert(1);
        nfa.delta.add(0, EPSILON, 1);

        let epsilons: OrdVector<Symbol> = vec![EPSILON].into();
        let nft = Nft::create_from_nfa(&nfa, 3, &epsilons);
        assert_eq!(nft.nfa.num_of_states(), 2, "no intermediate states for epsilon");
        assert_eq!(nft.nfa.delta.num_of_transitions(), 1);
    }

    #[test]
    fn test_mata_output_carries_levels() {
        let mut nfa = Nfa::new();
        nfa.initial.insert(0);
        nfa.accepting.insert(1);
        nfa.delta.add(0, 1, 1);
        let nft = Nft::create_from_nfa(&nfa, 2, &OrdVector::new());
        let text = nft.write_mata();
        assert!(text.starts_with("@NFT-explicit\n"));
        assert!(text.contains("%LevelsCnt 2"));
        assert!(text.contains("%Levels q0:0"));
    }
}
