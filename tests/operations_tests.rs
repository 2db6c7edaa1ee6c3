use nfakit::nfa::{self, Nfa};
use nfakit::params::params;
use nfakit::utils::OrdVector;
use nfakit::{EPSILON, Symbol};

const A: Symbol = 0;
const B: Symbol = 1;

fn sigma() -> OrdVector<Symbol> {
    vec![A, B].into()
}

/// `a*` as a single looping state.
fn a_star() -> Nfa {
    let mut nfa = Nfa::new();
    nfa.initial.insert(0);
    nfa.accepting.insert(0);
    nfa.delta.add(0, A, 0);
    nfa
}

/// `b*` as a single looping state.
fn b_star() -> Nfa {
    let mut nfa = Nfa::new();
    nfa.initial.insert(0);
    nfa.accepting.insert(0);
    nfa.delta.add(0, B, 0);
    nfa
}

/// `(a|b)*abb`, nondeterministically.
fn abb_suffix() -> Nfa {
    let mut nfa = Nfa::new();
    nfa.initial.insert(0);
    nfa.accepting.insert(3);
    nfa.delta.add(0, A, 0);
    nfa.delta.add(0, B, 0);
    nfa.delta.add(0, A, 1);
    nfa.delta.add(1, B, 2);
    nfa.delta.add(2, B, 3);
    nfa
}

#[test]
fn test_revert_twice_preserves_language() {
    let nfa = abb_suffix();
    let double = nfa::revert(&nfa::revert(&nfa));
    assert!(
        nfa::are_equivalent(&nfa, &double, None, &params(&[("algorithm", "antichains")])).unwrap()
    );
}

#[test]
fn test_revert_reverses_words() {
    let nfa = abb_suffix();
    let reverted = nfa::revert(&nfa);
    assert!(nfa.is_in_lang(&[A, B, B]));
    assert!(reverted.is_in_lang(&[B, B, A]));
    assert!(!reverted.is_in_lang(&[A, B, B]));
}

#[test]
fn test_fragile_revert_agrees_with_simple() {
    let mut nfa = abb_suffix();
    nfa.delta.add(2, EPSILON, 0);
    let simple = nfa::revert(&nfa);
    let fragile = nfa::fragile_revert(&nfa);
    assert!(
        nfa::are_equivalent(&simple, &fragile, None, &params(&[("algorithm", "antichains")]))
            .unwrap()
    );
}

#[test]
fn test_remove_epsilon_closure() {
    // 0 -ε-> 1 -ε-> 2, 2 -a-> 2 and 2 accepting: the language is a*.
    let mut nfa = Nfa::new();
    nfa.initial.insert(0);
    nfa.accepting.insert(2);
    nfa.delta.add(0, EPSILON, 1);
    nfa.delta.add(1, EPSILON, 2);
    nfa.delta.add(2, A, 2);

    let cleaned = nfa::remove_epsilon(&nfa, EPSILON);
    assert!(cleaned.delta.epsilon_symbol_posts(0, EPSILON).is_none());
    assert!(cleaned.accepting.contains(0), "closure reaches an accepting state");
    assert!(cleaned.is_in_lang(&[]));
    assert!(cleaned.is_in_lang(&[A, A]));
    assert!(!cleaned.is_in_lang(&[B]));
}

#[test]
fn test_remove_epsilon_terminates_on_epsilon_cycles() {
    let mut nfa = Nfa::new();
    nfa.initial.insert(0);
    nfa.accepting.insert(1);
    nfa.delta.add(0, EPSILON, 1);
    nfa.delta.add(1, EPSILON, 0);
    nfa.delta.add(1, A, 1);

    let cleaned = nfa::remove_epsilon(&nfa, EPSILON);
    assert!(cleaned.is_in_lang(&[]));
    assert!(cleaned.is_in_lang(&[A]));
    assert!(cleaned.delta.epsilon_symbol_posts(0, EPSILON).is_none());
    assert!(cleaned.delta.epsilon_symbol_posts(1, EPSILON).is_none());
}

#[test]
fn test_determinize_abb_has_four_reachable_states() {
    let nfa = abb_suffix();
    let dfa = nfa::determinize(&nfa, None);
    assert!(dfa.is_deterministic());
    assert_eq!(dfa.num_of_states(), 4);
    assert!(dfa.is_in_lang(&[A, B, B]));
    assert!(dfa.is_in_lang(&[B, A, A, B, B]));
    assert!(!dfa.is_in_lang(&[A, B]));
    assert!(
        nfa::are_equivalent(&nfa, &dfa, None, &params(&[("algorithm", "antichains")])).unwrap()
    );
}

#[test]
fn test_determinize_is_idempotent_up_to_size() {
    let dfa = nfa::determinize(&abb_suffix(), None);
    let again = nfa::determinize(&dfa, None);
    assert_eq!(dfa.num_of_states(), again.num_of_states());
    assert!(
        nfa::are_equivalent(&dfa, &again, None, &params(&[("algorithm", "antichains")])).unwrap()
    );
}

#[test]
fn test_brzozowski_minimization_yields_four_states() {
    let minimal = nfa::minimize(&abb_suffix(), &params(&[("algorithm", "brzozowski")])).unwrap();
    assert_eq!(minimal.num_of_states(), 4);
    assert!(minimal.is_deterministic());
    assert!(minimal.is_in_lang(&[A, B, B]));
    // No useless states survive the double reversal.
    assert_eq!(minimal.get_useful_states(), vec![true; 4]);
}

#[test]
fn test_minimize_rejects_unknown_algorithm() {
    assert!(nfa::minimize(&a_star(), &params(&[("algorithm", "hopcroft")])).is_err());
    assert!(nfa::minimize(&a_star(), &params(&[])).is_err());
}

#[test]
fn test_concatenation_of_stars() {
    let concat = nfa::concatenate(&a_star(), &b_star());
    let accepted: [&[Symbol]; 5] = [&[], &[A], &[B], &[A, B], &[A, A, B, B]];
    for word in accepted {
        assert!(concat.is_in_lang(word), "a*b* accepts {word:?}");
    }
    assert!(!concat.is_in_lang(&[B, A]));

    // Direct encoding of a*b* for the equivalence check.
    let mut direct = Nfa::new();
    direct.initial.insert(0);
    direct.accepting.insert(0);
    direct.accepting.insert(1);
    direct.delta.add(0, A, 0);
    direct.delta.add(0, B, 1);
    direct.delta.add(1, B, 1);
    assert!(
        nfa::are_equivalent(&concat, &direct, None, &params(&[("algorithm", "antichains")]))
            .unwrap()
    );
}

#[test]
fn test_concatenation_over_epsilon() {
    let (concat, _, rhs_map) = nfa::ops::concatenate_with_maps(&a_star(), &b_star(), true);
    assert!(concat.delta.epsilon_symbol_posts(0, EPSILON).is_some());
    assert_eq!(rhs_map[&0], 1);
    let cleaned = nfa::remove_epsilon(&concat, EPSILON);
    assert!(cleaned.is_in_lang(&[A, B]));
    assert!(cleaned.is_in_lang(&[]));
    assert!(!cleaned.is_in_lang(&[B, A]));
}

#[test]
fn test_universal_automaton_and_its_complement() {
    // Scenario: a single state accepting Σ*.
    let mut universal = Nfa::new();
    universal.initial.insert(0);
    universal.accepting.insert(0);
    universal.delta.add(0, A, 0);
    universal.delta.add(0, B, 0);

    for algorithm in ["naive", "antichains"] {
        assert!(
            nfa::is_universal(&universal, &sigma(), None, &params(&[("algorithm", algorithm)]))
                .unwrap(),
            "{algorithm} decides universality"
        );
    }

    let complement =
        nfa::complement(&universal, &sigma(), &params(&[("algorithm", "classical")])).unwrap();
    assert!(complement.is_lang_empty(None));
}

#[test]
fn test_complement_twice_restores_language() {
    let nfa = abb_suffix();
    let classical = params(&[("algorithm", "classical")]);
    let complement = nfa::complement(&nfa, &sigma(), &classical).unwrap();
    assert!(!complement.is_in_lang(&[A, B, B]));
    assert!(complement.is_in_lang(&[A, B]));
    assert!(complement.is_in_lang(&[]));

    let double = nfa::complement(&complement, &sigma(), &classical).unwrap();
    assert!(
        nfa::are_equivalent(&nfa, &double, Some(&sigma()), &params(&[("algorithm", "naive")]))
            .unwrap()
    );
}

#[test]
fn test_complement_of_empty_automaton_is_sigma_star() {
    let complement =
        nfa::complement(&Nfa::new(), &sigma(), &params(&[("algorithm", "classical")])).unwrap();
    assert!(complement.is_in_lang(&[]));
    assert!(complement.is_in_lang(&[A, B, A]));
    let universal = nfa::is_universal(
        &complement,
        &sigma(),
        None,
        &params(&[("algorithm", "antichains")]),
    )
    .unwrap();
    assert!(universal);
}

#[test]
fn test_complement_with_minimization_option() {
    let nfa = abb_suffix();
    let minimized = nfa::complement(
        &nfa,
        &sigma(),
        &params(&[("algorithm", "classical"), ("minimize", "true")]),
    )
    .unwrap();
    let plain = nfa::complement(&nfa, &sigma(), &params(&[("algorithm", "classical")])).unwrap();
    assert!(
        nfa::are_equivalent(&minimized, &plain, None, &params(&[("algorithm", "antichains")]))
            .unwrap()
    );
    assert!(minimized.num_of_states() <= plain.num_of_states());
}

#[test]
fn test_complement_rejects_unknown_parameters() {
    let result = nfa::complement(
        &a_star(),
        &sigma(),
        &params(&[("algorithm", "classical"), ("mnimize", "true")]),
    );
    assert!(result.is_err(), "misspelled keys are rejected");
    assert!(
        nfa::complement(&a_star(), &sigma(), &params(&[("algorithm", "classical"), ("minimize", "maybe")]))
            .is_err()
    );
}

#[test]
fn test_sigma_star_and_empty_string_constructors() {
    let sigma_star = nfa::sigma_star_nfa(&sigma());
    assert!(sigma_star.is_in_lang(&[]));
    assert!(sigma_star.is_in_lang(&[A, B, B, A]));

    let empty_string = nfa::empty_string_nfa();
    assert!(empty_string.is_in_lang(&[]));
    assert!(!empty_string.is_in_lang(&[A]));
}

#[test]
fn test_intersection_language() {
    // (ab)* ∩ a*b* = {ε, ab}.
    let mut ab_star = Nfa::new();
    ab_star.initial.insert(0);
    ab_star.accepting.insert(0);
    ab_star.delta.add(0, A, 1);
    ab_star.delta.add(1, B, 0);

    let concat = nfa::concatenate(&a_star(), &b_star());
    let isect = nfa::intersection(&ab_star, &concat, None);
    assert!(isect.is_in_lang(&[]));
    assert!(isect.is_in_lang(&[A, B]));
    assert!(!isect.is_in_lang(&[A, B, A, B]));
    assert!(!isect.is_in_lang(&[A]));
}

#[test]
fn test_intersection_preserves_epsilon() {
    // Both operands use an ε-move before accepting `a`.
    let mut lhs = Nfa::new();
    lhs.initial.insert(0);
    lhs.accepting.insert(2);
    lhs.delta.add(0, EPSILON, 1);
    lhs.delta.add(1, A, 2);

    let mut rhs = Nfa::new();
    rhs.initial.insert(0);
    rhs.accepting.insert(1);
    rhs.delta.add(0, A, 1);
    rhs.delta.add(1, EPSILON, 1);

    let mut prod_map = std::collections::HashMap::new();
    let isect = nfa::intersection(&lhs, &rhs, Some(&mut prod_map));
    // The ε-edge of lhs is preserved with the rhs component fixed.
    let initial = prod_map[&(0, 0)];
    assert!(isect.delta.epsilon_symbol_posts(initial, EPSILON).is_some());
    let cleaned = nfa::remove_epsilon(&isect, EPSILON);
    assert!(cleaned.is_in_lang(&[A]));
    assert!(!cleaned.is_in_lang(&[]));
}

#[test]
fn test_product_respects_custom_final_condition() {
    // Accept when either side accepts: a union-like product of a* and b*
    // restricted to the shared structure.
    let lhs = a_star();
    let rhs = b_star();
    let product = nfa::product(
        &lhs,
        &rhs,
        |p, q| lhs.accepting.contains(p) || rhs.accepting.contains(q),
        EPSILON,
        None,
    );
    // Both sides loop on different symbols, so the synchronous part of the
    // product has no transitions; only the empty word survives.
    assert!(product.is_in_lang(&[]));
    assert!(!product.is_in_lang(&[A]));
}

#[test]
fn test_make_complete_adds_sink_loops_only_when_needed() {
    let mut already_complete = Nfa::new();
    already_complete.initial.insert(0);
    already_complete.delta.add(0, A, 0);
    already_complete.delta.add(0, B, 0);
    let sink = already_complete.num_of_states();
    assert!(!already_complete.make_complete(&sigma(), sink));
    assert_eq!(already_complete.num_of_states(), 1, "no sink was materialized");
}
