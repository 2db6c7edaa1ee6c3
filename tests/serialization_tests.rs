use nfakit::nfa::{Nfa, serialize};
use nfakit::nft::Nft;
use nfakit::symbolic::{AlphabetType, FormulaTerm, IntermediateAut, construct_nfa};
use nfakit::utils::OrdVector;
use nfakit::{Alphabet, OnTheFlyAlphabet};

/// `a(b|c)` with two accepting paths.
fn sample_nfa() -> Nfa {
    let mut nfa = Nfa::new();
    nfa.initial.insert(0);
    nfa.accepting.insert(2);
    nfa.accepting.insert(3);
    nfa.delta.add(0, 0, 1);
    nfa.delta.add(1, 1, 2);
    nfa.delta.add(1, 2, 3);
    nfa
}

#[test]
fn test_mata_lists_transitions_in_order() {
    let text = serialize::write_mata(&sample_nfa());
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "@NFA-explicit");
    assert_eq!(lines[1], "%Alphabet-auto");
    assert_eq!(lines[2], "%Initial q0");
    assert_eq!(lines[3], "%Final q2 q3");
    assert_eq!(&lines[4..], &["q0 0 q1", "q1 1 q2", "q1 2 q3"]);
}

#[test]
fn test_serialized_automaton_reconstructs_equivalent() {
    // Round-trip through the neutral representation: rebuild the automaton
    // from the same states and transitions the writer emits.
    let original = sample_nfa();
    let mut inter = IntermediateAut::new_nfa(AlphabetType::Explicit);
    inter.initial_formula = FormulaTerm::state("q0");
    inter.final_formula = FormulaTerm::or(FormulaTerm::state("q2"), FormulaTerm::state("q3"));
    for transition in original.delta.transitions() {
        inter.add_transition(
            format!("q{}", transition.source),
            FormulaTerm::symbol(transition.symbol.to_string()),
            format!("q{}", transition.target),
        );
    }

    let mut alphabet = OnTheFlyAlphabet::new();
    let (rebuilt, _) = construct_nfa(&inter, &mut alphabet).unwrap();

    // The alphabet assigned fresh values in first-use order; translate the
    // original words through it.
    let a = alphabet.translate_symbol("0").unwrap();
    let b = alphabet.translate_symbol("1").unwrap();
    let c = alphabet.translate_symbol("2").unwrap();
    assert!(rebuilt.is_in_lang(&[a, b]));
    assert!(rebuilt.is_in_lang(&[a, c]));
    assert!(!rebuilt.is_in_lang(&[a]));
    assert_eq!(rebuilt.delta.num_of_transitions(), original.delta.num_of_transitions());
}

#[test]
fn test_dot_output_for_branching_automaton() {
    let text = serialize::write_dot(&sample_nfa());
    assert!(text.contains("2 [shape=doublecircle];"));
    assert!(text.contains("3 [shape=doublecircle];"));
    assert!(text.contains("1 -> {2 } [label=1];"));
    assert!(text.contains("1 -> {3 } [label=2];"));
}

#[test]
fn test_nft_wrapping_of_an_nfa_result() {
    // Wrap a two-letter automaton as a two-tape transducer and serialize.
    let nft = Nft::create_from_nfa(&sample_nfa(), 2, &OrdVector::new());
    assert_eq!(nft.num_of_levels, 2);
    assert_eq!(nft.levels.len(), nft.nfa.num_of_states());
    // Every original transition doubled through an intermediate state.
    assert_eq!(nft.nfa.delta.num_of_transitions(), 6);

    let text = nft.write_mata();
    assert!(text.starts_with("@NFT-explicit\n"));
    assert!(text.contains("%LevelsCnt 2\n"));
    // Levels line mentions every state with its level.
    let levels_line = text
        .lines()
        .find(|line| line.starts_with("%Levels "))
        .expect("levels directive present");
    assert_eq!(levels_line.split_whitespace().count() - 1, nft.levels.len());
}

#[test]
fn test_alphabet_contract_over_serialized_symbols() {
    let nfa = sample_nfa();
    let mut alphabet = OnTheFlyAlphabet::new();
    nfa.fill_alphabet(&mut alphabet);
    assert_eq!(alphabet.get_alphabet_symbols().as_slice(), &[0, 1, 2]);
    // Symbol names are their decimal values and keep their values.
    assert_eq!(alphabet.translate_symbol("1").unwrap(), 1);
    assert_eq!(
        alphabet.translate_word(&["0", "2"]).unwrap(),
        vec![0, 2]
    );
    assert!(alphabet.translate_symbol("7").is_err());
}
