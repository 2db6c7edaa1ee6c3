use nfakit::Alphabet;
use nfakit::OnTheFlyAlphabet;
use nfakit::nfa;
use nfakit::params::params;
use nfakit::symbolic::{
    AlphabetType, FormulaTerm, IntermediateAut, Mintermization, construct_nfa,
};

fn var(name: &str) -> FormulaTerm {
    FormulaTerm::symbol(name)
}

/// `q --(a1 | !a2)--> r` with `q` initial and `r` final.
fn symbolic_single_edge() -> IntermediateAut {
    let mut aut = IntermediateAut::new_nfa(AlphabetType::Bitvector);
    aut.initial_formula = FormulaTerm::state("q");
    aut.final_formula = FormulaTerm::state("r");
    aut.add_transition("q", FormulaTerm::or(var("a1"), FormulaTerm::not(var("a2"))), "r");
    aut
}

#[test]
fn test_mintermized_automaton_builds_and_accepts() {
    let symbolic = symbolic_single_edge();
    let mut mintermization = Mintermization::new();
    let explicit = mintermization.mintermize(&symbolic).unwrap();

    let mut alphabet = OnTheFlyAlphabet::new();
    let (nfa, state_map) = construct_nfa(&explicit, &mut alphabet).unwrap();
    assert!(nfa.initial.contains(state_map["q"]));
    assert!(nfa.accepting.contains(state_map["r"]));

    // One single-letter word per minterm implying the formula.
    let accepted: Vec<u64> = alphabet.get_alphabet_symbols().iter().copied().collect();
    assert!(!accepted.is_empty());
    for &symbol in &accepted {
        assert!(nfa.is_in_lang(&[symbol]));
    }
    assert!(!nfa.is_in_lang(&[]));
}

#[test]
fn test_joint_mintermization_keeps_languages_comparable() {
    // L(first) = words satisfying a; L(second) = words satisfying a & b.
    // After joint mintermization, inclusion must hold symbol for symbol.
    let mut first = IntermediateAut::new_nfa(AlphabetType::Bitvector);
    first.initial_formula = FormulaTerm::state("p");
    first.final_formula = FormulaTerm::state("q");
    first.add_transition("p", var("a"), "q");

    let mut second = IntermediateAut::new_nfa(AlphabetType::Bitvector);
    second.initial_formula = FormulaTerm::state("p");
    second.final_formula = FormulaTerm::state("q");
    second.add_transition("p", FormulaTerm::and(var("a"), var("b")), "q");

    let mut mintermization = Mintermization::new();
    let explicit = mintermization.mintermize_many(&[&first, &second]).unwrap();

    let mut alphabet = OnTheFlyAlphabet::new();
    let (first_nfa, _) = construct_nfa(&explicit[0], &mut alphabet).unwrap();
    let (second_nfa, _) = construct_nfa(&explicit[1], &mut alphabet).unwrap();

    let included = nfa::is_included(
        &second_nfa,
        &first_nfa,
        None,
        None,
        &params(&[("algorithm", "antichains")]),
    )
    .unwrap();
    assert!(included, "a & b implies a, symbol for symbol");

    let reverse = nfa::is_included(
        &first_nfa,
        &second_nfa,
        None,
        None,
        &params(&[("algorithm", "antichains")]),
    )
    .unwrap();
    assert!(!reverse);
}

#[test]
fn test_separate_mintermization_would_not_share_symbols() {
    // The shared run assigns each distinct minterm one symbol; mintermizing
    // two automata together never duplicates symbols between them.
    let first = symbolic_single_edge();
    let mut second = symbolic_single_edge();
    second.transitions.clear();
    second.add_transition("q", var("a1"), "r");

    let mut mintermization = Mintermization::new();
    let explicit = mintermization.mintermize_many(&[&first, &second]).unwrap();
    let all_symbols: std::collections::BTreeSet<String> = explicit
        .iter()
        .flat_map(|aut| {
            aut.transitions.iter().map(|t| {
                match aut.symbol_part_of_transition(t).unwrap() {
                    FormulaTerm::Symbol(name) => name.clone(),
                    other => panic!("unexpected symbol part {other:?}"),
                }
            })
        })
        .collect();
    // a1 | !a2 and a1 generate at most 2^2 minterms over the same variables.
    assert!(all_symbols.len() <= 4);
}

#[test]
fn test_mintermize_rejects_explicit_sections() {
    let explicit = IntermediateAut::new_nfa(AlphabetType::Explicit);
    let mut mintermization = Mintermization::new();
    assert!(mintermization.mintermize(&explicit).is_err());
}
