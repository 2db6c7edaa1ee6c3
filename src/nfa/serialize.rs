use std::fmt::Write;

use crate::nfa::Nfa;

/// Renders the automaton in Graphviz DOT format.
#[must_use]
pub fn write_dot(nfa: &Nfa) -> String {
    let mut out = String::new();
    out.push_str("digraph finiteAutomaton {\n");
    out.push_str("node [shape=circle];\n");

    for &accepting in &nfa.accepting {
        let _ = writeln!(out, "{accepting} [shape=doublecircle];");
    }

    for source in 0..nfa.delta.num_of_states() {
        for symbol_post in nfa.delta.state_post(source) {
            let _ = write!(out, "{source} -> {{");
            for &target in &symbol_post.targets {
                let _ = write!(out, "{target} ");
            }
            let _ = writeln!(out, "}} [label={}];", symbol_post.symbol);
        }
    }

    out.push_str("node [shape=none, label=\"\"];\n");
    for &initial in &nfa.initial {
        let _ = writeln!(out, "i{initial} -> {initial};");
    }

    out.push_str("}\n");
    out
}

/// Renders the automaton as an `@NFA-explicit` section of the `.mata` text
/// format: `%Initial`/`%Final` directives followed by one `q<src> <symbol>
/// q<tgt>` line per transition.
#[must_use]
pub fn write_mata(nfa: &Nfa) -> String {
    let mut out = String::new();
    out.push_str("@NFA-explicit\n");
    out.push_str("%Alphabet-auto\n");

    if !nfa.initial.is_empty() {
        out.push_str("%Initial");
        for &initial in &nfa.initial {
            let _ = write!(out, " q{initial}");
        }
        out.push('\n');
    }

    if !nfa.accepting.is_empty() {
        out.push_str("%Final");
        for &accepting in &nfa.accepting {
            let _ = write!(out, " q{accepting}");
        }
        out.push('\n');
    }

    for transition in nfa.delta.transitions() {
        let _ = writeln!(
            out,
            "q{} {} q{}",
            transition.source, transition.symbol, transition.target
        );
    }
    out
}
