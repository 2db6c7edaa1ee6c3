use std::collections::BTreeSet;

use crate::errors::FormatError;

/// A transition or state-set formula: a tree over `¬`, `∧`, `∨`, the
/// constants, and leaves naming symbols, states or nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormulaTerm {
    True,
    False,
    Symbol(String),
    State(String),
    Node(String),
    Not(Box<FormulaTerm>),
    And(Box<FormulaTerm>, Box<FormulaTerm>),
    Or(Box<FormulaTerm>, Box<FormulaTerm>),
}

impl FormulaTerm {
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    pub fn state(name: impl Into<String>) -> Self {
        Self::State(name.into())
    }

    #[must_use]
    pub fn not(term: FormulaTerm) -> Self {
        Self::Not(Box::new(term))
    }

    #[must_use]
    pub fn and(lhs: FormulaTerm, rhs: FormulaTerm) -> Self {
        Self::And(Box::new(lhs), Box::new(rhs))
    }

    #[must_use]
    pub fn or(lhs: FormulaTerm, rhs: FormulaTerm) -> Self {
        Self::Or(Box::new(lhs), Box::new(rhs))
    }

    /// Collects every leaf name in the tree, in sorted order.
    pub fn collect_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_names_into(&mut names);
        names
    }

    fn collect_names_into(&self, names: &mut BTreeSet<String>) {
        match self {
            Self::True | Self::False => {}
            Self::Symbol(name) | Self::State(name) | Self::Node(name) => {
                names.insert(name.clone());
            }
            Self::Not(inner) => inner.collect_names_into(names),
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.collect_names_into(names);
                rhs.collect_names_into(names);
            }
        }
    }

    /// Is the tree a conjunction of negated state leaves (the common way of
    /// writing co-finite final-state sets)?
    pub fn is_conjunction_of_negations(&self) -> bool {
        match self {
            Self::Not(inner) => matches!(**inner, Self::State(_)),
            Self::And(lhs, rhs) => {
                lhs.is_conjunction_of_negations() && rhs.is_conjunction_of_negations()
            }
            _ => false,
        }
    }
}

/// Kind of automaton carried by an [`IntermediateAut`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomatonType {
    Nfa,
    Afa,
}

/// How the transition symbols of an [`IntermediateAut`] are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphabetType {
    Explicit,
    Bitvector,
    Class,
    Intervals,
}

/// The neutral representation of a parsed automaton, before translation to
/// a concrete one: automaton and alphabet type, initial/final formulae, and
/// transitions `(source state, rhs formula)` where the rhs combines a
/// symbol formula with the target state.
#[derive(Debug, Clone)]
pub struct IntermediateAut {
    pub automaton_type: AutomatonType,
    pub alphabet_type: AlphabetType,
    /// Enumerated state universe; may be empty when states are only known
    /// from the formulae.
    pub states_names: Vec<String>,
    pub initial_formula: FormulaTerm,
    pub final_formula: FormulaTerm,
    pub transitions: Vec<(String, FormulaTerm)>,
}

impl IntermediateAut {
    /// An empty explicit NFA skeleton.
    #[must_use]
    pub fn new_nfa(alphabet_type: AlphabetType) -> Self {
        Self {
            automaton_type: AutomatonType::Nfa,
            alphabet_type,
            states_names: Vec::new(),
            initial_formula: FormulaTerm::False,
            final_formula: FormulaTerm::False,
            transitions: Vec::new(),
        }
    }

    pub fn is_nfa(&self) -> bool {
        self.automaton_type == AutomatonType::Nfa
    }

    pub fn is_bitvector(&self) -> bool {
        self.alphabet_type == AlphabetType::Bitvector
    }

    /// Records the transition `source --symbol_formula--> target`.
    pub fn add_transition(
        &mut self,
        source: impl Into<String>,
        symbol_formula: FormulaTerm,
        target: impl Into<String>,
    ) {
        self.transitions.push((
            source.into(),
            FormulaTerm::and(symbol_formula, FormulaTerm::state(target)),
        ));
    }

    /// The symbolic part of an NFA transition rhs: everything except the
    /// trailing target-state leaf.
    pub fn symbol_part_of_transition<'a>(
        &self,
        transition: &'a (String, FormulaTerm),
    ) -> Result<&'a FormulaTerm, FormatError> {
        match &transition.1 {
            FormulaTerm::And(symbol_part, target) if matches!(**target, FormulaTerm::State(_)) => {
                Ok(symbol_part)
            }
            _ => Err(FormatError::MalformedTransition {
                from_state: transition.0.clone(),
                reason: "rhs is not (symbol formula) & (target state)".to_string(),
            }),
        }
    }

    /// The target-state leaf of an NFA transition rhs.
    pub fn target_of_transition<'a>(
        &self,
        transition: &'a (String, FormulaTerm),
    ) -> Result<&'a str, FormatError> {
        match &transition.1 {
            FormulaTerm::And(_, target) => match &**target {
                FormulaTerm::State(name) => Ok(name),
                _ => Err(FormatError::MalformedTransition {
                    from_state: transition.0.clone(),
                    reason: "rhs does not end in a target state".to_string(),
                }),
            },
            _ => Err(FormatError::MalformedTransition {
                from_state: transition.0.clone(),
                reason: "rhs is not (symbol formula) & (target state)".to_string(),
            }),
        }
    }

    /// Names listed by the initial formula.
    pub fn get_enumerated_initials(&self) -> BTreeSet<String> {
        self.initial_formula.collect_names()
    }

    /// Resolves the final-state formula to a set of state names.
    ///
    /// A plain enumeration yields its names; a conjunction of negated
    /// states yields the enumerated state universe minus the negated names.
    pub fn get_final_names(&self) -> Result<BTreeSet<String>, FormatError> {
        if self.final_formula.is_conjunction_of_negations() {
            if self.states_names.is_empty() {
                return Err(FormatError::MalformedStateFormula {
                    which: "final".to_string(),
                    reason: "negated states need an enumerated state universe".to_string(),
                });
            }
            let negated = self.final_formula.collect_names();
            Ok(self
                .states_names
                .iter()
                .filter(|name| !negated.contains(*name))
                .cloned()
                .collect())
        } else {
            Ok(self.final_formula.collect_names())
        }
    }
}
