use indexmap::IndexMap;
use tracing::debug;

use crate::errors::{BuildError, InputError};
use crate::symbolic::bdd::{Bdd, BddManager};
use crate::symbolic::inter_aut::{AlphabetType, FormulaTerm, IntermediateAut};

/// Converts the symbolic (bit-vector) transition formulae of intermediate
/// automata into an explicit alphabet of disjoint minterms.
///
/// Every formula becomes a BDD over interned variables; the minterms of the
/// collected BDD set are the atoms of the boolean subalgebra they generate.
/// Each symbolic edge is replaced by one explicit edge per minterm implying
/// its formula. Automata mintermized in one call share a single minterm
/// set, so their languages stay comparable symbol for symbol.
#[derive(Debug, Default)]
pub struct Mintermization {
    manager: BddManager,
    symbol_to_var: IndexMap<String, Bdd>,
}

impl Mintermization {
    #[must_use]
    pub fn new() -> Self {
        Self {
            manager: BddManager::new(),
            symbol_to_var: IndexMap::new(),
        }
    }

    /// Transforms a transition formula into a BDD, interning its variables.
    pub fn graph_to_bdd(&mut self, formula: &FormulaTerm) -> Result<Bdd, BuildError> {
        match formula {
            FormulaTerm::True => Ok(self.manager.constant_true()),
            FormulaTerm::False => Ok(self.manager.constant_false()),
            FormulaTerm::Symbol(name) => {
                if let Some(&var) = self.symbol_to_var.get(name) {
                    return Ok(var);
                }
                let index = self.symbol_to_var.len() as u32;
                let var = self.manager.var(index);
                self.symbol_to_var.insert(name.clone(), var);
                Ok(var)
            }
            FormulaTerm::State(name) | FormulaTerm::Node(name) => {
                Err(InputError::UnknownVariable { name: name.clone() }.into())
            }
            FormulaTerm::Not(inner) => {
                let inner = self.graph_to_bdd(inner)?;
                Ok(self.manager.not(inner))
            }
            FormulaTerm::And(lhs, rhs) => {
                let lhs = self.graph_to_bdd(lhs)?;
                let rhs = self.graph_to_bdd(rhs)?;
                Ok(self.manager.and(lhs, rhs))
            }
            FormulaTerm::Or(lhs, rhs) => {
                let lhs = self.graph_to_bdd(lhs)?;
                let rhs = self.graph_to_bdd(rhs)?;
                Ok(self.manager.or(lhs, rhs))
            }
        }
    }

    /// Builds the minterm tree of a set of BDDs and returns its leaves.
    ///
    /// The tree is seeded with `⊤`; each formula in turn replaces every
    /// current leaf `ψ` by `ψ ∧ φ` and `ψ ∧ ¬φ`, dropping children equal to
    /// `⊥`. At most `2^n` leaves for `n` formulae; practical inputs yield
    /// far fewer.
    pub fn compute_minterms(&mut self, source_bdds: &[Bdd]) -> Vec<Bdd> {
        let mut leaves = vec![self.manager.constant_true()];
        for &formula in source_bdds {
            let mut refined = Vec::with_capacity(leaves.len() * 2);
            for leaf in leaves {
                let positive = self.manager.and(leaf, formula);
                if !self.manager.is_false(positive) {
                    refined.push(positive);
                }
                let negated = self.manager.not(formula);
                let negative = self.manager.and(leaf, negated);
                if !self.manager.is_false(negative) {
                    refined.push(negative);
                }
            }
            leaves = refined;
        }
        debug!(minterms = leaves.len(), "minterm tree built");
        leaves
    }

    /// Mintermizes one automaton with a bit-vector alphabet.
    pub fn mintermize(&mut self, aut: &IntermediateAut) -> Result<IntermediateAut, BuildError> {
        Ok(self.mintermize_many(&[aut])?.pop().expect("one result per input"))
    }

    /// Mintermizes several automata over one shared minterm set.
    pub fn mintermize_many(
        &mut self,
        auts: &[&IntermediateAut],
    ) -> Result<Vec<IntermediateAut>, BuildError> {
        // Collect the distinct transition formulae of all automata.
        let mut formula_bdds: Vec<Bdd> = Vec::new();
        let mut per_aut_bdds: Vec<Vec<Bdd>> = Vec::new();
        for aut in auts {
            if !aut.is_nfa() || !aut.is_bitvector() {
                return Err(crate::errors::FormatError::WrongSectionType {
                    found: "non-bitvector section in mintermization".to_string(),
                }
                .into());
            }
            let mut bdds = Vec::with_capacity(aut.transitions.len());
            for transition in &aut.transitions {
                let symbol_part = aut.symbol_part_of_transition(transition)?;
                let bdd = self.graph_to_bdd(symbol_part)?;
                if !formula_bdds.contains(&bdd) {
                    formula_bdds.push(bdd);
                }
                bdds.push(bdd);
            }
            per_aut_bdds.push(bdds);
        }

        let minterms = self.compute_minterms(&formula_bdds);

        let mut results = Vec::with_capacity(auts.len());
        for (aut, bdds) in auts.iter().zip(per_aut_bdds) {
            results.push(self.minterms_to_aut(aut, &bdds, &minterms)?);
        }
        Ok(results)
    }

    /// Rewrites the automaton over the explicit minterm alphabet: each edge
    /// labeled `φ` becomes one edge per minterm `m` with `m ⇒ φ`. Minterm
    /// symbols are named by their index in the shared minterm set.
    fn minterms_to_aut(
        &mut self,
        aut: &IntermediateAut,
        transition_bdds: &[Bdd],
        minterms: &[Bdd],
    ) -> Result<IntermediateAut, BuildError> {
        let mut result = IntermediateAut {
            automaton_type: aut.automaton_type,
            alphabet_type: AlphabetType::Explicit,
            states_names: aut.states_names.clone(),
            initial_formula: aut.initial_formula.clone(),
            final_formula: aut.final_formula.clone(),
            transitions: Vec::new(),
        };
        for (transition, &formula) in aut.transitions.iter().zip(transition_bdds) {
            let target = aut.target_of_transition(transition)?.to_string();
            for (index, &minterm) in minterms.iter().enumerate() {
                if self.manager.implies(minterm, formula) {
                    result.add_transition(
                        transition.0.clone(),
                        FormulaTerm::symbol(index.to_string()),
                        target.clone(),
                    );
                }
            }
        }
        Ok(result)
    }
}
