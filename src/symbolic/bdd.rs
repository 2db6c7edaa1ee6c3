use std::collections::HashMap;

/// Index of a boolean variable inside a [`BddManager`].
pub type BddVar = u32;

/// A handle to a node of a [`BddManager`]. Handles of one manager compare
/// equal iff they denote the same boolean function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bdd(u32);

const FALSE_NODE: Bdd = Bdd(0);
const TRUE_NODE: Bdd = Bdd(1);
const TERMINAL_VAR: BddVar = BddVar::MAX;

#[derive(Debug, Clone, Copy)]
struct Node {
    var: BddVar,
    low: Bdd,
    high: Bdd,
}

/// A reduced ordered binary decision diagram manager with hash-consed nodes
/// and an ITE operation cache.
///
/// All boolean operations go through [`BddManager::ite`]; since nodes are
/// hash-consed, a function is `⊥` exactly when its handle is the dedicated
/// false node, which [`BddManager::is_false`] checks explicitly.
#[derive(Debug)]
pub struct BddManager {
    nodes: Vec<Node>,
    unique: HashMap<(BddVar, Bdd, Bdd), Bdd>,
    ite_cache: HashMap<(Bdd, Bdd, Bdd), Bdd>,
}

impl Default for BddManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BddManager {
    #[must_use]
    pub fn new() -> Self {
        let mut manager = Self {
            nodes: Vec::new(),
            unique: HashMap::new(),
            ite_cache: HashMap::new(),
        };
        // Slots 0 and 1 are the constants.
        manager.nodes.push(Node {
            var: TERMINAL_VAR,
            low: FALSE_NODE,
            high: FALSE_NODE,
        });
        manager.nodes.push(Node {
            var: TERMINAL_VAR,
            low: TRUE_NODE,
            high: TRUE_NODE,
        });
        manager
    }

    pub fn constant_false(&self) -> Bdd {
        FALSE_NODE
    }

    pub fn constant_true(&self) -> Bdd {
        TRUE_NODE
    }

    /// Is the function `⊥`?
    pub fn is_false(&self, bdd: Bdd) -> bool {
        bdd == FALSE_NODE
    }

    pub fn is_true(&self, bdd: Bdd) -> bool {
        bdd == TRUE_NODE
    }

    /// The function of a single variable.
    pub fn var(&mut self, var: BddVar) -> Bdd {
        debug_assert_ne!(var, TERMINAL_VAR);
        self.mk(var, FALSE_NODE, TRUE_NODE)
    }

    fn mk(&mut self, var: BddVar, low: Bdd, high: Bdd) -> Bdd {
        if low == high {
            return low;
        }
        if let Some(&known) = self.unique.get(&(var, low, high)) {
            return known;
        }
        let fresh = Bdd(self.nodes.len() as u32);
        self.nodes.push(Node { var, low, high });
        self.unique.insert((var, low, high), fresh);
        fresh
    }

    fn top_var(&self, bdd: Bdd) -> BddVar {
        self.nodes[bdd.0 as usize].var
    }

    fn cofactor(&self, bdd: Bdd, var: BddVar, value: bool) -> Bdd {
        let node = self.nodes[bdd.0 as usize];
        if node.var != var {
            // Terminal, or branching on a later variable.
            return bdd;
        }
        if value { node.high } else { node.low }
    }

    /// If-then-else: `(f ∧ g) ∨ (¬f ∧ h)`.
    pub fn ite(&mut self, f: Bdd, g: Bdd, h: Bdd) -> Bdd {
        if f == TRUE_NODE {
            return g;
        }
        if f == FALSE_NODE {
            return h;
        }
        if g == h {
            return g;
        }
        if g == TRUE_NODE && h == FALSE_NODE {
            return f;
        }
        if let Some(&known) = self.ite_cache.get(&(f, g, h)) {
            return known;
        }
        let var = self
            .top_var(f)
            .min(self.top_var(g))
            .min(self.top_var(h));
        let low = self.ite(
            self.cofactor(f, var, false),
            self.cofactor(g, var, false),
            self.cofactor(h, var, false),
        );
        let high = self.ite(
            self.cofactor(f, var, true),
            self.cofactor(g, var, true),
            self.cofactor(h, var, true),
        );
        let result = self.mk(var, low, high);
        self.ite_cache.insert((f, g, h), result);
        result
    }

    pub fn and(&mut self, f: Bdd, g: Bdd) -> Bdd {
        self.ite(f, g, FALSE_NODE)
    }

    pub fn or(&mut self, f: Bdd, g: Bdd) -> Bdd {
        self.ite(f, TRUE_NODE, g)
    }

    pub fn not(&mut self, f: Bdd) -> Bdd {
        self.ite(f, FALSE_NODE, TRUE_NODE)
    }

    /// Does `f` imply `g`?
    pub fn implies(&mut self, f: Bdd, g: Bdd) -> bool {
        let not_g = self.not(g);
        let conflict = self.and(f, not_g);
        self.is_false(conflict)
    }

    /// Evaluates `f` under the assignment `values[var]`; missing variables
    /// read as false.
    pub fn eval(&self, f: Bdd, values: &[bool]) -> bool {
        let mut current = f;
        loop {
            let node = self.nodes[current.0 as usize];
            if node.var == TERMINAL_VAR {
                return current == TRUE_NODE;
            }
            let value = values.get(node.var as usize).copied().unwrap_or(false);
            current = if value { node.high } else { node.low };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_middle_and_contradiction() {
        let mut manager = BddManager::new();
        let x = manager.var(0);
        let not_x = manager.not(x);
        let both = manager.and(x, not_x);
        let either = manager.or(x, not_x);
        assert!(manager.is_false(both));
        assert!(manager.is_true(either));
    }

    #[test]
    fn test_hash_consing_canonicalizes() {
        let mut manager = BddManager::new();
        let x = manager.var(0);
        let y = manager.var(1);
        let left = manager.and(x, y);
        let right = manager.and(y, x);
        assert_eq!(left, right, "conjunction is canonical regardless of order");
        let twice = manager.or(left, left);
        assert_eq!(twice, left);
    }

    #[test]
    fn test_eval() {
        let mut manager = BddManager::new();
        let x = manager.var(0);
        let y = manager.var(1);
        let not_y = manager.not(y);
        let formula = manager.or(x, not_y); // x | !y
        assert!(manager.eval(formula, &[false, false]));
        assert!(!manager.eval(formula, &[false, true]));
        assert!(manager.eval(formula, &[true, true]));
    }

    #[test]
    fn test_implication_between_minterm_and_formula() {
        let mut manager = BddManager::new();
        let x = manager.var(0);
        let y = manager.var(1);
        let formula = manager.or(x, y);
        let minterm = {
            let not_y = manager.not(y);
            manager.and(x, not_y)
        };
        assert!(manager.implies(minterm, formula));
        assert!(!manager.implies(formula, minterm));
    }
}
