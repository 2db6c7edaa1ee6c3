use indexmap::IndexMap;

use crate::errors::InputError;
use crate::nfa::{Symbol, Word};
use crate::utils::OrdVector;

/// The small alphabet contract the automata algorithms rely on.
///
/// An alphabet translates symbol names to symbol values and enumerates the
/// symbols it knows about. Alphabets are shared between automata by the
/// caller; the library only ever borrows them.
pub trait Alphabet {
    /// Translates a symbol name to its value.
    fn translate_symbol(&self, name: &str) -> Result<Symbol, InputError>;

    /// All symbols of the alphabet, sorted.
    fn get_alphabet_symbols(&self) -> OrdVector<Symbol>;

    /// Translates a sequence of symbol names to a word.
    fn translate_word(&self, names: &[&str]) -> Result<Word, InputError> {
        names.iter().map(|name| self.translate_symbol(name)).collect()
    }
}

/// An alphabet that assigns values to symbol names on first use.
///
/// Automata contribute their symbols through [`OnTheFlyAlphabet::update_next_symbol_value`]
/// and [`OnTheFlyAlphabet::try_add_new_symbol`], so several automata can
/// share one symbol numbering.
#[derive(Debug, Clone, Default)]
pub struct OnTheFlyAlphabet {
    symbol_map: IndexMap<String, Symbol>,
    next_symbol_value: Symbol,
}

impl OnTheFlyAlphabet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an alphabet from preassigned name/value pairs.
    #[must_use]
    pub fn from_symbol_map(symbol_map: IndexMap<String, Symbol>) -> Self {
        let next_symbol_value = symbol_map.values().max().map_or(0, |&max| max + 1);
        Self {
            symbol_map,
            next_symbol_value,
        }
    }

    /// Assigns the next free value to `name`, or returns the existing value.
    pub fn add_new_symbol(&mut self, name: impl Into<String>) -> Symbol {
        let name = name.into();
        if let Some(&symbol) = self.symbol_map.get(&name) {
            return symbol;
        }
        let symbol = self.next_symbol_value;
        self.symbol_map.insert(name, symbol);
        self.next_symbol_value += 1;
        symbol
    }

    /// Registers `name` with the given `symbol` value unless the name is
    /// already bound. Returns whether a new binding was added. The value of
    /// an already existing symbol is never overwritten.
    pub fn try_add_new_symbol(&mut self, name: impl Into<String>, symbol: Symbol) -> bool {
        let name = name.into();
        if self.symbol_map.contains_key(&name) {
            return false;
        }
        self.symbol_map.insert(name, symbol);
        self.update_next_symbol_value(symbol);
        true
    }

    /// Moves the next free value past `symbol`.
    pub fn update_next_symbol_value(&mut self, symbol: Symbol) {
        if symbol >= self.next_symbol_value {
            self.next_symbol_value = symbol + 1;
        }
    }

    pub fn get_symbol_map(&self) -> &IndexMap<String, Symbol> {
        &self.symbol_map
    }

    pub fn is_empty(&self) -> bool {
        self.symbol_map.is_empty()
    }
}

impl Alphabet for OnTheFlyAlphabet {
    fn translate_symbol(&self, name: &str) -> Result<Symbol, InputError> {
        self.symbol_map
            .get(name)
            .copied()
            .ok_or_else(|| InputError::UnknownVariable { name: name.to_string() })
    }

    fn get_alphabet_symbols(&self) -> OrdVector<Symbol> {
        self.symbol_map.values().copied().collect()
    }
}

/// A fixed, enumerated alphabet whose symbol names are their decimal values.
#[derive(Debug, Clone, Default)]
pub struct EnumAlphabet {
    symbols: OrdVector<Symbol>,
}

impl EnumAlphabet {
    #[must_use]
    pub fn new(symbols: impl Into<OrdVector<Symbol>>) -> Self {
        Self {
            symbols: symbols.into(),
        }
    }
}

impl Alphabet for EnumAlphabet {
    fn translate_symbol(&self, name: &str) -> Result<Symbol, InputError> {
        let symbol: Symbol = name
            .parse()
            .map_err(|_| InputError::UnknownVariable { name: name.to_string() })?;
        if self.symbols.contains(&symbol) {
            Ok(symbol)
        } else {
            Err(InputError::UnknownVariable { name: name.to_string() })
        }
    }

    fn get_alphabet_symbols(&self) -> OrdVector<Symbol> {
        self.symbols.clone()
    }
}

impl Alphabet for OrdVector<Symbol> {
    fn translate_symbol(&self, name: &str) -> Result<Symbol, InputError> {
        let symbol: Symbol = name
            .parse()
            .map_err(|_| InputError::UnknownVariable { name: name.to_string() })?;
        if self.contains(&symbol) {
            Ok(symbol)
        } else {
            Err(InputError::UnknownVariable { name: name.to_string() })
        }
    }

    fn get_alphabet_symbols(&self) -> OrdVector<Symbol> {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_the_fly_assigns_consecutive_values() {
        let mut alphabet = OnTheFlyAlphabet::new();
        assert_eq!(alphabet.add_new_symbol("a"), 0);
        assert_eq!(alphabet.add_new_symbol("b"), 1);
        assert_eq!(alphabet.add_new_symbol("a"), 0, "existing name keeps its value");
        assert_eq!(alphabet.translate_symbol("b").unwrap(), 1);
        assert!(alphabet.translate_symbol("c").is_err());
    }

    #[test]
    fn test_try_add_never_overwrites() {
        let mut alphabet = OnTheFlyAlphabet::new();
        assert!(alphabet.try_add_new_symbol("x", 5));
        assert!(!alphabet.try_add_new_symbol("x", 9));
        assert_eq!(alphabet.translate_symbol("x").unwrap(), 5);
        // The next fresh symbol continues past the largest registered value.
        assert_eq!(alphabet.add_new_symbol("y"), 6);
    }

    #[test]
    fn test_symbols_are_sorted() {
        let mut alphabet = OnTheFlyAlphabet::new();
        alphabet.try_add_new_symbol("later", 9);
        alphabet.try_add_new_symbol("earlier", 2);
        assert_eq!(alphabet.get_alphabet_symbols().as_slice(), &[2, 9]);
    }
}
