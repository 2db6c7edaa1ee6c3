use thiserror::Error;

use crate::nfa::{State, Symbol};

/// Error emitted when removing a transition that is not present in the
/// transition relation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("transition ({from_state}, {symbol}, {target}) does not exist")]
pub struct AbsentTransitionError {
    /// Source state of the missing transition.
    pub from_state: State,
    /// Symbol on the missing transition.
    pub symbol: Symbol,
    /// Target state of the missing transition.
    pub target: State,
}

impl AbsentTransitionError {
    /// Creates a new [`AbsentTransitionError`].
    #[must_use]
    pub fn new(source: State, symbol: Symbol, target: State) -> Self {
        Self {
            from_state: source,
            symbol,
            target,
        }
    }
}

/// Error emitted by algorithm-selection parameter maps.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("missing required key \"{key}\"")]
    MissingKey { key: String },
    #[error("unrecognized key \"{key}\"")]
    UnknownKey { key: String },
    #[error("unrecognized value \"{value}\" of the \"{key}\" key")]
    UnknownValue { key: String, value: String },
}

impl ParamError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingKey { key: key.into() }
    }

    pub fn unknown_key(key: impl Into<String>) -> Self {
        Self::UnknownKey { key: key.into() }
    }

    pub fn unknown_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnknownValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Error emitted when a caller hands an algorithm structurally bad input:
/// a partition that does not cover the state set, a relation whose size
/// disagrees with the partition, or a formula mentioning an unknown variable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("state {state} is not covered by exactly one partition block")]
    NotAPartition { state: usize },
    #[error("relation has {relation_size} rows but the partition has {partition_size} blocks")]
    RelationSizeMismatch {
        relation_size: usize,
        partition_size: usize,
    },
    #[error("relation is not reflexive at block {block}")]
    NotReflexive { block: usize },
    #[error("formula mentions unknown variable \"{name}\"")]
    UnknownVariable { name: String },
    #[error("transition symbol {symbol} is not in the provided alphabet")]
    SymbolOutsideAlphabet { symbol: Symbol },
    #[error("no alphabet to check completeness against")]
    MissingAlphabet,
}

/// Error emitted for malformed serialized automata handed to the builder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("expected an NFA section, got {found}")]
    WrongSectionType { found: String },
    #[error("malformed transition from \"{from_state}\": {reason}")]
    MalformedTransition { from_state: String, reason: String },
    #[error("malformed {which} formula: {reason}")]
    MalformedStateFormula { which: String, reason: String },
}

/// Umbrella error for constructing an automaton from its intermediate
/// representation, where both structural and format problems can surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("format error: {0}")]
    Format(#[from] FormatError),
    #[error("input error: {0}")]
    Input(#[from] InputError),
}
