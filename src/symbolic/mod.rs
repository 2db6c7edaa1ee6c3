pub mod bdd;
pub mod builder;
pub mod inter_aut;
pub mod minterm;

pub use bdd::{Bdd, BddManager};
pub use builder::construct_nfa;
pub use inter_aut::{AlphabetType, AutomatonType, FormulaTerm, IntermediateAut};
pub use minterm::Mintermization;
