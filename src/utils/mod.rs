pub mod matrix;
pub mod ord_vector;
pub mod sparse_set;

pub use matrix::{ExtendableSquareMatrix, MatrixKind};
pub use ord_vector::OrdVector;
pub use sparse_set::SparseSet;
