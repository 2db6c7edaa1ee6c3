use crate::utils::{ExtendableSquareMatrix, MatrixKind};

/// A binary relation over `0..size` as a square boolean matrix.
///
/// Backed by an [`ExtendableSquareMatrix`], which lets the simulation engine
/// grow the relation by one row/column pair whenever a partition block
/// splits, copying the parent block's row and column.
#[derive(Debug, Clone)]
pub struct BinaryRelation {
    matrix: ExtendableSquareMatrix<bool>,
}

impl BinaryRelation {
    /// A `size x size` relation filled with `value`.
    #[must_use]
    pub fn new(size: usize, value: bool) -> Self {
        let mut relation = Self {
            matrix: ExtendableSquareMatrix::new(MatrixKind::Dynamic, size, size),
        };
        if value {
            relation.fill(true);
        }
        relation
    }

    /// An empty relation that can grow up to `capacity` rows by splitting.
    #[must_use]
    pub fn with_growth(capacity: usize) -> Self {
        Self {
            matrix: ExtendableSquareMatrix::new(MatrixKind::Cascade, capacity, 0),
        }
    }

    pub fn size(&self) -> usize {
        self.matrix.size()
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.matrix.get(row, col)
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        self.matrix.set(row, col, value);
    }

    pub fn fill(&mut self, value: bool) {
        for row in 0..self.size() {
            for col in 0..self.size() {
                self.matrix.set(row, col, value);
            }
        }
    }

    /// Grows by one unrelated row/column pair.
    pub fn extend(&mut self) {
        self.matrix.extend();
    }

    /// Grows by one row/column pair that duplicates `parent`'s row and
    /// column; the fresh index is related exactly as `parent` is, including
    /// to `parent` and to itself.
    pub fn split(&mut self, parent: usize) {
        self.matrix.extend_and_copy(Some(parent), Some(parent));
    }

    /// Column indices related to `row`.
    #[must_use]
    pub fn row(&self, row: usize) -> Vec<usize> {
        (0..self.size()).filter(|&col| self.get(row, col)).collect()
    }

    /// Keeps only the symmetric fragment: `(i, j)` stays iff `(j, i)` also
    /// holds.
    pub fn restrict_to_symmetric(&mut self) {
        for i in 0..self.size() {
            for j in 0..i {
                if self.get(i, j) != self.get(j, i) {
                    self.set(i, j, false);
                    self.set(j, i, false);
                }
            }
        }
    }

    /// Elementwise conjunction with `other`; sizes must agree.
    pub fn intersect_with(&mut self, other: &BinaryRelation) {
        assert_eq!(self.size(), other.size(), "relation sizes differ");
        for i in 0..self.size() {
            for j in 0..self.size() {
                if self.get(i, j) && !other.get(i, j) {
                    self.set(i, j, false);
                }
            }
        }
    }

    /// Maps every index to the smallest index it is symmetric-related to,
    /// i.e. the representative of its equivalence class under the symmetric
    /// fragment of the relation.
    #[must_use]
    pub fn get_quotient_projection(&self) -> Vec<usize> {
        let mut projection: Vec<usize> = (0..self.size()).collect();
        for i in 0..self.size() {
            for j in 0..i {
                if self.get(i, j) && self.get(j, i) {
                    projection[i] = projection[j];
                    break;
                }
            }
        }
        projection
    }
}

/// Relations compare as sets of pairs.
impl PartialEq for BinaryRelation {
    fn eq(&self, other: &Self) -> bool {
        if self.size() != other.size() {
            return false;
        }
        (0..self.size()).all(|row| (0..self.size()).all(|col| self.get(row, col) == other.get(row, col)))
    }
}

impl Eq for BinaryRelation {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_copies_row_and_column() {
        let mut relation = BinaryRelation::with_growth(4);
        relation.extend();
        relation.extend();
        relation.set(0, 0, true);
        relation.set(1, 1, true);
        relation.set(0, 1, true);
        relation.split(1);
        assert_eq!(relation.size(), 3);
        assert!(relation.get(2, 2), "child is related to itself");
        assert!(relation.get(2, 1) && relation.get(1, 2), "child and parent are mutually related");
        assert!(relation.get(0, 2), "columns are copied");
        assert!(!relation.get(2, 0), "rows are copied");
    }

    #[test]
    fn test_quotient_projection_groups_classes() {
        let mut relation = BinaryRelation::new(3, false);
        for i in 0..3 {
            relation.set(i, i, true);
        }
        relation.set(0, 2, true);
        relation.set(2, 0, true);
        relation.set(1, 2, true); // one-sided, not an equivalence
        assert_eq!(relation.get_quotient_projection(), vec![0, 1, 0]);
    }

    #[test]
    fn test_restrict_to_symmetric() {
        let mut relation = BinaryRelation::new(2, true);
        relation.set(0, 1, false);
        relation.restrict_to_symmetric();
        assert!(!relation.get(1, 0));
        assert!(relation.get(0, 0) && relation.get(1, 1));
    }
}
