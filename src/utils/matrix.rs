use std::collections::HashMap;

/// Storage strategy of an [`ExtendableSquareMatrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixKind {
    /// Single vector in cascade layout; extending by one appends `2n + 1`
    /// cells. The full `capacity * capacity` space is reserved up front so
    /// the vector never reallocates.
    Cascade,
    /// Vector of row vectors; extending pushes one column into each row and
    /// one fresh row at the end.
    Dynamic,
    /// Hash map keyed by `i * capacity + j`; unset cells read as the default.
    Hashed,
}

#[derive(Debug, Clone)]
enum Storage<T> {
    Cascade(Vec<T>),
    Dynamic(Vec<Vec<T>>),
    Hashed(HashMap<usize, T>),
}

/// An incrementally growable `n x n` matrix with O(1) cell access and
/// amortized O(n) grow-by-one, over one of several interchangeable storage
/// strategies.
///
/// Used by the simulation engine for its block relation and by any
/// bookkeeping that needs a growable dense square structure.
#[derive(Debug, Clone)]
pub struct ExtendableSquareMatrix<T> {
    size: usize,
    capacity: usize,
    storage: Storage<T>,
}

impl<T: Clone + Default> ExtendableSquareMatrix<T> {
    /// Creates an `init_size x init_size` matrix of defaults that can grow
    /// up to `capacity x capacity`.
    #[must_use]
    pub fn new(kind: MatrixKind, capacity: usize, init_size: usize) -> Self {
        assert!(init_size <= capacity, "initial size exceeds capacity");
        let storage = match kind {
            MatrixKind::Cascade => {
                let mut cells = Vec::new();
                cells.reserve_exact(capacity * capacity);
                Storage::Cascade(cells)
            }
            MatrixKind::Dynamic => Storage::Dynamic(Vec::new()),
            MatrixKind::Hashed => Storage::Hashed(HashMap::new()),
        };
        let mut matrix = Self {
            size: 0,
            capacity,
            storage,
        };
        for _ in 0..init_size {
            matrix.extend();
        }
        matrix
    }

    /// Number of rows (equivalently columns) currently in use.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Maximal number of rows the matrix may ever grow to.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn kind(&self) -> MatrixKind {
        match self.storage {
            Storage::Cascade(_) => MatrixKind::Cascade,
            Storage::Dynamic(_) => MatrixKind::Dynamic,
            Storage::Hashed(_) => MatrixKind::Hashed,
        }
    }

    /// Cascade layout: cells of the `n`-th row/column pair are appended as
    /// one contiguous run, so growing never moves existing cells.
    fn cascade_index(i: usize, j: usize) -> usize {
        if i >= j { i * i + j } else { j * j + 2 * j - i }
    }

    pub fn get(&self, i: usize, j: usize) -> T {
        assert!(i < self.size && j < self.size, "cell ({i}, {j}) out of range");
        match &self.storage {
            Storage::Cascade(cells) => cells[Self::cascade_index(i, j)].clone(),
            Storage::Dynamic(rows) => rows[i][j].clone(),
            Storage::Hashed(map) => map.get(&(i * self.capacity + j)).cloned().unwrap_or_default(),
        }
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) {
        assert!(i < self.size && j < self.size, "cell ({i}, {j}) out of range");
        match &mut self.storage {
            Storage::Cascade(cells) => cells[Self::cascade_index(i, j)] = value,
            Storage::Dynamic(rows) => rows[i][j] = value,
            Storage::Hashed(map) => {
                map.insert(i * self.capacity + j, value);
            }
        }
    }

    /// Grows the matrix by one row and one column filled with defaults.
    pub fn extend(&mut self) {
        assert!(self.size < self.capacity, "matrix already at capacity");
        match &mut self.storage {
            Storage::Cascade(cells) => {
                cells.resize(cells.len() + 2 * self.size + 1, T::default());
            }
            Storage::Dynamic(rows) => {
                for row in rows.iter_mut() {
                    row.push(T::default());
                }
                rows.push(vec![T::default(); self.size + 1]);
            }
            Storage::Hashed(_) => {}
        }
        self.size += 1;
    }

    /// Grows the matrix by one row and one column, copying row `row` and
    /// column `col` of the existing matrix into the fresh ones. `None` fills
    /// with defaults instead. The corner cell `(n, n)` takes the value at
    /// `(row, col)` when both are given, the default otherwise.
    pub fn extend_and_copy(&mut self, row: Option<usize>, col: Option<usize>) {
        assert!(row.is_none_or(|r| r < self.size), "copied row out of range");
        assert!(col.is_none_or(|c| c < self.size), "copied column out of range");
        let fresh = self.size;
        self.extend();
        if let Some(source_row) = row {
            for j in 0..fresh {
                self.set(fresh, j, self.get(source_row, j));
            }
        }
        if let Some(source_col) = col {
            for i in 0..fresh {
                self.set(i, fresh, self.get(i, source_col));
            }
        }
        if let (Some(source_row), Some(source_col)) = (row, col) {
            self.set(fresh, fresh, self.get(source_row, source_col));
        }
    }
}
