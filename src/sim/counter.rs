use std::rc::Rc;

/// A multiset of small integers (labels or states) with O(1) membership and
/// counted add/remove, iterating over the distinct present elements.
#[derive(Debug, Clone)]
pub struct SmartSet {
    elements: Vec<usize>,
    positions: Vec<usize>,
    counts: Vec<usize>,
}

impl SmartSet {
    /// An empty set over the universe `0..range`.
    #[must_use]
    pub fn new(range: usize) -> Self {
        Self {
            elements: Vec::new(),
            positions: vec![0; range],
            counts: vec![0; range],
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, element: usize) -> bool {
        self.counts[element] > 0
    }

    pub fn count(&self, element: usize) -> usize {
        self.counts[element]
    }

    /// Increments the multiplicity of `element`, inserting it on 0 -> 1.
    pub fn add(&mut self, element: usize) {
        if self.counts[element] == 0 {
            self.positions[element] = self.elements.len();
            self.elements.push(element);
        }
        self.counts[element] += 1;
    }

    /// Decrements the multiplicity of `element`, dropping it on 1 -> 0.
    /// Removing an absent element is a no-op (removals saturate).
    pub fn remove(&mut self, element: usize) {
        match self.counts[element] {
            0 => {}
            1 => {
                self.counts[element] = 0;
                let position = self.positions[element];
                let last = *self.elements.last().expect("count 1 implies membership");
                self.elements[position] = last;
                self.positions[last] = position;
                self.elements.pop();
            }
            _ => self.counts[element] -= 1,
        }
    }

    /// Like [`SmartSet::remove`] but the element must be present.
    pub fn remove_strict(&mut self, element: usize) {
        debug_assert!(self.contains(element), "remove_strict of an absent element");
        self.remove(element);
    }

    /// Replaces the content with the distinct elements of `other`, each with
    /// multiplicity one.
    pub fn assign_flat(&mut self, other: &SmartSet) {
        for &element in &self.elements {
            self.counts[element] = 0;
        }
        self.elements.clear();
        for &element in &other.elements {
            self.positions[element] = self.elements.len();
            self.elements.push(element);
            self.counts[element] = 1;
        }
    }

    /// Iterates over the distinct present elements.
    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.elements.iter()
    }
}

/// Per-block counter `C[a, q]` of the simulation engine: how many
/// `a`-successors of `q` still lie inside some block related to the owner.
///
/// The slot layout (`key`, `label_map`) is shared by every counter of a run.
/// Data rows are `Rc`-shared between a block and the blocks derived from it;
/// the first write to a shared row copies it (`Rc::make_mut`), which is the
/// copy-on-write realization of the acquire/release protocol of the original
/// shared counters.
#[derive(Debug, Clone)]
pub struct SharedCounter {
    key: Rc<Vec<usize>>,
    label_map: Rc<Vec<(usize, usize)>>,
    row_size: usize,
    states: usize,
    rows: Vec<Option<Rc<Vec<usize>>>>,
}

impl SharedCounter {
    #[must_use]
    pub fn new(
        key: Rc<Vec<usize>>,
        label_map: Rc<Vec<(usize, usize)>>,
        row_size: usize,
        states: usize,
    ) -> Self {
        Self {
            key,
            label_map,
            row_size,
            states,
            rows: Vec::new(),
        }
    }

    /// Ensures room for `rows` data rows.
    pub fn resize(&mut self, rows: usize) {
        if rows > self.rows.len() {
            self.rows.resize(rows, None);
        }
    }

    fn slot(&self, label: usize, state: usize) -> usize {
        let slot = self.key[label * self.states + state];
        debug_assert_ne!(slot, usize::MAX, "counter slot for an unused (label, state)");
        slot
    }

    pub fn get(&self, label: usize, state: usize) -> usize {
        let slot = self.slot(label, state);
        match self.rows.get(slot / self.row_size) {
            Some(Some(row)) => row[slot % self.row_size],
            _ => 0,
        }
    }

    pub fn set(&mut self, label: usize, state: usize, value: usize) {
        let slot = self.slot(label, state);
        let row_index = slot / self.row_size;
        self.resize(row_index + 1);
        let row = self.rows[row_index]
            .get_or_insert_with(|| Rc::new(vec![0; self.row_size]));
        Rc::make_mut(row)[slot % self.row_size] = value;
    }

    /// Decrements the counter and returns the new value.
    pub fn decr(&mut self, label: usize, state: usize) -> usize {
        let value = self.get(label, state);
        debug_assert!(value > 0, "decrement of a zero counter");
        let value = value - 1;
        self.set(label, state, value);
        value
    }

    /// Shares the parent's data rows for every label in `inset`; subsequent
    /// writes copy on demand.
    pub fn copy_labels(&mut self, inset: &SmartSet, parent: &SharedCounter) {
        for &label in inset.iter() {
            let (first, end) = self.label_map[label];
            if end == 0 {
                continue;
            }
            self.resize(end);
            for row in first..end {
                if let Some(Some(parent_row)) = parent.rows.get(row) {
                    self.rows[row] = Some(Rc::clone(parent_row));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smart_set_counts() {
        let mut set = SmartSet::new(4);
        set.add(2);
        set.add(2);
        set.add(0);
        assert!(set.contains(2));
        assert_eq!(set.len(), 2);
        set.remove(2);
        assert!(set.contains(2), "multiplicity 2 survives one removal");
        set.remove(2);
        assert!(!set.contains(2));
        set.remove(2);
        assert_eq!(set.len(), 1, "removals saturate at zero");
    }

    #[test]
    fn test_shared_counter_copy_on_write() {
        // One label, two states, both with slots.
        let key = Rc::new(vec![0, 1]);
        let label_map = Rc::new(vec![(0, 1)]);
        let mut parent = SharedCounter::new(Rc::clone(&key), Rc::clone(&label_map), 3, 2);
        parent.set(0, 0, 5);
        parent.set(0, 1, 7);

        let mut inset = SmartSet::new(1);
        inset.add(0);
        let mut child = SharedCounter::new(key, label_map, 3, 2);
        child.copy_labels(&inset, &parent);
        assert_eq!(child.get(0, 0), 5);

        // A write on one side leaves the other untouched.
        assert_eq!(child.decr(0, 0), 4);
        assert_eq!(parent.get(0, 0), 5);
        parent.set(0, 1, 9);
        assert_eq!(child.get(0, 1), 7);
    }
}
