//! Partition-refinement computation of the coarsest simulation preorder of a
//! labeled transition system, in the Ranzato-Tapparo style: blocks of a
//! partition are iteratively split by "remove" sets of states that lost all
//! successors into the row of a block, with per-block counters tracking how
//! many successors each predecessor still has.

pub mod counter;
pub mod relation;

use std::rc::Rc;

use tracing::debug;

pub use counter::{SharedCounter, SmartSet};
pub use relation::BinaryRelation;

use crate::errors::InputError;

/// A labeled transition system with per-label forward and backward edge
/// maps, the input of the simulation engine.
#[derive(Debug, Clone, Default)]
pub struct Lts {
    num_states: usize,
    num_transitions: usize,
    /// Per label: (post, pre); `post[q]` are the `a`-successors of `q` and
    /// `pre[r]` the `a`-predecessors of `r`.
    data: Vec<(Vec<Vec<usize>>, Vec<Vec<usize>>)>,
}

impl Lts {
    /// Creates an LTS over `num_states` states and no transitions.
    #[must_use]
    pub fn new(num_states: usize) -> Self {
        Self {
            num_states,
            num_transitions: 0,
            data: Vec::new(),
        }
    }

    /// Adds the transition `source -label-> target`, growing the state and
    /// label ranges as needed.
    pub fn add_transition(&mut self, source: usize, label: usize, target: usize) {
        if label >= self.data.len() {
            self.data.resize(label + 1, (Vec::new(), Vec::new()));
        }
        self.num_states = self.num_states.max(source + 1).max(target + 1);
        let (post, pre) = &mut self.data[label];
        if source >= post.len() {
            post.resize(source + 1, Vec::new());
        }
        if target >= pre.len() {
            pre.resize(target + 1, Vec::new());
        }
        post[source].push(target);
        pre[target].push(source);
        self.num_transitions += 1;
    }

    pub fn states(&self) -> usize {
        self.num_states
    }

    pub fn labels(&self) -> usize {
        self.data.len()
    }

    pub fn num_of_transitions(&self) -> usize {
        self.num_transitions
    }

    /// `label`-successors of `state`.
    pub fn post(&self, label: usize, state: usize) -> &[usize] {
        self.data
            .get(label)
            .and_then(|(post, _)| post.get(state))
            .map_or(&[], Vec::as_slice)
    }

    /// `label`-predecessors of `state`.
    pub fn pre(&self, label: usize, state: usize) -> &[usize] {
        self.data
            .get(label)
            .and_then(|(_, pre)| pre.get(state))
            .map_or(&[], Vec::as_slice)
    }

    /// Labels of the edges leading into `state`.
    pub fn bw_labels(&self, state: usize) -> Vec<usize> {
        (0..self.labels())
            .filter(|&label| !self.pre(label, state).is_empty())
            .collect()
    }

    /// Per-label support sets: `delta1[a]` holds every state with at least
    /// one `a`-successor (with multiplicity per edge).
    fn build_delta1(&self) -> Vec<SmartSet> {
        let mut delta1: Vec<SmartSet> = (0..self.labels())
            .map(|_| SmartSet::new(self.num_states))
            .collect();
        for (label, (post, _)) in self.data.iter().enumerate() {
            for (state, targets) in post.iter().enumerate() {
                for _ in targets {
                    delta1[label].add(state);
                }
            }
        }
        delta1
    }

    /// The simulation preorder with respect to the trivial one-block
    /// partition, expanded to a state-by-state relation of `output_size`
    /// rows.
    #[must_use]
    pub fn compute_simulation(&self, output_size: usize) -> BinaryRelation {
        if output_size == 0 || self.num_states == 0 {
            return BinaryRelation::new(output_size, false);
        }
        let partition = vec![(0..self.num_states).collect::<Vec<_>>()];
        let relation = BinaryRelation::new(1, true);
        self.compute_simulation_with(&partition, &relation, output_size)
            .expect("the one-block partition is always consistent")
    }

    /// The coarsest simulation refining `partition` and `relation`.
    ///
    /// `partition` must partition the states and `relation` must be a
    /// reflexive relation with one row per block; bad input is reported as
    /// an [`InputError`].
    pub fn compute_simulation_with(
        &self,
        partition: &[Vec<usize>],
        relation: &BinaryRelation,
        output_size: usize,
    ) -> Result<BinaryRelation, InputError> {
        if output_size == 0 || self.num_states == 0 {
            return Ok(BinaryRelation::new(output_size, false));
        }
        let mut engine = SimulationEngine::new(self);
        engine.init(partition, relation)?;
        engine.run();
        Ok(engine.build_result(output_size))
    }
}

/// One block of the partition. Its states form a circular doubly linked
/// list held in the engine's `next`/`prev` arrays; the block only keeps an
/// entry state and the list length.
struct Block {
    /// Some state on the block's circular list.
    head: usize,
    size: usize,
    /// Labels with at least one edge into the block, with multiplicity per
    /// member state.
    inset: SmartSet,
    /// Per-label remove list: states that lost all successors into this
    /// block's row. Shared with derived blocks until written.
    remove: Vec<Option<Rc<Vec<usize>>>>,
    counter: SharedCounter,
    /// States deposited here before a split.
    tmp: Vec<usize>,
}

struct SimulationEngine<'a> {
    lts: &'a Lts,
    row_size: usize,
    partition: Vec<Block>,
    /// Relation over block indices; splitting a block extends it by a copy
    /// of the parent's row and column.
    relation: BinaryRelation,
    /// Circular doubly linked state lists, indexed by state.
    next: Vec<usize>,
    prev: Vec<usize>,
    block_of: Vec<usize>,
    /// Pending (block, label) pairs with a nonempty remove list.
    queue: Vec<(usize, usize)>,
    key: Rc<Vec<usize>>,
    label_map: Rc<Vec<(usize, usize)>>,
}

impl<'a> SimulationEngine<'a> {
    /// Counter rows hold `(floor(sqrt(states)) >> 1)` rounded up to a power
    /// of two slots, minus one word kept for the row bookkeeping.
    fn get_row_size(states: usize) -> usize {
        let threshold = (states as f64).sqrt() as usize >> 1;
        let mut row_size = 32;
        while row_size <= threshold {
            row_size <<= 1;
        }
        row_size - 1
    }

    fn new(lts: &'a Lts) -> Self {
        let states = lts.states();
        Self {
            lts,
            row_size: Self::get_row_size(states),
            partition: Vec::new(),
            relation: BinaryRelation::with_growth(states),
            next: (0..states).collect(),
            prev: (0..states).collect(),
            block_of: vec![0; states],
            queue: Vec::new(),
            key: Rc::new(Vec::new()),
            label_map: Rc::new(Vec::new()),
        }
    }

    fn is_partition(partition: &[Vec<usize>], states: usize) -> Result<(), InputError> {
        let mut seen = vec![false; states];
        for class in partition {
            for &state in class {
                if state >= states || seen[state] {
                    debug!(state, "state appears in more than one block or is out of range");
                    return Err(InputError::NotAPartition { state });
                }
                seen[state] = true;
            }
        }
        if let Some(state) = seen.iter().position(|&covered| !covered) {
            debug!(state, "state does not appear in any block");
            return Err(InputError::NotAPartition { state });
        }
        Ok(())
    }

    fn is_consistent(partition: &[Vec<usize>], relation: &BinaryRelation) -> Result<(), InputError> {
        if partition.len() != relation.size() {
            debug!("partition and relation sizes differ");
            return Err(InputError::RelationSizeMismatch {
                relation_size: relation.size(),
                partition_size: partition.len(),
            });
        }
        for block in 0..relation.size() {
            if !relation.get(block, block) {
                debug!(block, "relation is not reflexive");
                return Err(InputError::NotReflexive { block });
            }
        }
        Ok(())
    }

    /// States of the circular list starting at `head`, `size` of them.
    fn chain_states(&self, head: usize, size: usize) -> Vec<usize> {
        let mut states = Vec::with_capacity(size);
        let mut current = head;
        for _ in 0..size {
            states.push(current);
            current = self.next[current];
        }
        debug_assert_eq!(current, head, "state list is circular");
        states
    }

    fn block_states(&self, block: usize) -> Vec<usize> {
        self.chain_states(self.partition[block].head, self.partition[block].size)
    }

    fn make_block(&mut self, states: &[usize], index: usize) {
        debug_assert!(!states.is_empty(), "blocks are nonempty");
        let mut previous = *states.last().expect("nonempty block");
        for &state in states {
            self.next[previous] = state;
            self.prev[state] = previous;
            previous = state;
        }
        let mut inset = SmartSet::new(self.lts.labels());
        for &state in states {
            for label in self.lts.bw_labels(state) {
                inset.add(label);
            }
            self.block_of[state] = index;
        }
        self.partition.push(Block {
            head: states[0],
            size: states.len(),
            inset,
            remove: vec![None; self.lts.labels()],
            counter: SharedCounter::new(
                Rc::clone(&self.key),
                Rc::clone(&self.label_map),
                self.row_size,
                self.lts.states(),
            ),
            tmp: Vec::new(),
        });
    }

    /// Severs the states previously deposited in the block's tmp array into
    /// a fresh circular list, unless they are the whole block. Returns the
    /// new list's head and size.
    fn try_split(&mut self, block: usize) -> Option<(usize, usize)> {
        let mut tmp = std::mem::take(&mut self.partition[block].tmp);
        debug_assert!(!tmp.is_empty());
        if tmp.len() == self.partition[block].size {
            return None;
        }

        let last = tmp.pop().expect("tmp is nonempty");
        self.partition[block].head = self.next[last];
        let (p, n) = (self.prev[last], self.next[last]);
        self.next[p] = n;
        self.prev[n] = p;

        if tmp.is_empty() {
            self.next[last] = last;
            self.prev[last] = last;
            self.partition[block].size -= 1;
            return Some((last, 1));
        }

        let mut chain_end = last;
        for &state in &tmp {
            self.partition[block].head = self.next[state];
            let (p, n) = (self.prev[state], self.next[state]);
            self.next[p] = n;
            self.prev[n] = p;
            self.next[chain_end] = state;
            self.prev[state] = chain_end;
            chain_end = state;
        }
        self.next[chain_end] = last;
        self.prev[last] = chain_end;

        let moved = tmp.len() + 1;
        self.partition[block].size -= moved;
        Some((last, moved))
    }

    /// Creates a block derived from `parent` out of a severed state list,
    /// moving the affected inset counts over.
    fn make_derived_block(&mut self, parent: usize, head: usize, size: usize) -> usize {
        let index = self.partition.len();
        let states = self.chain_states(head, size);
        let lts = self.lts;
        let mut inset = SmartSet::new(lts.labels());
        for &state in &states {
            for label in lts.bw_labels(state) {
                self.partition[parent].inset.remove_strict(label);
                inset.add(label);
            }
            self.block_of[state] = index;
        }
        self.partition.push(Block {
            head,
            size,
            inset,
            remove: vec![None; lts.labels()],
            counter: SharedCounter::new(
                Rc::clone(&self.key),
                Rc::clone(&self.label_map),
                self.row_size,
                lts.states(),
            ),
            tmp: Vec::new(),
        });
        index
    }

    /// Deposits `remove` states into their blocks' tmp arrays and returns
    /// the distinct touched blocks.
    fn internal_split(&mut self, remove: &[usize]) -> Vec<usize> {
        let mut modified = Vec::new();
        let mut mask = vec![false; self.partition.len()];
        for &state in remove {
            let block = self.block_of[state];
            self.partition[block].tmp.push(state);
            if !mask[block] {
                mask[block] = true;
                modified.push(block);
            }
        }
        modified
    }

    /// Initial refinement splitting: no counters or remove lists exist yet.
    fn fast_split(&mut self, remove: &[usize]) {
        for block in self.internal_split(remove) {
            if let Some((head, size)) = self.try_split(block) {
                self.make_derived_block(block, head, size);
                self.relation.split(block);
            }
        }
    }

    /// Main-loop splitting: derived blocks inherit counters, remove lists
    /// and queue entries from their parents; both sides of a severed remove
    /// set are marked in `remove_mask`.
    fn split(&mut self, remove_mask: &mut [bool], remove: &[usize]) {
        for block in self.internal_split(remove) {
            match self.try_split(block) {
                None => remove_mask[block] = true,
                Some((head, size)) => {
                    let child = self.make_derived_block(block, head, size);
                    self.relation.split(block);
                    remove_mask[child] = true;

                    let parent_counter = self.partition[block].counter.clone();
                    let child_block = &mut self.partition[child];
                    child_block.counter.copy_labels(&child_block.inset, &parent_counter);

                    let child_labels: Vec<usize> =
                        self.partition[child].inset.iter().copied().collect();
                    for label in child_labels {
                        if let Some(list) = self.partition[block].remove[label].clone() {
                            self.queue.push((child, label));
                            self.partition[child].remove[label] = Some(list);
                        }
                    }
                }
            }
        }
    }

    fn enqueue_to_remove(&mut self, block: usize, label: usize, state: usize) {
        if self.partition[block].remove[label].is_none() {
            self.partition[block].remove[label] = Some(Rc::new(Vec::new()));
            self.queue.push((block, label));
        }
        let list = self.partition[block].remove[label]
            .as_mut()
            .expect("list was just ensured");
        Rc::make_mut(list).push(state);
    }

    /// Distinct blocks with a `label`-edge into the given states.
    fn build_pre(&self, states: &[usize], label: usize) -> Vec<usize> {
        let mut mask = vec![false; self.partition.len()];
        let mut pre_list = Vec::new();
        for &state in states {
            for &predecessor in self.lts.pre(label, state) {
                let block = self.block_of[predecessor];
                if !mask[block] {
                    mask[block] = true;
                    pre_list.push(block);
                }
            }
        }
        pre_list
    }

    fn process_remove(&mut self, block: usize, label: usize) {
        let lts = self.lts;
        let remove = self.partition[block].remove[label]
            .take()
            .expect("queued pair has a remove list");

        // Predecessor blocks are computed against the pre-split membership.
        let block_states = self.block_states(block);
        let pre_list = self.build_pre(&block_states, label);

        let mut remove_mask = vec![false; self.lts.states()];
        self.split(&mut remove_mask, &remove);
        drop(remove);

        for b1 in pre_list {
            for col in self.relation.row(b1) {
                if !remove_mask[col] {
                    continue;
                }
                debug_assert_ne!(b1, col, "the diagonal is never erased");
                self.relation.set(b1, col, false);

                let b2_states = self.block_states(col);
                let b2_labels: Vec<usize> = self.partition[col].inset.iter().copied().collect();
                for a in b2_labels {
                    if !self.partition[b1].inset.contains(a) {
                        continue;
                    }
                    for &state in &b2_states {
                        for &predecessor in lts.pre(a, state) {
                            if self.partition[b1].counter.decr(a, predecessor) == 0 {
                                self.enqueue_to_remove(b1, a, predecessor);
                            }
                        }
                    }
                }
            }
        }
    }

    fn init(
        &mut self,
        partition: &[Vec<usize>],
        relation: &BinaryRelation,
    ) -> Result<(), InputError> {
        Self::is_partition(partition, self.lts.states())?;
        Self::is_consistent(partition, relation)?;

        let labels = self.lts.labels();
        let states = self.lts.states();
        let delta1 = self.lts.build_delta1();

        // Slot layout of the shared counters: consecutive slots per label,
        // one for each state with a successor on it.
        let mut key = vec![usize::MAX; labels * states];
        let mut label_map = vec![(0usize, 0usize); labels];
        let mut slot = 0;
        for label in 0..labels {
            label_map[label].0 = slot / self.row_size;
            label_map[label].1 = if delta1[label].is_empty() {
                label_map[label].0
            } else {
                (slot + delta1[label].len() - 1) / self.row_size + 1
            };
            for &state in delta1[label].iter() {
                key[label * states + state] = slot;
                slot += 1;
            }
        }
        self.key = Rc::new(key);
        self.label_map = Rc::new(label_map);

        for (index, class) in partition.iter().enumerate() {
            self.make_block(class, index);
        }
        for _ in 0..partition.len() {
            self.relation.extend();
        }
        for row in 0..relation.size() {
            for col in 0..relation.size() {
                if relation.get(row, col) {
                    self.relation.set(row, col, true);
                }
            }
        }

        // Initial refinement: split every block by "has a successor on a".
        for label in 0..labels {
            let support: Vec<usize> = delta1[label].iter().copied().collect();
            if !support.is_empty() {
                self.fast_split(&support);
            }
        }
        debug_assert_eq!(self.relation.size(), self.partition.len());

        // Prune the relation: a block whose states have successors on a
        // label cannot be simulated by a block whose states have none.
        let block_count = self.partition.len();
        let mut pre: Vec<Vec<usize>> = vec![Vec::new(); block_count];
        let mut no_pre_mask: Vec<Vec<bool>> = vec![vec![false; block_count]; labels];
        for block in 0..block_count {
            for &state in &self.block_states(block) {
                for (label, delta) in delta1.iter().enumerate() {
                    if delta.contains(state) {
                        pre[block].push(label);
                    } else {
                        no_pre_mask[label][block] = true;
                    }
                }
            }
        }
        for b1 in 0..block_count {
            for &label in &pre[b1] {
                for col in self.relation.row(b1) {
                    if no_pre_mask[label][col] {
                        debug_assert_ne!(b1, col);
                        self.relation.set(b1, col, false);
                    }
                }
            }
        }

        // Counter initialization and the initial remove lists.
        let mut scratch = SmartSet::new(states);
        for b1 in 0..block_count {
            let row = self.relation.row(b1);
            let mut related = vec![false; block_count];
            for &col in &row {
                related[col] = true;
            }

            let inset_labels: Vec<usize> = self.partition[b1].inset.iter().copied().collect();
            let counter_rows = inset_labels
                .iter()
                .map(|&label| self.label_map[label].1)
                .max()
                .unwrap_or(0);
            self.partition[b1].counter.resize(counter_rows);

            for &label in &inset_labels {
                for &state in delta1[label].iter() {
                    let count = self
                        .lts
                        .post(label, state)
                        .iter()
                        .filter(|&&successor| related[self.block_of[successor]])
                        .count();
                    if count > 0 {
                        self.partition[b1].counter.set(label, state, count);
                    }
                }

                // Remove list: support states with no successor into the row.
                scratch.assign_flat(&delta1[label]);
                for &col in &row {
                    for &state in &self.block_states(col) {
                        for &predecessor in self.lts.pre(label, state) {
                            scratch.remove(predecessor);
                        }
                    }
                }
                if !scratch.is_empty() {
                    self.partition[b1].remove[label] =
                        Some(Rc::new(scratch.iter().copied().collect()));
                    self.queue.push((b1, label));
                }
            }
        }

        debug!(
            blocks = self.partition.len(),
            queued = self.queue.len(),
            "simulation engine initialized"
        );
        Ok(())
    }

    fn run(&mut self) {
        while let Some((block, label)) = self.queue.pop() {
            self.process_remove(block, label);
        }
    }

    /// Expands the block relation to all state pairs below `size`.
    fn build_result(&self, size: usize) -> BinaryRelation {
        let mut result = BinaryRelation::new(size, false);
        let members: Vec<Vec<usize>> = (0..self.partition.len())
            .map(|block| {
                self.block_states(block)
                    .into_iter()
                    .filter(|&state| state < size)
                    .collect()
            })
            .collect();
        for row in 0..self.relation.size() {
            for col in self.relation.row(row) {
                for &left in &members[row] {
                    for &right in &members[col] {
                        result.set(left, right, true);
                    }
                }
            }
        }
        result
    }
}
