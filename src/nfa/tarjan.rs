use crate::nfa::{Nfa, State};

/// Callbacks of the non-recursive Tarjan SCC walker.
///
/// Every method has a no-op default; `state_discover` and `scc_discover`
/// return true to stop the traversal early.
pub trait TarjanVisitor {
    /// A state is discovered for the first time.
    fn state_discover(&mut self, _state: State) -> bool {
        false
    }

    /// An edge to a successor is examined.
    fn succ_state_discover(&mut self, _source: State, _target: State) {}

    /// Called per state of an SCC that is being closed.
    fn scc_state_discover(&mut self, _state: State) {}

    /// An SCC has been closed. The current Tarjan stack is passed so clients
    /// can propagate information to the states that reach the closed SCC.
    fn scc_discover(&mut self, _scc: &[State], _tarjan_stack: &[State]) -> bool {
        false
    }
}

/// Per-state bookkeeping of the walker: Tarjan's discovery metadata plus the
/// position of the iteration through the successors.
#[derive(Clone, Default)]
struct TarjanNodeData {
    // Position inside the state post: (symbol post, target) indices.
    post_index: usize,
    target_index: usize,
    // Discovery-time index; lowlink is the least index reachable over
    // tree and back edges.
    index: usize,
    lowlink: usize,
    initialized: bool,
    on_stack: bool,
}

impl Nfa {
    /// Non-recursive Tarjan traversal from the initial states.
    ///
    /// The recursion of `strongconnect` is simulated by a program stack; a
    /// state stays on it until all its successors are processed. SCCs are
    /// closed in post-order of the DFS tree.
    pub fn tarjan_scc_discover(&self, visitor: &mut impl TarjanVisitor) {
        let num_of_states = self.num_of_states();
        let mut nodes: Vec<TarjanNodeData> = vec![TarjanNodeData::default(); num_of_states];
        let mut program_stack: Vec<State> = Vec::new();
        let mut tarjan_stack: Vec<State> = Vec::new();
        let mut index_counter = 0;

        for &initial in &self.initial {
            program_stack.push(initial);
        }

        while let Some(&current) = program_stack.last() {
            // Initialized but no longer on the Tarjan stack: this initial
            // state was already reached from another initial state.
            if nodes[current].initialized && !nodes[current].on_stack {
                program_stack.pop();
                continue;
            }

            if !nodes[current].initialized {
                // The first phase of strongconnect(current).
                let node = &mut nodes[current];
                node.initialized = true;
                node.on_stack = true;
                node.index = index_counter;
                node.lowlink = index_counter;
                index_counter += 1;
                tarjan_stack.push(current);
                if visitor.state_discover(current) {
                    return;
                }
            } else {
                // Return from a simulated recursive call: fold the
                // successor's lowlink in and move past it.
                let successor = self
                    .current_successor(current, &nodes[current])
                    .expect("resumed node has a current successor");
                let successor_lowlink = nodes[successor].lowlink;
                nodes[current].lowlink = nodes[current].lowlink.min(successor_lowlink);
                self.advance_successor(current, &mut nodes[current]);
            }

            // Iterate over the remaining outgoing edges.
            let mut descended = false;
            while let Some(successor) = self.current_successor(current, &nodes[current]) {
                visitor.succ_state_discover(current, successor);
                if !nodes[successor].initialized {
                    program_stack.push(successor);
                    descended = true;
                    break;
                }
                if nodes[successor].on_stack {
                    let successor_index = nodes[successor].index;
                    nodes[current].lowlink = nodes[current].lowlink.min(successor_index);
                }
                self.advance_successor(current, &mut nodes[current]);
            }
            if descended {
                continue;
            }

            // Root of an SCC: pop the component off the Tarjan stack.
            if nodes[current].lowlink == nodes[current].index {
                let mut scc = Vec::new();
                loop {
                    let member = tarjan_stack.pop().expect("SCC root is on the Tarjan stack");
                    nodes[member].on_stack = false;
                    visitor.scc_state_discover(member);
                    scc.push(member);
                    if member == current {
                        break;
                    }
                }
                if visitor.scc_discover(&scc, &tarjan_stack) {
                    return;
                }
            }
            program_stack.pop();
        }
    }

    fn current_successor(&self, state: State, node: &TarjanNodeData) -> Option<State> {
        let posts = self.delta.state_post(state).as_slice();
        let symbol_post = posts.get(node.post_index)?;
        symbol_post.targets.as_slice().get(node.target_index).copied()
    }

    fn advance_successor(&self, state: State, node: &mut TarjanNodeData) {
        let posts = self.delta.state_post(state).as_slice();
        node.target_index += 1;
        if let Some(symbol_post) = posts.get(node.post_index) {
            if node.target_index >= symbol_post.num_of_targets() {
                node.post_index += 1;
                node.target_index = 0;
            }
        }
    }

    /// Useful states: reachable from an initial state and co-reachable from
    /// an accepting one, computed in a single Tarjan traversal propagating a
    /// "can reach accepting" flag through closed SCCs and up the stack.
    pub fn get_useful_states(&self) -> Vec<bool> {
        struct UsefulVisitor<'a> {
            nfa: &'a Nfa,
            useful: Vec<bool>,
            accepting_scc: bool,
        }

        impl TarjanVisitor for UsefulVisitor<'_> {
            fn state_discover(&mut self, state: State) -> bool {
                if self.nfa.accepting.contains(state) {
                    self.useful[state] = true;
                }
                false
            }

            fn succ_state_discover(&mut self, source: State, target: State) {
                if self.useful[target] {
                    self.useful[source] = true;
                }
            }

            fn scc_state_discover(&mut self, state: State) {
                if self.useful[state] {
                    self.accepting_scc = true;
                }
            }

            fn scc_discover(&mut self, scc: &[State], tarjan_stack: &[State]) -> bool {
                if self.accepting_scc {
                    for &member in scc {
                        self.useful[member] = true;
                    }
                    // States deeper on the stack reach this SCC; propagate
                    // until an already-useful state is found.
                    for &below in tarjan_stack.iter().rev() {
                        if self.useful[below] {
                            break;
                        }
                        self.useful[below] = true;
                    }
                }
                self.accepting_scc = false;
                false
            }
        }

        let mut visitor = UsefulVisitor {
            nfa: self,
            useful: vec![false; self.num_of_states()],
            accepting_scc: false,
        };
        self.tarjan_scc_discover(&mut visitor);
        visitor.useful
    }

    /// Emptiness via the Tarjan walker, stopping at the first accepting
    /// state discovered reachable.
    pub fn is_lang_empty_scc(&self) -> bool {
        struct EmptinessVisitor<'a> {
            nfa: &'a Nfa,
            accepting_reached: bool,
        }

        impl TarjanVisitor for EmptinessVisitor<'_> {
            fn state_discover(&mut self, state: State) -> bool {
                if self.nfa.accepting.contains(state) {
                    self.accepting_reached = true;
                    return true;
                }
                false
            }
        }

        let mut visitor = EmptinessVisitor {
            nfa: self,
            accepting_reached: false,
        };
        self.tarjan_scc_discover(&mut visitor);
        !visitor.accepting_reached
    }

    /// Is the reachable part of the automaton free of cycles? Any SCC of
    /// more than one state, or any self-loop, answers no.
    pub fn is_acyclic(&self) -> bool {
        struct AcyclicityVisitor<'a> {
            nfa: &'a Nfa,
            acyclic: bool,
        }

        impl TarjanVisitor for AcyclicityVisitor<'_> {
            fn scc_discover(&mut self, scc: &[State], _tarjan_stack: &[State]) -> bool {
                if scc.len() > 1 {
                    self.acyclic = false;
                    return true;
                }
                let state = scc[0];
                for symbol_post in self.nfa.delta.state_post(state) {
                    if symbol_post.targets.contains(&state) {
                        self.acyclic = false;
                        return true;
                    }
                }
                false
            }
        }

        let mut visitor = AcyclicityVisitor {
            nfa: self,
            acyclic: true,
        };
        self.tarjan_scc_discover(&mut visitor);
        visitor.acyclic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SccCollector {
        sccs: Vec<Vec<State>>,
        discovered: Vec<State>,
    }

    impl TarjanVisitor for SccCollector {
        fn state_discover(&mut self, state: State) -> bool {
            self.discovered.push(state);
            false
        }

        fn scc_discover(&mut self, scc: &[State], _tarjan_stack: &[State]) -> bool {
            let mut scc = scc.to_vec();
            scc.sort_unstable();
            self.sccs.push(scc);
            false
        }
    }

    #[test]
    fn test_sccs_close_in_post_order() {
        // 0 -> 1 <-> 2, 1 -> 3: the sink SCC {3} closes before {1, 2},
        // which closes before {0}.
        let mut nfa = Nfa::new();
        nfa.initial.insert(0);
        nfa.delta.add(0, 0, 1);
        nfa.delta.add(1, 0, 2);
        nfa.delta.add(2, 0, 1);
        nfa.delta.add(1, 1, 3);

        let mut collector = SccCollector {
            sccs: Vec::new(),
            discovered: Vec::new(),
        };
        nfa.tarjan_scc_discover(&mut collector);

        assert_eq!(collector.discovered, vec![0, 1, 2, 3]);
        assert_eq!(collector.sccs, vec![vec![3], vec![1, 2], vec![0]]);
    }

    #[test]
    fn test_early_stop_on_state_discover() {
        struct StopAtFirst {
            seen: usize,
        }
        impl TarjanVisitor for StopAtFirst {
            fn state_discover(&mut self, _state: State) -> bool {
                self.seen += 1;
                true
            }
        }

        let mut nfa = Nfa::new();
        nfa.initial.insert(0);
        nfa.delta.add(0, 0, 1);
        nfa.delta.add(1, 0, 2);

        let mut visitor = StopAtFirst { seen: 0 };
        nfa.tarjan_scc_discover(&mut visitor);
        assert_eq!(visitor.seen, 1, "traversal stops at the first discovery");
    }

    #[test]
    fn test_unreachable_states_are_not_visited() {
        let mut nfa = Nfa::new();
        nfa.initial.insert(0);
        nfa.delta.add(0, 0, 1);
        nfa.delta.add(2, 0, 3); // disconnected component

        let mut collector = SccCollector {
            sccs: Vec::new(),
            discovered: Vec::new(),
        };
        nfa.tarjan_scc_discover(&mut collector);
        assert_eq!(collector.discovered, vec![0, 1]);
    }

    #[test]
    fn test_useful_states_through_cycles() {
        // A cycle that reaches an accepting state makes the whole cycle and
        // everything leading into it useful.
        let mut nfa = Nfa::new();
        nfa.initial.insert(0);
        nfa.accepting.insert(3);
        nfa.delta.add(0, 0, 1);
        nfa.delta.add(1, 0, 2);
        nfa.delta.add(2, 0, 1);
        nfa.delta.add(2, 0, 3);
        nfa.delta.add(3, 0, 4); // dead tail

        assert_eq!(
            nfa.get_useful_states(),
            vec![true, true, true, true, false]
        );
    }
}
