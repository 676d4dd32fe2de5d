//! # Dominance Analysis
//!
//! A node X dominates a node Y if every path from the entry node to Y must
//! pass through X. The immediate dominator of a node is its closest
//! dominator (excluding itself).
//!
//! Loop detection relies on this: an edge `latch -> header` is a back edge
//! exactly when `header` dominates `latch`.

use hls_compiler_ir::{BasicBlockId, Function};
use rustc_hash::{FxHashMap, FxHashSet};

/// Immediate dominators of every block reachable from the entry
///
/// The entry block has no immediate dominator; unreachable blocks are absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DominatorTree {
    entry: BasicBlockId,
    idom: FxHashMap<BasicBlockId, BasicBlockId>,
    /// Reverse postorder of the reachable blocks
    rpo: Vec<BasicBlockId>,
}

impl DominatorTree {
    /// Computes the dominator tree using the Cooper-Harvey-Kennedy algorithm
    ///
    /// ## Algorithm
    /// 1. Compute blocks in reverse postorder (RPO)
    /// 2. Initialize entry block's idom to itself
    /// 3. Iterate until convergence, updating idoms using the intersect function
    pub fn compute(function: &Function) -> Self {
        let entry = function.entry_block;

        let rpo = compute_reverse_postorder(function);
        let rpo_number: FxHashMap<BasicBlockId, usize> =
            rpo.iter().enumerate().map(|(i, &block)| (block, i)).collect();

        let mut idom = FxHashMap::default();
        idom.insert(entry, entry);

        let predecessors = function.predecessor_map();

        let mut changed = true;
        while changed {
            changed = false;

            for &block in rpo.iter().skip(1) {
                let Some(preds) = predecessors.get(&block) else {
                    continue;
                };

                // First predecessor that already has an idom
                let Some(mut new_idom) = preds.iter().copied().find(|p| idom.contains_key(p))
                else {
                    continue;
                };

                for &pred in preds {
                    if idom.contains_key(&pred) && pred != new_idom {
                        new_idom = intersect(pred, new_idom, &idom, &rpo_number);
                    }
                }

                if idom.get(&block) != Some(&new_idom) {
                    idom.insert(block, new_idom);
                    changed = true;
                }
            }
        }

        // Remove self-loop for entry
        idom.remove(&entry);

        Self { entry, idom, rpo }
    }

    /// Returns the immediate dominator of `block`
    pub fn immediate_dominator(&self, block: BasicBlockId) -> Option<BasicBlockId> {
        self.idom.get(&block).copied()
    }

    /// Returns true if `block` is reachable from the entry
    pub fn is_reachable(&self, block: BasicBlockId) -> bool {
        block == self.entry || self.idom.contains_key(&block)
    }

    /// Returns true if `a` dominates `b` (every block dominates itself)
    pub fn dominates(&self, a: BasicBlockId, b: BasicBlockId) -> bool {
        if !self.is_reachable(b) {
            return false;
        }
        let mut current = b;
        loop {
            if current == a {
                return true;
            }
            match self.idom.get(&current) {
                Some(&parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Reachable blocks in reverse postorder
    pub fn reverse_postorder(&self) -> &[BasicBlockId] {
        &self.rpo
    }
}

/// Cooper's intersect function for finding common dominator
fn intersect(
    mut b1: BasicBlockId,
    mut b2: BasicBlockId,
    idom: &FxHashMap<BasicBlockId, BasicBlockId>,
    rpo_number: &FxHashMap<BasicBlockId, usize>,
) -> BasicBlockId {
    while b1 != b2 {
        while rpo_number[&b1] > rpo_number[&b2] {
            b1 = idom[&b1];
        }
        while rpo_number[&b2] > rpo_number[&b1] {
            b2 = idom[&b2];
        }
    }
    b1
}

/// Computes the blocks reachable from the entry in reverse postorder
pub fn compute_reverse_postorder(function: &Function) -> Vec<BasicBlockId> {
    let mut visited = FxHashSet::default();
    let mut postorder = Vec::new();

    fn dfs(
        block: BasicBlockId,
        function: &Function,
        visited: &mut FxHashSet<BasicBlockId>,
        postorder: &mut Vec<BasicBlockId>,
    ) {
        if !visited.insert(block) {
            return;
        }

        if let Some(data) = function.get_basic_block(block) {
            for successor in data.terminator.target_blocks() {
                dfs(successor, function, visited, postorder);
            }
        }

        postorder.push(block);
    }

    dfs(function.entry_block, function, &mut visited, &mut postorder);
    postorder.reverse();
    postorder
}
