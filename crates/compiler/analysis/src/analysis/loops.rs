//! # Loop Structure
//!
//! Natural loops identified from back edges. An edge `latch -> header` is a
//! back edge when `header` dominates `latch`; the loop body is the header
//! plus every block that reaches a latch without passing through the header.
//! Back edges sharing a header are merged into one loop.

use hls_compiler_ir::{BasicBlockId, Function};
use index_vec::IndexVec;
use rustc_hash::{FxHashMap, FxHashSet};

use super::DominatorTree;

index_vec::define_index_type! {
    /// Identifier of a loop within a `LoopForest`
    pub struct LoopId = usize;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loop {
    pub header: BasicBlockId,
    /// Sources of the back edges into `header`
    pub latches: Vec<BasicBlockId>,
    pub body: FxHashSet<BasicBlockId>,
    /// Closest enclosing loop
    pub parent: Option<LoopId>,
    /// 1 for outermost loops
    pub depth: usize,
}

impl Loop {
    pub fn contains(&self, block: BasicBlockId) -> bool {
        self.body.contains(&block)
    }
}

/// All natural loops of a function
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopForest {
    loops: IndexVec<LoopId, Loop>,
    by_header: FxHashMap<BasicBlockId, LoopId>,
}

impl LoopForest {
    /// Finds the loops of `function`; loop ids follow the reverse postorder
    /// of their headers, so an outer loop always precedes the loops it contains
    pub fn compute(function: &Function, dominators: &DominatorTree) -> Self {
        let mut latches_of: FxHashMap<BasicBlockId, Vec<BasicBlockId>> = FxHashMap::default();
        let mut headers = Vec::new();

        for &block in dominators.reverse_postorder() {
            let Some(data) = function.get_basic_block(block) else {
                continue;
            };
            for successor in data.successors() {
                if dominators.dominates(successor, block) {
                    let latches = latches_of.entry(successor).or_default();
                    if latches.is_empty() {
                        headers.push(successor);
                    }
                    latches.push(block);
                }
            }
        }

        let rpo_index: FxHashMap<BasicBlockId, usize> = dominators
            .reverse_postorder()
            .iter()
            .enumerate()
            .map(|(i, &b)| (b, i))
            .collect();
        headers.sort_by_key(|h| rpo_index[h]);

        let predecessors = function.predecessor_map();
        let mut loops: IndexVec<LoopId, Loop> = IndexVec::new();
        let mut by_header = FxHashMap::default();

        for header in headers {
            let latches = latches_of.remove(&header).unwrap_or_default();
            let body = collect_body(header, &latches, &predecessors, dominators);
            let id = loops.push(Loop {
                header,
                latches,
                body,
                parent: None,
                depth: 1,
            });
            by_header.insert(header, id);
        }

        // The parent is the smallest other loop whose body holds our header
        let parents: Vec<Option<LoopId>> = loops
            .iter_enumerated()
            .map(|(id, lp)| {
                loops
                    .iter_enumerated()
                    .filter(|&(other, candidate)| other != id && candidate.contains(lp.header))
                    .min_by_key(|(_, candidate)| candidate.body.len())
                    .map(|(other, _)| other)
            })
            .collect();
        for (id, parent) in parents.into_iter().enumerate() {
            loops[LoopId::from_usize(id)].parent = parent;
        }

        // Parents precede children, so one forward sweep settles depths
        for index in 0..loops.len() {
            let id = LoopId::from_usize(index);
            if let Some(parent) = loops[id].parent {
                loops[id].depth = loops[parent].depth + 1;
            }
        }

        Self { loops, by_header }
    }

    pub fn get(&self, id: LoopId) -> Option<&Loop> {
        self.loops.get(id)
    }

    pub fn loops(&self) -> impl Iterator<Item = (LoopId, &Loop)> {
        self.loops.iter_enumerated()
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Returns the loop whose header is `block`
    pub fn loop_of_header(&self, block: BasicBlockId) -> Option<LoopId> {
        self.by_header.get(&block).copied()
    }

    /// Returns the deepest loop whose body contains `block`
    pub fn innermost_loop_containing(&self, block: BasicBlockId) -> Option<LoopId> {
        self.loops
            .iter_enumerated()
            .filter(|(_, lp)| lp.contains(block))
            .max_by_key(|(_, lp)| lp.depth)
            .map(|(id, _)| id)
    }

    /// Returns true if `block` belongs to loop `id`
    pub fn contains(&self, id: LoopId, block: BasicBlockId) -> bool {
        self.loops.get(id).is_some_and(|lp| lp.contains(block))
    }

    /// Returns true if `inner` is `outer` or nested inside it
    pub fn is_nested_in(&self, inner: LoopId, outer: LoopId) -> bool {
        let mut current = Some(inner);
        while let Some(id) = current {
            if id == outer {
                return true;
            }
            current = self.loops.get(id).and_then(|lp| lp.parent);
        }
        false
    }
}

/// Walks predecessors backward from the latches, stopping at the header
fn collect_body(
    header: BasicBlockId,
    latches: &[BasicBlockId],
    predecessors: &FxHashMap<BasicBlockId, Vec<BasicBlockId>>,
    dominators: &DominatorTree,
) -> FxHashSet<BasicBlockId> {
    let mut body = FxHashSet::default();
    body.insert(header);

    let mut stack: Vec<BasicBlockId> = latches.to_vec();
    while let Some(block) = stack.pop() {
        if !body.insert(block) {
            continue;
        }
        if let Some(preds) = predecessors.get(&block) {
            stack.extend(
                preds
                    .iter()
                    .copied()
                    .filter(|p| dominators.is_reachable(*p) && !body.contains(p)),
            );
        }
    }
    body
}
