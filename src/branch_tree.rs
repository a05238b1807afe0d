// Copyright (c) 2026 MIPS-Memview Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Nesting structure of the branches visible in one window.
//!
//! Nodes live in an arena and refer to each other by index. The builder is
//! fed every row in address order and keeps a single "open" branch: new
//! branches become children of it, and it is closed once the walk reaches
//! its target.

use serde::Serialize;

use crate::decoder::DecodedInstruction;
use crate::layout::branch_color;
use crate::palette::Rgba;
use crate::target;

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchNode {
    pub from: u32,
    pub to: u32,
    /// Assigned by the layout pass.
    pub depth: Option<u32>,
    pub children: Vec<NodeId>,
    /// Only used to close branches; traversal always goes through `children`.
    pub parent: Option<NodeId>,
    pub color: Rgba,
}

impl BranchNode {
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    /// `[low, high]` regardless of branch direction.
    pub fn span(&self) -> (u32, u32) {
        (self.from.min(self.to), self.from.max(self.to))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BranchForest {
    nodes: Vec<BranchNode>,
    roots: Vec<NodeId>,
}

impl BranchForest {
    pub fn nodes(&self) -> &[BranchNode] {
        &self.nodes
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &BranchNode {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut BranchNode {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first, children in insertion order. This is the order both
    /// layout passes walk in.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        out
    }
}

#[derive(Debug, Default)]
pub struct BranchTreeBuilder {
    forest: BranchForest,
    open: Option<NodeId>,
}

impl BranchTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) -> Option<NodeId> {
        self.open
    }

    /// Close every open branch that `address` finishes.
    ///
    /// Nothing closes unless the innermost open branch targets exactly
    /// `address`. Once it does, enclosing branches whose target is at or
    /// behind `address` close as well: a target inside another branch's
    /// delay slot ends both at once.
    fn close_at(&mut self, address: u32) {
        let Some(open) = self.open else {
            return;
        };
        if self.forest.nodes[open].to != address {
            return;
        }
        self.open = self.forest.nodes[open].parent;
        while let Some(id) = self.open {
            if self.forest.nodes[id].to > address {
                break;
            }
            self.open = self.forest.nodes[id].parent;
        }
    }

    /// Feed the row at `address`. `target` is the resolved destination when
    /// the row is a tracked branch. Returns the new node, if any.
    pub fn observe(&mut self, address: u32, target: Option<u32>) -> Option<NodeId> {
        self.close_at(address);
        let to = target?;

        let id = self.forest.nodes.len();
        self.forest.nodes.push(BranchNode {
            from: address,
            to,
            depth: None,
            children: Vec::new(),
            parent: self.open,
            color: branch_color(address),
        });
        match self.open {
            Some(parent) => self.forest.nodes[parent].children.push(id),
            None => self.forest.roots.push(id),
        }
        self.open = Some(id);
        Some(id)
    }

    /// Only PC-relative branches open a node. Absolute jumps usually leave
    /// the window, so they are shown as text only.
    pub fn observe_instruction(
        &mut self,
        address: u32,
        insn: &DecodedInstruction,
    ) -> Option<NodeId> {
        let target = insn
            .branch_offset()
            .map(|raw| target::branch_target(address, raw));
        self.observe(address, target)
    }

    pub fn finish(self) -> BranchForest {
        self.forest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;

    fn build(rows: &[(u32, Option<u32>)]) -> (BranchForest, Option<NodeId>) {
        let mut b = BranchTreeBuilder::new();
        for (addr, target) in rows {
            b.observe(*addr, *target);
        }
        let open = b.open();
        (b.finish(), open)
    }

    fn linear(start: u32, end: u32, branches: &[(u32, u32)]) -> Vec<(u32, Option<u32>)> {
        (start..end)
            .step_by(4)
            .map(|a| (a, branches.iter().find(|b| b.0 == a).map(|b| b.1)))
            .collect()
    }

    #[test]
    fn nested_branch_becomes_child() {
        let rows = linear(0x1000, 0x1030, &[(0x1000, 0x1020), (0x1008, 0x1010)]);
        let (forest, open) = build(&rows);
        assert_eq!(forest.roots(), &[0]);
        assert_eq!(forest.node(0).children, vec![1]);
        assert_eq!(forest.node(1).parent, Some(0));
        assert_eq!(open, None);
    }

    #[test]
    fn delay_slot_target_closes_both_in_one_step() {
        // inner targets the word after the outer branch's target
        let mut b = BranchTreeBuilder::new();
        b.observe(0x1000, Some(0x100C));
        b.observe(0x1004, None);
        b.observe(0x1008, Some(0x1010));
        b.observe(0x100C, None);
        assert_eq!(b.open(), Some(1));
        b.observe(0x1010, None);
        assert_eq!(b.open(), None);

        // the next branch starts a fresh root
        b.observe(0x1014, Some(0x1020));
        let forest = b.finish();
        assert_eq!(forest.roots(), &[0, 2]);
    }

    #[test]
    fn disjoint_siblings() {
        let rows = linear(
            0x1000,
            0x1040,
            &[(0x1000, 0x1030), (0x1004, 0x100C), (0x1010, 0x1018)],
        );
        let (forest, _) = build(&rows);
        assert_eq!(forest.node(0).children, vec![1, 2]);
        for pair in forest.node(0).children.windows(2) {
            let (a, b) = (forest.node(pair[0]).span(), forest.node(pair[1]).span());
            assert!(a.1 <= b.0, "{:?} overlaps {:?}", a, b);
        }
    }

    #[test]
    fn off_window_target_is_never_closed() {
        let rows = linear(0x1000, 0x1020, &[(0x1004, 0x9000), (0x1008, 0x1010)]);
        let (forest, open) = build(&rows);
        assert_eq!(forest.len(), 2);
        assert_eq!(open, Some(0));
        assert_eq!(forest.node(1).parent, Some(0));
    }

    #[test]
    fn backward_and_self_loop_still_open() {
        let mut b = BranchTreeBuilder::new();
        b.observe(0x1010, Some(0x1000));
        assert_eq!(b.open(), Some(0));
        b.observe(0x1014, Some(0x1014));
        let forest = b.finish();
        assert!(forest.node(1).is_self_loop());
        assert_eq!(forest.node(1).parent, Some(0));
        assert_eq!(forest.node(0).span(), (0x1000, 0x1010));
    }

    #[test]
    fn identical_input_identical_forest() {
        let rows = linear(
            0x8000_0000,
            0x8000_0040,
            &[(0x8000_0000, 0x8000_0020), (0x8000_0008, 0x8000_0010)],
        );
        assert_eq!(build(&rows), build(&rows));
    }

    #[test]
    fn only_relative_branches_open_nodes() {
        let mut b = BranchTreeBuilder::new();
        assert_eq!(
            b.observe_instruction(0x8000_0000, &decode(0x1044_0003).unwrap()),
            Some(0)
        );
        // jal 0x80001000
        assert_eq!(
            b.observe_instruction(0x8000_0004, &decode(0x0C00_0400).unwrap()),
            None
        );
        let forest = b.finish();
        assert_eq!(forest.node(0).to, 0x8000_0010);
    }

    #[test]
    fn preorder_visits_children_after_parent() {
        let rows = linear(
            0x1000,
            0x1040,
            &[(0x1000, 0x1030), (0x1004, 0x100C), (0x1010, 0x1018), (0x1034, 0x1038)],
        );
        let (forest, _) = build(&rows);
        assert_eq!(forest.preorder(), vec![0, 1, 2, 3]);
    }
}
