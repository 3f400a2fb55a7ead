//! Graph views over functions and modules.
//!
//! Both graphs are snapshots: they are built from the current state of the IR
//! and are not updated when the IR is mutated afterwards.
use std::collections::BTreeSet;

use petgraph::{
    algo::has_path_connecting,
    prelude::DiGraphMap,
    visit::{Dfs, Walker},
};
use uuid::Uuid;

use crate::modules::{Function, Module, instructions::VxInstr, operand::Label, symbol::FunctionPointer};

/// Control flow graph of a function. Nodes are block labels; an edge `a -> b`
/// exists when the terminator of `a` may transfer control to `b`.
pub fn control_flow_graph(function: &Function) -> DiGraphMap<Label, ()> {
    let mut cfg = DiGraphMap::new();
    for bb in function.body.values() {
        cfg.add_node(bb.label);
        for target in bb.terminator.targets() {
            cfg.add_edge(bb.label, target, ());
        }
    }
    cfg
}

/// Direct call graph of a module.
///
/// Every function (declarations included) is a node, keyed by its UUID. An
/// edge `caller -> callee` exists when `caller` contains at least one call
/// instruction targeting `callee`.
pub struct CallGraph {
    graph: DiGraphMap<Uuid, ()>,
}

impl CallGraph {
    pub fn new(module: &Module) -> Self {
        let mut graph = DiGraphMap::new();
        for function in &module.functions {
            graph.add_node(function.uuid);
        }
        for function in &module.functions {
            for (_, _, instr) in function.instructions() {
                if let VxInstr::Invoke(invoke) = instr {
                    graph.add_edge(function.uuid, invoke.function.0, ());
                }
            }
        }
        Self { graph }
    }

    /// Functions called directly by `caller`.
    pub fn callees(&self, caller: FunctionPointer) -> BTreeSet<FunctionPointer> {
        if !self.graph.contains_node(caller.0) {
            return BTreeSet::new();
        }
        self.graph
            .neighbors_directed(caller.0, petgraph::Direction::Outgoing)
            .map(FunctionPointer)
            .collect()
    }

    /// Functions calling `callee` directly.
    pub fn callers(&self, callee: FunctionPointer) -> BTreeSet<FunctionPointer> {
        if !self.graph.contains_node(callee.0) {
            return BTreeSet::new();
        }
        self.graph
            .neighbors_directed(callee.0, petgraph::Direction::Incoming)
            .map(FunctionPointer)
            .collect()
    }

    /// Every function transitively reachable from `roots`, roots included.
    pub fn reachable_from(
        &self,
        roots: impl IntoIterator<Item = FunctionPointer>,
    ) -> BTreeSet<FunctionPointer> {
        let mut reached = BTreeSet::new();
        for root in roots {
            if !self.graph.contains_node(root.0) {
                continue;
            }
            reached.extend(Dfs::new(&self.graph, root.0).iter(&self.graph).map(FunctionPointer));
        }
        reached
    }

    /// Returns `true` if `function` may call itself, directly or through other functions.
    pub fn is_recursive(&self, function: FunctionPointer) -> bool {
        if !self.graph.contains_node(function.0) {
            return false;
        }
        self.graph
            .neighbors_directed(function.0, petgraph::Direction::Outgoing)
            .any(|callee| has_path_connecting(&self.graph, callee, function.0, None))
    }
}
