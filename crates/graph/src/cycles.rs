//! Import cycle detection over the unit dependency graph.

use crate::builder::DependencyEdge;
use crate::unit::SourceUnit;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::HashMap;

/// Units forming one strongly connected component of size two or more
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    /// Members in path order
    pub units: Vec<String>,
}

impl Cycle {
    pub fn contains(&self, path: &str) -> bool {
        self.units.iter().any(|u| u == path)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CycleReport {
    pub cycles: Vec<Cycle>,
    /// Units importing themselves: degenerate one-node cycles
    pub self_imports: Vec<String>,
}

/// State for Tarjan's strongly connected components algorithm
struct TarjanState {
    index_counter: usize,
    stack: Vec<NodeIndex>,
    indices: HashMap<NodeIndex, usize>,
    lowlinks: HashMap<NodeIndex, usize>,
    on_stack: HashMap<NodeIndex, bool>,
    /// Components paired with the discovery index of their root
    components: Vec<(usize, Vec<NodeIndex>)>,
}

/// One pending node of the depth-first search
struct DfsFrame {
    node: NodeIndex,
    successors: Vec<NodeIndex>,
    /// Next successor to visit
    cursor: usize,
}

/// Unit dependency graph with nodes inserted in path order
pub(crate) struct UnitGraph {
    graph: DiGraph<String, usize>,
}

impl UnitGraph {
    /// `units` must be sorted by path
    pub fn new(units: &[SourceUnit], edges: &[DependencyEdge]) -> Self {
        let mut graph = DiGraph::with_capacity(units.len(), edges.len());
        let mut nodes = HashMap::with_capacity(units.len());
        for unit in units {
            nodes.insert(unit.path.as_str(), graph.add_node(unit.path.clone()));
        }
        for edge in edges {
            if let (Some(&from), Some(&to)) =
                (nodes.get(edge.from.as_str()), nodes.get(edge.to.as_str()))
            {
                graph.add_edge(from, to, edge.import_count);
            }
        }
        Self { graph }
    }

    /// Find all cycles and self-imports.
    ///
    /// The DFS starts from nodes in path order and visits successors in path
    /// order; components are reported in the order their root was discovered.
    pub fn detect(&self) -> CycleReport {
        let mut state = TarjanState {
            index_counter: 0,
            stack: Vec::new(),
            indices: HashMap::new(),
            lowlinks: HashMap::new(),
            on_stack: HashMap::new(),
            components: Vec::new(),
        };

        for node in self.graph.node_indices() {
            if !state.indices.contains_key(&node) {
                self.strongconnect(node, &mut state);
            }
        }

        state.components.sort_by_key(|(root_index, _)| *root_index);
        let cycles = state
            .components
            .into_iter()
            .map(|(_, component)| {
                let mut units: Vec<String> = component
                    .into_iter()
                    .map(|idx| self.graph[idx].clone())
                    .collect();
                units.sort();
                Cycle { units }
            })
            .collect();

        let self_imports = self
            .graph
            .node_indices()
            .filter(|&node| self.graph.contains_edge(node, node))
            .map(|node| self.graph[node].clone())
            .collect();

        CycleReport {
            cycles,
            self_imports,
        }
    }

    /// Visit `root` and everything reachable from it. The DFS keeps its own
    /// frame stack so import chain depth is bounded by memory, not the thread stack.
    fn strongconnect(&self, root: NodeIndex, state: &mut TarjanState) {
        let mut frames = vec![self.enter(root, state)];

        while let Some(frame) = frames.last_mut() {
            let v = frame.node;
            let next = frame.successors.get(frame.cursor).copied();
            if let Some(w) = next {
                frame.cursor += 1;
                if !state.indices.contains_key(&w) {
                    frames.push(self.enter(w, state));
                } else if state.on_stack.get(&w).copied().unwrap_or(false) {
                    let low = state.lowlinks[&v].min(state.indices[&w]);
                    state.lowlinks.insert(v, low);
                }
                continue;
            }

            frames.pop();
            if state.lowlinks[&v] == state.indices[&v] {
                let component = pop_component(&mut state.stack, &mut state.on_stack, v);
                if component.len() > 1 {
                    state.components.push((state.indices[&v], component));
                }
            }
            if let Some(parent) = frames.last() {
                let low = state.lowlinks[&parent.node].min(state.lowlinks[&v]);
                state.lowlinks.insert(parent.node, low);
            }
        }
    }

    /// Assign `v` its discovery index and push it on the Tarjan stack
    fn enter(&self, v: NodeIndex, state: &mut TarjanState) -> DfsFrame {
        state.indices.insert(v, state.index_counter);
        state.lowlinks.insert(v, state.index_counter);
        state.index_counter += 1;
        state.stack.push(v);
        state.on_stack.insert(v, true);

        // petgraph yields neighbors newest-edge first; node order is path order
        let mut successors: Vec<NodeIndex> = self.graph.neighbors(v).collect();
        successors.sort();
        successors.dedup();

        DfsFrame {
            node: v,
            successors,
            cursor: 0,
        }
    }
}

fn pop_component(
    stack: &mut Vec<NodeIndex>,
    on_stack: &mut HashMap<NodeIndex, bool>,
    v: NodeIndex,
) -> Vec<NodeIndex> {
    let mut component = Vec::new();
    while let Some(w) = stack.pop() {
        on_stack.insert(w, false);
        component.push(w);
        if w == v {
            break;
        }
    }
    component
}
