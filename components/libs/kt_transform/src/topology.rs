//! Shape checks on the forward edges.
//!
//! Rooting is only unambiguous when the forward edges reachable from the root
//! form a tree. These checks find the two ways that can fail so the graph can
//! report them when it is assembled.

use crate::graph::GraphEdge;
use crate::FrameName;
use kt_rigid_payloads::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction::Incoming;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    /// Some chain of forward edges leads back to where it started.
    pub forward_cycle: bool,
    /// Frames reached by more than one forward edge, with the edge count.
    pub multiple_parents: Vec<(FrameName, usize)>,
}

impl Topology {
    /// A forest of forward edges: every frame has at most one forward parent
    /// and no forward cycle exists.
    pub fn is_forest(&self) -> bool {
        !self.forward_cycle && self.multiple_parents.is_empty()
    }
}

pub(crate) fn analyze(frames: &[FrameName], edges: &[GraphEdge]) -> Topology {
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(frames.len(), edges.len() / 2);
    let nodes: Vec<NodeIndex> = (0..frames.len()).map(|i| graph.add_node(i)).collect();

    for edge in edges
        .iter()
        .filter(|e| e.direction() == Direction::Forward)
    {
        graph.add_edge(nodes[edge.from], nodes[edge.to], ());
    }

    let multiple_parents = nodes
        .iter()
        .filter_map(|&node| {
            let parents = graph.edges_directed(node, Incoming).count();
            (parents > 1).then(|| (frames[graph[node]].clone(), parents))
        })
        .collect();

    Topology {
        forward_cycle: is_cyclic_directed(&graph),
        multiple_parents,
    }
}
