//! Cascading deletion of graphs, nodes and edges.
//!
//! Deletion runs in two phases. [`TeardownPlan`] walks the hierarchy
//! read-only and lists every object that has to go, so no iteration is live
//! while the graph is being mutated. [`apply`] then releases the objects in
//! dependency order: edges, nodes, subgraphs (children before parents), and
//! the target last. Each object's handle is unregistered before the object is
//! unlinked from the engine.
//!
//! Node deletion is always global: deleting a subgraph removes its member
//! nodes from the whole hierarchy, not just from the subgraph.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::graph::GraphHierarchy;
use crate::id::{EdgeId, EdgeRef, GraphId, GraphRef, NodeId, NodeRef, RootId};
use crate::registry::{CommandBinder, Registries};

/// What a deletion request was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeardownTarget {
    Edge(EdgeId),
    Node(NodeId),
    Graph(GraphId),
}

/// Every object a deletion request releases, in release order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownPlan {
    pub root: RootId,
    pub target: TeardownTarget,
    pub edges: Vec<EdgeId>,
    pub nodes: Vec<NodeId>,
    /// Graphs to release, children before parents; for a graph target the
    /// target itself comes last.
    pub graphs: Vec<GraphId>,
}

impl TeardownPlan {
    pub fn for_edge(root: RootId, graph: &GraphHierarchy, edge: EdgeId) -> Result<Self, CoreError> {
        if !graph.contains_edge(edge) {
            return Err(CoreError::EdgeNotFound { id: edge });
        }
        Ok(TeardownPlan {
            root,
            target: TeardownTarget::Edge(edge),
            edges: vec![edge],
            nodes: Vec::new(),
            graphs: Vec::new(),
        })
    }

    /// A node and every edge incident to it in the root graph.
    pub fn for_node(root: RootId, graph: &GraphHierarchy, node: NodeId) -> Result<Self, CoreError> {
        Ok(TeardownPlan {
            root,
            target: TeardownTarget::Node(node),
            edges: graph.incident_edges(node)?,
            nodes: vec![node],
            graphs: Vec::new(),
        })
    }

    /// A graph, its descendant subgraphs, every node that is a member of any
    /// of them, and every edge incident to those nodes.
    pub fn for_graph(
        root: RootId,
        graph: &GraphHierarchy,
        target: GraphId,
    ) -> Result<Self, CoreError> {
        graph.graph(target)?;

        let mut graphs = Vec::new();
        collect_subgraphs(graph, target, &mut graphs);

        let mut nodes: IndexSet<NodeId> = IndexSet::new();
        for &gid in &graphs {
            nodes.extend(graph.member_nodes(gid)?);
        }
        let mut edges: IndexSet<EdgeId> = IndexSet::new();
        for &n in &nodes {
            edges.extend(graph.incident_edges(n)?);
        }

        Ok(TeardownPlan {
            root,
            target: TeardownTarget::Graph(target),
            edges: edges.into_iter().collect(),
            nodes: nodes.into_iter().collect(),
            graphs,
        })
    }

    /// Whether applying the plan leaves nothing of the hierarchy.
    pub fn closes_root(&self) -> bool {
        self.target == TeardownTarget::Graph(GraphId::ROOT)
    }

    pub fn len(&self) -> usize {
        self.edges.len() + self.nodes.len() + self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Post-order: descendants first, `id` last.
fn collect_subgraphs(graph: &GraphHierarchy, id: GraphId, out: &mut Vec<GraphId>) {
    for child in graph.children(id) {
        collect_subgraphs(graph, child, out);
    }
    out.push(id);
}

/// Outcome of [`apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownReport {
    pub edges: usize,
    pub nodes: usize,
    pub graphs: usize,
    /// Registry or engine errors logged and skipped along the way.
    pub faults: usize,
    /// The root graph was released; the caller must drop the hierarchy.
    pub closed_root: bool,
}

/// Executes a plan.
///
/// Errors do not stop the teardown: each one is logged and counted, and the
/// remaining objects are still released. Releasing the root graph only
/// unregisters it; dropping the hierarchy is up to the caller.
pub fn apply(
    plan: &TeardownPlan,
    graph: &mut GraphHierarchy,
    registries: &mut Registries,
    binder: &mut impl CommandBinder,
) -> TeardownReport {
    let root = plan.root;
    let mut report = TeardownReport::default();

    for &edge in &plan.edges {
        let unregistered = registries.edges.unregister_value(&EdgeRef { root, edge }, binder);
        let unlinked = graph.remove_edge(edge).map(drop);
        report.faults += count_faults([unregistered.map(drop), unlinked]);
        report.edges += 1;
    }

    for &node in &plan.nodes {
        let unregistered = registries.nodes.unregister_value(&NodeRef { root, node }, binder);
        let unlinked = graph.remove_node(node).map(drop);
        report.faults += count_faults([unregistered.map(drop), unlinked]);
        report.nodes += 1;
    }

    for &gid in &plan.graphs {
        let unregistered = registries
            .graphs
            .unregister_value(&GraphRef { root, graph: gid }, binder)
            .map(drop);
        if gid.is_root() {
            report.faults += count_faults([unregistered]);
            report.closed_root = true;
        } else {
            let unlinked = graph.remove_subgraph(gid).map(drop);
            report.faults += count_faults([unregistered, unlinked]);
        }
        report.graphs += 1;
    }

    debug!(
        root = root.0,
        edges = report.edges,
        nodes = report.nodes,
        graphs = report.graphs,
        faults = report.faults,
        "teardown complete"
    );
    report
}

fn count_faults<const N: usize>(results: [Result<(), CoreError>; N]) -> usize {
    results
        .into_iter()
        .filter_map(Result::err)
        .inspect(|err| warn!("teardown continuing past fault: {err}"))
        .count()
}
