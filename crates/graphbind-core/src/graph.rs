//! GraphHierarchy: the in-memory graph engine behind one root graph.
//!
//! A hierarchy owns the root graph's topology (all nodes and edges live in a
//! single `StableGraph`, whichever subgraph they were created through), the
//! subgraph tree with its membership sets, the attribute namespace shared by
//! every object in it, and the last computed drawing.
//!
//! All mutations go through `GraphHierarchy` methods so that membership sets,
//! the node-name index and the topology stay consistent. Teardown of
//! registered objects is driven from [`crate::teardown`]; the methods here
//! only unlink.

use std::collections::HashMap;

use indexmap::IndexSet;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef as _;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::attr::{AttrKind, AttrValues, AttributeNamespace, EDGE_KEY};
use crate::error::CoreError;
use crate::id::{EdgeId, GraphId, NodeId};
use crate::layout::Drawing;
use crate::subgraph::{GraphDef, SubgraphTree};

/// Whether edges have a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphKind {
    Directed,
    Undirected,
}

/// A node in the root topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    pub name: String,
    pub values: AttrValues,
}

/// An edge in the root topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeData {
    /// Multi-edge identity, if one was given at creation.
    pub key: Option<String>,
    pub values: AttrValues,
}

/// Object whose attributes are being read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrTarget {
    Graph(GraphId),
    Node(NodeId),
    Edge(EdgeId),
}

impl AttrTarget {
    pub fn kind(self) -> AttrKind {
        match self {
            AttrTarget::Graph(_) => AttrKind::Graph,
            AttrTarget::Node(_) => AttrKind::Node,
            AttrTarget::Edge(_) => AttrKind::Edge,
        }
    }
}

/// One root graph and everything it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphHierarchy {
    kind: GraphKind,
    strict: bool,
    topology: StableGraph<NodeData, EdgeData, Directed, u32>,
    node_names: HashMap<String, NodeId>,
    subgraphs: SubgraphTree,
    attrs: AttributeNamespace,
    drawing: Option<Drawing>,
}

impl GraphHierarchy {
    /// Creates an empty hierarchy whose root graph is called `name`.
    ///
    /// A strict graph never holds two edges between the same pair of nodes.
    pub fn new(name: &str, kind: GraphKind, strict: bool) -> Self {
        GraphHierarchy {
            kind,
            strict,
            topology: StableGraph::new(),
            node_names: HashMap::new(),
            subgraphs: SubgraphTree::new(name),
            attrs: AttributeNamespace::new(),
            drawing: None,
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    pub fn is_directed(&self) -> bool {
        self.kind == GraphKind::Directed
    }

    pub fn name(&self) -> &str {
        self.subgraphs
            .get(GraphId::ROOT)
            .map(|g| g.name.as_str())
            .unwrap_or_default()
    }

    pub fn topology(&self) -> &StableGraph<NodeData, EdgeData, Directed, u32> {
        &self.topology
    }

    pub fn subgraphs(&self) -> &SubgraphTree {
        &self.subgraphs
    }

    pub fn attrs(&self) -> &AttributeNamespace {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut AttributeNamespace {
        &mut self.attrs
    }

    pub fn graph(&self, id: GraphId) -> Result<&GraphDef, CoreError> {
        self.subgraphs.get(id).ok_or(CoreError::GraphNotFound { id })
    }

    pub fn node(&self, id: NodeId) -> Result<&NodeData, CoreError> {
        self.topology
            .node_weight(id.into())
            .ok_or(CoreError::NodeNotFound { id })
    }

    pub fn edge(&self, id: EdgeId) -> Result<&EdgeData, CoreError> {
        self.topology
            .edge_weight(id.into())
            .ok_or(CoreError::EdgeNotFound { id })
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.topology.contains_node(id.into())
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.topology.edge_weight(id.into()).is_some()
    }

    /// Returns `(tail, head)` of an edge.
    pub fn endpoints(&self, id: EdgeId) -> Result<(NodeId, NodeId), CoreError> {
        self.topology
            .edge_endpoints(id.into())
            .map(|(t, h)| (NodeId::from(t), NodeId::from(h)))
            .ok_or(CoreError::EdgeNotFound { id })
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.node_names.get(name).copied()
    }

    /// Searches the whole hierarchy for a subgraph called `name`.
    pub fn find_subgraph(&self, name: &str) -> Option<GraphId> {
        self.subgraphs.find_by_name(GraphId::ROOT, name)
    }

    /// Child subgraphs of `graph`, in creation order.
    pub fn children(&self, graph: GraphId) -> Vec<GraphId> {
        self.subgraphs.children(graph).to_vec()
    }

    /// Snapshot of the nodes that are members of `graph`.
    pub fn member_nodes(&self, graph: GraphId) -> Result<Vec<NodeId>, CoreError> {
        Ok(self.graph(graph)?.nodes.iter().copied().collect())
    }

    /// Snapshot of the edges that are members of `graph`.
    pub fn member_edges(&self, graph: GraphId) -> Result<Vec<EdgeId>, CoreError> {
        Ok(self.graph(graph)?.edges.iter().copied().collect())
    }

    /// Snapshot of every edge touching `node` in the root graph, outgoing
    /// first. A self-loop appears once.
    pub fn incident_edges(&self, node: NodeId) -> Result<Vec<EdgeId>, CoreError> {
        if !self.contains_node(node) {
            return Err(CoreError::NodeNotFound { id: node });
        }
        let idx: NodeIndex<u32> = node.into();
        let mut edges: IndexSet<EdgeId> = IndexSet::new();
        for dir in [Direction::Outgoing, Direction::Incoming] {
            edges.extend(
                self.topology
                    .edges_directed(idx, dir)
                    .map(|e| EdgeId::from(e.id())),
            );
        }
        Ok(edges.into_iter().collect())
    }

    pub fn node_count(&self) -> usize {
        self.topology.node_count()
    }

    pub fn drawing(&self) -> Option<&Drawing> {
        self.drawing.as_ref()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Returns the subgraph of `parent` called `name`, creating it if absent.
    pub fn add_subgraph(&mut self, parent: GraphId, name: &str) -> Result<GraphId, CoreError> {
        self.subgraphs.add_subgraph(name, parent).map(|(id, _)| id)
    }

    /// Finds or creates the node `name` in the root graph and makes it a
    /// member of `graph` (and therefore of all its ancestors).
    pub fn add_node(&mut self, graph: GraphId, name: &str) -> Result<NodeId, CoreError> {
        if !self.subgraphs.contains(graph) {
            return Err(CoreError::GraphNotFound { id: graph });
        }
        let id = match self.node_names.get(name) {
            Some(&id) => id,
            None => {
                let idx = self.topology.add_node(NodeData {
                    name: name.to_string(),
                    values: AttrValues::new(),
                });
                let id = NodeId::from(idx);
                self.node_names.insert(name.to_string(), id);
                id
            }
        };
        self.join_node(graph, id);
        Ok(id)
    }

    /// Adds an edge from `tail` to `head` through `graph`.
    ///
    /// The edge always lives in the root topology; `graph` and its ancestors
    /// gain it and both endpoints as members. An existing edge is returned
    /// instead of a new one when the graph is strict and the endpoints
    /// match, or when `key` matches an edge with the same endpoints.
    pub fn add_edge(
        &mut self,
        graph: GraphId,
        tail: NodeId,
        head: NodeId,
        key: Option<&str>,
    ) -> Result<EdgeId, CoreError> {
        if !self.subgraphs.contains(graph) {
            return Err(CoreError::GraphNotFound { id: graph });
        }
        for n in [tail, head] {
            if !self.contains_node(n) {
                return Err(CoreError::NodeNotFound { id: n });
            }
        }
        let id = match self.find_edge(tail, head, key) {
            Some(existing) => existing,
            None => {
                let idx = self.topology.add_edge(
                    tail.into(),
                    head.into(),
                    EdgeData {
                        key: key.map(str::to_string),
                        values: AttrValues::new(),
                    },
                );
                let id = EdgeId::from(idx);
                if let Some(k) = key {
                    let pos = self.attrs.declare_or_get(AttrKind::Edge, EDGE_KEY, "");
                    self.topology[idx].values.set(pos, k.to_string());
                }
                id
            }
        };

        self.join_node(graph, tail);
        self.join_node(graph, head);
        for gid in self.subgraphs.self_and_ancestors(graph) {
            if let Some(def) = self.subgraphs.get_mut(gid) {
                def.edges.insert(id);
            }
        }
        Ok(id)
    }

    fn find_edge(&self, tail: NodeId, head: NodeId, key: Option<&str>) -> Option<EdgeId> {
        if !self.strict && key.is_none() {
            return None;
        }
        let tail_idx: NodeIndex<u32> = tail.into();
        let head_idx: NodeIndex<u32> = head.into();
        let mut candidates: Vec<EdgeIndex<u32>> = self
            .topology
            .edges_connecting(tail_idx, head_idx)
            .map(|e| e.id())
            .collect();
        if !self.is_directed() {
            candidates.extend(
                self.topology
                    .edges_connecting(head_idx, tail_idx)
                    .map(|e| e.id()),
            );
        }
        candidates
            .into_iter()
            .find(|&e| self.strict || self.topology[e].key.as_deref() == key)
            .map(EdgeId::from)
    }

    fn join_node(&mut self, graph: GraphId, node: NodeId) {
        for gid in self.subgraphs.self_and_ancestors(graph) {
            if let Some(def) = self.subgraphs.get_mut(gid) {
                def.nodes.insert(node);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Unlinking
    // -----------------------------------------------------------------------

    /// Removes an edge from the root graph and from every membership set.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<EdgeData, CoreError> {
        let data = self
            .topology
            .remove_edge(id.into())
            .ok_or(CoreError::EdgeNotFound { id })?;
        for def in self.subgraphs.iter_mut() {
            def.edges.shift_remove(&id);
        }
        Ok(data)
    }

    /// Removes a node from the root graph and from every membership set.
    ///
    /// Incident edges must already be gone; any left over are reported as an
    /// inconsistency and the node is kept.
    pub fn remove_node(&mut self, id: NodeId) -> Result<NodeData, CoreError> {
        let remaining = self.incident_edges(id)?;
        if !remaining.is_empty() {
            return Err(CoreError::GraphInconsistency {
                reason: format!("node {id} still has {} incident edge(s)", remaining.len()),
            });
        }
        let data = self
            .topology
            .remove_node(id.into())
            .ok_or(CoreError::NodeNotFound { id })?;
        self.node_names.remove(&data.name);
        for def in self.subgraphs.iter_mut() {
            def.nodes.shift_remove(&id);
        }
        // The freed index is handed to the next node created.
        if let Some(drawing) = self.drawing.as_mut() {
            drawing.positions.remove(&id);
        }
        Ok(data)
    }

    /// Unlinks a childless subgraph from its parent.
    pub fn remove_subgraph(&mut self, id: GraphId) -> Result<GraphDef, CoreError> {
        self.subgraphs.remove(id)
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// Reads an attribute: the object's value, else the declared default.
    /// `None` if the attribute was never declared for that kind.
    pub fn get_attr(&self, target: AttrTarget, name: &str) -> Result<Option<String>, CoreError> {
        let values = match target {
            AttrTarget::Graph(id) => &self.graph(id)?.values,
            AttrTarget::Node(id) => &self.node(id)?.values,
            AttrTarget::Edge(id) => &self.edge(id)?.values,
        };
        Ok(self.attrs.get(values, target.kind(), name))
    }

    /// Writes an attribute, declaring it hierarchy-wide if needed.
    ///
    /// Returns `false` if the write was dropped because the attribute is
    /// protected.
    pub fn set_attr(
        &mut self,
        target: AttrTarget,
        name: &str,
        value: &str,
    ) -> Result<bool, CoreError> {
        let values = match target {
            AttrTarget::Graph(id) => {
                &mut self
                    .subgraphs
                    .get_mut(id)
                    .ok_or(CoreError::GraphNotFound { id })?
                    .values
            }
            AttrTarget::Node(id) => {
                &mut self
                    .topology
                    .node_weight_mut(id.into())
                    .ok_or(CoreError::NodeNotFound { id })?
                    .values
            }
            AttrTarget::Edge(id) => {
                &mut self
                    .topology
                    .edge_weight_mut(id.into())
                    .ok_or(CoreError::EdgeNotFound { id })?
                    .values
            }
        };
        Ok(self.attrs.set(values, target.kind(), name, value))
    }

    // -----------------------------------------------------------------------
    // Layout state
    // -----------------------------------------------------------------------

    pub(crate) fn set_drawing(&mut self, drawing: Drawing) {
        self.drawing = Some(drawing);
    }

    /// Discards the previous drawing, if any. Returns whether one existed.
    pub fn reset_layout(&mut self) -> bool {
        self.drawing.take().is_some()
    }
}
