//! Subgraph tree for hierarchical graph organization.
//!
//! [`GraphDef`] represents the root graph or one subgraph, and
//! [`SubgraphTree`] manages the full hierarchy. Subgraphs form a tree under
//! the root graph. Node and edge membership is non-exclusive and flows upward:
//! anything that belongs to a subgraph also belongs to all its ancestors.

use std::collections::HashMap;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::attr::AttrValues;
use crate::error::CoreError;
use crate::id::{EdgeId, GraphId, NodeId};

/// A graph or subgraph within a hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDef {
    pub id: GraphId,
    pub name: String,
    /// Parent graph. `None` for the root graph.
    pub parent: Option<GraphId>,
    /// Member nodes, in insertion order.
    pub nodes: IndexSet<NodeId>,
    /// Member edges, in insertion order.
    pub edges: IndexSet<EdgeId>,
    /// Graph attribute values.
    pub values: AttrValues,
}

impl GraphDef {
    fn new(id: GraphId, name: String, parent: Option<GraphId>) -> Self {
        GraphDef {
            id,
            name,
            parent,
            nodes: IndexSet::new(),
            edges: IndexSet::new(),
            values: AttrValues::new(),
        }
    }
}

/// Manages the subgraph hierarchy below one root graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgraphTree {
    graphs: HashMap<GraphId, GraphDef>,
    /// Parent -> children mapping, in creation order.
    children: HashMap<GraphId, Vec<GraphId>>,
    next_id: u32,
}

impl SubgraphTree {
    /// Creates a tree holding only the root graph, `GraphId(0)`.
    pub fn new(root_name: &str) -> Self {
        let root = GraphDef::new(GraphId::ROOT, root_name.to_string(), None);
        let mut graphs = HashMap::new();
        graphs.insert(GraphId::ROOT, root);
        let mut children = HashMap::new();
        children.insert(GraphId::ROOT, Vec::new());

        SubgraphTree {
            graphs,
            children,
            next_id: 1,
        }
    }

    /// Returns the subgraph of `parent` called `name`, creating it if absent.
    ///
    /// Returns the ID and whether it was newly created.
    pub fn add_subgraph(
        &mut self,
        name: &str,
        parent: GraphId,
    ) -> Result<(GraphId, bool), CoreError> {
        if !self.graphs.contains_key(&parent) {
            return Err(CoreError::GraphNotFound { id: parent });
        }
        if let Some(existing) = self
            .children(parent)
            .iter()
            .copied()
            .find(|id| self.graphs[id].name == name)
        {
            return Ok((existing, false));
        }

        let id = GraphId(self.next_id);
        self.next_id += 1;
        self.graphs
            .insert(id, GraphDef::new(id, name.to_string(), Some(parent)));
        self.children.entry(parent).or_default().push(id);
        self.children.insert(id, Vec::new());
        Ok((id, true))
    }

    pub fn get(&self, id: GraphId) -> Option<&GraphDef> {
        self.graphs.get(&id)
    }

    pub fn get_mut(&mut self, id: GraphId) -> Option<&mut GraphDef> {
        self.graphs.get_mut(&id)
    }

    pub fn contains(&self, id: GraphId) -> bool {
        self.graphs.contains_key(&id)
    }

    /// Returns the child subgraphs of the given graph.
    ///
    /// Returns an empty slice if the graph has no children or does not exist.
    pub fn children(&self, id: GraphId) -> &[GraphId] {
        self.children
            .get(&id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Returns `id` followed by each of its ancestors up to the root.
    pub fn self_and_ancestors(&self, id: GraphId) -> Vec<GraphId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(gid) = current {
            match self.graphs.get(&gid) {
                Some(def) => {
                    chain.push(gid);
                    current = def.parent;
                }
                None => break,
            }
        }
        chain
    }

    /// Depth-first search for a subgraph by name, starting below `from`.
    pub fn find_by_name(&self, from: GraphId, name: &str) -> Option<GraphId> {
        let mut stack: Vec<GraphId> = self.children(from).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.graphs.get(&id).is_some_and(|g| g.name == name) {
                return Some(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        None
    }

    /// Unlinks a subgraph from its parent and drops it.
    ///
    /// The subgraph must have no children left. The root graph cannot be
    /// removed this way.
    pub fn remove(&mut self, id: GraphId) -> Result<GraphDef, CoreError> {
        if id.is_root() {
            return Err(CoreError::GraphInconsistency {
                reason: "the root graph cannot be unlinked from a parent".to_string(),
            });
        }
        if !self.children(id).is_empty() {
            return Err(CoreError::GraphInconsistency {
                reason: format!("subgraph {id} still has children"),
            });
        }
        let def = self
            .graphs
            .remove(&id)
            .ok_or(CoreError::GraphNotFound { id })?;
        self.children.remove(&id);
        if let Some(siblings) = def.parent.and_then(|p| self.children.get_mut(&p)) {
            siblings.retain(|&c| c != id);
        }
        Ok(def)
    }

    /// Iterates over every graph in the tree, in no particular order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GraphDef> {
        self.graphs.values_mut()
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}
