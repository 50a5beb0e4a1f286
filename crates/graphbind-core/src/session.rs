//! Session: the interpreter context that owns every hierarchy, the global
//! registries and the command table.
//!
//! All operations take and return handle tokens. A token is resolved once,
//! at the start of each operation, so a stale token fails before anything
//! is changed.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::attr::AttrKind;
use crate::error::CoreError;
use crate::graph::{AttrTarget, GraphHierarchy, GraphKind};
use crate::id::{
    EdgeId, EdgeRef, GraphId, GraphRef, Handle, NodeId, NodeRef, ObjectKind, RootId,
};
use crate::layout::{self, LayoutOutcome, LayoutRegistry, Point};
use crate::registry::{CommandTable, Registries};
use crate::teardown::{self, TeardownPlan, TeardownReport};

/// Owns all root graphs of one interpreter and the handles naming them.
#[derive(Debug)]
pub struct Session {
    hierarchies: HashMap<RootId, GraphHierarchy>,
    registries: Registries,
    commands: CommandTable,
    layouts: LayoutRegistry,
    next_root: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session with the built-in layout engines.
    pub fn new() -> Self {
        Self::with_layouts(LayoutRegistry::with_builtin())
    }

    pub fn with_layouts(layouts: LayoutRegistry) -> Self {
        Session {
            hierarchies: HashMap::new(),
            registries: Registries::new(),
            commands: CommandTable::new(),
            layouts,
            next_root: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Commands currently bound, one per live handle.
    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Number of open root graphs.
    pub fn graph_count(&self) -> usize {
        self.hierarchies.len()
    }

    pub fn hierarchy(&self, root: RootId) -> Result<&GraphHierarchy, CoreError> {
        self.hierarchies
            .get(&root)
            .ok_or(CoreError::RootNotFound { id: root })
    }

    pub fn resolve_graph(&self, token: &str) -> Result<GraphRef, CoreError> {
        self.registries.graphs.resolve(token)
    }

    pub fn resolve_node(&self, token: &str) -> Result<NodeRef, CoreError> {
        self.registries.nodes.resolve(token)
    }

    pub fn resolve_edge(&self, token: &str) -> Result<EdgeRef, CoreError> {
        self.registries.edges.resolve(token)
    }

    /// Resolves a token of any kind.
    fn resolve_any(&self, token: &str) -> Result<(RootId, AttrTarget), CoreError> {
        match ObjectKind::of_token(token) {
            Some(ObjectKind::Graph) => {
                let r = self.resolve_graph(token)?;
                Ok((r.root, AttrTarget::Graph(r.graph)))
            }
            Some(ObjectKind::Node) => {
                let r = self.resolve_node(token)?;
                Ok((r.root, AttrTarget::Node(r.node)))
            }
            Some(ObjectKind::Edge) => {
                let r = self.resolve_edge(token)?;
                Ok((r.root, AttrTarget::Edge(r.edge)))
            }
            None => Err(CoreError::stale(token)),
        }
    }

    fn hierarchy_mut(&mut self, root: RootId) -> Result<&mut GraphHierarchy, CoreError> {
        self.hierarchies
            .get_mut(&root)
            .ok_or(CoreError::RootNotFound { id: root })
    }

    // Tokens for objects reached by walking a hierarchy. Every object created
    // through the session is registered, so these only allocate for objects
    // that were added to a hierarchy directly.

    fn graph_token(&mut self, root: RootId, graph: GraphId) -> String {
        self.registries
            .graphs
            .register(GraphRef { root, graph }, &mut self.commands)
    }

    fn node_token(&mut self, root: RootId, node: NodeId) -> String {
        self.registries
            .nodes
            .register(NodeRef { root, node }, &mut self.commands)
    }

    fn edge_token(&mut self, root: RootId, edge: EdgeId) -> String {
        self.registries
            .edges
            .register(EdgeRef { root, edge }, &mut self.commands)
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Opens a new root graph and returns its token.
    pub fn new_graph(&mut self, name: &str, kind: GraphKind, strict: bool) -> String {
        let root = RootId(self.next_root);
        self.next_root += 1;
        self.hierarchies
            .insert(root, GraphHierarchy::new(name, kind, strict));
        info!(root = root.0, name, ?kind, strict, "opened graph");
        self.graph_token(root, GraphId::ROOT)
    }

    /// Returns the token of `graph`'s subgraph `name`, creating it if absent.
    pub fn add_subgraph(&mut self, graph: &str, name: &str) -> Result<String, CoreError> {
        let r = self.resolve_graph(graph)?;
        let id = self.hierarchy_mut(r.root)?.add_subgraph(r.graph, name)?;
        Ok(self.graph_token(r.root, id))
    }

    /// Finds or creates node `name` and makes it a member of `graph`.
    pub fn add_node(&mut self, graph: &str, name: &str) -> Result<String, CoreError> {
        let r = self.resolve_graph(graph)?;
        let id = self.hierarchy_mut(r.root)?.add_node(r.graph, name)?;
        Ok(self.node_token(r.root, id))
    }

    /// Adds an edge through `graph`.
    ///
    /// Each endpoint is either a node token from the same hierarchy or a node
    /// name, which is found or created in `graph`.
    pub fn add_edge(
        &mut self,
        graph: &str,
        tail: &str,
        head: &str,
        key: Option<&str>,
    ) -> Result<String, CoreError> {
        let r = self.resolve_graph(graph)?;
        let tail = self.endpoint(r, tail)?;
        let head = self.endpoint(r, head)?;
        let id = self
            .hierarchy_mut(r.root)?
            .add_edge(r.graph, tail, head, key)?;
        Ok(self.edge_token(r.root, id))
    }

    fn endpoint(&mut self, graph: GraphRef, word: &str) -> Result<NodeId, CoreError> {
        if Handle::parse(ObjectKind::Node, word).is_none() {
            let id = self.hierarchy_mut(graph.root)?.add_node(graph.graph, word)?;
            self.node_token(graph.root, id);
            return Ok(id);
        }
        let node = self.resolve_node(word)?;
        if node.root != graph.root {
            return Err(CoreError::InvalidEdge {
                reason: format!("node '{word}' belongs to another root graph"),
            });
        }
        Ok(node.node)
    }

    // -----------------------------------------------------------------------
    // Lookup and listing
    // -----------------------------------------------------------------------

    /// Token of the node `name` if it is a member of `graph`.
    pub fn find_node(&mut self, graph: &str, name: &str) -> Result<Option<String>, CoreError> {
        let r = self.resolve_graph(graph)?;
        let h = self.hierarchy(r.root)?;
        let found = h
            .find_node(name)
            .filter(|n| h.graph(r.graph).is_ok_and(|def| def.nodes.contains(n)));
        Ok(found.map(|n| self.node_token(r.root, n)))
    }

    /// Token of the subgraph `name` at or below `graph`.
    pub fn find_subgraph(&mut self, graph: &str, name: &str) -> Result<Option<String>, CoreError> {
        let r = self.resolve_graph(graph)?;
        let found = self
            .hierarchy(r.root)?
            .subgraphs()
            .find_by_name(r.graph, name);
        Ok(found.map(|g| self.graph_token(r.root, g)))
    }

    /// Member nodes of a graph, or the two endpoints of an edge.
    pub fn list_nodes(&mut self, token: &str) -> Result<Vec<String>, CoreError> {
        let (root, target) = self.resolve_any(token)?;
        let h = self.hierarchy(root)?;
        let nodes = match target {
            AttrTarget::Graph(g) => h.member_nodes(g)?,
            AttrTarget::Edge(e) => {
                let (tail, head) = h.endpoints(e)?;
                vec![tail, head]
            }
            AttrTarget::Node(_) => return Err(wrong_kind(token, "graph or edge")),
        };
        Ok(nodes.into_iter().map(|n| self.node_token(root, n)).collect())
    }

    /// Member edges of a graph, or every edge incident to a node.
    pub fn list_edges(&mut self, token: &str) -> Result<Vec<String>, CoreError> {
        let (root, target) = self.resolve_any(token)?;
        let h = self.hierarchy(root)?;
        let edges = match target {
            AttrTarget::Graph(g) => h.member_edges(g)?,
            AttrTarget::Node(n) => h.incident_edges(n)?,
            AttrTarget::Edge(_) => return Err(wrong_kind(token, "graph or node")),
        };
        Ok(edges.into_iter().map(|e| self.edge_token(root, e)).collect())
    }

    /// Direct subgraphs of a graph, in creation order.
    pub fn list_subgraphs(&mut self, graph: &str) -> Result<Vec<String>, CoreError> {
        let r = self.resolve_graph(graph)?;
        let children = self.hierarchy(r.root)?.children(r.graph);
        Ok(children
            .into_iter()
            .map(|g| self.graph_token(r.root, g))
            .collect())
    }

    /// `(tail, head)` tokens of an edge.
    pub fn edge_endpoints(&mut self, edge: &str) -> Result<(String, String), CoreError> {
        let r = self.resolve_edge(edge)?;
        let (tail, head) = self.hierarchy(r.root)?.endpoints(r.edge)?;
        Ok((self.node_token(r.root, tail), self.node_token(r.root, head)))
    }

    /// The graph an object belongs to: the parent of a subgraph, the root
    /// graph for nodes and edges, and nothing for a root graph.
    pub fn parent_graph(&mut self, token: &str) -> Result<Option<String>, CoreError> {
        let (root, target) = self.resolve_any(token)?;
        let parent = match target {
            AttrTarget::Graph(g) => self.hierarchy(root)?.graph(g)?.parent,
            AttrTarget::Node(_) | AttrTarget::Edge(_) => Some(GraphId::ROOT),
        };
        Ok(parent.map(|g| self.graph_token(root, g)))
    }

    /// Display name: a graph's or node's name, or `tail->head` (`tail--head`
    /// when undirected) for an edge.
    pub fn object_name(&self, token: &str) -> Result<String, CoreError> {
        let (root, target) = self.resolve_any(token)?;
        let h = self.hierarchy(root)?;
        Ok(match target {
            AttrTarget::Graph(g) => h.graph(g)?.name.clone(),
            AttrTarget::Node(n) => h.node(n)?.name.clone(),
            AttrTarget::Edge(e) => {
                let (tail, head) = h.endpoints(e)?;
                let op = if h.is_directed() { "->" } else { "--" };
                format!("{}{op}{}", h.node(tail)?.name, h.node(head)?.name)
            }
        })
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// Writes name/value pairs in order. Names not yet declared for the
    /// object's kind are declared with an empty default. Writes to the edge
    /// `key` attribute are dropped.
    pub fn set_attributes<N, V>(&mut self, token: &str, pairs: &[(N, V)]) -> Result<(), CoreError>
    where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let (root, target) = self.resolve_any(token)?;
        let h = self.hierarchy_mut(root)?;
        for (name, value) in pairs {
            h.set_attr(target, name.as_ref(), value.as_ref())?;
        }
        Ok(())
    }

    /// Sets hierarchy-wide defaults for `kind`, declaring names as needed.
    /// `graph` may be any graph of the hierarchy.
    pub fn set_default_attributes<N, V>(
        &mut self,
        graph: &str,
        kind: AttrKind,
        pairs: &[(N, V)],
    ) -> Result<(), CoreError>
    where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let r = self.resolve_graph(graph)?;
        let attrs = self.hierarchy_mut(r.root)?.attrs_mut();
        for (name, default) in pairs {
            attrs.set_default(kind, name.as_ref(), default.as_ref());
        }
        Ok(())
    }

    /// The object's value for `name`, else the declared default; `None` if
    /// `name` was never declared for the object's kind.
    pub fn get_attribute(&self, token: &str, name: &str) -> Result<Option<String>, CoreError> {
        let (root, target) = self.resolve_any(token)?;
        self.hierarchy(root)?.get_attr(target, name)
    }

    /// `(name, value)` for each requested name.
    pub fn query_attributes<N: AsRef<str>>(
        &self,
        token: &str,
        names: &[N],
    ) -> Result<Vec<(String, String)>, CoreError> {
        let values = self.query_attribute_values(token, names)?;
        Ok(names
            .iter()
            .map(|n| n.as_ref().to_string())
            .zip(values)
            .collect())
    }

    /// The value for each requested name. Fails on the first name that was
    /// never declared.
    pub fn query_attribute_values<N: AsRef<str>>(
        &self,
        token: &str,
        names: &[N],
    ) -> Result<Vec<String>, CoreError> {
        let (root, target) = self.resolve_any(token)?;
        let h = self.hierarchy(root)?;
        names
            .iter()
            .map(|name| {
                h.get_attr(target, name.as_ref())?
                    .ok_or_else(|| CoreError::AttributeNotFound {
                        kind: target.kind(),
                        name: name.as_ref().to_string(),
                    })
            })
            .collect()
    }

    /// Declared attribute names of `kind` in the token's hierarchy.
    pub fn list_attributes(&self, token: &str, kind: AttrKind) -> Result<Vec<String>, CoreError> {
        let (root, _) = self.resolve_any(token)?;
        Ok(self.hierarchy(root)?.attrs().list_names(kind))
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    /// Deletes the object named by `token` and everything that depends on it.
    ///
    /// Returns `Ok(false)` if the token is already stale. Deleting a root
    /// graph closes its whole hierarchy.
    pub fn delete(&mut self, token: &str) -> Result<bool, CoreError> {
        match self.delete_with_report(token) {
            Ok(_) => Ok(true),
            Err(err) if err.is_stale() => {
                debug!(token, "delete of stale handle ignored");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Like [`Session::delete`], but reports what was released and fails on
    /// stale tokens.
    pub fn delete_with_report(&mut self, token: &str) -> Result<TeardownReport, CoreError> {
        let (root, target) = self.resolve_any(token)?;
        let h = self
            .hierarchies
            .get_mut(&root)
            .ok_or(CoreError::RootNotFound { id: root })?;
        let plan = match target {
            AttrTarget::Graph(g) => TeardownPlan::for_graph(root, h, g)?,
            AttrTarget::Node(n) => TeardownPlan::for_node(root, h, n)?,
            AttrTarget::Edge(e) => TeardownPlan::for_edge(root, h, e)?,
        };
        let report = teardown::apply(&plan, h, &mut self.registries, &mut self.commands);
        if report.closed_root {
            self.hierarchies.remove(&root);
            info!(root = root.0, "closed graph");
        }
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    /// Lays out the root graph of `graph`'s hierarchy with the engine named
    /// `engine` (empty for the default).
    pub fn layout(&mut self, graph: &str, engine: &str) -> Result<LayoutOutcome, CoreError> {
        let r = self.resolve_graph(graph)?;
        let h = self
            .hierarchies
            .get_mut(&r.root)
            .ok_or(CoreError::RootNotFound { id: r.root })?;
        layout::run_layout(h, &self.layouts, engine)
    }

    /// Position of a node in the last drawing of its hierarchy.
    pub fn node_position(&self, node: &str) -> Result<Option<Point>, CoreError> {
        let r = self.resolve_node(node)?;
        Ok(self
            .hierarchy(r.root)?
            .drawing()
            .and_then(|d| d.positions.get(&r.node))
            .copied())
    }
}

fn wrong_kind(token: &str, expected: &'static str) -> CoreError {
    CoreError::WrongObjectKind {
        token: token.to_string(),
        expected,
    }
}
