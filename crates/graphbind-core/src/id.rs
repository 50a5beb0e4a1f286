//! Stable ID newtypes for graph entities and the opaque handles that expose
//! them to the command front end.
//!
//! Engine IDs are distinct newtype wrappers over `u32`, providing type safety
//! so that a `NodeId` cannot be accidentally used where an `EdgeId` is expected.
//! A [`Handle`] is the external name of a registered object: a slot in a
//! [`HandleTable`](crate::handle_table::HandleTable) plus the generation the
//! slot had when the handle was issued.

use std::fmt;

use petgraph::graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

/// Identity of one root graph (and therefore one graph hierarchy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RootId(pub u32);

/// Graph identity within a hierarchy. The root graph is always `GraphId(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphId(pub u32);

/// Stable node identifier. Maps to a petgraph `NodeIndex<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Stable edge identifier. Maps to a petgraph `EdgeIndex<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl GraphId {
    /// The root graph of every hierarchy.
    pub const ROOT: GraphId = GraphId(0);

    pub fn is_root(self) -> bool {
        self == GraphId::ROOT
    }
}

// Display implementations -- just print the inner value.

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Bridge between engine IDs and petgraph indices.

impl From<NodeIndex<u32>> for NodeId {
    fn from(idx: NodeIndex<u32>) -> Self {
        NodeId(idx.index() as u32)
    }
}

impl From<NodeId> for NodeIndex<u32> {
    fn from(id: NodeId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}

impl From<EdgeIndex<u32>> for EdgeId {
    fn from(idx: EdgeIndex<u32>) -> Self {
        EdgeId(idx.index() as u32)
    }
}

impl From<EdgeId> for EdgeIndex<u32> {
    fn from(id: EdgeId) -> Self {
        EdgeIndex::new(id.0 as usize)
    }
}

// ---------------------------------------------------------------------------
// Registry references
// ---------------------------------------------------------------------------

/// A graph or subgraph as stored in the graph registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphRef {
    pub root: RootId,
    pub graph: GraphId,
}

/// A node as stored in the node registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub root: RootId,
    pub node: NodeId,
}

/// An edge as stored in the edge registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeRef {
    pub root: RootId,
    pub edge: EdgeId,
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// The three kinds of registered object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Graph,
    Node,
    Edge,
}

impl ObjectKind {
    /// Token prefix used when rendering handles of this kind.
    pub fn prefix(self) -> &'static str {
        match self {
            ObjectKind::Graph => "graph",
            ObjectKind::Node => "node",
            ObjectKind::Edge => "edge",
        }
    }

    /// Determines the kind from a token prefix, without validating the rest.
    pub fn of_token(token: &str) -> Option<ObjectKind> {
        [ObjectKind::Graph, ObjectKind::Node, ObjectKind::Edge]
            .into_iter()
            .find(|kind| token.starts_with(kind.prefix()))
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Opaque reference to a registered object.
///
/// Rendered as `{prefix}{slot}_{generation}`, e.g. `node3_1`. Generations
/// start at 1, so a handle with generation 0 never resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub kind: ObjectKind,
    pub slot: u32,
    pub generation: u32,
}

impl Handle {
    /// Renders the token the front end binds as a command name.
    pub fn token(&self) -> String {
        self.to_string()
    }

    /// Parses a token of the expected kind.
    ///
    /// The match is exact: prefix, decimal slot, `_`, decimal generation and
    /// nothing else. Returns `None` for anything else, including a zero
    /// generation.
    pub fn parse(kind: ObjectKind, token: &str) -> Option<Handle> {
        let rest = token.strip_prefix(kind.prefix())?;
        let (slot, generation) = rest.split_once('_')?;
        let slot = parse_decimal(slot)?;
        let generation = parse_decimal(generation)?;
        if generation == 0 {
            return None;
        }
        Some(Handle {
            kind,
            slot,
            generation,
        })
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}_{}", self.kind.prefix(), self.slot, self.generation)
    }
}

// `u32::from_str` accepts a leading '+', which would make two tokens name the
// same handle.
fn parse_decimal(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
