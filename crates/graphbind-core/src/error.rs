//! Core error types for graphbind-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! the failure modes of handle resolution, teardown and layout.

use thiserror::Error;

use crate::attr::AttrKind;
use crate::id::{EdgeId, GraphId, NodeId, ObjectKind, RootId};

/// Core errors produced by the graphbind-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A token does not name a live object: it was never issued, is
    /// malformed, or its object has been deleted.
    #[error("no such object: '{token}'")]
    StaleHandle { token: String },

    /// A registry lost track of an object it should hold.
    #[error("bad entry in {kind} table: {reason}")]
    RegistryConsistencyFault { kind: ObjectKind, reason: String },

    /// The requested layout engine is not registered, and neither is the
    /// fallback.
    #[error("layout type: \"{requested}\" not recognized. Use one of: {}", .available.join(" "))]
    UnsupportedLayoutEngine {
        requested: String,
        available: Vec<String>,
    },

    /// A root graph has been closed or never existed.
    #[error("root graph not found: RootId({id})", id = id.0)]
    RootNotFound { id: RootId },

    /// A graph ID was not found in its hierarchy.
    #[error("graph not found: GraphId({id})", id = id.0)]
    GraphNotFound { id: GraphId },

    /// A node index was not found in the graph.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// An edge index was not found in the graph.
    #[error("edge not found: EdgeId({id})", id = id.0)]
    EdgeNotFound { id: EdgeId },

    /// An attribute was queried that was never declared for the object's
    /// kind.
    #[error("no {kind} attribute named '{name}'")]
    AttributeNotFound { kind: AttrKind, name: String },

    /// An operation was given a handle of a kind it does not accept.
    #[error("'{token}' is not a {expected}")]
    WrongObjectKind {
        token: String,
        expected: &'static str,
    },

    /// An edge failed validation.
    #[error("invalid edge: {reason}")]
    InvalidEdge { reason: String },

    /// A hierarchy invariant was violated.
    #[error("graph inconsistency: {reason}")]
    GraphInconsistency { reason: String },
}

impl CoreError {
    pub(crate) fn stale(token: impl Into<String>) -> Self {
        CoreError::StaleHandle {
            token: token.into(),
        }
    }

    /// Returns `true` for errors meaning "the object is already gone".
    pub fn is_stale(&self) -> bool {
        matches!(self, CoreError::StaleHandle { .. })
    }
}
