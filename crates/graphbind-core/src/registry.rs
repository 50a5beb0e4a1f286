//! Object registries: one [`HandleTable`] per object kind, plus the binding
//! of each handle's token as a command name in the front end.
//!
//! Registration and command binding happen together, and so do unbinding and
//! slot release, so the front end never holds a command whose handle no
//! longer resolves.

use std::collections::HashMap;
use std::hash::Hash;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::CoreError;
use crate::handle_table::HandleTable;
use crate::id::{EdgeRef, GraphRef, Handle, NodeRef, ObjectKind};

/// The front end's command namespace, as seen from the registries.
pub trait CommandBinder {
    /// Makes `name` callable as a command operating on an object of `kind`.
    fn bind(&mut self, name: &str, kind: ObjectKind);

    /// Removes the command `name`. Returns `false` if it was not bound.
    fn unbind(&mut self, name: &str) -> bool;
}

/// Command names currently bound, in binding order.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: IndexMap<String, ObjectKind>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kind of object a bound command operates on.
    pub fn kind_of(&self, name: &str) -> Option<ObjectKind> {
        self.commands.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }
}

impl CommandBinder for CommandTable {
    fn bind(&mut self, name: &str, kind: ObjectKind) {
        self.commands.insert(name.to_string(), kind);
    }

    fn unbind(&mut self, name: &str) -> bool {
        self.commands.shift_remove(name).is_some()
    }
}

/// Registry for one object kind.
///
/// Keeps a reverse index so the deletion engine can find the handle of an
/// object it reached by walking the graph.
#[derive(Debug, Clone)]
pub struct ObjectRegistry<T> {
    table: HandleTable<T>,
    handles: HashMap<T, Handle>,
}

impl<T: Copy + Eq + Hash> ObjectRegistry<T> {
    pub fn new(kind: ObjectKind) -> Self {
        ObjectRegistry {
            table: HandleTable::new(kind),
            handles: HashMap::new(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.table.kind()
    }

    /// Allocates a handle for `value`, binds its token as a command and
    /// returns the token. A value that is already registered keeps its
    /// existing token.
    pub fn register(&mut self, value: T, binder: &mut impl CommandBinder) -> String {
        if let Some(handle) = self.handle_of(&value) {
            return handle.token();
        }
        let handle = self.table.allocate(value);
        self.handles.insert(value, handle);
        let token = handle.token();
        binder.bind(&token, self.kind());
        debug!(token = %token, "registered");
        token
    }

    /// Resolves a token to the registered value.
    pub fn resolve(&self, token: &str) -> Result<T, CoreError> {
        let handle = Handle::parse(self.kind(), token).ok_or_else(|| CoreError::stale(token))?;
        self.table.resolve(handle).copied()
    }

    pub fn handle_of(&self, value: &T) -> Option<Handle> {
        self.handles.get(value).copied()
    }

    /// Unbinds the token's command and releases its handle.
    pub fn unregister(
        &mut self,
        token: &str,
        binder: &mut impl CommandBinder,
    ) -> Result<T, CoreError> {
        let value = self.resolve(token)?;
        self.unregister_value(&value, binder)?;
        Ok(value)
    }

    /// Unbinds and releases the handle registered for `value`.
    ///
    /// A value without a handle, or a handle without a bound command, is a
    /// [`CoreError::RegistryConsistencyFault`]. In the second case the slot is
    /// still released.
    pub fn unregister_value(
        &mut self,
        value: &T,
        binder: &mut impl CommandBinder,
    ) -> Result<Handle, CoreError> {
        let handle = self
            .handles
            .remove(value)
            .ok_or_else(|| CoreError::RegistryConsistencyFault {
                kind: self.kind(),
                reason: "object has no handle".to_string(),
            })?;
        let token = handle.token();
        let was_bound = binder.unbind(&token);
        if self.table.release(handle).is_none() {
            return Err(CoreError::RegistryConsistencyFault {
                kind: self.kind(),
                reason: format!("slot for '{token}' was already free"),
            });
        }
        debug!(token = %token, "unregistered");
        if !was_bound {
            return Err(CoreError::RegistryConsistencyFault {
                kind: self.kind(),
                reason: format!("command '{token}' was not bound"),
            });
        }
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Iterates over live `(handle, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.table.iter()
    }
}

/// The graph, node and edge registries of one interpreter context.
#[derive(Debug, Clone)]
pub struct Registries {
    pub graphs: ObjectRegistry<GraphRef>,
    pub nodes: ObjectRegistry<NodeRef>,
    pub edges: ObjectRegistry<EdgeRef>,
}

impl Registries {
    pub fn new() -> Self {
        Registries {
            graphs: ObjectRegistry::new(ObjectKind::Graph),
            nodes: ObjectRegistry::new(ObjectKind::Node),
            edges: ObjectRegistry::new(ObjectKind::Edge),
        }
    }

    /// Total number of live handles across all kinds.
    pub fn live_handles(&self) -> usize {
        self.graphs.len() + self.nodes.len() + self.edges.len()
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{NodeId, RootId};

    fn node(n: u32) -> NodeRef {
        NodeRef {
            root: RootId(0),
            node: NodeId(n),
        }
    }

    #[test]
    fn register_binds_command() {
        let mut commands = CommandTable::new();
        let mut nodes = ObjectRegistry::new(ObjectKind::Node);

        let token = nodes.register(node(4), &mut commands);
        assert_eq!(token, "node0_1");
        assert_eq!(commands.kind_of(&token), Some(ObjectKind::Node));
        assert_eq!(nodes.resolve(&token).unwrap(), node(4));
    }

    #[test]
    fn register_twice_returns_same_token() {
        let mut commands = CommandTable::new();
        let mut nodes = ObjectRegistry::new(ObjectKind::Node);

        let first = nodes.register(node(1), &mut commands);
        let second = nodes.register(node(1), &mut commands);
        assert_eq!(first, second);
        assert_eq!(nodes.len(), 1);
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn unregister_unbinds_and_releases() {
        let mut commands = CommandTable::new();
        let mut nodes = ObjectRegistry::new(ObjectKind::Node);
        let token = nodes.register(node(1), &mut commands);

        assert_eq!(nodes.unregister(&token, &mut commands).unwrap(), node(1));
        assert!(!commands.contains(&token));
        assert!(nodes.resolve(&token).unwrap_err().is_stale());
        assert!(nodes.handle_of(&node(1)).is_none());
    }

    #[test]
    fn reused_slot_gets_fresh_token() {
        let mut commands = CommandTable::new();
        let mut nodes = ObjectRegistry::new(ObjectKind::Node);
        let old = nodes.register(node(1), &mut commands);
        nodes.unregister(&old, &mut commands).unwrap();

        let new = nodes.register(node(2), &mut commands);
        assert_ne!(old, new);
        assert!(nodes.resolve(&old).is_err());
        assert_eq!(nodes.resolve(&new).unwrap(), node(2));
    }

    #[test]
    fn unregister_unknown_value_is_consistency_fault() {
        let mut commands = CommandTable::new();
        let mut nodes: ObjectRegistry<NodeRef> = ObjectRegistry::new(ObjectKind::Node);
        let err = nodes.unregister_value(&node(9), &mut commands).unwrap_err();
        assert!(matches!(err, CoreError::RegistryConsistencyFault { .. }));
    }

    #[test]
    fn missing_command_is_reported_but_slot_released() {
        let mut commands = CommandTable::new();
        let mut nodes = ObjectRegistry::new(ObjectKind::Node);
        let token = nodes.register(node(1), &mut commands);
        commands.unbind(&token);

        let err = nodes.unregister_value(&node(1), &mut commands).unwrap_err();
        assert!(matches!(err, CoreError::RegistryConsistencyFault { .. }));
        assert!(nodes.is_empty());
    }

    #[test]
    fn resolve_rejects_other_kinds_and_garbage() {
        let mut commands = CommandTable::new();
        let mut nodes = ObjectRegistry::new(ObjectKind::Node);
        nodes.register(node(1), &mut commands);

        assert!(nodes.resolve("edge0_1").is_err());
        assert!(nodes.resolve("node0").is_err());
        assert!(nodes.resolve("node0_0").is_err());
    }

    #[test]
    fn command_table_keeps_binding_order() {
        let mut commands = CommandTable::new();
        commands.bind("graph0_1", ObjectKind::Graph);
        commands.bind("node0_1", ObjectKind::Node);
        commands.bind("edge0_1", ObjectKind::Edge);
        commands.unbind("node0_1");
        let names: Vec<_> = commands.names().collect();
        assert_eq!(names, vec!["graph0_1", "edge0_1"]);
    }
}
