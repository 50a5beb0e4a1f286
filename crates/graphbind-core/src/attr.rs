//! Attribute namespace shared by every object of one kind in a hierarchy.
//!
//! Each declaration gets a position when it is first created; objects store
//! their values in a vector indexed by that position. After declaration, reads
//! and writes never look the name up again.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::id::ObjectKind;

/// Edge attribute that identifies multi-edges; never writable.
pub const EDGE_KEY: &str = "key";

/// Which dictionary an attribute belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrKind {
    Graph,
    Node,
    Edge,
}

impl AttrKind {
    fn index(self) -> usize {
        match self {
            AttrKind::Graph => 0,
            AttrKind::Node => 1,
            AttrKind::Edge => 2,
        }
    }
}

impl From<ObjectKind> for AttrKind {
    fn from(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Graph => AttrKind::Graph,
            ObjectKind::Node => AttrKind::Node,
            ObjectKind::Edge => AttrKind::Edge,
        }
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttrKind::Graph => "graph",
            AttrKind::Node => "node",
            AttrKind::Edge => "edge",
        })
    }
}

/// A named attribute slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrDecl {
    pub name: String,
    pub default: String,
    pub position: usize,
}

/// Per-object attribute storage, indexed by declaration position.
///
/// `None` means "unset"; reads of an unset position yield the declaration's
/// default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrValues(SmallVec<[Option<String>; 4]>);

impl AttrValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, position: usize) -> Option<&str> {
        self.0.get(position).and_then(|v| v.as_deref())
    }

    pub fn set(&mut self, position: usize, value: String) {
        if self.0.len() <= position {
            self.0.resize(position + 1, None);
        }
        self.0[position] = Some(value);
    }
}

/// Attribute dictionaries for one hierarchy, one per [`AttrKind`].
///
/// Dictionaries are created on first declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeNamespace {
    dicts: [Option<IndexMap<String, AttrDecl>>; 3],
}

impl AttributeNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the position of `name`, declaring it with `default` if absent.
    ///
    /// On repeat calls the existing declaration wins; `default` is ignored.
    pub fn declare_or_get(&mut self, kind: AttrKind, name: &str, default: &str) -> usize {
        let dict = self.dicts[kind.index()].get_or_insert_with(IndexMap::new);
        if let Some(decl) = dict.get(name) {
            return decl.position;
        }
        let position = dict.len();
        dict.insert(
            name.to_string(),
            AttrDecl {
                name: name.to_string(),
                default: default.to_string(),
                position,
            },
        );
        debug!(%kind, name, position, "declared attribute");
        position
    }

    pub fn find(&self, kind: AttrKind, name: &str) -> Option<&AttrDecl> {
        self.dicts[kind.index()].as_ref()?.get(name)
    }

    /// Replaces the default of a declaration, declaring it if absent.
    pub fn set_default(&mut self, kind: AttrKind, name: &str, default: &str) -> usize {
        let position = self.declare_or_get(kind, name, default);
        if let Some(decl) = self.dicts[kind.index()]
            .as_mut()
            .and_then(|dict| dict.get_mut(name))
        {
            decl.default = default.to_string();
        }
        position
    }

    /// Declared names for `kind`, in declaration order.
    pub fn list_names(&self, kind: AttrKind) -> Vec<String> {
        self.dicts[kind.index()]
            .as_ref()
            .map(|dict| dict.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether writes to `name` are silently dropped.
    pub fn is_protected(kind: AttrKind, name: &str) -> bool {
        kind == AttrKind::Edge && name == EDGE_KEY
    }

    /// Reads `name` for one object: its value, else the declared default.
    /// Returns `None` if `name` was never declared for `kind`.
    pub fn get(&self, values: &AttrValues, kind: AttrKind, name: &str) -> Option<String> {
        let decl = self.find(kind, name)?;
        Some(
            values
                .get(decl.position)
                .unwrap_or(decl.default.as_str())
                .to_string(),
        )
    }

    /// Writes `name` for one object, declaring it with an empty default if
    /// needed. Returns `false` when the write was dropped because the
    /// attribute is protected.
    pub fn set(
        &mut self,
        values: &mut AttrValues,
        kind: AttrKind,
        name: &str,
        value: &str,
    ) -> bool {
        if Self::is_protected(kind, name) {
            debug!(%kind, name, "ignored write to protected attribute");
            return false;
        }
        let position = self.declare_or_get(kind, name, "");
        values.set(position, value.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_is_idempotent() {
        let mut ns = AttributeNamespace::new();
        let first = ns.declare_or_get(AttrKind::Node, "color", "black");
        let second = ns.declare_or_get(AttrKind::Node, "color", "black");
        let third = ns.declare_or_get(AttrKind::Node, "color", "red");

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(ns.find(AttrKind::Node, "color").unwrap().default, "black");
    }

    #[test]
    fn positions_are_per_kind() {
        let mut ns = AttributeNamespace::new();
        assert_eq!(ns.declare_or_get(AttrKind::Node, "color", ""), 0);
        assert_eq!(ns.declare_or_get(AttrKind::Node, "shape", ""), 1);
        assert_eq!(ns.declare_or_get(AttrKind::Edge, "color", ""), 0);
        assert_eq!(ns.list_names(AttrKind::Node), vec!["color", "shape"]);
    }

    #[test]
    fn list_names_in_declaration_order() {
        let mut ns = AttributeNamespace::new();
        for name in ["zeta", "alpha", "mid"] {
            ns.declare_or_get(AttrKind::Graph, name, "");
        }
        assert_eq!(ns.list_names(AttrKind::Graph), vec!["zeta", "alpha", "mid"]);
        assert!(ns.list_names(AttrKind::Edge).is_empty());
    }

    #[test]
    fn unset_reads_default() {
        let mut ns = AttributeNamespace::new();
        ns.declare_or_get(AttrKind::Node, "shape", "ellipse");
        let values = AttrValues::new();
        assert_eq!(ns.get(&values, AttrKind::Node, "shape").as_deref(), Some("ellipse"));
        assert_eq!(ns.get(&values, AttrKind::Node, "missing"), None);
    }

    #[test]
    fn set_then_get() {
        let mut ns = AttributeNamespace::new();
        let mut a = AttrValues::new();
        let b = AttrValues::new();
        assert!(ns.set(&mut a, AttrKind::Node, "label", "hello"));

        assert_eq!(ns.get(&a, AttrKind::Node, "label").as_deref(), Some("hello"));
        // Other objects see the (empty) default of the lazily created slot.
        assert_eq!(ns.get(&b, AttrKind::Node, "label").as_deref(), Some(""));
    }

    #[test]
    fn edge_key_is_protected() {
        let mut ns = AttributeNamespace::new();
        let mut values = AttrValues::new();
        let pos = ns.declare_or_get(AttrKind::Edge, EDGE_KEY, "");
        values.set(pos, "k1".into());

        assert!(!ns.set(&mut values, AttrKind::Edge, EDGE_KEY, "X"));
        assert_eq!(ns.get(&values, AttrKind::Edge, EDGE_KEY).as_deref(), Some("k1"));
        // "key" on nodes is an ordinary attribute.
        assert!(ns.set(&mut values, AttrKind::Node, EDGE_KEY, "X"));
    }

    #[test]
    fn set_default_changes_existing_default() {
        let mut ns = AttributeNamespace::new();
        let pos = ns.declare_or_get(AttrKind::Node, "shape", "ellipse");
        assert_eq!(ns.set_default(AttrKind::Node, "shape", "box"), pos);
        assert_eq!(ns.find(AttrKind::Node, "shape").unwrap().default, "box");
    }

    #[test]
    fn values_grow_on_demand() {
        let mut values = AttrValues::new();
        values.set(6, "x".into());
        assert_eq!(values.get(6), Some("x"));
        assert_eq!(values.get(2), None);
        values.clear(6);
        assert_eq!(values.get(6), None);
    }
}
