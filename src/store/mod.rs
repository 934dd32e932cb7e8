//! Persisted node tree
//!
//! A [`NodeStore`] is a forest of named root nodes. Every [`Node`] may carry a
//! scalar value, a list of variant sub-nodes keyed by parameter and a list of
//! child sub-nodes keyed by name. Names are matched case-insensitively.
//!
//! Mutations set a per-node dirty flag; [`Node::is_dirty`] ORs the flags of
//! the whole subtree so callers can skip redundant persistence writes.

mod flat;

pub use flat::{FlatNode, FlatRoot, FlatStore};

use std::ops::{Deref, DerefMut};

use crate::constants::variant::ARRAY_DEFAULT_PARAMETER;
use crate::ordering::{names_match, natural_cmp};
use crate::path::OptionPath;

/// One entry of the persisted tree
#[derive(Debug, Clone, Default)]
pub struct Node {
    name: String,
    value: Option<String>,
    variants: Vec<Node>,
    children: Vec<Node>,
    dirty: bool,
}

impl PartialEq for Node {
    /// Structural equality: names, values, variants and children.
    /// Dirty flags are ignored and an empty value equals an absent one.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.value() == other.value()
            && self.variants == other.variants
            && self.children == other.children
    }
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            variants: Vec::new(),
            children: Vec::new(),
            dirty: true,
        }
    }

    /// Build a clean node, as read back from persistence
    pub(crate) fn restored(name: String, value: Option<String>) -> Self {
        Self {
            name,
            value,
            variants: Vec::new(),
            children: Vec::new(),
            dirty: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.name != name {
            self.name = name;
            self.dirty = true;
        }
    }

    /// Scalar value, `None` when absent or empty
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        let value = value.into();
        if self.value.as_deref() != Some(value.as_str()) {
            self.value = Some(value);
            self.dirty = true;
        }
    }

    pub fn clear_value(&mut self) {
        if self.value.take().is_some() {
            self.dirty = true;
        }
    }

    pub fn variants(&self) -> &[Node] {
        &self.variants
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub(crate) fn variants_mut(&mut self) -> &mut [Node] {
        &mut self.variants
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Node] {
        &mut self.children
    }

    // -- children ---------------------------------------------------------

    /// Append a new child
    ///
    /// Panics if a child with the same name already exists.
    pub fn add_child(&mut self, name: impl Into<String>) -> &mut Node {
        let name = name.into();
        assert!(
            self.get_child(&name).is_none(),
            "node '{}' already has a child named '{}'",
            self.name,
            name
        );
        let index = self.children.len();
        self.children.push(Node::new(name));
        self.dirty = true;
        &mut self.children[index]
    }

    pub fn get_child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| names_match(&c.name, name))
    }

    pub fn get_child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| names_match(&c.name, name))
    }

    pub fn get_or_create_child(&mut self, name: &str) -> &mut Node {
        let index = match self.children.iter().position(|c| names_match(&c.name, name)) {
            Some(index) => index,
            None => {
                self.children.push(Node::new(name));
                self.dirty = true;
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    pub fn remove_child(&mut self, name: &str) -> Option<Node> {
        let index = self.children.iter().position(|c| names_match(&c.name, name))?;
        self.dirty = true;
        Some(self.children.remove(index))
    }

    pub fn clear_children(&mut self) {
        if !self.children.is_empty() {
            self.children.clear();
            self.dirty = true;
        }
    }

    /// Keep only the children for which `keep` returns true
    pub fn retain_children(&mut self, mut keep: impl FnMut(&Node) -> bool) {
        let before = self.children.len();
        self.children.retain(|c| keep(c));
        if self.children.len() != before {
            self.dirty = true;
        }
    }

    // -- variants ---------------------------------------------------------

    /// Append a new variant keyed by `parameter`
    ///
    /// Panics if a variant with the same parameter already exists.
    pub fn add_variant(&mut self, parameter: impl Into<String>) -> &mut Node {
        let parameter = parameter.into();
        assert!(
            self.get_variant(&parameter).is_none(),
            "node '{}' already has a variant '{}'",
            self.name,
            parameter
        );
        let index = self.variants.len();
        self.variants.push(Node::new(parameter));
        self.dirty = true;
        &mut self.variants[index]
    }

    pub fn get_variant(&self, parameter: &str) -> Option<&Node> {
        self.variants.iter().find(|v| names_match(&v.name, parameter))
    }

    pub fn get_variant_mut(&mut self, parameter: &str) -> Option<&mut Node> {
        self.variants.iter_mut().find(|v| names_match(&v.name, parameter))
    }

    pub fn get_or_create_variant(&mut self, parameter: &str) -> &mut Node {
        let index = match self.variants.iter().position(|v| names_match(&v.name, parameter)) {
            Some(index) => index,
            None => {
                self.variants.push(Node::new(parameter));
                self.dirty = true;
                self.variants.len() - 1
            }
        };
        &mut self.variants[index]
    }

    pub fn remove_variant(&mut self, parameter: &str) -> Option<Node> {
        let index = self.variants.iter().position(|v| names_match(&v.name, parameter))?;
        self.remove_variant_at(index)
    }

    pub fn remove_variant_at(&mut self, index: usize) -> Option<Node> {
        if index >= self.variants.len() {
            return None;
        }
        self.dirty = true;
        Some(self.variants.remove(index))
    }

    pub fn clear_variants(&mut self) {
        if !self.variants.is_empty() {
            self.variants.clear();
            self.dirty = true;
        }
    }

    /// Keep only the variants for which `keep` returns true
    pub fn retain_variants(&mut self, mut keep: impl FnMut(&Node) -> bool) {
        let before = self.variants.len();
        self.variants.retain(|v| keep(v));
        if self.variants.len() != before {
            self.dirty = true;
        }
    }

    /// Sort variants in natural order and rename them to sequential indices.
    ///
    /// A variant named like the array default (`"0"`) keeps index 0 and the
    /// others count up from 1; without one, numbering starts at 1.
    pub fn renumber_variants_sequentially(&mut self) {
        let before: Vec<String> = self.variants.iter().map(|v| v.name.clone()).collect();

        self.variants.sort_by(|a, b| {
            let a_default = a.name == ARRAY_DEFAULT_PARAMETER;
            let b_default = b.name == ARRAY_DEFAULT_PARAMETER;
            b_default
                .cmp(&a_default)
                .then_with(|| natural_cmp(&a.name, &b.name))
        });

        let first = usize::from(
            !self
                .variants
                .first()
                .is_some_and(|v| v.name == ARRAY_DEFAULT_PARAMETER),
        );
        for (index, variant) in self.variants.iter_mut().enumerate() {
            variant.set_name((first + index).to_string());
        }

        if self.variants.iter().map(|v| v.name.as_str()).ne(before.iter().map(String::as_str)) {
            self.dirty = true;
        }
    }

    // -- dirty tracking ---------------------------------------------------

    /// True when this node or anything below it was modified
    pub fn is_dirty(&self) -> bool {
        self.dirty
            || self.variants.iter().any(Node::is_dirty)
            || self.children.iter().any(Node::is_dirty)
    }

    /// Report the subtree's dirty state and, when `clear` is set, reset it
    pub fn check_dirty(&mut self, clear: bool) -> bool {
        if !clear {
            return self.is_dirty();
        }
        let mut dirty = std::mem::take(&mut self.dirty);
        for node in self.variants.iter_mut().chain(self.children.iter_mut()) {
            dirty |= node.check_dirty(true);
        }
        dirty
    }
}

/// A top-level node with the metadata carried only by roots
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootNode {
    node: Node,
    /// Opaque tag owned by the build/inclusion collaborator
    pub inclusion: String,
    /// Grouping hint for human editors (`[Category]` lines)
    pub category: Option<String>,
}

impl RootNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node: Node::new(name),
            inclusion: String::new(),
            category: None,
        }
    }

    pub(crate) fn from_parts(node: Node, inclusion: String, category: Option<String>) -> Self {
        Self {
            node,
            inclusion,
            category,
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    pub fn into_node(self) -> Node {
        self.node
    }
}

impl Deref for RootNode {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl DerefMut for RootNode {
    fn deref_mut(&mut self) -> &mut Node {
        &mut self.node
    }
}

/// The persisted forest of root nodes
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    roots: Vec<RootNode>,
    dirty: bool,
}

impl PartialEq for NodeStore {
    fn eq(&self, other: &Self) -> bool {
        self.roots == other.roots
    }
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_roots(roots: Vec<RootNode>) -> Self {
        Self { roots, dirty: false }
    }

    pub fn roots(&self) -> &[RootNode] {
        &self.roots
    }

    pub fn roots_mut(&mut self) -> &mut [RootNode] {
        &mut self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Append a new root
    ///
    /// Panics if a root with the same name already exists.
    pub fn add_root(&mut self, name: impl Into<String>) -> &mut RootNode {
        let name = name.into();
        assert!(self.get_root(&name).is_none(), "store already has a root named '{}'", name);
        let index = self.roots.len();
        self.roots.push(RootNode::new(name));
        self.dirty = true;
        &mut self.roots[index]
    }

    pub fn get_root(&self, name: &str) -> Option<&RootNode> {
        self.roots.iter().find(|r| names_match(r.name(), name))
    }

    pub fn get_root_mut(&mut self, name: &str) -> Option<&mut RootNode> {
        self.roots.iter_mut().find(|r| names_match(r.name(), name))
    }

    pub fn get_or_create_root(&mut self, name: &str) -> &mut RootNode {
        let index = match self.roots.iter().position(|r| names_match(r.name(), name)) {
            Some(index) => index,
            None => {
                self.roots.push(RootNode::new(name));
                self.dirty = true;
                self.roots.len() - 1
            }
        };
        &mut self.roots[index]
    }

    pub fn remove_root(&mut self, name: &str) -> Option<RootNode> {
        let index = self.roots.iter().position(|r| names_match(r.name(), name))?;
        self.dirty = true;
        Some(self.roots.remove(index))
    }

    pub fn retain_roots(&mut self, mut keep: impl FnMut(&RootNode) -> bool) {
        let before = self.roots.len();
        self.roots.retain(|r| keep(r));
        if self.roots.len() != before {
            self.dirty = true;
        }
    }

    pub fn clear(&mut self) {
        if !self.roots.is_empty() {
            self.roots.clear();
            self.dirty = true;
        }
    }

    // -- addressing -------------------------------------------------------

    /// Resolve a path literally: a segment parameter selects a variant node,
    /// a segment name selects a root (first segment) or a child.
    pub fn find(&self, path: &OptionPath) -> Option<&Node> {
        let mut segments = path.segments().iter();
        let root = segments.next()?;
        let mut node = self.get_root(&root.name)?.node();
        if let Some(parameter) = &root.parameter {
            node = node.get_variant(parameter)?;
        }
        for segment in segments {
            node = node.get_child(&segment.name)?;
            if let Some(parameter) = &segment.parameter {
                node = node.get_variant(parameter)?;
            }
        }
        Some(node)
    }

    pub fn find_mut(&mut self, path: &OptionPath) -> Option<&mut Node> {
        let mut segments = path.segments().iter();
        let root = segments.next()?;
        let mut node = self.get_root_mut(&root.name)?.node_mut();
        if let Some(parameter) = &root.parameter {
            node = node.get_variant_mut(parameter)?;
        }
        for segment in segments {
            node = node.get_child_mut(&segment.name)?;
            if let Some(parameter) = &segment.parameter {
                node = node.get_variant_mut(parameter)?;
            }
        }
        Some(node)
    }

    /// Like [`NodeStore::find_mut`] but creates every missing node on the way
    pub fn get_or_create(&mut self, path: &OptionPath) -> &mut Node {
        let (root, rest) = path.split_root();
        let mut node = self.get_or_create_root(&root.name).node_mut();
        if let Some(parameter) = &root.parameter {
            node = node.get_or_create_variant(parameter);
        }
        for segment in rest {
            node = node.get_or_create_child(&segment.name);
            if let Some(parameter) = &segment.parameter {
                node = node.get_or_create_variant(parameter);
            }
        }
        node
    }

    // -- dirty tracking ---------------------------------------------------

    pub fn is_dirty(&self) -> bool {
        self.dirty || self.roots.iter().any(|r| r.is_dirty())
    }

    pub fn check_dirty(&mut self, clear: bool) -> bool {
        if !clear {
            return self.is_dirty();
        }
        let mut dirty = std::mem::take(&mut self.dirty);
        for root in &mut self.roots {
            dirty |= root.check_dirty(true);
        }
        dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(Node::name).collect()
    }

    #[test]
    fn test_get_or_create_child_is_case_insensitive() {
        let mut node = Node::new("Audio");
        node.get_or_create_child("Volume").set_value("3");
        node.get_or_create_child("volume").set_value("4");

        assert_eq!(node.children().len(), 1);
        assert_eq!(node.get_child("VOLUME").and_then(Node::value), Some("4"));
    }

    #[test]
    #[should_panic(expected = "already has a child")]
    fn test_add_child_rejects_duplicate() {
        let mut node = Node::new("Audio");
        node.add_child("Volume");
        node.add_child("VOLUME");
    }

    #[test]
    fn test_remove_variant_by_name_and_index() {
        let mut node = Node::new("List");
        node.add_variant("a");
        node.add_variant("b");
        node.add_variant("c");

        assert_eq!(node.remove_variant("B").map(|n| n.name().to_string()), Some("b".into()));
        assert_eq!(node.remove_variant_at(0).map(|n| n.name().to_string()), Some("a".into()));
        assert!(node.remove_variant_at(5).is_none());
        assert_eq!(names(node.variants()), vec!["c"]);
    }

    #[test]
    fn test_remove_and_clear_mark_dirty_only_on_change() {
        let mut node = Node::new("Audio");
        node.add_child("Volume");
        node.add_child("Balance");
        node.add_variant("music");
        node.check_dirty(true);

        assert!(node.remove_child("missing").is_none());
        assert!(!node.is_dirty());
        let removed = node.remove_child("VOLUME").map(|n| n.name().to_string());
        assert_eq!(removed, Some("Volume".into()));
        assert_eq!(names(node.children()), vec!["Balance"]);
        assert!(node.check_dirty(true));

        node.clear_children();
        assert!(node.children().is_empty());
        assert!(node.check_dirty(true));
        node.clear_children();
        assert!(!node.is_dirty(), "clearing nothing leaves the node clean");

        node.clear_variants();
        assert!(node.variants().is_empty());
        assert!(node.check_dirty(true));
        node.clear_variants();
        assert!(!node.is_dirty());
    }

    #[test]
    fn test_renumber_without_default_starts_at_one() {
        let mut node = Node::new("List");
        node.add_variant("10").set_value("ten");
        node.add_variant("2").set_value("two");
        node.add_variant("1").set_value("one");

        node.renumber_variants_sequentially();

        assert_eq!(names(node.variants()), vec!["1", "2", "3"]);
        assert_eq!(node.get_variant("1").and_then(Node::value), Some("one"));
        assert_eq!(node.get_variant("2").and_then(Node::value), Some("two"));
        assert_eq!(node.get_variant("3").and_then(Node::value), Some("ten"));
    }

    #[test]
    fn test_renumber_keeps_default_variant_first() {
        let mut node = Node::new("List");
        node.add_variant("7");
        node.add_variant("0").set_value("default");
        node.add_variant("3");

        node.renumber_variants_sequentially();

        assert_eq!(names(node.variants()), vec!["0", "1", "2"]);
        assert_eq!(node.get_variant("0").and_then(Node::value), Some("default"));
    }

    #[test]
    fn test_empty_value_equals_absent_value() {
        let mut a = Node::new("X");
        let b = Node::new("X");
        a.set_value("");
        assert_eq!(a, b);
        assert!(a.value().is_none());
    }

    #[test]
    fn test_dirty_propagates_and_clears() {
        let mut store = NodeStore::new();
        store
            .get_or_create_root("Audio")
            .get_or_create_child("Volume")
            .set_value("5");
        assert!(store.check_dirty(true));
        assert!(!store.is_dirty());

        let path: OptionPath = "Audio/Volume".parse().expect("valid path");
        store.find_mut(&path).expect("volume node").set_value("5");
        assert!(!store.is_dirty(), "same value must not dirty the tree");

        store.find_mut(&path).expect("volume node").set_value("6");
        assert!(store.is_dirty());
        assert!(store.check_dirty(false));
        assert!(store.is_dirty(), "check without clear keeps flags");
    }

    #[test]
    fn test_clone_preserves_dirty_flags() {
        let mut node = Node::new("A");
        node.check_dirty(true);
        node.get_or_create_variant("x").set_value("1");

        let copy = node.clone();
        assert!(copy.is_dirty());
        assert_eq!(copy, node);
    }

    #[test]
    fn test_find_and_get_or_create_by_path() {
        let mut store = NodeStore::new();
        let path: OptionPath = "Volume:music/Enabled".parse().expect("valid path");

        assert!(store.find(&path).is_none());
        store.get_or_create(&path).set_value("true");

        assert_eq!(store.find(&path).and_then(Node::value), Some("true"));
        let root = store.get_root("volume").expect("root created");
        assert!(root.get_variant("MUSIC").is_some());
    }

    #[test]
    fn test_remove_root() {
        let mut store = NodeStore::new();
        store.add_root("A");
        store.add_root("B").inclusion = "desktop".into();

        assert!(store.remove_root("a").is_some());
        assert!(store.remove_root("a").is_none());
        assert_eq!(store.roots().len(), 1);
        assert_eq!(store.get_root("B").map(|r| r.inclusion.as_str()), Some("desktop"));
    }
}
