//! Flattened node tree
//!
//! The structured persisted form never nests a node inside a node. Roots are
//! kept in their own list; every other node is appended to one flat list in
//! pre-order (variants before children at every level), and each entry records
//! how many variants and children follow it. Decoding walks the same order with
//! an external cursor. The order is part of the persisted format.

use serde::{Deserialize, Serialize};

use super::{Node, NodeStore, RootNode};
use crate::error::FlatError;

/// One node without its nested lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub num_variants: usize,
    #[serde(default)]
    pub num_children: usize,
}

/// A root entry with its root-only metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRoot {
    #[serde(flatten)]
    pub node: FlatNode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub inclusion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Root list plus the flat list of all non-root nodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatStore {
    pub roots: Vec<FlatRoot>,
    #[serde(default)]
    pub nodes: Vec<FlatNode>,
}

impl FlatNode {
    fn describe(node: &Node) -> Self {
        Self {
            name: node.name.clone(),
            value: node.value().map(str::to_owned),
            num_variants: node.variants.len(),
            num_children: node.children.len(),
        }
    }
}

fn flatten_into(node: &Node, out: &mut Vec<FlatNode>) {
    for nested in node.variants.iter().chain(node.children.iter()) {
        out.push(FlatNode::describe(nested));
        flatten_into(nested, out);
    }
}

/// Read position over the flat list
struct Cursor {
    nodes: std::vec::IntoIter<FlatNode>,
    offset: usize,
}

impl Cursor {
    fn take(&mut self, owner: &str, expected: usize) -> Result<FlatNode, FlatError> {
        let next = self.nodes.next().ok_or_else(|| FlatError::Truncated {
            name: owner.to_string(),
            expected,
            offset: self.offset,
        })?;
        self.offset += 1;
        Ok(next)
    }

    fn rebuild(&mut self, flat: FlatNode) -> Result<Node, FlatError> {
        let FlatNode {
            name,
            value,
            num_variants,
            num_children,
        } = flat;
        let mut node = Node::restored(name, value);

        for _ in 0..num_variants {
            let next = self.take(&node.name, num_variants)?;
            let variant = self.rebuild(next)?;
            node.variants.push(variant);
        }
        for _ in 0..num_children {
            let next = self.take(&node.name, num_children)?;
            let child = self.rebuild(next)?;
            node.children.push(child);
        }
        Ok(node)
    }
}

impl NodeStore {
    /// Produce the flattened form; the live tree is left untouched
    pub fn flatten(&self) -> FlatStore {
        let mut nodes = Vec::new();
        let roots = self
            .roots
            .iter()
            .map(|root| {
                flatten_into(root.node(), &mut nodes);
                FlatRoot {
                    node: FlatNode::describe(root.node()),
                    inclusion: root.inclusion.clone(),
                    category: root.category.clone(),
                }
            })
            .collect();
        FlatStore { roots, nodes }
    }

    /// Rebuild a store from its flattened form. The result is not dirty.
    pub fn unflatten(flat: FlatStore) -> Result<NodeStore, FlatError> {
        let FlatStore { roots, nodes } = flat;
        let total = nodes.len();
        let mut cursor = Cursor {
            nodes: nodes.into_iter(),
            offset: 0,
        };

        let roots = roots
            .into_iter()
            .map(|root| {
                let node = cursor.rebuild(root.node)?;
                Ok(RootNode::from_parts(node, root.inclusion, root.category))
            })
            .collect::<Result<Vec<_>, FlatError>>()?;

        if cursor.offset != total {
            return Err(FlatError::Leftover {
                remaining: total - cursor.offset,
                offset: cursor.offset,
            });
        }
        Ok(NodeStore::from_roots(roots))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> NodeStore {
        let mut store = NodeStore::new();
        let volume = store.add_root("Volume");
        volume.inclusion = "desktop".into();
        let default = volume.add_variant("Default");
        default.set_value("0.5");
        default.add_child("Enabled").set_value("true");
        let music = volume.add_variant("music");
        music.set_value("0.8");
        music.add_child("Enabled").set_value("false");
        volume.add_child("Legacy").set_value("1");

        store.add_root("Title").set_value("Hello");
        store
    }

    #[test]
    fn test_flatten_emits_preorder_variants_before_children() {
        let flat = sample_store().flatten();

        let order: Vec<&str> = flat.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(order, vec!["Default", "Enabled", "music", "Enabled", "Legacy"]);

        assert_eq!(flat.roots.len(), 2);
        assert_eq!(flat.roots[0].node.num_variants, 2);
        assert_eq!(flat.roots[0].node.num_children, 1);
        assert_eq!(flat.roots[0].inclusion, "desktop");
        assert_eq!(flat.roots[1].node.value.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_unflatten_restores_tree() {
        let store = sample_store();
        let restored = NodeStore::unflatten(store.flatten()).expect("valid flat store");

        assert_eq!(restored, store);
        assert!(!restored.is_dirty());
        assert_eq!(restored.get_root("Volume").map(|r| r.inclusion.as_str()), Some("desktop"));
    }

    #[test]
    fn test_flat_store_survives_json() {
        let flat = sample_store().flatten();
        let json = serde_json::to_string(&flat).expect("serialize");
        let parsed: FlatStore = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, flat);
    }

    #[test]
    fn test_unflatten_rejects_truncated_list() {
        let mut flat = sample_store().flatten();
        flat.nodes.pop();

        let err = NodeStore::unflatten(flat).unwrap_err();
        assert!(matches!(err, FlatError::Truncated { ref name, .. } if name == "Volume"));
    }

    #[test]
    fn test_unflatten_rejects_leftover_nodes() {
        let mut flat = sample_store().flatten();
        flat.nodes.push(FlatNode {
            name: "Orphan".into(),
            ..FlatNode::default()
        });

        let err = NodeStore::unflatten(flat).unwrap_err();
        assert_eq!(err, FlatError::Leftover { remaining: 1, offset: 5 });
    }
}
