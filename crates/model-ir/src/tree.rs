// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The manifest tree: an arena of [`LayerNode`]s addressed by [`NodeId`].
//!
//! Nodes are referenced by index rather than by pointer. Children are always
//! inserted before their parent, so a tree can only be built bottom-up and
//! every `NodeId` a tree hands out is valid for that tree.
//!
//! ```text
//! root (model class, container)
//!  ├── Sequential "features"
//!  │    ├── Conv2d "0"          weight, bias
//!  │    └── BatchNorm2d "1"     weight, bias, running mean/var
//!  └── Linear "classifier"      weight, bias
//! ```

use crate::{LayerNode, LeafSpec, ModelError, NodeId, NodeKind};
use std::fmt;

/// A parsed manifest: the layer tree plus the declared parameter count.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ManifestTree {
    /// Root element name (the exported model's class, e.g. `"VGG"`).
    pub model: String,
    /// Total trainable elements the flat parameter vector must hold.
    pub trainable_param_count: usize,
    nodes: Vec<LayerNode>,
    root: NodeId,
}

impl ManifestTree {
    /// Starts building a tree bottom-up.
    pub fn builder(model: impl Into<String>, trainable_param_count: usize) -> TreeBuilder {
        TreeBuilder {
            model: model.into(),
            trainable_param_count,
            nodes: Vec::new(),
            attached: Vec::new(),
        }
    }

    /// The root container.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns a node by id.
    ///
    /// Ids are only minted by this tree's builder, so indexing cannot fail
    /// for ids obtained from the same tree.
    pub fn node(&self, id: NodeId) -> &LayerNode {
        &self.nodes[id.0]
    }

    /// Returns a node by id, or `None` if the id is out of range.
    pub fn get(&self, id: NodeId) -> Option<&LayerNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order depth-first iterator yielding `(depth, id)`; the root is
    /// depth 0. This is the order the flat parameter vector is laid out in.
    pub fn depth_first(&self) -> DepthFirst<'_> {
        DepthFirst {
            tree: self,
            stack: vec![(0, self.root)],
        }
    }

    /// Leaves in depth-first order.
    pub fn leaves(&self) -> impl Iterator<Item = (NodeId, &LayerNode, &LeafSpec)> {
        self.depth_first().filter_map(move |(_, id)| {
            let node = self.node(id);
            node.leaf().map(|spec| (id, node, spec))
        })
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Containers below the root.
    pub fn container_count(&self) -> usize {
        self.depth_first()
            .filter(|(depth, id)| *depth > 0 && !self.node(*id).is_leaf())
            .count()
    }

    /// Number of leaves whose identifier is one of `names`.
    pub fn count_leaves_named(&self, names: &[String]) -> usize {
        self.leaves()
            .filter(|(_, node, _)| names.iter().any(|n| n == &node.name))
            .count()
    }

    /// Depth of the deepest node.
    pub fn max_depth(&self) -> usize {
        self.depth_first().map(|(d, _)| d).max().unwrap_or(0)
    }

    /// Returns a one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "Manifest '{}': {} leaves, {} containers, depth {}, {} trainable parameters",
            self.model,
            self.leaf_count(),
            self.container_count(),
            self.max_depth(),
            self.trainable_param_count,
        )
    }
}

impl fmt::Display for ManifestTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({} trainable parameters):",
            self.model, self.trainable_param_count
        )?;
        for (depth, id) in self.depth_first().skip(1) {
            let node = self.node(id);
            let indent = "  ".repeat(depth);
            match node.leaf() {
                Some(spec) => {
                    let mut parts = Vec::new();
                    if spec.weight.is_some() {
                        parts.push("weight");
                    }
                    if spec.bias.is_some() {
                        parts.push("bias");
                    }
                    if spec.has_running_stats() {
                        parts.push("running stats");
                    }
                    let tensors = if parts.is_empty() {
                        "no tensors".to_string()
                    } else {
                        parts.join(", ")
                    };
                    writeln!(f, "{indent}{} [{tensors}]", node.label())?;
                }
                None => writeln!(
                    f,
                    "{indent}{} ({} children)",
                    node.label(),
                    node.children().len()
                )?,
            }
        }
        Ok(())
    }
}

/// Pre-order traversal over a [`ManifestTree`].
pub struct DepthFirst<'a> {
    tree: &'a ManifestTree,
    stack: Vec<(usize, NodeId)>,
}

impl Iterator for DepthFirst<'_> {
    type Item = (usize, NodeId);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, id) = self.stack.pop()?;
        // Push in reverse so the first child is visited next.
        for child in self.tree.node(id).children().iter().rev() {
            self.stack.push((depth + 1, *child));
        }
        Some((depth, id))
    }
}

/// Bottom-up builder for [`ManifestTree`].
///
/// Every node can be attached to at most one parent, and only after it has
/// been added itself.
///
/// # Example
/// ```
/// use model_ir::{LeafSpec, ManifestTree};
///
/// let mut b = ManifestTree::builder("Net", 24);
/// let l1 = b.leaf("Linear", LeafSpec::weight_and_bias("w1.csv", "b1.csv"));
/// let l2 = b.leaf("Linear", LeafSpec::weight_and_bias("w2.csv", "b2.csv"));
/// let tree = b.finish(vec![l1, l2]).unwrap();
/// assert_eq!(tree.leaf_count(), 2);
/// ```
#[derive(Debug)]
pub struct TreeBuilder {
    model: String,
    trainable_param_count: usize,
    nodes: Vec<LayerNode>,
    attached: Vec<bool>,
}

impl TreeBuilder {
    /// Adds a leaf and returns its id.
    pub fn leaf(&mut self, name: impl Into<String>, spec: LeafSpec) -> NodeId {
        self.nodes.push(LayerNode {
            name: name.into(),
            var_name: None,
            line: 0,
            kind: NodeKind::Leaf(spec),
        });
        self.attached.push(false);
        NodeId(self.nodes.len() - 1)
    }

    /// Adds a container over already-built children.
    pub fn container(
        &mut self,
        name: impl Into<String>,
        children: Vec<NodeId>,
    ) -> Result<NodeId, ModelError> {
        self.push(LayerNode {
            name: name.into(),
            var_name: None,
            line: 0,
            kind: NodeKind::Container { children },
        })
    }

    /// Adds a fully specified node.
    ///
    /// Fails if a child has not been added yet or already has a parent.
    pub fn push(&mut self, node: LayerNode) -> Result<NodeId, ModelError> {
        let mut claimed = Vec::with_capacity(node.children().len());
        for &child in node.children() {
            match self.attached.get(child.0).copied() {
                None => {
                    return Err(ModelError::InvalidTree(format!(
                        "'{}' references node {child}, which has not been added",
                        node.name
                    )))
                }
                Some(true) => {
                    return Err(ModelError::InvalidTree(format!(
                        "'{}' references node {child}, which already has a parent",
                        node.name
                    )))
                }
                Some(false) if claimed.contains(&child) => {
                    return Err(ModelError::InvalidTree(format!(
                        "'{}' lists node {child} twice",
                        node.name
                    )))
                }
                Some(false) => claimed.push(child),
            }
        }
        for child in claimed {
            self.attached[child.0] = true;
        }
        self.nodes.push(node);
        self.attached.push(false);
        Ok(NodeId(self.nodes.len() - 1))
    }

    /// Adds the root container over `children` and returns the tree.
    pub fn finish(mut self, children: Vec<NodeId>) -> Result<ManifestTree, ModelError> {
        let model = self.model.clone();
        let root = self.container(model, children)?;
        Ok(ManifestTree {
            model: self.model,
            trainable_param_count: self.trainable_param_count,
            nodes: self.nodes,
            root,
        })
    }
}
