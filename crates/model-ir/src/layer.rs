// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer nodes of the manifest tree.
//!
//! Each [`LayerNode`] is either a leaf, which may reference weight, bias and
//! running-statistics tensor files, or a container whose state is entirely
//! delegated to its ordered children. Tensor *data* is not stored here, only
//! the paths the exporter wrote.

use std::path::{Path, PathBuf};

/// Index of a node in its [`crate::ManifestTree`] arena.
///
/// Ids are only minted by [`crate::TreeBuilder`], so they serialize but
/// cannot be deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tensor references of a leaf layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LeafSpec {
    /// Weight tensor file, present iff `has_weight` is set.
    pub weight: Option<PathBuf>,
    /// Bias tensor file, present iff `has_bias` is set.
    pub bias: Option<PathBuf>,
    /// Running-mean tensor file (normalization layers only).
    pub running_mean: Option<PathBuf>,
    /// Running-variance tensor file (normalization layers only).
    pub running_var: Option<PathBuf>,
    /// The exporter's own per-leaf trainable parameter count, if recorded.
    pub declared_params: Option<usize>,
}

impl LeafSpec {
    /// A leaf with both weight and bias.
    pub fn weight_and_bias(weight: impl Into<PathBuf>, bias: impl Into<PathBuf>) -> Self {
        Self {
            weight: Some(weight.into()),
            bias: Some(bias.into()),
            ..Self::default()
        }
    }

    /// Adds running-statistics references.
    pub fn with_running_stats(
        mut self,
        mean: impl Into<PathBuf>,
        var: impl Into<PathBuf>,
    ) -> Self {
        self.running_mean = Some(mean.into());
        self.running_var = Some(var.into());
        self
    }

    /// Trainable tensors in buffer order: weight first, then bias.
    pub fn trainable_tensors(&self) -> impl Iterator<Item = (TensorRole, &Path)> {
        let weight = self.weight.as_deref().map(|p| (TensorRole::Weight, p));
        let bias = self.bias.as_deref().map(|p| (TensorRole::Bias, p));
        weight.into_iter().chain(bias)
    }

    pub fn has_trainable(&self) -> bool {
        self.weight.is_some() || self.bias.is_some()
    }

    pub fn has_running_stats(&self) -> bool {
        self.running_mean.is_some() || self.running_var.is_some()
    }
}

/// Which trainable tensor of a leaf a span belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorRole {
    Weight,
    Bias,
}

impl TensorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::Bias => "bias",
        }
    }
}

impl std::fmt::Display for TensorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leaf or container.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Leaf(LeafSpec),
    Container { children: Vec<NodeId> },
}

/// A single layer element of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LayerNode {
    /// Layer-type identifier (e.g., `"Conv2d"`, `"BatchNorm2d"`, `"Sequential"`).
    pub name: String,
    /// Attribute name inside the parent module (e.g., `"features"`, `"0"`).
    pub var_name: Option<String>,
    /// Line of the element in the manifest, 0 when built programmatically.
    pub line: u32,
    pub kind: NodeKind,
}

impl LayerNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Returns the leaf spec, or `None` for containers.
    pub fn leaf(&self) -> Option<&LeafSpec> {
        match &self.kind {
            NodeKind::Leaf(spec) => Some(spec),
            NodeKind::Container { .. } => None,
        }
    }

    /// Returns the children in document order (empty for leaves).
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Leaf(_) => &[],
            NodeKind::Container { children } => children,
        }
    }

    /// Identifier used in logs and errors: `"Conv2d (features.0)"`-style.
    pub fn label(&self) -> String {
        let name = if self.name.is_empty() { "<unnamed>" } else { &self.name };
        match &self.var_name {
            Some(var) => format!("{name} ({var})"),
            None => name.to_string(),
        }
    }
}
