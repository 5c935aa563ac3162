// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Graph construction around a filled parameter vector.
//!
//! The [`GraphBuilder`] trait is the seam to a target framework: given the
//! architecture name and the flattened parameters, it produces a
//! [`LiveGraph`]. [`MirrorGraphBuilder`] is the built-in implementation; it
//! reproduces the manifest's own topology.

use crate::graph::{ContainerLayer, LiveGraph, LiveLayer, NormalizationLayer, PlainLayer};
use crate::spans::ParameterLayout;
use crate::ConvertError;
use model_ir::{ManifestTree, NodeId, NodeKind};

/// Builds a [`LiveGraph`] for a named architecture.
pub trait GraphBuilder {
    /// Returns the builder's name (for logging).
    fn name(&self) -> &str;

    /// Number of parameters the builder's graph for `architecture` expects,
    /// if it knows. The pipeline rejects a buffer of any other length before
    /// calling [`build`](Self::build).
    fn expected_parameters(&self, _architecture: &str) -> Option<usize> {
        None
    }

    /// Constructs the graph and takes ownership of `parameters`.
    fn build(
        &self,
        architecture: &str,
        tree: &ManifestTree,
        layout: &ParameterLayout,
        parameters: Vec<f64>,
    ) -> Result<LiveGraph, ConvertError>;
}

/// Builds a graph that mirrors the manifest tree one layer per node.
#[derive(Debug, Clone)]
pub struct MirrorGraphBuilder {
    normalization_types: Vec<String>,
}

impl MirrorGraphBuilder {
    pub fn new(normalization_types: Vec<String>) -> Self {
        Self {
            normalization_types,
        }
    }

    fn mirror(
        &self,
        tree: &ManifestTree,
        layout: &ParameterLayout,
        id: NodeId,
    ) -> Result<LiveLayer, ConvertError> {
        let node = tree.node(id);
        let name = node.label();
        match &node.kind {
            NodeKind::Container { children } => {
                let layers = children
                    .iter()
                    .map(|&child| self.mirror(tree, layout, child))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(LiveLayer::Container(ContainerLayer { name, layers }))
            }
            NodeKind::Leaf(_) => {
                let params = layout
                    .get(id)
                    .map(|leaf| leaf.spans.clone())
                    .ok_or_else(|| {
                        ConvertError::GraphConstruction(format!(
                            "no parameter spans recorded for '{name}' ({id})"
                        ))
                    })?;
                if self.normalization_types.iter().any(|t| t == &node.name) {
                    Ok(LiveLayer::NormalizationLeaf(NormalizationLayer::new(name, params)))
                } else {
                    Ok(LiveLayer::PlainLeaf(PlainLayer { name, params }))
                }
            }
        }
    }
}

impl Default for MirrorGraphBuilder {
    fn default() -> Self {
        Self::new(vec!["BatchNorm2d".to_string()])
    }
}

impl GraphBuilder for MirrorGraphBuilder {
    fn name(&self) -> &str {
        "mirror"
    }

    fn build(
        &self,
        architecture: &str,
        tree: &ManifestTree,
        layout: &ParameterLayout,
        parameters: Vec<f64>,
    ) -> Result<LiveGraph, ConvertError> {
        let layers = tree
            .node(tree.root())
            .children()
            .iter()
            .map(|&id| self.mirror(tree, layout, id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LiveGraph::new(architecture, parameters, layers))
    }
}
