// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Depth-first flattening of a manifest tree into one parameter buffer.
//!
//! ```text
//! root ──► Sequential ──► Conv2d       weight ┐ bias ┐
//!      │              └─► BatchNorm2d  weight ┐ bias ┐   (mean, var) ──► queue
//!      └─► Linear                      weight ┐ bias ┐
//!
//! buffer: [ conv.w | conv.b | bn.w | bn.b | fc.w | fc.b ]
//! ```
//!
//! Leaves write their weight then their bias at the cursor, in document
//! order. Containers contribute nothing themselves; their children are
//! flattened in order. Running statistics of normalization layers are not
//! trainable and go to a FIFO queue instead of the buffer.

use crate::spans::{LeafSpans, ParameterLayout, TensorSpan};
use crate::ConvertError;
use model_ir::{LayerNode, LeafSpec, ManifestTree, NodeId, NodeKind};
use param_buffer::{ParameterBuffer, RunningStats, RunningStatsQueue, WriteCursor};
use std::path::Path;
use tensor_core::{Matrix, Shape, TensorLayout, TensorSource};

/// Result of flattening a whole tree.
#[derive(Debug, Clone)]
pub struct FlattenOutput {
    /// Every trainable element, fully written.
    pub buffer: ParameterBuffer,
    /// Running statistics in normalization-layer visitation order.
    pub stats: RunningStatsQueue,
    /// Where each leaf's tensors were placed.
    pub layout: ParameterLayout,
}

impl FlattenOutput {
    /// Number of tensor files read (trainable tensors plus stats).
    pub fn tensors_loaded(&self) -> usize {
        self.layout.tensor_count() + 2 * self.stats.len()
    }
}

/// Walks a [`ManifestTree`] and fills a [`ParameterBuffer`].
///
/// # Example
/// ```
/// use converter::FlatteningWalker;
/// use model_ir::{LeafSpec, ManifestTree};
/// use ndarray::array;
/// use tensor_core::{InMemorySource, TensorLayout};
///
/// let source = InMemorySource::new()
///     .with("w.csv", array![[1.0, 2.0], [3.0, 4.0]])
///     .with("b.csv", array![[5.0], [6.0]]);
///
/// let mut b = ManifestTree::builder("Net", 6);
/// let fc = b.leaf("Linear", LeafSpec::weight_and_bias("w.csv", "b.csv"));
/// let tree = b.finish(vec![fc]).unwrap();
///
/// let walker = FlatteningWalker::new(&source, TensorLayout::Transposed);
/// let out = walker.flatten(&tree).unwrap();
/// assert_eq!(out.buffer.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
/// ```
pub struct FlatteningWalker<'s> {
    source: &'s dyn TensorSource,
    layout: TensorLayout,
    normalization_types: Vec<String>,
}

impl<'s> FlatteningWalker<'s> {
    /// Creates a walker that treats `BatchNorm2d` as the only
    /// normalization type.
    pub fn new(source: &'s dyn TensorSource, layout: TensorLayout) -> Self {
        Self {
            source,
            layout,
            normalization_types: vec!["BatchNorm2d".to_string()],
        }
    }

    /// Replaces the set of normalization layer identifiers.
    pub fn with_normalization_types(mut self, types: Vec<String>) -> Self {
        self.normalization_types = types;
        self
    }

    pub fn layout(&self) -> TensorLayout {
        self.layout
    }

    pub fn is_normalization(&self, name: &str) -> bool {
        self.normalization_types.iter().any(|t| t == name)
    }

    /// Flattens the whole tree.
    ///
    /// Allocates a buffer of exactly the declared trainable parameter count,
    /// walks the tree from its root, and fails if the leaves do not fill the
    /// buffer completely.
    pub fn flatten(&self, tree: &ManifestTree) -> Result<FlattenOutput, ConvertError> {
        let declared = tree.trainable_param_count;
        let mut buffer = ParameterBuffer::zeroed(declared);
        let mut stats = RunningStatsQueue::new();
        let mut layout = ParameterLayout::new();

        let consumed = {
            let mut cursor = buffer.cursor();
            self.flatten_subtree(tree, tree.root(), &mut cursor, &mut stats, &mut layout)?
        };

        if consumed != declared {
            return Err(ConvertError::TrainableParamCountMismatch { declared, consumed });
        }

        tracing::info!(
            "flattened '{}': {} parameters across {} tensors, {} running-stats pairs",
            tree.model,
            consumed,
            layout.tensor_count(),
            stats.len(),
        );

        Ok(FlattenOutput {
            buffer,
            stats,
            layout,
        })
    }

    /// Flattens the subtree rooted at `id` starting at the cursor's offset.
    ///
    /// Returns the number of buffer elements the subtree consumed. Running
    /// statistics are appended to `stats` and leaf spans to `layout`.
    pub fn flatten_subtree(
        &self,
        tree: &ManifestTree,
        id: NodeId,
        cursor: &mut WriteCursor<'_>,
        stats: &mut RunningStatsQueue,
        layout: &mut ParameterLayout,
    ) -> Result<usize, ConvertError> {
        let node = tree.node(id);
        match &node.kind {
            NodeKind::Container { children } => {
                let mut consumed = 0;
                for &child in children {
                    consumed += self.flatten_subtree(tree, child, cursor, stats, layout)?;
                }
                tracing::trace!("container {} consumed {consumed} elements", node.label());
                Ok(consumed)
            }
            NodeKind::Leaf(spec) => self.flatten_leaf(id, node, spec, cursor, stats, layout),
        }
    }

    fn flatten_leaf(
        &self,
        id: NodeId,
        node: &LayerNode,
        spec: &LeafSpec,
        cursor: &mut WriteCursor<'_>,
        stats: &mut RunningStatsQueue,
        layout: &mut ParameterLayout,
    ) -> Result<usize, ConvertError> {
        let label = node.label();
        let mut spans = LeafSpans::new(id, label.clone());

        for (role, path) in spec.trainable_tensors() {
            let offset = cursor.offset();
            let matrix = self.load(&label, role.as_str(), offset, path)?;
            let len = matrix.len();
            let dst = cursor.reserve(&label, len)?;
            self.layout
                .write_into(&matrix, dst)
                .map_err(|source| ConvertError::TensorLoadError {
                    layer: label.clone(),
                    role: role.as_str(),
                    offset,
                    source,
                })?;
            tracing::debug!(
                "{label}: {role} {} -> [{offset}, {})",
                Shape::of(&matrix),
                offset + len
            );
            spans.spans.push(TensorSpan {
                role,
                offset,
                len,
                shape: Shape::of(&matrix),
            });
        }

        let consumed = spans.num_elements();
        if let Some(declared) = spec.declared_params {
            if declared != consumed {
                tracing::warn!(
                    "{label} declares {declared} trainable parameters \
                     but its tensors hold {consumed}"
                );
            }
        }

        if self.is_normalization(&node.name) {
            stats.push(self.load_running_stats(&label, node.line, spec, cursor.offset())?);
        } else if spec.has_running_stats() {
            tracing::debug!("{label} is not a normalization type; running stats ignored");
        }

        layout.push(spans);
        Ok(consumed)
    }

    fn load_running_stats(
        &self,
        label: &str,
        line: u32,
        spec: &LeafSpec,
        offset: usize,
    ) -> Result<RunningStats, ConvertError> {
        let missing = |field| ConvertError::MissingStatsReference {
            layer: label.to_string(),
            line,
            field,
        };
        let mean_path = spec
            .running_mean
            .as_deref()
            .ok_or_else(|| missing("running_mean_csv"))?;
        let var_path = spec
            .running_var
            .as_deref()
            .ok_or_else(|| missing("running_var_csv"))?;

        let mean = self.load(label, "running mean", offset, mean_path)?;
        let var = self.load(label, "running var", offset, var_path)?;
        tracing::debug!(
            "{label}: queued running stats mean {} var {}",
            Shape::of(&mean),
            Shape::of(&var)
        );
        Ok(RunningStats {
            layer: label.to_string(),
            mean,
            var,
        })
    }

    fn load(
        &self,
        label: &str,
        role: &'static str,
        offset: usize,
        path: &Path,
    ) -> Result<Matrix, ConvertError> {
        self.source
            .load(path)
            .map_err(|source| ConvertError::TensorLoadError {
                layer: label.to_string(),
                role,
                offset,
                source,
            })
    }
}
