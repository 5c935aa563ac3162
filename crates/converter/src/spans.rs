// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Where each leaf's tensors ended up in the flat parameter buffer.
//!
//! The walker records one [`LeafSpans`] per leaf, in visitation order, so
//! graph builders can bind layers to their parameters and tests can read a
//! tensor back out of the buffer.

use crate::ConvertError;
use model_ir::{NodeId, TensorRole};
use std::collections::HashMap;
use tensor_core::{Matrix, Shape, TensorLayout};

/// One trainable tensor inside the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TensorSpan {
    pub role: TensorRole,
    /// First buffer index.
    pub offset: usize,
    /// Number of elements.
    pub len: usize,
    /// Shape of the tensor as exported.
    pub shape: Shape,
}

impl TensorSpan {
    /// One past the last buffer index.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// The spans of a single leaf, weight before bias.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LeafSpans {
    pub node: NodeId,
    pub layer: String,
    pub spans: Vec<TensorSpan>,
}

impl LeafSpans {
    pub fn new(node: NodeId, layer: impl Into<String>) -> Self {
        Self {
            node,
            layer: layer.into(),
            spans: Vec::new(),
        }
    }

    /// Returns the span of `role`, if the leaf has that tensor.
    pub fn span(&self, role: TensorRole) -> Option<&TensorSpan> {
        self.spans.iter().find(|s| s.role == role)
    }

    pub fn num_elements(&self) -> usize {
        self.spans.iter().map(|s| s.len).sum()
    }
}

/// Spans of every leaf in depth-first order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterLayout {
    leaves: Vec<LeafSpans>,
    index: HashMap<NodeId, usize>,
}

impl ParameterLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, leaf: LeafSpans) {
        self.index.insert(leaf.node, self.leaves.len());
        self.leaves.push(leaf);
    }

    /// Spans recorded for `node`.
    pub fn get(&self, node: NodeId) -> Option<&LeafSpans> {
        self.index.get(&node).map(|&i| &self.leaves[i])
    }

    pub fn leaves(&self) -> &[LeafSpans] {
        &self.leaves
    }

    /// Number of trainable tensors across all leaves.
    pub fn tensor_count(&self) -> usize {
        self.leaves.iter().map(|l| l.spans.len()).sum()
    }

    pub fn total_elements(&self) -> usize {
        self.leaves.iter().map(|l| l.num_elements()).sum()
    }

    /// Returns `true` if the spans tile `[0, len)` in order with no gap or
    /// overlap.
    pub fn is_contiguous(&self, len: usize) -> bool {
        let mut next = 0;
        for span in self.leaves.iter().flat_map(|l| &l.spans) {
            if span.offset != next {
                return false;
            }
            next = span.end();
        }
        next == len
    }

    /// Reads the exported matrix of `node`'s `role` tensor back out of
    /// `buffer`.
    pub fn extract(
        &self,
        buffer: &[f64],
        node: NodeId,
        role: TensorRole,
        layout: TensorLayout,
    ) -> Result<Matrix, ConvertError> {
        let leaf = self.get(node).ok_or_else(|| {
            ConvertError::GraphConstruction(format!("no spans recorded for node {node}"))
        })?;
        let span = leaf.span(role).ok_or_else(|| {
            ConvertError::GraphConstruction(format!("layer '{}' has no {role}", leaf.layer))
        })?;
        let data = buffer.get(span.offset..span.end()).ok_or(
            param_buffer::BufferError::OutOfRange {
                offset: span.offset,
                count: span.len,
                len: buffer.len(),
            },
        )?;
        layout
            .restore(data, span.shape)
            .map_err(|source| ConvertError::TensorLoadError {
                layer: leaf.layer.clone(),
                role: role.as_str(),
                offset: span.offset,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::{LeafSpec, ManifestTree};

    fn span(role: TensorRole, offset: usize, rows: usize, cols: usize) -> TensorSpan {
        TensorSpan {
            role,
            offset,
            len: rows * cols,
            shape: Shape::matrix(rows, cols),
        }
    }

    fn two_leaf_ids() -> (NodeId, NodeId) {
        let mut b = ManifestTree::builder("Net", 0);
        let a = b.leaf("Linear", LeafSpec::default());
        let c = b.leaf("Linear", LeafSpec::default());
        let _ = b.finish(vec![a, c]).unwrap();
        (a, c)
    }

    #[test]
    fn test_lookup_and_totals() {
        let (a, c) = two_leaf_ids();
        let mut layout = ParameterLayout::new();
        let mut first = LeafSpans::new(a, "Linear (0)");
        first.spans.push(span(TensorRole::Weight, 0, 2, 3));
        first.spans.push(span(TensorRole::Bias, 6, 2, 1));
        layout.push(first);
        layout.push(LeafSpans::new(c, "Linear (1)"));

        assert_eq!(layout.tensor_count(), 2);
        assert_eq!(layout.total_elements(), 8);
        assert!(layout.is_contiguous(8));
        assert!(!layout.is_contiguous(9));
        assert_eq!(layout.get(a).unwrap().span(TensorRole::Bias).unwrap().offset, 6);
        assert!(layout.get(c).unwrap().spans.is_empty());
    }

    #[test]
    fn test_gap_is_not_contiguous() {
        let (a, _) = two_leaf_ids();
        let mut layout = ParameterLayout::new();
        let mut leaf = LeafSpans::new(a, "Linear");
        leaf.spans.push(span(TensorRole::Weight, 1, 1, 1));
        layout.push(leaf);
        assert!(!layout.is_contiguous(2));
    }

    #[test]
    fn test_extract() {
        let (a, _) = two_leaf_ids();
        let mut layout = ParameterLayout::new();
        let mut leaf = LeafSpans::new(a, "Linear");
        leaf.spans.push(span(TensorRole::Weight, 0, 2, 2));
        layout.push(leaf);

        let buffer = [1.0, 2.0, 3.0, 4.0];
        let m = layout
            .extract(&buffer, a, TensorRole::Weight, TensorLayout::Transposed)
            .unwrap();
        assert_eq!(m, ndarray::array![[1.0, 2.0], [3.0, 4.0]]);

        assert!(layout
            .extract(&buffer, a, TensorRole::Bias, TensorLayout::Transposed)
            .is_err());
        assert!(layout
            .extract(&buffer[..3], a, TensorRole::Weight, TensorLayout::Transposed)
            .is_err());
    }
}
