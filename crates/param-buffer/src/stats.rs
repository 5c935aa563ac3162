// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Running statistics of normalization layers.
//!
//! Running mean and variance are not trainable and do not live in the flat
//! parameter buffer. They are collected in visitation order while the buffer
//! is filled, then handed out again, first in first out, to the normalization
//! layers of the constructed layer graph.

use std::collections::VecDeque;
use tensor_core::{Matrix, Shape};

/// The running mean and variance of one normalization layer, as exported.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunningStats {
    /// Identifier of the layer the pair was read from.
    pub layer: String,
    pub mean: Matrix,
    pub var: Matrix,
}

impl RunningStats {
    /// Total elements across mean and variance.
    pub fn num_elements(&self) -> usize {
        self.mean.len() + self.var.len()
    }

    pub fn shapes(&self) -> (Shape, Shape) {
        (Shape::of(&self.mean), Shape::of(&self.var))
    }
}

/// FIFO of [`RunningStats`], one entry per normalization layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningStatsQueue {
    entries: VecDeque<RunningStats>,
}

impl RunningStatsQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair at the back.
    pub fn push(&mut self, stats: RunningStats) {
        tracing::trace!("queued running stats #{} for {}", self.entries.len(), stats.layer);
        self.entries.push_back(stats);
    }

    /// Removes and returns the oldest pair.
    pub fn pop(&mut self) -> Option<RunningStats> {
        self.entries.pop_front()
    }

    /// Returns the oldest pair without removing it.
    pub fn peek(&self) -> Option<&RunningStats> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &RunningStats> {
        self.entries.iter()
    }

    /// Total elements held across all pairs.
    pub fn num_elements(&self) -> usize {
        self.entries.iter().map(RunningStats::num_elements).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(layer: &str, n: usize) -> RunningStats {
        RunningStats {
            layer: layer.into(),
            mean: Matrix::zeros((n, 1)),
            var: Matrix::ones((n, 1)),
        }
    }

    #[test]
    fn test_fifo_order() {
        let mut q = RunningStatsQueue::new();
        q.push(stats("bn1", 4));
        q.push(stats("bn2", 8));
        assert_eq!(q.len(), 2);
        assert_eq!(q.num_elements(), 24);
        assert_eq!(q.peek().unwrap().layer, "bn1");
        assert_eq!(q.pop().unwrap().layer, "bn1");
        assert_eq!(q.pop().unwrap().layer, "bn2");
        assert!(q.pop().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn test_shapes() {
        let s = stats("bn", 3);
        assert_eq!(s.shapes(), (Shape::column(3), Shape::column(3)));
        assert_eq!(s.num_elements(), 6);
    }
}
